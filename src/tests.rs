//! Integration tests for the wine backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

use crate::db::{init_database, WineRepository};
use crate::models::Wine;
use crate::{build_app, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    wines: Vec<Value>,
    _temp_dir: TempDir,
}

fn test_wines() -> Vec<Value> {
    vec![
        json!({
            "year": 2013,
            "name": "Cabernet sauvignon",
            "country": "France",
            "type": "red",
            "description": "The Sean Connery of red wines"
        }),
        json!({
            "year": 1999,
            "name": "Delicious white wine",
            "country": "Italy",
            "type": "white",
            "description": "Perfect fit for fish"
        }),
        json!({
            "year": 1956,
            "name": "Extraordinary Rose",
            "country": "USA",
            "type": "rose",
            "description": "Perfect drink for a hot summer evening"
        }),
        json!({
            "year": 1967,
            "name": "Another red wine",
            "country": "Australia",
            "type": "red",
            "description": "Mmmmm tastyyyy"
        }),
    ]
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let database_url = format!("sqlite:{}", temp_dir.path().join("test.sqlite").display());

        // Initialize database
        let pool = init_database(&database_url).await.expect("Failed to init DB");
        let repo = Arc::new(WineRepository::new(pool));

        // Seed wines
        let mut wines = Vec::new();
        for wine in test_wines() {
            let doc: Map<String, Value> = serde_json::from_value(wine).unwrap();
            let created: Wine = repo.create(&doc).await.expect("Failed to seed wine");
            wines.push(serde_json::to_value(created).unwrap());
        }

        let app = build_app(AppState { repo });

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            wines,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn wine_url(&self, index: usize) -> String {
        self.url(&format!("/wines/{}", self.wines[index]["id"]))
    }
}

fn assert_json_utf8(resp: &reqwest::Response) {
    assert_eq!(
        resp.headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/json; charset=utf-8")
    );
}

fn merged(base: &Value, changes: &Value) -> Value {
    let mut result = base.clone();
    for (key, value) in changes.as_object().unwrap() {
        result[key] = value.clone();
    }
    result
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_find_all_wines_when_query_is_empty() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/wines"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_json_utf8(&resp);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, Value::Array(fixture.wines.clone()));
}

#[tokio::test]
async fn test_find_returns_empty_list_when_nothing_matches() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/wines"))
        .query(&[("name", "Gewurztraminer")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_json_utf8(&resp);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_find_red_wines() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/wines"))
        .query(&[("type", "red")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!([fixture.wines[0], fixture.wines[3]]));
}

#[tokio::test]
async fn test_find_wines_by_name_part() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/wines"))
        .query(&[("name", "wine")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!([fixture.wines[1], fixture.wines[3]]));
}

#[tokio::test]
async fn test_find_wines_by_year_country_and_type() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/wines"))
        .query(&[("year", "1999"), ("country", "Italy"), ("type", "white")])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!([fixture.wines[1]]));

    // A year that is not a number is no filter at all.
    let resp = fixture
        .client
        .get(fixture.url("/wines"))
        .query(&[("year", "abc")])
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body.as_array().unwrap().len(), fixture.wines.len());
}

#[tokio::test]
async fn test_find_prevents_query_injection() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/wines"))
        .query(&[("country", r#"{"$regex":"al"}"#)])
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_json_utf8(&resp);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_find_ignores_bracketed_query_keys() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/wines?country[$regex]=al"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, Value::Array(fixture.wines.clone()));
}

#[tokio::test]
async fn test_add_wine() {
    let fixture = TestFixture::new().await;
    let new_wine = json!({
        "name": "New wine",
        "year": 2016,
        "country": "Chile",
        "type": "white",
        "description": "Fresh"
    });

    let resp = fixture
        .client
        .post(fixture.url("/wines"))
        .json(&new_wine)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_json_utf8(&resp);
    let body: Value = resp.json().await.unwrap();
    assert!(body["id"].is_i64());
    assert_eq!(body, merged(&new_wine, &json!({"id": body["id"]})));

    let last_seeded = fixture.wines.last().unwrap()["id"].as_i64().unwrap();
    assert!(body["id"].as_i64().unwrap() > last_seeded);
}

#[tokio::test]
async fn test_add_wine_strips_markers_from_body() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/wines"))
        .json(&json!({
            "name": "Cab$ernet",
            "year": 2000,
            "country": "France",
            "type": "red"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["name"], "Cabernet");
}

#[tokio::test]
async fn test_add_wine_strips_markers_from_non_json_content_type() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/wines"))
        .header(reqwest::header::CONTENT_TYPE, "text/plain")
        .body(r#"{"name":"Cab$ernet","year":2000,"country":"Fr$ance","type":"red"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let text = resp.text().await.unwrap();
    assert!(!text.contains('$'));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["name"], "Cabernet");
    assert_eq!(body["country"], "France");
}

#[tokio::test]
async fn test_modify_strips_markers_without_content_type() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .put(fixture.wine_url(0))
        .body(r#"{"name":"$set"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let text = resp.text().await.unwrap();
    assert!(!text.contains('$'));
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body, merged(&fixture.wines[0], &json!({"name": "set"})));
}

#[tokio::test]
async fn test_add_wine_without_required_fields() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/wines"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert_json_utf8(&resp);
    assert_eq!(
        resp.text().await.unwrap(),
        r#"{"error":"VALIDATION_ERROR","validation":{"name":"MISSING","year":"MISSING","country":"MISSING","type":"MISSING"}}"#
    );
}

#[tokio::test]
async fn test_add_wine_with_year_not_a_number() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/wines"))
        .json(&json!({
            "name": "New wine",
            "type": "white",
            "year": "abc"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "error": "VALIDATION_ERROR",
            "validation": {"country": "MISSING", "year": "INVALID"}
        })
    );
}

#[tokio::test]
async fn test_modify_single_property() {
    let fixture = TestFixture::new().await;
    let changes = json!({"name": "Changed wine name"});

    let resp = fixture
        .client
        .put(fixture.wine_url(0))
        .json(&changes)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_json_utf8(&resp);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, merged(&fixture.wines[0], &changes));

    // The change is persisted
    let resp = fixture
        .client
        .get(fixture.wine_url(0))
        .send()
        .await
        .unwrap();
    let stored: Value = resp.json().await.unwrap();
    assert_eq!(stored, body);
}

#[tokio::test]
async fn test_modify_multiple_properties() {
    let fixture = TestFixture::new().await;
    let changes = json!({"name": "Changed wine name", "country": "New country"});

    let resp = fixture
        .client
        .put(fixture.wine_url(0))
        .json(&changes)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, merged(&fixture.wines[0], &changes));
}

#[tokio::test]
async fn test_modify_without_changes_returns_original() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .put(fixture.wine_url(0))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_json_utf8(&resp);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, fixture.wines[0]);
}

#[tokio::test]
async fn test_modify_with_invalid_values() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .put(fixture.wine_url(0))
        .json(&json!({"name": "", "year": "abc"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert_json_utf8(&resp);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "error": "VALIDATION_ERROR",
            "validation": {"name": "MISSING", "year": "INVALID"}
        })
    );

    // Nothing was written
    let resp = fixture
        .client
        .get(fixture.wine_url(0))
        .send()
        .await
        .unwrap();
    let stored: Value = resp.json().await.unwrap();
    assert_eq!(stored, fixture.wines[0]);
}

#[tokio::test]
async fn test_modify_unknown_wine() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .put(fixture.url("/wines/1000"))
        .json(&json!({"name": "Changed"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert_json_utf8(&resp);
    assert_eq!(resp.text().await.unwrap(), r#"{"error":"UNKNOWN_OBJECT"}"#);
}

#[tokio::test]
async fn test_concurrent_modifications_of_different_fields_both_survive() {
    let fixture = TestFixture::new().await;

    let (first, second) = tokio::join!(
        fixture
            .client
            .put(fixture.wine_url(0))
            .json(&json!({"name": "Changed wine name"}))
            .send(),
        fixture
            .client
            .put(fixture.wine_url(0))
            .json(&json!({"country": "New country"}))
            .send(),
    );
    assert_eq!(first.unwrap().status(), 200);
    assert_eq!(second.unwrap().status(), 200);

    let resp = fixture
        .client
        .get(fixture.wine_url(0))
        .send()
        .await
        .unwrap();
    let stored: Value = resp.json().await.unwrap();
    assert_eq!(
        stored,
        merged(
            &fixture.wines[0],
            &json!({"name": "Changed wine name", "country": "New country"})
        )
    );
}

#[tokio::test]
async fn test_delete_wine() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .delete(fixture.wine_url(0))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_json_utf8(&resp);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"success": true}));

    // Deleted wine is gone
    let resp = fixture
        .client
        .get(fixture.wine_url(0))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_delete_unknown_wine() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .delete(fixture.url("/wines/1000"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert_json_utf8(&resp);
    assert_eq!(resp.text().await.unwrap(), r#"{"error":"UNKNOWN_OBJECT"}"#);
}

#[tokio::test]
async fn test_get_wine() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.wine_url(2))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_json_utf8(&resp);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, fixture.wines[2]);
}

#[tokio::test]
async fn test_get_unknown_wine() {
    let fixture = TestFixture::new().await;

    for path in ["/wines/1000", "/wines/not-a-number"] {
        let resp = fixture.client.get(fixture.url(path)).send().await.unwrap();

        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, json!({"error": "UNKNOWN_OBJECT"}));
    }
}

#[tokio::test]
async fn test_get_wine_with_marker_in_path() {
    let fixture = TestFixture::new().await;
    let id = fixture.wines[1]["id"].as_i64().unwrap();

    let resp = fixture
        .client
        .get(fixture.url(&format!("/wines/${}", id)))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, fixture.wines[1]);
}
