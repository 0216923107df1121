//! Database repository for wine CRUD operations.
//!
//! Writes go through schema validation first; every statement binds its values.

use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use super::{merge_changes, validate_wine, Condition, FilterValue, StoreError, WineFilter};
use crate::models::{NewWine, Wine, WineType};

const WINE_COLUMNS: &str = "id, name, year, country, type, description";

const SCHEMA_FIELDS: [&str; 5] = ["name", "year", "country", "type", "description"];

/// Database repository for all wine operations.
#[derive(Clone)]
pub struct WineRepository {
    pool: SqlitePool,
}

impl WineRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// List wines matching `filter`, ordered by id.
    pub async fn find(&self, filter: &WineFilter) -> Result<Vec<Wine>, StoreError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM wines", WINE_COLUMNS));

        for (index, (field, condition)) in filter.conditions().enumerate() {
            builder.push(if index == 0 { " WHERE " } else { " AND " });
            match condition {
                Condition::Contains(text) => {
                    builder.push(format!("instr(\"{}\", ", field));
                    builder.push_bind(text.clone());
                    builder.push(") > 0");
                }
                Condition::Equals(FilterValue::Text(text)) => {
                    builder.push(format!("\"{}\" = ", field));
                    builder.push_bind(text.clone());
                }
                Condition::Equals(FilterValue::Integer(number)) => {
                    builder.push(format!("\"{}\" = ", field));
                    builder.push_bind(*number);
                }
            }
        }
        builder.push(" ORDER BY id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        let wines = rows
            .iter()
            .map(wine_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(wines)
    }

    /// Get a wine by id.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Wine>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM wines WHERE id = ?", WINE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(wine_from_row).transpose()?)
    }

    /// Validate a client document and store it as a new wine.
    pub async fn create(&self, doc: &Map<String, Value>) -> Result<Wine, StoreError> {
        let wine = validate_wine(doc).map_err(StoreError::Validation)?;

        let result = sqlx::query(
            "INSERT INTO wines (name, year, country, type, description) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&wine.name)
        .bind(wine.year)
        .bind(&wine.country)
        .bind(wine.wine_type.as_str())
        .bind(&wine.description)
        .execute(&self.pool)
        .await?;

        Ok(with_id(result.last_insert_rowid(), wine))
    }

    /// Apply `changes` over `existing` and store the result.
    ///
    /// The merged document is validated as a whole, but only the fields present in `changes`
    /// are written, so concurrent updates of other fields are kept. Empty changes return the
    /// record as is without touching the store. `Ok(None)` means the record was removed
    /// before the write.
    pub async fn update_with(
        &self,
        existing: &Wine,
        changes: &Map<String, Value>,
    ) -> Result<Option<Wine>, StoreError> {
        if changes.is_empty() {
            return Ok(Some(existing.clone()));
        }

        let wine = merge_changes(existing, changes).map_err(StoreError::Validation)?;

        if !SCHEMA_FIELDS.iter().any(|field| changes.contains_key(*field)) {
            return self.find_by_id(existing.id).await;
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE wines SET ");
        let mut assignments = builder.separated(", ");
        if changes.contains_key("name") {
            assignments.push("name = ").push_bind_unseparated(wine.name);
        }
        if changes.contains_key("year") {
            assignments.push("year = ").push_bind_unseparated(wine.year);
        }
        if changes.contains_key("country") {
            assignments.push("country = ").push_bind_unseparated(wine.country);
        }
        if changes.contains_key("type") {
            assignments
                .push("type = ")
                .push_bind_unseparated(wine.wine_type.as_str());
        }
        if changes.contains_key("description") {
            assignments
                .push("description = ")
                .push_bind_unseparated(wine.description);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(existing.id);
        builder.push(format!(" RETURNING {}", WINE_COLUMNS));

        let row = builder.build().fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(wine_from_row).transpose()?)
    }

    /// Remove a wine by id, returning the removed record.
    pub async fn find_by_id_and_remove(&self, id: i64) -> Result<Option<Wine>, StoreError> {
        let row = sqlx::query(&format!(
            "DELETE FROM wines WHERE id = ? RETURNING {}",
            WINE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(wine_from_row).transpose()?)
    }
}

fn with_id(id: i64, wine: NewWine) -> Wine {
    Wine {
        id,
        name: wine.name,
        year: wine.year,
        country: wine.country,
        wine_type: wine.wine_type,
        description: wine.description,
    }
}

fn wine_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Wine, sqlx::Error> {
    let type_str: String = row.try_get("type")?;
    let wine_type = WineType::parse(&type_str).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: "type".to_string(),
        source: format!("unknown wine type `{}`", type_str).into(),
    })?;

    Ok(Wine {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        year: row.try_get("year")?,
        country: row.try_get("country")?,
        wine_type,
        description: row.try_get("description")?,
    })
}
