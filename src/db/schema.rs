//! Wine schema enforced by the store before any write.
//!
//! A document that fails these checks is never committed. Failures are reported per field,
//! at most one per field, in schema order.

use serde_json::{Map, Value};

use crate::models::{NewWine, Wine, WineType};

/// Why a single field did not satisfy the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Absent, null or empty.
    Required,
    /// Value could not be cast to the field's type.
    Cast,
    /// Number below the allowed minimum.
    Min,
    /// Text outside the allowed set of values.
    Enum,
}

/// Failure descriptor for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    pub path: String,
    pub kind: FailureKind,
    pub message: String,
}

/// All field failures of one rejected document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationFailure {
    pub fields: Vec<FieldFailure>,
}

impl ValidationFailure {
    fn push(&mut self, path: &str, kind: FailureKind, message: impl Into<String>) {
        self.fields.push(FieldFailure {
            path: path.to_string(),
            kind,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<&str> = self.fields.iter().map(|f| f.message.as_str()).collect();
        write!(f, "wine validation failed: {}", messages.join(", "))
    }
}

const YEAR_MIN: i64 = 1;

/// Validate a client document against the wine schema.
///
/// Unknown keys are ignored.
pub fn validate_wine(doc: &Map<String, Value>) -> Result<NewWine, ValidationFailure> {
    let mut failure = ValidationFailure::default();

    let name = required_text(doc, "name", &mut failure);
    let year = required_year(doc, &mut failure);
    let country = required_text(doc, "country", &mut failure);
    let wine_type = required_type(doc, &mut failure);
    let description = optional_text(doc, "description", &mut failure);

    match (name, year, country, wine_type) {
        (Some(name), Some(year), Some(country), Some(wine_type)) if failure.is_empty() => {
            Ok(NewWine {
                name,
                year,
                country,
                wine_type,
                description,
            })
        }
        _ => Err(failure),
    }
}

/// Apply a partial set of changes over an existing wine and validate the result.
pub fn merge_changes(
    existing: &Wine,
    changes: &Map<String, Value>,
) -> Result<NewWine, ValidationFailure> {
    let mut doc = to_document(existing);
    for (key, value) in changes {
        doc.insert(key.clone(), value.clone());
    }
    validate_wine(&doc)
}

fn to_document(wine: &Wine) -> Map<String, Value> {
    let mut doc = Map::new();
    doc.insert("name".into(), Value::String(wine.name.clone()));
    doc.insert("year".into(), Value::from(wine.year));
    doc.insert("country".into(), Value::String(wine.country.clone()));
    doc.insert("type".into(), Value::String(wine.wine_type.as_str().into()));
    if let Some(description) = &wine.description {
        doc.insert("description".into(), Value::String(description.clone()));
    }
    doc
}

/// Cast a JSON value to text. `None` means the value is not castable.
fn cast_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

fn required_text(
    doc: &Map<String, Value>,
    path: &str,
    failure: &mut ValidationFailure,
) -> Option<String> {
    let value = doc.get(path);
    if is_missing(value) {
        failure.push(path, FailureKind::Required, format!("Path `{}` is required.", path));
        return None;
    }
    let text = value.and_then(cast_text);
    if text.is_none() {
        failure.push(path, FailureKind::Cast, format!("Cast to String failed for `{}`", path));
    }
    text
}

fn optional_text(
    doc: &Map<String, Value>,
    path: &str,
    failure: &mut ValidationFailure,
) -> Option<String> {
    match doc.get(path) {
        None | Some(Value::Null) => None,
        Some(value) => {
            let text = cast_text(value);
            if text.is_none() {
                failure.push(path, FailureKind::Cast, format!("Cast to String failed for `{}`", path));
            }
            text
        }
    }
}

fn required_year(doc: &Map<String, Value>, failure: &mut ValidationFailure) -> Option<i64> {
    let value = doc.get("year");
    if is_missing(value) {
        failure.push("year", FailureKind::Required, "Path `year` is required.");
        return None;
    }

    let year = match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match year {
        None => {
            failure.push("year", FailureKind::Cast, "Cast to Number failed for `year`");
            None
        }
        Some(year) if year < YEAR_MIN => {
            failure.push(
                "year",
                FailureKind::Min,
                format!("Path `year` ({}) is less than minimum allowed value ({}).", year, YEAR_MIN),
            );
            None
        }
        Some(year) => Some(year),
    }
}

fn required_type(doc: &Map<String, Value>, failure: &mut ValidationFailure) -> Option<WineType> {
    let text = required_text(doc, "type", failure)?;
    let wine_type = WineType::parse(&text);
    if wine_type.is_none() {
        failure.push(
            "type",
            FailureKind::Enum,
            format!("`{}` is not a valid enum value for path `type`.", text),
        );
    }
    wine_type
}
