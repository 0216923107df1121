//! Wine model and request parameter types.

use serde::{Deserialize, Serialize};

/// The closed set of wine types the store accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WineType {
    Red,
    White,
    Rose,
}

impl WineType {
    pub const ALL: [WineType; 3] = [WineType::Red, WineType::White, WineType::Rose];

    pub fn as_str(&self) -> &'static str {
        match self {
            WineType::Red => "red",
            WineType::White => "white",
            WineType::Rose => "rose",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// A persisted wine record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Wine {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub country: String,
    #[serde(rename = "type")]
    pub wine_type: WineType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A wine that passed schema validation and has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWine {
    pub name: String,
    pub year: i64,
    pub country: String,
    pub wine_type: WineType,
    pub description: Option<String>,
}

/// Query parameters accepted by `GET /wines`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WineListParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, rename = "type")]
    pub wine_type: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

/// Body of a successful delete.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}
