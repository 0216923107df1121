//! Filter construction for wine listings.
//!
//! `WineQuery` is an owned builder: every criterion consumes the builder and returns it with
//! the criterion applied. Criteria that are absent or malformed leave the filter unchanged.
//! Input is expected to have passed through the sanitizer already; text is matched literally.

use std::collections::BTreeMap;

use super::{StoreError, WineRepository};
use crate::models::{Wine, WineListParams};

/// A value compared for equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
}

/// Match condition for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Case-sensitive, unanchored substring match.
    Contains(String),
    Equals(FilterValue),
}

/// Field name → condition. Empty matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WineFilter {
    conditions: BTreeMap<&'static str, Condition>,
}

impl WineFilter {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&Condition> {
        self.conditions.get(field)
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&'static str, &Condition)> {
        self.conditions.iter().map(|(field, condition)| (*field, condition))
    }

    fn set(&mut self, field: &'static str, condition: Condition) {
        self.conditions.insert(field, condition);
    }
}

/// Builder accumulating list criteria into a `WineFilter`.
#[derive(Debug, Clone, Default)]
pub struct WineQuery {
    filter: WineFilter,
}

impl WineQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a query from the `GET /wines` parameters.
    pub fn from_params(params: &WineListParams) -> Self {
        Self::new()
            .by_name(params.name.as_deref())
            .by_country(params.country.as_deref())
            .by_type(params.wine_type.as_deref())
            .by_year(params.year.as_deref())
    }

    /// Name contains `name`.
    pub fn by_name(mut self, name: Option<&str>) -> Self {
        if let Some(name) = non_empty(name) {
            self.filter.set("name", Condition::Contains(name.to_string()));
        }
        self
    }

    pub fn by_country(mut self, country: Option<&str>) -> Self {
        if let Some(country) = non_empty(country) {
            self.filter
                .set("country", Condition::Equals(FilterValue::Text(country.to_string())));
        }
        self
    }

    /// Exact type match. Unknown types are not rejected here; they match nothing.
    pub fn by_type(mut self, wine_type: Option<&str>) -> Self {
        if let Some(wine_type) = non_empty(wine_type) {
            self.filter
                .set("type", Condition::Equals(FilterValue::Text(wine_type.to_string())));
        }
        self
    }

    /// Exact year match. A year that is not a base-10 integer is ignored; fractions and hex
    /// literals are not truncated or converted.
    pub fn by_year(self, year: Option<&str>) -> Self {
        match year.and_then(|y| y.trim().parse::<i64>().ok()) {
            Some(year) => self.by_year_number(year),
            None => self,
        }
    }

    /// Same as `by_year` for an already numeric year.
    pub fn by_year_number(mut self, year: i64) -> Self {
        self.filter.set("year", Condition::Equals(FilterValue::Integer(year)));
        self
    }

    #[cfg(test)]
    pub fn filter(&self) -> &WineFilter {
        &self.filter
    }

    /// Run the accumulated filter. Does not reset the builder.
    pub async fn find(&self, repo: &WineRepository) -> Result<Vec<Wine>, StoreError> {
        repo.find(&self.filter).await
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
