//! Translation of store validation failures into the client-facing error shape.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::AppError;
use crate::db::{FailureKind, StoreError, ValidationFailure};

/// Client-facing reason for a rejected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldReason {
    Missing,
    Invalid,
}

impl FieldReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldReason::Missing => "MISSING",
            FieldReason::Invalid => "INVALID",
        }
    }
}

impl From<FailureKind> for FieldReason {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Required => FieldReason::Missing,
            FailureKind::Cast | FailureKind::Min | FailureKind::Enum => FieldReason::Invalid,
        }
    }
}

/// Failing field → reason, in the order the store reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: Vec<(String, FieldReason)>,
}

impl ValidationErrors {
    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<FieldReason> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, reason)| *reason)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    fn insert(&mut self, field: &str, reason: FieldReason) {
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some(entry) => entry.1 = reason,
            None => self.fields.push((field.to_string(), reason)),
        }
    }
}

impl From<&ValidationFailure> for ValidationErrors {
    fn from(failure: &ValidationFailure) -> Self {
        let mut errors = ValidationErrors::default();
        for field in &failure.fields {
            errors.insert(&field.path, field.kind.into());
        }
        errors
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, reason) in &self.fields {
            map.serialize_entry(field, reason.as_str())?;
        }
        map.end()
    }
}

/// Turn a store validation failure into `AppError::Validation`; any other error passes
/// through unchanged.
pub fn convert_to_validation_error(err: StoreError) -> AppError {
    match err {
        StoreError::Validation(failure) => AppError::Validation((&failure).into()),
        other => other.into(),
    }
}
