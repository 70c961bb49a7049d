//! Field-keyed validation errors
//!
//! # Example
//!
//! ```rust
//! use labrack::service::ValidationErrors;
//!
//! let mut errors = ValidationErrors::new();
//! errors.add("name", "must not be empty");
//! errors.add("vlanId", "must be between 1 and 4094");
//!
//! assert_eq!(errors.len(), 2);
//! assert_eq!(errors.get("name"), Some("must not be empty"));
//! assert!(errors.into_result().is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One message per invalid field, keyed by the field's wire name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Error map with a single entry
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message for `field`; the first message per field wins
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_insert_with(|| message.into());
    }

    /// Record `message` for `field` unless `valid` holds
    pub fn check(&mut self, valid: bool, field: impl Into<String>, message: impl Into<String>) {
        if !valid {
            self.add(field, message);
        }
    }

    /// Merge another error map under a field prefix (`location.rack`)
    pub fn nest(&mut self, prefix: &str, other: ValidationErrors) {
        for (field, message) in other.fields {
            self.add(format!("{}.{}", prefix, field), message);
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when no field failed
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut errors = Self::new();
        for (field, message) in iter {
            errors.add(field, message);
        }
        errors
    }
}

/// Business-rule validation of a create or update DTO
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}
