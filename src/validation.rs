//! Validation Support
//!
//! Request bodies reach the linker as raw JSON. Before anything touches
//! storage the body is checked against a small set of field rules through a
//! [`Validator`]. The default [`JsonValidator`] understands the rules the
//! linker needs; hosts can plug in their own implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use crudlink::validation::{JsonValidator, Rule, Validator};
//!
//! let body = serde_json::json!({ "items": [1, 2] });
//! JsonValidator.validate(&body, &[("items", &[Rule::Required, Rule::Array])])?;
//! ```

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Validation error with field name and message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create a new empty validation errors collection
    #[must_use]
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add a validation error
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Group messages by field, the shape sent back to callers
    #[must_use]
    pub fn fields(&self) -> BTreeMap<String, Vec<String>> {
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for error in &self.errors {
            fields
                .entry(error.field.clone())
                .or_default()
                .push(error.message.clone());
        }
        fields
    }

    /// Convert to Result
    ///
    /// # Errors
    /// Returns `Err(self)` when at least one error was collected.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields().serialize(serializer)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Field rules understood by [`JsonValidator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Field must be present and not `null`
    Required,
    /// Field, when present, must be a JSON array
    Array,
}

/// Checks a request body against per-field rules
pub trait Validator: Send + Sync {
    /// Validate `payload` against `rules`
    ///
    /// # Errors
    /// Returns every rule violation found, grouped per field by the caller.
    fn validate(&self, payload: &Value, rules: &[(&str, &[Rule])]) -> Result<(), ValidationErrors>;
}

/// Default validator over `serde_json::Value` bodies
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonValidator;

impl Validator for JsonValidator {
    fn validate(&self, payload: &Value, rules: &[(&str, &[Rule])]) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for (field, field_rules) in rules {
            let value = payload.get(*field).filter(|value| !value.is_null());

            for rule in *field_rules {
                match (rule, value) {
                    (Rule::Required, None) => {
                        errors.add(ValidationError::new(
                            *field,
                            format!("The {field} field is required."),
                        ));
                        // Remaining rules only make sense for a present value
                        break;
                    }
                    (Rule::Array, Some(value)) if !value.is_array() => {
                        errors.add(ValidationError::new(
                            *field,
                            format!("The {field} must be an array."),
                        ));
                    }
                    _ => {}
                }
            }
        }

        errors.result()
    }
}
