//! Field predicates for the input records.
//!
//! Each `New*`/`*Update` record implements [`validator::Validate`] by calling
//! these predicates directly, so a request is checked synchronously before it
//! ever reaches the coordinator.

use std::borrow::Cow;
use std::ops::RangeInclusive;
use validator::{ValidationError, ValidationErrors};

/// Outlet numbers a connector may carry on its station
pub const CONNECTOR_IDENTIFIER_RANGE: RangeInclusive<i32> = 1..=5;

fn error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Owned(message));
    err
}

/// Names must contain something other than whitespace
pub fn check_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(error("required", "name must not be empty".to_string()));
    }
    Ok(())
}

/// Capacity and max current are both strictly positive amp values
pub fn check_positive_amps(value: i32) -> Result<(), ValidationError> {
    if value <= 0 {
        let mut err = error("range", format!("must be greater than zero, got {value}"));
        err.add_param(Cow::Borrowed("value"), &value);
        return Err(err);
    }
    Ok(())
}

pub fn check_connector_identifier(identifier: i32) -> Result<(), ValidationError> {
    if !CONNECTOR_IDENTIFIER_RANGE.contains(&identifier) {
        let mut err = error(
            "range",
            format!(
                "must be between {} and {}, got {identifier}",
                CONNECTOR_IDENTIFIER_RANGE.start(),
                CONNECTOR_IDENTIFIER_RANGE.end()
            ),
        );
        err.add_param(Cow::Borrowed("value"), &identifier);
        return Err(err);
    }
    Ok(())
}

/// Collects predicate outcomes into a `ValidationErrors` set
#[derive(Debug, Default)]
pub(crate) struct FieldChecks {
    errors: ValidationErrors,
}

impl FieldChecks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn check(mut self, field: &'static str, outcome: Result<(), ValidationError>) -> Self {
        if let Err(err) = outcome {
            self.errors.add(field, err);
        }
        self
    }

    pub(crate) fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// First offending field (in field-name order) and its message
pub fn first_field_error(errors: &ValidationErrors) -> Option<(String, String)> {
    let mut fields: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            errs.first().map(|err| {
                let reason = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                (field.to_string(), reason)
            })
        })
        .collect();
    fields.sort();
    fields.into_iter().next()
}
