use serde::Serialize;
use strum::{AsRefStr, Display, IntoStaticStr};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

use super::capacity::CapacityExceeded;
use super::rules::StructuralViolation;
use crate::domain::validation::first_field_error;
use crate::repo::StoreError;

/// Entity named in a `NotFound` rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum EntityKind {
    #[strum(to_string = "group")]
    Group,
    #[strum(to_string = "charge station")]
    ChargeStation,
    #[strum(to_string = "connector")]
    Connector,
}

/// Taxonomy kind of a rejection, independent of its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr, IntoStaticStr)]
pub enum RejectionKind {
    NotFound,
    InvalidField,
    CapacityExceeded,
    StructuralRuleViolation,
    StorageUnavailable,
}

/// Why a request was rejected. Every variant is request-scoped; a rejected
/// request has left the store untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: Uuid },

    #[error("invalid {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error(transparent)]
    CapacityExceeded(#[from] CapacityExceeded),

    #[error("structural rule violated: {0}")]
    StructuralRuleViolation(#[from] StructuralViolation),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

pub type HierarchyResult<T> = Result<T, HierarchyError>;

impl HierarchyError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            HierarchyError::NotFound { .. } => RejectionKind::NotFound,
            HierarchyError::InvalidField { .. } => RejectionKind::InvalidField,
            HierarchyError::CapacityExceeded(_) => RejectionKind::CapacityExceeded,
            HierarchyError::StructuralRuleViolation(_) => RejectionKind::StructuralRuleViolation,
            HierarchyError::StorageUnavailable(_) => RejectionKind::StorageUnavailable,
        }
    }

    pub fn not_found(entity: EntityKind, id: impl Into<Uuid>) -> Self {
        HierarchyError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        HierarchyError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<ValidationErrors> for HierarchyError {
    fn from(errors: ValidationErrors) -> Self {
        match first_field_error(&errors) {
            Some((field, reason)) => HierarchyError::InvalidField { field, reason },
            None => HierarchyError::invalid_field("input", errors.to_string()),
        }
    }
}

impl From<StoreError> for HierarchyError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::CapacityExceeded(exceeded) => HierarchyError::CapacityExceeded(exceeded),
            other => HierarchyError::StorageUnavailable(other.to_string()),
        }
    }
}
