//! Membership rules for attaching and detaching charge stations.
//!
//! Both rules take the current membership the caller loaded from the store.
//! They are independent of the capacity check; a structural change must pass
//! both.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ChargeStation, Connector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum StructuralViolation {
    #[error("group already has a charge station")]
    GroupAlreadyHasStation,
    #[error("charge station still has connectors")]
    StationHasConnectors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Allowed,
    Denied(StructuralViolation),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn into_result(self) -> Result<(), StructuralViolation> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(violation) => Err(violation),
        }
    }
}

/// A station may only be attached to a group that owns no stations yet.
///
/// This one-station-per-group cardinality is kept exactly as the product
/// defines it today even though groups can otherwise hold many stations.
pub fn can_attach_station_to_group(stations_in_group: &[ChargeStation]) -> Decision {
    if stations_in_group.is_empty() {
        Decision::Allowed
    } else {
        Decision::Denied(StructuralViolation::GroupAlreadyHasStation)
    }
}

/// A station may only be detached once it owns no connectors
pub fn can_detach_station_from_group(connectors_of_station: &[Connector]) -> Decision {
    if connectors_of_station.is_empty() {
        Decision::Allowed
    } else {
        Decision::Denied(StructuralViolation::StationHasConnectors)
    }
}
