//! Read-only projections of a group's current membership.
//!
//! These are assembled from the store on every request and handed to the
//! validators; nothing writes through them.

use serde::Serialize;

use super::{ChargeStation, Connector, Group};

/// A station together with every connector it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationLoad {
    pub station: ChargeStation,
    pub connectors: Vec<Connector>,
}

impl StationLoad {
    pub fn new(station: ChargeStation, connectors: Vec<Connector>) -> Self {
        Self {
            station,
            connectors,
        }
    }

    /// Sum of the station's connector max currents
    pub fn max_current_in_amps(&self) -> i64 {
        self.connectors
            .iter()
            .map(|c| i64::from(c.max_current_in_amps))
            .sum()
    }
}

/// A group with its stations and their connectors, in creation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupTree {
    pub group: Group,
    pub stations: Vec<StationLoad>,
}

impl GroupTree {
    pub fn connector_count(&self) -> usize {
        self.stations.iter().map(|s| s.connectors.len()).sum()
    }
}
