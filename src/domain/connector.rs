use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use super::validation::{check_connector_identifier, check_positive_amps, FieldChecks};
use super::{ChargeStationId, ConnectorId};

/// A single charging outlet on a charge station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub id: ConnectorId,
    pub charge_station_id: ChargeStationId,
    /// Outlet number on the station, 1 through 5
    pub identifier: i32,
    pub max_current_in_amps: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConnector {
    pub charge_station_id: ChargeStationId,
    pub identifier: i32,
    pub max_current_in_amps: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorUpdate {
    pub charge_station_id: ChargeStationId,
    pub identifier: i32,
    pub max_current_in_amps: i32,
}

impl NewConnector {
    pub fn into_connector(self, id: ConnectorId) -> Connector {
        Connector {
            id,
            charge_station_id: self.charge_station_id,
            identifier: self.identifier,
            max_current_in_amps: self.max_current_in_amps,
        }
    }
}

impl ConnectorUpdate {
    pub fn apply_to(self, id: ConnectorId) -> Connector {
        Connector {
            id,
            charge_station_id: self.charge_station_id,
            identifier: self.identifier,
            max_current_in_amps: self.max_current_in_amps,
        }
    }
}

fn check_connector_fields(identifier: i32, max_current_in_amps: i32) -> Result<(), ValidationErrors> {
    FieldChecks::new()
        .check("identifier", check_connector_identifier(identifier))
        .check("max_current_in_amps", check_positive_amps(max_current_in_amps))
        .finish()
}

impl Validate for NewConnector {
    fn validate(&self) -> Result<(), ValidationErrors> {
        check_connector_fields(self.identifier, self.max_current_in_amps)
    }
}

impl Validate for ConnectorUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        check_connector_fields(self.identifier, self.max_current_in_amps)
    }
}
