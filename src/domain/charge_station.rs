use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use super::validation::{check_name, FieldChecks};
use super::{ChargeStationId, GroupId};

/// Physical charging unit; always owned by exactly one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeStation {
    pub id: ChargeStationId,
    pub name: String,
    pub group_id: GroupId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChargeStation {
    pub name: String,
    pub group_id: GroupId,
}

/// Rename and/or move a station to another group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeStationUpdate {
    pub name: String,
    pub group_id: GroupId,
}

impl NewChargeStation {
    pub fn into_station(self, id: ChargeStationId) -> ChargeStation {
        ChargeStation {
            id,
            name: self.name,
            group_id: self.group_id,
        }
    }
}

impl ChargeStationUpdate {
    pub fn apply_to(self, id: ChargeStationId) -> ChargeStation {
        ChargeStation {
            id,
            name: self.name,
            group_id: self.group_id,
        }
    }
}

impl Validate for NewChargeStation {
    fn validate(&self) -> Result<(), ValidationErrors> {
        FieldChecks::new().check("name", check_name(&self.name)).finish()
    }
}

impl Validate for ChargeStationUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        FieldChecks::new().check("name", check_name(&self.name)).finish()
    }
}
