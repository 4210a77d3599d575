use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use super::validation::{check_name, check_positive_amps, FieldChecks};
use super::GroupId;

/// Top-level capacity allocation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// Rated capacity shared by every connector under the group
    pub capacity_in_amps: i32,
}

/// Input for creating a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub capacity_in_amps: i32,
}

/// Full replacement of a group's editable fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupUpdate {
    pub name: String,
    pub capacity_in_amps: i32,
}

impl NewGroup {
    pub fn into_group(self, id: GroupId) -> Group {
        Group {
            id,
            name: self.name,
            capacity_in_amps: self.capacity_in_amps,
        }
    }
}

impl GroupUpdate {
    pub fn apply_to(self, id: GroupId) -> Group {
        Group {
            id,
            name: self.name,
            capacity_in_amps: self.capacity_in_amps,
        }
    }
}

fn check_group_fields(name: &str, capacity_in_amps: i32) -> Result<(), ValidationErrors> {
    FieldChecks::new()
        .check("name", check_name(name))
        .check("capacity_in_amps", check_positive_amps(capacity_in_amps))
        .finish()
}

impl Validate for NewGroup {
    fn validate(&self) -> Result<(), ValidationErrors> {
        check_group_fields(&self.name, self.capacity_in_amps)
    }
}

impl Validate for GroupUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        check_group_fields(&self.name, self.capacity_in_amps)
    }
}
