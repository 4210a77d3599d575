//! Capacity validation engine.
//!
//! [`capacity`] and [`rules`] are pure functions over membership snapshots;
//! [`coordinator`] loads those snapshots from the store and applies the
//! outcome.

pub mod capacity;
pub mod coordinator;
pub mod error;
pub mod rules;

pub use capacity::{total_max_current, validate_group_capacity, CapacityExceeded, CapacityReport};
pub use coordinator::{GroupPermissions, MutationCoordinator, StationPermission};
pub use error::{EntityKind, HierarchyError, HierarchyResult, RejectionKind};
pub use rules::{can_attach_station_to_group, can_detach_station_from_group, Decision, StructuralViolation};
