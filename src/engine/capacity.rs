//! Capacity validation for a group's membership.
//!
//! The total is recomputed from the supplied snapshot on every call; there is
//! no running sum to keep in step with mutations.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Group, GroupId, StationLoad};

/// Outcome of a successful capacity check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityReport {
    pub group_id: GroupId,
    pub capacity_in_amps: i32,
    pub total_max_current_in_amps: i64,
}

impl CapacityReport {
    /// Amps still available before the group is at capacity
    pub fn headroom_in_amps(&self) -> i64 {
        i64::from(self.capacity_in_amps) - self.total_max_current_in_amps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[error(
    "capacity of group {group_id} exceeded: required >= {required_in_amps}A, got {capacity_in_amps}A"
)]
pub struct CapacityExceeded {
    pub group_id: GroupId,
    /// Sum of connector max currents under the proposed membership
    pub required_in_amps: i64,
    pub capacity_in_amps: i32,
}

/// Sum of `max_current_in_amps` over every connector of every station
pub fn total_max_current(stations: &[StationLoad]) -> i64 {
    stations.iter().map(StationLoad::max_current_in_amps).sum()
}

/// Check `group.capacity_in_amps >= Σ connector.max_current_in_amps`.
///
/// `stations` must be the membership the group would have *after* the
/// mutation under consideration.
pub fn validate_group_capacity(
    group: &Group,
    stations: &[StationLoad],
) -> Result<CapacityReport, CapacityExceeded> {
    let total = total_max_current(stations);

    if i64::from(group.capacity_in_amps) < total {
        return Err(CapacityExceeded {
            group_id: group.id,
            required_in_amps: total,
            capacity_in_amps: group.capacity_in_amps,
        });
    }

    Ok(CapacityReport {
        group_id: group.id,
        capacity_in_amps: group.capacity_in_amps,
        total_max_current_in_amps: total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChargeStation, ChargeStationId, Connector, ConnectorId};
    use rstest::rstest;

    fn group(capacity_in_amps: i32) -> Group {
        Group {
            id: GroupId::new(),
            name: "g".to_string(),
            capacity_in_amps,
        }
    }

    fn station_with(group: &Group, currents: &[i32]) -> StationLoad {
        let station = ChargeStation {
            id: ChargeStationId::new(),
            name: "s".to_string(),
            group_id: group.id,
        };
        let connectors = currents
            .iter()
            .enumerate()
            .map(|(i, amps)| Connector {
                id: ConnectorId::new(),
                charge_station_id: station.id,
                identifier: i as i32 + 1,
                max_current_in_amps: *amps,
            })
            .collect();
        StationLoad::new(station, connectors)
    }

    #[test]
    fn test_empty_group_always_fits() {
        let g = group(1);
        let report = validate_group_capacity(&g, &[]).unwrap();
        assert_eq!(report.total_max_current_in_amps, 0);
        assert_eq!(report.headroom_in_amps(), 1);
    }

    #[rstest]
    #[case(100, &[50, 50], true)]
    #[case(99, &[50, 50], false)]
    #[case(101, &[50, 50], true)]
    #[case(100, &[150], false)]
    #[case(32, &[16, 16], true)]
    fn test_capacity_boundary(#[case] capacity: i32, #[case] currents: &[i32], #[case] ok: bool) {
        let g = group(capacity);
        let stations = vec![station_with(&g, currents)];
        assert_eq!(validate_group_capacity(&g, &stations).is_ok(), ok);
    }

    #[test]
    fn test_sums_across_stations() {
        let g = group(100);
        let stations = vec![station_with(&g, &[40, 20]), station_with(&g, &[41])];

        let err = validate_group_capacity(&g, &stations).unwrap_err();
        assert_eq!(err.required_in_amps, 101);
        assert_eq!(err.capacity_in_amps, 100);
        assert_eq!(err.group_id, g.id);
    }

    #[test]
    fn test_total_does_not_overflow_i32() {
        let g = group(i32::MAX);
        let stations = vec![station_with(&g, &[i32::MAX, i32::MAX])];

        let err = validate_group_capacity(&g, &stations).unwrap_err();
        assert_eq!(err.required_in_amps, 2 * i64::from(i32::MAX));
    }

    #[test]
    fn test_same_snapshot_same_outcome() {
        let g = group(60);
        let stations = vec![station_with(&g, &[32, 32])];

        let first = validate_group_capacity(&g, &stations);
        let second = validate_group_capacity(&g, &stations);
        assert_eq!(first, second);
    }

    #[test]
    fn test_error_message_names_both_figures() {
        let g = group(10);
        let stations = vec![station_with(&g, &[11])];
        let msg = validate_group_capacity(&g, &stations).unwrap_err().to_string();
        assert!(msg.contains("required >= 11A"));
        assert!(msg.contains("got 10A"));
    }
}
