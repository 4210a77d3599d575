//! End-to-end behaviour of the mutation coordinator against the in-memory store.

use std::sync::Arc;

use charging_capacity::config::RulesConfig;
use charging_capacity::domain::{
    ChargeStation, ChargeStationId, ChargeStationUpdate, Connector, ConnectorId, ConnectorUpdate,
    Group, GroupId, GroupUpdate, NewChargeStation, NewConnector, NewGroup,
};
use charging_capacity::engine::{
    Decision, HierarchyError, MutationCoordinator, RejectionKind, StructuralViolation,
};
use charging_capacity::repo::{HierarchyStore, InMemoryStore};

struct Harness {
    store: Arc<InMemoryStore>,
    coordinator: MutationCoordinator,
}

impl Harness {
    fn new() -> Self {
        Self::with_rules(RulesConfig::default())
    }

    fn with_rules(rules: RulesConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let coordinator = MutationCoordinator::new(store.clone() as Arc<dyn HierarchyStore>, rules);
        Self { store, coordinator }
    }

    async fn group(&self, capacity_in_amps: i32) -> Group {
        self.coordinator
            .create_group(NewGroup {
                name: "Depot".to_string(),
                capacity_in_amps,
            })
            .await
            .unwrap()
    }

    async fn station(&self, group: &Group) -> ChargeStation {
        self.coordinator
            .create_charge_station(NewChargeStation {
                name: "Bay".to_string(),
                group_id: group.id,
            })
            .await
            .unwrap()
    }

    async fn connector(
        &self,
        station: &ChargeStation,
        identifier: i32,
        max_current_in_amps: i32,
    ) -> Result<Connector, HierarchyError> {
        self.coordinator
            .create_connector(NewConnector {
                charge_station_id: station.id,
                identifier,
                max_current_in_amps,
            })
            .await
    }
}

#[tokio::test]
async fn scenario_a_connector_over_capacity_is_rejected() {
    let h = Harness::new();
    let group = h.group(100).await;
    let station = h.station(&group).await;
    let before = h.store.snapshot();

    let err = h.connector(&station, 1, 150).await.unwrap_err();

    match err {
        HierarchyError::CapacityExceeded(exceeded) => {
            assert_eq!(exceeded.required_in_amps, 150);
            assert_eq!(exceeded.capacity_in_amps, 100);
            assert_eq!(exceeded.group_id, group.id);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.store.snapshot(), before);
}

#[tokio::test]
async fn scenario_b_second_station_cannot_be_attached() {
    let h = Harness::new();
    let group = h.group(100).await;
    let first = h
        .coordinator
        .attach_charge_station(NewChargeStation {
            name: "First".to_string(),
            group_id: group.id,
        })
        .await
        .unwrap();
    h.connector(&first, 1, 100).await.unwrap();
    let before = h.store.snapshot();

    let err = h
        .coordinator
        .attach_charge_station(NewChargeStation {
            name: "Second".to_string(),
            group_id: group.id,
        })
        .await
        .unwrap_err();

    assert_eq!(
        err,
        HierarchyError::StructuralRuleViolation(StructuralViolation::GroupAlreadyHasStation)
    );
    assert_eq!(h.store.snapshot(), before);
}

#[tokio::test]
async fn scenario_c_detach_requires_empty_station() {
    let h = Harness::new();
    let group = h.group(100).await;
    let station = h.station(&group).await;
    let connector = h.connector(&station, 1, 32).await.unwrap();

    let err = h
        .coordinator
        .detach_charge_station(&station.id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        HierarchyError::StructuralRuleViolation(StructuralViolation::StationHasConnectors)
    );
    assert_eq!(h.store.snapshot().charge_stations, vec![station.clone()]);

    h.coordinator.delete_connector(&connector.id).await.unwrap();
    h.coordinator.detach_charge_station(&station.id).await.unwrap();

    assert!(h.store.snapshot().charge_stations.is_empty());
    assert_eq!(h.store.snapshot().groups, vec![group]);
}

#[tokio::test]
async fn scenario_d_identifier_out_of_range_is_invalid_field() {
    let h = Harness::new();
    let group = h.group(100).await;
    let station = h.station(&group).await;

    let err = h.connector(&station, 6, 10).await.unwrap_err();

    assert_eq!(err.kind(), RejectionKind::InvalidField);
    match err {
        HierarchyError::InvalidField { field, .. } => assert_eq!(field, "identifier"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.store.snapshot().connectors.is_empty());
}

#[tokio::test]
async fn scenario_e_group_delete_cascades() {
    let h = Harness::new();
    let group = h.group(100).await;
    let other = h.group(50).await;
    let a = h.station(&group).await;
    let b = h.station(&group).await;
    h.connector(&a, 1, 10).await.unwrap();
    h.connector(&a, 2, 10).await.unwrap();
    h.connector(&b, 1, 10).await.unwrap();
    let survivor = h.station(&other).await;
    let kept = h.connector(&survivor, 1, 5).await.unwrap();

    h.coordinator.delete_group(&group.id).await.unwrap();

    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.groups, vec![other]);
    assert_eq!(snapshot.charge_stations, vec![survivor]);
    assert_eq!(snapshot.connectors, vec![kept]);
}

#[tokio::test]
async fn capacity_equal_to_total_is_accepted() {
    let h = Harness::new();
    let group = h.group(100).await;
    let station = h.station(&group).await;
    h.connector(&station, 1, 60).await.unwrap();
    h.connector(&station, 2, 40).await.unwrap();

    let report = h.coordinator.check_group_capacity(&group.id).await.unwrap();
    assert_eq!(report.total_max_current_in_amps, 100);
    assert_eq!(report.headroom_in_amps(), 0);

    let err = h
        .coordinator
        .update_group(
            &group.id,
            GroupUpdate {
                name: "Depot".to_string(),
                capacity_in_amps: 99,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RejectionKind::CapacityExceeded);

    let updated = h
        .coordinator
        .update_group(
            &group.id,
            GroupUpdate {
                name: "Depot".to_string(),
                capacity_in_amps: 100,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.capacity_in_amps, 100);
}

#[tokio::test]
async fn raising_connector_current_rechecks_capacity() {
    let h = Harness::new();
    let group = h.group(50).await;
    let station = h.station(&group).await;
    let connector = h.connector(&station, 1, 20).await.unwrap();
    h.connector(&station, 2, 20).await.unwrap();

    // 30 + 20 fits: the old 20A value is replaced, not added to.
    let updated = h
        .coordinator
        .update_connector(
            &connector.id,
            ConnectorUpdate {
                charge_station_id: station.id,
                identifier: 1,
                max_current_in_amps: 30,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.max_current_in_amps, 30);

    let err = h
        .coordinator
        .update_connector(
            &connector.id,
            ConnectorUpdate {
                charge_station_id: station.id,
                identifier: 1,
                max_current_in_amps: 31,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RejectionKind::CapacityExceeded);
}

#[tokio::test]
async fn moving_connector_checks_target_group() {
    let h = Harness::new();
    let roomy = h.group(100).await;
    let tight = h.group(10).await;
    let source = h.station(&roomy).await;
    let target = h.station(&tight).await;
    let connector = h.connector(&source, 1, 16).await.unwrap();
    let before = h.store.snapshot();

    let err = h
        .coordinator
        .update_connector(
            &connector.id,
            ConnectorUpdate {
                charge_station_id: target.id,
                identifier: 1,
                max_current_in_amps: 16,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), RejectionKind::CapacityExceeded);
    assert_eq!(h.store.snapshot(), before);
}

#[tokio::test]
async fn moving_station_carries_its_connectors() {
    let h = Harness::new();
    let from = h.group(100).await;
    let to = h.group(40).await;
    let resident = h.station(&to).await;
    h.connector(&resident, 1, 20).await.unwrap();
    let mover = h.station(&from).await;
    h.connector(&mover, 1, 21).await.unwrap();

    let err = h
        .coordinator
        .update_charge_station(
            &mover.id,
            ChargeStationUpdate {
                name: mover.name.clone(),
                group_id: to.id,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RejectionKind::CapacityExceeded);

    // Renaming in place never touches capacity.
    let renamed = h
        .coordinator
        .update_charge_station(
            &mover.id,
            ChargeStationUpdate {
                name: "Renamed".to_string(),
                group_id: from.id,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Renamed");
}

#[tokio::test]
async fn plain_create_and_delete_bypass_structural_rules() {
    let h = Harness::new();
    let group = h.group(100).await;
    let first = h.station(&group).await;
    h.station(&group).await;
    h.connector(&first, 1, 10).await.unwrap();

    h.coordinator.delete_charge_station(&first.id).await.unwrap();

    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.charge_stations.len(), 1);
    assert!(snapshot.connectors.is_empty());
}

#[tokio::test]
async fn missing_parents_are_not_found() {
    let h = Harness::new();

    let err = h
        .coordinator
        .create_charge_station(NewChargeStation {
            name: "Orphan".to_string(),
            group_id: GroupId::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RejectionKind::NotFound);

    let err = h
        .coordinator
        .create_connector(NewConnector {
            charge_station_id: ChargeStationId::new(),
            identifier: 1,
            max_current_in_amps: 10,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RejectionKind::NotFound);

    let err = h
        .coordinator
        .delete_connector(&ConnectorId::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RejectionKind::NotFound);

    assert_eq!(h.store.snapshot(), Default::default());
}

#[tokio::test]
async fn invalid_group_fields_are_rejected() {
    let h = Harness::new();

    let err = h
        .coordinator
        .create_group(NewGroup {
            name: "Depot".to_string(),
            capacity_in_amps: 0,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), RejectionKind::InvalidField);

    let err = h
        .coordinator
        .create_group(NewGroup {
            name: " ".to_string(),
            capacity_in_amps: 10,
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        HierarchyError::InvalidField {
            field: "name".to_string(),
            reason: "name must not be empty".to_string(),
        }
    );
}

#[tokio::test]
async fn duplicate_identifiers_are_accepted_by_default() {
    let h = Harness::new();
    let group = h.group(100).await;
    let station = h.station(&group).await;
    h.connector(&station, 1, 10).await.unwrap();

    assert!(h.connector(&station, 1, 10).await.is_ok());
}

#[tokio::test]
async fn duplicate_identifiers_rejected_when_configured() {
    let h = Harness::with_rules(RulesConfig {
        unique_connector_identifiers: true,
    });
    let group = h.group(100).await;
    let station = h.station(&group).await;
    let first = h.connector(&station, 1, 10).await.unwrap();

    let err = h.connector(&station, 1, 10).await.unwrap_err();
    assert_eq!(err.kind(), RejectionKind::InvalidField);

    // Re-saving a connector with its own identifier is not a duplicate.
    h.coordinator
        .update_connector(
            &first.id,
            ConnectorUpdate {
                charge_station_id: station.id,
                identifier: 1,
                max_current_in_amps: 12,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn permissions_reflect_current_membership() {
    let h = Harness::new();
    let group = h.group(100).await;

    let empty = h.coordinator.group_permissions(&group.id).await.unwrap();
    assert_eq!(empty.attach, Decision::Allowed);
    assert!(empty.stations.is_empty());

    let station = h.station(&group).await;
    h.connector(&station, 1, 10).await.unwrap();

    let permissions = h.coordinator.group_permissions(&group.id).await.unwrap();
    assert_eq!(
        permissions.attach,
        Decision::Denied(StructuralViolation::GroupAlreadyHasStation)
    );
    assert_eq!(permissions.stations.len(), 1);
    assert_eq!(permissions.stations[0].charge_station_id, station.id);
    assert_eq!(
        permissions.stations[0].detach,
        Decision::Denied(StructuralViolation::StationHasConnectors)
    );
}

#[tokio::test]
async fn group_tree_lists_members_in_creation_order() {
    let h = Harness::new();
    let group = h.group(100).await;
    let a = h.station(&group).await;
    let b = h.station(&group).await;
    h.connector(&b, 1, 10).await.unwrap();

    let tree = h.coordinator.group_tree(&group.id).await.unwrap();
    assert_eq!(tree.group, group);
    let ids: Vec<_> = tree.stations.iter().map(|s| s.station.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
    assert_eq!(tree.connector_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_connector_creates_never_overfill_a_group() {
    let h = Harness::new();
    let group = h.group(100).await;
    let station = h.station(&group).await;

    // A second coordinator over the same store has its own write gate, as a
    // second service instance would.
    let store = h.store.clone() as Arc<dyn HierarchyStore>;
    let coordinators = [
        Arc::new(MutationCoordinator::new(store.clone(), RulesConfig::default())),
        Arc::new(MutationCoordinator::new(store, RulesConfig::default())),
    ];

    let station_id = station.id;
    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let coordinator = coordinators[i % 2].clone();
            tokio::spawn(async move {
                coordinator
                    .create_connector(NewConnector {
                        charge_station_id: station_id,
                        identifier: 1,
                        max_current_in_amps: 30,
                    })
                    .await
            })
        })
        .collect();

    let mut accepted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(err) => assert_eq!(err.kind(), RejectionKind::CapacityExceeded),
        }
    }

    assert_eq!(accepted, 3);
    let report = h.coordinator.check_group_capacity(&group.id).await.unwrap();
    assert_eq!(report.total_max_current_in_amps, 90);
}

#[tokio::test]
async fn concurrent_creates_on_one_coordinator_are_serialized() {
    let h = Harness::new();
    let group = h.group(50).await;
    let station = h.station(&group).await;

    let (first, second) = tokio::join!(
        h.connector(&station, 1, 30),
        h.connector(&station, 2, 30),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(HierarchyError::CapacityExceeded(_)))));
    assert_eq!(h.store.snapshot().connectors.len(), 1);
}
