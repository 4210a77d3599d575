//! Request orchestration: load current state, decide, then commit or reject.
//!
//! Every mutation runs its reads, validation and commit while holding the
//! write gate, and sends all of its writes to the store as one [`ChangeSet`].
//! A rejected request never reaches `commit`.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use validator::Validate;

use super::capacity::{validate_group_capacity, CapacityReport};
use super::error::{EntityKind, HierarchyError, HierarchyResult};
use super::rules::{can_attach_station_to_group, can_detach_station_from_group, Decision};
use crate::config::RulesConfig;
use crate::domain::{
    ChargeStation, ChargeStationId, ChargeStationUpdate, Connector, ConnectorId,
    ConnectorUpdate, Group, GroupId, GroupTree, GroupUpdate, NewChargeStation, NewConnector,
    NewGroup, StationLoad,
};
use crate::repo::{ChangeSet, HierarchyStore, StoreError, Write};

/// Detach decision for one station of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationPermission {
    pub charge_station_id: ChargeStationId,
    pub detach: Decision,
}

/// Which structural changes a group currently admits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupPermissions {
    pub group_id: GroupId,
    pub attach: Decision,
    pub stations: Vec<StationPermission>,
}

pub struct MutationCoordinator {
    store: Arc<dyn HierarchyStore>,
    rules: RulesConfig,
    write_gate: Mutex<()>,
}

fn check_input<T: Validate>(input: &T) -> HierarchyResult<()> {
    input.validate().map_err(|errors| {
        let err = HierarchyError::from(errors);
        debug!(error = %err, "input rejected");
        err
    })
}

/// Membership with `connector` in place of any earlier version of itself
fn place_connector(loads: &mut [StationLoad], connector: &Connector) {
    for load in loads.iter_mut() {
        load.connectors.retain(|c| c.id != connector.id);
        if load.station.id == connector.charge_station_id {
            load.connectors.push(connector.clone());
        }
    }
}

impl MutationCoordinator {
    pub fn new(store: Arc<dyn HierarchyStore>, rules: RulesConfig) -> Self {
        Self {
            store,
            rules,
            write_gate: Mutex::new(()),
        }
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    async fn require_group(&self, id: &GroupId) -> HierarchyResult<Group> {
        self.store
            .get_group(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(EntityKind::Group, *id))
    }

    async fn require_charge_station(&self, id: &ChargeStationId) -> HierarchyResult<ChargeStation> {
        self.store
            .get_charge_station(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(EntityKind::ChargeStation, *id))
    }

    async fn require_connector(&self, id: &ConnectorId) -> HierarchyResult<Connector> {
        self.store
            .get_connector(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(EntityKind::Connector, *id))
    }

    /// Current membership of a group, re-read from the store
    async fn load_station_loads(&self, group_id: &GroupId) -> HierarchyResult<Vec<StationLoad>> {
        let stations = self.store.get_charge_stations_by_group(group_id).await?;
        let mut loads = Vec::with_capacity(stations.len());
        for station in stations {
            let connectors = self.store.get_connectors_by_station(&station.id).await?;
            loads.push(StationLoad::new(station, connectors));
        }
        Ok(loads)
    }

    fn ensure_capacity(&self, group: &Group, loads: &[StationLoad]) -> HierarchyResult<CapacityReport> {
        validate_group_capacity(group, loads).map_err(|exceeded| {
            warn!(
                group_id = %group.id,
                capacity_in_amps = exceeded.capacity_in_amps,
                required_in_amps = exceeded.required_in_amps,
                "capacity check rejected change"
            );
            HierarchyError::from(exceeded)
        })
    }

    fn ensure_decision(&self, decision: Decision) -> HierarchyResult<()> {
        decision.into_result().map_err(|violation| {
            warn!(rule = %violation, "structural rule rejected change");
            HierarchyError::from(violation)
        })
    }

    /// Duplicate identifiers on one station are logged, or rejected when
    /// `rules.unique_connector_identifiers` is set.
    fn check_identifier(&self, loads: &[StationLoad], connector: &Connector) -> HierarchyResult<()> {
        let duplicate = loads
            .iter()
            .filter(|l| l.station.id == connector.charge_station_id)
            .flat_map(|l| l.connectors.iter())
            .any(|c| c.id != connector.id && c.identifier == connector.identifier);

        if !duplicate {
            return Ok(());
        }

        if self.rules.unique_connector_identifiers {
            debug!(
                charge_station_id = %connector.charge_station_id,
                identifier = connector.identifier,
                "duplicate connector identifier rejected"
            );
            return Err(HierarchyError::invalid_field(
                "identifier",
                format!(
                    "identifier {} is already used on charge station {}",
                    connector.identifier, connector.charge_station_id
                ),
            ));
        }

        warn!(
            charge_station_id = %connector.charge_station_id,
            identifier = connector.identifier,
            "duplicate connector identifier on charge station"
        );
        Ok(())
    }

    async fn commit(&self, changes: ChangeSet) -> HierarchyResult<()> {
        let writes = changes.len();
        self.store.commit(changes).await.map_err(|e| {
            match &e {
                StoreError::CapacityExceeded(exceeded) => warn!(
                    group_id = %exceeded.group_id,
                    capacity_in_amps = exceeded.capacity_in_amps,
                    required_in_amps = exceeded.required_in_amps,
                    "commit refused, membership changed concurrently"
                ),
                _ => error!(error = %e, writes, "commit failed"),
            }
            HierarchyError::from(e)
        })
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn list_groups(&self) -> HierarchyResult<Vec<Group>> {
        Ok(self.store.list_groups().await?)
    }

    pub async fn group_tree(&self, id: &GroupId) -> HierarchyResult<GroupTree> {
        let group = self.require_group(id).await?;
        let stations = self.load_station_loads(id).await?;
        Ok(GroupTree { group, stations })
    }

    pub async fn list_charge_stations(&self) -> HierarchyResult<Vec<ChargeStation>> {
        Ok(self.store.list_charge_stations().await?)
    }

    pub async fn get_charge_station(&self, id: &ChargeStationId) -> HierarchyResult<StationLoad> {
        let station = self.require_charge_station(id).await?;
        let connectors = self.store.get_connectors_by_station(id).await?;
        Ok(StationLoad::new(station, connectors))
    }

    pub async fn list_connectors(&self) -> HierarchyResult<Vec<Connector>> {
        Ok(self.store.list_connectors().await?)
    }

    pub async fn get_connector(&self, id: &ConnectorId) -> HierarchyResult<Connector> {
        self.require_connector(id).await
    }

    /// Run the capacity validator against the group's current membership
    pub async fn check_group_capacity(&self, id: &GroupId) -> HierarchyResult<CapacityReport> {
        let tree = self.group_tree(id).await?;
        self.ensure_capacity(&tree.group, &tree.stations)
    }

    pub async fn group_permissions(&self, id: &GroupId) -> HierarchyResult<GroupPermissions> {
        let tree = self.group_tree(id).await?;
        let stations: Vec<ChargeStation> = tree.stations.iter().map(|l| l.station.clone()).collect();

        Ok(GroupPermissions {
            group_id: tree.group.id,
            attach: can_attach_station_to_group(&stations),
            stations: tree
                .stations
                .iter()
                .map(|l| StationPermission {
                    charge_station_id: l.station.id,
                    detach: can_detach_station_from_group(&l.connectors),
                })
                .collect(),
        })
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    pub async fn create_group(&self, input: NewGroup) -> HierarchyResult<Group> {
        check_input(&input)?;
        let _gate = self.write_gate.lock().await;

        let group = input.into_group(GroupId::new());
        self.ensure_capacity(&group, &[])?;
        self.commit(ChangeSet::new().with(Write::PutGroup(group.clone())))
            .await?;

        info!(group_id = %group.id, capacity_in_amps = group.capacity_in_amps, "group created");
        Ok(group)
    }

    pub async fn update_group(&self, id: &GroupId, input: GroupUpdate) -> HierarchyResult<Group> {
        check_input(&input)?;
        let _gate = self.write_gate.lock().await;

        self.require_group(id).await?;
        let loads = self.load_station_loads(id).await?;
        let group = input.apply_to(*id);
        let report = self.ensure_capacity(&group, &loads)?;
        self.commit(ChangeSet::new().with(Write::PutGroup(group.clone())))
            .await?;

        info!(
            group_id = %group.id,
            capacity_in_amps = group.capacity_in_amps,
            headroom_in_amps = report.headroom_in_amps(),
            "group updated"
        );
        Ok(group)
    }

    /// Removes the group with all of its stations and their connectors
    pub async fn delete_group(&self, id: &GroupId) -> HierarchyResult<()> {
        let _gate = self.write_gate.lock().await;

        self.require_group(id).await?;
        let loads = self.load_station_loads(id).await?;

        let mut changes = ChangeSet::new();
        for load in &loads {
            for connector in &load.connectors {
                changes.push(Write::DeleteConnector(connector.id));
            }
        }
        for load in &loads {
            changes.push(Write::DeleteChargeStation(load.station.id));
        }
        changes.push(Write::DeleteGroup(*id));

        let connectors: usize = loads.iter().map(|l| l.connectors.len()).sum();
        self.commit(changes).await?;

        info!(
            group_id = %id,
            charge_stations = loads.len(),
            connectors,
            "group deleted"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Charge stations
    // ------------------------------------------------------------------

    pub async fn create_charge_station(&self, input: NewChargeStation) -> HierarchyResult<ChargeStation> {
        check_input(&input)?;
        let _gate = self.write_gate.lock().await;

        self.require_group(&input.group_id).await?;
        let station = input.into_station(ChargeStationId::new());
        self.commit(ChangeSet::new().with(Write::PutChargeStation(station.clone())))
            .await?;

        info!(charge_station_id = %station.id, group_id = %station.group_id, "charge station created");
        Ok(station)
    }

    /// Structural add: only allowed while the group owns no station
    pub async fn attach_charge_station(&self, input: NewChargeStation) -> HierarchyResult<ChargeStation> {
        check_input(&input)?;
        let _gate = self.write_gate.lock().await;

        self.require_group(&input.group_id).await?;
        let existing = self.store.get_charge_stations_by_group(&input.group_id).await?;
        self.ensure_decision(can_attach_station_to_group(&existing))?;

        let station = input.into_station(ChargeStationId::new());
        self.commit(ChangeSet::new().with(Write::PutChargeStation(station.clone())))
            .await?;

        info!(charge_station_id = %station.id, group_id = %station.group_id, "charge station attached");
        Ok(station)
    }

    pub async fn update_charge_station(
        &self,
        id: &ChargeStationId,
        input: ChargeStationUpdate,
    ) -> HierarchyResult<ChargeStation> {
        check_input(&input)?;
        let _gate = self.write_gate.lock().await;

        let current = self.require_charge_station(id).await?;
        let target = self.require_group(&input.group_id).await?;
        let station = input.apply_to(*id);

        if current.group_id != station.group_id {
            let connectors = self.store.get_connectors_by_station(id).await?;
            let mut loads = self.load_station_loads(&target.id).await?;
            loads.push(StationLoad::new(station.clone(), connectors));
            self.ensure_capacity(&target, &loads)?;
        }

        self.commit(ChangeSet::new().with(Write::PutChargeStation(station.clone())))
            .await?;

        info!(
            charge_station_id = %station.id,
            from_group_id = %current.group_id,
            group_id = %station.group_id,
            "charge station updated"
        );
        Ok(station)
    }

    /// Structural remove: only allowed once the station owns no connectors.
    /// A station cannot exist outside a group, so it is removed.
    pub async fn detach_charge_station(&self, id: &ChargeStationId) -> HierarchyResult<()> {
        let _gate = self.write_gate.lock().await;

        let station = self.require_charge_station(id).await?;
        let connectors = self.store.get_connectors_by_station(id).await?;
        self.ensure_decision(can_detach_station_from_group(&connectors))?;

        self.commit(ChangeSet::new().with(Write::DeleteChargeStation(*id)))
            .await?;

        info!(charge_station_id = %id, group_id = %station.group_id, "charge station detached");
        Ok(())
    }

    /// Removes the station and its connectors without consulting the detach rule
    pub async fn delete_charge_station(&self, id: &ChargeStationId) -> HierarchyResult<()> {
        let _gate = self.write_gate.lock().await;

        self.require_charge_station(id).await?;
        let connectors = self.store.get_connectors_by_station(id).await?;

        let mut changes = ChangeSet::new();
        for connector in &connectors {
            changes.push(Write::DeleteConnector(connector.id));
        }
        changes.push(Write::DeleteChargeStation(*id));
        self.commit(changes).await?;

        info!(charge_station_id = %id, connectors = connectors.len(), "charge station deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Connectors
    // ------------------------------------------------------------------

    pub async fn create_connector(&self, input: NewConnector) -> HierarchyResult<Connector> {
        check_input(&input)?;
        let _gate = self.write_gate.lock().await;

        let station = self.require_charge_station(&input.charge_station_id).await?;
        let group = self.require_group(&station.group_id).await?;
        let mut loads = self.load_station_loads(&group.id).await?;

        let connector = input.into_connector(ConnectorId::new());
        self.check_identifier(&loads, &connector)?;
        place_connector(&mut loads, &connector);
        let report = self.ensure_capacity(&group, &loads)?;

        self.commit(ChangeSet::new().with(Write::PutConnector(connector.clone())))
            .await?;

        info!(
            connector_id = %connector.id,
            charge_station_id = %connector.charge_station_id,
            max_current_in_amps = connector.max_current_in_amps,
            headroom_in_amps = report.headroom_in_amps(),
            "connector created"
        );
        Ok(connector)
    }

    pub async fn update_connector(
        &self,
        id: &ConnectorId,
        input: ConnectorUpdate,
    ) -> HierarchyResult<Connector> {
        check_input(&input)?;
        let _gate = self.write_gate.lock().await;

        self.require_connector(id).await?;
        let station = self.require_charge_station(&input.charge_station_id).await?;
        let group = self.require_group(&station.group_id).await?;
        let mut loads = self.load_station_loads(&group.id).await?;

        let connector = input.apply_to(*id);
        self.check_identifier(&loads, &connector)?;
        place_connector(&mut loads, &connector);
        let report = self.ensure_capacity(&group, &loads)?;

        self.commit(ChangeSet::new().with(Write::PutConnector(connector.clone())))
            .await?;

        info!(
            connector_id = %connector.id,
            charge_station_id = %connector.charge_station_id,
            max_current_in_amps = connector.max_current_in_amps,
            headroom_in_amps = report.headroom_in_amps(),
            "connector updated"
        );
        Ok(connector)
    }

    pub async fn delete_connector(&self, id: &ConnectorId) -> HierarchyResult<()> {
        let _gate = self.write_gate.lock().await;

        let connector = self.require_connector(id).await?;
        self.commit(ChangeSet::new().with(Write::DeleteConnector(*id)))
            .await?;

        info!(connector_id = %id, charge_station_id = %connector.charge_station_id, "connector deleted");
        Ok(())
    }
}
