use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{ChangeSet, HierarchyStore, StoreError, Write};
use crate::domain::{
    ChargeStation, ChargeStationId, Connector, ConnectorId, Group, GroupId,
};
use crate::engine::CapacityExceeded;

/// Entire contents of an [`InMemoryStore`], in creation order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchySnapshot {
    pub groups: Vec<Group>,
    pub charge_stations: Vec<ChargeStation>,
    pub connectors: Vec<Connector>,
}

fn put<T, K: PartialEq>(items: &mut Vec<T>, item: T, key: impl Fn(&T) -> K) {
    let id = key(&item);
    match items.iter().position(|existing| key(existing) == id) {
        Some(index) => items[index] = item,
        None => items.push(item),
    }
}

impl HierarchySnapshot {
    fn apply(&mut self, write: Write) {
        match write {
            Write::PutGroup(group) => put(&mut self.groups, group, |g| g.id),
            Write::PutChargeStation(station) => put(&mut self.charge_stations, station, |s| s.id),
            Write::PutConnector(connector) => put(&mut self.connectors, connector, |c| c.id),
            Write::DeleteGroup(id) => self.groups.retain(|g| g.id != id),
            Write::DeleteChargeStation(id) => self.charge_stations.retain(|s| s.id != id),
            Write::DeleteConnector(id) => self.connectors.retain(|c| c.id != id),
        }
    }

    /// Every station points at a stored group and every connector at a
    /// stored station, and no group's connectors exceed its capacity
    fn check_integrity(&self) -> Result<(), StoreError> {
        let mut load: HashMap<GroupId, i64> =
            self.groups.iter().map(|g| (g.id, 0)).collect();

        let mut owner: HashMap<ChargeStationId, GroupId> =
            HashMap::with_capacity(self.charge_stations.len());
        for station in &self.charge_stations {
            if !load.contains_key(&station.group_id) {
                return Err(StoreError::Backend(format!(
                    "charge station {} references missing group {}",
                    station.id, station.group_id
                )));
            }
            owner.insert(station.id, station.group_id);
        }

        for connector in &self.connectors {
            let group_id = owner.get(&connector.charge_station_id).ok_or_else(|| {
                StoreError::Backend(format!(
                    "connector {} references missing charge station {}",
                    connector.id, connector.charge_station_id
                ))
            })?;
            if let Some(total) = load.get_mut(group_id) {
                *total += i64::from(connector.max_current_in_amps);
            }
        }

        for group in &self.groups {
            let required = load.get(&group.id).copied().unwrap_or_default();
            if required > i64::from(group.capacity_in_amps) {
                return Err(CapacityExceeded {
                    group_id: group.id,
                    required_in_amps: required,
                    capacity_in_amps: group.capacity_in_amps,
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Process-local store; the default backend and the one tests run against
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<HierarchySnapshot>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: HierarchySnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> HierarchySnapshot {
        self.state.read().clone()
    }
}

#[async_trait]
impl HierarchyStore for InMemoryStore {
    async fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self.state.read().groups.iter().find(|g| g.id == *id).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.state.read().groups.clone())
    }

    async fn get_charge_station(
        &self,
        id: &ChargeStationId,
    ) -> Result<Option<ChargeStation>, StoreError> {
        Ok(self
            .state
            .read()
            .charge_stations
            .iter()
            .find(|s| s.id == *id)
            .cloned())
    }

    async fn list_charge_stations(&self) -> Result<Vec<ChargeStation>, StoreError> {
        Ok(self.state.read().charge_stations.clone())
    }

    async fn get_charge_stations_by_group(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<ChargeStation>, StoreError> {
        Ok(self
            .state
            .read()
            .charge_stations
            .iter()
            .filter(|s| s.group_id == *group_id)
            .cloned()
            .collect())
    }

    async fn get_connector(&self, id: &ConnectorId) -> Result<Option<Connector>, StoreError> {
        Ok(self
            .state
            .read()
            .connectors
            .iter()
            .find(|c| c.id == *id)
            .cloned())
    }

    async fn list_connectors(&self) -> Result<Vec<Connector>, StoreError> {
        Ok(self.state.read().connectors.clone())
    }

    async fn get_connectors_by_station(
        &self,
        station_id: &ChargeStationId,
    ) -> Result<Vec<Connector>, StoreError> {
        Ok(self
            .state
            .read()
            .connectors
            .iter()
            .filter(|c| c.charge_station_id == *station_id)
            .cloned()
            .collect())
    }

    async fn commit(&self, changes: ChangeSet) -> Result<(), StoreError> {
        let mut state = self.state.write();

        let mut next = state.clone();
        for write in changes.into_writes() {
            next.apply(write);
        }
        next.check_integrity()?;

        *state = next;
        Ok(())
    }
}
