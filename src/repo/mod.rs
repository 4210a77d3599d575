//! Persistence collaborator for the hierarchy.
//!
//! Backends answer reads with `Ok(None)` for a missing entity and apply a
//! [`ChangeSet`] atomically: either every write lands or none does. A commit
//! that would leave any group over capacity is refused as a whole, so a
//! decision made on stale reads cannot land.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{Config, StorageBackend};
use crate::engine::CapacityExceeded;
use crate::domain::{
    ChargeStation, ChargeStationId, Connector, ConnectorId, Group, GroupId,
};

pub mod memory;
#[cfg(feature = "db")]
pub mod pg;

pub use memory::{HierarchySnapshot, InMemoryStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store backend error: {0}")]
    Backend(String),

    /// Membership changed under the caller between its reads and the commit
    #[error(transparent)]
    CapacityExceeded(#[from] CapacityExceeded),
}

#[cfg(feature = "db")]
impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(error.to_string())
            }
            _ => StoreError::Backend(error.to_string()),
        }
    }
}

/// A single write inside a [`ChangeSet`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    PutGroup(Group),
    PutChargeStation(ChargeStation),
    PutConnector(Connector),
    DeleteGroup(GroupId),
    DeleteChargeStation(ChargeStationId),
    DeleteConnector(ConnectorId),
}

/// Ordered writes committed as one unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    writes: Vec<Write>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, write: Write) -> Self {
        self.writes.push(write);
        self
    }

    pub fn push(&mut self, write: Write) {
        self.writes.push(write);
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HierarchyStore: Send + Sync {
    async fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError>;
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    async fn get_charge_station(
        &self,
        id: &ChargeStationId,
    ) -> Result<Option<ChargeStation>, StoreError>;
    async fn list_charge_stations(&self) -> Result<Vec<ChargeStation>, StoreError>;
    /// Stations owned by `group_id`, in creation order
    async fn get_charge_stations_by_group(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<ChargeStation>, StoreError>;

    async fn get_connector(&self, id: &ConnectorId) -> Result<Option<Connector>, StoreError>;
    async fn list_connectors(&self) -> Result<Vec<Connector>, StoreError>;
    /// Connectors owned by `station_id`, in creation order
    async fn get_connectors_by_station(
        &self,
        station_id: &ChargeStationId,
    ) -> Result<Vec<Connector>, StoreError>;

    /// Apply every write or none of them
    async fn commit(&self, changes: ChangeSet) -> Result<(), StoreError>;
}

/// Build the store selected in configuration
pub async fn connect(cfg: &Config) -> Result<Arc<dyn HierarchyStore>> {
    match cfg.storage.backend {
        StorageBackend::Memory => Ok(Arc::new(InMemoryStore::new())),
        StorageBackend::Postgres => {
            #[cfg(feature = "db")]
            {
                let store =
                    pg::PgHierarchyStore::connect(&cfg.db.url, cfg.db.max_connections).await?;
                store.ensure_schema().await?;
                return Ok(Arc::new(store));
            }

            #[cfg(not(feature = "db"))]
            {
                anyhow::bail!("storage backend `postgres` requires building with the `db` feature");
            }
        }
    }
}
