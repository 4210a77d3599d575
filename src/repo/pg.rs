#![cfg(feature = "db")]

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgConnection, PgPool};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};
use uuid::Uuid;

use super::{ChangeSet, HierarchyStore, StoreError, Write};
use crate::domain::{
    ChargeStation, ChargeStationId, Connector, ConnectorId, Group, GroupId,
};
use crate::engine::CapacityExceeded;

/// Tables are created in dependency order; `seq` keeps creation order stable
/// across upserts.
const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS charge_groups (
        id UUID PRIMARY KEY,
        seq BIGSERIAL NOT NULL,
        name TEXT NOT NULL,
        capacity_in_amps INTEGER NOT NULL CHECK (capacity_in_amps > 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS charge_stations (
        id UUID PRIMARY KEY,
        seq BIGSERIAL NOT NULL,
        name TEXT NOT NULL,
        group_id UUID NOT NULL REFERENCES charge_groups (id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS connectors (
        id UUID PRIMARY KEY,
        seq BIGSERIAL NOT NULL,
        charge_station_id UUID NOT NULL REFERENCES charge_stations (id) ON DELETE CASCADE,
        identifier INTEGER NOT NULL CHECK (identifier BETWEEN 1 AND 5),
        max_current_in_amps INTEGER NOT NULL CHECK (max_current_in_amps > 0)
    )
    "#,
];

#[derive(Debug, Clone, sqlx::FromRow)]
struct GroupRow {
    id: Uuid,
    name: String,
    capacity_in_amps: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ChargeStationRow {
    id: Uuid,
    name: String,
    group_id: Uuid,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ConnectorRow {
    id: Uuid,
    charge_station_id: Uuid,
    identifier: i32,
    max_current_in_amps: i32,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            id: GroupId(row.id),
            name: row.name,
            capacity_in_amps: row.capacity_in_amps,
        }
    }
}

impl From<ChargeStationRow> for ChargeStation {
    fn from(row: ChargeStationRow) -> Self {
        ChargeStation {
            id: ChargeStationId(row.id),
            name: row.name,
            group_id: GroupId(row.group_id),
        }
    }
}

impl From<ConnectorRow> for Connector {
    fn from(row: ConnectorRow) -> Self {
        Connector {
            id: ConnectorId(row.id),
            charge_station_id: ChargeStationId(row.charge_station_id),
            identifier: row.identifier,
            max_current_in_amps: row.max_current_in_amps,
        }
    }
}

pub struct PgHierarchyStore {
    pool: PgPool,
}

impl PgHierarchyStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("hierarchy schema ready");
        Ok(())
    }
}

#[async_trait]
impl HierarchyStore for PgHierarchyStore {
    async fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, capacity_in_amps FROM charge_groups WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Group::from))
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT id, name, capacity_in_amps FROM charge_groups ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Group::from).collect())
    }

    async fn get_charge_station(
        &self,
        id: &ChargeStationId,
    ) -> Result<Option<ChargeStation>, StoreError> {
        let row = sqlx::query_as::<_, ChargeStationRow>(
            "SELECT id, name, group_id FROM charge_stations WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ChargeStation::from))
    }

    async fn list_charge_stations(&self) -> Result<Vec<ChargeStation>, StoreError> {
        let rows = sqlx::query_as::<_, ChargeStationRow>(
            "SELECT id, name, group_id FROM charge_stations ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ChargeStation::from).collect())
    }

    async fn get_charge_stations_by_group(
        &self,
        group_id: &GroupId,
    ) -> Result<Vec<ChargeStation>, StoreError> {
        let rows = sqlx::query_as::<_, ChargeStationRow>(
            "SELECT id, name, group_id FROM charge_stations WHERE group_id = $1 ORDER BY seq",
        )
        .bind(group_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ChargeStation::from).collect())
    }

    async fn get_connector(&self, id: &ConnectorId) -> Result<Option<Connector>, StoreError> {
        let row = sqlx::query_as::<_, ConnectorRow>(
            r#"
            SELECT id, charge_station_id, identifier, max_current_in_amps
            FROM connectors
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Connector::from))
    }

    async fn list_connectors(&self) -> Result<Vec<Connector>, StoreError> {
        let rows = sqlx::query_as::<_, ConnectorRow>(
            r#"
            SELECT id, charge_station_id, identifier, max_current_in_amps
            FROM connectors
            ORDER BY seq
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Connector::from).collect())
    }

    async fn get_connectors_by_station(
        &self,
        station_id: &ChargeStationId,
    ) -> Result<Vec<Connector>, StoreError> {
        let rows = sqlx::query_as::<_, ConnectorRow>(
            r#"
            SELECT id, charge_station_id, identifier, max_current_in_amps
            FROM connectors
            WHERE charge_station_id = $1
            ORDER BY seq
            "#,
        )
        .bind(station_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Connector::from).collect())
    }

    async fn commit(&self, changes: ChangeSet) -> Result<(), StoreError> {
        if changes.is_empty() {
            return Ok(());
        }

        let count = changes.len();
        let writes = changes.into_writes();
        let mut tx = self.pool.begin().await?;

        let groups = lock_affected_groups(&mut tx, &writes).await?;

        for write in writes {
            let query = match write {
                Write::PutGroup(group) => sqlx::query(
                    r#"
                    INSERT INTO charge_groups (id, name, capacity_in_amps)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (id) DO UPDATE
                    SET name = EXCLUDED.name, capacity_in_amps = EXCLUDED.capacity_in_amps
                    "#,
                )
                .bind(group.id.0)
                .bind(group.name)
                .bind(group.capacity_in_amps),
                Write::PutChargeStation(station) => sqlx::query(
                    r#"
                    INSERT INTO charge_stations (id, name, group_id)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (id) DO UPDATE
                    SET name = EXCLUDED.name, group_id = EXCLUDED.group_id
                    "#,
                )
                .bind(station.id.0)
                .bind(station.name)
                .bind(station.group_id.0),
                Write::PutConnector(connector) => sqlx::query(
                    r#"
                    INSERT INTO connectors (id, charge_station_id, identifier, max_current_in_amps)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (id) DO UPDATE
                    SET charge_station_id = EXCLUDED.charge_station_id,
                        identifier = EXCLUDED.identifier,
                        max_current_in_amps = EXCLUDED.max_current_in_amps
                    "#,
                )
                .bind(connector.id.0)
                .bind(connector.charge_station_id.0)
                .bind(connector.identifier)
                .bind(connector.max_current_in_amps),
                Write::DeleteGroup(id) => {
                    sqlx::query("DELETE FROM charge_groups WHERE id = $1").bind(id.0)
                }
                Write::DeleteChargeStation(id) => {
                    sqlx::query("DELETE FROM charge_stations WHERE id = $1").bind(id.0)
                }
                Write::DeleteConnector(id) => {
                    sqlx::query("DELETE FROM connectors WHERE id = $1").bind(id.0)
                }
            };
            query.execute(&mut *tx).await?;
        }

        if let Some(exceeded) = first_over_capacity(&mut tx, &groups).await? {
            tx.rollback().await?;
            debug!(group_id = %exceeded.group_id, "change set rolled back, group over capacity");
            return Err(exceeded.into());
        }

        tx.commit().await?;
        debug!(writes = count, "change set committed");
        Ok(())
    }
}

/// Locks every group whose load the writes can raise, and the stations those
/// writes hang off, for the rest of the transaction.
///
/// Stations are locked before groups and each set in id order, so concurrent
/// commits queue behind each other. Once the locks are held, the station to
/// group mapping read here cannot change until commit.
async fn lock_affected_groups(
    conn: &mut PgConnection,
    writes: &[Write],
) -> Result<Vec<Uuid>, StoreError> {
    let mut groups = BTreeSet::new();
    let mut stations = BTreeSet::new();
    let mut placed: HashMap<Uuid, Uuid> = HashMap::new();

    for write in writes {
        match write {
            Write::PutGroup(group) => {
                groups.insert(group.id.0);
            }
            Write::PutChargeStation(station) => {
                stations.insert(station.id.0);
                placed.insert(station.id.0, station.group_id.0);
                groups.insert(station.group_id.0);
            }
            Write::PutConnector(connector) => {
                stations.insert(connector.charge_station_id.0);
            }
            Write::DeleteGroup(_) | Write::DeleteChargeStation(_) | Write::DeleteConnector(_) => {}
        }
    }

    if !stations.is_empty() {
        let ids: Vec<Uuid> = stations.into_iter().collect();
        let owners = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT id, group_id FROM charge_stations WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        for (station_id, group_id) in owners {
            // A station moved by this change set counts against its new group.
            groups.insert(placed.get(&station_id).copied().unwrap_or(group_id));
        }
    }

    let groups: Vec<Uuid> = groups.into_iter().collect();
    if !groups.is_empty() {
        sqlx::query("SELECT id FROM charge_groups WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&groups)
            .execute(&mut *conn)
            .await?;
    }
    Ok(groups)
}

async fn first_over_capacity(
    conn: &mut PgConnection,
    groups: &[Uuid],
) -> Result<Option<CapacityExceeded>, StoreError> {
    if groups.is_empty() {
        return Ok(None);
    }

    let totals = sqlx::query_as::<_, (Uuid, i32, i64)>(
        r#"
        SELECT g.id, g.capacity_in_amps, COALESCE(SUM(c.max_current_in_amps), 0)::BIGINT
        FROM charge_groups g
        LEFT JOIN charge_stations s ON s.group_id = g.id
        LEFT JOIN connectors c ON c.charge_station_id = s.id
        WHERE g.id = ANY($1)
        GROUP BY g.id, g.capacity_in_amps
        ORDER BY g.id
        "#,
    )
    .bind(groups)
    .fetch_all(&mut *conn)
    .await?;

    Ok(totals
        .into_iter()
        .find(|(_, capacity, total)| *total > i64::from(*capacity))
        .map(|(id, capacity, total)| CapacityExceeded {
            group_id: GroupId(id),
            required_in_amps: total,
            capacity_in_amps: capacity,
        }))
}
