use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};
use tracing::{debug, error};

use crate::core::persistence::nms::nms_entity::{
    InrouteGroupEntity, NetModemEntity, NetModemRateEntity, NetworkEntity, VirtualRemoteCirEntity,
};
use crate::core::persistence::report_store_trait::{NmsSession, ReportStore, StatsSession};
use crate::core::persistence::stats::shard_query_builder::{
    multicast_query, quantities_query, top_rates_query, traffic_query, ArchiveQuery,
};
use crate::core::persistence::stats::stats_rows::{MulticastRow, QuantityRow, TrafficRow};
use crate::core::persistence::stats::tier::TierSlice;
use crate::domain::common::model::Direction;

/// Remote terminals only (hub line cards share the table).
const REMOTE_MODEM_TYPE_ID: i64 = 3;
/// Serial numbers at or below this are lab/placeholder entries.
const MIN_REAL_SERIAL: i64 = 1000;

const NETWORKS_QUERY: &str = "SELECT CAST(NetworkId AS UNSIGNED) AS NetworkId, NetworkName \
     FROM nms.Network ORDER BY NetworkName";

const INROUTE_GROUPS_QUERY: &str = "SELECT CAST(InrouteGroupId AS UNSIGNED) AS InrouteGroupId, \
     InrouteGroupName, CAST(NetworkId AS UNSIGNED) AS NetworkId \
     FROM nms.InrouteGroup ORDER BY InrouteGroupName";

const NET_MODEMS_QUERY: &str = "SELECT CAST(NetModemId AS UNSIGNED) AS NetModemId, \
     CAST(ModemSn AS UNSIGNED) AS ModemSn, NetModemName, \
     CAST(InrouteGroupId AS UNSIGNED) AS InrouteGroupId, CAST(ActiveStatus AS SIGNED) AS ActiveStatus \
     FROM nms.NetModem WHERE NetModemTypeId = ? AND ModemSn > ? ORDER BY NetModemName";

/// Downstream: the transmit carrier of the group's hub-side modem.
const GROUP_TX_CARRIER_QUERY: &str = "SELECT CAST(Carrier.BitRate AS DOUBLE) AS BitRate \
     FROM nms.NetModem JOIN nms.Carrier ON Carrier.CarrierId = NetModem.TxCarrierId \
     WHERE NetModem.InrouteGroupId = ? AND NetModem.NetModemTypeId <> ? LIMIT 1";

/// Upstream: the fastest inroute carrier of the group.
const GROUP_INROUTE_CARRIER_QUERY: &str = "SELECT CAST(MAX(Carrier.BitRate) AS DOUBLE) AS BitRate \
     FROM nms.Inroute JOIN nms.Carrier ON Carrier.CarrierId = Inroute.CarrierId \
     WHERE Inroute.InrouteGroupId = ?";

/// MySQL-backed store for both the statistics archive and the NMS schema.
#[derive(Clone)]
pub struct MySqlReportStore {
    pool: MySqlPool,
}

impl MySqlReportStore {
    /// Build the pool without opening a connection; failures surface on the first
    /// [`ReportStore::connect`].
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_lazy(database_url)
            .context("invalid statistics database url")?;

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ReportStore for MySqlReportStore {
    type Session = MySqlSession;

    async fn connect(&self) -> Result<MySqlSession> {
        let conn = self.pool.acquire().await.map_err(|err| {
            error!(error = %err, "Failed to acquire statistics database connection");
            err
        })?;

        Ok(MySqlSession { conn })
    }
}

/// One pooled connection; returned to the pool on drop.
pub struct MySqlSession {
    conn: PoolConnection<MySql>,
}

impl MySqlSession {
    async fn fetch_archive(&mut self, mut qb: ArchiveQuery, what: &str) -> Result<Vec<MySqlRow>> {
        debug!(query = what, "Running archive fan-out query");
        qb.build()
            .fetch_all(&mut *self.conn)
            .await
            .with_context(|| format!("{what} query failed"))
    }
}

fn get_u32(row: &MySqlRow, column: &str) -> Result<u32> {
    let value: u64 = row.try_get(column)?;
    u32::try_from(value).with_context(|| format!("{column} value {value} does not fit u32"))
}

fn get_f64(row: &MySqlRow, column: &str) -> Result<f64> {
    let value: Option<f64> = row.try_get(column)?;
    Ok(value.unwrap_or(0.0))
}

fn get_flag(row: &MySqlRow, column: &str) -> Result<bool> {
    let value: Option<i64> = row.try_get(column)?;
    Ok(value == Some(1))
}

fn get_text(row: &MySqlRow, column: &str) -> Result<String> {
    let value: Option<String> = row.try_get(column)?;
    Ok(value.unwrap_or_default())
}

#[async_trait]
impl StatsSession for MySqlSession {
    async fn fetch_quantities(
        &mut self,
        slice: &TierSlice,
        terminals: &[u32],
    ) -> Result<Vec<QuantityRow>> {
        let rows = self
            .fetch_archive(quantities_query(slice, terminals), "quantities")
            .await?;

        rows.iter()
            .map(|row| {
                Ok(QuantityRow {
                    unique_id: get_u32(row, "unique_id")?,
                    rows: row.try_get("row_count")?,
                })
            })
            .collect()
    }

    async fn fetch_traffic(
        &mut self,
        slice: &TierSlice,
        terminals: &[u32],
    ) -> Result<Vec<TrafficRow>> {
        let rows = self
            .fetch_archive(traffic_query(slice, terminals), "traffic")
            .await?;

        rows.iter()
            .map(|row| {
                Ok(TrafficRow {
                    unique_id: get_u32(row, "unique_id")?,
                    up_total: get_f64(row, "up_total")?,
                    down_total: get_f64(row, "down_total")?,
                    up_max_rate: get_f64(row, "up_max_rate")?,
                    down_max_rate: get_f64(row, "down_max_rate")?,
                })
            })
            .collect()
    }

    async fn fetch_multicast(&mut self, slice: &TierSlice) -> Result<Vec<MulticastRow>> {
        let rows = self
            .fetch_archive(multicast_query(slice), "multicast")
            .await?;

        rows.iter()
            .map(|row| {
                Ok(MulticastRow {
                    network_id: get_u32(row, "network_id")?,
                    down_multicast: get_f64(row, "down_multicast")?,
                })
            })
            .collect()
    }

    async fn fetch_top_rates(
        &mut self,
        slices: &[TierSlice],
        terminal: u32,
        direction: Direction,
        limit: u32,
    ) -> Result<Vec<f64>> {
        if slices.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .fetch_archive(top_rates_query(slices, terminal, direction, limit), "top rates")
            .await?;

        rows.iter().map(|row| get_f64(row, "rate")).collect()
    }
}

#[async_trait]
impl NmsSession for MySqlSession {
    async fn fetch_networks(&mut self) -> Result<Vec<NetworkEntity>> {
        let rows = sqlx::query(NETWORKS_QUERY)
            .fetch_all(&mut *self.conn)
            .await
            .context("networks query failed")?;

        rows.iter()
            .map(|row| {
                Ok(NetworkEntity {
                    network_id: get_u32(row, "NetworkId")?,
                    name: get_text(row, "NetworkName")?,
                })
            })
            .collect()
    }

    async fn fetch_inroute_groups(&mut self) -> Result<Vec<InrouteGroupEntity>> {
        let rows = sqlx::query(INROUTE_GROUPS_QUERY)
            .fetch_all(&mut *self.conn)
            .await
            .context("inroute groups query failed")?;

        rows.iter()
            .map(|row| {
                Ok(InrouteGroupEntity {
                    inroute_group_id: get_u32(row, "InrouteGroupId")?,
                    name: get_text(row, "InrouteGroupName")?,
                    network_id: get_u32(row, "NetworkId")?,
                })
            })
            .collect()
    }

    async fn fetch_net_modems(&mut self) -> Result<Vec<NetModemEntity>> {
        let rows = sqlx::query(NET_MODEMS_QUERY)
            .bind(REMOTE_MODEM_TYPE_ID)
            .bind(MIN_REAL_SERIAL)
            .fetch_all(&mut *self.conn)
            .await
            .context("net modems query failed")?;

        rows.iter()
            .map(|row| {
                Ok(NetModemEntity {
                    net_modem_id: get_u32(row, "NetModemId")?,
                    serial_number: get_u32(row, "ModemSn")?,
                    name: get_text(row, "NetModemName")?,
                    inroute_group_id: get_u32(row, "InrouteGroupId")?,
                    active: get_flag(row, "ActiveStatus")?,
                })
            })
            .collect()
    }

    async fn fetch_modem_rates(&mut self, terminals: &[u32]) -> Result<Vec<NetModemRateEntity>> {
        if terminals.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<MySql> = QueryBuilder::new(
            "SELECT CAST(NetModemId AS UNSIGNED) AS NetModemId, CAST(ModemSn AS UNSIGNED) AS ModemSn, \
             NetModemName, CAST(DID AS UNSIGNED) AS DID, CAST(ActiveStatus AS SIGNED) AS ActiveStatus, \
             CAST(UseInrouteMaximumDataRate AS SIGNED) AS UseInrouteMaximumDataRate, \
             CAST(InrouteMaximumDataRate AS DOUBLE) AS InrouteMaximumDataRate, \
             CAST(UseOutrouteMaximumDataRate AS SIGNED) AS UseOutrouteMaximumDataRate, \
             CAST(OutrouteMaximumDataRate AS DOUBLE) AS OutrouteMaximumDataRate, \
             CAST(InrouteGroupId AS UNSIGNED) AS InrouteGroupId, CAST(NetworkId AS UNSIGNED) AS NetworkId \
             FROM nms.NetModem WHERE NetModemId IN (",
        );
        {
            let mut ids = qb.separated(", ");
            for id in terminals {
                ids.push_bind(*id);
            }
        }
        qb.push(")");

        let rows = qb
            .build()
            .fetch_all(&mut *self.conn)
            .await
            .context("terminal rate query failed")?;

        rows.iter()
            .map(|row| {
                Ok(NetModemRateEntity {
                    net_modem_id: get_u32(row, "NetModemId")?,
                    serial_number: get_u32(row, "ModemSn")?,
                    name: get_text(row, "NetModemName")?,
                    did: get_u32(row, "DID")?,
                    active: get_flag(row, "ActiveStatus")?,
                    use_inroute_mir: get_flag(row, "UseInrouteMaximumDataRate")?,
                    inroute_mir: get_f64(row, "InrouteMaximumDataRate")?,
                    use_outroute_mir: get_flag(row, "UseOutrouteMaximumDataRate")?,
                    outroute_mir: get_f64(row, "OutrouteMaximumDataRate")?,
                    inroute_group_id: get_u32(row, "InrouteGroupId")?,
                    network_id: get_u32(row, "NetworkId")?,
                })
            })
            .collect()
    }

    async fn fetch_group_carrier_rate(
        &mut self,
        inroute_group_id: u32,
        direction: Direction,
    ) -> Result<Option<f64>> {
        let query = match direction {
            Direction::Downstream => {
                sqlx::query(GROUP_TX_CARRIER_QUERY)
                    .bind(inroute_group_id)
                    .bind(REMOTE_MODEM_TYPE_ID)
            }
            Direction::Upstream => sqlx::query(GROUP_INROUTE_CARRIER_QUERY).bind(inroute_group_id),
        };

        let row = query
            .fetch_optional(&mut *self.conn)
            .await
            .with_context(|| format!("{direction} group carrier query failed"))?;

        match row {
            Some(row) => Ok(row.try_get::<Option<f64>, _>("BitRate")?),
            None => Ok(None),
        }
    }

    async fn fetch_cir(&mut self, terminals: &[u32]) -> Result<Vec<VirtualRemoteCirEntity>> {
        if terminals.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<MySql> = QueryBuilder::new(
            "SELECT CAST(RemoteId AS UNSIGNED) AS RemoteId, CAST(Direction AS SIGNED) AS Direction, \
             CAST(SUM(CIR_BPS) AS DOUBLE) AS CirBps FROM nms.VirtualRemote WHERE RemoteId IN (",
        );
        {
            let mut ids = qb.separated(", ");
            for id in terminals {
                ids.push_bind(*id);
            }
        }
        qb.push(") GROUP BY RemoteId, Direction");

        let rows = qb
            .build()
            .fetch_all(&mut *self.conn)
            .await
            .context("CIR query failed")?;

        let mut cirs = Vec::with_capacity(rows.len());
        for row in &rows {
            let code: i64 = row.try_get("Direction")?;
            // other codes are multicast/management circuits
            let Some(direction) = Direction::from_nms_code(code) else {
                continue;
            };
            cirs.push(VirtualRemoteCirEntity {
                remote_id: get_u32(row, "RemoteId")?,
                direction,
                cir_bps: get_f64(row, "CirBps")?,
            });
        }

        Ok(cirs)
    }

    async fn ping(&mut self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&mut *self.conn)
            .await
            .context("statistics database ping failed")?;
        Ok(())
    }
}
