use anyhow::Result;
use async_trait::async_trait;

use crate::core::persistence::nms::nms_entity::{
    InrouteGroupEntity, NetModemEntity, NetModemRateEntity, NetworkEntity, VirtualRemoteCirEntity,
};
use crate::core::persistence::stats::stats_rows::{MulticastRow, QuantityRow, TrafficRow};
use crate::core::persistence::stats::tier::TierSlice;
use crate::domain::common::model::Direction;

/// Source of store sessions.
///
/// A session is one connection held for the duration of a report run and released
/// when it is dropped.
#[async_trait]
pub trait ReportStore: Send + Sync {
    type Session: StatsSession + NmsSession;

    async fn connect(&self) -> Result<Self::Session>;
}

/// Fan-out reads against the tiered statistics archive.
///
/// Every method returns one row per shard table that matched; callers merge.
#[async_trait]
pub trait StatsSession: Send {
    async fn fetch_quantities(
        &mut self,
        slice: &TierSlice,
        terminals: &[u32],
    ) -> Result<Vec<QuantityRow>>;

    async fn fetch_traffic(
        &mut self,
        slice: &TierSlice,
        terminals: &[u32],
    ) -> Result<Vec<TrafficRow>>;

    async fn fetch_multicast(&mut self, slice: &TierSlice) -> Result<Vec<MulticastRow>>;

    /// Up to `limit` highest per-interval rates (kilobytes/s) per shard per slice,
    /// unsorted across shards.
    async fn fetch_top_rates(
        &mut self,
        slices: &[TierSlice],
        terminal: u32,
        direction: Direction,
        limit: u32,
    ) -> Result<Vec<f64>>;
}

/// Read-only access to the network management configuration.
#[async_trait]
pub trait NmsSession: Send {
    async fn fetch_networks(&mut self) -> Result<Vec<NetworkEntity>>;

    async fn fetch_inroute_groups(&mut self) -> Result<Vec<InrouteGroupEntity>>;

    async fn fetch_net_modems(&mut self) -> Result<Vec<NetModemEntity>>;

    async fn fetch_modem_rates(&mut self, terminals: &[u32]) -> Result<Vec<NetModemRateEntity>>;

    /// Carrier bit-rate of an inroute group for one direction, if the group has one.
    async fn fetch_group_carrier_rate(
        &mut self,
        inroute_group_id: u32,
        direction: Direction,
    ) -> Result<Option<f64>>;

    async fn fetch_cir(&mut self, terminals: &[u32]) -> Result<Vec<VirtualRemoteCirEntity>>;

    async fn ping(&mut self) -> Result<()>;
}
