//! In-memory [`ReportStore`] for tests.
//!
//! Evaluates the same queries the MySQL adapter sends, over plain vectors: one
//! result row per (shard, key), half-open windows, per-shard top-k.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::core::persistence::nms::nms_entity::{
    InrouteGroupEntity, NetModemEntity, NetModemRateEntity, NetworkEntity, VirtualRemoteCirEntity,
};
use crate::core::persistence::report_store_trait::{NmsSession, ReportStore, StatsSession};
use crate::core::persistence::stats::stats_rows::{MulticastRow, QuantityRow, TrafficRow};
use crate::core::persistence::stats::tier::{Tier, TierSlice};
use crate::domain::common::model::Direction;

/// One row of a statistics shard table.
#[derive(Debug, Clone)]
pub struct StatsSample {
    pub tier: Tier,
    pub shard: u8,
    pub unique_id: u32,
    pub network_id: u32,
    pub timestamp: DateTime<Utc>,
    /// kilobytes in the row's interval
    pub up_kbytes: f64,
    pub down_kbytes: f64,
    /// busiest-minute kilobytes, rollup tiers only
    pub up_max: f64,
    pub down_max: f64,
}

impl StatsSample {
    pub fn new(tier: Tier, shard: u8, unique_id: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            tier,
            shard,
            unique_id,
            network_id: 0,
            timestamp,
            up_kbytes: 0.0,
            down_kbytes: 0.0,
            up_max: 0.0,
            down_max: 0.0,
        }
    }

    pub fn network(mut self, network_id: u32) -> Self {
        self.network_id = network_id;
        self
    }

    pub fn up(mut self, kbytes: f64) -> Self {
        self.up_kbytes = kbytes;
        self
    }

    pub fn down(mut self, kbytes: f64) -> Self {
        self.down_kbytes = kbytes;
        self
    }

    pub fn peaks(mut self, up_max: f64, down_max: f64) -> Self {
        self.up_max = up_max;
        self.down_max = down_max;
        self
    }

    fn volume(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Upstream => self.up_kbytes,
            Direction::Downstream => self.down_kbytes,
        }
    }

    fn peak(&self, direction: Direction) -> f64 {
        match (self.tier, direction) {
            (Tier::Raw, d) => self.volume(d),
            (_, Direction::Upstream) => self.up_max,
            (_, Direction::Downstream) => self.down_max,
        }
    }
}

/// One row of a multicast companion table.
#[derive(Debug, Clone)]
pub struct MulticastSample {
    pub tier: Tier,
    pub shard: u8,
    pub network_id: u32,
    pub timestamp: DateTime<Utc>,
    pub kbytes: f64,
}

impl MulticastSample {
    pub fn new(
        tier: Tier,
        shard: u8,
        network_id: u32,
        timestamp: DateTime<Utc>,
        kbytes: f64,
    ) -> Self {
        Self {
            tier,
            shard,
            network_id,
            timestamp,
            kbytes,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryData {
    samples: Vec<StatsSample>,
    multicast: Vec<MulticastSample>,
    networks: Vec<NetworkEntity>,
    groups: Vec<InrouteGroupEntity>,
    modems: Vec<NetModemEntity>,
    modem_rates: Vec<NetModemRateEntity>,
    group_carriers: HashMap<(u32, Direction), f64>,
    cir: Vec<VirtualRemoteCirEntity>,
    fail_connect: bool,
    fail_stage: Option<&'static str>,
    cancel_on_traffic: Option<CancellationToken>,
}

#[derive(Debug, Default)]
struct Counters {
    connects: AtomicUsize,
    group_lookups: AtomicUsize,
    top_rate_queries: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryReportStore {
    data: Arc<MemoryData>,
    counters: Arc<Counters>,
}

impl MemoryReportStore {
    fn edit(mut self, f: impl FnOnce(&mut MemoryData)) -> Self {
        // builders run before any session is handed out
        if let Some(data) = Arc::get_mut(&mut self.data) {
            f(data);
        }
        self
    }

    pub fn with_sample(self, sample: StatsSample) -> Self {
        self.edit(|d| d.samples.push(sample))
    }

    pub fn with_multicast(self, sample: MulticastSample) -> Self {
        self.edit(|d| d.multicast.push(sample))
    }

    pub fn with_network(self, network_id: u32, name: &str) -> Self {
        let name = name.to_string();
        self.edit(|d| d.networks.push(NetworkEntity { network_id, name }))
    }

    pub fn with_group(self, inroute_group_id: u32, name: &str, network_id: u32) -> Self {
        let name = name.to_string();
        self.edit(|d| {
            d.groups.push(InrouteGroupEntity {
                inroute_group_id,
                name,
                network_id,
            })
        })
    }

    pub fn with_modem(self, modem: NetModemEntity) -> Self {
        self.edit(|d| d.modems.push(modem))
    }

    pub fn with_modem_rate(self, rate: NetModemRateEntity) -> Self {
        self.edit(|d| d.modem_rates.push(rate))
    }

    pub fn with_group_carrier(self, group: u32, direction: Direction, bit_rate: f64) -> Self {
        self.edit(|d| {
            d.group_carriers.insert((group, direction), bit_rate);
        })
    }

    pub fn with_cir(self, cir: VirtualRemoteCirEntity) -> Self {
        self.edit(|d| d.cir.push(cir))
    }

    pub fn failing_connect(self) -> Self {
        self.edit(|d| d.fail_connect = true)
    }

    /// Make the named stage's query fail (`"traffic"`, `"top rates"`, ...).
    pub fn failing_query(self, stage: &'static str) -> Self {
        self.edit(|d| d.fail_stage = Some(stage))
    }

    /// Cancel `token` while the traffic query runs.
    pub fn cancelling_on_traffic(self, token: CancellationToken) -> Self {
        self.edit(|d| d.cancel_on_traffic = Some(token))
    }

    pub fn connects(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    pub fn group_lookups(&self) -> usize {
        self.counters.group_lookups.load(Ordering::SeqCst)
    }

    pub fn top_rate_queries(&self) -> usize {
        self.counters.top_rate_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    type Session = MemorySession;

    async fn connect(&self) -> Result<MemorySession> {
        if self.data.fail_connect {
            bail!("connection refused");
        }
        self.counters.connects.fetch_add(1, Ordering::SeqCst);

        Ok(MemorySession {
            data: Arc::clone(&self.data),
            counters: Arc::clone(&self.counters),
        })
    }
}

pub struct MemorySession {
    data: Arc<MemoryData>,
    counters: Arc<Counters>,
}

impl MemorySession {
    fn check(&self, stage: &'static str) -> Result<()> {
        match self.data.fail_stage {
            Some(failing) if failing == stage => Err(anyhow!("{stage} query failed: server has gone away")),
            _ => Ok(()),
        }
    }

    fn samples_in<'a>(
        &'a self,
        slice: &'a TierSlice,
        terminals: &'a [u32],
    ) -> impl Iterator<Item = &'a StatsSample> + 'a {
        self.data.samples.iter().filter(move |s| {
            s.tier == slice.tier
                && slice.window.contains(s.timestamp)
                && terminals.contains(&s.unique_id)
        })
    }

    fn multicast_at(&self, sample: &StatsSample) -> f64 {
        self.data
            .multicast
            .iter()
            .filter(|m| {
                m.tier == sample.tier
                    && m.shard == sample.shard
                    && m.network_id == sample.network_id
                    && m.timestamp == sample.timestamp
            })
            .map(|m| m.kbytes)
            .sum()
    }
}

#[async_trait]
impl StatsSession for MemorySession {
    async fn fetch_quantities(
        &mut self,
        slice: &TierSlice,
        terminals: &[u32],
    ) -> Result<Vec<QuantityRow>> {
        self.check("quantities")?;

        let mut groups: BTreeMap<(u8, u32), i64> = BTreeMap::new();
        for sample in self.samples_in(slice, terminals) {
            *groups.entry((sample.shard, sample.unique_id)).or_default() += 1;
        }

        Ok(groups
            .into_iter()
            .map(|((_, unique_id), rows)| QuantityRow { unique_id, rows })
            .collect())
    }

    async fn fetch_traffic(
        &mut self,
        slice: &TierSlice,
        terminals: &[u32],
    ) -> Result<Vec<TrafficRow>> {
        if let Some(token) = &self.data.cancel_on_traffic {
            token.cancel();
        }
        self.check("traffic")?;

        let mut groups: BTreeMap<(u8, u32), TrafficRow> = BTreeMap::new();
        for sample in self.samples_in(slice, terminals) {
            let row = groups
                .entry((sample.shard, sample.unique_id))
                .or_insert_with(|| TrafficRow {
                    unique_id: sample.unique_id,
                    ..Default::default()
                });
            row.up_total += sample.up_kbytes;
            row.down_total += sample.down_kbytes;
            row.up_max_rate = row.up_max_rate.max(sample.peak(Direction::Upstream) / 60.0);
            row.down_max_rate = row.down_max_rate.max(sample.peak(Direction::Downstream) / 60.0);
        }

        Ok(groups.into_values().collect())
    }

    async fn fetch_multicast(&mut self, slice: &TierSlice) -> Result<Vec<MulticastRow>> {
        self.check("multicast")?;

        let mut groups: BTreeMap<(u8, u32), f64> = BTreeMap::new();
        for sample in self
            .data
            .multicast
            .iter()
            .filter(|m| m.tier == slice.tier && slice.window.contains(m.timestamp))
        {
            *groups.entry((sample.shard, sample.network_id)).or_default() += sample.kbytes;
        }

        Ok(groups
            .into_iter()
            .map(|((_, network_id), down_multicast)| MulticastRow {
                network_id,
                down_multicast,
            })
            .collect())
    }

    async fn fetch_top_rates(
        &mut self,
        slices: &[TierSlice],
        terminal: u32,
        direction: Direction,
        limit: u32,
    ) -> Result<Vec<f64>> {
        self.check("top rates")?;
        self.counters.top_rate_queries.fetch_add(1, Ordering::SeqCst);

        let mut candidates = Vec::new();
        for slice in slices {
            let interval = f64::from(slice.tier.interval_seconds());
            for shard in Tier::shards() {
                let mut rates: Vec<f64> = self
                    .samples_in(slice, &[terminal])
                    .filter(|s| s.shard == shard)
                    .map(|s| match direction {
                        Direction::Upstream => s.up_kbytes / interval,
                        Direction::Downstream => (s.down_kbytes + self.multicast_at(s)) / interval,
                    })
                    .collect();
                rates.sort_by(|a, b| b.total_cmp(a));
                rates.truncate(limit as usize);
                candidates.extend(rates);
            }
        }

        Ok(candidates)
    }
}

#[async_trait]
impl NmsSession for MemorySession {
    async fn fetch_networks(&mut self) -> Result<Vec<NetworkEntity>> {
        self.check("networks")?;
        let mut networks = self.data.networks.clone();
        networks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(networks)
    }

    async fn fetch_inroute_groups(&mut self) -> Result<Vec<InrouteGroupEntity>> {
        self.check("inroute groups")?;
        let mut groups = self.data.groups.clone();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn fetch_net_modems(&mut self) -> Result<Vec<NetModemEntity>> {
        self.check("net modems")?;
        let mut modems = self.data.modems.clone();
        modems.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(modems)
    }

    async fn fetch_modem_rates(&mut self, terminals: &[u32]) -> Result<Vec<NetModemRateEntity>> {
        self.check("terminal rates")?;
        Ok(self
            .data
            .modem_rates
            .iter()
            .filter(|m| terminals.contains(&m.net_modem_id))
            .cloned()
            .collect())
    }

    async fn fetch_group_carrier_rate(
        &mut self,
        inroute_group_id: u32,
        direction: Direction,
    ) -> Result<Option<f64>> {
        self.counters.group_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .data
            .group_carriers
            .get(&(inroute_group_id, direction))
            .copied())
    }

    async fn fetch_cir(&mut self, terminals: &[u32]) -> Result<Vec<VirtualRemoteCirEntity>> {
        self.check("cir")?;
        Ok(self
            .data
            .cir
            .iter()
            .filter(|c| terminals.contains(&c.remote_id))
            .cloned()
            .collect())
    }

    async fn ping(&mut self) -> Result<()> {
        self.check("ping")
    }
}
