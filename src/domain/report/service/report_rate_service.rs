use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::persistence::nms::nms_entity::NetModemRateEntity;
use crate::core::persistence::report_store_trait::NmsSession;
use crate::core::util::rate_util::RateUtil;
use crate::domain::common::model::Direction;
use crate::domain::report::error::ReportError;
use crate::domain::report::model::{CirTotals, TerminalRates};
use crate::domain::report::run_control::RunControl;

const RATES_STAGE: &str = "terminal rates";
const CIR_STAGE: &str = "cir";

/// Identity and MIR of every terminal in `terminals`.
///
/// A direction whose override flag is off takes the group carrier rate; group
/// lookups are done once per (group, direction). No carrier means MIR 0.
pub async fn collect_terminal_rates<S: NmsSession + ?Sized>(
    session: &mut S,
    terminals: &[u32],
    control: &RunControl,
) -> Result<BTreeMap<u32, TerminalRates>> {
    control.checkpoint(RATES_STAGE)?;

    let modems = session
        .fetch_modem_rates(terminals)
        .await
        .with_context(|| ReportError::Query { stage: RATES_STAGE })?;

    let mut group_rates: HashMap<(u32, Direction), f64> = HashMap::new();
    let mut rates = BTreeMap::new();

    for modem in &modems {
        let up_mir = resolve_mir(session, modem, Direction::Upstream, &mut group_rates, control).await?;
        let down_mir =
            resolve_mir(session, modem, Direction::Downstream, &mut group_rates, control).await?;

        rates.insert(
            modem.net_modem_id,
            TerminalRates {
                serial_number: modem.serial_number,
                name: modem.name.clone(),
                did: modem.did,
                active: modem.active,
                network_id: modem.network_id,
                inroute_group_id: modem.inroute_group_id,
                up_mir,
                down_mir,
            },
        );
    }

    debug!(
        terminals = rates.len(),
        group_lookups = group_rates.len(),
        "Terminal rates resolved"
    );

    Ok(rates)
}

async fn resolve_mir<S: NmsSession + ?Sized>(
    session: &mut S,
    modem: &NetModemRateEntity,
    direction: Direction,
    group_rates: &mut HashMap<(u32, Direction), f64>,
    control: &RunControl,
) -> Result<f64> {
    let (use_override, value) = match direction {
        Direction::Upstream => (modem.use_inroute_mir, modem.inroute_mir),
        Direction::Downstream => (modem.use_outroute_mir, modem.outroute_mir),
    };
    if use_override {
        return Ok(value);
    }

    let key = (modem.inroute_group_id, direction);
    if let Some(rate) = group_rates.get(&key) {
        return Ok(*rate);
    }

    control.checkpoint(RATES_STAGE)?;
    let rate = session
        .fetch_group_carrier_rate(modem.inroute_group_id, direction)
        .await
        .with_context(|| ReportError::Query { stage: RATES_STAGE })?
        .unwrap_or(0.0);

    group_rates.insert(key, rate);
    Ok(rate)
}

/// Committed rate per terminal, kbit/s.
pub async fn collect_cir<S: NmsSession + ?Sized>(
    session: &mut S,
    terminals: &[u32],
    control: &RunControl,
) -> Result<BTreeMap<u32, CirTotals>> {
    control.checkpoint(CIR_STAGE)?;

    let rows = session
        .fetch_cir(terminals)
        .await
        .with_context(|| ReportError::Query { stage: CIR_STAGE })?;

    let mut cir: BTreeMap<u32, CirTotals> = BTreeMap::new();
    for row in rows {
        let totals = cir.entry(row.remote_id).or_default();
        let kbps = RateUtil::bps_to_kbps(row.cir_bps);
        match row.direction {
            Direction::Upstream => totals.up += kbps,
            Direction::Downstream => totals.down += kbps,
        }
    }

    Ok(cir)
}
