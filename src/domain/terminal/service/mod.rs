use std::collections::HashMap;

use anyhow::{Context, Result};
use tracing::{debug, error};

use crate::core::persistence::nms::nms_entity::{InrouteGroupEntity, NetModemEntity, NetworkEntity};
use crate::core::persistence::report_store_trait::{NmsSession, ReportStore};
use crate::domain::report::error::ReportError;
use crate::domain::terminal::model::{InrouteGroupNode, NetworkNode, TerminalNode};

pub struct TerminalService<S: ReportStore> {
    store: S,
}

impl<S: ReportStore> TerminalService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get_terminals_tree(&self) -> Result<Vec<NetworkNode>> {
        let mut session = self.store.connect().await.map_err(|err| {
            error!(error = %err, "Terminal tree could not reach the NMS database");
            ReportError::Connection(format!("{err:#}"))
        })?;

        get_terminals_tree_with_session(&mut session).await
    }
}

async fn get_terminals_tree_with_session<N: NmsSession + ?Sized>(
    session: &mut N,
) -> Result<Vec<NetworkNode>> {
    let networks = session.fetch_networks().await.context("failed to load networks")?;
    let groups = session
        .fetch_inroute_groups()
        .await
        .context("failed to load inroute groups")?;
    let modems = session
        .fetch_net_modems()
        .await
        .context("failed to load terminals")?;

    debug!(
        networks = networks.len(),
        groups = groups.len(),
        terminals = modems.len(),
        "Building terminal tree"
    );

    Ok(build_tree(networks, groups, modems))
}

/// Nest terminals under groups under networks, keeping the input order at
/// every level. Groups and terminals whose parent is missing are dropped.
pub fn build_tree(
    networks: Vec<NetworkEntity>,
    groups: Vec<InrouteGroupEntity>,
    modems: Vec<NetModemEntity>,
) -> Vec<NetworkNode> {
    let mut terminals_by_group: HashMap<u32, Vec<TerminalNode>> = HashMap::new();
    for modem in modems {
        terminals_by_group
            .entry(modem.inroute_group_id)
            .or_default()
            .push(TerminalNode {
                label: TerminalNode::label_for(&modem.name, modem.serial_number, modem.active),
                unique_id: modem.net_modem_id,
                serial_number: modem.serial_number,
                name: modem.name,
                active: modem.active,
            });
    }

    let mut groups_by_network: HashMap<u32, Vec<InrouteGroupNode>> = HashMap::new();
    for group in groups {
        groups_by_network
            .entry(group.network_id)
            .or_default()
            .push(InrouteGroupNode {
                terminals: terminals_by_group
                    .remove(&group.inroute_group_id)
                    .unwrap_or_default(),
                inroute_group_id: group.inroute_group_id,
                name: group.name,
            });
    }

    networks
        .into_iter()
        .map(|network| NetworkNode {
            groups: groups_by_network
                .remove(&network.network_id)
                .unwrap_or_default(),
            network_id: network.network_id,
            name: network.name,
        })
        .collect()
}
