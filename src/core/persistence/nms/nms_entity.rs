use crate::domain::common::model::Direction;

/// Row of `nms.Network`.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkEntity {
    pub network_id: u32,
    pub name: String,
}

/// Row of `nms.InrouteGroup`.
#[derive(Debug, Clone, PartialEq)]
pub struct InrouteGroupEntity {
    pub inroute_group_id: u32,
    pub name: String,
    pub network_id: u32,
}

/// Remote terminal as listed in the tree (`nms.NetModem`).
#[derive(Debug, Clone, PartialEq)]
pub struct NetModemEntity {
    pub net_modem_id: u32,
    pub serial_number: u32,
    pub name: String,
    pub inroute_group_id: u32,
    pub active: bool,
}

/// Terminal identity plus its own rate overrides.
///
/// `use_*_mir` mirror the NMS `Use{Inroute,Outroute}MaximumDataRate` flags; when
/// a flag is off the override value is meaningless and the group carrier rate
/// applies instead.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NetModemRateEntity {
    pub net_modem_id: u32,
    pub serial_number: u32,
    pub name: String,
    pub did: u32,
    pub active: bool,
    pub use_inroute_mir: bool,
    pub inroute_mir: f64,
    pub use_outroute_mir: bool,
    pub outroute_mir: f64,
    pub inroute_group_id: u32,
    pub network_id: u32,
}

/// `SUM(CIR_BPS)` of one terminal's virtual remotes for one direction.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualRemoteCirEntity {
    pub remote_id: u32,
    pub direction: Direction,
    pub cir_bps: f64,
}
