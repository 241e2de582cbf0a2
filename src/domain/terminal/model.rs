use serde::Serialize;

/// Network → inroute groups → terminals, as shown in the terminal picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkNode {
    pub network_id: u32,
    pub name: String,
    pub groups: Vec<InrouteGroupNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InrouteGroupNode {
    pub inroute_group_id: u32,
    pub name: String,
    pub terminals: Vec<TerminalNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminalNode {
    pub unique_id: u32,
    pub serial_number: u32,
    pub name: String,
    pub active: bool,
    /// `"{name} S/N {serial}"`, with `" (disabled)"` for inactive terminals.
    pub label: String,
}

impl TerminalNode {
    pub fn label_for(name: &str, serial_number: u32, active: bool) -> String {
        if active {
            format!("{name} S/N {serial_number}")
        } else {
            format!("{name} S/N {serial_number} (disabled)")
        }
    }
}
