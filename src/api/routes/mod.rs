//! API route declarations (e.g., /api/v1/*)

pub mod report_routes;
pub mod system_routes;
pub mod terminal_routes;
