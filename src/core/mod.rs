//! Infrastructure: persistence adapters and shared utilities

pub mod persistence;
pub mod util;
