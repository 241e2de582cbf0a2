//! Domain layer: report engine, terminal tree, system services

pub mod common;
pub mod report;
pub mod system;
pub mod terminal;
