pub mod logs;
#[cfg(test)]
pub mod memory_store;
pub mod mysql;
pub mod nms;
pub mod report_store_trait;
pub mod stats;
