//! Tiered, sharded statistics archive (`nrd_archive`)

pub mod shard_query_builder;
pub mod stats_rows;
pub mod tier;
