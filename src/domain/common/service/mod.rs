//! Shared domain services (tier selection over the report window)

pub mod tier_selector;
