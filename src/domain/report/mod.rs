pub mod dto;
pub mod error;
pub mod model;
pub mod run_control;
pub mod service;
