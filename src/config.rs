// src/config.rs

pub mod connector;
pub mod publisher;

pub use connector::{load_connector_config, ConnectorConfig};
