// src/connector/mod.rs

pub mod channel;
pub mod rabbitmq;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::connector::ConnectorConfig;
use crate::error::Result;
use crate::publish::{DispatchResult, PublishRequest};

pub use channel::ChannelProvider;
pub use rabbitmq::RabbitMqConnector;

/// Backend identifier used by the factory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorType {
    #[default]
    #[serde(rename = "RABBIT_MQ")]
    RabbitMq,
}

impl ConnectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorType::RabbitMq => "RABBIT_MQ",
        }
    }
}

impl fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "RABBIT_MQ" => Ok(ConnectorType::RabbitMq),
            other => Err(format!("unknown connector type '{}'", other)),
        }
    }
}

/// What application code talks to. Object safe so the factory can hand out any backend.
#[async_trait]
pub trait Connector: Send + Sync {
    fn connector_type(&self) -> ConnectorType;

    /// Publishes one message. Every failure is reported as `MQ_SEND_MESSAGE_ERROR`.
    async fn send_message(&self, request: PublishRequest) -> Result<DispatchResult>;

    async fn close(&self) -> Result<()>;
}

/// Builds the connector for `connector_type`. Nothing touches the network until the
/// first send.
pub fn get_connector(connector_type: ConnectorType, config: &ConnectorConfig) -> Box<dyn Connector> {
    info!(%connector_type, "Creating connector");
    match connector_type {
        ConnectorType::RabbitMq => Box::new(RabbitMqConnector::new(config)),
    }
}
