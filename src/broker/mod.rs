// src/broker/mod.rs

pub mod lapin_client;

use async_trait::async_trait;

use crate::error::BrokerError;
use crate::publish::{DispatchResult, ParsedPublishOptions};

pub use lapin_client::LapinClient;

/// The broker client a connector drives. Implemented over lapin for RabbitMQ and by
/// in-memory doubles in tests.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    type Channel: Clone + Send + Sync + 'static;

    /// Opens a channel suitable for publishing.
    async fn create_publish_channel(&self) -> Result<Self::Channel, BrokerError>;

    /// Whether a previously created channel can still carry publishes. A channel the
    /// broker has closed, or one whose connection dropped, is not.
    fn is_usable(&self, ch: &Self::Channel) -> bool;

    async fn publish(
        &self,
        ch: &Self::Channel,
        exchange: &str,
        queue: &str,
        payload: &[u8],
        options: &ParsedPublishOptions,
    ) -> Result<DispatchResult, BrokerError>;

    async fn close_channel(&self, ch: Self::Channel) -> Result<(), BrokerError>;

    /// Closes the underlying connection, if one was opened.
    async fn close(&self) -> Result<(), BrokerError>;
}
