// Shared test doubles for the connector integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use mq_connector::broker::BrokerClient;
use mq_connector::error::BrokerError;
use mq_connector::publish::{DispatchResult, ParsedPublishOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockChannel {
    pub id: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub exchange: String,
    pub queue: String,
    pub payload: Vec<u8>,
    pub options: ParsedPublishOptions,
    pub channel: MockChannel,
}

/// In-memory broker client. Counts channel creations and records every publish.
#[derive(Default)]
pub struct MockBrokerClient {
    pub create_calls: AtomicUsize,
    pub publish_calls: AtomicUsize,
    pub closed_channels: AtomicUsize,
    pub connection_closed: AtomicBool,
    pub fail_channel: AtomicBool,
    pub fail_publish: AtomicBool,
    pub fail_close: AtomicBool,
    /// Channels with an id up to this value report themselves as closed.
    pub dead_up_to: AtomicUsize,
    pub create_delay: Option<Duration>,
    pub published: Mutex<Vec<Published>>,
}

impl MockBrokerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_channel() -> Self {
        let client = Self::default();
        client.fail_channel.store(true, Ordering::SeqCst);
        client
    }

    pub fn with_create_delay(delay: Duration) -> Self {
        MockBrokerClient {
            create_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Marks every channel handed out so far as closed by the broker.
    pub fn close_existing_channels(&self) {
        self.dead_up_to.store(self.creates(), Ordering::SeqCst);
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn publishes(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrokerClient for MockBrokerClient {
    type Channel = MockChannel;

    async fn create_publish_channel(&self) -> Result<MockChannel, BrokerError> {
        let id = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_channel.load(Ordering::SeqCst) {
            return Err(BrokerError::Client("channel refused".to_string()));
        }
        Ok(MockChannel { id })
    }

    fn is_usable(&self, ch: &MockChannel) -> bool {
        ch.id > self.dead_up_to.load(Ordering::SeqCst)
    }

    async fn publish(
        &self,
        ch: &MockChannel,
        exchange: &str,
        queue: &str,
        payload: &[u8],
        options: &ParsedPublishOptions,
    ) -> Result<DispatchResult, BrokerError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(BrokerError::Client("publish rejected".to_string()));
        }
        self.published.lock().unwrap().push(Published {
            exchange: exchange.to_string(),
            queue: queue.to_string(),
            payload: payload.to_vec(),
            options: options.clone(),
            channel: ch.clone(),
        });
        Ok(DispatchResult::Confirmed)
    }

    async fn close_channel(&self, _ch: MockChannel) -> Result<(), BrokerError> {
        self.closed_channels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(BrokerError::Client("close failed".to_string()));
        }
        self.connection_closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
