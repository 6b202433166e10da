// src/publish/mod.rs

//! The publish pipeline: parse options, acquire the publish channel, dispatch.
//!
//! Backends plug in through [`PublishBackend`]. [`send_message`] is the only place
//! where stage failures are translated into a [`ConnectorError`].

pub mod options;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::error::{BrokerError, Cause, ConnectorError, ErrorContext, ErrorKind, ParseError, Result};
use crate::utils::prometheus_metrics::*;

pub use options::{parse_publish_options, ParsedPublishOptions, PublishOptionsMap};

/// Caller input for a single publish.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishRequest {
    /// Target exchange. `None` publishes through the default exchange (`""`).
    pub exchange: Option<String>,
    pub queue: String,
    pub message: Vec<u8>,
    pub options: Option<PublishOptionsMap>,
}

impl PublishRequest {
    pub fn new(queue: impl Into<String>, message: impl Into<Vec<u8>>) -> Self {
        PublishRequest {
            exchange: None,
            queue: queue.into(),
            message: message.into(),
            options: None,
        }
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    pub fn with_options(mut self, options: PublishOptionsMap) -> Self {
        self.options = Some(options);
        self
    }
}

/// Everything the dispatcher needs for one broker write.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch<Ch> {
    pub exchange: String,
    pub queue: String,
    pub message: Vec<u8>,
    pub options: ParsedPublishOptions,
    pub ch: Ch,
}

/// What the broker reported for a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// The broker confirmed the message.
    Confirmed,
    /// Confirmed, but returned as unroutable (only with `mandatory`).
    Returned { reply_code: u16, reply_text: String },
    /// Written to a channel without publisher confirms.
    Sent,
}

/// Capabilities a backend provides to the publish pipeline.
#[async_trait]
pub trait PublishBackend: Send + Sync {
    type Channel: Clone + Send + Sync + 'static;

    fn parse_publish_options(
        &self,
        options: &PublishOptionsMap,
    ) -> std::result::Result<ParsedPublishOptions, ParseError>;

    /// Returns the cached publish channel, creating it on first use.
    async fn get_publish_channel(&self) -> std::result::Result<Self::Channel, BrokerError>;

    async fn send_message_to_mq(
        &self,
        dispatch: Dispatch<Self::Channel>,
    ) -> std::result::Result<DispatchResult, BrokerError>;
}

fn wrap(cause: Cause, exchange: &str, queue: &str) -> ConnectorError {
    PUBLISH_ERRORS_TOTAL.inc();
    warn!(exchange, queue, error = %cause, "Failed to send message");
    ConnectorError::new(ErrorKind::SendMessage, cause).with_context(ErrorContext {
        exchange: exchange.to_string(),
        queue: queue.to_string(),
    })
}

/// Sends one message through `backend`.
///
/// Stages run in order and stop at the first failure, so a parse failure never
/// touches the network. Any failure comes back as `MQ_SEND_MESSAGE_ERROR`.
#[instrument(skip_all, fields(queue = %request.queue))]
pub async fn send_message<B>(backend: &B, request: PublishRequest) -> Result<DispatchResult>
where
    B: PublishBackend + ?Sized,
{
    let PublishRequest {
        exchange,
        queue,
        message,
        options,
    } = request;
    let exchange = exchange.unwrap_or_default();
    let options = options.unwrap_or_default();

    let parsed = backend
        .parse_publish_options(&options)
        .map_err(|e| wrap(Cause::Parse(e), &exchange, &queue))?;

    let ch = backend
        .get_publish_channel()
        .await
        .map_err(|e| wrap(Cause::Channel(e), &exchange, &queue))?;

    let context = (exchange.clone(), queue.clone());
    let timer = PUBLISH_DURATION_SECONDS.start_timer();
    let dispatched = backend
        .send_message_to_mq(Dispatch {
            exchange,
            queue,
            message,
            options: parsed,
            ch,
        })
        .await;
    timer.observe_duration();

    match dispatched {
        Ok(result) => {
            MESSAGES_PUBLISHED_TOTAL.inc();
            debug!(exchange = %context.0, ?result, "Message dispatched");
            Ok(result)
        }
        Err(e) => Err(wrap(Cause::Dispatch(e), &context.0, &context.1)),
    }
}
