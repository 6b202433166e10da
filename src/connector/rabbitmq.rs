// src/connector/rabbitmq.rs

use async_trait::async_trait;
use tracing::{error, info, instrument};

use super::channel::ChannelProvider;
use super::{Connector, ConnectorType};
use crate::broker::{BrokerClient, LapinClient};
use crate::config::connector::ConnectorConfig;
use crate::error::{BrokerError, Cause, ConnectorError, ErrorKind, ParseError, Result};
use crate::publish::{
    self, parse_publish_options, Dispatch, DispatchResult, ParsedPublishOptions, PublishBackend,
    PublishOptionsMap, PublishRequest,
};
use crate::utils::prometheus_metrics::*;

/// RabbitMQ connector. Owns at most one publish channel, created on the first send.
pub struct RabbitMqConnector<C: BrokerClient = LapinClient> {
    client: C,
    publish_channel: ChannelProvider<C::Channel>,
}

impl RabbitMqConnector<LapinClient> {
    pub fn new(config: &ConnectorConfig) -> Self {
        Self::with_client(LapinClient::from_config(config))
    }
}

impl<C: BrokerClient> RabbitMqConnector<C> {
    /// Builds a connector over any broker client, e.g. a test double.
    pub fn with_client(client: C) -> Self {
        RabbitMqConnector {
            client,
            publish_channel: ChannelProvider::new(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// The cached publish channel, if one has been created.
    pub async fn publish_channel(&self) -> Option<C::Channel> {
        self.publish_channel.cached().await
    }
}

#[async_trait]
impl<C: BrokerClient> PublishBackend for RabbitMqConnector<C> {
    type Channel = C::Channel;

    fn parse_publish_options(
        &self,
        options: &PublishOptionsMap,
    ) -> std::result::Result<ParsedPublishOptions, ParseError> {
        parse_publish_options(options)
    }

    async fn get_publish_channel(&self) -> std::result::Result<C::Channel, BrokerError> {
        let create = || async {
            match self.client.create_publish_channel().await {
                Ok(ch) => {
                    PUBLISH_CHANNELS_CREATED_TOTAL.inc();
                    info!("Created RabbitMQ publish channel");
                    Ok(ch)
                }
                Err(e) => {
                    PUBLISH_CHANNEL_ERRORS_TOTAL.inc();
                    error!(error = %e, "Failed to create RabbitMQ publish channel");
                    Err(e)
                }
            }
        };
        self.publish_channel
            .get_or_create(|ch| self.client.is_usable(ch), create)
            .await
    }

    async fn send_message_to_mq(
        &self,
        dispatch: Dispatch<C::Channel>,
    ) -> std::result::Result<DispatchResult, BrokerError> {
        let Dispatch {
            exchange,
            queue,
            message,
            options,
            ch,
        } = dispatch;
        self.client
            .publish(&ch, &exchange, &queue, &message, &options)
            .await
    }
}

#[async_trait]
impl<C: BrokerClient> Connector for RabbitMqConnector<C> {
    fn connector_type(&self) -> ConnectorType {
        ConnectorType::RabbitMq
    }

    async fn send_message(&self, request: PublishRequest) -> Result<DispatchResult> {
        publish::send_message(self, request).await
    }

    /// Closes the publish channel and then the connection. Both are attempted; the first
    /// failure is reported.
    #[instrument(skip(self))]
    async fn close(&self) -> Result<()> {
        let mut first_error = None;

        if let Some(ch) = self.publish_channel.take().await {
            if let Err(e) = self.client.close_channel(ch).await {
                error!(error = %e, "Failed to close publish channel");
                first_error = Some(e);
            }
        }
        if let Err(e) = self.client.close().await {
            error!(error = %e, "Failed to close broker connection");
            if first_error.is_none() {
                first_error = Some(e);
            }
        }

        match first_error {
            Some(e) => Err(ConnectorError::new(ErrorKind::CloseConnection, Cause::Close(e))),
            None => {
                info!("Connector closed");
                Ok(())
            }
        }
    }
}
