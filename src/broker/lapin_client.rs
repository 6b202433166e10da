// src/broker/lapin_client.rs

use async_trait::async_trait;
use lapin::{
    options::{BasicPublishOptions, ConfirmSelectOptions},
    protocol::basic::AMQPProperties,
    publisher_confirm::Confirmation,
    types::{AMQPValue, FieldArray, FieldTable, ShortString},
    Channel, Connection,
};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::BrokerClient;
use crate::config::connector::ConnectorConfig;
use crate::error::BrokerError;
use crate::publish::{DispatchResult, ParsedPublishOptions};
use crate::utils::common::connect_rabbitmq;

const REPLY_SUCCESS: u16 = 200;

/// RabbitMQ client over lapin. The connection is opened on the first channel request.
pub struct LapinClient {
    uri: String,
    publish_confirm: bool,
    connection: Mutex<Option<Connection>>,
}

impl LapinClient {
    pub fn new(uri: impl Into<String>, publish_confirm: bool) -> Self {
        LapinClient {
            uri: uri.into(),
            publish_confirm,
            connection: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ConnectorConfig) -> Self {
        Self::new(config.mq_uri.clone(), config.publish_confirm)
    }
}

#[async_trait]
impl BrokerClient for LapinClient {
    type Channel = Channel;

    async fn create_publish_channel(&self) -> Result<Channel, BrokerError> {
        let mut connection = self.connection.lock().await;
        let connected = connection
            .as_ref()
            .is_some_and(|conn| conn.status().connected());
        if !connected {
            if connection.is_some() {
                warn!(uri = %self.uri, "RabbitMQ connection lost, reconnecting");
            }
            *connection = Some(connect_rabbitmq(&self.uri).await?);
        }
        let conn = connection
            .as_ref()
            .ok_or_else(|| BrokerError::Client("connection unavailable".to_string()))?;

        let channel = conn.create_channel().await?;
        if self.publish_confirm {
            channel
                .confirm_select(ConfirmSelectOptions::default())
                .await?;
        }
        debug!(
            channel_id = channel.id(),
            confirm = self.publish_confirm,
            "Opened publish channel"
        );
        Ok(channel)
    }

    fn is_usable(&self, ch: &Channel) -> bool {
        ch.status().connected()
    }

    async fn publish(
        &self,
        ch: &Channel,
        exchange: &str,
        queue: &str,
        payload: &[u8],
        options: &ParsedPublishOptions,
    ) -> Result<DispatchResult, BrokerError> {
        let confirmation = ch
            .basic_publish(
                exchange,
                queue,
                publish_options(options),
                payload,
                properties(options),
            )
            .await?
            .await?;

        match confirmation {
            Confirmation::Ack(None) => Ok(DispatchResult::Confirmed),
            Confirmation::Ack(Some(returned)) => {
                warn!(
                    exchange,
                    queue,
                    reply_code = returned.reply_code,
                    reply_text = returned.reply_text.as_str(),
                    "Message returned as unroutable"
                );
                Ok(DispatchResult::Returned {
                    reply_code: returned.reply_code,
                    reply_text: returned.reply_text.as_str().to_string(),
                })
            }
            Confirmation::Nack(_) => Err(BrokerError::Nacked),
            Confirmation::NotRequested => Ok(DispatchResult::Sent),
        }
    }

    async fn close_channel(&self, ch: Channel) -> Result<(), BrokerError> {
        ch.close(REPLY_SUCCESS, "Bye").await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        if let Some(conn) = self.connection.lock().await.take() {
            conn.close(REPLY_SUCCESS, "Bye").await?;
            info!(uri = %self.uri, "Closed RabbitMQ connection");
        }
        Ok(())
    }
}

fn publish_options(options: &ParsedPublishOptions) -> BasicPublishOptions {
    BasicPublishOptions {
        mandatory: options.mandatory.unwrap_or(false),
        immediate: options.immediate.unwrap_or(false),
    }
}

fn short(value: &str) -> ShortString {
    ShortString::from(value)
}

/// Maps parsed options onto AMQP basic properties; unset options stay unset.
pub fn properties(options: &ParsedPublishOptions) -> AMQPProperties {
    let mut props = AMQPProperties::default();
    if let Some(mode) = options.effective_delivery_mode() {
        props = props.with_delivery_mode(mode);
    }
    if let Some(priority) = options.priority {
        props = props.with_priority(priority);
    }
    if let Some(v) = &options.content_type {
        props = props.with_content_type(short(v));
    }
    if let Some(v) = &options.content_encoding {
        props = props.with_content_encoding(short(v));
    }
    if let Some(headers) = &options.headers {
        props = props.with_headers(field_table(headers));
    }
    if let Some(v) = &options.correlation_id {
        props = props.with_correlation_id(short(v));
    }
    if let Some(v) = &options.reply_to {
        props = props.with_reply_to(short(v));
    }
    if let Some(v) = &options.expiration {
        props = props.with_expiration(short(v));
    }
    if let Some(v) = &options.message_id {
        props = props.with_message_id(short(v));
    }
    if let Some(ts) = options.timestamp {
        props = props.with_timestamp(ts);
    }
    if let Some(v) = &options.kind {
        props = props.with_type(short(v));
    }
    if let Some(v) = &options.user_id {
        props = props.with_user_id(short(v));
    }
    if let Some(v) = &options.app_id {
        props = props.with_app_id(short(v));
    }
    props
}

fn field_table(headers: &Map<String, Value>) -> FieldTable {
    let mut table = FieldTable::default();
    for (key, value) in headers {
        table.insert(short(key), amqp_value(value));
    }
    table
}

fn amqp_value(value: &Value) -> AMQPValue {
    match value {
        Value::Null => AMQPValue::Void,
        Value::Bool(b) => AMQPValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AMQPValue::LongLongInt(i),
            None => AMQPValue::Double(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => AMQPValue::LongString(s.as_str().into()),
        Value::Array(items) => {
            AMQPValue::FieldArray(FieldArray::from(items.iter().map(amqp_value).collect::<Vec<_>>()))
        }
        Value::Object(map) => AMQPValue::FieldTable(field_table(map)),
    }
}
