// Connector layer for publishing messages to a message broker (RabbitMQ).
//
// Application code builds a connector with `connector::get_connector` and calls
// `send_message`; channel lifecycle and error normalization live here.
pub mod broker;
pub mod config;
pub mod connector;
pub mod error;
pub mod publish;
pub mod utils;

pub use connector::{get_connector, Connector, ConnectorType, RabbitMqConnector};
pub use error::{ConnectorError, ErrorKind, Result, MQ_SEND_MESSAGE_ERROR};
pub use publish::{DispatchResult, PublishRequest};
