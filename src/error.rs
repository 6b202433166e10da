use std::fmt;

use thiserror::Error;

/// Kind string reported for every failed `send_message` call.
pub const MQ_SEND_MESSAGE_ERROR: &str = "MQ_SEND_MESSAGE_ERROR";
/// Kind string reported when closing a connector fails.
pub const MQ_CLOSE_CONNECTION_ERROR: &str = "MQ_CLOSE_CONNECTION_ERROR";

/// Custom Result type for connector operations.
pub type Result<T> = std::result::Result<T, ConnectorError>;

/// Discriminator callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SendMessage,
    CloseConnection,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SendMessage => MQ_SEND_MESSAGE_ERROR,
            ErrorKind::CloseConnection => MQ_CLOSE_CONNECTION_ERROR,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised by the publish options parser when the mapping is structurally invalid.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Unknown publish option '{0}'")]
    UnknownOption(String),

    #[error("Publish option '{key}' must be {expected}")]
    InvalidType { key: String, expected: &'static str },

    #[error("Publish option '{key}' out of range: {value}")]
    OutOfRange { key: String, value: String },
}

/// Native failure shape of the broker client (channel creation and publish).
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("AMQP error: {source}")]
    Amqp {
        #[from]
        source: lapin::Error,
    },

    #[error("Broker negatively acknowledged the message")]
    Nacked,

    #[error("Broker client error: {0}")]
    Client(String),
}

/// The stage of the publish pipeline that produced a failure, carrying its native error.
#[derive(Error, Debug)]
pub enum Cause {
    #[error("invalid publish options: {0}")]
    Parse(#[source] ParseError),

    #[error("could not acquire publish channel: {0}")]
    Channel(#[source] BrokerError),

    #[error("dispatch failed: {0}")]
    Dispatch(#[source] BrokerError),

    #[error("close failed: {0}")]
    Close(#[source] BrokerError),
}

/// Where the failed call was headed. Attached for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub exchange: String,
    pub queue: String,
}

/// Uniform failure envelope returned by every connector operation.
#[derive(Error, Debug)]
#[error("{kind}: {cause}")]
pub struct ConnectorError {
    kind: ErrorKind,
    #[source]
    cause: Cause,
    context: Option<ErrorContext>,
}

impl ConnectorError {
    pub fn new(kind: ErrorKind, cause: Cause) -> Self {
        ConnectorError {
            kind,
            cause,
            context: None,
        }
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The kind as its stable string form, e.g. `MQ_SEND_MESSAGE_ERROR`.
    pub fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn cause(&self) -> &Cause {
        &self.cause
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        self.context.as_ref()
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
