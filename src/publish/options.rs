use serde_json::{Map, Value};

use crate::error::ParseError;

/// Raw, caller-supplied publish flags. Keys follow the camelCase names AMQP client
/// libraries use (`deliveryMode`, `contentType`, ...).
pub type PublishOptionsMap = Map<String, Value>;

/// Normalized publish options. Every field left as `None` means "let the broker decide".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPublishOptions {
    pub mandatory: Option<bool>,
    pub immediate: Option<bool>,
    pub persistent: Option<bool>,
    pub delivery_mode: Option<u8>,
    pub priority: Option<u8>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub headers: Option<Map<String, Value>>,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    pub expiration: Option<String>,
    pub message_id: Option<String>,
    pub timestamp: Option<u64>,
    pub kind: Option<String>,
    pub user_id: Option<String>,
    pub app_id: Option<String>,
}

impl ParsedPublishOptions {
    /// True when no flag is set.
    pub fn is_empty(&self) -> bool {
        *self == ParsedPublishOptions::default()
    }

    /// The delivery mode to put on the wire, if any. An explicit `deliveryMode` wins over
    /// `persistent`.
    pub fn effective_delivery_mode(&self) -> Option<u8> {
        self.delivery_mode
            .or_else(|| self.persistent.map(|p| if p { 2 } else { 1 }))
    }
}

/// Parses the raw options mapping. Pure: no I/O, no connector state.
///
/// `null` values are treated as absent. Unknown keys and wrongly typed values are rejected.
pub fn parse_publish_options(options: &PublishOptionsMap) -> Result<ParsedPublishOptions, ParseError> {
    let mut parsed = ParsedPublishOptions::default();

    for (key, value) in options {
        if value.is_null() {
            continue;
        }
        match key.as_str() {
            "mandatory" => parsed.mandatory = Some(as_bool(key, value)?),
            "immediate" => parsed.immediate = Some(as_bool(key, value)?),
            "persistent" => parsed.persistent = Some(as_bool(key, value)?),
            "deliveryMode" => parsed.delivery_mode = Some(as_delivery_mode(key, value)?),
            "priority" => parsed.priority = Some(as_u8(key, value)?),
            "contentType" => parsed.content_type = Some(as_string(key, value)?),
            "contentEncoding" => parsed.content_encoding = Some(as_string(key, value)?),
            "headers" => match value {
                Value::Object(map) => parsed.headers = Some(map.clone()),
                _ => return Err(invalid_type(key, "an object")),
            },
            "correlationId" => parsed.correlation_id = Some(as_string(key, value)?),
            "replyTo" => parsed.reply_to = Some(as_string(key, value)?),
            "expiration" => parsed.expiration = Some(as_expiration(key, value)?),
            "messageId" => parsed.message_id = Some(as_string(key, value)?),
            "timestamp" => {
                parsed.timestamp = Some(
                    value
                        .as_u64()
                        .ok_or_else(|| invalid_type(key, "a non-negative integer"))?,
                )
            }
            "type" => parsed.kind = Some(as_string(key, value)?),
            "userId" => parsed.user_id = Some(as_string(key, value)?),
            "appId" => parsed.app_id = Some(as_string(key, value)?),
            other => return Err(ParseError::UnknownOption(other.to_string())),
        }
    }

    Ok(parsed)
}

fn invalid_type(key: &str, expected: &'static str) -> ParseError {
    ParseError::InvalidType {
        key: key.to_string(),
        expected,
    }
}

fn as_bool(key: &str, value: &Value) -> Result<bool, ParseError> {
    value.as_bool().ok_or_else(|| invalid_type(key, "a boolean"))
}

fn as_string(key: &str, value: &Value) -> Result<String, ParseError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid_type(key, "a string"))
}

fn as_u8(key: &str, value: &Value) -> Result<u8, ParseError> {
    let n = value
        .as_u64()
        .ok_or_else(|| invalid_type(key, "a non-negative integer"))?;
    u8::try_from(n).map_err(|_| ParseError::OutOfRange {
        key: key.to_string(),
        value: n.to_string(),
    })
}

// Accepts 1/2 or a boolean (true = persistent).
fn as_delivery_mode(key: &str, value: &Value) -> Result<u8, ParseError> {
    if let Some(persistent) = value.as_bool() {
        return Ok(if persistent { 2 } else { 1 });
    }
    match as_u8(key, value)? {
        mode @ (1 | 2) => Ok(mode),
        other => Err(ParseError::OutOfRange {
            key: key.to_string(),
            value: other.to_string(),
        }),
    }
}

// Per-message TTL in milliseconds; AMQP carries it as a short string.
fn as_expiration(key: &str, value: &Value) -> Result<String, ParseError> {
    match value {
        Value::String(s) if s.parse::<u64>().is_ok() => Ok(s.clone()),
        Value::String(s) => Err(ParseError::OutOfRange {
            key: key.to_string(),
            value: s.clone(),
        }),
        Value::Number(n) => n
            .as_u64()
            .map(|ms| ms.to_string())
            .ok_or_else(|| ParseError::OutOfRange {
                key: key.to_string(),
                value: n.to_string(),
            }),
        _ => Err(invalid_type(key, "a string or a non-negative integer")),
    }
}
