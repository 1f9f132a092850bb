//! WebSocket Protocol Messages
//!
//! Every frame is a JSON object with a `type` field. Inbound types are
//! matched case-insensitively, so `{"type":"GetMap"}` and `{"type":"getmap"}`
//! are the same request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Ask for the current map identifier
    GetMap,

    /// Liveness check
    Ping,

    /// Place a pixel. Fields are kept raw so the handler decides what
    /// counts as a valid placement.
    PlacePixel {
        /// Column, if present and integral
        x: Option<i64>,
        /// Row, if present and integral
        y: Option<i64>,
        /// Color code, if present and integral
        color: Option<i64>,
    },

    /// Any other type, lower-cased
    Unknown(String),
}

impl ClientMessage {
    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::invalid_message(e.to_string()))?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(Error::MissingType)?
            .to_lowercase();

        let msg = match kind.as_str() {
            "getmap" => Self::GetMap,
            "ping" => Self::Ping,
            "placepixel" => Self::PlacePixel {
                x: value.get("x").and_then(Value::as_i64),
                y: value.get("y").and_then(Value::as_i64),
                color: value.get("color").and_then(Value::as_i64),
            },
            _ => Self::Unknown(kind),
        };

        Ok(msg)
    }

    /// Lower-cased wire name of the message type
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::GetMap => "getmap",
            Self::Ping => "ping",
            Self::PlacePixel { .. } => "placepixel",
            Self::Unknown(kind) => kind,
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Current or newly replaced map
    Map {
        /// Map identifier (file name under the maps directory)
        data: String,
        /// Why the map changed; null when answering `getmap`
        reason: Option<String>,
    },

    /// Pong response to ping
    Pong,

    /// Error message
    Error {
        /// Human readable description
        data: String,
    },
}

impl ServerMessage {
    /// Create a map message
    #[must_use]
    pub fn map(data: impl Into<String>, reason: Option<String>) -> Self {
        Self::Map {
            data: data.into(),
            reason,
        }
    }

    /// Create an error message
    #[must_use]
    pub fn error(data: impl Into<String>) -> Self {
        Self::Error { data: data.into() }
    }

    /// Serialize to the JSON text sent on the wire
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&Error> for ServerMessage {
    fn from(err: &Error) -> Self {
        Self::error(err.protocol_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(ClientMessage::parse(r#"{"type":"GetMap"}"#).unwrap(), ClientMessage::GetMap);
        assert_eq!(ClientMessage::parse(r#"{"type":"PING"}"#).unwrap(), ClientMessage::Ping);
    }

    #[test]
    fn test_parse_place_pixel() {
        let msg = ClientMessage::parse(r#"{"type":"placePixel","x":3,"y":4,"color":5}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::PlacePixel {
                x: Some(3),
                y: Some(4),
                color: Some(5)
            }
        );
    }

    #[test]
    fn test_parse_place_pixel_keeps_missing_and_non_integer_fields_empty() {
        let msg = ClientMessage::parse(r#"{"type":"placepixel","x":1.5,"y":"4"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::PlacePixel {
                x: None,
                y: None,
                color: None
            }
        );
    }

    #[test]
    fn test_parse_error() {
        let err = ClientMessage::parse("{not json").unwrap_err();
        assert!(matches!(err, Error::InvalidMessage(_)));
    }

    #[test]
    fn test_missing_type() {
        for text in [r#"{}"#, r#"{"type":""}"#, r#"{"type":7}"#, "42", "null", "[1,2]"] {
            let err = ClientMessage::parse(text).unwrap_err();
            assert!(matches!(err, Error::MissingType), "{}", text);
        }
    }

    #[test]
    fn test_unknown_type_is_lowercased() {
        let msg = ClientMessage::parse(r#"{"type":"Dance"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Unknown("dance".into()));
        assert_eq!(msg.kind(), "dance");
    }

    #[test]
    fn test_server_map_serialization() {
        let json = ServerMessage::map("blank.png", None).to_json().unwrap();
        assert_eq!(json, r#"{"type":"map","data":"blank.png","reason":null}"#);

        let json = ServerMessage::map("1.png", Some("fresh".into()))
            .to_json()
            .unwrap();
        assert_eq!(json, r#"{"type":"map","data":"1.png","reason":"fresh"}"#);
    }

    #[test]
    fn test_server_pong_and_error_serialization() {
        assert_eq!(ServerMessage::Pong.to_json().unwrap(), r#"{"type":"pong"}"#);
        let json = ServerMessage::from(&Error::MissingType).to_json().unwrap();
        assert_eq!(json, r#"{"type":"error","data":"missing type"}"#);
    }
}
