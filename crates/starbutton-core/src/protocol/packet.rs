//! Packet envelope, packet type tags, and the datagram codec.
//!
//! Every datagram carries exactly one JSON object:
//!
//! | Field      | Type             | Notes                                          |
//! |------------|------------------|------------------------------------------------|
//! | `type`     | string           | One of the [`PacketType`] wire names           |
//! | `packetId` | string or number | Optional; echoed verbatim in replies           |
//! | `timestamp`| integer          | Optional; milliseconds since the Unix epoch    |
//! | `payload`  | string or null   | Optional; a JSON document encoded as a string  |
//!
//! Decoding is split in two stages so that a broken payload never prevents
//! the envelope from being read: [`decode_packet`] parses the envelope, and
//! [`Packet::decode_payload`] parses the embedded document on demand.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while decoding a datagram or its payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The datagram bytes are not valid UTF-8.
    #[error("datagram is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The datagram text is not a valid packet envelope.
    #[error("invalid packet JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The embedded payload document could not be decoded for this packet type.
    #[error("invalid {packet_type} payload: {source}")]
    InvalidPayload {
        packet_type: PacketType,
        #[source]
        source: serde_json::Error,
    },
}

// ── Packet type ───────────────────────────────────────────────────────────────

/// The `type` tag of a packet.
///
/// Unrecognised tags decode to [`PacketType::Unknown`] rather than failing, so
/// the dispatcher can log the name and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PacketType {
    HealthCheckPing,
    HealthCheckPong,
    MacroCommand,
    MacroAck,
    TriggerImportBrowser,
    CaptureMousePosition,
    AutoDragLoopCommand,
    Unknown(String),
}

impl PacketType {
    /// Returns the wire name of this packet type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::HealthCheckPing => "HEALTH_CHECK_PING",
            Self::HealthCheckPong => "HEALTH_CHECK_PONG",
            Self::MacroCommand => "MACRO_COMMAND",
            Self::MacroAck => "MACRO_ACK",
            Self::TriggerImportBrowser => "TRIGGER_IMPORT_BROWSER",
            Self::CaptureMousePosition => "CAPTURE_MOUSE_POSITION",
            Self::AutoDragLoopCommand => "AUTO_DRAG_LOOP_COMMAND",
            Self::Unknown(name) => name,
        }
    }

    /// Parses a wire name.  Never fails; unknown names are preserved.
    pub fn from_wire(name: &str) -> Self {
        match name {
            "HEALTH_CHECK_PING" => Self::HealthCheckPing,
            "HEALTH_CHECK_PONG" => Self::HealthCheckPong,
            "MACRO_COMMAND" => Self::MacroCommand,
            "MACRO_ACK" => Self::MacroAck,
            "TRIGGER_IMPORT_BROWSER" => Self::TriggerImportBrowser,
            "CAPTURE_MOUSE_POSITION" => Self::CaptureMousePosition,
            "AUTO_DRAG_LOOP_COMMAND" => Self::AutoDragLoopCommand,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PacketType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PacketType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&name))
    }
}

// ── Packet id ─────────────────────────────────────────────────────────────────

/// Opaque request identifier chosen by the sender.
///
/// The phone app sends strings, but numbers are accepted and echoed back
/// unchanged so the sender can correlate the reply either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PacketId {
    Text(String),
    Number(serde_json::Number),
}

impl PacketId {
    /// An empty string id is treated the same as a missing one.
    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for PacketId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PacketId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ── Packet ────────────────────────────────────────────────────────────────────

/// One decoded datagram.
///
/// Replies serialize fields in the order the phone app expects
/// (`packetId`, `timestamp`, `type`, `payload`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    #[serde(rename = "packetId", default, deserialize_with = "deserialize_packet_id")]
    pub packet_id: Option<PacketId>,

    #[serde(default)]
    pub timestamp: Option<i64>,

    #[serde(rename = "type")]
    pub packet_type: PacketType,

    #[serde(default, deserialize_with = "deserialize_payload")]
    pub payload: Option<String>,
}

impl Packet {
    /// Creates a packet with no id, timestamp, or payload.
    pub fn new(packet_type: PacketType) -> Self {
        Self {
            packet_id: None,
            timestamp: None,
            packet_type,
            payload: None,
        }
    }

    /// Sets the packet id.
    pub fn with_packet_id(mut self, id: impl Into<PacketId>) -> Self {
        self.packet_id = Some(id.into());
        self
    }

    /// Sets the timestamp (milliseconds since the Unix epoch).
    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp = Some(timestamp_ms);
        self
    }

    /// Encodes `payload` as JSON text and stores it as the packet payload.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if `payload` cannot be serialised.
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_string(payload)?);
        Ok(self)
    }

    /// Builds the `HEALTH_CHECK_PONG` reply for a ping.
    pub fn pong(packet_id: PacketId, timestamp_ms: i64) -> Self {
        Self::new(PacketType::HealthCheckPong)
            .with_packet_id(packet_id)
            .with_timestamp(timestamp_ms)
    }

    /// Builds the `MACRO_ACK` reply for a macro command.
    pub fn macro_ack(packet_id: PacketId, timestamp_ms: i64) -> Self {
        Self::new(PacketType::MacroAck)
            .with_packet_id(packet_id)
            .with_timestamp(timestamp_ms)
    }

    /// Decodes the embedded payload document as `T`.
    ///
    /// Returns `Ok(None)` when the packet carries no payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidPayload`] if the payload text is not a
    /// valid `T`.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<Option<T>, DecodeError> {
        let Some(text) = self.payload.as_deref() else {
            return Ok(None);
        };
        serde_json::from_str(text)
            .map(Some)
            .map_err(|source| DecodeError::InvalidPayload {
                packet_type: self.packet_type.clone(),
                source,
            })
    }
}

/// Decodes one datagram into a [`Packet`].
///
/// Surrounding whitespace (e.g. a trailing newline from a test client) is
/// ignored.
///
/// # Errors
///
/// Returns [`DecodeError::InvalidUtf8`] or [`DecodeError::InvalidJson`].
///
/// # Examples
///
/// ```rust
/// use starbutton_core::protocol::{decode_packet, PacketType};
///
/// let packet = decode_packet(br#"{"type":"HEALTH_CHECK_PING","packetId":"7"}"#).unwrap();
/// assert_eq!(packet.packet_type, PacketType::HealthCheckPing);
/// assert_eq!(packet.packet_id.unwrap().to_string(), "7");
/// ```
pub fn decode_packet(datagram: &[u8]) -> Result<Packet, DecodeError> {
    let text = std::str::from_utf8(datagram)?;
    Ok(serde_json::from_str(text.trim())?)
}

/// Encodes a [`Packet`] as the bytes of one datagram.
///
/// # Errors
///
/// Returns the `serde_json` error if encoding fails.
pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(packet)
}

fn deserialize_packet_id<'de, D>(deserializer: D) -> Result<Option<PacketId>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = Option::<PacketId>::deserialize(deserializer)?;
    Ok(id.filter(|id| !id.is_blank()))
}

/// Accepts a JSON string (the documented double encoding), `null`, or an
/// inline JSON value, which is kept as its serialised text.
fn deserialize_payload<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(Value::String(text)) => Some(text),
        Some(inline) => Some(inline.to_string()),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
