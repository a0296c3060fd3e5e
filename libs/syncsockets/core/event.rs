//! Wire format
//!
//! Two JSON shapes travel over the connection:
//!
//! ```text
//! control: { "type": "subscribe" | "unsubscribe" | "ping", "channel"?, "timestamp" }
//! event:   { "id", "type", "timestamp", "data", "userId"?, "vehicleId"?, "bookingId"? }
//! ```
//!
//! Timestamps are RFC 3339 strings. Payloads (`data`) are opaque JSON and are
//! not validated beyond the envelope.

use crate::traits::{Result, SyncError, WsMessage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The six categories of payload the dispatcher routes on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    BookingUpdate,
    VehicleAvailability,
    ChatMessage,
    LocationUpdate,
    EmergencyAlert,
    PriceChange,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        EventType::BookingUpdate,
        EventType::VehicleAvailability,
        EventType::ChatMessage,
        EventType::LocationUpdate,
        EventType::EmergencyAlert,
        EventType::PriceChange,
    ];

    /// Name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::BookingUpdate => "booking_update",
            EventType::VehicleAvailability => "vehicle_availability",
            EventType::ChatMessage => "chat_message",
            EventType::LocationUpdate => "location_update",
            EventType::EmergencyAlert => "emergency_alert",
            EventType::PriceChange => "price_change",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A business event, sent by this client or received from the server
///
/// Immutable once shared: fields are private and the `with_*` setters
/// consume the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    id: String,
    #[serde(rename = "type")]
    event_type: EventType,
    timestamp: DateTime<Utc>,
    #[serde(rename = "data", default)]
    payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vehicle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    booking_id: Option<String>,
}

impl Event {
    /// Create an event with a fresh id and the current time
    pub fn new(event_type: EventType, payload: Value) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), event_type, payload)
    }

    /// Create an event with a caller-chosen id and the current time
    pub fn with_id(id: impl Into<String>, event_type: EventType, payload: Value) -> Self {
        Self {
            id: id.into(),
            event_type,
            timestamp: Utc::now(),
            payload,
            user_id: None,
            vehicle_id: None,
            booking_id: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_vehicle_id(mut self, vehicle_id: impl Into<String>) -> Self {
        self.vehicle_id = Some(vehicle_id.into());
        self
    }

    pub fn with_booking_id(mut self, booking_id: impl Into<String>) -> Self {
        self.booking_id = Some(booking_id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn vehicle_id(&self) -> Option<&str> {
        self.vehicle_id.as_deref()
    }

    pub fn booking_id(&self) -> Option<&str> {
        self.booking_id.as_deref()
    }

    /// Encode as a text frame
    pub fn to_frame(&self) -> Result<WsMessage> {
        Ok(WsMessage::Text(serde_json::to_string(self)?))
    }

    /// Decode an inbound frame
    pub fn from_frame(frame: &WsMessage) -> Result<Self> {
        serde_json::from_slice(frame.as_bytes()).map_err(|e| SyncError::Parse(e.to_string()))
    }
}

/// Kind of control message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Subscribe,
    Unsubscribe,
    Ping,
}

/// Subscription management and keepalive messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub action: ControlAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ControlMessage {
    pub fn subscribe(channel: impl Into<String>) -> Self {
        Self::for_channel(ControlAction::Subscribe, channel)
    }

    pub fn unsubscribe(channel: impl Into<String>) -> Self {
        Self::for_channel(ControlAction::Unsubscribe, channel)
    }

    pub fn ping() -> Self {
        Self {
            action: ControlAction::Ping,
            channel: None,
            timestamp: Utc::now(),
        }
    }

    fn for_channel(action: ControlAction, channel: impl Into<String>) -> Self {
        Self {
            action,
            channel: Some(channel.into()),
            timestamp: Utc::now(),
        }
    }

    /// Encode as a text frame
    pub fn to_frame(&self) -> Result<WsMessage> {
        Ok(WsMessage::Text(serde_json::to_string(self)?))
    }
}
