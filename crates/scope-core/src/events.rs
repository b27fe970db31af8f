//! Outbound messages delivered to socket connections.

use serde::{Deserialize, Serialize};

use crate::frame::RelayFrame;
use crate::messages::{ImageNavigationCommand, SensorReading};

/// Event envelope sent to viewers: `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum RelayEvent {
    /// A new potentiometer sample.
    #[serde(rename = "potentiometerUpdate")]
    PotentiometerUpdate(SensorReading),
    /// An image-navigation command.
    #[serde(rename = "imageNavigation")]
    ImageNavigation(ImageNavigationCommand),
}

impl RelayEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PotentiometerUpdate(_) => "potentiometerUpdate",
            Self::ImageNavigation(_) => "imageNavigation",
        }
    }
}

/// Anything the dispatcher can fan out.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    /// A typed event, serialized as an envelope.
    Event(RelayEvent),
    /// A peer frame, forwarded byte-for-byte.
    Raw(RelayFrame),
}

impl OutboundMessage {
    /// Render the text every recipient receives.
    ///
    /// Called once per broadcast; the result is shared by every recipient.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Event(event) => serde_json::to_string(event),
            Self::Raw(frame) => Ok(frame.text().to_owned()),
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Event(event) => event.name(),
            Self::Raw(_) => "raw",
        }
    }
}

impl From<RelayEvent> for OutboundMessage {
    fn from(event: RelayEvent) -> Self {
        Self::Event(event)
    }
}

impl From<RelayFrame> for OutboundMessage {
    fn from(frame: RelayFrame) -> Self {
        Self::Raw(frame)
    }
}
