//! # scope-core
//!
//! Shared vocabulary for the microscope relay.
//!
//! - **Messages**: `SensorReading` and `ImageNavigationCommand`, validated from
//!   their snake_case HTTP bodies
//! - **Events**: `RelayEvent` envelopes broadcast to viewers
//! - **Frames**: `RelayFrame`, a verbatim JSON text frame from a socket peer
//! - **Ids**: `ConnectionId` newtype
//! - **Errors**: `ValidationError` and `FrameError`

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod frame;
pub mod ids;
pub mod messages;

pub use errors::{FrameError, ValidationError};
pub use events::{OutboundMessage, RelayEvent};
pub use frame::RelayFrame;
pub use ids::ConnectionId;
pub use messages::{ImageNavigationCommand, NavigationAction, SensorReading};
