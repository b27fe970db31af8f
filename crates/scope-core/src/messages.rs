//! Sensor readings and image-navigation commands.
//!
//! HTTP bodies arrive in snake_case (`zoom_level`, ...) and are validated
//! into typed messages at the boundary. The typed messages serialize in the
//! camelCase shape viewers receive.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::errors::ValidationError;

/// One potentiometer sample from the device.
///
/// The three positional readings keep the exact JSON number they arrived
/// as, so `200` is relayed as `200` and `1.5` as `1.5`. Percentages are
/// forwarded untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    /// Zoom potentiometer level.
    pub zoom_level: Number,
    /// Pan potentiometer position.
    pub pan_position: Number,
    /// Tilt potentiometer position.
    pub tilt_position: Number,
    /// Zoom as a percentage of travel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom_percentage: Option<Value>,
    /// Pan as a percentage of travel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_percentage: Option<Value>,
    /// Tilt as a percentage of travel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilt_percentage: Option<Value>,
}

/// Wire shape of `POST /sensor-data`.
#[derive(Debug, Deserialize)]
struct SensorPayload {
    zoom_level: Number,
    pan_position: Number,
    tilt_position: Number,
    #[serde(default)]
    zoom_percentage: Option<Value>,
    #[serde(default)]
    pan_percentage: Option<Value>,
    #[serde(default)]
    tilt_percentage: Option<Value>,
}

impl SensorReading {
    /// Validate a decoded request body.
    ///
    /// The body must be an object whose `zoom_level`, `pan_position` and
    /// `tilt_position` are JSON numbers. Unknown keys are ignored.
    pub fn from_body(body: &Value) -> Result<Self, ValidationError> {
        if !body.is_object() {
            return Err(ValidationError::SensorReading {
                detail: format!("expected a JSON object, got {}", json_kind(body)),
            });
        }
        let payload = SensorPayload::deserialize(body).map_err(|e| {
            ValidationError::SensorReading {
                detail: e.to_string(),
            }
        })?;
        Ok(Self {
            zoom_level: payload.zoom_level,
            pan_position: payload.pan_position,
            tilt_position: payload.tilt_position,
            zoom_percentage: payload.zoom_percentage,
            pan_percentage: payload.pan_percentage,
            tilt_percentage: payload.tilt_percentage,
        })
    }
}

/// Direction of an image-navigation command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationAction {
    /// Show the previous image.
    Previous,
    /// Show the next image.
    Next,
}

impl NavigationAction {
    /// Wire literal for this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Previous => "previous",
            Self::Next => "next",
        }
    }
}

impl fmt::Display for NavigationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image-navigation command from the device's encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageNavigationCommand {
    /// Requested direction.
    pub action: NavigationAction,
}

impl ImageNavigationCommand {
    /// Validate a decoded request body.
    pub fn from_body(body: &Value) -> Result<Self, ValidationError> {
        if !body.is_object() {
            return Err(ValidationError::NavigationAction {
                detail: format!("expected a JSON object, got {}", json_kind(body)),
            });
        }
        Self::deserialize(body).map_err(|e| ValidationError::NavigationAction {
            detail: e.to_string(),
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
