//! Validation and frame errors.

use thiserror::Error;

/// Message returned when a sensor update body is rejected.
pub const SENSOR_VALIDATION_MESSAGE: &str =
    "Invalid potentiometer data format. Check zoom, pan, and tilt levels.";

/// Message returned when a navigation command body is rejected.
pub const NAVIGATION_VALIDATION_MESSAGE: &str =
    "Invalid image navigation action. Expected \"previous\" or \"next\".";

/// An HTTP ingestion body did not match its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The body is not a sensor update with numeric zoom, pan and tilt.
    #[error("{}", SENSOR_VALIDATION_MESSAGE)]
    SensorReading {
        /// Underlying decode failure, kept for logs.
        detail: String,
    },
    /// The body is not a navigation command with a known action.
    #[error("{}", NAVIGATION_VALIDATION_MESSAGE)]
    NavigationAction {
        /// Underlying decode failure, kept for logs.
        detail: String,
    },
}

impl ValidationError {
    /// Decode failure detail, not meant for the caller.
    pub fn detail(&self) -> &str {
        match self {
            Self::SensorReading { detail } | Self::NavigationAction { detail } => detail,
        }
    }
}

/// A socket frame that could not be relayed.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame is not valid JSON.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A binary frame that is not UTF-8 text.
    #[error("binary frame is not valid UTF-8")]
    NotUtf8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_error_displays_caller_message() {
        let err = ValidationError::SensorReading {
            detail: "missing field `zoom_level`".into(),
        };
        assert_eq!(err.to_string(), SENSOR_VALIDATION_MESSAGE);
        assert_eq!(err.detail(), "missing field `zoom_level`");
    }

    #[test]
    fn navigation_error_displays_caller_message() {
        let err = ValidationError::NavigationAction {
            detail: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid image navigation action. Expected \"previous\" or \"next\"."
        );
    }

    #[test]
    fn frame_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: FrameError = json_err.into();
        assert!(err.to_string().starts_with("malformed frame"));
    }
}
