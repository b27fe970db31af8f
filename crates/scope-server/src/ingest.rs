//! HTTP ingestion: sensor updates and image navigation commands.
//!
//! Bodies are read as raw bytes and parsed here so that non-JSON input is a
//! validation failure (400) rather than an extractor rejection. A body is
//! only parsed when `Content-Type` names JSON.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use bytes::Bytes;
use metrics::counter;
use scope_core::{ImageNavigationCommand, RelayEvent, SensorReading, ValidationError};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::errors::ApiError;
use crate::metrics::{INGEST_REJECTIONS_TOTAL, INGEST_REQUESTS_TOTAL};
use crate::server::AppState;

/// Body of `GET /` for plain HTTP requests.
pub const LIVENESS_TEXT: &str = "Microscope relay is running!";

/// `POST /sensor-data`
pub async fn sensor_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    const ROUTE: &str = "sensor-data";
    counter!(INGEST_REQUESTS_TOTAL, "route" => ROUTE).increment(1);

    let parsed = json_body(&headers, &body)
        .map_err(|detail| ValidationError::SensorReading { detail })
        .and_then(|value| SensorReading::from_body(&value).map(|reading| (value, reading)));
    let (raw, reading) = match parsed {
        Ok(ok) => ok,
        Err(e) => return Err(reject(ROUTE, e)),
    };

    let report = state
        .dispatcher
        .broadcast_event(RelayEvent::PotentiometerUpdate(reading));
    info!(recipients = report.recipients, "sensor update broadcast");

    Ok(Json(json!({
        "message": "Potentiometer data received and broadcasted successfully",
        "receivedData": raw,
    })))
}

/// `POST /image-action`
pub async fn image_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    const ROUTE: &str = "image-action";
    counter!(INGEST_REQUESTS_TOTAL, "route" => ROUTE).increment(1);

    let parsed = json_body(&headers, &body)
        .map_err(|detail| ValidationError::NavigationAction { detail })
        .and_then(|value| ImageNavigationCommand::from_body(&value));
    let command = match parsed {
        Ok(command) => command,
        Err(e) => return Err(reject(ROUTE, e)),
    };

    let action = command.action;
    let report = state
        .dispatcher
        .broadcast_event(RelayEvent::ImageNavigation(command));
    info!(action = %action, recipients = report.recipients, "navigation command broadcast");

    Ok(Json(json!({
        "message": format!("Image navigation action '{action}' received and broadcasted."),
        "receivedAction": action.as_str(),
    })))
}

/// Parse `body` as JSON when the request declares a JSON content type.
fn json_body(headers: &HeaderMap, body: &[u8]) -> Result<Value, String> {
    let essence = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase());
    match essence.as_deref() {
        Some(mime) if mime == "application/json" || mime.ends_with("+json") => {
            serde_json::from_slice(body).map_err(|e| e.to_string())
        }
        _ => Err("expected application/json".to_owned()),
    }
}

fn reject(route: &'static str, error: ValidationError) -> ApiError {
    counter!(INGEST_REJECTIONS_TOTAL, "route" => route).increment(1);
    warn!(route, detail = error.detail(), "rejected ingestion request");
    ApiError::Validation(error)
}
