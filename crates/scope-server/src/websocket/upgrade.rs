//! HTTP → `WebSocket` upgrade handlers.
//!
//! `/` serves the liveness text to plain requests and becomes the raw relay
//! socket for upgrade requests. `/ws` is the viewer event stream.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRequestParts, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use super::connection::ConnectionRole;
use super::session;
use crate::ingest::LIVENESS_TEXT;
use crate::middleware::auth::{authorize, header_key};
use crate::server::AppState;

/// Query parameters accepted on socket upgrades.
#[derive(Debug, Default, Deserialize)]
pub struct SocketAuth {
    /// Shared key, for clients that cannot set headers.
    pub api_key: Option<String>,
}

/// `GET /`
pub async fn root_handler(State(state): State<AppState>, request: Request) -> Response {
    if !state.config.socket_relay || !is_upgrade(request.headers()) {
        return LIVENESS_TEXT.into_response();
    }

    let (mut parts, _body) = request.into_parts();
    let query = Query::<SocketAuth>::try_from_uri(&parts.uri)
        .map(|Query(q)| q)
        .unwrap_or_default();
    if let Err(e) = authorize(
        &state,
        header_key(&parts.headers).or(query.api_key.as_deref()),
    ) {
        return e.into_response();
    }

    match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(ws) => upgrade_socket(ws, ConnectionRole::Peer, state),
        Err(rejection) => {
            debug!(%rejection, "relay upgrade rejected");
            rejection.into_response()
        }
    }
}

/// `GET /ws`
pub async fn viewer_socket(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(auth): Query<SocketAuth>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Err(e) = authorize(&state, header_key(&headers).or(auth.api_key.as_deref())) {
        return e.into_response();
    }
    upgrade_socket(ws, ConnectionRole::Viewer, state)
}

fn upgrade_socket(ws: WebSocketUpgrade, role: ConnectionRole, state: AppState) -> Response {
    if state.shutdown.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "server shutting down").into_response();
    }
    ws.max_message_size(state.config.max_message_size)
        .on_failed_upgrade(move |e| warn!(role = %role, error = %e, "socket upgrade failed"))
        .on_upgrade(move |socket| session::run_connection(socket, role, state))
}

fn is_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn detects_websocket_upgrade() {
        let mut headers = HeaderMap::new();
        assert!(!is_upgrade(&headers));
        let _ = headers.insert(header::UPGRADE, HeaderValue::from_static("WebSocket"));
        assert!(is_upgrade(&headers));
        let _ = headers.insert(header::UPGRADE, HeaderValue::from_static("h2c"));
        assert!(!is_upgrade(&headers));
    }

    #[test]
    fn socket_auth_from_query() {
        let uri = "/?api_key=abc&other=1".parse().unwrap();
        let Query(auth) = Query::<SocketAuth>::try_from_uri(&uri).unwrap();
        assert_eq!(auth.api_key.as_deref(), Some("abc"));

        let uri = "/".parse().unwrap();
        let Query(auth) = Query::<SocketAuth>::try_from_uri(&uri).unwrap();
        assert!(auth.api_key.is_none());
    }
}
