//! `RelayServer`: Axum HTTP + `WebSocket` server.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use scope_media::MediaStore;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::images;
use crate::ingest;
use crate::middleware::auth::{ApiKey, require_api_key};
use crate::middleware::rate_limit::{SlidingWindowLimiter, enforce_rate_limit, spawn_pruner};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::upgrade;
use crate::websocket::{BroadcastDispatcher, ConnectionRegistry};

/// Multipart framing allowance on top of the upload limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Open socket connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Fan-out over `registry`.
    pub dispatcher: Arc<BroadcastDispatcher>,
    /// Image host.
    pub media: Arc<dyn MediaStore>,
    /// Shared key for guarded routes, when enabled.
    pub api_key: Option<Arc<ApiKey>>,
    /// Rate limiter for guarded routes, when enabled.
    pub limiter: Option<Arc<SlidingWindowLimiter>>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Prometheus handle rendering `/metrics`.
    pub metrics: Option<PrometheusHandle>,
    /// When the server started.
    pub start_time: Instant,
}

/// The relay server.
pub struct RelayServer {
    state: AppState,
}

impl RelayServer {
    /// Create a server over `media`.
    pub fn new(config: ServerConfig, media: Arc<dyn MediaStore>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Arc::new(BroadcastDispatcher::new(Arc::clone(&registry)));
        let api_key = config.api_key.as_deref().map(|k| Arc::new(ApiKey::new(k)));
        let limiter = config
            .rate_limit
            .as_ref()
            .map(|rl| Arc::new(SlidingWindowLimiter::new(rl)));
        Self {
            state: AppState {
                registry,
                dispatcher,
                media,
                api_key,
                limiter,
                shutdown: Arc::new(ShutdownCoordinator::new()),
                config: Arc::new(config),
                metrics: None,
                start_time: Instant::now(),
            },
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = self.state.clone();
        let upload_limit = state.config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

        // Layers added later run first: rate limit, then API key.
        let guarded = Router::new()
            .route("/sensor-data", post(ingest::sensor_data))
            .route("/image-action", post(ingest::image_action))
            .route("/api/images", get(images::list_images))
            .route(
                "/api/images/upload",
                post(images::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
            )
            .route_layer(from_fn_with_state(state.clone(), require_api_key))
            .route_layer(from_fn_with_state(state.clone(), enforce_rate_limit));

        Router::new()
            .route("/", get(upgrade::root_handler))
            .route("/ws", get(upgrade::viewer_socket))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .merge(guarded)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind the configured address and start serving.
    ///
    /// Returns once the listener is bound. Serving stops when the shutdown
    /// coordinator fires.
    pub async fn listen(&self) -> io::Result<ServerHandle> {
        let listener = TcpListener::bind(self.state.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let token = self.state.shutdown.token();

        let mut tasks = Vec::new();
        let serve_token = token.clone();
        tasks.push(tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { serve_token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "relay server stopped with error");
            }
        }));
        if let (Some(limiter), Some(rl)) = (&self.state.limiter, &self.state.config.rate_limit) {
            tasks.push(spawn_pruner(Arc::clone(limiter), rl.window, token));
        }

        info!(
            %addr,
            auth = self.state.api_key.is_some(),
            rate_limit = self.state.limiter.is_some(),
            socket_relay = self.state.config.socket_relay,
            "relay server listening"
        );
        Ok(ServerHandle { addr, tasks })
    }

    /// Shared handler state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get the connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.state.registry
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }
}

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    /// Bound address.
    pub addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Bound port.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Background tasks to wait on during shutdown.
    pub fn into_tasks(self) -> Vec<JoinHandle<()>> {
        self.tasks
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, state.registry.len()))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
