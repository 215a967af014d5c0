//! RelayQ Server - Message Relay HTTP Server
//!
//! This is the main entry point for the RelayQ message relay.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use relayq_channel::{ConsumerChannel, MemoryChannel, MemorySink, Sink};
use relayq_core::{IncludeAll, InvertFilter, Relay, RelayFilter};
use relayq_types::{ChannelStats, Message, RelayStats};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

// ==================== App State ====================

/// Shared application state
#[derive(Clone)]
struct AppState {
    channel: Arc<MemoryChannel>,
    relay: Arc<Relay>,
    sinks: Vec<Arc<MemorySink>>,
}

// ==================== Request/Response Types ====================

/// Publish message request
#[derive(Debug, Deserialize, ToSchema)]
struct PublishRequest {
    /// Message body content
    body: String,
}

/// Publish response
#[derive(Debug, Serialize, ToSchema)]
struct PublishResponse {
    /// ID of the queued message
    message_id: String,
}

/// Relay start response
#[derive(Debug, Serialize, ToSchema)]
struct StartResponse {
    /// Whether this call started consumption (false if already running)
    started: bool,
}

/// Relay stop response
#[derive(Debug, Serialize, ToSchema)]
struct StopResponse {
    /// Whether this call stopped consumption (false if already stopped)
    stopped: bool,
}

/// Return-unacked response
#[derive(Debug, Serialize, ToSchema)]
struct ReturnUnackedResponse {
    /// Number of messages returned to the queue
    returned: usize,
}

/// Combined relay and channel statistics
#[derive(Debug, Serialize, ToSchema)]
struct StatsResponse {
    /// Relay-side counters
    relay: RelayStats,
    /// Channel-side counters
    channel: ChannelStats,
}

/// Per-sink delivery status
#[derive(Debug, Serialize, ToSchema)]
struct SinkStatus {
    /// Sink name
    name: String,
    /// Number of payloads this sink has published
    published: usize,
}

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    /// Health status
    status: String,
    /// Server version
    version: String,
}

// ==================== OpenAPI Documentation ====================

#[derive(OpenApi)]
#[openapi(
    info(
        title = "RelayQ API",
        version = "0.1.0",
        description = "RelayQ - Bounded-Concurrency Message Relay API",
        license(name = "MIT OR Apache-2.0"),
        contact(name = "RelayQ Team", url = "https://github.com/relayq/relayq")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        health,
        publish_message,
        start_relay,
        stop_relay,
        return_unacked,
        get_stats,
        list_sinks,
    ),
    components(
        schemas(
            HealthResponse,
            PublishRequest,
            PublishResponse,
            StartResponse,
            StopResponse,
            ReturnUnackedResponse,
            StatsResponse,
            SinkStatus,
            RelayStats,
            ChannelStats,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "messages", description = "Message intake endpoints"),
        (name = "relay", description = "Relay control endpoints")
    )
)]
struct ApiDoc;

// ==================== Handlers ====================

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse)
    )
)]
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Publish a message to the inbound channel
#[utoipa::path(
    post,
    path = "/api/v1/messages",
    tag = "messages",
    request_body = PublishRequest,
    responses(
        (status = 201, description = "Message queued", body = PublishResponse)
    )
)]
async fn publish_message(
    State(state): State<AppState>,
    Json(req): Json<PublishRequest>,
) -> impl IntoResponse {
    let message_id = state.channel.publish(Message::new(req.body));

    (
        StatusCode::CREATED,
        Json(PublishResponse {
            message_id: message_id.to_string(),
        }),
    )
}

/// Start relaying messages
#[utoipa::path(
    post,
    path = "/api/v1/relay/start",
    tag = "relay",
    responses(
        (status = 200, description = "Start requested", body = StartResponse)
    )
)]
async fn start_relay(State(state): State<AppState>) -> impl IntoResponse {
    let started = state.relay.start().await;
    Json(StartResponse { started })
}

/// Stop relaying messages
#[utoipa::path(
    post,
    path = "/api/v1/relay/stop",
    tag = "relay",
    responses(
        (status = 200, description = "Stop requested", body = StopResponse)
    )
)]
async fn stop_relay(State(state): State<AppState>) -> impl IntoResponse {
    let stopped = state.relay.stop().await;
    Json(StopResponse { stopped })
}

/// Return every unacknowledged message to the queue
#[utoipa::path(
    post,
    path = "/api/v1/channel/return-unacked",
    tag = "relay",
    responses(
        (status = 200, description = "Messages returned", body = ReturnUnackedResponse)
    )
)]
async fn return_unacked(State(state): State<AppState>) -> impl IntoResponse {
    let returned = state.channel.return_all_unacked().await;
    Json(ReturnUnackedResponse { returned })
}

/// Get relay and channel statistics
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    tag = "relay",
    responses(
        (status = 200, description = "Current statistics", body = StatsResponse)
    )
)]
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatsResponse {
        relay: state.relay.stats(),
        channel: state.channel.stats(),
    })
}

/// List sinks and how much each has published
#[utoipa::path(
    get,
    path = "/api/v1/sinks",
    tag = "relay",
    responses(
        (status = 200, description = "Sink statuses", body = Vec<SinkStatus>)
    )
)]
async fn list_sinks(State(state): State<AppState>) -> impl IntoResponse {
    let sinks: Vec<SinkStatus> = state
        .sinks
        .iter()
        .map(|sink| SinkStatus {
            name: sink.name().to_string(),
            published: sink.published_count(),
        })
        .collect();
    Json(sinks)
}

// ==================== Router ====================

fn create_router(state: AppState) -> Router {
    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Health
        .route("/health", get(health))
        // Messages
        .route("/api/v1/messages", post(publish_message))
        // Relay control
        .route("/api/v1/relay/start", post(start_relay))
        .route("/api/v1/relay/stop", post(stop_relay))
        .route("/api/v1/channel/return-unacked", post(return_unacked))
        .route("/api/v1/stats", get(get_stats))
        .route("/api/v1/sinks", get(list_sinks))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==================== Main ====================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relayq=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Relay tuning comes from the environment; the rest is fixed wiring.
    let concurrency = std::env::var("RELAYQ_CONCURRENCY")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8);

    let filter: Arc<dyn RelayFilter> = if std::env::var("RELAYQ_INVERT").is_ok() {
        Arc::new(InvertFilter::new(IncludeAll::new()))
    } else {
        Arc::new(IncludeAll::new())
    };

    // Create the inbound channel and the outbound sinks
    let channel = Arc::new(MemoryChannel::new());
    let sinks = vec![
        Arc::new(MemorySink::new("primary")),
        Arc::new(MemorySink::new("secondary")),
    ];

    // Wire the relay; this registers its consumer with the channel
    let relay = Arc::new(Relay::new(
        Arc::clone(&channel) as Arc<dyn ConsumerChannel>,
        sinks
            .iter()
            .map(|sink| Arc::clone(sink) as Arc<dyn Sink>)
            .collect(),
        filter,
        concurrency,
    ));

    // Consume from the moment the server is up
    relay.start().await;

    // Create app state
    let state = AppState {
        channel,
        relay,
        sinks,
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = "127.0.0.1:3000";
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("RelayQ server listening on {}", addr);
    info!("Swagger UI: http://localhost:3000/swagger-ui/");
    info!("Health check: http://localhost:3000/health");

    axum::serve(listener, app).await?;

    Ok(())
}
