//! Dialdex Portal API
//!
//! Internal phone directory portal with OIDC login and call-event ingestion.
//!
//! ## Auth Endpoints
//!
//! - `GET /login` - Redirect to the identity provider
//! - `GET /callback` - Authorization Code callback
//! - `GET /logout` - Clear the session and end it at the provider
//!
//! ## Directory Endpoints (session required)
//!
//! - `GET /` - Redirect to `/list`
//! - `GET /list` - List or search contacts
//! - `POST /add` - Create a contact
//! - `GET /edit/{id}` - Fetch a contact
//! - `POST /update/{id}` - Update a contact
//! - `GET /delete/{id}` - Delete a contact
//! - `GET /calls` - Query the call log
//! - `GET /calls/{phone_number}/lasthour` - Calls received in the last hour
//!
//! ## Platform Endpoints
//!
//! - `POST /callNotifications/v1/networks/{network_id}/notifications/services/{service_id}/callDirections` - Call notification webhook
//!
//! ## Health Endpoints
//!
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics

mod config;
mod cookies;
mod error;
mod extractors;
mod handlers;
mod state;
#[cfg(test)]
mod test_support;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use dialdex_auth_core::KeyStore;
use dialdex_db::pg::Repositories;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::handlers::{health, ready};
use crate::state::{AppState, AuthState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("portal_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Dialdex Portal API");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        issuer = %config.oidc.issuer(),
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    // Fetch the realm signing keys up front; refusing to start beats
    // serving 401s until the provider comes back
    let keys = KeyStore::new(config.oidc.clone());
    keys.prefetch().await?;
    tracing::info!("Realm signing keys loaded");

    // Create database pool and apply migrations
    let pool = dialdex_db::create_pool(&config.database_url).await?;
    dialdex_db::run_migrations(&pool).await?;
    tracing::info!("Database pool created");

    // Create repositories
    let repos = Repositories::new(pool.clone());

    // Create application state
    let auth = AuthState::new(config.oidc.clone(), keys);
    let state = AppState::new(auth, repos, pool, config.clone());

    // Build HTTP router
    let app = build_router(state, metrics_handle);

    // Start server
    let http_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    run_http_server(app, http_addr).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    // Login flow routes (no session required)
    let auth_routes = Router::new()
        .route("/login", get(handlers::login))
        .route("/callback", get(handlers::callback))
        .route("/logout", get(handlers::logout));

    // Directory routes (session enforced per handler via AuthSession)
    let portal_routes = Router::new()
        .route("/", get(handlers::index))
        .route("/list", get(handlers::list_contacts))
        .route("/add", post(handlers::add_contact))
        .route("/edit/{id}", get(handlers::get_contact))
        .route("/update/{id}", post(handlers::update_contact))
        .route("/delete/{id}", get(handlers::delete_contact))
        .route("/calls", get(handlers::list_calls))
        .route(
            "/calls/{phone_number}/lasthour",
            get(handlers::calls_last_hour),
        );

    // Platform webhook (screened by allowlists, not by session)
    let webhook_routes = Router::new().route(
        "/callNotifications/v1/networks/{network_id}/notifications/services/{service_id}/callDirections",
        post(handlers::call_directions),
    );

    // Health routes (no timeout - must always respond quickly)
    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    // Metrics route (no timeout)
    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Build middleware stack (order matters - outermost first)
    let middleware = ServiceBuilder::new()
        // Request ID propagation (outermost)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        // Tracing with request details
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Request timeout (innermost - closest to handler)
        .layer(TimeoutLayer::new(request_timeout));

    // Combine all routes
    Router::new()
        .merge(auth_routes)
        .merge(portal_routes)
        .merge(webhook_routes)
        .layer(middleware)
        .merge(health_routes) // Health routes without timeout
        .merge(metrics_route) // Metrics route without timeout
        .with_state(state)
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Latency buckets for portal operations; directory queries should stay
    // well under 100ms
    let portal_latency_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0, 2.5];

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            portal_latency_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full("portal_operation_duration_seconds".to_string()),
            portal_latency_buckets,
        )?;

    let handle = builder.install_recorder()?;

    // Register metrics with descriptions
    metrics::describe_counter!("portal_logins_total", "Total login redirects issued");
    metrics::describe_counter!(
        "portal_token_exchanges_total",
        "Total authorization code exchanges by result"
    );
    metrics::describe_counter!(
        "portal_webhooks_processed_total",
        "Total call notifications processed by status"
    );
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request latency in seconds"
    );
    metrics::describe_histogram!(
        "portal_operation_duration_seconds",
        "Portal operation latency in seconds by operation type"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
