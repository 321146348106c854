//! HTTP server wiring.

use std::sync::Arc;

use axum::middleware;
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::attendance::{FaceVerifier, ReferencePhotoVerifier};
use crate::config::Config;
use crate::events::EventHub;
use crate::store::{self, SharedStore};
use crate::workflow::WorkflowEngine;

use super::attendance as attendance_api;
use super::auth;
use super::catalogs as catalogs_api;
use super::employees as employees_api;
use super::events as events_api;
use super::messages as messages_api;
use super::stats as stats_api;
use super::suggestions as suggestions_api;
use super::tasks as tasks_api;
use super::types::HealthResponse;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: SharedStore,
    pub events: EventHub,
    pub engine: WorkflowEngine,
    pub face: Arc<dyn FaceVerifier>,
}

impl AppState {
    pub fn new(config: Config, store: SharedStore) -> Arc<Self> {
        let events = EventHub::new(config.event_buffer);
        let engine = WorkflowEngine::new(Arc::clone(&store), events.clone())
            .with_hr_reviewer(config.hr_head_id.clone())
            .with_policy(config.completion_policy.clone());
        Arc::new(Self {
            config,
            store,
            events,
            engine,
            face: Arc::new(ReferencePhotoVerifier),
        })
    }
}

/// Build the full router over `state`.
pub fn app(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/employee-login", post(auth::employee_login))
        .route("/api/auth/verify-face", post(auth::verify_face))
        .route("/api/auth/verify-qr", post(auth::verify_qr));

    let protected_routes = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .nest("/api/employees", employees_api::routes())
        .nest("/api/catalogs", catalogs_api::routes())
        .nest("/api/tasks", tasks_api::routes())
        .nest("/api/attendance", attendance_api::routes())
        .nest("/api/messages", messages_api::routes())
        .nest("/api/suggestions", suggestions_api::routes())
        .nest("/api/stats", stats_api::routes())
        .route("/api/events", get(events_api::stream))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = store::create_store(config.store_type, config.data_dir.clone()).await?;
    tracing::info!(
        "Store ready ({})",
        if store.is_persistent() {
            "sqlite"
        } else {
            "memory"
        }
    );
    if store::seed_defaults(store.as_ref(), &config.hr_head_id).await? {
        tracing::info!("Fresh store: default accounts created");
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config, store);
    let app = app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Health check endpoint.
pub(super) async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        dev_mode: state.config.dev_mode,
        auth_required: state.config.auth.auth_required(state.config.dev_mode),
        store_persistent: state.store.is_persistent(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    /// Dev-mode state over a fresh in-memory store.
    pub(crate) fn test_state() -> Arc<AppState> {
        AppState::new(Config::for_tests(), Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn health_reports_mode() {
        let Json(health) = health(State(test_state())).await;
        assert_eq!(health.status, "ok");
        assert!(health.dev_mode);
        assert!(!health.auth_required);
        assert!(!health.store_persistent);
    }

    #[test]
    fn router_builds() {
        let _ = app(test_state());
    }
}
