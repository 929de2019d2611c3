use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    BoxError, Json, Router,
    error_handling::HandleErrorLayer,
    extract::FromRef,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use medvault_auth::{AuthError, AuthState, PortalService};
use medvault_auth::middleware::error_body;
use medvault_storage::{DynStore, JsonFileStore, MemoryStore, StorageError};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    bootstrap,
    config::{AppConfig, StorageBackend},
    handlers,
};

/// Errors raised while assembling or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PortalService>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(service: Arc<PortalService>) -> Self {
        let auth = AuthState::new(service.tokens());
        Self { service, auth }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// Opens the configured storage backend.
pub async fn open_store(cfg: &AppConfig) -> Result<DynStore, ServerError> {
    let store: DynStore = match cfg.storage.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(JsonFileStore::open(&cfg.storage.path).await?),
    };
    tracing::info!(
        backend = store.backend_name(),
        path = %cfg.storage.path.display(),
        "Storage opened"
    );
    Ok(store)
}

/// Builds the portal service over `store` and runs the bootstrap seed.
pub async fn build_state(cfg: &AppConfig, store: DynStore) -> Result<AppState, ServerError> {
    if cfg.auth.uses_development_secrets() {
        tracing::warn!("Using development token/encryption secrets; set auth.token.secret and auth.encryption.key");
    }

    let service = Arc::new(PortalService::new(store, &cfg.auth)?);
    bootstrap::run(&service, &cfg.bootstrap).await?;
    Ok(AppState::new(service))
}

/// Builds the application router from configuration, including storage and
/// bootstrap.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, ServerError> {
    cfg.validate().map_err(ServerError::Config)?;
    let store = open_store(cfg).await?;
    let state = build_state(cfg, store).await?;
    Ok(router(state, cfg))
}

/// Routes and middleware over an already built state.
pub fn router(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    let request_timeout = cfg.server.request_timeout;

    let api = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        // Patient
        .route("/patient/me", get(handlers::patient_me))
        .route("/patient/records", get(handlers::patient_records))
        .route("/patient/symptoms", post(handlers::add_symptoms))
        .route("/patient/appointments", post(handlers::book_appointment))
        .route("/patient/consents", put(handlers::set_consent))
        // Doctor
        .route("/doctor/patient/{medical_id}", get(handlers::view_patient))
        .route("/doctor/prescriptions", post(handlers::create_prescription))
        // Hospital
        .route("/hospital/patient/{medical_id}", get(handlers::view_patient))
        .route("/hospital/reports", post(handlers::upload_report))
        // Admin
        .route("/admin/pending", get(handlers::list_pending))
        .route("/admin/approve", post(handlers::approve))
        .route("/admin/audit", get(handlers::list_audits));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .nest("/api", api)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .timeout(request_timeout),
        )
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

async fn handle_timeout(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(error_body("timeout", "Request timed out")),
        )
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(error_body("server_error", "Internal server error")),
        )
    }
}

pub struct MedvaultServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub async fn build(self) -> Result<MedvaultServer, ServerError> {
        let app = build_app(&self.config).await?;
        let addr = self.config.addr().map_err(ServerError::Config)?;
        Ok(MedvaultServer { addr, app })
    }
}

impl MedvaultServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
