use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use carepulse_backend::DynBackend;
use carepulse_core::{PatientRecord, UserParams};
use carepulse_forms::{FormDefinition, HtmlRenderer, register_form, user_form};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::AppConfig, handlers, middleware as app_middleware, pipeline::SubmissionPipeline,
    routes, sessions::FormSessions,
};

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: SubmissionPipeline,
    pub renderer: Arc<HtmlRenderer>,
    pub user_form: Arc<FormDefinition>,
    pub register_form: Arc<FormDefinition>,
    pub user_forms: Arc<FormSessions<UserParams>>,
    pub register_forms: Arc<FormSessions<PatientRecord>>,
}

impl AppState {
    pub fn new(cfg: &AppConfig, backend: DynBackend) -> anyhow::Result<Self> {
        let ttl = cfg.session_ttl();
        Ok(Self {
            config: Arc::new(cfg.clone()),
            pipeline: SubmissionPipeline::new(backend, &cfg.backend),
            renderer: Arc::new(HtmlRenderer::new()?),
            user_form: Arc::new(user_form()),
            register_form: Arc::new(register_form()),
            user_forms: Arc::new(FormSessions::new(ttl)),
            register_forms: Arc::new(FormSessions::new(ttl)),
        })
    }
}

pub struct CarepulseServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(cfg: &AppConfig, backend: DynBackend) -> anyhow::Result<Router> {
    let state = AppState::new(cfg, backend)?;
    let body_limit = cfg.server.body_limit_bytes;

    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &axum::http::Request<axum::body::Body>| {
            use tracing::field::Empty;
            let req_id = req
                .extensions()
                .get::<axum::http::HeaderValue>()
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            tracing::info_span!(
                "http.request",
                http.method = %req.method(),
                http.target = %req.uri(),
                http.status_code = Empty,
                request_id = %req_id
            )
        })
        .on_response(
            |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
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
        );

    let app = Router::new()
        // Health and info endpoints
        .route("/api/info", get(handlers::info))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Browser intake flow
        .route(
            "/",
            get(routes::forms::user_page).post(routes::forms::submit_user),
        )
        .route(
            "/patient/{user_id}/register",
            get(routes::forms::register_page).post(routes::forms::submit_register),
        )
        .route(
            "/patient/{user_id}/new-appointment",
            get(routes::forms::new_appointment_page),
        )
        // JSON API
        .route("/api/users", post(routes::api::create_user))
        .route("/api/users/{user_id}", get(routes::api::get_user))
        .route("/api/patients", post(routes::api::register_patient))
        .with_state(state)
        // Middleware stack (order: request id -> trace -> cors -> compression)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(app_middleware::request_id))
                .layer(trace)
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new()),
        )
        .layer(DefaultBodyLimit::max(body_limit));

    Ok(app)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    backend: Option<DynBackend>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            backend: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Use this backend instead of the one selected by `backend.mode`.
    pub fn with_backend(mut self, backend: DynBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> anyhow::Result<CarepulseServer> {
        let backend = match self.backend {
            Some(backend) => backend,
            None => carepulse_backend::create_backend(&self.config.backend)?,
        };
        tracing::info!(
            mode = ?self.config.backend.mode,
            endpoint = %self.config.backend.endpoint,
            "backend configured"
        );
        let app = build_app(&self.config, backend)?;

        Ok(CarepulseServer {
            addr: self.addr,
            app,
        })
    }
}

impl CarepulseServer {
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
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
