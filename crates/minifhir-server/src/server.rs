use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use minifhir_core::ResourceRegistry;
use minifhir_db_memory::create_fhir_storage;
use minifhir_search::SearchEngine;
use minifhir_storage::DynStorage;
use minifhir_validation::{ProfileStore, Validator};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::AppConfig, handlers, seed};

/// Shared, read-only handles used by every request.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ResourceRegistry>,
    pub storage: DynStorage,
    pub validator: Validator,
    pub search: SearchEngine,
}

impl AppState {
    /// Wires the store, validator and search engine around a loaded profile table.
    pub fn new(registry: Arc<ResourceRegistry>, profiles: ProfileStore) -> Self {
        Self::with_storage(registry, profiles, create_fhir_storage())
    }

    pub fn with_storage(
        registry: Arc<ResourceRegistry>,
        profiles: ProfileStore,
        storage: DynStorage,
    ) -> Self {
        let validator = Validator::new(registry.clone(), Arc::new(profiles));
        let search = SearchEngine::new(registry.clone(), storage.clone());
        Self {
            registry,
            storage,
            validator,
            search,
        }
    }
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/metadata", get(handlers::metadata))
        .route("/$validate", post(handlers::validate_resource))
        .route("/_history", get(handlers::system_history))
        .route("/", post(handlers::batch))
        .route(
            "/{resource_type}",
            get(handlers::search_resources).post(handlers::create_resource),
        )
        .route("/{resource_type}/$validate", post(handlers::validate_resource))
        .route(
            "/{resource_type}/{id}",
            get(handlers::read_resource)
                .put(handlers::update_resource)
                .delete(handlers::delete_resource),
        )
        .route("/{resource_type}/{id}/_history", get(handlers::resource_history))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(cfg.request_timeout()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
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

/// Runs the startup sequence: base profiles, then optional seed data.
///
/// Any failure here is fatal; the server never starts half-validated.
pub async fn bootstrap(cfg: &AppConfig) -> anyhow::Result<AppState> {
    bootstrap_with_registry(cfg, ResourceRegistry::stu3()).await
}

pub async fn bootstrap_with_registry(
    cfg: &AppConfig,
    registry: ResourceRegistry,
) -> anyhow::Result<AppState> {
    let registry = Arc::new(registry);

    let mut profiles = ProfileStore::new(cfg.profile_store_config())
        .context("profile store initialization failed")?;
    profiles
        .load_defaults(&registry)
        .await
        .context("profile load failed")?;

    let state = AppState::new(registry, profiles);

    if let Some(pattern) = cfg.seed.pattern.as_deref() {
        let report = seed::load_seed(pattern, cfg.seed.strict, &state)
            .await
            .context("seed load failed")?;
        tracing::info!(
            files = report.files,
            loaded = report.loaded,
            skipped = report.skipped,
            "seed data loaded"
        );
    }

    Ok(state)
}

pub struct MiniFhirServer {
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

    pub async fn build(self) -> anyhow::Result<MiniFhirServer> {
        let state = bootstrap(&self.config).await?;
        Ok(MiniFhirServer {
            addr: self.config.addr(),
            app: build_app(state, &self.config),
        })
    }
}

impl MiniFhirServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("bind {}", self.addr))?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
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
    tracing::info!("shutdown signal received");
}
