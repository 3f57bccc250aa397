//! REST host integration over the kinship service.
//!
//! Mirrors the person/relation resources of the original web client and
//! adds the path query. Mutations are written through to the database when
//! one is attached.

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::{self, Db};
use crate::error::{KinshipError, Result};
use crate::query::{Algorithm, KinshipService};

pub use handlers::ApiError;

/// Check if a port is available by attempting to bind to it
async fn check_port_available(port: u16) -> bool {
    tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .is_ok()
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    service: Arc<KinshipService>,
    db: Option<Db>,
    default_algorithm: Algorithm,
    /// Serializes snapshot write-back so the last writer always saves the
    /// latest revision.
    persist_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(service: Arc<KinshipService>, db: Option<Db>, default_algorithm: Algorithm) -> Self {
        Self {
            service,
            db,
            default_algorithm,
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn service(&self) -> &KinshipService {
        &self.service
    }

    /// Write the current snapshot back to the database, if any.
    ///
    /// The in-memory mutation has already been committed when this runs, so a
    /// failed save is logged rather than reported as a failed request. The
    /// next successful save carries the change.
    async fn persist(&self) {
        let Some(ref db) = self.db else {
            return;
        };
        let _guard = self.persist_lock.lock().await;
        let revision = self.service.revision();
        match db::save_snapshot(db, self.service.snapshot()).await {
            Ok(stats) => log::debug!(
                "Persisted revision {}: {} people, {} relations",
                revision,
                stats.people,
                stats.relations
            ),
            Err(e) => log::error!("Failed to persist revision {}: {}", revision, e),
        }
    }
}

/// HTTP server wrapper
pub struct KinshipHttpServer {
    state: AppState,
    allowed_origins: Vec<String>,
}

impl KinshipHttpServer {
    pub fn new(state: AppState, allowed_origins: Vec<String>) -> Self {
        Self {
            state,
            allowed_origins,
        }
    }

    /// Run the HTTP server
    pub async fn run(&self, port: u16) -> Result<()> {
        let app = self.create_router();

        let addr = format!("127.0.0.1:{}", port);
        log::info!("Starting Kinship HTTP server on http://{}", addr);

        if !check_port_available(port).await {
            return Err(KinshipError::Config(format!(
                "Port {} is already in use. Stop the other process or set http_server.port in config.toml",
                port
            )));
        }

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            KinshipError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", addr, e),
            ))
        })?;

        axum::serve(listener, app).await.map_err(|e| {
            KinshipError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP server error: {}", e),
            ))
        })?;

        Ok(())
    }

    /// Create the axum router
    pub fn create_router(&self) -> Router {
        router(self.state.clone(), &self.allowed_origins)
    }
}

/// Build the router for `state`.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    // No configured origins means local dev: allow any.
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/persons",
            get(handlers::list_persons).post(handlers::create_person),
        )
        .route(
            "/persons/:id",
            get(handlers::get_person)
                .patch(handlers::update_person)
                .delete(handlers::delete_person),
        )
        .route("/persons/:id/spouse", post(handlers::add_spouse))
        .route("/persons/:id/spouse/:other", get(handlers::is_married))
        .route("/persons/:id/relatives", get(handlers::relatives))
        .route("/children", post(handlers::add_child))
        .route(
            "/relations",
            get(handlers::list_relations)
                .post(handlers::create_relation)
                .delete(handlers::delete_relation),
        )
        .route("/path", get(handlers::find_path))
        .route("/snapshot", get(handlers::snapshot))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
