//! HTTP front end.
//!
//! Axum routes render the logbook as server-side HTML. Handlers share an
//! [`AppState`] holding the repository; every request runs its own query and
//! a failure only affects that request.

pub mod form;
pub mod handlers;
pub mod render;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::Result;
use crate::repository::FlightRepository;
use crate::stats::StatsAggregator;

pub use form::FlightForm;

/// Shared application state for Axum handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// Flight data access.
    pub repo: FlightRepository,
    /// Summary statistics over `repo`.
    pub stats: StatsAggregator,
    /// Where `/export` writes the CSV file.
    pub export_path: Arc<PathBuf>,
    /// Quote of the day source.
    pub quotes_path: Arc<PathBuf>,
}

impl AppState {
    /// Build the state around a repository.
    #[must_use]
    pub fn new(repo: FlightRepository, export_path: PathBuf, quotes_path: PathBuf) -> Self {
        Self {
            stats: StatsAggregator::new(repo.clone()),
            repo,
            export_path: Arc::new(export_path),
            quotes_path: Arc::new(quotes_path),
        }
    }
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::summary))
        .route("/flights", get(handlers::list_flights))
        .route(
            "/flights/add",
            get(handlers::add_flight_form).post(handlers::create_flight),
        )
        .route("/export", get(handlers::export))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve<F>(addr: &str, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, state, shutdown).await
}

/// Serve on an already bound listener until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve_on<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Open Flight Log listening on http://{}", listener.local_addr()?);
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Web server stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
