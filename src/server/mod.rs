//! HTTP surface of the assistant
//!
//! JSON endpoints for accounts, chat, projects and export. Anything that
//! does not match a route is served from the public directory.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use handlers::{account, admin, chat, export, projects};
use state::AppState;

pub use error::ApiError;

/// All routes with `state` attached
pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/admin/update-user", post(admin::update_user))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_admin));

    Router::new()
        .route("/register", post(account::register))
        .route("/login", post(account::login))
        .route("/purchase", post(account::purchase))
        .route("/chat", post(chat::chat))
        .route("/projects", get(projects::list_projects))
        .route("/projects/{id}", get(projects::get_project))
        .route("/export-pdf", post(export::export_pdf))
        .merge(admin_routes)
        .fallback_service(ServeDir::new(&state.config.public_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind on all interfaces and serve until Ctrl+C or SIGTERM
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let port = state.config.port;
    let address = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&address).await?;
    info!("Sulama Asistanı server {port} portunda çalışıyor.");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
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
}
