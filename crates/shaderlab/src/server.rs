use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use shaderstore::ShaderStore;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{self, AppState};

/// URL prefix under which raw shader sources are served, matching the paths
/// the client uses when it saves them.
pub const SHADERS_MOUNT: &str = "/src/shaders";

/// JSON API plus static files: the shaders root under [`SHADERS_MOUNT`] and
/// the client bundle for every other unmatched path.
pub fn router(store: Arc<ShaderStore>, static_dir: &Path) -> Router {
    let shaders = ServeDir::new(store.shaders_root());
    Router::new()
        .route("/api/list-shaders", get(api::list_shaders))
        .route("/api/save-shader", post(api::save_shader))
        .nest_service(SHADERS_MOUNT, shaders)
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(store))
}

pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr()?;
    info!(%address, "shader storage server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("shader storage server stopped");
    Ok(())
}
