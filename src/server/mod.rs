//! HTTP API for the editor UI

mod error;
mod handlers;

pub use error::ApiError;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::cache::PreviewCache;
use crate::content::MarkdownRenderer;
use crate::Workspace;

/// Largest accepted request body (posts and uploads)
const BODY_LIMIT: usize = 50 * 1024 * 1024;

/// Server state
pub struct AppState {
    settings_path: PathBuf,
    renderer: MarkdownRenderer,
    previews: Mutex<PreviewCache>,
}

impl AppState {
    pub fn new<P: AsRef<Path>>(settings_path: P) -> Self {
        Self {
            settings_path: settings_path.as_ref().to_path_buf(),
            renderer: MarkdownRenderer::new(),
            previews: Mutex::new(PreviewCache::new()),
        }
    }

    /// Settings are re-read on every request so changes made through
    /// `/api/settings` apply immediately.
    fn workspace(&self) -> Workspace {
        Workspace::new(&self.settings_path)
    }

    fn previews(&self) -> MutexGuard<'_, PreviewCache> {
        self.previews.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route(
            "/api/settings",
            get(handlers::get_settings).post(handlers::save_settings),
        )
        .route("/api/browse", post(handlers::browse))
        .route(
            "/api/posts",
            get(handlers::list_posts).post(handlers::save_post),
        )
        .route("/api/posts/:filename", delete(handlers::delete_post))
        .route("/api/preview", post(handlers::preview))
        .route(
            "/api/assets",
            get(handlers::list_assets).delete(handlers::delete_asset),
        )
        .route("/api/assets/rename", post(handlers::rename_asset))
        .route("/api/image/*path", get(handlers::serve_image))
        .route("/api/upload", post(handlers::upload))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server
pub async fn start(settings_path: &Path, ip: &str, port: u16, open: bool) -> Result<()> {
    let state = Arc::new(AppState::new(settings_path));
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Hexo editor backend running at {}", url);
    println!("Settings file: {}", settings_path.display());
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
