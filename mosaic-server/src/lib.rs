pub mod error;
pub mod settings;
pub mod storage;
pub mod upload;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::{Html, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mosaic_core::{ChartStyle, LayoutConfig, Rasterizer};
use serde_json::{Value, json};
use tracing::info;

use crate::error::StartupError;
use crate::settings::Settings;
use crate::storage::Storage;

const INDEX_HTML: &str = include_str!("../templates/index.html");

pub struct AppState {
    pub settings: Settings,
    pub layout: LayoutConfig,
    pub style: ChartStyle,
    pub rasterizer: Rasterizer,
    pub storage: Storage,
}

impl AppState {
    /// Creates the storage directories, loads the chart config and fonts.
    pub fn new(settings: Settings) -> Result<Self, StartupError> {
        let storage = Storage::new(&settings.upload_dir, &settings.plot_dir);
        storage.ensure_dirs()?;
        let layout = settings.layout_config()?;
        let rasterizer = Rasterizer::new(settings.font_path.as_deref())?;
        info!(
            upload_dir = %settings.upload_dir.display(),
            plot_dir = %settings.plot_dir.display(),
            orientation = %layout.orientation,
            modes = layout.modes.len(),
            "state ready"
        );
        Ok(Self {
            settings,
            layout,
            style: ChartStyle::default(),
            rasterizer,
            storage,
        })
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    info!("{} {} -> {}", method, path, response.status().as_u16());
    response
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub fn app(state: Arc<AppState>) -> Router {
    let limit = state.settings.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload::upload))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(limit))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
