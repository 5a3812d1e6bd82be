use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use mosaic_core::{Orientation, render_mosaic};
use tracing::{debug, info};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use crate::storage::download_name;

/// Prefix spreadsheet editors give their lock and temp files.
const LOCK_FILE_PREFIX: &str = "~$";

struct UploadForm {
    file: Option<(String, Bytes)>,
    orientation: Option<Orientation>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm {
        file: None,
        orientation: None,
    };
    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") if form.file.is_none() => {
                let name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.file = Some((name, bytes));
            }
            Some("orientation") => {
                let raw = field.text().await?;
                if !raw.trim().is_empty() {
                    let o = raw
                        .parse::<Orientation>()
                        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                    form.orientation = Some(o);
                }
            }
            other => debug!(field = ?other, "ignoring multipart field"),
        }
    }
    Ok(form)
}

fn is_usable_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.starts_with(LOCK_FILE_PREFIX)
}

/// `POST /upload`: sheet in, PNG attachment out.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let Ok(multipart) = multipart else {
        return Ok(Redirect::to("/").into_response());
    };
    let form = read_form(multipart).await?;
    let Some((file_name, bytes)) = form.file.filter(|(name, _)| is_usable_name(name)) else {
        return Ok(Redirect::to("/").into_response());
    };

    let id = Uuid::new_v4();
    let saved = state.storage.save_upload(id, &file_name, &bytes).await?;
    info!(%id, file = %file_name, bytes = bytes.len(), path = %saved.display(), "upload stored");

    let config = match form.orientation {
        Some(o) => state.layout.clone().with_orientation(o),
        None => state.layout.clone(),
    };
    let worker = state.clone();
    let name = file_name.clone();
    let rendered = tokio::task::spawn_blocking(move || {
        render_mosaic(&bytes, &name, &config, &worker.style, &worker.rasterizer)
    })
    .await
    .map_err(ApiError::internal)??;

    let plot = state.storage.save_plot(id, &rendered.png).await?;
    info!(
        %id,
        categories = rendered.layout.bands.len(),
        segments = rendered.layout.segments.len(),
        path = %plot.display(),
        "plot written"
    );

    let disposition = format!("attachment; filename=\"{}\"", download_name(&file_name));
    Ok((
        [(header::CONTENT_TYPE, "image/png")],
        [(header::CONTENT_DISPOSITION, disposition)],
        rendered.png,
    )
        .into_response())
}
