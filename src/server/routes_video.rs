//! Upload, duration, preview and conversion routes.

use crate::server::{error::ApiError, AppContext};
use axum::{
    body::Body,
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection, Multipart, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::io::{ReaderStream, StreamReader};

use timelapse_common::Error;

/// Multipart field carrying the video.
const UPLOAD_FIELD: &str = "file";

pub fn video_routes() -> Router<AppContext> {
    Router::new()
        .route("/upload", post(upload))
        .route("/duration", get(output_duration))
        .route("/preview", post(generate_preview))
        .route("/preview/stream", get(stream_preview))
        .route("/convert", post(convert))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub duration: f64,
    pub filename: String,
}

async fn upload(
    State(ctx): State<AppContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let reader = StreamReader::new(field.map_err(std::io::Error::other));
        tokio::pin!(reader);

        let outcome = ctx.service.upload(reader, &filename).await?;
        return Ok(Json(UploadResponse {
            success: true,
            duration: outcome.duration,
            filename: outcome.filename,
        }));
    }

    Err(Error::invalid_input(format!("missing multipart field '{}'", UPLOAD_FIELD)).into())
}

#[derive(Debug, Deserialize)]
pub struct SpeedQuery {
    pub speed: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationResponse {
    pub success: bool,
    pub output_duration: f64,
}

async fn output_duration(
    State(ctx): State<AppContext>,
    query: Result<Query<SpeedQuery>, QueryRejection>,
) -> Result<Json<DurationResponse>, ApiError> {
    let Query(query) = query?;
    let output_duration = ctx.service.calculate_output_duration(query.speed)?;
    Ok(Json(DurationResponse {
        success: true,
        output_duration,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub success: bool,
    pub preview_path: String,
}

async fn generate_preview(State(ctx): State<AppContext>) -> Result<Json<PreviewResponse>, ApiError> {
    let path = ctx.service.generate_preview().await?;
    Ok(Json(PreviewResponse {
        success: true,
        preview_path: path.to_string_lossy().into_owned(),
    }))
}

/// Stream the preview file without buffering it.
async fn stream_preview(State(ctx): State<AppContext>) -> Result<Response, ApiError> {
    let path = ctx.service.preview_path();

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No preview at {:?}", path);
            return Ok(StatusCode::NOT_FOUND.into_response());
        }
        Err(e) => return Err(Error::from(e).into()),
    };
    let len = file.metadata().await.map_err(Error::from)?.len();

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("video/mp4")),
        (header::CONTENT_LENGTH, HeaderValue::from(len)),
    ];
    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub speed: u32,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Kick off a conversion; the reply does not wait for FFmpeg.
async fn convert(
    State(ctx): State<AppContext>,
    query: Result<Query<ConvertQuery>, QueryRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Query(query) = query?;
    let output = ctx
        .service
        .start_conversion(query.speed, &query.filename)
        .await?;
    tracing::info!("Conversion started, writing {:?}", output);
    Ok(Json(SuccessResponse { success: true }))
}
