//! Runtime settings routes.

use crate::server::{error::ApiError, AppContext};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn config_routes() -> Router<AppContext> {
    Router::new()
        .route("/settings", post(update_settings))
        .route("/outputPath", get(output_path))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsQuery {
    pub output_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub success: bool,
    pub output_path: String,
}

async fn update_settings(
    State(ctx): State<AppContext>,
    query: Result<Query<SettingsQuery>, QueryRejection>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let Query(query) = query?;
    ctx.config.set_output_path(&query.output_path)?;

    let output_path = ctx.config.output_path();
    tracing::info!("Output directory set to {}", output_path);
    Ok(Json(SettingsResponse {
        success: true,
        output_path,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputPathResponse {
    pub output_path: String,
}

async fn output_path(State(ctx): State<AppContext>) -> Json<OutputPathResponse> {
    Json(OutputPathResponse {
        output_path: ctx.config.output_path(),
    })
}
