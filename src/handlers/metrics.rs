use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{error::AppResult, AppState};

// ── GET /metrics ──────────────────────────────────────────────────────────────

pub async fn get_metrics(
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let aggregated = state.telemetry.aggregated().await;
    let samples: usize = aggregated.iter().map(|m| m.sample_count).sum();

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "sample_count": samples,
            "aggregated": aggregated,
        })),
    ))
}

// ── GET /metrics/csv ──────────────────────────────────────────────────────────

pub async fn export_csv(State(state): State<AppState>) -> AppResult<Response> {
    let csv = state.telemetry.export_csv().await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"inventory_metrics.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}
