//! HTTP handlers for the exporter endpoints.

use crate::error::ExporterError;
use crate::metrics::{exposition, parse_snapshot, render, ReportView, SnapshotSource};
use crate::web::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Health check endpoint. Never token-gated.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Prometheus exposition of the current vnstat counters.
pub async fn metrics<S: SnapshotSource>(State(state): State<AppState<S>>) -> Response {
    let raw = match state.source.fetch_json().await {
        Ok(raw) => raw,
        Err(e) => {
            error!("Failed to get JSON data for metrics: {}", e);
            return plain(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch data\n");
        }
    };

    match parse_snapshot(&raw) {
        Ok(snapshot) => (
            [(header::CONTENT_TYPE, exposition::EXPOSITION_CONTENT_TYPE)],
            render(&snapshot),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to parse JSON data: {}", e);
            plain(StatusCode::INTERNAL_SERVER_ERROR, "Failed to parse data\n")
        }
    }
}

/// Raw `vnstat --json` output.
pub async fn json_report<S: SnapshotSource>(State(state): State<AppState<S>>) -> Response {
    match state.source.fetch_json().await {
        Ok(raw) => ([(header::CONTENT_TYPE, "application/json")], raw).into_response(),
        Err(e) => {
            error!("Failed to get JSON data: {}", e);
            json_error(&e)
        }
    }
}

/// One of vnstat's plain-text reports.
pub async fn text_report<S: SnapshotSource>(state: &AppState<S>, view: ReportView) -> Response {
    match state.source.fetch(view).await {
        Ok(text) => ([(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], text).into_response(),
        Err(e) => {
            error!("Failed to get {:?} data: {}", view, e);
            plain(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}\n", e))
        }
    }
}

/// Monthly report for `/` and every unmatched path.
pub async fn monthly_fallback<S: SnapshotSource>(State(state): State<AppState<S>>) -> Response {
    text_report(&state, ReportView::Monthly).await
}

fn plain(status: StatusCode, body: impl Into<String>) -> Response {
    (status, [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)], body.into()).into_response()
}

fn json_error(err: &ExporterError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}
