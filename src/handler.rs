use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::advisor::Advisor;
use crate::catalog::Catalog;
use crate::db::Database;
use crate::enrich::Enricher;
use crate::error::EnrichError;
use crate::export;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub enricher: Arc<Enricher>,
    pub advisor: Arc<Advisor>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn bad_request(msg: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

fn internal_error(msg: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/export
///
/// Downloads a ZIP archive with bookmarks_YYYYMMDD-HHMM.csv and
/// folders_YYYYMMDD-HHMM.csv, built entirely in memory. If either relation
/// fails to load, the whole export fails.
pub async fn export_archive(State(state): State<AppState>) -> Response {
    let catalog = Catalog::new(state.db.connection());

    let bookmarks = match catalog.all_bookmarks().await {
        Ok(bookmarks) => bookmarks,
        Err(e) => {
            tracing::error!("Failed to load bookmarks for export: {}", e);
            return internal_error("Failed to export bookmarks");
        }
    };
    let folders = match catalog.all_folders().await {
        Ok(folders) => folders,
        Err(e) => {
            tracing::error!("Failed to load folders for export: {}", e);
            return internal_error("Failed to export folders");
        }
    };

    let stamp = export::export_stamp();
    let archive = match export::build_archive(
        &export::bookmarks_csv(&bookmarks),
        &export::folders_csv(&folders),
        &stamp,
    ) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to build export archive: {}", e);
            return internal_error("Failed to build export archive");
        }
    };

    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::archive_filename(&stamp)
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct TitleParams {
    pub url: Option<String>,
}

/// GET /api/title?url=
///
/// Runs the enrichment pipeline and returns `{title, faviconColor}`.
pub async fn get_title(
    State(state): State<AppState>,
    params: Result<Query<TitleParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(query) => query,
        Err(e) => return bad_request(&e.body_text()),
    };
    let url = match params.url {
        Some(url) if !url.is_empty() => url,
        _ => return bad_request("Query parameter 'url' is required"),
    };

    match state.enricher.enrich(&url).await {
        Ok(enriched) => (StatusCode::OK, Json(enriched)).into_response(),
        Err(EnrichError::InvalidUrl(_)) => bad_request(&format!("Invalid url: {}", url)),
        Err(e) => {
            // distinguishes non-2xx from transport failures in the message
            tracing::error!("Enrichment failed for {}: {}", url, e);
            internal_error(&e.to_string())
        }
    }
}

/// GET /api/gemini/*url
///
/// Asks the advisor for a folder suggestion and returns its reply verbatim,
/// ideally a bare folder id. The wildcard capture keeps slashes in the raw
/// URL intact; percent-decoding is done by the extractor.
pub async fn suggest_folder(State(state): State<AppState>, Path(url): Path<String>) -> Response {
    if url.is_empty() {
        return bad_request("A url path segment is required");
    }

    let catalog = Catalog::new(state.db.connection());
    let folders = match catalog.list_folders(None).await {
        Ok(folders) => folders,
        Err(e) => {
            tracing::error!("Failed to list folders for suggestion: {}", e);
            return internal_error("Failed to list folders");
        }
    };

    match state.advisor.suggest(&url, &folders).await {
        Ok(reply) => (StatusCode::OK, reply).into_response(),
        Err(e) => {
            tracing::error!("Folder suggestion failed for {}: {}", url, e);
            internal_error(&e.to_string())
        }
    }
}
