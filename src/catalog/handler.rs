//! HTTP handlers for the bookmark and folder catalog.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::{
    BookmarkQuery, Catalog, CreateBookmark, CreateFolder, SortSpec, UpdateBookmark, UpdateFolder,
};
use crate::handler::AppState;
use crate::page::{Page, PageMeta};

#[derive(Debug, Deserialize)]
pub struct BookmarkListParams {
    pub folder_id: Option<i32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct FolderListParams {
    pub parent_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse { data })).into_response()
}

pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse { data })).into_response()
}

pub fn not_found(msg: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

pub fn bad_request(msg: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

pub fn internal_error(msg: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

/// Shared listing path for `/bookmarks` and `/folders/:id/bookmarks`.
///
/// The folder-scoped route funnels through here with a forced `folder_id`,
/// so the two endpoints cannot diverge in filtering, sorting or pagination.
async fn list_bookmarks_with(
    state: &AppState,
    params: BookmarkListParams,
    folder_override: Option<i32>,
) -> Response {
    let sort = match params.sort.as_deref() {
        Some(spec) => match SortSpec::parse(spec) {
            Some(sort) => sort,
            None => return bad_request(&format!("Unknown sort field: {}", spec)),
        },
        None => SortSpec::default(),
    };

    let query = BookmarkQuery {
        folder_id: folder_override.or(params.folder_id),
        search: params.search,
        sort,
    };
    let page = Page::from_params(params.page, params.page_size);

    let catalog = Catalog::new(state.db.connection());
    match catalog.list_bookmarks(&query, &page).await {
        Ok((bookmarks, total)) => (
            StatusCode::OK,
            Json(ListResponse {
                data: bookmarks,
                pagination: PageMeta::new(total, &page),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to list bookmarks: {}", e);
            internal_error("Failed to list bookmarks")
        }
    }
}

pub async fn list_bookmarks(
    State(state): State<AppState>,
    params: Result<Query<BookmarkListParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(query) => query,
        Err(e) => return bad_request(&e.body_text()),
    };
    list_bookmarks_with(&state, params, None).await
}

pub async fn list_bookmarks_in_folder(
    State(state): State<AppState>,
    Path(folder_id): Path<i32>,
    params: Result<Query<BookmarkListParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(query) => query,
        Err(e) => return bad_request(&e.body_text()),
    };
    list_bookmarks_with(&state, params, Some(folder_id)).await
}

pub async fn get_bookmark(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    let catalog = Catalog::new(state.db.connection());

    match catalog.get_bookmark(id).await {
        Ok(Some(bookmark)) => success(bookmark),
        Ok(None) => not_found("Bookmark not found"),
        Err(e) => {
            tracing::error!("Failed to get bookmark: {}", e);
            internal_error("Failed to get bookmark")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBookmarkBody {
    pub url: Option<String>,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub folder_id: Option<i32>,
    #[serde(rename = "faviconColor")]
    pub favicon_color: Option<String>,
}

pub async fn create_bookmark(
    State(state): State<AppState>,
    body: Result<Json<CreateBookmarkBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(json) => json,
        Err(e) => return bad_request(&e.body_text()),
    };
    let url = match body.url {
        Some(url) if !url.is_empty() => url,
        _ => return bad_request("'url' is required"),
    };

    let catalog = Catalog::new(state.db.connection());
    let input = CreateBookmark {
        url,
        title: body.title,
        comment: body.comment,
        folder_id: body.folder_id,
        favicon_color: body.favicon_color,
    };

    match catalog.create_bookmark(input).await {
        Ok(bookmark) => created(bookmark),
        Err(e) => {
            tracing::error!("Failed to create bookmark: {}", e);
            internal_error("Failed to create bookmark")
        }
    }
}

pub async fn update_bookmark(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Result<Json<UpdateBookmark>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(json) => json,
        Err(e) => return bad_request(&e.body_text()),
    };
    if body.is_empty() {
        return bad_request("Request body cannot be empty");
    }
    if body.blanks_required_field() {
        return bad_request("'url' cannot be empty");
    }

    let catalog = Catalog::new(state.db.connection());
    match catalog.update_bookmark(id, body).await {
        Ok(Some(bookmark)) => success(bookmark),
        Ok(None) => not_found("Bookmark not found"),
        Err(e) => {
            tracing::error!("Failed to update bookmark: {}", e);
            internal_error("Failed to update bookmark")
        }
    }
}

pub async fn delete_bookmark(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    let catalog = Catalog::new(state.db.connection());

    match catalog.delete_bookmark(id).await {
        Ok(true) => (StatusCode::NO_CONTENT, ()).into_response(),
        Ok(false) => not_found("Bookmark not found"),
        Err(e) => {
            tracing::error!("Failed to delete bookmark: {}", e);
            internal_error("Failed to delete bookmark")
        }
    }
}

pub async fn list_folders(
    State(state): State<AppState>,
    params: Result<Query<FolderListParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(query) => query,
        Err(e) => return bad_request(&e.body_text()),
    };
    let catalog = Catalog::new(state.db.connection());

    match catalog.list_folders(params.parent_id).await {
        Ok(folders) => success(folders),
        Err(e) => {
            tracing::error!("Failed to list folders: {}", e);
            internal_error("Failed to list folders")
        }
    }
}

pub async fn get_folder(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    let catalog = Catalog::new(state.db.connection());

    match catalog.get_folder(id).await {
        Ok(Some(folder)) => success(folder),
        Ok(None) => not_found("Folder not found"),
        Err(e) => {
            tracing::error!("Failed to get folder: {}", e);
            internal_error("Failed to get folder")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderBody {
    pub name: Option<String>,
    pub parent_id: Option<i32>,
    pub color: Option<String>,
}

pub async fn create_folder(
    State(state): State<AppState>,
    body: Result<Json<CreateFolderBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(json) => json,
        Err(e) => return bad_request(&e.body_text()),
    };
    let name = match body.name {
        Some(name) if !name.is_empty() => name,
        _ => return bad_request("'name' is required"),
    };

    let catalog = Catalog::new(state.db.connection());
    let input = CreateFolder {
        name,
        parent_id: body.parent_id,
        color: body.color,
    };

    match catalog.create_folder(input).await {
        Ok(folder) => created(folder),
        Err(e) => {
            tracing::error!("Failed to create folder: {}", e);
            internal_error("Failed to create folder")
        }
    }
}

pub async fn update_folder(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Result<Json<UpdateFolder>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(json) => json,
        Err(e) => return bad_request(&e.body_text()),
    };
    if body.is_empty() {
        return bad_request("Request body cannot be empty");
    }
    if body.blanks_required_field() {
        return bad_request("'name' cannot be empty");
    }

    let catalog = Catalog::new(state.db.connection());
    match catalog.update_folder(id, body).await {
        Ok(Some(folder)) => success(folder),
        Ok(None) => not_found("Folder not found"),
        Err(e) => {
            tracing::error!("Failed to update folder: {}", e);
            internal_error("Failed to update folder")
        }
    }
}

pub async fn delete_folder(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    let catalog = Catalog::new(state.db.connection());

    match catalog.delete_folder(id).await {
        Ok(true) => (StatusCode::NO_CONTENT, ()).into_response(),
        Ok(false) => not_found("Folder not found"),
        Err(e) => {
            tracing::error!("Failed to delete folder: {}", e);
            internal_error("Failed to delete folder")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;

    use crate::advisor::Advisor;
    use crate::config;
    use crate::db::Database;
    use crate::enrich::Enricher;
    use crate::handler::AppState;

    async fn serve_catalog() -> String {
        let advisor_cfg = config::Advisor {
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash".to_string(),
        };
        let state = AppState {
            db: Arc::new(Database::new_in_memory().await.unwrap()),
            enricher: Arc::new(Enricher::new().unwrap()),
            advisor: Arc::new(Advisor::new(&advisor_cfg).unwrap()),
        };
        let app = crate::catalog::routes().with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn malformed_query_params_return_the_json_error_shape() {
        let base = serve_catalog().await;

        let resp = reqwest::get(format!("{}/bookmarks?page=abc", base))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn malformed_json_body_returns_the_json_error_shape() {
        let base = serve_catalog().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/bookmarks", base))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn update_cannot_blank_the_bookmark_url() {
        let base = serve_catalog().await;
        let client = reqwest::Client::new();

        let created: Value = client
            .post(format!("{}/bookmarks", base))
            .json(&serde_json::json!({ "url": "https://example.test" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = created["data"]["id"].as_i64().unwrap();

        let resp = client
            .patch(format!("{}/bookmarks/{}", base, id))
            .json(&serde_json::json!({ "url": "" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "'url' cannot be empty");

        let fetched: Value = client
            .get(format!("{}/bookmarks/{}", base, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(fetched["data"]["url"], "https://example.test");
    }

    #[tokio::test]
    async fn update_cannot_blank_the_folder_name() {
        let base = serve_catalog().await;
        let client = reqwest::Client::new();

        let created: Value = client
            .post(format!("{}/folders", base))
            .json(&serde_json::json!({ "name": "reading" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = created["data"]["id"].as_i64().unwrap();

        let resp = client
            .put(format!("{}/folders/{}", base, id))
            .json(&serde_json::json!({ "name": "" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "'name' cannot be empty");

        let fetched: Value = client
            .get(format!("{}/folders/{}", base, id))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(fetched["data"]["name"], "reading");
    }
}
