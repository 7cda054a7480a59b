use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookmarks", get(handler::list_bookmarks))
        .route("/bookmarks", post(handler::create_bookmark))
        .route("/bookmarks/:id", get(handler::get_bookmark))
        .route("/bookmarks/:id", put(handler::update_bookmark))
        .route("/bookmarks/:id", patch(handler::update_bookmark))
        .route("/bookmarks/:id", delete(handler::delete_bookmark))
        .route("/folders", get(handler::list_folders))
        .route("/folders", post(handler::create_folder))
        .route("/folders/:id", get(handler::get_folder))
        .route("/folders/:id", put(handler::update_folder))
        .route("/folders/:id", patch(handler::update_folder))
        .route("/folders/:id", delete(handler::delete_folder))
        .route(
            "/folders/:id/bookmarks",
            get(handler::list_bookmarks_in_folder),
        )
}
