pub mod mapper;
pub mod repository;
pub mod view_model;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bookstore_db::{SqliteFavoriteStore, FAVORITES_MIGRATION};
use bookstore_http::error::AppError;
use bookstore_kernel::{InitCtx, Migration, Module};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::modules::books::models::Book;
pub use repository::{FavoritesError, FavoritesRepository};
pub use view_model::{FavoritesState, FavoritesViewModel};

impl From<FavoritesError> for AppError {
    fn from(err: FavoritesError) -> Self {
        match err {
            FavoritesError::InvalidBook { ref source, .. } => AppError::validation(
                vec![json!({"field": source.field(), "error": source.to_string()})],
                err.to_string(),
            ),
            FavoritesError::Storage(_) => AppError::Internal(err.into()),
        }
    }
}

/// The local favorites cache: SQLite store, repository and view-model,
/// wired up once migrations have run.
pub struct FavoritesModule {
    repository: OnceCell<Arc<FavoritesRepository>>,
    view_model: OnceCell<Arc<FavoritesViewModel>>,
}

impl FavoritesModule {
    pub fn new() -> Self {
        Self {
            repository: OnceCell::new(),
            view_model: OnceCell::new(),
        }
    }

    /// Available after [`Module::start`].
    pub fn repository(&self) -> Option<Arc<FavoritesRepository>> {
        self.repository.get().cloned()
    }

    pub fn view_model(&self) -> Option<Arc<FavoritesViewModel>> {
        self.view_model.get().cloned()
    }
}

impl Default for FavoritesModule {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
struct FavoritesHttp {
    repository: Arc<FavoritesRepository>,
    view_model: Arc<FavoritesViewModel>,
}

#[async_trait]
impl Module for FavoritesModule {
    fn name(&self) -> &'static str {
        "favorites"
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![FAVORITES_MIGRATION]
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let store = SqliteFavoriteStore::open(ctx.db.clone()).await?;
        let repository = Arc::new(FavoritesRepository::new(Arc::new(store)));
        let view_model = Arc::new(FavoritesViewModel::new(Arc::clone(&repository)));

        if self.repository.set(repository).is_err() || self.view_model.set(view_model).is_err() {
            anyhow::bail!("favorites module started twice");
        }

        tracing::info!(module = self.name(), "favorites module started");
        Ok(())
    }

    fn routes(&self) -> Router {
        let (Some(repository), Some(view_model)) = (self.repository(), self.view_model()) else {
            tracing::warn!(module = self.name(), "routes requested before start; serving none");
            return Router::new();
        };

        Router::new()
            .route("/", get(list_favorites).post(add_favorite).delete(clear_favorites))
            .route("/toggle", post(toggle_favorite))
            .route("/{id}", get(get_favorite).delete(remove_favorite))
            .route("/{id}/status", get(favorite_status))
            .with_state(FavoritesHttp {
                repository,
                view_model,
            })
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "Current favorites state",
                        "tags": ["Favorites"],
                        "responses": {
                            "200": {
                                "description": "Loading flag, cached books and the last intent error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/FavoritesView" }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Add a book to favorites",
                        "tags": ["Favorites"],
                        "responses": { "202": { "description": "Accepted" } }
                    },
                    "delete": {
                        "summary": "Clear all favorites",
                        "tags": ["Favorites"],
                        "responses": { "202": { "description": "Accepted" } }
                    }
                },
                "/toggle": {
                    "post": {
                        "summary": "Add or remove depending on currentlyFavorite",
                        "tags": ["Favorites"],
                        "responses": { "202": { "description": "Accepted" } }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Cached favorite by book id",
                        "tags": ["Favorites"],
                        "responses": {
                            "200": { "description": "Cached book" },
                            "404": { "description": "Not a favorite" }
                        }
                    },
                    "delete": {
                        "summary": "Remove a book from favorites",
                        "tags": ["Favorites"],
                        "responses": { "202": { "description": "Accepted" } }
                    }
                },
                "/{id}/status": {
                    "get": {
                        "summary": "Whether a book is a favorite",
                        "tags": ["Favorites"],
                        "responses": { "200": { "description": "Favorite flag" } }
                    }
                }
            },
            "components": {
                "schemas": {
                    "FavoritesView": {
                        "type": "object",
                        "properties": {
                            "loading": { "type": "boolean" },
                            "books": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                            "error": { "type": ["string", "null"] }
                        },
                        "required": ["loading", "books"]
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "favorites module stopped");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct FavoritesView {
    loading: bool,
    books: Vec<Book>,
    error: Option<String>,
}

impl From<&FavoritesState> for FavoritesView {
    fn from(state: &FavoritesState) -> Self {
        Self {
            loading: state.is_loading(),
            books: state.books().to_vec(),
            error: state.error().map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleRequest {
    book: Book,
    currently_favorite: bool,
}

#[derive(Debug, Serialize)]
struct FavoriteStatus {
    id: String,
    favorite: bool,
}

async fn list_favorites(State(http): State<FavoritesHttp>) -> Json<FavoritesView> {
    Json(FavoritesView::from(&http.view_model.state()))
}

async fn get_favorite(
    State(http): State<FavoritesHttp>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    http.repository
        .favorite_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("book {id} is not a favorite")))
}

async fn favorite_status(
    State(http): State<FavoritesHttp>,
    Path(id): Path<String>,
) -> Result<Json<FavoriteStatus>, AppError> {
    let favorite = http.repository.is_favorite(&id).await?;
    Ok(Json(FavoriteStatus { id, favorite }))
}

async fn add_favorite(State(http): State<FavoritesHttp>, Json(book): Json<Book>) -> StatusCode {
    http.view_model.add_to_favorites(book);
    StatusCode::ACCEPTED
}

async fn toggle_favorite(
    State(http): State<FavoritesHttp>,
    Json(request): Json<ToggleRequest>,
) -> StatusCode {
    http.view_model
        .toggle_favorite(request.book, request.currently_favorite);
    StatusCode::ACCEPTED
}

async fn remove_favorite(State(http): State<FavoritesHttp>, Path(id): Path<String>) -> StatusCode {
    http.view_model.remove_by_id(id);
    StatusCode::ACCEPTED
}

async fn clear_favorites(State(http): State<FavoritesHttp>) -> StatusCode {
    http.view_model.clear_all_favorites();
    StatusCode::ACCEPTED
}
