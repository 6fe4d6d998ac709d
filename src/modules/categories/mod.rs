pub mod models;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use bookstore_authz::AdminChecker;
use bookstore_http::error::AppError;
use bookstore_kernel::{gateway::Gateways, InitCtx, Module};
use serde::Deserialize;
use serde_json::json;

use models::{Category, CategoryInput};
pub use service::{CategoryError, CategoryService, CATEGORIES_COLLECTION};

impl From<CategoryError> for AppError {
    fn from(err: CategoryError) -> Self {
        match err {
            CategoryError::EmptyName => AppError::validation(
                vec![json!({"field": "name", "error": "required"})],
                err.to_string(),
            ),
            CategoryError::NotFound(_) => AppError::not_found(err.to_string()),
            CategoryError::Gateway(source) => AppError::Internal(source.into()),
        }
    }
}

/// Category administration: listing is public, writes are admin only.
pub struct CategoriesModule {
    service: Arc<CategoryService>,
    admin: AdminChecker,
}

impl CategoriesModule {
    pub fn new(gateways: &Gateways) -> Self {
        Self {
            service: Arc::new(CategoryService::new(gateways.documents.clone())),
            admin: AdminChecker::new(gateways.auth.clone(), gateways.documents.clone()),
        }
    }

    pub fn service(&self) -> Arc<CategoryService> {
        Arc::clone(&self.service)
    }
}

#[derive(Clone)]
struct CategoriesState {
    service: Arc<CategoryService>,
    admin: AdminChecker,
}

#[async_trait]
impl Module for CategoriesModule {
    fn name(&self) -> &'static str {
        "categories"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "categories module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        let state = CategoriesState {
            service: self.service(),
            admin: self.admin.clone(),
        };

        Router::new()
            .route("/", get(list_categories).post(add_category))
            .route("/{id}", put(update_category).delete(delete_category))
            .with_state(state)
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List categories (active only unless all=true)",
                        "tags": ["Categories"],
                        "responses": {
                            "200": {
                                "description": "Categories ordered by name",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Category" }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Add a category (admin)",
                        "tags": ["Categories"],
                        "responses": {
                            "201": { "description": "Category created" },
                            "403": { "description": "Administrator privileges required" },
                            "422": { "description": "Empty name" }
                        }
                    }
                },
                "/{id}": {
                    "put": {
                        "summary": "Rename a category (admin)",
                        "tags": ["Categories"],
                        "responses": {
                            "204": { "description": "Updated" },
                            "404": { "description": "Unknown category" }
                        }
                    },
                    "delete": {
                        "summary": "Deactivate, or remove with hard=true (admin)",
                        "tags": ["Categories"],
                        "responses": {
                            "204": { "description": "Deleted" },
                            "404": { "description": "Unknown category" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Category": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "name": { "type": "string" },
                            "description": { "type": "string" },
                            "bookCount": { "type": "integer", "minimum": 0 },
                            "isActive": { "type": "boolean" }
                        },
                        "required": ["id", "name", "description", "bookCount", "isActive"]
                    }
                }
            }
        }))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListParams {
    all: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeleteParams {
    hard: bool,
}

async fn list_categories(
    State(state): State<CategoriesState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Category>>, AppError> {
    let categories = if params.all {
        state.service.list_all().await?
    } else {
        state.service.list_active().await?
    };
    Ok(Json(categories))
}

async fn add_category(
    State(state): State<CategoriesState>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    state.admin.require_admin().await?;
    let category = state.service.add(&input.name, &input.description).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<CategoriesState>,
    Path(id): Path<String>,
    Json(input): Json<CategoryInput>,
) -> Result<StatusCode, AppError> {
    state.admin.require_admin().await?;
    state
        .service
        .update(&id, &input.name, &input.description)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_category(
    State(state): State<CategoriesState>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, AppError> {
    state.admin.require_admin().await?;
    state.service.delete(&id, params.hard).await?;
    Ok(StatusCode::NO_CONTENT)
}
