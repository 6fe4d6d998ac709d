pub mod catalog;
pub mod models;
mod routes;
pub mod search;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookstore_authz::AdminChecker;
use bookstore_http::error::AppError;
use bookstore_kernel::{gateway::Gateways, InitCtx, Module};
use serde_json::json;

use crate::modules::categories::CategoryService;
pub use catalog::{BookCatalog, CatalogError};

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Invalid(ref source) => AppError::validation(
                vec![json!({"field": source.field(), "error": source.to_string()})],
                err.to_string(),
            ),
            CatalogError::EmptyImage => AppError::bad_request(err.to_string()),
            CatalogError::NotFound(_) => AppError::not_found(err.to_string()),
            CatalogError::Category(source) => source.into(),
            CatalogError::Gateway(source) => AppError::Internal(source.into()),
        }
    }
}

/// Book catalog: public browsing and search, admin-only writes.
pub struct BooksModule {
    catalog: Arc<BookCatalog>,
    admin: AdminChecker,
}

impl BooksModule {
    pub fn new(gateways: &Gateways, categories: Arc<CategoryService>) -> Self {
        Self {
            catalog: Arc::new(BookCatalog::new(
                gateways.documents.clone(),
                gateways.blobs.clone(),
                categories,
            )),
            admin: AdminChecker::new(gateways.auth.clone(), gateways.documents.clone()),
        }
    }

    pub fn catalog(&self) -> Arc<BookCatalog> {
        Arc::clone(&self.catalog)
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(routes::BooksHttp {
            catalog: self.catalog(),
            admin: self.admin.clone(),
        })
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books, optionally by category and search query",
                        "tags": ["Books"],
                        "parameters": [
                            { "name": "q", "in": "query", "schema": { "type": "string" } },
                            { "name": "category", "in": "query", "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Matching books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Add a book (admin)",
                        "tags": ["Books"],
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/NewBook" }
                                }
                            }
                        },
                        "responses": {
                            "201": { "description": "Book created" },
                            "403": { "description": "Administrator privileges required" },
                            "422": {
                                "description": "Validation error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "responses": {
                            "200": { "description": "The book" },
                            "404": { "description": "Unknown book" }
                        }
                    },
                    "delete": {
                        "summary": "Delete a book (admin)",
                        "tags": ["Books"],
                        "responses": {
                            "204": { "description": "Deleted" },
                            "404": { "description": "Unknown book" }
                        }
                    }
                },
                "/{id}/cover": {
                    "get": {
                        "summary": "Cover image bytes, or a redirect to its URL",
                        "tags": ["Books"],
                        "responses": {
                            "200": { "description": "Inline image" },
                            "307": { "description": "Hosted image" },
                            "404": { "description": "No cover" }
                        }
                    }
                },
                "/covers": {
                    "post": {
                        "summary": "Upload a cover image (admin)",
                        "tags": ["Books"],
                        "responses": { "201": { "description": "Download URL" } }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "description": { "type": "string" },
                            "category": { "type": "string" },
                            "imageUrl": { "type": "string", "description": "URL or inline base64 image" },
                            "price": { "type": "number", "minimum": 0 }
                        },
                        "required": ["id", "title"]
                    },
                    "NewBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "description": { "type": "string" },
                            "category": { "type": "string" },
                            "imageUrl": { "type": "string" },
                            "price": { "type": "number", "minimum": 0 }
                        },
                        "required": ["title"]
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}
