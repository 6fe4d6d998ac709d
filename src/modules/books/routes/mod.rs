//! HTTP handlers for the book catalog.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use bookstore_authz::AdminChecker;
use bookstore_http::error::AppError;
use serde::Deserialize;
use serde_json::json;

use super::catalog::BookCatalog;
use super::models::{Book, NewBook};
use super::search::filter_books;
use crate::utils::image::{content_type, ImageRef};

#[derive(Clone)]
pub(super) struct BooksHttp {
    pub catalog: Arc<BookCatalog>,
    pub admin: AdminChecker,
}

pub(super) fn router(state: BooksHttp) -> Router {
    Router::new()
        .route("/", get(list_books).post(add_book))
        .route("/covers", post(upload_cover))
        .route("/{id}", get(get_book).delete(delete_book))
        .route("/{id}/cover", get(book_cover))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListParams {
    q: String,
    category: Option<String>,
}

async fn list_books(
    State(http): State<BooksHttp>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Book>>, AppError> {
    let books = match params.category.as_deref() {
        Some(category) if !category.is_empty() => {
            http.catalog.books_by_category(category).await?
        }
        _ => http.catalog.list_books().await?,
    };
    let matches = filter_books(&books, &params.q)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(matches))
}

async fn get_book(
    State(http): State<BooksHttp>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    http.catalog
        .get_book(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("book {id} not found")))
}

async fn book_cover(
    State(http): State<BooksHttp>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    match http.catalog.cover(&id).await? {
        ImageRef::Inline(bytes) => {
            Ok(([(header::CONTENT_TYPE, content_type(&bytes))], bytes).into_response())
        }
        ImageRef::Url(url) => Ok(Redirect::temporary(&url).into_response()),
        ImageRef::None => Err(AppError::not_found(format!("book {id} has no cover"))),
    }
}

async fn add_book(
    State(http): State<BooksHttp>,
    Json(new_book): Json<NewBook>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    http.admin.require_admin().await?;
    let book = http.catalog.add_book(new_book).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn delete_book(
    State(http): State<BooksHttp>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    http.admin.require_admin().await?;
    http.catalog.delete_book(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_cover(
    State(http): State<BooksHttp>,
    body: Bytes,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    http.admin.require_admin().await?;
    let url = http.catalog.upload_cover(body.to_vec()).await?;
    Ok((StatusCode::CREATED, Json(json!({ "url": url }))))
}
