use std::sync::Arc;

use bookstore_kernel::gateway::{BlobStore, Document, DocumentStore, GatewayError, Query};
use thiserror::Error;
use uuid::Uuid;

use super::models::{Book, BookValidationError, NewBook};
use crate::modules::categories::{CategoryError, CategoryService};
use crate::utils::image::ImageRef;

pub const BOOKS_COLLECTION: &str = "books";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Invalid(#[from] BookValidationError),

    #[error("book {0} not found")]
    NotFound(String),

    #[error("cover image is empty")]
    EmptyImage,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Category(#[from] CategoryError),
}

/// The remote book catalog plus cover storage.
pub struct BookCatalog {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    categories: Arc<CategoryService>,
}

impl BookCatalog {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        categories: Arc<CategoryService>,
    ) -> Self {
        Self {
            documents,
            blobs,
            categories,
        }
    }

    pub async fn list_books(&self) -> Result<Vec<Book>, CatalogError> {
        self.fetch(&Query::new()).await
    }

    pub async fn books_by_category(&self, category: &str) -> Result<Vec<Book>, CatalogError> {
        self.fetch(&Query::new().where_eq("category", category))
            .await
    }

    pub async fn get_book(&self, id: &str) -> Result<Option<Book>, CatalogError> {
        let document = self.documents.get(BOOKS_COLLECTION, id).await?;
        Ok(document.and_then(decode))
    }

    /// Store a new book and bump its category's count.
    pub async fn add_book(&self, new_book: NewBook) -> Result<Book, CatalogError> {
        new_book.validate()?;

        let category = new_book.category.clone();
        let provisional = new_book.into_book(String::new());
        let id = self
            .documents
            .add(BOOKS_COLLECTION, provisional.to_fields())
            .await?;
        let book = Book { id, ..provisional };
        tracing::info!(book_id = %book.id, title = %book.title, "book added");

        if !category.is_empty() {
            self.categories.adjust_book_count(&category, 1).await?;
        }
        Ok(book)
    }

    pub async fn delete_book(&self, id: &str) -> Result<(), CatalogError> {
        let book = self
            .get_book(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;

        self.documents.delete(BOOKS_COLLECTION, id).await?;
        tracing::info!(book_id = %id, "book deleted");

        if !book.category.is_empty() {
            self.categories.adjust_book_count(&book.category, -1).await?;
        }
        Ok(())
    }

    /// Upload cover bytes and return their download URL.
    pub async fn upload_cover(&self, bytes: Vec<u8>) -> Result<String, CatalogError> {
        if bytes.is_empty() {
            return Err(CatalogError::EmptyImage);
        }

        let path = format!("images/{}.jpg", Uuid::new_v4());
        let size = bytes.len();
        let url = self.blobs.upload(&path, bytes).await?;
        tracing::info!(%path, size, "cover uploaded");
        Ok(url)
    }

    /// Cover reference of a stored book.
    pub async fn cover(&self, id: &str) -> Result<ImageRef, CatalogError> {
        let book = self
            .get_book(id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        Ok(ImageRef::parse(&book.image_url))
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<Book>, CatalogError> {
        let documents = self.documents.query(BOOKS_COLLECTION, query).await?;
        Ok(documents.into_iter().filter_map(decode).collect())
    }
}

/// Malformed documents are skipped.
fn decode(document: Document) -> Option<Book> {
    let id = document.id.clone();
    match Book::from_document(document) {
        Ok(book) => Some(book),
        Err(err) => {
            tracing::warn!(book_id = %id, error = %err, "skipping malformed book document");
            None
        }
    }
}
