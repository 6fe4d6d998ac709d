use std::sync::Arc;

use bookstore_db::{FavoriteStore, StoreError};
use thiserror::Error;
use tokio_stream::{Stream, StreamExt};

use super::mapper;
use crate::modules::books::models::{validate_price, Book, BookValidationError};

#[derive(Debug, Error)]
pub enum FavoritesError {
    #[error("favorites storage failed: {0}")]
    Storage(#[from] StoreError),

    #[error("book '{id}' cannot be cached: {source}")]
    InvalidBook {
        id: String,
        #[source]
        source: BookValidationError,
    },
}

/// Domain view of the local favorites cache. The only owner of the
/// underlying [`FavoriteStore`].
pub struct FavoritesRepository {
    store: Arc<dyn FavoriteStore>,
}

impl FavoritesRepository {
    pub fn new(store: Arc<dyn FavoriteStore>) -> Self {
        Self { store }
    }

    /// Live list of favorites. Each subscription starts with the current
    /// snapshot.
    pub fn all_favorites(&self) -> impl Stream<Item = Vec<Book>> + Send + Unpin + 'static {
        self.store.get_all().map(|snapshot| {
            snapshot
                .iter()
                .cloned()
                .map(mapper::to_domain)
                .collect::<Vec<_>>()
        })
    }

    pub async fn favorite_by_id(&self, id: &str) -> Result<Option<Book>, FavoritesError> {
        let record = self.store.get_by_id(id).await?;
        Ok(record.map(mapper::to_domain))
    }

    pub async fn add(&self, book: &Book) -> Result<(), FavoritesError> {
        validate(book)?;
        self.store.insert_all(vec![mapper::to_record(book)]).await?;
        tracing::debug!(book_id = %book.id, "favorite added");
        Ok(())
    }

    /// Cache every book in one write. Nothing is written if any book is
    /// invalid.
    pub async fn add_all(&self, books: &[Book]) -> Result<(), FavoritesError> {
        for book in books {
            validate(book)?;
        }
        let records = books.iter().map(mapper::to_record).collect();
        self.store.insert_all(records).await?;
        tracing::debug!(count = books.len(), "favorites added");
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> Result<(), FavoritesError> {
        self.store.delete_by_id(id).await?;
        tracing::debug!(book_id = %id, "favorite removed");
        Ok(())
    }

    pub async fn is_favorite(&self, id: &str) -> Result<bool, FavoritesError> {
        Ok(self.store.get_by_id(id).await?.is_some())
    }

    /// Drop every cached favorite, e.g. when the account signs out.
    pub async fn clear(&self) -> Result<(), FavoritesError> {
        self.store.clear_all().await?;
        tracing::info!("favorites cleared");
        Ok(())
    }
}

fn validate(book: &Book) -> Result<(), FavoritesError> {
    let invalid = |source| FavoritesError::InvalidBook {
        id: book.id.clone(),
        source,
    };

    if book.id.trim().is_empty() {
        return Err(invalid(BookValidationError::EmptyId));
    }
    validate_price(book.price).map_err(invalid)
}
