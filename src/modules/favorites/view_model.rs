//! Presentation state for the favorites list.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;

use super::repository::{FavoritesError, FavoritesRepository};
use crate::modules::books::models::Book;

/// What the favorites screen should render.
#[derive(Debug, Clone, PartialEq)]
pub enum FavoritesState {
    /// No snapshot received yet.
    Loading,
    /// Latest snapshot; may be empty.
    Loaded(Vec<Book>),
    /// The last intent failed. `books` is the last known list.
    Failed { books: Vec<Book>, message: String },
}

impl FavoritesState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FavoritesState::Loading)
    }

    pub fn books(&self) -> &[Book] {
        match self {
            FavoritesState::Loading => &[],
            FavoritesState::Loaded(books) | FavoritesState::Failed { books, .. } => books,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FavoritesState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Move to `Failed`, keeping the last known books. `Loading` stays
    /// `Loading` until the first snapshot arrives.
    fn record_failure(&mut self, message: String) {
        let books = match self {
            FavoritesState::Loading => return,
            FavoritesState::Loaded(books) | FavoritesState::Failed { books, .. } => {
                std::mem::take(books)
            }
        };
        *self = FavoritesState::Failed { books, message };
    }
}

/// Republishes the repository's favorites stream as [`FavoritesState`] and
/// runs intents in the background.
///
/// Dropping the view-model cancels the stream subscription only; intents
/// already dispatched run to completion.
pub struct FavoritesViewModel {
    repository: Arc<FavoritesRepository>,
    state: Arc<watch::Sender<FavoritesState>>,
    subscription: JoinHandle<()>,
}

impl FavoritesViewModel {
    /// Must be called within a tokio runtime.
    pub fn new(repository: Arc<FavoritesRepository>) -> Self {
        let (sender, _) = watch::channel(FavoritesState::Loading);
        let state = Arc::new(sender);

        let mut favorites = repository.all_favorites();
        let publisher = Arc::clone(&state);
        let subscription = tokio::spawn(async move {
            while let Some(books) = favorites.next().await {
                tracing::trace!(count = books.len(), "favorites snapshot received");
                publisher.send_replace(FavoritesState::Loaded(books));
            }
        });

        Self {
            repository,
            state,
            subscription,
        }
    }

    pub fn state(&self) -> FavoritesState {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<FavoritesState> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn favorite_books(&self) -> Vec<Book> {
        self.state.borrow().books().to_vec()
    }

    /// Add when `currently_favorite` is false, remove otherwise. The flag is
    /// taken as given; the store is not consulted.
    pub fn toggle_favorite(&self, book: Book, currently_favorite: bool) -> JoinHandle<()> {
        if currently_favorite {
            self.remove_from_favorites(&book)
        } else {
            self.add_to_favorites(book)
        }
    }

    pub fn add_to_favorites(&self, book: Book) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        self.dispatch("add_to_favorites", async move { repository.add(&book).await })
    }

    pub fn remove_from_favorites(&self, book: &Book) -> JoinHandle<()> {
        self.remove_by_id(book.id.clone())
    }

    pub fn remove_by_id(&self, id: impl Into<String>) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let id = id.into();
        self.dispatch("remove_from_favorites", async move {
            repository.remove(&id).await
        })
    }

    pub fn clear_all_favorites(&self) -> JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        self.dispatch("clear_all_favorites", async move { repository.clear().await })
    }

    /// Fire-and-forget; callers may await the handle but need not.
    fn dispatch<F>(&self, intent: &'static str, operation: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), FavoritesError>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Err(err) = operation.await {
                tracing::error!(intent, error = %err, "favorites intent failed");
                state.send_modify(|current| current.record_failure(err.to_string()));
            }
        })
    }
}

impl Drop for FavoritesViewModel {
    fn drop(&mut self) {
        self.subscription.abort();
    }
}
