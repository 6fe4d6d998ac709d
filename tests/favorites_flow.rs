use std::sync::Arc;
use std::time::Duration;

use bookstore_app::books::models::Book;
use bookstore_app::favorites::{FavoritesRepository, FavoritesState, FavoritesViewModel};
use bookstore_db::{Database, SqliteFavoriteStore, FAVORITES_MIGRATION};
use tokio::sync::watch;
use tokio_stream::StreamExt;

async fn repository_at(path: &std::path::Path) -> FavoritesRepository {
    let db = Database::open(path).unwrap();
    db.migrate(&[("favorites".to_string(), FAVORITES_MIGRATION)])
        .await
        .unwrap();
    let store = SqliteFavoriteStore::open(db).await.unwrap();
    FavoritesRepository::new(Arc::new(store))
}

fn war_and_peace() -> Book {
    Book {
        id: "1".into(),
        title: "War and Peace".into(),
        author: "Tolstoy".into(),
        description: "...".into(),
        category: "Classics".into(),
        image_url: String::new(),
        price: 24.99,
    }
}

async fn next(stream: &mut (impl tokio_stream::Stream<Item = Vec<Book>> + Unpin)) -> Vec<Book> {
    tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .expect("no snapshot within 5s")
        .expect("favorites stream ended")
}

#[tokio::test]
async fn add_then_remove_is_observed_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let repository = repository_at(&dir.path().join("favorites.db")).await;
    let mut favorites = repository.all_favorites();

    assert!(next(&mut favorites).await.is_empty());

    repository.add(&war_and_peace()).await.unwrap();
    assert_eq!(next(&mut favorites).await, vec![war_and_peace()]);

    repository.remove("1").await.unwrap();
    assert!(next(&mut favorites).await.is_empty());
}

#[tokio::test]
async fn favorites_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("favorites.db");

    {
        let repository = repository_at(&path).await;
        repository.add(&war_and_peace()).await.unwrap();
    }

    let repository = repository_at(&path).await;
    assert_eq!(
        repository.favorite_by_id("1").await.unwrap(),
        Some(war_and_peace())
    );
}

async fn settle(states: &mut watch::Receiver<FavoritesState>, len: usize) -> FavoritesState {
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|s| matches!(s, FavoritesState::Loaded(books) if books.len() == len)),
    )
    .await
    .expect("state did not settle")
    .unwrap()
    .clone()
}

#[tokio::test]
async fn view_model_tracks_the_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let repository = Arc::new(repository_at(&dir.path().join("favorites.db")).await);
    let view_model = FavoritesViewModel::new(Arc::clone(&repository));
    let mut states = view_model.subscribe();

    settle(&mut states, 0).await;

    view_model.toggle_favorite(war_and_peace(), false).await.unwrap();
    assert_eq!(settle(&mut states, 1).await.books(), &[war_and_peace()]);

    view_model.toggle_favorite(war_and_peace(), true).await.unwrap();
    settle(&mut states, 0).await;
    assert!(!repository.is_favorite("1").await.unwrap());
}
