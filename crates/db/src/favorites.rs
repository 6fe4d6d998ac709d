//! Local favorites table.

use std::sync::Arc;

use async_trait::async_trait;
use bookstore_events::{SnapshotTopic, Snapshots};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use crate::{Database, Migration, StoreError};

/// Creates the `favorites` table. The id is the only uniqueness constraint.
pub const FAVORITES_MIGRATION: Migration = Migration {
    id: "001_favorites",
    up: r#"
        CREATE TABLE IF NOT EXISTS favorites (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            description TEXT NOT NULL,
            category TEXT NOT NULL,
            image_url TEXT NOT NULL,
            price REAL NOT NULL
        );
        "#,
};

const SELECT_COLUMNS: &str = "SELECT id, title, author, description, category, image_url, price FROM favorites";

/// One cached favorite, keyed by `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub category: String,
    pub image_url: String,
    pub price: f64,
}

impl FavoriteRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            description: row.get(3)?,
            category: row.get(4)?,
            image_url: row.get(5)?,
            price: row.get(6)?,
        })
    }
}

/// Durable store of favorite records.
///
/// Mutations are atomic: subscribers of [`FavoriteStore::get_all`] observe
/// either the state before a write or the state after it, never a mix.
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Live sequence of full snapshots, starting with the current one.
    fn get_all(&self) -> Snapshots<FavoriteRecord>;

    async fn get_by_id(&self, id: &str) -> Result<Option<FavoriteRecord>, StoreError>;

    /// Upsert every record in one transaction. An existing record keeps its
    /// position in the snapshot.
    async fn insert_all(&self, records: Vec<FavoriteRecord>) -> Result<(), StoreError>;

    /// Remove `id` if present.
    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError>;

    async fn clear_all(&self) -> Result<(), StoreError>;
}

/// [`FavoriteStore`] backed by the `favorites` SQLite table.
///
/// The snapshot is re-read inside the write transaction and published after
/// commit while the connection lock is still held, so published snapshots
/// follow commit order. A failed re-read rolls the write back.
pub struct SqliteFavoriteStore {
    db: Database,
    topic: Arc<SnapshotTopic<FavoriteRecord>>,
}

impl SqliteFavoriteStore {
    /// Wrap a migrated database, loading the initial snapshot.
    pub async fn open(db: Database) -> Result<Self, StoreError> {
        let initial = db.call(|conn| load_all(conn)).await?;
        tracing::debug!(target: "bookstore-db", count = initial.len(), "favorites loaded");

        Ok(Self {
            db,
            topic: Arc::new(SnapshotTopic::new(initial)),
        })
    }

    async fn write<F>(&self, op: &'static str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<usize, StoreError> + Send + 'static,
    {
        let topic = Arc::clone(&self.topic);
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                let changed = f(&tx)?;
                let snapshot = if changed > 0 { Some(load_all(&tx)?) } else { None };
                tx.commit()?;

                match snapshot {
                    Some(snapshot) if *topic.current() != snapshot => topic.publish(snapshot),
                    _ => tracing::trace!(target: "bookstore-db", op, "favorites unchanged"),
                }
                tracing::debug!(target: "bookstore-db", op, changed, "favorites write committed");
                Ok(())
            })
            .await
    }
}

#[async_trait]
impl FavoriteStore for SqliteFavoriteStore {
    fn get_all(&self) -> Snapshots<FavoriteRecord> {
        self.topic.subscribe()
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<FavoriteRecord>, StoreError> {
        let id = id.to_owned();
        self.db
            .call(move |conn| {
                let record = conn
                    .query_row(
                        &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                        params![id],
                        FavoriteRecord::from_row,
                    )
                    .optional()?;
                Ok(record)
            })
            .await
    }

    async fn insert_all(&self, records: Vec<FavoriteRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }

        self.write("insert_all", move |tx| {
            let mut stmt = tx.prepare(
                "INSERT INTO favorites
                    (id, title, author, description, category, image_url, price)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    author = excluded.author,
                    description = excluded.description,
                    category = excluded.category,
                    image_url = excluded.image_url,
                    price = excluded.price",
            )?;
            let mut changed = 0;
            for record in &records {
                changed += stmt.execute(params![
                    record.id,
                    record.title,
                    record.author,
                    record.description,
                    record.category,
                    record.image_url,
                    record.price,
                ])?;
            }
            Ok(changed)
        })
        .await
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        let id = id.to_owned();
        self.write("delete_by_id", move |tx| {
            Ok(tx.execute("DELETE FROM favorites WHERE id = ?1", params![id])?)
        })
        .await
    }

    async fn clear_all(&self) -> Result<(), StoreError> {
        self.write("clear_all", |tx| Ok(tx.execute("DELETE FROM favorites", [])?))
            .await
    }
}

fn load_all(conn: &Connection) -> Result<Vec<FavoriteRecord>, StoreError> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY rowid"))?;
    let records = stmt
        .query_map([], FavoriteRecord::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}
