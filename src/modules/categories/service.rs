use std::sync::Arc;

use bookstore_kernel::gateway::{DocumentStore, Fields, GatewayError, Query};
use thiserror::Error;

use super::models::{new_category_fields, Category};

pub const CATEGORIES_COLLECTION: &str = "categories";

#[derive(Debug, Error)]
pub enum CategoryError {
    #[error("category name must not be empty")]
    EmptyName,
    #[error("category {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Category administration over the `categories` collection.
///
/// Name uniqueness is left to the backend; renaming or deactivating a
/// category does not touch the books that carry its old name.
pub struct CategoryService {
    documents: Arc<dyn DocumentStore>,
}

impl CategoryService {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// Every category, active or not, ordered by name.
    pub async fn list_all(&self) -> Result<Vec<Category>, CategoryError> {
        self.list(Query::new().order_by("name")).await
    }

    /// Active categories ordered by name.
    pub async fn list_active(&self) -> Result<Vec<Category>, CategoryError> {
        self.list(Query::new().where_eq("isActive", true).order_by("name"))
            .await
    }

    async fn list(&self, query: Query) -> Result<Vec<Category>, CategoryError> {
        let documents = self.documents.query(CATEGORIES_COLLECTION, &query).await?;
        Ok(documents.iter().map(Category::from_document).collect())
    }

    pub async fn add(&self, name: &str, description: &str) -> Result<Category, CategoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryError::EmptyName);
        }

        let description = description.trim();
        let id = self
            .documents
            .add(CATEGORIES_COLLECTION, new_category_fields(name, description))
            .await?;
        tracing::info!(category_id = %id, name, "category added");

        Ok(Category {
            id,
            name: name.to_string(),
            description: description.to_string(),
            book_count: 0,
            is_active: true,
        })
    }

    pub async fn update(&self, id: &str, name: &str, description: &str) -> Result<(), CategoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryError::EmptyName);
        }

        let mut fields = Fields::new();
        fields.insert("name".into(), name.into());
        fields.insert("description".into(), description.trim().into());

        self.documents
            .update(CATEGORIES_COLLECTION, id, fields)
            .await
            .map_err(|err| match err {
                GatewayError::NotFound { .. } => CategoryError::NotFound(id.to_string()),
                other => CategoryError::Gateway(other),
            })?;
        tracing::info!(category_id = %id, name, "category updated");
        Ok(())
    }

    /// Hard delete removes the document; otherwise the category is deactivated.
    pub async fn delete(&self, id: &str, hard: bool) -> Result<(), CategoryError> {
        if hard {
            self.documents.delete(CATEGORIES_COLLECTION, id).await?;
            tracing::info!(category_id = %id, "category deleted");
            return Ok(());
        }

        let mut fields = Fields::new();
        fields.insert("isActive".into(), false.into());
        self.documents
            .update(CATEGORIES_COLLECTION, id, fields)
            .await
            .map_err(|err| match err {
                GatewayError::NotFound { .. } => CategoryError::NotFound(id.to_string()),
                other => CategoryError::Gateway(other),
            })?;
        tracing::info!(category_id = %id, "category deactivated");
        Ok(())
    }

    /// Add `delta` to the book count of every category named `name`,
    /// never going below zero. Returns how many categories were touched.
    pub async fn adjust_book_count(&self, name: &str, delta: i64) -> Result<usize, CategoryError> {
        let matches = self
            .documents
            .query(CATEGORIES_COLLECTION, &Query::new().where_eq("name", name))
            .await?;

        for document in &matches {
            let current = document.get_i64("bookCount").unwrap_or(0);
            let mut fields = Fields::new();
            fields.insert("bookCount".into(), (current + delta).max(0).into());
            self.documents
                .update(CATEGORIES_COLLECTION, &document.id, fields)
                .await?;
        }

        tracing::debug!(name, delta, touched = matches.len(), "category book count adjusted");
        Ok(matches.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_kernel::gateway::memory::MemoryDocumentStore;

    fn service() -> CategoryService {
        CategoryService::new(Arc::new(MemoryDocumentStore::new()))
    }

    #[tokio::test]
    async fn add_rejects_blank_names() {
        let service = service();
        assert!(matches!(
            service.add("   ", "x").await.unwrap_err(),
            CategoryError::EmptyName
        ));
    }

    #[tokio::test]
    async fn soft_delete_hides_from_active_list() {
        let service = service();
        let poetry = service.add("Poetry", "Verse").await.unwrap();
        service.add("Classics", "").await.unwrap();

        service.delete(&poetry.id, false).await.unwrap();

        let active: Vec<_> = service
            .list_active()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(active, vec!["Classics"]);

        let all: Vec<_> = service
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| (c.name, c.is_active))
            .collect();
        assert_eq!(
            all,
            vec![("Classics".to_string(), true), ("Poetry".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn hard_delete_removes() {
        let service = service();
        let it = service.add("IT", "").await.unwrap();

        service.delete(&it.id, true).await.unwrap();

        assert!(service.list_all().await.unwrap().is_empty());
        assert!(matches!(
            service.delete(&it.id, false).await.unwrap_err(),
            CategoryError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn update_renames() {
        let service = service();
        let it = service.add("IT", "").await.unwrap();

        service.update(&it.id, "Computing", "Code").await.unwrap();

        let all = service.list_all().await.unwrap();
        assert_eq!(all[0].name, "Computing");
        assert_eq!(all[0].description, "Code");
        assert!(matches!(
            service.update("missing", "X", "").await.unwrap_err(),
            CategoryError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn book_count_never_negative() {
        let service = service();
        service.add("IT", "").await.unwrap();

        assert_eq!(service.adjust_book_count("IT", 2).await.unwrap(), 1);
        service.adjust_book_count("IT", -5).await.unwrap();
        assert_eq!(service.adjust_book_count("Nope", 1).await.unwrap(), 0);

        assert_eq!(service.list_all().await.unwrap()[0].book_count, 0);
    }
}
