use bookstore_kernel::gateway::{Document, Fields};
use serde::{Deserialize, Serialize};

/// A catalog category. Books refer to it by `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Denormalized count of books carrying this category name
    pub book_count: i64,
    /// Soft-delete flag
    pub is_active: bool,
}

impl Category {
    /// Missing fields fall back to empty strings, zero books and active.
    pub fn from_document(document: &Document) -> Self {
        Self {
            id: document.id.clone(),
            name: document.get_str("name").unwrap_or_default().to_string(),
            description: document
                .get_str("description")
                .unwrap_or_default()
                .to_string(),
            book_count: document.get_i64("bookCount").unwrap_or(0),
            is_active: document.get_bool("isActive").unwrap_or(true),
        }
    }
}

/// Request body for creating or renaming a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryInput {
    pub name: String,
    pub description: String,
}

pub(crate) fn new_category_fields(name: &str, description: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("name".into(), name.into());
    fields.insert("description".into(), description.into());
    fields.insert("bookCount".into(), 0.into());
    fields.insert("isActive".into(), true.into());
    fields
}
