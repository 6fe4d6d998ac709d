use bookstore_kernel::gateway::{Document, Fields};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A catalog item. Field names on the wire and in the document store are
/// camelCase (`imageUrl`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Book {
    /// Stable identifier assigned by the document store
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    /// Category name; matched by name, not by reference
    pub category: String,
    /// URL or inline base64 image, possibly empty
    pub image_url: String,
    pub price: f64,
}

impl Book {
    /// Read a book from a `books` document, taking the id from the document key.
    pub fn from_document(document: Document) -> Result<Self, serde_json::Error> {
        let mut book: Book = serde_json::from_value(serde_json::Value::Object(document.fields))?;
        book.id = document.id;
        Ok(book)
    }

    /// Document fields for this book; the id is the document key, not a field.
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("title".into(), self.title.clone().into());
        fields.insert("author".into(), self.author.clone().into());
        fields.insert("description".into(), self.description.clone().into());
        fields.insert("category".into(), self.category.clone().into());
        fields.insert("imageUrl".into(), self.image_url.clone().into());
        fields.insert("price".into(), self.price.into());
        fields
    }
}

/// Request model for adding a book to the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: String,
    pub category: String,
    pub image_url: String,
    pub price: f64,
}

impl NewBook {
    pub fn validate(&self) -> Result<(), BookValidationError> {
        if self.title.trim().is_empty() {
            return Err(BookValidationError::EmptyTitle);
        }
        validate_price(self.price)
    }

    pub fn into_book(self, id: String) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            description: self.description,
            category: self.category,
            image_url: self.image_url,
            price: self.price,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BookValidationError {
    #[error("book id must not be empty")]
    EmptyId,
    #[error("book title must not be empty")]
    EmptyTitle,
    #[error("price must be a non-negative number, got {0}")]
    InvalidPrice(f64),
}

impl BookValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            BookValidationError::EmptyId => "id",
            BookValidationError::EmptyTitle => "title",
            BookValidationError::InvalidPrice(_) => "price",
        }
    }
}

pub(crate) fn validate_price(price: f64) -> Result<(), BookValidationError> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(BookValidationError::InvalidPrice(price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_round_trip_keeps_id_out_of_fields() {
        let book = Book {
            id: "b1".into(),
            title: "War and Peace".into(),
            author: "Tolstoy".into(),
            description: "...".into(),
            category: "Classics".into(),
            image_url: String::new(),
            price: 24.99,
        };

        let fields = book.to_fields();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields["imageUrl"], json!(""));

        let restored = Book::from_document(Document {
            id: "b1".into(),
            fields,
        })
        .unwrap();
        assert_eq!(restored, book);
    }

    #[test]
    fn missing_fields_default() {
        let document = Document {
            id: "b2".into(),
            fields: json!({"title": "Untitled"}).as_object().unwrap().clone(),
        };

        let book = Book::from_document(document).unwrap();
        assert_eq!(book.id, "b2");
        assert_eq!(book.price, 0.0);
        assert!(book.author.is_empty());
    }

    #[test]
    fn new_book_validation() {
        let mut book = NewBook {
            title: "  ".into(),
            price: 1.0,
            ..NewBook::default()
        };
        assert_eq!(book.validate(), Err(BookValidationError::EmptyTitle));

        book.title = "Dune".into();
        book.price = -1.0;
        assert_eq!(book.validate(), Err(BookValidationError::InvalidPrice(-1.0)));

        book.price = f64::NAN;
        assert!(book.validate().is_err());

        book.price = 0.0;
        assert!(book.validate().is_ok());
    }
}
