//! Conversion between catalog books and cached favorite records.
//!
//! Both directions carry the same seven fields, so the mapping is total and
//! lossless.

use bookstore_db::FavoriteRecord;

use crate::modules::books::models::Book;

pub fn to_record(book: &Book) -> FavoriteRecord {
    FavoriteRecord {
        id: book.id.clone(),
        title: book.title.clone(),
        author: book.author.clone(),
        description: book.description.clone(),
        category: book.category.clone(),
        image_url: book.image_url.clone(),
        price: book.price,
    }
}

pub fn to_domain(record: FavoriteRecord) -> Book {
    Book {
        id: record.id,
        title: record.title,
        author: record.author,
        description: record.description,
        category: record.category,
        image_url: record.image_url,
        price: record.price,
    }
}
