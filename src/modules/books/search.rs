//! Client-side catalog filtering.

use super::models::Book;

/// Queries shorter than this (after trimming) leave the list unfiltered.
pub const MIN_QUERY_CHARS: usize = 2;

/// Books whose title, author or category contains `query`, ignoring case.
/// Order is preserved.
pub fn filter_books<'a>(books: &'a [Book], query: &str) -> Vec<&'a Book> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_CHARS {
        return books.iter().collect();
    }

    let needle = query.to_lowercase();
    books
        .iter()
        .filter(|book| {
            [&book.title, &book.author, &book.category]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(title: &str, author: &str, category: &str) -> Book {
        Book {
            id: title.to_lowercase(),
            title: title.into(),
            author: author.into(),
            category: category.into(),
            ..Book::default()
        }
    }

    fn shelf() -> Vec<Book> {
        vec![
            book("War and Peace", "Leo Tolstoy", "Classics"),
            book("Dune", "Frank Herbert", "Fiction"),
            book("The Rust Book", "Klabnik", "IT"),
        ]
    }

    #[test]
    fn short_query_returns_everything() {
        let books = shelf();
        assert_eq!(filter_books(&books, "").len(), 3);
        assert_eq!(filter_books(&books, " w ").len(), 3);
    }

    #[test]
    fn matches_any_field_case_insensitively() {
        let books = shelf();

        let titles = |query: &str| -> Vec<String> {
            filter_books(&books, query)
                .into_iter()
                .map(|b| b.title.clone())
                .collect()
        };

        assert_eq!(titles("tolSTOY"), vec!["War and Peace"]);
        assert_eq!(titles("fiction"), vec!["Dune"]);
        assert_eq!(titles("it"), vec!["The Rust Book"]);
        assert!(titles("poetry").is_empty());
    }
}
