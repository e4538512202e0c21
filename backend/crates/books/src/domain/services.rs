//! Domain Services
//!
//! Field validation shared by create and update.

use crate::domain::entities::{BookPatch, NewBook};
use crate::error::{BookError, BookResult};

/// Normalize an ISBN by dropping hyphens and spaces.
///
/// Returns `None` unless the result is an ISBN-10 (nine digits plus a digit or
/// `X`) or an ISBN-13 (thirteen digits). Check digits are not verified.
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let valid = match compact.len() {
        13 => compact.bytes().all(|b| b.is_ascii_digit()),
        10 => {
            let (body, check) = compact.split_at(9);
            body.bytes().all(|b| b.is_ascii_digit())
                && check.bytes().all(|b| b.is_ascii_digit() || b == b'X')
        }
        _ => false,
    };
    valid.then_some(compact)
}

fn required(field: &str, value: &str) -> BookResult<()> {
    if value.trim().is_empty() {
        return Err(BookError::validation(format!("{field} field is required")));
    }
    Ok(())
}

fn valid_pages(pages: i32) -> BookResult<()> {
    if pages <= 0 {
        return Err(BookError::validation("pages must be greater than zero"));
    }
    Ok(())
}

fn valid_isbn(isbn: &str) -> BookResult<String> {
    normalize_isbn(isbn)
        .ok_or_else(|| BookError::validation("isbn must contain 10 or 13 digits"))
}

/// Validate a new book and return it with trimmed text and a normalized ISBN.
pub fn validate_new_book(mut book: NewBook) -> BookResult<NewBook> {
    required("isbn", &book.isbn)?;
    required("title", &book.title)?;
    required("author", &book.author)?;
    required("publisher", &book.publisher)?;
    required("genre", &book.genre)?;
    required("language", &book.language)?;
    valid_pages(book.pages)?;

    book.isbn = valid_isbn(&book.isbn)?;
    for field in [
        &mut book.title,
        &mut book.author,
        &mut book.publisher,
        &mut book.genre,
        &mut book.language,
    ] {
        *field = field.trim().to_string();
    }
    Ok(book)
}

/// Validate the present fields of a patch, with the same rules as create.
pub fn validate_patch(mut patch: BookPatch) -> BookResult<BookPatch> {
    if let Some(isbn) = &patch.isbn {
        patch.isbn = Some(valid_isbn(isbn)?);
    }
    for (name, field) in [
        ("title", &mut patch.title),
        ("author", &mut patch.author),
        ("publisher", &mut patch.publisher),
        ("genre", &mut patch.genre),
        ("language", &mut patch.language),
    ] {
        if let Some(value) = field {
            required(name, value)?;
            *value = value.trim().to_string();
        }
    }
    if let Some(pages) = patch.pages {
        valid_pages(pages)?;
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Availability;
    use chrono::NaiveDate;

    fn book() -> NewBook {
        NewBook {
            isbn: "978-0-451-52493-5".into(),
            title: " 1984 ".into(),
            author: "George Orwell".into(),
            publisher: "Signet Classic".into(),
            published: NaiveDate::from_ymd_opt(1949, 6, 8).unwrap(),
            genre: "Dystopian".into(),
            language: "en".into(),
            pages: 328,
            availability: Availability::Available,
        }
    }

    #[test]
    fn test_normalize_isbn() {
        assert_eq!(
            normalize_isbn("978-0-451-52493-5").as_deref(),
            Some("9780451524935")
        );
        assert_eq!(normalize_isbn("0-8044-2957-x").as_deref(), Some("080442957X"));
        assert_eq!(normalize_isbn("12345"), None);
        assert_eq!(normalize_isbn("97804515249X5"), None);
    }

    #[test]
    fn test_validate_new_book_normalizes() {
        let book = validate_new_book(book()).unwrap();
        assert_eq!(book.isbn, "9780451524935");
        assert_eq!(book.title, "1984");
    }

    #[test]
    fn test_required_field_message() {
        let err = validate_new_book(NewBook {
            language: "".into(),
            ..book()
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "language field is required");
    }

    #[test]
    fn test_pages_must_be_positive() {
        assert!(validate_new_book(NewBook { pages: 0, ..book() }).is_err());
        assert!(
            validate_patch(BookPatch {
                pages: Some(-3),
                ..Default::default()
            })
            .is_err()
        );
    }

    #[test]
    fn test_validate_patch() {
        let patch = validate_patch(BookPatch {
            isbn: Some("978 0 451 52493 5".into()),
            title: Some(" Animal Farm ".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(patch.isbn.as_deref(), Some("9780451524935"));
        assert_eq!(patch.title.as_deref(), Some("Animal Farm"));

        let err = validate_patch(BookPatch {
            author: Some("   ".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "author field is required");
    }
}
