//! SQL Builders
//!
//! Assemble parameterized statements from a filter or patch. Every value is
//! bound; only fixed column names and keywords are pushed as SQL text.

use crate::domain::entities::BookPatch;
use crate::domain::value_objects::{BookFilter, present};
use crate::error::BookResult;
use chrono::{DateTime, Utc};
use kernel::id::BookId;
use sqlx::{Postgres, QueryBuilder};

pub(crate) const BOOK_COLUMNS: &str = "id, isbn, title, author, publisher, published, genre, \
     language, pages, availability, created_at, updated_at, deleted_at";

/// Escape `LIKE` metacharacters so the value matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_contains(qb: &mut QueryBuilder<'_, Postgres>, column: &str, value: Option<&str>) {
    if let Some(value) = value {
        qb.push(format!(" AND {column} ILIKE "))
            .push_bind(format!("%{}%", escape_like(value)))
            .push(" ESCAPE '\\'");
    }
}

fn push_equals(qb: &mut QueryBuilder<'_, Postgres>, column: &str, value: Option<&str>) {
    if let Some(value) = value {
        qb.push(format!(" AND {column} = "))
            .push_bind(value.to_string());
    }
}

/// `SELECT` for live books matching `filter`, ordered by `updated_at, id`.
///
/// Fails before touching the database if pagination cannot be represented.
pub fn build_list_query(filter: &BookFilter) -> BookResult<QueryBuilder<'static, Postgres>> {
    // Computed first so a bad filter never yields a half-built statement.
    let offset = filter.offset()?;

    let mut qb = QueryBuilder::new(format!(
        "SELECT {BOOK_COLUMNS} FROM books WHERE deleted_at IS NULL"
    ));

    if let Some(id) = filter.id {
        qb.push(" AND id = ").push_bind(id.value());
    }
    push_equals(&mut qb, "isbn", present(&filter.isbn));
    push_contains(&mut qb, "title", present(&filter.title));
    push_contains(&mut qb, "author", present(&filter.author));
    push_contains(&mut qb, "publisher", present(&filter.publisher));
    push_contains(&mut qb, "genre", present(&filter.genre));
    push_equals(&mut qb, "language", present(&filter.language));
    if let Some(availability) = filter.availability {
        qb.push(" AND availability = ")
            .push_bind(availability.as_str());
    }
    if let Some(published) = filter.published {
        qb.push(" AND published = ").push_bind(published);
    }
    if let Some(pages) = filter.pages {
        qb.push(" AND pages = ").push_bind(pages);
    }
    if let Some(since) = filter.updated_since {
        qb.push(" AND updated_at >= ").push_bind(since);
    }

    qb.push(" ORDER BY updated_at ASC, id ASC");

    if let Some(limit) = filter.limit() {
        qb.push(" LIMIT ").push_bind(limit);
    }
    if let Some(offset) = offset {
        qb.push(" OFFSET ").push_bind(offset);
    }

    Ok(qb)
}

/// `UPDATE` of a live book. `updated_at` is always written.
pub fn build_update_query<'a>(
    id: BookId,
    patch: &'a BookPatch,
    now: DateTime<Utc>,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new("UPDATE books SET updated_at = ");
    qb.push_bind(now);

    let text_fields = [
        ("isbn", &patch.isbn),
        ("title", &patch.title),
        ("author", &patch.author),
        ("publisher", &patch.publisher),
        ("genre", &patch.genre),
        ("language", &patch.language),
    ];
    for (column, value) in text_fields {
        if let Some(value) = value {
            qb.push(format!(", {column} = ")).push_bind(value.as_str());
        }
    }
    if let Some(published) = patch.published {
        qb.push(", published = ").push_bind(published);
    }
    if let Some(pages) = patch.pages {
        qb.push(", pages = ").push_bind(pages);
    }
    if let Some(availability) = patch.availability {
        qb.push(", availability = ")
            .push_bind(availability.as_str());
    }

    qb.push(" WHERE id = ")
        .push_bind(id.value())
        .push(" AND deleted_at IS NULL RETURNING ")
        .push(BOOK_COLUMNS);
    qb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Availability;
    use crate::error::BookError;
    use chrono::NaiveDate;

    const SELECT: &str = "SELECT id, isbn, title, author, publisher, published, genre, \
         language, pages, availability, created_at, updated_at, deleted_at FROM books \
         WHERE deleted_at IS NULL";

    #[test]
    fn test_empty_filter_lists_all_live_rows() {
        let qb = build_list_query(&BookFilter::default()).unwrap();
        assert_eq!(
            qb.sql(),
            format!("{SELECT} ORDER BY updated_at ASC, id ASC")
        );
    }

    #[test]
    fn test_every_filter_is_bound() {
        let filter = BookFilter {
            id: Some(BookId::from_i64(3)),
            isbn: Some("9780451524935".into()),
            title: Some("gatsby".into()),
            author: Some("Fitz".into()),
            publisher: Some("Scrib".into()),
            genre: Some("Nov".into()),
            language: Some("en".into()),
            availability: Some(Availability::NotAvailable),
            published: NaiveDate::from_ymd_opt(1925, 4, 10),
            pages: Some(180),
            updated_since: Some(Utc::now()),
            page: 2,
            per_page: 2,
        };
        let qb = build_list_query(&filter).unwrap();

        let expected = format!(
            "{SELECT} AND id = $1 AND isbn = $2 \
             AND title ILIKE $3 ESCAPE '\\' AND author ILIKE $4 ESCAPE '\\' \
             AND publisher ILIKE $5 ESCAPE '\\' AND genre ILIKE $6 ESCAPE '\\' \
             AND language = $7 AND availability = $8 AND published = $9 \
             AND pages = $10 AND updated_at >= $11 \
             ORDER BY updated_at ASC, id ASC LIMIT $12 OFFSET $13"
        );
        assert_eq!(qb.sql(), expected);
    }

    #[test]
    fn test_blank_text_filters_are_skipped() {
        let filter = BookFilter {
            title: Some("".into()),
            language: Some("   ".into()),
            ..Default::default()
        };
        let qb = build_list_query(&filter).unwrap();
        assert!(!qb.sql().contains("title"));
        assert!(!qb.sql().contains("language ="));
    }

    #[test]
    fn test_pagination_clauses() {
        let only_limit = BookFilter {
            per_page: 10,
            ..Default::default()
        };
        let sql = build_list_query(&only_limit).unwrap().sql().to_string();
        assert!(sql.ends_with("LIMIT $1"));

        let only_page = BookFilter {
            page: 3,
            ..Default::default()
        };
        let sql = build_list_query(&only_page).unwrap().sql().to_string();
        assert!(sql.ends_with("OFFSET $1"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_overflowing_offset_fails_at_build_time() {
        let filter = BookFilter {
            page: u32::MAX,
            per_page: u32::MAX,
            ..Default::default()
        };
        assert!(matches!(
            build_list_query(&filter),
            Err(BookError::QueryBuild(_))
        ));
    }

    #[test]
    fn test_like_metacharacters_are_escaped() {
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_update_only_sets_present_fields() {
        let patch = BookPatch {
            isbn: Some("9780141182636".into()),
            pages: Some(99),
            ..Default::default()
        };
        let qb = build_update_query(BookId::from_i64(5), &patch, Utc::now());
        assert_eq!(
            qb.sql(),
            format!(
                "UPDATE books SET updated_at = $1, isbn = $2, pages = $3 \
                 WHERE id = $4 AND deleted_at IS NULL RETURNING {BOOK_COLUMNS}"
            )
        );
    }

    #[test]
    fn test_empty_update_still_bumps_updated_at() {
        let patch = BookPatch::default();
        let qb = build_update_query(BookId::from_i64(5), &patch, Utc::now());
        assert!(qb.sql().starts_with("UPDATE books SET updated_at = $1 WHERE id = $2"));
    }
}
