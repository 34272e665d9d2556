//! Local library cache
//!
//! SQLite-backed mirror of the remote library, one record per book keyed by
//! book id. On top of the remote metadata each record carries reader-only
//! state the server does not track: the PDF binary once hydrated, bookmarks,
//! the last-read page, the page count and a thumbnail.
//!
//! Field-level updates are read-modify-write over the full record inside a
//! transaction, so two updates to the same id never interleave. The pool is
//! capped at one connection, matching the single-writer model of the cache.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::{AppError, Result};

/// A bookmark inside a cached book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub page: i64,
    #[serde(default)]
    pub label: String,
}

/// A locally cached book record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalBook {
    pub id: String,
    pub name: String,
    pub file_url: Option<String>,
    /// PDF binary, present only once hydrated or locally uploaded
    pub file: Option<Vec<u8>>,
    pub bookmarks: Vec<Bookmark>,
    pub last_page: i64,
    pub page_count: i64,
    /// Embeddable image string (`data:image/png;base64,...`)
    pub thumbnail: Option<String>,
    /// Unix milliseconds
    pub added_at: i64,
    /// Unix milliseconds, 0 = never opened
    pub last_opened: i64,
    /// Whether a remote counterpart exists
    pub synced: bool,
}

impl LocalBook {
    /// Reading progress as a whole percentage, clamped to [0, 100]
    pub fn progress_percent(&self) -> u8 {
        if self.page_count <= 0 {
            return 0;
        }
        let percent = 100.0 * self.last_page as f64 / self.page_count as f64;
        percent.round().clamp(0.0, 100.0) as u8
    }
}

/// Local cache store for book records
#[derive(Clone)]
pub struct LibraryCache {
    pool: SqlitePool,
}

impl LibraryCache {
    /// Open (or create) the cache database
    pub async fn open(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA_SQL).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Insert or replace a record
    pub async fn put(&self, book: &LocalBook) -> Result<()> {
        let bookmarks = serde_json::to_string(&book.bookmarks)
            .map_err(|e| AppError::Internal(format!("Failed to encode bookmarks: {}", e)))?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO local_books
                (id, name, file_url, file, bookmarks, last_page, page_count,
                 thumbnail, added_at, last_opened, synced)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&book.id)
        .bind(&book.name)
        .bind(&book.file_url)
        .bind(book.file.clone())
        .bind(&bookmarks)
        .bind(book.last_page)
        .bind(book.page_count)
        .bind(&book.thumbnail)
        .bind(book.added_at)
        .bind(book.last_opened)
        .bind(book.synced)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch one record by id
    pub async fn get(&self, id: &str) -> Result<Option<LocalBook>> {
        let row = sqlx::query_as::<_, BookRow>(&format!("{} WHERE id = ?", SELECT_SQL))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_book()).transpose()
    }

    /// Fetch all records, order unspecified
    pub async fn get_all(&self) -> Result<Vec<LocalBook>> {
        let rows = sqlx::query_as::<_, BookRow>(SELECT_SQL)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_book()).collect()
    }

    /// Delete a record; succeeds even if the id is absent
    pub async fn remove(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM local_books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Replace a book's bookmark list
    pub async fn update_bookmarks(&self, id: &str, bookmarks: Vec<Bookmark>) -> Result<LocalBook> {
        self.update_with(id, |book| book.bookmarks = bookmarks).await
    }

    /// Record the last-read page, clamped to the known page count
    pub async fn update_last_page(&self, id: &str, page: i64) -> Result<LocalBook> {
        self.update_with(id, |book| {
            let mut page = page.max(1);
            if book.page_count > 0 {
                page = page.min(book.page_count);
            }
            book.last_page = page;
        })
        .await
    }

    /// Rename a book locally
    pub async fn update_name(&self, id: &str, name: String) -> Result<LocalBook> {
        self.update_with(id, |book| book.name = name).await
    }

    /// Record a book's total page count, keeping `last_page` within range
    pub async fn update_page_count(&self, id: &str, page_count: i64) -> Result<LocalBook> {
        self.update_with(id, |book| {
            book.page_count = page_count;
            if page_count > 0 && book.last_page > page_count {
                book.last_page = page_count;
            }
        })
        .await
    }

    /// Attach a thumbnail image string
    pub async fn update_thumbnail(&self, id: &str, thumbnail: String) -> Result<LocalBook> {
        self.update_with(id, |book| book.thumbnail = Some(thumbnail))
            .await
    }

    /// Record when the book was last opened
    pub async fn touch_last_opened(&self, id: &str, at_ms: i64) -> Result<LocalBook> {
        self.update_with(id, |book| book.last_opened = at_ms).await
    }

    /// Read-modify-write of a full record, atomic per id
    async fn update_with<F>(&self, id: &str, mutate: F) -> Result<LocalBook>
    where
        F: FnOnce(&mut LocalBook),
    {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BookRow>(&format!("{} WHERE id = ?", SELECT_SQL))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let mut book = row
            .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", id)))?
            .into_book()?;

        mutate(&mut book);

        let bookmarks = serde_json::to_string(&book.bookmarks)
            .map_err(|e| AppError::Internal(format!("Failed to encode bookmarks: {}", e)))?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO local_books
                (id, name, file_url, file, bookmarks, last_page, page_count,
                 thumbnail, added_at, last_opened, synced)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&book.id)
        .bind(&book.name)
        .bind(&book.file_url)
        .bind(book.file.clone())
        .bind(&bookmarks)
        .bind(book.last_page)
        .bind(book.page_count)
        .bind(&book.thumbnail)
        .bind(book.added_at)
        .bind(book.last_opened)
        .bind(book.synced)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(book)
    }
}

const SELECT_SQL: &str = r#"
SELECT id, name, file_url, file, bookmarks, last_page, page_count,
       thumbnail, added_at, last_opened, synced
FROM local_books
"#;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS local_books (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    file_url TEXT,
    file BLOB,
    bookmarks TEXT NOT NULL DEFAULT '[]',
    last_page INTEGER NOT NULL DEFAULT 1,
    page_count INTEGER NOT NULL DEFAULT 0,
    thumbnail TEXT,
    added_at INTEGER NOT NULL DEFAULT 0,
    last_opened INTEGER NOT NULL DEFAULT 0,
    synced INTEGER NOT NULL DEFAULT 0
)
"#;

#[derive(sqlx::FromRow)]
struct BookRow {
    id: String,
    name: String,
    file_url: Option<String>,
    file: Option<Vec<u8>>,
    bookmarks: String,
    last_page: i64,
    page_count: i64,
    thumbnail: Option<String>,
    added_at: i64,
    last_opened: i64,
    synced: bool,
}

impl BookRow {
    fn into_book(self) -> Result<LocalBook> {
        let bookmarks = serde_json::from_str(&self.bookmarks)
            .map_err(|e| AppError::Internal(format!("Failed to decode bookmarks: {}", e)))?;

        Ok(LocalBook {
            id: self.id,
            name: self.name,
            file_url: self.file_url,
            file: self.file,
            bookmarks,
            last_page: self.last_page,
            page_count: self.page_count,
            thumbnail: self.thumbnail,
            added_at: self.added_at,
            last_opened: self.last_opened,
            synced: self.synced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_book(id: &str) -> LocalBook {
        LocalBook {
            id: id.to_string(),
            name: format!("{}.pdf", id),
            file_url: Some(format!("http://files.test/{}.pdf", id)),
            file: None,
            bookmarks: Vec::new(),
            last_page: 1,
            page_count: 0,
            thumbnail: None,
            added_at: 1_700_000_000_000,
            last_opened: 0,
            synced: true,
        }
    }

    async fn setup_cache() -> LibraryCache {
        LibraryCache::open("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let cache = setup_cache().await;

        let mut book = sample_book("7");
        book.file = Some(vec![1, 2, 3]);
        book.bookmarks = vec![Bookmark {
            id: "b1".to_string(),
            page: 5,
            label: "intro".to_string(),
        }];
        book.thumbnail = Some("data:image/png;base64,AAAA".to_string());

        cache.put(&book).await.unwrap();
        let fetched = cache.get("7").await.unwrap().unwrap();
        assert_eq!(fetched, book);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let cache = setup_cache().await;
        assert!(cache.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_absent_is_ok() {
        let cache = setup_cache().await;
        cache.remove("nope").await.unwrap();
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let cache = setup_cache().await;

        let mut book = sample_book("1");
        cache.put(&book).await.unwrap();

        book.name = "renamed.pdf".to_string();
        cache.put(&book).await.unwrap();

        let all = cache.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "renamed.pdf");
    }

    #[tokio::test]
    async fn test_field_update_missing_record_is_not_found() {
        let cache = setup_cache().await;
        let err = cache.update_name("ghost", "x".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_field_update_touches_only_target_field() {
        let cache = setup_cache().await;

        let mut book = sample_book("1");
        book.file = Some(vec![9, 9]);
        cache.put(&book).await.unwrap();

        let updated = cache.update_name("1", "new.pdf".to_string()).await.unwrap();
        assert_eq!(updated.name, "new.pdf");
        assert_eq!(updated.file, Some(vec![9, 9]));
        assert_eq!(updated.file_url, book.file_url);
    }

    #[tokio::test]
    async fn test_last_page_clamped_to_page_count() {
        let cache = setup_cache().await;
        cache.put(&sample_book("1")).await.unwrap();

        // Count unknown: any positive page is kept
        let updated = cache.update_last_page("1", 42).await.unwrap();
        assert_eq!(updated.last_page, 42);

        // Count becomes known: stale value is pulled back into range
        let updated = cache.update_page_count("1", 10).await.unwrap();
        assert_eq!(updated.last_page, 10);

        let updated = cache.update_last_page("1", 99).await.unwrap();
        assert_eq!(updated.last_page, 10);

        let updated = cache.update_last_page("1", 0).await.unwrap();
        assert_eq!(updated.last_page, 1);
    }

    #[tokio::test]
    async fn test_update_bookmarks() {
        let cache = setup_cache().await;
        cache.put(&sample_book("1")).await.unwrap();

        let bookmarks = vec![
            Bookmark {
                id: "b1".to_string(),
                page: 2,
                label: String::new(),
            },
            Bookmark {
                id: "b2".to_string(),
                page: 2,
                label: "dup page allowed".to_string(),
            },
        ];

        let updated = cache.update_bookmarks("1", bookmarks.clone()).await.unwrap();
        assert_eq!(updated.bookmarks, bookmarks);
    }

    #[test]
    fn test_progress_percent_bounds() {
        let mut book = sample_book("1");

        book.page_count = 0;
        book.last_page = 5;
        assert_eq!(book.progress_percent(), 0);

        book.page_count = 200;
        book.last_page = 1;
        assert_eq!(book.progress_percent(), 1);

        book.last_page = 100;
        assert_eq!(book.progress_percent(), 50);

        book.last_page = 200;
        assert_eq!(book.progress_percent(), 100);
    }
}
