//! Book row database operations
//!
//! Every query is scoped to the owning user; a book id from another user
//! behaves like a missing row.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;

/// Book row as served on the wire by `GET /api/my-books`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookListing {
    pub id: i64,
    pub title: String,
    pub cloudinary_url: String,
    pub uploaded_at: String,
}

/// Full book row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookRecord {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub object_key: String,
    pub file_url: String,
    pub uploaded_at: String,
}

/// Book repository
pub struct BookRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BookRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new book and return its id
    pub async fn insert(
        &self,
        user_id: i64,
        title: &str,
        object_key: &str,
        file_url: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO books (user_id, title, object_key, file_url)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(object_key)
        .bind(file_url)
        .execute(self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// List a user's books, newest first
    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<BookListing>> {
        let books = sqlx::query_as::<_, BookListing>(
            r#"
            SELECT id, title, file_url AS cloudinary_url, uploaded_at
            FROM books
            WHERE user_id = ?
            ORDER BY uploaded_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(books)
    }

    /// Rename a book; returns false if the user owns no such book
    pub async fn rename(&self, book_id: i64, user_id: i64, new_name: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books SET title = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(new_name)
        .bind(book_id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a book row, returning its object key for storage cleanup
    pub async fn delete(&self, book_id: i64, user_id: i64) -> Result<Option<String>> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(String,)> = sqlx::query_as(
            "SELECT object_key FROM books WHERE id = ? AND user_id = ?",
        )
        .bind(book_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((object_key,)) = row else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM books WHERE id = ? AND user_id = ?")
            .bind(book_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(object_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{initialize_schema, UserRepository};

    async fn setup_test_db() -> (SqlitePool, i64) {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        initialize_schema(&pool).await.unwrap();
        let user_id = UserRepository::new(&pool)
            .create("ada", "ada@example.com", "hash")
            .await
            .unwrap();
        (pool, user_id)
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let (pool, user_id) = setup_test_db().await;
        let repo = BookRepository::new(&pool);

        let id = repo
            .insert(user_id, "notes.pdf", "books/abc/notes.pdf", "http://files/notes.pdf")
            .await
            .unwrap();

        let books = repo.list_for_user(user_id).await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, id);
        assert_eq!(books[0].title, "notes.pdf");
        assert_eq!(books[0].cloudinary_url, "http://files/notes.pdf");

        // Scoped to the owner
        assert!(repo.list_for_user(user_id + 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rename_scoped_to_owner() {
        let (pool, user_id) = setup_test_db().await;
        let repo = BookRepository::new(&pool);

        let id = repo
            .insert(user_id, "Old", "k", "http://files/old.pdf")
            .await
            .unwrap();

        assert!(!repo.rename(id, user_id + 1, "New").await.unwrap());
        assert!(repo.rename(id, user_id, "New").await.unwrap());

        let books = repo.list_for_user(user_id).await.unwrap();
        assert_eq!(books[0].title, "New");
    }

    #[tokio::test]
    async fn test_delete_returns_object_key() {
        let (pool, user_id) = setup_test_db().await;
        let repo = BookRepository::new(&pool);

        let id = repo
            .insert(user_id, "notes.pdf", "books/abc/notes.pdf", "http://files/notes.pdf")
            .await
            .unwrap();

        assert_eq!(repo.delete(id, user_id + 1).await.unwrap(), None);
        assert_eq!(
            repo.delete(id, user_id).await.unwrap(),
            Some("books/abc/notes.pdf".to_string())
        );
        assert!(repo.list_for_user(user_id).await.unwrap().is_empty());
    }
}
