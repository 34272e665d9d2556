//! User account database operations

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;

/// User account record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
}

/// User repository
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new user and return its id
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .execute(self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Look up a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::initialize_schema;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        initialize_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let pool = setup_test_db().await;
        let repo = UserRepository::new(&pool);

        let id = repo.create("ada", "ada@example.com", "hash").await.unwrap();
        assert!(id > 0);

        let user = repo.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.username, "ada");

        assert!(repo.find_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let pool = setup_test_db().await;
        let repo = UserRepository::new(&pool);

        repo.create("ada", "ada@example.com", "hash").await.unwrap();
        assert!(repo.create("ada2", "ada@example.com", "hash").await.is_err());
    }
}
