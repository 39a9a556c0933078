use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool, sqlite::SqlitePoolOptions};
use tracing::info;

/// One persisted `/sum` call.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Request {
    pub id: i64,
    pub a: i64,
    pub b: i64,
    pub answer: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewRequest {
    pub a: i64,
    pub b: i64,
    pub answer: i64,
}

/// The operations the application and its tests need from the database.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn create(&self, new: NewRequest) -> Result<Request, sqlx::Error>;

    /// Removes every row, returning how many were deleted.
    async fn delete_all(&self) -> Result<u64, sqlx::Error>;

    async fn count(&self) -> Result<i64, sqlx::Error>;
}

#[derive(Debug, Clone)]
pub struct SqliteRequestStore {
    pool: SqlitePool,
}

impl SqliteRequestStore {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(database_url, "database ready");

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStore for SqliteRequestStore {
    async fn create(&self, new: NewRequest) -> Result<Request, sqlx::Error> {
        sqlx::query_as::<_, Request>(
            "INSERT INTO requests (a, b, answer, created_at) VALUES (?, ?, ?, ?)
             RETURNING id, a, b, answer, created_at",
        )
        .bind(new.a)
        .bind(new.b)
        .bind(new.answer)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    async fn delete_all(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM requests")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM requests")
            .fetch_one(&self.pool)
            .await
    }
}
