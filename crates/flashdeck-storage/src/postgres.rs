//! PostgreSQL storage implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, instrument};

use crate::error::{HealthStatus, StorageError, StorageResult};
use crate::traits::{
    validate_card, validate_id, validate_set, DataStore, SetFilter, StoredCard, StoredSet,
    StoredUser,
};

/// Default health check timeout in seconds.
const DEFAULT_HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// Default query timeout in seconds.
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

const SET_COLUMNS: &str = "id, owner_id, title, description, is_public, created_at, updated_at";
const CARD_COLUMNS: &str =
    "id, set_id, front, back, difficulty, times_reviewed, last_reviewed, created_at";
const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

/// PostgreSQL configuration options.
#[derive(Clone)]
pub struct PostgresConfig {
    /// Database connection URL.
    pub database_url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    pub min_connections: u32,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Maximum time to wait for a query to complete. A query exceeding it
    /// returns `StorageError::QueryTimeout`.
    pub query_timeout_secs: u64,
    /// Timeout for health checks in seconds.
    pub health_check_timeout_secs: u64,
}

// Custom Debug implementation to hide credentials in database_url
impl std::fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("query_timeout_secs", &self.query_timeout_secs)
            .field("health_check_timeout_secs", &self.health_check_timeout_secs)
            .finish()
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/flashdeck".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 5,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            health_check_timeout_secs: DEFAULT_HEALTH_CHECK_TIMEOUT_SECS,
        }
    }
}

/// PostgreSQL implementation of DataStore.
pub struct PostgresDataStore {
    pool: PgPool,
    query_timeout: Duration,
    health_check_timeout: Duration,
}

impl std::fmt::Debug for PostgresDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDataStore")
            .field("pool_size", &self.pool.size())
            .field("query_timeout", &self.query_timeout)
            .field("health_check_timeout", &self.health_check_timeout)
            .finish()
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside a LIKE pattern.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn row_to_user(row: &PgRow) -> StoredUser {
    StoredUser {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    }
}

fn row_to_set(row: &PgRow) -> StoredSet {
    StoredSet {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        description: row.get("description"),
        is_public: row.get("is_public"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_card(row: &PgRow) -> StoredCard {
    let times_reviewed: i32 = row.get("times_reviewed");
    StoredCard {
        id: row.get("id"),
        set_id: row.get("set_id"),
        front: row.get("front"),
        back: row.get("back"),
        difficulty: row.get("difficulty"),
        times_reviewed: u32::try_from(times_reviewed).unwrap_or(0),
        last_reviewed: row.get("last_reviewed"),
        created_at: row.get("created_at"),
    }
}

fn query_error(context: &str, e: sqlx::Error) -> StorageError {
    StorageError::QueryError {
        message: format!("{context}: {e}"),
    }
}

fn reviewed_count(card: &StoredCard) -> i32 {
    i32::try_from(card.times_reviewed).unwrap_or(i32::MAX)
}

impl PostgresDataStore {
    /// Creates a new PostgreSQL data store from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self::with_timeout(pool, Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS))
    }

    /// Creates a new PostgreSQL data store from a connection pool with custom timeout.
    pub fn with_timeout(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
            health_check_timeout: Duration::from_secs(DEFAULT_HEALTH_CHECK_TIMEOUT_SECS),
        }
    }

    /// Creates a new PostgreSQL data store with the given configuration.
    #[instrument(skip(config))]
    pub async fn from_config(config: &PostgresConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| StorageError::ConnectionError {
                message: e.to_string(),
            })?;

        Ok(Self {
            pool,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
            health_check_timeout: Duration::from_secs(config.health_check_timeout_secs),
        })
    }

    /// Creates a new PostgreSQL data store from a database URL.
    pub async fn from_url(database_url: &str) -> StorageResult<Self> {
        let config = PostgresConfig {
            database_url: database_url.to_string(),
            ..Default::default()
        };
        Self::from_config(&config).await
    }

    /// Wraps an async operation with the query timeout and records metrics.
    ///
    /// # Metrics
    /// - `flashdeck_storage_query_duration_seconds` - Histogram of query durations
    /// - `flashdeck_storage_query_timeout_total` - Counter of timeout events
    async fn execute_with_timeout<T, F>(&self, operation: &str, future: F) -> StorageResult<T>
    where
        F: std::future::Future<Output = StorageResult<T>>,
    {
        let start = Instant::now();
        let result = tokio::time::timeout(self.query_timeout, future).await;
        let duration = start.elapsed().as_secs_f64();

        let (status, final_result) = match result {
            Ok(Ok(value)) => ("success", Ok(value)),
            Ok(Err(e)) => ("error", Err(e)),
            Err(_elapsed) => (
                "timeout",
                Err(StorageError::QueryTimeout {
                    operation: operation.to_string(),
                    timeout: self.query_timeout,
                }),
            ),
        };

        metrics::histogram!(
            "flashdeck_storage_query_duration_seconds",
            "operation" => operation.to_string(),
            "backend" => "postgres",
            "status" => status
        )
        .record(duration);

        if status == "timeout" {
            metrics::counter!(
                "flashdeck_storage_query_timeout_total",
                "operation" => operation.to_string(),
                "backend" => "postgres"
            )
            .increment(1);
        }

        final_result
    }

    /// Runs database migrations to create required tables.
    ///
    /// Every statement is idempotent, so this is safe to call at each startup.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> StorageResult<()> {
        debug!("Running database migrations");

        let statements = [
            (
                "users table",
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id VARCHAR(64) PRIMARY KEY,
                    username VARCHAR(64) NOT NULL,
                    email VARCHAR(320) NOT NULL,
                    password_hash TEXT NOT NULL,
                    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "username index",
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_username ON users (username)",
            ),
            (
                "email index",
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users (email)",
            ),
            (
                "flashcard_sets table",
                r#"
                CREATE TABLE IF NOT EXISTS flashcard_sets (
                    id VARCHAR(64) PRIMARY KEY,
                    owner_id VARCHAR(64) NOT NULL,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    is_public BOOLEAN NOT NULL DEFAULT FALSE,
                    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "set owner index",
                "CREATE INDEX IF NOT EXISTS idx_sets_owner ON flashcard_sets (owner_id, created_at DESC)",
            ),
            (
                "set visibility index",
                "CREATE INDEX IF NOT EXISTS idx_sets_public ON flashcard_sets (is_public, created_at DESC)",
            ),
            (
                "flashcards table",
                r#"
                CREATE TABLE IF NOT EXISTS flashcards (
                    id VARCHAR(64) PRIMARY KEY,
                    set_id VARCHAR(64) NOT NULL,
                    front TEXT NOT NULL,
                    back TEXT NOT NULL,
                    difficulty TEXT,
                    times_reviewed INTEGER NOT NULL DEFAULT 0,
                    last_reviewed TIMESTAMP WITH TIME ZONE,
                    created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "free-form card difficulty",
                "ALTER TABLE flashcards ALTER COLUMN difficulty TYPE TEXT",
            ),
            (
                "card set index",
                "CREATE INDEX IF NOT EXISTS idx_cards_set ON flashcards (set_id, created_at)",
            ),
        ];

        for (what, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| query_error(&format!("Failed to create {what}"), e))?;
        }

        debug!("Database migrations completed");
        Ok(())
    }

    async fn find_user_where(
        &self,
        operation: &str,
        column: &str,
        value: String,
    ) -> StorageResult<Option<StoredUser>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        let row = self
            .execute_with_timeout(operation, async {
                sqlx::query(&sql)
                    .bind(&value)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| query_error("Failed to find user", e))
            })
            .await?;
        Ok(row.as_ref().map(row_to_user))
    }
}

#[async_trait]
impl DataStore for PostgresDataStore {
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert_user(&self, mut user: StoredUser) -> StorageResult<StoredUser> {
        validate_id("users", &user.id)?;
        user.email = user.email.to_lowercase();

        self.execute_with_timeout("insert_user", async {
            sqlx::query(
                r#"
                INSERT INTO users (id, username, email, password_hash, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    match db_err.constraint() {
                        Some("users_pkey") => {
                            return StorageError::DuplicateId {
                                collection: "users",
                                id: user.id.clone(),
                            }
                        }
                        Some("idx_users_username") => {
                            return StorageError::DuplicateUser {
                                field: "username",
                                value: user.username.clone(),
                            }
                        }
                        Some("idx_users_email") => {
                            return StorageError::DuplicateUser {
                                field: "email",
                                value: user.email.clone(),
                            }
                        }
                        _ => {}
                    }
                }
                query_error("Failed to insert user", e)
            })
        })
        .await?;

        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, id: &str) -> StorageResult<StoredUser> {
        self.find_user_where("get_user", "id", id.to_string())
            .await?
            .ok_or_else(|| StorageError::UserNotFound {
                user_id: id.to_string(),
            })
    }

    async fn find_user_by_username(&self, username: &str) -> StorageResult<Option<StoredUser>> {
        self.find_user_where("find_user_by_username", "username", username.to_string())
            .await
    }

    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<StoredUser>> {
        self.find_user_where("find_user_by_email", "email", email.to_lowercase())
            .await
    }

    #[instrument(skip(self, set), fields(set_id = %set.id))]
    async fn insert_set(&self, set: StoredSet) -> StorageResult<StoredSet> {
        validate_set(&set)?;

        self.execute_with_timeout("insert_set", async {
            sqlx::query(
                r#"
                INSERT INTO flashcard_sets
                    (id, owner_id, title, description, is_public, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&set.id)
            .bind(&set.owner_id)
            .bind(&set.title)
            .bind(&set.description)
            .bind(set.is_public)
            .bind(set.created_at)
            .bind(set.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    if db_err.constraint() == Some("flashcard_sets_pkey") {
                        return StorageError::DuplicateId {
                            collection: "flashcard_sets",
                            id: set.id.clone(),
                        };
                    }
                }
                query_error("Failed to insert set", e)
            })
        })
        .await?;

        Ok(set)
    }

    #[instrument(skip(self))]
    async fn get_set(&self, id: &str) -> StorageResult<StoredSet> {
        let sql = format!("SELECT {SET_COLUMNS} FROM flashcard_sets WHERE id = $1");
        let row = self
            .execute_with_timeout("get_set", async {
                sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| query_error("Failed to get set", e))
            })
            .await?;

        row.as_ref()
            .map(row_to_set)
            .ok_or_else(|| StorageError::SetNotFound {
                set_id: id.to_string(),
            })
    }

    #[instrument(skip(self))]
    async fn find_sets(
        &self,
        filter: &SetFilter,
        limit: Option<usize>,
    ) -> StorageResult<Vec<StoredSet>> {
        let rows = self
            .execute_with_timeout("find_sets", async {
                let mut builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(format!(
                    "SELECT {SET_COLUMNS} FROM flashcard_sets WHERE 1 = 1"
                ));
                if let Some(ref owner_id) = filter.owner_id {
                    builder.push(" AND owner_id = ");
                    builder.push_bind(owner_id.clone());
                }
                if let Some(is_public) = filter.is_public {
                    builder.push(" AND is_public = ");
                    builder.push_bind(is_public);
                }
                if let Some(ref query) = filter.title_contains {
                    builder.push(" AND title ILIKE ");
                    builder.push_bind(format!("%{}%", escape_like(query)));
                    builder.push(" ESCAPE '\\'");
                }
                builder.push(" ORDER BY created_at DESC, id DESC");
                if let Some(limit) = limit {
                    builder.push(" LIMIT ");
                    builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
                }

                builder
                    .build()
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| query_error("Failed to find sets", e))
            })
            .await?;

        Ok(rows.iter().map(row_to_set).collect())
    }

    #[instrument(skip(self, set), fields(set_id = %set.id))]
    async fn update_set(&self, set: StoredSet) -> StorageResult<StoredSet> {
        validate_set(&set)?;

        let result = self
            .execute_with_timeout("update_set", async {
                sqlx::query(
                    r#"
                    UPDATE flashcard_sets
                    SET owner_id = $2, title = $3, description = $4, is_public = $5,
                        created_at = $6, updated_at = $7
                    WHERE id = $1
                    "#,
                )
                .bind(&set.id)
                .bind(&set.owner_id)
                .bind(&set.title)
                .bind(&set.description)
                .bind(set.is_public)
                .bind(set.created_at)
                .bind(set.updated_at)
                .execute(&self.pool)
                .await
                .map_err(|e| query_error("Failed to update set", e))
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::SetNotFound { set_id: set.id });
        }
        Ok(set)
    }

    #[instrument(skip(self))]
    async fn touch_set(&self, id: &str, at: DateTime<Utc>) -> StorageResult<StoredSet> {
        let sql = format!(
            "UPDATE flashcard_sets SET updated_at = GREATEST(updated_at, $2) \
             WHERE id = $1 RETURNING {SET_COLUMNS}"
        );
        let row = self
            .execute_with_timeout("touch_set", async {
                sqlx::query(&sql)
                    .bind(id)
                    .bind(at)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| query_error("Failed to touch set", e))
            })
            .await?;

        row.as_ref()
            .map(row_to_set)
            .ok_or_else(|| StorageError::SetNotFound {
                set_id: id.to_string(),
            })
    }

    #[instrument(skip(self))]
    async fn delete_set(&self, id: &str) -> StorageResult<()> {
        let result = self
            .execute_with_timeout("delete_set", async {
                sqlx::query("DELETE FROM flashcard_sets WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| query_error("Failed to delete set", e))
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::SetNotFound {
                set_id: id.to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self, card), fields(card_id = %card.id, set_id = %card.set_id))]
    async fn insert_card(&self, card: StoredCard) -> StorageResult<StoredCard> {
        validate_card(&card)?;

        self.execute_with_timeout("insert_card", async {
            sqlx::query(
                r#"
                INSERT INTO flashcards
                    (id, set_id, front, back, difficulty, times_reviewed, last_reviewed, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(&card.id)
            .bind(&card.set_id)
            .bind(&card.front)
            .bind(&card.back)
            .bind(&card.difficulty)
            .bind(reviewed_count(&card))
            .bind(card.last_reviewed)
            .bind(card.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e {
                    if db_err.constraint() == Some("flashcards_pkey") {
                        return StorageError::DuplicateId {
                            collection: "flashcards",
                            id: card.id.clone(),
                        };
                    }
                }
                query_error("Failed to insert card", e)
            })
        })
        .await?;

        Ok(card)
    }

    #[instrument(skip(self))]
    async fn get_card(&self, id: &str) -> StorageResult<StoredCard> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM flashcards WHERE id = $1");
        let row = self
            .execute_with_timeout("get_card", async {
                sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| query_error("Failed to get card", e))
            })
            .await?;

        row.as_ref()
            .map(row_to_card)
            .ok_or_else(|| StorageError::CardNotFound {
                card_id: id.to_string(),
            })
    }

    #[instrument(skip(self))]
    async fn find_cards_by_set(&self, set_id: &str) -> StorageResult<Vec<StoredCard>> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM flashcards WHERE set_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let rows = self
            .execute_with_timeout("find_cards_by_set", async {
                sqlx::query(&sql)
                    .bind(set_id)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| query_error("Failed to list cards", e))
            })
            .await?;

        Ok(rows.iter().map(row_to_card).collect())
    }

    async fn count_cards_by_set(&self, set_id: &str) -> StorageResult<u64> {
        let count: i64 = self
            .execute_with_timeout("count_cards_by_set", async {
                sqlx::query_scalar("SELECT COUNT(*) FROM flashcards WHERE set_id = $1")
                    .bind(set_id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| query_error("Failed to count cards", e))
            })
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    #[instrument(skip(self, card), fields(card_id = %card.id))]
    async fn update_card(&self, card: StoredCard) -> StorageResult<StoredCard> {
        validate_card(&card)?;

        let result = self
            .execute_with_timeout("update_card", async {
                sqlx::query(
                    r#"
                    UPDATE flashcards
                    SET set_id = $2, front = $3, back = $4, difficulty = $5,
                        times_reviewed = $6, last_reviewed = $7, created_at = $8
                    WHERE id = $1
                    "#,
                )
                .bind(&card.id)
                .bind(&card.set_id)
                .bind(&card.front)
                .bind(&card.back)
                .bind(&card.difficulty)
                .bind(reviewed_count(&card))
                .bind(card.last_reviewed)
                .bind(card.created_at)
                .execute(&self.pool)
                .await
                .map_err(|e| query_error("Failed to update card", e))
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::CardNotFound { card_id: card.id });
        }
        Ok(card)
    }

    #[instrument(skip(self))]
    async fn delete_card(&self, id: &str) -> StorageResult<()> {
        let result = self
            .execute_with_timeout("delete_card", async {
                sqlx::query("DELETE FROM flashcards WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| query_error("Failed to delete card", e))
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::CardNotFound {
                card_id: id.to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_cards_by_set(&self, set_id: &str) -> StorageResult<u64> {
        let result = self
            .execute_with_timeout("delete_cards_by_set", async {
                sqlx::query("DELETE FROM flashcards WHERE set_id = $1")
                    .bind(set_id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| query_error("Failed to delete cards", e))
            })
            .await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let start = Instant::now();

        let check_result = tokio::time::timeout(self.health_check_timeout, async {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::HealthCheckFailed {
                    message: format!("database ping failed: {e}"),
                })
        })
        .await;

        let latency = start.elapsed();

        let status = match &check_result {
            Ok(Ok(_)) => "success",
            Ok(Err(_)) => "error",
            Err(_) => "timeout",
        };
        metrics::histogram!(
            "flashdeck_storage_health_check_duration_seconds",
            "backend" => "postgres",
            "status" => status
        )
        .record(latency.as_secs_f64());

        match check_result {
            Ok(result) => {
                result?;
            }
            Err(_elapsed) => {
                return Err(StorageError::QueryTimeout {
                    operation: "health_check".to_string(),
                    timeout: self.health_check_timeout,
                });
            }
        }

        Ok(HealthStatus {
            healthy: true,
            latency,
            message: Some(format!(
                "postgresql, {} connections ({} idle)",
                self.pool.size(),
                self.pool.num_idle()
            )),
        })
    }
}
