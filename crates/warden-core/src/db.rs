//! Shared database types and utilities.
//!
//! Provides `DatabaseError`, `unix_timestamp()`, [`PoolConfig`] and the
//! `define_database!` macro used by the server storage layer.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info};

/// Storage errors.
///
/// Constraint violations are surfaced as a typed variant so callers can
/// match on the offending column instead of inspecting driver messages.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated on column {column}")]
    UniqueViolation { column: String },

    #[error("Corrupt row: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("row".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                let column = db
                    .constraint()
                    .map(str::to_string)
                    .or_else(|| unique_column_from_message(db.message()))
                    .unwrap_or_default();
                Self::UniqueViolation { column }
            }
            sqlx::Error::ColumnDecode { index, source } => {
                Self::Decode(format!("column {index}: {source}"))
            }
            other => Self::Query(other.to_string()),
        }
    }
}

/// Extract the column name from a `SQLite` unique-constraint message such as
/// `UNIQUE constraint failed: users.email`.
///
/// For composite constraints only the first column is reported.
fn unique_column_from_message(message: &str) -> Option<String> {
    let (_, columns) = message.split_once("failed:")?;
    let first = columns.split(',').next()?.trim();
    let column = first.rsplit('.').next()?.trim();
    (!column.is_empty()).then(|| column.to_string())
}

/// Where a pool points and how it is tuned.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    target: PoolTarget,
    max_connections: u32,
    busy_timeout: Duration,
}

#[derive(Debug, Clone)]
enum PoolTarget {
    File(PathBuf),
    Memory,
}

impl PoolConfig {
    /// A file-backed database, created on first open (WAL, foreign keys).
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: PoolTarget::File(path.into()),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// A private in-memory database.
    ///
    /// Every `SQLite` connection to `:memory:` is its own database, so the
    /// pool is pinned to one connection.
    pub const fn memory() -> Self {
        Self {
            target: PoolTarget::Memory,
            max_connections: 1,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Ignored for in-memory databases.
    #[must_use]
    pub fn max_connections(mut self, max: u32) -> Self {
        if matches!(self.target, PoolTarget::File(_)) {
            self.max_connections = max;
        }
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions, DatabaseError> {
        let options = match &self.target {
            PoolTarget::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| DatabaseError::Io(e.to_string()))?;
                }
                SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .journal_mode(SqliteJournalMode::Wal)
            }
            PoolTarget::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DatabaseError::Connection(e.to_string()))?,
        };
        Ok(options
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }

    /// Open the pool.
    pub async fn connect(&self) -> Result<Pool<Sqlite>, DatabaseError> {
        let mut pool_options = SqlitePoolOptions::new().max_connections(self.max_connections);
        if matches!(self.target, PoolTarget::Memory) {
            // A reaped connection would take the whole database with it.
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(self.connect_options()?)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        match &self.target {
            PoolTarget::File(path) => info!(path = %path.display(), "Database opened"),
            PoolTarget::Memory => debug!("In-memory database opened"),
        }
        Ok(pool)
    }
}

/// Returns the current time as a Unix timestamp (seconds since epoch).
#[allow(clippy::cast_possible_wrap)]
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Declare a database handle over a `SQLite` pool whose schema is the
/// invoking crate's `./migrations` directory.
///
/// ```ignore
/// warden_core::define_database!(AuthDatabase, "Auth database migrations complete");
///
/// let db = AuthDatabase::open(Path::new("/var/lib/warden/warden.db")).await?;
/// let mut tx = db.begin().await?;
/// ```
///
/// Besides `open` and `open_in_memory`, the handle exposes `connect` for a
/// custom [`PoolConfig`](crate::db::PoolConfig), `pool`, and `begin`. A
/// transaction returned by `begin` rolls back when dropped uncommitted.
#[macro_export]
macro_rules! define_database {
    ($name:ident, $migration_msg:expr) => {
        #[derive(Clone)]
        pub struct $name {
            pool: ::sqlx::Pool<::sqlx::Sqlite>,
        }

        impl $name {
            /// Open or create a database file and apply pending migrations.
            pub async fn open(
                path: &::std::path::Path,
            ) -> ::std::result::Result<Self, $crate::db::DatabaseError> {
                Self::connect(&$crate::db::PoolConfig::file(path)).await
            }

            /// Open a fresh in-memory database (tests and throwaway runs).
            pub async fn open_in_memory() -> ::std::result::Result<Self, $crate::db::DatabaseError>
            {
                Self::connect(&$crate::db::PoolConfig::memory()).await
            }

            pub async fn connect(
                config: &$crate::db::PoolConfig,
            ) -> ::std::result::Result<Self, $crate::db::DatabaseError> {
                let db = Self {
                    pool: config.connect().await?,
                };
                ::sqlx::migrate!("./migrations")
                    .run(&db.pool)
                    .await
                    .map_err(|e| $crate::db::DatabaseError::Migration(e.to_string()))?;
                ::tracing::info!($migration_msg);
                Ok(db)
            }

            pub const fn pool(&self) -> &::sqlx::Pool<::sqlx::Sqlite> {
                &self.pool
            }

            pub async fn begin(
                &self,
            ) -> ::std::result::Result<
                ::sqlx::Transaction<'static, ::sqlx::Sqlite>,
                $crate::db::DatabaseError,
            > {
                Ok(self.pool.begin().await?)
            }
        }
    };
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unix_timestamp_is_reasonable() {
        let ts = unix_timestamp();
        // Should be after 2024-01-01
        assert!(ts > 1_704_067_200);
    }

    #[test]
    fn sqlite_unique_message_yields_column() {
        assert_eq!(
            unique_column_from_message("UNIQUE constraint failed: users.email").as_deref(),
            Some("email")
        );
        assert_eq!(
            unique_column_from_message("UNIQUE constraint failed: users.name, users.email")
                .as_deref(),
            Some("name")
        );
        assert_eq!(unique_column_from_message("disk I/O error"), None);
    }

    #[tokio::test]
    async fn unique_violation_is_typed() {
        let pool = PoolConfig::memory().connect().await.unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (name) VALUES ('a')")
            .execute(&pool)
            .await
            .unwrap();

        let err: DatabaseError = sqlx::query("INSERT INTO t (name) VALUES ('a')")
            .execute(&pool)
            .await
            .unwrap_err()
            .into();

        match err {
            DatabaseError::UniqueViolation { column } => assert_eq!(column, "name"),
            other => panic!("expected unique violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn file_pool_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("warden.db");

        let pool = PoolConfig::file(&path).connect().await.unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn file_pool_enforces_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let pool = PoolConfig::file(dir.path().join("fk.db"))
            .max_connections(2)
            .connect()
            .await
            .unwrap();

        sqlx::query("CREATE TABLE parent (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE child (parent_id INTEGER NOT NULL REFERENCES parent(id))")
            .execute(&pool)
            .await
            .unwrap();

        let result = sqlx::query("INSERT INTO child (parent_id) VALUES (42)")
            .execute(&pool)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn busy_timeout_bounds_a_blocked_write() {
        let dir = tempfile::tempdir().unwrap();
        let pool = PoolConfig::file(dir.path().join("busy.db"))
            .max_connections(2)
            .busy_timeout(Duration::from_millis(100))
            .connect()
            .await
            .unwrap();
        sqlx::query("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .execute(&pool)
            .await
            .unwrap();

        let mut holder = pool.acquire().await.unwrap();
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *holder)
            .await
            .unwrap();

        let started = std::time::Instant::now();
        let blocked = sqlx::query("INSERT INTO t (id) VALUES (1)")
            .execute(&pool)
            .await;
        assert!(blocked.is_err());
        assert!(started.elapsed() < Duration::from_secs(3));

        sqlx::query("ROLLBACK").execute(&mut *holder).await.unwrap();
    }

    #[test]
    fn memory_pool_stays_single_connection() {
        let config = PoolConfig::memory().max_connections(8);
        assert_eq!(config.max_connections, 1);
    }
}
