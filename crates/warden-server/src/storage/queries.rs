//! Account and audit queries.
//!
//! Every function takes a bare connection so the account service can run
//! fetch, mutate and audit steps against the same open transaction
//! (`&mut *tx`). Pool-level helpers on [`AuthDatabase`] cover reads that are
//! not part of a transaction.

use sqlx::SqliteConnection;
use warden_core::db::{DatabaseError, unix_timestamp};

use super::db::AuthDatabase;
use super::models::{AuditLogEntry, NewUserParams, User, UserChanges};

/// Insert a new account with version 0.
pub async fn insert_user(
    conn: &mut SqliteConnection,
    params: &NewUserParams<'_>,
) -> Result<User, DatabaseError> {
    let now = unix_timestamp();

    sqlx::query(
        "INSERT INTO users (id, name, email, password, role, version, created_at) VALUES (?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(params.id)
    .bind(params.name)
    .bind(params.email)
    .bind(params.password_hash)
    .bind(params.role.as_str())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    get_user(conn, params.id).await
}

/// Get an account by ID.
pub async fn get_user(conn: &mut SqliteConnection, id: &str) -> Result<User, DatabaseError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
}

/// Get an account by its unique name.
pub async fn get_user_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<User, DatabaseError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE name = ?")
        .bind(name)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("User with name {name}")))
}

/// Apply a sparse update and return the updated row.
pub async fn update_user(
    conn: &mut SqliteConnection,
    id: &str,
    changes: &UserChanges<'_>,
) -> Result<User, DatabaseError> {
    let now = unix_timestamp();

    let result = sqlx::query(
        "UPDATE users SET \
            name = COALESCE(?, name), \
            email = COALESCE(?, email), \
            password = COALESCE(?, password), \
            role = COALESCE(?, role), \
            version = version + ?, \
            updated_at = ? \
         WHERE id = ?",
    )
    .bind(changes.name)
    .bind(changes.email)
    .bind(changes.password_hash)
    .bind(changes.role.map(warden_core::Role::as_str))
    .bind(i64::from(changes.bump_version))
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("User {id}")));
    }

    get_user(conn, id).await
}

/// Delete an account. Returns `NotFound` if no row was removed.
pub async fn delete_user(conn: &mut SqliteConnection, id: &str) -> Result<(), DatabaseError> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("User {id}")));
    }
    Ok(())
}

/// Append one line to the audit trail.
pub async fn append_audit_log(conn: &mut SqliteConnection, log: &str) -> Result<(), DatabaseError> {
    sqlx::query("INSERT INTO transaction_log (log, timestamp) VALUES (?, ?)")
        .bind(log)
        .bind(unix_timestamp())
        .execute(conn)
        .await?;
    Ok(())
}

impl AuthDatabase {
    /// Look up an account by name outside of any transaction.
    pub async fn get_user_by_name(&self, name: &str) -> Result<User, DatabaseError> {
        let mut conn = self.pool().acquire().await?;
        get_user_by_name(&mut conn, name).await
    }

    /// Look up an account by ID outside of any transaction.
    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        let mut conn = self.pool().acquire().await?;
        get_user(&mut conn, id).await
    }

    /// Most recent audit entries, newest first.
    pub async fn recent_audit_log(&self, limit: u32) -> Result<Vec<AuditLogEntry>, DatabaseError> {
        let entries = sqlx::query_as::<_, AuditLogEntry>(
            "SELECT * FROM transaction_log ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(entries)
    }
}
