//! Queries for the endpoint policy table.

use std::collections::BTreeSet;

use warden_core::Role;
use warden_core::db::DatabaseError;

use super::db::AuthDatabase;
use super::models::{EndpointPermission, PolicyRow};

fn encode_roles(roles: &BTreeSet<Role>) -> Result<String, DatabaseError> {
    serde_json::to_string(roles).map_err(|e| DatabaseError::Query(e.to_string()))
}

impl TryFrom<PolicyRow> for EndpointPermission {
    type Error = DatabaseError;

    fn try_from(row: PolicyRow) -> Result<Self, Self::Error> {
        let allowed_roles = serde_json::from_str(&row.allowed_roles).map_err(|e| {
            DatabaseError::Decode(format!("allowed_roles of {}: {e}", row.endpoint))
        })?;
        Ok(Self {
            endpoint: row.endpoint,
            allowed_roles,
        })
    }
}

impl AuthDatabase {
    /// Load every endpoint permission.
    pub async fn list_policies(&self) -> Result<Vec<EndpointPermission>, DatabaseError> {
        let rows = sqlx::query_as::<_, PolicyRow>("SELECT * FROM policies ORDER BY endpoint")
            .fetch_all(self.pool())
            .await?;

        rows.into_iter().map(EndpointPermission::try_from).collect()
    }

    /// Insert a new endpoint permission.
    ///
    /// Fails with `UniqueViolation` if the endpoint already has one.
    pub async fn insert_policy(
        &self,
        endpoint: &str,
        roles: &BTreeSet<Role>,
    ) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO policies (endpoint, allowed_roles) VALUES (?, ?)")
            .bind(endpoint)
            .bind(encode_roles(roles)?)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Replace the allowed roles of an existing endpoint.
    pub async fn update_policy(
        &self,
        endpoint: &str,
        roles: &BTreeSet<Role>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE policies SET allowed_roles = ? WHERE endpoint = ?")
            .bind(encode_roles(roles)?)
            .bind(endpoint)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Endpoint {endpoint}")));
        }
        Ok(())
    }

    /// Remove an endpoint permission.
    pub async fn delete_policy(&self, endpoint: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM policies WHERE endpoint = ?")
            .bind(endpoint)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Endpoint {endpoint}")));
        }
        Ok(())
    }
}
