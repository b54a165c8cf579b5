//! Endpoint access policy engine.
//!
//! Holds the endpoint -> allowed roles table in memory behind a read/write
//! lock. `check` takes the read lock only. Mutations authorize themselves
//! against their own management endpoint, write through to the store, and
//! only then take the write lock to update the cache, so the cache lock is
//! never held across store I/O. Writers serialize on a separate mutex that
//! spans both steps; readers never touch it.
//!
//! Absence of an entry is a denial. The management endpoints therefore have
//! to be present in the policy table before anyone can add an entry; the
//! initial migration seeds them for the `ADMIN` role.

use std::collections::{BTreeSet, HashMap};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use warden_core::Role;
use warden_core::db::DatabaseError;
use warden_proto::methods::{
    METHOD_ADD_ROLE_ENDPOINT, METHOD_DELETE_ROLE_ENDPOINT, METHOD_UPDATE_ROLE_ENDPOINT,
};

use crate::storage::{AuthDatabase, EndpointPermission};

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Endpoint not found: {0}")]
    EndpointNotFound(String),

    #[error("Role {role} may not call {endpoint}")]
    AccessDenied { endpoint: String, role: Role },

    #[error("Endpoint already has a policy: {0}")]
    EndpointExists(String),

    #[error("Invalid policy: {0}")]
    InvalidPermission(String),

    #[error("Policy storage error: {0}")]
    Storage(#[from] DatabaseError),
}

pub struct PolicyEngine {
    db: AuthDatabase,
    endpoints: RwLock<HashMap<String, BTreeSet<Role>>>,
    /// Held by writers from the store write until the cache reflects it.
    writes: Mutex<()>,
}

impl PolicyEngine {
    /// Create an engine and eagerly load the policy table.
    pub async fn load(db: AuthDatabase) -> Result<Self, PolicyError> {
        let engine = Self {
            db,
            endpoints: RwLock::new(HashMap::new()),
            writes: Mutex::new(()),
        };
        engine.reload().await?;
        Ok(engine)
    }

    /// Replace the cache with the current contents of the store.
    pub async fn reload(&self) -> Result<usize, PolicyError> {
        let _writer = self.writes.lock().await;
        let fresh: HashMap<_, _> = self
            .db
            .list_policies()
            .await?
            .into_iter()
            .map(|p| (p.endpoint, p.allowed_roles))
            .collect();
        let count = fresh.len();
        *self.endpoints.write().await = fresh;
        info!(endpoints = count, "Policy cache loaded");
        Ok(count)
    }

    /// Decide whether `role` may call `endpoint`.
    pub async fn check(&self, endpoint: &str, role: Role) -> Result<(), PolicyError> {
        let endpoints = self.endpoints.read().await;
        let Some(allowed) = endpoints.get(endpoint) else {
            debug!(endpoint, "No policy for endpoint");
            return Err(PolicyError::EndpointNotFound(endpoint.to_string()));
        };
        if !allowed.contains(&role) {
            debug!(endpoint, %role, "Role not permitted");
            return Err(PolicyError::AccessDenied {
                endpoint: endpoint.to_string(),
                role,
            });
        }
        Ok(())
    }

    /// Add a policy for an endpoint that has none yet.
    pub async fn add_endpoint(
        &self,
        caller: Role,
        endpoint: &str,
        roles: BTreeSet<Role>,
    ) -> Result<(), PolicyError> {
        self.check(METHOD_ADD_ROLE_ENDPOINT, caller).await?;
        validate(endpoint, &roles)?;

        let _writer = self.writes.lock().await;
        self.db
            .insert_policy(endpoint, &roles)
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation { .. } => {
                    PolicyError::EndpointExists(endpoint.to_string())
                }
                other => other.into(),
            })?;

        self.endpoints
            .write()
            .await
            .insert(endpoint.to_string(), roles);
        info!(endpoint, "Endpoint policy added");
        Ok(())
    }

    /// Replace the allowed roles of an existing endpoint.
    pub async fn update_endpoint(
        &self,
        caller: Role,
        endpoint: &str,
        roles: BTreeSet<Role>,
    ) -> Result<(), PolicyError> {
        self.check(METHOD_UPDATE_ROLE_ENDPOINT, caller).await?;
        validate(endpoint, &roles)?;

        let _writer = self.writes.lock().await;
        self.db
            .update_policy(endpoint, &roles)
            .await
            .map_err(|e| not_found_or(endpoint, e))?;

        self.endpoints
            .write()
            .await
            .insert(endpoint.to_string(), roles);
        info!(endpoint, "Endpoint policy updated");
        Ok(())
    }

    /// Remove an endpoint's policy, making it unreachable.
    pub async fn delete_endpoint(&self, caller: Role, endpoint: &str) -> Result<(), PolicyError> {
        self.check(METHOD_DELETE_ROLE_ENDPOINT, caller).await?;

        let _writer = self.writes.lock().await;
        self.db
            .delete_policy(endpoint)
            .await
            .map_err(|e| not_found_or(endpoint, e))?;

        if self.endpoints.write().await.remove(endpoint).is_none() {
            warn!(endpoint, "Deleted endpoint was missing from the policy cache");
        }
        info!(endpoint, "Endpoint policy deleted");
        Ok(())
    }

    /// Snapshot of the cached policy table, sorted by endpoint.
    pub async fn endpoints(&self) -> Vec<EndpointPermission> {
        let mut list: Vec<_> = self
            .endpoints
            .read()
            .await
            .iter()
            .map(|(endpoint, roles)| EndpointPermission {
                endpoint: endpoint.clone(),
                allowed_roles: roles.clone(),
            })
            .collect();
        list.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        list
    }
}

fn validate(endpoint: &str, roles: &BTreeSet<Role>) -> Result<(), PolicyError> {
    if endpoint.trim().is_empty() {
        return Err(PolicyError::InvalidPermission("endpoint is empty".into()));
    }
    if roles.is_empty() {
        return Err(PolicyError::InvalidPermission(format!(
            "{endpoint} must allow at least one role"
        )));
    }
    Ok(())
}

fn not_found_or(endpoint: &str, e: DatabaseError) -> PolicyError {
    match e {
        DatabaseError::NotFound(_) => PolicyError::EndpointNotFound(endpoint.to_string()),
        other => other.into(),
    }
}
