//! Audited account CRUD.
//!
//! Each operation validates its input, then runs fetch, mutate and audit in
//! one transaction and commits only if all of them succeeded. Token version
//! bumps are pushed to the revocation store after the commit.

use tracing::{error, info, instrument};
use uuid::Uuid;
use warden_core::Role;
use warden_core::db::DatabaseError;

use super::{AccountError, AccountService, AccountUpdate, NewAccount, require, write_error};
use crate::auth::hash_password;
use crate::gate::Principal;
use crate::storage::{NewUserParams, User, UserChanges, queries};

impl AccountService {
    #[instrument(skip(self, account), fields(actor = %actor.username, name = %account.name))]
    pub async fn create_user(
        &self,
        actor: &Principal,
        account: NewAccount,
    ) -> Result<User, AccountError> {
        if account.password != account.password_confirm {
            return Err(AccountError::PasswordsMismatch);
        }
        let name = require(&account.name, "name")?;
        let email = require(&account.email, "email")?;
        require(&account.password, "password")?;

        let password_hash = hash_password(&account.password)
            .map_err(|e| AccountError::UserCreate(e.to_string()))?;
        let id = Uuid::new_v4().to_string();

        let create = |e| write_error(e, AccountError::UserCreate);
        let mut tx = self.db.begin().await.map_err(create)?;
        let user = queries::insert_user(
            &mut tx,
            &NewUserParams {
                id: &id,
                name,
                email,
                password_hash: &password_hash,
                role: account.role,
            },
        )
        .await
        .map_err(create)?;
        queries::append_audit_log(
            &mut tx,
            &format!(
                "{} created user {} ({}) with role {}",
                actor.username, user.id, user.name, user.role
            ),
        )
        .await
        .map_err(create)?;
        tx.commit().await.map_err(|e| create(e.into()))?;

        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Read an account. Non-admins may only read their own.
    #[instrument(skip(self), fields(actor = %actor.username))]
    pub async fn get_user(&self, actor: &Principal, id: &str) -> Result<User, AccountError> {
        let id = require(id, "id")?;
        if !actor.is_admin() && actor.user_id != id {
            return Err(AccountError::PermissionDenied);
        }

        let mut tx = self.db.begin().await.map_err(read_error)?;
        let user = queries::get_user(&mut tx, id).await.map_err(read_error)?;
        queries::append_audit_log(&mut tx, &format!("{} read user {id}", actor.username))
            .await
            .map_err(read_error)?;
        tx.commit().await.map_err(|e| read_error(e.into()))?;

        Ok(user)
    }

    /// Apply a sparse update. Changing the role or password bumps the
    /// token version, invalidating the account's access tokens.
    #[instrument(skip(self, update), fields(actor = %actor.username))]
    pub async fn update_user(
        &self,
        actor: &Principal,
        id: &str,
        update: AccountUpdate,
    ) -> Result<User, AccountError> {
        let id = require(id, "id")?;
        let name = update.name.as_deref().map(|n| require(n, "name")).transpose()?;
        let email = update
            .email
            .as_deref()
            .map(|e| require(e, "email"))
            .transpose()?;
        let password_hash = match update.password.as_deref() {
            Some(password) => {
                require(password, "password")?;
                Some(
                    hash_password(password)
                        .map_err(|e| AccountError::UserUpdate(e.to_string()))?,
                )
            }
            None => None,
        };

        let write = |e| write_error(e, AccountError::UserUpdate);
        let mut tx = self.db.begin().await.map_err(write)?;
        let current = queries::get_user(&mut tx, id).await.map_err(write)?;

        let role_changed = update.role.is_some_and(|role| role != current.role);
        let changes = UserChanges {
            name,
            email,
            password_hash: password_hash.as_deref(),
            role: update.role,
            bump_version: role_changed || password_hash.is_some(),
        };
        let user = queries::update_user(&mut tx, id, &changes)
            .await
            .map_err(write)?;
        queries::append_audit_log(&mut tx, &describe_update(actor, &current, &user))
            .await
            .map_err(write)?;
        tx.commit().await.map_err(|e| write(e.into()))?;

        info!(user_id = %id, version = user.version, "User updated");
        if user.version != current.version {
            self.sync_version(id, user.version).await?;
        }
        Ok(user)
    }

    /// Delete an account and invalidate its outstanding access tokens.
    #[instrument(skip(self), fields(actor = %actor.username))]
    pub async fn delete_user(&self, actor: &Principal, id: &str) -> Result<(), AccountError> {
        let id = require(id, "id")?;

        let delete = |e| write_error(e, AccountError::UserDelete);
        let mut tx = self.db.begin().await.map_err(delete)?;
        let user = queries::get_user(&mut tx, id).await.map_err(delete)?;
        queries::delete_user(&mut tx, id).await.map_err(delete)?;
        queries::append_audit_log(
            &mut tx,
            &format!("{} deleted user {id} ({})", actor.username, user.name),
        )
        .await
        .map_err(delete)?;
        tx.commit().await.map_err(|e| delete(e.into()))?;

        info!(user_id = %id, "User deleted");
        self.sync_version(id, user.version + 1).await
    }

    /// Force every session of an account to re-authenticate.
    ///
    /// Bumps the token version; refresh tokens keep working and mint access
    /// tokens carrying the new version.
    #[instrument(skip(self), fields(actor = %actor.username))]
    pub async fn revoke_sessions(&self, actor: &Principal, id: &str) -> Result<i64, AccountError> {
        let id = require(id, "id")?;

        let write = |e| write_error(e, AccountError::UserUpdate);
        let mut tx = self.db.begin().await.map_err(write)?;
        let user = queries::update_user(
            &mut tx,
            id,
            &UserChanges {
                bump_version: true,
                ..UserChanges::default()
            },
        )
        .await
        .map_err(write)?;
        queries::append_audit_log(
            &mut tx,
            &format!(
                "{} revoked sessions of user {id} (version {})",
                actor.username, user.version
            ),
        )
        .await
        .map_err(write)?;
        tx.commit().await.map_err(|e| write(e.into()))?;

        info!(user_id = %id, version = user.version, "Sessions revoked");
        self.sync_version(id, user.version).await?;
        Ok(user.version)
    }

    /// Create the bootstrap administrator unless an account of that name
    /// already exists. Returns whether an account was created.
    pub async fn ensure_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<bool, AccountError> {
        match self.db.get_user_by_name(name).await {
            Ok(_) => return Ok(false),
            Err(DatabaseError::NotFound(_)) => {}
            Err(e) => return Err(read_error(e)),
        }

        let system = Principal {
            user_id: String::new(),
            username: "system".into(),
            role: Role::Admin,
        };
        self.create_user(
            &system,
            NewAccount {
                name: name.into(),
                email: email.into(),
                password: password.into(),
                password_confirm: password.into(),
                role: Role::Admin,
            },
        )
        .await?;
        Ok(true)
    }

    async fn sync_version(&self, user_id: &str, version: i64) -> Result<(), AccountError> {
        self.revocations
            .set_version(user_id, version)
            .await
            .map_err(|e| {
                error!(user_id, version, error = %e, "Token version not synced");
                AccountError::VersionSync(e.to_string())
            })
    }
}

fn read_error(e: DatabaseError) -> AccountError {
    match e {
        DatabaseError::NotFound(what) => AccountError::UserNotFound(what),
        other => AccountError::UserRead(other.to_string()),
    }
}

fn describe_update(actor: &Principal, before: &User, after: &User) -> String {
    let mut changed = Vec::new();
    if before.name != after.name {
        changed.push("name");
    }
    if before.email != after.email {
        changed.push("email");
    }
    if before.password != after.password {
        changed.push("password");
    }
    if before.role != after.role {
        changed.push("role");
    }
    let fields = if changed.is_empty() {
        "nothing".to_string()
    } else {
        changed.join(", ")
    };
    format!("{} updated user {} ({fields})", actor.username, after.id)
}
