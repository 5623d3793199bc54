//! PostgreSQL-backed user repository.

use std::collections::HashMap;

use async_trait::async_trait;
use brokerdesk_application::{
    EntityChange, ListQuery, Paged, UserCredentials, UserFilter, UserRepository,
};
use brokerdesk_core::{AppError, AppResult};
use brokerdesk_domain::{Provenance, RowVersion, User};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::postgres_support::{read_error, write_error};

mod account;
mod lookup;
#[cfg(test)]
mod tests;

const USER_COLUMNS: &str = r#"
    SELECT
        id,
        username,
        email,
        full_name,
        password_hash,
        is_active,
        row_version,
        created_at,
        created_by,
        updated_at,
        updated_by
    FROM users
"#;

type RoleAssignments = HashMap<Uuid, Vec<Uuid>>;

/// PostgreSQL implementation of the user repository port.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    full_name: String,
    password_hash: String,
    is_active: bool,
    row_version: i64,
    created_at: DateTime<Utc>,
    created_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<String>,
}

impl UserRow {
    fn into_credentials(self, role_ids: Vec<Uuid>) -> UserCredentials {
        UserCredentials {
            user: User {
                id: self.id,
                username: self.username,
                email: self.email,
                full_name: self.full_name,
                is_active: self.is_active,
                role_ids,
                row_version: RowVersion::new(self.row_version),
                provenance: Provenance {
                    created_at: self.created_at,
                    created_by: self.created_by,
                    updated_at: self.updated_at,
                    updated_by: self.updated_by,
                },
            },
            password_hash: self.password_hash,
        }
    }
}

/// Maps unique violations to a message naming the clashing column.
fn user_write_error(error: sqlx::Error, operation: &str, user: &User) -> AppError {
    let constraint = match &error {
        sqlx::Error::Database(database_error) => database_error.constraint().map(str::to_owned),
        _ => None,
    };

    write_error(error, operation, || match constraint.as_deref() {
        Some("users_email_key") => format!("email '{}' is already in use", user.email),
        _ => format!("username '{}' is already taken", user.username),
    })
}

async fn replace_role_assignments(
    transaction: &mut Transaction<'_, Postgres>,
    user: &User,
) -> AppResult<()> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(user.id)
        .execute(&mut **transaction)
        .await
        .map_err(read_error("clear user roles"))?;

    sqlx::query(
        r#"
        INSERT INTO user_roles (user_id, role_id)
        SELECT $1, role_id
        FROM UNNEST($2::UUID[]) AS role_id
        "#,
    )
    .bind(user.id)
    .bind(user.role_ids.as_slice())
    .execute(&mut **transaction)
    .await
    .map_err(|error| {
        write_error(error, "assign user roles", || {
            format!("user '{}' already holds one of the roles", user.username)
        })
    })?;

    Ok(())
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn list_users(&self, query: &ListQuery<UserFilter>) -> AppResult<Paged<User>> {
        self.list_users_impl(query).await
    }

    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        Ok(self
            .find_credentials_by_id(user_id)
            .await?
            .map(|credentials| credentials.user))
    }

    async fn find_credentials(&self, username: &str) -> AppResult<Option<UserCredentials>> {
        self.find_credentials_impl(username).await
    }

    async fn insert_user(
        &self,
        user: &User,
        password_hash: &str,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        self.insert_user_impl(user, password_hash, changes).await
    }

    async fn update_user(
        &self,
        user: &User,
        expected: RowVersion,
        password_hash: Option<&str>,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        self.update_user_impl(user, expected, password_hash, changes)
            .await
    }

    async fn delete_user(
        &self,
        user_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        self.delete_user_impl(user_id, expected, changes).await
    }
}
