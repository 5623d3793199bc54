use async_trait::async_trait;
use brokerdesk_application::AuthorizationRepository;
use brokerdesk_core::AppResult;
use brokerdesk_domain::Permission;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::postgres_support::{parse_stored, read_error};

/// PostgreSQL-backed repository for user permission lookups.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    permission_code: String,
}

#[async_trait]
impl AuthorizationRepository for PostgresAuthorizationRepository {
    async fn list_permissions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT DISTINCT grants.permission_code
            FROM user_roles
            INNER JOIN users
                ON users.id = user_roles.user_id
            INNER JOIN role_permissions AS grants
                ON grants.role_id = user_roles.role_id
            WHERE user_roles.user_id = $1
                AND users.is_active
            ORDER BY grants.permission_code
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error("load permissions"))?;

        rows.iter()
            .map(|row| parse_stored(row.permission_code.as_str(), "permission"))
            .collect()
    }
}
