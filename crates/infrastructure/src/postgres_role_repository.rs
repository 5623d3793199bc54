use std::collections::HashMap;

use async_trait::async_trait;
use brokerdesk_application::{EntityChange, ListQuery, Paged, RoleFilter, RoleRepository};
use brokerdesk_core::AppResult;
use brokerdesk_domain::{Permission, Provenance, Role, RowVersion};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::postgres_entity_change_repository::insert_changes;
use crate::postgres_support::{
    contains_pattern, count_to_total, ensure_written, parse_stored, push_order_by, push_page,
    read_error, search_term, write_error,
};

#[cfg(test)]
mod tests;

const SORT_COLUMNS: &[(&str, &str)] = &[("name", "lower(name)"), ("createdAt", "created_at")];

const ROLE_COLUMNS: &str = r#"
    SELECT
        id,
        name,
        description,
        is_system,
        row_version,
        created_at,
        created_by,
        updated_at,
        updated_by
    FROM roles
"#;

/// PostgreSQL-backed repository for roles and their permission grants.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_grants(&self, role_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<Permission>>> {
        let mut grants: HashMap<Uuid, Vec<Permission>> = HashMap::new();
        if role_ids.is_empty() {
            return Ok(grants);
        }

        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT role_id, permission_code
            FROM role_permissions
            WHERE role_id = ANY($1)
            "#,
        )
        .bind(role_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error("load role grants"))?;

        for row in rows {
            grants
                .entry(row.role_id)
                .or_default()
                .push(parse_stored(row.permission_code.as_str(), "permission")?);
        }
        for permissions in grants.values_mut() {
            permissions.sort_unstable();
        }

        Ok(grants)
    }

    async fn attach_grants(&self, rows: Vec<RoleRow>) -> AppResult<Vec<Role>> {
        let role_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut grants = self.load_grants(&role_ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let permissions = grants.remove(&row.id).unwrap_or_default();
                row.into_role(permissions)
            })
            .collect())
    }

    async fn attach_grant(&self, row: Option<RoleRow>) -> AppResult<Option<Role>> {
        let Some(row) = row else {
            return Ok(None);
        };

        Ok(self.attach_grants(vec![row]).await?.pop())
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    is_system: bool,
    row_version: i64,
    created_at: DateTime<Utc>,
    created_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<String>,
}

#[derive(Debug, FromRow)]
struct GrantRow {
    role_id: Uuid,
    permission_code: String,
}

impl RoleRow {
    fn into_role(self, permissions: Vec<Permission>) -> Role {
        Role {
            id: self.id,
            name: self.name,
            description: self.description,
            permissions,
            is_system: self.is_system,
            row_version: RowVersion::new(self.row_version),
            provenance: Provenance {
                created_at: self.created_at,
                created_by: self.created_by,
                updated_at: self.updated_at,
                updated_by: self.updated_by,
            },
        }
    }
}

fn push_filter<'args>(builder: &mut QueryBuilder<'args, Postgres>, filter: &'args RoleFilter) {
    builder.push(" WHERE true");
    if let Some(pattern) = search_term(filter.search.as_ref()).map(contains_pattern) {
        builder.push(" AND name ILIKE ").push_bind(pattern);
    }
}

fn duplicate_name(role: &Role) -> impl FnOnce() -> String + '_ {
    move || format!("role '{}' already exists", role.name)
}

async fn replace_grants(transaction: &mut Transaction<'_, Postgres>, role: &Role) -> AppResult<()> {
    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
        .bind(role.id)
        .execute(&mut **transaction)
        .await
        .map_err(read_error("clear role grants"))?;

    let codes: Vec<&str> = role
        .permissions
        .iter()
        .map(|permission| permission.as_str())
        .collect();
    sqlx::query(
        r#"
        INSERT INTO role_permissions (role_id, permission_code)
        SELECT $1, code
        FROM UNNEST($2::TEXT[]) AS code
        "#,
    )
    .bind(role.id)
    .bind(codes)
    .execute(&mut **transaction)
    .await
    .map_err(read_error("grant role permissions"))?;

    Ok(())
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn list_roles(&self, query: &ListQuery<RoleFilter>) -> AppResult<Paged<Role>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM roles");
        push_filter(&mut count, &query.filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(read_error("count roles"))?;

        let mut select = QueryBuilder::new(ROLE_COLUMNS);
        push_filter(&mut select, &query.filter);
        push_order_by(&mut select, query.sort, SORT_COLUMNS, "id");
        push_page(&mut select, query.page)?;
        let rows = select
            .build_query_as::<RoleRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("list roles"))?;

        let items = self.attach_grants(rows).await?;
        Ok(Paged::new(items, count_to_total(total), query.page))
    }

    async fn find_role(&self, role_id: Uuid) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(&format!("{ROLE_COLUMNS} WHERE id = $1"))
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("find role"))?;

        self.attach_grant(row).await
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        let row =
            sqlx::query_as::<_, RoleRow>(&format!("{ROLE_COLUMNS} WHERE lower(name) = lower($1)"))
                .bind(name.trim())
                .fetch_optional(&self.pool)
                .await
                .map_err(read_error("find role by name"))?;

        self.attach_grant(row).await
    }

    async fn insert_role(&self, role: &Role, changes: &[EntityChange]) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start role transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO roles (
                id,
                name,
                description,
                is_system,
                row_version,
                created_at,
                created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(role.id)
        .bind(role.name.as_str())
        .bind(role.description.as_deref())
        .bind(role.is_system)
        .bind(role.row_version.value())
        .bind(role.provenance.created_at)
        .bind(role.provenance.created_by.as_deref())
        .execute(&mut *transaction)
        .await
        .map_err(|error| write_error(error, "insert role", duplicate_name(role)))?;

        replace_grants(&mut transaction, role).await?;
        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit role insert"))
    }

    async fn update_role(
        &self,
        role: &Role,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start role transaction"))?;

        let result = sqlx::query(
            r#"
            UPDATE roles
            SET name = $3,
                description = $4,
                row_version = $5,
                updated_at = $6,
                updated_by = $7
            WHERE id = $1
                AND row_version = $2
                AND NOT is_system
            "#,
        )
        .bind(role.id)
        .bind(expected.value())
        .bind(role.name.as_str())
        .bind(role.description.as_deref())
        .bind(role.row_version.value())
        .bind(role.provenance.updated_at)
        .bind(role.provenance.updated_by.as_deref())
        .execute(&mut *transaction)
        .await
        .map_err(|error| write_error(error, "update role", duplicate_name(role)))?;
        ensure_written(result.rows_affected(), "Role", &role.id.to_string())?;

        replace_grants(&mut transaction, role).await?;
        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit role update"))
    }

    async fn delete_role(
        &self,
        role_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start role transaction"))?;

        let result = sqlx::query(
            "DELETE FROM roles WHERE id = $1 AND row_version = $2 AND NOT is_system",
        )
        .bind(role_id)
        .bind(expected.value())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            write_error(error, "delete role", || {
                format!("role '{role_id}' is still assigned to users")
            })
        })?;
        ensure_written(result.rows_affected(), "Role", &role_id.to_string())?;

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit role delete"))
    }

    async fn count_role_assignments(&self, role_id: Uuid) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM user_roles WHERE role_id = $1",
        )
        .bind(role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(read_error("count role assignments"))?;

        Ok(count_to_total(count))
    }
}
