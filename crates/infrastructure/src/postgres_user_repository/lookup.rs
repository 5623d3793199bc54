use super::*;

use sqlx::QueryBuilder;

use crate::postgres_support::{
    contains_pattern, count_to_total, push_order_by, push_page, search_term,
};

const SORT_COLUMNS: &[(&str, &str)] = &[
    ("username", "username"),
    ("fullName", "lower(full_name)"),
    ("email", "lower(email)"),
    ("createdAt", "created_at"),
];

#[derive(Debug, FromRow)]
struct AssignmentRow {
    user_id: Uuid,
    role_id: Uuid,
}

fn push_filter<'args>(builder: &mut QueryBuilder<'args, Postgres>, filter: &'args UserFilter) {
    builder.push(" WHERE true");
    if let Some(pattern) = search_term(filter.search.as_ref()).map(contains_pattern) {
        builder.push(" AND (username ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR full_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR email ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if let Some(is_active) = filter.is_active {
        builder.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(role_id) = filter.role_id {
        builder
            .push(" AND id IN (SELECT user_id FROM user_roles WHERE role_id = ")
            .push_bind(role_id)
            .push(")");
    }
}

impl PostgresUserRepository {
    async fn load_role_ids(&self, user_ids: &[Uuid]) -> AppResult<RoleAssignments> {
        let mut assignments = RoleAssignments::new();
        if user_ids.is_empty() {
            return Ok(assignments);
        }

        let rows = sqlx::query_as::<_, AssignmentRow>(
            "SELECT user_id, role_id FROM user_roles WHERE user_id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error("load user roles"))?;

        for row in rows {
            assignments.entry(row.user_id).or_default().push(row.role_id);
        }
        for role_ids in assignments.values_mut() {
            role_ids.sort_unstable();
        }

        Ok(assignments)
    }

    async fn with_role_ids(&self, row: Option<UserRow>) -> AppResult<Option<UserCredentials>> {
        let Some(row) = row else {
            return Ok(None);
        };

        let mut assignments = self.load_role_ids(&[row.id]).await?;
        let role_ids = assignments.remove(&row.id).unwrap_or_default();
        Ok(Some(row.into_credentials(role_ids)))
    }

    pub(super) async fn list_users_impl(
        &self,
        query: &ListQuery<UserFilter>,
    ) -> AppResult<Paged<User>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_filter(&mut count, &query.filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(read_error("count users"))?;

        let mut select = QueryBuilder::new(USER_COLUMNS);
        push_filter(&mut select, &query.filter);
        push_order_by(&mut select, query.sort, SORT_COLUMNS, "id");
        push_page(&mut select, query.page)?;
        let rows = select
            .build_query_as::<UserRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("list users"))?;

        let user_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut assignments = self.load_role_ids(&user_ids).await?;
        let items = rows
            .into_iter()
            .map(|row| {
                let role_ids = assignments.remove(&row.id).unwrap_or_default();
                row.into_credentials(role_ids).user
            })
            .collect();

        Ok(Paged::new(items, count_to_total(total), query.page))
    }

    pub(super) async fn find_credentials_by_id(
        &self,
        user_id: Uuid,
    ) -> AppResult<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{USER_COLUMNS} WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("find user"))?;

        self.with_role_ids(row).await
    }

    pub(super) async fn find_credentials_impl(
        &self,
        username: &str,
    ) -> AppResult<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{USER_COLUMNS} WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("find user by username"))?;

        self.with_role_ids(row).await
    }
}
