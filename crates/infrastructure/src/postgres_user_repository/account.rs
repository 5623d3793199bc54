use super::*;

use crate::postgres_entity_change_repository::insert_changes;
use crate::postgres_support::ensure_written;

impl PostgresUserRepository {
    pub(super) async fn insert_user_impl(
        &self,
        user: &User,
        password_hash: &str,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start user transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id,
                username,
                email,
                full_name,
                password_hash,
                is_active,
                row_version,
                created_at,
                created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.full_name.as_str())
        .bind(password_hash)
        .bind(user.is_active)
        .bind(user.row_version.value())
        .bind(user.provenance.created_at)
        .bind(user.provenance.created_by.as_deref())
        .execute(&mut *transaction)
        .await
        .map_err(|error| user_write_error(error, "insert user", user))?;

        replace_role_assignments(&mut transaction, user).await?;
        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit user insert"))
    }

    pub(super) async fn update_user_impl(
        &self,
        user: &User,
        expected: RowVersion,
        password_hash: Option<&str>,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start user transaction"))?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $3,
                email = $4,
                full_name = $5,
                is_active = $6,
                row_version = $7,
                updated_at = $8,
                updated_by = $9,
                password_hash = COALESCE($10, password_hash)
            WHERE id = $1
                AND row_version = $2
            "#,
        )
        .bind(user.id)
        .bind(expected.value())
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.full_name.as_str())
        .bind(user.is_active)
        .bind(user.row_version.value())
        .bind(user.provenance.updated_at)
        .bind(user.provenance.updated_by.as_deref())
        .bind(password_hash)
        .execute(&mut *transaction)
        .await
        .map_err(|error| user_write_error(error, "update user", user))?;
        ensure_written(result.rows_affected(), "User", &user.id.to_string())?;

        replace_role_assignments(&mut transaction, user).await?;

        if !user.is_active {
            sqlx::query(
                r#"
                UPDATE auth_tokens
                SET revoked_at = now()
                WHERE user_id = $1
                  AND revoked_at IS NULL
                "#,
            )
            .bind(user.id)
            .execute(&mut *transaction)
            .await
            .map_err(read_error("revoke tokens of deactivated user"))?;
        }

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit user update"))
    }

    pub(super) async fn delete_user_impl(
        &self,
        user_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start user transaction"))?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1 AND row_version = $2")
            .bind(user_id)
            .bind(expected.value())
            .execute(&mut *transaction)
            .await
            .map_err(read_error("delete user"))?;
        ensure_written(result.rows_affected(), "User", &user_id.to_string())?;

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit user delete"))
    }
}
