//! PostgreSQL-backed bearer token repository.

use async_trait::async_trait;
use brokerdesk_application::{AuthTokenRecord, AuthTokenRepository, TokenKind};
use brokerdesk_core::AppResult;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::postgres_support::{read_error, write_error};

/// PostgreSQL implementation of the auth token repository port.
#[derive(Clone)]
pub struct PostgresAuthTokenRepository {
    pool: PgPool,
}

impl PostgresAuthTokenRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TokenRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
}

#[async_trait]
impl AuthTokenRepository for PostgresAuthTokenRepository {
    async fn insert_token(&self, record: &AuthTokenRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_tokens (id, user_id, kind, token_hash, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.kind.as_str())
        .bind(record.token_hash.as_str())
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            write_error(error, "store auth token", || {
                "auth token collision; retry the request".to_owned()
            })
        })?;

        Ok(())
    }

    async fn find_active_token(
        &self,
        token_hash: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> AppResult<Option<AuthTokenRecord>> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT id, user_id, token_hash, expires_at
            FROM auth_tokens
            WHERE token_hash = $1
              AND kind = $2
              AND revoked_at IS NULL
              AND expires_at > $3
            "#,
        )
        .bind(token_hash)
        .bind(kind.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_error("find auth token"))?;

        Ok(row.map(|row| AuthTokenRecord {
            id: row.id,
            user_id: row.user_id,
            kind,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
        }))
    }

    async fn revoke_token(&self, token_id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE auth_tokens
            SET revoked_at = $2
            WHERE id = $1
              AND revoked_at IS NULL
            "#,
        )
        .bind(token_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(read_error("revoke auth token"))?;

        Ok(result.rows_affected() == 1)
    }
}
