use std::collections::HashMap;

use async_trait::async_trait;
use brokerdesk_application::{ClientFilter, ClientRepository, EntityChange, ListQuery, Paged};
use brokerdesk_core::AppResult;
use brokerdesk_domain::{Client, Provenance, RowVersion};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::postgres_entity_change_repository::insert_changes;
use crate::postgres_support::{
    contains_pattern, count_to_total, ensure_written, parse_stored, push_order_by, push_page,
    read_error, search_term, write_error,
};

mod nested;

use nested::{ClientNested, load_nested, replace_nested};

const SORT_COLUMNS: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("lastName", "lower(COALESCE(last_name, ''))"),
    ("companyName", "lower(COALESCE(company_name, ''))"),
    ("email", "lower(email)"),
    ("status", "status"),
];

const CLIENT_COLUMNS: &str = r#"
    SELECT
        id,
        client_type,
        first_name,
        last_name,
        company_name,
        email,
        phone,
        status,
        residence_country,
        row_version,
        created_at,
        created_by,
        updated_at,
        updated_by
    FROM clients
"#;

/// PostgreSQL-backed repository for clients, their addresses and investment profile.
#[derive(Clone)]
pub struct PostgresClientRepository {
    pool: PgPool,
}

impl PostgresClientRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ClientRow {
    id: Uuid,
    client_type: String,
    first_name: Option<String>,
    last_name: Option<String>,
    company_name: Option<String>,
    email: String,
    phone: Option<String>,
    status: String,
    residence_country: String,
    row_version: i64,
    created_at: DateTime<Utc>,
    created_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<String>,
}

impl ClientRow {
    fn into_client(self, nested: ClientNested) -> AppResult<Client> {
        Ok(Client {
            id: self.id,
            client_type: parse_stored(self.client_type.as_str(), "client type")?,
            first_name: self.first_name,
            last_name: self.last_name,
            company_name: self.company_name,
            email: self.email,
            phone: self.phone,
            status: parse_stored(self.status.as_str(), "client status")?,
            residence_country: self.residence_country,
            addresses: nested.addresses,
            investment_profile: nested.investment_profile,
            row_version: RowVersion::new(self.row_version),
            provenance: Provenance {
                created_at: self.created_at,
                created_by: self.created_by,
                updated_at: self.updated_at,
                updated_by: self.updated_by,
            },
        })
    }
}

fn push_filter<'args>(builder: &mut QueryBuilder<'args, Postgres>, filter: &'args ClientFilter) {
    builder.push(" WHERE true");
    if let Some(pattern) = search_term(filter.search.as_ref()).map(contains_pattern) {
        builder.push(" AND (first_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR last_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR company_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR email ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(client_type) = filter.client_type {
        builder.push(" AND client_type = ").push_bind(client_type.as_str());
    }
}

fn duplicate_client(client: &Client) -> impl FnOnce() -> String + '_ {
    move || format!("client '{}' already exists", client.id)
}

#[async_trait]
impl ClientRepository for PostgresClientRepository {
    async fn list_clients(&self, query: &ListQuery<ClientFilter>) -> AppResult<Paged<Client>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM clients");
        push_filter(&mut count, &query.filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(read_error("count clients"))?;

        let mut select = QueryBuilder::new(CLIENT_COLUMNS);
        push_filter(&mut select, &query.filter);
        push_order_by(&mut select, query.sort, SORT_COLUMNS, "id");
        push_page(&mut select, query.page)?;
        let rows = select
            .build_query_as::<ClientRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("list clients"))?;

        let client_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut nested = load_nested(&self.pool, &client_ids).await?;
        let items = rows
            .into_iter()
            .map(|row| {
                let client_nested = nested.remove(&row.id).unwrap_or_default();
                row.into_client(client_nested)
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Paged::new(items, count_to_total(total), query.page))
    }

    async fn find_client(&self, client_id: Uuid) -> AppResult<Option<Client>> {
        let row = sqlx::query_as::<_, ClientRow>(&format!("{CLIENT_COLUMNS} WHERE id = $1"))
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("find client"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut nested: HashMap<Uuid, ClientNested> = load_nested(&self.pool, &[client_id]).await?;
        row.into_client(nested.remove(&client_id).unwrap_or_default())
            .map(Some)
    }

    async fn insert_client(&self, client: &Client, changes: &[EntityChange]) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start client transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO clients (
                id,
                client_type,
                first_name,
                last_name,
                company_name,
                email,
                phone,
                status,
                residence_country,
                row_version,
                created_at,
                created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(client.id)
        .bind(client.client_type.as_str())
        .bind(client.first_name.as_deref())
        .bind(client.last_name.as_deref())
        .bind(client.company_name.as_deref())
        .bind(client.email.as_str())
        .bind(client.phone.as_deref())
        .bind(client.status.as_str())
        .bind(client.residence_country.as_str())
        .bind(client.row_version.value())
        .bind(client.provenance.created_at)
        .bind(client.provenance.created_by.as_deref())
        .execute(&mut *transaction)
        .await
        .map_err(|error| write_error(error, "insert client", duplicate_client(client)))?;

        replace_nested(&mut transaction, client).await?;
        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit client insert"))
    }

    async fn update_client(
        &self,
        client: &Client,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start client transaction"))?;

        let result = sqlx::query(
            r#"
            UPDATE clients
            SET client_type = $3,
                first_name = $4,
                last_name = $5,
                company_name = $6,
                email = $7,
                phone = $8,
                status = $9,
                residence_country = $10,
                row_version = $11,
                updated_at = $12,
                updated_by = $13
            WHERE id = $1
                AND row_version = $2
            "#,
        )
        .bind(client.id)
        .bind(expected.value())
        .bind(client.client_type.as_str())
        .bind(client.first_name.as_deref())
        .bind(client.last_name.as_deref())
        .bind(client.company_name.as_deref())
        .bind(client.email.as_str())
        .bind(client.phone.as_deref())
        .bind(client.status.as_str())
        .bind(client.residence_country.as_str())
        .bind(client.row_version.value())
        .bind(client.provenance.updated_at)
        .bind(client.provenance.updated_by.as_deref())
        .execute(&mut *transaction)
        .await
        .map_err(|error| write_error(error, "update client", duplicate_client(client)))?;
        ensure_written(result.rows_affected(), "Client", &client.id.to_string())?;

        replace_nested(&mut transaction, client).await?;
        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit client update"))
    }

    async fn delete_client(
        &self,
        client_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start client transaction"))?;

        let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND row_version = $2")
            .bind(client_id)
            .bind(expected.value())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                write_error(error, "delete client", || {
                    format!("client '{client_id}' cannot be deleted")
                })
            })?;
        ensure_written(result.rows_affected(), "Client", &client_id.to_string())?;

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit client delete"))
    }
}
