use std::collections::HashMap;

use async_trait::async_trait;
use brokerdesk_application::{AccountFilter, AccountRepository, EntityChange, ListQuery, Paged};
use brokerdesk_core::{AppError, AppResult};
use brokerdesk_domain::{Account, AccountHolder, Provenance, RowVersion};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::postgres_entity_change_repository::insert_changes;
use crate::postgres_support::{
    count_to_total, ensure_written, parse_stored, prefix_pattern, push_order_by, push_page,
    read_error, search_term, write_error,
};

#[cfg(test)]
mod tests;

const SORT_COLUMNS: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("accountNumber", "account_number"),
    ("openedAt", "opened_at"),
    ("status", "status"),
];

const ACCOUNT_COLUMNS: &str = r#"
    SELECT
        id,
        account_number,
        account_type,
        status,
        currency,
        opened_at,
        closed_at,
        comment,
        row_version,
        created_at,
        created_by,
        updated_at,
        updated_by
    FROM accounts
"#;

/// PostgreSQL-backed repository for accounts and their holders.
#[derive(Clone)]
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_holders(
        &self,
        account_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, Vec<AccountHolder>>> {
        let mut holders: HashMap<Uuid, Vec<AccountHolder>> = HashMap::new();
        if account_ids.is_empty() {
            return Ok(holders);
        }

        let rows = sqlx::query_as::<_, HolderRow>(
            r#"
            SELECT account_id, client_id, holder_role, is_primary
            FROM account_holders
            WHERE account_id = ANY($1)
            ORDER BY account_id, is_primary DESC, added_at, client_id
            "#,
        )
        .bind(account_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error("load account holders"))?;

        for row in rows {
            holders.entry(row.account_id).or_default().push(AccountHolder {
                client_id: row.client_id,
                role: parse_stored(row.holder_role.as_str(), "holder role")?,
                is_primary: row.is_primary,
            });
        }

        Ok(holders)
    }
}

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    account_number: String,
    account_type: String,
    status: String,
    currency: String,
    opened_at: NaiveDate,
    closed_at: Option<NaiveDate>,
    comment: Option<String>,
    row_version: i64,
    created_at: DateTime<Utc>,
    created_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<String>,
}

#[derive(Debug, FromRow)]
struct HolderRow {
    account_id: Uuid,
    client_id: Uuid,
    holder_role: String,
    is_primary: bool,
}

impl AccountRow {
    fn into_account(self, holders: Vec<AccountHolder>) -> AppResult<Account> {
        Ok(Account {
            id: self.id,
            account_number: self.account_number,
            account_type: parse_stored(self.account_type.as_str(), "account type")?,
            status: parse_stored(self.status.as_str(), "account status")?,
            currency: self.currency,
            opened_at: self.opened_at,
            closed_at: self.closed_at,
            comment: self.comment,
            holders,
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

fn push_filter<'args>(builder: &mut QueryBuilder<'args, Postgres>, filter: &'args AccountFilter) {
    builder.push(" WHERE true");
    if let Some(pattern) = search_term(filter.search.as_ref()).map(prefix_pattern) {
        builder.push(" AND account_number ILIKE ").push_bind(pattern);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(account_type) = filter.account_type {
        builder
            .push(" AND account_type = ")
            .push_bind(account_type.as_str());
    }
    if let Some(client_id) = filter.client_id {
        builder
            .push(" AND id IN (SELECT account_id FROM account_holders WHERE client_id = ")
            .push_bind(client_id)
            .push(")");
    }
}

fn duplicate_account_number(account: &Account) -> impl FnOnce() -> String + '_ {
    move || format!("account number '{}' already exists", account.account_number)
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn list_accounts(&self, query: &ListQuery<AccountFilter>) -> AppResult<Paged<Account>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM accounts");
        push_filter(&mut count, &query.filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(read_error("count accounts"))?;

        let mut select = QueryBuilder::new(ACCOUNT_COLUMNS);
        push_filter(&mut select, &query.filter);
        push_order_by(&mut select, query.sort, SORT_COLUMNS, "id");
        push_page(&mut select, query.page)?;
        let rows = select
            .build_query_as::<AccountRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("list accounts"))?;

        let account_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut holders = self.load_holders(&account_ids).await?;
        let items = rows
            .into_iter()
            .map(|row| {
                let account_holders = holders.remove(&row.id).unwrap_or_default();
                row.into_account(account_holders)
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Paged::new(items, count_to_total(total), query.page))
    }

    async fn find_account(&self, account_id: Uuid) -> AppResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!("{ACCOUNT_COLUMNS} WHERE id = $1"))
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("find account"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut holders = self.load_holders(&[account_id]).await?;
        row.into_account(holders.remove(&account_id).unwrap_or_default())
            .map(Some)
    }

    async fn insert_account(&self, account: &Account, changes: &[EntityChange]) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start account transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO accounts (
                id,
                account_number,
                account_type,
                status,
                currency,
                opened_at,
                closed_at,
                comment,
                row_version,
                created_at,
                created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(account.id)
        .bind(account.account_number.as_str())
        .bind(account.account_type.as_str())
        .bind(account.status.as_str())
        .bind(account.currency.as_str())
        .bind(account.opened_at)
        .bind(account.closed_at)
        .bind(account.comment.as_deref())
        .bind(account.row_version.value())
        .bind(account.provenance.created_at)
        .bind(account.provenance.created_by.as_deref())
        .execute(&mut *transaction)
        .await
        .map_err(|error| write_error(error, "insert account", duplicate_account_number(account)))?;

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit account insert"))
    }

    async fn update_account(
        &self,
        account: &Account,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start account transaction"))?;

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET account_number = $3,
                account_type = $4,
                status = $5,
                currency = $6,
                opened_at = $7,
                closed_at = $8,
                comment = $9,
                row_version = $10,
                updated_at = $11,
                updated_by = $12
            WHERE id = $1
                AND row_version = $2
            "#,
        )
        .bind(account.id)
        .bind(expected.value())
        .bind(account.account_number.as_str())
        .bind(account.account_type.as_str())
        .bind(account.status.as_str())
        .bind(account.currency.as_str())
        .bind(account.opened_at)
        .bind(account.closed_at)
        .bind(account.comment.as_deref())
        .bind(account.row_version.value())
        .bind(account.provenance.updated_at)
        .bind(account.provenance.updated_by.as_deref())
        .execute(&mut *transaction)
        .await
        .map_err(|error| write_error(error, "update account", duplicate_account_number(account)))?;
        ensure_written(result.rows_affected(), "Account", &account.id.to_string())?;

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit account update"))
    }

    async fn delete_account(
        &self,
        account_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start account transaction"))?;

        let result = sqlx::query("DELETE FROM accounts WHERE id = $1 AND row_version = $2")
            .bind(account_id)
            .bind(expected.value())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                write_error(error, "delete account", || {
                    format!("account '{account_id}' cannot be deleted")
                })
            })?;
        ensure_written(result.rows_affected(), "Account", &account_id.to_string())?;

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit account delete"))
    }

    async fn insert_holder(
        &self,
        account_id: Uuid,
        holder: &AccountHolder,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start account holder transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO account_holders (account_id, client_id, holder_role, is_primary)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(account_id)
        .bind(holder.client_id)
        .bind(holder.role.as_str())
        .bind(holder.is_primary)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            write_error(error, "add account holder", || {
                format!(
                    "client '{}' cannot be added to account '{account_id}' as holder",
                    holder.client_id
                )
            })
        })?;

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit account holder insert"))
    }

    async fn delete_holder(
        &self,
        account_id: Uuid,
        client_id: Uuid,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start account holder transaction"))?;

        let result =
            sqlx::query("DELETE FROM account_holders WHERE account_id = $1 AND client_id = $2")
                .bind(account_id)
                .bind(client_id)
                .execute(&mut *transaction)
                .await
                .map_err(read_error("remove account holder"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "client '{client_id}' does not hold account '{account_id}'"
            )));
        }

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit account holder removal"))
    }
}
