use async_trait::async_trait;
use brokerdesk_application::{
    EntityChange, InstrumentFilter, InstrumentRepository, ListQuery, Paged,
};
use brokerdesk_core::AppResult;
use brokerdesk_domain::{Instrument, Provenance, RowVersion};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::postgres_entity_change_repository::insert_changes;
use crate::postgres_support::{
    contains_pattern, count_to_total, ensure_written, parse_stored, push_order_by, push_page,
    read_error, search_term, write_error,
};


const SORT_COLUMNS: &[(&str, &str)] = &[
    ("symbol", "symbol"),
    ("name", "lower(name)"),
    ("instrumentType", "instrument_type"),
    ("createdAt", "created_at"),
];

const INSTRUMENT_COLUMNS: &str = r#"
    SELECT
        id,
        symbol,
        name,
        isin,
        instrument_type,
        currency,
        exchange,
        lot_size,
        is_active,
        row_version,
        created_at,
        created_by,
        updated_at,
        updated_by
    FROM instruments
"#;

/// PostgreSQL-backed repository for the instrument catalog.
#[derive(Clone)]
pub struct PostgresInstrumentRepository {
    pool: PgPool,
}

impl PostgresInstrumentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct InstrumentRow {
    id: Uuid,
    symbol: String,
    name: String,
    isin: Option<String>,
    instrument_type: String,
    currency: String,
    exchange: Option<String>,
    lot_size: i32,
    is_active: bool,
    row_version: i64,
    created_at: DateTime<Utc>,
    created_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    updated_by: Option<String>,
}

impl TryFrom<InstrumentRow> for Instrument {
    type Error = brokerdesk_core::AppError;

    fn try_from(row: InstrumentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            symbol: row.symbol,
            name: row.name,
            isin: row.isin,
            instrument_type: parse_stored(row.instrument_type.as_str(), "instrument type")?,
            currency: row.currency,
            exchange: row.exchange,
            lot_size: row.lot_size,
            is_active: row.is_active,
            row_version: RowVersion::new(row.row_version),
            provenance: Provenance {
                created_at: row.created_at,
                created_by: row.created_by,
                updated_at: row.updated_at,
                updated_by: row.updated_by,
            },
        })
    }
}

fn push_filter<'args>(
    builder: &mut QueryBuilder<'args, Postgres>,
    filter: &'args InstrumentFilter,
) {
    builder.push(" WHERE true");
    if let Some(pattern) = search_term(filter.search.as_ref()).map(contains_pattern) {
        builder.push(" AND (symbol ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR isin ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
    if let Some(instrument_type) = filter.instrument_type {
        builder
            .push(" AND instrument_type = ")
            .push_bind(instrument_type.as_str());
    }
    if let Some(is_active) = filter.is_active {
        builder.push(" AND is_active = ").push_bind(is_active);
    }
}

fn duplicate_symbol(instrument: &Instrument) -> impl FnOnce() -> String + '_ {
    move || format!("instrument symbol '{}' already exists", instrument.symbol)
}

#[async_trait]
impl InstrumentRepository for PostgresInstrumentRepository {
    async fn list_instruments(
        &self,
        query: &ListQuery<InstrumentFilter>,
    ) -> AppResult<Paged<Instrument>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM instruments");
        push_filter(&mut count, &query.filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(read_error("count instruments"))?;

        let mut select = QueryBuilder::new(INSTRUMENT_COLUMNS);
        push_filter(&mut select, &query.filter);
        push_order_by(&mut select, query.sort, SORT_COLUMNS, "id");
        push_page(&mut select, query.page)?;
        let rows = select
            .build_query_as::<InstrumentRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(read_error("list instruments"))?;

        let items = rows
            .into_iter()
            .map(Instrument::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Paged::new(items, count_to_total(total), query.page))
    }

    async fn find_instrument(&self, instrument_id: Uuid) -> AppResult<Option<Instrument>> {
        sqlx::query_as::<_, InstrumentRow>(&format!("{INSTRUMENT_COLUMNS} WHERE id = $1"))
            .bind(instrument_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error("find instrument"))?
            .map(Instrument::try_from)
            .transpose()
    }

    async fn insert_instrument(
        &self,
        instrument: &Instrument,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start instrument transaction"))?;

        sqlx::query(
            r#"
            INSERT INTO instruments (
                id,
                symbol,
                name,
                isin,
                instrument_type,
                currency,
                exchange,
                lot_size,
                is_active,
                row_version,
                created_at,
                created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(instrument.id)
        .bind(instrument.symbol.as_str())
        .bind(instrument.name.as_str())
        .bind(instrument.isin.as_deref())
        .bind(instrument.instrument_type.as_str())
        .bind(instrument.currency.as_str())
        .bind(instrument.exchange.as_deref())
        .bind(instrument.lot_size)
        .bind(instrument.is_active)
        .bind(instrument.row_version.value())
        .bind(instrument.provenance.created_at)
        .bind(instrument.provenance.created_by.as_deref())
        .execute(&mut *transaction)
        .await
        .map_err(|error| write_error(error, "insert instrument", duplicate_symbol(instrument)))?;

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit instrument insert"))
    }

    async fn update_instrument(
        &self,
        instrument: &Instrument,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start instrument transaction"))?;

        let result = sqlx::query(
            r#"
            UPDATE instruments
            SET symbol = $3,
                name = $4,
                isin = $5,
                instrument_type = $6,
                currency = $7,
                exchange = $8,
                lot_size = $9,
                is_active = $10,
                row_version = $11,
                updated_at = $12,
                updated_by = $13
            WHERE id = $1
                AND row_version = $2
            "#,
        )
        .bind(instrument.id)
        .bind(expected.value())
        .bind(instrument.symbol.as_str())
        .bind(instrument.name.as_str())
        .bind(instrument.isin.as_deref())
        .bind(instrument.instrument_type.as_str())
        .bind(instrument.currency.as_str())
        .bind(instrument.exchange.as_deref())
        .bind(instrument.lot_size)
        .bind(instrument.is_active)
        .bind(instrument.row_version.value())
        .bind(instrument.provenance.updated_at)
        .bind(instrument.provenance.updated_by.as_deref())
        .execute(&mut *transaction)
        .await
        .map_err(|error| write_error(error, "update instrument", duplicate_symbol(instrument)))?;
        ensure_written(result.rows_affected(), "Instrument", &instrument.id.to_string())?;

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit instrument update"))
    }

    async fn delete_instrument(
        &self,
        instrument_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(read_error("start instrument transaction"))?;

        let result = sqlx::query("DELETE FROM instruments WHERE id = $1 AND row_version = $2")
            .bind(instrument_id)
            .bind(expected.value())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                write_error(error, "delete instrument", || {
                    format!("instrument '{instrument_id}' cannot be deleted")
                })
            })?;
        ensure_written(result.rows_affected(), "Instrument", &instrument_id.to_string())?;

        insert_changes(&mut transaction, changes).await?;

        transaction
            .commit()
            .await
            .map_err(read_error("commit instrument delete"))
    }
}
