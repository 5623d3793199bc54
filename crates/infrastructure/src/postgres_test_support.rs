//! Database bootstrap for repository tests. Tests skip when `DATABASE_URL` is unset.

use brokerdesk_domain::{User, UserDraft};
use chrono::Utc;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

/// Id of the seeded `Administrator` role.
pub(crate) const ADMINISTRATOR_ROLE_ID: Uuid =
    Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0001);

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub(crate) async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for repository tests: {error}");
    }

    Some(pool)
}

/// Inserts an active account and an active instrument and returns their ids.
pub(crate) async fn seed_trading_references(pool: &PgPool) -> (Uuid, Uuid) {
    let account_id = Uuid::new_v4();
    let instrument_id = Uuid::new_v4();

    let account = sqlx::query(
        r#"
            INSERT INTO accounts (id, account_number, account_type, status, currency, opened_at)
            VALUES ($1, $2, 'individual', 'active', 'CHF', DATE '2025-01-02')
            "#,
    )
    .bind(account_id)
    .bind(format!("T-{}", account_id.simple()))
    .execute(pool)
    .await;
    assert!(account.is_ok());

    let instrument = sqlx::query(
        r#"
            INSERT INTO instruments (id, symbol, name, instrument_type, currency, lot_size)
            VALUES ($1, $2, 'Novartis AG', 'stock', 'CHF', 1)
            "#,
    )
    .bind(instrument_id)
    .bind(format!("T{}", &instrument_id.simple().to_string()[..12]).to_uppercase())
    .execute(pool)
    .await;
    assert!(instrument.is_ok());

    (account_id, instrument_id)
}

/// Builds an active user with a unique username and email.
pub(crate) fn new_user(role_ids: Vec<Uuid>) -> User {
    let username = format!("desk{}", &Uuid::new_v4().simple().to_string()[..12]);
    let draft = UserDraft {
        email: format!("{username}@brokerdesk.test"),
        username,
        full_name: "Mira Gerber".to_owned(),
        is_active: true,
        role_ids,
    };
    User::create(draft, Utc::now(), "tester")
        .unwrap_or_else(|error| panic!("user draft should be valid: {error}"))
}
