use super::*;

use brokerdesk_domain::{ClientAddress, InvestmentProfile};
use rust_decimal::Decimal;
use sqlx::Transaction;

/// Addresses and investment profile of one client.
#[derive(Debug, Default)]
pub(super) struct ClientNested {
    pub(super) addresses: Vec<ClientAddress>,
    pub(super) investment_profile: Option<InvestmentProfile>,
}

#[derive(Debug, FromRow)]
struct AddressRow {
    id: Uuid,
    client_id: Uuid,
    address_type: String,
    line1: String,
    line2: Option<String>,
    city: String,
    postal_code: Option<String>,
    country: String,
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: Uuid,
    client_id: Uuid,
    risk_tolerance: String,
    objective: String,
    annual_income: Option<Decimal>,
    net_worth: Option<Decimal>,
    experience_years: i32,
}

/// Loads nested records for the given clients, keyed by client id.
pub(super) async fn load_nested(
    pool: &PgPool,
    client_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, ClientNested>> {
    let mut nested: HashMap<Uuid, ClientNested> = HashMap::new();
    if client_ids.is_empty() {
        return Ok(nested);
    }

    let addresses = sqlx::query_as::<_, AddressRow>(
        r#"
        SELECT id, client_id, address_type, line1, line2, city, postal_code, country
        FROM client_addresses
        WHERE client_id = ANY($1)
        ORDER BY client_id, position
        "#,
    )
    .bind(client_ids)
    .fetch_all(pool)
    .await
    .map_err(read_error("load client addresses"))?;

    for row in addresses {
        nested
            .entry(row.client_id)
            .or_default()
            .addresses
            .push(ClientAddress {
                id: row.id,
                address_type: parse_stored(row.address_type.as_str(), "address type")?,
                line1: row.line1,
                line2: row.line2,
                city: row.city,
                postal_code: row.postal_code,
                country: row.country,
            });
    }

    let profiles = sqlx::query_as::<_, ProfileRow>(
        r#"
        SELECT id, client_id, risk_tolerance, objective, annual_income, net_worth, experience_years
        FROM investment_profiles
        WHERE client_id = ANY($1)
        "#,
    )
    .bind(client_ids)
    .fetch_all(pool)
    .await
    .map_err(read_error("load investment profiles"))?;

    for row in profiles {
        nested.entry(row.client_id).or_default().investment_profile = Some(InvestmentProfile {
            id: row.id,
            risk_tolerance: parse_stored(row.risk_tolerance.as_str(), "risk tolerance")?,
            objective: parse_stored(row.objective.as_str(), "investment objective")?,
            annual_income: row.annual_income,
            net_worth: row.net_worth,
            experience_years: row.experience_years,
        });
    }

    Ok(nested)
}

/// Replaces the stored addresses and profile with the client's current ones.
pub(super) async fn replace_nested(
    transaction: &mut Transaction<'_, Postgres>,
    client: &Client,
) -> AppResult<()> {
    sqlx::query("DELETE FROM client_addresses WHERE client_id = $1")
        .bind(client.id)
        .execute(&mut **transaction)
        .await
        .map_err(read_error("clear client addresses"))?;

    for (position, address) in (0_i32..).zip(&client.addresses) {
        sqlx::query(
            r#"
            INSERT INTO client_addresses (
                id,
                client_id,
                position,
                address_type,
                line1,
                line2,
                city,
                postal_code,
                country
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(address.id)
        .bind(client.id)
        .bind(position)
        .bind(address.address_type.as_str())
        .bind(address.line1.as_str())
        .bind(address.line2.as_deref())
        .bind(address.city.as_str())
        .bind(address.postal_code.as_deref())
        .bind(address.country.as_str())
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            write_error(error, "insert client address", || {
                format!("address '{}' belongs to another client", address.id)
            })
        })?;
    }

    sqlx::query("DELETE FROM investment_profiles WHERE client_id = $1")
        .bind(client.id)
        .execute(&mut **transaction)
        .await
        .map_err(read_error("clear investment profile"))?;

    if let Some(profile) = &client.investment_profile {
        sqlx::query(
            r#"
            INSERT INTO investment_profiles (
                id,
                client_id,
                risk_tolerance,
                objective,
                annual_income,
                net_worth,
                experience_years
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(profile.id)
        .bind(client.id)
        .bind(profile.risk_tolerance.as_str())
        .bind(profile.objective.as_str())
        .bind(profile.annual_income)
        .bind(profile.net_worth)
        .bind(profile.experience_years)
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            write_error(error, "insert investment profile", || {
                format!("investment profile '{}' belongs to another client", profile.id)
            })
        })?;
    }

    Ok(())
}
