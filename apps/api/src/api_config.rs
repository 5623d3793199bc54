use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use brokerdesk_application::{AuthSettings, BootstrapAdmin};
use brokerdesk_core::AppError;
use chrono::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 900;
const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: i64 = 14 * 24 * 60 * 60;

/// Runtime configuration read from the environment.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub database_max_connections: u32,
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub auth_settings: AuthSettings,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_env("DATABASE_URL")?;
        let database_max_connections = parse_env_or(
            "DATABASE_MAX_CONNECTIONS",
            optional_env("DATABASE_MAX_CONNECTIONS"),
            10,
        )?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = parse_env_or("API_PORT", optional_env("API_PORT"), 3001)?;

        let access_token_ttl = parse_env_or(
            "ACCESS_TOKEN_TTL_SECONDS",
            optional_env("ACCESS_TOKEN_TTL_SECONDS"),
            DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
        )?;
        let refresh_token_ttl = parse_env_or(
            "REFRESH_TOKEN_TTL_SECONDS",
            optional_env("REFRESH_TOKEN_TTL_SECONDS"),
            DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
        )?;
        let auth_settings = token_settings(access_token_ttl, refresh_token_ttl)?;

        let bootstrap_admin = bootstrap_admin(
            optional_env("BOOTSTRAP_ADMIN_USERNAME"),
            optional_env("BOOTSTRAP_ADMIN_PASSWORD"),
            optional_env("BOOTSTRAP_ADMIN_EMAIL"),
        )?;

        Ok(Self {
            migrate_only,
            database_url,
            database_max_connections,
            frontend_url,
            api_host,
            api_port,
            auth_settings,
            bootstrap_admin,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_env_or<T>(name: &str, value: Option<String>, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        None => Ok(default),
    }
}

fn token_settings(access_seconds: i64, refresh_seconds: i64) -> Result<AuthSettings, AppError> {
    if access_seconds <= 0 || refresh_seconds <= 0 {
        return Err(AppError::Validation(
            "token lifetimes must be positive".to_owned(),
        ));
    }
    if refresh_seconds <= access_seconds {
        return Err(AppError::Validation(
            "REFRESH_TOKEN_TTL_SECONDS must exceed ACCESS_TOKEN_TTL_SECONDS".to_owned(),
        ));
    }

    Ok(AuthSettings {
        access_token_ttl: Duration::seconds(access_seconds),
        refresh_token_ttl: Duration::seconds(refresh_seconds),
    })
}

fn bootstrap_admin(
    username: Option<String>,
    password: Option<String>,
    email: Option<String>,
) -> Result<Option<BootstrapAdmin>, AppError> {
    match (username, password) {
        (Some(username), Some(password)) => Ok(Some(BootstrapAdmin {
            username,
            password,
            email,
        })),
        (None, None) => Ok(None),
        _ => Err(AppError::Validation(
            "BOOTSTRAP_ADMIN_USERNAME and BOOTSTRAP_ADMIN_PASSWORD must be set together"
                .to_owned(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use brokerdesk_core::AppError;
    use chrono::Duration;

    use super::{bootstrap_admin, parse_env_or, token_settings};

    #[test]
    fn missing_values_fall_back_to_defaults() {
        let port: Result<u16, AppError> = parse_env_or("API_PORT", None, 3001);
        assert!(matches!(port, Ok(3001)));
    }

    #[test]
    fn unparsable_values_name_the_variable() {
        let port: Result<u16, AppError> = parse_env_or("API_PORT", Some("80a".to_owned()), 3001);
        assert!(matches!(port, Err(AppError::Validation(message)) if message.contains("API_PORT")));
    }

    #[test]
    fn refresh_token_must_outlive_access_token() {
        assert!(token_settings(900, 600).is_err());
        assert!(token_settings(0, 600).is_err());

        let settings = token_settings(900, 3600)
            .unwrap_or_else(|error| panic!("settings should be valid: {error}"));
        assert_eq!(settings.access_token_ttl, Duration::seconds(900));
        assert_eq!(settings.refresh_token_ttl, Duration::hours(1));
    }

    #[test]
    fn bootstrap_admin_requires_username_and_password_together() {
        assert!(matches!(bootstrap_admin(None, None, None), Ok(None)));
        assert!(bootstrap_admin(Some("admin".to_owned()), None, None).is_err());

        let admin = bootstrap_admin(
            Some("admin".to_owned()),
            Some("correct horse battery".to_owned()),
            None,
        )
        .unwrap_or_else(|error| panic!("admin should be configured: {error}"));
        assert_eq!(admin.map(|admin| admin.username), Some("admin".to_owned()));
    }
}
