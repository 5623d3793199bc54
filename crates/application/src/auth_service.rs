//! Bearer token authentication.
//!
//! Access and refresh tokens are opaque random values. Only their SHA-256
//! hash is persisted, so a leaked table cannot be replayed.

mod bootstrap;
mod token_crypto;

pub use bootstrap::BootstrapAdmin;

use std::sync::Arc;

use async_trait::async_trait;
use brokerdesk_core::{AppError, AppResult, UserIdentity};
use brokerdesk_domain::{Permission, User, normalize_username};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{AuthorizationService, PasswordHasher, RoleRepository, UserRepository};

use token_crypto::{generate_token, hash_token};

const INVALID_CREDENTIALS: &str = "invalid username or password";

/// Kind of bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Short-lived token presented on every request.
    Access,
    /// Long-lived token exchanged for a new pair.
    Refresh,
}

impl TokenKind {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Persisted token row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTokenRecord {
    /// Token row id.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Token kind.
    pub kind: TokenKind,
    /// SHA-256 hex of the raw token.
    pub token_hash: String,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}

/// Repository port for bearer tokens.
#[async_trait]
pub trait AuthTokenRepository: Send + Sync {
    /// Stores a newly issued token.
    async fn insert_token(&self, record: &AuthTokenRecord) -> AppResult<()>;

    /// Finds an unrevoked token of `kind` that expires after `now`.
    async fn find_active_token(
        &self,
        token_hash: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> AppResult<Option<AuthTokenRecord>>;

    /// Revokes a token. Returns `false` when it was already revoked.
    async fn revoke_token(&self, token_id: Uuid, at: DateTime<Utc>) -> AppResult<bool>;
}

/// Token lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSettings {
    /// Access token lifetime.
    pub access_token_ttl: Duration,
    /// Refresh token lifetime.
    pub refresh_token_ttl: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::seconds(900),
            refresh_token_ttl: Duration::days(14),
        }
    }
}

/// Issued token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Raw access token.
    pub access_token: String,
    /// Raw refresh token.
    pub refresh_token: String,
    /// Always `Bearer`.
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Outcome of a login or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Authenticated user.
    pub identity: UserIdentity,
    /// Issued tokens.
    pub tokens: TokenPair,
}

/// Caller profile returned by `me`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// Caller identity.
    pub identity: UserIdentity,
    /// Caller email.
    pub email: String,
    /// Effective permission codes.
    pub permissions: Vec<Permission>,
}

/// Application service for login, token rotation and bearer authentication.
#[derive(Clone)]
pub struct AuthService {
    user_repository: Arc<dyn UserRepository>,
    role_repository: Arc<dyn RoleRepository>,
    token_repository: Arc<dyn AuthTokenRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    authorization_service: AuthorizationService,
    settings: AuthSettings,
}

impl AuthService {
    /// Creates a new auth service.
    #[must_use]
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        role_repository: Arc<dyn RoleRepository>,
        token_repository: Arc<dyn AuthTokenRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        authorization_service: AuthorizationService,
        settings: AuthSettings,
    ) -> Self {
        Self {
            user_repository,
            role_repository,
            token_repository,
            password_hasher,
            authorization_service,
            settings,
        }
    }

    /// Verifies credentials and issues a token pair.
    ///
    /// Unknown users, inactive users and wrong passwords all produce the same
    /// `Unauthorized` error.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<AuthSession> {
        let credentials = match normalize_username(username) {
            Ok(username) => self.user_repository.find_credentials(&username).await?,
            Err(_) => None,
        };

        let Some(credentials) = credentials else {
            // Hash anyway so unknown usernames take as long as wrong passwords.
            let _ = self.password_hasher.hash_password(password);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_owned()));
        };

        let password_valid = self
            .password_hasher
            .verify_password(password, &credentials.password_hash)?;
        if !password_valid || !credentials.user.is_active {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_owned()));
        }

        let tokens = self.issue_pair(credentials.user.id).await?;
        Ok(AuthSession {
            identity: identity_of(&credentials.user),
            tokens,
        })
    }

    /// Exchanges a refresh token for a new pair and revokes the old one.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthSession> {
        let now = Utc::now();
        let record = self
            .token_repository
            .find_active_token(&hash_token(refresh_token), TokenKind::Refresh, now)
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid or expired refresh token".to_owned()))?;

        if !self.token_repository.revoke_token(record.id, now).await? {
            return Err(AppError::Unauthorized(
                "invalid or expired refresh token".to_owned(),
            ));
        }

        let user = self.active_user(record.user_id).await?;
        let tokens = self.issue_pair(user.id).await?;
        Ok(AuthSession {
            identity: identity_of(&user),
            tokens,
        })
    }

    /// Revokes a refresh token owned by the caller.
    pub async fn logout(&self, actor: &UserIdentity, refresh_token: &str) -> AppResult<()> {
        let now = Utc::now();
        let record = self
            .token_repository
            .find_active_token(&hash_token(refresh_token), TokenKind::Refresh, now)
            .await?;

        if let Some(record) = record
            && record.user_id == actor.user_id()
        {
            self.token_repository.revoke_token(record.id, now).await?;
        }

        Ok(())
    }

    /// Resolves a bearer access token to the calling user.
    pub async fn authenticate(&self, access_token: &str) -> AppResult<UserIdentity> {
        let record = self
            .token_repository
            .find_active_token(&hash_token(access_token), TokenKind::Access, Utc::now())
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid or expired access token".to_owned()))?;

        let user = self.active_user(record.user_id).await?;
        Ok(identity_of(&user))
    }

    /// Returns the caller profile with effective permissions.
    pub async fn current_user(&self, actor: &UserIdentity) -> AppResult<CurrentUser> {
        let user = self.active_user(actor.user_id()).await?;
        let permissions = self
            .authorization_service
            .effective_permissions(actor)
            .await?;

        Ok(CurrentUser {
            identity: identity_of(&user),
            email: user.email,
            permissions,
        })
    }

    async fn active_user(&self, user_id: Uuid) -> AppResult<User> {
        match self.user_repository.find_user(user_id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AppError::Unauthorized(
                "user is unknown or inactive".to_owned(),
            )),
        }
    }

    async fn issue_pair(&self, user_id: Uuid) -> AppResult<TokenPair> {
        let now = Utc::now();
        let access_token = self
            .issue(user_id, TokenKind::Access, now + self.settings.access_token_ttl)
            .await?;
        let refresh_token = self
            .issue(
                user_id,
                TokenKind::Refresh,
                now + self.settings.refresh_token_ttl,
            )
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.settings.access_token_ttl.num_seconds(),
        })
    }

    async fn issue(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        expires_at: DateTime<Utc>,
    ) -> AppResult<String> {
        let (raw_token, token_hash) = generate_token()?;
        self.token_repository
            .insert_token(&AuthTokenRecord {
                id: Uuid::new_v4(),
                user_id,
                kind,
                token_hash,
                expires_at,
            })
            .await?;

        Ok(raw_token)
    }
}

fn identity_of(user: &User) -> UserIdentity {
    UserIdentity::new(user.id, user.username.clone(), user.full_name.clone())
}
