//! Back-office user administration ports and application service.
//!
//! Passwords never enter the change history; only their Argon2id hash is
//! persisted through [`UserRepository`].


use std::sync::Arc;

use async_trait::async_trait;
use brokerdesk_core::{AppError, AppResult, UserIdentity};
use brokerdesk_domain::{ChangeTracked, Permission, RowVersion, User, UserDraft, validate_password};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AuthorizationService, EntityChange, ListQuery, Mutation, OperationRecorder, Paged, SortFields,
    SortOrder,
};

/// Sortable user fields.
pub const USER_SORT_FIELDS: SortFields = SortFields {
    allowed: &["username", "fullName", "email", "createdAt"],
    default: SortOrder::asc("username"),
};

/// User listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Case-insensitive match on username, email and full name.
    pub search: Option<String>,
    /// Active flag filter.
    pub is_active: Option<bool>,
    /// Users holding this role.
    pub role_id: Option<Uuid>,
}

/// User together with the stored password hash.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    /// User record.
    pub user: User,
    /// Argon2id password hash.
    pub password_hash: String,
}

/// Repository port for user persistence.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Lists users with their role ids.
    async fn list_users(&self, query: &ListQuery<UserFilter>) -> AppResult<Paged<User>>;

    /// Finds a user by id.
    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>>;

    /// Finds a user and password hash by normalized username.
    async fn find_credentials(&self, username: &str) -> AppResult<Option<UserCredentials>>;

    /// Inserts a user with role assignments. Fails with a conflict on a
    /// duplicate username or email.
    async fn insert_user(
        &self,
        user: &User,
        password_hash: &str,
        changes: &[EntityChange],
    ) -> AppResult<()>;

    /// Updates attributes and role assignments when the stored row version
    /// equals `expected`, replacing the password hash when one is given.
    async fn update_user(
        &self,
        user: &User,
        expected: RowVersion,
        password_hash: Option<&str>,
        changes: &[EntityChange],
    ) -> AppResult<()>;

    /// Deletes a user when the stored row version equals `expected`.
    async fn delete_user(
        &self,
        user_id: Uuid,
        expected: RowVersion,
        changes: &[EntityChange],
    ) -> AppResult<()>;
}

/// Port for password hashing operations. Keeps the application layer free of
/// direct cryptographic library coupling.
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password using Argon2id.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Application service for user administration.
#[derive(Clone)]
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    authorization_service: AuthorizationService,
}

impl UserService {
    /// Creates a new user service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn UserRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
            authorization_service: AuthorizationService,
    ) -> Self {
        Self {
            repository,
            password_hasher,
            authorization_service,
        }
    }

    /// Lists users.
    pub async fn list_users(
        &self,
        actor: &UserIdentity,
        query: ListQuery<UserFilter>,
    ) -> AppResult<Paged<User>> {
        self.authorization_service
            .require_permission(actor, Permission::UsersRead)
            .await?;

        self.repository.list_users(&query).await
    }

    /// Returns one user.
    pub async fn get_user(&self, actor: &UserIdentity, user_id: Uuid) -> AppResult<User> {
        self.authorization_service
            .require_permission(actor, Permission::UsersRead)
            .await?;

        self.load(user_id).await
    }

    /// Creates a user with an initial password.
    pub async fn create_user(
        &self,
        actor: &UserIdentity,
        draft: UserDraft,
        password: &str,
    ) -> AppResult<Mutation<User>> {
        self.authorization_service
            .require_permission(actor, Permission::UsersCreate)
            .await?;

        validate_password(password)?;
        let now = Utc::now();
        let user = User::create(draft, now, actor.username())?;
        let password_hash = self.password_hasher.hash_password(password)?;
        let mut recorder = OperationRecorder::begin(actor, &user, now);
        recorder.record(None, Some(&user));
        self.repository
            .insert_user(&user, &password_hash, &recorder.finish())
            .await?;

        Ok(Mutation::created(user))
    }

    /// Updates a user and optionally resets the password.
    pub async fn update_user(
        &self,
        actor: &UserIdentity,
        user_id: Uuid,
        row_version: RowVersion,
        draft: UserDraft,
        password: Option<&str>,
    ) -> AppResult<Mutation<User>> {
        self.authorization_service
            .require_permission(actor, Permission::UsersUpdate)
            .await?;

        let existing = self.load(user_id).await?;
        existing
            .row_version
            .ensure_matches(row_version, User::ENTITY_TYPE, &existing.tracked_id())?;

        let now = Utc::now();
        let mut updated = existing.apply(draft, now, actor.username())?;
        if user_id == actor.user_id() && !updated.is_active {
            return Err(AppError::Conflict(
                "users cannot deactivate themselves".to_owned(),
            ));
        }

        let password_hash = password
            .map(|password| {
                validate_password(password)?;
                self.password_hasher.hash_password(password)
            })
            .transpose()?;

        updated.row_version = existing.row_version.next();

        let mut recorder = OperationRecorder::begin(actor, &updated, now);
        recorder.record(Some(&existing), Some(&updated));
        self.repository
            .update_user(
                &updated,
                existing.row_version,
                password_hash.as_deref(),
                &recorder.finish(),
            )
            .await?;

        Ok(Mutation::updated(&existing, updated))
    }

    /// Deletes a user other than the caller.
    pub async fn delete_user(
        &self,
        actor: &UserIdentity,
        user_id: Uuid,
        row_version: Option<RowVersion>,
    ) -> AppResult<Mutation<()>> {
        self.authorization_service
            .require_permission(actor, Permission::UsersDelete)
            .await?;

        if user_id == actor.user_id() {
            return Err(AppError::Conflict("users cannot delete themselves".to_owned()));
        }

        let existing = self.load(user_id).await?;
        if let Some(row_version) = row_version {
            existing
                .row_version
                .ensure_matches(row_version, User::ENTITY_TYPE, &existing.tracked_id())?;
        }

        let mut recorder = OperationRecorder::begin(actor, &existing, Utc::now());
        recorder.record(Some(&existing), None);
        self.repository
            .delete_user(user_id, existing.row_version, &recorder.finish())
            .await?;

        Ok(Mutation::deleted(&existing))
    }

    async fn load(&self, user_id: Uuid) -> AppResult<User> {
        self.repository
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))
    }
}
