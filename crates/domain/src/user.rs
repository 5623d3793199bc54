//! Back-office user types and validation rules.
//!
//! Password rules follow the OWASP Authentication and Password Storage cheat
//! sheets.

use brokerdesk_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::change::{ChangeTracked, FieldSnapshot};
use crate::codes::bounded_text;
use crate::versioning::{Provenance, RowVersion};

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated, lowercased email address.
    ///
    /// Performs basic structural validation: exactly one `@`, a non-empty
    /// local part and a domain containing at least one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AppError::Validation(
                "email address must contain '@'".to_owned(),
            ));
        };

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.contains('@') || !domain.contains('.') || domain.starts_with('.') {
            return Err(AppError::Validation(format!(
                "email domain '{domain}' is invalid"
            )));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Validates and lowercases a login name: 3-64 characters of `a-z`, `0-9`, `.`, `_`, `-`.
pub fn normalize_username(value: &str) -> AppResult<String> {
    let normalized = value.trim().to_lowercase();
    let valid = (3..=64).contains(&normalized.chars().count())
        && normalized
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));

    if !valid {
        return Err(AppError::Validation(format!(
            "username '{value}' must be 3-64 characters of letters, digits, '.', '_' or '-'"
        )));
    }

    Ok(normalized)
}

/// Minimum password length (NIST SP800-63B, no second factor).
pub const PASSWORD_MIN_LENGTH: usize = 10;

/// Maximum password length; bounds Argon2id hashing cost.
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Validates a plaintext password.
///
/// Rejects passwords shorter than [`PASSWORD_MIN_LENGTH`], longer than
/// [`PASSWORD_MAX_LENGTH`] or found in the embedded breached-password list.
pub fn validate_password(password: &str) -> AppResult<()> {
    let char_count = password.chars().count();

    if char_count < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    if char_count > PASSWORD_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "password must not exceed {PASSWORD_MAX_LENGTH} characters"
        )));
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.iter().any(|entry| *entry == lowered) {
        return Err(AppError::Validation(
            "this password is too common and has appeared in data breaches".to_owned(),
        ));
    }

    Ok(())
}

static COMMON_PASSWORDS: &[&str] = &[
    "1234567890",
    "qwertyuiop",
    "password123",
    "password1234",
    "1q2w3e4r5t",
    "iloveyou123",
    "administrator",
    "welcome123",
    "letmein123",
    "0987654321",
    "1111111111",
    "qwerty1234",
    "trustno1234",
    "brokerdesk",
];

/// Back-office user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Stable user id.
    pub id: Uuid,
    /// Unique lowercase login name.
    pub username: String,
    /// Unique email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Inactive users cannot sign in.
    pub is_active: bool,
    /// Assigned roles, sorted.
    pub role_ids: Vec<Uuid>,
    /// Concurrency token.
    pub row_version: RowVersion,
    /// Creation and update stamps.
    pub provenance: Provenance,
}

impl User {
    /// Builds a new user.
    pub fn create(draft: UserDraft, at: DateTime<Utc>, created_by: &str) -> AppResult<Self> {
        let draft = draft.normalize()?;
        Ok(Self {
            id: Uuid::new_v4(),
            username: draft.username,
            email: draft.email,
            full_name: draft.full_name,
            is_active: draft.is_active,
            role_ids: draft.role_ids,
            row_version: RowVersion::INITIAL,
            provenance: Provenance::created(at, created_by),
        })
    }

    /// Returns the user with a draft applied.
    pub fn apply(&self, draft: UserDraft, at: DateTime<Utc>, updated_by: &str) -> AppResult<Self> {
        let draft = draft.normalize()?;
        Ok(Self {
            id: self.id,
            username: draft.username,
            email: draft.email,
            full_name: draft.full_name,
            is_active: draft.is_active,
            role_ids: draft.role_ids,
            row_version: self.row_version,
            provenance: self.provenance.touched(at, updated_by),
        })
    }
}

impl ChangeTracked for User {
    const ENTITY_TYPE: &'static str = "User";

    fn tracked_id(&self) -> String {
        self.id.to_string()
    }

    fn snapshot(&self) -> FieldSnapshot {
        let role_ids = self
            .role_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");

        FieldSnapshot::new()
            .with("Username", &self.username)
            .with("Email", &self.email)
            .with("FullName", &self.full_name)
            .with("IsActive", self.is_active)
            .with_optional("RoleIds", (!role_ids.is_empty()).then_some(role_ids))
    }
}

/// User attributes supplied on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    /// Login name.
    pub username: String,
    /// Email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Whether the user may sign in.
    pub is_active: bool,
    /// Assigned roles.
    pub role_ids: Vec<Uuid>,
}

impl UserDraft {
    /// Validates and normalizes the draft. Role ids are sorted and deduplicated.
    pub fn normalize(self) -> AppResult<Self> {
        let mut role_ids = self.role_ids;
        role_ids.sort_unstable();
        role_ids.dedup();

        Ok(Self {
            username: normalize_username(&self.username)?,
            email: EmailAddress::new(self.email)?.into(),
            full_name: bounded_text("full_name", self.full_name, 200)?,
            is_active: self.is_active,
            role_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{
        EmailAddress, PASSWORD_MAX_LENGTH, UserDraft, normalize_username, validate_password,
    };

    #[test]
    fn valid_email_is_accepted() {
        let email = EmailAddress::new("USER@Example.COM");
        assert_eq!(
            email.unwrap_or_else(|_| panic!("email should be valid")).as_str(),
            "user@example.com"
        );
    }

    #[test]
    fn email_without_at_is_rejected() {
        assert!(EmailAddress::new("noatsign").is_err());
    }

    #[test]
    fn email_with_two_at_signs_is_rejected() {
        assert!(EmailAddress::new("a@b@example.com").is_err());
    }

    #[test]
    fn email_without_domain_dot_is_rejected() {
        assert!(EmailAddress::new("user@nodot").is_err());
    }

    #[test]
    fn username_is_lowercased() {
        assert_eq!(normalize_username(" J.Doe ").ok().as_deref(), Some("j.doe"));
    }

    #[test]
    fn username_with_spaces_is_rejected() {
        assert!(normalize_username("john doe").is_err());
        assert!(normalize_username("jd").is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn passphrase_is_accepted() {
        assert!(validate_password("a-reasonable-passphrase").is_ok());
    }

    #[test]
    fn common_password_is_rejected() {
        assert!(validate_password("Password123").is_err());
    }

    #[test]
    fn very_long_password_is_rejected() {
        let long = "a".repeat(PASSWORD_MAX_LENGTH + 1);
        assert!(validate_password(&long).is_err());
    }

    #[test]
    fn draft_deduplicates_roles() {
        let role_id = Uuid::new_v4();
        let draft = UserDraft {
            username: "ops.desk".to_owned(),
            email: "ops@example.com".to_owned(),
            full_name: "Ops Desk".to_owned(),
            is_active: true,
            role_ids: vec![role_id, role_id],
        }
        .normalize()
        .unwrap_or_else(|_| panic!("draft should be valid"));

        assert_eq!(draft.role_ids, vec![role_id]);
    }
}
