use brokerdesk_domain::{ADMINISTRATOR_ROLE, UserDraft, validate_password};

use super::*;

/// Administrator account ensured at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    /// Login name.
    pub username: String,
    /// Initial password. Ignored when the user already exists.
    pub password: String,
    /// Contact email. Defaults to `<username>@brokerdesk.local`.
    pub email: Option<String>,
}

impl AuthService {
    /// Creates the bootstrap administrator if missing, or grants the
    /// `Administrator` role to an existing user of that name.
    ///
    /// Returns `true` when anything was written.
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> AppResult<bool> {
        let role = self
            .role_repository
            .find_role_by_name(ADMINISTRATOR_ROLE)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "seeded role '{ADMINISTRATOR_ROLE}' is missing; apply migrations first"
                ))
            })?;

        let username = normalize_username(&admin.username)?;
        let now = Utc::now();

        if let Some(credentials) = self.user_repository.find_credentials(&username).await? {
            let existing = credentials.user;
            if existing.role_ids.contains(&role.id) {
                return Ok(false);
            }

            let mut role_ids = existing.role_ids.clone();
            role_ids.push(role.id);
            let mut updated = existing.apply(
                UserDraft {
                    username: existing.username.clone(),
                    email: existing.email.clone(),
                    full_name: existing.full_name.clone(),
                    is_active: existing.is_active,
                    role_ids,
                },
                now,
                "system",
            )?;
            updated.row_version = existing.row_version.next();
            self.user_repository
                .update_user(&updated, existing.row_version, None, &[])
                .await?;
            return Ok(true);
        }

        validate_password(&admin.password)?;
        let user = User::create(
            UserDraft {
                email: admin
                    .email
                    .clone()
                    .unwrap_or_else(|| format!("{username}@brokerdesk.local")),
                username,
                full_name: "Administrator".to_owned(),
                is_active: true,
                role_ids: vec![role.id],
            },
            now,
            "system",
        )?;
        let password_hash = self.password_hasher.hash_password(&admin.password)?;
        self.user_repository
            .insert_user(&user, &password_hash, &[])
            .await?;

        Ok(true)
    }
}
