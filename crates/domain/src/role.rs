use brokerdesk_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::change::{ChangeTracked, FieldSnapshot};
use crate::codes::{bounded_text, optional_text};
use crate::security::Permission;
use crate::versioning::{Provenance, RowVersion};

/// Name of the seeded role that holds every permission.
pub const ADMINISTRATOR_ROLE: &str = "Administrator";

/// Named set of permissions assigned to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    /// Stable role id.
    pub id: Uuid,
    /// Unique role name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Granted permissions, sorted.
    pub permissions: Vec<Permission>,
    /// Seeded roles cannot be changed or deleted.
    pub is_system: bool,
    /// Concurrency token.
    pub row_version: RowVersion,
    /// Creation and update stamps.
    pub provenance: Provenance,
}

impl Role {
    /// Builds a new custom role.
    pub fn create(draft: RoleDraft, at: DateTime<Utc>, created_by: &str) -> AppResult<Self> {
        let draft = draft.normalize()?;
        Ok(Self {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            permissions: draft.permissions,
            is_system: false,
            row_version: RowVersion::INITIAL,
            provenance: Provenance::created(at, created_by),
        })
    }

    /// Returns the role with a draft applied.
    pub fn apply(&self, draft: RoleDraft, at: DateTime<Utc>, updated_by: &str) -> AppResult<Self> {
        self.ensure_editable()?;
        let draft = draft.normalize()?;
        Ok(Self {
            id: self.id,
            name: draft.name,
            description: draft.description,
            permissions: draft.permissions,
            is_system: false,
            row_version: self.row_version,
            provenance: self.provenance.touched(at, updated_by),
        })
    }

    /// Fails with a conflict for system roles.
    pub fn ensure_editable(&self) -> AppResult<()> {
        if self.is_system {
            return Err(AppError::Conflict(format!(
                "role '{}' is a system role and cannot be changed",
                self.name
            )));
        }

        Ok(())
    }
}

impl ChangeTracked for Role {
    const ENTITY_TYPE: &'static str = "Role";

    fn tracked_id(&self) -> String {
        self.id.to_string()
    }

    fn snapshot(&self) -> FieldSnapshot {
        let permissions = self
            .permissions
            .iter()
            .map(Permission::as_str)
            .collect::<Vec<_>>()
            .join(",");

        FieldSnapshot::new()
            .with("Name", &self.name)
            .with_optional("Description", self.description.as_ref())
            .with_optional("Permissions", (!permissions.is_empty()).then_some(permissions))
    }
}

/// Role attributes supplied on create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDraft {
    /// Role name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Granted permissions.
    pub permissions: Vec<Permission>,
}

impl RoleDraft {
    /// Validates the name; permissions are sorted and deduplicated.
    pub fn normalize(self) -> AppResult<Self> {
        let mut permissions = self.permissions;
        permissions.sort_unstable();
        permissions.dedup();

        Ok(Self {
            name: bounded_text("name", self.name, 100)?,
            description: optional_text(self.description),
            permissions,
        })
    }
}
