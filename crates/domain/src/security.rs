use std::str::FromStr;

use brokerdesk_core::AppError;
use serde::{Deserialize, Serialize};

/// Permission codes enforced by application policy checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    /// Allows reading clients.
    ClientsRead,
    /// Allows creating clients.
    ClientsCreate,
    /// Allows updating clients, their addresses and investment profile.
    ClientsUpdate,
    /// Allows deleting clients.
    ClientsDelete,
    /// Allows reading accounts and account holders.
    AccountsRead,
    /// Allows creating accounts.
    AccountsCreate,
    /// Allows updating accounts and managing account holders.
    AccountsUpdate,
    /// Allows deleting accounts.
    AccountsDelete,
    /// Allows reading instruments.
    InstrumentsRead,
    /// Allows creating instruments.
    InstrumentsCreate,
    /// Allows updating instruments.
    InstrumentsUpdate,
    /// Allows deleting instruments.
    InstrumentsDelete,
    /// Allows reading orders.
    OrdersRead,
    /// Allows creating orders.
    OrdersCreate,
    /// Allows updating orders.
    OrdersUpdate,
    /// Allows deleting orders.
    OrdersDelete,
    /// Allows reading transactions.
    TransactionsRead,
    /// Allows creating transactions.
    TransactionsCreate,
    /// Allows updating transactions.
    TransactionsUpdate,
    /// Allows deleting transactions.
    TransactionsDelete,
    /// Allows reading back-office users.
    UsersRead,
    /// Allows creating back-office users.
    UsersCreate,
    /// Allows updating back-office users.
    UsersUpdate,
    /// Allows deleting back-office users.
    UsersDelete,
    /// Allows reading roles.
    RolesRead,
    /// Allows creating roles.
    RolesCreate,
    /// Allows updating roles.
    RolesUpdate,
    /// Allows deleting roles.
    RolesDelete,
    /// Allows reading the permission catalog.
    PermissionsRead,
    /// Allows reading the request audit log.
    AuditRead,
    /// Allows reading field-level change history.
    AuditChangesRead,
}

impl Permission {
    /// Returns a stable storage value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientsRead => "clients.read",
            Self::ClientsCreate => "clients.create",
            Self::ClientsUpdate => "clients.update",
            Self::ClientsDelete => "clients.delete",
            Self::AccountsRead => "accounts.read",
            Self::AccountsCreate => "accounts.create",
            Self::AccountsUpdate => "accounts.update",
            Self::AccountsDelete => "accounts.delete",
            Self::InstrumentsRead => "instruments.read",
            Self::InstrumentsCreate => "instruments.create",
            Self::InstrumentsUpdate => "instruments.update",
            Self::InstrumentsDelete => "instruments.delete",
            Self::OrdersRead => "orders.read",
            Self::OrdersCreate => "orders.create",
            Self::OrdersUpdate => "orders.update",
            Self::OrdersDelete => "orders.delete",
            Self::TransactionsRead => "transactions.read",
            Self::TransactionsCreate => "transactions.create",
            Self::TransactionsUpdate => "transactions.update",
            Self::TransactionsDelete => "transactions.delete",
            Self::UsersRead => "users.read",
            Self::UsersCreate => "users.create",
            Self::UsersUpdate => "users.update",
            Self::UsersDelete => "users.delete",
            Self::RolesRead => "roles.read",
            Self::RolesCreate => "roles.create",
            Self::RolesUpdate => "roles.update",
            Self::RolesDelete => "roles.delete",
            Self::PermissionsRead => "permissions.read",
            Self::AuditRead => "audit.read",
            Self::AuditChangesRead => "audit.changes.read",
        }
    }

    /// Returns the catalog group used by the admin UI (`clients`, `audit`, ...).
    #[must_use]
    pub fn group(&self) -> &'static str {
        self.as_str().split('.').next().unwrap_or_default()
    }

    /// Returns all known permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Permission] = &[
            Permission::ClientsRead,
            Permission::ClientsCreate,
            Permission::ClientsUpdate,
            Permission::ClientsDelete,
            Permission::AccountsRead,
            Permission::AccountsCreate,
            Permission::AccountsUpdate,
            Permission::AccountsDelete,
            Permission::InstrumentsRead,
            Permission::InstrumentsCreate,
            Permission::InstrumentsUpdate,
            Permission::InstrumentsDelete,
            Permission::OrdersRead,
            Permission::OrdersCreate,
            Permission::OrdersUpdate,
            Permission::OrdersDelete,
            Permission::TransactionsRead,
            Permission::TransactionsCreate,
            Permission::TransactionsUpdate,
            Permission::TransactionsDelete,
            Permission::UsersRead,
            Permission::UsersCreate,
            Permission::UsersUpdate,
            Permission::UsersDelete,
            Permission::RolesRead,
            Permission::RolesCreate,
            Permission::RolesUpdate,
            Permission::RolesDelete,
            Permission::PermissionsRead,
            Permission::AuditRead,
            Permission::AuditChangesRead,
        ];

        ALL
    }

    /// Parses a transport value into a permission.
    pub fn from_transport(value: &str) -> Result<Self, AppError> {
        Self::from_str(value)
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown permission value '{value}'")))
    }
}

storage_enum! {
    /// Stable audit actions written to the request audit log.
    pub enum AuditAction {
        /// A resource was created.
        Create => "Create",
        /// A resource was updated.
        Update => "Update",
        /// A resource was deleted.
        Delete => "Delete",
        /// A user signed in.
        Login => "Login",
        /// A user exchanged a refresh token.
        TokenRefresh => "TokenRefresh",
        /// A user signed out.
        Logout => "Logout",
    }
}

impl AuditAction {
    /// Derives the audit action for a mutating HTTP method.
    #[must_use]
    pub fn for_method(method: &str) -> Option<Self> {
        match method {
            "POST" => Some(Self::Create),
            "PUT" | "PATCH" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::str::FromStr;

    use super::{AuditAction, Permission};

    #[test]
    fn permission_roundtrip_storage_value() {
        for permission in Permission::all() {
            let restored = Permission::from_str(permission.as_str());
            assert_eq!(restored.ok(), Some(*permission));
        }
    }

    #[test]
    fn permission_codes_are_unique() {
        let codes: HashSet<&str> = Permission::all().iter().map(Permission::as_str).collect();
        assert_eq!(codes.len(), Permission::all().len());
    }

    #[test]
    fn unknown_permission_is_rejected() {
        let parsed = Permission::from_str("clients.archive");
        assert!(parsed.is_err());
    }

    #[test]
    fn permission_group_is_code_prefix() {
        assert_eq!(Permission::AuditChangesRead.group(), "audit");
        assert_eq!(Permission::OrdersUpdate.group(), "orders");
    }

    #[test]
    fn audit_action_follows_http_method() {
        assert_eq!(AuditAction::for_method("POST"), Some(AuditAction::Create));
        assert_eq!(AuditAction::for_method("PATCH"), Some(AuditAction::Update));
        assert_eq!(AuditAction::for_method("GET"), None);
    }
}
