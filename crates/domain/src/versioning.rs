use brokerdesk_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Optimistic-concurrency token carried by every mutable record.
///
/// Starts at [`RowVersion::INITIAL`] and is incremented by the repository on every
/// successful update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowVersion(i64);

impl RowVersion {
    /// Version assigned on insert.
    pub const INITIAL: Self = Self(1);

    /// Wraps a stored version value.
    #[must_use]
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw version value.
    #[must_use]
    pub fn value(self) -> i64 {
        self.0
    }

    /// Returns the version that follows this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Fails with a conflict when the caller's token is not the current version.
    pub fn ensure_matches(
        self,
        expected: RowVersion,
        entity_type: &str,
        id: &str,
    ) -> AppResult<()> {
        if self == expected {
            return Ok(());
        }

        Err(stale_version(entity_type, id))
    }
}

impl std::fmt::Display for RowVersion {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Conflict error for a stale or mismatched row version.
#[must_use]
pub fn stale_version(entity_type: &str, id: &str) -> AppError {
    AppError::Conflict(format!(
        "{entity_type} '{id}' was modified by another user; reload and retry"
    ))
}

/// Who created and last touched a record, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Creating user name.
    pub created_by: Option<String>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
    /// Last updating user name.
    pub updated_by: Option<String>,
}

impl Provenance {
    /// Provenance for a record created now by `created_by`.
    #[must_use]
    pub fn created(at: DateTime<Utc>, created_by: &str) -> Self {
        Self {
            created_at: at,
            created_by: Some(created_by.to_owned()),
            updated_at: None,
            updated_by: None,
        }
    }

    /// Returns a copy stamped with an update.
    #[must_use]
    pub fn touched(&self, at: DateTime<Utc>, updated_by: &str) -> Self {
        Self {
            created_at: self.created_at,
            created_by: self.created_by.clone(),
            updated_at: Some(at),
            updated_by: Some(updated_by.to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use brokerdesk_core::AppError;

    use super::RowVersion;

    #[test]
    fn next_increments_version() {
        assert_eq!(RowVersion::INITIAL.next(), RowVersion::new(2));
    }

    #[test]
    fn mismatched_version_is_conflict() {
        let result = RowVersion::new(3).ensure_matches(RowVersion::new(2), "Client", "c-1");
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[test]
    fn matching_version_passes() {
        assert!(
            RowVersion::new(4)
                .ensure_matches(RowVersion::new(4), "Client", "c-1")
                .is_ok()
        );
    }
}
