use brokerdesk_domain::ChangeTracked;
use serde_json::Value;

/// Coarse before/after view of a mutated record for the request audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditSnapshot {
    /// Entity type label.
    pub entity_type: String,
    /// Entity identifier.
    pub entity_id: String,
    /// Tracked fields before the write.
    pub old_values: Option<Value>,
    /// Tracked fields after the write.
    pub new_values: Option<Value>,
}

impl AuditSnapshot {
    /// Builds a snapshot from the tracked state on both sides of a write.
    #[must_use]
    pub fn of<T: ChangeTracked>(before: Option<&T>, after: Option<&T>) -> Self {
        let entity_id = after
            .or(before)
            .map(|value| value.tracked_id())
            .unwrap_or_default();

        Self {
            entity_type: T::ENTITY_TYPE.to_owned(),
            entity_id,
            old_values: before.map(|value| value.snapshot().to_json()),
            new_values: after.map(|value| value.snapshot().to_json()),
        }
    }
}

/// Result of a write command: the resulting value plus its audit snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation<T> {
    /// Written value.
    pub value: T,
    /// Audit snapshot for the interceptor.
    pub audit: AuditSnapshot,
}

impl<T: ChangeTracked> Mutation<T> {
    /// Wraps a newly created record.
    #[must_use]
    pub fn created(value: T) -> Self {
        let audit = AuditSnapshot::of(None, Some(&value));
        Self { value, audit }
    }

    /// Wraps an updated record.
    #[must_use]
    pub fn updated(before: &T, value: T) -> Self {
        let audit = AuditSnapshot::of(Some(before), Some(&value));
        Self { value, audit }
    }
}

impl Mutation<()> {
    /// Wraps a deleted record.
    #[must_use]
    pub fn deleted<T: ChangeTracked>(before: &T) -> Self {
        Self {
            value: (),
            audit: AuditSnapshot::of(Some(before), None),
        }
    }
}
