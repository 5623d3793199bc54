use brokerdesk_core::UserIdentity;
use brokerdesk_domain::{ChangeTracked, FieldSnapshot, diff_snapshots};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::EntityChange;

/// Collects the field changes of one logical write under a single operation id.
///
/// The first tracked record passed to [`OperationRecorder::begin`] is the root;
/// nested records are tagged with their own type and id as the related entity.
#[derive(Debug, Clone)]
pub struct OperationRecorder {
    operation_id: Uuid,
    timestamp: DateTime<Utc>,
    user_id: Uuid,
    user_name: String,
    entity_type: String,
    entity_id: String,
    changes: Vec<EntityChange>,
}

impl OperationRecorder {
    /// Starts a new operation rooted at `root`.
    #[must_use]
    pub fn begin<T: ChangeTracked>(actor: &UserIdentity, root: &T, at: DateTime<Utc>) -> Self {
        Self {
            operation_id: Uuid::new_v4(),
            timestamp: at,
            user_id: actor.user_id(),
            user_name: actor.display_name().to_owned(),
            entity_type: T::ENTITY_TYPE.to_owned(),
            entity_id: root.tracked_id(),
            changes: Vec::new(),
        }
    }

    /// Returns the operation id shared by every recorded change.
    #[must_use]
    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }

    /// Records field changes of the root record.
    pub fn record<T: ChangeTracked>(&mut self, before: Option<&T>, after: Option<&T>) {
        let before = before.map(ChangeTracked::snapshot);
        let after = after.map(ChangeTracked::snapshot);
        self.push_diffs(None, before.as_ref(), after.as_ref());
    }

    /// Records field changes of one nested record.
    pub fn record_related<T: ChangeTracked>(&mut self, before: Option<&T>, after: Option<&T>) {
        let Some(related_id) = after.or(before).map(|value| value.tracked_id()) else {
            return;
        };

        let before = before.map(ChangeTracked::snapshot);
        let after = after.map(ChangeTracked::snapshot);
        self.push_diffs(
            Some((T::ENTITY_TYPE, related_id)),
            before.as_ref(),
            after.as_ref(),
        );
    }

    /// Records a nested collection, pairing records by tracked id.
    ///
    /// Records only in `before` are deleted, records only in `after` are created.
    pub fn record_related_set<T: ChangeTracked>(&mut self, before: &[T], after: &[T]) {
        for previous in before {
            let id = previous.tracked_id();
            let current = after.iter().find(|value| value.tracked_id() == id);
            self.record_related(Some(previous), current);
        }

        for current in after {
            let id = current.tracked_id();
            if !before.iter().any(|value| value.tracked_id() == id) {
                self.record_related(None, Some(current));
            }
        }
    }

    /// Returns whether no field changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Consumes the recorder, returning the rows to append.
    #[must_use]
    pub fn finish(self) -> Vec<EntityChange> {
        self.changes
    }

    fn push_diffs(
        &mut self,
        related: Option<(&str, String)>,
        before: Option<&FieldSnapshot>,
        after: Option<&FieldSnapshot>,
    ) {
        let (related_entity_type, related_entity_id) = match related {
            Some((entity_type, entity_id)) => (Some(entity_type.to_owned()), Some(entity_id)),
            None => (None, None),
        };

        for diff in diff_snapshots(before, after) {
            self.changes.push(EntityChange {
                id: Uuid::new_v4(),
                operation_id: self.operation_id,
                entity_type: self.entity_type.clone(),
                entity_id: self.entity_id.clone(),
                related_entity_type: related_entity_type.clone(),
                related_entity_id: related_entity_id.clone(),
                change_type: diff.change_type,
                field_name: diff.field_name,
                old_value: diff.old_value,
                new_value: diff.new_value,
                user_id: Some(self.user_id),
                user_name: Some(self.user_name.clone()),
                timestamp: self.timestamp,
            });
        }
    }
}
