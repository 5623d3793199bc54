use std::collections::HashMap;

use brokerdesk_domain::{ChangeType, collapse_change_types};
use uuid::Uuid;

use crate::{ChangeGroup, EntityChange, FieldChange, OperationHistory, OperationSummary};

/// Folds field rows into their operations.
///
/// Operations keep the order of `operations`; an operation without rows is
/// dropped. Within an operation the root group comes first, nested groups
/// follow in first-seen order and fields are ordered by name.
#[must_use]
pub fn group_operations(
    operations: Vec<OperationSummary>,
    changes: Vec<EntityChange>,
) -> Vec<OperationHistory> {
    let mut rows_by_operation: HashMap<Uuid, Vec<EntityChange>> = HashMap::new();
    for change in changes {
        rows_by_operation
            .entry(change.operation_id)
            .or_default()
            .push(change);
    }

    operations
        .into_iter()
        .filter_map(|summary| {
            let rows = rows_by_operation.remove(&summary.operation_id)?;
            Some(build_history(summary, rows))
        })
        .collect()
}

fn build_history(summary: OperationSummary, rows: Vec<EntityChange>) -> OperationHistory {
    let mut groups: Vec<ChangeGroup> = Vec::new();

    for row in rows {
        let field = FieldChange {
            field_name: row.field_name,
            change_type: row.change_type,
            old_value: row.old_value,
            new_value: row.new_value,
        };

        match groups.iter_mut().find(|group| {
            group.related_entity_type == row.related_entity_type
                && group.related_entity_id == row.related_entity_id
        }) {
            Some(group) => group.fields.push(field),
            None => groups.push(ChangeGroup {
                related_entity_type: row.related_entity_type,
                related_entity_id: row.related_entity_id,
                change_type: field.change_type,
                fields: vec![field],
            }),
        }
    }

    // Stable: nested groups keep their first-seen order.
    groups.sort_by_key(|group| {
        group.related_entity_type.is_some() || group.related_entity_id.is_some()
    });

    for group in &mut groups {
        group
            .fields
            .sort_by(|left, right| left.field_name.cmp(&right.field_name));
        group.change_type =
            collapse_change_types(group.fields.iter().map(|field| field.change_type))
                .unwrap_or(ChangeType::Modified);
    }

    let change_type = collapse_change_types(
        groups
            .iter()
            .flat_map(|group| group.fields.iter().map(|field| field.change_type)),
    )
    .unwrap_or(ChangeType::Modified);

    OperationHistory {
        operation_id: summary.operation_id,
        timestamp: summary.timestamp,
        user_id: summary.user_id,
        user_name: summary.user_name,
        entity_type: summary.entity_type,
        entity_id: summary.entity_id,
        change_type,
        groups,
    }
}
