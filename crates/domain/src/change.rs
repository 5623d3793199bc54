//! Field-level change tracking.
//!
//! Tracked records expose a flat [`FieldSnapshot`] of stringified values.
//! [`diff_snapshots`] compares two snapshots of the same record and yields one
//! [`FieldDiff`] per changed field; the application layer stamps those diffs with
//! an operation id and persists them as entity change rows.

use serde_json::{Map, Value};

storage_enum! {
    /// Kind of change applied to a field, a change group or a whole operation.
    pub enum ChangeType {
        /// The record did not exist before the operation.
        Created => "Created",
        /// The record existed before and after the operation.
        Modified => "Modified",
        /// The record no longer exists after the operation.
        Deleted => "Deleted",
    }
}

/// Collapses the change types of several field changes into one display type.
///
/// A uniform sequence keeps its type; any mix collapses to [`ChangeType::Modified`].
/// Returns `None` for an empty sequence.
pub fn collapse_change_types(types: impl IntoIterator<Item = ChangeType>) -> Option<ChangeType> {
    let mut types = types.into_iter();
    let first = types.next()?;

    if types.all(|change_type| change_type == first) {
        Some(first)
    } else {
        Some(ChangeType::Modified)
    }
}

/// Ordered set of stringified field values describing one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSnapshot {
    fields: Vec<(&'static str, Option<String>)>,
}

impl FieldSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field with a present value.
    #[must_use]
    pub fn with(self, name: &'static str, value: impl ToString) -> Self {
        self.with_optional(name, Some(value))
    }

    /// Adds a field whose value may be absent.
    #[must_use]
    pub fn with_optional(mut self, name: &'static str, value: Option<impl ToString>) -> Self {
        self.fields
            .push((name, value.map(|value| value.to_string())));
        self
    }

    /// Returns the value recorded for a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Returns whether the snapshot declares the field.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(field, _)| *field == name)
    }

    /// Iterates fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> {
        self.fields
            .iter()
            .map(|(field, value)| (*field, value.as_deref()))
    }

    /// Renders the snapshot as a JSON object for coarse audit payloads.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let object: Map<String, Value> = self
            .fields
            .iter()
            .map(|(field, value)| {
                (
                    (*field).to_owned(),
                    value.clone().map(Value::String).unwrap_or(Value::Null),
                )
            })
            .collect();

        Value::Object(object)
    }
}

/// One changed field between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    /// Field name.
    pub field_name: String,
    /// Field-level change type.
    pub change_type: ChangeType,
    /// Value before the operation.
    pub old_value: Option<String>,
    /// Value after the operation.
    pub new_value: Option<String>,
}

/// Record whose fields participate in change history.
pub trait ChangeTracked {
    /// Entity type label stored with every change row.
    const ENTITY_TYPE: &'static str;

    /// Identifier stored with every change row.
    fn tracked_id(&self) -> String;

    /// Current tracked field values. Provenance and row versions are never included.
    fn snapshot(&self) -> FieldSnapshot;
}

/// Computes field-level differences between two snapshots of one record.
///
/// * `None -> Some`: every present field of `after` is `Created`.
/// * `Some -> None`: every present field of `before` is `Deleted`.
/// * `Some -> Some`: every field whose value differs is `Modified`.
#[must_use]
pub fn diff_snapshots(
    before: Option<&FieldSnapshot>,
    after: Option<&FieldSnapshot>,
) -> Vec<FieldDiff> {
    match (before, after) {
        (None, None) => Vec::new(),
        (None, Some(after)) => after
            .iter()
            .filter_map(|(field, value)| {
                value.map(|value| FieldDiff {
                    field_name: field.to_owned(),
                    change_type: ChangeType::Created,
                    old_value: None,
                    new_value: Some(value.to_owned()),
                })
            })
            .collect(),
        (Some(before), None) => before
            .iter()
            .filter_map(|(field, value)| {
                value.map(|value| FieldDiff {
                    field_name: field.to_owned(),
                    change_type: ChangeType::Deleted,
                    old_value: Some(value.to_owned()),
                    new_value: None,
                })
            })
            .collect(),
        (Some(before), Some(after)) => {
            let mut diffs: Vec<FieldDiff> = after
                .iter()
                .filter_map(|(field, new_value)| {
                    let old_value = before.get(field);
                    (old_value != new_value).then(|| FieldDiff {
                        field_name: field.to_owned(),
                        change_type: ChangeType::Modified,
                        old_value: old_value.map(ToOwned::to_owned),
                        new_value: new_value.map(ToOwned::to_owned),
                    })
                })
                .collect();

            diffs.extend(before.iter().filter_map(|(field, old_value)| {
                let removed = !after.contains(field);
                match (removed, old_value) {
                    (true, Some(old_value)) => Some(FieldDiff {
                        field_name: field.to_owned(),
                        change_type: ChangeType::Modified,
                        old_value: Some(old_value.to_owned()),
                        new_value: None,
                    }),
                    _ => None,
                }
            }));

            diffs
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{ChangeType, FieldSnapshot, collapse_change_types, diff_snapshots};

    fn snapshot(city: &str, line2: Option<&str>) -> FieldSnapshot {
        FieldSnapshot::new()
            .with("city", city)
            .with_optional("line2", line2)
    }

    #[test]
    fn creation_reports_present_fields_only() {
        let after = snapshot("Zurich", None);
        let diffs = diff_snapshots(None, Some(&after));

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field_name, "city");
        assert_eq!(diffs[0].change_type, ChangeType::Created);
        assert_eq!(diffs[0].new_value.as_deref(), Some("Zurich"));
    }

    #[test]
    fn deletion_reports_old_values() {
        let before = snapshot("Zurich", Some("Floor 2"));
        let diffs = diff_snapshots(Some(&before), None);

        assert_eq!(diffs.len(), 2);
        assert!(diffs.iter().all(|diff| diff.change_type == ChangeType::Deleted));
        assert!(diffs.iter().all(|diff| diff.new_value.is_none()));
    }

    #[test]
    fn modification_reports_only_changed_fields() {
        let before = snapshot("Zurich", None);
        let after = snapshot("Geneva", None);
        let diffs = diff_snapshots(Some(&before), Some(&after));

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].old_value.as_deref(), Some("Zurich"));
        assert_eq!(diffs[0].new_value.as_deref(), Some("Geneva"));
        assert_eq!(diffs[0].change_type, ChangeType::Modified);
    }

    #[test]
    fn clearing_optional_field_is_modification() {
        let before = snapshot("Zurich", Some("Floor 2"));
        let after = snapshot("Zurich", None);
        let diffs = diff_snapshots(Some(&before), Some(&after));

        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field_name, "line2");
        assert_eq!(diffs[0].new_value, None);
    }

    #[test]
    fn snapshot_json_uses_null_for_absent_values() {
        let json = snapshot("Zurich", None).to_json();
        assert_eq!(json["city"], "Zurich");
        assert!(json["line2"].is_null());
    }

    #[test]
    fn empty_sequence_has_no_display_type() {
        assert_eq!(collapse_change_types(Vec::new()), None);
    }

    #[test]
    fn created_and_modified_collapse_to_modified() {
        let collapsed = collapse_change_types([ChangeType::Created, ChangeType::Modified]);
        assert_eq!(collapsed, Some(ChangeType::Modified));
    }

    fn change_type_strategy() -> impl Strategy<Value = ChangeType> {
        prop_oneof![
            Just(ChangeType::Created),
            Just(ChangeType::Modified),
            Just(ChangeType::Deleted),
        ]
    }

    proptest! {
        #[test]
        fn collapsed_type_is_uniform_type_or_modified(
            types in proptest::collection::vec(change_type_strategy(), 1..20)
        ) {
            let collapsed = collapse_change_types(types.iter().copied());
            let uniform = types.iter().all(|value| *value == types[0]);

            if uniform {
                prop_assert_eq!(collapsed, Some(types[0]));
            } else {
                prop_assert_eq!(collapsed, Some(ChangeType::Modified));
            }
        }

        #[test]
        fn identical_snapshots_have_no_diff(
            city in "[A-Za-z ]{1,20}",
            line2 in proptest::option::of("[0-9a-z]{1,8}"),
        ) {
            let value = snapshot(&city, line2.as_deref());
            prop_assert!(diff_snapshots(Some(&value), Some(&value)).is_empty());
        }
    }
}
