use crate::{
    AnnotationError, AnnotationId, AnnotationPatch, AnnotationRecord, NewAnnotation, MAX_CHILDREN,
    MAX_TOTAL,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const LEGACY_SOURCE_FIELD: &str = "fromChat";
const SOURCE_FIELD: &str = "fromSource";

/// Persisted contents of one session's slot: `{ "items": [...], "nextId": n }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub items: Vec<AnnotationRecord>,
    #[serde(default = "first_id")]
    pub next_id: AnnotationId,
}

fn first_id() -> AnnotationId {
    1
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_id: first_id(),
        }
    }
}

impl StoreSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: AnnotationId) -> Option<&AnnotationRecord> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn children(&self, parent_id: AnnotationId) -> impl Iterator<Item = &AnnotationRecord> {
        self.items
            .iter()
            .filter(move |item| item.parent_id == Some(parent_id))
    }

    pub fn child_count(&self, parent_id: AnnotationId) -> usize {
        self.children(parent_id).count()
    }

    /// Capacity and shape checks for a prospective insert, in the order the
    /// user sees them: total first, then the parent.
    pub fn check_insert(&self, parent_id: Option<AnnotationId>) -> Result<(), AnnotationError> {
        if self.items.len() >= MAX_TOTAL {
            return Err(AnnotationError::TotalLimitReached);
        }
        let Some(parent_id) = parent_id else {
            return Ok(());
        };
        let parent = self
            .get(parent_id)
            .ok_or(AnnotationError::ParentNotFound(parent_id))?;
        if parent.parent_id.is_some() {
            return Err(AnnotationError::NestedParent(parent_id));
        }
        if self.child_count(parent_id) >= MAX_CHILDREN {
            return Err(AnnotationError::ChildLimitReached { parent_id });
        }
        Ok(())
    }

    pub fn insert(
        &mut self,
        draft: NewAnnotation,
        created_at: String,
    ) -> Result<AnnotationRecord, AnnotationError> {
        self.check_insert(draft.parent_id)?;
        let next_id = self
            .next_id
            .checked_add(1)
            .ok_or(AnnotationError::IdSpaceExhausted)?;
        let record = AnnotationRecord {
            id: self.next_id,
            parent_id: draft.parent_id,
            content: draft.content,
            kind: draft.kind,
            completed: false,
            from_source: draft.from_source,
            created_at,
        };
        self.next_id = next_id;
        self.items.push(record.clone());
        Ok(record)
    }

    /// Returns `false` when no record has `id`.
    pub fn apply_patch(&mut self, id: AnnotationId, patch: &AnnotationPatch) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(record) => {
                patch.apply(record);
                true
            }
            None => false,
        }
    }

    /// Deletes `id` and promotes its children to roots. `nextId` is untouched,
    /// so the id is never handed out again.
    pub fn remove(&mut self, id: AnnotationId) -> Option<AnnotationRecord> {
        let index = self.items.iter().position(|item| item.id == id)?;
        let removed = self.items.remove(index);
        for item in &mut self.items {
            if item.parent_id == Some(id) {
                item.parent_id = None;
            }
        }
        Some(removed)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    /// Records that had no `fromSource` flag and were given one.
    pub backfilled: usize,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.backfilled == 0
    }
}

/// Parse a persisted or imported snapshot, normalising legacy records first.
///
/// Records written before capture tracking existed have no `fromSource`
/// flag; older builds wrote it as `fromChat`. Both become `fromSource`, with
/// `false` when neither is present. Running this on its own output is a no-op.
pub fn parse_snapshot(
    content: &str,
) -> Result<(StoreSnapshot, MigrationReport), serde_json::Error> {
    let mut raw: Value = serde_json::from_str(content)?;
    let report = migrate_value(&mut raw);
    let snapshot = serde_json::from_value(raw)?;
    Ok((snapshot, report))
}

fn migrate_value(raw: &mut Value) -> MigrationReport {
    let mut report = MigrationReport::default();
    let Some(items) = raw.get_mut("items").and_then(Value::as_array_mut) else {
        return report;
    };
    for item in items {
        let Some(fields) = item.as_object_mut() else {
            continue;
        };
        let legacy = fields.remove(LEGACY_SOURCE_FIELD);
        if fields.contains_key(SOURCE_FIELD) {
            continue;
        }
        let from_source = legacy.as_ref().and_then(Value::as_bool).unwrap_or(false);
        fields.insert(SOURCE_FIELD.to_string(), Value::Bool(from_source));
        report.backfilled += 1;
    }
    report
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationRule {
    TotalLimit,
    DuplicateId,
    MissingParent,
    NestedParent,
    ChildLimit,
    NextId,
}

impl ValidationRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationRule::TotalLimit => "total-limit",
            ValidationRule::DuplicateId => "duplicate-id",
            ValidationRule::MissingParent => "missing-parent",
            ValidationRule::NestedParent => "nested-parent",
            ValidationRule::ChildLimit => "child-limit",
            ValidationRule::NextId => "next-id",
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check a whole snapshot against the limits `insert` enforces one record at
/// a time. The first failing rule is reported.
pub fn validate_snapshot(snapshot: &StoreSnapshot) -> Result<(), AnnotationError> {
    if snapshot.items.len() > MAX_TOTAL {
        return Err(AnnotationError::rejected(
            ValidationRule::TotalLimit,
            format!("{} items exceeds {}", snapshot.items.len(), MAX_TOTAL),
        ));
    }

    let mut ids = BTreeSet::new();
    for item in &snapshot.items {
        if !ids.insert(item.id) {
            return Err(AnnotationError::rejected(
                ValidationRule::DuplicateId,
                format!("id [{}] appears more than once", item.id),
            ));
        }
    }

    for item in &snapshot.items {
        if let Some(parent_id) = item.parent_id {
            if !ids.contains(&parent_id) {
                return Err(AnnotationError::rejected(
                    ValidationRule::MissingParent,
                    format!("item [{}] points at missing parent [{}]", item.id, parent_id),
                ));
            }
        }
    }

    let mut child_counts: BTreeMap<AnnotationId, usize> = BTreeMap::new();
    for item in &snapshot.items {
        let Some(parent_id) = item.parent_id else {
            continue;
        };
        let nested = snapshot
            .get(parent_id)
            .is_some_and(|parent| parent.parent_id.is_some());
        if nested {
            return Err(AnnotationError::rejected(
                ValidationRule::NestedParent,
                format!("item [{}] is nested under child [{}]", item.id, parent_id),
            ));
        }
        *child_counts.entry(parent_id).or_default() += 1;
    }

    if let Some((parent_id, count)) = child_counts
        .iter()
        .find(|(_, count)| **count > MAX_CHILDREN)
    {
        return Err(AnnotationError::rejected(
            ValidationRule::ChildLimit,
            format!("parent [{parent_id}] has {count} children, max {MAX_CHILDREN}"),
        ));
    }

    let max_id = snapshot.items.iter().map(|item| item.id).max().unwrap_or(0);
    if snapshot.next_id <= max_id || snapshot.next_id == 0 {
        return Err(AnnotationError::rejected(
            ValidationRule::NextId,
            format!(
                "nextId {} must be greater than every id (max {})",
                snapshot.next_id, max_id
            ),
        ));
    }

    Ok(())
}
