use crate::{SlotStore, StorageError};
use chrono::NaiveDate;
use sidenote_core::{
    now_timestamp, parse_snapshot, validate_snapshot, AnnotationError, AnnotationId,
    AnnotationPatch, AnnotationRecord, NewAnnotation, SessionKey, StoreSnapshot,
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StoreError {
    /// The user-facing rejection, if this is one rather than a backend failure.
    pub fn annotation(&self) -> Option<&AnnotationError> {
        match self {
            StoreError::Annotation(err) => Some(err),
            StoreError::Storage(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub records: usize,
    pub backfilled: usize,
}

/// Annotation store for the active session key.
///
/// Holds no snapshot between calls: every operation re-reads the slot, applies
/// its change and writes the whole snapshot back. With no key every mutation
/// fails with `SessionUnresolved` and `load` returns an empty store.
#[derive(Debug)]
pub struct AnnotationStore<S> {
    slots: S,
    key: Option<SessionKey>,
}

impl<S: SlotStore> AnnotationStore<S> {
    pub fn new(slots: S, key: Option<SessionKey>) -> Self {
        Self { slots, key }
    }

    pub fn key(&self) -> Option<&SessionKey> {
        self.key.as_ref()
    }

    /// Point the store at another session. Nothing is cached, so the next
    /// `load` reads the new slot.
    pub fn set_key(&mut self, key: Option<SessionKey>) {
        self.key = key;
    }

    pub fn slots(&self) -> &S {
        &self.slots
    }

    pub fn into_slots(self) -> S {
        self.slots
    }

    fn active_key(&self) -> Result<&SessionKey, AnnotationError> {
        self.key.as_ref().ok_or(AnnotationError::SessionUnresolved)
    }

    pub fn load(&self) -> Result<StoreSnapshot, StorageError> {
        let Some(key) = self.key.as_ref() else {
            return Ok(StoreSnapshot::new());
        };
        let Some(content) = self.slots.get(key)? else {
            return Ok(StoreSnapshot::new());
        };
        let (snapshot, report) = parse_snapshot(&content).map_err(|err| StorageError::Corrupt {
            key: key.to_string(),
            reason: err.to_string(),
        })?;
        if !report.is_noop() {
            debug!(event = "slot_migrated", key = %key, backfilled = report.backfilled);
        }
        Ok(snapshot)
    }

    fn persist(&mut self, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
        let key = self.active_key()?.clone();
        let payload = serde_json::to_string(snapshot)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.slots.put(&key, &payload)?;
        Ok(())
    }

    pub fn create(&mut self, draft: NewAnnotation) -> Result<AnnotationRecord, StoreError> {
        self.active_key()?;
        let mut snapshot = self.load()?;
        let record = snapshot.insert(draft, now_timestamp())?;
        self.persist(&snapshot)?;
        debug!(
            event = "annotation_created",
            id = record.id,
            parent_id = ?record.parent_id,
            kind = %record.kind
        );
        Ok(record)
    }

    /// Returns `false` without writing when `id` is unknown.
    pub fn update(
        &mut self,
        id: AnnotationId,
        patch: &AnnotationPatch,
    ) -> Result<bool, StoreError> {
        self.active_key()?;
        let mut snapshot = self.load()?;
        if !snapshot.apply_patch(id, patch) {
            return Ok(false);
        }
        self.persist(&snapshot)?;
        Ok(true)
    }

    /// Deletes `id`; its children become roots.
    pub fn remove(&mut self, id: AnnotationId) -> Result<bool, StoreError> {
        self.active_key()?;
        let mut snapshot = self.load()?;
        let Some(removed) = snapshot.remove(id) else {
            return Ok(false);
        };
        self.persist(&snapshot)?;
        debug!(event = "annotation_removed", id = removed.id);
        Ok(true)
    }

    /// Overwrite the slot with `snapshot` after checking it against the same
    /// limits `create` enforces.
    pub fn replace_all(&mut self, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
        self.active_key()?;
        validate_snapshot(snapshot)?;
        self.persist(snapshot)
    }

    pub fn import_json(&mut self, content: &str) -> Result<ImportReport, StoreError> {
        self.active_key()?;
        let (snapshot, migration) = parse_snapshot(content)
            .map_err(|err| AnnotationError::ImportParseFailure(err.to_string()))?;
        self.replace_all(&snapshot)?;
        let report = ImportReport {
            records: snapshot.len(),
            backfilled: migration.backfilled,
        };
        info!(
            event = "store_imported",
            key = %self.active_key()?,
            records = report.records,
            backfilled = report.backfilled
        );
        Ok(report)
    }

    pub fn export_json(&self) -> Result<String, StoreError> {
        let snapshot = self.load()?;
        serde_json::to_string_pretty(&snapshot)
            .map_err(|err| StorageError::Serialization(err.to_string()).into())
    }
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("sidenote-{}.json", date.format("%Y-%m-%d"))
}
