use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub mod capture;
pub mod error;
pub mod session;
pub mod snapshot;
pub mod tree;

pub use error::AnnotationError;
pub use session::{resolve, PageLocation, Platform, SessionChange, SessionKey, SessionWatcher};
pub use snapshot::{
    parse_snapshot, validate_snapshot, MigrationReport, StoreSnapshot, ValidationRule,
};
pub use tree::{AnnotationTree, TreeNode};

pub const MAX_CHILDREN: usize = 20;
pub const MAX_TOTAL: usize = 100;
pub const MIN_CAPTURE_WORDS: usize = 4;
pub const HIGHLIGHT_DURATION: Duration = Duration::from_millis(5_000);
pub const NOTICE_DURATION: Duration = Duration::from_millis(4_000);
pub const POPUP_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const SESSION_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub type AnnotationId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Todo,
    Finding,
    Question,
}

impl Default for AnnotationKind {
    fn default() -> Self {
        Self::Finding
    }
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Todo => "todo",
            AnnotationKind::Finding => "finding",
            AnnotationKind::Question => "question",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            AnnotationKind::Todo => "✓",
            AnnotationKind::Finding => "💡",
            AnnotationKind::Question => "❓",
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnotationKind {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "todo" => Ok(AnnotationKind::Todo),
            "finding" | "note" => Ok(AnnotationKind::Finding),
            "question" => Ok(AnnotationKind::Question),
            other => Err(format!("Unknown annotation kind: {other}")),
        }
    }
}

/// One note, todo or question attached to a conversation.
///
/// Field names on the wire follow the persisted browser format, so `kind`
/// is stored under `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub id: AnnotationId,
    #[serde(default)]
    pub parent_id: Option<AnnotationId>,
    pub content: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: AnnotationKind,
    #[serde(default)]
    pub completed: bool,
    pub from_source: bool,
    #[serde(default)]
    pub created_at: String,
}

impl AnnotationRecord {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Input for a new record; ids and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnnotation {
    pub parent_id: Option<AnnotationId>,
    pub content: String,
    pub kind: AnnotationKind,
    pub from_source: bool,
}

impl NewAnnotation {
    pub fn root(content: impl Into<String>, kind: AnnotationKind) -> Self {
        Self {
            parent_id: None,
            content: content.into(),
            kind,
            from_source: false,
        }
    }

    pub fn child(
        parent_id: AnnotationId,
        content: impl Into<String>,
        kind: AnnotationKind,
    ) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::root(content, kind)
        }
    }

    pub fn captured(mut self) -> Self {
        self.from_source = true;
        self
    }
}

/// Partial update merged into an existing record. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        rename = "type",
        alias = "kind",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<AnnotationKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl AnnotationPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.kind.is_none() && self.completed.is_none()
    }

    pub fn apply(&self, record: &mut AnnotationRecord) {
        if let Some(content) = &self.content {
            record.content = content.clone();
        }
        if let Some(kind) = self.kind {
            record.kind = kind;
        }
        if let Some(completed) = self.completed {
            record.completed = completed;
        }
    }
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
