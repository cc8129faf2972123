use crate::snapshot::ValidationRule;
use crate::{AnnotationId, MAX_CHILDREN, MAX_TOTAL};
use thiserror::Error;

/// Recoverable failures surfaced to the user as a transient inline message.
/// None of them leave a partially applied mutation behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("Maximum {} items reached", MAX_TOTAL)]
    TotalLimitReached,
    #[error("Maximum {} items per section reached", MAX_CHILDREN)]
    ChildLimitReached { parent_id: AnnotationId },
    #[error("Parent [{0}] not found")]
    ParentNotFound(AnnotationId),
    #[error("Parent [{0}] is already nested under another item")]
    NestedParent(AnnotationId),
    #[error("No more item ids are available")]
    IdSpaceExhausted,
    #[error("No conversation session is active")]
    SessionUnresolved,
    #[error("Error importing file: {0}")]
    ImportParseFailure(String),
    #[error("Import rejected ({rule}): {detail}")]
    ImportRejected {
        rule: ValidationRule,
        detail: String,
    },
}

impl AnnotationError {
    pub(crate) fn rejected(rule: ValidationRule, detail: impl Into<String>) -> Self {
        Self::ImportRejected {
            rule,
            detail: detail.into(),
        }
    }
}
