use std::path::PathBuf;
use thiserror::Error;

pub mod slots;
pub mod store;

pub use slots::{FileSlots, MemorySlots, SlotStore};
pub use store::{export_file_name, AnnotationStore, ImportReport, StoreError};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("stored data for '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
