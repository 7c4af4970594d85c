use std::io;
use std::path::Path;

use thiserror::Error;

/// Failures surfaced by the shader store. `Validation` covers anything the
/// caller can fix by sending a different request; `Storage` wraps filesystem
/// failures other than the benign not-found cases the store absorbs itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn storage(context: impl Into<String>, source: io::Error) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn io_at(action: &str, path: &Path, source: io::Error) -> Self {
        Self::storage(format!("failed to {action} {}", path.display()), source)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
