use thiserror::Error;

use crate::domain::RecordKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("no {} selected", parent.as_str())]
    ParentNotSelected { parent: RecordKind },
    #[error("{} not found: {key}", kind.as_str())]
    NotFound { kind: RecordKind, key: String },
    #[error("invalid input: {0}")]
    Validation(String),
}

impl InventoryError {
    pub fn not_found(kind: RecordKind, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
