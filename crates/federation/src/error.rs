use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

/// Failures surfaced by the loader. Cloneable so a single pending load can
/// hand the same outcome to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FederationError {
    #[error("remote '{0}' is not registered")]
    UnknownRemote(String),
    #[error("remote '{name}' is already registered at {existing}")]
    DuplicateRemote { name: String, existing: String },
    #[error("remote '{name}' is unavailable: {reason}")]
    RemoteUnavailable { name: String, reason: String },
    #[error("remote entry for '{name}' is malformed: {reason}")]
    RemoteEntryMalformed { name: String, reason: String },
    #[error("remote '{remote}' does not expose '{export}'")]
    ExportNotFound { remote: String, export: String },
}

impl FederationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownRemote(_) => ErrorCode::UnknownRemote,
            Self::DuplicateRemote { .. } => ErrorCode::DuplicateRemote,
            Self::RemoteUnavailable { .. } => ErrorCode::RemoteUnavailable,
            Self::RemoteEntryMalformed { .. } => ErrorCode::RemoteEntryMalformed,
            Self::ExportNotFound { .. } => ErrorCode::ExportNotFound,
        }
    }

    pub(crate) fn unavailable(name: &str, reason: impl ToString) -> Self {
        Self::RemoteUnavailable {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(name: &str, reason: impl ToString) -> Self {
        Self::RemoteEntryMalformed {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<FederationError> for ApiError {
    fn from(value: FederationError) -> Self {
        Self::new(value.code(), value.to_string())
    }
}
