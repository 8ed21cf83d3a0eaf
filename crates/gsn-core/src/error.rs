use derive_more::From;
use orion_error::{ErrorCode, StructError, UvsReason};

#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum CoreReason {
    /// Malformed window/slide strings, missing addressing, bad sampling.
    #[error("stream source validation error")]
    Validation,
    /// The relational backend rejected or failed a statement.
    #[error("storage backend error")]
    Storage,
    /// An operation was invoked out of order (no wrapper, not validated).
    #[error("call sequencing error")]
    Sequencing,
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for CoreReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Validation => 1001,
            Self::Storage => 1002,
            Self::Sequencing => 1003,
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type CoreError = StructError<CoreReason>;
pub type CoreResult<T> = Result<T, CoreError>;
