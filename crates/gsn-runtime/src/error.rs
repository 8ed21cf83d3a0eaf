use derive_more::From;
use gsn_core::CoreReason;
use orion_error::{ErrorCode, StructError, UvsReason};

#[derive(Debug, Clone, PartialEq, thiserror::Error, From)]
pub enum RuntimeReason {
    /// Helper table, wrapper or sensor setup failed.
    #[error("bootstrap error")]
    Bootstrap,
    /// A task panicked or failed while draining.
    #[error("shutdown error")]
    Shutdown,
    /// Unknown wrapper, or its producer is gone.
    #[error("element channel error")]
    Channel,
    #[error("{0}")]
    Core(CoreReason),
    #[error("{0}")]
    Uvs(UvsReason),
}

impl ErrorCode for RuntimeReason {
    fn error_code(&self) -> i32 {
        match self {
            Self::Bootstrap => 2001,
            Self::Shutdown => 2002,
            Self::Channel => 2003,
            Self::Core(c) => c.error_code(),
            Self::Uvs(u) => u.error_code(),
        }
    }
}

pub type RuntimeError = StructError<RuntimeReason>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;
