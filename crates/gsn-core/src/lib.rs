pub mod element;
pub mod error;
pub mod retention;
pub mod rewriter;
pub mod sliding;
pub mod source;
pub mod sql;
pub mod storage;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod window;

pub use element::StreamElement;
pub use error::{CoreError, CoreReason, CoreResult};
pub use retention::{StoragePolicy, useless_data_removal};
pub use rewriter::{SqlViewRewriter, ViewQueryRewriter};
pub use sliding::{SlidingHandler, WrapperHandlers};
pub use source::{Addressing, SourceId, StreamSource, WindowListener, Wrapper};
pub use storage::{Dialect, FieldValue, Row, StorageEngine, ViewHelper};
pub use window::{WindowDescriptor, WindowKind};
