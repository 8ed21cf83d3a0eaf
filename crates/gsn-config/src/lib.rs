pub mod dialect;
pub mod gsn;
pub mod logging;
pub mod runtime;
pub mod sensor;
pub mod storage;
pub mod types;
mod validate;

pub use dialect::Dialect;
pub use gsn::GsnConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use runtime::RuntimeConfig;
pub use sensor::{SensorConfig, SourceConfig};
pub use storage::StorageConfig;
pub use types::{HumanDuration, WindowAmount};
