#[macro_use]
mod log_macros;

pub mod error;
mod forwarder;
pub mod lifecycle;
mod producer;
mod retention_task;
pub mod tracing_init;
pub mod wrapper;

pub use forwarder::WindowEvent;
