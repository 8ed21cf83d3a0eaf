use std::sync::Arc;

use gsn_core::{StreamElement, WrapperHandlers};
use orion_error::prelude::*;
use orion_error::ErrorOweBase;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{RuntimeReason, RuntimeResult};
use crate::forwarder::WindowEvent;
use crate::retention_task::SensorRetention;

// ---------------------------------------------------------------------------
// TaskGroup
// ---------------------------------------------------------------------------

/// Named async tasks that are joined together on shutdown.
///
/// Groups are kept in start order (retention, then producers) and joined in
/// reverse, so producers finish their in-flight element before the last
/// retention sweep is awaited.
pub(crate) struct TaskGroup {
    pub(super) name: &'static str,
    handles: Vec<JoinHandle<anyhow::Result<()>>>,
}

impl TaskGroup {
    pub(super) fn new(name: &'static str) -> Self {
        Self {
            name,
            handles: Vec::new(),
        }
    }

    pub(super) fn push(&mut self, handle: JoinHandle<anyhow::Result<()>>) {
        self.handles.push(handle);
    }

    /// Join every task, returning the first failure.
    pub(super) async fn wait(self) -> RuntimeResult<()> {
        for handle in self.handles {
            handle
                .await
                .map_err(|e| {
                    StructError::from(RuntimeReason::Shutdown)
                        .with_detail(format!("task join error: {e}"))
                })?
                .owe(RuntimeReason::Shutdown)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BootstrapData
// ---------------------------------------------------------------------------

/// One wrapper's handlers together with the receiving end of its element
/// channel.
pub(super) struct WrapperPipe {
    pub handlers: Arc<WrapperHandlers>,
    pub rx: mpsc::Receiver<StreamElement>,
}

/// Everything bootstrap built, ready for task spawning.
pub(super) struct BootstrapData {
    pub pipes: Vec<WrapperPipe>,
    pub inputs: Vec<(String, mpsc::Sender<StreamElement>)>,
    pub sensors: Vec<SensorRetention>,
    pub window_rx: mpsc::Receiver<WindowEvent>,
    pub source_count: usize,
}
