mod bootstrap;
mod types;

use std::collections::HashMap;
use std::sync::Arc;

use gsn_config::GsnConfig;
use gsn_core::{StorageEngine, StreamElement, WrapperHandlers};
use orion_error::op_context;
use orion_error::prelude::*;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{RuntimeReason, RuntimeResult};
use crate::forwarder::WindowEvent;
use crate::producer::run_producer;
use crate::retention_task::run_retention;

use bootstrap::bootstrap;
use types::TaskGroup;

// ---------------------------------------------------------------------------
// Reactor
// ---------------------------------------------------------------------------

/// Runs the windowing engine: bootstrap, one producer per wrapper, the
/// periodic retention sweep and an orderly stop.
///
/// Elements enter through [`publish`](Self::publish) (or a sender from
/// [`input`](Self::input)); every slid window is delivered as a
/// [`WindowEvent`] on the channel returned by
/// [`take_window_events`](Self::take_window_events).
pub struct Reactor {
    cancel: CancellationToken,
    groups: Vec<TaskGroup>,
    inputs: HashMap<String, mpsc::Sender<StreamElement>>,
    handlers: Vec<Arc<WrapperHandlers>>,
    window_rx: Option<mpsc::Receiver<WindowEvent>>,
    source_count: usize,
}

impl Reactor {
    #[tracing::instrument(name = "gsn.start", skip_all, fields(dialect = %config.storage.dialect))]
    pub async fn start(config: GsnConfig, storage: Arc<dyn StorageEngine>) -> RuntimeResult<Self> {
        let mut op = op_context!("gsn-bootstrap").with_auto_log();
        op.record("helper_table", config.storage.helper_table.as_str());
        op.record("sensors", config.sensors.len().to_string().as_str());

        let cancel = CancellationToken::new();
        let interval = config.runtime.retention_interval.as_duration();

        let boot_storage = Arc::clone(&storage);
        let data = tokio::task::spawn_blocking(move || bootstrap(&config, boot_storage))
            .await
            .map_err(|e| {
                StructError::from(RuntimeReason::Bootstrap)
                    .with_detail(format!("bootstrap task failed: {e}"))
            })??;

        let handlers: Vec<Arc<WrapperHandlers>> =
            data.pipes.iter().map(|p| Arc::clone(&p.handlers)).collect();
        gsn_info!(
            sys,
            wrappers = handlers.len(),
            sources = data.source_count,
            sensors_with_retention = data.sensors.len(),
            "bootstrap complete"
        );

        // start order: retention, producers
        let mut groups = Vec::with_capacity(2);

        let mut retention = TaskGroup::new("retention");
        retention.push(tokio::spawn(run_retention(
            handlers.clone(),
            data.sensors,
            Arc::clone(&storage),
            interval,
            cancel.child_token(),
        )));
        groups.push(retention);

        let mut producers = TaskGroup::new("producers");
        for pipe in data.pipes {
            producers.push(tokio::spawn(run_producer(
                pipe.handlers,
                Arc::clone(&storage),
                pipe.rx,
                cancel.child_token(),
            )));
        }
        groups.push(producers);

        op.mark_suc();
        Ok(Self {
            cancel,
            groups,
            inputs: data.inputs.into_iter().collect(),
            handlers,
            window_rx: Some(data.window_rx),
            source_count: data.source_count,
        })
    }

    /// Sender feeding the producer of `wrapper`.
    pub fn input(&self, wrapper: &str) -> Option<mpsc::Sender<StreamElement>> {
        self.inputs.get(wrapper).cloned()
    }

    /// Hand one element to the producer of `wrapper`, waiting for channel
    /// capacity.
    pub async fn publish(&self, wrapper: &str, element: StreamElement) -> RuntimeResult<()> {
        let Some(tx) = self.inputs.get(wrapper) else {
            return StructError::from(RuntimeReason::Channel)
                .with_detail(format!("unknown wrapper {wrapper:?}"))
                .err();
        };
        tx.send(element).await.map_err(|_| {
            StructError::from(RuntimeReason::Channel)
                .with_detail(format!("producer of wrapper {wrapper:?} has stopped"))
        })
    }

    /// The slid-window channel. Available once; later calls return `None`.
    pub fn take_window_events(&mut self) -> Option<mpsc::Receiver<WindowEvent>> {
        self.window_rx.take()
    }

    /// Number of stream sources that were attached successfully.
    pub fn source_count(&self) -> usize {
        self.source_count
    }

    pub fn wrappers(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|h| h.wrapper().name())
    }

    pub fn shutdown(&self) {
        gsn_info!(sys, "shutdown requested");
        self.cancel.cancel();
    }

    /// Stop every task (if [`shutdown`](Self::shutdown) was not called
    /// already), join the task groups in reverse start order, then dispose
    /// every handler so views and watermark rows are dropped.
    pub async fn wait(mut self) -> RuntimeResult<()> {
        self.cancel.cancel();
        self.inputs.clear();
        while let Some(group) = self.groups.pop() {
            let name = group.name;
            gsn_debug!(sys, task_group = name, "waiting for task group");
            if let Err(e) = group.wait().await {
                gsn_error!(sys, task_group = name, error = %e, "task group failed");
                return Err(e);
            }
            gsn_debug!(sys, task_group = name, "task group finished");
        }

        let handlers = std::mem::take(&mut self.handlers);
        tokio::task::spawn_blocking(move || {
            for h in &handlers {
                h.dispose();
            }
        })
        .await
        .map_err(|e| {
            StructError::from(RuntimeReason::Shutdown).with_detail(format!("dispose failed: {e}"))
        })?;
        gsn_info!(sys, "runtime stopped");
        Ok(())
    }
}
