use std::sync::Arc;

use gsn_core::sql::rename_tables;
use gsn_core::{CoreResult, Row, StorageEngine, StreamSource, WindowListener};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Rows produced for a virtual sensor when one of its sources' windows
/// slid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowEvent {
    pub sensor: String,
    /// Alias of the source whose window slid.
    pub source: String,
    pub rows: Vec<Row>,
}

/// Runs a sensor's input query whenever one of its sources slides and
/// forwards the result on the window channel.
pub(crate) struct WindowForwarder {
    sensor: String,
    /// Input query with each source alias pointed at that source's view.
    input_query: Option<String>,
    storage: Arc<dyn StorageEngine>,
    tx: mpsc::Sender<WindowEvent>,
}

impl WindowForwarder {
    pub fn new(
        sensor: &str,
        input_query: Option<&str>,
        sources: &[StreamSource],
        storage: Arc<dyn StorageEngine>,
        tx: mpsc::Sender<WindowEvent>,
    ) -> CoreResult<Self> {
        let mapping: Vec<(&str, &str)> = sources.iter().map(|s| (s.alias(), s.uid())).collect();
        let input_query = input_query
            .map(|q| rename_tables(q, &mapping, false))
            .transpose()?;
        Ok(Self {
            sensor: sensor.to_string(),
            input_query,
            storage,
            tx,
        })
    }
}

impl WindowListener for WindowForwarder {
    fn window_slided(&self, source: &StreamSource) -> bool {
        let query = match &self.input_query {
            Some(q) => q.clone(),
            None => format!("select * from {}", source.uid()),
        };
        let rows = match self.storage.query(&query) {
            Ok(rows) => rows,
            Err(e) => {
                gsn_warn!(pipe, sensor = %self.sensor, source = source.alias(), error = %e, "input query failed");
                return false;
            }
        };
        let event = WindowEvent {
            sensor: self.sensor.clone(),
            source: source.alias().to_string(),
            rows,
        };
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                gsn_warn!(pipe, sensor = %self.sensor, source = source.alias(), "window channel full, event dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                gsn_debug!(pipe, sensor = %self.sensor, "window channel closed");
                false
            }
        }
    }
}
