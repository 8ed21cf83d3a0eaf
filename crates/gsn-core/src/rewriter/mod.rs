pub(crate) mod view;

use std::sync::Arc;

use orion_error::prelude::*;

use crate::error::{CoreReason, CoreResult};
use crate::source::StreamSource;
use crate::storage::{StorageEngine, ViewHelper};

// ---------------------------------------------------------------------------
// ViewQueryRewriter
// ---------------------------------------------------------------------------

/// Maintains the window view of one stream source.
///
/// Backend failures are logged and turned into neutral results so a single
/// source cannot stall the handler that drives it. Sequencing violations
/// (no wrapper, not validated) surface as errors.
pub trait ViewQueryRewriter: Send + Sync {
    fn source(&self) -> &StreamSource;

    /// Create the source's view and its watermark row. `Ok(false)` when the
    /// backend refused; whatever was created is dropped again.
    fn initialize(&self) -> CoreResult<bool>;

    /// SELECT defining the view.
    fn create_view_sql(&self) -> CoreResult<String>;

    /// Point an ad hoc query at the source's view.
    fn rewrite(&self, query: &str) -> CoreResult<String>;

    /// Advance the watermark to `timed` and report whether the view holds
    /// any row; if it does the source's listener is signalled.
    fn data_available(&self, timed: i64) -> bool;

    /// Drop the view and the watermark row.
    fn dispose(&self) -> CoreResult<()>;
}

// ---------------------------------------------------------------------------
// SqlViewRewriter
// ---------------------------------------------------------------------------

pub struct SqlViewRewriter {
    source: StreamSource,
    storage: Arc<dyn StorageEngine>,
    helper: ViewHelper,
}

impl SqlViewRewriter {
    pub fn new(source: StreamSource, storage: Arc<dyn StorageEngine>, helper: ViewHelper) -> Self {
        Self {
            source,
            storage,
            helper,
        }
    }

    pub fn into_source(self) -> StreamSource {
        self.source
    }

    fn try_initialize(&self, view_sql: &str) -> CoreResult<()> {
        let uid = self.source.uid();
        self.storage.create_view(uid, view_sql)?;
        self.storage.execute_update(&self.helper.insert_sql(uid))?;
        Ok(())
    }
}

impl ViewQueryRewriter for SqlViewRewriter {
    fn source(&self) -> &StreamSource {
        &self.source
    }

    fn initialize(&self) -> CoreResult<bool> {
        let view_sql = self.create_view_sql()?;
        match self.try_initialize(&view_sql) {
            Ok(()) => {
                log::debug!(
                    "source {} ({}): view created: {view_sql}",
                    self.source.alias(),
                    self.source.uid()
                );
                Ok(true)
            }
            Err(e) => {
                log::warn!(
                    "source {}: view initialisation failed: {e}",
                    self.source.alias()
                );
                if let Err(e) = self.dispose() {
                    log::debug!("source {}: cleanup after failed init: {e}", self.source.alias());
                }
                Ok(false)
            }
        }
    }

    fn create_view_sql(&self) -> CoreResult<String> {
        self.source
            .compiled_query(self.storage.dialect(), &self.helper)
    }

    fn rewrite(&self, query: &str) -> CoreResult<String> {
        self.source.rewrite(query)
    }

    fn data_available(&self, timed: i64) -> bool {
        let uid = self.source.uid();
        let first_row = self
            .storage
            .add_limit(&format!("select * from {uid}"), 1, 0);
        let outcome = self
            .storage
            .execute_update(&self.helper.update_sql(uid, timed))
            .and_then(|_| self.storage.query(&first_row));
        match outcome {
            Ok(rows) if rows.is_empty() => false,
            Ok(_) => {
                if !self.source.window_slided() {
                    log::debug!("source {}: slide at {timed} not consumed", self.source.alias());
                }
                true
            }
            Err(e) => {
                log::warn!(
                    "source {}: window update at {timed} failed: {e}",
                    self.source.alias()
                );
                false
            }
        }
    }

    fn dispose(&self) -> CoreResult<()> {
        if self.source.wrapper().is_none() {
            return StructError::from(CoreReason::Sequencing)
                .with_detail(format!(
                    "source {}: dispose without an attached wrapper",
                    self.source.alias()
                ))
                .err();
        }
        let uid = self.source.uid();
        if let Err(e) = self.storage.drop_view(uid) {
            log::warn!("source {}: drop view {uid} failed: {e}", self.source.alias());
        }
        if let Err(e) = self.storage.execute_update(&self.helper.delete_sql(uid)) {
            log::warn!("source {}: helper row removal failed: {e}", self.source.alias());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests;
