//! Sliding handlers: decide, per incoming element, which stream sources'
//! windows moved and drive their rewriters.
//!
//! A wrapper owns one [`TupleBasedSlidingHandler`] and one
//! [`TimeBasedSlidingHandler`] (bundled as [`WrapperHandlers`]); every
//! source is routed to exactly one of them by its window kind.

mod dispatch;
mod time;
mod tuple;

pub use dispatch::WrapperHandlers;
pub use time::TimeBasedSlidingHandler;
pub use tuple::TupleBasedSlidingHandler;

use std::sync::Arc;

use orion_error::prelude::*;

use crate::element::StreamElement;
use crate::error::{CoreReason, CoreResult};
use crate::rewriter::{SqlViewRewriter, ViewQueryRewriter};
use crate::source::{SourceId, StreamSource};
use crate::storage::{StorageEngine, ViewHelper};
use crate::window::WindowDescriptor;

/// Cutting condition that deletes nothing.
pub const NO_CUT_PK: &str = "pk < -1";
pub const NO_CUT_TIMED: &str = "timed < -1";

// ---------------------------------------------------------------------------
// SlidingHandler
// ---------------------------------------------------------------------------

pub trait SlidingHandler: Send + Sync {
    /// Whether `source`'s window kind belongs to this handler.
    fn is_interested_in(&self, source: &StreamSource) -> bool;

    /// Take ownership of a validated source and create its view.
    ///
    /// `Ok(false)` when the backend refused the view; the source is dropped.
    /// Fails with `Sequencing` for an unvalidated source or one this
    /// handler is not interested in.
    fn add_stream_source(&self, source: StreamSource) -> CoreResult<bool>;

    /// Detach a source and drop its view. Returns whether it was managed.
    fn remove_stream_source(&self, id: SourceId) -> bool;

    /// Feed one element; true if any managed source's window slid.
    fn data_available(&self, element: &StreamElement) -> bool;

    /// WHERE fragment matching wrapper-table rows no managed window needs.
    fn cutting_condition(&self) -> String;

    fn source_count(&self) -> usize;

    /// Remove every source.
    fn dispose(&self);
}

// ---------------------------------------------------------------------------
// Shared plumbing
// ---------------------------------------------------------------------------

/// What every handler of one wrapper shares.
#[derive(Clone)]
pub(crate) struct HandlerContext {
    pub table: String,
    pub storage: Arc<dyn StorageEngine>,
    pub helper: ViewHelper,
}

impl HandlerContext {
    /// Wrap `source` in a rewriter and create its view.
    pub fn open(
        &self,
        handler: &str,
        interested: bool,
        source: StreamSource,
    ) -> CoreResult<Option<Box<dyn ViewQueryRewriter>>> {
        if !source.is_validated() {
            return StructError::from(CoreReason::Sequencing)
                .with_detail(format!("{handler}: source {} is not validated", source.alias()))
                .err();
        }
        if !interested {
            return StructError::from(CoreReason::Sequencing)
                .with_detail(format!(
                    "{handler}: source {} has window kind {}",
                    source.alias(),
                    source.windowing_type()
                ))
                .err();
        }
        let rewriter = SqlViewRewriter::new(source, self.storage.clone(), self.helper.clone());
        if !rewriter.initialize()? {
            return Ok(None);
        }
        Ok(Some(Box::new(rewriter)))
    }

    /// Run a boundary query; `None` for no row, NULL, or a backend error.
    pub fn boundary(&self, sql: &str) -> Option<i64> {
        match self.storage.query_i64(sql) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("boundary query on {} failed: {e}", self.table);
                None
            }
        }
    }
}

/// A managed source and its per-source slide bookkeeping.
pub(crate) struct Tracked<S> {
    pub rewriter: Box<dyn ViewQueryRewriter>,
    pub slide: S,
    last_timed: Option<i64>,
}

impl<S> Tracked<S> {
    pub fn new(rewriter: Box<dyn ViewQueryRewriter>, slide: S) -> Self {
        Self {
            rewriter,
            slide,
            last_timed: None,
        }
    }

    pub fn window(&self) -> WindowDescriptor {
        *self.rewriter.source().window()
    }

    /// Out-of-order guard: elements older than the last accepted one are
    /// dropped for this source. Equal timestamps pass.
    pub fn accept(&mut self, timed: i64) -> bool {
        match self.last_timed {
            Some(last) if timed < last => {
                log::debug!(
                    "source {}: dropped element at {timed}, older than {last}",
                    self.rewriter.source().alias()
                );
                false
            }
            _ => {
                self.last_timed = Some(timed);
                true
            }
        }
    }

    pub fn dispose(&self) {
        if let Err(e) = self.rewriter.dispose() {
            log::warn!("source {}: dispose failed: {e}", self.rewriter.source().alias());
        }
    }
}
