use std::sync::{Arc, Mutex};

use orion_error::prelude::*;

use crate::element::StreamElement;
use crate::error::{CoreReason, CoreResult};
use crate::source::{SourceId, StreamSource, Wrapper};
use crate::storage::{StorageEngine, ViewHelper};

use super::{SlidingHandler, TimeBasedSlidingHandler, TupleBasedSlidingHandler};

// ---------------------------------------------------------------------------
// WrapperHandlers: the two sliding handlers of one wrapper
// ---------------------------------------------------------------------------

pub struct WrapperHandlers {
    wrapper: Arc<dyn Wrapper>,
    tuple: TupleBasedSlidingHandler,
    time: TimeBasedSlidingHandler,
    /// Newest timestamp admitted into the wrapper table.
    last_timed: Mutex<Option<i64>>,
}

impl WrapperHandlers {
    pub fn new(wrapper: Arc<dyn Wrapper>, storage: Arc<dyn StorageEngine>, helper: ViewHelper) -> Self {
        let table = wrapper.db_alias().to_string();
        Self {
            tuple: TupleBasedSlidingHandler::new(&table, storage.clone(), helper.clone()),
            time: TimeBasedSlidingHandler::new(table, storage, helper),
            last_timed: Mutex::new(None),
            wrapper,
        }
    }

    pub fn wrapper(&self) -> &Arc<dyn Wrapper> {
        &self.wrapper
    }

    fn handlers(&self) -> [&dyn SlidingHandler; 2] {
        [&self.tuple, &self.time]
    }

    /// Bind `source` to this wrapper, validate it and hand it to the handler
    /// its window kind belongs to.
    ///
    /// `Ok(false)` when the backend refused the source's view.
    pub fn attach(&self, mut source: StreamSource) -> CoreResult<bool> {
        source.set_wrapper(self.wrapper.clone())?;
        if !source.validate() {
            return StructError::from(CoreReason::Validation)
                .with_detail(format!(
                    "source {} on wrapper {} failed validation",
                    source.alias(),
                    self.wrapper.name()
                ))
                .err();
        }
        let handler = self
            .handlers()
            .into_iter()
            .find(|h| h.is_interested_in(&source));
        match handler {
            Some(handler) => handler.add_stream_source(source),
            None => StructError::from(CoreReason::Sequencing)
                .with_detail(format!(
                    "no handler accepts window kind {}",
                    source.windowing_type()
                ))
                .err(),
        }
    }

    pub fn detach(&self, id: SourceId) -> bool {
        self.handlers().into_iter().any(|h| h.remove_stream_source(id))
    }

    /// Whether an element stamped `timed` may enter the wrapper table.
    ///
    /// Older than the newest admitted element is refused; equal passes.
    /// Row ids then grow with `timed`, which the tuple boundaries rely on.
    pub fn admit(&self, timed: i64) -> bool {
        let mut last = self.last_timed.lock().expect("wrapper watermark lock poisoned");
        match *last {
            Some(newest) if timed < newest => {
                log::debug!(
                    "wrapper {}: dropping late element {timed} (newest {newest})",
                    self.wrapper.name()
                );
                false
            }
            _ => {
                *last = Some(timed);
                true
            }
        }
    }

    /// Feed one element to both handlers; true if any window slid.
    pub fn data_available(&self, element: &StreamElement) -> bool {
        let mut slid = false;
        for handler in self.handlers() {
            slid |= handler.data_available(element);
        }
        slid
    }

    /// DELETE removing wrapper-table rows no attached window needs, or
    /// `None` when no source is attached.
    pub fn cleanup_statement(&self) -> Option<String> {
        let conditions: Vec<String> = self
            .handlers()
            .into_iter()
            .filter(|h| h.source_count() > 0)
            .map(|h| h.cutting_condition())
            .collect();
        if conditions.is_empty() {
            return None;
        }
        Some(format!(
            "delete from {} where {}",
            self.wrapper.db_alias(),
            conditions.join(" and ")
        ))
    }

    pub fn source_count(&self) -> usize {
        self.handlers().iter().map(|h| h.source_count()).sum()
    }

    pub fn dispose(&self) {
        for handler in self.handlers() {
            handler.dispose();
        }
    }
}
