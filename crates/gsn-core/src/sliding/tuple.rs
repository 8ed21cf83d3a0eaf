use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::element::StreamElement;
use crate::error::CoreResult;
use crate::source::{SourceId, StreamSource};
use crate::storage::{StorageEngine, ViewHelper};
use crate::window::WindowKind;

use super::{HandlerContext, NO_CUT_PK, SlidingHandler, Tracked};

enum TupleSlide {
    EachTuple,
    /// Tuples seen since the last slide, fires when it reaches `slide`.
    Counter(i64),
}

/// Handler for windows that slide on tuple arrivals: `TupleBased`,
/// `TupleBasedSlideOnEachTuple` and `TimeBasedWinTupleBasedSlide`.
pub struct TupleBasedSlidingHandler {
    ctx: HandlerContext,
    sources: Mutex<BTreeMap<SourceId, Tracked<TupleSlide>>>,
}

impl TupleBasedSlidingHandler {
    pub fn new(table: impl Into<String>, storage: Arc<dyn StorageEngine>, helper: ViewHelper) -> Self {
        Self {
            ctx: HandlerContext {
                table: table.into(),
                storage,
                helper,
            },
            sources: Mutex::new(BTreeMap::new()),
        }
    }
}

impl SlidingHandler for TupleBasedSlidingHandler {
    fn is_interested_in(&self, source: &StreamSource) -> bool {
        source.windowing_type().is_tuple_driven()
    }

    fn add_stream_source(&self, source: StreamSource) -> CoreResult<bool> {
        let interested = self.is_interested_in(&source);
        let id = source.id();
        let window = *source.window();
        let Some(rewriter) = self.ctx.open("tuple handler", interested, source)? else {
            return Ok(false);
        };
        let slide = match window.kind {
            WindowKind::TupleBasedSlideOnEachTuple => TupleSlide::EachTuple,
            // the first slide waits until the window has filled
            WindowKind::TupleBased => {
                TupleSlide::Counter(window.slide_amount - window.storage_amount)
            }
            _ => TupleSlide::Counter(0),
        };
        self.sources
            .lock()
            .expect("tuple handler lock poisoned")
            .insert(id, Tracked::new(rewriter, slide));
        Ok(true)
    }

    fn remove_stream_source(&self, id: SourceId) -> bool {
        let removed = self
            .sources
            .lock()
            .expect("tuple handler lock poisoned")
            .remove(&id);
        match removed {
            Some(tracked) => {
                tracked.dispose();
                true
            }
            None => false,
        }
    }

    fn data_available(&self, element: &StreamElement) -> bool {
        let mut sources = self.sources.lock().expect("tuple handler lock poisoned");
        let mut slid = false;
        for tracked in sources.values_mut() {
            if !tracked.accept(element.timed) {
                continue;
            }
            let slide_amount = tracked.window().slide_amount;
            let due = match &mut tracked.slide {
                TupleSlide::EachTuple => true,
                TupleSlide::Counter(count) => {
                    *count += 1;
                    if *count >= slide_amount {
                        *count = 0;
                        true
                    } else {
                        false
                    }
                }
            };
            if due && tracked.rewriter.data_available(element.timed) {
                slid = true;
            }
        }
        slid
    }

    fn cutting_condition(&self) -> String {
        let windows: Vec<_> = self
            .sources
            .lock()
            .expect("tuple handler lock poisoned")
            .values()
            .map(Tracked::window)
            .collect();
        if windows.is_empty() || windows.iter().any(|w| w.is_unbounded()) {
            return NO_CUT_PK.to_string();
        }

        let mut max_tuples = 0i64;
        let mut max_slide = 0i64;
        let mut max_duration = 0i64;
        for w in &windows {
            match w.kind {
                WindowKind::TupleBasedSlideOnEachTuple => {
                    max_tuples = max_tuples.max(w.storage_amount)
                }
                WindowKind::TupleBased => {
                    max_tuples = max_tuples.max(w.storage_amount + w.slide_amount)
                }
                WindowKind::TimeBasedWinTupleBasedSlide => {
                    max_slide = max_slide.max(w.slide_amount);
                    max_duration = max_duration.max(w.storage_amount);
                }
                _ => {}
            }
        }

        let dialect = self.ctx.storage.dialect();
        let table = &self.ctx.table;
        let mut bounds = Vec::with_capacity(2);
        if max_tuples > 0 {
            let sql = dialect.nth_newest("pk", table, None, max_tuples);
            let Some(pk) = self.ctx.boundary(&sql) else {
                return NO_CUT_PK.to_string();
            };
            bounds.push(pk);
        }
        if max_slide > 0 {
            let sql = format!(
                "select min(pk) from {table} where timed > ({}) - {max_duration}",
                dialect.nth_newest("timed", table, None, max_slide)
            );
            let Some(pk) = self.ctx.boundary(&sql) else {
                return NO_CUT_PK.to_string();
            };
            bounds.push(pk);
        }

        match bounds.into_iter().min() {
            Some(pk) => format!("pk < {pk}"),
            None => NO_CUT_PK.to_string(),
        }
    }

    fn source_count(&self) -> usize {
        self.sources.lock().expect("tuple handler lock poisoned").len()
    }

    fn dispose(&self) {
        let drained = std::mem::take(&mut *self.sources.lock().expect("tuple handler lock poisoned"));
        for tracked in drained.values() {
            tracked.dispose();
        }
    }
}
