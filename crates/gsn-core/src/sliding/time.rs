use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::element::StreamElement;
use crate::error::CoreResult;
use crate::source::{SourceId, StreamSource};
use crate::storage::{StorageEngine, ViewHelper};
use crate::window::WindowKind;

use super::{HandlerContext, NO_CUT_TIMED, SlidingHandler, Tracked};

enum TimeSlide {
    EachTuple,
    /// Timestamp at or after which the window next slides; unset until the
    /// first element arrives.
    NextAt(Option<i64>),
}

/// Handler for windows that slide on elapsed stream time, plus duration
/// windows sliding on each tuple: `TimeBased`, `TimeBasedSlideOnEachTuple`
/// and `TupleBasedWinTimeBasedSlide`.
pub struct TimeBasedSlidingHandler {
    ctx: HandlerContext,
    sources: Mutex<BTreeMap<SourceId, Tracked<TimeSlide>>>,
}

impl TimeBasedSlidingHandler {
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

/// Whether `timed` crosses the slide boundary in `next`; advances the
/// boundary past `timed` when it does.
fn crosses(next: &mut Option<i64>, timed: i64, slide: i64) -> bool {
    match *next {
        None => {
            *next = Some(timed + slide);
            false
        }
        Some(boundary) if timed >= boundary => {
            let steps = (timed - boundary) / slide + 1;
            *next = Some(boundary + steps * slide);
            true
        }
        Some(_) => false,
    }
}

impl SlidingHandler for TimeBasedSlidingHandler {
    fn is_interested_in(&self, source: &StreamSource) -> bool {
        source.windowing_type().is_time_driven()
    }

    fn add_stream_source(&self, source: StreamSource) -> CoreResult<bool> {
        let interested = self.is_interested_in(&source);
        let id = source.id();
        let kind = source.windowing_type();
        let Some(rewriter) = self.ctx.open("time handler", interested, source)? else {
            return Ok(false);
        };
        let slide = match kind {
            WindowKind::TimeBasedSlideOnEachTuple => TimeSlide::EachTuple,
            _ => TimeSlide::NextAt(None),
        };
        self.sources
            .lock()
            .expect("time handler lock poisoned")
            .insert(id, Tracked::new(rewriter, slide));
        Ok(true)
    }

    fn remove_stream_source(&self, id: SourceId) -> bool {
        let removed = self
            .sources
            .lock()
            .expect("time handler lock poisoned")
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
        let mut sources = self.sources.lock().expect("time handler lock poisoned");
        let mut slid = false;
        for tracked in sources.values_mut() {
            if !tracked.accept(element.timed) {
                continue;
            }
            let slide_amount = tracked.window().slide_amount;
            let due = match &mut tracked.slide {
                TimeSlide::EachTuple => true,
                TimeSlide::NextAt(next) => crosses(next, element.timed, slide_amount),
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
            .expect("time handler lock poisoned")
            .values()
            .map(Tracked::window)
            .collect();
        if windows.is_empty() || windows.iter().any(|w| w.is_unbounded()) {
            return NO_CUT_TIMED.to_string();
        }

        let mut max_duration = None::<i64>;
        let mut max_tuples = 0i64;
        let mut max_slide = 0i64;
        for w in &windows {
            match w.kind {
                WindowKind::TimeBased => {
                    let needed = w.storage_amount + w.slide_amount;
                    max_duration = Some(max_duration.map_or(needed, |m| m.max(needed)));
                }
                WindowKind::TimeBasedSlideOnEachTuple => {
                    let needed = w.storage_amount;
                    max_duration = Some(max_duration.map_or(needed, |m| m.max(needed)));
                }
                WindowKind::TupleBasedWinTimeBasedSlide => {
                    max_tuples = max_tuples.max(w.storage_amount);
                    max_slide = max_slide.max(w.slide_amount);
                }
                _ => {}
            }
        }

        let dialect = self.ctx.storage.dialect();
        let table = &self.ctx.table;
        let mut bounds = Vec::with_capacity(2);
        if let Some(duration) = max_duration {
            let sql = format!("select max(timed) - {duration} from {table}");
            let Some(timed) = self.ctx.boundary(&sql) else {
                return NO_CUT_TIMED.to_string();
            };
            bounds.push(timed);
        }
        if max_tuples > 0 {
            let filter = format!("timed <= (select max(timed) from {table}) - {max_slide}");
            let sql = dialect.nth_newest("timed", table, Some(&filter), max_tuples);
            let Some(timed) = self.ctx.boundary(&sql) else {
                return NO_CUT_TIMED.to_string();
            };
            bounds.push(timed);
        }

        match bounds.into_iter().min() {
            Some(timed) => format!("timed < {timed}"),
            None => NO_CUT_TIMED.to_string(),
        }
    }

    fn source_count(&self) -> usize {
        self.sources.lock().expect("time handler lock poisoned").len()
    }

    fn dispose(&self) {
        let drained = std::mem::take(&mut *self.sources.lock().expect("time handler lock poisoned"));
        for tracked in drained.values() {
            tracked.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::crosses;

    #[test]
    fn first_element_seeds_boundary() {
        let mut next = None;
        assert!(!crosses(&mut next, 1_000, 500));
        assert_eq!(next, Some(1_500));
    }

    #[test]
    fn fires_on_boundary_and_skips_gaps() {
        let mut next = Some(1_500);
        assert!(!crosses(&mut next, 1_499, 500));
        assert!(crosses(&mut next, 1_500, 500));
        assert_eq!(next, Some(2_000));
        assert!(crosses(&mut next, 3_700, 500));
        assert_eq!(next, Some(4_000));
    }
}
