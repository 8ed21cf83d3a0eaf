use std::fmt;

use gsn_config::WindowAmount;

// ---------------------------------------------------------------------------
// WindowKind
// ---------------------------------------------------------------------------

/// The six mutually exclusive window flavours, named after the unit of the
/// window (storage) and the unit of its slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    /// Tuple-count window sliding every N (> 1) tuples.
    TupleBased,
    /// Tuple-count window sliding on every tuple.
    TupleBasedSlideOnEachTuple,
    /// Duration window sliding every D milliseconds.
    TimeBased,
    /// Duration window sliding on every tuple.
    TimeBasedSlideOnEachTuple,
    /// Tuple-count window sliding every D milliseconds.
    TupleBasedWinTimeBasedSlide,
    /// Duration window sliding every N (> 1) tuples.
    TimeBasedWinTupleBasedSlide,
}

impl WindowKind {
    /// Classify a window from its parsed storage and slide amounts.
    ///
    /// No storage means an unbounded window that slides on each tuple. No
    /// slide, or a slide of exactly one tuple, selects the "on each tuple"
    /// variant of the storage's kind.
    pub fn classify(storage: Option<WindowAmount>, slide: Option<WindowAmount>) -> Self {
        let Some(storage) = storage else {
            return Self::TupleBasedSlideOnEachTuple;
        };
        match (storage, slide) {
            (WindowAmount::Tuples(_), None | Some(WindowAmount::Tuples(1))) => {
                Self::TupleBasedSlideOnEachTuple
            }
            (WindowAmount::Millis(_), None | Some(WindowAmount::Tuples(1))) => {
                Self::TimeBasedSlideOnEachTuple
            }
            (WindowAmount::Tuples(_), Some(WindowAmount::Tuples(_))) => Self::TupleBased,
            (WindowAmount::Millis(_), Some(WindowAmount::Millis(_))) => Self::TimeBased,
            (WindowAmount::Tuples(_), Some(WindowAmount::Millis(_))) => {
                Self::TupleBasedWinTimeBasedSlide
            }
            (WindowAmount::Millis(_), Some(WindowAmount::Tuples(_))) => {
                Self::TimeBasedWinTupleBasedSlide
            }
        }
    }

    /// Kinds whose slide is driven by tuple arrivals; these belong to the
    /// tuple-based sliding handler.
    pub fn is_tuple_driven(&self) -> bool {
        matches!(
            self,
            Self::TupleBased | Self::TupleBasedSlideOnEachTuple | Self::TimeBasedWinTupleBasedSlide
        )
    }

    /// Kinds whose slide is driven by elapsed stream time (plus the
    /// each-tuple duration window); these belong to the time-based handler.
    pub fn is_time_driven(&self) -> bool {
        !self.is_tuple_driven()
    }

    pub fn slides_on_each_tuple(&self) -> bool {
        matches!(
            self,
            Self::TupleBasedSlideOnEachTuple | Self::TimeBasedSlideOnEachTuple
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TupleBased => "TUPLE_BASED",
            Self::TupleBasedSlideOnEachTuple => "TUPLE_BASED_SLIDE_ON_EACH_TUPLE",
            Self::TimeBased => "TIME_BASED",
            Self::TimeBasedSlideOnEachTuple => "TIME_BASED_SLIDE_ON_EACH_TUPLE",
            Self::TupleBasedWinTimeBasedSlide => "TUPLE_BASED_WIN_TIME_BASED_SLIDE",
            Self::TimeBasedWinTupleBasedSlide => "TIME_BASED_WIN_TUPLE_BASED_SLIDE",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
