use gsn_config::WindowAmount;
use orion_error::prelude::*;

use crate::error::{CoreReason, CoreResult};

use super::kind::WindowKind;

/// Marker for an amount that was never configured.
pub const UNSET: i64 = -1;

// ---------------------------------------------------------------------------
// WindowDescriptor
// ---------------------------------------------------------------------------

/// Resolved window of one stream source.
///
/// `storage_amount` is a tuple count or a duration in milliseconds (see
/// [`is_storage_count_based`](Self::is_storage_count_based)), `UNSET` for an
/// unbounded window. `slide_amount` is a tuple count or milliseconds
/// according to `kind`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowDescriptor {
    pub kind: WindowKind,
    pub storage_amount: i64,
    pub slide_amount: i64,
    pub sampling_rate: f32,
    storage_count_based: bool,
}

impl Default for WindowDescriptor {
    fn default() -> Self {
        Self {
            kind: WindowKind::TupleBasedSlideOnEachTuple,
            storage_amount: UNSET,
            slide_amount: 1,
            sampling_rate: 1.0,
            storage_count_based: true,
        }
    }
}

impl WindowDescriptor {
    /// Parse the raw storage and slide strings of a stream source.
    ///
    /// An absent or blank storage string yields an unbounded window and the
    /// slide string is not looked at. A blank slide string counts as absent.
    pub fn resolve(
        raw_storage: Option<&str>,
        raw_slide: Option<&str>,
        sampling_rate: f32,
    ) -> CoreResult<Self> {
        let mut descriptor = Self {
            sampling_rate,
            ..Self::default()
        };

        let Some(storage) = non_blank(raw_storage) else {
            return Ok(descriptor);
        };
        let storage = parse_amount("storage", storage)?;
        let slide = match non_blank(raw_slide) {
            Some(raw) => {
                let slide = parse_amount("slide", raw)?;
                if slide.value() == 0 {
                    return StructError::from(CoreReason::Validation)
                        .with_detail(format!("slide must be positive, got {raw:?}"))
                        .err();
                }
                Some(slide)
            }
            None => None,
        };

        descriptor.kind = WindowKind::classify(Some(storage), slide);
        descriptor.storage_amount = storage.value();
        descriptor.storage_count_based = storage.is_count_based();
        descriptor.slide_amount = slide.map(|s| s.value()).unwrap_or(1);
        Ok(descriptor)
    }

    pub fn is_unbounded(&self) -> bool {
        self.storage_amount == UNSET
    }

    pub fn is_storage_count_based(&self) -> bool {
        self.storage_count_based
    }

    /// A window that can never contain a row: zero sampling, or a zero-tuple
    /// storage.
    pub fn yields_nothing(&self) -> bool {
        self.sampling_rate <= 0.0 || (self.storage_count_based && self.storage_amount == 0)
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.trim().is_empty())
}

fn parse_amount(what: &str, raw: &str) -> CoreResult<WindowAmount> {
    raw.parse::<WindowAmount>().map_err(|e| {
        StructError::from(CoreReason::Validation).with_detail(format!("invalid {what} {raw:?}: {e}"))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
