mod uid;

pub use uid::{SourceUid, UID_LEN};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use gsn_config::{Dialect, SourceConfig};
use orion_error::prelude::*;

use crate::error::{CoreReason, CoreResult};
use crate::rewriter::view::build_view_sql;
use crate::sql::rename_tables;
use crate::storage::ViewHelper;
use crate::window::{WindowDescriptor, WindowKind};

/// Pseudo-table name a logical source query selects from.
pub const WRAPPER_ALIAS: &str = "wrapper";

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// The producer side of a stream source: a named wrapper whose elements are
/// persisted in one backing table.
pub trait Wrapper: Send + Sync {
    fn name(&self) -> &str;

    /// Name of the table holding the wrapper's elements.
    fn db_alias(&self) -> &str;
}

/// Consumer notified each time a source's window slides.
pub trait WindowListener: Send + Sync {
    /// Returns whether the new window was consumed.
    fn window_slided(&self, source: &StreamSource) -> bool;
}

// ---------------------------------------------------------------------------
// SourceId / Addressing
// ---------------------------------------------------------------------------

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable key of a stream source inside handler tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(u64);

impl SourceId {
    fn next() -> Self {
        Self(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How to reach a wrapper: its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addressing {
    pub wrapper: String,
}

impl Addressing {
    pub fn new(wrapper: impl Into<String>) -> Self {
        Self {
            wrapper: wrapper.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// StreamSource
// ---------------------------------------------------------------------------

struct CompiledView {
    dialect: Dialect,
    helper_table: String,
    sql: String,
}

/// One input subscription of a virtual sensor.
///
/// Built and configured through `&mut self` setters, then validated. Every
/// setter that feeds the compiled view resets both the validation memo and
/// the compiled-view cache. Once attached to a handler the source is shared
/// read-only.
pub struct StreamSource {
    id: SourceId,
    uid: SourceUid,
    alias: String,
    addressing: Vec<Addressing>,
    sql_query: String,
    raw_storage: Option<String>,
    raw_slide: Option<String>,
    start_time: Option<i64>,
    end_time: Option<i64>,
    window: WindowDescriptor,
    validation: Option<bool>,
    wrapper: Option<Arc<dyn Wrapper>>,
    listener: Option<Arc<dyn WindowListener>>,
    compiled: OnceLock<CompiledView>,
}

impl StreamSource {
    pub fn new(alias: impl Into<String>, sql_query: impl Into<String>) -> Self {
        Self {
            id: SourceId::next(),
            uid: SourceUid::allocate(),
            alias: alias.into(),
            addressing: Vec::new(),
            sql_query: sql_query.into(),
            raw_storage: None,
            raw_slide: None,
            start_time: None,
            end_time: None,
            window: WindowDescriptor::default(),
            validation: None,
            wrapper: None,
            listener: None,
            compiled: OnceLock::new(),
        }
    }

    /// Build an unvalidated source from its `[[sensor.source]]` entry.
    pub fn from_config(config: &SourceConfig) -> Self {
        let mut source = Self::new(&config.alias, &config.query);
        if let Some(wrapper) = &config.wrapper {
            source.addressing.push(Addressing::new(wrapper));
        }
        source.raw_storage = config.storage_size.clone();
        source.raw_slide = config.slide.clone();
        source.window.sampling_rate = config.sampling_rate;
        source.start_time = config.start_time;
        source.end_time = config.end_time;
        source
    }

    // -- setters ------------------------------------------------------------

    pub fn add_addressing(&mut self, addressing: Addressing) {
        self.addressing.push(addressing);
        self.invalidate();
    }

    pub fn set_raw_storage(&mut self, raw: Option<&str>) {
        self.raw_storage = raw.map(str::to_string);
        self.invalidate();
    }

    pub fn set_raw_slide(&mut self, raw: Option<&str>) {
        self.raw_slide = raw.map(str::to_string);
        self.invalidate();
    }

    pub fn set_sql_query(&mut self, sql_query: impl Into<String>) {
        self.sql_query = sql_query.into();
        self.invalidate();
    }

    pub fn set_active_interval(&mut self, start: Option<i64>, end: Option<i64>) {
        self.start_time = start;
        self.end_time = end;
        self.invalidate();
    }

    /// Change the sampling rate. Rejected once the view has been compiled.
    pub fn set_sampling_rate(&mut self, rate: f32) -> CoreResult<()> {
        if self.compiled.get().is_some() {
            return StructError::from(CoreReason::Sequencing)
                .with_detail(format!(
                    "source {}: sampling rate cannot change after the view was compiled",
                    self.alias
                ))
                .err();
        }
        self.window.sampling_rate = rate;
        self.invalidate();
        Ok(())
    }

    /// Attach the wrapper this source reads from. The wrapper must be named
    /// by one of the source's addressing entries.
    pub fn set_wrapper(&mut self, wrapper: Arc<dyn Wrapper>) -> CoreResult<()> {
        if !self
            .addressing
            .iter()
            .any(|a| a.wrapper.eq_ignore_ascii_case(wrapper.name()))
        {
            return StructError::from(CoreReason::Validation)
                .with_detail(format!(
                    "source {}: no addressing entry names wrapper {:?}",
                    self.alias,
                    wrapper.name()
                ))
                .err();
        }
        self.wrapper = Some(wrapper);
        self.compiled = OnceLock::new();
        Ok(())
    }

    pub fn set_listener(&mut self, listener: Arc<dyn WindowListener>) {
        self.listener = Some(listener);
    }

    fn invalidate(&mut self) {
        self.validation = None;
        self.compiled = OnceLock::new();
    }

    // -- validation ---------------------------------------------------------

    /// Validate the source and resolve its window. Memoized until a setter
    /// touches a window-affecting field.
    pub fn validate(&mut self) -> bool {
        if let Some(result) = self.validation {
            return result;
        }
        let result = self.run_validation();
        self.validation = Some(result);
        result
    }

    fn run_validation(&mut self) -> bool {
        let rate = self.window.sampling_rate;
        if rate.is_nan() {
            log::warn!("source {}: sampling rate is not a number, the window will stay empty", self.alias);
            self.window.sampling_rate = 0.0;
        } else if rate <= 0.0 {
            log::warn!(
                "source {}: sampling rate {rate} is not positive, the window will stay empty",
                self.alias
            );
        } else if rate > 1.0 {
            log::warn!("source {}: sampling rate {rate} clamped to 1", self.alias);
            self.window.sampling_rate = 1.0;
        }

        if self.addressing.is_empty() {
            log::warn!("source {}: no addressing, source disabled", self.alias);
            return false;
        }

        match WindowDescriptor::resolve(
            self.raw_storage.as_deref(),
            self.raw_slide.as_deref(),
            self.window.sampling_rate,
        ) {
            Ok(window) => {
                self.window = window;
                true
            }
            Err(e) => {
                log::warn!("source {}: {e}, source disabled", self.alias);
                false
            }
        }
    }

    pub fn is_validated(&self) -> bool {
        self.validation == Some(true)
    }

    // -- compiled view ------------------------------------------------------

    /// The SELECT defining this source's window view.
    ///
    /// Computed from the logical query, the resolved window, the active
    /// interval, the wrapper table and the helper table; the result is
    /// cached for the first `(dialect, helper)` it is asked for.
    pub fn compiled_query(&self, dialect: Dialect, helper: &ViewHelper) -> CoreResult<String> {
        let wrapper = self.ready_wrapper()?;
        if let Some(view) = self.compiled.get() {
            if view.dialect == dialect && view.helper_table == helper.table() {
                return Ok(view.sql.clone());
            }
            return build_view_sql(self, wrapper.db_alias(), dialect, helper);
        }
        let sql = build_view_sql(self, wrapper.db_alias(), dialect, helper)?;
        let _ = self.compiled.set(CompiledView {
            dialect,
            helper_table: helper.table().to_string(),
            sql: sql.clone(),
        });
        Ok(sql)
    }

    /// Rename this source's alias and the `wrapper` pseudo-table in an ad
    /// hoc query to the source's view.
    pub fn rewrite(&self, query: &str) -> CoreResult<String> {
        self.ready_wrapper()?;
        rename_tables(
            query,
            &[
                (self.alias.as_str(), self.uid.as_str()),
                (WRAPPER_ALIAS, self.uid.as_str()),
            ],
            false,
        )
    }

    fn ready_wrapper(&self) -> CoreResult<&Arc<dyn Wrapper>> {
        let Some(wrapper) = &self.wrapper else {
            return StructError::from(CoreReason::Sequencing)
                .with_detail(format!("source {}: no wrapper attached", self.alias))
                .err();
        };
        if !self.is_validated() {
            return StructError::from(CoreReason::Sequencing)
                .with_detail(format!("source {}: used before a successful validation", self.alias))
                .err();
        }
        Ok(wrapper)
    }

    /// Signal the listener that the window slid. Without a listener the
    /// slide counts as consumed.
    pub fn window_slided(&self) -> bool {
        match &self.listener {
            Some(listener) => listener.window_slided(self),
            None => true,
        }
    }

    // -- getters ------------------------------------------------------------

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn uid(&self) -> &str {
        self.uid.as_str()
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn addressing(&self) -> &[Addressing] {
        &self.addressing
    }

    pub fn sql_query(&self) -> &str {
        &self.sql_query
    }

    pub fn raw_storage(&self) -> Option<&str> {
        self.raw_storage.as_deref()
    }

    pub fn raw_slide(&self) -> Option<&str> {
        self.raw_slide.as_deref()
    }

    pub fn active_interval(&self) -> (Option<i64>, Option<i64>) {
        (self.start_time, self.end_time)
    }

    pub fn wrapper(&self) -> Option<&Arc<dyn Wrapper>> {
        self.wrapper.as_ref()
    }

    pub fn window(&self) -> &WindowDescriptor {
        &self.window
    }

    pub fn windowing_type(&self) -> WindowKind {
        self.window.kind
    }

    pub fn parsed_storage_size(&self) -> i64 {
        self.window.storage_amount
    }

    pub fn parsed_slide_value(&self) -> i64 {
        self.window.slide_amount
    }

    pub fn sampling_rate(&self) -> f32 {
        self.window.sampling_rate
    }

    pub fn is_storage_count_based(&self) -> bool {
        self.window.is_storage_count_based()
    }
}

impl fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSource")
            .field("id", &self.id)
            .field("uid", &self.uid)
            .field("alias", &self.alias)
            .field("window", &self.window)
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
