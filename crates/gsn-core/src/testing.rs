//! In-memory collaborators for tests.
//!
//! [`ScriptedStorage`] records every statement it receives and answers
//! SELECTs from a list of substring-matched rules, falling back to a default
//! row set. [`StaticWrapper`] and [`RecordingListener`] stand in for the
//! wrapper and virtual-sensor sides of a stream source.

use std::sync::Mutex;

use gsn_config::Dialect;
use orion_error::prelude::*;

use crate::error::{CoreReason, CoreResult};
use crate::source::{StreamSource, WindowListener, Wrapper};
use crate::storage::{FieldValue, Row, StorageEngine};

// ---------------------------------------------------------------------------
// ScriptedStorage
// ---------------------------------------------------------------------------

struct ScriptState {
    statements: Vec<String>,
    rules: Vec<(String, Vec<Row>)>,
    failures: Vec<String>,
    default_rows: Vec<Row>,
}

pub struct ScriptedStorage {
    dialect: Dialect,
    state: Mutex<ScriptState>,
}

impl ScriptedStorage {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: Mutex::new(ScriptState {
                statements: Vec::new(),
                rules: Vec::new(),
                failures: Vec::new(),
                default_rows: Vec::new(),
            }),
        }
    }

    /// Rows returned by any SELECT no rule matches.
    pub fn with_default_rows(self, rows: Vec<Row>) -> Self {
        self.state.lock().expect("script lock poisoned").default_rows = rows;
        self
    }

    /// Every SELECT containing `needle` returns `rows`. Earlier rules win.
    pub fn respond(&self, needle: &str, rows: Vec<Row>) {
        self.state
            .lock()
            .expect("script lock poisoned")
            .rules
            .push((needle.to_string(), rows));
    }

    /// Convenience for a single-row, single-integer answer.
    pub fn respond_i64(&self, needle: &str, value: i64) {
        self.respond(needle, vec![Row::new(vec![FieldValue::Integer(value)])]);
    }

    /// Every statement containing `needle` fails with a storage error.
    pub fn fail_on(&self, needle: &str) {
        self.state
            .lock()
            .expect("script lock poisoned")
            .failures
            .push(needle.to_string());
    }

    pub fn statements(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("script lock poisoned")
            .statements
            .clone()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.state
            .lock()
            .expect("script lock poisoned")
            .statements
            .iter()
            .filter(|s| s.contains(needle))
            .count()
    }

    pub fn clear_log(&self) {
        self.state
            .lock()
            .expect("script lock poisoned")
            .statements
            .clear();
    }

    fn record(&self, sql: &str) -> CoreResult<std::sync::MutexGuard<'_, ScriptState>> {
        let mut state = self.state.lock().expect("script lock poisoned");
        state.statements.push(sql.to_string());
        if state.failures.iter().any(|f| sql.contains(f.as_str())) {
            return StructError::from(CoreReason::Storage)
                .with_detail(format!("scripted failure: {sql}"))
                .err();
        }
        Ok(state)
    }
}

impl StorageEngine for ScriptedStorage {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn query(&self, sql: &str) -> CoreResult<Vec<Row>> {
        let state = self.record(sql)?;
        let rows = state
            .rules
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_else(|| state.default_rows.clone());
        Ok(rows)
    }

    fn execute_update(&self, sql: &str) -> CoreResult<u64> {
        self.record(sql)?;
        Ok(1)
    }
}

// ---------------------------------------------------------------------------
// StaticWrapper
// ---------------------------------------------------------------------------

pub struct StaticWrapper {
    name: String,
    table: String,
}

impl StaticWrapper {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
        }
    }
}

impl Wrapper for StaticWrapper {
    fn name(&self) -> &str {
        &self.name
    }

    fn db_alias(&self) -> &str {
        &self.table
    }
}

// ---------------------------------------------------------------------------
// RecordingListener
// ---------------------------------------------------------------------------

/// Records the alias of every source whose window slid.
#[derive(Default)]
pub struct RecordingListener {
    slides: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn slides(&self) -> Vec<String> {
        self.slides.lock().expect("listener lock poisoned").clone()
    }
}

impl WindowListener for RecordingListener {
    fn window_slided(&self, source: &StreamSource) -> bool {
        self.slides
            .lock()
            .expect("listener lock poisoned")
            .push(source.alias().to_string());
        true
    }
}
