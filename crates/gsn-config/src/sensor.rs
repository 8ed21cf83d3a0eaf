use serde::Deserialize;

use crate::types::WindowAmount;

// ---------------------------------------------------------------------------
// SensorConfig: deserialized from [[sensor]]
// ---------------------------------------------------------------------------

/// One virtual sensor: a named output table fed by one or more stream
/// sources.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    pub name: String,
    /// Retention policy of the sensor's persisted table: `"N"` rows or a
    /// `s`/`m`/`h` duration. Absent means keep everything.
    #[serde(default)]
    pub storage_size: Option<WindowAmount>,
    /// Query over the source aliases executed whenever one of the sources'
    /// windows slides. Defaults to `select * from <alias>` per source.
    #[serde(default)]
    pub input_query: Option<String>,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
}

// ---------------------------------------------------------------------------
// SourceConfig: deserialized from [[sensor.source]]
// ---------------------------------------------------------------------------

/// Raw, unvalidated stream source definition.
///
/// Window strings are kept verbatim: a malformed window only disables that
/// source when it is validated, it does not reject the whole file.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub alias: String,
    /// Name of the wrapper this source subscribes to. A source without
    /// addressing never validates.
    #[serde(default)]
    pub wrapper: Option<String>,
    /// Logical query against the pseudo-table `wrapper`.
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default)]
    pub storage_size: Option<String>,
    #[serde(default)]
    pub slide: Option<String>,
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f32,
    /// Active interval, milliseconds since the epoch.
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
}

fn default_query() -> String {
    "select * from wrapper".to_string()
}

fn default_sampling_rate() -> f32 {
    1.0
}
