use serde::Deserialize;

use crate::dialect::Dialect;

pub const DEFAULT_HELPER_TABLE: &str = "_sql_view_helper_";

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub dialect: Dialect,
    /// Shared bookkeeping table holding one watermark row per live stream
    /// source.
    #[serde(default = "default_helper_table")]
    pub helper_table: String,
}

fn default_helper_table() -> String {
    DEFAULT_HELPER_TABLE.to_string()
}
