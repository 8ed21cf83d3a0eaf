use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// `[logging]` section; may be omitted entirely.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Target-prefix overrides, e.g. `{ "gsn_core::sliding" = "debug" }`.
    pub modules: BTreeMap<String, String>,
    /// Log file, relative to the directory of `gsn.toml` unless absolute.
    pub file: Option<PathBuf>,
    pub format: LogFormat,
}

impl LoggingConfig {
    /// `EnvFilter` directives: the global level followed by the module
    /// overrides in target order.
    pub fn directives(&self) -> String {
        let mut out = self.level.trim().to_string();
        for (target, level) in &self.modules {
            out.push_str(&format!(",{target}={level}"));
        }
        out
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            modules: BTreeMap::new(),
            file: None,
            format: LogFormat::Plain,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One line per event with a `[domain]` prefix.
    Plain,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_in_target_order() {
        let cfg: LoggingConfig = toml::from_str(
            r#"
level = "warn"
modules = { "gsn_runtime" = "info", "gsn_core::sliding" = "trace" }
"#,
        )
        .unwrap();
        assert_eq!(cfg.directives(), "warn,gsn_core::sliding=trace,gsn_runtime=info");
        assert_eq!(LoggingConfig::default().directives(), "info");
    }
}
