use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::logging::LoggingConfig;
use crate::runtime::RuntimeConfig;
use crate::sensor::SensorConfig;
use crate::storage::StorageConfig;
use crate::validate;

// ---------------------------------------------------------------------------
// Raw TOML structure (intermediate representation)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GsnConfigRaw {
    storage: StorageConfig,
    runtime: RuntimeConfig,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default, rename = "sensor")]
    sensors: Vec<SensorConfig>,
}

// ---------------------------------------------------------------------------
// GsnConfig (resolved, validated)
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct GsnConfig {
    pub storage: StorageConfig,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
    pub sensors: Vec<SensorConfig>,
}

impl GsnConfig {
    /// Read and parse a `gsn.toml` file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.as_ref().display()))?;
        content.parse()
    }

    /// Distinct wrapper names referenced by any source, sorted.
    pub fn wrapper_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .sensors
            .iter()
            .flat_map(|s| s.sources.iter())
            .filter_map(|src| src.wrapper.as_deref())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl FromStr for GsnConfig {
    type Err = anyhow::Error;

    /// Parse a TOML string into a validated [`GsnConfig`].
    fn from_str(toml_str: &str) -> anyhow::Result<Self> {
        let raw: GsnConfigRaw = toml::from_str(toml_str)?;

        let config = GsnConfig {
            storage: raw.storage,
            runtime: raw.runtime,
            logging: raw.logging,
            sensors: raw.sensors,
        };

        validate::validate(&config)?;

        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::logging::LogFormat;
    use crate::types::WindowAmount;
    use std::time::Duration;

    const FULL_TOML: &str = r#"
[storage]
dialect = "mysql"

[runtime]
retention_interval = "30s"

[logging]
level = "debug"
format = "json"

[[sensor]]
name = "room_monitor"
storage_size = "1h"
input_query = "select avg(temperature) from src1"

  [[sensor.source]]
  alias = "src1"
  wrapper = "memory_wrapper"
  query = "select * from wrapper where temperature > 20"
  storage_size = "10"
  slide = "2"
  sampling_rate = 0.5

  [[sensor.source]]
  alias = "src2"
  wrapper = "remote_wrapper"
  storage_size = "5m"

[[sensor]]
name = "door_log"

  [[sensor.source]]
  alias = "doors"
  wrapper = "memory_wrapper"
"#;

    #[test]
    fn load_full_toml() {
        let cfg: GsnConfig = FULL_TOML.parse().unwrap();

        assert_eq!(cfg.storage.dialect, Dialect::MySql);
        assert_eq!(cfg.storage.helper_table, "_sql_view_helper_");
        assert_eq!(
            cfg.runtime.retention_interval.as_duration(),
            Duration::from_secs(30)
        );
        assert_eq!(cfg.runtime.element_channel_capacity, 1024);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, LogFormat::Json);

        assert_eq!(cfg.sensors.len(), 2);
        let room = &cfg.sensors[0];
        assert_eq!(room.storage_size, Some(WindowAmount::Millis(3_600_000)));
        assert_eq!(room.sources.len(), 2);
        assert_eq!(room.sources[0].storage_size.as_deref(), Some("10"));
        assert_eq!(room.sources[0].slide.as_deref(), Some("2"));
        assert_eq!(room.sources[0].sampling_rate, 0.5);
        assert_eq!(room.sources[1].query, "select * from wrapper");
        assert_eq!(room.sources[1].sampling_rate, 1.0);

        assert_eq!(cfg.wrapper_names(), vec!["memory_wrapper", "remote_wrapper"]);
    }

    #[test]
    fn logging_section_optional() {
        let toml = FULL_TOML.replace("[logging]\nlevel = \"debug\"\nformat = \"json\"\n", "");
        let cfg: GsnConfig = toml.parse().unwrap();
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, LogFormat::Plain);
    }

    #[test]
    fn reject_unknown_dialect() {
        let toml = FULL_TOML.replace("\"mysql\"", "\"sqlite\"");
        assert!(toml.parse::<GsnConfig>().is_err());
    }

    #[test]
    fn reject_bad_sensor_storage_size() {
        let toml = FULL_TOML.replace("storage_size = \"1h\"", "storage_size = \"1x\"");
        assert!(toml.parse::<GsnConfig>().is_err());
    }

    #[test]
    fn reject_zero_row_sensor_storage() {
        let toml = FULL_TOML.replace("storage_size = \"1h\"", "storage_size = \"0\"");
        let err = toml.parse::<GsnConfig>().unwrap_err();
        assert!(err.to_string().contains("storage_size"), "{err}");
    }

    #[test]
    fn malformed_source_window_is_not_a_config_error() {
        let toml = FULL_TOML.replace("storage_size = \"10\"", "storage_size = \"1s0\"");
        let cfg: GsnConfig = toml.parse().unwrap();
        assert_eq!(cfg.sensors[0].sources[0].storage_size.as_deref(), Some("1s0"));
    }

    #[test]
    fn reject_duplicate_sensor_names() {
        let toml = FULL_TOML.replace("name = \"door_log\"", "name = \"room_monitor\"");
        let err = toml.parse::<GsnConfig>().unwrap_err();
        assert!(err.to_string().contains("duplicate"), "{err}");
    }

    #[test]
    fn reject_duplicate_alias_case_insensitive() {
        let toml = FULL_TOML.replace("alias = \"src2\"", "alias = \"SRC1\"");
        let err = toml.parse::<GsnConfig>().unwrap_err();
        assert!(err.to_string().contains("SRC1"), "{err}");
    }
}
