use std::collections::HashSet;

use crate::gsn::GsnConfig;
use crate::types::WindowAmount;

/// Internal validation, called automatically during `GsnConfig::from_str` / `load`.
pub(crate) fn validate(config: &GsnConfig) -> anyhow::Result<()> {
    if config.runtime.element_channel_capacity == 0 {
        anyhow::bail!("runtime.element_channel_capacity must be > 0");
    }
    if config.runtime.window_channel_capacity == 0 {
        anyhow::bail!("runtime.window_channel_capacity must be > 0");
    }
    if !is_valid_identifier(&config.storage.helper_table) {
        anyhow::bail!(
            "storage.helper_table: invalid table name {:?}",
            config.storage.helper_table
        );
    }

    if config.sensors.is_empty() {
        anyhow::bail!("at least one [[sensor]] must be configured");
    }

    let mut sensor_names = HashSet::new();
    for sensor in &config.sensors {
        // sensor names double as output table names
        if !is_valid_identifier(&sensor.name) {
            anyhow::bail!(
                "sensor {:?}: name must match [A-Za-z_][A-Za-z0-9_]*",
                sensor.name
            );
        }
        if !sensor_names.insert(sensor.name.to_ascii_lowercase()) {
            anyhow::bail!("duplicate sensor name: {:?}", sensor.name);
        }
        if sensor.storage_size == Some(WindowAmount::Tuples(0)) {
            anyhow::bail!(
                "sensor {:?}: storage_size \"0\" would keep no rows; omit it to keep everything",
                sensor.name
            );
        }
        if sensor.sources.is_empty() {
            anyhow::bail!("sensor {:?}: at least one [[sensor.source]] is required", sensor.name);
        }

        let mut aliases = HashSet::new();
        for source in &sensor.sources {
            if !is_valid_identifier(&source.alias) {
                anyhow::bail!(
                    "sensor {:?}: source alias {:?} must match [A-Za-z_][A-Za-z0-9_]*",
                    sensor.name,
                    source.alias
                );
            }
            if !aliases.insert(source.alias.to_ascii_lowercase()) {
                anyhow::bail!(
                    "sensor {:?}: duplicate source alias {:?}",
                    sensor.name,
                    source.alias
                );
            }
            if matches!((source.start_time, source.end_time), (Some(start), Some(end)) if start > end) {
                anyhow::bail!(
                    "sensor {:?}: source {:?} has start_time after end_time",
                    sensor.name,
                    source.alias
                );
            }
        }
    }

    Ok(())
}

/// A valid identifier starts with ASCII letter or underscore, followed by
/// ASCII alphanumerics or underscores.
fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.bytes();
    match chars.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    chars.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
