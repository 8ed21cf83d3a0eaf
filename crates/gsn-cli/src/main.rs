use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use gsn_config::{GsnConfig, SensorConfig};
use gsn_core::{StoragePolicy, StreamSource, ViewHelper, useless_data_removal};
use gsn_runtime::tracing_init::{WorkerGuard, init_tracing};
use gsn_runtime::wrapper::TableWrapper;

#[derive(Parser)]
#[command(name = "gsn", about = "Sliding-window stream engine tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every stream source and print its window kind
    Check {
        /// Path to gsn.toml
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the compiled view SQL of every valid stream source
    Explain {
        /// Path to gsn.toml
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Check { config } => {
            let (config, _guard) = load(&config)?;
            let (valid, total) = check(&config);
            println!("{valid}/{total} sources valid");
            if valid < total {
                bail!("{} stream source(s) failed validation", total - valid);
            }
        }
        Commands::Explain { config } => {
            let (config, _guard) = load(&config)?;
            explain(&config)?;
        }
    }
    Ok(())
}

fn load(path: &Path) -> Result<(GsnConfig, Option<WorkerGuard>)> {
    let path = path
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("config path '{}': {e}", path.display()))?;
    let config = GsnConfig::load(&path)?;
    let base_dir = path.parent().unwrap_or(Path::new("."));
    let guard = init_tracing(&config.logging, base_dir)?;
    tracing::debug!(domain = "conf", sensors = config.sensors.len(), "configuration loaded");
    Ok((config, guard))
}

/// Sources of `sensor`, attached to their wrapper tables and validated.
fn prepared_sources(sensor: &SensorConfig) -> Vec<(StreamSource, bool)> {
    sensor
        .sources
        .iter()
        .map(|raw| {
            let mut source = StreamSource::from_config(raw);
            let attached = match &raw.wrapper {
                Some(w) => source.set_wrapper(Arc::new(TableWrapper::new(w))).is_ok(),
                None => false,
            };
            let valid = source.validate() && attached;
            (source, valid)
        })
        .collect()
}

fn check(config: &GsnConfig) -> (usize, usize) {
    let (mut valid, mut total) = (0, 0);
    for sensor in &config.sensors {
        println!("sensor {}", sensor.name);
        for (source, ok) in prepared_sources(sensor) {
            total += 1;
            if ok {
                valid += 1;
                let w = source.window();
                println!(
                    "  {:<16} {:<30} storage={} slide={} sampling={}",
                    source.alias(),
                    source.windowing_type(),
                    if w.is_unbounded() { "unbounded".to_string() } else { w.storage_amount.to_string() },
                    w.slide_amount,
                    source.sampling_rate(),
                );
            } else {
                println!(
                    "  {:<16} INVALID (storage={:?} slide={:?})",
                    source.alias(),
                    source.raw_storage().unwrap_or(""),
                    source.raw_slide().unwrap_or(""),
                );
            }
        }
    }
    (valid, total)
}

fn explain(config: &GsnConfig) -> Result<()> {
    let dialect = config.storage.dialect;
    let helper = ViewHelper::new(&config.storage.helper_table);
    println!("-- dialect {dialect}");
    println!("{};", helper.create_table_sql(dialect));
    for sensor in &config.sensors {
        println!("\n-- sensor {}", sensor.name);
        for (source, ok) in prepared_sources(sensor) {
            if !ok {
                println!("-- {}: invalid, skipped", source.alias());
                continue;
            }
            let sql = source.compiled_query(dialect, &helper).map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("-- {} ({})", source.alias(), source.windowing_type());
            println!("create view {} as {sql};", source.uid());
        }
        if let Some(amount) = sensor.storage_size {
            let sql = useless_data_removal(&sensor.name, StoragePolicy::from(amount), dialect);
            println!("-- retention\n{sql};");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[storage]
dialect = "mysql"

[runtime]
retention_interval = "30s"

[[sensor]]
name = "room"
storage_size = "1h"

  [[sensor.source]]
  alias = "a"
  wrapper = "mem"
  storage_size = "10"
  slide = "2"

  [[sensor.source]]
  alias = "b"
  wrapper = "mem"
  storage_size = "1m0"

  [[sensor.source]]
  alias = "c"
  storage_size = "5"
"#;

    #[test]
    fn check_counts_invalid_sources() {
        let config: GsnConfig = CONFIG.parse().unwrap();
        assert_eq!(check(&config), (1, 3));
    }

    #[test]
    fn explain_skips_invalid_sources() {
        let config: GsnConfig = CONFIG.parse().unwrap();
        explain(&config).unwrap();
    }
}
