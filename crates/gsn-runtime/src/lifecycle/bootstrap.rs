use std::collections::BTreeMap;
use std::sync::Arc;

use gsn_config::GsnConfig;
use gsn_core::{StorageEngine, StreamSource, ViewHelper, Wrapper, WrapperHandlers};
use orion_error::prelude::*;
use tokio::sync::mpsc;

use crate::error::{RuntimeReason, RuntimeResult};
use crate::forwarder::WindowForwarder;
use crate::retention_task::SensorRetention;
use crate::wrapper::TableWrapper;

use super::types::{BootstrapData, WrapperPipe};

/// Create (or clear) the helper table, then build one handler set per
/// wrapper and attach every sensor's sources to it.
///
/// Runs on the blocking pool: every step talks to storage synchronously.
/// A source that fails validation or whose view the backend refuses is
/// logged and skipped; only a helper table that can be neither created nor
/// cleared aborts the bootstrap.
pub(super) fn bootstrap(
    config: &GsnConfig,
    storage: Arc<dyn StorageEngine>,
) -> RuntimeResult<BootstrapData> {
    let helper = ViewHelper::new(&config.storage.helper_table);
    prepare_helper_table(&helper, storage.as_ref())?;

    let mut handlers: BTreeMap<&str, Arc<WrapperHandlers>> = BTreeMap::new();
    for name in config.wrapper_names() {
        let wrapper: Arc<dyn Wrapper> = Arc::new(TableWrapper::new(name));
        handlers.insert(
            name,
            Arc::new(WrapperHandlers::new(wrapper, Arc::clone(&storage), helper.clone())),
        );
    }

    let (window_tx, window_rx) = mpsc::channel(config.runtime.window_channel_capacity);
    let mut source_count = 0;
    let mut sensors = Vec::new();

    for sensor in &config.sensors {
        let mut sources: Vec<StreamSource> =
            sensor.sources.iter().map(StreamSource::from_config).collect();
        let forwarder = WindowForwarder::new(
            &sensor.name,
            sensor.input_query.as_deref(),
            &sources,
            Arc::clone(&storage),
            window_tx.clone(),
        )
        .err_conv()?;
        let forwarder = Arc::new(forwarder);

        for (mut source, raw) in sources.drain(..).zip(&sensor.sources) {
            source.set_listener(forwarder.clone());
            let Some(handler) = raw.wrapper.as_deref().and_then(|w| handlers.get(w)) else {
                gsn_warn!(conf, sensor = %sensor.name, source = %raw.alias, "source names no wrapper, disabled");
                continue;
            };
            match handler.attach(source) {
                Ok(true) => source_count += 1,
                Ok(false) => {
                    gsn_warn!(conf, sensor = %sensor.name, source = %raw.alias, "view refused by storage, source disabled");
                }
                Err(e) => {
                    gsn_warn!(conf, sensor = %sensor.name, source = %raw.alias, error = %e, "source disabled");
                }
            }
        }

        if let Some(amount) = sensor.storage_size {
            sensors.push(SensorRetention {
                table: sensor.name.clone(),
                policy: amount.into(),
            });
        }
    }

    let mut pipes = Vec::with_capacity(handlers.len());
    let mut inputs = Vec::with_capacity(handlers.len());
    for (name, h) in handlers {
        let (tx, rx) = mpsc::channel(config.runtime.element_channel_capacity);
        gsn_debug!(conf, wrapper = name, sources = h.source_count(), "wrapper ready");
        pipes.push(WrapperPipe { handlers: h, rx });
        inputs.push((name.to_string(), tx));
    }

    Ok(BootstrapData {
        pipes,
        inputs,
        sensors,
        window_rx,
        source_count,
    })
}

/// A helper table left over from a previous run is emptied instead.
fn prepare_helper_table(helper: &ViewHelper, storage: &dyn StorageEngine) -> RuntimeResult<()> {
    let Err(create) = storage.execute_update(&helper.create_table_sql(storage.dialect())) else {
        return Ok(());
    };
    match storage.execute_update(&helper.clear_sql()) {
        Ok(stale) => {
            gsn_debug!(conf, table = helper.table(), stale, "helper table exists, cleared");
            Ok(())
        }
        Err(clear) => StructError::from(RuntimeReason::Bootstrap)
            .with_detail(format!(
                "helper table {}: create failed ({create}), clear failed ({clear})",
                helper.table()
            ))
            .err(),
    }
}
