use std::sync::Arc;
use std::time::Duration;

use gsn_core::{StorageEngine, StoragePolicy, WrapperHandlers, useless_data_removal};
use tokio_util::sync::CancellationToken;

/// Retention policy of one virtual sensor's persisted table.
#[derive(Debug, Clone)]
pub(crate) struct SensorRetention {
    pub table: String,
    pub policy: StoragePolicy,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SweepReport {
    pub wrapper_rows: u64,
    pub sensor_rows: u64,
    pub failures: usize,
}

/// One retention pass: trim every wrapper table down to what its windows
/// still need, then apply each sensor's storage policy.
pub(crate) fn sweep(
    handlers: &[Arc<WrapperHandlers>],
    sensors: &[SensorRetention],
    storage: &dyn StorageEngine,
) -> SweepReport {
    let mut report = SweepReport::default();
    for h in handlers {
        let Some(sql) = h.cleanup_statement() else {
            continue;
        };
        match storage.execute_update(&sql) {
            Ok(n) => report.wrapper_rows += n,
            Err(e) => {
                report.failures += 1;
                gsn_warn!(res, wrapper = h.wrapper().name(), error = %e, "wrapper cleanup failed");
            }
        }
    }
    for s in sensors {
        let sql = useless_data_removal(&s.table, s.policy, storage.dialect());
        match storage.execute_update(&sql) {
            Ok(n) => report.sensor_rows += n,
            Err(e) => {
                report.failures += 1;
                gsn_warn!(res, sensor = %s.table, error = %e, "sensor retention failed");
            }
        }
    }
    report
}

/// Run the retention sweep periodically until cancelled.
#[tracing::instrument(name = "retention", skip_all)]
pub(crate) async fn run_retention(
    handlers: Vec<Arc<WrapperHandlers>>,
    sensors: Vec<SensorRetention>,
    storage: Arc<dyn StorageEngine>,
    interval: Duration,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let handlers = Arc::new(handlers);
    let sensors = Arc::new(sensors);
    let mut tick = tokio::time::interval(interval);
    // the first tick completes immediately; nothing has been stored yet
    tick.tick().await;
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let (h, s, st) = (Arc::clone(&handlers), Arc::clone(&sensors), Arc::clone(&storage));
                let report = tokio::task::spawn_blocking(move || sweep(&h, &s, st.as_ref())).await?;
                if report.wrapper_rows > 0 || report.sensor_rows > 0 || report.failures > 0 {
                    gsn_debug!(res,
                        wrapper_rows = report.wrapper_rows,
                        sensor_rows = report.sensor_rows,
                        failures = report.failures,
                        "retention sweep"
                    );
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use gsn_core::testing::ScriptedStorage;
    use gsn_core::{Addressing, Dialect, StreamSource, ViewHelper, Wrapper};

    use super::*;
    use crate::wrapper::TableWrapper;

    fn attached(storage: Arc<ScriptedStorage>, name: &str, window: &str) -> Arc<WrapperHandlers> {
        let wrapper: Arc<dyn Wrapper> = Arc::new(TableWrapper::new(name));
        let handlers = WrapperHandlers::new(wrapper, storage, ViewHelper::new("_sql_view_helper_"));
        let mut source = StreamSource::new("a", "select * from wrapper");
        source.add_addressing(Addressing::new(name));
        source.set_raw_storage(Some(window));
        assert!(handlers.attach(source).unwrap());
        Arc::new(handlers)
    }

    #[test]
    fn sweeps_wrappers_with_sources_and_every_sensor() {
        let storage = Arc::new(ScriptedStorage::new(Dialect::Postgres));
        let busy = attached(storage.clone(), "busy", "10");
        let idle = Arc::new(WrapperHandlers::new(
            Arc::new(TableWrapper::new("idle")),
            storage.clone(),
            ViewHelper::new("_sql_view_helper_"),
        ));
        let sensors = vec![SensorRetention {
            table: "room".into(),
            policy: StoragePolicy::LastMillis(60_000),
        }];
        storage.clear_log();

        let report = sweep(&[busy, idle], &sensors, storage.as_ref());
        assert_eq!(report.failures, 0);
        assert_eq!(storage.count_matching("delete from w_busy where"), 1);
        assert_eq!(storage.count_matching("delete from w_idle"), 0);
        assert_eq!(
            storage.count_matching("delete from room where timed < (select max(timed) - 60000 as timed from room)"),
            1
        );
    }

    #[test]
    fn failures_are_counted_not_fatal() {
        let storage = Arc::new(ScriptedStorage::new(Dialect::H2));
        let busy = attached(storage.clone(), "busy", "10");
        storage.fail_on("delete from w_busy");
        let sensors = vec![SensorRetention {
            table: "room".into(),
            policy: StoragePolicy::LastRows(5),
        }];

        let report = sweep(&[busy], &sensors, storage.as_ref());
        assert_eq!(report.failures, 1);
        assert_eq!(storage.count_matching("delete from room"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_until_cancelled() {
        let storage = Arc::new(ScriptedStorage::new(Dialect::H2));
        let sensors = vec![SensorRetention {
            table: "room".into(),
            policy: StoragePolicy::LastRows(5),
        }];
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_retention(
            Vec::new(),
            sensors,
            storage.clone(),
            Duration::from_secs(30),
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(65)).await;
        cancel.cancel();
        task.await.unwrap().unwrap();
        assert_eq!(storage.count_matching("delete from room"), 2);
    }
}
