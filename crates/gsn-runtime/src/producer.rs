use std::sync::Arc;

use gsn_core::{StorageEngine, StreamElement, WrapperHandlers};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Persist one element in the wrapper table and let the wrapper's handlers
/// react to it. Returns whether any window slid.
///
/// An element older than the newest one already stored never reaches the
/// table.
pub(crate) fn ingest(handlers: &WrapperHandlers, storage: &dyn StorageEngine, element: &StreamElement) -> bool {
    if !handlers.admit(element.timed) {
        return false;
    }
    let table = handlers.wrapper().db_alias();
    if let Err(e) = storage.execute_update(&element.insert_sql(table)) {
        gsn_warn!(pipe, wrapper = handlers.wrapper().name(), timed = element.timed, error = %e, "element insert failed");
        return false;
    }
    handlers.data_available(element)
}

/// Producer loop of one wrapper: elements are handled strictly in arrival
/// order, each on the blocking pool since storage calls are synchronous.
#[tracing::instrument(name = "producer", skip_all, fields(wrapper = %handlers.wrapper().name()))]
pub(crate) async fn run_producer(
    handlers: Arc<WrapperHandlers>,
    storage: Arc<dyn StorageEngine>,
    mut rx: mpsc::Receiver<StreamElement>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut slides = 0u64;
    let mut elements = 0u64;
    loop {
        let element = tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(element) => element,
                None => break,
            },
            _ = cancel.cancelled() => break,
        };
        let handlers = Arc::clone(&handlers);
        let storage = Arc::clone(&storage);
        let timed = element.timed;
        let slid =
            tokio::task::spawn_blocking(move || ingest(&handlers, storage.as_ref(), &element)).await?;
        gsn_trace!(pipe, timed, slid, "element handled");
        elements += 1;
        if slid {
            slides += 1;
        }
    }
    gsn_debug!(pipe, elements, slides, "producer stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use gsn_core::testing::ScriptedStorage;
    use gsn_core::{Dialect, FieldValue, Row, StreamSource, ViewHelper, Wrapper};

    use super::*;
    use crate::wrapper::TableWrapper;

    fn handlers(storage: Arc<ScriptedStorage>) -> Arc<WrapperHandlers> {
        let wrapper: Arc<dyn Wrapper> = Arc::new(TableWrapper::new("mem"));
        let handlers = WrapperHandlers::new(wrapper, storage, ViewHelper::new("_sql_view_helper_"));
        let mut source = StreamSource::new("a", "select * from wrapper");
        source.add_addressing(gsn_core::Addressing::new("mem"));
        source.set_raw_storage(Some("2"));
        assert!(handlers.attach(source).unwrap());
        Arc::new(handlers)
    }

    #[test]
    fn failed_insert_skips_handlers() {
        let storage = Arc::new(ScriptedStorage::new(Dialect::H2));
        let handlers = handlers(storage.clone());
        storage.fail_on("insert into w_mem");
        let element = StreamElement::new(5, vec![("v".into(), FieldValue::Integer(1))]);
        assert!(!ingest(&handlers, storage.as_ref(), &element));
        assert_eq!(storage.count_matching("update _sql_view_helper_"), 0);
    }

    #[test]
    fn late_element_is_not_stored() {
        let storage = Arc::new(ScriptedStorage::new(Dialect::H2));
        let handlers = handlers(storage.clone());
        for ts in [100, 200, 50, 200] {
            ingest(&handlers, storage.as_ref(), &StreamElement::new(ts, Vec::new()));
        }
        assert_eq!(storage.count_matching("insert into w_mem (timed) values (50)"), 0);
        assert_eq!(storage.count_matching("insert into w_mem (timed) values"), 3);
        assert_eq!(storage.count_matching("update _sql_view_helper_ set timed"), 3);
    }

    #[tokio::test]
    async fn drains_channel_until_closed() {
        let storage = Arc::new(
            ScriptedStorage::new(Dialect::H2).with_default_rows(vec![Row::new(vec![FieldValue::Integer(1)])]),
        );
        let handlers = handlers(storage.clone());
        let (tx, rx) = mpsc::channel(8);
        for ts in [1, 2, 3] {
            tx.send(StreamElement::new(ts, Vec::new())).await.unwrap();
        }
        drop(tx);

        run_producer(handlers, storage.clone(), rx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(storage.count_matching("insert into w_mem (timed) values"), 3);
        assert_eq!(storage.count_matching("update _sql_view_helper_ set timed"), 3);
    }

    #[tokio::test]
    async fn stops_on_cancel() {
        let storage = Arc::new(ScriptedStorage::new(Dialect::H2));
        let handlers = handlers(storage.clone());
        let (_tx, rx) = mpsc::channel::<StreamElement>(8);
        let cancel = CancellationToken::new();
        cancel.cancel();
        run_producer(handlers, storage, rx, cancel).await.unwrap();
    }
}
