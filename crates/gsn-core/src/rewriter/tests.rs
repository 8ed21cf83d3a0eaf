use std::sync::Arc;

use gsn_config::Dialect;

use super::*;
use crate::source::{Addressing, Wrapper};
use crate::storage::{FieldValue, Row};
use crate::testing::{RecordingListener, ScriptedStorage, StaticWrapper};

const HELPER: &str = "_sql_view_helper_";

fn attached(query: &str, storage: Option<&str>, slide: Option<&str>, rate: f32) -> StreamSource {
    let mut s = StreamSource::new("src1", query);
    s.add_addressing(Addressing::new("mem"));
    s.set_raw_storage(storage);
    s.set_raw_slide(slide);
    s.set_sampling_rate(rate).unwrap();
    let wrapper: Arc<dyn Wrapper> = Arc::new(StaticWrapper::new("mem", "mem_table"));
    s.set_wrapper(wrapper).unwrap();
    assert!(s.validate());
    s
}

fn rewriter(source: StreamSource, dialect: Dialect) -> (SqlViewRewriter, Arc<ScriptedStorage>) {
    let storage = Arc::new(ScriptedStorage::new(dialect));
    let rw = SqlViewRewriter::new(source, storage.clone(), ViewHelper::new(HELPER));
    (rw, storage)
}

fn watermark(uid: &str) -> String {
    format!("(select timed from {HELPER} where u_id = '{uid}')")
}

// ---------------------------------------------------------------------------
// create_view_sql
// ---------------------------------------------------------------------------

#[test]
fn predicate_sampling_and_count_window_compose() {
    let source = attached("select * from wrapper where x > 1", Some("10"), None, 0.5);
    let (rw, _) = rewriter(source, Dialect::Postgres);
    let uid = rw.source().uid().to_string();
    let h = watermark(&uid);

    assert_eq!(
        rw.create_view_sql().unwrap(),
        format!(
            "select * from mem_table where (x > 1) and (mod(timed, 100)) < 50 \
             and timed >= (select timed from mem_table where timed <= {h} order by timed desc limit 1 offset 9) \
             and timed <= {h}"
        )
    );
    assert_eq!(
        rw.rewrite("select * from wrapper where x > 1").unwrap(),
        format!("select * from {uid} where x > 1")
    );
}

#[test]
fn time_window_on_h2_wraps_from_target() {
    let source = attached("select * from wrapper where x > 1", Some("10s"), None, 1.0);
    let (rw, _) = rewriter(source, Dialect::H2);
    let h = watermark(rw.source().uid());
    assert_eq!(
        rw.create_view_sql().unwrap(),
        format!(
            "select * from (select * from mem_table) as mem_table where (x > 1) \
             and timed > {h} - 10000 and timed <= {h}"
        )
    );
}

#[test]
fn sql_server_count_window_uses_top() {
    let source = attached("select * from wrapper", Some("10"), Some("2"), 0.25);
    let (rw, _) = rewriter(source, Dialect::SqlServer);
    let sql = rw.create_view_sql().unwrap();
    assert!(sql.starts_with("select * from mem_table where (timed % 100) < 25 and timed >= ("));
    assert!(sql.contains("select top 10 timed from mem_table where timed <= "));
    assert!(!sql.contains("limit"));
}

#[test]
fn sampling_modulo_per_dialect() {
    for (dialect, expected) in [
        (Dialect::Oracle, "(mod(timed, 100)) < 50"),
        (Dialect::MySql, "(mod(timed, 100)) < 50"),
        (Dialect::H2, "(timed - (timed / 100) * 100) < 50"),
    ] {
        let source = attached("select * from wrapper", Some("5"), None, 0.5);
        let (rw, _) = rewriter(source, dialect);
        let sql = rw.create_view_sql().unwrap();
        assert!(sql.contains(expected), "{dialect}: {sql}");
    }
}

#[test]
fn unbounded_window_only_caps_at_watermark() {
    let source = attached("select * from wrapper", None, None, 1.0);
    let (rw, _) = rewriter(source, Dialect::MySql);
    let h = watermark(rw.source().uid());
    assert_eq!(
        rw.create_view_sql().unwrap(),
        format!("select * from mem_table where timed <= {h}")
    );
}

#[test]
fn empty_windows_degenerate() {
    let source = attached("select * from wrapper where x > 1", Some("5"), None, 0.0);
    let (rw, _) = rewriter(source, Dialect::Postgres);
    assert_eq!(rw.create_view_sql().unwrap(), "select * from mem_table where 1=0");

    let source = attached("select * from wrapper", Some("0"), None, 1.0);
    let (rw, _) = rewriter(source, Dialect::Postgres);
    assert_eq!(rw.create_view_sql().unwrap(), "select * from mem_table where 1=0");
}

#[test]
fn active_interval_is_appended() {
    let mut source = attached("select * from wrapper", None, None, 1.0);
    source.set_active_interval(Some(5), Some(9));
    assert!(source.validate());
    let (rw, _) = rewriter(source, Dialect::Postgres);
    let sql = rw.create_view_sql().unwrap();
    assert!(sql.ends_with(" and timed >= 5 and timed <= 9"), "{sql}");
}

#[test]
fn trailing_clauses_stay_last() {
    let source = attached("select avg(x) from wrapper group by room", Some("1m"), None, 1.0);
    let (rw, _) = rewriter(source, Dialect::Postgres);
    let sql = rw.create_view_sql().unwrap();
    assert!(sql.starts_with("select avg(x) from mem_table where timed > "));
    assert!(sql.ends_with(" group by room"));
}

// ---------------------------------------------------------------------------
// initialize / data_available / dispose
// ---------------------------------------------------------------------------

#[test]
fn initialize_creates_view_and_watermark_row() {
    let source = attached("select * from wrapper", Some("5"), None, 1.0);
    let (rw, storage) = rewriter(source, Dialect::Postgres);
    let uid = rw.source().uid().to_string();

    assert!(rw.initialize().unwrap());
    let statements = storage.statements();
    assert_eq!(statements.len(), 2);
    assert!(statements[0].starts_with(&format!("create view {uid} as select * from mem_table")));
    assert_eq!(
        statements[1],
        format!("insert into {HELPER} (u_id, timed) values ('{uid}', 0)")
    );
}

#[test]
fn failed_initialize_cleans_up() {
    let source = attached("select * from wrapper", Some("5"), None, 1.0);
    let (rw, storage) = rewriter(source, Dialect::Postgres);
    let uid = rw.source().uid().to_string();
    storage.fail_on("create view");

    assert!(!rw.initialize().unwrap());
    assert_eq!(storage.count_matching(&format!("drop view {uid}")), 1);
    assert_eq!(
        storage.count_matching(&format!("delete from {HELPER} where u_id = '{uid}'")),
        1
    );
}

#[test]
fn initialize_before_validation_is_an_error() {
    let mut source = StreamSource::new("src1", "select * from wrapper");
    source.add_addressing(Addressing::new("mem"));
    let wrapper: Arc<dyn Wrapper> = Arc::new(StaticWrapper::new("mem", "mem_table"));
    source.set_wrapper(wrapper).unwrap();
    let (rw, storage) = rewriter(source, Dialect::Postgres);
    assert!(rw.initialize().is_err());
    assert!(storage.statements().is_empty());
}

#[test]
fn data_available_updates_watermark_then_checks_emptiness() {
    let listener = Arc::new(RecordingListener::default());
    let mut source = attached("select * from wrapper", Some("5"), None, 1.0);
    source.set_listener(listener.clone());
    let (rw, storage) = rewriter(source, Dialect::Postgres);
    let uid = rw.source().uid().to_string();

    assert!(!rw.data_available(1_000));
    assert_eq!(
        storage.statements(),
        vec![
            format!("update {HELPER} set timed = 1000 where u_id = '{uid}'"),
            format!("select * from {uid} limit 1 offset 0"),
        ]
    );
    assert!(listener.slides().is_empty());

    storage.respond(
        &format!("select * from {uid}"),
        vec![Row::new(vec![FieldValue::Integer(1)])],
    );
    assert!(rw.data_available(2_000));
    assert_eq!(listener.slides(), vec!["src1".to_string()]);
}

#[test]
fn backend_failure_is_neutral() {
    let source = attached("select * from wrapper", Some("5"), None, 1.0);
    let (rw, storage) = rewriter(source, Dialect::Postgres);
    storage.fail_on("update");
    assert!(!rw.data_available(1_000));
    assert_eq!(storage.count_matching("select"), 0);
}

#[test]
fn dispose_drops_view_and_row() {
    let source = attached("select * from wrapper", Some("5"), None, 1.0);
    let (rw, storage) = rewriter(source, Dialect::Postgres);
    let uid = rw.source().uid().to_string();
    rw.dispose().unwrap();
    assert_eq!(
        storage.statements(),
        vec![
            format!("drop view {uid}"),
            format!("delete from {HELPER} where u_id = '{uid}'"),
        ]
    );
}

#[test]
fn dispose_without_wrapper_is_an_error() {
    let source = StreamSource::new("src1", "select * from wrapper");
    let (rw, storage) = rewriter(source, Dialect::Postgres);
    assert!(rw.dispose().is_err());
    assert!(storage.statements().is_empty());
}
