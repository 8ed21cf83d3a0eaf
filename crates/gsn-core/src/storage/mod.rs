mod helper;
mod value;

pub use gsn_config::Dialect;
pub use helper::ViewHelper;
pub use value::{FieldValue, Row};

use crate::error::CoreResult;

// ---------------------------------------------------------------------------
// StorageEngine: capability surface of the relational backend
// ---------------------------------------------------------------------------

/// The slice of the relational backend the windowing core relies on.
///
/// Implementations own connection acquisition and release; every call is
/// synchronous and may fail with a driver error (including timeouts), which
/// must be reported as [`CoreReason::Storage`](crate::error::CoreReason).
pub trait StorageEngine: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Run a SELECT and return every row.
    fn query(&self, sql: &str) -> CoreResult<Vec<Row>>;

    /// Run a DDL/DML statement, returning the affected row count.
    fn execute_update(&self, sql: &str) -> CoreResult<u64>;

    fn create_view(&self, name: &str, select: &str) -> CoreResult<()> {
        self.execute_update(&format!("create view {name} as {select}"))
            .map(|_| ())
    }

    fn drop_view(&self, name: &str) -> CoreResult<()> {
        self.execute_update(&format!("drop view {name}")).map(|_| ())
    }

    fn add_limit(&self, query: &str, limit: u64, offset: u64) -> String {
        self.dialect().limit_offset(query, limit, offset)
    }

    /// First column of the first row as an integer; `None` for no row or a
    /// NULL value.
    fn query_i64(&self, sql: &str) -> CoreResult<Option<i64>> {
        Ok(self.query(sql)?.first().and_then(Row::first_i64))
    }
}
