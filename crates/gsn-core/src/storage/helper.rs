use gsn_config::Dialect;

/// Statements against the shared view-helper table.
///
/// The table carries one `(u_id, timed)` row per live stream source. `timed`
/// is the source's watermark: the timestamp of the last element that made
/// its window slide. Window bounds are computed against it instead of the
/// wall clock so replayed or backlogged streams stay coherent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewHelper {
    table: String,
}

impl ViewHelper {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn create_table_sql(&self, dialect: Dialect) -> String {
        format!(
            "create table {} (u_id varchar(17) not null, timed {})",
            self.table,
            dialect.timestamp_type()
        )
    }

    /// Remove rows left behind by a previous process.
    pub fn clear_sql(&self) -> String {
        format!("delete from {}", self.table)
    }

    pub fn insert_sql(&self, uid: &str) -> String {
        format!("insert into {} (u_id, timed) values ('{uid}', 0)", self.table)
    }

    pub fn update_sql(&self, uid: &str, timed: i64) -> String {
        format!("update {} set timed = {timed} where u_id = '{uid}'", self.table)
    }

    pub fn delete_sql(&self, uid: &str) -> String {
        format!("delete from {} where u_id = '{uid}'", self.table)
    }

    /// Scalar subquery yielding the watermark of `uid`.
    pub fn watermark_subquery(&self, uid: &str) -> String {
        format!("(select timed from {} where u_id = '{uid}')", self.table)
    }
}
