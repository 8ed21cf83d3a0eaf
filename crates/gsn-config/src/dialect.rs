use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Dialect
// ---------------------------------------------------------------------------

/// SQL dialect of the relational backend.
///
/// Resolved once from `[storage] dialect` and handed to everything that
/// builds SQL text. The dialects only disagree on row limiting, modulo
/// syntax, and where a subquery has to be wrapped in a derived table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    H2,
    MySql,
    #[serde(alias = "postgresql")]
    Postgres,
    SqlServer,
    Oracle,
}

impl Dialect {
    pub const ALL: [Dialect; 5] = [
        Dialect::H2,
        Dialect::MySql,
        Dialect::Postgres,
        Dialect::SqlServer,
        Dialect::Oracle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::H2 => "h2",
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::SqlServer => "sqlserver",
            Self::Oracle => "oracle",
        }
    }

    /// Restrict `query` to `limit` rows after skipping `offset` rows.
    pub fn limit_offset(&self, query: &str, limit: u64, offset: u64) -> String {
        match self {
            Self::H2 | Self::MySql | Self::Postgres => {
                format!("{query} limit {limit} offset {offset}")
            }
            Self::SqlServer => {
                let trimmed = query.trim_start();
                if offset == 0 && trimmed.len() >= 7 && trimmed[..7].eq_ignore_ascii_case("select ") {
                    format!("select top {limit} {}", &trimmed[7..])
                } else {
                    format!("{query} offset {offset} rows fetch next {limit} rows only")
                }
            }
            Self::Oracle => format!(
                "select * from (select q_.*, rownum rn_ from ({query}) q_ where rownum <= {}) where rn_ > {offset}",
                offset + limit
            ),
        }
    }

    /// `expr mod n` in this dialect.
    pub fn modulo(&self, expr: &str, n: i64) -> String {
        match self {
            Self::H2 => format!("{expr} - ({expr} / {n}) * {n}"),
            Self::SqlServer => format!("{expr} % {n}"),
            Self::MySql | Self::Postgres | Self::Oracle => format!("mod({expr}, {n})"),
        }
    }

    /// A SELECT returning the `n`-th largest value of `column` in `table`
    /// (optionally filtered), or no row when fewer than `n` rows qualify.
    pub fn nth_newest(&self, column: &str, table: &str, filter: Option<&str>, n: i64) -> String {
        let filter = filter.map(|f| format!(" where {f}")).unwrap_or_default();
        match self {
            Self::H2 | Self::MySql | Self::Postgres => format!(
                "select {column} from {table}{filter} order by {column} desc limit 1 offset {}",
                (n - 1).max(0)
            ),
            Self::SqlServer => format!(
                "select min({column}) from (select top {n} {column} from {table}{filter} order by {column} desc) as nth_ having count(*) = {n}"
            ),
            Self::Oracle => format!(
                "select {column} from (select {column}, rownum as rn_ from (select {column} from {table}{filter} order by {column} desc)) where rn_ = {n}"
            ),
        }
    }

    /// H2 wants a substituted FROM target wrapped in a nested SELECT.
    pub fn wraps_subquery_in_from(&self) -> bool {
        matches!(self, Self::H2)
    }

    /// MySQL refuses a DELETE whose subquery reads the target table unless
    /// that subquery is materialised through a derived table.
    pub fn wraps_delete_subquery(&self) -> bool {
        matches!(self, Self::MySql)
    }

    /// Column type used for millisecond timestamps.
    pub fn timestamp_type(&self) -> &'static str {
        match self {
            Self::Oracle => "number(19)",
            _ => "bigint",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "h2" => Ok(Self::H2),
            "mysql" => Ok(Self::MySql),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlserver" => Ok(Self::SqlServer),
            "oracle" => Ok(Self::Oracle),
            other => anyhow::bail!(
                "unknown SQL dialect {other:?} (expected h2/mysql/postgres/sqlserver/oracle)"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        for d in Dialect::ALL {
            assert_eq!(d.name().parse::<Dialect>().unwrap(), d);
        }
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert!("sqlite".parse::<Dialect>().is_err());
    }

    #[test]
    fn limit_offset_variants() {
        assert_eq!(
            Dialect::MySql.limit_offset("select * from t", 1, 0),
            "select * from t limit 1 offset 0"
        );
        assert_eq!(
            Dialect::SqlServer.limit_offset("select * from t", 1, 0),
            "select top 1 * from t"
        );
        assert_eq!(
            Dialect::SqlServer.limit_offset("select * from t order by pk", 5, 10),
            "select * from t order by pk offset 10 rows fetch next 5 rows only"
        );
        assert!(
            Dialect::Oracle
                .limit_offset("select * from t", 2, 3)
                .contains("rownum <= 5) where rn_ > 3")
        );
    }

    #[test]
    fn modulo_variants() {
        assert_eq!(Dialect::Postgres.modulo("timed", 100), "mod(timed, 100)");
        assert_eq!(Dialect::SqlServer.modulo("timed", 100), "timed % 100");
        assert_eq!(Dialect::H2.modulo("timed", 100), "timed - (timed / 100) * 100");
    }

    #[test]
    fn nth_newest_variants() {
        assert_eq!(
            Dialect::H2.nth_newest("pk", "t", None, 3),
            "select pk from t order by pk desc limit 1 offset 2"
        );
        assert!(
            Dialect::SqlServer
                .nth_newest("timed", "t", Some("timed <= 5"), 4)
                .contains("top 4 timed from t where timed <= 5")
        );
        assert!(Dialect::Oracle.nth_newest("pk", "t", None, 2).ends_with("where rn_ = 2"));
    }

    #[test]
    fn serde_lowercase_names() {
        #[derive(Deserialize)]
        struct Holder {
            dialect: Dialect,
        }
        let h: Holder = toml::from_str("dialect = \"sqlserver\"").unwrap();
        assert_eq!(h.dialect, Dialect::SqlServer);
        let h: Holder = toml::from_str("dialect = \"mysql\"").unwrap();
        assert_eq!(h.dialect, Dialect::MySql);
    }
}
