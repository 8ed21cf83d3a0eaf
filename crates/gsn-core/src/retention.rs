use gsn_config::{Dialect, WindowAmount};

// ---------------------------------------------------------------------------
// StoragePolicy
// ---------------------------------------------------------------------------

/// How much of a virtual sensor's persisted table to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoragePolicy {
    /// Keep the newest N rows.
    LastRows(i64),
    /// Keep rows newer than D milliseconds before the newest row.
    LastMillis(i64),
}

impl From<WindowAmount> for StoragePolicy {
    fn from(amount: WindowAmount) -> Self {
        match amount {
            WindowAmount::Tuples(n) => Self::LastRows(n),
            WindowAmount::Millis(d) => Self::LastMillis(d),
        }
    }
}

/// DELETE removing the rows of `table` that `policy` no longer keeps.
///
/// A count policy whose boundary row does not exist yet deletes nothing:
/// comparing against an empty subquery yields NULL. Keeping zero rows
/// empties the table.
pub fn useless_data_removal(table: &str, policy: StoragePolicy, dialect: Dialect) -> String {
    let boundary = match policy {
        StoragePolicy::LastRows(n) if n <= 0 => return format!("delete from {table}"),
        StoragePolicy::LastRows(n) => dialect.nth_newest("timed", table, None, n),
        StoragePolicy::LastMillis(d) => format!("select max(timed) - {d} as timed from {table}"),
    };
    if dialect.wraps_delete_subquery() {
        format!("delete from {table} where timed < (select b.timed from ({boundary}) as b)")
    } else {
        format!("delete from {table} where timed < ({boundary})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_from_amount() {
        assert_eq!(
            StoragePolicy::from("10".parse::<WindowAmount>().unwrap()),
            StoragePolicy::LastRows(10)
        );
        assert_eq!(
            StoragePolicy::from("2m".parse::<WindowAmount>().unwrap()),
            StoragePolicy::LastMillis(120_000)
        );
    }

    #[test]
    fn count_policy() {
        assert_eq!(
            useless_data_removal("room", StoragePolicy::LastRows(10), Dialect::Postgres),
            "delete from room where timed < (select timed from room order by timed desc limit 1 offset 9)"
        );
    }

    #[test]
    fn zero_rows_empties_table() {
        for d in Dialect::ALL {
            assert_eq!(useless_data_removal("room", StoragePolicy::LastRows(0), d), "delete from room");
        }
    }

    #[test]
    fn duration_policy() {
        assert_eq!(
            useless_data_removal("room", StoragePolicy::LastMillis(60_000), Dialect::H2),
            "delete from room where timed < (select max(timed) - 60000 as timed from room)"
        );
    }

    #[test]
    fn mysql_goes_through_derived_table() {
        let sql = useless_data_removal("room", StoragePolicy::LastMillis(5_000), Dialect::MySql);
        assert_eq!(
            sql,
            "delete from room where timed < (select b.timed from (select max(timed) - 5000 as timed from room) as b)"
        );
    }

    #[test]
    fn every_dialect_deletes_from_table() {
        for d in Dialect::ALL {
            let sql = useless_data_removal("room", StoragePolicy::LastRows(3), d);
            assert!(sql.starts_with("delete from room where timed < ("), "{d}: {sql}");
        }
    }
}
