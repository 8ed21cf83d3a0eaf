use gsn_config::Dialect;

use crate::error::CoreResult;
use crate::source::{StreamSource, WRAPPER_ALIAS};
use crate::sql::{conjoin_where, rename_tables};
use crate::storage::ViewHelper;

/// Build the window view SELECT of `source` over the wrapper table
/// `wrapper_table`.
///
/// The logical query keeps its own predicate; sampling, the window bound and
/// the active interval are conjoined after it, in that order. Window bounds
/// are anchored on the source's watermark row in the helper table.
pub(crate) fn build_view_sql(
    source: &StreamSource,
    wrapper_table: &str,
    dialect: Dialect,
    helper: &ViewHelper,
) -> CoreResult<String> {
    let window = source.window();
    if window.yields_nothing() {
        return Ok(format!("select * from {wrapper_table} where 1=0"));
    }

    let renamed = rename_tables(
        source.sql_query(),
        &[(WRAPPER_ALIAS, wrapper_table)],
        dialect.wraps_subquery_in_from(),
    )?;

    let mut predicates = Vec::with_capacity(4);
    if window.sampling_rate < 1.0 {
        predicates.push(format!(
            "({}) < {}",
            dialect.modulo("timed", 100),
            percent(window.sampling_rate)
        ));
    }

    let watermark = helper.watermark_subquery(source.uid());
    if window.is_unbounded() {
        predicates.push(format!("timed <= {watermark}"));
    } else if window.is_storage_count_based() {
        let oldest = dialect.nth_newest(
            "timed",
            wrapper_table,
            Some(&format!("timed <= {watermark}")),
            window.storage_amount,
        );
        predicates.push(format!("timed >= ({oldest}) and timed <= {watermark}"));
    } else {
        predicates.push(format!(
            "timed > {watermark} - {} and timed <= {watermark}",
            window.storage_amount
        ));
    }

    let (start, end) = source.active_interval();
    if let Some(start) = start {
        predicates.push(format!("timed >= {start}"));
    }
    if let Some(end) = end {
        predicates.push(format!("timed <= {end}"));
    }

    conjoin_where(&renamed, &predicates)
}

/// Sampling rate as a percentage, at most two decimals.
fn percent(rate: f32) -> String {
    let pct = (f64::from(rate) * 10_000.0).round() / 100.0;
    pct.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_formatting() {
        assert_eq!(percent(0.5), "50");
        assert_eq!(percent(0.3), "30");
        assert_eq!(percent(0.125), "12.5");
    }
}
