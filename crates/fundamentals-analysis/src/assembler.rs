//! Period assembly and TTM revenue reconstruction.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use fundamentals_core::{CompanyStatements, PeriodRow};
use tracing::{debug, trace};

use crate::calculator::{calculate_ttm_revenue, convert_cumulative_to_quarterly};

/// Joins a company's three statement types on report date.
///
/// This is an outer join: a period missing a statement type still appears,
/// with that statement set to `None`. Rows are ascending by report date and
/// carry their derived TTM revenue.
#[must_use]
pub fn assemble_periods(statements: &CompanyStatements) -> Vec<PeriodRow> {
    let mut periods: BTreeMap<NaiveDate, PeriodRow> = BTreeMap::new();

    for row in &statements.balance_sheets {
        period_at(&mut periods, row.report_date).balance_sheet = Some(row.clone());
    }
    for row in &statements.income_statements {
        period_at(&mut periods, row.report_date).income_statement = Some(row.clone());
    }
    for row in &statements.cash_flows {
        period_at(&mut periods, row.report_date).cash_flow = Some(row.clone());
    }

    let mut rows: Vec<PeriodRow> = periods.into_values().collect();
    let ttm: Vec<Option<f64>> = (0..rows.len()).map(|i| ttm_revenue_at(&rows, i)).collect();
    for (row, ttm_revenue) in rows.iter_mut().zip(ttm) {
        row.ttm_revenue = ttm_revenue;
    }

    debug!(
        stock_code = %statements.stock_code,
        periods = rows.len(),
        "Assembled periods"
    );
    rows
}

fn period_at(periods: &mut BTreeMap<NaiveDate, PeriodRow>, date: NaiveDate) -> &mut PeriodRow {
    periods.entry(date).or_insert_with(|| PeriodRow::new(date))
}

/// Single-quarter revenue of period `index`.
///
/// A March period end is a first quarter, whose cumulative revenue is already
/// single-quarter. Any other period subtracts the cumulative revenue of the
/// latest earlier period of the same calendar year that reports revenue. When
/// no such period exists the period is treated as a first quarter.
#[must_use]
pub fn single_quarter_revenue(rows: &[PeriodRow], index: usize) -> Option<f64> {
    let current = rows.get(index)?;
    let cumulative = current.revenue()?;

    if current.report_date.month() == 3 {
        return convert_cumulative_to_quarterly(cumulative, None);
    }

    let year = current.report_date.year();
    let previous = rows[..index]
        .iter()
        .rev()
        .filter(|row| row.report_date.year() == year)
        .find_map(PeriodRow::revenue);

    if previous.is_none() {
        trace!(
            report_date = %current.report_date,
            "No earlier period in the same year, treating as first quarter"
        );
    }
    convert_cumulative_to_quarterly(cumulative, previous)
}

/// TTM revenue at period `index`: the sum of the single-quarter revenues of
/// the four periods ending at `index`.
///
/// Returns `None` before the fourth period, or when any of the four quarters is
/// unavailable or negative.
#[must_use]
pub fn ttm_revenue_at(rows: &[PeriodRow], index: usize) -> Option<f64> {
    if index < 3 || index >= rows.len() {
        return None;
    }
    let quarters: Vec<Option<f64>> = (index - 3..=index)
        .map(|i| single_quarter_revenue(rows, i))
        .collect();
    calculate_ttm_revenue(&quarters)
}
