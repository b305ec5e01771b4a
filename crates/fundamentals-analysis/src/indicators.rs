//! Company indicator values per assembled period.

use std::collections::BTreeMap;

use fundamentals_core::{Indicator, PeriodRow, SeriesPoint};

use crate::calculator::{
    WorkingCapitalComponents, calculate_accounts_receivable_turnover,
    calculate_gross_profit_margin, calculate_long_term_asset_turnover,
    calculate_operating_cashflow_ratio, calculate_roe, calculate_working_capital_ratio,
    log_turnover,
};

/// Value of `indicator` for period `index` of ascending assembled rows.
///
/// Ratios over averaged balances use period `index - 1` as the begin period,
/// so they are `None` for the first period. Turnovers are returned on a
/// natural-log scale and only when the raw ratio is strictly positive.
#[must_use]
pub fn indicator_value(indicator: Indicator, rows: &[PeriodRow], index: usize) -> Option<f64> {
    let current = rows.get(index)?;
    let previous = index.checked_sub(1).and_then(|i| rows.get(i));

    match indicator {
        Indicator::ArTurnover => {
            let previous = previous?;
            log_turnover(calculate_accounts_receivable_turnover(
                current.ttm_revenue,
                previous.accounts_receivable(),
                current.accounts_receivable(),
            ))
        }
        Indicator::GrossMargin => calculate_gross_profit_margin(current.revenue(), current.cost()),
        Indicator::LtAssetTurnover => {
            let previous = previous?;
            log_turnover(calculate_long_term_asset_turnover(
                current.ttm_revenue,
                previous.long_term_operating_assets(),
                current.long_term_operating_assets(),
            ))
        }
        Indicator::WorkingCapitalRatio => {
            let balance_sheet = current.balance_sheet.as_ref()?;
            calculate_working_capital_ratio(
                &WorkingCapitalComponents::from_balance_sheet(balance_sheet),
                balance_sheet.total_assets,
            )
        }
        Indicator::OperatingCashflowRatio => {
            calculate_operating_cashflow_ratio(current.operating_cash_flow(), current.total_assets())
        }
        Indicator::Roe => {
            let previous = previous?;
            calculate_roe(
                current.net_profit(),
                previous.total_equity(),
                current.total_equity(),
            )
        }
    }
}

/// A company's series for one indicator: periods with a value only, ascending.
#[must_use]
pub fn company_series(indicator: Indicator, rows: &[PeriodRow]) -> Vec<SeriesPoint> {
    (0..rows.len())
        .filter_map(|i| {
            indicator_value(indicator, rows, i).map(|value| SeriesPoint {
                report_date: rows[i].report_date,
                value,
            })
        })
        .collect()
}

/// Series for every indicator in [`Indicator::ALL`].
#[must_use]
pub fn compute_indicators(rows: &[PeriodRow]) -> BTreeMap<Indicator, Vec<SeriesPoint>> {
    Indicator::ALL
        .into_iter()
        .map(|indicator| (indicator, company_series(indicator, rows)))
        .collect()
}
