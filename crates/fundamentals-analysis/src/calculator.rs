//! Financial ratio calculator.
//!
//! Pure functions over optional scalar inputs. A ratio is `None` when a
//! required input is missing or non-finite, when its denominator is exactly
//! zero, or when the quotient itself is not finite. Results are never clamped.
//!
//! Averaged inputs need both endpoints. Working-capital components are the one
//! exception to the missing-input rule: they are additive and default to zero.

use fundamentals_core::BalanceSheetRow;

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let numerator = finite(numerator)?;
    let denominator = finite(denominator)?;
    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator).filter(|r| r.is_finite())
}

/// Mean of a begin and end balance. Both endpoints are required.
#[must_use]
pub fn average(begin: Option<f64>, end: Option<f64>) -> Option<f64> {
    Some((finite(begin)? + finite(end)?) / 2.0).filter(|v| v.is_finite())
}

/// Return on equity: net profit over average equity.
#[must_use]
pub fn calculate_roe(
    net_profit: Option<f64>,
    equity_begin: Option<f64>,
    equity_end: Option<f64>,
) -> Option<f64> {
    ratio(net_profit, average(equity_begin, equity_end))
}

/// Accounts receivable turnover: TTM revenue over average receivables.
#[must_use]
pub fn calculate_accounts_receivable_turnover(
    revenue_ttm: Option<f64>,
    ar_begin: Option<f64>,
    ar_end: Option<f64>,
) -> Option<f64> {
    ratio(revenue_ttm, average(ar_begin, ar_end))
}

/// Gross profit margin: `(revenue - cost) / revenue`.
#[must_use]
pub fn calculate_gross_profit_margin(revenue: Option<f64>, cost: Option<f64>) -> Option<f64> {
    let revenue = finite(revenue)?;
    let cost = finite(cost)?;
    ratio(Some(revenue - cost), Some(revenue))
}

/// Long-term operating asset turnover: TTM revenue over average long-term
/// operating assets.
#[must_use]
pub fn calculate_long_term_asset_turnover(
    revenue_ttm: Option<f64>,
    assets_begin: Option<f64>,
    assets_end: Option<f64>,
) -> Option<f64> {
    ratio(revenue_ttm, average(assets_begin, assets_end))
}

/// Operating working capital line items. Missing items count as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WorkingCapitalComponents {
    /// Accounts receivable.
    pub accounts_receivable: Option<f64>,
    /// Notes receivable.
    pub notes_receivable: Option<f64>,
    /// Receivables financing.
    pub receivables_financing: Option<f64>,
    /// Contract assets.
    pub contract_assets: Option<f64>,
    /// Accounts payable.
    pub accounts_payable: Option<f64>,
    /// Notes payable.
    pub notes_payable: Option<f64>,
    /// Contract liabilities.
    pub contract_liabilities: Option<f64>,
}

impl WorkingCapitalComponents {
    /// Picks the components out of a balance sheet.
    #[must_use]
    pub const fn from_balance_sheet(row: &BalanceSheetRow) -> Self {
        Self {
            accounts_receivable: row.accounts_receivable,
            notes_receivable: row.notes_receivable,
            receivables_financing: row.receivables_financing,
            contract_assets: row.contract_assets,
            accounts_payable: row.accounts_payable,
            notes_payable: row.notes_payable,
            contract_liabilities: row.contract_liabilities,
        }
    }

    /// Receivable-side items minus payable-side items.
    #[must_use]
    pub fn net_working_capital(&self) -> f64 {
        let value = |v: Option<f64>| finite(v).unwrap_or(0.0);
        value(self.accounts_receivable)
            + value(self.notes_receivable)
            + value(self.receivables_financing)
            + value(self.contract_assets)
            - value(self.accounts_payable)
            - value(self.notes_payable)
            - value(self.contract_liabilities)
    }
}

/// Net operating working capital over total assets.
///
/// Only `total_assets` is required; every component defaults to zero.
#[must_use]
pub fn calculate_working_capital_ratio(
    components: &WorkingCapitalComponents,
    total_assets: Option<f64>,
) -> Option<f64> {
    ratio(Some(components.net_working_capital()), total_assets)
}

/// Net operating cash flow over total assets.
#[must_use]
pub fn calculate_operating_cashflow_ratio(
    operating_cashflow: Option<f64>,
    total_assets: Option<f64>,
) -> Option<f64> {
    ratio(operating_cashflow, total_assets)
}

/// Single-quarter value from year-to-date cumulative figures.
///
/// `previous` is the same fiscal year's prior cumulative figure, or `None`
/// for the first quarter, whose cumulative value is already single-quarter.
#[must_use]
pub fn convert_cumulative_to_quarterly(current: f64, previous: Option<f64>) -> Option<f64> {
    let quarterly = match previous {
        Some(previous) => current - previous,
        None => current,
    };
    Some(quarterly).filter(|q| q.is_finite())
}

/// Trailing-twelve-month revenue from single-quarter revenues in ascending
/// date order.
///
/// Sums the four most recent quarters. Fewer than four quarters, or any of the
/// four missing, non-finite or negative, yields `None`.
#[must_use]
pub fn calculate_ttm_revenue(quarterly_revenues: &[Option<f64>]) -> Option<f64> {
    let start = quarterly_revenues.len().checked_sub(4)?;
    quarterly_revenues[start..]
        .iter()
        .map(|q| finite(*q).filter(|v| *v >= 0.0))
        .sum()
}

/// Natural log of a turnover ratio, defined for strictly positive ratios only.
#[must_use]
pub fn log_turnover(raw: Option<f64>) -> Option<f64> {
    finite(raw).filter(|r| *r > 0.0).map(f64::ln)
}
