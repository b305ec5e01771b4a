//! Market samples: one indicator value per entity at one report date.

use std::collections::HashMap;

use chrono::NaiveDate;
use fundamentals_core::{
    BalanceSheetRow, Indicator, MarketStatements, Result, StatementStore, StockCode,
};
use tracing::{debug, instrument};

use crate::calculator::{
    WorkingCapitalComponents, calculate_gross_profit_margin, calculate_operating_cashflow_ratio,
    calculate_working_capital_ratio, log_turnover,
};

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Derives the unfiltered market sample for `indicator`.
///
/// Each entity contributes a single-period value (no averaging) and statement
/// types are joined on stock code. Turnovers require strictly positive
/// revenue and assets before the log transform, and gross margin a non-zero
/// cost. Entities lacking a required statement or line item contribute `None`.
#[must_use]
pub fn market_sample(indicator: Indicator, statements: &MarketStatements) -> Vec<Option<f64>> {
    let balance_sheets: HashMap<&StockCode, &BalanceSheetRow> = statements
        .balance_sheets
        .iter()
        .map(|row| (&row.stock_code, row))
        .collect();

    match indicator {
        Indicator::ArTurnover => statements
            .income_statements
            .iter()
            .map(|income| {
                let balance_sheet = balance_sheets.get(&income.stock_code)?;
                let revenue = positive(income.revenue())?;
                let receivables = positive(balance_sheet.accounts_receivable)?;
                log_turnover(Some(revenue / receivables))
            })
            .collect(),
        Indicator::LtAssetTurnover => statements
            .income_statements
            .iter()
            .map(|income| {
                let balance_sheet = balance_sheets.get(&income.stock_code)?;
                let revenue = positive(income.revenue())?;
                let assets = positive(Some(balance_sheet.long_term_operating_assets()))?;
                log_turnover(Some(revenue / assets))
            })
            .collect(),
        Indicator::GrossMargin => statements
            .income_statements
            .iter()
            .map(|income| {
                let revenue = positive(income.revenue())?;
                let cost = income.cost().filter(|c| *c != 0.0)?;
                calculate_gross_profit_margin(Some(revenue), Some(cost))
            })
            .collect(),
        Indicator::WorkingCapitalRatio => statements
            .balance_sheets
            .iter()
            .map(|row| {
                calculate_working_capital_ratio(
                    &WorkingCapitalComponents::from_balance_sheet(row),
                    positive(row.total_assets),
                )
            })
            .collect(),
        Indicator::OperatingCashflowRatio => statements
            .cash_flows
            .iter()
            .map(|cash_flow| {
                let balance_sheet = balance_sheets.get(&cash_flow.stock_code)?;
                calculate_operating_cashflow_ratio(
                    cash_flow.net_operating_cash_flow,
                    positive(balance_sheet.total_assets),
                )
            })
            .collect(),
        Indicator::Roe => statements
            .income_statements
            .iter()
            .map(|income| {
                let balance_sheet = balance_sheets.get(&income.stock_code)?;
                let equity = balance_sheet.total_equity.filter(|e| *e != 0.0)?;
                Some(income.net_profit? / equity).filter(|v| v.is_finite())
            })
            .collect(),
    }
}

/// Loads one report date's statements and derives the market sample.
///
/// # Errors
/// Returns an error if the store query fails.
#[instrument(skip(store))]
pub async fn query_market_sample(
    store: &dyn StatementStore,
    indicator: Indicator,
    report_date: NaiveDate,
) -> Result<Vec<Option<f64>>> {
    let statements = store.query_market_statements(report_date).await?;
    let sample = market_sample(indicator, &statements);
    debug!(entities = sample.len(), "Derived market sample");
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fundamentals_cache::InMemoryStore;
    use fundamentals_core::{CashFlowRow, IncomeStatementRow};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    fn balance(code: &str, receivables: f64, total_assets: f64) -> BalanceSheetRow {
        BalanceSheetRow {
            accounts_receivable: Some(receivables),
            total_assets: Some(total_assets),
            total_equity: Some(total_assets / 2.0),
            fixed_assets: Some(total_assets / 4.0),
            ..BalanceSheetRow::new(StockCode::new(code), date())
        }
    }

    fn income(code: &str, revenue: Option<f64>, cost: Option<f64>) -> IncomeStatementRow {
        IncomeStatementRow {
            operating_revenue: revenue,
            operating_cost: cost,
            net_profit: revenue.map(|r| r / 10.0),
            ..IncomeStatementRow::new(StockCode::new(code), date())
        }
    }

    fn statements() -> MarketStatements {
        MarketStatements {
            report_date: date(),
            balance_sheets: vec![
                balance("A", 100.0, 1000.0),
                balance("B", 0.0, 2000.0),
                balance("C", 50.0, 0.0),
            ],
            income_statements: vec![
                income("A", Some(800.0), Some(600.0)),
                income("B", Some(500.0), None),
                income("C", Some(-10.0), Some(5.0)),
                income("D", Some(300.0), Some(150.0)),
            ],
            cash_flows: vec![CashFlowRow {
                net_operating_cash_flow: Some(-100.0),
                ..CashFlowRow::new(StockCode::new("A"), date())
            }],
        }
    }

    fn valid(sample: &[Option<f64>]) -> Vec<f64> {
        sample.iter().flatten().copied().collect()
    }

    #[test]
    fn test_ar_turnover_sample_is_log_of_positive_ratios() {
        let sample = market_sample(Indicator::ArTurnover, &statements());
        assert_eq!(sample.len(), 4);
        let values = valid(&sample);
        assert_eq!(values.len(), 1);
        assert_relative_eq!(values[0], 8.0_f64.ln());
    }

    #[test]
    fn test_lt_asset_turnover_sample() {
        let values = valid(&market_sample(Indicator::LtAssetTurnover, &statements()));
        // A: 800 / 250, B: 500 / 500; C has negative revenue, D no balance sheet
        assert_eq!(values.len(), 2);
        assert_relative_eq!(values[0], 3.2_f64.ln());
        assert_relative_eq!(values[1], 0.0);
    }

    #[test]
    fn test_gross_margin_sample_requires_positive_revenue_and_cost() {
        let values = valid(&market_sample(Indicator::GrossMargin, &statements()));
        assert_eq!(values.len(), 2);
        assert_relative_eq!(values[0], 0.25);
        assert_relative_eq!(values[1], 0.5);
    }

    #[test]
    fn test_gross_margin_sample_skips_zero_cost() {
        let statements = MarketStatements {
            report_date: date(),
            balance_sheets: Vec::new(),
            income_statements: vec![
                income("A", Some(800.0), Some(0.0)),
                income("B", Some(400.0), Some(300.0)),
            ],
            cash_flows: Vec::new(),
        };
        let sample = market_sample(Indicator::GrossMargin, &statements);
        assert_eq!(sample.len(), 2);
        assert!(sample[0].is_none());
        assert_relative_eq!(sample[1].unwrap(), 0.25);
    }

    #[test]
    fn test_working_capital_sample_requires_positive_assets() {
        let values = valid(&market_sample(Indicator::WorkingCapitalRatio, &statements()));
        assert_eq!(values.len(), 2);
        assert_relative_eq!(values[0], 0.1);
        assert_relative_eq!(values[1], 0.0);
    }

    #[test]
    fn test_cashflow_and_roe_samples() {
        let ocf = valid(&market_sample(Indicator::OperatingCashflowRatio, &statements()));
        assert_eq!(ocf.len(), 1);
        assert_relative_eq!(ocf[0], -0.1);

        // C has zero equity; D has no balance sheet
        let roe = valid(&market_sample(Indicator::Roe, &statements()));
        assert_eq!(roe.len(), 2);
        assert_relative_eq!(roe[0], 80.0 / 500.0);
        assert_relative_eq!(roe[1], 50.0 / 1000.0);
    }

    #[tokio::test]
    async fn test_query_market_sample_reads_store() {
        let store = InMemoryStore::new();
        let statements = statements();
        store.put_balance_sheets(&statements.balance_sheets).unwrap();
        store.put_income_statements(&statements.income_statements).unwrap();

        let sample = query_market_sample(&store, Indicator::GrossMargin, date())
            .await
            .unwrap();
        assert_eq!(valid(&sample).len(), 2);

        let other_date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let empty = query_market_sample(&store, Indicator::GrossMargin, other_date)
            .await
            .unwrap();
        assert!(empty.is_empty());
    }
}
