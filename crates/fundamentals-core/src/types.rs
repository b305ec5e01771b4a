//! Core data types for statement-level fundamentals.
//!
//! This module defines the record types that flow from the store into the
//! analysis pipeline:
//!
//! - [`StockCode`] - Listed entity identifier
//! - [`CacheVersion`] - Freshness epoch for cached market medians
//! - [`BalanceSheetRow`], [`IncomeStatementRow`], [`CashFlowRow`] - One statement for one period
//! - [`StatementRecord`] - Common behaviour of the three statement rows
//! - [`RawStatement`] - Provider-named values before column mapping
//! - [`PeriodRow`] - The three statements joined on report date
//! - [`CompanyStatements`], [`MarketStatements`] - Store query results

use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{FundamentalsError, Result};

/// A stock code identifying one listed entity (e.g. `SH600519`).
///
/// Codes are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockCode(String);

impl StockCode {
    /// Creates a new stock code from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StockCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for StockCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StockCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Opaque version tag scoping cached market medians.
///
/// Versions carry no ordering of their own; by convention they are run
/// timestamps so that each analysis session gets a fresh epoch.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheVersion(String);

impl CacheVersion {
    /// Creates a cache version from an arbitrary tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Creates a cache version from the current UTC time (`%Y%m%d%H%M%S`).
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().format("%Y%m%d%H%M%S").to_string())
    }

    /// Returns the version tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheVersion {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The three statement types a period is assembled from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// Balance sheet (point-in-time stocks).
    BalanceSheet,
    /// Income statement (year-to-date cumulative flows).
    IncomeStatement,
    /// Cash flow statement (year-to-date cumulative flows).
    CashFlowStatement,
}

impl StatementKind {
    /// Name of the table holding this statement type.
    #[must_use]
    pub const fn table_name(&self) -> &'static str {
        match self {
            Self::BalanceSheet => "balance_sheets",
            Self::IncomeStatement => "income_statements",
            Self::CashFlowStatement => "cash_flow_statements",
        }
    }
}

/// Behaviour shared by the three statement row types.
///
/// Rows serialize to a flat object whose keys are `stock_code`, `report_date`
/// and the canonical line-item names in [`StatementRecord::LINE_ITEMS`]. Stores
/// and the column-mapping boundary rely on that shape.
pub trait StatementRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Statement type of this record.
    const KIND: StatementKind;

    /// Canonical line-item field names, in storage column order.
    const LINE_ITEMS: &'static [&'static str];

    /// Entity this row belongs to.
    fn stock_code(&self) -> &StockCode;

    /// Period end date of this row.
    fn report_date(&self) -> NaiveDate;

    /// Builds a row from canonical line-item values.
    ///
    /// Unknown names are ignored. Missing, NaN and infinite values become `None`.
    ///
    /// # Errors
    /// Returns [`FundamentalsError::Parse`] if the row cannot be materialised.
    fn from_line_items<I>(stock_code: &StockCode, report_date: NaiveDate, items: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Option<f64>)>,
    {
        let mut object = serde_json::Map::new();
        for (name, value) in items {
            if !Self::LINE_ITEMS.contains(&name.as_str()) {
                continue;
            }
            let value = value
                .filter(|v| v.is_finite())
                .map_or(serde_json::Value::Null, serde_json::Value::from);
            object.insert(name, value);
        }
        object.insert(
            "stock_code".to_string(),
            serde_json::Value::String(stock_code.to_string()),
        );
        object.insert(
            "report_date".to_string(),
            serde_json::Value::String(report_date.to_string()),
        );

        serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| FundamentalsError::Parse(e.to_string()))
    }

    /// Returns the line-item values in [`StatementRecord::LINE_ITEMS`] order.
    ///
    /// # Errors
    /// Returns [`FundamentalsError::Parse`] if the row cannot be serialized.
    fn line_item_values(&self) -> Result<Vec<Option<f64>>> {
        let value = serde_json::to_value(self).map_err(|e| FundamentalsError::Parse(e.to_string()))?;
        Ok(Self::LINE_ITEMS
            .iter()
            .map(|name| value.get(*name).and_then(serde_json::Value::as_f64))
            .collect())
    }
}

/// Balance sheet line items for one entity and period.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetRow {
    /// Entity code.
    pub stock_code: StockCode,
    /// Period end date.
    pub report_date: NaiveDate,

    /// Total assets.
    pub total_assets: Option<f64>,
    /// Total owners' equity.
    pub total_equity: Option<f64>,
    /// Current liabilities.
    pub current_liabilities: Option<f64>,
    /// Total non-current assets.
    pub non_current_assets: Option<f64>,

    // Working capital components
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

    // Long-term operating assets
    /// Fixed assets, net.
    pub fixed_assets: Option<f64>,
    /// Construction in progress.
    pub construction_in_progress: Option<f64>,
    /// Productive biological assets.
    pub productive_biological_assets: Option<f64>,
    /// Consumptive biological assets.
    pub consumptive_biological_assets: Option<f64>,
    /// Oil and gas assets.
    pub oil_and_gas_assets: Option<f64>,
    /// Right-of-use assets.
    pub right_of_use_assets: Option<f64>,
    /// Intangible assets.
    pub intangible_assets: Option<f64>,
    /// Capitalised development expenditure.
    pub development_expenditure: Option<f64>,
    /// Goodwill.
    pub goodwill: Option<f64>,
    /// Long-term deferred expenses.
    pub long_term_deferred_expenses: Option<f64>,
    /// Other non-current assets.
    pub other_non_current_assets: Option<f64>,
}

impl BalanceSheetRow {
    /// Creates an empty balance sheet row.
    #[must_use]
    pub fn new(stock_code: StockCode, report_date: NaiveDate) -> Self {
        Self {
            stock_code,
            report_date,
            ..Default::default()
        }
    }

    /// Long-term operating assets: the sum of the eleven operating non-current
    /// components, missing components counting as zero.
    #[must_use]
    pub fn long_term_operating_assets(&self) -> f64 {
        [
            self.fixed_assets,
            self.construction_in_progress,
            self.productive_biological_assets,
            self.consumptive_biological_assets,
            self.oil_and_gas_assets,
            self.right_of_use_assets,
            self.intangible_assets,
            self.development_expenditure,
            self.goodwill,
            self.long_term_deferred_expenses,
            self.other_non_current_assets,
        ]
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()).unwrap_or(0.0))
        .sum()
    }
}

impl StatementRecord for BalanceSheetRow {
    const KIND: StatementKind = StatementKind::BalanceSheet;
    const LINE_ITEMS: &'static [&'static str] = &[
        "total_assets",
        "total_equity",
        "current_liabilities",
        "non_current_assets",
        "accounts_receivable",
        "notes_receivable",
        "receivables_financing",
        "contract_assets",
        "accounts_payable",
        "notes_payable",
        "contract_liabilities",
        "fixed_assets",
        "construction_in_progress",
        "productive_biological_assets",
        "consumptive_biological_assets",
        "oil_and_gas_assets",
        "right_of_use_assets",
        "intangible_assets",
        "development_expenditure",
        "goodwill",
        "long_term_deferred_expenses",
        "other_non_current_assets",
    ];

    fn stock_code(&self) -> &StockCode {
        &self.stock_code
    }

    fn report_date(&self) -> NaiveDate {
        self.report_date
    }
}

/// Income statement line items (year-to-date cumulative) for one entity and period.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatementRow {
    /// Entity code.
    pub stock_code: StockCode,
    /// Period end date.
    pub report_date: NaiveDate,

    /// Total operating revenue.
    pub total_operating_revenue: Option<f64>,
    /// Operating revenue.
    pub operating_revenue: Option<f64>,
    /// Total operating cost.
    pub total_operating_cost: Option<f64>,
    /// Operating cost.
    pub operating_cost: Option<f64>,
    /// Net profit.
    pub net_profit: Option<f64>,
}

impl IncomeStatementRow {
    /// Creates an empty income statement row.
    #[must_use]
    pub fn new(stock_code: StockCode, report_date: NaiveDate) -> Self {
        Self {
            stock_code,
            report_date,
            ..Default::default()
        }
    }

    /// Revenue used by every indicator: total operating revenue, falling back
    /// to operating revenue.
    #[must_use]
    pub fn revenue(&self) -> Option<f64> {
        self.total_operating_revenue.or(self.operating_revenue)
    }

    /// Cost paired with [`IncomeStatementRow::revenue`].
    #[must_use]
    pub fn cost(&self) -> Option<f64> {
        self.total_operating_cost.or(self.operating_cost)
    }
}

impl StatementRecord for IncomeStatementRow {
    const KIND: StatementKind = StatementKind::IncomeStatement;
    const LINE_ITEMS: &'static [&'static str] = &[
        "total_operating_revenue",
        "operating_revenue",
        "total_operating_cost",
        "operating_cost",
        "net_profit",
    ];

    fn stock_code(&self) -> &StockCode {
        &self.stock_code
    }

    fn report_date(&self) -> NaiveDate {
        self.report_date
    }
}

/// Cash flow statement line items (year-to-date cumulative) for one entity and period.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRow {
    /// Entity code.
    pub stock_code: StockCode,
    /// Period end date.
    pub report_date: NaiveDate,

    /// Net cash flow from operating activities.
    pub net_operating_cash_flow: Option<f64>,
}

impl CashFlowRow {
    /// Creates an empty cash flow row.
    #[must_use]
    pub fn new(stock_code: StockCode, report_date: NaiveDate) -> Self {
        Self {
            stock_code,
            report_date,
            ..Default::default()
        }
    }
}

impl StatementRecord for CashFlowRow {
    const KIND: StatementKind = StatementKind::CashFlowStatement;
    const LINE_ITEMS: &'static [&'static str] = &["net_operating_cash_flow"];

    fn stock_code(&self) -> &StockCode {
        &self.stock_code
    }

    fn report_date(&self) -> NaiveDate {
        self.report_date
    }
}

/// A statement as delivered by a data provider, keyed by provider column names.
///
/// Values are mapped to canonical names by
/// [`ColumnMapping`](crate::mapping::ColumnMapping) before storage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStatement {
    /// Entity code.
    pub stock_code: StockCode,
    /// Period end date.
    pub report_date: NaiveDate,
    /// Provider column name to value.
    pub values: HashMap<String, Option<f64>>,
}

impl RawStatement {
    /// Creates an empty raw statement.
    #[must_use]
    pub fn new(stock_code: StockCode, report_date: NaiveDate) -> Self {
        Self {
            stock_code,
            report_date,
            values: HashMap::new(),
        }
    }

    /// Adds a provider-named value.
    #[must_use]
    pub fn with_value(mut self, column: impl Into<String>, value: Option<f64>) -> Self {
        self.values.insert(column.into(), value);
        self
    }
}

/// One reporting period of one entity: the three statements joined on report date.
///
/// A statement type absent for the period is `None`; every accessor then
/// yields `None` for its fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodRow {
    /// Period end date.
    pub report_date: NaiveDate,
    /// Balance sheet for the period, if reported.
    pub balance_sheet: Option<BalanceSheetRow>,
    /// Income statement for the period, if reported.
    pub income_statement: Option<IncomeStatementRow>,
    /// Cash flow statement for the period, if reported.
    pub cash_flow: Option<CashFlowRow>,
    /// Trailing-twelve-month revenue, derived by the assembler.
    pub ttm_revenue: Option<f64>,
}

impl PeriodRow {
    /// Creates a period with no statements attached.
    #[must_use]
    pub fn new(report_date: NaiveDate) -> Self {
        Self {
            report_date,
            ..Default::default()
        }
    }

    /// Year-to-date cumulative revenue.
    #[must_use]
    pub fn revenue(&self) -> Option<f64> {
        self.income_statement.as_ref().and_then(IncomeStatementRow::revenue)
    }

    /// Year-to-date cumulative cost.
    #[must_use]
    pub fn cost(&self) -> Option<f64> {
        self.income_statement.as_ref().and_then(IncomeStatementRow::cost)
    }

    /// Year-to-date net profit.
    #[must_use]
    pub fn net_profit(&self) -> Option<f64> {
        self.income_statement.as_ref().and_then(|r| r.net_profit)
    }

    /// Total assets at period end.
    #[must_use]
    pub fn total_assets(&self) -> Option<f64> {
        self.balance_sheet.as_ref().and_then(|r| r.total_assets)
    }

    /// Total equity at period end.
    #[must_use]
    pub fn total_equity(&self) -> Option<f64> {
        self.balance_sheet.as_ref().and_then(|r| r.total_equity)
    }

    /// Accounts receivable at period end.
    #[must_use]
    pub fn accounts_receivable(&self) -> Option<f64> {
        self.balance_sheet.as_ref().and_then(|r| r.accounts_receivable)
    }

    /// Long-term operating assets at period end, if a balance sheet exists.
    #[must_use]
    pub fn long_term_operating_assets(&self) -> Option<f64> {
        self.balance_sheet
            .as_ref()
            .map(BalanceSheetRow::long_term_operating_assets)
    }

    /// Year-to-date net operating cash flow.
    #[must_use]
    pub fn operating_cash_flow(&self) -> Option<f64> {
        self.cash_flow.as_ref().and_then(|r| r.net_operating_cash_flow)
    }
}

/// A company's statements over a date window, each ordered by ascending report date.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompanyStatements {
    /// Entity code.
    pub stock_code: StockCode,
    /// Balance sheets.
    pub balance_sheets: Vec<BalanceSheetRow>,
    /// Income statements.
    pub income_statements: Vec<IncomeStatementRow>,
    /// Cash flow statements.
    pub cash_flows: Vec<CashFlowRow>,
}

impl CompanyStatements {
    /// Creates an empty statement set for a company.
    #[must_use]
    pub fn new(stock_code: StockCode) -> Self {
        Self {
            stock_code,
            ..Default::default()
        }
    }

    /// Returns true if every statement type has at least one row.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.balance_sheets.is_empty()
            && !self.income_statements.is_empty()
            && !self.cash_flows.is_empty()
    }
}

/// Every entity's statements for one report date.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarketStatements {
    /// Report date shared by all rows.
    pub report_date: NaiveDate,
    /// Balance sheets.
    pub balance_sheets: Vec<BalanceSheetRow>,
    /// Income statements.
    pub income_statements: Vec<IncomeStatementRow>,
    /// Cash flow statements.
    pub cash_flows: Vec<CashFlowRow>,
}

impl MarketStatements {
    /// Creates an empty market cross-section for a report date.
    #[must_use]
    pub fn new(report_date: NaiveDate) -> Self {
        Self {
            report_date,
            ..Default::default()
        }
    }

    /// Returns true if no statement of any type is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balance_sheets.is_empty() && self.income_statements.is_empty() && self.cash_flows.is_empty()
    }
}
