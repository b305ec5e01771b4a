//! Provider column mapping.
//!
//! Statement providers name line items in their own vocabulary. A
//! [`ColumnMapping`] renames them to the canonical field names of the
//! statement rows before anything is stored.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::types::{RawStatement, StatementKind, StatementRecord};

/// Provider column name to canonical field name, per statement type.
///
/// Entries under `common` apply to every statement type and take precedence
/// over statement-specific entries with the same provider column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    /// Entries shared by all statement types.
    pub common: HashMap<String, String>,
    /// Balance sheet entries.
    pub balance_sheet: HashMap<String, String>,
    /// Income statement entries.
    pub income_statement: HashMap<String, String>,
    /// Cash flow statement entries.
    pub cash_flow_statement: HashMap<String, String>,
}

impl ColumnMapping {
    /// Creates an empty mapping (every provider column is taken as canonical).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the effective mapping for one statement type.
    #[must_use]
    pub fn for_statement(&self, kind: StatementKind) -> HashMap<String, String> {
        let specific = match kind {
            StatementKind::BalanceSheet => &self.balance_sheet,
            StatementKind::IncomeStatement => &self.income_statement,
            StatementKind::CashFlowStatement => &self.cash_flow_statement,
        };

        let mut merged = specific.clone();
        merged.extend(self.common.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Renames a raw statement's columns and builds the typed row.
    ///
    /// Unmapped columns keep their provider name, so providers that already
    /// use canonical names need no entries.
    ///
    /// # Errors
    /// Returns an error if the typed row cannot be built.
    pub fn apply<R: StatementRecord>(&self, raw: &RawStatement) -> Result<R> {
        let mapping = self.for_statement(R::KIND);
        let items = raw.values.iter().map(|(column, value)| {
            let name = mapping.get(column).cloned().unwrap_or_else(|| column.clone());
            (name, *value)
        });
        R::from_line_items(&raw.stock_code, raw.report_date, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BalanceSheetRow, StockCode};
    use chrono::NaiveDate;

    fn mapping() -> ColumnMapping {
        let mut mapping = ColumnMapping::new();
        mapping
            .balance_sheet
            .insert("TOTAL_ASSETS".to_string(), "total_assets".to_string());
        mapping
            .balance_sheet
            .insert("AR".to_string(), "notes_receivable".to_string());
        mapping
            .common
            .insert("AR".to_string(), "accounts_receivable".to_string());
        mapping
    }

    #[test]
    fn test_common_entries_take_precedence() {
        let merged = mapping().for_statement(StatementKind::BalanceSheet);
        assert_eq!(merged.get("AR").map(String::as_str), Some("accounts_receivable"));
        assert_eq!(merged.get("TOTAL_ASSETS").map(String::as_str), Some("total_assets"));
    }

    #[test]
    fn test_statement_specific_entries_do_not_leak() {
        let merged = mapping().for_statement(StatementKind::IncomeStatement);
        assert!(!merged.contains_key("TOTAL_ASSETS"));
        assert!(merged.contains_key("AR"));
    }

    #[test]
    fn test_apply_builds_typed_row() {
        let raw = RawStatement::new(
            StockCode::new("sz000001"),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        )
        .with_value("TOTAL_ASSETS", Some(10_000.0))
        .with_value("AR", Some(1_000.0))
        .with_value("goodwill", Some(50.0))
        .with_value("UNMAPPED", Some(1.0));

        let row: BalanceSheetRow = mapping().apply(&raw).unwrap();
        assert_eq!(row.stock_code.as_str(), "SZ000001");
        assert_eq!(row.total_assets, Some(10_000.0));
        assert_eq!(row.accounts_receivable, Some(1_000.0));
        assert_eq!(row.goodwill, Some(50.0));
        assert_eq!(row.notes_receivable, None);
    }
}
