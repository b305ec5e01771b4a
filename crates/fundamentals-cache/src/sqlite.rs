//! SQLite-based store implementation.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use fundamentals_core::{
    BalanceSheetRow, CacheVersion, CashFlowRow, ColumnMapping, CompanyStatements,
    FundamentalsError, IncomeStatementRow, MarketStatements, MedianCache, RawStatement, Result,
    StatementRecord, StatementStore, StockCode,
};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite-backed statement store and persistent median cache.
///
/// Statement tables are unique on `(stock_code, report_date)` and the median
/// table on `(indicator_name, report_date, cache_version)`. All writes use
/// `INSERT OR IGNORE`, so re-importing a period or racing another session on
/// the same median is a silent no-op.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new SQLite store at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage_error)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_error)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| FundamentalsError::Storage(e.to_string()))
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        create_statement_table::<BalanceSheetRow>(&conn)?;
        create_statement_table::<IncomeStatementRow>(&conn)?;
        create_statement_table::<CashFlowRow>(&conn)?;

        // Median cache table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS indicator_medians (
                indicator_name TEXT NOT NULL,
                report_date TEXT NOT NULL,
                cache_version TEXT NOT NULL,
                median_value REAL NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (indicator_name, report_date, cache_version)
            )",
            [],
        )
        .map_err(storage_error)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_medians_version
             ON indicator_medians(cache_version)",
            [],
        )
        .map_err(storage_error)?;

        // Company names
        conn.execute(
            "CREATE TABLE IF NOT EXISTS stock_info (
                stock_code TEXT PRIMARY KEY,
                stock_name TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(storage_error)?;

        debug!("SQLite store schema initialized");
        Ok(())
    }

    /// Stores statement rows of one type, skipping rows whose
    /// `(stock_code, report_date)` already exists.
    ///
    /// Returns `(added, skipped)`.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    #[instrument(skip(self, rows), fields(kind = ?R::KIND, count = rows.len()))]
    pub fn save_statements<R: StatementRecord>(&self, rows: &[R]) -> Result<(usize, usize)> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} (stock_code, report_date, {}) VALUES ({})",
            R::KIND.table_name(),
            R::LINE_ITEMS.join(", "),
            (1..=R::LINE_ITEMS.len() + 2)
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let conn = self.conn()?;
        let tx = conn.unchecked_transaction().map_err(storage_error)?;

        let mut added = 0usize;
        for row in rows {
            let mut values = vec![
                Value::Text(row.stock_code().to_string()),
                Value::Text(row.report_date().format(DATE_FORMAT).to_string()),
            ];
            values.extend(
                row.line_item_values()?
                    .into_iter()
                    .map(|v| v.map_or(Value::Null, Value::Real)),
            );
            added += tx.execute(&sql, params_from_iter(values)).map_err(storage_error)?;
        }

        tx.commit().map_err(storage_error)?;
        let skipped = rows.len() - added;
        debug!(added, skipped, "Stored statement rows");
        Ok((added, skipped))
    }

    /// Stores balance sheets. Returns `(added, skipped)`.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub fn save_balance_sheets(&self, rows: &[BalanceSheetRow]) -> Result<(usize, usize)> {
        self.save_statements(rows)
    }

    /// Stores income statements. Returns `(added, skipped)`.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub fn save_income_statements(&self, rows: &[IncomeStatementRow]) -> Result<(usize, usize)> {
        self.save_statements(rows)
    }

    /// Stores cash flow statements. Returns `(added, skipped)`.
    ///
    /// # Errors
    /// Returns an error if the transaction fails.
    pub fn save_cash_flows(&self, rows: &[CashFlowRow]) -> Result<(usize, usize)> {
        self.save_statements(rows)
    }

    /// Maps provider-named statements to canonical rows and stores them.
    ///
    /// Returns `(added, skipped)`.
    ///
    /// # Errors
    /// Returns an error if a row cannot be mapped or the transaction fails.
    pub fn import_statements<R: StatementRecord>(
        &self,
        raws: &[RawStatement],
        mapping: &ColumnMapping,
    ) -> Result<(usize, usize)> {
        let rows = raws
            .iter()
            .map(|raw| mapping.apply::<R>(raw))
            .collect::<Result<Vec<R>>>()?;
        self.save_statements(&rows)
    }

    /// Records or replaces a company's display name.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn put_company_name(&self, stock_code: &StockCode, name: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO stock_info (stock_code, stock_name, updated_at)
             VALUES (?1, ?2, ?3)",
            params![stock_code.as_str(), name, Utc::now().to_rfc3339()],
        )
        .map_err(storage_error)?;
        Ok(())
    }

    /// Number of cached medians stored under `version`.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn median_count(&self, version: &CacheVersion) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM indicator_medians WHERE cache_version = ?1",
                params![version.as_str()],
                |row| row.get(0),
            )
            .map_err(storage_error)?;
        usize::try_from(count).map_err(|e| FundamentalsError::Parse(e.to_string()))
    }

    fn select_rows<R: StatementRecord>(
        conn: &Connection,
        filter: &str,
        params: &[Value],
    ) -> Result<Vec<R>> {
        let sql = format!(
            "SELECT stock_code, report_date, {} FROM {} WHERE {} ORDER BY report_date ASC, stock_code ASC",
            R::LINE_ITEMS.join(", "),
            R::KIND.table_name(),
            filter
        );

        let mut stmt = conn.prepare(&sql).map_err(storage_error)?;
        let raw_rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                let code: String = row.get(0)?;
                let date: String = row.get(1)?;
                let items = (0..R::LINE_ITEMS.len())
                    .map(|i| row.get::<_, Option<f64>>(i + 2))
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok((code, date, items))
            })
            .map_err(storage_error)?;

        let mut rows = Vec::new();
        for raw in raw_rows {
            let (code, date, items) = raw.map_err(storage_error)?;
            let report_date = parse_date(&date)?;
            let names = R::LINE_ITEMS.iter().map(|name| (*name).to_string());
            rows.push(R::from_line_items(
                &StockCode::new(code),
                report_date,
                names.zip(items),
            )?);
        }
        Ok(rows)
    }
}

fn storage_error(e: rusqlite::Error) -> FundamentalsError {
    FundamentalsError::Storage(e.to_string())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| FundamentalsError::Parse(format!("Invalid report date {s}: {e}")))
}

fn create_statement_table<R: StatementRecord>(conn: &Connection) -> Result<()> {
    let table = R::KIND.table_name();
    let columns = R::LINE_ITEMS
        .iter()
        .map(|name| format!("{name} REAL"))
        .collect::<Vec<_>>()
        .join(",\n                ");

    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                stock_code TEXT NOT NULL,
                report_date TEXT NOT NULL,
                {columns},
                PRIMARY KEY (stock_code, report_date)
            )"
        ),
        [],
    )
    .map_err(storage_error)?;

    conn.execute(
        &format!("CREATE INDEX IF NOT EXISTS idx_{table}_report_date ON {table}(report_date)"),
        [],
    )
    .map_err(storage_error)?;

    Ok(())
}

impl MedianCache for SqliteStore {
    #[instrument(skip(self), fields(version = %version))]
    fn get_cached_median(
        &self,
        indicator: &str,
        report_date: NaiveDate,
        version: &CacheVersion,
    ) -> Result<Option<f64>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                "SELECT median_value FROM indicator_medians
                 WHERE indicator_name = ?1 AND report_date = ?2 AND cache_version = ?3",
                params![
                    indicator,
                    report_date.format(DATE_FORMAT).to_string(),
                    version.as_str()
                ],
                |row| row.get::<_, f64>(0),
            )
            .optional()
            .map_err(storage_error)?;

        match result {
            Some(value) => {
                debug!("Found cached median");
                Ok(Some(value))
            }
            None => {
                debug!("No cached median found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self), fields(version = %version))]
    fn save_median(
        &self,
        indicator: &str,
        report_date: NaiveDate,
        value: f64,
        version: &CacheVersion,
    ) -> Result<()> {
        let conn = self.conn()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO indicator_medians
                 (indicator_name, report_date, cache_version, median_value, cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    indicator,
                    report_date.format(DATE_FORMAT).to_string(),
                    version.as_str(),
                    value,
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(storage_error)?;

        if inserted == 0 {
            debug!("Median already cached by another writer");
        } else {
            debug!("Cached median");
        }
        Ok(())
    }

    #[instrument(skip(self), fields(version = %version))]
    fn clear_cache(&self, version: &CacheVersion) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM indicator_medians WHERE cache_version = ?1",
                params![version.as_str()],
            )
            .map_err(storage_error)?;

        debug!("Cleared {} cached medians", deleted);
        Ok(deleted)
    }
}

#[async_trait]
impl StatementStore for SqliteStore {
    async fn has_data(&self) -> Result<bool> {
        let conn = self.conn()?;
        let exists: i64 = conn
            .query_row("SELECT EXISTS(SELECT 1 FROM balance_sheets)", [], |row| {
                row.get(0)
            })
            .map_err(storage_error)?;
        Ok(exists != 0)
    }

    #[instrument(skip(self), fields(stock_code = %stock_code))]
    async fn query_company_periods(
        &self,
        stock_code: &StockCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CompanyStatements> {
        let conn = self.conn()?;
        let filter = "stock_code = ?1 AND report_date >= ?2 AND report_date <= ?3";
        let params = [
            Value::Text(stock_code.to_string()),
            Value::Text(start.format(DATE_FORMAT).to_string()),
            Value::Text(end.format(DATE_FORMAT).to_string()),
        ];

        let statements = CompanyStatements {
            stock_code: stock_code.clone(),
            balance_sheets: Self::select_rows(&conn, filter, &params)?,
            income_statements: Self::select_rows(&conn, filter, &params)?,
            cash_flows: Self::select_rows(&conn, filter, &params)?,
        };

        debug!(
            balance_sheets = statements.balance_sheets.len(),
            income_statements = statements.income_statements.len(),
            cash_flows = statements.cash_flows.len(),
            "Loaded company statements"
        );
        Ok(statements)
    }

    #[instrument(skip(self))]
    async fn query_market_statements(&self, report_date: NaiveDate) -> Result<MarketStatements> {
        let conn = self.conn()?;
        let filter = "report_date = ?1";
        let params = [Value::Text(report_date.format(DATE_FORMAT).to_string())];

        Ok(MarketStatements {
            report_date,
            balance_sheets: Self::select_rows(&conn, filter, &params)?,
            income_statements: Self::select_rows(&conn, filter, &params)?,
            cash_flows: Self::select_rows(&conn, filter, &params)?,
        })
    }

    async fn company_name(&self, stock_code: &StockCode) -> Result<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT stock_name FROM stock_info WHERE stock_code = ?1",
            params![stock_code.as_str()],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(storage_error)
    }
}
