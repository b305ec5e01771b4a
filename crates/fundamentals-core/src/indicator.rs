//! Indicator catalogue.
//!
//! This module defines [`Indicator`], the set of financial ratios compared
//! against the market cross-section. Indicator names double as median-cache keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FundamentalsError;

/// A financial ratio computed per period and compared across the market.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Accounts receivable turnover (TTM revenue over average receivables), log scale.
    ArTurnover,
    /// Gross profit margin.
    GrossMargin,
    /// Long-term operating asset turnover, log scale.
    LtAssetTurnover,
    /// Net working capital over total assets.
    WorkingCapitalRatio,
    /// Net operating cash flow over total assets.
    OperatingCashflowRatio,
    /// Return on average equity.
    Roe,
}

impl Indicator {
    /// Every indicator, in reporting order.
    pub const ALL: [Self; 6] = [
        Self::ArTurnover,
        Self::GrossMargin,
        Self::LtAssetTurnover,
        Self::WorkingCapitalRatio,
        Self::OperatingCashflowRatio,
        Self::Roe,
    ];

    /// Stable snake_case name, used as the median-cache key.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ArTurnover => "ar_turnover",
            Self::GrossMargin => "gross_margin",
            Self::LtAssetTurnover => "lt_asset_turnover",
            Self::WorkingCapitalRatio => "working_capital_ratio",
            Self::OperatingCashflowRatio => "operating_cashflow_ratio",
            Self::Roe => "roe",
        }
    }

    /// Returns true if the raw ratio is compared on a natural-log scale.
    ///
    /// Log-scaled indicators only exist for strictly positive raw ratios; on
    /// both the company and the market side non-positive ratios are dropped.
    #[must_use]
    pub const fn is_log_scaled(&self) -> bool {
        matches!(self, Self::ArTurnover | Self::LtAssetTurnover)
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Indicator {
    type Err = FundamentalsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|indicator| indicator.name() == s)
            .ok_or_else(|| FundamentalsError::InvalidParameter(format!("Unknown indicator: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_from_str() {
        for indicator in Indicator::ALL {
            assert_eq!(indicator.name().parse::<Indicator>().unwrap(), indicator);
        }
    }

    #[test]
    fn test_unknown_indicator_is_rejected() {
        assert!("pe_ratio".parse::<Indicator>().is_err());
    }

    #[test]
    fn test_only_turnovers_are_log_scaled() {
        let scaled: Vec<_> = Indicator::ALL.into_iter().filter(Indicator::is_log_scaled).collect();
        assert_eq!(scaled, vec![Indicator::ArTurnover, Indicator::LtAssetTurnover]);
    }

    #[test]
    fn test_serde_uses_cache_key_names() {
        let json = serde_json::to_string(&Indicator::OperatingCashflowRatio).unwrap();
        assert_eq!(json, "\"operating_cashflow_ratio\"");
    }
}
