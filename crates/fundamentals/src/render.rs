//! Renderer seam for analysis results.

use fundamentals_core::{AnalysisResult, FundamentalsError, Result};

/// Turns a finished analysis into a presentable document.
///
/// Report layout (HTML, spreadsheets, charts) lives behind this trait; the
/// analysis pipeline only hands over the structured result.
pub trait AnalysisRenderer: Send + Sync {
    /// Returns the name of this renderer.
    fn name(&self) -> &'static str;

    /// Renders one analysis result.
    ///
    /// # Errors
    /// Returns an error if the result cannot be rendered.
    fn render(&self, result: &AnalysisResult) -> Result<String>;
}

/// Renders results as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer {
    pretty: bool,
}

impl JsonRenderer {
    /// Compact single-line JSON.
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Indented JSON.
    #[must_use]
    pub const fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl AnalysisRenderer for JsonRenderer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn render(&self, result: &AnalysisResult) -> Result<String> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(result)
        } else {
            serde_json::to_string(result)
        };
        rendered.map_err(|e| FundamentalsError::Other(format!("JSON rendering failed: {e}")))
    }
}
