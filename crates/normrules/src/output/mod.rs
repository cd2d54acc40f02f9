//! Output adapters for the canonical rule list

mod html;
mod json;
mod xlsx;

use std::path::Path;

use eyre::{Result, WrapErr};
use normrules_core::{NormativeRules, TagUrlMap};

pub use html::{counts_summary, render_html};
pub use json::write_json;
pub use xlsx::{CELL_LIMIT, IMPL_DEFS_SHEET, RULES_SHEET, write_xlsx};

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Html,
    Xlsx,
}

impl OutputFormat {
    /// Whether every tag file needs a URL mapping.
    ///
    /// Links in JSON and HTML output point at the standards documents; the
    /// spreadsheet only lists tag names.
    pub fn needs_urls(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Html)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Html => "html",
            OutputFormat::Xlsx => "xlsx",
        }
    }
}

/// Write `rules` to `path` in `format`.
pub fn write_output(
    format: OutputFormat,
    rules: &NormativeRules,
    urls: &TagUrlMap,
    path: &Path,
) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(rules, path),
        OutputFormat::Html => std::fs::write(path, render_html(rules, urls))
            .wrap_err_with(|| format!("Failed to write HTML output: {}", path.display())),
        OutputFormat::Xlsx => write_xlsx(rules, path)
            .wrap_err_with(|| format!("Failed to write spreadsheet: {}", path.display())),
    }
}
