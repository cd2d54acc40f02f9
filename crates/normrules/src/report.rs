//! Terminal rendering of validation reports and tag changes

use owo_colors::OwoColorize;

use normrules_core::changes::truncate;
use normrules_core::{Severity, TagChanges, ValidationReport};

fn marker(severity: Severity) -> String {
    match severity {
        Severity::Error => "!".red().bold().to_string(),
        Severity::Warning => "?".yellow().bold().to_string(),
        Severity::Info => "i".dimmed().to_string(),
    }
}

/// Every diagnostic, followed by per-class totals.
pub fn render_validation(report: &ValidationReport) -> String {
    let mut output = String::new();

    for diagnostic in &report.diagnostics {
        output.push_str(&format!(
            "{} {}\n",
            marker(report.severity(diagnostic)),
            diagnostic
        ));
    }

    let totals = report.totals();
    if !totals.is_empty() {
        output.push('\n');
        for (severity, line) in totals {
            output.push_str(&format!("{} {}\n", marker(severity), line));
        }
    }

    if report.is_fatal() {
        output.push_str(&format!("{}\n", "Exiting due to errors".red().bold()));
    }

    output
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Change listing for `tag-diff`, sorted by tag name within each section.
pub fn render_changes(
    changes: &TagChanges,
    reference_file: &str,
    current_file: &str,
    verbose: bool,
) -> String {
    let rule = "=".repeat(80);
    let mut output = String::new();

    if verbose {
        output.push_str(&format!("{rule}\nTag Changes Report\n{rule}\n\n"));
    }
    output.push_str(&format!("Reference file: {reference_file}\n"));
    output.push_str(&format!("Current file: {current_file}\n"));

    if !changes.any() {
        output.push_str("No changes detected.\n");
        return output;
    }

    if !changes.added.is_empty() {
        let n = changes.added.len();
        output.push_str(&format!("{} {n} tag{}:\n", "Added".green().bold(), plural(n)));
        for (name, text) in &changes.added {
            output.push_str(&format!("  * \"{name}\": \"{}\"\n", truncate(text)));
        }
        output.push('\n');
    }

    if !changes.deleted.is_empty() {
        let n = changes.deleted.len();
        output.push_str(&format!("{} {n} tag{}:\n", "Deleted".red().bold(), plural(n)));
        for (name, text) in &changes.deleted {
            output.push_str(&format!("  * \"{name}\": \"{}\"\n", truncate(text)));
        }
        output.push('\n');
    }

    if !changes.modified.is_empty() {
        let n = changes.modified.len();
        output.push_str(&format!(
            "{} {n} tag{}:\n",
            "Modified".yellow().bold(),
            plural(n)
        ));
        for (name, modification) in &changes.modified {
            output.push_str(&format!("  * \"{name}\":\n"));
            output.push_str(&format!(
                "      Reference: \"{}\"\n",
                truncate(&modification.reference)
            ));
            output.push_str(&format!(
                "      Current:   \"{}\"\n",
                truncate(&modification.current)
            ));
        }
        output.push('\n');
    }

    if verbose {
        output.push_str(&format!("{rule}\n"));
        output.push_str(&format!("Summary: {} total changes\n", changes.total()));
        output.push_str(&format!("  Added:    {}\n", changes.added.len()));
        output.push_str(&format!("  Deleted:  {}\n", changes.deleted.len()));
        output.push_str(&format!("  Modified: {}\n", changes.modified.len()));
        output.push_str(&format!("{rule}\n"));
    }

    output
}
