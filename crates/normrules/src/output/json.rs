use std::path::Path;

use eyre::{Result, WrapErr};
use normrules_core::NormativeRules;

/// Write the canonical rule list as pretty-printed JSON.
pub fn write_json(rules: &NormativeRules, path: &Path) -> Result<()> {
    let mut json = rules.to_json();
    json.push('\n');
    std::fs::write(path, json)
        .wrap_err_with(|| format!("Failed to write JSON output: {}", path.display()))
}
