//! Spreadsheet rendering of the canonical rule list.

use std::path::Path;

use normrules_core::{NormativeRule, NormativeRules};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

/// Longest string a spreadsheet cell holds.
pub const CELL_LIMIT: usize = 32_767;

const TRUNCATION_MARK: &str = "...";

pub const RULES_SHEET: &str = "Normative Rules";
pub const IMPL_DEFS_SHEET: &str = "Impl-Def Behaviors";

const RULE_COLUMNS: [(&str, f64); 13] = [
    ("Rule Name", 30.0),
    ("Chapter", 24.0),
    ("Kind", 14.0),
    ("Instances", 20.0),
    ("Summary", 40.0),
    ("Note", 30.0),
    ("Description", 40.0),
    ("Impl-Def", 10.0),
    ("Field Type", 10.0),
    ("Tags", 30.0),
    ("Tag Text", 80.0),
    ("Clarification", 40.0),
    ("Definition File", 30.0),
];

const IMPL_DEF_COLUMNS: [(&str, f64); 5] = [
    ("Rule Name", 30.0),
    ("Field Type", 10.0),
    ("Chapter", 24.0),
    ("Summary", 40.0),
    ("Tag Text", 80.0),
];

/// Clamp text to [`CELL_LIMIT`] characters.
pub fn fit_cell(text: &str) -> String {
    let keep = CELL_LIMIT - TRUNCATION_MARK.len();
    match text.char_indices().nth(CELL_LIMIT) {
        None => text.to_string(),
        Some(_) => {
            let cut = text
                .char_indices()
                .nth(keep)
                .map_or(text.len(), |(i, _)| i);
            format!("{}{TRUNCATION_MARK}", &text[..cut])
        }
    }
}

fn tag_text(rule: &NormativeRule) -> String {
    rule.tags
        .iter()
        .map(|tag| {
            let text = if tag.text.trim().is_empty() {
                "(No text available)"
            } else {
                tag.text.as_str()
            };
            if tag.context {
                format!("[CONTEXT] {text}")
            } else {
                text.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn tag_names(rule: &NormativeRule) -> String {
    rule.tags
        .iter()
        .map(|tag| tag.resolved_url.as_deref().unwrap_or(&tag.name))
        .collect::<Vec<_>>()
        .join("\n")
}

fn clarification(rule: &NormativeRule) -> String {
    match (&rule.clarification_text, &rule.clarification_link) {
        (Some(text), Some(link)) => format!("{text}\n{link}"),
        (Some(text), None) => text.clone(),
        (None, Some(link)) => link.clone(),
        (None, None) => String::new(),
    }
}

/// One row of the rules sheet, matching its column headers.
pub fn rule_row(rule: &NormativeRule) -> Vec<String> {
    vec![
        rule.name.clone(),
        rule.chapter_name.clone(),
        rule.kind.map(|k| k.to_string()).unwrap_or_default(),
        rule.instances.join(", "),
        rule.summary.clone().unwrap_or_default(),
        rule.note.clone().unwrap_or_default(),
        rule.description.clone().unwrap_or_default(),
        if rule.impl_def_behavior { "yes" } else { "" }.to_string(),
        rule.field_type.map(|ft| ft.to_string()).unwrap_or_default(),
        tag_names(rule),
        tag_text(rule),
        clarification(rule),
        rule.source_filename.clone(),
    ]
}

fn impl_def_row(rule: &NormativeRule) -> Vec<String> {
    vec![
        rule.name.clone(),
        rule.field_type.map(|ft| ft.to_string()).unwrap_or_default(),
        rule.chapter_name.clone(),
        rule.summary.clone().unwrap_or_default(),
        tag_text(rule),
    ]
}

fn write_sheet(
    sheet: &mut Worksheet,
    name: &str,
    columns: &[(&str, f64)],
    rows: impl Iterator<Item = Vec<String>>,
) -> Result<(), XlsxError> {
    let header = Format::new().set_bold();
    let wrap = Format::new().set_text_wrap();

    sheet.set_name(name)?;
    for (col, (title, width)) in columns.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *title, &header)?;
        sheet.set_column_width(col, *width)?;
    }
    sheet.set_freeze_panes(1, 0)?;

    let mut last_row = 0;
    for (i, row) in rows.enumerate() {
        last_row = i as u32 + 1;
        for (col, value) in row.iter().enumerate() {
            sheet.write_string_with_format(last_row, col as u16, fit_cell(value), &wrap)?;
        }
    }
    sheet.autofilter(0, 0, last_row, columns.len() as u16 - 1)?;

    Ok(())
}

/// Write the workbook to `path`.
///
/// The impl-def sheet is only added when there are impl-def rules.
pub fn write_xlsx(rules: &NormativeRules, path: &Path) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();

    write_sheet(
        workbook.add_worksheet(),
        RULES_SHEET,
        &RULE_COLUMNS,
        rules.normative_rules.iter().map(rule_row),
    )?;

    let mut impl_defs: Vec<&NormativeRule> = rules
        .normative_rules
        .iter()
        .filter(|r| r.impl_def_behavior)
        .collect();
    if !impl_defs.is_empty() {
        impl_defs.sort_by(|a, b| a.name.cmp(&b.name));
        write_sheet(
            workbook.add_worksheet(),
            IMPL_DEFS_SHEET,
            &IMPL_DEF_COLUMNS,
            impl_defs.into_iter().map(impl_def_row),
        )?;
    }

    workbook.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use normrules_core::{Resolver, RuleDefStore, TagStore};

    fn rules() -> NormativeRules {
        let mut tags = TagStore::new();
        tags.load_str(
            "tags.json",
            r#"{"tags": {"norm:a": "ADDI adds...", "norm:b": ""}}"#,
        )
        .unwrap();
        let mut defs = RuleDefStore::new();
        defs.load_str(
            "ch.yaml",
            r#"
- name: addi-behavior
  kind: instruction
  instances: [addi, addiw]
  tags:
    - norm:a
    - name: norm:b
      context: true
- name: ZETA
  impl-def-behavior: true
  field-type: WARL
"#,
        )
        .unwrap();
        Resolver::new(&tags, &defs)
            .resolve()
            .into_result()
            .unwrap()
    }

    #[test]
    fn row_matches_headers() {
        let rules = rules();
        let row = rule_row(&rules.normative_rules[0]);
        assert_eq!(row.len(), RULE_COLUMNS.len());
        assert_eq!(row[0], "addi-behavior");
        assert_eq!(row[2], "instruction");
        assert_eq!(row[3], "addi, addiw");
        assert_eq!(row[9], "norm:a\nnorm:b");
        assert_eq!(row[10], "ADDI adds...\n\n[CONTEXT] (No text available)");

        let impl_def = rule_row(&rules.normative_rules[1]);
        assert_eq!(impl_def[7], "yes");
        assert_eq!(impl_def[8], "WARL");
    }

    #[test]
    fn long_cells_are_truncated() {
        let long = "x".repeat(CELL_LIMIT + 10);
        let fitted = fit_cell(&long);
        assert_eq!(fitted.chars().count(), CELL_LIMIT);
        assert!(fitted.ends_with(TRUNCATION_MARK));

        let exact = "y".repeat(CELL_LIMIT);
        assert_eq!(fit_cell(&exact), exact);
    }

    #[test]
    fn writes_a_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.xlsx");
        write_xlsx(&rules(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"), "xlsx files are zip archives");
    }
}
