//! Single-page HTML rendering of the canonical rule list.

use std::collections::BTreeMap;

use normrules_core::canonical::{count_field_type, count_impl_defs};
use normrules_core::{FieldType, NormativeRule, NormativeRules, TagUrlMap};

use crate::adoc;

const NORM_RULES_CH_TABLE: &str = "table-norm-rules-ch-";
const IMPL_DEFS_NO_CAT_TABLE: &str = "table-impldefs-no-cat";
const IMPL_DEFS_CAT_TABLE: &str = "table-impldefs-impl-cat-";
const IMPL_DEFS_CH_TABLE: &str = "table-impldefs-ch-";

const STYLE: &str = r#"    .underline { text-decoration: underline; }
    :root {
      --sidebar-width: 200px;
      --accent: #0366d6;
      --muted: #6b7280;
      --bg: #f8fafc;
      --card: #ffffff;
    }
    html { scroll-behavior: smooth; }
    body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Helvetica, Arial, sans-serif; margin: 0; background: var(--bg); color: #111; }
    .app { display: grid; grid-template-columns: var(--sidebar-width) 1fr; min-height: 100vh; }
    .sidebar { position: sticky; top: 0; height: 100vh; padding: 24px; background: linear-gradient(180deg, #ffffff, #f1f5f9); border-right: 1px solid rgba(15,23,42,0.04); box-sizing: border-box; overflow-y: auto; }
    .sidebar h2 { margin: 0 0 2px; font-size: 18px; }
    .nav { display: flex; flex-direction: column; gap: 2px; }
    .nav a { display: block; font-size: 14px; padding: 2px 10px; border-radius: 6px; text-decoration: none; color: var(--accent); font-weight: 600; }
    .nav a.active { background: rgba(3,102,214,0.12); }
    main { padding: 28px 36px; }
    .section { background: var(--card); border-radius: 12px; padding: 20px; margin-bottom: 22px; box-shadow: 0 1px 0 rgba(15,23,42,0.03); }
    .grand-total-heading { font-size: 24px; font-weight: bold; }
    table { border-collapse: collapse; margin-top: 12px; table-layout: auto; }
    th, td { padding: 10px 12px; border: 1px solid #e6edf3; text-align: left; overflow-wrap: break-word; white-space: normal; }
    th { background: #f3f7fb; font-weight: 700; }
    table caption.sticky-caption { position: sticky; top: 0; z-index: 20; background: #ffffff; padding: 8px 12px; font-weight: bold; text-align: left; border-bottom: 1px solid #e6edf3; white-space: nowrap; }
    table thead th { position: sticky; top: 38px; z-index: 10; background: #f3f7fb; }
    .col-name { width: 20%; }
    .col-description { width: 60%; }
    .col-location { width: 20%; }
"#;

const SCRIPT: &str = r#"  <script>
    const sections = document.querySelectorAll('section[id]');
    const navLinks = document.querySelectorAll('.nav a');
    const io = new IntersectionObserver(entries => {
      entries.forEach(entry => {
        const link = document.querySelector('.nav a[data-target="' + entry.target.id + '"]');
        if (entry.isIntersecting) {
          navLinks.forEach(a => a.classList.remove('active'));
          if (link) link.classList.add('active');
        }
      });
    }, { root: null, rootMargin: '-40% 0px -40% 0px', threshold: 0 });
    sections.forEach(s => io.observe(s));
  </script>
"#;

/// Rows hidden from a rule's row group because the table already implies them.
#[derive(Debug, Clone, Copy, Default)]
struct RowOptions {
    /// Chapter tables own the rule anchors; the others link to them
    name_is_anchor: bool,
    omit_impl_def: bool,
    omit_field_type: bool,
}

/// Rules grouped the way the page lays them out.
struct Layout<'a> {
    /// Chapter names, sorted, with their rules in definition order
    chapters: BTreeMap<&'a str, Vec<&'a NormativeRule>>,
    /// Impl-def rules without a field type, by name
    impl_defs_no_cat: Vec<&'a NormativeRule>,
    /// Impl-def rules per field type, by name
    impl_defs_by_cat: Vec<(FieldType, Vec<&'a NormativeRule>)>,
}

impl<'a> Layout<'a> {
    fn new(rules: &'a NormativeRules) -> Self {
        let mut chapters: BTreeMap<&str, Vec<&NormativeRule>> = BTreeMap::new();
        let mut impl_defs_no_cat = Vec::new();
        let mut impl_defs_by_cat: Vec<(FieldType, Vec<&NormativeRule>)> =
            FieldType::ALL.iter().map(|&ft| (ft, Vec::new())).collect();

        for rule in &rules.normative_rules {
            chapters.entry(rule.chapter_name.as_str()).or_default().push(rule);
            if !rule.impl_def_behavior {
                continue;
            }
            match rule.field_type {
                None => impl_defs_no_cat.push(rule),
                Some(ft) => {
                    if let Some((_, list)) =
                        impl_defs_by_cat.iter_mut().find(|(c, _)| *c == ft)
                    {
                        list.push(rule);
                    }
                }
            }
        }

        impl_defs_no_cat.sort_by(|a, b| a.name.cmp(&b.name));
        for (_, list) in &mut impl_defs_by_cat {
            list.sort_by(|a, b| a.name.cmp(&b.name));
        }

        Self {
            chapters,
            impl_defs_no_cat,
            impl_defs_by_cat,
        }
    }

    /// `(table number, chapter, impl-def rules)` for chapters that have any.
    fn impl_defs_by_chapter(&self) -> Vec<(usize, &'a str, Vec<&'a NormativeRule>)> {
        self.chapters
            .iter()
            .enumerate()
            .map(|(i, (&chapter, rules))| {
                let impl_defs: Vec<_> = rules
                    .iter()
                    .copied()
                    .filter(|r| r.impl_def_behavior)
                    .collect();
                (i + 1, chapter, impl_defs)
            })
            .filter(|(_, _, impl_defs)| !impl_defs.is_empty())
            .collect()
    }

    fn any_impl_defs(&self) -> bool {
        self.chapters
            .values()
            .flatten()
            .any(|r| r.impl_def_behavior)
    }

    fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = (1..=self.chapters.len())
            .map(|n| format!("{NORM_RULES_CH_TABLE}{n}"))
            .collect();
        if !self.impl_defs_no_cat.is_empty() {
            names.push(IMPL_DEFS_NO_CAT_TABLE.to_string());
        }
        for (ft, list) in &self.impl_defs_by_cat {
            if !list.is_empty() {
                names.push(format!("{IMPL_DEFS_CAT_TABLE}{ft}"));
            }
        }
        for (n, _, _) in self.impl_defs_by_chapter() {
            names.push(format!("{IMPL_DEFS_CH_TABLE}{n}"));
        }
        names
    }
}

/// "N Normative Rules: Includes M Implementation-Defined Behaviors (x No Category, y WARL)"
pub fn counts_summary(rules: &[&NormativeRule]) -> String {
    let n = rules.len();
    let mut summary = format!("{n} Normative Rule{}", plural(n));

    let impl_defs = count_impl_defs(rules.iter().copied());
    if impl_defs == 0 {
        return summary;
    }
    summary.push_str(&format!(
        ": Includes {impl_defs} Implementation-Defined Behavior{}",
        plural(impl_defs)
    ));

    let per_cat: Vec<(FieldType, usize)> = FieldType::ALL
        .iter()
        .map(|&ft| (ft, count_field_type(rules.iter().copied(), ft)))
        .filter(|&(_, count)| count > 0)
        .collect();
    if !per_cat.is_empty() {
        let categorized: usize = per_cat.iter().map(|(_, c)| c).sum();
        let mut parts = vec![format!("{} No Category", impl_defs - categorized)];
        parts.extend(per_cat.iter().map(|(ft, c)| format!("{c} {ft}")));
        summary.push_str(&format!(" ({})", parts.join(", ")));
    }

    summary
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Render the whole page.
///
/// `urls` supplies the standards document each tag's cross references point
/// into.
pub fn render_html(rules: &NormativeRules, urls: &TagUrlMap) -> String {
    let layout = Layout::new(rules);
    let mut output = String::new();

    output.push_str("<!doctype html>\n<html lang=\"en\">\n<head>\n");
    output.push_str("  <meta charset=\"utf-8\" />\n");
    output.push_str(
        "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n",
    );
    output.push_str("  <title>Normative Rules per Chapter</title>\n");
    output.push_str("  <style>\n");
    output.push_str(STYLE);
    for name in layout.table_names() {
        output.push_str(&format!(
            "    #{name} > table {{ table-layout: fixed; width: 100% }}\n"
        ));
    }
    output.push_str("  </style>\n</head>\n<body>\n  <div class=\"app\">\n");

    render_sidebar(&mut output, &layout);

    output.push_str("    <main>\n");
    let all: Vec<&NormativeRule> = rules.normative_rules.iter().collect();
    output.push_str(&format!(
        "      <h1 class=\"grand-total-heading\">{}</h1>\n",
        counts_summary(&all)
    ));

    for (i, (chapter, chapter_rules)) in layout.chapters.iter().enumerate() {
        let caption = format!("Chapter {}: {}", escape(chapter), counts_summary(chapter_rules));
        let options = RowOptions {
            name_is_anchor: true,
            ..Default::default()
        };
        render_table(
            &mut output,
            &format!("{NORM_RULES_CH_TABLE}{}", i + 1),
            &caption,
            chapter_rules,
            options,
            urls,
        );
    }

    if layout.any_impl_defs() {
        let impl_def_options = RowOptions {
            omit_impl_def: true,
            ..Default::default()
        };

        if !layout.impl_defs_no_cat.is_empty() {
            render_table(
                &mut output,
                IMPL_DEFS_NO_CAT_TABLE,
                &impl_def_caption("No Category (A-Z)", layout.impl_defs_no_cat.len()),
                &layout.impl_defs_no_cat,
                impl_def_options,
                urls,
            );
        }

        for (ft, list) in &layout.impl_defs_by_cat {
            if list.is_empty() {
                continue;
            }
            render_table(
                &mut output,
                &format!("{IMPL_DEFS_CAT_TABLE}{ft}"),
                &impl_def_caption(&format!("{ft} Category (A-Z)"), list.len()),
                list,
                RowOptions {
                    omit_field_type: true,
                    ..impl_def_options
                },
                urls,
            );
        }

        for (n, chapter, impl_defs) in layout.impl_defs_by_chapter() {
            render_table(
                &mut output,
                &format!("{IMPL_DEFS_CH_TABLE}{n}"),
                &impl_def_caption(&format!("Chapter {}", escape(chapter)), impl_defs.len()),
                &impl_defs,
                impl_def_options,
                urls,
            );
        }
    }

    output.push_str("    </main>\n  </div>\n");
    output.push_str(SCRIPT);
    output.push_str("</body>\n</html>\n");
    output
}

fn impl_def_caption(prefix: &str, count: usize) -> String {
    format!("{prefix}: All {count} Implementation-Defined Behaviors")
}

fn render_sidebar(output: &mut String, layout: &Layout<'_>) {
    output.push_str("\n  <aside class=\"sidebar\">\n");
    output.push_str("    <h2>All Normative Rules</h2>\n");
    output.push_str("    <nav class=\"nav\" id=\"nav-chapters\">\n");
    for (i, chapter) in layout.chapters.keys().enumerate() {
        nav_link(output, &format!("{NORM_RULES_CH_TABLE}{}", i + 1), &escape(chapter));
    }
    output.push_str("    </nav>\n");

    if layout.any_impl_defs() {
        output.push_str("    <h2>Implementation-Defined Behaviors</h2>\n");
        output.push_str("    <nav class=\"nav\" id=\"nav-impldefs\">\n");
        if !layout.impl_defs_no_cat.is_empty() {
            nav_link(output, IMPL_DEFS_NO_CAT_TABLE, "No category");
        }
        for (ft, list) in &layout.impl_defs_by_cat {
            if !list.is_empty() {
                nav_link(
                    output,
                    &format!("{IMPL_DEFS_CAT_TABLE}{ft}"),
                    &format!("{ft} category"),
                );
            }
        }
        for (n, chapter, _) in layout.impl_defs_by_chapter() {
            nav_link(output, &format!("{IMPL_DEFS_CH_TABLE}{n}"), &escape(chapter));
        }
        output.push_str("    </nav>\n");
    }

    output.push_str("  </aside>\n");
}

fn nav_link(output: &mut String, target: &str, text: &str) {
    output.push_str(&format!(
        "      <a href=\"#{target}\" data-target=\"{target}\">{text}</a>\n"
    ));
}

fn render_table(
    output: &mut String,
    table_name: &str,
    caption: &str,
    rules: &[&NormativeRule],
    options: RowOptions,
    urls: &TagUrlMap,
) {
    output.push_str(&format!(
        "\n      <section id=\"{table_name}\" class=\"section\">\n"
    ));
    output.push_str("        <table>\n");
    output.push_str(&format!(
        "          <caption class=\"sticky-caption\">{caption}</caption>\n"
    ));
    output.push_str("          <colgroup>\n");
    output.push_str("            <col class=\"col-name\">\n");
    output.push_str("            <col class=\"col-description\">\n");
    output.push_str("            <col class=\"col-location\">\n");
    output.push_str("          </colgroup>\n");
    output.push_str("          <thead>\n");
    output.push_str(
        "            <tr><th>Rule Name</th><th>Rule Description</th>\
         <th>Origin of Description</th></tr>\n",
    );
    output.push_str("          </thead>\n");
    output.push_str("          <tbody>\n");
    for rule in rules {
        render_rule(output, rule, options, urls);
    }
    output.push_str("          </tbody>\n");
    output.push_str("        </table>\n");
    output.push_str("      </section>\n");
}

/// `(description cell, origin cell)` rows of one rule, in display order.
fn rule_rows(rule: &NormativeRule, options: RowOptions, urls: &TagUrlMap) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    let property = |name: &str| format!("Rule's \"{name}\" property");

    if let Some(summary) = &rule.summary {
        rows.push((adoc::def_text_to_html(summary), property("summary")));
    }
    if let Some(note) = &rule.note {
        rows.push((adoc::def_text_to_html(note), property("note")));
    }
    if let Some(description) = &rule.description {
        rows.push((adoc::def_text_to_html(description), property("description")));
    }
    if let Some(kind) = rule.kind {
        rows.push((kind.to_string(), property("kind")));
    }
    match rule.instances.as_slice() {
        [] => {}
        [one] => rows.push((one.clone(), property("instance"))),
        many => rows.push((format!("[{}]", many.join(", ")), property("instances"))),
    }
    if rule.impl_def_behavior && !options.omit_impl_def {
        rows.push((
            "Implementation-defined behavior".to_string(),
            "Rule's property".to_string(),
        ));
    }
    if let Some(ft) = rule.field_type.filter(|_| !options.omit_field_type) {
        rows.push((
            ft.to_string(),
            "Implementation-defined behavior category".to_string(),
        ));
    }

    for tag in &rule.tags {
        let target = urls.get(&tag.source_filename);
        let mut text = adoc::tag_text_to_html(&tag.text, target);
        if text.trim().is_empty() {
            text = "(No text available)".to_string();
        }
        if tag.context {
            text = format!("[CONTEXT] {text}");
        }
        let link = match &tag.resolved_url {
            Some(url) => format!("<a href=\"{}\">{}</a>", escape(url), escape(&tag.name)),
            None => adoc::tag_link(&tag.name, &tag.name, target),
        };
        rows.push((text, link));
    }

    if let Some(link) = &rule.clarification_link {
        let text = match &rule.clarification_text {
            Some(text) => adoc::def_text_to_html(text),
            None => "(No clarification text available)".to_string(),
        };
        rows.push((
            format!("[CLARIFICATION] {text}"),
            format!("<a href=\"{}\">GitHub Issue</a>", escape(link)),
        ));
    }

    rows
}

fn render_rule(output: &mut String, rule: &NormativeRule, options: RowOptions, urls: &TagUrlMap) {
    let rows = rule_rows(rule, options, urls);
    let span = rows.len().max(1);
    let name_cell = if options.name_is_anchor {
        format!("<td rowspan={span} id=\"{}\">{}</td>", rule.name, rule.name)
    } else {
        format!("<td rowspan={span}><a href=\"#{}\">{}</a></td>", rule.name, rule.name)
    };

    if rows.is_empty() {
        output.push_str(&format!(
            "            <tr>\n              {name_cell}\n            </tr>\n"
        ));
        return;
    }

    for (i, (text, origin)) in rows.iter().enumerate() {
        output.push_str("            <tr>\n");
        if i == 0 {
            output.push_str(&format!("              {name_cell}\n"));
        }
        output.push_str(&format!("              <td>{text}</td>\n"));
        output.push_str(&format!("              <td>{origin}</td>\n"));
        output.push_str("            </tr>\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use normrules_core::{Resolver, RuleDefStore, TagStore};

    fn resolve(tags_json: &str, defs_yaml: &str) -> NormativeRules {
        let mut tags = TagStore::new();
        tags.load_str("tags.json", tags_json).unwrap();
        let mut defs = RuleDefStore::new();
        defs.load_str("ch.yaml", defs_yaml).unwrap();
        let urls: TagUrlMap = [("tags.json", "https://example.com/isa.html")]
            .into_iter()
            .collect();
        Resolver::new(&tags, &defs)
            .urls(&urls)
            .resolve()
            .into_result()
            .unwrap()
    }

    fn urls() -> TagUrlMap {
        [("tags.json", "https://example.com/isa.html")]
            .into_iter()
            .collect()
    }

    #[test]
    fn counts_summary_variants() {
        let rules = resolve(
            r#"{"tags": {"norm:a": "a"}}"#,
            r#"
- name: plain-rule
  tag: norm:a
- name: NO_CAT
  impl-def-behavior: true
- name: WARL_ONE
  impl-def-behavior: true
  field-type: WARL
"#,
        );
        let all: Vec<_> = rules.normative_rules.iter().collect();
        assert_eq!(
            counts_summary(&all),
            "3 Normative Rules: Includes 2 Implementation-Defined Behaviors (1 No Category, 1 WARL)"
        );
        assert_eq!(counts_summary(&all[..1]), "1 Normative Rule");
        assert_eq!(
            counts_summary(&all[1..2]),
            "1 Normative Rule: Includes 1 Implementation-Defined Behavior"
        );
    }

    #[test]
    fn rowspan_covers_every_row() {
        let rules = resolve(
            r#"{"tags": {"norm:a": "text a", "norm:b": ""}}"#,
            r#"
- name: MTVEC_MODE
  summary: Trap vector mode
  kind: csr_field
  instances: [mtvec.MODE, stvec.MODE]
  impl-def-behavior: true
  field-type: WARL
  tags:
    - norm:a
    - name: norm:b
      context: true
  clarification-link: https://github.com/riscv/riscv-isa-manual/issues/7
"#,
        );
        let html = render_html(&rules, &urls());

        // summary, kind, instances, impl-def, category, two tags, clarification
        assert!(html.contains(r#"<td rowspan=8 id="MTVEC_MODE">MTVEC_MODE</td>"#));
        assert!(html.contains("<td>[mtvec.MODE, stvec.MODE]</td>"));
        assert!(html.contains(r#"<td>Rule's "instances" property</td>"#));
        assert!(html.contains("<td>[CONTEXT] (No text available)</td>"));
        assert!(html.contains(r#"<a href="https://example.com/isa.html#norm:a">norm:a</a>"#));
        assert!(html.contains("<td>[CLARIFICATION] (No clarification text available)</td>"));
        assert!(html.contains(
            r#"<a href="https://github.com/riscv/riscv-isa-manual/issues/7">GitHub Issue</a>"#
        ));
    }

    #[test]
    fn impl_def_tables_link_back_to_chapter_rows() {
        let rules = resolve(
            r#"{"tags": {"norm:a": "a"}}"#,
            r#"
- name: ZETA_BEHAVIOR
  impl-def-behavior: true
  tag: norm:a
- name: ALPHA_BEHAVIOR
  impl-def-behavior: true
  field-type: WLRL
"#,
        );
        let html = render_html(&rules, &urls());

        assert!(html.contains(r#"<section id="table-norm-rules-ch-1" class="section">"#));
        assert!(html.contains(r#"<section id="table-impldefs-no-cat" class="section">"#));
        assert!(html.contains(r#"<section id="table-impldefs-impl-cat-WLRL" class="section">"#));
        assert!(!html.contains(r#"id="table-impldefs-impl-cat-WARL""#));
        assert!(html.contains(r#"<section id="table-impldefs-ch-1" class="section">"#));
        assert!(
            html.contains(r##"<td rowspan=1><a href="#ZETA_BEHAVIOR">ZETA_BEHAVIOR</a></td>"##)
        );
        assert!(html.contains("No Category (A-Z): All 1 Implementation-Defined Behaviors"));
    }

    #[test]
    fn chapters_are_sorted() {
        let mut tags = TagStore::new();
        tags.load_str("tags.json", r#"{"tags": {}}"#).unwrap();
        let mut defs = RuleDefStore::new();
        defs.load_str("zz.yaml", "- name: rule-z\n").unwrap();
        defs.load_str("aa.yaml", "- name: rule-a\n").unwrap();
        let rules = Resolver::new(&tags, &defs)
            .resolve()
            .into_result()
            .unwrap();

        let html = render_html(&rules, &TagUrlMap::new());
        let aa = html.find("Chapter aa:").unwrap();
        let zz = html.find("Chapter zz:").unwrap();
        assert!(aa < zz);
        assert!(!html.contains("Implementation-Defined Behaviors</h2>"));
    }

    #[test]
    fn link_targets_are_escaped() {
        let rules = resolve(
            r#"{"tags": {"norm:a": "a"}}"#,
            r#"
- name: quoted-link
  tag: norm:a
  clarification-text: See the issue
  clarification-link: https://github.com/riscv/isa/issues/1"onclick="x
"#,
        );
        let html = render_html(&rules, &urls());
        assert!(
            html.contains(
                r#"<a href="https://github.com/riscv/isa/issues/1&quot;onclick=&quot;x">GitHub Issue</a>"#
            ),
            "{html}"
        );
        assert!(!html.contains(r#"1"onclick"#));
    }
}
