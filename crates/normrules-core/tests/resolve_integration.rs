//! Integration tests for loading and resolving fixture files

use std::path::{Path, PathBuf};

use normrules_core::{
    Diagnostic, FieldType, LoadError, ResolveOptions, Resolver, RuleDefStore, RuleKind, TagStore,
    TagUrlMap,
};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> PathBuf {
    Path::new(FIXTURES_DIR).join(name)
}

fn load_tags(names: &[&str]) -> TagStore {
    let mut tags = TagStore::new();
    for name in names {
        tags.load_from(fixture_path(name))
            .unwrap_or_else(|e| panic!("Failed to load tag fixture {}: {}", name, e));
    }
    tags
}

fn load_defs(names: &[&str]) -> RuleDefStore {
    let mut defs = RuleDefStore::new();
    for name in names {
        defs.load_from(fixture_path(name))
            .unwrap_or_else(|e| panic!("Failed to load def fixture {}: {}", name, e));
    }
    defs
}

#[test]
fn test_full_resolution_has_no_diagnostics() {
    let tags = load_tags(&["unpriv-tags.json", "priv-tags.json"]);
    let defs = load_defs(&["rv32i.yaml", "priv.yaml"]);

    assert_eq!(tags.len(), 13);
    assert_eq!(defs.len(), 10, "names expansion should yield 10 rules");

    let resolution = Resolver::new(&tags, &defs).resolve();
    assert!(
        resolution.report.diagnostics.is_empty(),
        "Expected no diagnostics: {:?}",
        resolution.report.diagnostics
    );
    assert!(!resolution.report.is_fatal());

    let rules = resolution.into_result().expect("resolution should succeed");
    assert_eq!(rules.len(), 10);
    assert_eq!(rules.impl_def_count(), 3);
    assert_eq!(rules.field_type_count(FieldType::Warl), 2);

    let names: Vec<_> = rules.normative_rules.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "addi-behavior",
            "slti-behavior",
            "sltiu-behavior",
            "logical-imm-behavior",
            "upper-imm-behavior",
            "x0-hardwired",
            "MISALIGNED_LDST",
            "mstatus-sie",
            "MTVEC_MODE",
            "MTVEC_BASE_ALIGN",
        ]
    );
}

#[test]
fn test_chapter_names_follow_file_shape() {
    let defs = load_defs(&["rv32i.yaml", "priv.yaml"]);
    assert_eq!(
        defs.get("addi-behavior").unwrap().chapter_name,
        "RV32I Base Integer Instruction Set"
    );
    assert_eq!(defs.get("mstatus-sie").unwrap().chapter_name, "priv");
}

#[test]
fn test_resolved_rule_contents() {
    let tags = load_tags(&["unpriv-tags.json", "priv-tags.json"]);
    let defs = load_defs(&["rv32i.yaml", "priv.yaml"]);
    let rules = Resolver::new(&tags, &defs)
        .resolve()
        .into_result()
        .unwrap();

    let slti = &rules.normative_rules[1];
    assert_eq!(slti.kind, Some(RuleKind::Instruction));
    assert_eq!(slti.instances, ["slti", "sltiu"]);
    assert_eq!(slti.tags.len(), 3);
    assert!(slti.tags[2].context);
    assert!(slti.tags[0].source_filename.ends_with("unpriv-tags.json"));

    let base = rules
        .normative_rules
        .iter()
        .find(|r| r.name == "MTVEC_BASE_ALIGN")
        .unwrap();
    assert!(base.impl_def_behavior);
    assert_eq!(base.field_type, None);
    assert_eq!(base.tags[0].kind, Some(RuleKind::CsrField));
    assert_eq!(base.tags[0].instances, ["mtvec.BASE"]);
}

#[test]
fn test_one_dangling_reference_among_valid_ones() {
    let tags = load_tags(&["unpriv-tags.json"]);
    let defs = load_defs(&["dangling.yaml"]);

    let resolution = Resolver::new(&tags, &defs).resolve();
    let report = &resolution.report;
    assert_eq!(report.missing_references(), 1);
    assert_eq!(report.orphans(), 0);
    assert_eq!(
        report.diagnostics[0],
        Diagnostic::MissingTag {
            rule: "bad-rule".into(),
            def_file: fixture_path("dangling.yaml").display().to_string(),
            tag: "norm:missing".into(),
        }
    );

    let err = resolution.into_result().unwrap_err();
    assert_eq!(err.missing_references, 1);
}

#[test]
fn test_orphans_fail_unless_warn_only() {
    let tags = load_tags(&["unpriv-tags.json"]);
    let defs = load_defs(&["orphans.yaml"]);

    let strict = Resolver::new(&tags, &defs).resolve();
    assert_eq!(strict.report.orphans(), 9);
    assert!(strict.into_result().is_err());

    let lenient = Resolver::new(&tags, &defs)
        .options(ResolveOptions::default().warn_only_orphans(true))
        .resolve();
    assert_eq!(lenient.report.orphans(), 9);
    let rules = lenient.into_result().expect("warn-only run should succeed");
    assert_eq!(rules.len(), 1);
}

#[test]
fn test_duplicate_tag_across_files() {
    let mut tags = TagStore::new();
    tags.load_from(fixture_path("unpriv-tags.json")).unwrap();
    let err = tags
        .load_from(fixture_path("duplicate-tags.json"))
        .unwrap_err();

    assert!(matches!(err, LoadError::DuplicateTag { .. }));
    let msg = err.to_string();
    assert!(msg.contains("unpriv-tags.json"), "{}", msg);
    assert!(msg.contains("duplicate-tags.json"), "{}", msg);
}

#[test]
fn test_missing_file_is_io_error() {
    let mut tags = TagStore::new();
    let err = tags.load_from(fixture_path("nope.json")).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn test_urls_are_attached_per_tag_file() {
    let tags = load_tags(&["unpriv-tags.json", "priv-tags.json"]);
    let defs = load_defs(&["rv32i.yaml", "priv.yaml"]);
    let urls: TagUrlMap = [
        (
            fixture_path("unpriv-tags.json").display().to_string(),
            "https://example.com/unpriv-isa-asciidoc.html".to_string(),
        ),
        (
            fixture_path("priv-tags.json").display().to_string(),
            "https://example.com/priv-isa-asciidoc.html".to_string(),
        ),
    ]
    .into_iter()
    .collect();

    let rules = Resolver::new(&tags, &defs)
        .urls(&urls)
        .options(ResolveOptions::default().require_urls(true))
        .resolve()
        .into_result()
        .unwrap();

    let sie = rules
        .normative_rules
        .iter()
        .find(|r| r.name == "mstatus-sie")
        .unwrap();
    assert_eq!(
        sie.tags[0].resolved_url.as_deref(),
        Some("https://example.com/priv-isa-asciidoc.html#norm:mstatus_sie")
    );
}

#[test]
fn test_output_is_deterministic() {
    let run = || {
        let tags = load_tags(&["unpriv-tags.json", "priv-tags.json"]);
        let defs = load_defs(&["rv32i.yaml", "priv.yaml"]);
        Resolver::new(&tags, &defs)
            .resolve()
            .into_result()
            .unwrap()
            .to_json()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_json_shape() {
    let tags = load_tags(&["unpriv-tags.json", "priv-tags.json"]);
    let defs = load_defs(&["rv32i.yaml", "priv.yaml"]);
    let json = Resolver::new(&tags, &defs)
        .resolve()
        .into_result()
        .unwrap()
        .to_json();

    let parsed: serde_json::Value = serde_json::from_str(&json).expect("Should be valid JSON");
    let rules = parsed["normative_rules"].as_array().unwrap();
    assert_eq!(rules.len(), 10);
    assert_eq!(rules[0]["name"], "addi-behavior");
    assert_eq!(rules[0]["kind"], "instruction");
    assert_eq!(rules[0]["impl_def_behavior"], false);
    assert!(rules[0].get("note").is_none());
    assert!(rules[0]["tags"][0].get("context").is_none());
    assert_eq!(rules[1]["tags"][2]["context"], true);
    assert_eq!(rules[6]["field_type"], "WARL");
}
