//! normrules-core - Core library for normative rule resolution
//!
//! This crate provides the building blocks for:
//! - Loading tag files (tagged spans of standards text, keyed by anchor name)
//! - Loading normative rule definitions from YAML
//! - Resolving rule definitions against tags and validating the result
//! - Detecting tag changes between two revisions of a tag file
//!
//! # Tags and Rules
//!
//! A tag is a named span of normative text, extracted from the standards
//! documents as JSON:
//!
//! ```json
//! { "tags": { "norm:addi_op": "ADDI adds the sign-extended 12-bit immediate..." } }
//! ```
//!
//! A normative rule groups one or more tags under a stable name:
//!
//! ```yaml
//! - name: addi-behavior
//!   kind: instruction
//!   instances: [addi]
//!   tags: ["norm:addi_op"]
//! ```
//!
//! # Resolving
//!
//! ```
//! use normrules_core::{Resolver, RuleDefStore, TagStore};
//!
//! let mut tags = TagStore::new();
//! tags.load_str("unpriv-tags.json", r#"{"tags": {"norm:addi_op": "ADDI adds..."}}"#)
//!     .unwrap();
//!
//! let mut defs = RuleDefStore::new();
//! defs.load_str("rv32.yaml", "- name: addi-behavior\n  tag: norm:addi_op\n")
//!     .unwrap();
//!
//! let resolution = Resolver::new(&tags, &defs).resolve();
//! assert!(resolution.report.diagnostics.is_empty());
//!
//! let rules = resolution.into_result().unwrap();
//! assert_eq!(rules.normative_rules[0].tags[0].text, "ADDI adds...");
//! println!("{}", rules.to_json());
//! ```
//!
//! Every dangling reference and every unreferenced tag is collected into the
//! [`ValidationReport`] before the run is judged, so one pass shows every
//! mistake.

pub mod canonical;
pub mod changes;
pub mod defs;
mod error;
pub mod resolve;
pub mod rule_name;
pub mod tags;

pub use canonical::{NormativeRule, NormativeRules, ResolvedTag};
pub use changes::{TagChanges, detect_changes};
pub use defs::{FieldType, RuleDef, RuleDefStore, RuleKind, TagRef};
pub use error::LoadError;
pub use resolve::{
    Diagnostic, DiagnosticClass, Resolution, ResolveOptions, Resolver, Severity, TagUrlMap,
    ValidationFailed, ValidationReport,
};
pub use tags::{Tag, TagStore};
