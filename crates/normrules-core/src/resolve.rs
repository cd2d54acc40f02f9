//! Resolution and validation: binding rule definitions to tags.
//!
//! A resolution pass never stops at the first problem. Every rule is
//! resolved, every tag is checked for an owning rule, and all diagnostics
//! are collected before the pass decides whether the run failed. Authors get
//! the complete list of mistakes in one go.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::canonical::{NormativeRule, NormativeRules, ResolvedTag};
use crate::defs::RuleDefStore;
use crate::rule_name::{DEFAULT_CLARIFICATION_LINK_PATTERN, DEFAULT_TAG_PREFIX};
use crate::tags::TagStore;

static DEFAULT_CLARIFICATION_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_CLARIFICATION_LINK_PATTERN).unwrap());

/// Maps a tag file to the URL of the standards document it was extracted from.
#[derive(Debug, Clone, Default)]
pub struct TagUrlMap {
    urls: HashMap<String, String>,
}

impl TagUrlMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `tag_file` to `url`, replacing any earlier mapping for it.
    pub fn insert(&mut self, tag_file: impl Into<String>, url: impl Into<String>) {
        self.urls.insert(tag_file.into(), url.into());
    }

    pub fn get(&self, tag_file: &str) -> Option<&str> {
        self.urls.get(tag_file).map(|s| s.as_str())
    }

    /// Link to a tag's anchor inside its standards document.
    pub fn resolve(&self, tag_file: &str, tag_name: &str) -> Option<String> {
        self.get(tag_file).map(|url| format!("{url}#{tag_name}"))
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl<F: Into<String>, U: Into<String>> FromIterator<(F, U)> for TagUrlMap {
    fn from_iter<I: IntoIterator<Item = (F, U)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (file, url) in iter {
            map.insert(file, url);
        }
        map
    }
}

/// Caller-controlled knobs for a resolution pass.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Report unreferenced tags without failing the run. For interactive
    /// debugging only.
    pub warn_only_orphans: bool,
    /// Prefix reserved for tag names; rule names must not use it.
    pub reserved_prefix: String,
    /// Shape clarification links are expected to have.
    pub clarification_link_pattern: Regex,
    /// Every referenced tag file must have a URL mapping.
    pub require_urls: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            warn_only_orphans: false,
            reserved_prefix: DEFAULT_TAG_PREFIX.to_string(),
            clarification_link_pattern: DEFAULT_CLARIFICATION_LINK_RE.clone(),
            require_urls: false,
        }
    }
}

impl ResolveOptions {
    pub fn warn_only_orphans(mut self, warn_only: bool) -> Self {
        self.warn_only_orphans = warn_only;
        self
    }

    pub fn reserved_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reserved_prefix = prefix.into();
        self
    }

    pub fn require_urls(mut self, require: bool) -> Self {
        self.require_urls = require;
        self
    }

    /// Override the expected clarification link shape.
    pub fn clarification_link_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.clarification_link_pattern = Regex::new(pattern)?;
        Ok(self)
    }
}

/// One problem found during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A rule references a tag that doesn't exist.
    MissingTag {
        rule: String,
        def_file: String,
        tag: String,
    },
    /// A rule name uses the prefix reserved for tag names.
    ReservedPrefix {
        rule: String,
        def_file: String,
        prefix: String,
    },
    /// `clarification-text` without `clarification-link`.
    ClarificationWithoutLink { rule: String, def_file: String },
    /// `clarification-link` that doesn't look like an issue link.
    ClarificationLinkMismatch {
        rule: String,
        def_file: String,
        link: String,
    },
    /// A tag that no rule references.
    OrphanTag { tag: String, tag_file: String },
    /// A referenced tag file has no URL mapping.
    MissingUrlMapping { tag_file: String, tag: String },
}

/// Which counter a diagnostic feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticClass {
    MissingReference,
    MalformedName,
    Consistency,
    Orphan,
    UrlMapping,
}

/// How bad a diagnostic is, given the pass's options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Diagnostic {
    pub fn class(&self) -> DiagnosticClass {
        match self {
            Diagnostic::MissingTag { .. } => DiagnosticClass::MissingReference,
            Diagnostic::ReservedPrefix { .. } => DiagnosticClass::MalformedName,
            Diagnostic::ClarificationWithoutLink { .. }
            | Diagnostic::ClarificationLinkMismatch { .. } => DiagnosticClass::Consistency,
            Diagnostic::OrphanTag { .. } => DiagnosticClass::Orphan,
            Diagnostic::MissingUrlMapping { .. } => DiagnosticClass::UrlMapping,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingTag {
                rule,
                def_file,
                tag,
            } => write!(
                f,
                "Normative rule {rule} references non-existent tag {tag} in file {def_file}"
            ),
            Diagnostic::ReservedPrefix {
                rule,
                def_file,
                prefix,
            } => write!(
                f,
                "Normative rule {rule} in file {def_file} starts with \"{prefix}\" prefix. \
                 This prefix is only for tag names, not rule names."
            ),
            Diagnostic::ClarificationWithoutLink { rule, def_file } => write!(
                f,
                "Normative rule {rule} in file {def_file} has clarification-text \
                 but no clarification-link"
            ),
            Diagnostic::ClarificationLinkMismatch {
                rule,
                def_file,
                link,
            } => write!(
                f,
                "Normative rule {rule} in file {def_file} clarification-link of '{link}' \
                 doesn't look like a RISC-V GitHub issue link"
            ),
            Diagnostic::OrphanTag { tag, tag_file } => write!(
                f,
                "Tag {tag} in file {tag_file} not referenced by any normative rule. \
                 Did you forget to define a normative rule?"
            ),
            Diagnostic::MissingUrlMapping { tag_file, tag } => write!(
                f,
                "No tag file to URL mapping for tag file {tag_file} (first needed by tag {tag})"
            ),
        }
    }
}

/// All diagnostics of one resolution pass, in input order.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
    warn_only_orphans: bool,
}

impl ValidationReport {
    pub fn severity(&self, diagnostic: &Diagnostic) -> Severity {
        match diagnostic.class() {
            DiagnosticClass::MissingReference
            | DiagnosticClass::MalformedName
            | DiagnosticClass::UrlMapping => Severity::Error,
            DiagnosticClass::Orphan if self.warn_only_orphans => Severity::Info,
            DiagnosticClass::Orphan => Severity::Error,
            DiagnosticClass::Consistency => Severity::Warning,
        }
    }

    pub fn count(&self, class: DiagnosticClass) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.class() == class)
            .count()
    }

    pub fn missing_references(&self) -> usize {
        self.count(DiagnosticClass::MissingReference)
    }

    pub fn malformed_names(&self) -> usize {
        self.count(DiagnosticClass::MalformedName)
    }

    pub fn orphans(&self) -> usize {
        self.count(DiagnosticClass::Orphan)
    }

    pub fn missing_url_mappings(&self) -> usize {
        self.count(DiagnosticClass::UrlMapping)
    }

    /// Whether the run must fail.
    pub fn is_fatal(&self) -> bool {
        self.missing_references() > 0
            || self.malformed_names() > 0
            || self.missing_url_mappings() > 0
            || (self.orphans() > 0 && !self.warn_only_orphans)
    }

    /// Per-class totals, for the end of a diagnostic listing.
    pub fn totals(&self) -> Vec<(Severity, String)> {
        let mut totals = Vec::new();

        let n = self.missing_references();
        if n > 0 {
            totals.push((
                Severity::Error,
                format!("{n} reference{} to non-existing tags", plural(n)),
            ));
        }

        let n = self.malformed_names();
        if n > 0 {
            totals.push((
                Severity::Error,
                format!("{n} illegal normative rule name{}", plural(n)),
            ));
        }

        let n = self.orphans();
        if n > 0 {
            let severity = if self.warn_only_orphans {
                Severity::Info
            } else {
                Severity::Error
            };
            totals.push((
                severity,
                format!(
                    "{n} tag{} {} no normative rules referencing them",
                    plural(n),
                    if n == 1 { "has" } else { "have" }
                ),
            ));
        }

        let n = self.missing_url_mappings();
        if n > 0 {
            totals.push((
                Severity::Error,
                format!("{n} tag file{} without a URL mapping", plural(n)),
            ));
        }

        totals
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// The run failed validation; the report has the details.
#[derive(Debug, thiserror::Error)]
#[error(
    "validation failed: {missing_references} missing tag reference(s), \
     {malformed_names} illegal rule name(s), {orphans} unreferenced tag(s), \
     {missing_url_mappings} unmapped tag file(s)"
)]
pub struct ValidationFailed {
    pub missing_references: usize,
    pub malformed_names: usize,
    pub orphans: usize,
    pub missing_url_mappings: usize,
}

/// Outcome of a resolution pass.
#[derive(Debug, Clone)]
pub struct Resolution {
    rules: NormativeRules,
    pub report: ValidationReport,
}

impl Resolution {
    /// The canonical rule list, if the pass succeeded.
    pub fn into_result(self) -> Result<NormativeRules, ValidationFailed> {
        if self.report.is_fatal() {
            return Err(ValidationFailed {
                missing_references: self.report.missing_references(),
                malformed_names: self.report.malformed_names(),
                orphans: if self.report.warn_only_orphans {
                    0
                } else {
                    self.report.orphans()
                },
                missing_url_mappings: self.report.missing_url_mappings(),
            });
        }
        Ok(self.rules)
    }
}

/// Cross-references rule definitions against tags.
pub struct Resolver<'a> {
    tags: &'a TagStore,
    defs: &'a RuleDefStore,
    urls: Option<&'a TagUrlMap>,
    options: ResolveOptions,
}

impl<'a> Resolver<'a> {
    pub fn new(tags: &'a TagStore, defs: &'a RuleDefStore) -> Self {
        Self {
            tags,
            defs,
            urls: None,
            options: ResolveOptions::default(),
        }
    }

    pub fn urls(mut self, urls: &'a TagUrlMap) -> Self {
        self.urls = Some(urls);
        self
    }

    pub fn options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one resolution pass.
    pub fn resolve(&self) -> Resolution {
        tracing::info!("Creating normative rules from definition files");

        // Bookkeeping for orphan detection, indexed like the tag store
        let mut referenced = vec![false; self.tags.len()];
        let mut diagnostics = Vec::new();
        let mut unmapped: Vec<(String, String)> = Vec::new();
        let mut rules = Vec::with_capacity(self.defs.len());
        let prefix = self.options.reserved_prefix.as_str();

        for def in self.defs.all() {
            let mut resolved = Vec::with_capacity(def.tag_refs.len());

            for tag_ref in &def.tag_refs {
                let Some((index, tag)) = self.tags.lookup(&tag_ref.name) else {
                    tracing::debug!("{} -> {} (missing)", def.name, tag_ref.name);
                    diagnostics.push(Diagnostic::MissingTag {
                        rule: def.name.clone(),
                        def_file: def.source_file.clone(),
                        tag: tag_ref.name.clone(),
                    });
                    continue;
                };
                referenced[index] = true;

                let resolved_url = self
                    .urls
                    .and_then(|urls| urls.resolve(&tag.source_file, &tag.name));
                if resolved_url.is_none()
                    && self.options.require_urls
                    && !unmapped.iter().any(|(file, _)| *file == tag.source_file)
                {
                    unmapped.push((tag.source_file.clone(), tag.name.clone()));
                }

                resolved.push(ResolvedTag {
                    name: tag.name.clone(),
                    text: tag.text.clone(),
                    source_filename: tag.source_file.clone(),
                    resolved_url,
                    context: tag_ref.context,
                    kind: tag_ref.kind,
                    instances: tag_ref.instances.clone(),
                });
            }

            if !prefix.is_empty() && def.name.starts_with(prefix) {
                diagnostics.push(Diagnostic::ReservedPrefix {
                    rule: def.name.clone(),
                    def_file: def.source_file.clone(),
                    prefix: prefix.to_string(),
                });
            }

            if def.clarification_text.is_some() && def.clarification_link.is_none() {
                diagnostics.push(Diagnostic::ClarificationWithoutLink {
                    rule: def.name.clone(),
                    def_file: def.source_file.clone(),
                });
            }

            if let Some(link) = &def.clarification_link {
                if !self.options.clarification_link_pattern.is_match(link) {
                    diagnostics.push(Diagnostic::ClarificationLinkMismatch {
                        rule: def.name.clone(),
                        def_file: def.source_file.clone(),
                        link: link.clone(),
                    });
                }
            }

            rules.push(NormativeRule::from_def(def, resolved));
        }

        for (tag, referenced) in self.tags.all().zip(&referenced) {
            if !referenced {
                diagnostics.push(Diagnostic::OrphanTag {
                    tag: tag.name.clone(),
                    tag_file: tag.source_file.clone(),
                });
            }
        }

        for (tag_file, tag) in unmapped {
            diagnostics.push(Diagnostic::MissingUrlMapping { tag_file, tag });
        }

        Resolution {
            rules: NormativeRules {
                normative_rules: rules,
            },
            report: ValidationReport {
                diagnostics,
                warn_only_orphans: self.options.warn_only_orphans,
            },
        }
    }
}
