//! Configuration schema for normrules
//!
//! Config lives at `.config/normrules/config.yaml` relative to the working
//! directory. Everything in it can also be given on the command line.
//!
//! ```yaml
//! tag_files:
//!   - build/riscv-unprivileged-norm-tags.json
//! def_files:
//!   - normative_rule_defs/rv32.yaml
//! tag_urls:
//!   - file: build/riscv-unprivileged-norm-tags.json
//!     url: https://riscv.github.io/riscv-isa-manual/snapshot/unprivileged/
//! warn_orphans: false
//! ```

use facet::Facet;

/// Root configuration for normrules
#[derive(Debug, Clone, Default, Facet)]
pub struct Config {
    /// Tag files to load, in order
    #[facet(default)]
    pub tag_files: Vec<String>,

    /// Rule definition files to load, in order
    #[facet(default)]
    pub def_files: Vec<String>,

    /// Standards document each tag file was extracted from
    #[facet(default)]
    pub tag_urls: Vec<TagUrlConfig>,

    /// Report unreferenced tags without failing
    #[facet(default)]
    pub warn_orphans: bool,

    /// Prefix reserved for tag names (defaults to `norm:`)
    #[facet(default)]
    pub reserved_prefix: Option<String>,

    /// Regex clarification links must match
    #[facet(default)]
    pub clarification_link_pattern: Option<String>,
}

#[derive(Debug, Clone, Facet)]
pub struct TagUrlConfig {
    /// Tag file path, exactly as passed to `tag_files` or `--tags`
    pub file: String,
    pub url: String,
}
