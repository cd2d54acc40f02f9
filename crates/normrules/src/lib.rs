//! normrules library - Build normative rule lists from tagged standards text
//!
//! This library exposes the command-line tool's building blocks for testing
//! and embedding: configuration, output adapters, and report rendering. The
//! resolution logic itself lives in `normrules-core`.

pub mod adoc;
pub mod config;
pub mod output;
pub mod report;

use std::path::{Path, PathBuf};

use config::Config;
use eyre::{Result, WrapErr};
use normrules_core::rule_name::DEFAULT_TAG_PREFIX;
use normrules_core::{ResolveOptions, RuleDefStore, TagStore, TagUrlMap};

/// Where the config file is looked for when `--config` isn't given.
pub const DEFAULT_CONFIG_PATH: &str = ".config/normrules/config.yaml";

/// Load a config file that must exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        eyre::bail!(
            "Config file not found at {}\n\n\
             Create a config file listing your inputs:\n\n\
             tag_files:\n  \
               - build/unpriv-tags.json\n\
             def_files:\n  \
               - defs/rv32.yaml\n\
             tag_urls:\n  \
               - file: build/unpriv-tags.json\n    \
                 url: https://example.com/unpriv.html",
            path.display()
        );
    }

    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = facet_yaml::from_str(&content)
        .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Load config if it exists, otherwise return default empty config.
///
/// A config file that exists but doesn't parse is still an error.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    load_config(path)
}

/// Everything one `resolve` run needs: config file values with command-line
/// values layered on top.
#[derive(Debug, Clone)]
pub struct ResolveSettings {
    pub tag_files: Vec<PathBuf>,
    pub def_files: Vec<PathBuf>,
    /// `(tag file, url)` pairs; later pairs win
    pub tag_urls: Vec<(String, String)>,
    pub warn_orphans: bool,
    pub reserved_prefix: String,
    pub clarification_link_pattern: Option<String>,
}

impl ResolveSettings {
    pub fn from_config(config: Config) -> Self {
        Self {
            tag_files: config.tag_files.into_iter().map(PathBuf::from).collect(),
            def_files: config.def_files.into_iter().map(PathBuf::from).collect(),
            tag_urls: config
                .tag_urls
                .into_iter()
                .map(|t| (t.file, t.url))
                .collect(),
            warn_orphans: config.warn_orphans,
            reserved_prefix: config
                .reserved_prefix
                .unwrap_or_else(|| DEFAULT_TAG_PREFIX.to_string()),
            clarification_link_pattern: config.clarification_link_pattern,
        }
    }

    /// Append command-line inputs. Flags can only turn `warn_orphans` on.
    pub fn with_args(
        mut self,
        tag_files: Vec<PathBuf>,
        def_files: Vec<PathBuf>,
        tag_urls: Vec<(String, String)>,
        warn_orphans: bool,
    ) -> Self {
        self.tag_files.extend(tag_files);
        self.def_files.extend(def_files);
        self.tag_urls.extend(tag_urls);
        self.warn_orphans |= warn_orphans;
        self
    }

    pub fn url_map(&self) -> TagUrlMap {
        self.tag_urls.iter().cloned().collect()
    }

    pub fn resolve_options(&self, require_urls: bool) -> Result<ResolveOptions> {
        let mut options = ResolveOptions::default()
            .warn_only_orphans(self.warn_orphans)
            .reserved_prefix(self.reserved_prefix.clone())
            .require_urls(require_urls);
        if let Some(pattern) = &self.clarification_link_pattern {
            options = options
                .clarification_link_pattern(pattern)
                .wrap_err_with(|| format!("Invalid clarification link pattern: {pattern}"))?;
        }
        Ok(options)
    }

    /// Load every tag file, then every definition file.
    pub fn load_stores(&self) -> Result<(TagStore, RuleDefStore)> {
        let mut tags = TagStore::new();
        for path in &self.tag_files {
            let added = tags
                .load_from(path)
                .wrap_err_with(|| format!("Failed to load tag file {}", path.display()))?;
            tracing::debug!("{} tags in {}", added, path.display());
        }

        let mut defs = RuleDefStore::with_reserved_prefix(self.reserved_prefix.clone());
        for path in &self.def_files {
            let added = defs
                .load_from(path)
                .wrap_err_with(|| format!("Failed to load definition file {}", path.display()))?;
            tracing::debug!("{} rules in {}", added, path.display());
        }

        Ok((tags, defs))
    }
}
