//! Rule name patterns and the tag prefix rule names must not use.

use std::sync::LazyLock;

use regex::Regex;

/// Prefix reserved for tag (anchor) names in the standards documents.
pub const DEFAULT_TAG_PREFIX: &str = "norm:";

/// Pattern ordinary normative rule names must match.
pub const NORM_RULE_NAME_PATTERN: &str = r"^[a-zA-Z][a-zA-Z0-9_-]+$";

/// Pattern implementation-defined behavior (parameter) names must match.
pub const IMPL_DEF_NAME_PATTERN: &str = r"^[A-Z][A-Z0-9_]+$";

/// Clarification links are expected to point at a RISC-V GitHub issue.
pub const DEFAULT_CLARIFICATION_LINK_PATTERN: &str =
    r"^https://(www\.)?github\.com/riscv/.+/issues/[0-9]+$";

static NORM_RULE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NORM_RULE_NAME_PATTERN).unwrap());

static IMPL_DEF_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(IMPL_DEF_NAME_PATTERN).unwrap());

/// Which naming convention a rule name is held to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameStyle {
    /// `addi-behavior`, `csr_mstatus_sie`
    Rule,
    /// `MISALIGNED_LDST_BEHAVIOR`
    ImplDef,
}

impl NameStyle {
    pub fn for_rule(impl_def: bool) -> Self {
        if impl_def { Self::ImplDef } else { Self::Rule }
    }

    pub fn pattern(&self) -> &'static str {
        match self {
            NameStyle::Rule => NORM_RULE_NAME_PATTERN,
            NameStyle::ImplDef => IMPL_DEF_NAME_PATTERN,
        }
    }

    fn regex(&self) -> &'static Regex {
        match self {
            NameStyle::Rule => &NORM_RULE_NAME_RE,
            NameStyle::ImplDef => &IMPL_DEF_NAME_RE,
        }
    }
}

/// Check a rule name against its naming convention.
///
/// A name carrying the reserved tag prefix is checked without it; the
/// resolver reports the prefix itself, in aggregate with everything else.
pub fn is_valid_rule_name(name: &str, style: NameStyle, reserved_prefix: &str) -> bool {
    let bare = name.strip_prefix(reserved_prefix).unwrap_or(name);
    style.regex().is_match(bare)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_rule_names() {
        assert!(is_valid_rule_name("addi-behavior", NameStyle::Rule, "norm:"));
        assert!(is_valid_rule_name("csr_mstatus", NameStyle::Rule, "norm:"));
        assert!(!is_valid_rule_name("1st-rule", NameStyle::Rule, "norm:"));
        assert!(!is_valid_rule_name("a", NameStyle::Rule, "norm:"));
        assert!(!is_valid_rule_name("has space", NameStyle::Rule, "norm:"));
    }

    #[test]
    fn impl_def_names_are_upper_snake() {
        assert!(is_valid_rule_name("MISALIGNED_LDST", NameStyle::ImplDef, "norm:"));
        assert!(!is_valid_rule_name("misaligned_ldst", NameStyle::ImplDef, "norm:"));
        assert!(!is_valid_rule_name("MISALIGNED-LDST", NameStyle::ImplDef, "norm:"));
    }

    #[test]
    fn reserved_prefix_is_stripped_before_matching() {
        assert!(is_valid_rule_name("norm:addi_op", NameStyle::Rule, "norm:"));
        assert!(!is_valid_rule_name("norm:addi_op", NameStyle::Rule, ""));
    }

    #[test]
    fn style_follows_impl_def_flag() {
        assert_eq!(NameStyle::for_rule(true), NameStyle::ImplDef);
        assert_eq!(NameStyle::for_rule(false).pattern(), NORM_RULE_NAME_PATTERN);
    }
}
