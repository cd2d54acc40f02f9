//! The canonical, serializable rule list produced by the resolver.

use serde::Serialize;

use crate::defs::{FieldType, RuleDef, RuleKind};

/// Every normative rule, in definition order, with its tags resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormativeRules {
    pub normative_rules: Vec<NormativeRule>,
}

/// One normative rule with its resolved tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormativeRule {
    pub name: String,
    pub source_filename: String,
    pub chapter_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<RuleKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    pub impl_def_behavior: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarification_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarification_link: Option<String>,
    pub tags: Vec<ResolvedTag>,
}

/// A tag reference bound to the tag it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTag {
    pub name: String,
    pub text: String,
    pub source_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_url: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub context: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<RuleKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<String>,
}

impl NormativeRule {
    pub(crate) fn from_def(def: &RuleDef, tags: Vec<ResolvedTag>) -> Self {
        Self {
            name: def.name.clone(),
            source_filename: def.source_file.clone(),
            chapter_name: def.chapter_name.clone(),
            kind: def.kind,
            instances: def.instances.clone(),
            summary: def.summary.clone(),
            description: def.description.clone(),
            note: def.note.clone(),
            field_type: def.field_type,
            impl_def_behavior: def.impl_def,
            clarification_text: def.clarification_text.clone(),
            clarification_link: def.clarification_link.clone(),
            tags,
        }
    }
}

impl NormativeRules {
    pub fn len(&self) -> usize {
        self.normative_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normative_rules.is_empty()
    }

    /// Number of implementation-defined behavior rules.
    pub fn impl_def_count(&self) -> usize {
        count_impl_defs(&self.normative_rules)
    }

    /// Number of implementation-defined behavior rules of one field type.
    pub fn field_type_count(&self, field_type: FieldType) -> usize {
        count_field_type(&self.normative_rules, field_type)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("failed to serialize normative rules to JSON")
    }
}

pub fn count_impl_defs<'a>(rules: impl IntoIterator<Item = &'a NormativeRule>) -> usize {
    rules.into_iter().filter(|r| r.impl_def_behavior).count()
}

pub fn count_field_type<'a>(
    rules: impl IntoIterator<Item = &'a NormativeRule>,
    field_type: FieldType,
) -> usize {
    rules
        .into_iter()
        .filter(|r| r.impl_def_behavior && r.field_type == Some(field_type))
        .count()
}
