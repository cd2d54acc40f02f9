//! Rule definition store: declarative normative rule definitions from YAML.
//!
//! A definition file is either a plain list of entries or a mapping that
//! carries the list under `normative_rule_definitions`:
//!
//! ```yaml
//! chapter_name: RV32I Base Integer Instruction Set
//! normative_rule_definitions:
//!   - name: addi-behavior
//!     kind: instruction
//!     instances: [addi]
//!     tags: ["norm:addi_op"]
//!   - names: [slti-behavior, sltiu-behavior]
//!     tags:
//!       - norm:slti_op
//!       - name: norm:compare_context
//!         context: true
//!   - name: MISALIGNED_LDST
//!     impl-def-behavior: true
//!     field-type: WARL
//!     tag: norm:misaligned
//! ```
//!
//! Every entry is type-checked when it is loaded. Any problem aborts the load
//! with a [`LoadError`] naming the rule and file.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::{LoadError, yaml_type_name};
use crate::rule_name::{DEFAULT_TAG_PREFIX, NameStyle, is_valid_rule_name};

/// Key holding the definition list in mapping-shaped definition files.
pub const DEFINITIONS_KEY: &str = "normative_rule_definitions";

/// Key holding the chapter name in mapping-shaped definition files.
pub const CHAPTER_NAME_KEY: &str = "chapter_name";

/// What kind of architectural entity a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Extension,
    ExtensionDependency,
    Instruction,
    Csr,
    CsrField,
    Parameter,
}

impl RuleKind {
    pub const ALL: [RuleKind; 6] = [
        RuleKind::Extension,
        RuleKind::ExtensionDependency,
        RuleKind::Instruction,
        RuleKind::Csr,
        RuleKind::CsrField,
        RuleKind::Parameter,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Extension => "extension",
            RuleKind::ExtensionDependency => "extension_dependency",
            RuleKind::Instruction => "instruction",
            RuleKind::Csr => "csr",
            RuleKind::CsrField => "csr_field",
            RuleKind::Parameter => "parameter",
        }
    }

    fn allowed() -> String {
        Self::ALL.map(|k| k.as_str()).join(",")
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Register field behavior of an implementation-defined rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FieldType {
    /// Write Any values, Reads Legal values
    #[serde(rename = "WARL")]
    Warl,
    /// Write Legal values, Reads Legal values
    #[serde(rename = "WLRL")]
    Wlrl,
}

impl FieldType {
    pub const ALL: [FieldType; 2] = [FieldType::Warl, FieldType::Wlrl];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Warl => "WARL",
            FieldType::Wlrl => "WLRL",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule's reference to one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    /// Supplementary text rather than primary normative text
    pub context: bool,
    pub kind: Option<RuleKind>,
    pub instances: Vec<String>,
}

impl TagRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: false,
            kind: None,
            instances: Vec::new(),
        }
    }
}

/// One normative rule definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDef {
    pub name: String,
    pub source_file: String,
    pub chapter_name: String,
    pub kind: Option<RuleKind>,
    pub instances: Vec<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub note: Option<String>,
    pub field_type: Option<FieldType>,
    pub impl_def: bool,
    pub clarification_text: Option<String>,
    pub clarification_link: Option<String>,
    pub tag_refs: Vec<TagRef>,
}

/// All rule definitions, across any number of definition files, in
/// definition order.
#[derive(Debug)]
pub struct RuleDefStore {
    defs: Vec<RuleDef>,
    by_name: HashMap<String, usize>,
    reserved_prefix: String,
}

impl Default for RuleDefStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleDefStore {
    pub fn new() -> Self {
        Self::with_reserved_prefix(DEFAULT_TAG_PREFIX)
    }

    /// Use a different reserved tag prefix when validating names.
    pub fn with_reserved_prefix(prefix: impl Into<String>) -> Self {
        Self {
            defs: Vec::new(),
            by_name: HashMap::new(),
            reserved_prefix: prefix.into(),
        }
    }

    /// Read and add every definition from a YAML definition file.
    pub fn load_from(&mut self, path: impl AsRef<Path>) -> Result<usize, LoadError> {
        let path = path.as_ref();
        let file = path.display().to_string();
        tracing::info!("Loading definition file {file}");

        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&file, &content)
    }

    /// Parse definition file contents and add them under the `file` identifier.
    ///
    /// Returns the number of definitions added (after `names` expansion).
    pub fn load_str(&mut self, file: &str, content: &str) -> Result<usize, LoadError> {
        let doc: Value = serde_yaml::from_str(content).map_err(|source| LoadError::Yaml {
            file: file.to_string(),
            source,
        })?;

        let default_chapter = Path::new(file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.to_string());

        match &doc {
            Value::Sequence(entries) => self.add_entries(file, &default_chapter, entries),
            Value::Mapping(map) => {
                let chapter = match map.get(CHAPTER_NAME_KEY) {
                    None | Some(Value::Null) => default_chapter,
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => {
                        return Err(LoadError::WrongType {
                            file: file.to_string(),
                            key: CHAPTER_NAME_KEY,
                            expected: "string",
                            found: yaml_type_name(other),
                        });
                    }
                };
                match map.get(DEFINITIONS_KEY) {
                    None | Some(Value::Null) => Err(LoadError::MissingKey {
                        file: file.to_string(),
                        key: DEFINITIONS_KEY,
                    }),
                    Some(Value::Sequence(entries)) => self.add_entries(file, &chapter, entries),
                    Some(other) => Err(LoadError::WrongType {
                        file: file.to_string(),
                        key: DEFINITIONS_KEY,
                        expected: "list",
                        found: yaml_type_name(other),
                    }),
                }
            }
            other => Err(LoadError::WrongType {
                file: file.to_string(),
                key: DEFINITIONS_KEY,
                expected: "list",
                found: yaml_type_name(other),
            }),
        }
    }

    /// Add a list of definition entries belonging to one chapter.
    pub fn add_entries(
        &mut self,
        file: &str,
        chapter_name: &str,
        entries: &[Value],
    ) -> Result<usize, LoadError> {
        let before = self.defs.len();

        for entry in entries {
            let Value::Mapping(map) = entry else {
                return Err(LoadError::EntryNotMapping {
                    file: file.to_string(),
                    entry: describe(entry),
                });
            };

            for name in entry_names(file, map)? {
                self.add_def(name, file, chapter_name, map)?;
            }
        }

        Ok(self.defs.len() - before)
    }

    fn add_def(
        &mut self,
        name: String,
        file: &str,
        chapter_name: &str,
        map: &Mapping,
    ) -> Result<(), LoadError> {
        if let Some(&existing) = self.by_name.get(&name) {
            return Err(LoadError::DuplicateRule {
                name,
                file: file.to_string(),
                original_file: self.defs[existing].source_file.clone(),
            });
        }

        let def = EntryReader {
            map,
            rule: &name,
            file,
        }
        .read(chapter_name, &self.reserved_prefix)?;

        tracing::debug!(
            "Defined rule {} with {} tag references",
            def.name,
            def.tag_refs.len()
        );
        self.by_name.insert(name, self.defs.len());
        self.defs.push(def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RuleDef> {
        self.by_name.get(name).map(|&i| &self.defs[i])
    }

    /// All definitions, in definition order.
    pub fn all(&self) -> &[RuleDef] {
        &self.defs
    }

    pub fn reserved_prefix(&self) -> &str {
        &self.reserved_prefix
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// Names defined by one entry: `name`, or every element of `names`.
fn entry_names(file: &str, map: &Mapping) -> Result<Vec<String>, LoadError> {
    let invalid = |found: &Value, expected: &'static str| LoadError::InvalidField {
        rule: "<unnamed>".to_string(),
        file: file.to_string(),
        field: "name",
        expected,
        found: yaml_type_name(found),
    };

    match (map.get("name"), map.get("names")) {
        (Some(Value::String(name)), _) => Ok(vec![name.clone()]),
        (Some(other), _) if !other.is_null() => Err(invalid(other, "string")),
        (_, Some(Value::Sequence(names))) => names
            .iter()
            .map(|n| match n {
                Value::String(s) => Ok(s.clone()),
                other => Err(invalid(other, "string")),
            })
            .collect(),
        (_, Some(other)) if !other.is_null() => Err(invalid(other, "list of strings")),
        _ => Err(LoadError::MissingName {
            file: file.to_string(),
            entry: describe(&Value::Mapping(map.clone())),
        }),
    }
}

/// Compact single-line rendering of a YAML value for error messages.
fn describe(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim().replace('\n', " "))
        .unwrap_or_else(|_| format!("{value:?}"))
}

/// Typed access to the fields of one definition entry.
struct EntryReader<'a> {
    map: &'a Mapping,
    rule: &'a str,
    file: &'a str,
}

impl EntryReader<'_> {
    fn read(&self, chapter_name: &str, reserved_prefix: &str) -> Result<RuleDef, LoadError> {
        let summary = self.opt_string("summary")?;
        let note = self.opt_string("note")?;
        let clarification_link = self.opt_string("clarification-link")?;
        let clarification_text = self.opt_string("clarification-text")?;
        let description = self.opt_string("description")?;

        let kind = self.opt_string("kind")?.map(|k| self.kind(&k, None)).transpose()?;
        let impl_def = self.opt_bool("impl-def-behavior")?.unwrap_or(false);

        let field_type = match self.opt_string("field-type")? {
            Some(ft) => Some(ft),
            None => self.opt_string("impl-def-category")?,
        };
        let field_type = field_type
            .map(|ft| {
                FieldType::parse(&ft).ok_or_else(|| LoadError::UnknownFieldType {
                    rule: self.rule.to_string(),
                    file: self.file.to_string(),
                    field_type: ft.clone(),
                    allowed: FieldType::ALL.map(|t| t.as_str()).join(","),
                })
            })
            .transpose()?;
        if field_type.is_some() && !impl_def {
            return Err(LoadError::FieldTypeWithoutImplDef {
                rule: self.rule.to_string(),
                file: self.file.to_string(),
            });
        }

        let mut instances = Vec::new();
        instances.extend(self.opt_string("instance")?);
        instances.extend(self.opt_string_list("instances")?.unwrap_or_default());
        if !instances.is_empty() && kind.is_none() {
            return Err(LoadError::InstancesWithoutKind {
                rule: self.rule.to_string(),
                file: self.file.to_string(),
            });
        }

        let mut tag_refs = Vec::new();
        if let Some(tag) = self.opt_string("tag")? {
            tag_refs.push(TagRef::new(tag));
        }
        match self.map.get("tags") {
            None | Some(Value::Null) => {}
            Some(Value::Sequence(items)) => {
                for item in items {
                    tag_refs.push(self.tag_ref(item, kind)?);
                }
            }
            Some(other) => return Err(self.invalid("tags", "list", other)),
        }

        let style = NameStyle::for_rule(impl_def);
        if !is_valid_rule_name(self.rule, style, reserved_prefix) {
            return Err(LoadError::InvalidRuleName {
                rule: self.rule.to_string(),
                file: self.file.to_string(),
                pattern: style.pattern(),
            });
        }

        Ok(RuleDef {
            name: self.rule.to_string(),
            source_file: self.file.to_string(),
            chapter_name: chapter_name.to_string(),
            kind,
            instances,
            summary,
            description,
            note,
            field_type,
            impl_def,
            clarification_text,
            clarification_link,
            tag_refs,
        })
    }

    fn tag_ref(&self, item: &Value, rule_kind: Option<RuleKind>) -> Result<TagRef, LoadError> {
        let map = match item {
            Value::String(name) => return Ok(TagRef::new(name.clone())),
            Value::Mapping(map) => map,
            other => {
                return Err(self.bad_tag_ref(format!(
                    "a {} instead of a string or mapping: {}",
                    yaml_type_name(other),
                    describe(other)
                )));
            }
        };

        let name = match map.get("name") {
            Some(Value::String(name)) => name.clone(),
            Some(other) if !other.is_null() => {
                return Err(self.bad_tag_ref(format!(
                    "name is a {} instead of a string",
                    yaml_type_name(other)
                )));
            }
            _ => return Err(self.bad_tag_ref(format!("missing name in {}", describe(item)))),
        };

        let nested = EntryReader {
            map,
            rule: self.rule,
            file: self.file,
        };
        let context = nested.opt_bool("context")?.unwrap_or(false);
        let kind = nested
            .opt_string("kind")?
            .map(|k| self.kind(&k, Some(&name)))
            .transpose()?;
        let instances = nested.opt_string_list("instances")?.unwrap_or_default();
        if !instances.is_empty() && kind.or(rule_kind).is_none() {
            return Err(self.bad_tag_ref(format!(
                "tag {name} defines instances but neither it nor the rule has a kind"
            )));
        }

        Ok(TagRef {
            name,
            context,
            kind,
            instances,
        })
    }

    fn kind(&self, kind: &str, tag: Option<&str>) -> Result<RuleKind, LoadError> {
        RuleKind::parse(kind).ok_or_else(|| LoadError::UnknownKind {
            rule: self.rule.to_string(),
            file: self.file.to_string(),
            kind: kind.to_string(),
            context: tag.map(|t| format!("tag {t} in ")).unwrap_or_default(),
            allowed: RuleKind::allowed(),
        })
    }

    fn opt_string(&self, field: &'static str) -> Result<Option<String>, LoadError> {
        match self.map.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.invalid(field, "string", other)),
        }
    }

    fn opt_bool(&self, field: &'static str) -> Result<Option<bool>, LoadError> {
        match self.map.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.invalid(field, "boolean", other)),
        }
    }

    fn opt_string_list(&self, field: &'static str) -> Result<Option<Vec<String>>, LoadError> {
        match self.map.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Sequence(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(self.invalid(field, "list of strings", other)),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(other) => Err(self.invalid(field, "list of strings", other)),
        }
    }

    fn invalid(&self, field: &'static str, expected: &'static str, found: &Value) -> LoadError {
        LoadError::InvalidField {
            rule: self.rule.to_string(),
            file: self.file.to_string(),
            field,
            expected,
            found: yaml_type_name(found),
        }
    }

    fn bad_tag_ref(&self, reason: String) -> LoadError {
        LoadError::BadTagRef {
            rule: self.rule.to_string(),
            file: self.file.to_string(),
            reason,
        }
    }
}
