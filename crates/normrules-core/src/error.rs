//! Error types for loading tag files and rule definition files.
//!
//! Load errors are fatal: the input is structurally broken or violates a
//! uniqueness invariant, so no further analysis is meaningful. Problems that
//! are reported in aggregate (dangling references, orphan tags) are
//! [`Diagnostic`](crate::Diagnostic)s instead.

use std::path::PathBuf;

/// Something went wrong while loading a tag file or a rule definition file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file {file} JSON parsing error: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("file {file} YAML syntax error: {source}")]
    Yaml {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing '{key}' key in {file}")]
    MissingKey { file: String, key: &'static str },

    #[error("'{key}' in {file} is a {found} but needs to be a {expected}")]
    WrongType {
        file: String,
        key: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error(
        "tag name {name} in file {file} is a {found} instead of a string\n  \
         If the AsciiDoc anchor for {name} is before an AsciiDoc 'Description List' term, \
         move it to after the term on its own line."
    )]
    MalformedTag {
        name: String,
        file: String,
        found: &'static str,
    },

    #[error("tag name {name} in file {file} already defined in file {original_file}")]
    DuplicateTag {
        name: String,
        file: String,
        original_file: String,
    },

    #[error(
        "normative rule definition {name} in file {file} already defined in file {original_file}"
    )]
    DuplicateRule {
        name: String,
        file: String,
        original_file: String,
    },

    #[error("file {file} has a normative rule definition entry without name/names: {entry}")]
    MissingName { file: String, entry: String },

    #[error("file {file} has a normative rule definition entry that isn't a mapping: {entry}")]
    EntryNotMapping { file: String, entry: String },

    #[error(
        "provided {found} for {field} in normative rule {rule} (file {file}) but need a {expected}"
    )]
    InvalidField {
        rule: String,
        file: String,
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error(
        "don't recognize kind '{kind}' for {context}normative rule {rule} (file {file})\n  \
         Allowed kinds are: {allowed}"
    )]
    UnknownKind {
        rule: String,
        file: String,
        kind: String,
        /// Either empty or `tag <name> in `
        context: String,
        allowed: String,
    },

    #[error(
        "don't recognize field-type '{field_type}' for normative rule {rule} (file {file})\n  \
         Allowed field types are: {allowed}"
    )]
    UnknownFieldType {
        rule: String,
        file: String,
        field_type: String,
        allowed: String,
    },

    #[error(
        "normative rule {rule} (file {file}) has impl-def-category property \
         but impl-def-behavior isn't true"
    )]
    FieldTypeWithoutImplDef { rule: String, file: String },

    #[error("normative rule {rule} (file {file}) defines instances but no kind")]
    InstancesWithoutKind { rule: String, file: String },

    #[error("normative rule '{rule}' (file {file}) doesn't match regex pattern '{pattern}'")]
    InvalidRuleName {
        rule: String,
        file: String,
        pattern: &'static str,
    },

    #[error("normative rule {rule} (file {file}) has a bad tag reference: {reason}")]
    BadTagRef {
        rule: String,
        file: String,
        reason: String,
    },
}

/// Name of a JSON value's type, for error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "mapping",
    }
}

/// Name of a YAML value's type, for error messages.
pub(crate) fn yaml_type_name(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "boolean",
        serde_yaml::Value::Number(_) => "number",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "list",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged value",
    }
}
