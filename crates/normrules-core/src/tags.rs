//! Tag store: the flat, uniquely-keyed collection of tagged text spans.
//!
//! Tag files are produced by the AsciiDoc tags backend and look like:
//!
//! ```json
//! {
//!   "tags": {
//!     "norm:addi_op": "ADDI adds the sign-extended 12-bit immediate to register rs1.",
//!     "norm:subi_op": "..."
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use crate::error::{LoadError, json_type_name};

/// A named, located span of normative text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Anchor name, e.g. `norm:addi_op`
    pub name: String,
    /// Tag file this tag was loaded from
    pub source_file: String,
    /// Raw tagged text, may contain newlines and inline markup
    pub text: String,
}

/// All tags of one standard, across any number of tag files.
///
/// Names are unique across the whole store; loading a name twice is an error,
/// never an overwrite.
#[derive(Debug, Default)]
pub struct TagStore {
    tags: Vec<Tag>,
    by_name: HashMap<String, usize>,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and add every tag from a tag file.
    ///
    /// The file's path, as given, becomes each tag's `source_file`.
    pub fn load_from(&mut self, path: impl AsRef<Path>) -> Result<usize, LoadError> {
        let path = path.as_ref();
        let file = path.display().to_string();
        tracing::info!("Loading tag file {file}");

        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&file, &content)
    }

    /// Parse tag file contents and add them under the `file` identifier.
    pub fn load_str(&mut self, file: &str, content: &str) -> Result<usize, LoadError> {
        let doc: serde_json::Value =
            serde_json::from_str(content).map_err(|source| LoadError::Json {
                file: file.to_string(),
                source,
            })?;
        self.add_tags(file, &doc)
    }

    /// Add the `tags` mapping of an already-parsed tag file document.
    ///
    /// Returns the number of tags added.
    pub fn add_tags(&mut self, file: &str, doc: &serde_json::Value) -> Result<usize, LoadError> {
        let Some(tags) = doc.get("tags") else {
            return Err(LoadError::MissingKey {
                file: file.to_string(),
                key: "tags",
            });
        };
        let serde_json::Value::Object(tags) = tags else {
            return Err(LoadError::WrongType {
                file: file.to_string(),
                key: "tags",
                expected: "mapping",
                found: json_type_name(tags),
            });
        };

        for (name, text) in tags {
            let serde_json::Value::String(text) = text else {
                return Err(LoadError::MalformedTag {
                    name: name.clone(),
                    file: file.to_string(),
                    found: json_type_name(text),
                });
            };
            self.insert(Tag {
                name: name.clone(),
                source_file: file.to_string(),
                text: text.clone(),
            })?;
        }

        Ok(tags.len())
    }

    /// Add a single tag.
    pub fn insert(&mut self, tag: Tag) -> Result<(), LoadError> {
        if let Some(&existing) = self.by_name.get(&tag.name) {
            return Err(LoadError::DuplicateTag {
                name: tag.name,
                file: tag.source_file,
                original_file: self.tags[existing].source_file.clone(),
            });
        }
        self.by_name.insert(tag.name.clone(), self.tags.len());
        self.tags.push(tag);
        Ok(())
    }

    /// Look up a tag by name.
    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.by_name.get(name).map(|&i| &self.tags[i])
    }

    /// A tag and its position in insertion order.
    pub(crate) fn lookup(&self, name: &str) -> Option<(usize, &Tag)> {
        self.by_name.get(name).map(|&i| (i, &self.tags[i]))
    }

    /// All tags, in insertion order.
    pub fn all(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    /// Distinct tag files, in the order they were first seen.
    pub fn source_files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = Vec::new();
        for tag in &self.tags {
            if !files.contains(&tag.source_file.as_str()) {
                files.push(&tag.source_file);
            }
        }
        files
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_tags_in_file_order() {
        let mut store = TagStore::new();
        let added = store
            .load_str(
                "a.json",
                r#"{"tags": {"norm:z": "last letter", "norm:a": "first letter"}}"#,
            )
            .unwrap();

        assert_eq!(added, 2);
        let names: Vec<_> = store.all().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["norm:z", "norm:a"]);
        assert_eq!(store.get("norm:a").unwrap().source_file, "a.json");
        assert_eq!(store.get("norm:a").unwrap().text, "first letter");
    }

    #[test]
    fn missing_tag_is_none() {
        let store = TagStore::new();
        assert!(store.get("norm:nope").is_none());
        assert!(store.lookup("norm:nope").is_none());
    }

    #[test]
    fn lookup_returns_insertion_position() {
        let mut store = TagStore::new();
        store.load_str("a.json", r#"{"tags": {"norm:z": "z"}}"#).unwrap();
        store.load_str("b.json", r#"{"tags": {"norm:a": "a"}}"#).unwrap();

        let (index, tag) = store.lookup("norm:a").unwrap();
        assert_eq!(index, 1);
        assert_eq!(tag.source_file, "b.json");
        assert_eq!(store.all().nth(index).map(|t| t.name.as_str()), Some("norm:a"));
    }

    #[test]
    fn duplicate_across_files_names_both_files() {
        let mut store = TagStore::new();
        store
            .load_str("first.json", r#"{"tags": {"norm:a": "one"}}"#)
            .unwrap();
        let err = store
            .load_str("second.json", r#"{"tags": {"norm:a": "two"}}"#)
            .unwrap_err();

        assert!(matches!(err, LoadError::DuplicateTag { .. }));
        let msg = err.to_string();
        assert!(msg.contains("norm:a"), "{msg}");
        assert!(msg.contains("second.json"), "{msg}");
        assert!(msg.contains("first.json"), "{msg}");
        assert_eq!(store.get("norm:a").unwrap().text, "one");
    }

    #[test]
    fn non_string_value_explains_description_list_anchor() {
        let mut store = TagStore::new();
        let err = store
            .load_str("a.json", r#"{"tags": {"norm:dl": {"term": "text"}}}"#)
            .unwrap_err();

        assert!(matches!(err, LoadError::MalformedTag { .. }));
        let msg = err.to_string();
        assert!(msg.contains("Description List"), "{msg}");
        assert!(msg.contains("mapping"), "{msg}");
    }

    #[test]
    fn missing_tags_key() {
        let mut store = TagStore::new();
        let err = store.load_str("a.json", r#"{"sections": {}}"#).unwrap_err();
        assert!(matches!(err, LoadError::MissingKey { key: "tags", .. }));
    }

    #[test]
    fn invalid_json() {
        let mut store = TagStore::new();
        let err = store.load_str("a.json", "{not json").unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[test]
    fn source_files_are_deduplicated_in_order() {
        let mut store = TagStore::new();
        store
            .load_str("b.json", r#"{"tags": {"norm:1": "x", "norm:2": "y"}}"#)
            .unwrap();
        store
            .load_str("a.json", r#"{"tags": {"norm:3": "z"}}"#)
            .unwrap();
        assert_eq!(store.source_files(), ["b.json", "a.json"]);
    }
}
