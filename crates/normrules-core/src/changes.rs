//! Tag change detection between two revisions of a tag file.
//!
//! Text is compared after collapsing whitespace and stripping AsciiDoc inline
//! formatting, so re-wrapping a paragraph or bolding a word is not a change.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::LoadError;
use crate::tags::TagStore;

/// Display width for tag text in change listings.
pub const TRUNCATE_AT: usize = 100;

/// Text of one tag before and after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    pub reference: String,
    pub current: String,
}

/// Differences between a reference and a current tag set, keyed by tag name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagChanges {
    /// In current, not in reference
    pub added: BTreeMap<String, String>,
    /// In reference, not in current
    pub deleted: BTreeMap<String, String>,
    pub modified: BTreeMap<String, Modification>,
}

impl TagChanges {
    pub fn any(&self) -> bool {
        !(self.added.is_empty() && self.deleted.is_empty() && self.modified.is_empty())
    }

    pub fn total(&self) -> usize {
        self.added.len() + self.deleted.len() + self.modified.len()
    }

    /// Deletions and modifications break existing rule references; additions
    /// don't.
    pub fn is_breaking(&self) -> bool {
        !(self.deleted.is_empty() && self.modified.is_empty())
    }
}

/// Compare two tag sets.
pub fn detect_changes(reference: &TagStore, current: &TagStore) -> TagChanges {
    let mut changes = TagChanges::default();

    for tag in current.all() {
        if reference.get(&tag.name).is_none() {
            changes.added.insert(tag.name.clone(), tag.text.clone());
        }
    }

    for tag in reference.all() {
        match current.get(&tag.name) {
            None => {
                changes.deleted.insert(tag.name.clone(), tag.text.clone());
            }
            Some(cur) if normalize(&tag.text) != normalize(&cur.text) => {
                changes.modified.insert(
                    tag.name.clone(),
                    Modification {
                        reference: tag.text.clone(),
                        current: cur.text.clone(),
                    },
                );
            }
            Some(_) => {}
        }
    }

    changes
}

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// (pattern, replacement) pairs applied in order by [`strip_formatting`].
static FORMATTING: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\*\*([^*]+?)\*\*", "$1"),
        (r"\*([^*]+?)\*", "$1"),
        (r"__([^_]+?)__", "$1"),
        (r"`([^`]+?)`", "$1"),
        (r"\^([^^]+?)\^", "$1"),
        (r"~([^~]+?)~", "$1"),
        (r"\[[^\]]+\]#([^#]+?)#", "$1"),
        (r"&lt;&lt;[^,&]+,([^&]+)&gt;&gt;", "$1"),
        (r"&lt;&lt;[^&]+&gt;&gt;", ""),
        (r"\+\+\+([^+]+?)\+\+\+", "$1"),
    ]
    .into_iter()
    .map(|(pattern, rep)| (Regex::new(pattern).unwrap(), rep))
    .collect()
});

static CONSTRAINED_ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_([^_]+?)_").unwrap());

/// Text as compared by [`detect_changes`].
pub fn normalize(text: &str) -> String {
    strip_formatting(&WHITESPACE.replace_all(text.trim(), " "))
}

/// Remove AsciiDoc inline formatting marks, keeping the marked-up text.
pub fn strip_formatting(text: &str) -> String {
    let mut result = text.to_string();
    for (i, (re, rep)) in FORMATTING.iter().enumerate() {
        result = re.replace_all(&result, *rep).into_owned();
        // Constrained italics go right after the unconstrained form
        if i == 2 {
            result = strip_constrained_italic(&result);
        }
    }
    result.trim().to_string()
}

/// `_text_` only counts as italics when not inside a word.
///
/// Every `_` is tried as an opener; one preceded by a word character is
/// skipped without consuming the `_` that follows it.
fn strip_constrained_italic(text: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut pos = 0;

    while let Some(m) = CONSTRAINED_ITALIC.find_at(text, pos) {
        let opens = !text[..m.start()].chars().next_back().is_some_and(is_word);
        let closes = !text[m.end()..].chars().next().is_some_and(is_word);
        if opens && closes {
            out.push_str(&text[copied..m.start()]);
            out.push_str(&text[m.start() + 1..m.end() - 1]);
            copied = m.end();
            pos = m.end();
        } else {
            pos = m.start() + 1;
        }
    }

    out.push_str(&text[copied..]);
    out
}

/// Shorten text to [`TRUNCATE_AT`] characters for display.
pub fn truncate(text: &str) -> String {
    match text.char_indices().nth(TRUNCATE_AT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Append the added tags to the reference tag file, keeping its existing
/// order and rewriting it as pretty-printed JSON.
///
/// Returns the tag counts before and after.
pub fn merge_additions(
    reference_path: impl AsRef<Path>,
    changes: &TagChanges,
) -> Result<(usize, usize), LoadError> {
    let path = reference_path.as_ref();
    let file = path.display().to_string();
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let content = std::fs::read_to_string(path).map_err(io_err)?;
    let mut doc: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| LoadError::Json {
            file: file.clone(),
            source,
        })?;

    let tags = match doc.get_mut("tags") {
        Some(serde_json::Value::Object(tags)) => tags,
        Some(other) => {
            return Err(LoadError::WrongType {
                file,
                key: "tags",
                expected: "mapping",
                found: crate::error::json_type_name(other),
            });
        }
        None => return Err(LoadError::MissingKey { file, key: "tags" }),
    };

    let before = tags.len();
    for (name, text) in &changes.added {
        tracing::debug!("Adding tag {name}");
        tags.insert(name.clone(), serde_json::Value::String(text.clone()));
    }
    let after = tags.len();

    let mut out = serde_json::to_string_pretty(&doc).map_err(|source| LoadError::Json {
        file: file.clone(),
        source,
    })?;
    out.push('\n');
    std::fs::write(path, out).map_err(io_err)?;

    Ok((before, after))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(json: &str) -> TagStore {
        let mut store = TagStore::new();
        store.load_str("tags.json", json).unwrap();
        store
    }

    #[test]
    fn classifies_added_deleted_modified() {
        let reference = store(r#"{"tags": {"norm:a": "same", "norm:b": "old", "norm:c": "gone"}}"#);
        let current = store(r#"{"tags": {"norm:a": "same", "norm:b": "new", "norm:d": "fresh"}}"#);

        let changes = detect_changes(&reference, &current);
        assert_eq!(changes.added.keys().collect::<Vec<_>>(), ["norm:d"]);
        assert_eq!(changes.deleted.keys().collect::<Vec<_>>(), ["norm:c"]);
        assert_eq!(changes.modified["norm:b"].current, "new");
        assert_eq!(changes.total(), 3);
        assert!(changes.is_breaking());
    }

    #[test]
    fn additions_alone_are_not_breaking() {
        let reference = store(r#"{"tags": {"norm:a": "x"}}"#);
        let current = store(r#"{"tags": {"norm:a": "x", "norm:b": "y"}}"#);
        let changes = detect_changes(&reference, &current);
        assert!(changes.any());
        assert!(!changes.is_breaking());
    }

    #[test]
    fn whitespace_and_formatting_are_ignored() {
        let reference = store(r#"{"tags": {"norm:a": "The *rd* register\n  is   written."}}"#);
        let current = store(r#"{"tags": {"norm:a": "The **rd** register is written. "}}"#);
        assert!(!detect_changes(&reference, &current).any());
    }

    #[test]
    fn strips_inline_markup() {
        assert_eq!(strip_formatting("`x0` is ^hard^~wired~"), "x0 is hardwired");
        assert_eq!(strip_formatting("[.underline]#must#"), "must");
        assert_eq!(strip_formatting("see &lt;&lt;sec,Section 2&gt;&gt;"), "see Section 2");
        assert_eq!(strip_formatting("see &lt;&lt;sec&gt;&gt;"), "see");
        assert_eq!(strip_formatting("+++raw+++"), "raw");
    }

    #[test]
    fn constrained_italic_respects_word_boundaries() {
        assert_eq!(strip_formatting("an _italic_ word"), "an italic word");
        assert_eq!(strip_formatting("snake_case_name"), "snake_case_name");
    }

    #[test]
    fn italic_after_in_word_underscore_is_stripped() {
        assert_eq!(normalize("x_y _z_"), "x_y z");
        assert_eq!(normalize("a_b _c_ and _d_"), "a_b c and d");

        let reference = store(r#"{"tags": {"norm:a": "x_y _z_"}}"#);
        let current = store(r#"{"tags": {"norm:a": "x_y z"}}"#);
        let changes = detect_changes(&reference, &current);
        assert!(changes.modified.is_empty(), "{changes:?}");
        assert!(!changes.is_breaking());
    }

    #[test]
    fn truncate_counts_characters() {
        let short = "a".repeat(TRUNCATE_AT);
        assert_eq!(truncate(&short), short);

        let long = "é".repeat(TRUNCATE_AT + 5);
        let cut = truncate(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), TRUNCATE_AT + 3);
    }

    #[test]
    fn merge_appends_additions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.json");
        std::fs::write(&path, r#"{"tags": {"norm:z": "z", "norm:a": "a"}}"#).unwrap();

        let reference = store(r#"{"tags": {"norm:z": "z", "norm:a": "a"}}"#);
        let current = store(r#"{"tags": {"norm:z": "z", "norm:a": "a", "norm:m": "m"}}"#);
        let changes = detect_changes(&reference, &current);

        assert_eq!(merge_additions(&path, &changes).unwrap(), (2, 3));

        let mut merged = TagStore::new();
        merged.load_from(&path).unwrap();
        let names: Vec<_> = merged.all().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["norm:z", "norm:a", "norm:m"]);
    }
}
