//! Inline AsciiDoc to HTML conversion for tag and definition text.
//!
//! Tag text arrives from the AsciiDoc tags backend with HTML special
//! characters already escaped, so conversion only turns formatting marks into
//! elements and never escapes.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Rows of a tagged table shown before the `...` row.
pub const MAX_TABLE_ROWS: usize = 12;

static UNDERLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\.underline\]#([^#]+)#").unwrap());
static SUPERSCRIPT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\^(\S+?)\^").unwrap());
static SUBSCRIPT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~(\S+?)~").unwrap());
static EXTRA_AMP_NAMED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&amp;(\w+);").unwrap());
static EXTRA_AMP_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&amp;#(\d+);").unwrap());
static EXTRA_AMP_HEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&amp;#x([0-9a-fA-F]+);").unwrap());
static NAMED_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&(\w+);").unwrap());
static TAGS_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(.*?)===\n(.+)\n===").unwrap());
static XREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(<<|&#60;&#60;)(.+?)(>>|&#62;&#62;)").unwrap());

/// Unconstrained pairs can appear anywhere, even mid-word: `**man**ual`.
static UNCONSTRAINED: LazyLock<[(Regex, &'static str); 3]> = LazyLock::new(|| {
    [
        (Regex::new(r"\*\*(.+?)\*\*").unwrap(), "b"),
        (Regex::new(r"__(.+?)__").unwrap(), "i"),
        (Regex::new(r"``(.+?)``").unwrap(), "code"),
    ]
});

const CONSTRAINED: [(char, &str); 3] = [('*', "b"), ('_', "i"), ('`', "code")];

/// Characters allowed right after a constrained closing mark.
const CONSTRAINED_FOLLOWERS: &[char] = &[',', ';', '"', '.', '?', '!'];

fn entity_code(name: &str) -> Option<u32> {
    Some(match name {
        "ge" => 8805,
        "le" => 8804,
        "ne" => 8800,
        "equiv" => 8801,
        "lt" => 60,
        "gt" => 62,
        "amp" => 38,
        "quot" => 34,
        "apos" => 39,
        "nbsp" => 160,
        "times" => 215,
        "divide" => 247,
        "plusmn" => 177,
        "deg" => 176,
        "micro" => 181,
        "para" => 182,
        "middot" => 183,
        "raquo" => 187,
        "laquo" => 171,
        "frac12" => 189,
        "frac14" => 188,
        "frac34" => 190,
        _ => return None,
    })
}

fn wrap(element: &str, content: &str) -> String {
    format!("<{element}>{content}</{element}>")
}

/// Apply every inline formatting conversion.
pub fn convert(text: &str) -> String {
    let mut result = convert_unconstrained(text);
    result = convert_constrained(&result);
    result = SUPERSCRIPT.replace_all(&result, "<sup>$1</sup>").into_owned();
    result = SUBSCRIPT.replace_all(&result, "<sub>$1</sub>").into_owned();
    result = UNDERLINE
        .replace_all(&result, r#"<span class="underline">$1</span>"#)
        .into_owned();
    result = convert_extra_amp(&result);
    convert_entity_names(&result)
}

/// Formatting inside an already-captured span.
fn convert_nested(text: &str) -> String {
    convert_constrained(&convert_unconstrained(text))
}

fn convert_unconstrained(text: &str) -> String {
    let mut result = text.to_string();
    for (re, element) in UNCONSTRAINED.iter() {
        result = re
            .replace_all(&result, |caps: &Captures| {
                wrap(element, &convert_nested(&caps[1]))
            })
            .into_owned();
    }
    result
}

fn convert_constrained(text: &str) -> String {
    let mut result = text.to_string();
    for (delim, element) in CONSTRAINED {
        result = constrained_pairs(&result, delim, element);
    }
    result
}

/// Replace `*strong*`-style pairs that open at the start of the text or after
/// whitespace and close before whitespace, punctuation, or the end.
fn constrained_pairs(text: &str, delim: char, element: &str) -> String {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        let opens = c == delim && (i == 0 || chars[i - 1].1.is_whitespace());
        if opens {
            if let Some(close) = find_close(&chars, i, delim) {
                let start = pos + c.len_utf8();
                let end = chars[close].0;
                out.push_str(&wrap(element, &convert_nested(&text[start..end])));
                i = close + 1;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }

    out
}

fn find_close(chars: &[(usize, char)], open: usize, delim: char) -> Option<usize> {
    let first = open + 1;
    let (_, head) = *chars.get(first)?;
    if head.is_whitespace() {
        return None;
    }

    for j in first + 1..chars.len() {
        let c = chars[j].1;
        if c == '\n' {
            return None;
        }
        if c != delim {
            continue;
        }
        let len = j - first;
        if len >= 2 && (chars[first + 1].1.is_whitespace() || chars[j - 1].1.is_whitespace()) {
            continue;
        }
        let closes = match chars.get(j + 1) {
            None => true,
            Some(&(_, next)) => next.is_whitespace() || CONSTRAINED_FOLLOWERS.contains(&next),
        };
        if closes {
            return Some(j);
        }
    }

    None
}

/// The tags backend sometimes double-escapes entities: `&amp;ge;`.
fn convert_extra_amp(text: &str) -> String {
    let text = EXTRA_AMP_NAMED.replace_all(text, "&$1;");
    let text = EXTRA_AMP_DECIMAL.replace_all(&text, "&#$1;");
    EXTRA_AMP_HEX.replace_all(&text, "&#x$1;").into_owned()
}

/// Known entity names become numeric references; unknown ones are kept.
fn convert_entity_names(text: &str) -> String {
    NAMED_ENTITY
        .replace_all(text, |caps: &Captures| match entity_code(&caps[1]) {
            Some(code) => format!("&#{code};"),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Turn tags-backend tables into HTML tables.
///
/// The backend emits an optional heading line, `===`, the rows separated by
/// `¶` with cells separated by `|`, and a closing `===`.
pub fn convert_tables(text: &str) -> String {
    TAGS_TABLE
        .replace_all(text, |caps: &Captures| {
            let heading = caps[1].trim_end_matches('\n');
            let mut html = String::from("<table>");

            let heading_cells = table_cells(heading);
            if !heading_cells.is_empty() {
                html.push_str("<thead><tr>");
                for cell in &heading_cells {
                    html.push_str(&format!("<th>{cell}</th>"));
                }
                html.push_str("</tr></thead>");
            }

            html.push_str("<tbody>");
            for (index, row) in caps[2].split('¶').enumerate() {
                if index > MAX_TABLE_ROWS {
                    break;
                }
                html.push_str("<tr>");
                for cell in table_cells(row) {
                    if index < MAX_TABLE_ROWS {
                        html.push_str(&format!("<td>{cell}</td>"));
                    } else {
                        html.push_str("<td>...</td>");
                    }
                }
                html.push_str("</tr>");
            }
            html.push_str("</tbody></table>");
            html
        })
        .into_owned()
}

fn table_cells(row: &str) -> Vec<&str> {
    if row.is_empty() {
        return Vec::new();
    }
    row.split('|').map(str::trim).collect()
}

pub fn convert_newlines(text: &str) -> String {
    text.replace('\n', "<br>")
}

/// Link to a tag anchor, in `target` or in the current page.
pub fn tag_link(tag: &str, link_text: &str, target: Option<&str>) -> String {
    format!(
        "<a href=\"{}#{tag}\">{link_text}</a>",
        target.unwrap_or_default()
    )
}

/// `<<anchor>>` and `<<anchor,text>>` cross references to links.
///
/// Everything after the first comma is the link text.
pub fn convert_xrefs(text: &str, target: Option<&str>) -> String {
    XREF.replace_all(text, |caps: &Captures| {
        let content = &caps[2];
        match content.split_once(',') {
            Some((anchor, link_text)) => tag_link(anchor.trim(), link_text.trim(), target),
            None => tag_link(content.trim(), content.trim(), target),
        }
    })
    .into_owned()
}

/// Full conversion for rule definition text (summary, note, and so on).
pub fn def_text_to_html(text: &str) -> String {
    convert_xrefs(&convert_newlines(&convert_tables(&convert(text))), None)
}

/// Full conversion for tag text; cross references point into `target`.
pub fn tag_text_to_html(text: &str, target: Option<&str>) -> String {
    convert_xrefs(&convert_newlines(&convert_tables(&convert(text))), target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconstrained_pairs_work_mid_word() {
        assert_eq!(convert("Sara**h**"), "Sara<b>h</b>");
        assert_eq!(convert("__man__ual"), "<i>man</i>ual");
        assert_eq!(convert("``x0``"), "<code>x0</code>");
    }

    #[test]
    fn constrained_pairs_need_boundaries() {
        assert_eq!(convert("That is *strong* stuff!"), "That is <b>strong</b> stuff!");
        assert_eq!(convert("This is *strong*!"), "This is <b>strong</b>!");
        assert_eq!(convert("register _rs1_."), "register <i>rs1</i>.");
        assert_eq!(convert("`pc`-relative"), "`pc`-relative");
        assert_eq!(convert("snake_case_name"), "snake_case_name");
        assert_eq!(convert("2 * 3 * 4"), "2 * 3 * 4");
    }

    #[test]
    fn nested_formatting() {
        assert_eq!(convert("*bold _it_*"), "<b>bold <i>it</i></b>");
    }

    #[test]
    fn superscript_subscript_underline() {
        assert_eq!(convert("2^32^"), "2<sup>32</sup>");
        assert_eq!(convert("X~i~"), "X<sub>i</sub>");
        assert_eq!(
            convert("[.underline]#must#"),
            r#"<span class="underline">must</span>"#
        );
    }

    #[test]
    fn entities() {
        assert_eq!(convert("a &amp;ge; b"), "a &#8805; b");
        assert_eq!(convert("&amp;#8800;"), "&#8800;");
        assert_eq!(convert("&amp;#x2260;"), "&#x2260;");
        assert_eq!(convert("&lt;&lt;x&gt;&gt;"), "&#60;&#60;x&#62;&#62;");
        assert_eq!(convert("&unknown;"), "&unknown;");
    }

    #[test]
    fn xrefs_become_links() {
        assert_eq!(
            convert_xrefs("see <<sec-x>>", Some("priv.html")),
            r#"see <a href="priv.html#sec-x">sec-x</a>"#
        );
        assert_eq!(
            convert_xrefs("see &#60;&#60;sec-x, Section X&#62;&#62;", None),
            r##"see <a href="#sec-x">Section X</a>"##
        );
    }

    #[test]
    fn tables() {
        let text = "Value | Meaning\n===\n0 | Direct¶1 | Vectored\n===";
        assert_eq!(
            convert_tables(text),
            "<table><thead><tr><th>Value</th><th>Meaning</th></tr></thead>\
             <tbody><tr><td>0</td><td>Direct</td></tr>\
             <tr><td>1</td><td>Vectored</td></tr></tbody></table>"
        );
    }

    #[test]
    fn long_tables_are_truncated() {
        let rows: Vec<String> = (0..20).map(|i| format!("{i} | x")).collect();
        let text = format!("===\n{}\n===", rows.join("¶"));
        let html = convert_tables(&text);

        assert!(!html.contains("<thead>"));
        assert_eq!(html.matches("<tr>").count(), MAX_TABLE_ROWS + 1);
        assert!(html.contains("<td>11</td>"));
        assert!(!html.contains("<td>12</td>"));
        assert!(html.contains("<td>...</td><td>...</td>"));
    }

    #[test]
    fn full_tag_conversion() {
        assert_eq!(
            tag_text_to_html("Register `x0` is *zero*.\nSee <<regs>>", Some("u.html")),
            r#"Register <code>x0</code> is <b>zero</b>.<br>See <a href="u.html#regs">regs</a>"#
        );
    }
}
