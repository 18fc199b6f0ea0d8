//! Markup-to-text cleanup shared by every extraction strategy.

use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Entities decoded by [`clean_html_text`]. `&amp;` goes last so that an
/// escaped entity such as `&amp;lt;` decodes to `&lt;` and not `<`.
const ENTITIES: [(&str, &str); 6] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", " "),
    ("&amp;", "&"),
];

/// Strip tags, decode a fixed set of entities, collapse whitespace, trim.
///
/// Returns `None` when nothing readable is left.
#[must_use]
pub fn clean_html_text(raw: &str) -> Option<String> {
    let stripped = TAG_RE.replace_all(raw, "");
    let mut decoded = stripped.into_owned();
    for (entity, replacement) in ENTITIES {
        if decoded.contains(entity) {
            decoded = decoded.replace(entity, replacement);
        }
    }
    let collapsed = WHITESPACE_RE.replace_all(&decoded, " ");
    let trimmed = collapsed.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
