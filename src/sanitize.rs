use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length of a sanitized description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("invalid tag regex"));
static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("invalid whitespace regex"));

/// Strips markup from feed text and bounds its length.
///
/// Tags are removed, whitespace runs collapse to one space, and the result is
/// trimmed and hard-cut at [`MAX_DESCRIPTION_CHARS`] characters. The cut can
/// land on a space, so the tail is trimmed again; this keeps the function
/// idempotent.
pub fn sanitize(raw: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, "");
    let collapsed = WHITESPACE_RE.replace_all(&stripped, " ");
    let truncated: String = collapsed
        .trim()
        .chars()
        .take(MAX_DESCRIPTION_CHARS)
        .collect();

    truncated.trim_end().to_string()
}
