//! Lyrics extraction from archived page markup.

use regex::Regex;
use std::sync::LazyLock;

// Patterns are literals; compilation cannot fail at runtime
#[allow(clippy::expect_used)]
static CONTAINER_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<div\b[^>]*\bdata-lyrics-container\s*=\s*["']true["'][^>]*>"#)
        .expect("valid container pattern")
});

#[allow(clippy::expect_used)]
static DIV_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)div\b[^>]*>").expect("valid div pattern"));

#[allow(clippy::expect_used)]
static SOURCE_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\n\s*").expect("valid source newline pattern"));

#[allow(clippy::expect_used)]
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break pattern"));

#[allow(clippy::expect_used)]
static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

/// Extract lyric text from every lyrics container on the page
///
/// Containers are concatenated in document order, one per line. `<br>` becomes a newline,
/// other tags are dropped and entities decoded. Markup indentation is removed from every
/// line and blank containers are skipped. Returns `None` when the page has no lyrics
/// container at all.
pub fn parse_lyrics(html: &str) -> Option<String> {
    let fragments = container_fragments(html);
    if fragments.is_empty() {
        return None;
    }

    let text = fragments
        .iter()
        .map(|fragment| fragment_to_text(fragment))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Some(text)
}

/// Inner HTML of each container, balanced against nested `<div>` elements
fn container_fragments(html: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut cursor = 0;

    while let Some(open) = CONTAINER_OPEN.find_at(html, cursor) {
        let inner_start = open.end();
        let mut depth = 1usize;
        let mut inner_end = html.len();
        let mut resume = html.len();

        for tag in DIV_TAG.captures_iter(&html[inner_start..]) {
            let (Some(whole), Some(slash)) = (tag.get(0), tag.get(1)) else {
                continue;
            };
            if !slash.as_str().is_empty() {
                depth -= 1;
                if depth == 0 {
                    inner_end = inner_start + whole.start();
                    resume = inner_start + whole.end();
                    break;
                }
            } else if !whole.as_str().ends_with("/>") {
                depth += 1;
            }
        }

        fragments.push(&html[inner_start..inner_end]);
        cursor = resume;
    }

    fragments
}

fn fragment_to_text(fragment: &str) -> String {
    // Newlines in the markup are layout; only `<br>` breaks a lyric line
    let flattened = SOURCE_NEWLINE.replace_all(fragment, " ");
    let with_newlines = LINE_BREAK.replace_all(&flattened, "\n");
    let stripped = ANY_TAG.replace_all(&with_newlines, "");
    let decoded = html_escape::decode_html_entities(&stripped);

    // Interior blank lines are stanza breaks
    decoded
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}
