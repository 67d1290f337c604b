//! String helpers for titles and quotes.
//!
//! - URL-derived titles for pages whose headline selector matches nothing
//! - Quote truncation with an ellipsis marker for the feed path

use url::Url;

/// Literal title used when both selector extraction and URL derivation fail.
pub const UNTITLED_ARTICLE: &str = "Untitled Article";

/// Derive a human-readable title from an article URL.
///
/// Takes the last non-empty path segment, strips a file extension, replaces
/// hyphens and underscores with spaces, and capitalizes each word.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     title_from_url("https://example.com/politics/some-long-title.html"),
///     Some("Some Long Title".to_string())
/// );
/// ```
pub fn title_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).next_back()?;

    // Strip the extension at the first dot, like "slug.html" -> "slug".
    let stem = segment.split_once('.').map_or(segment, |(s, _)| s);

    let title = stem
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");

    (!title.is_empty()).then_some(title)
}

/// Uppercase the first character and lowercase the rest.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
    }
}

/// Truncate a quote to `max_chars` characters, appending an ellipsis marker.
///
/// Strings at or under the cap come back unchanged.
pub fn truncate_quote(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}…", cut.trim_end())
    }
}
