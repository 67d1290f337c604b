//! Content normalization and boilerplate filtering.
//!
//! Raw extracted text arrives with markup, script bodies, and erratic
//! whitespace. [`normalize`] reduces it to clean single-spaced text. The
//! [`is_non_article`] filter drops newsletter/subscription boilerplate that
//! feeds routinely interleave with real entries.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Node};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Elements whose text content is never article body.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript"];

/// Title keywords marking newsletter/subscription boilerplate entries.
const NEWSLETTER_KEYWORDS: &[&str] = &[
    "sign up for",
    "sign up",
    "signup",
    "newsletter",
    "subscribe",
    "email",
    "mailing list",
];

/// URL path fragments that never lead to articles.
const NON_ARTICLE_PATHS: &[&str] = &[
    "/info/",
    "/about/",
    "/help/",
    "/support/",
    "/contact/",
    "/subscribe/",
    "/newsletter/",
    "/email/",
    "/signup/",
];

/// Strip markup and collapse whitespace in one pass.
pub fn normalize(input: &str) -> String {
    collapse_whitespace(&strip_markup(input))
}

/// Reduce an HTML fragment (or plain text) to its visible text.
///
/// Script, style, and noscript subtrees are dropped entirely; entities are
/// decoded by the parser.
pub fn strip_markup(input: &str) -> String {
    let fragment = Html::parse_fragment(input);
    let mut out = String::new();

    for node in fragment.tree.nodes() {
        if let Node::Text(text) = node.value() {
            let skipped = node.ancestors().any(|ancestor| match ancestor.value() {
                Node::Element(el) => SKIPPED_ELEMENTS.contains(&el.name()),
                _ => false,
            });
            if !skipped {
                out.push_str(text);
                out.push(' ');
            }
        }
    }

    out
}

/// Collapse all runs of whitespace (including blank lines) to single spaces.
pub fn collapse_whitespace(input: &str) -> String {
    WHITESPACE.replace_all(input, " ").trim().to_string()
}

/// Newsletter/subscription heuristics for feed entries.
///
/// An entry is dropped before persistence when its title carries a
/// subscription keyword or its link points at a non-article path. HTML
/// listing articles are not run through this filter.
pub fn is_non_article(title: &str, url: &str) -> bool {
    let title = title.to_lowercase();
    if NEWSLETTER_KEYWORDS.iter().any(|k| title.contains(k)) {
        return true;
    }

    let url = url.to_lowercase();
    NON_ARTICLE_PATHS.iter().any(|p| url.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markup_drops_scripts_and_styles() {
        let html = r#"<p>Hello <b>world</b></p><script>var x = 1;</script><style>p { color: red; }</style>"#;
        let text = normalize(html);
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn test_strip_markup_plain_text_passthrough() {
        assert_eq!(normalize("already plain text"), "already plain text");
    }

    #[test]
    fn test_strip_markup_decodes_entities() {
        assert_eq!(normalize("<p>Q&amp;A session</p>"), "Q&A session");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(
            collapse_whitespace("  one\n\n\ntwo\t\tthree   four  "),
            "one two three four"
        );
    }

    #[test]
    fn test_normalize_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("<div><script>alert(1)</script></div>"), "");
    }

    #[test]
    fn test_non_article_newsletter_title() {
        assert!(is_non_article(
            "Sign up for our Politics newsletter",
            "https://example.com/latest"
        ));
        assert!(is_non_article(
            "Subscribe to the morning briefing",
            "https://example.com/briefing"
        ));
    }

    #[test]
    fn test_non_article_url_path() {
        assert!(is_non_article(
            "Contact the newsroom",
            "https://example.com/contact/newsroom"
        ));
        assert!(is_non_article(
            "Our team",
            "https://example.com/about/team"
        ));
    }

    #[test]
    fn test_regular_article_passes() {
        assert!(!is_non_article(
            "Parliament passes budget after marathon session",
            "https://example.com/politics/budget-vote"
        ));
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        assert!(is_non_article(
            "SIGN UP FOR DAILY UPDATES",
            "https://example.com/x"
        ));
        assert!(is_non_article("News", "https://example.com/SIGNUP/now"));
    }
}
