//! URL shielding: hide URLs from the translation backend behind indexed
//! placeholders and put them back afterwards.
//!
//! Placeholders look like `@@URL0@@`. Restoration matches the placeholder
//! pattern, so the backend is free to move placeholders around (or insert
//! whitespace inside them) while reordering words.

use crate::html;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Characters that end a sentence rather than a URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\''];

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"]+"#).expect("valid URL regex")
    })
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)@@\s*URL\s*(\d+)\s*@@").expect("valid placeholder regex"))
}

/// Placeholder text for the URL at `index`.
pub fn placeholder(index: usize) -> String {
    format!("@@URL{index}@@")
}

/// Trim sentence punctuation and unbalanced closing parentheses off a match.
fn trim_url(candidate: &str) -> &str {
    let mut url = candidate;
    loop {
        let Some(last) = url.chars().last() else {
            return url;
        };
        let unbalanced_paren = last == ')' && url.matches('(').count() < url.matches(')').count();
        if TRAILING_PUNCTUATION.contains(&last) || unbalanced_paren {
            url = &url[..url.len() - last.len_utf8()];
        } else {
            return url;
        }
    }
}

/// Whether a trimmed match still has something after its scheme or `www.`.
fn has_host(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .or_else(|| lower.strip_prefix("www."))
        .unwrap_or(&lower);
    !rest.is_empty()
}

/// Find URLs in `text`, left to right, duplicates included.
pub fn find_urls(text: &str) -> Vec<String> {
    find_spans(text)
        .into_iter()
        .map(|(start, end)| text[start..end].to_string())
        .collect()
}

fn find_spans(text: &str) -> Vec<(usize, usize)> {
    url_regex()
        .find_iter(text)
        .filter_map(|m| {
            let url = trim_url(m.as_str());
            has_host(url).then(|| (m.start(), m.start() + url.len()))
        })
        .collect()
}

/// URL spans plus any placeholder-shaped text that is not inside a URL.
fn protected_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = find_spans(text);
    let urls = spans.len();
    for m in placeholder_regex().find_iter(text) {
        let inside_url = spans[..urls]
            .iter()
            .any(|&(start, end)| m.start() < end && start < m.end());
        if !inside_url {
            spans.push((m.start(), m.end()));
        }
    }
    spans.sort_unstable();
    spans
}

/// Replace every URL occurrence in `text` with its indexed placeholder.
///
/// Returns the shielded text and the protected substrings in placeholder
/// order. Identical URLs get distinct placeholders so each occurrence is
/// restored independently. Text that already looks like a placeholder is
/// shielded too, so it comes back as written.
pub fn shield(text: &str) -> (String, Vec<String>) {
    let spans = protected_spans(text);
    if spans.is_empty() {
        return (text.to_string(), Vec::new());
    }

    let mut shielded = String::with_capacity(text.len());
    let mut urls = Vec::with_capacity(spans.len());
    let mut cursor = 0;
    for (i, (start, end)) in spans.into_iter().enumerate() {
        shielded.push_str(&text[cursor..start]);
        shielded.push_str(&placeholder(i));
        urls.push(text[start..end].to_string());
        cursor = end;
    }
    shielded.push_str(&text[cursor..]);
    (shielded, urls)
}

/// Put URLs back in place of their placeholders.
///
/// Placeholders with an index outside `urls` are left as they are.
pub fn unshield(text: &str, urls: &[String]) -> String {
    if urls.is_empty() {
        return text.to_string();
    }
    placeholder_regex()
        .replace_all(text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| urls.get(i))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Like [`unshield`], but HTML-escape everything except the restored
/// substrings, which are inserted verbatim.
///
/// Output is built segment by segment, so a URL that is a prefix of another
/// cannot disturb the longer one.
pub fn unshield_html(text: &str, urls: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for caps in placeholder_regex().captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(url) = caps[1].parse::<usize>().ok().and_then(|i| urls.get(i)) else {
            continue;
        };
        out.push_str(&html::escape(&text[cursor..whole.start()]));
        out.push_str(url);
        cursor = whole.end();
    }
    out.push_str(&html::escape(&text[cursor..]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_urls_passthrough() {
        let (shielded, urls) = shield("just some words, nothing else");
        assert_eq!(shielded, "just some words, nothing else");
        assert!(urls.is_empty());
        assert_eq!(unshield(&shielded, &urls), "just some words, nothing else");
    }

    #[test]
    fn test_shield_replaces_in_order() {
        let (shielded, urls) = shield("see https://a.example/x and www.b.example then http://c.example");
        assert_eq!(
            shielded,
            "see @@URL0@@ and @@URL1@@ then @@URL2@@"
        );
        assert_eq!(
            urls,
            vec!["https://a.example/x", "www.b.example", "http://c.example"]
        );
    }

    #[test]
    fn test_duplicate_urls_get_distinct_placeholders() {
        let text = "https://x.io twice https://x.io";
        let (shielded, urls) = shield(text);
        assert_eq!(shielded, "@@URL0@@ twice @@URL1@@");
        assert_eq!(urls.len(), 2);
        assert_eq!(unshield(&shielded, &urls), text);
    }

    #[test]
    fn test_round_trip_identity() {
        let samples = [
            "",
            "no links",
            "Check this out https://example.com cool site",
            "(see https://en.wikipedia.org/wiki/Rust_(programming_language)) ok",
            "end of sentence https://example.com/path?q=1&r=2.",
            "WWW.SHOUT.EXAMPLE and HTTPS://UPPER.EXAMPLE/A",
            "multi\nline https://a.b/c\n\twww.d.e/f",
            "literal @@URL0@@ then https://a.example",
            "@@ url 1 @@ and @@URL7@@ only",
            "https://a.example/@@URL0@@ inside a link",
        ];
        for text in samples {
            let (shielded, urls) = shield(text);
            assert_eq!(unshield(&shielded, &urls), text, "round trip failed for {text:?}");
        }
    }

    #[test]
    fn test_trailing_punctuation_not_part_of_url() {
        assert_eq!(find_urls("go to https://example.com."), vec!["https://example.com"]);
        assert_eq!(find_urls("(https://example.com/a)"), vec!["https://example.com/a"]);
        assert_eq!(
            find_urls("https://en.wikipedia.org/wiki/Foo_(bar)"),
            vec!["https://en.wikipedia.org/wiki/Foo_(bar)"]
        );
    }

    #[test]
    fn test_partial_url_like_text_is_not_shielded() {
        assert!(find_urls("http:// nothing").is_empty());
        assert!(find_urls("www. nope").is_empty());
        assert!(find_urls("awww.cute").is_empty());
        assert!(find_urls("mailto:someone").is_empty());
    }

    #[test]
    fn test_unshield_tolerates_reordering_and_spacing() {
        let urls = vec!["https://one.example".to_string(), "https://two.example".to_string()];
        let translated = "first @@ url 1 @@ then @@URL0@@";
        assert_eq!(
            unshield(translated, &urls),
            "first https://two.example then https://one.example"
        );
    }

    #[test]
    fn test_unshield_leaves_unknown_index() {
        let urls = vec!["https://one.example".to_string()];
        assert_eq!(unshield("@@URL5@@ @@URL0@@", &urls), "@@URL5@@ https://one.example");
    }

    #[test]
    fn test_literal_placeholder_text_is_protected() {
        let text = "literal @@URL0@@ then https://a.example";
        let (shielded, urls) = shield(text);
        assert_eq!(shielded, "literal @@URL0@@ then @@URL1@@");
        assert_eq!(urls, vec!["@@URL0@@", "https://a.example"]);
        assert_eq!(find_urls(text), vec!["https://a.example"]);
    }

    #[test]
    fn test_unshield_html_escapes_around_urls() {
        let urls = vec!["https://x.example/?a=1&b=2".to_string()];
        let out = unshield_html("<b>see</b> @@URL0@@ & more", &urls);
        assert_eq!(out, "&lt;b&gt;see&lt;/b&gt; https://x.example/?a=1&b=2 &amp; more");
    }

    #[test]
    fn test_unshield_html_prefix_overlapping_urls() {
        let short = "https://a.example/?x=1&y=2";
        let long = "https://a.example/?x=1&y=2&z=3";
        let text = format!("a {short} b {long}");
        let (shielded, urls) = shield(&text);
        assert_eq!(unshield_html(&shielded, &urls), text);
    }

    #[test]
    fn test_unshield_html_unknown_index_is_escaped_text() {
        let urls = vec!["https://one.example".to_string()];
        assert_eq!(
            unshield_html("@@URL5@@ & @@URL0@@", &urls),
            "@@URL5@@ &amp; https://one.example"
        );
    }
}
