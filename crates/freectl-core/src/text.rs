//! Text utilities for link and category extraction.
//!
//! Pure functions over markdown-ish text. Everything here is ASCII-safe but
//! Unicode-tolerant: byte-offset arithmetic only ever lands on character
//! boundaries produced by `char_indices`.

/// Extract the first URL-looking substring from a line.
///
/// A URL starts with `http://`, `https://`, or `www.` and runs until the
/// first whitespace, `)`, `]`, or end of line. Returns the empty string when
/// the line carries no URL. A bare prefix with nothing after it does not
/// count.
#[must_use]
pub fn extract_url(line: &str) -> &str {
    let start = ["http://", "https://", "www."]
        .iter()
        .filter_map(|prefix| line.find(prefix))
        .min();
    let Some(start) = start else {
        return "";
    };

    let rest = &line[start..];
    let end = rest
        .char_indices()
        .find(|&(_, c)| c.is_whitespace() || c == ')' || c == ']')
        .map_or(rest.len(), |(i, _)| i);
    let url = &rest[..end];

    // Require at least one character beyond the matched prefix.
    let prefix_len = if url.starts_with("https://") {
        8
    } else if url.starts_with("http://") {
        7
    } else {
        4
    };
    if url.len() <= prefix_len { "" } else { url }
}

/// Extract the bare domain from a URL: scheme, path, query and a leading
/// `www.` are all stripped.
#[must_use]
pub fn extract_domain(url: &str) -> &str {
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let end = host
        .char_indices()
        .find(|&(_, c)| c == '/' || c == '?' || c == '#')
        .map_or(host.len(), |(i, _)| i);
    let host = &host[..end];
    host.strip_prefix("www.").unwrap_or(host)
}

/// Extract the first markdown link `[text](url)` from `text`.
///
/// Brackets must balance, `\[` and `\]` escapes are honored, and nested
/// brackets are preserved inside the link text minus one level of escaping.
/// Returns `("", "")` when no well-formed link exists.
#[must_use]
pub fn extract_markdown_link(text: &str) -> (String, String) {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'[' && !is_escaped(bytes, i) {
            if let Some((link_text, url, _)) = parse_link_at(text, i) {
                return (link_text, url);
            }
        }
        i += 1;
    }
    (String::new(), String::new())
}

/// Remove every whitespace-delimited token that contains a URL marker.
#[must_use]
pub fn remove_urls(text: &str) -> String {
    text.split_whitespace()
        .filter(|token| {
            !token.contains("http://") && !token.contains("https://") && !token.contains("www.")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Clean a heading string into a usable category name.
///
/// Rules, in order:
/// 1. If the string still contains a bare URL once every `[..](..)` segment
///    is removed, the heading is navigational noise: return `"n/a"`.
/// 2. Otherwise, if the string contains a markdown link, the category is the
///    first link's text (cleaned again, so the result is a fixed point).
/// 3. Otherwise trim the string, drop everything before the first
///    alphanumeric character, collapse whitespace, and return `"n/a"` when
///    nothing is left.
#[must_use]
pub fn clean_category(s: &str) -> String {
    let stripped = strip_markdown_links(s);
    if contains_url_marker(&stripped) {
        return "n/a".to_string();
    }

    let (link_text, url) = extract_markdown_link(s);
    if !url.is_empty() || !link_text.is_empty() {
        return clean_category(&link_text);
    }

    let trimmed = s.trim();
    let start = trimmed
        .char_indices()
        .find(|&(_, c)| c.is_alphanumeric())
        .map_or(trimmed.len(), |(i, _)| i);
    let cleaned = collapse_whitespace(&trimmed[start..]);
    if cleaned.is_empty() {
        "n/a".to_string()
    } else {
        cleaned
    }
}

/// A category longer than 80 characters is a sentence, not a category.
#[must_use]
pub fn is_invalid_category(s: &str) -> bool {
    s.chars().count() > 80
}

/// Normalize a description: trim, drop leading list dashes, drop trailing
/// punctuation, collapse internal whitespace.
#[must_use]
pub fn clean_description(s: &str) -> String {
    let mut t = s.trim();
    loop {
        let stripped = t.trim_start();
        if let Some(rest) = stripped.strip_prefix('-') {
            t = rest;
        } else {
            t = stripped;
            break;
        }
    }
    let t = t.trim_end_matches(['.', ',', ':', ';', '/', ' ']);
    collapse_whitespace(t)
}

/// Flatten markdown syntax to plain text: emphasis markers and backticks are
/// removed, `](http…)` link tails become ` http…`, stray `[` and `)` are
/// dropped, and whitespace is collapsed.
#[must_use]
pub fn clean_markdown(s: &str) -> String {
    let s = s.replace("](http", " http");
    let s: String = s
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '`' | '[' | ')'))
        .collect();
    collapse_whitespace(&s)
}

/// Sanitize a source name into a filesystem-safe path component.
///
/// Path separators and anything outside `[A-Za-z0-9._-]` become `_`; `..`
/// sequences collapse so the result can never escape the cache directory.
/// An empty name becomes `unnamed_source`.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    while sanitized.contains("..") {
        sanitized = sanitized.replace("..", "_");
    }

    if sanitized.is_empty() {
        "unnamed_source".to_string()
    } else {
        sanitized
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
#[must_use]
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove every well-formed `[text](url)` segment from the string.
#[must_use]
pub fn strip_markdown_links(s: &str) -> String {
    rewrite_links(s, |_text| String::new())
}

/// Replace every well-formed `[text](url)` segment with its link text.
#[must_use]
pub fn replace_markdown_links(s: &str) -> String {
    rewrite_links(s, |text| text.to_string())
}

fn rewrite_links(s: &str, rewrite: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < s.len() {
        if bytes[i] == b'[' && !is_escaped(bytes, i) {
            if let Some((text, _, consumed)) = parse_link_at(s, i) {
                out.push_str(&rewrite(&text));
                i += consumed;
                continue;
            }
        }
        // Advance one full character.
        let ch_len = s[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&s[i..i + ch_len]);
        i += ch_len;
    }
    out
}

fn contains_url_marker(s: &str) -> bool {
    s.contains("http://") || s.contains("https://") || s.contains("www.")
}

/// True when the byte at `pos` is preceded by an odd number of backslashes.
fn is_escaped(bytes: &[u8], pos: usize) -> bool {
    let mut count = 0;
    let mut i = pos;
    while i > 0 && bytes[i - 1] == b'\\' {
        count += 1;
        i -= 1;
    }
    count % 2 == 1
}

/// Try to parse a markdown link starting at byte offset `start` (which must
/// point at an unescaped `[`). Returns the unescaped link text, the URL, and
/// the number of bytes consumed.
fn parse_link_at(s: &str, start: usize) -> Option<(String, String, usize)> {
    let bytes = s.as_bytes();
    debug_assert_eq!(bytes[start], b'[');

    // Find the matching `]`, tracking nesting and honoring escapes.
    let mut depth = 1usize;
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'[' if !is_escaped(bytes, i) => depth += 1,
            b']' if !is_escaped(bytes, i) => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            },
            _ => {},
        }
        i += 1;
    }
    if i >= bytes.len() || depth != 0 {
        return None;
    }
    let text_end = i;

    // The `]` must be immediately followed by `(`.
    if i + 1 >= bytes.len() || bytes[i + 1] != b'(' {
        return None;
    }

    // Find the matching `)`, allowing balanced parentheses in the URL.
    let mut paren_depth = 1usize;
    let mut j = i + 2;
    while j < bytes.len() {
        match bytes[j] {
            b'(' => paren_depth += 1,
            b')' => {
                paren_depth -= 1;
                if paren_depth == 0 {
                    break;
                }
            },
            _ => {},
        }
        j += 1;
    }
    if j >= bytes.len() || paren_depth != 0 {
        return None;
    }

    let raw_text = &s[start + 1..text_end];
    let url = s[i + 2..j].to_string();
    Some((unescape_brackets(raw_text), url, j + 1 - start))
}

/// Remove one level of `\[` / `\]` escaping.
fn unescape_brackets(s: &str) -> String {
    s.replace("\\[", "[").replace("\\]", "]")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn extract_url_finds_first_match() {
        assert_eq!(extract_url("see https://a.com and http://b.com"), "https://a.com");
        assert_eq!(extract_url("go to www.example.org now"), "www.example.org");
        assert_eq!(extract_url("nothing here"), "");
    }

    #[test]
    fn extract_url_stops_at_terminators() {
        assert_eq!(extract_url("([link](https://a.com/x))"), "https://a.com/x");
        assert_eq!(extract_url("[https://a.com]"), "https://a.com");
        assert_eq!(extract_url("https://a.com/path?q=1\tnext"), "https://a.com/path?q=1");
    }

    #[test]
    fn extract_url_rejects_bare_prefixes() {
        assert_eq!(extract_url("http://"), "");
        assert_eq!(extract_url("www. is not a url"), "");
    }

    #[test]
    fn extract_domain_strips_scheme_path_and_www() {
        assert_eq!(extract_domain("https://www.example.com/a/b?q=1"), "example.com");
        assert_eq!(extract_domain("http://sub.example.org#frag"), "sub.example.org");
        assert_eq!(extract_domain("www.example.net"), "example.net");
    }

    #[test]
    fn extract_markdown_link_basic() {
        let (text, url) = extract_markdown_link("* [Koala](https://koala.com/) - marsupial");
        assert_eq!(text, "Koala");
        assert_eq!(url, "https://koala.com/");
    }

    #[test]
    fn extract_markdown_link_nested_brackets() {
        let (text, url) = extract_markdown_link("[see [nested] text](https://x.com)");
        assert_eq!(text, "see [nested] text");
        assert_eq!(url, "https://x.com");
    }

    #[test]
    fn extract_markdown_link_escapes() {
        let (text, url) = extract_markdown_link(r"[escaped \[bracket\]](https://x.com)");
        assert_eq!(text, "escaped [bracket]");
        assert_eq!(url, "https://x.com");
    }

    #[test]
    fn extract_markdown_link_balanced_parens_in_url() {
        let (text, url) =
            extract_markdown_link("[wiki](https://en.wikipedia.org/wiki/Rust_(language))");
        assert_eq!(text, "wiki");
        assert_eq!(url, "https://en.wikipedia.org/wiki/Rust_(language)");
    }

    #[test]
    fn extract_markdown_link_none() {
        assert_eq!(extract_markdown_link("no link here"), (String::new(), String::new()));
        assert_eq!(extract_markdown_link("[unclosed](http://x"), (String::new(), String::new()));
    }

    #[test]
    fn remove_urls_drops_url_tokens() {
        assert_eq!(remove_urls("Penguin https://penguin.com/ antarctic"), "Penguin antarctic");
        assert_eq!(remove_urls("see www.a.com and http://b.com"), "see and");
    }

    #[test]
    fn clean_category_bare_url_is_na() {
        assert_eq!(clean_category("Visit https://example.com for more"), "n/a");
        assert_eq!(clean_category("www.example.com"), "n/a");
    }

    #[test]
    fn clean_category_takes_link_text() {
        assert_eq!(clean_category("[Ostrich](https://ostrich.com/)"), "Ostrich");
        assert_eq!(clean_category("## [Tiger](https://tiger.com/) extras"), "Tiger");
    }

    #[test]
    fn clean_category_trims_leading_junk() {
        assert_eq!(clean_category("### Tools"), "Tools");
        assert_eq!(clean_category("- •  Video   Streaming"), "Video Streaming");
        assert_eq!(clean_category("!!!"), "n/a");
        assert_eq!(clean_category(""), "n/a");
    }

    #[test]
    fn clean_description_strips_markers() {
        assert_eq!(clean_description("- A tidy   description. "), "A tidy description");
        assert_eq!(clean_description("-- nested dash"), "nested dash");
        assert_eq!(clean_description("trailing:;/. "), "trailing");
    }

    #[test]
    fn clean_markdown_flattens() {
        assert_eq!(clean_markdown("**bold** and `code`"), "bold and code");
        assert_eq!(
            clean_markdown("[Koala](https://koala.com/)"),
            "Koala https://koala.com/"
        );
    }

    #[test]
    fn sanitize_name_rules() {
        assert_eq!(sanitize_name("awesome/selfhosted"), "awesome_selfhosted");
        assert_eq!(sanitize_name("a b:c"), "a_b_c");
        assert_eq!(sanitize_name("../../etc"), "_____etc");
        assert_eq!(sanitize_name(""), "unnamed_source");
    }

    #[test]
    fn is_invalid_category_length_gate() {
        assert!(!is_invalid_category(&"x".repeat(80)));
        assert!(is_invalid_category(&"x".repeat(81)));
    }

    #[test]
    fn domain_of_self_extracting_url_is_clean() {
        for url in ["https://www.example.com/a", "http://foo.bar", "www.baz.io/path"] {
            assert_eq!(extract_url(url), url);
            let domain = extract_domain(url);
            assert!(!domain.is_empty());
            assert!(!domain.starts_with("www."));
        }
    }

    proptest! {
        #[test]
        fn clean_category_is_idempotent(s in ".{0,200}") {
            let once = clean_category(&s);
            prop_assert_eq!(clean_category(&once), once);
        }

        #[test]
        fn clean_description_is_idempotent(s in ".{0,200}") {
            let once = clean_description(&s);
            prop_assert_eq!(clean_description(&once), once);
        }

        #[test]
        fn extracted_domains_never_keep_www(host in "[a-z]{1,10}\\.[a-z]{2,4}") {
            let url = format!("https://www.{host}/path");
            prop_assert_eq!(extract_domain(&url), host.as_str());
        }
    }
}
