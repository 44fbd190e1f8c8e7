//! Tolerant HTML link extraction.
//!
//! Not a conforming HTML parser — a regex scan over the attributes most
//! pages actually use to reference other resources. Good enough for a
//! crawler that only needs candidate URLs to filter and enqueue, not a
//! faithful DOM.

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?i)\b(?:href|src)\s*=\s*("([^"]*)"|'([^']*)'|([^\s>]+))"#,
        )
        .expect("static link extraction pattern is valid")
    })
}

/// Scans `html` for `href=`/`src=` attribute values, resolves each against
/// `base_url`, and returns the absolute, fragment-stripped URLs found.
/// Malformed or unresolvable candidates are silently skipped.
pub fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for caps in link_pattern().captures_iter(html) {
        let raw = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
            .unwrap_or("");
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }
        let Ok(mut resolved) = base.join(raw) else {
            continue;
        };
        resolved.set_fragment(None);
        out.push(resolved.into());
    }
    out
}

/// True when `content_type` or the URL's path suggests HTML — the
/// condition the recursive driver uses to decide whether a just-downloaded
/// resource should be scanned for further links.
pub fn looks_like_html(content_type: Option<&str>, url: &str) -> bool {
    if let Some(ct) = content_type {
        if ct.to_ascii_lowercase().contains("text/html") {
            return true;
        }
    }
    let path = Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_default();
    path.ends_with(".html") || path.ends_with(".htm") || path.ends_with("index.html")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_href_and_src_double_quoted() {
        let html = r#"<a href="/a/b.html">x</a><img src="/img/c.png">"#;
        let links = extract_links(html, "https://h/");
        assert_eq!(links, vec!["https://h/a/b.html", "https://h/img/c.png"]);
    }

    #[test]
    fn extracts_single_quoted_and_unquoted() {
        let html = "<link href='style.css'><script src=app.js></script>";
        let links = extract_links(html, "https://h/dir/");
        assert_eq!(links, vec!["https://h/dir/style.css", "https://h/dir/app.js"]);
    }

    #[test]
    fn resolves_relative_and_strips_fragment() {
        let html = r#"<a href="../up.html#section">x</a>"#;
        let links = extract_links(html, "https://h/a/b/");
        assert_eq!(links, vec!["https://h/a/up.html"]);
    }

    #[test]
    fn skips_bare_fragment_links() {
        let html = r#"<a href="#top">x</a>"#;
        assert!(extract_links(html, "https://h/").is_empty());
    }

    #[test]
    fn looks_like_html_by_content_type_or_suffix() {
        assert!(looks_like_html(Some("text/html; charset=utf-8"), "https://h/x"));
        assert!(looks_like_html(None, "https://h/a/index.html"));
        assert!(looks_like_html(None, "https://h/a/page.htm"));
        assert!(!looks_like_html(Some("application/zip"), "https://h/a.zip"));
    }
}
