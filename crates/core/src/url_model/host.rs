//! Host and path predicates used by the recursive driver, and URL normalisation.

use url::Url;

/// Lowercases scheme and host, defaults an empty path to `/`, strips the
/// fragment, and preserves the query string.
///
/// Used to key the crawl's seen-set so that equivalent URLs are only ever
/// fetched once.
pub fn normalize(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    let _ = parsed.set_fragment(None);
    if parsed.path().is_empty() {
        parsed.set_path("/");
    }
    Some(format!(
        "{}://{}{}{}",
        parsed.scheme().to_ascii_lowercase(),
        authority_lowercase(&parsed),
        parsed.path(),
        parsed.query().map(|q| format!("?{q}")).unwrap_or_default(),
    ))
}

fn authority_lowercase(url: &Url) -> String {
    let host = url.host_str().unwrap_or("").to_ascii_lowercase();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    }
}

/// Compares `url`'s host (case-insensitively) against `host`.
pub fn same_host(url: &str, host: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    parsed
        .host_str()
        .map(|h| h.eq_ignore_ascii_case(host))
        .unwrap_or(false)
}

/// Returns the directory portion of `url`'s path, with a trailing `/`.
///
/// This anchors the `no_parent` crawl filter: everything fetched from a
/// start URL must live under this prefix.
pub fn base_path_for_no_parent(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return "/".to_string();
    };
    let path = parsed.path();
    match path.rfind('/') {
        Some(idx) => path[..=idx].to_string(),
        None => "/".to_string(),
    }
}

/// Checks whether `url`'s path is a prefix-descendant of `base` (a value
/// produced by [`base_path_for_no_parent`]).
pub fn path_within_base(url: &str, base: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    parsed.path().starts_with(base)
}

/// Recognises the two schemes this crate will actually fetch.
pub fn is_fetchable_scheme(url: &str) -> bool {
    Url::parse(url)
        .map(|u| u.scheme() == "http" || u.scheme() == "https")
        .unwrap_or(false)
}

/// Builds the on-disk path for a recursively-discovered resource:
/// `root_dir/host/<decoded path>`, defaulting to `index.html` when the URL
/// path ends in `/` or has no usable suggested name.
pub fn recursive_output_path(
    url: &str,
    root_dir: &std::path::Path,
    suggested: Option<&str>,
) -> Option<std::path::PathBuf> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_string();
    let path = parsed.path();

    let mut out = root_dir.join(&host);
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        out.push(suggested.unwrap_or("index.html"));
        return Some(out);
    }

    for seg in &segments[..segments.len() - 1] {
        out.push(super::path::percent_decode_lossy(seg));
    }

    let last = segments[segments.len() - 1];
    if path.ends_with('/') {
        out.push(super::path::percent_decode_lossy(last));
        out.push(suggested.unwrap_or("index.html"));
    } else {
        out.push(super::path::percent_decode_lossy(last));
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_strips_fragment() {
        assert_eq!(
            normalize("HTTPS://Example.COM/Path?q=1#frag").as_deref(),
            Some("https://example.com/Path?q=1")
        );
    }

    #[test]
    fn normalize_defaults_empty_path() {
        assert_eq!(
            normalize("https://example.com").as_deref(),
            Some("https://example.com/")
        );
    }

    #[test]
    fn same_host_case_insensitive() {
        assert!(same_host("https://Example.com/x", "example.com"));
        assert!(!same_host("https://other.com/x", "example.com"));
    }

    #[test]
    fn base_path_directory() {
        assert_eq!(base_path_for_no_parent("https://h/a/b/c"), "/a/b/");
        assert_eq!(base_path_for_no_parent("https://h/a/"), "/a/");
        assert_eq!(base_path_for_no_parent("https://h/"), "/");
    }

    #[test]
    fn path_within_base_prefix() {
        assert!(path_within_base("https://h/a/x", "/a/"));
        assert!(!path_within_base("https://h/b/y", "/a/"));
    }

    #[test]
    fn fetchable_scheme_filters_non_http() {
        assert!(is_fetchable_scheme("http://h/x"));
        assert!(is_fetchable_scheme("https://h/x"));
        assert!(!is_fetchable_scheme("javascript:alert(1)"));
        assert!(!is_fetchable_scheme("mailto:a@b.com"));
        assert!(!is_fetchable_scheme("data:text/plain,hi"));
    }

    #[test]
    fn recursive_output_path_appends_index_for_directory() {
        let root = std::path::Path::new("/dl");
        let path = recursive_output_path("https://h/a/", root, None).unwrap();
        assert_eq!(path, std::path::Path::new("/dl/h/a/index.html"));
    }

    #[test]
    fn recursive_output_path_keeps_file_name() {
        let root = std::path::Path::new("/dl");
        let path = recursive_output_path("https://h/a/file.txt", root, None).unwrap();
        assert_eq!(path, std::path::Path::new("/dl/h/a/file.txt"));
    }
}
