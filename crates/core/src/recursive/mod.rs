//! Breadth-first crawl state: the seen-set, host/path-prefix
//! filters, and link discovery a recursive download walks through. The
//! network side (probe, fetch, placement) is driven by `orchestrate`,
//! reusing the same per-URL machinery as a flat top-level download.

mod link_extract;

use std::collections::{HashSet, VecDeque};

pub use link_extract::{extract_links, looks_like_html};

/// One pending crawl target.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub url: String,
    pub depth: u32,
}

/// Per-start-URL crawl state: seen-set, host/path anchors, and the
/// frontier queue.
pub struct CrawlContext {
    queue: VecDeque<QueueItem>,
    seen: HashSet<String>,
    host: Option<String>,
    base_path: Option<String>,
    no_parent: bool,
    max_depth: u32,
}

impl CrawlContext {
    /// Starts a crawl at `start_url`. Host and (if `no_parent`) the path
    /// prefix anchor are not known yet — they're set from the depth-0
    /// download's final URL via [`CrawlContext::anchor`], since redirects
    /// can move the effective host/path before the first byte is fetched.
    pub fn new(start_url: &str, no_parent: bool, max_depth: u32) -> Self {
        let mut ctx = Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            host: None,
            base_path: None,
            no_parent,
            max_depth,
        };
        ctx.queue.push_back(QueueItem {
            url: start_url.to_string(),
            depth: 0,
        });
        ctx
    }

    /// Records the depth-0 download's final (post-redirect) URL as the
    /// crawl's host/path anchor. Must be called once, before any
    /// same-host/no-parent filtering is applied.
    pub fn anchor(&mut self, final_url: &str) {
        self.host = url::Url::parse(final_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        if self.no_parent {
            self.base_path = Some(crate::url_model::base_path_for_no_parent(final_url));
        }
    }

    /// Marks `url` as seen, returning `true` if it was newly inserted
    /// (i.e. this caller should proceed with it) and `false` if a prior
    /// visit already claimed it.
    pub fn mark_seen(&mut self, url: &str) -> bool {
        match crate::url_model::normalize(url) {
            Some(key) => self.seen.insert(key),
            None => false,
        }
    }

    /// Pops the next frontier item in FIFO (breadth-first) order.
    pub fn pop(&mut self) -> Option<QueueItem> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// True if `url` passes the crawl's scheme/host/no-parent filters. The
    /// anchor must already be set via [`CrawlContext::anchor`].
    pub fn passes_filters(&self, url: &str) -> bool {
        if !crate::url_model::is_fetchable_scheme(url) {
            return false;
        }
        if let Some(host) = &self.host {
            if !crate::url_model::same_host(url, host) {
                return false;
            }
        }
        if let Some(base) = &self.base_path {
            if !crate::url_model::path_within_base(url, base) {
                return false;
            }
        }
        true
    }

    /// Given the HTML body of a just-downloaded resource at `depth`,
    /// returns the child links that pass filters and aren't already seen,
    /// enqueuing them at `depth + 1` if `depth < max_depth`.
    pub fn discover(&mut self, html: &str, base_url: &str, depth: u32) {
        if depth >= self.max_depth {
            return;
        }
        let candidates = extract_links(html, base_url);
        for link in candidates {
            if !self.passes_filters(&link) {
                continue;
            }
            if !self.mark_seen(&link) {
                continue;
            }
            self.queue.push_back(QueueItem {
                url: link,
                depth: depth + 1,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_breadth_first() {
        let mut ctx = CrawlContext::new("https://h/", false, 5);
        ctx.anchor("https://h/");
        assert_eq!(ctx.pop().unwrap().depth, 0);
        assert!(ctx.is_empty());
    }

    #[test]
    fn discover_enqueues_same_host_links_at_next_depth() {
        let mut ctx = CrawlContext::new("https://h/", false, 5);
        ctx.anchor("https://h/");
        ctx.mark_seen("https://h/");
        ctx.discover(r#"<a href="/a.html">x</a><a href="https://other/b.html">y</a>"#, "https://h/", 0);
        let next = ctx.pop().unwrap();
        assert_eq!(next.url, "https://h/a.html");
        assert_eq!(next.depth, 1);
        assert!(ctx.is_empty());
    }

    #[test]
    fn discover_respects_no_parent() {
        let mut ctx = CrawlContext::new("https://h/dir/", true, 5);
        ctx.anchor("https://h/dir/");
        ctx.discover(
            r#"<a href="/dir/child.html">x</a><a href="/other/sibling.html">y</a>"#,
            "https://h/dir/",
            0,
        );
        let items: Vec<_> = std::iter::from_fn(|| ctx.pop()).collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://h/dir/child.html");
    }

    #[test]
    fn discover_stops_at_max_depth() {
        let mut ctx = CrawlContext::new("https://h/", false, 1);
        ctx.anchor("https://h/");
        ctx.discover(r#"<a href="/a.html">x</a>"#, "https://h/", 1);
        assert!(ctx.is_empty());
    }

    #[test]
    fn mark_seen_rejects_duplicates() {
        let mut ctx = CrawlContext::new("https://h/", false, 5);
        assert!(ctx.mark_seen("https://h/x"));
        assert!(!ctx.mark_seen("https://h/x"));
        assert!(!ctx.mark_seen("https://H/x"));
    }
}
