//! Anchor extraction for directory-listing pages
//!
//! Listing pages (Apache/nginx autoindex, project download pages) are scanned
//! for `<a href=...>` elements. Which links matter is decided by a
//! [`LinkMatcher`], so each provider states its matching rule declaratively and
//! the rule can be tested against fixture HTML on its own.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

#[allow(clippy::expect_used)]
static ANCHOR_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\shref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("anchor regex is valid")
});

/// Predicate deciding whether a hyperlink points at a wanted artifact
pub trait LinkMatcher: Send + Sync {
    /// Whether `href` (as written in the page) is a target artifact
    fn is_target_artifact(&self, href: &str) -> bool;
}

impl<F> LinkMatcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_target_artifact(&self, href: &str) -> bool {
        self(href)
    }
}

/// Matches links whose path ends with a fixed suffix, ignoring query and fragment
#[derive(Clone, Debug)]
pub struct SuffixMatcher {
    suffix: String,
}

impl SuffixMatcher {
    /// Create a matcher for e.g. `.iso.torrent`
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    /// The suffix being matched
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl LinkMatcher for SuffixMatcher {
    fn is_target_artifact(&self, href: &str) -> bool {
        let path = strip_query(href);
        path.len() > self.suffix.len() && path.ends_with(&self.suffix)
    }
}

fn strip_query(href: &str) -> &str {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    &href[..end]
}

/// Decode the handful of entities that show up inside attribute values
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Every `href` value in document order
pub fn extract_hrefs(html: &str) -> Vec<String> {
    ANCHOR_HREF
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|href| !href.is_empty())
        .collect()
}

/// The `href`s accepted by `matcher`, in document order
pub fn matching_links<M: LinkMatcher + ?Sized>(html: &str, matcher: &M) -> Vec<String> {
    extract_hrefs(html)
        .into_iter()
        .filter(|href| matcher.is_target_artifact(href))
        .collect()
}

/// Resolve an href relative to the page it was found on
pub fn resolve(base: &Url, href: &str) -> Option<Url> {
    base.join(href).ok()
}

/// Last path segment of an href, percent-decoded (`foo%2Bbar.iso.torrent` → `foo+bar.iso.torrent`)
pub fn file_name(href: &str) -> String {
    let path = strip_query(href).trim_end_matches('/');
    let segment = path.rsplit('/').next().unwrap_or(path);
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}
