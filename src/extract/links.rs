//! Markdown link scanning shared by the page extractors

use crate::url::SiteScope;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\((https?://[^\s)]+)\)").expect("valid markdown link regex")
});

static PART_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\((https?://[^/\s)]+/((?i:PS)\d+[^)\s"]*))"#).expect("valid part link regex")
});

/// A markdown link pointing at the target site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLink<'a> {
    pub text: &'a str,
    pub href: &'a str,
}

/// A part detail link: the absolute href and its final path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartLink<'a> {
    pub href: &'a str,
    pub slug: &'a str,
}

fn points_at_site(href: &str, site: &SiteScope) -> bool {
    Url::parse(href)
        .ok()
        .and_then(|u| u.host_str().map(|h| site.is_site_host(h)))
        .unwrap_or(false)
}

/// Scans `[text](https://<site>...)` links in document order
pub fn site_links<'a>(markdown: &'a str, site: &SiteScope) -> Vec<SiteLink<'a>> {
    LINK_RE
        .captures_iter(markdown)
        .filter_map(|caps| {
            let text = caps.get(1)?.as_str();
            let href = caps.get(2)?.as_str();
            points_at_site(href, site).then_some(SiteLink { text, href })
        })
        .collect()
}

/// Scans part-detail links (`(https://<site>/PS<digits>...)`) in document order
pub fn part_links<'a>(markdown: &'a str, site: &SiteScope) -> Vec<PartLink<'a>> {
    PART_LINK_RE
        .captures_iter(markdown)
        .filter_map(|caps| {
            let href = caps.get(1)?.as_str();
            let slug = caps.get(2)?.as_str();
            points_at_site(href, site).then_some(PartLink { href, slug })
        })
        .collect()
}

/// Returns the third dash-delimited token of a part slug
///
/// `PS3406971-Whirlpool-W10195416-Lower-Rack.htm` yields `W10195416`.
/// Query strings and `.htm`/`.html` extensions are ignored.
pub fn manufacturer_part_from_slug(slug: &str) -> Option<String> {
    let slug = slug.split(['?', '#']).next().unwrap_or("");
    let slug = slug
        .strip_suffix(".html")
        .or_else(|| slug.strip_suffix(".htm"))
        .unwrap_or(slug);

    slug.split('-')
        .nth(2)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Truncates to at most `max` characters without splitting a code point
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Largest char boundary at or below `idx`
pub fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_links_skip_foreign_hosts() {
        let md = "[Home](https://www.partselect.com/) [FB](https://www.facebook.com/ps) \
                  [Apex](https://partselect.com/Brands/)";
        let links = site_links(md, &SiteScope::default());
        let hrefs: Vec<_> = links.iter().map(|l| l.href).collect();
        assert_eq!(
            hrefs,
            vec!["https://www.partselect.com/", "https://partselect.com/Brands/"]
        );
        assert_eq!(links[0].text, "Home");
    }

    #[test]
    fn test_part_links_capture_slug() {
        let md = "[Rack](https://www.partselect.com/PS3406971-Whirlpool-W10195416-Lower-Rack.htm?SourceCode=18)";
        let links = part_links(md, &SiteScope::default());
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].slug,
            "PS3406971-Whirlpool-W10195416-Lower-Rack.htm?SourceCode=18"
        );
    }

    #[test]
    fn test_manufacturer_part_from_slug() {
        assert_eq!(
            manufacturer_part_from_slug("PS3406971-Whirlpool-W10195416-Lower-Rack.htm"),
            Some("W10195416".to_string())
        );
        assert_eq!(
            manufacturer_part_from_slug("PS3406971-Whirlpool-W10195416.htm"),
            Some("W10195416".to_string())
        );
        assert_eq!(manufacturer_part_from_slug("PS3406971-Whirlpool.htm"), None);
        assert_eq!(manufacturer_part_from_slug("PS3406971"), None);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_floor_char_boundary() {
        let s = "aé";
        assert_eq!(floor_char_boundary(s, 2), 1);
        assert_eq!(floor_char_boundary(s, 99), s.len());
    }
}
