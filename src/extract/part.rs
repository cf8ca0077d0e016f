//! Part detail page extraction

use crate::extract::links::manufacturer_part_from_slug;
use crate::extract::ParsedPart;
use crate::url::SiteScope;
use regex::Regex;
use std::sync::LazyLock;

static PART_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/(PS\d+)-").expect("valid part number regex"));

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s?(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{2}))?").expect("valid price regex")
});

static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#[ \t]+(.+)$").expect("valid heading regex"));

/// Extracts a part from its detail page
///
/// # Arguments
///
/// * `url` - Page URL, e.g. `https://www.partselect.com/PS11750093-Whirlpool-W10195416-Lower-Rack.htm`
/// * `markdown` - Page content
/// * `site` - Target site, used to canonicalize `part_url`
///
/// # Returns
///
/// `None` when the URL carries no `/PS<digits>-` segment.
pub fn parse_part_page(url: &str, markdown: &str, site: &SiteScope) -> Option<ParsedPart> {
    let partselect_number = PART_NUMBER_RE.captures(url)?.get(1)?.as_str().to_uppercase();

    let slug = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    Some(ParsedPart {
        partselect_number,
        part_url: site.canonicalize(url),
        name: first_heading(markdown),
        manufacturer_part_number: manufacturer_part_from_slug(slug),
        price_value: first_price(markdown),
    })
}

fn first_heading(markdown: &str) -> Option<String> {
    H1_RE
        .captures(markdown)
        .map(|caps| caps[1].trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Parses the first `$` amount, e.g. `$1,024.50` → 1024.5
fn first_price(markdown: &str) -> Option<f64> {
    let caps = PRICE_RE.captures(markdown)?;
    let whole = caps[1].replace(',', "");
    let amount = match caps.get(2) {
        Some(cents) => format!("{}.{}", whole, cents.as_str()),
        None => whole,
    };
    amount.parse().ok()
}
