use crate::{UrlError, UrlResult};
use url::Url;

/// Canonicalizes a URL into the identity key used throughout the pipeline
///
/// # Canonicalization Steps
///
/// 1. Trim and parse the URL; reject if malformed
/// 2. Reject anything that is not http or https
/// 3. Force the secure scheme
/// 4. Lowercase the host and map the apex alias onto the canonical host
/// 5. Normalize path:
///    - Collapse duplicate slashes and dot segments
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 6. Drop query string and fragment
///
/// # Arguments
///
/// * `url_str` - The URL string to canonicalize
/// * `alias` - Optional `(apex, canonical)` host pair
///
/// # Returns
///
/// * `Ok(String)` - Canonical URL
/// * `Err(UrlError)` - The URL cannot be canonicalized
pub fn try_canonicalize(url_str: &str, alias: Option<(&str, &str)>) -> UrlResult<String> {
    // Step 1: Parse the URL
    let raw = url_str.trim();
    if raw.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }
    let url = Url::parse(raw).map_err(|e| UrlError::Parse(e.to_string()))?;

    // Step 2: Validate scheme
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    // Step 4: Lowercase the host and apply the apex alias
    let mut host = match url.host_str() {
        Some(h) if !h.is_empty() => h.to_lowercase(),
        _ => return Err(UrlError::MissingHost),
    };
    if let Some((apex, canonical)) = alias {
        if host == apex {
            host = canonical.to_string();
        }
    }

    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();

    // Step 5: Normalize path
    let path = normalize_path(url.path());

    // Step 3 & 6: Secure scheme, no query or fragment
    Ok(format!("https://{}{}{}", host, port, path))
}

/// Canonicalizes a URL, returning an empty string when it cannot be parsed
///
/// Callers treat an empty result as "drop, do not enqueue".
pub fn canonicalize_with_alias(url_str: &str, alias: Option<(&str, &str)>) -> String {
    try_canonicalize(url_str, alias).unwrap_or_default()
}

/// Normalizes a URL path by removing dot segments, duplicate and trailing slashes
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            // Skip empty segments (from multiple slashes) and current directory markers
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}
