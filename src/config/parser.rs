use crate::config::types::{Config, SiteConfig};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;
use url::Url;

/// Loads, normalizes and validates the configuration at `path`
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use partselect_ingest::config::load_config;
///
/// let config = load_config(Path::new("ingest.toml")).unwrap();
/// println!("{} seeds", config.site.seeds.len());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    parse_config(&std::fs::read_to_string(path)?)
}

/// Loads a configuration together with the hash of the file it came from
///
/// The file is read once, so the hash always matches the parsed content.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hash_content(&content)))
}

/// Hex SHA-256 of the configuration file, recorded on every crawl run
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    Ok(hash_content(&std::fs::read_to_string(path)?))
}

/// Parses TOML text into a ready-to-run configuration
///
/// Seeds are canonicalized against the configured site before validation.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(content)?;
    normalize_seeds(&mut config.site);
    validate(&config)?;
    Ok(config)
}

fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Canonicalizes seeds, dropping duplicates and on-site pages outside the allow-list
///
/// Malformed and off-site seeds are kept as written so validation reports them.
fn normalize_seeds(site: &mut SiteConfig) {
    let scope = site.scope();
    let mut seen = HashSet::new();
    let mut seeds = Vec::with_capacity(site.seeds.len());

    for seed in site.seeds.drain(..) {
        let canonical = scope.canonicalize(&seed);
        if canonical.is_empty() {
            seeds.push(seed);
        } else if scope.is_in_scope(&canonical) {
            if seen.insert(canonical.clone()) {
                seeds.push(canonical);
            }
        } else if Url::parse(&canonical)
            .ok()
            .and_then(|url| url.host_str().map(|host| scope.is_site_host(host)))
            .unwrap_or(false)
        {
            warn!("Dropping seed outside the crawl scope: {}", seed);
        } else {
            seeds.push(seed);
        }
    }

    site.seeds = seeds;
}
