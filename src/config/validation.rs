use crate::config::types::{Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_site_config(&config.site)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if !config.max_runtime_hours.is_finite() || config.max_runtime_hours <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "max_runtime_hours must be > 0, got {}",
            config.max_runtime_hours
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_idle_polls < 1 {
        return Err(ConfigError::Validation(format!(
            "max_idle_polls must be >= 1, got {}",
            config.max_idle_polls
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_secs must be >= 1, got {}",
            config.fetch_timeout_secs
        )));
    }

    if config.retry_limit == Some(0) {
        return Err(ConfigError::Validation(
            "retry_limit must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    // Validate contact email (basic validation)
    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the target site: host, allow-list and seeds
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_host(&config.host)?;
    if !config.apex_alias.trim().is_empty() {
        validate_host(&config.apex_alias)?;
    }

    if config.allowed_paths.iter().all(|p| p.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "allowed_paths must contain at least one path".to_string(),
        ));
    }

    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "site must have at least one seed URL".to_string(),
        ));
    }

    let scope = config.scope();
    for seed in &config.seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        let on_site = url.host_str().is_some_and(|h| scope.is_site_host(h));
        if !on_site {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' is not on host '{}'",
                seed, config.host
            )));
        }
    }

    Ok(())
}

/// Validates a host name
fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::Validation("host cannot be empty".to_string()));
    }

    // Check for invalid characters
    if !host
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-')
    {
        return Err(ConfigError::Validation(format!(
            "Host '{}' cannot start or end with '.' or '-'",
            host
        )));
    }

    if host.contains("..") || !host.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Host '{}' must be a dotted name like 'example.com'",
            host
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
