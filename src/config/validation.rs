use crate::config::types::{
    BlocklistConfig, Config, CrawlerConfig, OutputConfig, ServicesConfig, UserAgentConfig,
};
use crate::url::parse_root;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_services(&config.services)?;
    validate_blocklist(&config.blocklist)?;
    validate_seeds(&config.seeds)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages_per_site < 1 {
        return Err(ConfigError::Validation(
            "max_pages_per_site must be >= 1".to_string(),
        ));
    }

    if config.concurrent_sites < 1 || config.concurrent_sites > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrent_sites must be between 1 and 100, got {}",
            config.concurrent_sites
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch_size must be >= 1".to_string(),
        ));
    }

    if config.max_sites_per_sweep < 1 {
        return Err(ConfigError::Validation(
            "max_sites_per_sweep must be >= 1".to_string(),
        ));
    }

    for keyword in &config.priority_keywords {
        if keyword.trim().is_empty() {
            return Err(ConfigError::Validation(
                "priority_keywords cannot contain empty entries".to_string(),
            ));
        }
    }

    for path in &config.alternate_roots {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "alternate root '{}' must start with '/'",
                path
            )));
        }
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    // The name doubles as the robots.txt agent token
    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters, '-' or '_', got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Checks endpoint URLs and that required services are actually configured
fn validate_services(config: &ServicesConfig) -> Result<(), ConfigError> {
    validate_endpoint("render-worker", config.render_worker.as_deref())?;
    validate_endpoint("embedding", config.embedding.as_deref())?;

    if config.require_render_worker && config.render_worker.is_none() {
        return Err(ConfigError::Validation(
            "require-render-worker is set but no render-worker endpoint is configured"
                .to_string(),
        ));
    }

    if config.require_embedding && config.embedding.is_none() {
        return Err(ConfigError::Validation(
            "require-embedding is set but no embedding endpoint is configured".to_string(),
        ));
    }

    Ok(())
}

fn validate_endpoint(name: &str, endpoint: Option<&str>) -> Result<(), ConfigError> {
    let Some(endpoint) = endpoint else {
        return Ok(());
    };

    let url = Url::parse(endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} endpoint: {}", name, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} endpoint must be http(s), got '{}'",
            name, endpoint
        )));
    }

    Ok(())
}

fn validate_blocklist(config: &BlocklistConfig) -> Result<(), ConfigError> {
    for pattern in config.ignored_hosts.iter().chain(&config.forbidden_sites) {
        validate_domain_pattern(pattern)?;
    }

    if config.ignored_prefixes.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidPattern(
            "ignored prefixes cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    for seed in seeds {
        parse_root(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed '{}': {}", seed, e)))?;
    }
    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);
    validate_domain_string(domain)
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
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

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_domain_pattern() {
        assert!(validate_domain_pattern("neocities.org").is_ok());
        assert!(validate_domain_pattern("*.tumblr.com").is_ok());
        assert!(validate_domain_pattern("ze.wtf").is_ok());

        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*.").is_err());
        assert!(validate_domain_pattern("localhost").is_err());
        assert!(validate_domain_pattern(".example.com").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("bot@example.org").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("bot").is_err());
        assert!(validate_email("@example.org").is_err());
        assert!(validate_email("bot@").is_err());
        assert!(validate_email("bot@localhost").is_err());
        assert!(validate_email("a@b@example.org").is_err());
    }

    #[test]
    fn test_validate_endpoint() {
        assert!(validate_endpoint("embedding", None).is_ok());
        assert!(validate_endpoint("embedding", Some("http://localhost:8888/vectorize")).is_ok());
        assert!(validate_endpoint("embedding", Some("ftp://files.example.org")).is_err());
        assert!(validate_endpoint("embedding", Some("not a url")).is_err());
    }

    #[test]
    fn test_required_render_worker_needs_endpoint() {
        let mut services = ServicesConfig {
            require_render_worker: true,
            ..Default::default()
        };
        assert!(validate_services(&services).is_err());

        services.render_worker = Some("https://render.example.org/?url=".to_string());
        assert!(validate_services(&services).is_ok());
    }

    #[test]
    fn test_alternate_roots_must_be_paths() {
        let mut crawler = CrawlerConfig::default();
        assert!(validate_crawler_config(&crawler).is_ok());

        crawler.alternate_roots = vec!["index.html".to_string()];
        assert!(validate_crawler_config(&crawler).is_err());
    }

    #[test]
    fn test_seeds_must_parse() {
        assert!(validate_seeds(&["melonland.net".to_string()]).is_ok());
        assert!(validate_seeds(&["mailto:someone@example.org".to_string()]).is_err());
    }
}
