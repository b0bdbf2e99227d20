use crate::models::Marketplace;
use std::env;
use std::time::Duration;

/// Secret used when `JWT_SECRET` is unset in development
const DEV_JWT_SECRET: &str = "final10-development-secret";

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// Token signing configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

/// One scraper service endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub marketplace: Marketplace,
    pub base_url: String,
}

/// Marketplace aggregation configuration
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    pub sources: Vec<SourceConfig>,
    pub timeout_ms: u64,
    pub per_source_limit: usize,
    pub refresh_interval_secs: u64,
    pub tracked_queries: Vec<String>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub aggregation: AggregationConfig,
    pub log_level: String,
    pub log_format: String,
    pub http_port: u16,
    pub ws_port: Option<u16>,
    pub cors_origin: Option<String>,
    pub environment: String,
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = parse_var::<u32>("DATABASE_MAX_CONNECTIONS").unwrap_or(10);
        let acquire_timeout_secs = parse_var::<u64>("DATABASE_ACQUIRE_TIMEOUT_SECS").unwrap_or(30);
        let idle_timeout_secs = parse_var::<u64>("DATABASE_IDLE_TIMEOUT_SECS").unwrap_or(600); // 10 minutes
        let max_lifetime_secs = parse_var::<u64>("DATABASE_MAX_LIFETIME_SECS").unwrap_or(1800); // 30 minutes
        let test_before_acquire = parse_var::<bool>("DATABASE_TEST_BEFORE_ACQUIRE").unwrap_or(true);

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/final10".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl AuthConfig {
    /// `JWT_SECRET` may only be omitted in development
    pub fn from_env(environment: &str) -> Result<Self, String> {
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment == "development" => DEV_JWT_SECRET.to_string(),
            _ => return Err("JWT_SECRET environment variable is required".to_string()),
        };

        let token_ttl_hours = parse_var::<i64>("JWT_TTL_HOURS").unwrap_or(168);
        if token_ttl_hours <= 0 {
            return Err("JWT_TTL_HOURS must be greater than 0".to_string());
        }

        Ok(Self {
            jwt_secret,
            token_ttl_hours,
        })
    }

    /// Whether the built-in development secret is in use
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_hours: 168,
        }
    }
}

/// Parse `ebay=http://scraper-ebay:7001,mercari=http://scraper-mercari:7002`
pub fn parse_sources(raw: &str) -> Result<Vec<SourceConfig>, String> {
    let mut sources = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, url) = entry
            .split_once('=')
            .ok_or_else(|| format!("Invalid MARKETPLACE_SOURCES entry: {}", entry))?;

        let marketplace = Marketplace::from_str(name.trim())?;
        if marketplace == Marketplace::Local {
            return Err("MARKETPLACE_SOURCES cannot contain the local marketplace".to_string());
        }

        let url = url.trim().trim_end_matches('/');
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("Invalid URL for marketplace {}: {}", name, url));
        }

        if sources.iter().any(|s: &SourceConfig| s.marketplace == marketplace) {
            return Err(format!("Marketplace {} configured twice", name));
        }

        sources.push(SourceConfig {
            marketplace,
            base_url: url.to_string(),
        });
    }

    Ok(sources)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl AggregationConfig {
    pub fn from_env() -> Result<Self, String> {
        let sources = parse_sources(&env::var("MARKETPLACE_SOURCES").unwrap_or_default())?;
        let timeout_ms = parse_var::<u64>("AGGREGATION_TIMEOUT_MS").unwrap_or(5000);
        let per_source_limit = parse_var::<usize>("AGGREGATION_PER_SOURCE_LIMIT").unwrap_or(25);
        let refresh_interval_secs = parse_var::<u64>("AGGREGATION_REFRESH_SECS").unwrap_or(900);
        let tracked_queries = parse_list(&env::var("AGGREGATION_TRACKED_QUERIES").unwrap_or_default());

        if timeout_ms == 0 {
            return Err("AGGREGATION_TIMEOUT_MS must be greater than 0".to_string());
        }
        if per_source_limit == 0 || per_source_limit > 100 {
            return Err("AGGREGATION_PER_SOURCE_LIMIT must be between 1 and 100".to_string());
        }
        if refresh_interval_secs == 0 {
            return Err("AGGREGATION_REFRESH_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            sources,
            timeout_ms,
            per_source_limit,
            refresh_interval_secs,
            tracked_queries,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            timeout_ms: 5000,
            per_source_limit: 25,
            refresh_interval_secs: 900,
            tracked_queries: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
        let http_port = parse_var::<u16>("HTTP_PORT").unwrap_or(5000);
        let ws_port = parse_var::<u16>("WS_PORT");
        let cors_origin = env::var("CORS_ORIGIN").ok().filter(|s| !s.trim().is_empty());
        let environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase();

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&log_format.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_FORMAT: {}. Must be one of: {:?}",
                log_format, valid_log_formats
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        if ws_port.is_some() && ws_port == Some(http_port) {
            return Err("WS_PORT must differ from HTTP_PORT".to_string());
        }

        let auth = AuthConfig::from_env(&environment)?;
        let aggregation = AggregationConfig::from_env()?;

        Ok(Self {
            database,
            auth,
            aggregation,
            log_level: log_level.to_lowercase(),
            log_format: log_format.to_lowercase(),
            http_port,
            ws_port,
            cors_origin,
            environment,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Get database URL (convenience method)
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            aggregation: AggregationConfig::default(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            http_port: 5000,
            ws_port: None,
            cors_origin: None,
            environment: "development".to_string(),
        }
    }
}
