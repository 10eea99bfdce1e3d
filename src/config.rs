use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use toml::Value;

use crate::cli::date_parser::parse_date;
use crate::discovery::{RateGate, RetryPolicy, ValidationCriteria, DEFAULT_TARGET_COUNT};
use crate::discovery::rate_gate::{DEFAULT_RESET_GRACE, DEFAULT_SAFETY_MARGIN};
use crate::discovery::retry::DEFAULT_CONNECTION_RESET_RETRIES;
use crate::github::{ClientSettings, SearchQuery};

/// Configuration storage - section_name -> key -> value
pub type Configuration = HashMap<String, HashMap<String, String>>;

pub const CONFIG_ENV_VAR: &str = "REPO_SCOUT_CONFIG";
pub const DEFAULT_CREDENTIALS_FILE: &str = "../config";
pub const DEFAULT_OUTPUT_FILE: &str = "data/repo-candidates.json";
const DEFAULT_CREATED_BEFORE: &str = "2016-04-22";
const DEFAULT_LANGUAGE: &str = "Java";

/// Run-level discovery settings from `[discovery]`
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverySettings {
    pub target_count: usize,
    pub output: PathBuf,
    pub rate_limit_margin: u64,
    pub connection_reset_retries: usize,
    pub max_timeout_retries: Option<usize>,
    pub reset_grace: Duration,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            target_count: DEFAULT_TARGET_COUNT,
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            rate_limit_margin: DEFAULT_SAFETY_MARGIN,
            connection_reset_retries: DEFAULT_CONNECTION_RESET_RETRIES,
            max_timeout_retries: None,
            reset_grace: DEFAULT_RESET_GRACE,
        }
    }
}

impl DiscoverySettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            connection_reset_retries: self.connection_reset_retries,
            max_timeout_retries: self.max_timeout_retries,
        }
    }

    pub fn rate_gate(&self) -> RateGate {
        RateGate::new(self.rate_limit_margin, self.reset_grace)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_count == 0 {
            return Err(anyhow::anyhow!("Invalid target-count: must be greater than 0"));
        }
        Ok(())
    }
}

/// Configuration manager
pub struct ConfigManager {
    config: Configuration,
    config_file_path: Option<PathBuf>,
    selected_section: Option<String>,
}

impl ConfigManager {
    /// Create a new ConfigManager from a Configuration (primarily for testing)
    pub fn from_config(config: Configuration) -> Self {
        Self {
            config,
            config_file_path: None,
            selected_section: None,
        }
    }

    /// Load configuration using discovery hierarchy
    pub fn load() -> Result<Self> {
        debug!("Starting configuration discovery");

        for path in discover_config_files() {
            debug!("Attempting to load config from: {}", path.display());
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        info!("No configuration file found, using defaults");
        Ok(Self::from_config(Configuration::new()))
    }

    /// Load configuration from explicit file path
    pub fn load_from_file(path: PathBuf) -> Result<Self> {
        debug!("Loading configuration from file: {}", path.display());

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = parse_toml_config(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!("Loaded configuration from: {}", path.display());
        Ok(Self {
            config,
            config_file_path: Some(path),
            selected_section: None,
        })
    }

    pub fn config_file_path(&self) -> Option<&PathBuf> {
        self.config_file_path.as_ref()
    }

    /// Get value from configuration with section fallback
    pub fn get_value(&self, section: &str, key: &str) -> Option<&String> {
        // Priority: selected_section -> specified section -> base
        if let Some(selected) = &self.selected_section {
            if let Some(value) = self.config.get(selected).and_then(|s| s.get(key)) {
                return Some(value);
            }
        }

        if let Some(value) = self.config.get(section).and_then(|s| s.get(key)) {
            return Some(value);
        }

        self.config.get("base").and_then(|s| s.get(key))
    }

    /// Select configuration section for --config-name
    pub fn select_section(&mut self, section: String) {
        debug!("Selecting configuration section: {}", section);
        self.selected_section = Some(section);
    }

    /// Get boolean value with type conversion
    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>> {
        match self.get_value(section, key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(anyhow::anyhow!("Invalid boolean value for {}.{}: {}", section, key, value)),
            },
            None => Ok(None),
        }
    }

    /// Get log level value with type conversion
    pub fn get_log_level(&self, section: &str, key: &str) -> Result<Option<log::LevelFilter>> {
        match self.get_value(section, key) {
            Some(value) => Ok(Some(crate::logging::parse_log_level(value)?)),
            None => Ok(None),
        }
    }

    /// Get path value with type conversion
    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.get_value(section, key).map(PathBuf::from)
    }

    /// Get a numeric value, parsed as `T`
    pub fn get_number<T>(&self, section: &str, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get_value(section, key) {
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .with_context(|| format!("Invalid {} value in config: {}", key, value)),
            None => Ok(None),
        }
    }

    /// Get an absolute or relative date
    pub fn get_date(&self, section: &str, key: &str) -> Result<Option<DateTime<Utc>>> {
        match self.get_value(section, key) {
            Some(value) => parse_date(value)
                .map(Some)
                .with_context(|| format!("Invalid {} value in config: {}", key, value)),
            None => Ok(None),
        }
    }

    /// Eligibility thresholds from `[criteria]`
    pub fn get_criteria(&self) -> Result<ValidationCriteria> {
        let mut criteria = ValidationCriteria::default();

        if let Some(n) = self.get_number("criteria", "min-contributors")? {
            criteria.min_contributors = n;
        }
        if let Some(n) = self.get_number("criteria", "min-commits-last-month")? {
            criteria.min_commits_last_month = n;
        }
        if let Some(n) = self.get_number("criteria", "min-total-commits")? {
            criteria.min_total_commits = n;
        }
        if let Some(n) = self.get_number("criteria", "min-files")? {
            criteria.min_files = n;
        }
        if let Some(date) = self.get_date("criteria", "last-month-cutoff")? {
            criteria.last_month_cutoff = date;
        }
        if let Some(n) = self.get_number("criteria", "page-probe-size")? {
            criteria.page_probe_size = n;
        }

        criteria.validate().context("Criteria configuration validation failed")?;
        Ok(criteria)
    }

    /// Search predicate from `[search]`
    pub fn get_search_query(&self) -> Result<SearchQuery> {
        let created_before = match self.get_date("search", "created-before")? {
            Some(date) => date,
            None => parse_date(DEFAULT_CREATED_BEFORE)?,
        };
        let text = |key: &str, default: &str| {
            self.get_value("search", key).cloned().unwrap_or_else(|| default.to_string())
        };

        Ok(SearchQuery {
            created_before,
            language: text("language", DEFAULT_LANGUAGE),
            sort: text("sort", "updated"),
            order: text("order", "desc"),
        })
    }

    /// Run settings from `[discovery]`
    pub fn get_discovery_settings(&self) -> Result<DiscoverySettings> {
        let mut settings = DiscoverySettings::default();

        if let Some(n) = self.get_number("discovery", "target-count")? {
            settings.target_count = n;
        }
        if let Some(path) = self.get_path("discovery", "output") {
            settings.output = path;
        }
        if let Some(n) = self.get_number("discovery", "rate-limit-margin")? {
            settings.rate_limit_margin = n;
        }
        if let Some(n) = self.get_number("discovery", "connection-reset-retries")? {
            settings.connection_reset_retries = n;
        }
        if let Some(n) = self.get_number("discovery", "max-timeout-retries")? {
            settings.max_timeout_retries = Some(n);
        }
        if let Some(secs) = self.get_number("discovery", "reset-grace-seconds")? {
            settings.reset_grace = Duration::from_secs(secs);
        }

        settings.validate().context("Discovery configuration validation failed")?;
        Ok(settings)
    }

    /// Client settings from `[github]`; the page size follows the probe size
    pub fn get_client_settings(&self, page_size: usize) -> Result<ClientSettings> {
        let mut settings = ClientSettings {
            page_size,
            ..ClientSettings::default()
        };

        if let Some(url) = self.get_value("github", "api-url") {
            settings.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = self.get_number::<u64>("github", "request-timeout-seconds")? {
            if secs == 0 {
                return Err(anyhow::anyhow!("Invalid request-timeout-seconds: must be greater than 0"));
            }
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(agent) = self.get_value("github", "user-agent") {
            settings.user_agent = agent.clone();
        }

        Ok(settings)
    }

    pub fn get_credentials_path(&self) -> PathBuf {
        self.get_path("github", "credentials-file")
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE))
    }
}

/// Discover configuration files in order of precedence
fn discover_config_files() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Environment variable $REPO_SCOUT_CONFIG
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        paths.push(PathBuf::from(env_path));
    }

    // 2. XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("repo-scout").join("config.toml"));
    }

    // 3. Home directory
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".repo-scout.toml"));
    }

    // 4. Project local
    paths.push(PathBuf::from("./.repo-scout.toml"));

    debug!("Config discovery paths: {:?}", paths);
    paths
}

/// Parse TOML content to string-based configuration
fn parse_toml_config(content: &str) -> Result<Configuration> {
    let toml_value: Value = content.parse().context("Failed to parse TOML content")?;

    let mut config = Configuration::new();
    if let Value::Table(table) = toml_value {
        flatten_toml_table(&table, String::new(), &mut config);
    }

    debug!("Parsed configuration: {:?}", config);
    Ok(config)
}

/// Recursively flatten TOML tables into section.subsection format
fn flatten_toml_table(table: &toml::Table, prefix: String, config: &mut Configuration) {
    for (key, value) in table {
        let section_name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            Value::Table(subtable) if subtable.values().all(|v| !v.is_table()) => {
                let section: HashMap<String, String> = subtable
                    .iter()
                    .map(|(k, v)| (k.clone(), toml_value_to_string(v)))
                    .collect();
                config.insert(section_name, section);
            }
            Value::Table(subtable) => flatten_toml_table(subtable, section_name, config),
            // Top-level keys land in [base]
            _ => {
                config
                    .entry("base".to_string())
                    .or_default()
                    .insert(key.clone(), toml_value_to_string(value));
            }
        }
    }
}

/// Convert TOML Value to string representation
fn toml_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Datetime(d) => d.to_string(),
        Value::Array(_) | Value::Table(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::NamedTempFile;

    fn manager_from(toml_content: &str) -> ConfigManager {
        ConfigManager::from_config(parse_toml_config(toml_content).unwrap())
    }

    #[test]
    fn test_toml_value_to_string_conversion() {
        assert_eq!(toml_value_to_string(&Value::String("Java".to_string())), "Java");
        assert_eq!(toml_value_to_string(&Value::Integer(50)), "50");
        assert_eq!(toml_value_to_string(&Value::Boolean(false)), "false");
    }

    #[test]
    fn test_parse_toml_config() {
        let config = parse_toml_config(
            r#"
log-format = "json"

[criteria]
min-files = 80

[profile.strict]
min-contributors = 25
"#,
        )
        .unwrap();

        assert_eq!(config["base"]["log-format"], "json");
        assert_eq!(config["criteria"]["min-files"], "80");
        assert_eq!(config["profile.strict"]["min-contributors"], "25");
    }

    #[test]
    fn test_value_fallback_order() {
        let mut manager = manager_from(
            r#"
[base]
min-files = "10"
log-format = "text"

[criteria]
min-files = "60"

[strict]
min-files = "200"
"#,
        );

        assert_eq!(manager.get_value("criteria", "min-files").unwrap(), "60");
        assert_eq!(manager.get_value("criteria", "log-format").unwrap(), "text");
        manager.select_section("strict".to_string());
        assert_eq!(manager.get_value("criteria", "min-files").unwrap(), "200");
    }

    #[test]
    fn test_type_conversion() {
        let manager = manager_from(
            r#"
[base]
debug = true
file-log-level = "debug"
bad-level = "loud"
bad-bool = "maybe"
"#,
        );

        assert_eq!(manager.get_bool("base", "debug").unwrap(), Some(true));
        assert!(manager.get_bool("base", "bad-bool").is_err());
        assert_eq!(manager.get_log_level("base", "file-log-level").unwrap(), Some(log::LevelFilter::Debug));
        assert!(manager.get_log_level("base", "bad-level").is_err());
        assert!(manager.get_bool("base", "missing").unwrap().is_none());
    }

    #[test]
    fn test_defaults_without_config() {
        let manager = ConfigManager::from_config(Configuration::new());

        assert_eq!(manager.get_criteria().unwrap(), ValidationCriteria::default());
        assert_eq!(manager.get_discovery_settings().unwrap(), DiscoverySettings::default());
        assert_eq!(manager.get_credentials_path(), PathBuf::from("../config"));

        let query = manager.get_search_query().unwrap();
        assert_eq!(query.qualifiers(), "created:<2016-04-22 language:Java");
        assert_eq!(query.sort, "updated");
        assert_eq!(query.order, "desc");

        let client = manager.get_client_settings(30).unwrap();
        assert_eq!(client.api_url, "https://api.github.com");
        assert_eq!(client.page_size, 30);
    }

    #[test]
    fn test_sections_from_file() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(
            &temp_file,
            r#"
[search]
language = "Kotlin"
created-before = "2018-01-01"

[criteria]
min-contributors = 5
last-month-cutoff = "2019-06-01"
page-probe-size = 100

[discovery]
target-count = 20
output = "out/candidates.json"
max-timeout-retries = 3
reset-grace-seconds = 2

[github]
api-url = "https://github.example.com/api/v3/"
request-timeout-seconds = 10
credentials-file = "/etc/repo-scout/credentials"
"#,
        )
        .unwrap();

        let manager = ConfigManager::load_from_file(temp_file.path().to_path_buf()).unwrap();
        assert_eq!(manager.config_file_path().unwrap(), temp_file.path());

        let criteria = manager.get_criteria().unwrap();
        assert_eq!(criteria.min_contributors, 5);
        assert_eq!(criteria.min_files, 50);
        assert_eq!(criteria.page_probe_size, 100);
        assert_eq!(criteria.last_month_cutoff, Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap());

        let query = manager.get_search_query().unwrap();
        assert_eq!(query.qualifiers(), "created:<2018-01-01 language:Kotlin");

        let discovery = manager.get_discovery_settings().unwrap();
        assert_eq!(discovery.target_count, 20);
        assert_eq!(discovery.output, PathBuf::from("out/candidates.json"));
        assert_eq!(discovery.retry_policy().max_timeout_retries, Some(3));
        assert_eq!(discovery.reset_grace, Duration::from_secs(2));

        let client = manager.get_client_settings(100).unwrap();
        assert_eq!(client.api_url, "https://github.example.com/api/v3");
        assert_eq!(client.request_timeout, Duration::from_secs(10));
        assert_eq!(manager.get_credentials_path(), PathBuf::from("/etc/repo-scout/credentials"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(manager_from("[criteria]\nmin-files = \"lots\"").get_criteria().is_err());
        assert!(manager_from("[criteria]\npage-probe-size = 0").get_criteria().is_err());
        assert!(manager_from("[criteria]\npage-probe-size = 250").get_criteria().is_err());
        assert!(manager_from("[criteria]\nlast-month-cutoff = \"someday\"").get_criteria().is_err());
        assert!(manager_from("[discovery]\ntarget-count = 0").get_discovery_settings().is_err());
        assert!(manager_from("[discovery]\nrate-limit-margin = -1").get_discovery_settings().is_err());
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let manager = manager_from("[github]\nrequest-timeout-seconds = 0");
        let err = manager.get_client_settings(30).unwrap_err();
        assert!(err.to_string().contains("request-timeout-seconds"));

        let manager = manager_from("[github]\nrequest-timeout-seconds = 1");
        assert_eq!(manager.get_client_settings(30).unwrap().request_timeout, Duration::from_secs(1));
    }
}
