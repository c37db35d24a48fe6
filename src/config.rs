use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Delay between two polls of the same feed, in minutes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    /// Per-request timeout, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub server: ServerConfig,
    pub feeds: Vec<String>,
}

fn default_refresh_interval() -> u64 {
    15
}

fn default_request_timeout() -> u64 {
    10
}

fn default_database_url() -> String {
    "sqlite:newsroom.db?mode=rwc".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:3000".to_string()
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse and check a config held in a TOML string.
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.refresh_interval == 0 {
            anyhow::bail!("refresh_interval must be at least one minute");
        }
        if config.request_timeout == 0 {
            anyhow::bail!("request_timeout must be at least one second");
        }
        Ok(config)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.refresh_interval * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        assert_eq!(default_refresh_interval(), 15);
        assert_eq!(default_request_timeout(), 10);
        assert_eq!(default_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            refresh_interval = 30
            request_timeout = 5
            database_url = "sqlite:test.db?mode=rwc"
            feeds = [
                "https://example.com/feed.xml",
                "https://example.org/rss",
            ]

            [server]
            address = "127.0.0.1:8080"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.refresh_interval, 30);
        assert_eq!(config.poll_period(), Duration::from_secs(1800));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.database_url, "sqlite:test.db?mode=rwc");
        assert_eq!(config.server.address, "127.0.0.1:8080");
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.feeds[0], "https://example.com/feed.xml");
    }

    #[test]
    fn test_load_config_with_defaults() {
        let content = r#"feeds = ["https://example.com/feed.xml"]"#;

        let config = Config::from_str(content).unwrap();

        assert_eq!(config.refresh_interval, 15);
        assert_eq!(config.request_timeout, 10);
        assert_eq!(config.database_url, "sqlite:newsroom.db?mode=rwc");
        assert_eq!(config.server.address, "0.0.0.0:3000");
        assert_eq!(config.feeds.len(), 1);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_missing_feeds() {
        let content = "refresh_interval = 5";

        let result = Config::from_str(content);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_feeds_list() {
        let content = "feeds = []";

        let config = Config::from_str(content).unwrap();
        assert!(config.feeds.is_empty());
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let content = r#"
            refresh_interval = 0
            feeds = ["https://example.com/feed.xml"]
        "#;
        assert!(Config::from_str(content).is_err());

        let content = r#"
            request_timeout = 0
            feeds = ["https://example.com/feed.xml"]
        "#;
        assert!(Config::from_str(content).is_err());
    }

    #[test]
    fn test_malformed_urls_are_kept_for_the_supervisor() {
        let content = r#"feeds = ["https://ok.example.com/rss", "not a url"]"#;

        let config = Config::from_str(content).unwrap();
        assert_eq!(config.feeds[1], "not a url");
    }
}
