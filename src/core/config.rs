use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Both sources are fixed, well-known hosts whose certificate chains are
    /// frequently broken. Set to `false` to enforce verification.
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: BROWSER_USER_AGENT.to_string(),
            accept_invalid_certs: true,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct OfficialSourceConfig {
    pub name: String,
    pub url: String,
}

impl Default for OfficialSourceConfig {
    fn default() -> Self {
        Self {
            name: "BCV".to_string(),
            url: "https://www.bcv.org.ve/".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct P2pSourceConfig {
    pub name: String,
    pub primary_url: String,
    pub fallback_url: String,
    pub asset: String,
    pub fiat: String,
    pub trade_type: String,
    pub rows: u32,
}

impl Default for P2pSourceConfig {
    fn default() -> Self {
        Self {
            name: "USDT".to_string(),
            primary_url: "https://p2p.binance.com/bapi/c2c/v2/friendly/c2c/adv/search".to_string(),
            fallback_url: "https://c2c.binance.com/bapi/c2c/v2/friendly/c2c/adv/search".to_string(),
            asset: "USDT".to_string(),
            fiat: "VES".to_string(),
            trade_type: "SELL".to_string(),
            rows: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct SourcesConfig {
    pub official: OfficialSourceConfig,
    pub p2p: P2pSourceConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub tick_interval_secs: u64,
    pub target_hours: BTreeSet<u32>,
    pub database_path: Option<String>,
    pub http: HttpConfig,
    pub sources: SourcesConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 180,
            target_hours: BTreeSet::from([5, 13]),
            database_path: None,
            http: HttpConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to built-in
    /// defaults when no file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("ve", "ratewatch", "ratewatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.database_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("ve", "ratewatch", "ratewatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("rates.db"))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_secs == 0 {
            bail!("tick_interval_secs must be greater than zero");
        }
        if let Some(hour) = self.target_hours.iter().find(|h| **h >= 24) {
            bail!("target hour {hour} is out of range (0-23)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_empty_document() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");
        assert_eq!(config.tick_interval_secs, 180);
        assert_eq!(config.target_hours, BTreeSet::from([5, 13]));
        assert_eq!(config.http.timeout_secs, 10);
        assert!(config.http.accept_invalid_certs);
        assert_eq!(config.sources.official.name, "BCV");
        assert_eq!(config.sources.p2p.trade_type, "SELL");
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
tick_interval_secs: 60
target_hours: [5, 9, 13]
database_path: "/tmp/rates.db"
http:
  accept_invalid_certs: false
sources:
  official:
    url: "http://example.com/bcv"
  p2p:
    name: "P2P"
    primary_url: "http://example.com/a"
    fallback_url: "http://example.com/b"
    rows: 20
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.tick_interval(), Duration::from_secs(60));
        assert_eq!(config.target_hours, BTreeSet::from([5, 9, 13]));
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/rates.db")
        );
        assert!(!config.http.accept_invalid_certs);
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.sources.official.url, "http://example.com/bcv");
        assert_eq!(config.sources.official.name, "BCV");
        assert_eq!(config.sources.p2p.name, "P2P");
        assert_eq!(config.sources.p2p.rows, 20);
        assert_eq!(config.sources.p2p.fiat, "VES");
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.target_hours.insert(24);
        assert!(config.validate().unwrap_err().to_string().contains("24"));

        let config = AppConfig {
            tick_interval_secs: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_path_rejects_invalid_hours() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "target_hours: [5, 30]\n").unwrap();
        let result = AppConfig::load_from_path(file.path());
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .starts_with("Invalid config file")
        );
    }
}
