use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::recommend::RecommendationRules;
use crate::risk::DEFAULT_RISK_THRESHOLD;

pub const DEFAULT_CONFIG_FILE: &str = "intelligrade.toml";
const ENV_PREFIX: &str = "INTELLIGRADE_";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Dashboard settings. Missing keys fall back to [`Config::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub risk_threshold: f64,
    pub auto_refresh: bool,
    pub refresh_interval_seconds: u64,
    pub theme: Theme,
    pub chart_animation: bool,
    pub include_charts: bool,
    pub enable_notifications: bool,
    pub notify_high_risk: bool,
    pub extended_recommendations: bool,
    pub api_base: Option<String>,
    pub predictor_base: Option<String>,
    pub predictor_timeout_ms: u64,
    pub http_timeout_seconds: u64,
    pub data_csv: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            risk_threshold: DEFAULT_RISK_THRESHOLD,
            auto_refresh: false,
            refresh_interval_seconds: 300,
            theme: Theme::Light,
            chart_animation: true,
            include_charts: true,
            enable_notifications: true,
            notify_high_risk: true,
            extended_recommendations: false,
            api_base: None,
            predictor_base: None,
            predictor_timeout_ms: 3000,
            http_timeout_seconds: 10,
            data_csv: PathBuf::from("data.csv"),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then the TOML file if present, then `INTELLIGRADE_*` variables.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.risk_threshold.is_finite(),
            "risk_threshold must be a finite number"
        );
        anyhow::ensure!(
            self.refresh_interval_seconds > 0,
            "refresh_interval_seconds must be positive"
        );
        anyhow::ensure!(
            self.http_timeout_seconds > 0,
            "http_timeout_seconds must be positive"
        );
        Ok(())
    }

    pub fn predictor_timeout(&self) -> Duration {
        Duration::from_millis(self.predictor_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }

    pub fn recommendation_rules(&self) -> RecommendationRules {
        RecommendationRules {
            extended: self.extended_recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.risk_threshold, 5.5);
        assert_eq!(config.theme, Theme::Light);
        assert!(config.include_charts);
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "risk_threshold = 6.0\ntheme = \"dark\"\nextended_recommendations = true\npredictor_base = \"http://127.0.0.1:8000\""
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.risk_threshold, 6.0);
        assert_eq!(config.theme, Theme::Dark);
        assert!(config.recommendation_rules().extended);
        assert_eq!(
            config.predictor_base.as_deref(),
            Some("http://127.0.0.1:8000")
        );
        assert_eq!(config.refresh_interval_seconds, 300);
    }

    #[test]
    fn rejects_zero_refresh_interval() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "refresh_interval_seconds = 0").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn rejects_zero_http_timeout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http_timeout_seconds = 0").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }
}
