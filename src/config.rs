use crate::classify::{Locale, MatchPolicy};
use crate::courier::fedex::MAX_TRACKING_NUMBERS_PER_REQUEST;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fedex: FedexConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FedexConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_auth_timeout")]
    pub auth_timeout_seconds: u64,

    #[serde(default = "default_track_timeout")]
    pub track_timeout_seconds: u64,

    #[serde(default = "default_fedex_locale")]
    pub locale: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Language of the narrative column.
    #[serde(default)]
    pub locale: Locale,

    #[serde(default)]
    pub status_match: MatchPolicy,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Where to find tracking numbers and client names in the uploaded sheet.
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_tracking_column")]
    pub tracking_column: usize,

    #[serde(default = "default_client_column")]
    pub client_column: usize,

    #[serde(default = "default_min_tracking_length")]
    pub min_tracking_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_base_url() -> String {
    "https://apis.fedex.com".to_string()
}

fn default_auth_timeout() -> u64 {
    30
}

fn default_track_timeout() -> u64 {
    60
}

fn default_fedex_locale() -> String {
    "en_US".to_string()
}

fn default_output_dir() -> String {
    std::env::temp_dir().to_string_lossy().into_owned()
}

fn default_batch_size() -> usize {
    MAX_TRACKING_NUMBERS_PER_REQUEST
}

fn default_tracking_column() -> usize {
    14
}

fn default_client_column() -> usize {
    2
}

fn default_min_tracking_length() -> usize {
    10
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for FedexConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: default_base_url(),
            auth_timeout_seconds: default_auth_timeout(),
            track_timeout_seconds: default_track_timeout(),
            locale: default_fedex_locale(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            locale: Locale::default(),
            status_match: MatchPolicy::default(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            tracking_column: default_tracking_column(),
            client_column: default_client_column(),
            min_tracking_length: default_min_tracking_length(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Load configuration from the given TOML file and environment variables
pub fn load(path: &Path) -> Result<Config, figment::Error> {
    Figment::new()
        .merge(Toml::file(path))
        // Use double-underscore nesting for snake_case keys
        .merge(Env::prefixed("TRACKREPORT_").split("__"))
        .extract()
}

/// Validate configuration and return a user-friendly error
pub fn validate(config: &Config) -> Result<(), String> {
    let fedex = &config.fedex;

    if fedex.client_id.as_deref().is_none_or(str::is_empty) {
        return Err("fedex.client_id is required".into());
    }

    if fedex.client_secret.as_deref().is_none_or(str::is_empty) {
        return Err("fedex.client_secret is required".into());
    }

    if fedex.auth_timeout_seconds == 0 || fedex.track_timeout_seconds == 0 {
        return Err("fedex timeouts must be greater than 0".into());
    }

    let batch_size = config.report.batch_size;
    if batch_size == 0 || batch_size > MAX_TRACKING_NUMBERS_PER_REQUEST {
        return Err(format!(
            "report.batch_size must be between 1 and {MAX_TRACKING_NUMBERS_PER_REQUEST}"
        ));
    }

    if config.input.min_tracking_length == 0 {
        return Err("input.min_tracking_length must be greater than 0".into());
    }

    Ok(())
}

/// A sanitized view of FedexConfig safe for logging
#[derive(Debug)]
#[allow(dead_code)]
pub struct SanitizedFedexConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub auth_timeout_seconds: u64,
    pub track_timeout_seconds: u64,
}

impl FedexConfig {
    pub fn sanitized_for_log(&self) -> SanitizedFedexConfig {
        SanitizedFedexConfig {
            base_url: self.base_url.clone(),
            client_id: self.client_id.clone().unwrap_or_else(|| "<not set>".into()),
            client_secret: if self.client_secret.is_some() {
                "******".into()
            } else {
                "<not set>".into()
            },
            auth_timeout_seconds: self.auth_timeout_seconds,
            track_timeout_seconds: self.track_timeout_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        let mut config = Config::default();
        config.fedex.client_id = Some("id".into());
        config.fedex.client_secret = Some("secret".into());
        config
    }

    #[test]
    fn defaults_match_fedex_limits() {
        let config = Config::default();
        assert_eq!(config.report.batch_size, 30);
        assert_eq!(config.input.tracking_column, 14);
        assert_eq!(config.input.client_column, 2);
        assert_eq!(config.input.min_tracking_length, 10);
        assert_eq!(config.fedex.base_url, "https://apis.fedex.com");
        assert_eq!(config.report.status_match, MatchPolicy::CaseSensitive);
    }

    #[test]
    fn credentials_are_required() {
        assert_eq!(
            validate(&Config::default()),
            Err("fedex.client_id is required".to_string())
        );
        assert!(validate(&configured()).is_ok());
    }

    #[test]
    fn batch_size_above_carrier_limit_is_rejected() {
        let mut config = configured();
        config.report.batch_size = 31;
        assert!(validate(&config).is_err());
        config.report.batch_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn secret_is_masked_for_logging() {
        let sanitized = configured().fedex.sanitized_for_log();
        assert_eq!(sanitized.client_secret, "******");
        assert_eq!(sanitized.client_id, "id");
    }

    #[test]
    fn load_reads_toml_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[fedex]\nclient_id = \"abc\"\n\n[report]\nlocale = \"es\"\nstatus_match = \"case_insensitive\"\n",
        )
        .unwrap();

        let config = load(&path).unwrap();

        assert_eq!(config.fedex.client_id.as_deref(), Some("abc"));
        assert_eq!(config.report.locale, Locale::Es);
        assert_eq!(config.report.status_match, MatchPolicy::CaseInsensitive);
        assert_eq!(config.web.port, 8000);
    }
}
