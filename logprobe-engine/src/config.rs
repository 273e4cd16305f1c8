//! Engine configuration
//!
//! Polling cadence plus connection settings for each backend. Only the
//! settings of the backend actually used need to be present.

use logprobe_client::{
    CloudWatchClient, CloudWatchConfig, ElasticsearchClient, LokiClient, LokiConfig, LokiPathStyle,
    RetryPolicy,
};
use std::sync::Arc;
use std::time::Duration;

use crate::error::VerifyError;
use crate::store::{Backend, CloudWatchStore, ElasticsearchStore, LogStore, LokiStore};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(180);
pub const MAX_POLL_TIMEOUT: Duration = Duration::from_secs(24 * 3600);
pub const DEFAULT_LOKI_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_LOKI_LOOKBACK: Duration = Duration::from_secs(3600);

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Pause between two attempts of one category check
    pub poll_interval: Duration,

    /// Total time allowed per category
    pub poll_timeout: Duration,

    pub aws_region: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    /// Overrides the regional CloudWatch Logs endpoint
    pub cloudwatch_endpoint: Option<String>,

    pub es_url: Option<String>,
    pub es_token: Option<String>,

    pub loki_url: Option<String>,
    pub loki_token: Option<String>,
    pub loki_org_id: Option<String>,
    pub loki_query_tags: Option<String>,
    /// Gateway (per-tenant path) or direct Loki
    pub loki_path_style: LokiPathStyle,
    /// HTTP attempts per Loki query, first one included
    pub loki_max_attempts: u32,
    /// How far back Loki queries look
    pub loki_lookback: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Creates a configuration with default timings and no backend settings
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            aws_region: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_session_token: None,
            cloudwatch_endpoint: None,
            es_url: None,
            es_token: None,
            loki_url: None,
            loki_token: None,
            loki_org_id: None,
            loki_query_tags: None,
            loki_path_style: LokiPathStyle::Gateway,
            loki_max_attempts: DEFAULT_LOKI_MAX_ATTEMPTS,
            loki_lookback: DEFAULT_LOKI_LOOKBACK,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - POLL_INTERVAL (seconds, default: 10)
    /// - POLL_TIMEOUT (seconds, default: 180)
    /// - AWS_REGION or AWS_DEFAULT_REGION
    /// - AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN
    /// - CLOUDWATCH_ENDPOINT
    /// - ES_URL, ES_TOKEN
    /// - LOKI_URL, LOKI_TOKEN, LOKI_ORG_ID, LOKI_QUERY_TAGS
    /// - LOKI_PATH_STYLE (gateway or direct, default: gateway)
    /// - LOKI_MAX_ATTEMPTS (default: 3)
    /// - LOKI_LOOKBACK (seconds, default: 3600)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with a custom variable source
    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|value| !value.trim().is_empty());
        let seconds = |key: &str, default: Duration| -> anyhow::Result<Duration> {
            match var(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| {
                        anyhow::anyhow!("{} must be a number of seconds, got {:?}", key, raw)
                    }),
                None => Ok(default),
            }
        };

        let loki_max_attempts = match var("LOKI_MAX_ATTEMPTS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| anyhow::anyhow!("LOKI_MAX_ATTEMPTS must be a number, got {:?}", raw))?,
            None => DEFAULT_LOKI_MAX_ATTEMPTS,
        };

        let loki_path_style = match var("LOKI_PATH_STYLE").map(|s| s.trim().to_ascii_lowercase()) {
            None => LokiPathStyle::Gateway,
            Some(style) if style == "gateway" => LokiPathStyle::Gateway,
            Some(style) if style == "direct" => LokiPathStyle::Direct,
            Some(other) => {
                anyhow::bail!("LOKI_PATH_STYLE must be gateway or direct, got {:?}", other)
            }
        };

        Ok(Self {
            poll_interval: seconds("POLL_INTERVAL", DEFAULT_POLL_INTERVAL)?,
            poll_timeout: seconds("POLL_TIMEOUT", DEFAULT_POLL_TIMEOUT)?,
            aws_region: var("AWS_REGION").or_else(|| var("AWS_DEFAULT_REGION")),
            aws_access_key_id: var("AWS_ACCESS_KEY_ID"),
            aws_secret_access_key: var("AWS_SECRET_ACCESS_KEY"),
            aws_session_token: var("AWS_SESSION_TOKEN"),
            cloudwatch_endpoint: var("CLOUDWATCH_ENDPOINT"),
            es_url: var("ES_URL"),
            es_token: var("ES_TOKEN"),
            loki_url: var("LOKI_URL"),
            loki_token: var("LOKI_TOKEN"),
            loki_org_id: var("LOKI_ORG_ID"),
            loki_query_tags: var("LOKI_QUERY_TAGS"),
            loki_path_style,
            loki_max_attempts,
            loki_lookback: seconds("LOKI_LOOKBACK", DEFAULT_LOKI_LOOKBACK)?,
        })
    }

    /// Sets the polling cadence
    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_timeout = timeout;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.poll_timeout < self.poll_interval {
            anyhow::bail!("poll_timeout must be at least poll_interval");
        }

        if self.poll_timeout > MAX_POLL_TIMEOUT {
            anyhow::bail!(
                "poll_timeout must be at most {} seconds",
                MAX_POLL_TIMEOUT.as_secs()
            );
        }

        for (name, url) in [
            ("cloudwatch_endpoint", &self.cloudwatch_endpoint),
            ("es_url", &self.es_url),
            ("loki_url", &self.loki_url),
        ] {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    anyhow::bail!("{} must start with http:// or https://", name);
                }
            }
        }

        if self.loki_max_attempts == 0 {
            anyhow::bail!("loki_max_attempts must be greater than 0");
        }

        Ok(())
    }

    /// CloudWatch settings; fails when region or credentials are missing
    pub fn cloudwatch_config(&self) -> Result<CloudWatchConfig, VerifyError> {
        let region = required(&self.aws_region, "AWS_REGION")?;
        let key = required(&self.aws_access_key_id, "AWS_ACCESS_KEY_ID")?;
        let secret = required(&self.aws_secret_access_key, "AWS_SECRET_ACCESS_KEY")?;

        let mut config = CloudWatchConfig::new(region, key, secret);
        if let Some(token) = &self.aws_session_token {
            config = config.with_session_token(token);
        }
        if let Some(endpoint) = &self.cloudwatch_endpoint {
            config = config.with_endpoint(endpoint);
        }
        Ok(config)
    }

    /// Loki settings; fails when no URL is set
    pub fn loki_config(&self) -> Result<LokiConfig, VerifyError> {
        let url = required(&self.loki_url, "LOKI_URL")?;

        let mut config = LokiConfig::new(url)
            .with_path_style(self.loki_path_style)
            .with_retry(RetryPolicy::new(self.loki_max_attempts));
        if let Some(token) = &self.loki_token {
            config = config.with_token(token);
        }
        if let Some(org_id) = &self.loki_org_id {
            config = config.with_org_id(org_id);
        }
        if let Some(tags) = &self.loki_query_tags {
            config = config.with_query_tags(tags);
        }
        Ok(config)
    }

    /// Builds the store for `backend` from these settings
    pub fn store(&self, backend: Backend) -> Result<Arc<dyn LogStore>, VerifyError> {
        let store: Arc<dyn LogStore> = match backend {
            Backend::CloudWatch => {
                let client = CloudWatchClient::new(self.cloudwatch_config()?)
                    .map_err(|e| VerifyError::Config(e.to_string()))?;
                Arc::new(CloudWatchStore::new(client))
            }
            Backend::Elasticsearch => {
                let url = required(&self.es_url, "ES_URL")?;
                let client = ElasticsearchClient::http(url, self.es_token.clone());
                Arc::new(ElasticsearchStore::new(client))
            }
            Backend::Loki => {
                let client = LokiClient::new(self.loki_config()?);
                Arc::new(LokiStore::new(client).with_lookback(self.loki_lookback))
            }
            Backend::Memory => {
                return Err(VerifyError::Config(
                    "the in-memory store cannot be built from configuration".to_string(),
                ));
            }
        };
        Ok(store)
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, VerifyError> {
    value
        .as_deref()
        .ok_or_else(|| VerifyError::Config(format!("{} is not set", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.poll_timeout, Duration::from_secs(180));
        assert_eq!(config.loki_max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_vars() {
        let config = Config::from_vars(vars(&[
            ("POLL_INTERVAL", "2"),
            ("POLL_TIMEOUT", "30"),
            ("AWS_DEFAULT_REGION", "us-east-2"),
            ("LOKI_URL", "https://lokistack-gateway:8080"),
            ("LOKI_MAX_ATTEMPTS", "5"),
            ("LOKI_PATH_STYLE", "Direct"),
            ("ES_TOKEN", ""),
        ]))
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.poll_timeout, Duration::from_secs(30));
        assert_eq!(config.aws_region.as_deref(), Some("us-east-2"));
        assert_eq!(config.loki_max_attempts, 5);
        assert_eq!(config.loki_path_style, LokiPathStyle::Direct);
        assert_eq!(config.es_token, None);
    }

    #[test]
    fn test_from_vars_rejects_bad_numbers() {
        assert!(Config::from_vars(vars(&[("POLL_TIMEOUT", "soon")])).is_err());
        assert!(Config::from_vars(vars(&[("LOKI_PATH_STYLE", "sideways")])).is_err());
    }

    #[test]
    fn test_validate() {
        let zero = Config::new().with_polling(Duration::ZERO, Duration::from_secs(1));
        assert!(zero.validate().is_err());

        let short = Config::new().with_polling(Duration::from_secs(10), Duration::from_secs(5));
        assert!(short.validate().is_err());

        let huge =
            Config::new().with_polling(Duration::from_secs(10), Duration::from_secs(u64::MAX));
        assert!(huge.validate().is_err());

        let day = Config::new().with_polling(Duration::from_secs(10), MAX_POLL_TIMEOUT);
        assert!(day.validate().is_ok());

        let mut bad_url = Config::new();
        bad_url.es_url = Some("elasticsearch:9200".to_string());
        assert!(bad_url.validate().is_err());
    }

    #[test]
    fn test_cloudwatch_requires_credentials() {
        let mut config = Config::new();
        config.aws_region = Some("us-east-1".to_string());
        config.aws_access_key_id = Some("AKIDEXAMPLE".to_string());
        let err = config.cloudwatch_config().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("AWS_SECRET_ACCESS_KEY"));

        config.aws_secret_access_key = Some("secret".to_string());
        assert!(config.store(Backend::CloudWatch).is_ok());
    }

    #[test]
    fn test_store_for_backend() {
        let mut config = Config::new();
        assert!(config.store(Backend::Elasticsearch).is_err());

        config.es_url = Some("https://elasticsearch:9200".to_string());
        config.loki_url = Some("https://lokistack-gateway:8080".to_string());
        assert_eq!(
            config.store(Backend::Elasticsearch).unwrap().backend(),
            Backend::Elasticsearch
        );
        assert_eq!(config.store(Backend::Loki).unwrap().backend(), Backend::Loki);
        assert!(config.store(Backend::Memory).is_err());
    }
}
