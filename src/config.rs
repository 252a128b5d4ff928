//! 配置管理模块
//!
//! 提供适配器凭证配置、管理器配置，以及 TOML 配置文件的读取、写入和自动发现。

use crate::types::{Formality, RetryConfig};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 单个供应商的凭证与调用参数
///
/// 通用字段强类型化，真正供应商特有的字段放在 `extra` 中。
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub region: Option<String>,
    pub model: Option<String>,
    /// 覆盖默认的 API 地址
    pub endpoint: Option<String>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub extra: BTreeMap<String, String>,
}

impl AdapterConfig {
    pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        non_blank(&self.api_key)
    }

    pub fn api_secret(&self) -> Option<&str> {
        non_blank(&self.api_secret)
    }

    pub fn region(&self) -> Option<&str> {
        non_blank(&self.region)
    }

    pub fn model(&self) -> Option<&str> {
        non_blank(&self.model)
    }

    pub fn endpoint(&self) -> Option<&str> {
        non_blank(&self.endpoint)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(Self::DEFAULT_TIMEOUT_MS))
    }

    pub fn retry(&self) -> RetryConfig {
        let defaults = RetryConfig::default();
        RetryConfig {
            max_attempts: self.max_retries.unwrap_or(defaults.max_attempts).max(1),
            base_delay_ms: self.retry_base_delay_ms.unwrap_or(defaults.base_delay_ms),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn redact(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

impl fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &redact(&self.api_secret))
            .field("region", &self.region)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn default_true() -> bool {
    true
}

/// 管理器配置中的单个供应商条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub config: AdapterConfig,
}

impl ProviderEntry {
    pub fn enabled(config: AdapterConfig) -> Self {
        Self {
            enabled: true,
            config,
        }
    }

    pub fn disabled(config: AdapterConfig) -> Self {
        Self {
            enabled: false,
            config,
        }
    }
}

/// 全局选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalOptions {
    pub auto_fallback: bool,
    pub cache_enabled: bool,
    pub retry_count: u32,
    pub timeout_ms: u64,
    pub cache_max_size: usize,
    pub cache_ttl_secs: u64,
    pub domain: Option<String>,
    pub formality: Option<Formality>,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            auto_fallback: true,
            cache_enabled: true,
            retry_count: 3,
            timeout_ms: AdapterConfig::DEFAULT_TIMEOUT_MS,
            cache_max_size: 1000,
            cache_ttl_secs: 24 * 60 * 60,
            domain: None,
            formality: None,
        }
    }
}

impl GlobalOptions {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn default_primary() -> String {
    "google".to_string()
}

/// 管理器配置
///
/// 在 `initialize` 时整体传入，重新配置时整体替换，不做局部修改。
///
/// # 示例
///
/// ```toml
/// primary_provider = "google"
/// fallback_providers = ["deepl"]
///
/// [options]
/// auto_fallback = true
/// cache_enabled = true
///
/// [providers.google]
/// enabled = true
///
/// [providers.deepl]
/// enabled = true
/// api_key = "xxxx:fx"
///
/// [language_pair_preferences]
/// "en-ja" = "deepl"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default = "default_primary")]
    pub primary_provider: String,
    #[serde(default)]
    pub fallback_providers: Vec<String>,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderEntry>,
    #[serde(default)]
    pub options: GlobalOptions,
    /// 键为 `"{source}-{target}"`
    #[serde(default)]
    pub language_pair_preferences: HashMap<String, String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            primary_provider: default_primary(),
            fallback_providers: Vec::new(),
            providers: BTreeMap::new(),
            options: GlobalOptions::default(),
            language_pair_preferences: HashMap::new(),
        }
    }
}

impl ManagerConfig {
    /// 添加一个已启用的供应商（构建配置时的便捷方法）
    pub fn with_provider(mut self, id: impl Into<String>, config: AdapterConfig) -> Self {
        self.providers.insert(id.into(), ProviderEntry::enabled(config));
        self
    }

    pub fn pair_preference(&self, source: &str, target: &str) -> Option<&str> {
        self.language_pair_preferences
            .get(&format!("{}-{}", source, target))
            .map(String::as_str)
    }

    /// 合并全局超时与重试次数后的适配器配置
    ///
    /// 供应商自己的设置优先；未配置的供应商得到仅含全局值的配置。
    pub fn adapter_config_for(&self, id: &str) -> AdapterConfig {
        let mut config = self
            .providers
            .get(id)
            .map(|entry| entry.config.clone())
            .unwrap_or_default();
        if config.timeout_ms.is_none() {
            config.timeout_ms = Some(self.options.timeout_ms);
        }
        if config.max_retries.is_none() {
            config.max_retries = Some(self.options.retry_count);
        }
        config
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: ManagerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from multiple possible locations
    pub fn load_from_default_locations() -> Self {
        let possible_paths = [
            "translation-router.toml",
            "config.toml",
            ".translation-router.toml",
        ];

        for path in &possible_paths {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from: {}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Self::default()
    }

    /// Generate example configuration file
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
        let example_config = Self {
            fallback_providers: vec!["deepl".to_string()],
            ..Self::default()
        }
        .with_provider("google", AdapterConfig::default())
        .with_provider("deepl", AdapterConfig::with_api_key("your-deepl-key:fx"));
        example_config.save_to_file(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml_with_defaults() {
        let raw = r#"
            primary_provider = "deepl"
            fallback_providers = ["google"]

            [options]
            auto_fallback = false

            [providers.deepl]
            api_key = "secret:fx"
            timeout_ms = 5000

            [providers.google]
            enabled = false

            [language_pair_preferences]
            "en-ja" = "deepl"
        "#;
        let config: ManagerConfig = toml::from_str(raw).unwrap();

        assert_eq!(config.primary_provider, "deepl");
        assert!(!config.options.auto_fallback);
        assert!(config.options.cache_enabled);
        assert_eq!(config.options.cache_max_size, 1000);
        assert!(config.providers["deepl"].enabled);
        assert!(!config.providers["google"].enabled);
        assert_eq!(config.providers["deepl"].config.api_key(), Some("secret:fx"));
        assert_eq!(config.pair_preference("en", "ja"), Some("deepl"));
        assert_eq!(config.pair_preference("ja", "en"), None);
    }

    #[test]
    fn adapter_config_inherits_global_timeout_and_retries() {
        let mut config = ManagerConfig::default().with_provider(
            "deepl",
            AdapterConfig {
                timeout_ms: Some(1234),
                ..AdapterConfig::default()
            },
        );
        config.options.retry_count = 5;

        let deepl = config.adapter_config_for("deepl");
        assert_eq!(deepl.timeout_ms, Some(1234));
        assert_eq!(deepl.max_retries, Some(5));

        let unknown = config.adapter_config_for("openai");
        assert_eq!(unknown.timeout_ms, Some(AdapterConfig::DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let config = AdapterConfig::with_api_key("   ");
        assert_eq!(config.api_key(), None);
        assert!(!format!("{:?}", AdapterConfig::with_api_key("top-secret")).contains("top-secret"));
    }

    #[test]
    fn retry_count_is_at_least_one_attempt() {
        let config = AdapterConfig {
            max_retries: Some(0),
            ..AdapterConfig::default()
        };
        assert_eq!(config.retry().max_attempts, 1);
    }
}
