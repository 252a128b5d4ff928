//! 类型定义模块
//!
//! 定义翻译请求、响应、供应商目录信息等在路由器和适配器之间流转的数据结构。

use crate::config::GlobalOptions;
use crate::error::{Result, TranslationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 自动检测源语言时使用的语言代码
pub const AUTO_LANGUAGE: &str = "auto";

/// 语气正式程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    Default,
    More,
    Less,
}

/// 翻译请求的附加选项
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationOptions {
    pub formality: Option<Formality>,
    /// 领域提示，例如 "legal"、"medical"
    pub domain: Option<String>,
    /// 供应商侧术语表 ID
    pub glossary: Option<String>,
    /// 调用方指定的优先供应商
    pub preferred_provider: Option<String>,
}

/// 翻译请求
///
/// 构造后不可变；需要补全默认值时使用 [`TranslationRequest::with_defaults`]
/// 生成新的请求。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTranslationRequest")]
pub struct TranslationRequest {
    text: String,
    source_lang: String,
    target_lang: String,
    options: TranslationOptions,
}

/// 反序列化时的原始形式，经 [`TranslationRequest::with_options`] 校验后才成为请求
#[derive(Deserialize)]
struct RawTranslationRequest {
    text: String,
    #[serde(default)]
    source_lang: String,
    target_lang: String,
    #[serde(default)]
    options: TranslationOptions,
}

impl TryFrom<RawTranslationRequest> for TranslationRequest {
    type Error = TranslationError;

    fn try_from(raw: RawTranslationRequest) -> Result<Self> {
        Self::with_options(raw.text, raw.source_lang, raw.target_lang, raw.options)
    }
}

impl TranslationRequest {
    /// 创建新的翻译请求
    ///
    /// 文本为空（或仅含空白）、目标语言为空或为 `auto` 时返回
    /// [`TranslationError::InvalidRequest`]。源语言为空时视为 `auto`。
    ///
    /// # 示例
    ///
    /// ```rust
    /// use translation_router::TranslationRequest;
    ///
    /// let request = TranslationRequest::new("hello", "en", "zh-CN").unwrap();
    /// assert_eq!(request.target_lang(), "zh-CN");
    /// ```
    pub fn new(
        text: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Result<Self> {
        Self::with_options(text, source_lang, target_lang, TranslationOptions::default())
    }

    pub fn with_options(
        text: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
        options: TranslationOptions,
    ) -> Result<Self> {
        let text = text.into();
        let mut source_lang = source_lang.into().trim().to_string();
        let target_lang = target_lang.into().trim().to_string();

        if text.trim().is_empty() {
            return Err(TranslationError::InvalidRequest(
                "text must not be empty".to_string(),
            ));
        }
        if target_lang.is_empty() || target_lang.eq_ignore_ascii_case(AUTO_LANGUAGE) {
            return Err(TranslationError::InvalidRequest(
                "target language must be a concrete language code".to_string(),
            ));
        }
        if source_lang.is_empty() {
            source_lang = AUTO_LANGUAGE.to_string();
        }

        Ok(Self {
            text,
            source_lang,
            target_lang,
            options,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    pub fn options(&self) -> &TranslationOptions {
        &self.options
    }

    pub fn is_auto_detect(&self) -> bool {
        self.source_lang.eq_ignore_ascii_case(AUTO_LANGUAGE)
    }

    /// 字符数（非字节数），用于用量统计
    pub fn char_count(&self) -> u64 {
        self.text.chars().count() as u64
    }

    /// 用全局默认值补全未设置的领域和正式程度，返回新的请求
    pub fn with_defaults(&self, defaults: &GlobalOptions) -> Self {
        let mut options = self.options.clone();
        if options.domain.is_none() {
            options.domain = defaults.domain.clone();
        }
        if options.formality.is_none() {
            options.formality = defaults.formality;
        }
        Self {
            options,
            ..self.clone()
        }
    }
}

/// 一次调用的用量
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub characters: u64,
    pub tokens: Option<u64>,
    pub cost: Option<f64>,
}

/// 翻译响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResponse {
    pub translated_text: String,
    pub detected_source_language: Option<String>,
    pub confidence: Option<f32>,
    /// 实际完成翻译的供应商 ID
    pub provider: String,
    pub timestamp: DateTime<Utc>,
    pub usage: Option<Usage>,
    #[serde(default)]
    pub cached: bool,
}

impl TranslationResponse {
    pub fn new(provider: impl Into<String>, translated_text: impl Into<String>) -> Self {
        Self {
            translated_text: translated_text.into(),
            detected_source_language: None,
            confidence: None,
            provider: provider.into(),
            timestamp: Utc::now(),
            usage: None,
            cached: false,
        }
    }

    pub fn detected(mut self, language: Option<String>, confidence: Option<f32>) -> Self {
        self.detected_source_language = language;
        self.confidence = confidence;
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// 返回一份标记为缓存命中的副本
    pub fn as_cached(&self) -> Self {
        Self {
            cached: true,
            ..self.clone()
        }
    }
}

/// 语言检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub language: String,
    pub confidence: f32,
}

/// 供应商类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderCategory {
    Traditional,
    Ai,
    Local,
}

/// 供应商静态目录信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub website: String,
    pub category: ProviderCategory,
    pub languages: Vec<String>,
    pub requires_api_key: bool,
    pub requires_secret: bool,
    pub requires_region: bool,
    pub pricing: String,
    pub features: Vec<String>,
}

/// 配置校验结果，校验本身从不失败
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub message: String,
}

impl ValidationResult {
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// 供应商报告的用量/额度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaInfo {
    pub used: u64,
    pub limit: Option<u64>,
    /// 计量单位，如 "characters"
    pub unit: String,
}

impl QuotaInfo {
    pub fn remaining(&self) -> Option<u64> {
        self.limit.map(|limit| limit.saturating_sub(self.used))
    }
}

/// 单个适配器调用的重试配置
///
/// 第 `n` 次重试前等待 `base_delay_ms * 2^n` 毫秒。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn delay_for(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt))
    }
}
