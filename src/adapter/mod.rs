//! 翻译适配器接口
//!
//! 每个外部翻译服务实现同一个 [`TranslationAdapter`] trait。
//! 超时、指数退避重试等共用行为放在 [`support`] 中，由各适配器在调用外围组合使用。

pub mod support;

use crate::config::AdapterConfig;
use crate::error::Result;
use crate::types::{
    DetectionResult, ProviderInfo, QuotaInfo, TranslationRequest, TranslationResponse,
    ValidationResult, AUTO_LANGUAGE,
};
use async_trait::async_trait;

/// 翻译供应商适配器
///
/// 适配器由注册表以单例形式共享，因此 `configure` 通过 `&self` 替换内部配置。
#[async_trait]
pub trait TranslationAdapter: Send + Sync {
    /// 保存凭证和选项，不做任何 I/O
    fn configure(&self, config: AdapterConfig);

    /// 当前配置的快照
    fn config(&self) -> AdapterConfig;

    fn provider_info(&self) -> ProviderInfo;

    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResponse>;

    async fn detect_language(&self, text: &str) -> Result<DetectionResult>;

    /// 先检查必需凭证，再做一次轻量的在线试调用；永不返回错误
    async fn validate_config(&self) -> ValidationResult {
        if let Some(missing) = support::missing_credential(&self.provider_info(), &self.config()) {
            return ValidationResult::invalid(missing);
        }
        match self.detect_language("Hello, world").await {
            Ok(_) => ValidationResult::valid("configuration is valid"),
            Err(e) => ValidationResult::invalid(e.to_string()),
        }
    }

    fn supported_languages(&self) -> Vec<String> {
        self.provider_info().languages
    }

    fn is_language_pair_supported(&self, source: &str, target: &str) -> bool {
        let languages = self.supported_languages();
        let supports = |code: &str| languages.iter().any(|l| l.eq_ignore_ascii_case(code));
        let source_ok = source.eq_ignore_ascii_case(AUTO_LANGUAGE) || supports(source);
        source_ok && supports(target)
    }

    /// 查询额度；不支持时返回 `Ok(None)`
    async fn quota(&self) -> Result<Option<QuotaInfo>> {
        Ok(None)
    }
}
