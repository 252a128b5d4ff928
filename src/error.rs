//! 错误处理模块
//!
//! 定义路由器和各翻译适配器共用的错误类型。

use thiserror::Error;

/// 翻译错误类型
///
/// 供应商相关的变体都携带供应商 ID 和一个与 HTTP 状态码对应的数字代码，
/// 以便调用方在回退链耗尽后仍能定位问题来源。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// 凭证无效或被拒绝（401/403）
    #[error("[{provider}] invalid credentials ({code}): {message}")]
    InvalidCredentials {
        provider: String,
        code: u16,
        message: String,
    },

    /// 配额或速率限制（429）
    #[error("[{provider}] quota exceeded ({code}): {message}")]
    QuotaExceeded {
        provider: String,
        code: u16,
        message: String,
    },

    /// 供应商不支持该语言对
    #[error("[{provider}] unsupported language pair: {source_lang} -> {target_lang}")]
    UnsupportedLanguagePair {
        provider: String,
        source_lang: String,
        target_lang: String,
    },

    /// 传输层失败
    #[error("[{provider}] network error: {message}")]
    Network { provider: String, message: String },

    /// 超过配置的请求时限
    #[error("[{provider}] request timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    /// 非 2xx 响应，附带供应商返回的信息
    #[error("[{provider}] server error {code}: {message}")]
    Server {
        provider: String,
        code: u16,
        message: String,
    },

    /// 响应体无法解析
    #[error("[{provider}] parse error: {message}")]
    Parse { provider: String, message: String },

    /// 注册表中不存在该供应商
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// 供应商已注册但未通过初始化校验
    #[error("provider not available: {0}")]
    ProviderUnavailable(String),

    /// 没有任何可用供应商支持该语言对
    #[error("no provider available for language pair {source_lang} -> {target_lang}")]
    NoProviderAvailable {
        source_lang: String,
        target_lang: String,
    },

    /// 回退链中没有任何候选真正执行过
    #[error("all providers failed")]
    AllProvidersFailed,

    /// 管理器尚未初始化
    #[error("translation manager is not initialized")]
    NotInitialized,

    /// 请求本身不合法
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// 配置错误
    #[error("configuration error: {0}")]
    Config(String),
}

impl TranslationError {
    /// 产生该错误的供应商 ID（编排层错误返回 `None`）
    pub fn provider(&self) -> Option<&str> {
        match self {
            TranslationError::InvalidCredentials { provider, .. }
            | TranslationError::QuotaExceeded { provider, .. }
            | TranslationError::UnsupportedLanguagePair { provider, .. }
            | TranslationError::Network { provider, .. }
            | TranslationError::Timeout { provider, .. }
            | TranslationError::Server { provider, .. }
            | TranslationError::Parse { provider, .. } => Some(provider),
            TranslationError::UnknownProvider(id) | TranslationError::ProviderUnavailable(id) => {
                Some(id)
            }
            _ => None,
        }
    }

    /// 与 HTTP 状态码对应的数字代码，`0` 表示没有 HTTP 语义（如传输失败）
    pub fn code(&self) -> u16 {
        match self {
            TranslationError::InvalidCredentials { code, .. }
            | TranslationError::QuotaExceeded { code, .. }
            | TranslationError::Server { code, .. } => *code,
            TranslationError::UnsupportedLanguagePair { .. }
            | TranslationError::InvalidRequest(_) => 400,
            TranslationError::Timeout { .. } => 408,
            TranslationError::UnknownProvider(_) => 404,
            TranslationError::ProviderUnavailable(_)
            | TranslationError::NoProviderAvailable { .. }
            | TranslationError::AllProvidersFailed
            | TranslationError::NotInitialized => 503,
            TranslationError::Parse { .. } => 502,
            TranslationError::Network { .. } | TranslationError::Config(_) => 0,
        }
    }

    /// 单个适配器调用内是否值得按指数退避重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TranslationError::Network { .. }
                | TranslationError::Timeout { .. }
                | TranslationError::Server { .. }
        )
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, TranslationError::InvalidCredentials { .. })
    }
}

/// 翻译结果类型别名
pub type Result<T> = std::result::Result<T, TranslationError>;
