//! 适配器共用行为
//!
//! 超时控制、带指数退避的重试、HTTP 状态分类和凭证检查。
//! 这些函数以组合方式包在每次外部调用的外围，不依赖适配器的继承状态。

use crate::config::AdapterConfig;
use crate::error::{Result, TranslationError};
use crate::types::{ProviderInfo, RetryConfig};
use reqwest::{Client, Response};
use std::future::Future;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::sleep;

/// 适配器内部的可替换配置
///
/// 适配器实例在注册表中共享，`configure` 只能通过共享引用替换配置。
#[derive(Debug, Default)]
pub struct ConfigSlot {
    inner: RwLock<AdapterConfig>,
}

impl ConfigSlot {
    pub fn replace(&self, config: AdapterConfig) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = config;
    }

    pub fn snapshot(&self) -> AdapterConfig {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// 创建适配器使用的 HTTP 客户端
///
/// 超时由 [`with_timeout`] 按每次调用控制，这里只设置连接池参数。
pub fn build_client(provider: &str) -> Result<Client> {
    Client::builder()
        .pool_idle_timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(5)
        .tcp_keepalive(Duration::from_secs(60))
        .user_agent(concat!("translation-router/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            TranslationError::Config(format!("failed to build HTTP client for {}: {}", provider, e))
        })
}

/// 为一次调用加上硬超时
///
/// 超时后丢弃进行中的 future（连同底层请求），并转换为 [`TranslationError::Timeout`]。
pub async fn with_timeout<T, Fut>(provider: &str, timeout: Duration, future: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(TranslationError::Timeout {
            provider: provider.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// 带指数退避的重试机制
///
/// 第 `n` 次失败后等待 `base_delay_ms * 2^n`。只有网络、超时和服务端错误会重试，
/// 凭证错误等其他错误立即返回。
///
/// # 参数
///
/// * `provider` - 供应商 ID，仅用于日志
/// * `config` - 重试配置
/// * `operation` - 每次尝试都会重新调用的异步操作
pub async fn retry_with_backoff<F, Fut, T>(
    provider: &str,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() || attempt + 1 >= attempts => return Err(e),
            Err(e) => {
                let delay = config.delay_for(attempt);
                tracing::warn!(
                    provider,
                    attempt = attempt + 1,
                    delay_ms = delay,
                    "request failed: {}; retrying",
                    e
                );
                sleep(Duration::from_millis(delay)).await;
                attempt += 1;
            }
        }
    }
}

/// 按适配器配置执行一次外部调用：每次尝试独立计时，失败按退避策略重试
pub async fn execute<F, Fut, T>(provider: &str, config: &AdapterConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let timeout = config.timeout();
    retry_with_backoff(provider, &config.retry(), || {
        with_timeout(provider, timeout, operation())
    })
    .await
}

/// 把传输层错误转换为带供应商 ID 的错误
pub fn transport_error(provider: &str, error: reqwest::Error) -> TranslationError {
    if let Some(status) = error.status() {
        return status_error(provider, status.as_u16(), error.to_string());
    }
    TranslationError::Network {
        provider: provider.to_string(),
        message: error.to_string(),
    }
}

/// 按 HTTP 状态码分类错误
pub fn status_error(provider: &str, status: u16, message: impl Into<String>) -> TranslationError {
    let provider = provider.to_string();
    let message = message.into();
    match status {
        401 | 403 => TranslationError::InvalidCredentials {
            provider,
            code: status,
            message,
        },
        // DeepL 用 456 表示额度耗尽
        429 | 456 => TranslationError::QuotaExceeded {
            provider,
            code: status,
            message,
        },
        // 408/504 保留状态码和响应体，仍按服务端错误重试
        _ => TranslationError::Server {
            provider,
            code: status,
            message,
        },
    }
}

/// 非 2xx 响应转换为分类后的错误，错误信息取响应体
pub async fn ensure_success(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error body".to_string());
    let message = if body.trim().is_empty() {
        status.to_string()
    } else {
        body
    };
    Err(status_error(provider, status.as_u16(), message))
}

/// 读取并解析 JSON 响应体
pub async fn read_json<T: serde::de::DeserializeOwned>(provider: &str, response: Response) -> Result<T> {
    let response = ensure_success(provider, response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| TranslationError::Parse {
            provider: provider.to_string(),
            message: e.to_string(),
        })
}

/// 根据目录信息检查必需凭证，缺失时返回说明
pub fn missing_credential(info: &ProviderInfo, config: &AdapterConfig) -> Option<String> {
    if info.requires_api_key && config.api_key().is_none() {
        return Some(format!("{} requires an API key", info.name));
    }
    if info.requires_secret && config.api_secret().is_none() {
        return Some(format!("{} requires an API secret", info.name));
    }
    if info.requires_region && config.region().is_none() {
        return Some(format!("{} requires a region", info.name));
    }
    None
}

/// 缺失凭证时直接返回凭证错误，避免发起注定失败的请求
pub fn require_api_key<'a>(provider: &str, config: &'a AdapterConfig) -> Result<&'a str> {
    config
        .api_key()
        .ok_or_else(|| TranslationError::InvalidCredentials {
            provider: provider.to_string(),
            code: 401,
            message: "API key is not configured".to_string(),
        })
}
