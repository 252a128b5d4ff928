//! # Translation Router
//!
//! 在多个可互换的翻译供应商之间路由翻译请求，提供结果缓存、自动回退和用量统计。
//!
//! ## 主要特性
//!
//! - **统一适配器接口**: 每个供应商实现同一个 [`TranslationAdapter`] trait
//! - **固定优先级选择**: 调用方指定 → 语言对偏好 → 静态推荐 → 主供应商 → 任意可用供应商
//! - **有序回退**: 主供应商失败后按配置顺序尝试回退供应商
//! - **超时与重试**: 每次调用独立超时，瞬时错误按指数退避重试，凭证错误不重试
//! - **LRU + TTL 缓存**: 相同请求不重复计费
//! - **用量统计**: 按供应商统计请求、成功率、响应时间和字符/token/费用
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use translation_router::{AdapterConfig, ManagerConfig, TranslationManager, TranslationRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ManagerConfig::default().with_provider("google", AdapterConfig::default());
//!
//!     let mut manager = TranslationManager::default();
//!     manager.initialize(config).await;
//!
//!     let request = TranslationRequest::new("Hello, world!", "en", "zh-CN")?;
//!     let response = manager.translate(&request).await?;
//!     println!("Translation: {}", response.translated_text);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## 配置文件支持
//!
//! ```toml
//! primary_provider = "google"
//! fallback_providers = ["deepl"]
//!
//! [options]
//! auto_fallback = true
//! cache_enabled = true
//! retry_count = 3
//! timeout_ms = 30000
//!
//! [providers.google]
//! enabled = true
//!
//! [providers.deepl]
//! api_key = "your-key:fx"
//! ```

pub mod adapter;
pub mod cache;
pub mod config;
pub mod error;
pub mod manager;
pub mod providers;
pub mod registry;
pub mod stats;
pub mod types;

pub use adapter::TranslationAdapter;
pub use cache::{CacheStats, TranslationCache};
pub use config::{AdapterConfig, GlobalOptions, ManagerConfig, ProviderEntry};
pub use error::{Result, TranslationError};
pub use manager::{ManagerState, TranslationManager};
pub use registry::{AdapterConstructor, AdapterRegistry};
pub use stats::{ProviderStatsSnapshot, StatsAggregator, StatsSnapshot};
pub use types::{
    DetectionResult, Formality, ProviderCategory, ProviderInfo, QuotaInfo, RetryConfig,
    TranslationOptions, TranslationRequest, TranslationResponse, Usage, ValidationResult,
};
