//! 翻译管理器
//!
//! 根据固定的优先级选择供应商，按顺序回退执行翻译，并负责结果缓存和用量统计。
//!
//! # 示例
//!
//! ```rust,no_run
//! use translation_router::{AdapterConfig, ManagerConfig, TranslationManager, TranslationRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ManagerConfig {
//!         fallback_providers: vec!["deepl".to_string()],
//!         ..ManagerConfig::default()
//!     }
//!     .with_provider("google", AdapterConfig::default())
//!     .with_provider("deepl", AdapterConfig::with_api_key("your-key:fx"));
//!
//!     let mut manager = TranslationManager::default();
//!     manager.initialize(config).await;
//!
//!     let request = TranslationRequest::new("Hello, world!", "en", "zh-CN")?;
//!     let response = manager.translate(&request).await?;
//!     println!("{} ({})", response.translated_text, response.provider);
//!     Ok(())
//! }
//! ```

use crate::adapter::TranslationAdapter;
use crate::cache::{CacheStats, TranslationCache};
use crate::config::ManagerConfig;
use crate::error::{Result, TranslationError};
use crate::registry::AdapterRegistry;
use crate::stats::{ProviderStatsSnapshot, StatsAggregator, StatsSnapshot};
use crate::types::{
    DetectionResult, ProviderInfo, QuotaInfo, TranslationRequest, TranslationResponse,
    ValidationResult,
};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// 管理器生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ManagerState {
    Uninitialized,
    Initializing,
    Ready,
}

/// 已配置并通过校验的供应商
struct ActiveProvider {
    id: String,
    adapter: Arc<dyn TranslationAdapter>,
}

pub struct TranslationManager {
    registry: AdapterRegistry,
    config: ManagerConfig,
    state: ManagerState,
    providers: Vec<ActiveProvider>,
    cache: Mutex<TranslationCache>,
    stats: Mutex<StatsAggregator>,
}

impl Default for TranslationManager {
    fn default() -> Self {
        Self::new(AdapterRegistry::with_builtin_providers())
    }
}

impl TranslationManager {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self {
            registry,
            config: ManagerConfig::default(),
            state: ManagerState::Uninitialized,
            providers: Vec::new(),
            cache: Mutex::new(TranslationCache::default()),
            stats: Mutex::new(StatsAggregator::new()),
        }
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// 用新配置（重新）初始化
    ///
    /// 每个启用的供应商都会被创建并校验；校验失败的供应商只记录日志并跳过，
    /// 即使最终没有任何可用供应商，管理器也会进入 `Ready`。
    /// 缓存按新配置的容量和 TTL 重建，统计数据保留。
    pub async fn initialize(&mut self, config: ManagerConfig) {
        self.state = ManagerState::Initializing;
        self.config = config;
        self.providers.clear();
        *self.cache.get_mut() =
            TranslationCache::new(self.config.options.cache_max_size, self.config.options.cache_ttl());

        let enabled: Vec<String> = self
            .config
            .providers
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(id, _)| id.clone())
            .collect();

        for id in enabled {
            let adapter = match self.registry.create(&id, self.config.adapter_config_for(&id)) {
                Ok(adapter) => adapter,
                Err(e) => {
                    tracing::warn!(provider = %id, "skipping provider: {}", e);
                    continue;
                }
            };

            let validation = adapter.validate_config().await;
            if validation.valid {
                tracing::debug!(provider = %id, "provider ready");
                self.providers.push(ActiveProvider { id, adapter });
            } else {
                tracing::warn!(provider = %id, "provider failed validation: {}", validation.message);
            }
        }

        self.state = ManagerState::Ready;
        tracing::info!(
            providers = self.providers.len(),
            primary = %self.config.primary_provider,
            "translation manager initialized"
        );
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            ManagerState::Ready => Ok(()),
            _ => Err(TranslationError::NotInitialized),
        }
    }

    fn adapter(&self, id: &str) -> Option<&Arc<dyn TranslationAdapter>> {
        self.providers
            .iter()
            .find(|provider| provider.id == id)
            .map(|provider| &provider.adapter)
    }

    /// 在工作集中且支持该语言对的适配器
    fn usable(&self, id: &str, source: &str, target: &str) -> Option<&Arc<dyn TranslationAdapter>> {
        self.adapter(id)
            .filter(|adapter| adapter.is_language_pair_supported(source, target))
    }

    /// 按固定优先级选择供应商，第一个可用者胜出：
    ///
    /// 1. 请求中指定的优先供应商
    /// 2. 配置中的语言对偏好
    /// 3. 注册表的静态推荐
    /// 4. 主供应商
    /// 5. 工作集中第一个支持该语言对的供应商
    pub fn select_provider(&self, request: &TranslationRequest) -> Result<String> {
        let (source, target) = (request.source_lang(), request.target_lang());

        let ranked = [
            request.options().preferred_provider.as_deref(),
            self.config.pair_preference(source, target),
            Some(self.registry.recommend(source, target)),
            Some(self.config.primary_provider.as_str()),
        ];
        if let Some(id) = ranked
            .into_iter()
            .flatten()
            .find(|id| self.usable(id, source, target).is_some())
        {
            return Ok(id.to_string());
        }

        self.providers
            .iter()
            .find(|provider| provider.adapter.is_language_pair_supported(source, target))
            .map(|provider| provider.id.clone())
            .ok_or_else(|| TranslationError::NoProviderAvailable {
                source_lang: source.to_string(),
                target_lang: target.to_string(),
            })
    }

    /// 从 `primary` 开始依次尝试候选供应商
    ///
    /// 只有开启自动回退时才会尝试配置的回退列表；关闭时第一个错误直接返回。
    async fn translate_with_fallback(
        &self,
        primary: &str,
        request: &TranslationRequest,
    ) -> Result<TranslationResponse> {
        let auto_fallback = self.config.options.auto_fallback;
        let mut candidates = vec![primary];
        if auto_fallback {
            for id in &self.config.fallback_providers {
                if !candidates.contains(&id.as_str()) {
                    candidates.push(id);
                }
            }
        }

        let mut last_error = None;
        for id in candidates {
            let Some(adapter) = self.usable(id, request.source_lang(), request.target_lang()) else {
                tracing::debug!(provider = %id, "fallback candidate unavailable for this pair");
                continue;
            };

            match adapter.translate(request).await {
                Ok(mut response) => {
                    if id != primary {
                        tracing::info!(provider = %id, primary = %primary, "served by fallback provider");
                    }
                    if response.provider != id {
                        response.provider = id.to_string();
                    }
                    return Ok(response);
                }
                Err(e) => {
                    tracing::warn!(provider = %id, "translation failed: {}", e);
                    if !auto_fallback {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(TranslationError::AllProvidersFailed))
    }

    /// 翻译文本
    ///
    /// 缓存命中时直接返回标记为 `cached` 的结果，不发起外部调用；
    /// 否则选择供应商并按回退链执行，成功后写入缓存和统计。
    /// 最终失败计入最初选中的供应商并原样返回给调用方。
    pub async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResponse> {
        self.ensure_ready()?;
        let request = request.with_defaults(&self.config.options);
        let (text, source, target) = (request.text(), request.source_lang(), request.target_lang());
        let cache_enabled = self.config.options.cache_enabled;

        if cache_enabled {
            let hit = self.cache.lock().await.get(text, source, target);
            if let Some(response) = hit {
                tracing::debug!(provider = %response.provider, "cache hit");
                self.stats.lock().await.record_cache_hit();
                return Ok(response.as_cached());
            }
        }

        let provider = self.select_provider(&request)?;
        tracing::debug!(provider = %provider, source, target, "selected provider");

        let started = Instant::now();
        match self.translate_with_fallback(&provider, &request).await {
            Ok(response) => {
                let elapsed = started.elapsed().as_millis() as u64;
                if cache_enabled {
                    self.cache.lock().await.set(text, source, target, response.clone());
                }
                let mut stats = self.stats.lock().await;
                stats.record_response_time(&response.provider, elapsed);
                stats.record_success(&response);
                Ok(response)
            }
            Err(e) => {
                self.stats.lock().await.record_failure(&provider, &e);
                Err(e)
            }
        }
    }

    /// 同一请求并发发给多个供应商
    ///
    /// 各分支互不影响；结果只包含成功的供应商，不可用或不支持该语言对的供应商直接跳过。
    /// 每个分支的结果都会独立计入统计，与之后的 `translate` 调用不做去重。
    pub async fn parallel_translate(
        &self,
        request: &TranslationRequest,
        provider_ids: &[String],
    ) -> Result<HashMap<String, TranslationResponse>> {
        self.ensure_ready()?;
        let request = request.with_defaults(&self.config.options);
        let request = &request;

        let mut seen: Vec<&str> = Vec::new();
        let mut branches = Vec::new();
        for id in provider_ids {
            if seen.contains(&id.as_str()) {
                continue;
            }
            seen.push(id);
            match self.usable(id, request.source_lang(), request.target_lang()) {
                Some(adapter) => branches.push(async move {
                    let started = Instant::now();
                    let outcome = adapter.translate(request).await;
                    (id, started.elapsed().as_millis() as u64, outcome)
                }),
                None => tracing::debug!(provider = %id, "skipping unavailable provider"),
            }
        }

        let outcomes = join_all(branches).await;

        let mut results = HashMap::new();
        let mut stats = self.stats.lock().await;
        for (id, elapsed, outcome) in outcomes {
            match outcome {
                Ok(mut response) => {
                    response.provider = id.clone();
                    stats.record_response_time(id, elapsed);
                    stats.record_success(&response);
                    results.insert(id.clone(), response);
                }
                Err(e) => {
                    tracing::warn!(provider = %id, "parallel translation failed: {}", e);
                    stats.record_failure(id, &e);
                }
            }
        }
        Ok(results)
    }

    /// 检测语言；未指定供应商时使用主供应商，主供应商不可用时使用工作集中的第一个
    pub async fn detect_language(&self, text: &str, provider_id: Option<&str>) -> Result<DetectionResult> {
        self.ensure_ready()?;
        if text.trim().is_empty() {
            return Err(TranslationError::InvalidRequest(
                "text must not be empty".to_string(),
            ));
        }

        let adapter = match provider_id {
            Some(id) => self
                .adapter(id)
                .ok_or_else(|| TranslationError::ProviderUnavailable(id.to_string()))?,
            None => self
                .adapter(&self.config.primary_provider)
                .or_else(|| self.providers.first().map(|provider| &provider.adapter))
                .ok_or_else(|| {
                    TranslationError::ProviderUnavailable(self.config.primary_provider.clone())
                })?,
        };
        adapter.detect_language(text).await
    }

    /// 工作集中供应商的目录信息
    pub fn get_available_providers(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|provider| provider.adapter.provider_info())
            .collect()
    }

    /// 注册表中所有供应商的目录信息（无需配置）
    pub fn catalog(&self) -> Vec<ProviderInfo> {
        self.registry.list_providers()
    }

    /// 查询供应商额度；供应商不支持时返回 `Ok(None)`
    pub async fn get_quota(&self, provider_id: &str) -> Result<Option<QuotaInfo>> {
        self.ensure_ready()?;
        let adapter = self
            .adapter(provider_id)
            .ok_or_else(|| TranslationError::ProviderUnavailable(provider_id.to_string()))?;
        adapter.quota().await
    }

    /// 重新校验某个供应商并同步工作集
    ///
    /// 校验通过且配置中启用时加入工作集，校验失败时移出工作集。
    pub async fn validate_provider(&mut self, provider_id: &str) -> Result<ValidationResult> {
        self.ensure_ready()?;
        let adapter = self
            .registry
            .create(provider_id, self.config.adapter_config_for(provider_id))?;
        let validation = adapter.validate_config().await;

        let enabled = self
            .config
            .providers
            .get(provider_id)
            .map(|entry| entry.enabled)
            .unwrap_or(false);
        let active = self.adapter(provider_id).is_some();

        if validation.valid && enabled && !active {
            tracing::info!(provider = %provider_id, "provider added after validation");
            self.providers.push(ActiveProvider {
                id: provider_id.to_string(),
                adapter,
            });
        } else if !validation.valid && active {
            tracing::warn!(provider = %provider_id, "provider removed: {}", validation.message);
            self.providers.retain(|provider| provider.id != provider_id);
        }
        Ok(validation)
    }

    pub async fn get_stats(&self) -> StatsSnapshot {
        self.stats.lock().await.snapshot()
    }

    pub async fn provider_stats(&self, provider_id: &str) -> Option<ProviderStatsSnapshot> {
        self.stats.lock().await.provider_stats(provider_id)
    }

    pub async fn clear_stats(&self) {
        self.stats.lock().await.clear();
    }

    pub async fn get_cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    pub async fn clear_cache_by_provider(&self, provider_id: &str) -> usize {
        self.cache.lock().await.clear_by_provider(provider_id)
    }

    pub async fn clean_expired_cache(&self) -> usize {
        self.cache.lock().await.clean_expired()
    }
}
