//! 适配器注册表
//!
//! 保存供应商 ID 到构造函数的映射，并为每个 ID 缓存一个共享的适配器实例。
//! 注册表是普通的值，由持有者（通常是 [`TranslationManager`](crate::TranslationManager)）显式拥有。

use crate::adapter::TranslationAdapter;
use crate::config::AdapterConfig;
use crate::error::{Result, TranslationError};
use crate::providers::{deepl, deeplx, google, openai};
use crate::providers::{DeepLAdapter, DeepLXAdapter, GoogleAdapter, OpenAiAdapter};
use crate::types::ProviderInfo;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// 适配器构造函数
pub type AdapterConstructor =
    Arc<dyn Fn() -> Result<Arc<dyn TranslationAdapter>> + Send + Sync>;

/// 没有更合适的推荐时使用的供应商
pub const DEFAULT_PROVIDER: &str = google::PROVIDER_ID;

/// 已知表现较好的语言对 → 供应商
const RECOMMENDATIONS: &[(&str, &str, &str)] = &[
    ("en", "de", deepl::PROVIDER_ID),
    ("de", "en", deepl::PROVIDER_ID),
    ("en", "fr", deepl::PROVIDER_ID),
    ("fr", "en", deepl::PROVIDER_ID),
    ("en", "es", deepl::PROVIDER_ID),
    ("es", "en", deepl::PROVIDER_ID),
    ("en", "it", deepl::PROVIDER_ID),
    ("en", "pl", deepl::PROVIDER_ID),
    ("en", "nl", deepl::PROVIDER_ID),
    ("en", "ja", deepl::PROVIDER_ID),
    ("ja", "en", deepl::PROVIDER_ID),
    ("en", "zh-CN", google::PROVIDER_ID),
    ("zh-CN", "en", google::PROVIDER_ID),
    ("en", "zh-TW", google::PROVIDER_ID),
    ("zh-TW", "en", google::PROVIDER_ID),
    ("en", "ko", google::PROVIDER_ID),
    ("ko", "en", google::PROVIDER_ID),
    ("en", "th", google::PROVIDER_ID),
    ("en", "vi", google::PROVIDER_ID),
    ("ja", "zh-CN", openai::PROVIDER_ID),
    ("zh-CN", "ja", openai::PROVIDER_ID),
];

#[derive(Default)]
pub struct AdapterRegistry {
    constructors: BTreeMap<String, AdapterConstructor>,
    instances: HashMap<String, Arc<dyn TranslationAdapter>>,
}

impl AdapterRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建已注册全部内置供应商的注册表
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::new();
        registry.register(google::PROVIDER_ID, || {
            Ok(Arc::new(GoogleAdapter::new()?) as Arc<dyn TranslationAdapter>)
        });
        registry.register(deepl::PROVIDER_ID, || {
            Ok(Arc::new(DeepLAdapter::new()?) as Arc<dyn TranslationAdapter>)
        });
        registry.register(deeplx::PROVIDER_ID, || {
            Ok(Arc::new(DeepLXAdapter::new()?) as Arc<dyn TranslationAdapter>)
        });
        registry.register(openai::PROVIDER_ID, || {
            Ok(Arc::new(OpenAiAdapter::new()?) as Arc<dyn TranslationAdapter>)
        });
        registry
    }

    /// 注册供应商构造函数；重复注册时后者覆盖前者，并丢弃旧的缓存实例
    pub fn register<F>(&mut self, id: impl Into<String>, constructor: F)
    where
        F: Fn() -> Result<Arc<dyn TranslationAdapter>> + Send + Sync + 'static,
    {
        let id = id.into();
        self.instances.remove(&id);
        self.constructors.insert(id, Arc::new(constructor));
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.constructors.contains_key(id)
    }

    pub fn registered_ids(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    /// 获取（必要时懒创建）该 ID 的共享实例，并写入配置
    pub fn create(&mut self, id: &str, config: AdapterConfig) -> Result<Arc<dyn TranslationAdapter>> {
        let adapter = match self.instances.get(id) {
            Some(adapter) => adapter.clone(),
            None => {
                let adapter = self.instantiate(id)?;
                self.instances.insert(id.to_string(), adapter.clone());
                adapter
            }
        };
        adapter.configure(config);
        Ok(adapter)
    }

    /// 构造一个不进入缓存的临时实例，用于读取目录信息
    fn instantiate(&self, id: &str) -> Result<Arc<dyn TranslationAdapter>> {
        let constructor = self
            .constructors
            .get(id)
            .ok_or_else(|| TranslationError::UnknownProvider(id.to_string()))?;
        constructor()
    }

    /// 列出所有已注册供应商的目录信息；构造失败的供应商被跳过
    pub fn list_providers(&self) -> Vec<ProviderInfo> {
        self.constructors
            .keys()
            .filter_map(|id| match self.instantiate(id) {
                Ok(adapter) => Some(adapter.provider_info()),
                Err(e) => {
                    tracing::warn!(provider = %id, "failed to read provider info: {}", e);
                    None
                }
            })
            .collect()
    }

    pub fn provider_info(&self, id: &str) -> Result<ProviderInfo> {
        Ok(self.instantiate(id)?.provider_info())
    }

    /// 按语言对推荐供应商，没有匹配时返回 [`DEFAULT_PROVIDER`]
    pub fn recommend(&self, source: &str, target: &str) -> &'static str {
        RECOMMENDATIONS
            .iter()
            .find(|(s, t, _)| *s == source && *t == target)
            .map(|(_, _, provider)| *provider)
            .unwrap_or(DEFAULT_PROVIDER)
    }

    pub fn is_pair_supported(&self, id: &str, source: &str, target: &str) -> bool {
        match self.instantiate(id) {
            Ok(adapter) => adapter.is_language_pair_supported(source, target),
            Err(_) => false,
        }
    }
}
