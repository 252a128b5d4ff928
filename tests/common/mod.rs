#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use translation_router::adapter::support::{self, ConfigSlot};
use translation_router::{
    AdapterConfig, AdapterRegistry, DetectionResult, ManagerConfig, ProviderCategory,
    ProviderInfo, QuotaInfo, Result, TranslationAdapter, TranslationError, TranslationRequest,
    TranslationResponse, Usage, ValidationResult,
};

#[derive(Clone)]
pub enum Outcome {
    Translate(String),
    Fail(TranslationError),
    /// 在适配器配置的超时内等待这么久才返回
    Stall(Duration),
}

/// In-memory adapter whose behaviour is scripted by the test.
pub struct ScriptedAdapter {
    id: String,
    languages: Vec<String>,
    valid: bool,
    outcome: Mutex<Outcome>,
    calls: AtomicUsize,
    last_request: Mutex<Option<TranslationRequest>>,
    settings: ConfigSlot,
}

impl ScriptedAdapter {
    pub fn ok(id: &str, translation: &str) -> Arc<Self> {
        Self::build(id, Outcome::Translate(translation.to_string()), true)
    }

    pub fn failing(id: &str, error: TranslationError) -> Arc<Self> {
        Self::build(id, Outcome::Fail(error), true)
    }

    pub fn stalling(id: &str, delay: Duration) -> Arc<Self> {
        Self::build(id, Outcome::Stall(delay), true)
    }

    pub fn invalid(id: &str) -> Arc<Self> {
        Self::build(id, Outcome::Translate("unused".to_string()), false)
    }

    fn build(id: &str, outcome: Outcome, valid: bool) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            languages: ["en", "de", "fr", "ja", "zh-CN"]
                .iter()
                .map(|l| l.to_string())
                .collect(),
            valid,
            outcome: Mutex::new(outcome),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            settings: ConfigSlot::default(),
        })
    }

    pub fn with_languages(id: &str, translation: &str, languages: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            languages: languages.iter().map(|l| l.to_string()).collect(),
            valid: true,
            outcome: Mutex::new(Outcome::Translate(translation.to_string())),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            settings: ConfigSlot::default(),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_outcome(&self, outcome: Outcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn last_request(&self) -> Option<TranslationRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranslationAdapter for ScriptedAdapter {
    fn configure(&self, config: AdapterConfig) {
        self.settings.replace(config);
    }

    fn config(&self) -> AdapterConfig {
        self.settings.snapshot()
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            id: self.id.clone(),
            name: self.id.clone(),
            description: "scripted".to_string(),
            website: String::new(),
            category: ProviderCategory::Local,
            languages: self.languages.clone(),
            requires_api_key: false,
            requires_secret: false,
            requires_region: false,
            pricing: "free".to_string(),
            features: vec![],
        }
    }

    async fn validate_config(&self) -> ValidationResult {
        if self.valid {
            ValidationResult::valid("ok")
        } else {
            ValidationResult::invalid("missing credentials")
        }
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        let outcome = self.outcome.lock().unwrap().clone();
        let usage = Usage {
            characters: request.char_count(),
            tokens: None,
            cost: None,
        };
        match outcome {
            Outcome::Translate(text) => {
                Ok(TranslationResponse::new(&self.id, text).with_usage(usage))
            }
            Outcome::Fail(error) => Err(error),
            Outcome::Stall(delay) => {
                support::with_timeout(&self.id, self.config().timeout(), async {
                    tokio::time::sleep(delay).await;
                    Ok(TranslationResponse::new(&self.id, "late").with_usage(usage))
                })
                .await
            }
        }
    }

    async fn detect_language(&self, _text: &str) -> Result<DetectionResult> {
        Ok(DetectionResult {
            language: "en".to_string(),
            confidence: 0.99,
        })
    }

    async fn quota(&self) -> Result<Option<QuotaInfo>> {
        Ok(Some(QuotaInfo {
            used: 42,
            limit: Some(100),
            unit: "characters".to_string(),
        }))
    }
}

pub fn registry_with(adapters: &[Arc<ScriptedAdapter>]) -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    for adapter in adapters {
        let shared = adapter.clone();
        registry.register(adapter.id.clone(), move || {
            Ok(shared.clone() as Arc<dyn TranslationAdapter>)
        });
    }
    registry
}

/// Config enabling every listed provider with `primary` first.
pub fn config_for(primary: &str, enabled: &[&str]) -> ManagerConfig {
    let mut config = ManagerConfig {
        primary_provider: primary.to_string(),
        ..ManagerConfig::default()
    };
    for id in enabled {
        config = config.with_provider(*id, AdapterConfig::default());
    }
    config
}

pub fn server_error(provider: &str) -> TranslationError {
    TranslationError::Server {
        provider: provider.to_string(),
        code: 500,
        message: "upstream exploded".to_string(),
    }
}
