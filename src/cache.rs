//! 翻译结果缓存
//!
//! LRU 容量上限加 TTL 过期。过期条目在访问或主动清理时才被移除，
//! 在此之前逻辑上视为不存在。

use crate::types::TranslationResponse;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// 缓存键只取文本前 100 个字符
pub const KEY_TEXT_CHARS: usize = 100;

/// 生成缓存键：`source:target:` + 截断后的文本
///
/// 前 100 个字符相同、之后才不同的文本会落到同一个键上。
pub fn cache_key(text: &str, source_lang: &str, target_lang: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(KEY_TEXT_CHARS).collect();
    let suffix = if chars.next().is_some() { "..." } else { "" };
    format!("{}:{}:{}{}", source_lang, target_lang, head, suffix)
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub response: TranslationResponse,
    pub written_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.written_at) > ttl
    }
}

/// 缓存统计信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub ttl_secs: u64,
    /// 已用容量百分比，如 `"12.50%"`
    pub usage: String,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

pub struct TranslationCache {
    entries: LruCache<String, CacheEntry>,
    ttl: Duration,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl TranslationCache {
    pub const DEFAULT_MAX_SIZE: usize = 1000;
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    /// 创建缓存，容量为 0 时按 1 处理
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttl,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    pub fn get(&mut self, text: &str, source_lang: &str, target_lang: &str) -> Option<TranslationResponse> {
        self.get_at(&cache_key(text, source_lang, target_lang), Instant::now())
    }

    pub(crate) fn get_at(&mut self, key: &str, now: Instant) -> Option<TranslationResponse> {
        let expired = match self.entries.peek(key) {
            Some(entry) => entry.is_expired(self.ttl, now),
            None => {
                self.misses += 1;
                return None;
            }
        };
        if expired {
            self.entries.pop(key);
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        self.entries.get(key).map(|entry| entry.response.clone())
    }

    pub fn set(&mut self, text: &str, source_lang: &str, target_lang: &str, response: TranslationResponse) {
        self.set_at(cache_key(text, source_lang, target_lang), response, Instant::now());
    }

    pub(crate) fn set_at(&mut self, key: String, response: TranslationResponse, now: Instant) {
        let entry = CacheEntry {
            response,
            written_at: now,
        };
        if let Some((evicted, _)) = self.entries.push(key.clone(), entry) {
            if evicted != key {
                tracing::debug!(key = %evicted, "evicted least recently used cache entry");
                self.evictions += 1;
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 删除由指定供应商产生的条目，返回删除数量
    pub fn clear_by_provider(&mut self, provider: &str) -> usize {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.response.provider == provider)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            self.entries.pop(key);
        }
        keys.len()
    }

    /// 主动清理所有过期条目，返回清理数量
    pub fn clean_expired(&mut self) -> usize {
        self.clean_expired_at(Instant::now())
    }

    pub(crate) fn clean_expired_at(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            self.entries.pop(key);
        }
        keys.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let size = self.entries.len();
        let max_size = self.entries.cap().get();
        CacheStats {
            size,
            max_size,
            ttl_secs: self.ttl.as_secs(),
            usage: format!("{:.2}%", size as f64 / max_size as f64 * 100.0),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_SIZE, Self::DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(provider: &str, text: &str) -> TranslationResponse {
        TranslationResponse::new(provider, text)
    }

    #[test]
    fn key_truncates_long_text() {
        let short = cache_key("hello", "en", "zh-CN");
        assert_eq!(short, "en:zh-CN:hello");

        let long_a = format!("{}{}", "a".repeat(100), "tail one");
        let long_b = format!("{}{}", "a".repeat(100), "tail two");
        let key = cache_key(&long_a, "en", "de");
        assert!(key.ends_with("..."));
        assert_eq!(key, cache_key(&long_b, "en", "de"));

        let exactly_100 = "b".repeat(100);
        assert!(!cache_key(&exactly_100, "en", "de").ends_with("..."));
    }

    #[test]
    fn expired_entries_are_misses_and_removed_on_access() {
        let mut cache = TranslationCache::new(10, Duration::from_secs(60));
        let start = Instant::now();
        cache.set_at("k".into(), response("google", "v"), start);

        assert!(cache.get_at("k", start + Duration::from_secs(60)).is_some());
        assert!(cache.get_at("k", start + Duration::from_secs(61)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_least_recently_used_not_oldest_inserted() {
        let mut cache = TranslationCache::new(2, Duration::from_secs(60));
        let now = Instant::now();
        cache.set_at("a".into(), response("google", "A"), now);
        cache.set_at("b".into(), response("google", "B"), now);

        // touching "a" makes "b" the LRU entry
        assert!(cache.get_at("a", now).is_some());
        cache.set_at("c".into(), response("google", "C"), now);

        assert!(cache.get_at("b", now).is_none());
        assert!(cache.get_at("a", now).is_some());
        assert!(cache.get_at("c", now).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn overwriting_a_key_is_not_an_eviction() {
        let mut cache = TranslationCache::new(1, Duration::from_secs(60));
        let now = Instant::now();
        cache.set_at("a".into(), response("google", "1"), now);
        cache.set_at("a".into(), response("google", "2"), now);

        assert_eq!(cache.get_at("a", now).unwrap().translated_text, "2");
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn clears_by_provider_and_sweeps_expired() {
        let mut cache = TranslationCache::new(10, Duration::from_secs(10));
        let start = Instant::now();
        cache.set_at("a".into(), response("google", "A"), start);
        cache.set_at("b".into(), response("deepl", "B"), start);
        cache.set_at("c".into(), response("google", "C"), start + Duration::from_secs(8));

        assert_eq!(cache.clear_by_provider("deepl"), 1);
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.clean_expired_at(start + Duration::from_secs(11)), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("c", start + Duration::from_secs(11)).is_some());
    }

    #[test]
    fn stats_report_usage_percentage() {
        let mut cache = TranslationCache::new(8, Duration::from_secs(3600));
        cache.set("hello", "en", "de", response("google", "hallo"));
        let stats = cache.stats();

        assert_eq!(stats.size, 1);
        assert_eq!(stats.max_size, 8);
        assert_eq!(stats.ttl_secs, 3600);
        assert_eq!(stats.usage, "12.50%");
    }
}
