//! 用量统计
//!
//! 按供应商累计请求、成功、失败和用量，并维护全局总计与“今日”统计。
//! “今日”统计在每次记录时按日期字符串懒重置，不依赖定时器。

use crate::error::TranslationError;
use crate::types::TranslationResponse;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

/// 响应时间样本窗口大小
pub const RESPONSE_TIME_WINDOW: usize = 100;
/// 每个供应商保留的最近错误条数
pub const ERROR_LOG_SIZE: usize = 10;

/// 累计的字符、token 和费用，供应商与全局统计共用
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageAmounts {
    pub characters: u64,
    pub tokens: u64,
    pub cost: f64,
}

impl UsageAmounts {
    fn add(&mut self, response: &TranslationResponse) {
        if let Some(usage) = &response.usage {
            self.characters += usage.characters;
            self.tokens += usage.tokens.unwrap_or(0);
            self.cost += usage.cost.unwrap_or(0.0);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageTotals {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub cache_hits: u64,
    #[serde(flatten)]
    pub usage: UsageAmounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderStats {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    #[serde(flatten)]
    pub usage: UsageAmounts,
    pub response_times: VecDeque<u64>,
    pub average_response_time_ms: f64,
    pub recent_errors: VecDeque<ErrorRecord>,
}

/// 单个供应商的只读快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStatsSnapshot {
    #[serde(flatten)]
    pub stats: ProviderStats,
    /// 成功率百分比，如 `"66.67%"`
    pub success_rate: String,
}

/// 全部统计的只读快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total: UsageTotals,
    pub today: UsageTotals,
    pub last_reset: String,
    pub success_rate: String,
    pub providers: BTreeMap<String, ProviderStatsSnapshot>,
}

fn success_rate(successes: u64, requests: u64) -> String {
    if requests == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", successes as f64 / requests as f64 * 100.0)
}

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone)]
pub struct StatsAggregator {
    total: UsageTotals,
    today: UsageTotals,
    last_reset: String,
    providers: BTreeMap<String, ProviderStats>,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self {
            total: UsageTotals::default(),
            today: UsageTotals::default(),
            last_reset: today(),
            providers: BTreeMap::new(),
        }
    }

    /// 日期变化时清零今日统计（总计保持不变）
    fn roll_day(&mut self) {
        let current = today();
        if current != self.last_reset {
            tracing::debug!(from = %self.last_reset, to = %current, "resetting daily stats");
            self.today = UsageTotals::default();
            self.last_reset = current;
        }
    }

    fn provider_mut(&mut self, provider: &str) -> &mut ProviderStats {
        self.providers.entry(provider.to_string()).or_default()
    }

    pub fn record_success(&mut self, response: &TranslationResponse) {
        self.roll_day();

        let stats = self.provider_mut(&response.provider);
        stats.requests += 1;
        stats.successes += 1;
        stats.usage.add(response);

        for bucket in [&mut self.total, &mut self.today] {
            bucket.requests += 1;
            bucket.successes += 1;
            bucket.usage.add(response);
        }
    }

    pub fn record_failure(&mut self, provider: &str, error: &TranslationError) {
        self.roll_day();

        let stats = self.provider_mut(provider);
        stats.requests += 1;
        stats.failures += 1;
        stats.recent_errors.push_back(ErrorRecord {
            timestamp: Utc::now(),
            code: error.code(),
            message: error.to_string(),
        });
        while stats.recent_errors.len() > ERROR_LOG_SIZE {
            stats.recent_errors.pop_front();
        }

        for bucket in [&mut self.total, &mut self.today] {
            bucket.requests += 1;
            bucket.failures += 1;
        }
    }

    pub fn record_response_time(&mut self, provider: &str, millis: u64) {
        self.roll_day();

        let stats = self.provider_mut(provider);
        stats.response_times.push_back(millis);
        while stats.response_times.len() > RESPONSE_TIME_WINDOW {
            stats.response_times.pop_front();
        }
        let sum: u64 = stats.response_times.iter().sum();
        stats.average_response_time_ms = sum as f64 / stats.response_times.len() as f64;
    }

    /// 缓存命中不计入请求数
    pub fn record_cache_hit(&mut self) {
        self.roll_day();
        self.total.cache_hits += 1;
        self.today.cache_hits += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total: self.total.clone(),
            today: self.today.clone(),
            last_reset: self.last_reset.clone(),
            success_rate: success_rate(self.total.successes, self.total.requests),
            providers: self
                .providers
                .iter()
                .map(|(id, stats)| (id.clone(), Self::provider_snapshot(stats)))
                .collect(),
        }
    }

    pub fn provider_stats(&self, provider: &str) -> Option<ProviderStatsSnapshot> {
        self.providers.get(provider).map(Self::provider_snapshot)
    }

    fn provider_snapshot(stats: &ProviderStats) -> ProviderStatsSnapshot {
        ProviderStatsSnapshot {
            stats: stats.clone(),
            success_rate: success_rate(stats.successes, stats.requests),
        }
    }

    pub fn clear(&mut self) {
        self.total = UsageTotals::default();
        self.today = UsageTotals::default();
        self.last_reset = today();
        self.providers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Usage;

    fn success(provider: &str, characters: u64, tokens: Option<u64>, cost: Option<f64>) -> TranslationResponse {
        TranslationResponse::new(provider, "x").with_usage(Usage {
            characters,
            tokens,
            cost,
        })
    }

    fn server_error(n: u16) -> TranslationError {
        TranslationError::Server {
            provider: "google".into(),
            code: 500 + n,
            message: format!("failure {}", n),
        }
    }

    #[test]
    fn successes_sum_to_exact_totals() {
        let mut stats = StatsAggregator::new();
        stats.record_success(&success("google", 5, None, None));
        stats.record_success(&success("google", 7, None, None));
        stats.record_success(&success("openai", 3, Some(40), Some(0.25)));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total.requests, 3);
        assert_eq!(snapshot.total.successes, 3);
        assert_eq!(snapshot.total.usage.characters, 15);
        assert_eq!(snapshot.total.usage.tokens, 40);
        assert!((snapshot.total.usage.cost - 0.25).abs() < f64::EPSILON);
        assert_eq!(snapshot.today, snapshot.total);

        let google = stats.provider_stats("google").unwrap();
        assert_eq!(google.stats.usage.characters, 12);
        assert_eq!(google.success_rate, "100.00%");
    }

    #[test]
    fn provider_usage_matches_global_usage() {
        let mut stats = StatsAggregator::new();
        stats.record_success(&success("openai", 9, Some(120), Some(0.05)));
        stats.record_success(&success("openai", 1, None, None));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.providers["openai"].stats.usage, snapshot.total.usage);
        assert_eq!(snapshot.total.usage.tokens, 120);
    }

    #[test]
    fn success_rate_tracks_failures() {
        let mut stats = StatsAggregator::new();
        stats.record_success(&success("google", 1, None, None));
        stats.record_success(&success("google", 1, None, None));
        stats.record_failure("google", &server_error(0));

        let google = stats.provider_stats("google").unwrap();
        assert_eq!(google.stats.requests, 3);
        assert_eq!(google.stats.failures, 1);
        assert_eq!(google.success_rate, "66.67%");
        assert_eq!(stats.snapshot().success_rate, "66.67%");
    }

    #[test]
    fn error_log_keeps_last_ten() {
        let mut stats = StatsAggregator::new();
        for n in 0..12 {
            stats.record_failure("google", &server_error(n));
        }
        let google = stats.provider_stats("google").unwrap();
        assert_eq!(google.stats.recent_errors.len(), ERROR_LOG_SIZE);
        assert_eq!(google.stats.recent_errors.front().unwrap().code, 502);
        assert_eq!(google.stats.recent_errors.back().unwrap().code, 511);
    }

    #[test]
    fn response_time_window_is_bounded_average() {
        let mut stats = StatsAggregator::new();
        for _ in 0..RESPONSE_TIME_WINDOW {
            stats.record_response_time("deepl", 10);
        }
        stats.record_response_time("deepl", 110);

        let deepl = stats.provider_stats("deepl").unwrap();
        assert_eq!(deepl.stats.response_times.len(), RESPONSE_TIME_WINDOW);
        assert!((deepl.stats.average_response_time_ms - 11.0).abs() < 1e-9);
    }

    #[test]
    fn new_day_resets_only_today_bucket() {
        let mut stats = StatsAggregator::new();
        stats.record_success(&success("google", 10, None, None));
        stats.last_reset = "2000-01-01".to_string();

        stats.record_success(&success("google", 4, None, None));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total.requests, 2);
        assert_eq!(snapshot.total.usage.characters, 14);
        assert_eq!(snapshot.today.requests, 1);
        assert_eq!(snapshot.today.usage.characters, 4);
        assert_ne!(snapshot.last_reset, "2000-01-01");
    }

    #[test]
    fn cache_hits_do_not_count_as_requests() {
        let mut stats = StatsAggregator::new();
        stats.record_cache_hit();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total.cache_hits, 1);
        assert_eq!(snapshot.total.requests, 0);
        assert_eq!(snapshot.success_rate, "0.00%");
    }

    #[test]
    fn clear_resets_everything() {
        let mut stats = StatsAggregator::new();
        stats.record_success(&success("google", 1, None, None));
        stats.clear();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total, UsageTotals::default());
        assert!(snapshot.providers.is_empty());
    }
}
