use std::time::Duration;

use crate::retry::{Backoff, RetryConfig};
use crate::ProviderId;

/// Per-provider pacing, batching and transport settings.
#[derive(Debug, Clone)]
pub struct ProviderPolicy {
    pub provider_id: ProviderId,
    /// Items requested per page on paged enumerations.
    pub page_size: usize,
    pub quota_window: Duration,
    /// Calls allowed per `quota_window`; `None` for sources without a published budget.
    pub quota_limit: Option<u32>,
    pub metadata_chunk_size: usize,
    pub metadata_delay: Duration,
    /// Pause between per-symbol probes (e.g. options availability checks).
    pub probe_delay: Duration,
    pub request_timeout_ms: u64,
    pub retry: RetryConfig,
}

impl ProviderPolicy {
    pub fn polygon_default() -> Self {
        Self {
            provider_id: ProviderId::Polygon,
            page_size: 1_000,
            quota_window: Duration::from_secs(60),
            quota_limit: Some(5),
            metadata_chunk_size: 1,
            metadata_delay: Duration::from_secs(12),
            probe_delay: Duration::ZERO,
            request_timeout_ms: 30_000,
            retry: RetryConfig::exponential(5),
        }
    }

    pub fn alpha_vantage_default() -> Self {
        Self {
            provider_id: ProviderId::AlphaVantage,
            page_size: 0,
            quota_window: Duration::from_secs(60),
            quota_limit: Some(5),
            metadata_chunk_size: 1,
            metadata_delay: Duration::from_secs(12),
            probe_delay: Duration::ZERO,
            request_timeout_ms: 30_000,
            retry: RetryConfig::exponential(3),
        }
    }

    pub fn yfinance_default() -> Self {
        Self {
            provider_id: ProviderId::Yfinance,
            page_size: 0,
            quota_window: Duration::from_secs(60),
            quota_limit: None,
            metadata_chunk_size: 50,
            metadata_delay: Duration::from_secs(1),
            probe_delay: Duration::from_millis(1_500),
            request_timeout_ms: 30_000,
            retry: RetryConfig::exponential(3),
        }
    }

    pub fn sec_default() -> Self {
        Self {
            provider_id: ProviderId::Sec,
            page_size: 0,
            quota_window: Duration::from_secs(1),
            quota_limit: Some(10),
            metadata_chunk_size: 1,
            metadata_delay: Duration::ZERO,
            probe_delay: Duration::ZERO,
            request_timeout_ms: 30_000,
            retry: RetryConfig::exponential(3),
        }
    }

    pub fn cboe_default() -> Self {
        Self {
            provider_id: ProviderId::Cboe,
            page_size: 0,
            quota_window: Duration::from_secs(60),
            quota_limit: None,
            metadata_chunk_size: 1,
            metadata_delay: Duration::ZERO,
            probe_delay: Duration::ZERO,
            request_timeout_ms: 30_000,
            retry: RetryConfig::exponential(3),
        }
    }

    pub fn default_for(provider_id: ProviderId) -> Self {
        match provider_id {
            ProviderId::Polygon => Self::polygon_default(),
            ProviderId::AlphaVantage => Self::alpha_vantage_default(),
            ProviderId::Yfinance => Self::yfinance_default(),
            ProviderId::Sec => Self::sec_default(),
            ProviderId::Cboe => Self::cboe_default(),
        }
    }

    /// Fixed pause that keeps one call per page inside the call budget
    /// (`quota_window / quota_limit`), or zero when there is no budget.
    pub fn cooldown(&self) -> Duration {
        match self.quota_limit {
            Some(limit) if limit > 0 => self.quota_window / limit,
            _ => Duration::ZERO,
        }
    }

    /// Disables backoff sleeps and pauses; used by offline tests.
    pub fn without_delays(mut self) -> Self {
        self.quota_limit = None;
        self.metadata_delay = Duration::ZERO;
        self.probe_delay = Duration::ZERO;
        self.retry.backoff = Backoff::Fixed(Duration::ZERO);
        self
    }
}
