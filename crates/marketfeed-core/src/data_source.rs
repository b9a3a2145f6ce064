//! Capability contracts and request options.
//!
//! A provider implements some subset of four single-operation capabilities.
//! [`Provider`] exposes each one as an interface query returning
//! `Option<&dyn ...Fetcher>`; a `None` answer is turned into
//! [`SourceErrorKind::UnsupportedCapability`] before any network call.
//!
//! | Capability | Trait | Options | Output |
//! |------------|-------|---------|--------|
//! | list tickers | [`TickersFetcher`] | [`TickersOptions`] | `Vec<Ticker>` |
//! | list candles | [`CandlesFetcher`] | [`CandlesOptions`] | `Vec<Candle>` |
//! | list optionable | [`OptionableFetcher`] | [`OptionableOptions`] | `Vec<Ticker>` |
//! | fetch metadata | [`MetadataFetcher`] | [`MetadataOptions`] | `Vec<Ticker>` |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::provider_policy::ProviderPolicy;
use crate::{BarInterval, Candle, ProviderId, Symbol, Ticker, ValidationError};

/// Boxed future returned by every capability operation.
pub type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Capability identifiers used for dispatch checks and error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Tickers,
    Candles,
    Optionable,
    Metadata,
}

impl Capability {
    pub const ALL: [Self; 4] = [Self::Tickers, Self::Candles, Self::Optionable, Self::Metadata];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tickers => "tickers",
            Self::Candles => "candles",
            Self::Optionable => "optionable",
            Self::Metadata => "metadata",
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported capability matrix for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub tickers: bool,
    pub candles: bool,
    pub optionable: bool,
    pub metadata: bool,
}

impl CapabilitySet {
    pub const fn new(tickers: bool, candles: bool, optionable: bool, metadata: bool) -> Self {
        Self {
            tickers,
            candles,
            optionable,
            metadata,
        }
    }

    pub const fn supports(self, capability: Capability) -> bool {
        match capability {
            Capability::Tickers => self.tickers,
            Capability::Candles => self.candles,
            Capability::Optionable => self.optionable,
            Capability::Metadata => self.metadata,
        }
    }

    pub fn supported(self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.supports(*capability))
            .collect()
    }
}

/// Error classification for provider construction and capability calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    UnknownProvider,
    MissingCredential,
    UnsupportedCapability,
    UnsupportedParameter,
    InvalidRequest,
    Transport,
    RateLimited,
    Validation,
    Internal,
}

/// Structured provider error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unknown_provider(name: impl AsRef<str>) -> Self {
        Self {
            kind: SourceErrorKind::UnknownProvider,
            message: format!("provider '{}' is not registered", name.as_ref()),
            retryable: false,
        }
    }

    pub fn missing_credential(env_var: impl AsRef<str>) -> Self {
        Self {
            kind: SourceErrorKind::MissingCredential,
            message: format!("missing required env var '{}'", env_var.as_ref()),
            retryable: false,
        }
    }

    pub fn unsupported_capability(provider: ProviderId, capability: Capability) -> Self {
        Self {
            kind: SourceErrorKind::UnsupportedCapability,
            message: format!("provider '{provider}' does not support fetching {capability}"),
            retryable: false,
        }
    }

    pub fn unsupported_parameter(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::UnsupportedParameter,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Transport,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn validation(error: &ValidationError) -> Self {
        Self {
            kind: SourceErrorKind::Validation,
            message: error.to_string(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    /// Errors that abort the whole operation instead of degrading to an
    /// empty or partial result.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            SourceErrorKind::UnknownProvider
                | SourceErrorKind::MissingCredential
                | SourceErrorKind::UnsupportedCapability
                | SourceErrorKind::UnsupportedParameter
                | SourceErrorKind::InvalidRequest
        )
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::UnknownProvider => "source.unknown_provider",
            SourceErrorKind::MissingCredential => "source.missing_credential",
            SourceErrorKind::UnsupportedCapability => "source.unsupported_capability",
            SourceErrorKind::UnsupportedParameter => "source.unsupported_parameter",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Transport => "source.transport",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Validation => "source.validation",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(error: ValidationError) -> Self {
        Self::validation(&error)
    }
}

/// Options for [`TickersFetcher`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickersOptions {
    /// Exchange or market filter, interpreted per provider.
    pub exchange: Option<String>,
    /// Asset type to drop from the listing (e.g. `WARRANT`).
    pub exclude_type: Option<String>,
}

impl TickersOptions {
    pub fn new(exchange: Option<String>) -> Self {
        Self {
            exchange: exchange
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
            exclude_type: None,
        }
    }

    pub fn with_exclude_type(mut self, exclude_type: impl Into<String>) -> Self {
        let value = exclude_type.into();
        self.exclude_type = Some(value.trim().to_owned()).filter(|value| !value.is_empty());
        self
    }
}

/// Options for [`CandlesFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandlesOptions {
    pub symbol: Symbol,
    pub from: Date,
    pub to: Date,
    pub interval: BarInterval,
}

impl CandlesOptions {
    pub fn new(
        symbol: Symbol,
        from: Date,
        to: Date,
        interval: BarInterval,
    ) -> Result<Self, SourceError> {
        if from > to {
            return Err(SourceError::invalid_request(format!(
                "candle range start {from} is after end {to}"
            )));
        }
        Ok(Self {
            symbol,
            from,
            to,
            interval,
        })
    }
}

/// Optionable symbol directory variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionableKind {
    #[default]
    All,
    Weeklies,
    Quarterlies,
}

impl OptionableKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Weeklies => "weeklies",
            Self::Quarterlies => "quarterlies",
        }
    }
}

impl Display for OptionableKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionableKind {
    type Err = SourceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "weeklies" => Ok(Self::Weeklies),
            "quarterlies" => Ok(Self::Quarterlies),
            other => Err(SourceError::unsupported_parameter(format!(
                "unsupported optionable type '{other}', expected one of all, weeklies, quarterlies"
            ))),
        }
    }
}

/// Options for [`OptionableFetcher`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionableOptions {
    pub kind: OptionableKind,
    /// Exchange filter for providers that derive optionable symbols from a ticker list.
    pub exchange: Option<String>,
    /// Upper bound on results, for bounded runs.
    pub max_results: Option<usize>,
    /// Per-symbol probe delay override.
    pub delay: Option<Duration>,
}

impl OptionableOptions {
    pub fn new(kind: OptionableKind, max_results: Option<usize>) -> Result<Self, SourceError> {
        if max_results == Some(0) {
            return Err(SourceError::invalid_request(
                "max results must be greater than zero when set",
            ));
        }
        Ok(Self {
            kind,
            exchange: None,
            max_results,
            delay: None,
        })
    }

    pub fn with_exchange(mut self, exchange: Option<String>) -> Self {
        self.exchange = exchange.filter(|value| !value.trim().is_empty());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Options for [`MetadataFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataOptions {
    /// Normalized, de-duplicated symbols in request order.
    pub symbols: Vec<Symbol>,
    /// Symbols per upstream request; always at least 1.
    pub chunk_size: usize,
    /// Pause between consecutive chunk requests.
    pub delay: Duration,
}

impl MetadataOptions {
    pub const DEFAULT_CHUNK_SIZE: usize = 50;

    pub fn new(symbols: Vec<Symbol>, chunk_size: usize, delay: Duration) -> Result<Self, SourceError> {
        if symbols.is_empty() {
            return Err(SourceError::invalid_request(
                "metadata request must include at least one symbol",
            ));
        }
        Ok(Self {
            symbols,
            chunk_size: chunk_size.max(1),
            delay,
        })
    }
}

/// Lists tradable symbols.
pub trait TickersFetcher: Send + Sync {
    fn fetch_tickers<'a>(&'a self, options: &'a TickersOptions) -> FetchFuture<'a, Vec<Ticker>>;
}

/// Lists OHLCV bars for one symbol, oldest first.
pub trait CandlesFetcher: Send + Sync {
    fn fetch_candles<'a>(&'a self, options: &'a CandlesOptions) -> FetchFuture<'a, Vec<Candle>>;
}

/// Lists symbols that have listed options; every result has `optionable: Some(true)`.
pub trait OptionableFetcher: Send + Sync {
    fn fetch_optionable<'a>(
        &'a self,
        options: &'a OptionableOptions,
    ) -> FetchFuture<'a, Vec<Ticker>>;
}

/// Fetches per-symbol metadata (at minimum `symbol`, typically `market_cap`).
pub trait MetadataFetcher: Send + Sync {
    fn fetch_metadata<'a>(&'a self, options: &'a MetadataOptions) -> FetchFuture<'a, Vec<Ticker>>;
}

/// Provider contract.
///
/// Each provider answers the capability queries it implements and leaves the
/// rest at their `None` defaults; [`Provider::capabilities`] is derived from
/// those answers so the two can never disagree.
///
/// ```rust,ignore
/// impl Provider for SecAdapter {
///     fn id(&self) -> ProviderId {
///         ProviderId::Sec
///     }
///
///     fn policy(&self) -> &ProviderPolicy {
///         &self.policy
///     }
///
///     fn tickers(&self) -> Option<&dyn TickersFetcher> {
///         Some(self)
///     }
/// }
/// ```
pub trait Provider: Send + Sync {
    /// Returns the registry identifier of this provider.
    fn id(&self) -> ProviderId;

    /// Policy this instance was built with; operations read their
    /// chunking and pacing defaults from it.
    fn policy(&self) -> &ProviderPolicy;

    fn tickers(&self) -> Option<&dyn TickersFetcher> {
        None
    }

    fn candles(&self) -> Option<&dyn CandlesFetcher> {
        None
    }

    fn optionable(&self) -> Option<&dyn OptionableFetcher> {
        None
    }

    fn metadata(&self) -> Option<&dyn MetadataFetcher> {
        None
    }

    /// Returns the set of implemented capabilities.
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new(
            self.tickers().is_some(),
            self.candles().is_some(),
            self.optionable().is_some(),
            self.metadata().is_some(),
        )
    }
}
