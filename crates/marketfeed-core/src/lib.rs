//! # Marketfeed Core
//!
//! Provider capability dispatch and normalization engine for marketfeed.
//!
//! ## Overview
//!
//! Upstream market-data sources differ in transport, paging, rate limits and
//! response shape. This crate turns all of them into two canonical entities,
//! [`Ticker`] and [`Candle`]:
//!
//! - **Capability contracts** a provider implements a subset of
//! - **Registry** that builds providers by name and resolves credentials
//! - **Pagination engine** with a proactive cooldown between pages
//! - **Chunked batch fetcher** for multi-symbol metadata lookups
//! - **Normalization pipeline** that drops invalid records without aborting
//! - **Enrichment join** of a ticker list with fetched metadata
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Polygon, Alpha Vantage, Yahoo, SEC and CBOE adapters |
//! | [`batch`] | Symbol normalization and chunked metadata fetching |
//! | [`data_source`] | Capability traits, options and [`SourceError`] |
//! | [`delimited`] | Delimited-text directory parsing |
//! | [`domain`] | Canonical models |
//! | [`enrich`] | Ticker/metadata join |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`normalize`] | Record validation and mapping |
//! | [`pacing`] | Cooldown pauses |
//! | [`pagination`] | Rate-limited page walks |
//! | [`provider_policy`] | Per-provider pacing and transport settings |
//! | [`registry`] | Provider factory |
//! | [`retry`] | Transport retries with backoff |
//! | [`service`] | Caller-facing operations |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use marketfeed_core::{service, ProviderRegistry, TickersOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = ProviderRegistry::new().create("sec")?;
//!     let tickers = service::list_tickers(provider.as_ref(), &TickersOptions::default()).await?;
//!     println!("{} tickers", tickers.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Only construction, capability and parameter errors abort an operation:
//!
//! ```rust
//! use marketfeed_core::{SourceError, SourceErrorKind};
//!
//! fn handle_error(error: SourceError) {
//!     match error.kind() {
//!         SourceErrorKind::MissingCredential => {
//!             // Export the named variable
//!         }
//!         SourceErrorKind::UnsupportedCapability => {
//!             // Pick another provider
//!         }
//!         _ => {}
//!     }
//! }
//! ```

pub mod adapters;
pub mod batch;
pub mod data_source;
pub mod delimited;
pub mod domain;
pub mod enrich;
pub mod error;
pub mod http_client;
pub mod normalize;
pub mod pacing;
pub mod pagination;
pub mod provider_policy;
pub mod registry;
pub mod retry;
pub mod service;
pub mod source;

// Adapter implementations
pub use adapters::{AlphaVantageAdapter, CboeAdapter, PolygonAdapter, SecAdapter, YahooAdapter};

// Batching and enrichment
pub use batch::{chunk_symbols, normalize_symbols, BatchOutcome, ChunkSource, ChunkedFetcher};
pub use enrich::{enrich, select_base, Enrichment};

// Capability contracts
pub use data_source::{
    CandlesFetcher, CandlesOptions, Capability, CapabilitySet, FetchFuture, MetadataFetcher,
    MetadataOptions, OptionableFetcher, OptionableKind, OptionableOptions, Provider, SourceError,
    SourceErrorKind, TickersFetcher, TickersOptions,
};

// Domain models
pub use domain::{
    date_to_epoch_ms, epoch_seconds_to_ms, format_date, parse_date, today_utc, volume_from_f64,
    volume_from_i64, BarInterval, Candle, Symbol, Ticker, Timespan,
};

// Error types
pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Normalization
pub use normalize::{CandleFields, Normalized, Rejection, TickerFields};

// Pacing and pagination
pub use pacing::{Cooldown, RecordingCooldown, TokioCooldown};
pub use pagination::{Page, PageSource, PageWalk, Paginator};

// Provider policies and registry
pub use provider_policy::ProviderPolicy;
pub use registry::{ProviderEntry, ProviderRegistry, Tier};

// Retry logic
pub use retry::{Backoff, RetryConfig, RetryingHttpClient};

// Source identifiers
pub use source::ProviderId;
