//! Behavior-driven tests for error handling and credential safety
//!
//! These tests verify which failures abort an operation, which degrade to
//! empty or partial results, and that credentials never leak into errors.

mod support;

use std::sync::Arc;

use marketfeed_core::{
    parse_date, service, BarInterval, CandlesOptions, HttpError, OptionableKind, OptionableOptions,
    RecordingCooldown, SourceErrorKind, Symbol, TickersOptions, Timespan,
};

use support::{credentials, no_credentials, registry, FakeUpstream};

fn daily_aapl() -> CandlesOptions {
    CandlesOptions::new(
        Symbol::parse("AAPL").expect("valid"),
        parse_date("2024-01-02").expect("valid"),
        parse_date("2024-01-05").expect("valid"),
        BarInterval::daily(),
    )
    .expect("valid range")
}

// =============================================================================
// Construction errors
// =============================================================================

#[test]
fn when_provider_name_is_unknown_user_receives_unknown_provider() {
    // Given: a registry
    let upstream = Arc::new(FakeUpstream::new());
    let pacer = Arc::new(RecordingCooldown::new());

    // When: an unregistered name is requested
    let error = registry(&upstream, &pacer)
        .create_with("bloomberg", credentials)
        .err()
        .expect("unknown provider");

    // Then: the error is fatal and names the provider
    assert_eq!(error.kind(), SourceErrorKind::UnknownProvider);
    assert!(error.is_fatal());
    assert!(error.message().contains("bloomberg"));
}

#[test]
fn when_credential_is_absent_user_receives_missing_credential_naming_the_variable() {
    let upstream = Arc::new(FakeUpstream::new());
    let pacer = Arc::new(RecordingCooldown::new());
    let registry = registry(&upstream, &pacer);

    for (name, variable) in [("polygon", "POLYGON_API_KEY"), ("alpha_vantage", "ALPHA_VANTAGE_API_KEY")] {
        let error = registry
            .create_with(name, no_credentials)
            .err()
            .expect("missing credential");

        assert_eq!(error.kind(), SourceErrorKind::MissingCredential);
        assert!(error.message().contains(variable));
    }
    assert_eq!(upstream.calls(), 0);
}

#[test]
fn when_no_credential_is_needed_providers_build_without_environment() {
    let upstream = Arc::new(FakeUpstream::new());
    let pacer = Arc::new(RecordingCooldown::new());
    let registry = registry(&upstream, &pacer);

    for name in ["yfinance", "sec", "cboe"] {
        assert!(registry.create_with(name, no_credentials).is_ok(), "{name} should build");
    }
}

// =============================================================================
// Parameter errors
// =============================================================================

#[tokio::test]
async fn when_interval_is_unsupported_user_receives_parameter_error_without_a_request() {
    // Given: a daily-only provider
    let upstream = Arc::new(FakeUpstream::new());
    let pacer = Arc::new(RecordingCooldown::new());
    let alpha = registry(&upstream, &pacer)
        .create_with("alpha_vantage", credentials)
        .expect("builds");
    let mut options = daily_aapl();
    options.interval = BarInterval::new(15, Timespan::Minute).expect("valid interval");

    // When: intraday candles are requested
    let error = service::list_candles(alpha.as_ref(), &options)
        .await
        .expect_err("unsupported interval");

    // Then: the call aborts before reaching upstream
    assert_eq!(error.kind(), SourceErrorKind::UnsupportedParameter);
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn when_option_type_filter_is_unsupported_user_receives_parameter_error() {
    let upstream = Arc::new(FakeUpstream::new());
    let pacer = Arc::new(RecordingCooldown::new());
    let registry = registry(&upstream, &pacer);
    let options = OptionableOptions::new(OptionableKind::Weeklies, None).expect("valid options");

    for name in ["polygon", "yfinance"] {
        let provider = registry.create_with(name, credentials).expect("builds");
        let error = service::list_optionable(provider.as_ref(), &options)
            .await
            .expect_err("weeklies unsupported");
        assert_eq!(error.kind(), SourceErrorKind::UnsupportedParameter, "{name}");
    }
    assert_eq!(upstream.calls(), 0);
}

#[test]
fn when_date_range_is_inverted_user_receives_invalid_request() {
    let error = CandlesOptions::new(
        Symbol::parse("AAPL").expect("valid"),
        parse_date("2024-02-01").expect("valid"),
        parse_date("2024-01-01").expect("valid"),
        BarInterval::daily(),
    )
    .expect_err("inverted range");

    assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
}

// =============================================================================
// Upstream failures
// =============================================================================

#[tokio::test]
async fn when_upstream_keeps_failing_with_5xx_system_retries_then_returns_empty() {
    // Given: an upstream that answers 503 every time
    let upstream = Arc::new(FakeUpstream::new().route("company_tickers.json", 503, "maintenance"));
    let pacer = Arc::new(RecordingCooldown::new());
    let sec = registry(&upstream, &pacer)
        .create_with("sec", credentials)
        .expect("builds");

    // When: tickers are listed
    let tickers = service::list_tickers(sec.as_ref(), &TickersOptions::default())
        .await
        .expect("degrades instead of failing");

    // Then: the request was retried up to the budget and nothing is returned
    assert!(tickers.is_empty());
    assert_eq!(upstream.calls(), 3);
}

#[tokio::test]
async fn when_connection_drops_system_retries_and_degrades() {
    let upstream = Arc::new(
        FakeUpstream::new().fail("symboldir", HttpError::new("connection reset by peer")),
    );
    let pacer = Arc::new(RecordingCooldown::new());
    let cboe = registry(&upstream, &pacer)
        .create_with("cboe", credentials)
        .expect("builds");

    let tickers = service::list_optionable(cboe.as_ref(), &OptionableOptions::default())
        .await
        .expect("degrades instead of failing");

    assert!(tickers.is_empty());
    assert_eq!(upstream.calls(), 3);
}

#[tokio::test]
async fn when_credential_is_rejected_user_receives_fatal_invalid_request() {
    // Given: an upstream that rejects the API key
    let upstream = Arc::new(FakeUpstream::new().route(
        "/v2/aggs/ticker/AAPL",
        401,
        r#"{"status": "ERROR", "error": "Unknown API Key"}"#,
    ));
    let pacer = Arc::new(RecordingCooldown::new());
    let polygon = registry(&upstream, &pacer)
        .create_with("polygon", credentials)
        .expect("builds");

    // When: candles are requested
    let error = service::list_candles(polygon.as_ref(), &daily_aapl())
        .await
        .expect_err("rejected credential aborts");

    // Then: the error aborts, is not retried and does not echo the key
    assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    assert_eq!(upstream.calls(), 1);
    assert!(!error.message().contains("pk-secret-123"));
}

#[tokio::test]
async fn when_alpha_vantage_throttles_system_degrades_to_empty() {
    let upstream = Arc::new(FakeUpstream::new().route(
        "LISTING_STATUS",
        200,
        r#"{"Information": "Thank you for using Alpha Vantage! Please consider spreading out your free API requests more sparingly (1 request per second)."}"#,
    ));
    let pacer = Arc::new(RecordingCooldown::new());
    let alpha = registry(&upstream, &pacer)
        .create_with("alpha_vantage", credentials)
        .expect("builds");

    let tickers = service::list_tickers(alpha.as_ref(), &TickersOptions::default())
        .await
        .expect("throttling degrades");

    assert!(tickers.is_empty());
}

// =============================================================================
// Credential handling
// =============================================================================

#[tokio::test]
async fn polygon_key_travels_in_a_header_not_the_url() {
    let upstream = Arc::new(FakeUpstream::new());
    let pacer = Arc::new(RecordingCooldown::new());
    let polygon = registry(&upstream, &pacer)
        .create_with("polygon", credentials)
        .expect("builds");

    let _ = service::list_candles(polygon.as_ref(), &daily_aapl()).await;

    let request = &upstream.requests()[0];
    assert!(!request.url.contains("pk-secret-123"));
    assert_eq!(
        request.headers.get("authorization").map(String::as_str),
        Some("Bearer pk-secret-123")
    );
}

#[tokio::test]
async fn alpha_vantage_errors_do_not_echo_the_query_string() {
    let upstream = Arc::new(FakeUpstream::new().route("TIME_SERIES_DAILY", 404, "gone"));
    let pacer = Arc::new(RecordingCooldown::new());
    let alpha = registry(&upstream, &pacer)
        .create_with("alpha_vantage", credentials)
        .expect("builds");
    let options = CandlesOptions {
        symbol: Symbol::parse("IBM").expect("valid"),
        ..daily_aapl()
    };

    let error = alpha
        .candles()
        .expect("candles capability")
        .fetch_candles(&options)
        .await
        .expect_err("404");

    assert_eq!(error.kind(), SourceErrorKind::Internal);
    assert!(!error.message().contains("av-secret-456"));
}
