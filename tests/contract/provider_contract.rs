#[path = "../support/mod.rs"]
mod support;

use std::sync::Arc;
use std::time::Duration;

use marketfeed_core::{
    parse_date, service, BarInterval, CandlesOptions, Capability, OptionableOptions, Provider,
    ProviderId, RecordingCooldown, SourceErrorKind, Symbol, TickersOptions,
};

use support::{credentials, registry, FakeUpstream};

#[derive(Clone, Copy)]
struct ProviderCase {
    id: ProviderId,
    tickers: bool,
    candles: bool,
    optionable: bool,
    metadata: bool,
}

fn provider_cases() -> Vec<ProviderCase> {
    vec![
        ProviderCase {
            id: ProviderId::Yfinance,
            tickers: true,
            candles: true,
            optionable: true,
            metadata: true,
        },
        ProviderCase {
            id: ProviderId::Polygon,
            tickers: true,
            candles: true,
            optionable: true,
            metadata: true,
        },
        ProviderCase {
            id: ProviderId::AlphaVantage,
            tickers: true,
            candles: true,
            optionable: false,
            metadata: false,
        },
        ProviderCase {
            id: ProviderId::Sec,
            tickers: true,
            candles: false,
            optionable: false,
            metadata: false,
        },
        ProviderCase {
            id: ProviderId::Cboe,
            tickers: false,
            candles: false,
            optionable: true,
            metadata: false,
        },
    ]
}

fn build(id: ProviderId) -> (Arc<FakeUpstream>, Arc<dyn Provider>) {
    let upstream = Arc::new(FakeUpstream::new());
    let pacer = Arc::new(RecordingCooldown::new());
    let provider = registry(&upstream, &pacer)
        .create_with(id.as_str(), credentials)
        .unwrap_or_else(|error| panic!("provider '{id}' should build: {error}"));
    (upstream, provider)
}

fn candle_options() -> CandlesOptions {
    CandlesOptions::new(
        Symbol::parse("AAPL").expect("valid symbol"),
        parse_date("2024-01-02").expect("valid date"),
        parse_date("2024-01-05").expect("valid date"),
        BarInterval::daily(),
    )
    .expect("valid range")
}

#[test]
fn declared_capabilities_match_the_registry_for_all_providers() {
    for case in provider_cases() {
        let (upstream, provider) = build(case.id);
        let capabilities = provider.capabilities();

        assert_eq!(provider.id(), case.id);
        assert_eq!(capabilities.tickers, case.tickers, "provider '{}': tickers", case.id);
        assert_eq!(capabilities.candles, case.candles, "provider '{}': candles", case.id);
        assert_eq!(capabilities.optionable, case.optionable, "provider '{}': optionable", case.id);
        assert_eq!(capabilities.metadata, case.metadata, "provider '{}': metadata", case.id);
        assert_eq!(upstream.calls(), 0, "provider '{}': construction is offline", case.id);
    }
}

#[tokio::test]
async fn unsupported_capabilities_fail_before_any_request() {
    for case in provider_cases() {
        let (upstream, provider) = build(case.id);
        let mut expected_failures = Vec::new();

        if !case.tickers {
            let error = service::list_tickers(provider.as_ref(), &TickersOptions::default())
                .await
                .expect_err("tickers unsupported");
            expected_failures.push((Capability::Tickers, error));
        }
        if !case.candles {
            let error = service::list_candles(provider.as_ref(), &candle_options())
                .await
                .expect_err("candles unsupported");
            expected_failures.push((Capability::Candles, error));
        }
        if !case.optionable {
            let error = service::list_optionable(provider.as_ref(), &OptionableOptions::default())
                .await
                .expect_err("optionable unsupported");
            expected_failures.push((Capability::Optionable, error));
        }
        if !case.metadata {
            let error = service::fetch_metadata(provider.as_ref(), &["AAPL"], Some(10), Some(Duration::ZERO))
                .await
                .expect_err("metadata unsupported");
            expected_failures.push((Capability::Metadata, error));
            let error = service::enrich_tickers_with_metadata(
                provider.as_ref(),
                &TickersOptions::default(),
                Some(5),
                None,
                None,
            )
            .await
            .expect_err("enrichment unsupported");
            expected_failures.push((Capability::Metadata, error));
        }

        for (capability, error) in expected_failures {
            assert_eq!(
                error.kind(),
                SourceErrorKind::UnsupportedCapability,
                "provider '{}': {capability}",
                case.id
            );
            assert!(error.message().contains(case.id.as_str()));
        }
        assert_eq!(upstream.calls(), 0, "provider '{}' must not touch the network", case.id);
    }
}

#[tokio::test]
async fn unreachable_upstream_degrades_to_empty_lists_for_all_providers() {
    for case in provider_cases() {
        let (upstream, provider) = build(case.id);

        if case.tickers {
            let tickers = service::list_tickers(provider.as_ref(), &TickersOptions::default())
                .await
                .unwrap_or_else(|error| panic!("provider '{}' tickers: {error}", case.id));
            assert!(tickers.is_empty(), "provider '{}': tickers", case.id);
        }
        if case.candles {
            let candles = service::list_candles(provider.as_ref(), &candle_options())
                .await
                .unwrap_or_else(|error| panic!("provider '{}' candles: {error}", case.id));
            assert!(candles.is_empty(), "provider '{}': candles", case.id);
        }
        if case.optionable {
            let optionable = service::list_optionable(provider.as_ref(), &OptionableOptions::default())
                .await
                .unwrap_or_else(|error| panic!("provider '{}' optionable: {error}", case.id));
            assert!(optionable.is_empty(), "provider '{}': optionable", case.id);
        }
        if case.metadata {
            let metadata = service::fetch_metadata(provider.as_ref(), &["AAPL"], Some(10), Some(Duration::ZERO))
                .await
                .unwrap_or_else(|error| panic!("provider '{}' metadata: {error}", case.id));
            assert!(metadata.is_empty(), "provider '{}': metadata", case.id);
        }
        assert!(upstream.calls() > 0, "provider '{}' should have tried upstream", case.id);
    }
}
