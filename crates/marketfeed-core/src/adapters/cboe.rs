use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::{fetch_text, BROWSER_USER_AGENT};
use crate::data_source::{
    FetchFuture, OptionableFetcher, OptionableKind, OptionableOptions, Provider, SourceError,
};
use crate::delimited::DelimitedTable;
use crate::http_client::{HttpClient, HttpRequest};
use crate::normalize::{normalize_batch, TickerFields};
use crate::provider_policy::ProviderPolicy;
use crate::{ProviderId, Ticker};

const SYMBOL_COLUMN: &str = "Stock Symbol";
const NAME_COLUMN: &str = "Company Name";

fn directory_url(kind: OptionableKind) -> &'static str {
    match kind {
        OptionableKind::All => "https://www.cboe.com/us/options/symboldir/?download=csv",
        OptionableKind::Weeklies => {
            "https://www.cboe.com/us/options/symboldir/weeklys_options/?download=csv"
        }
        OptionableKind::Quarterlies => {
            "https://www.cboe.com/us/options/symboldir/quarterlys_options/?download=csv"
        }
    }
}

/// CBOE options symbol directory.
#[derive(Clone)]
pub struct CboeAdapter {
    http_client: Arc<dyn HttpClient>,
    policy: ProviderPolicy,
}

impl CboeAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            policy: ProviderPolicy::cboe_default(),
        }
    }

    pub fn with_policy(mut self, policy: ProviderPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Provider for CboeAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Cboe
    }

    fn policy(&self) -> &ProviderPolicy {
        &self.policy
    }

    fn optionable(&self) -> Option<&dyn OptionableFetcher> {
        Some(self)
    }
}

impl OptionableFetcher for CboeAdapter {
    fn fetch_optionable<'a>(
        &'a self,
        options: &'a OptionableOptions,
    ) -> FetchFuture<'a, Vec<Ticker>> {
        Box::pin(async move {
            if options.exchange.is_some() {
                warn!(provider = "cboe", "exchange filter is not supported and is ignored");
            }
            let url = directory_url(options.kind);
            info!(provider = "cboe", kind = %options.kind, url, "downloading options symbol directory");

            let request = HttpRequest::get(url)
                .with_header("user-agent", BROWSER_USER_AGENT)
                .with_timeout_ms(self.policy.request_timeout_ms);
            let body = fetch_text(ProviderId::Cboe, self.http_client.as_ref(), request).await?;
            let table = DelimitedTable::parse(&body, b',').map_err(|error| {
                SourceError::internal(format!("failed to parse cboe directory: {error}"))
            })?;

            if table.is_empty() {
                warn!(provider = "cboe", "directory is empty");
                return Ok(Vec::new());
            }
            if !table.headers().iter().any(|header| header == SYMBOL_COLUMN) {
                return Err(SourceError::internal(format!(
                    "cboe directory has no '{SYMBOL_COLUMN}' column, found: {}",
                    table.headers().join(", ")
                )));
            }

            let rows = table
                .rows()
                .filter(|row| row.get(SYMBOL_COLUMN).is_some())
                .take(options.max_results.unwrap_or(usize::MAX));
            let normalized = normalize_batch(ProviderId::Cboe, "ticker", rows, |row| {
                TickerFields {
                    symbol: row.owned(SYMBOL_COLUMN),
                    name: row.owned(NAME_COLUMN),
                    active: Some(true),
                    optionable: Some(true),
                    ..TickerFields::default()
                }
                .into_ticker()
            });
            info!(
                provider = "cboe",
                kind = %options.kind,
                total = normalized.records.len(),
                "parsed optionable symbols"
            );
            Ok(normalized.into_records())
        })
    }
}
