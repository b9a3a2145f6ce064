//! Provider registry and factory.
//!
//! Maps a provider name to its constructor, tier and credential variable.
//! Construction reads credentials and wires the shared transport; it never
//! touches the network.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use tracing::debug;

use crate::adapters::{AlphaVantageAdapter, CboeAdapter, PolygonAdapter, SecAdapter, YahooAdapter};
use crate::data_source::{CapabilitySet, Provider, SourceError};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::pacing::{Cooldown, TokioCooldown};
use crate::provider_policy::ProviderPolicy;
use crate::retry::RetryingHttpClient;
use crate::ProviderId;

/// Optional contact string EDGAR expects in the User-Agent of automated clients.
pub const SEC_USER_AGENT_ENV: &str = "SEC_USER_AGENT";

/// Informational pricing tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Premium => "premium",
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static registry row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderEntry {
    pub id: ProviderId,
    pub tier: Tier,
    /// Environment variable holding the required credential, if any.
    pub credential_env: Option<&'static str>,
    pub capabilities: CapabilitySet,
}

pub const ENTRIES: [ProviderEntry; 5] = [
    ProviderEntry {
        id: ProviderId::Yfinance,
        tier: Tier::Free,
        credential_env: None,
        capabilities: CapabilitySet::new(true, true, true, true),
    },
    ProviderEntry {
        id: ProviderId::Polygon,
        tier: Tier::Premium,
        credential_env: Some("POLYGON_API_KEY"),
        capabilities: CapabilitySet::new(true, true, true, true),
    },
    ProviderEntry {
        id: ProviderId::AlphaVantage,
        tier: Tier::Free,
        credential_env: Some("ALPHA_VANTAGE_API_KEY"),
        capabilities: CapabilitySet::new(true, true, false, false),
    },
    ProviderEntry {
        id: ProviderId::Sec,
        tier: Tier::Free,
        credential_env: None,
        capabilities: CapabilitySet::new(true, false, false, false),
    },
    ProviderEntry {
        id: ProviderId::Cboe,
        tier: Tier::Free,
        credential_env: None,
        capabilities: CapabilitySet::new(false, false, true, false),
    },
];

/// Looks up the static entry for `id`.
pub fn entry(id: ProviderId) -> &'static ProviderEntry {
    match id {
        ProviderId::Yfinance => &ENTRIES[0],
        ProviderId::Polygon => &ENTRIES[1],
        ProviderId::AlphaVantage => &ENTRIES[2],
        ProviderId::Sec => &ENTRIES[3],
        ProviderId::Cboe => &ENTRIES[4],
    }
}

/// Builds provider instances that share one HTTP client and one pacer.
///
/// ```rust,ignore
/// let registry = ProviderRegistry::new();
/// let polygon = registry.create("polygon")?; // reads POLYGON_API_KEY
/// ```
#[derive(Clone)]
pub struct ProviderRegistry {
    http_client: Arc<dyn HttpClient>,
    pacer: Arc<dyn Cooldown>,
    policies: HashMap<ProviderId, ProviderPolicy>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    /// Production registry: reqwest transport and real sleeps.
    pub fn new() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()), Arc::new(TokioCooldown))
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, pacer: Arc<dyn Cooldown>) -> Self {
        Self {
            http_client,
            pacer,
            policies: HashMap::new(),
        }
    }

    /// Replaces the default policy of `policy.provider_id`.
    pub fn with_policy(mut self, policy: ProviderPolicy) -> Self {
        self.policies.insert(policy.provider_id, policy);
        self
    }

    pub fn entries(&self) -> &'static [ProviderEntry] {
        &ENTRIES
    }

    pub fn policy(&self, id: ProviderId) -> ProviderPolicy {
        self.policies
            .get(&id)
            .cloned()
            .unwrap_or_else(|| ProviderPolicy::default_for(id))
    }

    /// Creates the named provider, reading its credential from the process environment.
    pub fn create(&self, name: &str) -> Result<Arc<dyn Provider>, SourceError> {
        self.create_with(name, |key| std::env::var(key).ok())
    }

    /// Creates the named provider using `lookup` for environment values.
    pub fn create_with<F>(&self, name: &str, lookup: F) -> Result<Arc<dyn Provider>, SourceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let id: ProviderId = name.parse()?;
        let entry = entry(id);
        let credential = match entry.credential_env {
            Some(env_var) => {
                let value = lookup(env_var)
                    .map(|value| value.trim().to_owned())
                    .filter(|value| !value.is_empty())
                    .ok_or_else(|| SourceError::missing_credential(env_var))?;
                Some(value)
            }
            None => None,
        };

        let policy = self.policy(id);
        let http_client: Arc<dyn HttpClient> = Arc::new(RetryingHttpClient::new(
            Arc::clone(&self.http_client),
            policy.retry.clone(),
        ));
        let pacer = Arc::clone(&self.pacer);
        debug!(provider = %id, tier = %entry.tier, "constructing provider");

        let provider: Arc<dyn Provider> = match id {
            ProviderId::Polygon => Arc::new(
                PolygonAdapter::with_http_client(http_client, credential.unwrap_or_default())
                    .with_policy(policy)
                    .with_cooldown(pacer),
            ),
            ProviderId::AlphaVantage => Arc::new(
                AlphaVantageAdapter::with_http_client(http_client, credential.unwrap_or_default())
                    .with_policy(policy),
            ),
            ProviderId::Yfinance => Arc::new(
                YahooAdapter::with_http_client(http_client)
                    .with_policy(policy)
                    .with_cooldown(pacer),
            ),
            ProviderId::Sec => {
                let adapter = SecAdapter::with_http_client(http_client).with_policy(policy);
                match lookup(SEC_USER_AGENT_ENV).filter(|value| !value.trim().is_empty()) {
                    Some(user_agent) => Arc::new(adapter.with_user_agent(user_agent.trim())),
                    None => Arc::new(adapter),
                }
            }
            ProviderId::Cboe => Arc::new(CboeAdapter::with_http_client(http_client).with_policy(policy)),
        };
        Ok(provider)
    }
}
