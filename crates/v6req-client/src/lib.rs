//! Cached, retrying client for the BGPView routing-data API
//!
//! Provides the three lookups the web front end needs:
//! - IP address → ASN and organization name
//! - ASN → announced IPv6 prefixes
//! - ASN → organization record
//!
//! Each lookup checks its own [`TtlCache`] first, and on a miss calls
//! upstream through a [`RetryPolicy`] (transport errors and HTTP 429 are
//! retried with exponential backoff), classifies the status, decodes the
//! body and caches the result.
//!
//! # Examples
//!
//! ```no_run
//! use v6req_client::LookupClient;
//! use v6req_core::{Asn, LookupConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LookupClient::new(LookupConfig::default())?;
//! let prefixes = client.ipv6_prefixes(Asn(19625)).await?;
//! println!("{} IPv6 prefixes", prefixes.len());
//! # Ok(())
//! # }
//! ```

mod bgpview;
pub mod retry;

pub use retry::{RateLimitSignal, RetryPolicy, Sleeper, TokioSleeper};

use bgpview::{AsnData, Envelope, IpData, PrefixesData};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use thiserror::Error;
use v6req_cache::{Clock, SystemClock, TtlCache};
use v6req_core::{Asn, AsnDetails, IpAsn, LookupConfig};

/// Lookup errors
#[derive(Error, Debug)]
pub enum LookupError {
    /// Network, DNS or timeout failure after all attempts
    #[error("BGPView API request failed for {subject}: {reason}")]
    Transport { subject: String, reason: String },

    /// Still rate limited after all attempts
    #[error("BGPView API rate limit exceeded for {subject}. Please try again in a few minutes")]
    RateLimited { subject: String },

    /// Any other non-200 status
    #[error("BGPView API returned status {status} for {subject}")]
    UpstreamStatus { status: u16, subject: String },

    /// Body was not the JSON shape we expect
    #[error("failed to parse BGPView response for {subject}: {reason}")]
    Decode { subject: String, reason: String },

    /// IP is not covered by any announced prefix
    #[error("no ASN found for IP {0}")]
    NotFound(String),
}

impl LookupError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, LookupError::RateLimited { .. })
    }
}

pub type Result<T> = std::result::Result<T, LookupError>;

/// Cache key prefix for IP → ASN resolutions
pub const IP_KEY_PREFIX: &str = "ip_";
/// Cache key prefix for IPv6 prefix lists
pub const PREFIXES_KEY_PREFIX: &str = "asn_";
/// Cache key prefix for organization records
pub const DETAILS_KEY_PREFIX: &str = "asn_details_";

pub fn ip_key(ip: IpAddr) -> String {
    format!("{}{}", IP_KEY_PREFIX, ip)
}

pub fn prefixes_key(asn: Asn) -> String {
    format!("{}{}", PREFIXES_KEY_PREFIX, asn.number())
}

pub fn details_key(asn: Asn) -> String {
    format!("{}{}", DETAILS_KEY_PREFIX, asn.number())
}

/// One typed cache per lookup kind
#[derive(Debug, Clone)]
pub struct LookupCaches {
    pub ip: Arc<TtlCache<IpAsn>>,
    pub prefixes: Arc<TtlCache<Vec<String>>>,
    pub details: Arc<TtlCache<AsnDetails>>,
}

impl LookupCaches {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Caches whose expiry follows `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            ip: Arc::new(TtlCache::with_clock(clock.clone())),
            prefixes: Arc::new(TtlCache::with_clock(clock.clone())),
            details: Arc::new(TtlCache::with_clock(clock)),
        }
    }
}

impl Default for LookupCaches {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP client for BGPView lookups
///
/// Holds the connection pool, retry policy, outbound pacer and caches.
/// Share one instance across request handlers with `Arc`.
pub struct LookupClient<S = TokioSleeper> {
    http: Client,
    config: LookupConfig,
    retry: RetryPolicy<S>,
    pacer: Option<DefaultDirectRateLimiter>,
    caches: LookupCaches,
}

impl LookupClient {
    /// Create a client with fresh caches and real backoff waits
    pub fn new(config: LookupConfig) -> Result<Self> {
        let retry = RetryPolicy::new(config.max_attempts);
        Self::with_parts(config, LookupCaches::new(), retry)
    }
}

impl<S: Sleeper> LookupClient<S> {
    /// Create a client from explicit caches and retry policy
    pub fn with_parts(config: LookupConfig, caches: LookupCaches, retry: RetryPolicy<S>) -> Result<Self> {
        let http = Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(config.timeout)
            .user_agent(concat!("v6req/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LookupError::Transport {
                subject: "client setup".to_string(),
                reason: e.to_string(),
            })?;

        let pacer = NonZeroU32::new(config.requests_per_second)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self {
            http,
            config,
            retry,
            pacer,
            caches,
        })
    }

    pub fn caches(&self) -> &LookupCaches {
        &self.caches
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    /// Resolve the ASN an IP address is routed through
    ///
    /// Uses the first, most specific, covering prefix. Fails with
    /// [`LookupError::NotFound`] when no prefix covers the address.
    pub async fn asn_for_ip(&self, ip: IpAddr) -> Result<IpAsn> {
        let key = ip_key(ip);
        if let Some(cached) = self.caches.ip.get(&key).await {
            return Ok(cached);
        }

        let subject = format!("IP {}", ip);
        let url = format!("{}/ip/{}", self.config.base_url, ip);
        let data: IpData = self.fetch_json(&url, &subject).await?;
        let resolved = data
            .into_ip_asn()
            .ok_or_else(|| LookupError::NotFound(ip.to_string()))?;

        self.caches
            .ip
            .set(&key, resolved.clone(), self.config.ip_ttl)
            .await;
        Ok(resolved)
    }

    /// IPv6 prefixes announced by `asn`, in upstream order
    ///
    /// An ASN without IPv6 yields an empty list, not an error.
    pub async fn ipv6_prefixes(&self, asn: Asn) -> Result<Vec<String>> {
        let key = prefixes_key(asn);
        if let Some(cached) = self.caches.prefixes.get(&key).await {
            return Ok(cached);
        }

        let subject = format!("ASN {}", asn.number());
        let url = format!(
            "{}/asn/{}/prefixes?type=ipv6",
            self.config.base_url,
            asn.number()
        );
        let data: PrefixesData = self.fetch_json(&url, &subject).await?;
        let prefixes = data.into_prefixes();

        self.caches
            .prefixes
            .set(&key, prefixes.clone(), self.config.prefixes_ttl)
            .await;
        Ok(prefixes)
    }

    /// Organization record for `asn`
    pub async fn asn_details(&self, asn: Asn) -> Result<AsnDetails> {
        let key = details_key(asn);
        if let Some(cached) = self.caches.details.get(&key).await {
            return Ok(cached);
        }

        let subject = format!("ASN {} details", asn.number());
        let url = format!("{}/asn/{}", self.config.base_url, asn.number());
        let data: AsnData = self.fetch_json(&url, &subject).await?;
        let details = AsnDetails::from(data);

        self.caches
            .details
            .set(&key, details.clone(), self.config.details_ttl)
            .await;
        Ok(details)
    }

    /// GET `url` with retries, then classify and decode the envelope
    async fn fetch_json<T: DeserializeOwned>(&self, url: &str, subject: &str) -> Result<T> {
        tracing::debug!(%url, "cache miss, querying upstream");

        let http = &self.http;
        let pacer = self.pacer.as_ref();
        let response = self
            .retry
            .execute(|| async move {
                if let Some(pacer) = pacer {
                    pacer.until_ready().await;
                }
                http.get(url).send().await
            })
            .await
            .map_err(|e| LookupError::Transport {
                subject: subject.to_string(),
                reason: e.to_string(),
            })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(LookupError::RateLimited {
                    subject: subject.to_string(),
                })
            }
            status => {
                return Err(LookupError::UpstreamStatus {
                    status: status.as_u16(),
                    subject: subject.to_string(),
                })
            }
        }

        let body = response.bytes().await.map_err(|e| LookupError::Transport {
            subject: subject.to_string(),
            reason: e.to_string(),
        })?;

        serde_json::from_slice::<Envelope<T>>(&body)
            .map(|envelope| envelope.data)
            .map_err(|e| LookupError::Decode {
                subject: subject.to_string(),
                reason: e.to_string(),
            })
    }
}
