//! Request orchestration for the v6req web front end
//!
//! For every inbound request the [`Orchestrator`]:
//! - derives the client IP (forwarded-for, then real-IP, then peer address)
//! - tries to auto-detect the client's ASN; failure is silently ignored
//! - for a submitted ASN, fetches the organization record and the IPv6
//!   prefixes side by side; a details failure is ignored, a prefix
//!   failure becomes the page error
//!
//! The resulting [`PageData`] is rendered by [`render::render_page`] and
//! served by [`transport`].

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use v6req_client::LookupClient;
use v6req_core::message::request_message;
use v6req_core::{Asn, AsnDetails};

pub mod render;
pub mod transport;

/// Web front end errors
#[derive(Error, Debug)]
pub enum WebError {
    /// Could not bind the listen address
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, WebError>;

/// Everything the page template needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageData {
    /// ASN shown in the form: the submitted one, or the detected one on GET
    pub asn: String,
    /// IPv6 prefixes of the submitted ASN; `None` when nothing was looked up
    pub prefixes: Option<Vec<String>>,
    /// Page-level error
    pub error: Option<String>,
    pub source_ip: Option<String>,
    pub detected_asn: Option<Asn>,
    pub asn_name: Option<String>,
    pub details: Option<AsnDetails>,
    /// Generated request message for the provider
    pub message: Option<String>,
}

impl PageData {
    pub fn auto_detected(&self) -> bool {
        self.detected_asn.is_some()
    }
}

/// Client address as seen through proxies
///
/// Prefers the first `X-Forwarded-For` entry, then `X-Real-IP`, then the
/// connection's peer address.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(first) = header("x-forwarded-for")
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return Some(first.to_string());
    }

    if let Some(real_ip) = header("x-real-ip") {
        return Some(real_ip.to_string());
    }

    peer.map(|addr| addr.ip().to_canonical().to_string())
}

/// Runs the lookups for one inbound request
pub struct Orchestrator {
    client: Arc<LookupClient>,
}

impl Orchestrator {
    pub fn new(client: Arc<LookupClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &LookupClient {
        &self.client
    }

    /// Build the page for a request from `source_ip`
    ///
    /// `submitted_asn` is the raw form value of a POST, `None` for GET.
    pub async fn handle(&self, source_ip: Option<String>, submitted_asn: Option<&str>) -> PageData {
        let mut page = PageData {
            source_ip: source_ip.clone(),
            ..PageData::default()
        };

        if let Some(ip) = source_ip.as_deref() {
            self.detect(ip, &mut page).await;
        }

        match submitted_asn {
            Some(raw) => {
                page.asn = raw.trim().to_string();
                match raw.parse::<Asn>() {
                    Ok(asn) => self.lookup(asn, &mut page).await,
                    Err(e) => page.error = Some(e.to_string()),
                }
            }
            None => {
                if let Some(asn) = page.detected_asn {
                    page.asn = asn.number().to_string();
                }
            }
        }

        page
    }

    async fn detect(&self, ip: &str, page: &mut PageData) {
        let addr = match ip.parse::<IpAddr>() {
            Ok(addr) => addr,
            Err(_) => {
                tracing::debug!(ip, "client address is not an IP, skipping ASN detection");
                return;
            }
        };

        match self.client.asn_for_ip(addr).await {
            Ok(resolved) => {
                page.detected_asn = Some(resolved.asn);
                page.asn_name = Some(resolved.organization);
            }
            Err(e) => tracing::debug!(ip, error = %e, "ASN auto-detection failed"),
        }
    }

    async fn lookup(&self, asn: Asn, page: &mut PageData) {
        let (details, prefixes) =
            tokio::join!(self.client.asn_details(asn), self.client.ipv6_prefixes(asn));

        match details {
            Ok(details) => page.details = Some(details),
            Err(e) => tracing::debug!(%asn, error = %e, "ASN details unavailable"),
        }

        match prefixes {
            Ok(prefixes) => {
                page.message = Some(request_message(&prefixes));
                page.prefixes = Some(prefixes);
            }
            Err(e) => {
                tracing::warn!(%asn, error = %e, "IPv6 prefix lookup failed");
                page.error = Some(e.to_string());
            }
        }
    }
}
