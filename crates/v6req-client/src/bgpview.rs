//! BGPView response shapes
//!
//! Every endpoint wraps its payload in `{"status": ..., "data": {...}}`.
//! BGPView sends `null` for absent scalars and lists, so everything
//! optional is decoded as `Option` and normalised on conversion.

use serde::Deserialize;
use v6req_core::{Asn, AsnDetails, IpAsn};

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// `GET /asn/{asn}/prefixes`
#[derive(Debug, Deserialize)]
pub(crate) struct PrefixesData {
    #[serde(default)]
    ipv6_prefixes: Option<Vec<PrefixEntry>>,
}

#[derive(Debug, Deserialize)]
struct PrefixEntry {
    prefix: String,
}

impl PrefixesData {
    /// Flatten to prefix strings, keeping upstream order
    pub fn into_prefixes(self) -> Vec<String> {
        self.ipv6_prefixes
            .unwrap_or_default()
            .into_iter()
            .map(|p| p.prefix)
            .collect()
    }
}

/// `GET /ip/{ip}`
#[derive(Debug, Deserialize)]
pub(crate) struct IpData {
    #[serde(default)]
    prefixes: Option<Vec<IpPrefix>>,
}

#[derive(Debug, Deserialize)]
struct IpPrefix {
    asn: IpPrefixAsn,
}

#[derive(Debug, Deserialize)]
struct IpPrefixAsn {
    #[serde(default)]
    asn: u32,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl IpData {
    /// ASN of the most specific (first) prefix, if any
    ///
    /// Falls back to the AS description when the name is blank.
    pub fn into_ip_asn(self) -> Option<IpAsn> {
        let first = self.prefixes?.into_iter().next()?;
        let organization = non_empty(first.asn.name)
            .or_else(|| non_empty(first.asn.description))
            .unwrap_or_default();

        Some(IpAsn {
            asn: Asn(first.asn.asn),
            organization,
        })
    }
}

/// `GET /asn/{asn}`
#[derive(Debug, Deserialize)]
pub(crate) struct AsnData {
    #[serde(default)]
    asn: u32,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description_short: Option<String>,
    #[serde(default)]
    description_full: Option<Vec<String>>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    email_contacts: Option<Vec<String>>,
    #[serde(default)]
    abuse_contacts: Option<Vec<String>>,
    #[serde(default)]
    traffic_ratio: Option<String>,
    #[serde(default)]
    owner_address: Option<Vec<String>>,
    #[serde(default)]
    rir_allocation: Option<RirAllocation>,
    #[serde(default)]
    iana_assignment: Option<IanaAssignment>,
    #[serde(default)]
    date_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RirAllocation {
    #[serde(default)]
    rir_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IanaAssignment {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    whois_server: Option<String>,
}

impl From<AsnData> for AsnDetails {
    fn from(data: AsnData) -> Self {
        let (iana_assignment, whois_server) = match data.iana_assignment {
            Some(iana) => (non_empty(iana.description), non_empty(iana.whois_server)),
            None => (None, None),
        };

        AsnDetails {
            asn: Asn(data.asn),
            name: data.name.unwrap_or_default(),
            short_description: non_empty(data.description_short),
            full_description: data.description_full.unwrap_or_default(),
            country_code: non_empty(data.country_code),
            website: non_empty(data.website),
            email_contacts: data.email_contacts.unwrap_or_default(),
            abuse_contacts: data.abuse_contacts.unwrap_or_default(),
            traffic_ratio: non_empty(data.traffic_ratio),
            owner_address: data.owner_address.unwrap_or_default(),
            rir_allocation: data.rir_allocation.and_then(|rir| non_empty(rir.rir_name)),
            iana_assignment,
            whois_server,
            date_updated: non_empty(data.date_updated),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
