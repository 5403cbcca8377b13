//! Core types for v6req
//!
//! This crate provides the foundational types shared by the lookup
//! client, the web front end and the CLI:
//! - [`Asn`] - Autonomous System Number
//! - [`IpAsn`] - the ASN an IP address is routed through
//! - [`AsnDetails`] - organization record for an ASN
//! - [`CoreError`] - Error types
//!
//! ```
//! use v6req_core::Asn;
//!
//! let asn: Asn = "AS19625".parse().unwrap();
//! assert_eq!(asn, Asn(19625));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod config;
pub mod message;

pub use config::{LookupConfig, ServerConfig};

/// Autonomous System Number (ASN)
///
/// A unique identifier for an autonomous system on the internet.
/// Valid range: 0 to 4,294,967,295 (u32)
///
/// # Examples
///
/// ```
/// use v6req_core::Asn;
///
/// let google = Asn(15169);
/// assert_eq!(google.to_string(), "AS15169");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Asn(pub u32);

impl Asn {
    /// Bare decimal form, as used in upstream URLs and cache keys
    pub fn number(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Asn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AS{}", self.0)
    }
}

impl From<u32> for Asn {
    fn from(value: u32) -> Self {
        Asn(value)
    }
}

impl FromStr for Asn {
    type Err = CoreError;

    /// Accepts `19625`, `AS19625` or `as19625`, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("AS")
            .or_else(|| trimmed.strip_prefix("as"))
            .or_else(|| trimmed.strip_prefix("As"))
            .unwrap_or(trimmed);

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidAsn(s.to_string()));
        }

        digits
            .parse::<u32>()
            .map(Asn)
            .map_err(|_| CoreError::InvalidAsn(s.to_string()))
    }
}

/// ASN an IP address resolves to
///
/// `organization` is the short AS name, or the longer description when
/// the registry left the name blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAsn {
    /// The ASN number
    pub asn: Asn,
    /// Organization name
    pub organization: String,
}

/// Organization record for an Autonomous System
///
/// Optional fields are `None` when the registry data does not carry them;
/// list fields are empty in the same case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnDetails {
    pub asn: Asn,
    /// AS name (e.g. "GOOGLE")
    pub name: String,
    pub short_description: Option<String>,
    pub full_description: Vec<String>,
    /// ISO country code (e.g., "US", "GB")
    pub country_code: Option<String>,
    pub website: Option<String>,
    pub email_contacts: Vec<String>,
    pub abuse_contacts: Vec<String>,
    /// Peering traffic ratio as published in PeeringDB
    pub traffic_ratio: Option<String>,
    pub owner_address: Vec<String>,
    /// Name of the RIR that allocated the ASN
    pub rir_allocation: Option<String>,
    /// IANA assignment description
    pub iana_assignment: Option<String>,
    pub whois_server: Option<String>,
    pub date_updated: Option<String>,
}

/// Error types for v6req core operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid ASN number
    #[error("Invalid ASN: {0}")]
    InvalidAsn(String),

    /// Bad configuration value
    #[error("Invalid configuration for {name}: {reason}")]
    Config { name: String, reason: String },
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
