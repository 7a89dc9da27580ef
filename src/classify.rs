//! Resource classification.
//!
//! Maps a raw path segment (lowercased, leading `/` stripped) to an IP
//! literal, an ASN or a registrable domain, in that order of preference.

use crate::errors::LookupError;
use idna::AsciiDenyList;
use once_cell::sync::Lazy;
use public_suffix::{EffectiveTLDProvider, DEFAULT_PROVIDER};
use regex::Regex;
use std::net::IpAddr;

static ASN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:as|asn)?\d+$").unwrap());

// Conservative LDH shape: dotted labels up to 63 octets, letters-only final
// label. Applied to ASCII input only; internationalized names are validated
// by the IDN conversion instead, since their A-label form (`xn--…`) would
// never pass the letters-only tail.
static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,}$").unwrap()
});

/// A classified, normalized lookup target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Ip { addr: IpAddr, literal: String },
    Asn { number: u32 },
    /// `name` is the punycoded registrable domain (eTLD+1); `tld` is the
    /// rightmost label, the key into the registry tables.
    Domain { name: String, tld: String },
}

impl Resource {
    /// Canonical identifier used in the cache key.
    pub fn canonical(&self) -> String {
        match self {
            Resource::Ip { literal, .. } => literal.clone(),
            Resource::Asn { number } => number.to_string(),
            Resource::Domain { name, .. } => name.clone(),
        }
    }

    pub fn cache_key(&self) -> String {
        format!("whois:{}", self.canonical())
    }
}

/// Classify a normalized path segment.
pub fn classify(resource: &str) -> Result<Resource, LookupError> {
    if resource.is_empty() {
        return Err(LookupError::BadRequest("empty resource".to_string()));
    }

    if let Ok(addr) = resource.parse::<IpAddr>() {
        return Ok(Resource::Ip {
            addr,
            literal: resource.to_string(),
        });
    }

    if ASN_RE.is_match(resource) {
        let digits = resource
            .strip_prefix("asn")
            .or_else(|| resource.strip_prefix("as"))
            .unwrap_or(resource);
        let number: u32 = digits.parse().map_err(|_| {
            LookupError::BadRequest(format!("invalid ASN: {resource}"))
        })?;
        return Ok(Resource::Asn { number });
    }

    if resource.is_ascii() && !DOMAIN_RE.is_match(resource) {
        return Err(LookupError::BadRequest(format!(
            "unrecognized resource: {resource}"
        )));
    }

    let ascii = idna::domain_to_ascii_cow(resource.as_bytes(), AsciiDenyList::URL)
        .map_err(|_| LookupError::BadRequest(format!("Invalid domain name: {resource}")))?;

    // Registrable domain; when the public-suffix data cannot produce an
    // eTLD+1 (e.g. the name is itself a suffix) keep the full name, the way
    // the registry expects to be queried.
    let name = match DEFAULT_PROVIDER.effective_tld_plus_one(&ascii) {
        Ok(main) => main.to_string(),
        Err(_) => ascii.to_string(),
    };

    // Multi-label suffixes such as `com.cn` collapse to their rightmost
    // label, which is how the registry tables are keyed.
    let tld = name
        .rsplit('.')
        .next()
        .unwrap_or(&name)
        .to_string();

    Ok(Resource::Domain { name, tld })
}
