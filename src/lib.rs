//! # whois-gateway
//!
//! An HTTP gateway that resolves a single path-segment identifier (a domain
//! name, an IP literal or an autonomous-system number) to a normalized JSON
//! record describing that Internet resource.
//!
//! The pipeline classifies the identifier, picks the authoritative registry
//! from static TLD / CIDR / ASN-range tables, queries it over RDAP (HTTPS +
//! JSON) or legacy WHOIS (TCP port 43), parses the answer into a canonical
//! record and caches it in a Redis-primary, in-memory-fallback tier.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use whois_gateway::classify::classify;
//! use whois_gateway::registry;
//!
//! let resource = classify("example.com").unwrap();
//! assert_eq!(resource.cache_key(), "whois:example.com");
//! assert!(registry::rdap_server_for_tld("com").is_some());
//! ```

pub mod cache;
pub mod classify;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod rdap;
pub mod rdap_parse;
pub mod records;
pub mod registry;
pub mod whois;
pub mod whois_parsers;

pub use cache::{Cache, FallbackCache, MemoryCache, RedisCache};
pub use config::Config;
pub use errors::LookupError;
pub use records::{AsnInfo, DomainInfo, IpInfo};
