//! RDAP (RFC 7480-7484) query client.
//!
//! Each query builds a fresh `reqwest::Client`: proxy settings vary per TLD,
//! and mutating a shared client's transport across concurrent requests is a
//! race. Construction is cheap relative to the network round-trip.

use crate::{config::Config, errors::LookupError, registry};
use reqwest::{header::ACCEPT, StatusCode};
use std::time::Duration;
use tracing::info;
use url::Url;

const RDAP_TIMEOUT: Duration = Duration::from_secs(10);
const RDAP_MEDIA_TYPE: &str = "application/rdap+json";

fn rdap_url(base: &str, kind: &str, identifier: &str) -> String {
    format!("{base}{kind}/{identifier}")
}

fn build_client(config: &Config, tld: &str) -> Result<reqwest::Client, LookupError> {
    let mut builder = reqwest::Client::builder()
        .timeout(RDAP_TIMEOUT)
        .user_agent(concat!("whois-gateway/", env!("CARGO_PKG_VERSION")))
        .gzip(true);

    if config.proxy_applies(tld) {
        let mut proxy_url = Url::parse(&config.proxy_server)
            .map_err(|e| LookupError::Upstream(format!("invalid proxy URL: {e}")))?;
        if !config.proxy_username.is_empty() && !config.proxy_password.is_empty() {
            proxy_url
                .set_username(&config.proxy_username)
                .and_then(|()| proxy_url.set_password(Some(&config.proxy_password)))
                .map_err(|()| {
                    LookupError::Upstream("proxy URL cannot carry credentials".to_string())
                })?;
        }
        builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
    }

    Ok(builder.build()?)
}

async fn do_rdap_request(client: &reqwest::Client, url: &str) -> Result<String, LookupError> {
    let response = client
        .get(url)
        .header(ACCEPT, RDAP_MEDIA_TYPE)
        .send()
        .await?;

    match response.status() {
        StatusCode::OK => Ok(response.text().await?),
        StatusCode::NOT_FOUND => Err(LookupError::ResourceNotFound),
        StatusCode::FORBIDDEN => Err(LookupError::RegistryDenied),
        other => Err(LookupError::UnexpectedStatus(other.as_u16())),
    }
}

/// Query RDAP registration data for a domain.
pub async fn rdap_query(config: &Config, domain: &str, tld: &str) -> Result<String, LookupError> {
    let server = registry::rdap_server_for_tld(tld)
        .ok_or_else(|| LookupError::NoRegistry(format!("no RDAP server known for TLD: {tld}")))?;

    info!("Querying RDAP for domain: {domain} with TLD: {tld} on server: {server}");

    let client = build_client(config, tld)?;
    do_rdap_request(&client, &rdap_url(server, "domain", domain)).await
}

/// Query RDAP registration data for an IP address. `cidr_key` is the table
/// key selected by the registry scan.
pub async fn rdap_query_ip(
    config: &Config,
    ip: &str,
    cidr_key: &str,
) -> Result<String, LookupError> {
    let server = registry::TLD_TO_RDAP_SERVER
        .get(cidr_key)
        .copied()
        .ok_or_else(|| LookupError::NoRegistry(format!("no RDAP server known for IP: {ip}")))?;

    info!("Querying RDAP for IP: {ip} on server: {server}");

    let client = build_client(config, cidr_key)?;
    do_rdap_request(&client, &rdap_url(server, "ip", ip)).await
}

/// Query RDAP registration data for an ASN. `range_key` is the table key
/// selected by the registry scan.
pub async fn rdap_query_asn(
    config: &Config,
    asn: &str,
    range_key: &str,
) -> Result<String, LookupError> {
    let server = registry::TLD_TO_RDAP_SERVER
        .get(range_key)
        .copied()
        .ok_or_else(|| LookupError::NoRegistry(format!("no RDAP server known for ASN: {asn}")))?;

    info!("Querying RDAP for AS: {asn} on server: {server}");

    let client = build_client(config, range_key)?;
    do_rdap_request(&client, &rdap_url(server, "autnum", asn)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn config_with_proxy(suffixes: Vec<String>) -> Config {
        Config {
            redis_addr: "127.0.0.1:6379".into(),
            redis_password: String::new(),
            redis_db: 0,
            cache_ttl: Duration::from_secs(3600),
            port: 8080,
            rate_limit: 50,
            proxy_server: "http://proxy.internal:3128".into(),
            proxy_username: "user".into(),
            proxy_password: "secret".into(),
            proxy_suffixes: suffixes,
            require_redis: false,
            memory_max_size: 10_000,
            memory_clean_interval: Duration::from_secs(300),
            shutdown_timeout: Duration::from_secs(30),
            start_time: Instant::now(),
        }
    }

    #[test]
    fn url_composition() {
        assert_eq!(
            rdap_url("https://rdap.verisign.com/com/v1/", "domain", "example.com"),
            "https://rdap.verisign.com/com/v1/domain/example.com"
        );
        assert_eq!(
            rdap_url("https://rdap.apnic.net/", "ip", "203.0.113.1"),
            "https://rdap.apnic.net/ip/203.0.113.1"
        );
        assert_eq!(
            rdap_url("https://rdap.apnic.net/", "autnum", "64500"),
            "https://rdap.apnic.net/autnum/64500"
        );
    }

    #[test]
    fn client_builds_with_and_without_proxy() {
        let config = config_with_proxy(vec!["cn".into()]);
        assert!(build_client(&config, "cn").is_ok());
        assert!(build_client(&config, "com").is_ok());

        let config = config_with_proxy(vec!["all".into()]);
        assert!(build_client(&config, "com").is_ok());
    }

    #[tokio::test]
    async fn unknown_tld_yields_no_registry() {
        let config = config_with_proxy(Vec::new());
        let err = rdap_query(&config, "example.nosuchtld", "nosuchtld")
            .await
            .unwrap_err();
        assert!(matches!(err, LookupError::NoRegistry(_)));
    }
}
