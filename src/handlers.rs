//! HTTP surface: the resource lookup route plus health, readiness and
//! runtime-info endpoints.

use crate::{
    cache::{Cache, FallbackCache},
    classify::{classify, Resource},
    config::Config,
    errors::LookupError,
    limiter::AdmissionControl,
    metrics, rdap, rdap_parse, registry, whois, whois_parsers,
};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const BUILD_TIME: Option<&str> = option_env!("BUILD_TIME");
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<FallbackCache>,
    pub admission: Arc<AdmissionControl>,
}

fn respond(body: String, content_type: &'static str) -> Response {
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// Cached entries are stored as either canonical JSON or raw WHOIS text;
/// pick the content type back out of the payload shape.
fn cached_content_type(cached: &str) -> &'static str {
    if cached.trim_start().starts_with('{') {
        CONTENT_TYPE_JSON
    } else {
        CONTENT_TYPE_TEXT
    }
}

fn error_label(err: &LookupError) -> &'static str {
    match err {
        LookupError::BadRequest(_) => "bad_request",
        LookupError::ResourceNotFound => "not_found",
        LookupError::RegistryDenied => "registry_denied",
        LookupError::UnexpectedStatus(_) => "unexpected_status",
        LookupError::Upstream(_) => "upstream",
        LookupError::Parse(_) => "parse",
        LookupError::NoRegistry(_) => "no_registry",
        LookupError::Cache(_) => "cache",
    }
}

/// `GET /{identifier}`: resolve a domain, IP literal or ASN.
pub async fn handle_lookup(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Response, LookupError> {
    let result = lookup(&state, &identifier).await;
    if let Err(err) = &result {
        metrics::increment_errors(error_label(err));
    }
    result
}

async fn lookup(state: &AppState, identifier: &str) -> Result<Response, LookupError> {
    let _permit = state.admission.acquire().await?;
    metrics::set_in_flight(state.admission.in_flight());
    let start = Instant::now();

    let resource = classify(&identifier.trim().to_lowercase())?;
    let key = resource.cache_key();

    match state.cache.get(&key).await {
        Ok(Some(cached)) => {
            info!("Serving cached result for resource: {}", resource.canonical());
            metrics::increment_cache_hits();
            let content_type = cached_content_type(&cached);
            return Ok(respond(cached, content_type));
        }
        Ok(None) => {
            metrics::increment_cache_misses();
        }
        Err(err) => return Err(LookupError::Cache(err.to_string())),
    }

    let (body, content_type) = query_upstream(state, &resource).await?;

    // The response is sent regardless of whether the write sticks.
    if let Err(err) = state.cache.set(&key, &body, state.config.cache_ttl).await {
        warn!(
            "Failed to cache result for resource: {}: {err}",
            resource.canonical()
        );
        metrics::increment_errors("cache_write_error");
    }

    metrics::record_query_time(start.elapsed());
    Ok(respond(body, content_type))
}

async fn query_upstream(
    state: &AppState,
    resource: &Resource,
) -> Result<(String, &'static str), LookupError> {
    match resource {
        Resource::Ip { addr, literal } => {
            metrics::increment_requests("ip");
            let cidr_key = registry::rdap_server_for_ip(addr)
                .map(|(key, _)| key)
                .unwrap_or("");
            let raw = rdap::rdap_query_ip(&state.config, literal, cidr_key).await?;
            let record = rdap_parse::parse_rdap_ip(&raw)?;
            Ok((serde_json::to_string(&record)?, CONTENT_TYPE_JSON))
        }
        Resource::Asn { number } => {
            metrics::increment_requests("asn");
            let asn = number.to_string();
            let range_key = registry::rdap_server_for_asn(*number)
                .map(|(key, _)| key)
                .unwrap_or("");
            let raw = rdap::rdap_query_asn(&state.config, &asn, range_key).await?;
            let record = rdap_parse::parse_rdap_asn(&raw)?;
            Ok((serde_json::to_string(&record)?, CONTENT_TYPE_JSON))
        }
        Resource::Domain { name, tld } => {
            metrics::increment_requests("domain");
            if registry::rdap_server_for_tld(tld).is_some() {
                let raw = rdap::rdap_query(&state.config, name, tld).await?;
                let record = rdap_parse::parse_rdap_domain(&raw)?;
                Ok((serde_json::to_string(&record)?, CONTENT_TYPE_JSON))
            } else if registry::whois_server_for_tld(tld).is_some() {
                let raw = whois::whois_query(name, tld).await?;
                match whois_parsers::parser_for_tld(tld) {
                    Some(parse) => {
                        let record = parse(&raw, name)?;
                        Ok((serde_json::to_string(&record)?, CONTENT_TYPE_JSON))
                    }
                    // No parsing rule: pass the registry text through.
                    None => Ok((raw, CONTENT_TYPE_TEXT)),
                }
            } else {
                Err(LookupError::NoRegistry(format!(
                    "No WHOIS or RDAP server known for TLD: {tld}"
                )))
            }
        }
    }
}

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    timestamp: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    uptime: String,
    checks: BTreeMap<&'static str, Check>,
}

#[derive(Serialize, Clone)]
struct Check {
    status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    message: String,
}

impl Check {
    fn new(status: &str, message: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            message: message.into(),
        }
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn uptime(config: &Config) -> String {
    format!("{}s", config.start_time.elapsed().as_secs())
}

fn cache_check(cache: Option<&FallbackCache>) -> (Check, bool) {
    match cache {
        None => (Check::new("fail", "not initialized"), false),
        Some(cache) if cache.is_primary_healthy() => (Check::new("ok", "redis"), true),
        Some(_) => (Check::new("ok", "memory"), true),
    }
}

fn capacity_check(admission: &AdmissionControl) -> Check {
    let in_flight = admission.in_flight();
    let limit = admission.limit();
    if in_flight >= limit {
        Check::new("warning", format!("at limit ({in_flight}/{limit})"))
    } else {
        Check::new("ok", format!("{in_flight}/{limit}"))
    }
}

/// `GET /health`: liveness; always 200 while the process runs.
pub async fn handle_health(State(state): State<AppState>) -> Response {
    let (cache, _) = cache_check(Some(&state.cache));

    let status = HealthStatus {
        status: "ok".to_string(),
        timestamp: now_rfc3339(),
        uptime: uptime(&state.config),
        checks: BTreeMap::from([("cache", cache)]),
    };

    (StatusCode::OK, Json(status)).into_response()
}

/// `GET /ready`: readiness; 503 when Redis is required but unreachable.
pub async fn handle_ready(State(state): State<AppState>) -> Response {
    let mut http_status = StatusCode::OK;
    let mut overall = "ok";

    let (mut cache, cache_ok) = cache_check(Some(&state.cache));

    if state.config.require_redis && !state.cache.is_primary_healthy() {
        overall = "unavailable";
        cache = Check::new("fail", "redis required but unavailable");
        http_status = StatusCode::SERVICE_UNAVAILABLE;
    } else if !cache_ok {
        overall = "unavailable";
        http_status = StatusCode::SERVICE_UNAVAILABLE;
    }

    let status = HealthStatus {
        status: overall.to_string(),
        timestamp: now_rfc3339(),
        uptime: uptime(&state.config),
        checks: BTreeMap::from([
            ("cache", cache),
            ("capacity", capacity_check(&state.admission)),
        ]),
    };

    (http_status, Json(status)).into_response()
}

#[derive(Serialize)]
struct RuntimeInfo {
    version: String,
    #[serde(rename = "buildTime", skip_serializing_if = "Option::is_none")]
    build_time: Option<String>,
    #[serde(rename = "gitCommit", skip_serializing_if = "Option::is_none")]
    git_commit: Option<String>,
    uptime: String,
    #[serde(rename = "numWorkerThreads")]
    num_worker_threads: usize,
    #[serde(rename = "numCPU")]
    num_cpu: usize,
}

/// `GET /info`: build and runtime details, useful when debugging deploys.
pub async fn handle_info(State(state): State<AppState>) -> Response {
    let info = RuntimeInfo {
        version: VERSION.to_string(),
        build_time: BUILD_TIME.map(str::to_string),
        git_commit: GIT_COMMIT.map(str::to_string),
        uptime: uptime(&state.config),
        num_worker_threads: tokio::runtime::Handle::current().metrics().num_workers(),
        num_cpu: std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1),
    };

    Json(info).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::cache::RedisCache;
    use std::time::Duration;

    #[test]
    fn cached_content_type_sniffs_payload_shape() {
        assert_eq!(
            cached_content_type(r#"{"Domain Name":"example.com"}"#),
            CONTENT_TYPE_JSON
        );
        assert_eq!(
            cached_content_type("Domain Name: example.jp\nRegistrant: ..."),
            CONTENT_TYPE_TEXT
        );
    }

    #[test]
    fn cache_check_reports_initialization() {
        let (check, ok) = cache_check(None);
        assert_eq!(check.status, "fail");
        assert_eq!(check.message, "not initialized");
        assert!(!ok);
    }

    #[tokio::test]
    async fn cache_check_prefers_redis_label() {
        // A memory tier standing in as a healthy primary.
        let primary = MemoryCache::new(10, Duration::from_secs(300));
        let fallback = MemoryCache::new(10, Duration::from_secs(300));
        let composed = FallbackCache::new(primary, fallback);

        let (check, ok) = cache_check(Some(&composed));
        assert!(ok);
        assert_eq!(check.message, "redis");
    }

    #[tokio::test]
    async fn cache_check_falls_back_to_memory_label() {
        // Nothing listens on port 1; the initial probe fails fast and the
        // primary reports unhealthy.
        let primary = RedisCache::new("127.0.0.1:1", "", 0).await.unwrap();
        let fallback = MemoryCache::new(10, Duration::from_secs(300));
        let composed = FallbackCache::new(primary, fallback);

        let (check, ok) = cache_check(Some(&composed));
        assert!(ok);
        assert_eq!(check.message, "memory");
    }

    #[tokio::test]
    async fn capacity_check_flags_saturation() {
        let admission = AdmissionControl::new(1);
        let check = capacity_check(&admission);
        assert_eq!(check.status, "ok");
        assert_eq!(check.message, "0/1");

        let _permit = admission.acquire().await.unwrap();
        let check = capacity_check(&admission);
        assert_eq!(check.status, "warning");
        assert_eq!(check.message, "at limit (1/1)");
    }
}
