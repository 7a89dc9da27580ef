use serde::Deserialize;
use std::time::{Duration, Instant};

/// Runtime configuration, resolved from `config.yaml`/`config.json` plus
/// `WHOIS_*` environment overrides.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_addr: String,
    pub redis_password: String,
    pub redis_db: i64,
    /// TTL applied to every cache entry.
    pub cache_ttl: Duration,
    pub port: u16,
    /// Global in-flight request cap.
    pub rate_limit: usize,
    pub proxy_server: String,
    pub proxy_username: String,
    pub proxy_password: String,
    /// TLDs routed through the proxy; the sentinel `"all"` proxies everything.
    pub proxy_suffixes: Vec<String>,
    /// Refuse to serve without a reachable Redis.
    pub require_redis: bool,
    pub memory_max_size: usize,
    pub memory_clean_interval: Duration,
    /// Upper bound on the graceful drain at shutdown.
    pub shutdown_timeout: Duration,
    pub start_time: Instant,
}

#[derive(Debug, Clone, Deserialize)]
struct FileConfig {
    redis: RedisSection,
    #[serde(rename = "cacheexpiration")]
    cache_expiration: u64,
    cache: CacheSection,
    port: u16,
    #[serde(rename = "ratelimit")]
    rate_limit: usize,
    #[serde(rename = "proxyserver")]
    proxy_server: String,
    #[serde(rename = "proxyusername")]
    proxy_username: String,
    #[serde(rename = "proxypassword")]
    proxy_password: String,
    #[serde(rename = "proxysuffixes")]
    proxy_suffixes: Vec<String>,
    #[serde(rename = "shutdowntimeout")]
    shutdown_timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct RedisSection {
    addr: String,
    password: String,
    db: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct CacheSection {
    #[serde(rename = "requireredis")]
    require_redis: bool,
    #[serde(rename = "memorymaxsize")]
    memory_max_size: usize,
    #[serde(rename = "memorycleaninterval")]
    memory_clean_interval: u64,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut settings = config::Config::builder()
            .set_default("redis.addr", "127.0.0.1:6379")?
            .set_default("redis.password", "")?
            .set_default("redis.db", 0)?
            .set_default("cacheexpiration", 3600)?
            .set_default("cache.requireredis", false)?
            .set_default("cache.memorymaxsize", 10_000)?
            .set_default("cache.memorycleaninterval", 300)?
            .set_default("port", 8080)?
            .set_default("ratelimit", 50)?
            .set_default("proxyserver", "")?
            .set_default("proxyusername", "")?
            .set_default("proxypassword", "")?
            .set_default("proxysuffixes", Vec::<String>::new())?
            .set_default("shutdowntimeout", 30)?
            // Accepts config.yaml or config.json; neither is required,
            // defaults plus environment are enough to boot.
            .add_source(config::File::with_name("config").required(false));

        settings = Self::apply_env_overrides(settings)?;

        let data: FileConfig = settings.build()?.try_deserialize()?;

        Ok(Config {
            redis_addr: data.redis.addr,
            redis_password: data.redis.password,
            redis_db: data.redis.db,
            cache_ttl: Duration::from_secs(data.cache_expiration),
            port: data.port,
            rate_limit: data.rate_limit.max(1),
            proxy_server: data.proxy_server,
            proxy_username: data.proxy_username,
            proxy_password: data.proxy_password,
            proxy_suffixes: data.proxy_suffixes,
            require_redis: data.cache.require_redis,
            memory_max_size: data.cache.memory_max_size,
            memory_clean_interval: Duration::from_secs(data.cache.memory_clean_interval),
            shutdown_timeout: Duration::from_secs(data.shutdown_timeout),
            start_time: Instant::now(),
        })
    }

    fn apply_env_overrides(
        mut settings: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        let env_mappings = [
            ("WHOIS_REDIS_ADDR", "redis.addr"),
            ("WHOIS_REDIS_PASSWORD", "redis.password"),
            ("WHOIS_REDIS_DB", "redis.db"),
            ("WHOIS_CACHE_EXPIRATION", "cacheexpiration"),
            ("WHOIS_MEMORY_MAX_SIZE", "cache.memorymaxsize"),
            ("WHOIS_MEMORY_CLEAN_INTERVAL", "cache.memorycleaninterval"),
            ("WHOIS_PORT", "port"),
            ("WHOIS_RATE_LIMIT", "ratelimit"),
            ("WHOIS_PROXY_SERVER", "proxyserver"),
            ("WHOIS_PROXY_USERNAME", "proxyusername"),
            ("WHOIS_PROXY_PASSWORD", "proxypassword"),
            ("WHOIS_SHUTDOWN_TIMEOUT", "shutdowntimeout"),
        ];

        for (env_var, config_key) in env_mappings {
            if let Ok(value) = std::env::var(env_var) {
                settings = settings.set_override(config_key, value)?;
            }
        }

        if let Ok(value) = std::env::var("WHOIS_REQUIRE_REDIS") {
            let flag = value == "true" || value == "1";
            settings = settings.set_override("cache.requireredis", flag)?;
        }

        if let Ok(value) = std::env::var("WHOIS_PROXY_SUFFIXES") {
            let suffixes: Vec<String> = value.split(',').map(|s| s.trim().to_string()).collect();
            settings = settings.set_override("proxysuffixes", suffixes)?;
        }

        Ok(settings)
    }

    /// Whether RDAP queries for this TLD go through the configured proxy.
    pub fn proxy_applies(&self, tld: &str) -> bool {
        !self.proxy_server.is_empty()
            && self
                .proxy_suffixes
                .iter()
                .any(|s| s == tld || s == "all")
    }
}
