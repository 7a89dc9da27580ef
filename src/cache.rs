//! Tiered response cache.
//!
//! A remote Redis tier fronts an in-process tier; the [`FallbackCache`]
//! composes them so reads keep working from process memory while Redis is
//! down and the dual-write keeps Redis warm for recovery.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::{interval, timeout};
use tracing::{debug, info, warn};

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("{0}")]
    Backend(String),
}

/// Capability set shared by every cache tier. All operations are safe under
/// concurrent calls.
#[async_trait]
pub trait Cache: Send + Sync {
    /// `Ok(None)` is a miss; `Err` is a transport problem, not a miss.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    fn is_healthy(&self) -> bool;
}

/// Remote Redis tier with connection health tracking.
///
/// When unhealthy, `get` reports a miss and `set` is a no-op, so callers
/// stay correct without touching a dead server. A background probe flips
/// the flag back once Redis answers again; each direction of the
/// transition is logged exactly once.
pub struct RedisCache {
    client: redis::Client,
    conn: tokio::sync::Mutex<Option<ConnectionManager>>,
    healthy: AtomicBool,
}

impl RedisCache {
    pub async fn new(addr: &str, password: &str, db: i64) -> Result<Arc<Self>, CacheError> {
        let url = if password.is_empty() {
            format!("redis://{addr}/{db}")
        } else {
            format!("redis://:{password}@{addr}/{db}")
        };
        let client =
            redis::Client::open(url.as_str()).map_err(|e| CacheError::Backend(e.to_string()))?;

        let cache = Arc::new(Self {
            client,
            conn: tokio::sync::Mutex::new(None),
            healthy: AtomicBool::new(false),
        });

        cache.check_health(true).await;

        let probe = Arc::downgrade(&cache);
        tokio::spawn(async move {
            let mut ticker = interval(HEALTH_CHECK_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = probe.upgrade() else { break };
                cache.check_health(false).await;
            }
        });

        Ok(cache)
    }

    fn mark_healthy(&self) -> bool {
        !self.healthy.swap(true, Ordering::SeqCst)
    }

    fn mark_unhealthy(&self) -> bool {
        self.healthy.swap(false, Ordering::SeqCst)
    }

    /// Record an operation failure; logs only on the healthy → degraded edge.
    fn note_failure(&self, err: &redis::RedisError) {
        if self.mark_unhealthy() {
            warn!("Redis connection lost: {err}");
        }
    }

    async fn connection(&self) -> Option<ConnectionManager> {
        self.conn.lock().await.clone()
    }

    async fn probe(&self) -> Result<(), redis::RedisError> {
        let mut guard = self.conn.lock().await;
        let mut conn = match guard.as_ref() {
            Some(conn) => conn.clone(),
            None => {
                let conn = ConnectionManager::new(self.client.clone()).await?;
                *guard = Some(conn.clone());
                conn
            }
        };
        drop(guard);
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn check_health(&self, initial: bool) {
        let was_healthy = self.is_healthy();
        let result = timeout(HEALTH_CHECK_TIMEOUT, self.probe()).await;

        match result {
            Ok(Ok(())) => {
                self.mark_healthy();
                if !initial && !was_healthy {
                    info!("Redis connection restored");
                }
            }
            Ok(Err(err)) => {
                self.mark_unhealthy();
                if initial {
                    warn!("Redis unavailable: {err}");
                } else if was_healthy {
                    warn!("Redis connection lost: {err}");
                }
            }
            Err(_) => {
                self.mark_unhealthy();
                if initial {
                    warn!("Redis unavailable: health probe timed out");
                } else if was_healthy {
                    warn!("Redis connection lost: health probe timed out");
                }
            }
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if !self.is_healthy() {
            return Ok(None);
        }
        let Some(mut conn) = self.connection().await else {
            return Ok(None);
        };

        let result: Result<Option<String>, redis::RedisError> = conn.get(key).await;
        match result {
            Ok(Some(value)) => {
                debug!("Serving cached result from Redis for key: {key}");
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                self.note_failure(&err);
                Err(CacheError::Backend(err.to_string()))
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        if !self.is_healthy() {
            return Ok(());
        }
        let Some(mut conn) = self.connection().await else {
            return Ok(());
        };

        let result: Result<(), redis::RedisError> =
            conn.set_ex(key, value, ttl.as_secs().max(1)).await;
        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                self.note_failure(&err);
                Err(CacheError::Backend(err.to_string()))
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// In-process tier: a concurrent map bounded by entry count.
///
/// A full cache never evicts unexpired entries; a `set` that would exceed
/// the cap sweeps expired entries first and is dropped if that frees
/// nothing. A background sweeper collects expired entries on a fixed
/// cadence, and `get` evicts lazily whatever it finds already expired.
pub struct MemoryCache {
    data: DashMap<String, MemoryEntry>,
    max_size: usize,
    size: Mutex<usize>,
}

impl MemoryCache {
    pub fn new(max_size: usize, clean_interval: Duration) -> Arc<Self> {
        let cache = Arc::new(Self {
            data: DashMap::new(),
            max_size,
            size: Mutex::new(0),
        });

        let sweeper = Arc::downgrade(&cache);
        let clean_interval = clean_interval.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = interval(clean_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = sweeper.upgrade() else { break };
                cache.clean_expired();
            }
        });

        cache
    }

    fn clean_expired(&self) {
        let now = Instant::now();
        let mut removed = 0usize;
        self.data.retain(|_, entry| {
            if now >= entry.expires_at {
                removed += 1;
                false
            } else {
                true
            }
        });
        if removed > 0 {
            let mut size = self.size.lock().unwrap();
            *size = size.saturating_sub(removed);
        }
    }

    fn decrement_size(&self) {
        let mut size = self.size.lock().unwrap();
        *size = size.saturating_sub(1);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        *self.size.lock().unwrap()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let expired = match self.data.get(key) {
            None => return Ok(None),
            Some(entry) => {
                if Instant::now() >= entry.expires_at {
                    true
                } else {
                    debug!("Serving cached result from memory for key: {key}");
                    return Ok(Some(entry.value.clone()));
                }
            }
        };

        if expired {
            self.data.remove(key);
            self.decrement_size();
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        if !self.data.contains_key(key) {
            let current = *self.size.lock().unwrap();
            if current >= self.max_size {
                self.clean_expired();
                let current = *self.size.lock().unwrap();
                if current >= self.max_size {
                    return Ok(());
                }
            }
        }

        let entry = MemoryEntry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        let existed = self.data.insert(key.to_string(), entry).is_some();
        if !existed {
            *self.size.lock().unwrap() += 1;
        }
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

/// Primary-preferred composition of two tiers with dual write.
pub struct FallbackCache {
    primary: Arc<dyn Cache>,
    fallback: Arc<dyn Cache>,
}

impl FallbackCache {
    pub fn new(primary: Arc<dyn Cache>, fallback: Arc<dyn Cache>) -> Arc<Self> {
        Arc::new(Self { primary, fallback })
    }

    /// Exposed for the health endpoints only.
    pub fn is_primary_healthy(&self) -> bool {
        self.primary.is_healthy()
    }
}

#[async_trait]
impl Cache for FallbackCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if self.primary.is_healthy() {
            // A clean hit or miss from the primary is authoritative, since
            // every write goes to both tiers. Only a transport error falls
            // through.
            if let Ok(result) = self.primary.get(key).await {
                return Ok(result);
            }
        }
        self.fallback.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let primary_err = if self.primary.is_healthy() {
            self.primary.set(key, value, ttl).await.err()
        } else {
            None
        };

        let fallback_result = self.fallback.set(key, value, ttl).await;

        match primary_err {
            Some(err) => Err(err),
            None => fallback_result,
        }
    }

    fn is_healthy(&self) -> bool {
        self.primary.is_healthy() || self.fallback.is_healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scriptable tier for exercising the fallback composition.
    struct StubCache {
        healthy: AtomicBool,
        fail_ops: AtomicBool,
        data: DashMap<String, String>,
    }

    impl StubCache {
        fn new(healthy: bool) -> Arc<Self> {
            Arc::new(Self {
                healthy: AtomicBool::new(healthy),
                fail_ops: AtomicBool::new(false),
                data: DashMap::new(),
            })
        }
    }

    #[async_trait]
    impl Cache for StubCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            if self.fail_ops.load(Ordering::SeqCst) {
                return Err(CacheError::Backend("stub transport error".into()));
            }
            Ok(self.data.get(key).map(|v| v.value().clone()))
        }

        async fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), CacheError> {
            if self.fail_ops.load(Ordering::SeqCst) {
                return Err(CacheError::Backend("stub transport error".into()));
            }
            self.data.insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn memory_cache_expires_entries() {
        let cache = MemoryCache::new(10, Duration::from_secs(300));
        cache
            .set("whois:example.com", "{}", Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(
            cache.get("whois:example.com").await.unwrap(),
            Some("{}".to_string())
        );

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("whois:example.com").await.unwrap(), None);
        // Lazy eviction also reclaimed the slot.
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn memory_cache_honours_size_cap() {
        let cache = MemoryCache::new(2, Duration::from_secs(300));
        cache.set("a", "1", Duration::from_secs(60)).await.unwrap();
        cache.set("b", "2", Duration::from_secs(60)).await.unwrap();
        // Full of unexpired entries: the write is dropped, nothing evicted.
        cache.set("c", "3", Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(cache.get("b").await.unwrap(), Some("2".to_string()));
        assert_eq!(cache.get("c").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_cache_sweeps_expired_before_dropping() {
        let cache = MemoryCache::new(1, Duration::from_secs(300));
        cache.set("a", "1", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        // The opportunistic sweep frees the expired slot for the new entry.
        cache.set("b", "2", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("b").await.unwrap(), Some("2".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn memory_cache_overwrite_does_not_grow_size() {
        let cache = MemoryCache::new(5, Duration::from_secs(300));
        cache.set("a", "1", Duration::from_secs(60)).await.unwrap();
        cache.set("a", "2", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").await.unwrap(), Some("2".to_string()));
    }

    #[tokio::test]
    async fn fallback_prefers_healthy_primary() {
        let primary = StubCache::new(true);
        let fallback = StubCache::new(true);
        fallback
            .set("k", "stale", Duration::from_secs(60))
            .await
            .unwrap();
        primary
            .set("k", "fresh", Duration::from_secs(60))
            .await
            .unwrap();

        let composed = FallbackCache::new(primary, fallback);
        assert_eq!(composed.get("k").await.unwrap(), Some("fresh".to_string()));
    }

    #[tokio::test]
    async fn fallback_uses_secondary_when_primary_unhealthy() {
        let primary = StubCache::new(false);
        let fallback = StubCache::new(true);
        fallback
            .set("whois:foo.com", "cached", Duration::from_secs(60))
            .await
            .unwrap();

        let composed = FallbackCache::new(primary, fallback);
        assert_eq!(
            composed.get("whois:foo.com").await.unwrap(),
            Some("cached".to_string())
        );
        assert!(composed.is_healthy());
        assert!(!composed.is_primary_healthy());
    }

    #[tokio::test]
    async fn fallback_falls_through_on_transport_error_only() {
        let primary = StubCache::new(true);
        let fallback = StubCache::new(true);
        fallback
            .set("k", "backup", Duration::from_secs(60))
            .await
            .unwrap();

        // Healthy primary, clean miss: authoritative, no fall-through.
        let composed = FallbackCache::new(primary.clone(), fallback.clone());
        assert_eq!(composed.get("k").await.unwrap(), None);

        // Transport error: fall through to the secondary.
        primary.fail_ops.store(true, Ordering::SeqCst);
        assert_eq!(composed.get("k").await.unwrap(), Some("backup".to_string()));
    }

    #[tokio::test]
    async fn dual_write_lands_in_both_tiers() {
        let primary = StubCache::new(true);
        let fallback = StubCache::new(true);
        let composed = FallbackCache::new(primary.clone(), fallback.clone());

        composed
            .set("k", "value", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(primary.get("k").await.unwrap(), Some("value".to_string()));
        assert_eq!(fallback.get("k").await.unwrap(), Some("value".to_string()));
    }

    #[tokio::test]
    async fn write_survives_unhealthy_primary() {
        let primary = StubCache::new(false);
        let fallback = StubCache::new(true);
        let composed = FallbackCache::new(primary.clone(), fallback.clone());

        composed
            .set("k", "value", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(composed.get("k").await.unwrap(), Some("value".to_string()));
        assert_eq!(primary.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn primary_set_error_wins_over_fallback_success() {
        let primary = StubCache::new(true);
        primary.fail_ops.store(true, Ordering::SeqCst);
        let fallback = StubCache::new(true);
        let composed = FallbackCache::new(primary, fallback.clone());

        let err = composed.set("k", "value", Duration::from_secs(60)).await;
        assert!(err.is_err());
        // The dual write still reached the secondary.
        assert_eq!(fallback.get("k").await.unwrap(), Some("value".to_string()));
    }
}
