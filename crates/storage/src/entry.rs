use tokio::time::{Duration, Instant};

/// Entrada no cache: valor + instante da escrita + TTL opcional.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    pub stored_at: Instant,
    pub expiry: Option<Duration>,
}

impl<V> CacheEntry<V> {
    pub fn new(data: V, expiry: Option<Duration>) -> Self {
        Self {
            data,
            stored_at: Instant::now(),
            expiry,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Expirada só quando o tempo decorrido ultrapassa estritamente o TTL.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expiry
            .map(|ttl| now.saturating_duration_since(self.stored_at) > ttl)
            .unwrap_or(false)
    }
}
