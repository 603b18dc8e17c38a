use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::entry::CacheEntry;

/// Cache chave → valor com TTL opcional por entrada.
///
/// Entradas expiradas são removidas de forma preguiçosa na leitura ou por
/// `cleanup`; não há tarefa de fundo a varrer o mapa. Clonar o handle
/// partilha o mesmo mapa.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
    default_expiry: Option<Duration>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_expiry: Option<Duration>) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            default_expiry,
        }
    }

    /// Guarda o valor com o TTL por omissão, substituindo qualquer entrada anterior.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_expiry(key, value, self.default_expiry);
    }

    /// Guarda o valor com um TTL explícito (`None` = nunca expira).
    pub fn set_with_expiry(&self, key: impl Into<String>, value: V, expiry: Option<Duration>) {
        self.entries
            .insert(key.into(), CacheEntry::new(value, expiry));
    }

    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.entries.get(key)
            && !entry.is_expired()
        {
            debug!("cache hit: {key}");
            return Some(entry.data.clone());
        }

        // O guard de leitura já foi largado; remover só se continuar expirada
        if self.entries.remove_if(key, |_, e| e.is_expired()).is_some() {
            debug!("cache: entrada expirada removida: {key}");
        }
        None
    }

    /// Devolve o valor em cache ou invoca o gerador e guarda o resultado.
    ///
    /// Um erro do gerador é propagado e nada fica em cache. Duas chamadas
    /// concorrentes sobre a mesma chave vazia podem ambas invocar o gerador.
    pub async fn get_or_set<F, Fut, E>(
        &self,
        key: &str,
        generator: F,
        expiry: Option<Duration>,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        debug!("cache miss: {key}");
        let value = generator().await?;
        self.set_with_expiry(key, value.clone(), expiry);
        Ok(value)
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove todas as entradas expiradas. Retorna quantas foram removidas.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let expired = entry.is_expired_at(now);
            if expired {
                removed += 1;
            }
            !expired
        });
        if removed > 0 {
            debug!("cache cleanup: {removed} entradas expiradas");
        }
        removed
    }

    /// Número de entradas guardadas, expiradas ou não.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(Some(jornadas_common::DEFAULT_CACHE_TTL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn expiry_scenario() {
        let cache = TtlCache::new(None);
        cache.set_with_expiry("k", "v1", Some(Duration::from_millis(1000)));

        advance(Duration::from_millis(500)).await;
        assert_eq!(cache.get("k"), Some("v1"));

        advance(Duration::from_millis(1000)).await;
        assert_eq!(cache.get("k"), None);
        // Removida na leitura
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_boundary() {
        let ttl = Duration::from_millis(200);
        let cache = TtlCache::new(Some(ttl));
        cache.set("a", 1);

        advance(ttl - Duration::from_millis(1)).await;
        assert_eq!(cache.get("a"), Some(1));

        advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("a"), Some(1)); // exatamente no TTL ainda vale

        advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("a"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn no_expiry_never_expires() {
        let cache = TtlCache::new(Some(Duration::from_millis(10)));
        cache.set_with_expiry("perm", "x", None);
        advance(Duration::from_secs(3600)).await;
        assert!(cache.has("perm"));
    }

    #[tokio::test]
    async fn set_overwrites_previous_entry() {
        let cache = TtlCache::new(None);
        cache.set("k", "v1");
        cache.set("k", "v2");
        assert_eq!(cache.get("k"), Some("v2"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn get_missing_key() {
        let cache: TtlCache<u32> = TtlCache::new(None);
        assert_eq!(cache.get("missing"), None);
        assert!(!cache.has("missing"));
    }

    #[tokio::test]
    async fn get_or_set_caches_generated_value() {
        let cache = TtlCache::new(None);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Result<u32, String> = cache
                .get_or_set(
                    "k",
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(42)
                    },
                    None,
                )
                .await;
            assert_eq!(value, Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_or_set_error_is_not_cached() {
        let cache: TtlCache<u32> = TtlCache::new(None);

        let result = cache
            .get_or_set("k", || async { Err::<u32, _>("offline") }, None)
            .await;
        assert_eq!(result, Err("offline"));
        assert!(cache.is_empty());

        let result: Result<u32, &str> = cache.get_or_set("k", || async { Ok(7) }, None).await;
        assert_eq!(result, Ok(7));
        assert_eq!(cache.get("k"), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn get_or_set_regenerates_after_expiry() {
        let cache = TtlCache::new(None);
        let ttl = Some(Duration::from_millis(100));

        let first: Result<&str, ()> = cache.get_or_set("k", || async { Ok("old") }, ttl).await;
        assert_eq!(first, Ok("old"));

        advance(Duration::from_millis(150)).await;
        let second: Result<&str, ()> = cache.get_or_set("k", || async { Ok("new") }, ttl).await;
        assert_eq!(second, Ok("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_removes_only_expired() {
        let cache = TtlCache::new(None);
        cache.set_with_expiry("short", 1, Some(Duration::from_millis(50)));
        cache.set_with_expiry("long", 2, Some(Duration::from_secs(60)));
        cache.set_with_expiry("forever", 3, None);

        advance(Duration::from_millis(100)).await;
        assert_eq!(cache.cleanup(), 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("long"), Some(2));
        assert_eq!(cache.get("forever"), Some(3));
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let cache = TtlCache::new(None);
        cache.set("a", 1);
        cache.set("b", 2);

        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        assert_eq!(cache.get("b"), Some(2));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let cache = TtlCache::new(None);
        let other = cache.clone();
        cache.set("k", "v");
        assert_eq!(other.get("k"), Some("v"));
    }
}
