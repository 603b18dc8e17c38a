use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use jornadas_protocol::{LikeAction, LikeData};

/// Linha do contador de likes de uma entrada.
///
/// `likes` e `liked_by` são atualizados de forma independente: `likes ==
/// liked_by.len()` é o estado pretendido, mas não é forçado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeEntry {
    pub entry_id: String,
    pub likes: u64,
    pub liked_by: BTreeSet<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_liked: Option<OffsetDateTime>,
}

impl LikeEntry {
    fn new(entry_id: &str) -> Self {
        Self {
            entry_id: entry_id.to_string(),
            likes: 0,
            liked_by: BTreeSet::new(),
            last_liked: None,
        }
    }

    fn view(&self, session_id: &str) -> LikeData {
        LikeData::new(self.liked_by.contains(session_id), self.likes)
    }
}

/// Serviço de contadores de likes em memória.
#[derive(Debug, Clone, Default)]
pub struct LikeCounters {
    entries: Arc<DashMap<String, LikeEntry>>,
}

impl LikeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn like_data(&self, entry_id: &str, session_id: &str) -> LikeData {
        self.entries
            .get(entry_id)
            .map(|e| e.view(session_id))
            .unwrap_or_default()
    }

    /// Aplica uma ação e devolve a vista resultante para a sessão.
    ///
    /// A linha é criada no primeiro like e nunca é apagada; o total satura em zero.
    pub fn apply(&self, entry_id: &str, session_id: &str, action: LikeAction) -> LikeData {
        match action {
            LikeAction::Like => {
                // Entry API do DashMap para atomicidade por entrada
                let mut entry = self
                    .entries
                    .entry(entry_id.to_string())
                    .or_insert_with(|| LikeEntry::new(entry_id));
                entry.likes = entry.likes.saturating_add(1);
                entry.liked_by.insert(session_id.to_string());
                entry.last_liked = Some(OffsetDateTime::now_utc());
                debug!("like: {entry_id} → {}", entry.likes);
                entry.view(session_id)
            }
            LikeAction::Unlike => match self.entries.get_mut(entry_id) {
                Some(mut entry) => {
                    entry.likes = entry.likes.saturating_sub(1);
                    entry.liked_by.remove(session_id);
                    debug!("unlike: {entry_id} → {}", entry.likes);
                    entry.view(session_id)
                }
                None => LikeData::default(),
            },
        }
    }

    pub fn total(&self, entry_id: &str) -> u64 {
        self.entries.get(entry_id).map(|e| e.likes).unwrap_or(0)
    }

    pub fn snapshot(&self, entry_id: &str) -> Option<LikeEntry> {
        self.entries.get(entry_id).map(|e| e.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_entry_is_zero() {
        let counters = LikeCounters::new();
        assert_eq!(counters.like_data("foto-1", "s1"), LikeData::new(false, 0));
        assert!(counters.snapshot("foto-1").is_none());
    }

    #[test]
    fn like_and_unlike() {
        let counters = LikeCounters::new();
        assert_eq!(
            counters.apply("foto-1", "s1", LikeAction::Like),
            LikeData::new(true, 1)
        );
        assert_eq!(
            counters.apply("foto-1", "s2", LikeAction::Like),
            LikeData::new(true, 2)
        );
        assert_eq!(counters.like_data("foto-1", "s3"), LikeData::new(false, 2));

        assert_eq!(
            counters.apply("foto-1", "s1", LikeAction::Unlike),
            LikeData::new(false, 1)
        );

        let entry = counters.snapshot("foto-1").unwrap();
        assert_eq!(entry.liked_by, BTreeSet::from(["s2".to_string()]));
        assert!(entry.last_liked.is_some());
    }

    #[test]
    fn unlike_never_goes_negative() {
        let counters = LikeCounters::new();
        counters.apply("foto-1", "s1", LikeAction::Like);
        for _ in 0..5 {
            counters.apply("foto-1", "s1", LikeAction::Unlike);
        }
        assert_eq!(counters.total("foto-1"), 0);
        // A linha persiste mesmo a zero
        assert_eq!(counters.len(), 1);
    }

    #[test]
    fn unlike_unknown_entry_creates_nothing() {
        let counters = LikeCounters::new();
        assert_eq!(
            counters.apply("nada", "s1", LikeAction::Unlike),
            LikeData::default()
        );
        assert!(counters.is_empty());
    }

    #[test]
    fn repeated_like_counts_independently_of_set() {
        let counters = LikeCounters::new();
        counters.apply("foto-1", "s1", LikeAction::Like);
        counters.apply("foto-1", "s1", LikeAction::Like);

        let entry = counters.snapshot("foto-1").unwrap();
        assert_eq!(entry.likes, 2);
        assert_eq!(entry.liked_by.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_likes() {
        let counters = LikeCounters::new();
        let mut handles = Vec::new();
        for i in 0..8 {
            let counters = counters.clone();
            handles.push(tokio::spawn(async move {
                counters.apply("foto-1", &format!("s{i}"), LikeAction::Like);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(counters.total("foto-1"), 8);
    }
}
