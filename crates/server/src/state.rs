use std::sync::Arc;

use jornadas_common::MAX_WRITE_RETRIES;
use jornadas_storage::{DocumentStore, LikeCounters, MemoryDocumentStore};

use crate::dispatch::DispatchHub;

/// Estado partilhado pelos handlers.
#[derive(Clone)]
pub struct AppState {
    pub counters: LikeCounters,
    pub documents: Arc<dyn DocumentStore>,
    pub dispatch: DispatchHub,
    pub admin_token: Option<Arc<str>>,
    pub max_retries: usize,
}

impl AppState {
    pub fn new(documents: Arc<dyn DocumentStore>, dispatch: DispatchHub) -> Self {
        Self {
            counters: LikeCounters::new(),
            documents,
            dispatch,
            admin_token: None,
            max_retries: MAX_WRITE_RETRIES,
        }
    }

    /// Estado só em memória (testes e modo efémero).
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryDocumentStore::new()),
            DispatchHub::default(),
        )
    }

    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        let token: String = token.into();
        self.admin_token = (!token.is_empty()).then(|| Arc::from(token));
        self
    }
}
