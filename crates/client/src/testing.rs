//! Gateway falso para os testes do cliente.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;

use jornadas_common::GatewayError;
use jornadas_protocol::{
    ContentEntry, ContentListing, EntryKind, LikeData, LikeResponse, ToggleRequest,
};
use jornadas_storage::LikeCounters;

use crate::gateway::{ContentSource, LikeGateway};
use crate::session::SessionId;

#[derive(Default)]
pub(crate) struct FakeGateway {
    pub counters: LikeCounters,
    pub fetches: AtomicUsize,
    pub toggles: AtomicUsize,
    pub fail_fetches: AtomicBool,
    pub fail_toggles: AtomicBool,
    pub reject_toggles: AtomicBool,
    pub content_total: AtomicU64,
    toggle_delay: Mutex<Duration>,
    fetch_delay: Mutex<Duration>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway com `total` likes de outras sessões em `entry_id`.
    pub fn with_likes(entry_id: &str, total: u64) -> Self {
        let gw = Self::new();
        for i in 0..total {
            gw.counters.apply(
                entry_id,
                &format!("outra_{i}"),
                jornadas_protocol::LikeAction::Like,
            );
        }
        gw
    }

    pub fn set_toggle_delay(&self, delay: Duration) {
        *self.toggle_delay.lock().unwrap() = delay;
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn toggle_count(&self) -> usize {
        self.toggles.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LikeGateway for FakeGateway {
    async fn like_data(
        &self,
        entry_id: &str,
        session: &SessionId,
    ) -> Result<LikeData, GatewayError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("sem rede".into()));
        }
        Ok(self.counters.like_data(entry_id, session.as_str()))
    }

    async fn toggle_like(&self, request: &ToggleRequest) -> Result<LikeResponse, GatewayError> {
        self.toggles.fetch_add(1, Ordering::SeqCst);
        let delay = *self.toggle_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_toggles.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("sem rede".into()));
        }
        if self.reject_toggles.load(Ordering::SeqCst) {
            return Ok(LikeResponse::rejected("contador indisponível"));
        }
        let data = self
            .counters
            .apply(&request.entry_id, &request.session_id, request.action);
        Ok(LikeResponse::ok(data))
    }
}

#[async_trait]
impl ContentSource for FakeGateway {
    async fn content(&self) -> Result<ContentListing, GatewayError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("sem rede".into()));
        }
        let total = self.content_total.load(Ordering::SeqCst);
        let entries = (0..total)
            .map(|i| ContentEntry {
                id: format!("e{i}"),
                kind: EntryKind::Testimonial,
                display_name: "Visitante".into(),
                content: Some("Obrigado!".into()),
                image_url: None,
                likes: 0,
                created_at: OffsetDateTime::UNIX_EPOCH,
            })
            .collect();
        Ok(ContentListing {
            last_updated: OffsetDateTime::UNIX_EPOCH,
            entries,
        })
    }
}
