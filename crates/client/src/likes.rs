//! Cliente de likes: acesso com cache e máquina de estados por entrada.
//!
//! `LikeStore` fala com o gateway através do `TtlCache`; `LikeController`
//! guarda a vista de uma entrada para uma sessão e aplica o protocolo de
//! atualização otimista: o novo estado é publicado antes da resposta do
//! servidor e revertido se o pedido falhar.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use jornadas_common::{GatewayError, LIKE_CACHE_TTL, TOGGLE_COOLDOWN};
use jornadas_protocol::{LikeAction, LikeData, LikeResponse, ToggleRequest};
use jornadas_storage::TtlCache;

use crate::gateway::LikeGateway;
use crate::session::SessionId;

/// Acesso aos likes através do cache.
#[derive(Clone)]
pub struct LikeStore {
    gateway: Arc<dyn LikeGateway>,
    cache: TtlCache<LikeData>,
    ttl: Option<Duration>,
    cooldown: Duration,
}

impl LikeStore {
    pub fn new(gateway: Arc<dyn LikeGateway>, cache: TtlCache<LikeData>) -> Self {
        Self {
            gateway,
            cache,
            ttl: Some(LIKE_CACHE_TTL),
            cooldown: TOGGLE_COOLDOWN,
        }
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Janela após cada toggle em que os controllers descartam novos toggles.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    fn cache_key(entry_id: &str, session: &SessionId) -> String {
        format!("likes:{entry_id}:{session}")
    }

    /// Vista em cache dentro do TTL; caso contrário vai ao gateway e guarda.
    pub async fn like_data(
        &self,
        entry_id: &str,
        session: &SessionId,
    ) -> Result<LikeData, GatewayError> {
        let key = Self::cache_key(entry_id, session);
        let gateway = &self.gateway;
        self.cache
            .get_or_set(&key, || gateway.like_data(entry_id, session), self.ttl)
            .await
    }

    /// Ignora o cache (usado pelo polling) e atualiza-o com a vista fresca.
    pub async fn like_data_fresh(
        &self,
        entry_id: &str,
        session: &SessionId,
    ) -> Result<LikeData, GatewayError> {
        let data = self.gateway.like_data(entry_id, session).await?;
        self.cache
            .set_with_expiry(Self::cache_key(entry_id, session), data, self.ttl);
        Ok(data)
    }

    /// Envia o toggle. `{success: false}` vira `GatewayError::Rejected`.
    pub async fn toggle_like(
        &self,
        entry_id: &str,
        session: &SessionId,
        action: LikeAction,
    ) -> Result<LikeResponse, GatewayError> {
        let request = ToggleRequest {
            entry_id: entry_id.to_string(),
            session_id: session.as_str().to_string(),
            action,
        };
        let response = self.gateway.toggle_like(&request).await?;
        if !response.success {
            return Err(GatewayError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "toggle recusado pelo servidor".into()),
            ));
        }

        // A próxima leitura pelo cache tem de ver o servidor
        self.cache.remove(&Self::cache_key(entry_id, session));
        Ok(response)
    }

    pub fn controller(&self, entry_id: impl Into<String>, session: SessionId) -> LikeController {
        LikeController::new(self.clone(), entry_id.into(), session)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Toggling,
}

/// Estado observável de uma entrada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeView {
    pub phase: Phase,
    pub liked: bool,
    pub total: u64,
    pub error: Option<String>,
}

impl LikeView {
    pub fn data(&self) -> LikeData {
        LikeData::new(self.liked, self.total)
    }

    fn apply(&mut self, data: LikeData) {
        self.liked = data.liked;
        self.total = data.total;
    }
}

impl Default for LikeView {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            liked: false,
            total: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// O servidor aceitou; o estado atual fica como está.
    Applied(LikeData),
    /// O pedido falhou e o estado anterior foi reposto.
    RolledBack { restored: LikeData, error: String },
    /// Descartado: havia um toggle em curso ou ainda em cool-down.
    Ignored,
}

#[derive(Debug, Default)]
struct ToggleGuard {
    in_flight: bool,
    cooldown_until: Option<Instant>,
}

impl ToggleGuard {
    fn is_busy(&self, now: Instant) -> bool {
        self.in_flight || self.cooldown_until.is_some_and(|until| now < until)
    }
}

struct Inner {
    store: LikeStore,
    entry_id: String,
    session: SessionId,
    guard: Mutex<ToggleGuard>,
    view: watch::Sender<LikeView>,
    mounted: AtomicBool,
}

/// Liberta o guard de toggle mesmo se o future for cancelado a meio.
struct InFlight<'a> {
    inner: &'a Inner,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut guard = self.inner.lock_guard();
        guard.in_flight = false;
        guard.cooldown_until = Some(Instant::now() + self.inner.store.cooldown);
    }
}

impl Inner {
    fn lock_guard(&self) -> MutexGuard<'_, ToggleGuard> {
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Máquina de estados de likes de uma entrada para uma sessão.
///
/// `Idle → Loading → Ready`, `Ready → Toggling → Ready`. Nenhum erro sai
/// daqui como `Err`: falhas ficam em `LikeView::error`.
#[derive(Clone)]
pub struct LikeController {
    inner: Arc<Inner>,
}

impl LikeController {
    fn new(store: LikeStore, entry_id: String, session: SessionId) -> Self {
        let (view, _) = watch::channel(LikeView::default());
        Self {
            inner: Arc::new(Inner {
                store,
                entry_id,
                session,
                guard: Mutex::new(ToggleGuard::default()),
                view,
                mounted: AtomicBool::new(true),
            }),
        }
    }

    pub fn entry_id(&self) -> &str {
        &self.inner.entry_id
    }

    pub fn session(&self) -> &SessionId {
        &self.inner.session
    }

    pub fn view(&self) -> LikeView {
        self.inner.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LikeView> {
        self.inner.view.subscribe()
    }

    /// Toggle em curso ou ainda dentro do cool-down.
    pub fn is_toggling(&self) -> bool {
        self.inner.lock_guard().is_busy(Instant::now())
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    /// Resultados que cheguem depois disto são descartados.
    pub fn unmount(&self) {
        if self.inner.mounted.swap(false, Ordering::SeqCst) {
            debug!("controller desmontado: {}", self.inner.entry_id);
        }
    }

    fn update(&self, f: impl FnOnce(&mut LikeView)) {
        if self.is_mounted() {
            self.inner.view.send_modify(f);
        }
    }

    /// Carrega pelo cache. Em caso de falha mantém os dados e regista o erro.
    pub async fn load(&self) -> LikeView {
        self.update(|v| {
            if v.phase == Phase::Idle {
                v.phase = Phase::Loading;
            }
        });

        let result = self
            .inner
            .store
            .like_data(&self.inner.entry_id, &self.inner.session)
            .await;

        match result {
            Ok(data) => self.update(|v| {
                v.apply(data);
                v.error = None;
                if v.phase == Phase::Loading {
                    v.phase = Phase::Ready;
                }
            }),
            Err(e) => {
                warn!("falha ao carregar likes de {}: {e}", self.inner.entry_id);
                self.update(|v| {
                    v.error = Some(e.to_string());
                    if v.phase == Phase::Loading {
                        v.phase = Phase::Idle;
                    }
                });
            }
        }
        self.view()
    }

    /// Sobrescreve a vista local com a do servidor, mesmo durante um toggle.
    pub async fn refresh(&self) -> LikeView {
        let result = self
            .inner
            .store
            .like_data_fresh(&self.inner.entry_id, &self.inner.session)
            .await;

        match result {
            Ok(data) => self.update(|v| {
                v.apply(data);
                if matches!(v.phase, Phase::Idle | Phase::Loading) {
                    v.phase = Phase::Ready;
                }
            }),
            Err(e) => {
                warn!("polling de {} falhou: {e}", self.inner.entry_id);
                self.update(|v| v.error = Some(e.to_string()));
            }
        }
        self.view()
    }

    /// Toggle otimista.
    ///
    /// Só atua em `Ready`. Toggles chamados antes de a vista carregar,
    /// enquanto outro está em curso, ou até ao fim do cool-down, são
    /// descartados sem pedido ao servidor.
    pub async fn toggle(&self) -> ToggleOutcome {
        if !self.is_mounted() {
            return ToggleOutcome::Ignored;
        }
        // Sem vista carregada não se sabe que ação enviar
        if self.inner.view.borrow().phase != Phase::Ready {
            debug!("toggle ignorado (likes por carregar): {}", self.inner.entry_id);
            return ToggleOutcome::Ignored;
        }

        {
            let mut guard = self.inner.lock_guard();
            if guard.is_busy(Instant::now()) {
                debug!("toggle ignorado (em curso): {}", self.inner.entry_id);
                return ToggleOutcome::Ignored;
            }
            guard.in_flight = true;
        }
        let _in_flight = InFlight { inner: &self.inner };

        let previous = self.view().data();
        let optimistic = previous.toggled();
        self.update(|v| {
            v.phase = Phase::Toggling;
            v.apply(optimistic);
            v.error = None;
        });

        let result = self
            .inner
            .store
            .toggle_like(
                &self.inner.entry_id,
                &self.inner.session,
                previous.toggle_action(),
            )
            .await;

        match result {
            Ok(_) => {
                self.update(|v| v.phase = Phase::Ready);
                ToggleOutcome::Applied(self.view().data())
            }
            Err(e) => {
                let message = e.to_string();
                warn!("toggle de {} revertido: {message}", self.inner.entry_id);
                self.update(|v| {
                    v.phase = Phase::Ready;
                    v.apply(previous);
                    v.error = Some(message.clone());
                });
                ToggleOutcome::RolledBack {
                    restored: previous,
                    error: message,
                }
            }
        }
    }
}
