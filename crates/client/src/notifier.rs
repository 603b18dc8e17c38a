//! Aviso de conteúdo novo na comunidade.
//!
//! Compara o número de entradas remotas com a linha de base persistida no
//! store local. A linha de base só avança quando o utilizador marca o
//! conteúdo como visto (ou quando conteúdo é removido).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use jornadas_common::{
    BASELINE_KEY, FIRST_VISIT_NUDGE, JornadasResult, NOTIFIER_RECHECK_INTERVAL, StorageError,
};
use jornadas_storage::LocalStore;

use crate::gateway::ContentSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotificationState {
    pub has_new_items: bool,
    pub new_count: u64,
    /// Total remoto da última verificação; `None` antes da primeira.
    pub total_count: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Contagem mostrada na primeira visita, antes de haver linha de base.
    /// `None` desliga o aviso e a primeira verificação cria a linha de base.
    pub first_visit_nudge: Option<u64>,
    pub recheck_interval: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            first_visit_nudge: Some(FIRST_VISIT_NUDGE),
            recheck_interval: NOTIFIER_RECHECK_INTERVAL,
        }
    }
}

struct Inner {
    source: Arc<dyn ContentSource>,
    store: Arc<dyn LocalStore>,
    config: NotifierConfig,
    state: watch::Sender<NotificationState>,
    /// Momento do último total obtido do servidor.
    fetched_at: Mutex<Option<Instant>>,
}

#[derive(Clone)]
pub struct ContentNotifier {
    inner: Arc<Inner>,
}

impl ContentNotifier {
    pub fn new(
        source: Arc<dyn ContentSource>,
        store: Arc<dyn LocalStore>,
        config: NotifierConfig,
    ) -> Self {
        let initial = match read_baseline(store.as_ref()) {
            Some(_) => NotificationState::default(),
            None => unseen(&config),
        };
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                source,
                store,
                config,
                state,
                fetched_at: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> NotificationState {
        *self.inner.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationState> {
        self.inner.state.subscribe()
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.inner.config
    }

    fn publish(&self, state: NotificationState) -> NotificationState {
        self.inner.state.send_modify(|s| *s = state);
        state
    }

    fn baseline(&self) -> Option<u64> {
        read_baseline(self.inner.store.as_ref())
    }

    fn persist_baseline(&self, total: u64) -> Result<(), StorageError> {
        self.inner.store.set(BASELINE_KEY, &total.to_string())
    }

    async fn fetch_total(&self) -> JornadasResult<u64> {
        let total = self.inner.source.content().await?.total();
        *self.fetched_at() = Some(Instant::now());
        Ok(total)
    }

    fn fetched_at(&self) -> MutexGuard<'_, Option<Instant>> {
        self.inner
            .fetched_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // Total publicado, se obtido há menos de `recheck_interval`
    fn fresh_total(&self) -> Option<u64> {
        let at = (*self.fetched_at())?;
        if at.elapsed() > self.inner.config.recheck_interval {
            return None;
        }
        self.state().total_count
    }

    /// Vai buscar a listagem remota e recalcula o estado.
    pub async fn check_for_new(&self) -> JornadasResult<NotificationState> {
        let current = self.fetch_total().await?;

        let state = match self.baseline() {
            None => match self.inner.config.first_visit_nudge {
                Some(nudge) => NotificationState {
                    has_new_items: true,
                    new_count: nudge,
                    total_count: Some(current),
                },
                None => {
                    self.persist_baseline(current)?;
                    NotificationState {
                        total_count: Some(current),
                        ..Default::default()
                    }
                }
            },
            Some(baseline) if current > baseline => NotificationState {
                has_new_items: true,
                new_count: current - baseline,
                total_count: Some(current),
            },
            Some(baseline) => {
                if current < baseline {
                    debug!("conteúdo removido: linha de base {baseline} -> {current}");
                    self.persist_baseline(current)?;
                }
                NotificationState {
                    total_count: Some(current),
                    ..Default::default()
                }
            }
        };

        Ok(self.publish(state))
    }

    /// Guarda o total atual como visto e limpa o aviso.
    ///
    /// Reaproveita o total da última verificação se tiver menos de
    /// `recheck_interval`; caso contrário volta a pedi-lo ao servidor, para
    /// que entradas chegadas entretanto não fiquem marcadas sem serem vistas.
    pub async fn mark_as_viewed(&self) -> JornadasResult<NotificationState> {
        let total = match self.fresh_total() {
            Some(total) => total,
            None => self.fetch_total().await?,
        };
        self.persist_baseline(total)?;
        info!("conteúdo marcado como visto ({total} entradas)");

        Ok(self.publish(NotificationState {
            total_count: Some(total),
            ..Default::default()
        }))
    }

    /// Esquece a linha de base; volta ao estado de primeira visita.
    pub fn reset(&self) -> Result<NotificationState, StorageError> {
        self.inner.store.remove(BASELINE_KEY)?;
        *self.fetched_at() = None;
        Ok(self.publish(unseen(&self.inner.config)))
    }

    /// Verificação imediata e depois a cada `recheck_interval`.
    pub fn spawn(&self) -> NotifierHandle {
        let notifier = self.clone();
        let period = self.inner.config.recheck_interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now(), period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = notifier.check_for_new().await {
                    warn!("verificação de conteúdo novo falhou: {e}");
                }
            }
        });

        NotifierHandle { task: Some(task) }
    }
}

/// Tarefa de verificação periódica; parada no `stop` ou no drop.
pub struct NotifierHandle {
    task: Option<JoinHandle<()>>,
}

impl NotifierHandle {
    pub fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for NotifierHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn unseen(config: &NotifierConfig) -> NotificationState {
    match config.first_visit_nudge {
        Some(nudge) => NotificationState {
            has_new_items: true,
            new_count: nudge,
            total_count: None,
        },
        None => NotificationState::default(),
    }
}

// Valores ilegíveis contam como ausentes
fn read_baseline(store: &dyn LocalStore) -> Option<u64> {
    store
        .get(BASELINE_KEY)
        .and_then(|raw| raw.trim().parse().ok())
}
