use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};
use tracing::debug;

use crate::likes::LikeController;

/// Reconciliação periódica da vista de likes com o servidor.
///
/// Ao montar carrega pelo cache; depois, a cada `period`, lê a vista fresca
/// e sobrescreve o estado local (incluindo estado otimista).
pub struct PollingSync {
    controller: LikeController,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PollingSync {
    pub fn mount(controller: LikeController, period: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(controller.clone(), period, shutdown_rx));
        debug!(
            "polling iniciado: {} a cada {period:?}",
            controller.entry_id()
        );

        Self {
            controller,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    pub fn controller(&self) -> &LikeController {
        &self.controller
    }

    /// Pára o polling e espera pelo fim da tarefa.
    pub async fn unmount(mut self) {
        self.controller.unmount();
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        debug!("polling parado: {}", self.controller.entry_id());
    }
}

impl Drop for PollingSync {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            self.controller.unmount();
            task.abort();
        }
    }
}

async fn run(controller: LikeController, period: Duration, shutdown: oneshot::Receiver<()>) {
    let poll = async {
        controller.load().await;

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            controller.refresh().await;
        }
    };

    tokio::select! {
        _ = poll => {}
        _ = shutdown => {}
    }
}
