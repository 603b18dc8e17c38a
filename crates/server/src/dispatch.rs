use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{info, warn};

use jornadas_common::DISPATCH_BUFFER;
use jornadas_protocol::{DispatchAck, DispatchEvent, DispatchRequest};

use crate::auth::Admin;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const CONTENT_UPDATED: &str = "content-updated";

/// Canal de eventos para os consumidores a jusante.
#[derive(Debug, Clone)]
pub struct DispatchHub {
    tx: broadcast::Sender<DispatchEvent>,
}

impl DispatchHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publica o evento. Retorna o número de consumidores que o receberam.
    pub fn publish(&self, event: DispatchEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn content_updated(&self, payload: serde_json::Value) -> usize {
        self.publish(DispatchEvent {
            event_type: CONTENT_UPDATED.to_string(),
            payload,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for DispatchHub {
    fn default() -> Self {
        Self::new(DISPATCH_BUFFER)
    }
}

/// Worker que regista cada evento; termina quando o hub é largado.
pub async fn log_events(rx: broadcast::Receiver<DispatchEvent>) {
    let mut events = BroadcastStream::new(rx);
    while let Some(item) = events.next().await {
        match item {
            Ok(event) => info!(event = %event.event_type, payload = %event.payload, "evento despachado"),
            Err(BroadcastStreamRecvError::Lagged(n)) => {
                warn!("worker de eventos atrasado, {n} eventos perdidos")
            }
        }
    }
}

/// `POST /api/dispatch`: repassa o evento aos consumidores ligados.
pub async fn dispatch(
    _admin: Admin,
    State(state): State<AppState>,
    Json(request): Json<DispatchRequest>,
) -> ApiResult<(StatusCode, Json<DispatchAck>)> {
    if request.event_type.trim().is_empty() {
        return Err(ApiError::BadRequest("eventType em falta".into()));
    }
    let delivered = state.dispatch.publish(request.into());
    Ok((StatusCode::ACCEPTED, Json(DispatchAck { delivered })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn publish_without_subscribers() {
        let hub = DispatchHub::new(4);
        assert_eq!(hub.content_updated(json!({})), 0);
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let hub = DispatchHub::new(4);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_eq!(hub.receiver_count(), 2);

        let delivered = hub.publish(DispatchEvent {
            event_type: "process-image".into(),
            payload: json!({"id": "e1"}),
        });
        assert_eq!(delivered, 2);

        assert_eq!(a.recv().await.unwrap().event_type, "process-image");
        assert_eq!(b.recv().await.unwrap().payload["id"], "e1");
    }

    #[tokio::test]
    async fn logger_stops_when_hub_dropped() {
        let hub = DispatchHub::new(4);
        let worker = tokio::spawn(log_events(hub.subscribe()));
        hub.content_updated(json!({"removed": "e1"}));
        drop(hub);
        worker.await.unwrap();
    }
}
