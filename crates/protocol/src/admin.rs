use serde::{Deserialize, Serialize};

/// Corpo de `POST /api/dispatch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub event_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Evento entregue aos consumidores a jusante (processamento de imagens etc.).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchEvent {
    pub event_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl From<DispatchRequest> for DispatchEvent {
    fn from(req: DispatchRequest) -> Self {
        Self {
            event_type: req.event_type,
            payload: req.payload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchAck {
    /// Número de consumidores que receberam o evento.
    pub delivered: usize,
}

/// Corpo de erro devolvido pelo gateway (`{"error": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
