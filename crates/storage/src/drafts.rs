use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};

use jornadas_common::{DRAFT_KEY_PREFIX, DRAFT_MAX_AGE, DRAFT_VERSION, StorageError};

use crate::local::LocalStore;

/// Formato persistido de um rascunho.
#[derive(Debug, Serialize, Deserialize)]
struct DraftEnvelope {
    data: serde_json::Value,
    /// Epoch em milissegundos.
    timestamp: i64,
    version: u32,
}

/// Rascunhos de formulários guardados no store local, com expiração.
#[derive(Clone)]
pub struct DraftStore {
    store: Arc<dyn LocalStore>,
    max_age: Duration,
    version: u32,
}

impl DraftStore {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            max_age: DRAFT_MAX_AGE,
            version: DRAFT_VERSION,
        }
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn save<T: Serialize>(&self, form: &str, data: &T) -> Result<(), StorageError> {
        self.save_at(form, data, OffsetDateTime::now_utc())
    }

    /// Rascunho guardado para `form`, se ainda válido.
    ///
    /// Rascunhos expirados, de outra versão ou ilegíveis são apagados.
    pub fn load<T: DeserializeOwned>(&self, form: &str) -> Result<Option<T>, StorageError> {
        self.load_at(form, OffsetDateTime::now_utc())
    }

    pub fn discard(&self, form: &str) -> Result<(), StorageError> {
        self.store.remove(&key(form))
    }

    fn save_at<T: Serialize>(
        &self,
        form: &str,
        data: &T,
        now: OffsetDateTime,
    ) -> Result<(), StorageError> {
        let envelope = DraftEnvelope {
            data: serde_json::to_value(data)?,
            timestamp: epoch_millis(now),
            version: self.version,
        };
        self.store.set(&key(form), &serde_json::to_string(&envelope)?)?;
        debug!("rascunho guardado: {form}");
        Ok(())
    }

    fn load_at<T: DeserializeOwned>(
        &self,
        form: &str,
        now: OffsetDateTime,
    ) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.store.get(&key(form)) else {
            return Ok(None);
        };

        let envelope: DraftEnvelope = match serde_json::from_str(&raw) {
            Ok(e) => e,
            Err(e) => {
                warn!("rascunho ilegível descartado ({form}): {e}");
                self.discard(form)?;
                return Ok(None);
            }
        };

        if envelope.version != self.version {
            debug!(
                "rascunho de versão {} descartado ({form})",
                envelope.version
            );
            self.discard(form)?;
            return Ok(None);
        }

        let age_ms = epoch_millis(now).saturating_sub(envelope.timestamp);
        if age_ms > self.max_age.as_millis() as i64 {
            debug!("rascunho expirado descartado ({form})");
            self.discard(form)?;
            return Ok(None);
        }

        match serde_json::from_value(envelope.data) {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                warn!("rascunho com formato inesperado descartado ({form}): {e}");
                self.discard(form)?;
                Ok(None)
            }
        }
    }
}

fn key(form: &str) -> String {
    format!("{DRAFT_KEY_PREFIX}{form}")
}

fn epoch_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}
