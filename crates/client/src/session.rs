use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use jornadas_common::{SESSION_KEY, StorageError};
use jornadas_storage::LocalStore;

/// Identidade pseudónima e estável de um perfil (não é uma conta).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `client_<epoch-ms>_<9 caracteres aleatórios>`
    pub fn generate() -> Self {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("client_{millis}_{}", &random[..9]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fornece o id de sessão persistido no store local.
#[derive(Clone)]
pub struct SessionIdentity {
    store: Arc<dyn LocalStore>,
}

impl SessionIdentity {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    /// Gera e persiste o id na primeira chamada; depois devolve sempre o mesmo.
    pub fn session_id(&self) -> Result<SessionId, StorageError> {
        if let Some(existing) = self.store.get(SESSION_KEY)
            && !existing.trim().is_empty()
        {
            return Ok(SessionId(existing));
        }

        let id = SessionId::generate();
        self.store.set(SESSION_KEY, id.as_str())?;
        info!("nova sessão: {id}");
        Ok(id)
    }
}
