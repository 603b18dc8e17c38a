use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use jornadas_common::{DocumentError, StorageError};
use jornadas_protocol::ContentListing;

/// Documento da comunidade + revisão em que foi lido.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned {
    pub revision: u64,
    pub document: ContentListing,
}

/// Store do documento JSON da comunidade com escrita condicional.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `None` quando o documento ainda não existe.
    async fn load(&self) -> Result<Option<Versioned>, DocumentError>;

    /// Compare-and-swap: só grava se a revisão atual for `expected`
    /// (`None` = documento ainda inexistente). Retorna a nova revisão.
    async fn store(
        &self,
        document: &ContentListing,
        expected: Option<u64>,
    ) -> Result<u64, DocumentError>;
}

/// Store em memória.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    current: Mutex<Option<Versioned>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn load(&self) -> Result<Option<Versioned>, DocumentError> {
        Ok(self.current.lock().await.clone())
    }

    async fn store(
        &self,
        document: &ContentListing,
        expected: Option<u64>,
    ) -> Result<u64, DocumentError> {
        let mut current = self.current.lock().await;
        let found = current.as_ref().map(|v| v.revision);
        if found != expected {
            return Err(DocumentError::Conflict { expected, found });
        }
        let revision = found.unwrap_or(0) + 1;
        *current = Some(Versioned {
            revision,
            document: document.clone(),
        });
        Ok(revision)
    }
}

/// Store persistido num ficheiro JSON `{revision, document}`.
#[derive(Debug)]
pub struct FileDocumentStore {
    path: PathBuf,
    // Serializa o read-compare-write dentro do processo
    write_lock: Mutex<()>,
}

impl FileDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> Result<Option<Versioned>, DocumentError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("documento inexistente: {:?}", self.path);
                return Ok(None);
            }
            Err(e) => return Err(StorageError::Io(e).into()),
        };

        let versioned = serde_json::from_slice(&data).map_err(|e| {
            StorageError::Corrupted(format!("{}: {e}", self.path.display()))
        })?;
        Ok(Some(versioned))
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn load(&self) -> Result<Option<Versioned>, DocumentError> {
        self.read().await
    }

    async fn store(
        &self,
        document: &ContentListing,
        expected: Option<u64>,
    ) -> Result<u64, DocumentError> {
        let _guard = self.write_lock.lock().await;

        let found = self.read().await?.map(|v| v.revision);
        if found != expected {
            return Err(DocumentError::Conflict { expected, found });
        }

        let versioned = Versioned {
            revision: found.unwrap_or(0) + 1,
            document: document.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&versioned).map_err(StorageError::from)?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(StorageError::from)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(StorageError::from)?;

        info!(
            "documento gravado: {:?} (revisão {})",
            self.path, versioned.revision
        );
        Ok(versioned.revision)
    }
}

/// Ciclo read-modify-write com repetição em caso de conflito de revisão.
///
/// `mutate` devolve `None` quando não há nada a gravar; nesse caso nada é
/// escrito e o resultado é `Ok(None)`. Um documento inexistente é tratado
/// como vazio.
pub async fn update_with_retry<F, R>(
    store: &dyn DocumentStore,
    max_retries: usize,
    mut mutate: F,
) -> Result<Option<R>, DocumentError>
where
    F: FnMut(&mut ContentListing) -> Option<R> + Send,
    R: Send,
{
    let mut attempt = 0;
    loop {
        let (mut document, revision) = match store.load().await? {
            Some(v) => (v.document, Some(v.revision)),
            None => (ContentListing::empty(OffsetDateTime::now_utc()), None),
        };

        let Some(result) = mutate(&mut document) else {
            return Ok(None);
        };
        document.last_updated = OffsetDateTime::now_utc();

        match store.store(&document, revision).await {
            Ok(_) => return Ok(Some(result)),
            Err(DocumentError::Conflict { expected, found }) if attempt < max_retries => {
                attempt += 1;
                warn!(
                    "conflito no documento (esperada {expected:?}, encontrada {found:?}), tentativa {attempt}/{max_retries}"
                );
            }
            Err(e) => return Err(e),
        }
    }
}
