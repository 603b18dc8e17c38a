/// Erros do armazenamento local (store persistido, drafts, preferências).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialização: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store corrompido: {0}")]
    Corrupted(String),
}

/// Erros do documento da comunidade (store com revisão).
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("conflito de revisão: esperada {expected:?}, encontrada {found:?}")]
    Conflict {
        expected: Option<u64>,
        found: Option<u64>,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Erros ao falar com o gateway remoto.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("falha de rede: {0}")]
    Transport(String),
    #[error("gateway respondeu {status}: {message}")]
    Status { status: u16, message: String },
    #[error("não autorizado: {0}")]
    Unauthorized(String),
    #[error("pedido rejeitado: {0}")]
    Rejected(String),
    #[error("resposta inválida: {0}")]
    Decode(String),
    #[error("URL inválida: {0}")]
    InvalidUrl(String),
}

/// Erro top-level do Jornadas.
#[derive(Debug, thiserror::Error)]
pub enum JornadasError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Result type alias.
pub type JornadasResult<T> = Result<T, JornadasError>;

// Conversão implícita de io::Error → JornadasError (via StorageError)
impl From<std::io::Error> for JornadasError {
    fn from(e: std::io::Error) -> Self {
        JornadasError::Storage(StorageError::Io(e))
    }
}
