#![forbid(unsafe_code)]

mod error;

use std::time::Duration;

pub use error::*;

pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8787";

/// Intervalo do polling de likes.
pub const LIKE_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Janela após um toggle em que novos toggles são descartados.
pub const TOGGLE_COOLDOWN: Duration = Duration::from_millis(500);
/// TTL da vista de likes em cache.
pub const LIKE_CACHE_TTL: Duration = Duration::from_secs(30);
/// TTL por omissão do cache genérico.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Intervalo de re-verificação de conteúdo novo.
pub const NOTIFIER_RECHECK_INTERVAL: Duration = Duration::from_secs(2 * 60);
/// "Novos" sintéticos mostrados na primeira visita.
pub const FIRST_VISIT_NUDGE: u64 = 2;

pub const DRAFT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);
pub const DRAFT_VERSION: u32 = 1;

/// Tentativas de read-modify-write no documento antes de desistir.
pub const MAX_WRITE_RETRIES: usize = 3;
pub const DISPATCH_BUFFER: usize = 128;

// Chaves do store local
pub const SESSION_KEY: &str = "jornadas.session_id";
pub const BASELINE_KEY: &str = "jornadas.community.last_count";
pub const PREFERENCES_KEY: &str = "jornadas.preferences";
pub const DRAFT_KEY_PREFIX: &str = "jornadas.draft.";
