#![forbid(unsafe_code)]

mod cache;
pub mod counters;
pub mod document;
mod drafts;
mod entry;
mod local;
mod preferences;

pub use cache::TtlCache;
pub use counters::{LikeCounters, LikeEntry};
pub use document::{
    DocumentStore, FileDocumentStore, MemoryDocumentStore, Versioned, update_with_retry,
};
pub use drafts::DraftStore;
pub use entry::CacheEntry;
pub use local::{FileStore, LocalStore, MemoryStore};
pub use preferences::{MapMode, Preferences};
