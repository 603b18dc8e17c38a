#![forbid(unsafe_code)]

pub mod gateway;
pub mod likes;
pub mod notifier;
mod session;
pub mod sync;

#[cfg(test)]
mod testing;

pub use gateway::{ContentSource, HttpGateway, LikeGateway};
pub use likes::{LikeController, LikeStore, LikeView, Phase, ToggleOutcome};
pub use notifier::{ContentNotifier, NotificationState, NotifierConfig, NotifierHandle};
pub use session::{SessionId, SessionIdentity};
pub use sync::PollingSync;
