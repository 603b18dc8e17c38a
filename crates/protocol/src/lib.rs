#![forbid(unsafe_code)]

mod admin;
mod content;
mod likes;
pub mod routes;

pub use admin::{DispatchAck, DispatchEvent, DispatchRequest, ErrorBody};
pub use content::{ContentEntry, ContentListing, EntryKind, NewEntry};
pub use likes::{LikeAction, LikeData, LikeQuery, LikeResponse, ToggleRequest};
