//! Caminhos HTTP do gateway, partilhados entre servidor e cliente.

pub const HEALTH: &str = "/health";
pub const LIKES: &str = "/api/likes";
pub const LIKE_ENTRY: &str = "/api/likes/{entry_id}";
pub const COMMUNITY: &str = "/api/community";
pub const COMMUNITY_ENTRY: &str = "/api/community/{id}";
pub const DISPATCH: &str = "/api/dispatch";
