use serde::{Deserialize, Serialize};

/// Vista de likes de uma entrada para uma sessão.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeData {
    pub liked: bool,
    pub total: u64,
}

impl LikeData {
    pub fn new(liked: bool, total: u64) -> Self {
        Self { liked, total }
    }

    /// Estado após inverter o like. O total nunca desce abaixo de zero.
    pub fn toggled(self) -> Self {
        if self.liked {
            Self {
                liked: false,
                total: self.total.saturating_sub(1),
            }
        } else {
            Self {
                liked: true,
                total: self.total.saturating_add(1),
            }
        }
    }

    /// Ação que leva deste estado ao estado invertido.
    pub fn toggle_action(&self) -> LikeAction {
        if self.liked {
            LikeAction::Unlike
        } else {
            LikeAction::Like
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    Like,
    Unlike,
}

impl LikeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LikeAction::Like => "like",
            LikeAction::Unlike => "unlike",
        }
    }
}

/// Query string de `GET /api/likes/{entryId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeQuery {
    pub session_id: String,
}

/// Corpo de `POST /api/likes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRequest {
    pub entry_id: String,
    pub session_id: String,
    pub action: LikeAction,
}

/// Resposta do toggle. `success: false` é uma rejeição ao nível da aplicação.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeResponse {
    pub success: bool,
    pub liked: bool,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LikeResponse {
    pub fn ok(data: LikeData) -> Self {
        Self {
            success: true,
            liked: data.liked,
            total: data.total,
            error: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            liked: false,
            total: 0,
            error: Some(message.into()),
        }
    }

    pub fn data(&self) -> LikeData {
        LikeData::new(self.liked, self.total)
    }
}
