use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Photo,
    Testimonial,
}

/// Entrada da galeria da comunidade (foto ou testemunho).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub likes: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Submissão de uma entrada nova (endpoint de administração).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl NewEntry {
    /// Fotos precisam de imagem, testemunhos de texto.
    pub fn validate(&self) -> Result<(), String> {
        if self.display_name.trim().is_empty() {
            return Err("displayName vazio".into());
        }
        match self.kind {
            EntryKind::Photo if is_blank(&self.image_url) => {
                Err("foto sem imageUrl".into())
            }
            EntryKind::Testimonial if is_blank(&self.content) => {
                Err("testemunho sem content".into())
            }
            _ => Ok(()),
        }
    }
}

fn is_blank(field: &Option<String>) -> bool {
    field.as_deref().is_none_or(|s| s.trim().is_empty())
}

/// Documento da comunidade tal como é servido pelo gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentListing {
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    #[serde(default)]
    pub entries: Vec<ContentEntry>,
}

impl ContentListing {
    pub fn empty(now: OffsetDateTime) -> Self {
        Self {
            last_updated: now,
            entries: Vec::new(),
        }
    }

    pub fn total(&self) -> u64 {
        self.entries.len() as u64
    }
}
