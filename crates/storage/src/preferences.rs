use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use jornadas_common::{PREFERENCES_KEY, StorageError};

use crate::local::LocalStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapMode {
    #[default]
    Street,
    Illustrated,
}

impl fmt::Display for MapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapMode::Street => f.write_str("street"),
            MapMode::Illustrated => f.write_str("illustrated"),
        }
    }
}

impl FromStr for MapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "street" => Ok(MapMode::Street),
            "illustrated" => Ok(MapMode::Illustrated),
            _ => Err(format!("modo de mapa inválido: '{s}'. Use: street, illustrated")),
        }
    }
}

/// Preferências do visitante (áudio-guia, localização, modo do mapa).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub audio_enabled: bool,
    pub location_enabled: bool,
    pub map_mode: MapMode,
}

impl Preferences {
    /// Lê as preferências; ausentes ou ilegíveis dão os valores por omissão.
    pub fn load(store: &dyn LocalStore) -> Self {
        let Some(raw) = store.get(PREFERENCES_KEY) else {
            return Self::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("preferências ilegíveis, usando valores por omissão: {e}");
            Self::default()
        })
    }

    pub fn save(&self, store: &dyn LocalStore) -> Result<(), StorageError> {
        store.set(PREFERENCES_KEY, &serde_json::to_string(self)?)
    }
}
