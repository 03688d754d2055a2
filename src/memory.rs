use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, io, path::Path};

use crate::errors::StoreError;

/// Per-user map from narration text to the category account it last went
/// to. Last write wins, so the map follows the user's habits.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct NarrationMemory {
    by_user: HashMap<String, HashMap<String, String>>,
}

impl NarrationMemory {
    pub(crate) fn remember(&mut self, user: &str, narration: &str, category: &str) {
        tracing::debug!("remembering '{narration}' -> {category} for {user}");
        self.by_user
            .entry(user.to_string())
            .or_default()
            .insert(narration.to_string(), category.to_string());
    }

    pub(crate) fn recall(&self, user: &str, narration: &str) -> Option<&str> {
        self.by_user
            .get(user)
            .and_then(|narrations| narrations.get(narration))
            .map(String::as_str)
    }

    /// Load a snapshot; a missing file is an empty memory.
    pub(crate) fn load(path: &Path) -> Result<Self, StoreError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
