use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::TournamentStore;

const STATE_FILE_VERSION: u8 = 1;

#[derive(Serialize)]
struct StateFile<'a> {
    version: u8,
    store: &'a TournamentStore,
}

#[derive(Deserialize)]
struct StateFileRaw {
    version: u8,
    store: serde_json::Value,
}

/// Versioned JSON snapshot of the whole arena.
#[derive(Clone, Debug)]
pub struct StateSnapshotFile {
    file_path: PathBuf,
}

impl StateSnapshotFile {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Missing, unreadable or unsupported files yield an empty arena.
    pub fn load(&self) -> TournamentStore {
        load_store(&self.file_path)
    }

    pub fn save(&self, store: &TournamentStore) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let payload = StateFile {
            version: STATE_FILE_VERSION,
            store,
        };
        let text = serde_json::to_string_pretty(&payload)?;
        fs::write(&self.file_path, text)?;
        Ok(())
    }
}

fn load_store(path: &Path) -> TournamentStore {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("failed to read {}: {error}", path.display());
            }
            return TournamentStore::new();
        }
    };
    let parsed = match serde_json::from_str::<StateFileRaw>(&text) {
        Ok(value) if value.version == STATE_FILE_VERSION => value,
        Ok(value) => {
            tracing::warn!(
                "unsupported state version {} at {}",
                value.version,
                path.display()
            );
            return TournamentStore::new();
        }
        Err(error) => {
            tracing::warn!("failed to parse {}: {error}", path.display());
            return TournamentStore::new();
        }
    };

    match serde_json::from_value::<TournamentStore>(parsed.store) {
        Ok(store) => store,
        Err(error) => {
            tracing::warn!("failed to decode store in {}: {error}", path.display());
            TournamentStore::new()
        }
    }
}
