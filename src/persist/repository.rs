use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;

use crate::foundation::error::{FogmapError, FogmapResult};
use crate::persist::record::MapRecord;

/// Storage for map records.
///
/// Implementations must tolerate `save_items` being called from the persistence worker thread.
pub trait ItemRepository: Send + Sync {
    /// All stored records.
    fn load_items(&self) -> FogmapResult<Vec<MapRecord>>;

    /// Replace the stored records.
    fn save_items(&self, items: &[MapRecord]) -> FogmapResult<()>;
}

/// Merge `record` into `items`, replacing the entry with the same name.
pub fn upsert_record(items: &mut Vec<MapRecord>, record: MapRecord) {
    match items.iter_mut().find(|r| r.name == record.name) {
        Some(slot) => *slot = record,
        None => items.push(record),
    }
}

/// Records kept in one pretty-printed JSON file.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    /// Repository backed by `path`; the file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ItemRepository for JsonFileRepository {
    fn load_items(&self) -> FogmapResult<Vec<MapRecord>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("read map records {}", self.path.display()))
                    .into());
            }
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            FogmapError::malformed(format!("{}: {e}", self.path.display()))
        })
    }

    fn save_items(&self, items: &[MapRecord]) -> FogmapResult<()> {
        let json = serde_json::to_vec_pretty(items)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), count = items.len(), "saved map records");
        Ok(())
    }
}

/// In-process repository for tests and previews.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    items: Mutex<Vec<MapRecord>>,
    saves: Mutex<usize>,
}

impl MemoryRepository {
    /// Repository pre-populated with `items`.
    pub fn with_items(items: Vec<MapRecord>) -> Self {
        Self {
            items: Mutex::new(items),
            saves: Mutex::new(0),
        }
    }

    /// Number of completed `save_items` calls.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current records.
    pub fn snapshot(&self) -> Vec<MapRecord> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ItemRepository for MemoryRepository {
    fn load_items(&self) -> FogmapResult<Vec<MapRecord>> {
        Ok(self.snapshot())
    }

    fn save_items(&self, items: &[MapRecord]) -> FogmapResult<()> {
        *self.items.lock().unwrap_or_else(|e| e.into_inner()) = items.to_vec();
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/persist/repository.rs"]
mod tests;
