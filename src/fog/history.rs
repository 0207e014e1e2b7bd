use std::collections::VecDeque;

use crate::fog::raster::FogRaster;
use crate::foundation::error::FogmapResult;

const MIN_BUDGET_BYTES: usize = 4 * 1024 * 1024;
const MAX_BUDGET_BYTES: usize = 24 * 1024 * 1024;

/// Byte budget for a raster with `pixel_count` pixels.
pub fn history_budget_bytes(pixel_count: usize) -> usize {
    MIN_BUDGET_BYTES.max(MAX_BUDGET_BYTES.min(pixel_count))
}

/// PNG-compressed fog snapshot.
#[derive(Clone, Debug)]
pub struct FogHistoryEntry {
    png: Vec<u8>,
    dimensions: (u32, u32),
}

impl FogHistoryEntry {
    /// Compress a raster.
    pub fn capture(raster: &FogRaster) -> FogmapResult<Self> {
        Ok(Self {
            png: raster.encode_gray_png()?,
            dimensions: raster.dimensions(),
        })
    }

    /// Compressed size in bytes.
    pub fn byte_len(&self) -> usize {
        self.png.len()
    }

    /// Dimensions of the captured raster.
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    /// Decompress.
    pub fn restore(&self) -> FogmapResult<FogRaster> {
        FogRaster::decode(&self.png)
    }
}

/// LIFO undo stack bounded by total compressed bytes.
///
/// Pushing evicts the oldest entries until the total fits the budget again. The newest entry is
/// always kept, even when it alone exceeds the budget.
#[derive(Debug)]
pub struct FogHistory {
    entries: VecDeque<FogHistoryEntry>,
    total_bytes: usize,
    budget_bytes: usize,
}

impl FogHistory {
    /// Empty history with an explicit budget.
    pub fn with_budget(budget_bytes: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            total_bytes: 0,
            budget_bytes,
        }
    }

    /// Empty history sized for a raster with `pixel_count` pixels.
    pub fn for_pixel_count(pixel_count: usize) -> Self {
        Self::with_budget(history_budget_bytes(pixel_count))
    }

    /// Push a snapshot, evicting the oldest entries past the budget.
    pub fn push(&mut self, entry: FogHistoryEntry) {
        self.total_bytes += entry.byte_len();
        self.entries.push_back(entry);
        while self.total_bytes > self.budget_bytes && self.entries.len() > 1 {
            if let Some(old) = self.entries.pop_front() {
                self.total_bytes -= old.byte_len();
                tracing::debug!(bytes = old.byte_len(), "evicted fog history entry");
            }
        }
    }

    /// Pop the newest snapshot.
    pub fn pop(&mut self) -> Option<FogHistoryEntry> {
        let e = self.entries.pop_back()?;
        self.total_bytes -= e.byte_len();
        Some(e)
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_bytes = 0;
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when there is nothing to undo.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total compressed bytes held.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Configured budget.
    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }
}

#[cfg(test)]
#[path = "../../tests/unit/fog/history.rs"]
mod tests;
