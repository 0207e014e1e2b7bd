use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::fog::raster::FogRaster;
use crate::foundation::error::{FogmapError, FogmapResult};
use crate::persist::record::MapRecord;
use crate::persist::repository::{ItemRepository, upsert_record};
use crate::session::config::PersistOpts;
use crate::session::document::MapDocument;

/// Everything one save needs, captured on the owning thread.
#[derive(Clone, Debug)]
pub struct PersistJob {
    /// Record with serialized items and view state.
    pub record: MapRecord,
    /// Fog raster (shares storage with the live raster until it is edited).
    pub fog: FogRaster,
    /// Campaign root the mask path is relative to.
    pub campaign_dir: PathBuf,
}

impl PersistJob {
    /// Snapshot `doc`. Cheap: items are serialized, the fog raster is shared.
    pub fn capture(doc: &MapDocument, campaign_dir: &Path) -> FogmapResult<Self> {
        Ok(Self {
            record: doc.to_record()?,
            fog: doc.fog.snapshot(),
            campaign_dir: campaign_dir.to_path_buf(),
        })
    }

    fn mask_path(&self) -> PathBuf {
        self.campaign_dir.join(&self.record.fog_mask_path)
    }
}

/// Counters reported by [`PersistPipeline::stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PersistStats {
    /// Calls to `persist`.
    pub requested: u64,
    /// Completed writes (background and explicit).
    pub written: u64,
    /// Requests replaced by a newer one before being written.
    pub coalesced: u64,
    /// Writes that failed.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<PersistJob>,
    due: Option<Instant>,
    shutdown: bool,
}

struct Shared {
    slot: Mutex<Slot>,
    wake: Condvar,
    idle: Condvar,
    busy: AtomicBool,
    repo: Arc<dyn ItemRepository>,
    delay: Duration,
    requested: AtomicU64,
    written: AtomicU64,
    coalesced: AtomicU64,
    failed: AtomicU64,
}

impl Shared {
    fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Clear the busy flag. Takes the slot guard so waiters cannot miss the wakeup.
    fn release(&self, _slot: &MutexGuard<'_, Slot>) {
        self.busy.store(false, Ordering::Release);
        self.idle.notify_all();
    }

    fn record_result(&self, result: &FogmapResult<()>) {
        match result {
            Ok(()) => self.written.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.failed.fetch_add(1, Ordering::Relaxed),
        };
    }
}

/// Background writer for map state.
///
/// The owning thread calls [`persist`](Self::persist) as often as it likes. One write runs at a
/// time; while it runs, newer requests replace each other in a single pending slot and the last
/// one is written once, a short delay after the running write finishes.
pub struct PersistPipeline {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl PersistPipeline {
    /// Start the worker thread.
    pub fn new(repo: Arc<dyn ItemRepository>, opts: &PersistOpts) -> FogmapResult<Self> {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::default()),
            wake: Condvar::new(),
            idle: Condvar::new(),
            busy: AtomicBool::new(false),
            repo,
            delay: Duration::from_millis(opts.coalesce_delay_ms),
            requested: AtomicU64::new(0),
            written: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        });
        let thread_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("fogmap-persist".to_string())
            .spawn(move || run(thread_shared))
            .context("spawn persistence worker")?;
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Queue `job` for writing. Never blocks on IO.
    ///
    /// Returns [`FogmapError::SaveConflict`] when the worker is busy; the job is still written,
    /// coalesced with any later request.
    pub fn persist(&self, job: PersistJob) -> FogmapResult<()> {
        let s = &self.shared;
        s.requested.fetch_add(1, Ordering::Relaxed);
        let mut slot = s.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.shutdown {
            return Err(FogmapError::validation("persistence pipeline is shut down"));
        }
        let name = job.record.name.clone();
        if slot.pending.replace(job).is_some() {
            s.coalesced.fetch_add(1, Ordering::Relaxed);
        }
        s.wake.notify_one();
        if s.busy.load(Ordering::Acquire) {
            return Err(FogmapError::save_conflict(format!(
                "save of '{name}' queued behind in-flight write"
            )));
        }
        Ok(())
    }

    /// Write `job` on the calling thread, after any in-flight write. Errors are returned.
    ///
    /// A pending background request is dropped since `job` supersedes it.
    pub fn save_now(&self, job: PersistJob) -> FogmapResult<()> {
        let s = &self.shared;
        let mut slot = s.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.pending.take().is_some() {
            slot.due = None;
            s.coalesced.fetch_add(1, Ordering::Relaxed);
        }
        while !s.try_acquire() {
            slot = s.idle.wait(slot).unwrap_or_else(|e| e.into_inner());
        }
        drop(slot);

        let result = write_job(s.repo.as_ref(), &job);
        s.record_result(&result);
        let slot = s.slot.lock().unwrap_or_else(|e| e.into_inner());
        s.release(&slot);
        result
    }

    /// Block until nothing is pending or in flight.
    pub fn flush(&self) {
        let s = &self.shared;
        let mut slot = s.slot.lock().unwrap_or_else(|e| e.into_inner());
        while slot.pending.is_some() || s.busy.load(Ordering::Acquire) {
            slot = s.idle.wait(slot).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Return `true` while a write is running.
    pub fn busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// Current counters.
    pub fn stats(&self) -> PersistStats {
        let s = &self.shared;
        PersistStats {
            requested: s.requested.load(Ordering::Relaxed),
            written: s.written.load(Ordering::Relaxed),
            coalesced: s.coalesced.load(Ordering::Relaxed),
            failed: s.failed.load(Ordering::Relaxed),
        }
    }

    /// Cancel the pending request, let the in-flight write finish and stop the worker.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        {
            let mut slot = self.shared.slot.lock().unwrap_or_else(|e| e.into_inner());
            slot.shutdown = true;
            if let Some(job) = slot.pending.take() {
                tracing::info!(map = %job.record.name, "pending save cancelled");
            }
            slot.due = None;
            self.shared.wake.notify_all();
            self.shared.idle.notify_all();
        }
        if worker.join().is_err() {
            tracing::warn!("persistence worker panicked");
        }
    }
}

impl Drop for PersistPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: Arc<Shared>) {
    let mut slot = shared.slot.lock().unwrap_or_else(|e| e.into_inner());
    loop {
        if slot.shutdown {
            break;
        }
        if slot.pending.is_none() {
            slot = shared.wake.wait(slot).unwrap_or_else(|e| e.into_inner());
            continue;
        }
        if let Some(due) = slot.due {
            let now = Instant::now();
            if due > now {
                slot = shared
                    .wake
                    .wait_timeout(slot, due - now)
                    .unwrap_or_else(|e| e.into_inner())
                    .0;
                continue;
            }
        }
        if !shared.try_acquire() {
            // An explicit save holds the writer.
            slot = shared.idle.wait(slot).unwrap_or_else(|e| e.into_inner());
            continue;
        }
        let Some(job) = slot.pending.take() else {
            shared.release(&slot);
            continue;
        };
        slot.due = None;
        drop(slot);

        let result = write_job(shared.repo.as_ref(), &job);
        if let Err(e) = &result {
            tracing::warn!(map = %job.record.name, error = %e, "background save failed");
        }
        shared.record_result(&result);

        slot = shared.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.pending.is_some() {
            slot.due = Some(Instant::now() + shared.delay);
        }
        shared.release(&slot);
    }
    tracing::debug!("persistence worker stopped");
}

/// Write the mask PNG, then upsert the record.
#[tracing::instrument(skip_all, fields(map = %job.record.name))]
pub fn write_job(repo: &dyn ItemRepository, job: &PersistJob) -> FogmapResult<()> {
    let mask = job.mask_path();
    if let Some(parent) = mask.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let png = job.fog.encode_mask_png()?;
    let tmp = mask.with_extension("png.tmp");
    std::fs::write(&tmp, &png).with_context(|| format!("write {}", tmp.display()))?;
    std::fs::rename(&tmp, &mask).with_context(|| format!("replace {}", mask.display()))?;

    let mut records = repo.load_items()?;
    upsert_record(&mut records, job.record.clone());
    repo.save_items(&records)?;
    tracing::info!(mask = %mask.display(), bytes = png.len(), "map saved");
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/persist/pipeline.rs"]
mod tests;
