/// Background save worker.
pub mod pipeline;
/// Stored map record.
pub mod record;
/// Record storage backends.
pub mod repository;

pub use pipeline::{PersistJob, PersistPipeline, PersistStats};
pub use record::{MapRecord, mask_rel_path};
pub use repository::{ItemRepository, JsonFileRepository, MemoryRepository, upsert_record};
