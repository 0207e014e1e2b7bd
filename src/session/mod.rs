/// Session options.
pub mod config;
/// Open map state and snapshots.
pub mod document;
/// Session orchestration.
pub mod map_session;

pub use config::{EditorOpts, PersistOpts, SessionOpts, StreamOpts};
pub use document::{DocumentSnapshot, MapDocument};
pub use map_session::{Input, MapSession};
