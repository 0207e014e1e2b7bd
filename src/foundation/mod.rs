/// Shared ids, colors and geometry re-exports.
pub mod core;
/// Error taxonomy.
pub mod error;
pub(crate) mod math;
