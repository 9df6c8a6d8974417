mod operation;
mod record;
mod status;

pub use operation::Operation;
pub use record::{Record, SeenIds};
pub use status::RecordStatus;

/// The schema-free payload carried by a [`Record`]. Records arrive as
/// loosely-typed JSON from any source, so we reuse `serde_json::Value`
/// rather than inventing a parallel value representation.
pub type Value = serde_json::Value;
