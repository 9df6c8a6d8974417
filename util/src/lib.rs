mod context;
mod persist;

pub use context::Context;
pub use persist::write_json_atomically;
