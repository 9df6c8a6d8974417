extern crate core;

pub mod crm;
pub mod destinations;
pub mod engine;
pub mod file;
pub mod manager;
pub mod orchestrator;
pub mod poller;
pub mod postgres;
pub mod retry;
pub mod sqlite;

pub use destinations::{DestinationOverride, DestinationStore};
pub use engine::Engine;
pub use manager::SyncManager;
pub use orchestrator::SyncOrchestrator;
pub use poller::{Poller, PollTarget};
pub use retry::RetryManager;
