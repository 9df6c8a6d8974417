pub mod adapter;
pub mod config;
pub mod registry;
pub mod rules;
pub mod topology;

pub use adapter::{CrmAdapter, Sink, Source};
pub use config::Config;
pub use registry::{AdapterFactory, CrmRegistry};
pub use rules::RulesEngine;
pub use topology::{Topology, TopologyEntry};
