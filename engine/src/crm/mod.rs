pub mod hubspot;
pub mod mock_remote;
pub mod salesforce;

use rs_core::{CrmAdapter, CrmRegistry};
use error::SyncError;
use hubspot::HubspotCrm;
use salesforce::SalesforceCrm;
use std::sync::Arc;

/// Registers the mock adapters supplied with this crate into `registry`.
/// Called once at process start, before any topology entry is built
/// (§4.5, §9 "dynamic destination registry").
pub fn register_builtin_adapters(registry: &CrmRegistry) {
    registry.register(
        "salesforce",
        vec![("api_token", "OAuth bearer token"), ("instance_url", "Salesforce instance base URL")],
        Arc::new(|config| -> Result<Box<dyn CrmAdapter>, SyncError> { Ok(Box::new(SalesforceCrm::new(config)?)) }),
    );
    registry.register(
        "hubspot",
        vec![("api_key", "HubSpot private app token")],
        Arc::new(|config| -> Result<Box<dyn CrmAdapter>, SyncError> { Ok(Box::new(HubspotCrm::new(config)?)) }),
    );
}
