//! Candidate connection targets advertised by the endpoint

use parking_lot::RwLock;
use qdesk_core::{Result, SqlEndpoint, TargetRef};
use std::collections::BTreeMap;

/// Per resource type listing of targets a connection can be opened against
///
/// Each fetch replaces the entry for its resource type and leaves the other
/// types alone.
#[derive(Default)]
pub struct TargetCatalog {
    targets: RwLock<BTreeMap<String, Vec<TargetRef>>>,
}

impl TargetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch targets of `resource_type` (e.g. "servers") and merge them in
    ///
    /// On failure the catalog is unchanged.
    #[tracing::instrument(skip(self, endpoint))]
    pub async fn fetch(
        &self,
        endpoint: &dyn SqlEndpoint,
        resource_type: &str,
    ) -> Result<Vec<TargetRef>> {
        let targets = endpoint.list_targets(resource_type).await.map_err(|e| {
            tracing::warn!(error = %e, "failed to list targets");
            e
        })?;

        tracing::debug!(count = targets.len(), "fetched targets");
        self.targets
            .write()
            .insert(resource_type.to_string(), targets.clone());
        Ok(targets)
    }

    /// Targets last fetched for `resource_type`
    pub fn get(&self, resource_type: &str) -> Option<Vec<TargetRef>> {
        self.targets.read().get(resource_type).cloned()
    }

    pub fn all(&self) -> BTreeMap<String, Vec<TargetRef>> {
        self.targets.read().clone()
    }

    pub fn clear(&self) {
        self.targets.write().clear();
    }
}
