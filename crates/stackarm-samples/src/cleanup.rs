use stackarm_driver::ResourceManager;
use tracing::{info, warn};

use crate::report::CleanupOutcome;

/// Tracks whether a sample's primary resource group exists and deletes it
/// on release.
///
/// `release` must be awaited on every path out of the sample body. It never
/// returns an error: a failed delete is logged and reported as
/// [`CleanupOutcome::Failed`].
#[derive(Debug)]
pub struct CleanupGuard {
    resource_group: String,
    created:        bool,
}

impl CleanupGuard {
    pub fn new(resource_group: impl Into<String>) -> Self {
        Self {
            resource_group: resource_group.into(),
            created:        false,
        }
    }

    /// Call once the group has been created.
    pub fn mark_created(&mut self) {
        self.created = true;
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub async fn release(self, manager: &dyn ResourceManager) -> CleanupOutcome {
        if !self.created {
            info!("Did not create any resources. No clean up is necessary");
            return CleanupOutcome::Skipped;
        }

        info!(resource_group = %self.resource_group, "Deleting resource group");
        match manager.begin_delete_resource_group(&self.resource_group).await {
            Ok(()) => CleanupOutcome::Deleted,
            Err(e) if e.is_not_found() => {
                info!(resource_group = %self.resource_group, "Resource group already gone");
                CleanupOutcome::NotFound
            }
            Err(e) => {
                warn!(resource_group = %self.resource_group, error = %e, "Clean up failed");
                CleanupOutcome::Failed(e.to_string())
            }
        }
    }
}
