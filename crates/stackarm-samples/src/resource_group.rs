use stackarm_domain::Tags;
use stackarm_driver::ResourceManager;
use tracing::info;

use crate::cleanup::CleanupGuard;
use crate::error::{SampleError, StepExt};
use crate::naming::random_resource_name;
use crate::report::{SampleReport, Step};

/// Create, tag, list and delete resource groups.
#[derive(Debug, Clone)]
pub struct ResourceGroupSample {
    pub location:  String,
    pub primary:   String,
    pub secondary: String,
    pub tag_name:  String,
    pub tag_value: String,
}

impl ResourceGroupSample {
    pub const NAME: &'static str = "resource-group";

    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location:  location.into(),
            primary:   random_resource_name("rgRSMA", 24),
            secondary: random_resource_name("rgRSMA", 24),
            tag_name:  random_resource_name("rgRSTN", 24),
            tag_value: random_resource_name("rgRSTV", 24),
        }
    }

    pub async fn run(&self, manager: &dyn ResourceManager) -> Result<SampleReport, SampleError> {
        let mut report = SampleReport::new(Self::NAME);
        let mut guard = CleanupGuard::new(&self.primary);

        let result = self.steps(manager, &mut guard, &mut report).await;
        let cleanup = guard.release(manager).await;
        report.cleanup = Some(cleanup.clone());
        result.map(|()| report).map_err(|e| e.with_cleanup(cleanup))
    }

    async fn steps(
        &self,
        manager: &dyn ResourceManager,
        guard: &mut CleanupGuard,
        report: &mut SampleReport,
    ) -> Result<(), SampleError> {
        info!(name = %self.primary, "Creating a resource group");
        let group = manager
            .create_resource_group(&self.primary, &self.location)
            .await
            .step("create resource group")?;
        guard.mark_created();
        report.steps.push(Step::ResourceGroupCreated {
            name:     group.name.clone(),
            location: group.location.clone(),
        });

        info!(name = %group.name, "Updating the resource group");
        let tags = Tags::from([(self.tag_name.clone(), self.tag_value.clone())]);
        manager
            .update_resource_group_tags(&group, &tags)
            .await
            .step("update resource group")?;
        report.steps.push(Step::ResourceGroupTagged {
            name:  group.name.clone(),
            tag:   self.tag_name.clone(),
            value: self.tag_value.clone(),
        });

        info!(name = %self.secondary, "Creating another resource group");
        let second = manager
            .create_resource_group(&self.secondary, &self.location)
            .await
            .step("create second resource group")?;
        report.steps.push(Step::ResourceGroupCreated {
            name:     second.name.clone(),
            location: second.location.clone(),
        });

        info!("Listing all resource groups");
        let groups = manager.list_resource_groups().await.step("list resource groups")?;
        for g in &groups {
            info!(name = %g.name, "Resource group");
        }
        report.steps.push(Step::ResourceGroupsListed {
            names: groups.into_iter().map(|g| g.name).collect(),
        });

        info!(name = %second.name, "Deleting resource group");
        manager
            .begin_delete_resource_group(&second.name)
            .await
            .step("delete second resource group")?;
        report.steps.push(Step::ResourceGroupDeleteStarted { name: second.name });

        Ok(())
    }
}
