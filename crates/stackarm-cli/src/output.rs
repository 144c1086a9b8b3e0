use stackarm_samples::{CleanupOutcome, SampleError, SampleReport, Step};

/// Render a sample report as human-readable text.
pub fn render_report(report: &SampleReport) -> String {
    let mut out = format!("Sample {}\n", report.sample);
    for step in &report.steps {
        out.push_str("  ");
        out.push_str(&render_step(step));
        out.push('\n');
    }
    if let Some(cleanup) = &report.cleanup {
        out.push_str(&format!("Cleanup: {}\n", render_cleanup(cleanup)));
    }
    out
}

fn render_step(step: &Step) -> String {
    match step {
        Step::ResourceGroupCreated { name, location } => {
            format!("+ resource group {} ({})", name, location)
        }
        Step::ResourceGroupTagged { name, tag, value } => {
            format!("~ resource group {} tag {}={}", name, tag, value)
        }
        Step::ResourceGroupsListed { names } => {
            format!("= {} resource group(s): {}", names.len(), names.join(", "))
        }
        Step::ResourceGroupDeleteStarted { name } => format!("- resource group {} (deleting)", name),
        Step::StorageAccountCreated { name, id, created } => match created {
            Some(t) => format!("+ storage account {} created {} [{}]", name, t, id),
            None => format!("+ storage account {} [{}]", name, id),
        },
        Step::StorageKeysListed { account, key_names } => {
            format!("= storage account {} keys: {}", account, key_names.join(", "))
        }
        Step::StorageKeyRegenerated { account, key_name } => {
            format!("~ storage account {} regenerated {}", account, key_name)
        }
        Step::StorageAccountsListed { resource_group, names } => {
            format!("= storage accounts in {}: {}", resource_group, names.join(", "))
        }
        Step::StorageAccountDeleted { name } => format!("- storage account {}", name),
        Step::VaultCreated { name, vault_uri } => format!("+ key vault {} at {}", name, vault_uri),
        Step::SecretSet { name } => format!("+ secret {}", name),
        Step::SecretRetrieved { name } => format!("= secret {}", name),
        Step::VaultDeleted { name } => format!("- key vault {}", name),
    }
}

/// The cleanup line shown alongside a failed sample, if cleanup ran.
pub fn render_failed_cleanup(err: &SampleError) -> Option<String> {
    err.cleanup.as_ref().map(|c| format!("Cleanup: {}", render_cleanup(c)))
}

fn render_cleanup(outcome: &CleanupOutcome) -> String {
    match outcome {
        CleanupOutcome::Skipped => "nothing created, no clean up necessary".to_string(),
        CleanupOutcome::Deleted => "resource group deletion started".to_string(),
        CleanupOutcome::NotFound => "resource group already gone".to_string(),
        CleanupOutcome::Failed(msg) => format!("failed ({})", msg),
    }
}
