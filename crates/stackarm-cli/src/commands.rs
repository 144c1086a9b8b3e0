use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use stackarm_config::{load_settings, Settings};
use stackarm_domain::EnvironmentDescriptor;
use stackarm_driver::{
    bootstrap_with_client, ArmResourceManager, EnvironmentResolver, LocalResourceManager,
    ResourceManager, Session, VaultSecretClientFactory,
};
use stackarm_samples::{
    KeyVaultSecretSample, ResourceGroupSample, SampleError, SampleReport, StorageAccountSample,
};
use tracing::info;

use crate::cli::OutputFormat;
use crate::output;

/// Location, tenant and object id used when running with `--local`.
const LOCAL_PLACEHOLDER: &str = "local";

#[derive(Debug)]
pub struct Options {
    pub config:  PathBuf,
    pub timeout: Duration,
    pub local:   bool,
    pub output:  OutputFormat,
}

// ── Environment ───────────────────────────────────────────────────────────────

pub async fn environment(opts: &Options) -> Result<()> {
    if opts.local {
        anyhow::bail!("environment needs a live endpoint; drop --local");
    }
    let settings = settings(opts)?;
    let descriptor = resolve(&settings, opts.timeout).await?;
    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    Ok(())
}

// ── Samples ───────────────────────────────────────────────────────────────────

pub async fn resource_group(opts: &Options) -> Result<()> {
    if opts.local {
        let manager = LocalResourceManager::new();
        let sample = ResourceGroupSample::new(LOCAL_PLACEHOLDER);
        announce(&manager, ResourceGroupSample::NAME);
        return finish(sample.run(&manager).await, opts.output);
    }

    let settings = settings(opts)?;
    let session = connect(&settings, opts.timeout).await?;
    let manager = ArmResourceManager::new(session);
    let sample = ResourceGroupSample::new(&settings.location);
    announce(&manager, ResourceGroupSample::NAME);
    finish(sample.run(&manager).await, opts.output)
}

pub async fn storage_account(opts: &Options) -> Result<()> {
    if opts.local {
        let manager = LocalResourceManager::new();
        let sample = StorageAccountSample::new(LOCAL_PLACEHOLDER);
        announce(&manager, StorageAccountSample::NAME);
        return finish(sample.run(&manager).await, opts.output);
    }

    let settings = settings(opts)?;
    let session = connect(&settings, opts.timeout).await?;
    let manager = ArmResourceManager::new(session);
    let sample = StorageAccountSample::new(&settings.location);
    announce(&manager, StorageAccountSample::NAME);
    finish(sample.run(&manager).await, opts.output)
}

pub async fn keyvault_secret(opts: &Options) -> Result<()> {
    if opts.local {
        let manager = LocalResourceManager::new();
        let sample =
            KeyVaultSecretSample::new(LOCAL_PLACEHOLDER, LOCAL_PLACEHOLDER, LOCAL_PLACEHOLDER);
        announce(&manager, KeyVaultSecretSample::NAME);
        return finish(sample.run(&manager, &manager).await, opts.output);
    }

    let settings = settings(opts)?;
    let object_id = settings.require_client_object_id()?.to_string();
    let session = connect(&settings, opts.timeout).await?;
    let manager = ArmResourceManager::new(session.clone());
    let secrets = VaultSecretClientFactory::new(session.clone());
    let sample = KeyVaultSecretSample::new(&settings.location, session.tenant_id(), object_id);
    announce(&manager, KeyVaultSecretSample::NAME);
    finish(sample.run(&manager, &secrets).await, opts.output)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn settings(opts: &Options) -> Result<Settings> {
    load_settings(&opts.config)
        .with_context(|| format!("Failed to load settings from {}", opts.config.display()))
}

async fn resolve(settings: &Settings, timeout: Duration) -> Result<EnvironmentDescriptor> {
    let resolver = EnvironmentResolver::with_timeout(timeout)?;
    resolver
        .resolve(&settings.resource_manager_url)
        .await
        .with_context(|| format!("Failed to resolve environment from {}", settings.resource_manager_url))
}

async fn connect(settings: &Settings, timeout: Duration) -> Result<Session> {
    let descriptor = resolve(settings, timeout).await?;
    info!(
        arm = %descriptor.resource_manager_endpoint_url,
        authority = %descriptor.active_directory_endpoint_url,
        "Environment resolved"
    );

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let session = bootstrap_with_client(&descriptor, &settings.identity, &settings.subscription_id, client)
        .context("Failed to authenticate")?;

    println!("Selected subscription: {}", session.subscription_id());
    Ok(session)
}

fn announce(manager: &dyn ResourceManager, sample: &str) {
    info!(manager = manager.name(), sample, "Running sample");
}

fn finish(result: Result<SampleReport, SampleError>, format: OutputFormat) -> Result<()> {
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if let Some(line) = output::render_failed_cleanup(&e) {
                eprintln!("{}", line);
            }
            return Err(anyhow::Error::new(e).context("Sample failed"));
        }
    };
    match format {
        OutputFormat::Text => print!("{}", output::render_report(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
