//! Orchestration and teardown of the two-tier stack
//!
//! `create` brings up the Puppet master first and only then the Drupal client
//! stack, since the client is parameterized by the master's outputs.
//! `destroy` walks the same resources in reverse.

use crate::action::ReconcileOutcome;
use crate::artifact::{ArtifactPublisher, package_archive};
use crate::cancel::CancellationToken;
use crate::error::{CloudError, Result};
use crate::keypair::{KeyPairManager, KeyPairRemoval, KeyPairState};
use crate::locator::{LocatedBucket, ResourceLocator};
use crate::poller::{EventObserver, PollOptions, ProgressPoller};
use crate::provider::CloudProvider;
use crate::reconcile::StackReconciler;
use crate::stack::{StackHandle, StackRequest, StackStatus};
use drupal_launcher_config::{CleanupPolicy, LauncherConfig, StackConfig};
use std::collections::BTreeMap;
use std::path::Path;

/// Master stack outputs the client stack is parameterized with.
pub const MASTER_SECURITY_GROUP_OUTPUT: &str = "PuppetClientSecurityGroup";
pub const MASTER_DNS_OUTPUT: &str = "PuppetMasterDNSName";

/// Progress hooks for a launch or teardown run.
///
/// Every method defaults to doing nothing.
pub trait LaunchObserver: EventObserver {
    /// A coarse step is starting.
    fn on_step(&self, _message: &str) {}

    /// A file is being added to the configuration archive.
    fn on_file(&self, _path: &Path) {}

    /// Polling of `name` is about to begin.
    fn on_stack_started(&self, _name: &str) {}

    /// `handle` reached a terminal status.
    fn on_stack_finished(&self, _handle: &StackHandle) {}
}

impl LaunchObserver for crate::poller::SilentObserver {}

/// Everything `create` did
#[derive(Debug, Clone)]
pub struct LaunchReport {
    pub bucket: LocatedBucket,
    pub key_pair: KeyPairState,
    pub master: ReconcileOutcome,
    pub client: ReconcileOutcome,
}

impl LaunchReport {
    /// Outputs of the Drupal client stack.
    pub fn outputs(&self) -> &BTreeMap<String, String> {
        &self.client.handle.outputs
    }
}

/// Everything `destroy` did. `None` means the resource was not there.
#[derive(Debug, Clone)]
pub struct TeardownReport {
    pub client: Option<StackHandle>,
    pub master: Option<StackHandle>,
    pub bucket: Option<String>,
    pub key_pair: KeyPairRemoval,
}

/// Drives whole-deployment operations against one provider
pub struct Launcher<'a, P: CloudProvider> {
    provider: &'a P,
    config: &'a LauncherConfig,
    options: PollOptions,
    cancel: CancellationToken,
}

impl<'a, P: CloudProvider> Launcher<'a, P> {
    pub fn new(provider: &'a P, config: &'a LauncherConfig) -> Self {
        Self {
            provider,
            config,
            options: PollOptions::from(&config.poll),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_poll_options(mut self, options: PollOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn reconciler(&self) -> StackReconciler<'a> {
        let poller = ProgressPoller::new(self.provider, self.options.clone())
            .with_cancellation(self.cancel.clone());
        StackReconciler::new(self.provider, poller)
    }

    fn locator(&self) -> ResourceLocator<'a> {
        ResourceLocator::new(self.provider, self.provider)
    }

    fn key_pair(&self) -> Result<KeyPairManager<'a>> {
        Ok(KeyPairManager::new(
            self.provider,
            self.config.key_pair_name.clone(),
            self.config.key_pair_path()?,
        ))
    }

    /// Provision or converge the master and client stacks.
    ///
    /// `resolve_email` is called once, after the master stack has settled
    /// successfully, so a prompt never appears before the long first phase.
    pub async fn create<E>(
        &self,
        resolve_email: E,
        observer: &dyn LaunchObserver,
    ) -> Result<LaunchReport>
    where
        E: FnOnce() -> Result<String>,
    {
        observer.on_step("Checking to see if the bucket already exists");
        let bucket = self
            .locator()
            .ensure_bucket(&self.config.bucket_tag, &self.config.bucket_prefix)
            .await?;
        tracing::info!(
            "Using bucket {} ({})",
            bucket.name,
            if bucket.created { "created" } else { "existing" }
        );

        match self.provision(&bucket, resolve_email, observer).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.cleanup_after_failure(&bucket).await;
                Err(e)
            }
        }
    }

    async fn provision<E>(
        &self,
        bucket: &LocatedBucket,
        resolve_email: E,
        observer: &dyn LaunchObserver,
    ) -> Result<LaunchReport>
    where
        E: FnOnce() -> Result<String>,
    {
        observer.on_step("Generating archive of Puppet config");
        let count = package_archive(
            &self.config.archive_source_dir(),
            &self.config.archive_path(),
            |path| observer.on_file(path),
        )?;
        tracing::debug!("Archive holds {} files", count);

        observer.on_step("Uploading Puppet config files to the bucket");
        ArtifactPublisher::new(self.provider)
            .publish(&bucket.name, &self.config.artifact_paths())
            .await?;

        let key_pair = self.key_pair()?.ensure().await?;

        let reconciler = self.reconciler();

        let master_request = self
            .stack_request(&self.config.master_stack)
            .await?
            .with_parameter("KeyName", &self.config.key_pair_name)
            .with_parameter("BucketName", &bucket.name);
        observer.on_step("Creating the Puppet Master stack");
        let master = self
            .reconcile_stack(&reconciler, &master_request, observer)
            .await?;
        master.handle.ensure_success()?;

        let security_group = master
            .handle
            .require_output(MASTER_SECURITY_GROUP_OUTPUT)?
            .to_string();
        let master_dns = master.handle.require_output(MASTER_DNS_OUTPUT)?.to_string();
        let email = resolve_email()?.trim().to_string();

        let client_request = self
            .stack_request(&self.config.client_stack)
            .await?
            .with_parameter("KeyName", &self.config.key_pair_name)
            .with_parameter("BucketName", &bucket.name)
            .with_parameter(MASTER_SECURITY_GROUP_OUTPUT, security_group)
            .with_parameter(MASTER_DNS_OUTPUT, master_dns)
            .with_parameter("OperatorEmail", email);
        observer.on_step("Creating the Drupal stack");
        let client = self
            .reconcile_stack(&reconciler, &client_request, observer)
            .await?;
        client.handle.ensure_success()?;

        Ok(LaunchReport {
            bucket: bucket.clone(),
            key_pair,
            master,
            client,
        })
    }

    async fn stack_request(&self, stack: &StackConfig) -> Result<StackRequest> {
        let path = self.config.template_path(stack);
        let template = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    CloudError::ResourceNotFound(format!("template {}", path.display()))
                }
                _ => CloudError::Io(e),
            })?;
        Ok(StackRequest::new(stack.name.clone(), template))
    }

    async fn reconcile_stack(
        &self,
        reconciler: &StackReconciler<'a>,
        request: &StackRequest,
        observer: &dyn LaunchObserver,
    ) -> Result<ReconcileOutcome> {
        observer.on_stack_started(&request.name);
        let outcome = reconciler.reconcile(request, observer).await?;
        tracing::info!(
            "Stack {} finished with status {} ({})",
            request.name,
            outcome.handle.status,
            outcome.action
        );
        observer.on_stack_finished(&outcome.handle);
        Ok(outcome)
    }

    async fn cleanup_after_failure(&self, bucket: &LocatedBucket) {
        if self.config.cleanup != CleanupPolicy::RemoveCreatedBucket || !bucket.created {
            return;
        }
        tracing::info!("Removing bucket {} created by this run", bucket.name);
        if let Err(e) = self.provider.delete_bucket(&bucket.name).await {
            tracing::warn!("Failed to remove bucket {}: {}", bucket.name, e);
        }
    }

    /// Tear everything down in reverse dependency order.
    pub async fn destroy(&self, observer: &dyn LaunchObserver) -> Result<TeardownReport> {
        let reconciler = self.reconciler();

        let client = self
            .delete_stack(&reconciler, &self.config.client_stack.name, observer)
            .await?;
        let master = self
            .delete_stack(&reconciler, &self.config.master_stack.name, observer)
            .await?;

        observer.on_step("Looking for the bucket");
        let bucket = self.locator().locate_bucket(&self.config.bucket_tag).await?;
        match &bucket {
            Some(name) => {
                observer.on_step(&format!("Deleting bucket {}", name));
                self.provider.delete_bucket(name).await?;
            }
            None => tracing::info!("No tagged bucket found. Skipping."),
        }

        observer.on_step("Removing key pair");
        let key_pair = self.key_pair()?.remove().await?;

        Ok(TeardownReport {
            client,
            master,
            bucket,
            key_pair,
        })
    }

    async fn delete_stack(
        &self,
        reconciler: &StackReconciler<'a>,
        name: &str,
        observer: &dyn LaunchObserver,
    ) -> Result<Option<StackHandle>> {
        observer.on_step(&format!("Deleting stack {}", name));
        observer.on_stack_started(name);
        let deleted = reconciler.delete(name, observer).await?;
        match &deleted {
            Some(handle) => {
                observer.on_stack_finished(handle);
                if handle.status == StackStatus::DeleteFailed {
                    return Err(CloudError::StackFailed {
                        stack: name.to_string(),
                        status: handle.status.to_string(),
                    });
                }
            }
            None => tracing::info!("Stack {} not found. Skipping.", name),
        }
        Ok(deleted)
    }
}
