//! Provider capability traits
//!
//! The core never talks to a concrete cloud. Each concern the launcher needs
//! from the provider is a trait; `CloudProvider` bundles them for the drivers.

use crate::error::Result;
use crate::stack::{StackEvent, StackHandle, StackRequest, StackResource};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// Infrastructure-as-code stack operations
#[async_trait]
pub trait StackService: Send + Sync {
    /// All live stacks.
    async fn list_stacks(&self) -> Result<Vec<StackHandle>>;

    /// Look up a stack by name. `None` when it does not exist.
    async fn get_stack(&self, name: &str) -> Result<Option<StackHandle>>;

    /// Template body the stack was last applied with.
    async fn get_template(&self, name: &str) -> Result<String>;

    /// Submit a create. Rejections surface as `ProvisioningRejected`.
    async fn create_stack(
        &self,
        request: &StackRequest,
        capabilities: &[Capability],
    ) -> Result<StackHandle>;

    /// Submit an update. Rejections surface as `ProvisioningRejected`.
    async fn update_stack(&self, request: &StackRequest) -> Result<StackHandle>;

    async fn delete_stack(&self, name: &str) -> Result<()>;

    /// Events for the stack, most recent first.
    async fn list_events(&self, name: &str) -> Result<Vec<StackEvent>>;

    async fn list_resources(&self, name: &str) -> Result<Vec<StackResource>>;
}

/// Object storage operations used for deployment artifacts
#[async_trait]
pub trait BucketService: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<String>>;

    /// Tag set of a bucket. Empty when the bucket carries no tags.
    async fn bucket_tags(&self, bucket: &str) -> Result<BTreeMap<String, String>>;

    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    async fn tag_bucket(&self, bucket: &str, tags: &BTreeMap<String, String>) -> Result<()>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        acl: ObjectAcl,
    ) -> Result<()>;

    /// Delete every object, then the bucket itself.
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;
}

/// Remote SSH key pair operations
#[async_trait]
pub trait KeyPairService: Send + Sync {
    async fn key_pair_exists(&self, name: &str) -> Result<bool>;

    /// Create a key pair and return its private key material.
    async fn create_key_pair(&self, name: &str) -> Result<String>;

    async fn delete_key_pair(&self, name: &str) -> Result<()>;
}

/// Compute instance lookups
#[async_trait]
pub trait InstanceService: Send + Sync {
    /// Public DNS name of a running instance, if it has one.
    async fn public_dns_name(&self, instance_id: &str) -> Result<Option<String>>;
}

/// Everything the launcher needs from one provider
pub trait CloudProvider: StackService + BucketService + KeyPairService + InstanceService {
    /// Returns the provider name (e.g., "aws")
    fn name(&self) -> &str;

    /// Region every client of this provider was built for
    fn region(&self) -> &str;
}

/// Acknowledgements a template may require before the service accepts it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Template may create identity and access resources.
    Iam,
    /// Same, for resources with custom names.
    NamedIam,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Iam => "CAPABILITY_IAM",
            Capability::NamedIam => "CAPABILITY_NAMED_IAM",
        }
    }
}

/// Access control applied to uploaded objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAcl {
    Private,
    PublicRead,
}

/// Retry configuration for provider operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_attempts: u32,

    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (0-based), capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(delay).min(self.max_delay)
    }
}
