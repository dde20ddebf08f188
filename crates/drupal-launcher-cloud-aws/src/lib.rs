//! AWS provider for the Drupal launcher
//!
//! Implements the `drupal-launcher-cloud` service traits on top of the AWS
//! SDK: stacks on CloudFormation, artifacts on S3, key pairs and instance
//! lookups on EC2.
//!
//! # Requirements
//!
//! - Credentials resolvable by the default AWS provider chain
//!   (environment, shared config/credentials files, instance profile)
//!
//! # Example
//!
//! ```ignore
//! use drupal_launcher_cloud_aws::AwsProvider;
//! use drupal_launcher_cloud::StackService;
//!
//! let provider = AwsProvider::new("us-east-1").await;
//! let stack = provider.get_stack("puppet-master").await?;
//! ```

mod cloudformation;
mod ec2;
pub mod error;
pub mod provider;
mod s3;

pub use error::{AwsError, Result};
pub use provider::AwsProvider;
