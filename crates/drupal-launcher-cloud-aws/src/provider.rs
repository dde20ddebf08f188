//! AWS provider implementation

use aws_config::{BehaviorVersion, Region};
use drupal_launcher_cloud::CloudProvider;

/// CloudFormation, S3 and EC2 clients bound to one region
///
/// Every client is built from the same explicitly configured region; nothing
/// reads or mutates a process-wide default.
#[derive(Clone, Debug)]
pub struct AwsProvider {
    region: String,
    pub(crate) cloudformation: aws_sdk_cloudformation::Client,
    pub(crate) s3: aws_sdk_s3::Client,
    pub(crate) ec2: aws_sdk_ec2::Client,
}

impl AwsProvider {
    /// Load credentials from the default provider chain for `region`.
    pub async fn new(region: impl Into<String>) -> Self {
        let region = region.into();
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;
        tracing::debug!("AWS clients configured for region {}", region);

        Self {
            cloudformation: aws_sdk_cloudformation::Client::new(&sdk_config),
            s3: aws_sdk_s3::Client::new(&sdk_config),
            ec2: aws_sdk_ec2::Client::new(&sdk_config),
            region,
        }
    }
}

impl CloudProvider for AwsProvider {
    fn name(&self) -> &str {
        "aws"
    }

    fn region(&self) -> &str {
        &self.region
    }
}
