//! EC2-backed key pair and instance lookups

use crate::error::AwsError;
use crate::provider::AwsProvider;
use async_trait::async_trait;
use aws_sdk_ec2::types::Filter;
use drupal_launcher_cloud::{InstanceService, KeyPairService, Result};

#[async_trait]
impl KeyPairService for AwsProvider {
    async fn key_pair_exists(&self, name: &str) -> Result<bool> {
        // key-names で直接指定すると未登録時にエラーになるため、フィルタで検索する
        let output = self
            .ec2
            .describe_key_pairs()
            .filters(Filter::builder().name("key-name").values(name).build())
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("DescribeKeyPairs", e))?;

        Ok(output
            .key_pairs()
            .iter()
            .any(|k| k.key_name() == Some(name)))
    }

    async fn create_key_pair(&self, name: &str) -> Result<String> {
        let output = self
            .ec2
            .create_key_pair()
            .key_name(name)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("CreateKeyPair", e))?;

        Ok(output
            .key_material()
            .map(str::to_string)
            .ok_or_else(|| AwsError::missing("CreateKeyPair", "key material"))?)
    }

    async fn delete_key_pair(&self, name: &str) -> Result<()> {
        self.ec2
            .delete_key_pair()
            .key_name(name)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("DeleteKeyPair", e))?;
        Ok(())
    }
}

#[async_trait]
impl InstanceService for AwsProvider {
    async fn public_dns_name(&self, instance_id: &str) -> Result<Option<String>> {
        let output = self
            .ec2
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("DescribeInstances", e))?;

        Ok(output
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .find_map(|i| i.public_dns_name())
            .filter(|dns| !dns.is_empty())
            .map(str::to_string))
    }
}
