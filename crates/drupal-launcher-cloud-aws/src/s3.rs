//! S3-backed bucket service

use crate::error::AwsError;
use crate::provider::AwsProvider;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, ObjectCannedAcl, Tag, Tagging,
};
use drupal_launcher_cloud::{BucketService, CloudProvider, ObjectAcl, Result};
use std::collections::BTreeMap;

/// us-east-1 rejects an explicit location constraint.
fn location_constraint(region: &str) -> Option<BucketLocationConstraint> {
    (region != "us-east-1").then(|| BucketLocationConstraint::from(region))
}

fn canned_acl(acl: ObjectAcl) -> ObjectCannedAcl {
    match acl {
        ObjectAcl::Private => ObjectCannedAcl::Private,
        ObjectAcl::PublicRead => ObjectCannedAcl::PublicRead,
    }
}

#[async_trait]
impl BucketService for AwsProvider {
    async fn list_buckets(&self) -> Result<Vec<String>> {
        let output = self
            .s3
            .list_buckets()
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("ListBuckets", e))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }

    async fn bucket_tags(&self, bucket: &str) -> Result<BTreeMap<String, String>> {
        let result = self
            .s3
            .get_bucket_tagging()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("GetBucketTagging", e));

        match result {
            Ok(output) => Ok(output
                .tag_set()
                .iter()
                .map(|t| (t.key().to_string(), t.value().to_string()))
                .collect()),
            Err(e) if e.code() == Some("NoSuchTagSet") => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let configuration = location_constraint(self.region()).map(|constraint| {
            CreateBucketConfiguration::builder()
                .location_constraint(constraint)
                .build()
        });

        self.s3
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(configuration)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("CreateBucket", e))?;
        Ok(())
    }

    async fn tag_bucket(&self, bucket: &str, tags: &BTreeMap<String, String>) -> Result<()> {
        let tag_set = tags
            .iter()
            .map(|(key, value)| {
                Tag::builder()
                    .key(key)
                    .value(value)
                    .build()
                    .map_err(|e| AwsError::InvalidRequest(e.to_string()))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let tagging = Tagging::builder()
            .set_tag_set(Some(tag_set))
            .build()
            .map_err(|e| AwsError::InvalidRequest(e.to_string()))?;

        self.s3
            .put_bucket_tagging()
            .bucket(bucket)
            .tagging(tagging)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("PutBucketTagging", e))?;
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        acl: ObjectAcl,
    ) -> Result<()> {
        self.s3
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .acl(canned_acl(acl))
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("PutObject", e))?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut continuation: Option<String> = None;
        loop {
            let output = self
                .s3
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| AwsError::from_sdk("ListObjectsV2", e))?;

            for key in output.contents().iter().filter_map(|o| o.key()) {
                tracing::debug!("Deleting s3://{}/{}", bucket, key);
                self.s3
                    .delete_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| AwsError::from_sdk("DeleteObject", e))?;
            }

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string())
                }
                _ => break,
            }
        }

        self.s3
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("DeleteBucket", e))?;
        Ok(())
    }
}
