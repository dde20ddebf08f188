//! Resource lookup by scanning provider listings

use crate::error::Result;
use crate::provider::{BucketService, StackService};
use crate::stack::StackHandle;
use regex::Regex;
use std::collections::BTreeMap;

/// The artifact bucket and whether this run created it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedBucket {
    pub name: String,
    pub created: bool,
}

/// Read-only queries over existing buckets and stacks
pub struct ResourceLocator<'a> {
    buckets: &'a dyn BucketService,
    stacks: &'a dyn StackService,
}

impl<'a> ResourceLocator<'a> {
    pub fn new(buckets: &'a dyn BucketService, stacks: &'a dyn StackService) -> Self {
        Self { buckets, stacks }
    }

    /// First bucket carrying the tag key `tag`, whatever its value.
    pub async fn locate_bucket(&self, tag: &str) -> Result<Option<String>> {
        for bucket in self.buckets.list_buckets().await? {
            match self.buckets.bucket_tags(&bucket).await {
                Ok(tags) if tags.contains_key(tag) => {
                    tracing::debug!("Bucket {} carries tag {}", bucket, tag);
                    return Ok(Some(bucket));
                }
                Ok(_) => {}
                Err(e) if e.is_transient() => return Err(e),
                Err(e) => {
                    // 別リージョンや権限のないバケットはスキップ
                    tracing::debug!("Skipping bucket {}: {}", bucket, e);
                }
            }
        }
        Ok(None)
    }

    /// Locate the tagged bucket, creating `prefix<uuid>` when none exists.
    pub async fn ensure_bucket(&self, tag: &str, prefix: &str) -> Result<LocatedBucket> {
        if let Some(name) = self.locate_bucket(tag).await? {
            return Ok(LocatedBucket {
                name,
                created: false,
            });
        }

        let name = format!("{}{}", prefix, uuid::Uuid::new_v4());
        tracing::info!("No tagged bucket found, creating {}", name);
        self.buckets.create_bucket(&name).await?;

        let tags = BTreeMap::from([(tag.to_string(), "true".to_string())]);
        self.buckets.tag_bucket(&name, &tags).await?;

        Ok(LocatedBucket {
            name,
            created: true,
        })
    }

    pub async fn find_stack(&self, name: &str) -> Result<Option<StackHandle>> {
        self.stacks.get_stack(name).await
    }

    /// First live stack whose name matches `pattern`.
    pub async fn find_stack_matching(&self, pattern: &Regex) -> Result<Option<StackHandle>> {
        Ok(self
            .stacks
            .list_stacks()
            .await?
            .into_iter()
            .find(|stack| pattern.is_match(&stack.name)))
    }
}
