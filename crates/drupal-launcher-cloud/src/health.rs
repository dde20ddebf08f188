//! Live health check of the deployed web tier

use crate::error::{CloudError, Result};
use crate::locator::ResourceLocator;
use crate::provider::{CloudProvider, InstanceService, StackService};
use regex::Regex;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one HTTP probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthReport {
    Up { url: String },
    Down { url: String, status: u16 },
}

impl HealthReport {
    pub fn is_up(&self) -> bool {
        matches!(self, HealthReport::Up { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            HealthReport::Up { url } | HealthReport::Down { url, .. } => url,
        }
    }
}

/// Resolves the web server from stack resources and probes it over HTTP
pub struct HealthProber<'a> {
    locator: ResourceLocator<'a>,
    stacks: &'a dyn StackService,
    instances: &'a dyn InstanceService,
    client: reqwest::Client,
    stack_pattern: Regex,
    body_pattern: Regex,
    web_server_resource: String,
}

impl<'a> HealthProber<'a> {
    pub fn new<P: CloudProvider>(
        provider: &'a P,
        stack_pattern: &str,
        web_server_resource: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CloudError::HealthCheck(e.to_string()))?;

        Ok(Self {
            locator: ResourceLocator::new(provider, provider),
            stacks: provider,
            instances: provider,
            client,
            stack_pattern: Regex::new(stack_pattern)?,
            body_pattern: Regex::new(r"<body.*?>")?,
            web_server_resource: web_server_resource.into(),
        })
    }

    /// Public host name of the web server instance.
    pub async fn locate_host(&self) -> Result<String> {
        tracing::info!("Looking for a Drupal stack");
        let stack = self
            .locator
            .find_stack_matching(&self.stack_pattern)
            .await?
            .ok_or_else(|| {
                CloudError::StackNotFound("The Drupal stack could not be found".to_string())
            })?;
        tracing::info!("Found a Drupal stack named '{}'", stack.name);

        tracing::info!("Looking for a web server in the stack");
        let instance_id = self
            .stacks
            .list_resources(&stack.name)
            .await?
            .into_iter()
            .find(|r| r.logical_resource_id == self.web_server_resource)
            .and_then(|r| r.physical_resource_id)
            .ok_or_else(|| {
                CloudError::ResourceNotFound(
                    "No web server could be found in the stack".to_string(),
                )
            })?;
        tracing::info!("Found a web server with id '{}'", instance_id);

        self.instances
            .public_dns_name(&instance_id)
            .await?
            .filter(|host| !host.is_empty())
            .ok_or_else(|| {
                CloudError::HealthCheck(format!(
                    "Instance {} has no public DNS name",
                    instance_id
                ))
            })
    }

    /// Locate the web server and issue a single GET against it.
    pub async fn check(&self) -> Result<HealthReport> {
        let host = self.locate_host().await?;
        let url = format!("http://{}/", host);
        tracing::info!("Checking for a running Drupal instance at {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CloudError::HealthCheck(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| CloudError::HealthCheck(e.to_string()))?;

        if self.is_site_up(status, &body) {
            Ok(HealthReport::Up { url })
        } else {
            tracing::info!("Got response code: {}", status);
            Ok(HealthReport::Down { url, status })
        }
    }

    /// A page counts as up when it answers 200 with an HTML body tag.
    pub fn is_site_up(&self, status: u16, body: &str) -> bool {
        status == 200 && self.body_pattern.is_match(body)
    }
}
