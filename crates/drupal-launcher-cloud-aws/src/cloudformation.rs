//! CloudFormation-backed stack service

use crate::error::AwsError;
use crate::provider::AwsProvider;
use async_trait::async_trait;
use aws_sdk_cloudformation::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudformation::types::{self as cfn, Parameter};
use chrono::{DateTime, Utc};
use drupal_launcher_cloud::{
    Capability, CloudError, Result, StackEvent, StackHandle, StackRequest, StackResource,
    StackService, StackStatus,
};

impl AwsProvider {
    async fn describe_stack(&self, name: &str) -> std::result::Result<Option<cfn::Stack>, AwsError> {
        let result = self
            .cloudformation
            .describe_stacks()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("DescribeStacks", e));

        match result {
            Ok(output) => Ok(output.stacks().first().cloned()),
            Err(e) if e.is_stack_missing() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl StackService for AwsProvider {
    async fn list_stacks(&self) -> Result<Vec<StackHandle>> {
        let mut stacks = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .cloudformation
                .describe_stacks()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| AwsError::from_sdk("DescribeStacks", e))?;

            stacks.extend(output.stacks().iter().map(to_handle));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(stacks)
    }

    async fn get_stack(&self, name: &str) -> Result<Option<StackHandle>> {
        Ok(self.describe_stack(name).await?.as_ref().map(to_handle))
    }

    async fn get_template(&self, name: &str) -> Result<String> {
        let output = self
            .cloudformation
            .get_template()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("GetTemplate", e))?;

        output
            .template_body()
            .map(str::to_string)
            .ok_or_else(|| AwsError::missing("GetTemplate", "template body").into())
    }

    async fn create_stack(
        &self,
        request: &StackRequest,
        capabilities: &[Capability],
    ) -> Result<StackHandle> {
        tracing::debug!("CreateStack {}", request.name);
        let output = self
            .cloudformation
            .create_stack()
            .stack_name(&request.name)
            .template_body(&request.template)
            .set_parameters(Some(parameters(request)))
            .set_capabilities(Some(
                capabilities
                    .iter()
                    .map(|c| cfn::Capability::from(c.as_str()))
                    .collect(),
            ))
            .send()
            .await
            .map_err(|e| rejected(&request.name, AwsError::from_sdk("CreateStack", e)))?;

        let mut handle = StackHandle::new(request.name.clone(), StackStatus::CreateInProgress);
        handle.stack_id = output.stack_id().map(str::to_string);
        handle.parameters = request.parameters.clone();
        Ok(handle)
    }

    async fn update_stack(&self, request: &StackRequest) -> Result<StackHandle> {
        tracing::debug!("UpdateStack {}", request.name);
        let result = self
            .cloudformation
            .update_stack()
            .stack_name(&request.name)
            .template_body(&request.template)
            .set_parameters(Some(parameters(request)))
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("UpdateStack", e));

        match result {
            Ok(output) => {
                let mut handle =
                    StackHandle::new(request.name.clone(), StackStatus::UpdateInProgress);
                handle.stack_id = output.stack_id().map(str::to_string);
                handle.parameters = request.parameters.clone();
                Ok(handle)
            }
            Err(e) if e.is_no_op_update() => {
                // 差分なし: 現在のスタックをそのまま返す
                tracing::info!("Stack {} is already up to date", request.name);
                self.get_stack(&request.name)
                    .await?
                    .ok_or_else(|| CloudError::StackNotFound(request.name.clone()))
            }
            Err(e) => Err(rejected(&request.name, e)),
        }
    }

    async fn delete_stack(&self, name: &str) -> Result<()> {
        tracing::debug!("DeleteStack {}", name);
        self.cloudformation
            .delete_stack()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("DeleteStack", e))?;
        Ok(())
    }

    async fn list_events(&self, name: &str) -> Result<Vec<StackEvent>> {
        let output = self
            .cloudformation
            .describe_stack_events()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("DescribeStackEvents", e))?;

        Ok(output.stack_events().iter().map(to_event).collect())
    }

    async fn list_resources(&self, name: &str) -> Result<Vec<StackResource>> {
        let output = self
            .cloudformation
            .describe_stack_resources()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk("DescribeStackResources", e))?;

        Ok(output
            .stack_resources()
            .iter()
            .map(|r| StackResource {
                logical_resource_id: r.logical_resource_id().unwrap_or_default().to_string(),
                physical_resource_id: r.physical_resource_id().map(str::to_string),
                resource_type: r.resource_type().unwrap_or_default().to_string(),
            })
            .collect())
    }
}

/// Request parameters in CloudFormation form.
fn parameters(request: &StackRequest) -> Vec<Parameter> {
    request
        .parameters
        .iter()
        .map(|(key, value)| {
            Parameter::builder()
                .parameter_key(key)
                .parameter_value(value)
                .build()
        })
        .collect()
}

/// Service-side refusals of a create or update become `ProvisioningRejected`.
fn rejected(stack: &str, err: AwsError) -> CloudError {
    match err {
        AwsError::Service { message, .. } => CloudError::ProvisioningRejected {
            stack: stack.to_string(),
            message,
        },
        other => other.into(),
    }
}

fn to_handle(stack: &cfn::Stack) -> StackHandle {
    let status = stack
        .stack_status()
        .map(|s| StackStatus::from(s.as_str()))
        .unwrap_or_else(|| StackStatus::Other("UNKNOWN".to_string()));

    let mut handle = StackHandle::new(stack.stack_name().unwrap_or_default(), status);
    handle.stack_id = stack.stack_id().map(str::to_string);
    handle.status_reason = stack.stack_status_reason().map(str::to_string);
    handle.outputs = stack
        .outputs()
        .iter()
        .filter_map(|o| Some((o.output_key()?.to_string(), o.output_value()?.to_string())))
        .collect();
    handle.parameters = stack
        .parameters()
        .iter()
        .filter_map(|p| {
            Some((
                p.parameter_key()?.to_string(),
                p.parameter_value()?.to_string(),
            ))
        })
        .collect();
    handle
}

fn to_event(event: &cfn::StackEvent) -> StackEvent {
    StackEvent {
        timestamp: event
            .timestamp()
            .and_then(to_chrono)
            .unwrap_or_default(),
        resource_type: event.resource_type().unwrap_or_default().to_string(),
        logical_resource_id: event.logical_resource_id().unwrap_or_default().to_string(),
        resource_status: event
            .resource_status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        status_reason: event.resource_status_reason().map(str::to_string),
    }
}

fn to_chrono(timestamp: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_conversion() {
        let ts = AwsDateTime::from_secs(1_700_000_000);
        let converted = to_chrono(&ts).unwrap();
        assert_eq!(converted.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_parameters_are_sorted_by_key() {
        let request = StackRequest::new("drupal", "{}")
            .with_parameter("KeyName", "drupal-launcher")
            .with_parameter("BucketName", "drupal-launcher-bucket");

        let keys: Vec<_> = parameters(&request)
            .iter()
            .map(|p| p.parameter_key().unwrap_or_default().to_string())
            .collect();
        assert_eq!(keys, vec!["BucketName", "KeyName"]);
    }

    #[test]
    fn test_rejection_keeps_service_message() {
        let err = rejected(
            "drupal",
            AwsError::Service {
                operation: "CreateStack".to_string(),
                code: "ValidationError".to_string(),
                message: "Template format error: JSON not well-formed".to_string(),
            },
        );
        assert!(matches!(
            err,
            CloudError::ProvisioningRejected { ref message, .. }
                if message == "Template format error: JSON not well-formed"
        ));

        let err = rejected(
            "drupal",
            AwsError::Transport {
                operation: "CreateStack".to_string(),
                message: "timed out".to_string(),
            },
        );
        assert!(err.is_transient());
    }
}
