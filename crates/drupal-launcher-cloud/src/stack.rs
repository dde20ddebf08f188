//! Stack data model
//!
//! Requests describe desired state, handles describe what the provisioning
//! service reports. Handles are never cached across reconciliations.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Substring every non-terminal status carries.
const IN_PROGRESS_MARKER: &str = "IN_PROGRESS";

/// Lifecycle status of a stack
///
/// Unknown provider statuses are kept verbatim in `Other` so that the
/// in-progress test keeps working for statuses added after this was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StackStatus {
    CreateInProgress,
    CreateComplete,
    CreateFailed,
    RollbackInProgress,
    RollbackComplete,
    RollbackFailed,
    UpdateInProgress,
    UpdateComplete,
    UpdateFailed,
    DeleteInProgress,
    DeleteComplete,
    DeleteFailed,
    Other(String),
}

impl StackStatus {
    pub fn as_str(&self) -> &str {
        match self {
            StackStatus::CreateInProgress => "CREATE_IN_PROGRESS",
            StackStatus::CreateComplete => "CREATE_COMPLETE",
            StackStatus::CreateFailed => "CREATE_FAILED",
            StackStatus::RollbackInProgress => "ROLLBACK_IN_PROGRESS",
            StackStatus::RollbackComplete => "ROLLBACK_COMPLETE",
            StackStatus::RollbackFailed => "ROLLBACK_FAILED",
            StackStatus::UpdateInProgress => "UPDATE_IN_PROGRESS",
            StackStatus::UpdateComplete => "UPDATE_COMPLETE",
            StackStatus::UpdateFailed => "UPDATE_FAILED",
            StackStatus::DeleteInProgress => "DELETE_IN_PROGRESS",
            StackStatus::DeleteComplete => "DELETE_COMPLETE",
            StackStatus::DeleteFailed => "DELETE_FAILED",
            StackStatus::Other(s) => s.as_str(),
        }
    }

    /// Asynchronous work is still running. Defined on the status text only.
    pub fn is_in_progress(&self) -> bool {
        self.as_str().contains(IN_PROGRESS_MARKER)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_in_progress()
    }

    /// Terminal states after which outputs are usable.
    pub fn is_success(&self) -> bool {
        matches!(self, StackStatus::CreateComplete | StackStatus::UpdateComplete)
    }

    /// Failed initial create that rolled back to nothing. Can only be replaced.
    pub fn is_unusable(&self) -> bool {
        matches!(self, StackStatus::RollbackComplete)
    }

    /// Statuses the reconciler must wait out before deciding anything.
    pub fn is_winding_down(&self) -> bool {
        matches!(
            self,
            StackStatus::DeleteInProgress | StackStatus::RollbackInProgress
        )
    }
}

impl From<&str> for StackStatus {
    fn from(s: &str) -> Self {
        match s {
            "CREATE_IN_PROGRESS" => StackStatus::CreateInProgress,
            "CREATE_COMPLETE" => StackStatus::CreateComplete,
            "CREATE_FAILED" => StackStatus::CreateFailed,
            "ROLLBACK_IN_PROGRESS" => StackStatus::RollbackInProgress,
            "ROLLBACK_COMPLETE" => StackStatus::RollbackComplete,
            "ROLLBACK_FAILED" => StackStatus::RollbackFailed,
            "UPDATE_IN_PROGRESS" => StackStatus::UpdateInProgress,
            "UPDATE_COMPLETE" => StackStatus::UpdateComplete,
            "UPDATE_FAILED" => StackStatus::UpdateFailed,
            "DELETE_IN_PROGRESS" => StackStatus::DeleteInProgress,
            "DELETE_COMPLETE" => StackStatus::DeleteComplete,
            "DELETE_FAILED" => StackStatus::DeleteFailed,
            other => StackStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for StackStatus {
    fn from(s: String) -> Self {
        StackStatus::from(s.as_str())
    }
}

impl From<StackStatus> for String {
    fn from(status: StackStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for StackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Desired state of one stack. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackRequest {
    pub name: String,
    pub template: String,
    pub parameters: BTreeMap<String, String>,
}

impl StackRequest {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// A stack as reported by the provisioning service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackHandle {
    pub name: String,

    /// Provider-assigned identifier, when known.
    pub stack_id: Option<String>,

    pub status: StackStatus,

    pub status_reason: Option<String>,

    /// Only meaningful once the status is a success.
    pub outputs: BTreeMap<String, String>,

    /// Parameters the stack was last applied with.
    pub parameters: BTreeMap<String, String>,

    /// Last applied template body. Fetched on demand.
    pub template: Option<String>,

    /// Most-recent-first events seen by the last poll tick.
    pub events: Vec<StackEvent>,
}

impl StackHandle {
    pub fn new(name: impl Into<String>, status: StackStatus) -> Self {
        Self {
            name: name.into(),
            stack_id: None,
            status,
            status_reason: None,
            outputs: BTreeMap::new(),
            parameters: BTreeMap::new(),
            template: None,
            events: Vec::new(),
        }
    }

    /// Handle standing in for a stack that no longer exists.
    pub fn deleted(name: impl Into<String>) -> Self {
        Self::new(name, StackStatus::DeleteComplete)
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(String::as_str)
    }

    pub fn require_output(&self, key: &str) -> Result<&str> {
        self.output(key).ok_or_else(|| CloudError::MissingOutput {
            stack: self.name.clone(),
            key: key.to_string(),
        })
    }

    /// Fail unless the stack reached a usable terminal state.
    pub fn ensure_success(&self) -> Result<()> {
        if self.status.is_success() {
            Ok(())
        } else {
            Err(CloudError::StackFailed {
                stack: self.name.clone(),
                status: self.status.to_string(),
            })
        }
    }
}

/// One status-change record produced by the provisioning service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    pub timestamp: DateTime<Utc>,
    pub resource_type: String,
    pub logical_resource_id: String,
    pub resource_status: String,
    pub status_reason: Option<String>,
}

impl std::fmt::Display for StackEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} - {} - {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.resource_type,
            self.logical_resource_id,
            self.resource_status
        )
    }
}

/// A resource belonging to a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackResource {
    pub logical_resource_id: String,
    pub physical_resource_id: Option<String>,
    pub resource_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_in_progress_is_substring_based() {
        assert!(StackStatus::CreateInProgress.is_in_progress());
        assert!(StackStatus::DeleteInProgress.is_in_progress());
        assert!(!StackStatus::CreateComplete.is_in_progress());
        assert!(!StackStatus::RollbackFailed.is_in_progress());

        // プロバイダが後から追加したステータスにも対応
        let cleanup = StackStatus::from("UPDATE_COMPLETE_CLEANUP_IN_PROGRESS");
        assert!(matches!(cleanup, StackStatus::Other(_)));
        assert!(cleanup.is_in_progress());

        let import = StackStatus::from("IMPORT_COMPLETE");
        assert!(import.is_terminal());
    }

    #[test]
    fn test_status_round_trip_through_text() {
        for text in ["CREATE_COMPLETE", "ROLLBACK_COMPLETE", "UPDATE_ROLLBACK_COMPLETE"] {
            assert_eq!(StackStatus::from(text).as_str(), text);
        }

        let json = serde_json::to_string(&StackStatus::UpdateInProgress).unwrap();
        assert_eq!(json, "\"UPDATE_IN_PROGRESS\"");
        let back: StackStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StackStatus::UpdateInProgress);
    }

    #[test]
    fn test_status_classification() {
        assert!(StackStatus::CreateComplete.is_success());
        assert!(StackStatus::UpdateComplete.is_success());
        assert!(!StackStatus::CreateFailed.is_success());
        assert!(StackStatus::RollbackComplete.is_unusable());
        assert!(StackStatus::RollbackInProgress.is_winding_down());
        assert!(!StackStatus::CreateInProgress.is_winding_down());
    }

    #[test]
    fn test_require_output() {
        let handle = StackHandle::new("puppet-master", StackStatus::CreateComplete)
            .with_output("PuppetMasterDNSName", "ip-10-0-0-1.ec2.internal");

        assert_eq!(
            handle.require_output("PuppetMasterDNSName").unwrap(),
            "ip-10-0-0-1.ec2.internal"
        );
        match handle.require_output("PuppetClientSecurityGroup") {
            Err(CloudError::MissingOutput { stack, key }) => {
                assert_eq!(stack, "puppet-master");
                assert_eq!(key, "PuppetClientSecurityGroup");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_ensure_success() {
        assert!(
            StackHandle::new("drupal", StackStatus::UpdateComplete)
                .ensure_success()
                .is_ok()
        );
        let err = StackHandle::new("drupal", StackStatus::RollbackComplete)
            .ensure_success()
            .unwrap_err();
        assert!(err.to_string().contains("ROLLBACK_COMPLETE"));
    }

    #[test]
    fn test_event_display() {
        let event = StackEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            resource_type: "AWS::EC2::Instance".to_string(),
            logical_resource_id: "PuppetMasterInstance".to_string(),
            resource_status: "CREATE_IN_PROGRESS".to_string(),
            status_reason: None,
        };
        assert_eq!(
            event.to_string(),
            "2024-05-01 12:30:00 UTC: AWS::EC2::Instance - PuppetMasterInstance - CREATE_IN_PROGRESS"
        );
    }
}
