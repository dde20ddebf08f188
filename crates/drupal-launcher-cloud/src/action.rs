//! Reconciliation actions

use crate::stack::{StackHandle, StackRequest};
use serde::{Deserialize, Serialize};

/// Lifecycle action the reconciler applied to a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    /// No stack existed, a fresh one was created
    Create,
    /// The stack existed and an update was submitted
    Update,
    /// A rolled-back stack was deleted and created again
    Recreate,
    /// Template and parameters already matched
    Skip,
}

impl ReconcileAction {
    /// Whether a create or update call reached the provider.
    pub fn submitted(&self) -> bool {
        !matches!(self, ReconcileAction::Skip)
    }
}

impl std::fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileAction::Create => write!(f, "create"),
            ReconcileAction::Update => write!(f, "update"),
            ReconcileAction::Recreate => write!(f, "recreate"),
            ReconcileAction::Skip => write!(f, "no-op"),
        }
    }
}

/// Decide between update and skip for a usable existing stack.
///
/// Only a byte-identical template together with unchanged requested
/// parameters counts as unchanged; a parameter-only change is still
/// submitted. Parameters the stack reports but the request leaves out are
/// template defaults and are not compared. Masked (`NoEcho`) values never
/// match, so such stacks are always updated.
pub fn plan_existing(existing: &StackHandle, request: &StackRequest) -> ReconcileAction {
    let same_template = existing.template.as_deref() == Some(request.template.as_str());
    let same_parameters = request
        .parameters
        .iter()
        .all(|(key, value)| existing.parameters.get(key) == Some(value));
    if same_template && same_parameters {
        ReconcileAction::Skip
    } else {
        ReconcileAction::Update
    }
}

/// Result of reconciling one stack
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub action: ReconcileAction,

    /// Terminal handle returned by the poller (or the unchanged stack).
    pub handle: StackHandle,
}
