//! Stack reconciliation
//!
//! Given a desired [`StackRequest`], decide whether the named stack must be
//! created, updated, recreated or left alone, apply that decision, and wait
//! for the provisioning service to finish.
//!
//! ```text
//!   get_stack(name)
//!        │
//!        ├─ absent / DELETE_COMPLETE ─────────────► create ─┐
//!        ├─ ROLLBACK_COMPLETE ─► delete, wait gone ► create ─┤
//!        ├─ DELETE_/ROLLBACK_IN_PROGRESS ─► wait, re-check   │
//!        ├─ other *_IN_PROGRESS ─► poll, re-check            │
//!        └─ usable ─► template+params equal? ─ yes ► skip    │
//!                                       └─ no ─► update ─────┤
//!                                                            ▼
//!                                                  poll until terminal
//! ```

use crate::action::{ReconcileAction, ReconcileOutcome, plan_existing};
use crate::error::{CloudError, Result};
use crate::poller::{EventObserver, ProgressPoller};
use crate::provider::{Capability, StackService};
use crate::stack::{StackHandle, StackRequest, StackStatus};
use tokio::time::Instant;

/// Drives one named stack to the desired state
pub struct StackReconciler<'a> {
    service: &'a dyn StackService,
    poller: ProgressPoller<'a>,
    capabilities: Vec<Capability>,
}

impl<'a> StackReconciler<'a> {
    /// Creates always acknowledge IAM capabilities.
    pub fn new(service: &'a dyn StackService, poller: ProgressPoller<'a>) -> Self {
        Self {
            service,
            poller,
            capabilities: vec![Capability::Iam],
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Converge the stack named in `request` and block until it is terminal.
    ///
    /// The returned handle may carry a failed status; judging it is the
    /// caller's business.
    pub async fn reconcile<O>(&self, request: &StackRequest, observer: &O) -> Result<ReconcileOutcome>
    where
        O: EventObserver + ?Sized,
    {
        let name = request.name.as_str();
        let started = Instant::now();
        let mut recreated = false;
        let mut current = self.poller.refresh(name).await?;

        while let Some(stack) = current.take() {
            match stack.status.clone() {
                StackStatus::DeleteComplete => break,
                StackStatus::DeleteFailed => {
                    return Err(CloudError::StackFailed {
                        stack: stack.name,
                        status: StackStatus::DeleteFailed.to_string(),
                    });
                }
                status if status.is_unusable() => {
                    tracing::info!(
                        "Stack {} is {}; deleting it so it can be created again",
                        name,
                        status
                    );
                    self.service.delete_stack(name).await?;
                    recreated = true;
                    current = self
                        .poller
                        .wait_while_since(
                            name,
                            |s| !matches!(s, StackStatus::DeleteFailed | StackStatus::DeleteComplete),
                            started,
                        )
                        .await?;
                }
                status if status.is_winding_down() => {
                    tracing::info!(
                        "Stack {} is being deleted or rolled back ({}). Please wait.",
                        name,
                        status
                    );
                    current = self
                        .poller
                        .wait_while_since(name, |s| s.is_winding_down(), started)
                        .await?;
                }
                status if status.is_in_progress() => {
                    tracing::info!(
                        "Stack {} already has an operation in progress ({}); waiting for it",
                        name,
                        status
                    );
                    let settled = self.poller.poll_since(stack, observer, started).await?;
                    current = Some(settled);
                }
                _ => return self.reconcile_existing(stack, request, observer, started).await,
            }
        }

        tracing::info!("Creating stack {}", name);
        let submitted = self
            .service
            .create_stack(request, &self.capabilities)
            .await?;
        let handle = self.poller.poll_since(submitted, observer, started).await?;
        let action = if recreated {
            ReconcileAction::Recreate
        } else {
            ReconcileAction::Create
        };
        Ok(ReconcileOutcome { action, handle })
    }

    async fn reconcile_existing<O>(
        &self,
        mut stack: StackHandle,
        request: &StackRequest,
        observer: &O,
        started: Instant,
    ) -> Result<ReconcileOutcome>
    where
        O: EventObserver + ?Sized,
    {
        stack.template = Some(self.service.get_template(&stack.name).await?);

        match plan_existing(&stack, request) {
            ReconcileAction::Skip => {
                tracing::info!(
                    "Stack {} is up to date ({}); nothing to submit",
                    stack.name,
                    stack.status
                );
                Ok(ReconcileOutcome {
                    action: ReconcileAction::Skip,
                    handle: stack,
                })
            }
            action => {
                tracing::info!("Updating stack {}", stack.name);
                let submitted = self.service.update_stack(request).await?;
                let handle = self.poller.poll_since(submitted, observer, started).await?;
                Ok(ReconcileOutcome { action, handle })
            }
        }
    }

    /// Delete a stack and wait for the deletion to finish.
    ///
    /// Returns `None` when there was nothing to delete.
    pub async fn delete<O>(&self, name: &str, observer: &O) -> Result<Option<StackHandle>>
    where
        O: EventObserver + ?Sized,
    {
        let started = Instant::now();
        if self.poller.refresh(name).await?.is_none() {
            tracing::debug!("Stack {} does not exist, nothing to delete", name);
            return Ok(None);
        }

        tracing::info!("Deleting stack {}", name);
        self.service.delete_stack(name).await?;

        let handle = match self.poller.refresh(name).await? {
            Some(handle) => self.poller.poll_since(handle, observer, started).await?,
            None => StackHandle::deleted(name),
        };
        Ok(Some(handle))
    }
}
