//! Progress polling
//!
//! Once a create, update or delete has been submitted, the poller samples the
//! stack on a fixed cadence until its status no longer contains
//! `IN_PROGRESS`. Each tick the latest event is handed to an observer; the
//! observer gets the raw latest event, so it may see the same one repeatedly.
//!
//! There is no default deadline. Callers opt into one through
//! [`PollOptions::timeout`] or stop the wait with a [`CancellationToken`].

use crate::cancel::CancellationToken;
use crate::error::{CloudError, Result};
use crate::provider::{RetryConfig, StackService};
use crate::stack::{StackEvent, StackHandle, StackStatus};
use drupal_launcher_config::PollConfig;
use std::time::Duration;
use tokio::time::Instant;

/// Receives the latest stack event once per polling tick.
///
/// Implementations are for display only and must not fail.
pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: &StackEvent);
}

impl<F> EventObserver for F
where
    F: Fn(&StackEvent) + Send + Sync,
{
    fn on_event(&self, event: &StackEvent) {
        self(event)
    }
}

/// Observer that discards every event.
pub struct SilentObserver;

impl EventObserver for SilentObserver {
    fn on_event(&self, _event: &StackEvent) {}
}

/// Polling cadence and limits
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub interval: Duration,

    /// `None` waits until the stack settles, however long that takes.
    ///
    /// A reconcile or delete counts this from its start, across every wait
    /// phase it goes through.
    pub timeout: Option<Duration>,

    /// Backoff for transient failures while refreshing status.
    pub retry: RetryConfig,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            timeout: None,
            retry: RetryConfig::default(),
        }
    }
}

impl From<&PollConfig> for PollOptions {
    fn from(config: &PollConfig) -> Self {
        Self {
            interval: config.interval(),
            timeout: config.timeout(),
            retry: RetryConfig {
                max_attempts: config.max_transient_retries,
                ..RetryConfig::default()
            },
        }
    }
}

/// Waits for stacks to reach a terminal status
pub struct ProgressPoller<'a> {
    service: &'a dyn StackService,
    options: PollOptions,
    cancel: CancellationToken,
}

impl<'a> ProgressPoller<'a> {
    pub fn new(service: &'a dyn StackService, options: PollOptions) -> Self {
        Self {
            service,
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &PollOptions {
        &self.options
    }

    /// Block until `handle` is terminal, reporting the latest event each tick.
    ///
    /// A stack that disappears mid-wait is reported as `DELETE_COMPLETE`.
    pub async fn poll<O>(&self, handle: StackHandle, observer: &O) -> Result<StackHandle>
    where
        O: EventObserver + ?Sized,
    {
        self.poll_since(handle, observer, Instant::now()).await
    }

    /// `poll` against a deadline counted from `started`.
    pub(crate) async fn poll_since<O>(
        &self,
        handle: StackHandle,
        observer: &O,
        started: Instant,
    ) -> Result<StackHandle>
    where
        O: EventObserver + ?Sized,
    {
        let mut handle = handle;

        while handle.status.is_in_progress() {
            tracing::debug!("Stack {} is {}", handle.name, handle.status);

            if let Some(events) = self.latest_events(&handle.name).await {
                if let Some(latest) = events.first() {
                    observer.on_event(latest);
                }
                handle.events = events;
            }

            self.pause(&handle.name, started).await?;

            let events = std::mem::take(&mut handle.events);
            handle = match self.refresh(&handle.name).await? {
                Some(mut refreshed) => {
                    refreshed.events = events;
                    refreshed
                }
                None => {
                    tracing::debug!("Stack {} no longer exists", handle.name);
                    let mut gone = StackHandle::deleted(handle.name.clone());
                    gone.events = events;
                    gone
                }
            };
        }

        tracing::info!("Stack {} settled with status {}", handle.name, handle.status);
        Ok(handle)
    }

    /// Re-read the stack until `still_waiting` is false or the stack is gone.
    ///
    /// Returns the last observed handle, or `None` once the stack no longer
    /// exists. No events are reported.
    pub async fn wait_while<F>(&self, name: &str, still_waiting: F) -> Result<Option<StackHandle>>
    where
        F: FnMut(&StackStatus) -> bool,
    {
        self.wait_while_since(name, still_waiting, Instant::now()).await
    }

    /// `wait_while` against a deadline counted from `started`.
    pub(crate) async fn wait_while_since<F>(
        &self,
        name: &str,
        mut still_waiting: F,
        started: Instant,
    ) -> Result<Option<StackHandle>>
    where
        F: FnMut(&StackStatus) -> bool,
    {
        loop {
            match self.refresh(name).await? {
                Some(handle) if still_waiting(&handle.status) => {
                    tracing::debug!("Waiting on stack {} ({})", name, handle.status);
                    self.pause(name, started).await?;
                }
                other => return Ok(other),
            }
        }
    }

    /// Events are display-only, so failures here never abort the wait.
    async fn latest_events(&self, name: &str) -> Option<Vec<StackEvent>> {
        match self.service.list_events(name).await {
            Ok(events) => Some(events),
            Err(e) => {
                tracing::warn!("Could not list events for stack {}: {}", name, e);
                None
            }
        }
    }

    /// Fetch current state, retrying transient transport failures.
    pub async fn refresh(&self, name: &str) -> Result<Option<StackHandle>> {
        let retry = &self.options.retry;
        let mut attempt = 0;
        loop {
            match self.service.get_stack(name).await {
                Ok(handle) => return Ok(handle),
                Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                    let delay = retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        "Transient error reading stack {} (attempt {}/{}), retrying in {:?}: {}",
                        name,
                        attempt + 1,
                        retry.max_attempts,
                        delay,
                        e
                    );
                    attempt += 1;
                    self.sleep_or_cancel(delay).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sleep one interval, honouring the deadline and cancellation.
    async fn pause(&self, name: &str, started: Instant) -> Result<()> {
        let mut wait = self.options.interval;
        if let Some(timeout) = self.options.timeout {
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(CloudError::ProvisioningTimeout {
                    stack: name.to_string(),
                    waited: elapsed,
                });
            }
            wait = wait.min(timeout - elapsed);
        }
        self.sleep_or_cancel(wait).await
    }

    async fn sleep_or_cancel(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancel.cancelled() => Err(CloudError::Cancelled(
                self.cancel
                    .reason()
                    .unwrap_or_else(|| "wait cancelled".to_string()),
            )),
        }
    }
}
