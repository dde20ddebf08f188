//! Drupal Launcher Cloud Provisioning
//!
//! Provider-agnostic core of the launcher: stack reconciliation, progress
//! polling and the drivers that stand up or tear down the two-tier Puppet
//! master / Drupal client deployment.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   drupal_aws                     │
//! │           (create / status / destroy)            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │              drupal-launcher-cloud               │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │      Launcher (create / destroy)          │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │  Reconciler  │──│    Poller    │            │
//! │  └──────────────┘  └──────────────┘            │
//! │  ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌──────┐ │
//! │  │ Locator │ │ Artifact │ │ KeyPair │ │Health│ │
//! │  └─────────┘ └──────────┘ └─────────┘ └──────┘ │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  trait CloudProvider { ... }              │   │
//! │  └──────────────────────────────────────────┘   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼───────┐
//!           │      aws      │
//!           │   provider    │
//!           └───────────────┘
//! ```

pub mod action;
pub mod artifact;
pub mod cancel;
pub mod error;
pub mod health;
pub mod keypair;
pub mod launch;
pub mod locator;
pub mod poller;
pub mod provider;
pub mod reconcile;
pub mod stack;

// Re-exports
pub use action::{ReconcileAction, ReconcileOutcome};
pub use artifact::{ArtifactPublisher, package_archive};
pub use cancel::CancellationToken;
pub use error::{CloudError, Result};
pub use health::{HealthProber, HealthReport};
pub use keypair::{KeyPairManager, KeyPairRemoval, KeyPairState};
pub use launch::{LaunchObserver, LaunchReport, Launcher, TeardownReport};
pub use locator::{LocatedBucket, ResourceLocator};
pub use poller::{EventObserver, PollOptions, ProgressPoller, SilentObserver};
pub use provider::{
    BucketService, Capability, CloudProvider, InstanceService, KeyPairService, ObjectAcl,
    RetryConfig, StackService,
};
pub use reconcile::StackReconciler;
pub use stack::{StackEvent, StackHandle, StackRequest, StackResource, StackStatus};
