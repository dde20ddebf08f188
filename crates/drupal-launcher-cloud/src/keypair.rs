//! SSH key pair management
//!
//! The local private key file and the remote key pair must exist as a pair.
//! A half-present pair is reported, never repaired.

use crate::error::{CloudError, Result};
use crate::provider::KeyPairService;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// What `ensure` found or did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPairState {
    /// Both halves already existed.
    Reused,
    /// Neither existed; a new pair was generated.
    Created,
}

/// What `remove` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPairRemoval {
    /// Remote key pair and local file were both deleted.
    Removed,
    /// Only the remote key pair existed and was deleted.
    RemoteRemoved,
    /// A local file without a remote mate was left untouched.
    LocalOrphanKept,
    /// Nothing to remove.
    NotFound,
}

/// Keeps the local private key and the remote key pair consistent
pub struct KeyPairManager<'a> {
    service: &'a dyn KeyPairService,
    name: String,
    path: PathBuf,
}

impl<'a> KeyPairManager<'a> {
    pub fn new(service: &'a dyn KeyPairService, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            service,
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make sure a usable key pair exists, generating one when neither half does.
    pub async fn ensure(&self) -> Result<KeyPairState> {
        tracing::info!("Checking for private key file: {}", self.path.display());
        let local = tokio::fs::try_exists(&self.path).await?;
        let remote = self.service.key_pair_exists(&self.name).await?;

        match (local, remote) {
            (true, true) => {
                // 公開鍵と秘密鍵が対応していると仮定する
                tracing::info!("Key pair match found: {}", self.name);
                Ok(KeyPairState::Reused)
            }
            (true, false) => Err(CloudError::InconsistentKeyState(format!(
                "The private key found at {} does not seem to have a public mate on this account",
                self.path.display()
            ))),
            (false, true) => Err(CloudError::InconsistentKeyState(format!(
                "Found key pair {} without a matching local private key. This can be resolved by \
                 deleting the key pair in your account if it is no longer needed",
                self.name
            ))),
            (false, false) => {
                tracing::info!("Private key not found, generating key pair {}", self.name);
                let material = self.service.create_key_pair(&self.name).await?;
                write_private_key(&self.path, &material).await?;
                tracing::info!("Created new private key file at {}", self.path.display());
                Ok(KeyPairState::Created)
            }
        }
    }

    /// Remove the key pair during teardown.
    pub async fn remove(&self) -> Result<KeyPairRemoval> {
        let local = tokio::fs::try_exists(&self.path).await?;
        let remote = self.service.key_pair_exists(&self.name).await?;

        match (local, remote) {
            (true, true) => {
                self.service.delete_key_pair(&self.name).await?;
                tokio::fs::remove_file(&self.path).await?;
                Ok(KeyPairRemoval::Removed)
            }
            (true, false) => {
                tracing::warn!(
                    "The private key found at {} does not seem to have a public mate on this account. Skipping.",
                    self.path.display()
                );
                Ok(KeyPairRemoval::LocalOrphanKept)
            }
            (false, true) => {
                self.service.delete_key_pair(&self.name).await?;
                Ok(KeyPairRemoval::RemoteRemoved)
            }
            (false, false) => Ok(KeyPairRemoval::NotFound),
        }
    }
}

/// Write key material readable and writable by the owner only.
async fn write_private_key(path: &Path, material: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    // 作成時から 0600
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(material.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
