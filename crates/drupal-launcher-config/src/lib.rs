//! Drupal launcher configuration
//!
//! すべての設定値は `LauncherConfig` に集約され、各コンポーネントの
//! コンストラクタへ明示的に渡される（プロセス全体のリージョン設定は持たない）。

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name used under the platform config dir.
pub const APP_NAME: &str = "drupal-launcher";

const CONFIG_ENV: &str = "DRUPAL_LAUNCHER_CONFIG";
const REGION_ENV: &str = "DRUPAL_LAUNCHER_REGION";
const CONFIG_CANDIDATES: [&str; 2] = ["drupal-launcher.yaml", ".drupal-launcher.yaml"];

/// Complete configuration for one launcher run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Provider region every client is constructed for.
    pub region: String,

    /// Tag key that marks the artifact bucket as ours.
    pub bucket_tag: String,

    /// Prefix of newly created bucket names; a UUID is appended.
    pub bucket_prefix: String,

    pub key_pair_name: String,

    /// Private key location. A leading `~/` is expanded.
    pub key_pair_file: String,

    /// Root of templates and Puppet content.
    pub data_dir: PathBuf,

    pub master_stack: StackConfig,
    pub client_stack: StackConfig,

    /// File name of the packaged Puppet configuration.
    pub archive_name: String,

    /// Directory packaged into the archive, relative to `data_dir`.
    pub archive_source: PathBuf,

    /// Files uploaded to the bucket, relative to `data_dir/puppet`.
    pub artifacts: Vec<String>,

    pub poll: PollConfig,
    pub cleanup: CleanupPolicy,

    /// Regex matched against stack names to find the web tier.
    pub web_stack_pattern: String,

    /// Logical resource id of the web server inside that stack.
    pub web_server_resource: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            bucket_tag: APP_NAME.to_string(),
            bucket_prefix: format!("{}-", APP_NAME),
            key_pair_name: APP_NAME.to_string(),
            key_pair_file: format!("~/.ssh/{}", APP_NAME),
            data_dir: PathBuf::from("data"),
            master_stack: StackConfig::new("puppet-master", "puppet-master.template"),
            client_stack: StackConfig::new("drupal", "puppet-drupal.template"),
            archive_name: "drupal-puppet-config.zip".to_string(),
            archive_source: PathBuf::from("puppet").join("content"),
            artifacts: vec![
                "drupal-puppet-config.zip".to_string(),
                "cfn-facter-plugin.rb".to_string(),
                "enable-epel-on-amazon-linux-ami".to_string(),
                "puppet-client.template".to_string(),
                "RDS_MySQL_55.template".to_string(),
            ],
            poll: PollConfig::default(),
            cleanup: CleanupPolicy::default(),
            web_stack_pattern: "drupal-WebServer".to_string(),
            web_server_resource: "PuppetClient".to_string(),
        }
    }
}

impl LauncherConfig {
    /// Resolved private key path.
    pub fn key_pair_path(&self) -> Result<PathBuf> {
        expand_tilde(&self.key_pair_file)
    }

    /// Directory holding uploadable artifacts.
    pub fn puppet_dir(&self) -> PathBuf {
        self.data_dir.join("puppet")
    }

    pub fn archive_path(&self) -> PathBuf {
        self.puppet_dir().join(&self.archive_name)
    }

    pub fn archive_source_dir(&self) -> PathBuf {
        self.data_dir.join(&self.archive_source)
    }

    pub fn template_path(&self, stack: &StackConfig) -> PathBuf {
        self.data_dir.join(&stack.template)
    }

    /// `(object key, local path)` for every artifact to upload.
    pub fn artifact_paths(&self) -> Vec<(String, PathBuf)> {
        let dir = self.puppet_dir();
        self.artifacts
            .iter()
            .map(|name| (name.clone(), dir.join(name)))
            .collect()
    }

    /// Apply environment overrides on top of file values.
    fn apply_env(&mut self) {
        if let Ok(region) = std::env::var(REGION_ENV) {
            if !region.trim().is_empty() {
                self.region = region.trim().to_string();
            }
        }
    }
}

/// Name and template file of one stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackConfig {
    pub name: String,

    /// Template path relative to `data_dir`.
    pub template: PathBuf,
}

impl StackConfig {
    pub fn new(name: impl Into<String>, template: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }
}

/// Progress polling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,

    /// `None` waits forever.
    pub timeout_secs: Option<u64>,

    pub max_transient_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2,
            timeout_secs: None,
            max_transient_retries: 5,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// What happens to the artifact bucket when a later step fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupPolicy {
    /// Leave the bucket and its artifacts in place.
    #[default]
    Retain,
    /// Delete the bucket, but only when this run created it.
    RemoveCreatedBucket,
}

/// ランチャーのグローバル設定ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join(APP_NAME))
}

/// 設定ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 DRUPAL_LAUNCHER_CONFIG (直接パス指定)
/// 2. カレントディレクトリ: drupal-launcher.yaml, .drupal-launcher.yaml
/// 3. ~/.config/drupal-launcher/config.yaml (グローバル設定)
///
/// 見つからない場合は `None`（デフォルト値で動作する）。
pub fn find_config_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        tracing::warn!(
            "{} points to {}, which does not exist",
            CONFIG_ENV,
            path.display()
        );
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CONFIG_CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("config.yaml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}

/// Load configuration from the discovered file, falling back to defaults.
pub fn load() -> Result<LauncherConfig> {
    let mut config = match find_config_file()? {
        Some(path) => load_from(&path)?,
        None => {
            tracing::debug!("No config file found, using defaults");
            LauncherConfig::default()
        }
    };
    config.apply_env();
    Ok(config)
}

/// Load configuration from an explicit path. Missing keys take defaults.
pub fn load_from(path: &Path) -> Result<LauncherConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: LauncherConfig =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// `~/` をホームディレクトリに展開
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| ConfigError::HomeDirNotFound(path.to_string()))?;
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(path))
}
