//! File-backed runtime property store
//!
//! Persists the runtime properties of every node instance in
//! `.stratus/state.json`, the way an orchestrator persists them after each
//! invocation. Used by local harnesses and tests to replay retries across
//! process boundaries.

use crate::error::StoreError;
use crate::runtime::RuntimeProperties;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const FORMAT_VERSION: u32 = 1;
const STORE_DIR: &str = ".stratus";
const STATE_FILE: &str = "state.json";
const BACKUP_FILE: &str = "state.json.backup";
const PENDING_FILE: &str = "state.json.tmp";
const LOCK_FILE: &str = "lock.json";

/// A lock older than this is considered abandoned
const STALE_LOCK_MINUTES: i64 = 60;

type Result<T> = std::result::Result<T, StoreError>;

/// Runtime properties of all node instances of a deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentState {
    #[serde(rename = "version")]
    pub format_version: u32,

    pub updated_at: DateTime<Utc>,

    /// Keyed by node instance id
    pub instances: BTreeMap<String, InstanceRecord>,
}

impl Default for DeploymentState {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            updated_at: Utc::now(),
            instances: BTreeMap::new(),
        }
    }
}

impl DeploymentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime properties of an instance; empty when never written
    pub fn runtime_properties(&self, instance_id: &str) -> RuntimeProperties {
        self.instances
            .get(instance_id)
            .map(|record| record.runtime_properties.clone())
            .unwrap_or_default()
    }

    pub fn set_runtime_properties(
        &mut self,
        instance_id: impl Into<String>,
        runtime_properties: RuntimeProperties,
    ) {
        self.updated_at = Utc::now();
        self.instances.insert(
            instance_id.into(),
            InstanceRecord {
                runtime_properties,
                updated_at: self.updated_at,
            },
        );
    }

    pub fn remove(&mut self, instance_id: &str) -> Option<InstanceRecord> {
        let removed = self.instances.remove(instance_id);
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Instance ids carrying the terminal deletion marker
    pub fn deleted_instances(&self) -> Vec<&str> {
        self.instances
            .iter()
            .filter(|(_, record)| record.runtime_properties.is_deleted())
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// Persisted runtime properties of one node instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub runtime_properties: RuntimeProperties,
    pub updated_at: DateTime<Utc>,
}

/// Reads and writes `.stratus/state.json` below a root directory
#[derive(Debug, Clone)]
pub struct PropertyStore {
    dir: PathBuf,
}

impl PropertyStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join(STORE_DIR),
        }
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Load the whole state; a missing file is an empty state
    pub async fn load(&self) -> Result<DeploymentState> {
        let path = self.file(STATE_FILE);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No state file yet");
                return Ok(DeploymentState::new());
            }
            Err(e) => return Err(e.into()),
        };

        let state: DeploymentState = serde_json::from_str(&text)?;
        if state.format_version > FORMAT_VERSION {
            return Err(StoreError::State(format!(
                "{} was written by a newer release (format {}, supported {})",
                path.display(),
                state.format_version,
                FORMAT_VERSION
            )));
        }

        tracing::debug!(instances = state.instances.len(), "Loaded state");
        Ok(state)
    }

    /// Write the state.
    ///
    /// The previous file is copied to `state.json.backup` and the new
    /// content replaces it through a rename, so readers never observe a
    /// partially written file.
    pub async fn save(&self, state: &DeploymentState) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.file(STATE_FILE);
        match fs::copy(&path, self.file(BACKUP_FILE)).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let pending = self.file(PENDING_FILE);
        fs::write(&pending, serde_json::to_vec_pretty(state)?).await?;
        fs::rename(&pending, &path).await?;

        tracing::debug!(instances = state.instances.len(), "Saved state");
        Ok(())
    }

    pub async fn load_instance(&self, instance_id: &str) -> Result<RuntimeProperties> {
        Ok(self.load().await?.runtime_properties(instance_id))
    }

    /// Read-modify-write of a single instance record
    pub async fn save_instance(
        &self,
        instance_id: &str,
        runtime_properties: &RuntimeProperties,
    ) -> Result<()> {
        let mut state = self.load().await?;
        state.set_runtime_properties(instance_id, runtime_properties.clone());
        self.save(&state).await
    }

    /// Take the advisory lock guarding read-modify-write cycles.
    ///
    /// Fails when another holder took it less than an hour ago; older locks
    /// are replaced.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.file(LOCK_FILE);

        let mut file = match create_exclusive(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let held: LockHolder = serde_json::from_str(&fs::read_to_string(&path).await?)?;
                if Utc::now() - held.acquired_at < TimeDelta::minutes(STALE_LOCK_MINUTES) {
                    return Err(StoreError::Lock(format!(
                        "held by {} (pid {}) since {}",
                        held.host, held.pid, held.acquired_at
                    )));
                }
                tracing::warn!(
                    host = held.host.as_str(),
                    pid = held.pid,
                    acquired_at = %held.acquired_at,
                    "Replacing stale state lock"
                );
                fs::remove_file(&path).await?;
                create_exclusive(&path).await?
            }
            Err(e) => return Err(e.into()),
        };

        let holder = LockHolder::current();
        file.write_all(&serde_json::to_vec_pretty(&holder)?).await?;
        file.flush().await?;

        tracing::debug!(pid = holder.pid, "State lock acquired");
        Ok(StateLock {
            path,
            released: false,
        })
    }
}

async fn create_exclusive(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}

#[derive(Debug, Serialize, Deserialize)]
struct LockHolder {
    host: String,
    pid: u32,
    acquired_at: DateTime<Utc>,
}

impl LockHolder {
    fn current() -> Self {
        let host = ["HOSTNAME", "HOST", "COMPUTERNAME"]
            .iter()
            .find_map(|var| std::env::var(var).ok())
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            host,
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }
}

/// Held state lock; removed on [`release`](Self::release) or drop
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!("State lock released");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
