//! State persistence: remembered workspaces folder and expanded folders

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::warn;

use super::state_saver::{save_now, spawn_state_saver};

/// Remembered workspaces folder (absolute path string)
pub const KEY_WORKSPACES_FOLDER: &str = "workspaces_folder";
/// Folders left expanded in the tree (array of absolute path strings)
pub const KEY_EXPANDED_FOLDERS: &str = "expanded_folders";

#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to read state: {0}")]
    ReadError(String),
    #[error("Failed to write state: {0}")]
    WriteError(String),
    #[error("Failed to parse state: {0}")]
    ParseError(String),
}

/// Global state - persisted to JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    pub version: u32,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: 1,
            values: BTreeMap::new(),
            last_updated: None,
        }
    }
}

impl GlobalState {
    /// Default state file location
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("WORKSPACE_WIZARD_STATE") {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".workspace-wizard")
            .join("state.json")
    }

    /// Load state from disk; a missing file yields an empty state
    pub fn load(path: &Path) -> Result<Self, StateError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).map_err(|e| StateError::ReadError(e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| StateError::ParseError(e.to_string()))
    }
}

/// 共享状态
pub type SharedGlobalState = Arc<RwLock<GlobalState>>;

/// Opaque key-value store backed by [`GlobalState`].
///
/// Writes are fire-and-forget: `set` mutates the in-memory state and signals
/// the saver actor, which serializes all disk writes.
#[derive(Clone)]
pub struct StateStore {
    state: SharedGlobalState,
    path: Option<PathBuf>,
    write_lock: Arc<Mutex<()>>,
    save_tx: Option<mpsc::Sender<()>>,
}

impl StateStore {
    /// Open a store persisted at `path`. Must be called inside a tokio runtime.
    pub fn open(path: PathBuf) -> Result<Self, StateError> {
        let state = match GlobalState::load(&path) {
            Ok(state) => state,
            Err(StateError::ParseError(e)) => {
                // 状态文件损坏：从空状态开始，下次保存时覆盖
                warn!("Discarding unreadable state file {:?}: {}", path, e);
                GlobalState::default()
            }
            Err(e) => return Err(e),
        };
        let state = Arc::new(RwLock::new(state));
        let write_lock = Arc::new(Mutex::new(()));
        let save_tx = spawn_state_saver(state.clone(), path.clone(), write_lock.clone());

        Ok(Self {
            state,
            path: Some(path),
            write_lock,
            save_tx: Some(save_tx),
        })
    }

    /// A store that never touches the disk
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(RwLock::new(GlobalState::default())),
            path: None,
            write_lock: Arc::new(Mutex::new(())),
            save_tx: None,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let state = self.state.read().await;
        let value = state.values.get(key)?.clone();
        drop(state);
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Ignoring malformed state value '{}': {}", key, e);
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to serialize state value '{}': {}", key, e);
                return;
            }
        };
        self.state.write().await.values.insert(key.to_string(), value);
        self.request_save();
    }

    /// Write the current state to disk right away
    pub async fn flush(&self) -> Result<(), StateError> {
        match &self.path {
            Some(path) => save_now(&self.state, path, &self.write_lock).await,
            None => Ok(()),
        }
    }

    fn request_save(&self) {
        if let Some(tx) = &self.save_tx {
            // 通道已满说明已有待保存信号，直接合并
            let _ = tx.try_send(());
        }
    }
}
