//! User settings parsing (config.toml)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    ReadError(String),
    #[error("Failed to parse settings: {0}")]
    ParseError(String),
}

/// How folders and workspace files are merged into one listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortPolicy {
    #[default]
    NameAscending,
    FoldersFirst,
    WorkspacesFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OpenTarget {
    #[default]
    CurrentWindow,
    NewWindow,
}

impl OpenTarget {
    pub fn opposite(self) -> Self {
        match self {
            OpenTarget::CurrentWindow => OpenTarget::NewWindow,
            OpenTarget::NewWindow => OpenTarget::CurrentWindow,
        }
    }
}

/// Initial collapse state of folders in the tree surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpandPolicy {
    #[default]
    Collapsed,
    AllExpanded,
    RememberLastState,
}

/// What to show when the launcher starts without a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartupAction {
    None,
    Picker,
    Tree,
}

/// Settings from config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub general: GeneralSection,
    #[serde(default)]
    pub tree: TreeSection,
    #[serde(default)]
    pub picker: PickerSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSection {
    #[serde(default)]
    pub sort: SortPolicy,
    #[serde(default = "default_start_existing")]
    pub start_on_existing_window: StartupAction,
    #[serde(default = "default_start_new")]
    pub start_on_new_window: StartupAction,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            sort: SortPolicy::default(),
            start_on_existing_window: default_start_existing(),
            start_on_new_window: default_start_new(),
        }
    }
}

fn default_start_existing() -> StartupAction {
    StartupAction::None
}

fn default_start_new() -> StartupAction {
    StartupAction::Picker
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSection {
    #[serde(default)]
    pub open_target: OpenTarget,
    #[serde(default)]
    pub expand: ExpandPolicy,
    #[serde(default = "default_true")]
    pub watch_for_changes: bool,
    #[serde(default = "default_debounce_ms")]
    pub watch_debounce_ms: u64,
}

impl Default for TreeSection {
    fn default() -> Self {
        Self {
            open_target: OpenTarget::default(),
            expand: ExpandPolicy::default(),
            watch_for_changes: default_true(),
            watch_debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    300
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PickerSection {
    #[serde(default)]
    pub open_target: OpenTarget,
}

/// The surface a selection came from; each has its own default open target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Tree,
    Picker,
}

impl Settings {
    /// Default settings file location
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("WORKSPACE_WIZARD_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".workspace-wizard")
            .join("config.toml")
    }

    /// Load settings from a file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).map_err(|e| SettingsError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| SettingsError::ParseError(e.to_string()))
    }

    pub fn open_target(&self, surface: Surface) -> OpenTarget {
        match surface {
            Surface::Tree => self.tree.open_target,
            Surface::Picker => self.picker.open_target,
        }
    }

    pub fn startup_action(&self, has_open_session: bool) -> StartupAction {
        if has_open_session {
            self.general.start_on_existing_window
        } else {
            self.general.start_on_new_window
        }
    }
}

/// Where the engine reads its settings snapshot from.
pub trait SettingsSource: Send + Sync {
    fn snapshot(&self) -> Settings;
}

/// Re-reads the TOML file on every snapshot.
#[derive(Debug, Clone)]
pub struct TomlSettingsFile {
    path: PathBuf,
}

impl TomlSettingsFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl SettingsSource for TomlSettingsFile {
    fn snapshot(&self) -> Settings {
        match Settings::load(&self.path) {
            Ok(settings) => settings,
            Err(e) => {
                // 配置文件损坏时退回默认值，不中断浏览
                warn!("{}; using default settings", e);
                Settings::default()
            }
        }
    }
}

/// In-memory settings, changed in place with `update`.
#[derive(Debug, Default)]
pub struct MemorySettings {
    inner: RwLock<Settings>,
}

impl MemorySettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut Settings)) {
        if let Ok(mut guard) = self.inner.write() {
            f(&mut guard);
        }
    }
}

impl SettingsSource for MemorySettings {
    fn snapshot(&self) -> Settings {
        self.inner
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}
