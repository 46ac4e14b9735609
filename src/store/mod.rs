//! Settings and persisted state
//!
//! - `settings`: user settings read from config.toml
//! - `state`: remembered workspaces folder and expanded folders (state.json)
//! - `state_saver`: debounced background writer for the state file

pub mod settings;
pub mod state;
pub mod state_saver;

pub use settings::{
    ExpandPolicy, MemorySettings, OpenTarget, Settings, SettingsError, SettingsSource, SortPolicy,
    StartupAction, Surface, TomlSettingsFile,
};
pub use state::{GlobalState, StateError, StateStore, KEY_EXPANDED_FOLDERS, KEY_WORKSPACES_FOLDER};
pub use state_saver::spawn_state_saver;
