//! Hierarchical workspace browser
//!
//! This module provides:
//! - Entry classification and directory listing with sort policies
//! - Navigation bounded by the workspaces folder
//! - The browser engine shared by the tree and picker surfaces
//! - Debounced watching of the workspaces folder

pub mod classify;
pub mod document;
pub mod engine;
pub mod error;
pub mod fs;
pub mod lister;
pub mod navigation;
pub mod picker;
pub mod tree;
pub mod watcher;

pub use classify::{classify, Classification, EntryType, Node, NodeKind, WORKSPACE_SUFFIX};
pub use document::WorkspaceDocument;
pub use engine::{BrowserChange, BrowserEngine, Capabilities, EngineState, Listing, Selection};
pub use error::{BrowserError, NavigationError};
pub use fs::{DirEntry, FileSystem, LocalFileSystem};
pub use lister::list_directory;
pub use navigation::NavigationState;
pub use picker::{PickerItem, PickerSession, PickerView};
pub use tree::{Collapsible, TreeItem, TreeRow, TreeSurface};
pub use watcher::{
    ChangeWatchSupervisor, FsEventKind, NotifyBackend, WatchBackend, WatchError, WatchHandle,
};
