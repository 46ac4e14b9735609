//! Entry classification: folders, workspace files, everything else.

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Marker suffix of a workspace descriptor file
pub const WORKSPACE_SUFFIX: &str = ".code-workspace";

/// File type of a directory entry as reported by the file system (not following symlinks)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    Directory,
    File,
    Symlink,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Folder,
    WorkspaceFile { display_name: String },
    Ignored,
}

/// Decide what a directory entry is to the browser.
pub fn classify(name: &str, entry_type: EntryType) -> Classification {
    match entry_type {
        EntryType::Directory => Classification::Folder,
        EntryType::File => match strip_marker(name) {
            Some(base) => Classification::WorkspaceFile {
                display_name: base.to_string(),
            },
            None => Classification::Ignored,
        },
        EntryType::Symlink | EntryType::Other => Classification::Ignored,
    }
}

/// `"proj.code-workspace"` -> `Some("proj")`
pub fn strip_marker(name: &str) -> Option<&str> {
    name.strip_suffix(WORKSPACE_SUFFIX)
}

/// `"proj"` -> `"proj.code-workspace"`
pub fn with_marker(base: &str) -> String {
    format!("{}{}", base, WORKSPACE_SUFFIX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Folder,
    WorkspaceFile,
}

impl NodeKind {
    /// 同名时文件夹排在工作空间前面
    pub(crate) fn rank(self) -> u8 {
        match self {
            NodeKind::Folder => 0,
            NodeKind::WorkspaceFile => 1,
        }
    }
}

/// A browsable entry inside the workspaces folder.
///
/// Derived per listing and never cached: the path always keeps the real file
/// name, the display name of a workspace file has the marker suffix stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Folder { path: PathBuf, name: String },
    WorkspaceFile { path: PathBuf, display_name: String },
}

impl Node {
    /// Build a node for `name` inside `parent`, or `None` if the entry is ignored.
    ///
    /// The path keeps the raw file name; only the display name is lossy.
    pub fn from_entry(parent: &Path, name: &OsStr, entry_type: EntryType) -> Option<Node> {
        let lossy = name.to_string_lossy();
        match classify(&lossy, entry_type) {
            Classification::Folder => Some(Node::Folder {
                path: parent.join(name),
                name: lossy.into_owned(),
            }),
            Classification::WorkspaceFile { display_name } => Some(Node::WorkspaceFile {
                path: parent.join(name),
                display_name,
            }),
            Classification::Ignored => None,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Node::Folder { path, .. } | Node::WorkspaceFile { path, .. } => path,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Node::Folder { name, .. } => name,
            Node::WorkspaceFile { display_name, .. } => display_name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Folder { .. } => NodeKind::Folder,
            Node::WorkspaceFile { .. } => NodeKind::WorkspaceFile,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind() == NodeKind::Folder
    }

    /// Case-sensitive comparison by display name, folders first on ties.
    pub(crate) fn cmp_by_name(&self, other: &Node) -> Ordering {
        self.display_name()
            .cmp(other.display_name())
            .then(self.kind().rank().cmp(&other.kind().rank()))
    }
}
