//! Minimal `.code-workspace` document written for new workspaces

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkspaceDocument {
    pub folders: Vec<WorkspaceFolder>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFolder {
    pub path: String,
}

impl WorkspaceDocument {
    pub fn from_folders(folders: &[PathBuf]) -> Self {
        Self {
            folders: folders
                .iter()
                .map(|p| WorkspaceFolder {
                    path: p.to_string_lossy().to_string(),
                })
                .collect(),
        }
    }

    /// Tab-indented JSON, the way the editor formats workspace files
    pub fn to_pretty_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(buf)
    }
}
