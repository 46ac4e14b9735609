//! Directory listing: read, classify, sort.

use std::path::Path;
use tracing::debug;

use crate::browser::classify::{Node, NodeKind};
use crate::browser::error::BrowserError;
use crate::browser::fs::FileSystem;
use crate::store::settings::SortPolicy;

/// List the immediate children of `directory` that the browser cares about.
///
/// Ignored entries are dropped. A read failure yields `DirectoryUnreadable`
/// and never a partial result.
pub async fn list_directory(
    fs: &dyn FileSystem,
    directory: &Path,
    sort: SortPolicy,
) -> Result<Vec<Node>, BrowserError> {
    let entries = fs
        .read_directory(directory)
        .await
        .map_err(|e| BrowserError::unreadable(directory, e))?;

    let total = entries.len();
    let mut nodes: Vec<Node> = entries
        .iter()
        .filter_map(|entry| Node::from_entry(directory, &entry.name, entry.entry_type))
        .collect();
    sort_nodes(&mut nodes, sort);

    debug!(
        "Listed {:?}: {} entries, {} shown",
        directory,
        total,
        nodes.len()
    );
    Ok(nodes)
}

/// Order nodes according to the sort policy.
///
/// Names compare case-sensitively; workspace files compare by their stripped
/// display name. On equal names a folder sorts before a workspace file.
pub fn sort_nodes(nodes: &mut [Node], sort: SortPolicy) {
    match sort {
        SortPolicy::NameAscending => nodes.sort_by(Node::cmp_by_name),
        SortPolicy::FoldersFirst => nodes.sort_by(|a, b| {
            group_rank(a.kind(), NodeKind::Folder)
                .cmp(&group_rank(b.kind(), NodeKind::Folder))
                .then_with(|| a.cmp_by_name(b))
        }),
        SortPolicy::WorkspacesFirst => nodes.sort_by(|a, b| {
            group_rank(a.kind(), NodeKind::WorkspaceFile)
                .cmp(&group_rank(b.kind(), NodeKind::WorkspaceFile))
                .then_with(|| a.cmp_by_name(b))
        }),
    }
}

fn group_rank(kind: NodeKind, first: NodeKind) -> u8 {
    if kind == first {
        0
    } else {
        1
    }
}
