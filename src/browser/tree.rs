//! Tree surface: folders as collapsible items, workspaces as leaves

use std::path::PathBuf;

use crate::browser::classify::Node;
use crate::browser::engine::{BrowserEngine, Selection};
use crate::browser::error::BrowserError;
use crate::store::settings::{ExpandPolicy, Surface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collapsible {
    None,
    Collapsed,
    Expanded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    pub node: Node,
    pub collapsible: Collapsible,
}

#[derive(Debug)]
pub struct TreeChildren {
    pub items: Vec<TreeItem>,
    pub notice: Option<BrowserError>,
}

/// A visible row of the rendered tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub item: TreeItem,
}

#[derive(Clone)]
pub struct TreeSurface {
    engine: BrowserEngine,
}

impl TreeSurface {
    pub fn new(engine: BrowserEngine) -> Self {
        Self { engine }
    }

    /// Children of `parent`, or of the workspaces folder when `parent` is `None`
    pub async fn children(&self, parent: Option<&Node>) -> TreeChildren {
        let directory: PathBuf = match parent {
            Some(node) if node.is_folder() => node.path().to_path_buf(),
            Some(_) => {
                return TreeChildren {
                    items: Vec::new(),
                    notice: None,
                }
            }
            None => match self.engine.root().await {
                Some(root) => root,
                None => {
                    return TreeChildren {
                        items: Vec::new(),
                        notice: Some(BrowserError::NotConfigured),
                    }
                }
            },
        };

        let listing = self.engine.list_children(Some(&directory)).await;
        let policy = self.engine.settings().await.tree.expand;
        let mut items = Vec::with_capacity(listing.nodes.len());
        for node in listing.nodes {
            let collapsible = self.collapsible_for(&node, policy).await;
            items.push(TreeItem { node, collapsible });
        }
        TreeChildren {
            items,
            notice: listing.notice,
        }
    }

    async fn collapsible_for(&self, node: &Node, policy: ExpandPolicy) -> Collapsible {
        if !node.is_folder() {
            return Collapsible::None;
        }
        match policy {
            ExpandPolicy::Collapsed => Collapsible::Collapsed,
            ExpandPolicy::AllExpanded => Collapsible::Expanded,
            ExpandPolicy::RememberLastState => {
                if self.engine.is_expanded(node.path()).await {
                    Collapsible::Expanded
                } else {
                    Collapsible::Collapsed
                }
            }
        }
    }

    pub async fn on_expand(&self, node: &Node) -> bool {
        node.is_folder() && self.engine.set_expanded(node.path(), true).await
    }

    pub async fn on_collapse(&self, node: &Node) -> bool {
        node.is_folder() && self.engine.set_expanded(node.path(), false).await
    }

    /// Clicking a workspace opens it with the tree's default target
    pub async fn activate(&self, node: &Node) -> Result<Selection, BrowserError> {
        self.engine.resolve_selection(node, Surface::Tree).await
    }

    /// Item button: open in the other window
    pub async fn activate_alternate(&self, node: &Node) -> Result<Selection, BrowserError> {
        self.engine.resolve_alternate(node, Surface::Tree).await
    }

    /// Flatten the tree, descending only into expanded folders.
    ///
    /// Notices from unreadable subfolders are collected, not fatal.
    pub async fn visible_rows(&self) -> (Vec<TreeRow>, Vec<BrowserError>) {
        let mut rows = Vec::new();
        let mut notices = Vec::new();

        let top = self.children(None).await;
        notices.extend(top.notice);
        // 用栈代替递归，逆序压栈保持显示顺序
        let mut stack: Vec<TreeRow> = top
            .items
            .into_iter()
            .rev()
            .map(|item| TreeRow { depth: 0, item })
            .collect();

        while let Some(row) = stack.pop() {
            if row.item.collapsible == Collapsible::Expanded {
                let children = self.children(Some(&row.item.node)).await;
                notices.extend(children.notice);
                let depth = row.depth + 1;
                stack.extend(
                    children
                        .items
                        .into_iter()
                        .rev()
                        .map(|item| TreeRow { depth, item }),
                );
            }
            rows.push(row);
        }
        (rows, notices)
    }
}
