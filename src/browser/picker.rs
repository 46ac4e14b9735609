//! 选择器会话（扁平列表，逐级进入）
//!
//! 同一会话内同时只允许一次目录读取：读取进行中时再次 `show` 直接返回 `None`；
//! 读取完成后若用户已经跳到别的目录，结果作废。

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::browser::classify::Node;
use crate::browser::engine::{BrowserEngine, Selection};
use crate::browser::error::BrowserError;
use crate::store::settings::Surface;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerItem {
    /// 返回上一级的 `..` 条目
    Parent { path: PathBuf },
    Entry(Node),
}

impl PickerItem {
    pub fn label(&self) -> &str {
        match self {
            PickerItem::Parent { .. } => "..",
            PickerItem::Entry(node) => node.display_name(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PickerItem::Parent { .. } => "Folder",
            PickerItem::Entry(node) if node.is_folder() => "Folder",
            PickerItem::Entry(_) => "Workspace",
        }
    }
}

#[derive(Debug)]
pub struct PickerView {
    pub directory: PathBuf,
    pub at_root: bool,
    pub items: Vec<PickerItem>,
    pub notice: Option<BrowserError>,
}

/// 读取结束时清除 busy 标记
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct PickerSession {
    engine: BrowserEngine,
    busy: Arc<AtomicBool>,
}

impl PickerSession {
    pub fn new(engine: BrowserEngine) -> Self {
        Self {
            engine,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// 列出当前目录。读取进行中或结果已过期时返回 `None`
    pub async fn show(&self) -> Option<PickerView> {
        if self.busy.swap(true, Ordering::SeqCst) {
            debug!("Picker listing already in flight, skipping");
            return None;
        }
        let _guard = BusyGuard(&self.busy);

        let listing = self.engine.list_children(None).await;
        let current = self.engine.current_directory().await;
        if listing.directory != current {
            debug!(
                "Discarding stale listing of {:?}, now at {:?}",
                listing.directory, current
            );
            return None;
        }

        // 未配置根目录：没有目录可显示，只带提示
        let directory = match listing.directory {
            Some(directory) => directory,
            None => {
                return Some(PickerView {
                    directory: PathBuf::new(),
                    at_root: true,
                    items: Vec::new(),
                    notice: listing.notice,
                })
            }
        };

        let at_root = self.engine.root().await.as_ref() == Some(&directory);
        let mut items = Vec::with_capacity(listing.nodes.len() + 1);
        if !at_root {
            if let Some(parent) = directory.parent() {
                items.push(PickerItem::Parent {
                    path: parent.to_path_buf(),
                });
            }
        }
        items.extend(listing.nodes.into_iter().map(PickerItem::Entry));

        Some(PickerView {
            directory,
            at_root,
            items,
            notice: listing.notice,
        })
    }

    pub async fn select(&self, item: &PickerItem) -> Result<Selection, BrowserError> {
        match item {
            PickerItem::Parent { .. } => self.engine.back().await.map(Selection::Entered),
            PickerItem::Entry(node) => self.engine.resolve_selection(node, Surface::Picker).await,
        }
    }

    /// 条目按钮：用与默认相反的窗口打开
    pub async fn select_alternate(&self, item: &PickerItem) -> Result<Selection, BrowserError> {
        match item {
            PickerItem::Parent { .. } => self.engine.back().await.map(Selection::Entered),
            PickerItem::Entry(node) => self.engine.resolve_alternate(node, Surface::Picker).await,
        }
    }

    pub async fn back(&self) -> Result<PathBuf, BrowserError> {
        self.engine.back().await
    }

    pub async fn new_folder(&self, name: &str) -> Result<PathBuf, BrowserError> {
        let current = self.current().await?;
        self.engine.create_folder(&current, name).await
    }

    pub async fn new_workspace(&self, name: &str) -> Result<PathBuf, BrowserError> {
        let current = self.current().await?;
        self.engine.create_workspace(&current, name).await
    }

    async fn current(&self) -> Result<PathBuf, BrowserError> {
        self.engine
            .current_directory()
            .await
            .ok_or(BrowserError::NotConfigured)
    }

    pub fn engine(&self) -> &BrowserEngine {
        &self.engine
    }
}
