//! BrowserEngine：浏览状态机
//!
//! 状态：`Idle`（未配置根目录）→ `Ready`（位于根目录）⇄ `Browsing`（位于子目录）。
//! 树视图与选择器共用同一套列举/选择入口；引擎是可 clone 的句柄，
//! 内部状态只在短暂持锁期间读写，目录读取期间不持锁。

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::browser::classify::{strip_marker, with_marker, Node};
use crate::browser::document::WorkspaceDocument;
use crate::browser::error::BrowserError;
use crate::browser::fs::FileSystem;
use crate::browser::lister::list_directory;
use crate::browser::navigation::{validate_child_name, NavigationState};
use crate::browser::watcher::{spawn_refresh_debouncer, ChangeWatchSupervisor, WatchBackend};
use crate::launch::Launcher;
use crate::store::settings::{OpenTarget, Settings, SettingsSource, Surface};
use crate::store::state::{StateStore, KEY_EXPANDED_FOLDERS, KEY_WORKSPACES_FOLDER};

/// 变更通知的缓冲大小
const CHANGE_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Ready,
    Browsing(PathBuf),
}

/// 引擎状态变化通知，仅在状态真正改变后发出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserChange {
    RootConfigured(PathBuf),
    PositionChanged(PathBuf),
    ExpandedChanged { path: PathBuf, expanded: bool },
    Refreshed,
}

/// 一次列举的结果；失败时 `nodes` 为空，`notice` 携带错误
#[derive(Debug)]
pub struct Listing {
    pub directory: Option<PathBuf>,
    pub nodes: Vec<Node>,
    pub notice: Option<BrowserError>,
}

impl Listing {
    fn failed(directory: Option<PathBuf>, error: BrowserError) -> Self {
        Self {
            directory,
            nodes: Vec::new(),
            notice: Some(error),
        }
    }
}

/// 用户选择的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Entered(PathBuf),
    Opened { path: PathBuf, target: OpenTarget },
}

/// 引擎依赖的外部能力
#[derive(Clone)]
pub struct Capabilities {
    pub fs: Arc<dyn FileSystem>,
    pub watch: Arc<dyn WatchBackend>,
    pub launcher: Arc<dyn Launcher>,
    pub settings: Arc<dyn SettingsSource>,
}

struct EngineInner {
    settings: Settings,
    navigation: Option<NavigationState>,
    supervisor: ChangeWatchSupervisor,
}

struct Shared {
    fs: Arc<dyn FileSystem>,
    launcher: Arc<dyn Launcher>,
    settings_source: Arc<dyn SettingsSource>,
    store: StateStore,
    debounce_ms: Arc<AtomicU64>,
    changes: broadcast::Sender<BrowserChange>,
    inner: Mutex<EngineInner>,
}

#[derive(Clone)]
pub struct BrowserEngine {
    shared: Arc<Shared>,
}

impl BrowserEngine {
    /// 创建引擎并恢复上次记住的根目录。必须在 tokio runtime 中调用。
    pub async fn start(caps: Capabilities, store: StateStore) -> Self {
        let settings = caps.settings.snapshot();
        let (signal_tx, signal_rx) = mpsc::channel(1);
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        let debounce_ms = Arc::new(AtomicU64::new(settings.tree.watch_debounce_ms));

        let shared = Arc::new(Shared {
            fs: caps.fs,
            launcher: caps.launcher,
            settings_source: caps.settings,
            store,
            debounce_ms: debounce_ms.clone(),
            changes,
            inner: Mutex::new(EngineInner {
                settings,
                navigation: None,
                supervisor: ChangeWatchSupervisor::new(caps.watch, signal_tx),
            }),
        });

        // 防抖任务只持有弱引用，引擎释放后自动退出
        let weak = Arc::downgrade(&shared);
        spawn_refresh_debouncer(signal_rx, debounce_ms, move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(shared) => {
                        BrowserEngine { shared }.refresh().await;
                        true
                    }
                    None => false,
                }
            }
        });

        let engine = BrowserEngine { shared };
        if let Some(root) = engine.shared.store.get::<String>(KEY_WORKSPACES_FOLDER).await {
            info!("Restoring workspaces folder: {}", root);
            engine.install_root(PathBuf::from(root)).await;
        }
        engine
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BrowserChange> {
        self.shared.changes.subscribe()
    }

    pub fn store(&self) -> &StateStore {
        &self.shared.store
    }

    pub async fn state(&self) -> EngineState {
        let inner = self.shared.inner.lock().await;
        match &inner.navigation {
            None => EngineState::Idle,
            Some(nav) if nav.is_at_root() => EngineState::Ready,
            Some(nav) => EngineState::Browsing(nav.current_directory().to_path_buf()),
        }
    }

    pub async fn root(&self) -> Option<PathBuf> {
        let inner = self.shared.inner.lock().await;
        inner.navigation.as_ref().map(|nav| nav.root().to_path_buf())
    }

    pub async fn current_directory(&self) -> Option<PathBuf> {
        let inner = self.shared.inner.lock().await;
        inner
            .navigation
            .as_ref()
            .map(|nav| nav.current_directory().to_path_buf())
    }

    /// 最近一次读取的配置快照
    pub async fn settings(&self) -> Settings {
        self.shared.inner.lock().await.settings.clone()
    }

    pub async fn is_watching(&self) -> bool {
        self.shared.inner.lock().await.supervisor.is_watching()
    }

    /// 设置根目录：任何状态都会回到根目录（Ready），并记住该目录
    pub async fn configure_root(&self, root: PathBuf) {
        info!("Configuring workspaces folder: {}", root.display());
        self.install_root(root.clone()).await;
        self.shared
            .store
            .set(KEY_WORKSPACES_FOLDER, &root.to_string_lossy().to_string())
            .await;
        self.emit(BrowserChange::RootConfigured(root));
    }

    async fn install_root(&self, root: PathBuf) {
        let expanded: Vec<String> = self
            .shared
            .store
            .get(KEY_EXPANDED_FOLDERS)
            .await
            .unwrap_or_default();

        let mut inner = self.shared.inner.lock().await;
        inner.navigation = Some(NavigationState::with_expanded(
            root.clone(),
            expanded.into_iter().map(PathBuf::from),
        ));
        let want_watch = inner.settings.tree.watch_for_changes;
        if let Err(e) = inner.supervisor.reconcile(want_watch, Some(&root)) {
            warn!("File watching disabled: {}", e);
        }
    }

    /// 列举某个位置的子项；`None` 表示当前目录
    pub async fn list_children(&self, position: Option<&Path>) -> Listing {
        let (directory, sort) = {
            let inner = self.shared.inner.lock().await;
            let nav = match &inner.navigation {
                Some(nav) => nav,
                None => return Listing::failed(None, BrowserError::NotConfigured),
            };
            let directory = match position {
                None => nav.current_directory().to_path_buf(),
                Some(path) if nav.contains(path) => path.to_path_buf(),
                Some(path) => {
                    warn!("Refusing to list outside the workspaces folder: {:?}", path);
                    return Listing::failed(
                        Some(path.to_path_buf()),
                        BrowserError::OutOfBounds(path.to_path_buf()),
                    );
                }
            };
            (directory, inner.settings.general.sort)
        };

        match list_directory(self.shared.fs.as_ref(), &directory, sort).await {
            Ok(nodes) => Listing {
                directory: Some(directory),
                nodes,
                notice: None,
            },
            Err(e) => {
                warn!("{}", e);
                Listing::failed(Some(directory), e)
            }
        }
    }

    /// 在宿主中打开工作空间文件，不改变浏览状态
    pub fn open_workspace(&self, path: &Path, target: OpenTarget) -> Result<(), BrowserError> {
        info!("Opening workspace {:?} in {:?}", path, target);
        self.shared.launcher.launch(path, target)?;
        Ok(())
    }

    /// 进入文件夹节点。越界时回到根目录并返回 `OutOfBounds`
    pub async fn enter(&self, node: &Node) -> Result<PathBuf, BrowserError> {
        if !node.is_folder() {
            return Err(BrowserError::NotAFolder(node.path().to_path_buf()));
        }

        let mut inner = self.shared.inner.lock().await;
        let nav = inner
            .navigation
            .as_mut()
            .ok_or(BrowserError::NotConfigured)?;
        match nav.enter(node.path()) {
            Ok(path) => {
                drop(inner);
                debug!("Entered {:?}", path);
                self.emit(BrowserChange::PositionChanged(path.clone()));
                Ok(path)
            }
            Err(e) => {
                warn!("{}; back to the workspaces folder", e);
                let was_at_root = nav.is_at_root();
                nav.reset();
                let root = nav.root().to_path_buf();
                drop(inner);
                if !was_at_root {
                    self.emit(BrowserChange::PositionChanged(root));
                }
                Err(BrowserError::OutOfBounds(node.path().to_path_buf()))
            }
        }
    }

    /// 返回上一级；已在根目录时为空操作
    pub async fn back(&self) -> Result<PathBuf, BrowserError> {
        let mut inner = self.shared.inner.lock().await;
        let nav = inner
            .navigation
            .as_mut()
            .ok_or(BrowserError::NotConfigured)?;
        match nav.ascend() {
            Ok(path) => {
                drop(inner);
                self.emit(BrowserChange::PositionChanged(path.clone()));
                Ok(path)
            }
            Err(_) => Ok(nav.current_directory().to_path_buf()),
        }
    }

    /// 重新读取配置快照并重新列举当前位置，位置不变。
    ///
    /// 配置变化时也应调用此方法：会重新协调文件监控。
    pub async fn refresh(&self) -> Listing {
        let settings = self.shared.settings_source.snapshot();
        {
            let mut inner = self.shared.inner.lock().await;
            if inner.settings != settings {
                debug!("Settings changed");
            }
            self.shared
                .debounce_ms
                .store(settings.tree.watch_debounce_ms, Ordering::Relaxed);
            let root = inner.navigation.as_ref().map(|nav| nav.root().to_path_buf());
            if let Err(e) = inner
                .supervisor
                .reconcile(settings.tree.watch_for_changes, root.as_deref())
            {
                warn!("File watching disabled: {}", e);
            }
            inner.settings = settings;
        }

        let listing = self.list_children(None).await;
        self.emit(BrowserChange::Refreshed);
        listing
    }

    /// 在 `parent` 下新建文件夹，随后刷新
    pub async fn create_folder(&self, parent: &Path, name: &str) -> Result<PathBuf, BrowserError> {
        validate_child_name(name).map_err(BrowserError::InvalidName)?;
        self.check_inside_root(parent).await?;

        let path = parent.join(name);
        self.shared
            .fs
            .create_directory(&path)
            .await
            .map_err(|e| BrowserError::create_failed(&path, e))?;
        info!("Created folder {:?}", path);

        self.refresh().await;
        Ok(path)
    }

    /// 在 `parent` 下新建工作空间文件并在当前窗口打开。
    ///
    /// 文件内容列出宿主当前打开的文件夹；写入失败时不会打开。
    /// 打开失败时文件保留，列表照常刷新，返回 `Launch` 错误。
    pub async fn create_workspace(
        &self,
        parent: &Path,
        name: &str,
    ) -> Result<PathBuf, BrowserError> {
        let file_name = match strip_marker(name) {
            Some(_) => name.to_string(),
            None => with_marker(name),
        };
        validate_child_name(&file_name).map_err(BrowserError::InvalidName)?;
        if strip_marker(&file_name).map_or(true, str::is_empty) {
            return Err(BrowserError::InvalidName(
                "workspace name must not be empty".to_string(),
            ));
        }
        self.check_inside_root(parent).await?;

        let path = parent.join(&file_name);
        let document = WorkspaceDocument::from_folders(&self.shared.launcher.open_folders());
        let contents = document.to_pretty_json().map_err(|e| {
            BrowserError::create_failed(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        self.shared
            .fs
            .write_file(&path, &contents)
            .await
            .map_err(|e| BrowserError::create_failed(&path, e))?;
        info!(
            "Created workspace {:?} with {} folder(s)",
            path,
            document.folders.len()
        );

        // 文件已写入：无论能否打开都要刷新，列表与磁盘保持一致
        let launched = self.open_workspace(&path, OpenTarget::CurrentWindow);
        self.refresh().await;
        launched?;
        Ok(path)
    }

    /// 树视图与选择器共用的选择入口
    pub async fn resolve_selection(
        &self,
        node: &Node,
        surface: Surface,
    ) -> Result<Selection, BrowserError> {
        let target = self.settings().await.open_target(surface);
        self.select_with(node, target).await
    }

    /// 条目按钮：用与默认相反的窗口打开
    pub async fn resolve_alternate(
        &self,
        node: &Node,
        surface: Surface,
    ) -> Result<Selection, BrowserError> {
        let target = self.settings().await.open_target(surface).opposite();
        self.select_with(node, target).await
    }

    async fn select_with(&self, node: &Node, target: OpenTarget) -> Result<Selection, BrowserError> {
        match node {
            Node::Folder { .. } => self.enter(node).await.map(Selection::Entered),
            Node::WorkspaceFile { path, .. } => {
                self.open_workspace(path, target)?;
                Ok(Selection::Opened {
                    path: path.clone(),
                    target,
                })
            }
        }
    }

    pub async fn is_expanded(&self, path: &Path) -> bool {
        let inner = self.shared.inner.lock().await;
        inner
            .navigation
            .as_ref()
            .map_or(false, |nav| nav.is_expanded(path))
    }

    /// 记录文件夹展开/折叠，变化时立即持久化
    pub async fn set_expanded(&self, path: &Path, expanded: bool) -> bool {
        // 持锁写入 store，保证快照按修改顺序落盘（store 不会反过来获取 inner）
        let mut inner = self.shared.inner.lock().await;
        let nav = match inner.navigation.as_mut() {
            Some(nav) => nav,
            None => return false,
        };
        if !nav.contains(path) || !nav.set_expanded(path, expanded) {
            return false;
        }
        let paths: Vec<String> = nav
            .expanded_paths()
            .map(|p| p.to_string_lossy().to_string())
            .collect();
        self.shared.store.set(KEY_EXPANDED_FOLDERS, &paths).await;
        drop(inner);

        self.emit(BrowserChange::ExpandedChanged {
            path: path.to_path_buf(),
            expanded,
        });
        true
    }

    async fn check_inside_root(&self, path: &Path) -> Result<(), BrowserError> {
        let inner = self.shared.inner.lock().await;
        let nav = inner
            .navigation
            .as_ref()
            .ok_or(BrowserError::NotConfigured)?;
        if nav.contains(path) {
            Ok(())
        } else {
            Err(BrowserError::OutOfBounds(path.to_path_buf()))
        }
    }

    fn emit(&self, change: BrowserChange) {
        // 没有订阅者时发送失败，忽略即可
        let _ = self.shared.changes.send(change);
    }
}
