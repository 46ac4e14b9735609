//! 文件监控模块
//!
//! 使用 notify crate 监控工作空间根目录，支持：
//! - 按配置开关启动/停止监控（reconcile 幂等）
//! - 只关心结构变化（创建、删除、重命名），忽略内容修改
//! - 防抖聚合：一批连续事件只触发一次刷新

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),
    #[error("Failed to watch {}: {source}", path.display())]
    WatchFailed {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// 文件系统事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsEventKind {
    Created,
    Deleted,
    Renamed,
    Modified,
}

impl FsEventKind {
    /// 内容修改不算结构变化
    pub fn is_structural(self) -> bool {
        !matches!(self, FsEventKind::Modified)
    }

    fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(FsEventKind::Created),
            EventKind::Remove(_) => Some(FsEventKind::Deleted),
            EventKind::Modify(ModifyKind::Name(_)) => Some(FsEventKind::Renamed),
            EventKind::Modify(_) => Some(FsEventKind::Modified),
            _ => None,
        }
    }
}

/// 事件回调，由监控线程调用
pub type EventSink = Arc<dyn Fn(FsEventKind) + Send + Sync>;

/// 活动中的监控句柄；丢弃即停止监控
pub trait WatchHandle: Send {
    fn dispose(self: Box<Self>) {}
}

/// Watch capability: recursive watch on a directory
pub trait WatchBackend: Send + Sync {
    fn watch(&self, root: &Path, sink: EventSink) -> Result<Box<dyn WatchHandle>, WatchError>;
}

/// notify 实现
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyBackend;

struct NotifyHandle {
    _watcher: RecommendedWatcher,
}

impl WatchHandle for NotifyHandle {}

impl WatchBackend for NotifyBackend {
    fn watch(&self, root: &Path, sink: EventSink) -> Result<Box<dyn WatchHandle>, WatchError> {
        // 验证路径存在
        if !root.exists() {
            return Err(WatchError::PathNotFound(root.to_path_buf()));
        }

        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if let Some(kind) = FsEventKind::from_notify(&event.kind) {
                        sink(kind);
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            })
            .map_err(|source| WatchError::WatchFailed {
                path: root.to_path_buf(),
                source,
            })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::WatchFailed {
                path: root.to_path_buf(),
                source,
            })?;

        Ok(Box::new(NotifyHandle { _watcher: watcher }))
    }
}

struct ActiveWatch {
    root: PathBuf,
    handle: Box<dyn WatchHandle>,
}

/// 根目录监控器
///
/// 句柄存在当且仅当监控开关打开且配置了根目录。
/// 结构变化通过容量为 1 的信号通道送出，由 [`spawn_refresh_debouncer`] 合并。
pub struct ChangeWatchSupervisor {
    backend: Arc<dyn WatchBackend>,
    signal_tx: mpsc::Sender<()>,
    active: Option<ActiveWatch>,
}

impl ChangeWatchSupervisor {
    pub fn new(backend: Arc<dyn WatchBackend>, signal_tx: mpsc::Sender<()>) -> Self {
        Self {
            backend,
            signal_tx,
            active: None,
        }
    }

    /// 按当前配置启动或停止监控，返回句柄是否发生变化。
    ///
    /// 输入不变时重复调用是空操作；根目录变化时先停止旧监控再建立新监控。
    pub fn reconcile(&mut self, want_watch: bool, root: Option<&Path>) -> Result<bool, WatchError> {
        let root = match (want_watch, root) {
            (true, Some(root)) => root,
            _ => return Ok(self.stop()),
        };

        if let Some(active) = &self.active {
            if active.root == root {
                return Ok(false);
            }
        }
        self.stop();

        info!("Watching workspaces folder: {}", root.display());
        let signal_tx = self.signal_tx.clone();
        let sink: EventSink = Arc::new(move |kind: FsEventKind| {
            if kind.is_structural() {
                // 通道已满说明已有待处理的刷新信号
                let _ = signal_tx.try_send(());
            }
        });

        match self.backend.watch(root, sink) {
            Ok(handle) => {
                self.active = Some(ActiveWatch {
                    root: root.to_path_buf(),
                    handle,
                });
                Ok(true)
            }
            Err(e) => {
                // 旧句柄已释放，状态仍然一致（无句柄）
                warn!("Failed to watch {}: {}", root.display(), e);
                Err(e)
            }
        }
    }

    /// 停止监控，返回是否真的释放了句柄
    pub fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                info!("Stopped watching: {}", active.root.display());
                active.handle.dispose();
                true
            }
            None => false,
        }
    }

    pub fn is_watching(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for ChangeWatchSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 启动防抖任务：收到第一个信号后进入窗口，窗口内的新信号重置计时器，
/// 窗口结束时调用一次 `on_refresh`。`on_refresh` 返回 false 时任务退出。
pub fn spawn_refresh_debouncer<F, Fut>(
    mut rx: mpsc::Receiver<()>,
    window_ms: Arc<AtomicU64>,
    on_refresh: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            // 等待第一个信号
            if rx.recv().await.is_none() {
                debug!("Refresh signal channel closed, exiting debouncer");
                return;
            }

            loop {
                let window = Duration::from_millis(window_ms.load(Ordering::Relaxed));
                tokio::select! {
                    _ = tokio::time::sleep(window) => break,
                    result = rx.recv() => {
                        if result.is_none() {
                            return;
                        }
                    }
                }
            }

            debug!("Structural change settled, refreshing");
            if !on_refresh().await {
                return;
            }
        }
    })
}
