//! StateSaver：后台防抖持久化 actor
//!
//! 通过 channel 接收保存信号，500ms 防抖窗口内合并多次请求为一次磁盘写入。
//! 所有写入（包括显式 flush）都经过同一把写锁，保证不会交错写文件。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, error, info};

use super::state::{GlobalState, StateError};

const SAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// 启动 StateSaver 后台 actor，返回用于触发保存的 Sender。
///
/// 每次向返回的 `Sender` 发送 `()` 即表示"状态已变更，请持久化"。
/// channel 关闭时会执行最后一次保存。
pub fn spawn_state_saver(
    state: Arc<RwLock<GlobalState>>,
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
) -> mpsc::Sender<()> {
    let (tx, mut rx) = mpsc::channel::<()>(32);

    tokio::spawn(async move {
        loop {
            // 等待第一个保存信号
            if rx.recv().await.is_none() {
                log_result(save_now(&state, &path, &write_lock).await);
                info!("StateSaver: channel closed, final save done");
                return;
            }

            // 进入防抖窗口：窗口内收到新信号则重置计时器
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(SAVE_DEBOUNCE) => break,
                    result = rx.recv() => {
                        if result.is_none() {
                            log_result(save_now(&state, &path, &write_lock).await);
                            info!("StateSaver: channel closed during debounce, final save done");
                            return;
                        }
                    }
                }
            }

            log_result(save_now(&state, &path, &write_lock).await);
        }
    });

    tx
}

/// 短暂持锁 clone 状态，然后在 spawn_blocking 中序列化并原子写入磁盘
pub(crate) async fn save_now(
    state: &Arc<RwLock<GlobalState>>,
    path: &Path,
    write_lock: &Arc<Mutex<()>>,
) -> Result<(), StateError> {
    let _guard = write_lock.lock().await;

    let mut guard = state.write().await;
    let now = chrono::Utc::now();
    guard.last_updated = Some(now);
    let snapshot = guard.clone();
    drop(guard);

    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomically(&path, &snapshot))
        .await
        .map_err(|e| StateError::WriteError(format!("save task failed: {}", e)))?
}

fn write_atomically(path: &Path, snapshot: &GlobalState) -> Result<(), StateError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StateError::WriteError(e.to_string()))?;
    }
    let content =
        serde_json::to_string_pretty(snapshot).map_err(|e| StateError::WriteError(e.to_string()))?;

    // 先写临时文件再 rename
    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, content).map_err(|e| StateError::WriteError(e.to_string()))?;
    std::fs::rename(&temp_path, path).map_err(|e| StateError::WriteError(e.to_string()))
}

fn log_result(result: Result<(), StateError>) {
    match result {
        Ok(()) => debug!("State saved to disk (debounced)"),
        Err(e) => error!("StateSaver: {}", e),
    }
}
