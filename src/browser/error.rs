//! 浏览器错误类型
//!
//! 所有错误都是局部的：上报一次，状态保持一致，不会让宿主进程退出。

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::browser::watcher::WatchError;
use crate::launch::LaunchError;

/// 导航越界 / 已在根目录
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Path escapes workspaces folder: {0}")]
    OutOfBounds(PathBuf),
    #[error("Already at the workspaces folder")]
    AtRoot,
}

/// 统一浏览器错误类型
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Unable to open {}: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to create {}: {source}", path.display())]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No workspaces folder is configured")]
    NotConfigured,

    #[error("Path escapes workspaces folder: {}", .0.display())]
    OutOfBounds(PathBuf),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Not a folder: {}", .0.display())]
    NotAFolder(PathBuf),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Watch(#[from] WatchError),
}

impl BrowserError {
    pub(crate) fn unreadable(path: &Path, source: std::io::Error) -> Self {
        BrowserError::DirectoryUnreadable {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn create_failed(path: &Path, source: std::io::Error) -> Self {
        BrowserError::CreateFailed {
            path: path.to_path_buf(),
            source,
        }
    }

    /// 稳定的错误码，供前端区分展示方式
    pub fn code(&self) -> &str {
        match self {
            BrowserError::DirectoryUnreadable { .. } => "directory_unreadable",
            BrowserError::CreateFailed { .. } => "create_failed",
            BrowserError::NotConfigured => "not_configured",
            BrowserError::OutOfBounds(_) => "out_of_bounds",
            BrowserError::InvalidName(_) => "invalid_name",
            BrowserError::NotAFolder(_) => "not_a_folder",
            BrowserError::Launch(_) => "launch_failed",
            BrowserError::Watch(_) => "watch_failed",
        }
    }

    /// 面向用户的提示文本
    pub fn notice(&self) -> String {
        match self {
            BrowserError::NotConfigured => {
                "Run the command 'select-root' to choose a workspaces folder".to_string()
            }
            BrowserError::DirectoryUnreadable { path, .. } => format!(
                "Unable to open {}. Run 'select-root' if the workspaces folder moved",
                path.display()
            ),
            other => other.to_string(),
        }
    }
}
