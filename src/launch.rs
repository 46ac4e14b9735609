//! Launch capability: open a workspace file in the host editor

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::info;

use crate::store::settings::OpenTarget;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Editor command not found: {0}")]
    EditorNotFound(String),
    #[error("Failed to launch {}: {source}", path.display())]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Host environment the browser opens workspaces in.
pub trait Launcher: Send + Sync {
    /// Open `path`, replacing the current session or starting a new one.
    fn launch(&self, path: &Path, target: OpenTarget) -> Result<(), LaunchError>;

    /// Folders open in the current host session, used as the body of new workspaces.
    fn open_folders(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Launches the `code` command line
#[derive(Debug, Clone)]
pub struct CodeLauncher {
    program: PathBuf,
    open_folders: Vec<PathBuf>,
}

impl CodeLauncher {
    /// 按 `WORKSPACE_WIZARD_EDITOR` 或 PATH 中的 `code` 查找编辑器
    pub fn discover(open_folders: Vec<PathBuf>) -> Result<Self, LaunchError> {
        let name = std::env::var("WORKSPACE_WIZARD_EDITOR").unwrap_or_else(|_| "code".to_string());
        let program = which::which(&name).map_err(|_| LaunchError::EditorNotFound(name))?;
        Ok(Self::new(program, open_folders))
    }

    pub fn new(program: PathBuf, open_folders: Vec<PathBuf>) -> Self {
        Self {
            program,
            open_folders,
        }
    }

    fn window_flag(target: OpenTarget) -> &'static str {
        match target {
            OpenTarget::CurrentWindow => "--reuse-window",
            OpenTarget::NewWindow => "--new-window",
        }
    }
}

impl Launcher for CodeLauncher {
    fn launch(&self, path: &Path, target: OpenTarget) -> Result<(), LaunchError> {
        info!("Opening {:?} ({:?}) with {:?}", path, target, self.program);
        Command::new(&self.program)
            .arg(Self::window_flag(target))
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_child| ())
            .map_err(|source| LaunchError::SpawnFailed {
                path: path.to_path_buf(),
                source,
            })
    }

    fn open_folders(&self) -> Vec<PathBuf> {
        self.open_folders.clone()
    }
}
