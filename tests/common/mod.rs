//! Shared fakes and engine setup for integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use workspace_wizard::browser::fs::{DirEntry, FileSystem, LocalFileSystem};
use workspace_wizard::browser::watcher::{EventSink, FsEventKind, WatchBackend, WatchError, WatchHandle};
use workspace_wizard::browser::{BrowserEngine, Capabilities};
use workspace_wizard::launch::{LaunchError, Launcher};
use workspace_wizard::store::{MemorySettings, OpenTarget, Settings, StateStore};

/// Watch backend that only counts handles; events are pushed with `emit`
#[derive(Default)]
pub struct FakeWatch {
    pub active: Arc<AtomicUsize>,
    sinks: Mutex<Vec<EventSink>>,
}

struct FakeHandle(Arc<AtomicUsize>);

impl WatchHandle for FakeHandle {}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeWatch {
    pub fn emit(&self, kind: FsEventKind) {
        if let Some(sink) = self.sinks.lock().unwrap().last() {
            sink(kind);
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl WatchBackend for FakeWatch {
    fn watch(&self, _root: &Path, sink: EventSink) -> Result<Box<dyn WatchHandle>, WatchError> {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().unwrap().push(sink);
        Ok(Box::new(FakeHandle(self.active.clone())))
    }
}

/// Records launches instead of starting an editor
#[derive(Default)]
pub struct RecordingLauncher {
    pub folders: Vec<PathBuf>,
    failing: AtomicBool,
    launched: Mutex<Vec<(PathBuf, OpenTarget)>>,
}

impl RecordingLauncher {
    pub fn with_folders(folders: Vec<PathBuf>) -> Self {
        Self {
            folders,
            ..Self::default()
        }
    }

    /// Make every following launch fail as if the editor could not start
    pub fn fail_launches(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn launched(&self) -> Vec<(PathBuf, OpenTarget)> {
        self.launched.lock().unwrap().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, path: &Path, target: OpenTarget) -> Result<(), LaunchError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LaunchError::SpawnFailed {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        self.launched
            .lock()
            .unwrap()
            .push((path.to_path_buf(), target));
        Ok(())
    }

    fn open_folders(&self) -> Vec<PathBuf> {
        self.folders.clone()
    }
}

/// Local file system whose directory reads can be held at a gate
pub struct GatedFs {
    pub closed: AtomicBool,
    pub waiting: AtomicUsize,
    gate: Arc<Semaphore>,
}

impl Default for GatedFs {
    fn default() -> Self {
        Self {
            closed: AtomicBool::new(false),
            waiting: AtomicUsize::new(0),
            gate: Arc::new(Semaphore::new(0)),
        }
    }
}

impl GatedFs {
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Let one held read through
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn open(&self) {
        self.closed.store(false, Ordering::SeqCst);
        self.gate.add_permits(self.waiting.load(Ordering::SeqCst).max(1));
    }
}

#[async_trait]
impl FileSystem for GatedFs {
    async fn read_directory(&self, path: &Path) -> std::io::Result<Vec<DirEntry>> {
        if self.closed.load(Ordering::SeqCst) {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            self.gate.acquire().await.unwrap().forget();
            self.waiting.fetch_sub(1, Ordering::SeqCst);
        }
        LocalFileSystem.read_directory(path).await
    }

    async fn create_directory(&self, path: &Path) -> std::io::Result<()> {
        LocalFileSystem.create_directory(path).await
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        LocalFileSystem.write_file(path, contents).await
    }
}

pub struct Harness {
    pub engine: BrowserEngine,
    pub watch: Arc<FakeWatch>,
    pub launcher: Arc<RecordingLauncher>,
    pub settings: Arc<MemorySettings>,
    pub store: StateStore,
    pub root: PathBuf,
    pub dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with(Settings::default(), Vec::new(), None).await
    }

    pub async fn with(
        settings: Settings,
        folders: Vec<PathBuf>,
        fs: Option<Arc<dyn FileSystem>>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("ws");
        std::fs::create_dir(&root).unwrap();

        let watch = Arc::new(FakeWatch::default());
        let launcher = Arc::new(RecordingLauncher::with_folders(folders));
        let settings = Arc::new(MemorySettings::new(settings));
        let store = StateStore::in_memory();
        let caps = Capabilities {
            fs: fs.unwrap_or_else(|| Arc::new(LocalFileSystem)),
            watch: watch.clone(),
            launcher: launcher.clone(),
            settings: settings.clone(),
        };
        let engine = BrowserEngine::start(caps, store.clone()).await;

        Self {
            engine,
            watch,
            launcher,
            settings,
            store,
            root,
            dir,
        }
    }

    /// A second engine over the same state store, as after a restart
    pub async fn restart(&self) -> BrowserEngine {
        let caps = Capabilities {
            fs: Arc::new(LocalFileSystem),
            watch: self.watch.clone(),
            launcher: self.launcher.clone(),
            settings: self.settings.clone(),
        };
        BrowserEngine::start(caps, self.store.clone()).await
    }

    /// `ws/alpha/`, `ws/beta.code-workspace`, `ws/notes.txt`
    pub fn populate(&self) {
        std::fs::create_dir(self.root.join("alpha")).unwrap();
        std::fs::write(self.root.join("beta.code-workspace"), "{}").unwrap();
        std::fs::write(self.root.join("notes.txt"), "hello").unwrap();
    }

    pub async fn configured(self) -> Self {
        self.engine.configure_root(self.root.clone()).await;
        self
    }
}
