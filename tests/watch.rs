//! Real file-system watching through notify

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::RecordingLauncher;
use tokio::time::timeout;
use workspace_wizard::browser::{BrowserChange, BrowserEngine, Capabilities, LocalFileSystem, NotifyBackend};
use workspace_wizard::store::{MemorySettings, Settings, StateStore};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_external_delete_refreshes_once() {
    let dir = tempfile::tempdir().unwrap();
    let root = std::fs::canonicalize(dir.path()).unwrap().join("ws");
    std::fs::create_dir(&root).unwrap();
    std::fs::create_dir(root.join("alpha")).unwrap();
    std::fs::write(root.join("beta.code-workspace"), "{}").unwrap();

    let mut settings = Settings::default();
    settings.tree.watch_debounce_ms = 200;
    let caps = Capabilities {
        fs: Arc::new(LocalFileSystem),
        watch: Arc::new(NotifyBackend),
        launcher: Arc::new(RecordingLauncher::default()),
        settings: Arc::new(MemorySettings::new(settings)),
    };
    let engine = BrowserEngine::start(caps, StateStore::in_memory()).await;
    engine.configure_root(root.clone()).await;
    assert!(engine.is_watching().await);

    let mut changes = engine.subscribe();
    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::remove_dir(root.join("alpha")).unwrap();

    let first = timeout(Duration::from_secs(5), async {
        loop {
            match changes.recv().await {
                Ok(BrowserChange::Refreshed) => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
    })
    .await;
    assert_eq!(first, Ok(true));

    // 事件已在防抖窗口内合并，不会再有第二次刷新
    let second = timeout(Duration::from_millis(800), changes.recv()).await;
    assert!(second.is_err(), "unexpected change: {:?}", second);

    let listing = engine.list_children(None).await;
    let names: Vec<_> = listing.nodes.iter().map(|n| n.display_name()).collect();
    assert_eq!(names, vec!["beta"]);
}
