//! Tree and picker surfaces over a shared engine

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{GatedFs, Harness};
use workspace_wizard::browser::{
    BrowserError, Collapsible, FileSystem, PickerItem, PickerSession, Selection, TreeSurface,
};
use workspace_wizard::store::{ExpandPolicy, OpenTarget, Settings};

fn nested(h: &Harness) {
    h.populate();
    std::fs::create_dir(h.root.join("alpha").join("deep")).unwrap();
    std::fs::write(h.root.join("alpha").join("inner.code-workspace"), "{}").unwrap();
}

async fn harness_with_expand(policy: ExpandPolicy) -> Harness {
    let mut settings = Settings::default();
    settings.tree.expand = policy;
    let h = Harness::with(settings, Vec::new(), None).await.configured().await;
    nested(&h);
    h
}

/// Wait until a read is parked at the gate
async fn wait_for_parked_read(fs: &GatedFs) {
    for _ in 0..200 {
        if fs.waiting.load(Ordering::SeqCst) > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("read never reached the gate");
}

#[tokio::test]
async fn test_tree_without_root() {
    let h = Harness::new().await;
    let tree = TreeSurface::new(h.engine.clone());
    let children = tree.children(None).await;
    assert!(children.items.is_empty());
    assert!(matches!(children.notice, Some(BrowserError::NotConfigured)));
}

#[tokio::test]
async fn test_tree_collapsed_policy() {
    let h = harness_with_expand(ExpandPolicy::Collapsed).await;
    let tree = TreeSurface::new(h.engine.clone());

    let children = tree.children(None).await;
    let states: Vec<_> = children
        .items
        .iter()
        .map(|i| (i.node.display_name().to_string(), i.collapsible))
        .collect();
    assert_eq!(
        states,
        vec![
            ("alpha".to_string(), Collapsible::Collapsed),
            ("beta".to_string(), Collapsible::None),
        ]
    );

    let (rows, notices) = tree.visible_rows().await;
    assert!(notices.is_empty());
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_tree_all_expanded_policy() {
    let h = harness_with_expand(ExpandPolicy::AllExpanded).await;
    let tree = TreeSurface::new(h.engine.clone());

    let (rows, _) = tree.visible_rows().await;
    let flat: Vec<_> = rows
        .iter()
        .map(|r| (r.depth, r.item.node.display_name().to_string()))
        .collect();
    assert_eq!(
        flat,
        vec![
            (0, "alpha".to_string()),
            (1, "deep".to_string()),
            (1, "inner".to_string()),
            (0, "beta".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_tree_remembers_expanded_folders() {
    let h = harness_with_expand(ExpandPolicy::RememberLastState).await;
    let tree = TreeSurface::new(h.engine.clone());

    let alpha = tree.children(None).await.items[0].node.clone();
    assert!(tree.on_expand(&alpha).await);

    let children = tree.children(None).await;
    assert_eq!(children.items[0].collapsible, Collapsible::Expanded);
    let (rows, _) = tree.visible_rows().await;
    assert_eq!(rows.len(), 4);

    // 重启后仍然展开
    let restarted = TreeSurface::new(h.restart().await);
    assert_eq!(
        restarted.children(None).await.items[0].collapsible,
        Collapsible::Expanded
    );

    assert!(tree.on_collapse(&alpha).await);
    assert_eq!(tree.visible_rows().await.0.len(), 2);

    // 工作空间不能展开
    let beta = tree.children(None).await.items[1].node.clone();
    assert!(!tree.on_expand(&beta).await);
}

#[tokio::test]
async fn test_tree_activation_uses_tree_target() {
    let mut settings = Settings::default();
    settings.tree.open_target = OpenTarget::NewWindow;
    let h = Harness::with(settings, Vec::new(), None).await.configured().await;
    h.populate();
    let tree = TreeSurface::new(h.engine.clone());

    let beta = tree.children(None).await.items[1].node.clone();
    tree.activate(&beta).await.unwrap();
    tree.activate_alternate(&beta).await.unwrap();
    let beta_path = h.root.join("beta.code-workspace");
    assert_eq!(
        h.launcher.launched(),
        vec![
            (beta_path.clone(), OpenTarget::NewWindow),
            (beta_path, OpenTarget::CurrentWindow),
        ]
    );
}

#[tokio::test]
async fn test_picker_navigation() {
    let h = Harness::new().await.configured().await;
    nested(&h);
    let picker = PickerSession::new(h.engine.clone());

    let view = picker.show().await.unwrap();
    assert!(view.at_root);
    let labels: Vec<_> = view.items.iter().map(|i| i.label().to_string()).collect();
    assert_eq!(labels, vec!["alpha", "beta"]);
    assert_eq!(view.items[0].description(), "Folder");
    assert_eq!(view.items[1].description(), "Workspace");

    let entered = picker.select(&view.items[0]).await.unwrap();
    assert_eq!(entered, Selection::Entered(h.root.join("alpha")));

    let view = picker.show().await.unwrap();
    assert!(!view.at_root);
    assert_eq!(view.directory, h.root.join("alpha"));
    assert_eq!(
        view.items[0],
        PickerItem::Parent {
            path: h.root.clone()
        }
    );
    let labels: Vec<_> = view.items.iter().map(|i| i.label().to_string()).collect();
    assert_eq!(labels, vec!["..", "deep", "inner"]);

    let created = picker.new_workspace("sub").await.unwrap();
    assert_eq!(created, h.root.join("alpha").join("sub.code-workspace"));

    let back = picker.select(&view.items[0]).await.unwrap();
    assert_eq!(back, Selection::Entered(h.root.clone()));
    assert!(picker.show().await.unwrap().at_root);
}

#[tokio::test]
async fn test_picker_without_root() {
    let h = Harness::new().await;
    let picker = PickerSession::new(h.engine.clone());
    let view = picker.show().await.unwrap();
    assert!(view.items.is_empty());
    assert!(matches!(view.notice, Some(BrowserError::NotConfigured)));
    assert!(matches!(
        picker.new_folder("x").await,
        Err(BrowserError::NotConfigured)
    ));
}

#[tokio::test]
async fn test_picker_skips_show_while_reading() {
    let fs = Arc::new(GatedFs::default());
    let h = Harness::with(Settings::default(), Vec::new(), Some(fs.clone() as Arc<dyn FileSystem>))
        .await
        .configured()
        .await;
    h.populate();
    let picker = PickerSession::new(h.engine.clone());

    fs.close();
    let first = {
        let picker = picker.clone();
        tokio::spawn(async move { picker.show().await })
    };
    wait_for_parked_read(&fs).await;
    assert!(picker.is_busy());

    assert!(picker.show().await.is_none());

    fs.open();
    let view = first.await.unwrap().unwrap();
    assert_eq!(view.items.len(), 2);
    assert!(!picker.is_busy());
}

#[tokio::test]
async fn test_picker_discards_stale_listing() {
    let fs = Arc::new(GatedFs::default());
    let h = Harness::with(Settings::default(), Vec::new(), Some(fs.clone() as Arc<dyn FileSystem>))
        .await
        .configured()
        .await;
    nested(&h);
    let picker = PickerSession::new(h.engine.clone());
    let alpha = h.engine.list_children(None).await.nodes[0].clone();

    fs.close();
    let first = {
        let picker = picker.clone();
        tokio::spawn(async move { picker.show().await })
    };
    wait_for_parked_read(&fs).await;

    // 读取根目录期间用户进入了 alpha
    h.engine.enter(&alpha).await.unwrap();
    fs.open();
    assert!(first.await.unwrap().is_none());

    let view = picker.show().await.unwrap();
    assert_eq!(view.directory, h.root.join("alpha"));
}
