//! Command line front end
//!
//! Every command builds a [`BrowserEngine`] on the real capabilities
//! (local file system, notify, the `code` launcher, the TOML settings file),
//! runs, then flushes the persisted state.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::browser::classify::strip_marker;
use crate::browser::engine::{BrowserChange, BrowserEngine, Capabilities, Listing, Selection};
use crate::browser::error::BrowserError;
use crate::browser::fs::LocalFileSystem;
use crate::browser::picker::{PickerItem, PickerSession};
use crate::browser::tree::{Collapsible, TreeSurface};
use crate::browser::watcher::NotifyBackend;
use crate::launch::{CodeLauncher, Launcher};
use crate::store::settings::{OpenTarget, Settings, StartupAction, TomlSettingsFile};
use crate::store::state::{GlobalState, StateStore};

#[derive(Parser, Debug)]
#[command(
    name = "workspace-wizard",
    about = "Browse a folder of .code-workspace files and open them",
    version
)]
pub struct Cli {
    /// Settings file (defaults to ~/.workspace-wizard/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// State file (defaults to ~/.workspace-wizard/state.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub state: Option<PathBuf>,

    /// Folders open in the current editor session
    #[arg(long = "folder", global = true, value_name = "DIR")]
    pub folders: Vec<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Choose the workspaces folder
    SelectRoot { dir: PathBuf },
    /// Re-read settings and list the workspaces folder
    Refresh,
    /// List a folder (defaults to the workspaces folder)
    List { dir: Option<PathBuf> },
    /// Print the tree, descending into expanded folders
    Tree,
    /// Open a workspace file
    Open {
        file: PathBuf,
        #[arg(long, conflicts_with = "current_window")]
        new_window: bool,
        #[arg(long)]
        current_window: bool,
    },
    /// Create a folder
    NewFolder { parent: PathBuf, name: String },
    /// Create a workspace file listing the --folder directories and open it
    NewWorkspace { parent: PathBuf, name: String },
    /// Interactive picker
    Pick,
    /// Print the listing whenever the workspaces folder changes
    Watch,
}

pub async fn run(cli: Cli) -> Result<()> {
    let settings_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let state_path = cli.state.clone().unwrap_or_else(GlobalState::default_path);
    let store = StateStore::open(state_path.clone())
        .with_context(|| format!("Failed to open state file {}", state_path.display()))?;

    let launcher: Arc<dyn Launcher> = match CodeLauncher::discover(cli.folders.clone()) {
        Ok(launcher) => Arc::new(launcher),
        Err(e) => {
            warn!("{}; falling back to 'code' on PATH", e);
            Arc::new(CodeLauncher::new(PathBuf::from("code"), cli.folders.clone()))
        }
    };
    let caps = Capabilities {
        fs: Arc::new(LocalFileSystem),
        watch: Arc::new(NotifyBackend),
        launcher,
        settings: Arc::new(TomlSettingsFile::new(settings_path)),
    };
    let engine = BrowserEngine::start(caps, store).await;

    let has_open_session = !cli.folders.is_empty();
    let result = match cli.command {
        Some(command) => dispatch(&engine, command).await,
        None => startup(&engine, has_open_session).await,
    };

    if let Err(e) = engine.store().flush().await {
        warn!("Failed to save state: {}", e);
    }
    result
}

async fn dispatch(engine: &BrowserEngine, command: Command) -> Result<()> {
    match command {
        Command::SelectRoot { dir } => {
            let dir = tokio::fs::canonicalize(&dir)
                .await
                .with_context(|| format!("Unable to open {}", dir.display()))?;
            if !dir.is_dir() {
                bail!("{} is not a folder", dir.display());
            }
            engine.configure_root(dir.clone()).await;
            println!("Workspaces folder: {}", dir.display());
            Ok(())
        }
        Command::Refresh => print_listing(engine.refresh().await),
        Command::List { dir } => {
            let dir = match dir {
                Some(dir) => Some(resolve(engine, &dir).await?),
                None => None,
            };
            print_listing(engine.list_children(dir.as_deref()).await)
        }
        Command::Tree => print_tree(engine).await,
        Command::Open {
            file,
            new_window,
            current_window,
        } => {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if strip_marker(&name).is_none() {
                bail!("{} is not a workspace file", file.display());
            }
            let target = if new_window {
                OpenTarget::NewWindow
            } else if current_window {
                OpenTarget::CurrentWindow
            } else {
                engine.settings().await.picker.open_target
            };
            engine.open_workspace(&file, target).map_err(fail)
        }
        Command::NewFolder { parent, name } => {
            let parent = resolve(engine, &parent).await?;
            let path = engine.create_folder(&parent, &name).await.map_err(fail)?;
            println!("Created {}", path.display());
            Ok(())
        }
        Command::NewWorkspace { parent, name } => {
            let parent = resolve(engine, &parent).await?;
            let path = engine
                .create_workspace(&parent, &name)
                .await
                .map_err(fail)?;
            println!("Created {}", path.display());
            Ok(())
        }
        Command::Pick => pick(&PickerSession::new(engine.clone())).await,
        Command::Watch => watch(engine).await,
    }
}

/// 无子命令时按配置执行启动动作
async fn startup(engine: &BrowserEngine, has_open_session: bool) -> Result<()> {
    let action = engine.settings().await.startup_action(has_open_session);
    info!("Start-up action: {:?}", action);
    match action {
        StartupAction::None => {
            if engine.root().await.is_none() {
                eprintln!("{}", BrowserError::NotConfigured.notice());
            }
            Ok(())
        }
        StartupAction::Picker => pick(&PickerSession::new(engine.clone())).await,
        StartupAction::Tree => print_tree(engine).await,
    }
}

/// Relative paths are taken from the workspaces folder
async fn resolve(engine: &BrowserEngine, path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    match engine.root().await {
        Some(root) => Ok(root.join(path)),
        None => Err(fail(BrowserError::NotConfigured)),
    }
}

fn fail(e: BrowserError) -> anyhow::Error {
    let notice = e.notice();
    anyhow::Error::new(e).context(notice)
}

fn kind_label(is_folder: bool) -> &'static str {
    if is_folder {
        "folder"
    } else {
        "workspace"
    }
}

fn print_listing(listing: Listing) -> Result<()> {
    if let Some(notice) = listing.notice {
        return Err(fail(notice));
    }
    for node in &listing.nodes {
        println!("{:<10} {}", kind_label(node.is_folder()), node.display_name());
    }
    Ok(())
}

async fn print_tree(engine: &BrowserEngine) -> Result<()> {
    let (rows, notices) = TreeSurface::new(engine.clone()).visible_rows().await;
    for row in &rows {
        let marker = match row.item.collapsible {
            Collapsible::None => " ",
            Collapsible::Collapsed => "+",
            Collapsible::Expanded => "-",
        };
        println!(
            "{}{} {}",
            "  ".repeat(row.depth),
            marker,
            row.item.node.display_name()
        );
    }
    // 子目录读取失败只提示；根目录本身不可用才算失败
    let mut notices = notices.into_iter();
    if rows.is_empty() {
        if let Some(first) = notices.next() {
            return Err(fail(first));
        }
    }
    for notice in notices {
        eprintln!("{}", notice.notice());
    }
    Ok(())
}

async fn watch(engine: &BrowserEngine) -> Result<()> {
    if engine.root().await.is_none() {
        return Err(fail(BrowserError::NotConfigured));
    }
    if !engine.is_watching().await {
        warn!("Watching is disabled or unavailable; set [tree] watch_for_changes = true");
    }

    let mut changes = engine.subscribe();
    print_listing(engine.list_children(None).await)?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                return Ok(());
            }
            change = changes.recv() => match change {
                Ok(BrowserChange::Refreshed) => {
                    println!();
                    let listing = engine.list_children(None).await;
                    if let Some(notice) = &listing.notice {
                        eprintln!("{}", notice.notice());
                        continue;
                    }
                    print_listing(listing)?;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => warn!("Missed {} change notifications", n),
                Err(RecvError::Closed) => return Ok(()),
            }
        }
    }
}

/// One line of picker input
#[derive(Debug, Clone, PartialEq, Eq)]
enum PickInput {
    Select { index: usize, alternate: bool },
    Back,
    Refresh,
    NewFolder(String),
    NewWorkspace(String),
    Quit,
    Unknown,
}

impl PickInput {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        match (head, rest) {
            ("q" | "quit", "") => PickInput::Quit,
            ("b" | "..", "") => PickInput::Back,
            ("r", "") => PickInput::Refresh,
            ("n", name) if !name.is_empty() => PickInput::NewFolder(name.to_string()),
            ("w", name) if !name.is_empty() => PickInput::NewWorkspace(name.to_string()),
            ("o", index) => match index.parse::<usize>() {
                Ok(index) if index > 0 => PickInput::Select {
                    index,
                    alternate: true,
                },
                _ => PickInput::Unknown,
            },
            (index, "") => match index.parse::<usize>() {
                Ok(index) if index > 0 => PickInput::Select {
                    index,
                    alternate: false,
                },
                _ => PickInput::Unknown,
            },
            _ => PickInput::Unknown,
        }
    }
}

const PICK_HELP: &str =
    "N: select  o N: open in the other window  b: back  n NAME: new folder  w NAME: new workspace  r: refresh  q: quit";

async fn pick(session: &PickerSession) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let view = match session.show().await {
            Some(view) => view,
            None => continue,
        };
        if let Some(notice) = view.notice {
            if matches!(notice, BrowserError::NotConfigured) {
                return Err(fail(notice));
            }
            eprintln!("{}", notice.notice());
        }

        println!("{}", view.directory.display());
        for (i, item) in view.items.iter().enumerate() {
            println!("{:>3}  {:<40} {}", i + 1, item.label(), item.description());
        }
        print!("> ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => return Ok(()),
        };

        match PickInput::parse(&line) {
            PickInput::Quit => return Ok(()),
            PickInput::Back => {
                if let Err(e) = session.back().await {
                    eprintln!("{}", e.notice());
                }
            }
            PickInput::Refresh => {
                session.engine().refresh().await;
            }
            PickInput::NewFolder(name) => match session.new_folder(&name).await {
                Ok(path) => println!("Created {}", path.display()),
                Err(e) => eprintln!("{}", e.notice()),
            },
            PickInput::NewWorkspace(name) => match session.new_workspace(&name).await {
                Ok(path) => {
                    println!("Created {}", path.display());
                    return Ok(());
                }
                Err(e) => eprintln!("{}", e.notice()),
            },
            PickInput::Select { index, alternate } => {
                let item: &PickerItem = match view.items.get(index - 1) {
                    Some(item) => item,
                    None => {
                        eprintln!("No entry {}", index);
                        continue;
                    }
                };
                let selection = if alternate {
                    session.select_alternate(item).await
                } else {
                    session.select(item).await
                };
                match selection {
                    Ok(Selection::Opened { path, target }) => {
                        println!("Opened {} ({:?})", path.display(), target);
                        return Ok(());
                    }
                    Ok(Selection::Entered(_)) => {}
                    Err(e) => eprintln!("{}", e.notice()),
                }
            }
            PickInput::Unknown => eprintln!("{}", PICK_HELP),
        }
    }
}
