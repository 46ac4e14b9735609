//! File-system capability consumed by the browser.

use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::browser::classify::EntryType;

/// Immediate child of a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Raw file name; may not be valid UTF-8
    pub name: OsString,
    pub entry_type: EntryType,
}

impl DirEntry {
    pub fn new(name: impl Into<OsString>, entry_type: EntryType) -> Self {
        Self {
            name: name.into(),
            entry_type,
        }
    }
}

#[async_trait]
pub trait FileSystem: Send + Sync {
    /// List immediate children; order is unspecified.
    async fn read_directory(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Create a single directory. Fails if it already exists or the parent is missing.
    async fn create_directory(&self, path: &Path) -> io::Result<()>;

    /// Write a new file. Fails if the file already exists.
    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// 本地文件系统实现（tokio::fs）
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn read_directory(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        debug!("Reading directory: {:?}", path);

        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(path).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            // file_type() 不跟随符号链接
            let file_type = entry.file_type().await?;
            let entry_type = if file_type.is_dir() {
                EntryType::Directory
            } else if file_type.is_file() {
                EntryType::File
            } else if file_type.is_symlink() {
                EntryType::Symlink
            } else {
                EntryType::Other
            };
            entries.push(DirEntry {
                name: entry.file_name(),
                entry_type,
            });
        }
        Ok(entries)
    }

    async fn create_directory(&self, path: &Path) -> io::Result<()> {
        debug!("Creating directory: {:?}", path);
        tokio::fs::create_dir(path).await
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        debug!("Writing file: {:?}", path);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(contents).await?;
        file.sync_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_file_system() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let fs = LocalFileSystem;

        fs.create_directory(&root.join("alpha")).await.unwrap();
        fs.write_file(&root.join("Beta.code-workspace"), b"{}")
            .await
            .unwrap();

        let mut entries = fs.read_directory(root).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            entries,
            vec![
                DirEntry::new("Beta.code-workspace", EntryType::File),
                DirEntry::new("alpha", EntryType::Directory),
            ]
        );

        // 已存在的文件不会被覆盖
        let err = fs
            .write_file(&root.join("Beta.code-workspace"), b"{\"folders\":[]}")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(
            std::fs::read_to_string(root.join("Beta.code-workspace")).unwrap(),
            "{}"
        );

        assert!(fs.read_directory(&root.join("missing")).await.is_err());

        // 已存在的文件夹或缺失的父目录都算创建失败
        let err = fs.create_directory(&root.join("alpha")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert!(fs.create_directory(&root.join("missing/nested")).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_reported_as_symlinks() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir(root.join("real")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

        let entries = LocalFileSystem.read_directory(root).await.unwrap();
        let link = entries.iter().find(|e| e.name == "link").unwrap();
        assert_eq!(link.entry_type, EntryType::Symlink);
    }
}
