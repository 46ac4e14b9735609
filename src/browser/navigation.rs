//! 导航状态
//!
//! 记录当前所在目录、根目录边界以及展开过的文件夹集合。
//! 不变量：当前目录永远是根目录或其子孙。

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use crate::browser::error::NavigationError;

#[derive(Debug, Clone)]
pub struct NavigationState {
    root: PathBuf,
    current: PathBuf,
    expanded: BTreeSet<PathBuf>,
}

impl NavigationState {
    pub fn new(root: PathBuf) -> Self {
        Self {
            current: root.clone(),
            root,
            expanded: BTreeSet::new(),
        }
    }

    /// 带上持久化的展开集合
    pub fn with_expanded(root: PathBuf, expanded: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut state = Self::new(root);
        state.expanded = expanded.into_iter().collect();
        state
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn current_directory(&self) -> &Path {
        &self.current
    }

    pub fn is_at_root(&self) -> bool {
        self.current == self.root
    }

    /// 进入当前目录下名为 `child_name` 的子目录
    pub fn descend(&mut self, child_name: &str) -> Result<PathBuf, NavigationError> {
        validate_child_name(child_name)
            .map_err(|_| NavigationError::OutOfBounds(self.current.join(child_name)))?;
        self.current = self.current.join(child_name);
        Ok(self.current.clone())
    }

    /// 直接跳到根目录下的某个绝对路径
    pub fn enter(&mut self, path: &Path) -> Result<PathBuf, NavigationError> {
        if !self.contains(path) {
            return Err(NavigationError::OutOfBounds(path.to_path_buf()));
        }
        self.current = path.to_path_buf();
        Ok(self.current.clone())
    }

    /// 回到上一级；已在根目录时返回 `AtRoot`
    pub fn ascend(&mut self) -> Result<PathBuf, NavigationError> {
        if self.is_at_root() {
            return Err(NavigationError::AtRoot);
        }
        match self.current.parent() {
            Some(parent) if self.contains(parent) => self.current = parent.to_path_buf(),
            _ => self.current = self.root.clone(),
        }
        Ok(self.current.clone())
    }

    pub fn reset(&mut self) {
        self.current = self.root.clone();
    }

    /// `path` 是否在根目录边界内（仅做词法检查，`..` 一律视为越界）
    pub fn contains(&self, path: &Path) -> bool {
        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
        {
            return false;
        }
        path.starts_with(&self.root)
    }

    pub fn is_expanded(&self, path: &Path) -> bool {
        self.expanded.contains(path)
    }

    /// 返回集合是否发生变化
    pub fn set_expanded(&mut self, path: &Path, expanded: bool) -> bool {
        if expanded {
            self.expanded.insert(path.to_path_buf())
        } else {
            self.expanded.remove(path)
        }
    }

    pub fn expanded_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.expanded.iter()
    }
}

/// 验证子项名称：不能为空、不能是 `.`/`..`、不能包含路径分隔符或空字符
pub fn validate_child_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if name == "." || name == ".." {
        return Err("name must not be . or ..".to_string());
    }
    if name.contains('/') || name.contains('\\') {
        return Err("name must not contain path separators".to_string());
    }
    if name.contains('\0') {
        return Err("name must not contain NUL".to_string());
    }
    Ok(())
}
