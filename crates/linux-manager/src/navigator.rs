use std::fs;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::executor::OutputSink;

pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One child found while listing a directory. The kind is not stored; it is
/// looked up when the entry is activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub full_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Child(DirectoryEntry),
    Back,
    Quit,
}

impl MenuEntry {
    pub fn label(&self) -> &str {
        match self {
            MenuEntry::Child(e) => &e.name,
            MenuEntry::Back => "Back",
            MenuEntry::Quit => "Quit",
        }
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            MenuEntry::Child(_) => None,
            MenuEntry::Back => Some("One level up"),
            MenuEntry::Quit => Some("Press to exit"),
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            MenuEntry::Child(e) => Some(&e.full_path),
            _ => None,
        }
    }
}

/// What an activation did. Every variant except `Quit` names the path the
/// footer should mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Opened { path: String },
    Entered { path: String },
    WentUp { path: String },
    Quit,
}

impl Activation {
    pub fn footer(&self) -> Option<&str> {
        match self {
            Activation::Opened { path }
            | Activation::Entered { path }
            | Activation::WentUp { path } => Some(path),
            Activation::Quit => None,
        }
    }
}

pub fn join(dir: &str, name: &str) -> String {
    if dir.ends_with(SEPARATOR) {
        format!("{dir}{name}")
    } else {
        format!("{dir}{SEPARATOR}{name}")
    }
}

/// Everything before the last separator. `None` at the root or for a path
/// without any separator.
pub fn parent_of(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        return None;
    }
    let idx = trimmed.rfind(SEPARATOR)?;
    if idx == 0 {
        Some(SEPARATOR.to_string())
    } else {
        Some(trimmed[..idx].to_string())
    }
}

/// Children of `dir` in the order the OS hands them out, unless `sort`.
pub fn list_children(dir: &str, sort: bool) -> Result<Vec<DirectoryEntry>> {
    let rd = fs::read_dir(dir).map_err(|e| Error::msg(format!("cannot list {dir}: {e}")))?;
    let mut out = Vec::new();
    for entry in rd {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(dir, error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        let full_path = join(dir, &name);
        out.push(DirectoryEntry { name, full_path });
    }
    if sort {
        out.sort_by(|a, b| a.name.cmp(&b.name));
    }
    Ok(out)
}

pub fn classify(path: &str) -> Result<EntryKind> {
    let meta = fs::metadata(path).map_err(|e| Error::msg(format!("cannot stat {path}: {e}")))?;
    Ok(if meta.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    })
}

/// Directory menu state. The menu is rebuilt from scratch on every
/// navigation and always ends with `Back` and `Quit`.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    current_path: String,
    selected_path: Option<String>,
    entries: Vec<MenuEntry>,
    sort: bool,
}

impl Navigator {
    pub fn new(sort: bool) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    /// Last activated entry. Stale after a directory change until the next
    /// activation.
    pub fn selected_path(&self) -> Option<&str> {
        self.selected_path.as_deref()
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.label().to_string()).collect()
    }

    /// Rebuild the menu for `path`. On error the menu holds only the
    /// structural entries so the user can still leave.
    pub fn populate(&mut self, path: &str) -> Result<()> {
        self.entries.clear();
        let res = self.populate_children(path);
        self.entries.push(MenuEntry::Back);
        self.entries.push(MenuEntry::Quit);
        match &res {
            Ok(()) => debug!(path, entries = self.entries.len(), "menu populated"),
            Err(e) => warn!(path, error = %e, "menu populate failed"),
        }
        res
    }

    fn populate_children(&mut self, path: &str) -> Result<()> {
        if classify(path)? != EntryKind::Directory {
            return Err(Error::msg(format!("{path} is not a directory")));
        }
        self.current_path = path.to_string();
        let children = list_children(path, self.sort)?;
        self.entries
            .extend(children.into_iter().map(MenuEntry::Child));
        Ok(())
    }

    /// Run the behaviour of the entry at `index`. Errors are recoverable and
    /// leave the previous view in place.
    pub fn activate(&mut self, index: usize, sink: &dyn OutputSink) -> Result<Activation> {
        let Some(entry) = self.entries.get(index).cloned() else {
            return Err(Error::msg(format!("no menu entry at position {index}")));
        };
        match entry {
            MenuEntry::Child(child) => self.open(child.full_path, sink),
            MenuEntry::Back => self.go_up(sink),
            MenuEntry::Quit => Ok(Activation::Quit),
        }
    }

    fn open(&mut self, path: String, sink: &dyn OutputSink) -> Result<Activation> {
        match classify(&path)? {
            EntryKind::Directory => {
                self.selected_path = Some(path.clone());
                sink.replace("");
                self.populate(&path)?;
                Ok(Activation::Entered { path })
            }
            EntryKind::File => {
                let bytes =
                    fs::read(&path).map_err(|e| Error::msg(format!("cannot read {path}: {e}")))?;
                sink.replace(&String::from_utf8_lossy(&bytes));
                self.selected_path = Some(path.clone());
                Ok(Activation::Opened { path })
            }
        }
    }

    /// Repopulate with the parent of the current directory. At the root the
    /// root itself is shown again.
    pub fn go_up(&mut self, sink: &dyn OutputSink) -> Result<Activation> {
        let parent = parent_of(&self.current_path).unwrap_or_else(|| self.current_path.clone());
        sink.replace("");
        self.populate(&parent)?;
        Ok(Activation::WentUp { path: parent })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_uses_single_separator() {
        assert_eq!(join("/tmp/project", "a.sh"), "/tmp/project/a.sh");
        assert_eq!(join("/", "etc"), "/etc");
    }

    #[test]
    fn parent_truncates_at_last_separator() {
        assert_eq!(parent_of("/tmp/project/sub").as_deref(), Some("/tmp/project"));
        assert_eq!(parent_of("/tmp/project/").as_deref(), Some("/tmp"));
        assert_eq!(parent_of("/tmp").as_deref(), Some("/"));
        assert_eq!(parent_of("/"), None);
        assert_eq!(parent_of("relative"), None);
    }

    #[test]
    fn structural_entries_have_fixed_labels() {
        assert_eq!(MenuEntry::Back.label(), "Back");
        assert_eq!(MenuEntry::Quit.label(), "Quit");
        assert_eq!(MenuEntry::Quit.path(), None);
        assert_eq!(Activation::Quit.footer(), None);
    }
}
