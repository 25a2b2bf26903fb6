//! Filesystem abstraction for the content tree and side-data files.
//!
//! The [`ContentStore`] trait is the narrow set of filesystem operations the
//! indexer, resolver, side-data store and import engine need. Two
//! implementations ship with the crate:
//!
//! - **[`DiskContentStore`]**: `std::fs` plus `walkdir`, used by the server and CLI.
//! - **[`MemoryContentStore`]**: a tree of nodes behind a `RwLock`, used by tests.
//!
//! Nothing is cached: every call goes to the backing tree, so a write is
//! visible to the very next read.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use walkdir::WalkDir;

/// One entry returned by [`ContentStore::list_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Storage operations over absolute paths.
///
/// Implementations must be `Send + Sync`; upload imports call them from
/// concurrent tasks.
pub trait ContentStore: Send + Sync {
    /// Entries directly under `path`, sorted by name.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create or truncate `path`. The parent directory must exist.
    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Create `path` and any missing ancestors. Succeeds if it already exists.
    fn mkdir_all(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    /// Whether new files can be created inside the directory at `path`.
    fn is_writable_dir(&self, path: &Path) -> bool {
        self.is_dir(path)
    }

    /// Every file at any depth under `root`, in a deterministic order.
    fn walk_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in self.list_dir(&dir)? {
                let path = dir.join(&entry.name);
                if entry.is_dir {
                    pending.push(path);
                } else {
                    files.push(path);
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Whether `a` and `b` name the same existing file.
    fn is_same_file(&self, a: &Path, b: &Path) -> bool {
        a == b && self.is_file(a)
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        let bytes = self.read_file(from)?;
        self.write_file(to, &bytes)
    }
}

fn same_file_error(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("source and target are the same file: {}", path.display()),
    )
}

// ============ Disk ============

/// [`ContentStore`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskContentStore;

impl ContentStore for DiskContentStore {
    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                // Follows symlinks, so a linked directory counts as a directory.
                is_dir: entry.path().is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        std::fs::write(path, bytes)
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_writable_dir(&self, path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|m| m.is_dir() && !m.permissions().readonly())
            .unwrap_or(false)
    }

    fn walk_files(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(io::Error::other)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    fn is_same_file(&self, a: &Path, b: &Path) -> bool {
        match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    // `fs::copy` truncates the target before reading, so copying a file onto
    // itself would empty it.
    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        if self.is_same_file(from, to) {
            return Err(same_file_error(to));
        }
        std::fs::copy(from, to).map(|_| ())
    }
}

// ============ Memory ============

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

/// In-memory [`ContentStore`] for tests.
///
/// Paths are treated literally; callers should use absolute paths such as
/// `/content/Tech`. Writes under a prefix registered with
/// [`deny_writes_under`](MemoryContentStore::deny_writes_under) fail with
/// `PermissionDenied`, which lets tests exercise per-file failure handling.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    nodes: RwLock<BTreeMap<PathBuf, Node>>,
    denied: RwLock<Vec<PathBuf>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: create `path` with `contents`, making parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.insert_dirs(parent);
        }
        self.nodes
            .write()
            .unwrap()
            .insert(path.to_path_buf(), Node::File(contents.as_ref().to_vec()));
    }

    /// Test helper: create a directory and its ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.insert_dirs(path.as_ref());
    }

    /// Make every write or directory creation under `prefix` fail.
    pub fn deny_writes_under(&self, prefix: impl Into<PathBuf>) {
        self.denied.write().unwrap().push(prefix.into());
    }

    fn insert_dirs(&self, path: &Path) {
        let mut nodes = self.nodes.write().unwrap();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
    }

    fn check_writable(&self, path: &Path) -> io::Result<()> {
        let denied = self.denied.read().unwrap();
        if denied.iter().any(|prefix| path.starts_with(prefix)) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("write denied: {}", path.display()),
            ));
        }
        Ok(())
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such file or directory: {}", path.display()),
    )
}

impl ContentStore for MemoryContentStore {
    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let nodes = self.nodes.read().unwrap();
        match nodes.get(path) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a directory: {}", path.display()),
                ))
            }
            None => return Err(not_found(path)),
        }
        let entries = nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .filter_map(|(p, node)| {
                let name = p.file_name()?.to_string_lossy().to_string();
                Some(DirEntry {
                    name,
                    is_dir: matches!(node, Node::Dir),
                })
            })
            .collect();
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.nodes.read().unwrap().get(path) {
            Some(Node::File(bytes)) => Ok(bytes.clone()),
            Some(Node::Dir) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory: {}", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.check_writable(path)?;
        let mut nodes = self.nodes.write().unwrap();
        let parent_is_dir = path
            .parent()
            .map(|p| matches!(nodes.get(p), Some(Node::Dir)))
            .unwrap_or(false);
        if !parent_is_dir {
            return Err(not_found(path));
        }
        if let Some(Node::Dir) = nodes.get(path) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory: {}", path.display()),
            ));
        }
        nodes.insert(path.to_path_buf(), Node::File(bytes.to_vec()));
        Ok(())
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        if self.is_dir(path) {
            return Ok(());
        }
        self.check_writable(path)?;
        if let Some(Node::File(_)) = self.nodes.read().unwrap().get(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", path.display()),
            ));
        }
        self.insert_dirs(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.nodes.read().unwrap().contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.nodes.read().unwrap().get(path), Some(Node::Dir))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.nodes.read().unwrap().get(path), Some(Node::File(_)))
    }

    fn is_writable_dir(&self, path: &Path) -> bool {
        self.is_dir(path) && self.check_writable(path).is_ok()
    }
}
