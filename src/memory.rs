use crate::{
    utils::normalize_path,
    vfs::{same_path_error, Backend, EntryKind, OpenFlags, ScratchArea},
};
use std::{
    collections::BTreeMap,
    io,
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

const OUTPUT_ROOT: &str = "/output";
const SCRATCH_ROOT: &str = "/scratch";

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

#[derive(Debug, Default)]
struct Tree {
    nodes: BTreeMap<PathBuf, Node>,
}
impl Tree {
    fn children<'a>(&'a self, dir: &'a Path) -> impl Iterator<Item = &'a PathBuf> + 'a {
        self.nodes
            .keys()
            .filter(move |path| path.parent() == Some(dir))
    }

    fn subtree(&self, root: &Path) -> Vec<PathBuf> {
        self.nodes
            .keys()
            .filter(|path| path.starts_with(root))
            .cloned()
            .collect()
    }

    fn require_parent_dir(&self, path: &Path) -> io::Result<()> {
        match path.parent().and_then(|parent| self.nodes.get(parent)) {
            Some(Node::Dir) => Ok(()),
            Some(Node::File(_)) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("parent of '{}' is not a directory", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("'{}' does not exist", path.display()),
    )
}

fn is_a_directory(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::IsADirectory,
        format!("'{}' is a directory", path.display()),
    )
}

fn already_exists(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("'{}' already exists", path.display()),
    )
}

/// In-memory [`Backend`] for tests.
///
/// Clones share the same tree, so a test can keep a handle and inspect what a
/// generator committed. The output root lives at `/output`; scratch areas are
/// created under `/scratch` and never show up in a listing of the output root.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    tree: Arc<RwLock<Tree>>,
    scratch_counter: Arc<AtomicU64>,
    base: PathBuf,
}
impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}
impl MemoryBackend {
    pub fn new() -> Self {
        let mut tree = Tree::default();
        tree.nodes.insert(PathBuf::from("/"), Node::Dir);
        tree.nodes.insert(PathBuf::from(OUTPUT_ROOT), Node::Dir);
        tree.nodes.insert(PathBuf::from(SCRATCH_ROOT), Node::Dir);

        Self {
            tree: Arc::new(RwLock::new(tree)),
            scratch_counter: Arc::new(AtomicU64::new(0)),
            base: PathBuf::from(OUTPUT_ROOT),
        }
    }

    /// Writes `contents` to `path`, creating missing parent directories.
    pub fn insert_file<P: AsRef<Path>, C: AsRef<[u8]>>(
        &self,
        path: P,
        contents: C,
    ) -> io::Result<()> {
        let path = self.resolve(path.as_ref());
        let mut tree = self.write_tree()?;

        for ancestor in path.ancestors().skip(1) {
            tree.nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
        }
        tree.nodes.insert(path, Node::File(contents.as_ref().to_vec()));

        Ok(())
    }

    /// Contents of the file at `path` as UTF-8, or `None` if there is no such file.
    pub fn file_contents<P: AsRef<Path>>(&self, path: P) -> Option<String> {
        let path = self.resolve(path.as_ref());
        let tree = self.tree.read().ok()?;

        match tree.nodes.get(&path) {
            Some(Node::File(data)) => Some(String::from_utf8_lossy(data).into_owned()),
            _ => None,
        }
    }

    /// Every path below this backend's root, relative to it, in sorted order.
    /// Directories are suffixed with `/`.
    pub fn list(&self) -> Vec<String> {
        let Ok(tree) = self.tree.read() else {
            return Vec::new();
        };

        tree.nodes
            .iter()
            .filter(|(path, _)| path.starts_with(&self.base) && **path != self.base)
            .filter_map(|(path, node)| {
                let relative = path.strip_prefix(&self.base).ok()?.display().to_string();
                Some(match node {
                    Node::Dir => format!("{relative}/"),
                    Node::File(_) => relative,
                })
            })
            .collect()
    }

    /// Number of scratch areas that still exist.
    pub fn scratch_areas(&self) -> usize {
        self.tree
            .read()
            .map(|tree| tree.children(Path::new(SCRATCH_ROOT)).count())
            .unwrap_or_default()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        normalize_path(&self.base.join(path))
    }

    fn read_tree(&self) -> io::Result<RwLockReadGuard<'_, Tree>> {
        self.tree
            .read()
            .map_err(|_| io::Error::other("memory backend lock poisoned"))
    }

    fn write_tree(&self) -> io::Result<RwLockWriteGuard<'_, Tree>> {
        self.tree
            .write()
            .map_err(|_| io::Error::other("memory backend lock poisoned"))
    }
}

/// Write handle appending straight into the shared tree.
struct MemoryFile {
    tree: Arc<RwLock<Tree>>,
    path: PathBuf,
}
impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut tree = self
            .tree
            .write()
            .map_err(|_| io::Error::other("memory backend lock poisoned"))?;

        match tree.nodes.get_mut(&self.path) {
            Some(Node::File(data)) => {
                data.extend_from_slice(buf);
                Ok(buf.len())
            }
            Some(Node::Dir) => Err(is_a_directory(&self.path)),
            None => Err(not_found(&self.path)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn open_write(&self, path: &Path, flags: OpenFlags) -> io::Result<Box<dyn Write + '_>> {
        let path = self.resolve(path);
        let mut tree = self.write_tree()?;

        match tree.nodes.get(&path) {
            Some(Node::Dir) => return Err(is_a_directory(&path)),
            Some(Node::File(_)) if flags.exclusive => return Err(already_exists(&path)),
            Some(Node::File(_)) => {}
            None if flags.create || flags.exclusive => tree.require_parent_dir(&path)?,
            None => return Err(not_found(&path)),
        }

        let node = tree
            .nodes
            .entry(path.clone())
            .or_insert_with(|| Node::File(Vec::new()));
        if let Node::File(data) = node {
            if flags.truncate {
                data.clear();
            }
        }
        drop(tree);

        Ok(Box::new(MemoryFile {
            tree: Arc::clone(&self.tree),
            path,
        }))
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(io::Cursor::new(self.read(path)?)))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let path = self.resolve(path);
        let tree = self.read_tree()?;

        match tree.nodes.get(&path) {
            Some(Node::File(data)) => Ok(data.clone()),
            Some(Node::Dir) => Err(is_a_directory(&path)),
            None => Err(not_found(&path)),
        }
    }

    fn mkdir(&self, path: &Path) -> io::Result<()> {
        let path = self.resolve(path);
        let mut tree = self.write_tree()?;

        if tree.nodes.contains_key(&path) {
            return Err(already_exists(&path));
        }
        tree.require_parent_dir(&path)?;
        tree.nodes.insert(path, Node::Dir);

        Ok(())
    }

    fn rename(&self, old: &Path, new: &Path) -> io::Result<()> {
        let (old, new) = (self.resolve(old), self.resolve(new));
        if old == new {
            return Err(same_path_error(&old, &new));
        }

        let mut tree = self.write_tree()?;

        let is_dir = match tree.nodes.get(&old) {
            Some(Node::Dir) => true,
            Some(Node::File(_)) => false,
            None => return Err(not_found(&old)),
        };
        if new.starts_with(&old) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "cannot move '{}' into itself ('{}')",
                    old.display(),
                    new.display()
                ),
            ));
        }
        tree.require_parent_dir(&new)?;

        match tree.nodes.get(&new) {
            Some(Node::Dir) => return Err(is_a_directory(&new)),
            Some(Node::File(_)) if is_dir => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("'{}' is not a directory", new.display()),
                ))
            }
            _ => {}
        }

        for from in tree.subtree(&old) {
            if let Some(node) = tree.nodes.remove(&from) {
                let rest = from.strip_prefix(&old).unwrap_or(Path::new(""));
                tree.nodes.insert(normalize_path(&new.join(rest)), node);
            }
        }

        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let path = self.resolve(path);
        let mut tree = self.write_tree()?;

        match tree.nodes.get(&path) {
            None => return Err(not_found(&path)),
            Some(Node::Dir) if tree.children(&path).next().is_some() => {
                return Err(io::Error::new(
                    io::ErrorKind::DirectoryNotEmpty,
                    format!("'{}' is not empty", path.display()),
                ))
            }
            Some(_) => {}
        }
        tree.nodes.remove(&path);

        Ok(())
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let path = self.resolve(path);
        let mut tree = self.write_tree()?;

        for doomed in tree.subtree(&path) {
            tree.nodes.remove(&doomed);
        }

        Ok(())
    }

    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        let path = self.resolve(path);
        let tree = self.read_tree()?;

        Ok(tree.nodes.get(&path).map(|node| match node {
            Node::Dir => EntryKind::Directory,
            Node::File(_) => EntryKind::File,
        }))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let path = self.resolve(path);
        let tree = self.read_tree()?;

        match tree.nodes.get(&path) {
            Some(Node::Dir) => Ok(tree
                .children(&path)
                .filter_map(|child| child.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .collect()),
            Some(Node::File(_)) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("'{}' is not a directory", path.display()),
            )),
            None => Err(not_found(&path)),
        }
    }

    fn create_scratch_area(&self, pattern: &str) -> io::Result<ScratchArea> {
        let id = self.scratch_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let name = match pattern.rsplit_once('*') {
            Some((prefix, suffix)) => format!("{prefix}{id}{suffix}"),
            None => format!("{pattern}{id}"),
        };

        let path = Path::new(SCRATCH_ROOT).join(name);
        {
            let mut tree = self.write_tree()?;
            if tree.nodes.contains_key(&path) {
                return Err(already_exists(&path));
            }
            tree.nodes.insert(path.clone(), Node::Dir);
        }

        Ok(ScratchArea {
            backend: Box::new(MemoryBackend {
                tree: Arc::clone(&self.tree),
                scratch_counter: Arc::clone(&self.scratch_counter),
                base: path.clone(),
            }),
            path,
        })
    }
}
