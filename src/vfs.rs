use std::{
    fmt, io,
    io::{Read, Write},
    path::{Path, PathBuf},
};

/// Kind of an existing entry in a [`Backend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}
impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// Flags for [`Backend::open_write`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Create the file if it is missing.
    pub create: bool,
    /// Drop any existing contents.
    pub truncate: bool,
    /// Fail with [`io::ErrorKind::AlreadyExists`] if the file is present.
    pub exclusive: bool,
}
impl OpenFlags {
    pub fn create_truncate() -> Self {
        Self {
            create: true,
            truncate: true,
            exclusive: false,
        }
    }
}

/// A freshly created staging location handed out by [`Backend::create_scratch_area`].
///
/// `backend` is rooted at `path`; `path` is addressable by the backend that created it,
/// so that `parent.rename(path.join(rel), rel)` moves a staged entry into place.
/// Nothing removes the area automatically.
pub struct ScratchArea {
    pub backend: Box<dyn Backend>,
    pub path: PathBuf,
}
impl fmt::Debug for ScratchArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScratchArea")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Hierarchical storage the generator writes into.
///
/// All paths are relative to the backend's own root. Failures are reported as
/// [`io::Error`] with a meaningful [`io::ErrorKind`]:
/// `AlreadyExists`, `NotFound`, `DirectoryNotEmpty` or `InvalidInput`.
pub trait Backend {
    /// Opens `path` for writing. The parent directory must exist.
    fn open_write(&self, path: &Path, flags: OpenFlags) -> io::Result<Box<dyn Write + '_>>;

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + '_>>;

    /// Reads the whole file at `path`.
    ///
    /// Backends with a cheaper way to do this should override it.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut contents = Vec::new();
        self.open_read(path)?.read_to_end(&mut contents)?;
        Ok(contents)
    }

    /// Creates a single directory, failing with `AlreadyExists` if anything is at `path`.
    fn mkdir(&self, path: &Path) -> io::Result<()>;

    /// Moves `old` to `new`. Renaming a path onto itself is an error.
    fn rename(&self, old: &Path, new: &Path) -> io::Result<()>;

    /// Removes a file or an empty directory.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Removes `path` and everything below it. Succeeds if `path` is absent.
    fn remove_all(&self, path: &Path) -> io::Result<()>;

    /// Returns what lives at `path`, or `None` if nothing does.
    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>>;

    /// Names of the direct children of the directory at `path`.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Creates a uniquely named directory from `pattern`, where the last `*` is
    /// replaced by a unique suffix, and returns a backend rooted there.
    fn create_scratch_area(&self, pattern: &str) -> io::Result<ScratchArea>;
}

pub(crate) fn same_path_error(old: &Path, new: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!(
            "cannot rename '{}' onto itself ('{}')",
            old.display(),
            new.display()
        ),
    )
}
