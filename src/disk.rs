use crate::vfs::{same_path_error, Backend, EntryKind, OpenFlags, ScratchArea};
use std::{
    fs, io,
    io::{Read, Write},
    path::{Path, PathBuf},
};

/// [`Backend`] over a directory of the real filesystem.
///
/// Paths are resolved against `root`, which must exist. Scratch areas are
/// hidden directories inside `root` so that committing never renames across
/// filesystems.
#[derive(Debug, Clone)]
pub struct DiskBackend {
    root: PathBuf,
}
impl DiskBackend {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl Backend for DiskBackend {
    fn open_write(&self, path: &Path, flags: OpenFlags) -> io::Result<Box<dyn Write + '_>> {
        let file = fs::OpenOptions::new()
            .write(true)
            .create(flags.create && !flags.exclusive)
            .create_new(flags.exclusive)
            .truncate(flags.truncate)
            .open(self.resolve(path))?;

        Ok(Box::new(io::BufWriter::new(file)))
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(fs::File::open(self.resolve(path))?))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path))
    }

    fn mkdir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(self.resolve(path))
    }

    fn rename(&self, old: &Path, new: &Path) -> io::Result<()> {
        let (old, new) = (self.resolve(old), self.resolve(new));
        if old == new {
            return Err(same_path_error(&old, &new));
        }

        fs::rename(old, new)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let path = self.resolve(path);
        if fs::symlink_metadata(&path)?.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let path = self.resolve(path);
        let result = match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&path),
            Ok(_) => fs::remove_file(&path),
            Err(error) => Err(error),
        };

        match result {
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        match fs::symlink_metadata(self.resolve(path)) {
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Directory)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        fs::read_dir(self.resolve(path))?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect()
    }

    fn create_scratch_area(&self, pattern: &str) -> io::Result<ScratchArea> {
        let (prefix, suffix) = pattern.rsplit_once('*').unwrap_or((pattern, ""));

        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempdir_in(&self.root)?
            .keep();

        log::debug!("created scratch area at {}", dir.display());

        let name = dir
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| io::Error::other("scratch area without a name"))?;

        Ok(ScratchArea {
            backend: Box::new(DiskBackend::new(dir)),
            path: name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_area_lives_inside_the_root() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("out");
        fs::create_dir(&root).unwrap();

        let backend = DiskBackend::new(&root);
        let scratch = backend.create_scratch_area(".stagehand-*").unwrap();

        assert!(scratch.path.is_relative());
        assert!(backend.root().join(&scratch.path).is_dir());
        assert!(scratch
            .path
            .to_string_lossy()
            .starts_with(".stagehand-"));
        assert_eq!(
            backend.entry_kind(&scratch.path).unwrap(),
            Some(EntryKind::Directory)
        );

        // staged entries are addressable through the parent backend
        let mut file = scratch
            .backend
            .open_write(Path::new("a.txt"), OpenFlags::create_truncate())
            .unwrap();
        file.write_all(b"a").unwrap();
        drop(file);
        backend
            .rename(&scratch.path.join("a.txt"), Path::new("a.txt"))
            .unwrap();
        assert_eq!(fs::read_to_string(root.join("a.txt")).unwrap(), "a");

        backend.remove_all(&scratch.path).unwrap();
        assert_eq!(backend.entry_kind(&scratch.path).unwrap(), None);
    }

    #[test]
    fn rename_onto_itself_fails() {
        let root = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(root.path());
        fs::write(root.path().join("a"), "a").unwrap();

        let error = backend
            .rename(Path::new("a"), Path::new("a"))
            .unwrap_err();

        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
        assert!(root.path().join("a").exists());
    }

    #[test]
    fn remove_all_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(root.path());

        fs::create_dir_all(root.path().join("a/b")).unwrap();
        fs::write(root.path().join("a/b/c"), "c").unwrap();

        backend.remove_all(Path::new("a")).unwrap();
        backend.remove_all(Path::new("a")).unwrap();

        assert_eq!(backend.entry_kind(Path::new("a")).unwrap(), None);
    }

    #[test]
    fn mkdir_reports_existing_directories() {
        let root = tempfile::tempdir().unwrap();
        let backend = DiskBackend::new(root.path());

        backend.mkdir(Path::new("pkg")).unwrap();
        let error = backend.mkdir(Path::new("pkg")).unwrap_err();

        assert_eq!(error.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(
            backend.entry_kind(Path::new("pkg")).unwrap(),
            Some(EntryKind::Directory)
        );
    }
}
