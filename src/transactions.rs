use crate::{
    errors::{FileOperation, GenerateError, IoError},
    generator::GeneratorOptions,
    vfs::{Backend, EntryKind, ScratchArea},
};
use indexmap::{IndexMap, IndexSet};
use std::{
    io,
    path::{Path, PathBuf},
};

/// What a successful commit put into the output, in commit order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub directories: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
}

/// One staging pass over an output backend.
///
/// Everything is first written into a scratch area of `output`; [`Staging::commit`]
/// then replays the recorded directories and moves the staged files into place.
/// The scratch area is removed when the staging is dropped, whichever way it ends.
///
/// Commit is not all-or-nothing: if a rename fails halfway, the files moved
/// before it stay in the output.
pub struct Staging<'a> {
    output: &'a dyn Backend,
    scratch: ScratchArea,
    removed: bool,
    /// Relative directory path -> order of first creation.
    dirs: IndexMap<PathBuf, usize>,
    files: IndexSet<PathBuf>,
    modified: IndexSet<PathBuf>,
}

impl<'a> Staging<'a> {
    /// Creates the scratch area. Nothing in the output is touched.
    pub fn begin(output: &'a dyn Backend, pattern: &str) -> Result<Self, GenerateError> {
        let scratch = output
            .create_scratch_area(pattern)
            .map_err(|error| IoError::new(FileOperation::Scratch, PathBuf::from(pattern), error))?;

        log::debug!("staging into {}", scratch.path.display());

        Ok(Self {
            output,
            scratch,
            removed: false,
            dirs: IndexMap::new(),
            files: IndexSet::new(),
            modified: IndexSet::new(),
        })
    }

    pub fn output(&self) -> &'a dyn Backend {
        self.output
    }

    /// The backend rooted at the scratch area.
    pub fn scratch(&self) -> &dyn Backend {
        self.scratch.backend.as_ref()
    }

    /// Remembers a staged directory. The first time a path is seen fixes its position.
    pub fn record_dir(&mut self, path: PathBuf) {
        let next = self.dirs.len();
        self.dirs.entry(path).or_insert(next);
    }

    pub fn record_file(&mut self, path: PathBuf) {
        self.files.insert(path);
    }

    pub fn record_modified(&mut self, path: PathBuf) {
        self.modified.insert(path);
    }

    /// Abandons the staging after `error`, removing the scratch area right away
    /// so that a failure to do so can be reported alongside `error`.
    pub fn discard(mut self, error: GenerateError) -> GenerateError {
        self.removed = true;

        log::debug!("discarding scratch area {}", self.scratch.path.display());

        match self.output.remove_all(&self.scratch.path) {
            Ok(()) => error,
            Err(cleanup) => GenerateError::Discard {
                error: Box::new(error),
                cleanup: IoError::new(FileOperation::Remove, self.scratch.path.clone(), cleanup),
            },
        }
    }

    /// Moves everything staged into the output, honouring `options`.
    pub fn commit(self, options: &GeneratorOptions) -> Result<GenerationReport, GenerateError> {
        if options.empty_output_dir {
            self.empty_output_dir()?;
        }

        let mut dirs: Vec<(&PathBuf, &usize)> = self.dirs.iter().collect();
        dirs.sort_by_key(|(_, order)| **order);

        for (dir, _) in &dirs {
            match self.output.mkdir(dir) {
                Ok(()) => {}
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                    let existing = self
                        .output
                        .entry_kind(dir)
                        .map_err(|error| IoError::new(FileOperation::Stat, dir.to_path_buf(), error))?;

                    // only a directory can be reused
                    match existing {
                        Some(EntryKind::Directory) if !options.error_on_existing_dir => {}
                        Some(kind) => {
                            return Err(GenerateError::AlreadyExists {
                                kind,
                                path: dir.to_path_buf(),
                            })
                        }
                        None => {
                            return Err(
                                IoError::new(FileOperation::Mkdir, dir.to_path_buf(), error).into()
                            )
                        }
                    }
                }
                Err(error) => {
                    return Err(IoError::new(FileOperation::Mkdir, dir.to_path_buf(), error).into())
                }
            }
        }

        for file in &self.files {
            if options.error_on_existing_file {
                let existing = self
                    .output
                    .entry_kind(file)
                    .map_err(|error| IoError::new(FileOperation::Stat, file.clone(), error))?;

                if let Some(kind) = existing {
                    return Err(GenerateError::AlreadyExists {
                        kind,
                        path: file.clone(),
                    });
                }
            }

            self.move_into_place(file)?;
        }

        // Their existence was required when they were read for staging.
        for file in &self.modified {
            self.move_into_place(file)?;
        }

        let report = GenerationReport {
            directories: dirs.into_iter().map(|(dir, _)| dir.clone()).collect(),
            files: self.files.iter().cloned().collect(),
            modified: self.modified.iter().cloned().collect(),
        };

        log::info!(
            "committed {} directories, {} files and {} modified files",
            report.directories.len(),
            report.files.len(),
            report.modified.len()
        );

        Ok(report)
    }

    fn move_into_place(&self, file: &Path) -> Result<(), GenerateError> {
        self.output
            .rename(&self.scratch.path.join(file), file)
            .map_err(|error| IoError::new(FileOperation::Rename, file.to_path_buf(), error))?;

        Ok(())
    }

    /// Removes everything below the output root except the scratch area.
    /// A missing root has nothing to remove.
    fn empty_output_dir(&self) -> Result<(), GenerateError> {
        let root = Path::new("");

        let names = match self.output.read_dir(root) {
            Ok(names) => names,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(error) => {
                return Err(GenerateError::CleanOutputDir(IoError::new(
                    FileOperation::ReadDir,
                    root.to_path_buf(),
                    error,
                )))
            }
        };

        for name in names {
            if Path::new(&name) == self.scratch.path {
                continue;
            }

            log::debug!("removing {} from output dir", name);

            self.output.remove_all(Path::new(&name)).map_err(|error| {
                GenerateError::CleanOutputDir(IoError::new(
                    FileOperation::Remove,
                    PathBuf::from(&name),
                    error,
                ))
            })?;
        }

        Ok(())
    }
}

impl Drop for Staging<'_> {
    fn drop(&mut self) {
        if self.removed {
            return;
        }

        log::debug!("removing scratch area {}", self.scratch.path.display());

        if let Err(error) = self.output.remove_all(&self.scratch.path) {
            log::warn!(
                "unable to remove scratch area {}: {}",
                self.scratch.path.display(),
                error
            );
        }
    }
}
