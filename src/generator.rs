use crate::{
    entry::Entry,
    errors::{FileOperation, GenerateError, IoError},
    transactions::{GenerationReport, Staging},
    utils::is_plain_name,
    vfs::{Backend, OpenFlags},
};
use serde::Deserialize;
use std::{
    io::{self, Write},
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

const SCRATCH_PATTERN: &str = ".stagehand-*";

/// Collision policy of a [`Generator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Fail if a directory to create is already in the output.
    pub error_on_existing_dir: bool,
    /// Fail if a file to write is already in the output, instead of replacing it.
    pub error_on_existing_file: bool,
    /// Remove everything in the output root before committing.
    pub empty_output_dir: bool,
}
impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            error_on_existing_dir: false,
            error_on_existing_file: true,
            empty_output_dir: false,
        }
    }
}

/// Cooperative cancellation for [`Generator::generate`], checked before every entry.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}
impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Generates trees of [`Entry`] into an output [`Backend`].
///
/// Every call to [`Generator::generate`] first stages all entries into a scratch
/// area of the backend and only touches the output once staging succeeded.
///
/// # Example
///
/// ```rust
/// use stagehand::{CancellationToken, Entry, Generator, MemoryBackend};
///
/// let output = MemoryBackend::new();
/// let mut generator = Generator::new(output.clone());
///
/// generator
///     .generate(
///         &CancellationToken::new(),
///         [
///             Entry::plain("README.md", "hello"),
///             Entry::dir("pkg", [Entry::plain("a.txt", "A")]),
///         ],
///     )
///     .unwrap();
///
/// assert_eq!(output.list(), vec!["README.md", "pkg/", "pkg/a.txt"]);
/// ```
pub struct Generator<B: Backend> {
    output: B,
    options: GeneratorOptions,
    entries: Vec<Entry>,
}

impl<B: Backend> Generator<B> {
    pub fn new(output: B) -> Self {
        Self::with_options(output, GeneratorOptions::default())
    }

    pub fn with_options(output: B, options: GeneratorOptions) -> Self {
        Self {
            output,
            options,
            entries: Vec::new(),
        }
    }

    pub fn error_on_existing_dir(mut self, enabled: bool) -> Self {
        self.options.error_on_existing_dir = enabled;
        self
    }

    pub fn error_on_existing_file(mut self, enabled: bool) -> Self {
        self.options.error_on_existing_file = enabled;
        self
    }

    pub fn empty_output_dir(mut self, enabled: bool) -> Self {
        self.options.empty_output_dir = enabled;
        self
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn output(&self) -> &B {
        &self.output
    }

    /// Queues entries for the next [`Generator::generate`] call.
    ///
    /// Queued entries are never cleared: every later `generate` on this generator
    /// produces them again.
    pub fn add<I: IntoIterator<Item = Entry>>(&mut self, entries: I) -> &mut Self {
        self.entries.extend(entries);
        self
    }

    /// Generates all queued entries plus `entries`.
    ///
    /// On error nothing from this call reaches the output, with two exceptions:
    /// `empty_output_dir` has already cleared the output when committing starts,
    /// and a rename failing during commit leaves the files moved before it in place.
    ///
    /// # Errors
    ///
    /// See [`GenerateError`]; every error names the offending path.
    pub fn generate<I>(
        &mut self,
        cancel: &CancellationToken,
        entries: I,
    ) -> Result<GenerationReport, GenerateError>
    where
        I: IntoIterator<Item = Entry>,
    {
        self.entries.extend(entries);

        let mut staging = Staging::begin(&self.output, SCRATCH_PATTERN)?;

        for entry in &self.entries {
            if let Err(error) = stage(&mut staging, cancel, Path::new(""), entry) {
                log::debug!("staging failed: {}", error);
                return Err(staging.discard(error));
            }
        }

        staging.commit(&self.options)
    }
}

fn stage(
    staging: &mut Staging<'_>,
    cancel: &CancellationToken,
    parent: &Path,
    entry: &Entry,
) -> Result<(), GenerateError> {
    if cancel.is_cancelled() {
        return Err(GenerateError::Cancelled);
    }

    let name = entry.name();
    if !is_plain_name(name) {
        return Err(GenerateError::InvalidName {
            parent: parent.to_path_buf(),
            name: name.to_string(),
        });
    }

    let path = parent.join(name);
    log::debug!("staging {}", path.display());

    match entry {
        Entry::Directory { .. } => stage_dir(staging, cancel, &path, entry),
        Entry::Plain { contents, .. } => {
            stage_file(staging, &path, |sink| {
                sink.write_all(contents)
                    .map_err(|error| IoError::new(FileOperation::Write, path.clone(), error).into())
            })?;
            staging.record_file(path);

            Ok(())
        }
        Entry::Templated { template, data, .. } => {
            stage_file(staging, &path, |sink| {
                template
                    .render(data, sink)
                    .map_err(|source| GenerateError::Render {
                        path: path.clone(),
                        source,
                    })
            })?;
            staging.record_file(path);

            Ok(())
        }
        Entry::Modify { modifier, .. } => {
            let existing = staging.output().read(&path).map_err(|error| {
                if error.kind() == io::ErrorKind::NotFound {
                    GenerateError::NotFound {
                        path: path.clone(),
                        source: error,
                    }
                } else {
                    IoError::new(FileOperation::Read, path.clone(), error).into()
                }
            })?;

            stage_file(staging, &path, |sink| {
                modifier(existing.as_slice(), sink).map_err(|source| GenerateError::Render {
                    path: path.clone(),
                    source,
                })
            })?;
            staging.record_modified(path);

            Ok(())
        }
        // Reserves the name in the scratch area; nothing is committed.
        Entry::Placeholder { .. } => stage_file(staging, &path, |_| Ok(())),
    }
}

fn stage_dir(
    staging: &mut Staging<'_>,
    cancel: &CancellationToken,
    path: &Path,
    dir: &Entry,
) -> Result<(), GenerateError> {
    match staging.scratch().mkdir(path) {
        Ok(()) => {}
        // Sibling entries may name the same directory.
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {}
        Err(error) => {
            return Err(IoError::new(FileOperation::Mkdir, path.to_path_buf(), error).into())
        }
    }

    staging.record_dir(path.to_path_buf());

    let children = dir.entries().map_err(|source| GenerateError::Entries {
        path: path.to_path_buf(),
        source,
    })?;

    for child in children.iter() {
        stage(staging, cancel, path, child)?;
    }

    Ok(())
}

/// Opens `path` in the scratch area and lets `write` fill it.
fn stage_file<F>(staging: &Staging<'_>, path: &Path, write: F) -> Result<(), GenerateError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), GenerateError>,
{
    let mut sink = staging
        .scratch()
        .open_write(path, OpenFlags::create_truncate())
        .map_err(|error| IoError::new(FileOperation::Write, path.to_path_buf(), error))?;

    write(&mut *sink)?;

    sink.flush()
        .map_err(|error| IoError::new(FileOperation::Write, path.to_path_buf(), error))?;

    Ok(())
}
