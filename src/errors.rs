use crate::vfs::EntryKind;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error returned by pluggable collaborators (templates, transforms, loaders).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error, Diagnostic)]
pub enum FileOperation {
    #[error("reading a file")]
    Read,
    #[error("writing a file")]
    Write,
    #[error("creating a directory")]
    Mkdir,
    #[error("renaming")]
    Rename,
    #[error("removing")]
    Remove,
    #[error("listing a directory")]
    ReadDir,
    #[error("checking for an existing entry")]
    Stat,
    #[error("creating a scratch area")]
    Scratch,
}
#[derive(Debug, Error, Diagnostic)]
#[error("I/O error: {operation} on path '{path}'")]
#[diagnostic(
    code(stagehand::io),
    help("Check file permissions, disk space, or that the path is correct.")
)]
pub struct IoError {
    pub operation: FileOperation,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
impl IoError {
    pub fn new(operation: FileOperation, path: PathBuf, error: std::io::Error) -> Self {
        Self {
            operation,
            path,
            source: error,
        }
    }
}

/// Everything that can abort a [`crate::Generator::generate`] call.
#[derive(Debug, Error, Diagnostic)]
pub enum GenerateError {
    #[error("invalid entry name '{name}' under '{parent}'")]
    #[diagnostic(
        code(stagehand::invalid_name),
        help("Entry names must be a single, non-empty path component")
    )]
    InvalidName { parent: PathBuf, name: String },

    #[error("{kind} already exists: '{path}'")]
    #[diagnostic(
        code(stagehand::already_exists),
        help("Remove the existing entry or relax the collision policy")
    )]
    AlreadyExists { kind: EntryKind, path: PathBuf },

    #[error("file to modify does not exist: '{path}'")]
    #[diagnostic(code(stagehand::not_found))]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error rendering '{path}'")]
    #[diagnostic(code(stagehand::render))]
    Render {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("error listing entries of directory '{path}'")]
    #[diagnostic(code(stagehand::entries))]
    Entries {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Io(#[from] IoError),

    #[error("error cleaning output dir")]
    #[diagnostic(code(stagehand::clean_output_dir))]
    CleanOutputDir(#[source] IoError),

    #[error("generation cancelled")]
    #[diagnostic(code(stagehand::cancelled))]
    Cancelled,

    #[error("{error}; removing the scratch area failed as well")]
    #[diagnostic(code(stagehand::discard))]
    Discard {
        error: Box<GenerateError>,
        #[source]
        cleanup: IoError,
    },
}
impl GenerateError {
    /// The error that caused the abort, looking through a failed scratch cleanup.
    pub fn root(&self) -> &GenerateError {
        match self {
            GenerateError::Discard { error, .. } => error.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn discard_reports_each_failure_once() {
        let error = GenerateError::Discard {
            error: Box::new(GenerateError::Cancelled),
            cleanup: IoError::new(
                FileOperation::Remove,
                PathBuf::from(".stagehand-1"),
                std::io::Error::other("busy"),
            ),
        };

        assert_eq!(
            error.to_string(),
            "generation cancelled; removing the scratch area failed as well"
        );

        let cleanup = error
            .source()
            .and_then(|source| source.downcast_ref::<IoError>())
            .unwrap();
        assert_eq!(cleanup.path, PathBuf::from(".stagehand-1"));
        assert!(cleanup
            .source()
            .is_some_and(|source| source.to_string() == "busy"));

        assert!(matches!(error.root(), GenerateError::Cancelled));
    }
}
