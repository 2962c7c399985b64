use crate::{
    config::CONFIG_FILE,
    entry::{Entry, TeraTemplate},
    errors::{BoxError, FileOperation, IoError},
};
use miette::Diagnostic;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tera::{Context, Tera};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error, Diagnostic)]
pub enum TemplateError {
    #[error("I/O error within template domain")]
    #[diagnostic(code(stagehand::template::io))]
    Io(#[from] IoError),

    #[error("Error occurred attempting to initialize tera instance")]
    #[diagnostic(code(stagehand::template::tera_instance_initialization))]
    TeraInstanceInitialization {
        pattern: String,
        #[source]
        source: tera::Error,
    },

    #[error("Error occurred attempting to render path segment '{segment}'")]
    #[diagnostic(code(stagehand::template::render))]
    Render {
        segment: String,
        #[source]
        source: tera::Error,
    },

    #[error("unable to strip prefix from directory")]
    #[diagnostic(code(stagehand::template::strip_prefix))]
    StripPrefix {
        path: PathBuf,
        dir: PathBuf,
        source: std::path::StripPrefixError,
    },
}

const TERA_FILE_EXTENSION: &str = ".tera";

/// A blueprint directory on disk together with the data it is rendered with.
struct Blueprint {
    root: PathBuf,
    tera: Arc<Tera>,
    context: Context,
}

/// Renders a single file or directory name as a tera template.
///
/// Returns `None` if it renders to nothing, which drops the node and everything below it.
/// For example `{% if with_tests %}tests{% endif %}` with `with_tests = false`.
fn render_segment(segment: &str, ctx: &Context) -> Result<Option<String>, TemplateError> {
    let rendered = Tera::one_off(segment, ctx, false).map_err(|error| TemplateError::Render {
        segment: segment.to_string(),
        source: error,
    })?;

    let rendered = rendered.trim();
    if rendered.is_empty() {
        return Ok(None);
    }

    Ok(Some(rendered.to_string()))
}

/// Name under which [`Tera`] registered the template at `path`.
fn template_name(blueprint: &Blueprint, path: &Path) -> Result<String, TemplateError> {
    let relative = path
        .strip_prefix(&blueprint.root)
        .map_err(|error| TemplateError::StripPrefix {
            path: path.to_path_buf(),
            dir: blueprint.root.clone(),
            source: error,
        })?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Builds the entries for the direct children of `dir`.
///
/// Subdirectories become deferred [`Entry::Directory`] nodes that list their own
/// children when the generator reaches them.
fn list_dir(blueprint: &Arc<Blueprint>, dir: &Path) -> Result<Vec<Entry>, TemplateError> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(error) => {
                let path = error.path().unwrap_or(dir).to_path_buf();

                Err(IoError::new(FileOperation::ReadDir, path, error.into()))?
            }
        };

        // skip blueprint config file
        let file_name = entry.file_name().to_string_lossy();
        if dir == blueprint.root && file_name == CONFIG_FILE {
            continue;
        }

        let Some(name) = render_segment(&file_name, &blueprint.context)? else {
            log::debug!("skipping {}: name rendered empty", entry.path().display());
            continue;
        };

        if entry.file_type().is_dir() {
            let blueprint = Arc::clone(blueprint);
            let path = entry.path().to_path_buf();

            entries.push(Entry::dir_with(name, move || {
                list_dir(&blueprint, &path).map_err(|error| Box::new(error) as BoxError)
            }));
        } else if let Some(stem) = name.strip_suffix(TERA_FILE_EXTENSION) {
            let template = TeraTemplate::new(
                Arc::clone(&blueprint.tera),
                template_name(blueprint, entry.path())?,
            );

            entries.push(Entry::templated(stem, template, blueprint.context.clone()));
        } else {
            let contents = fs::read(entry.path()).map_err(|error| {
                IoError::new(FileOperation::Read, entry.path().to_path_buf(), error)
            })?;

            entries.push(Entry::plain(name, contents));
        }
    }

    Ok(entries)
}

/// Turns the blueprint in `blueprint_dir` into the entries to generate.
///
/// - file and directory names are rendered with `context`; a name that renders
///   empty is skipped along with everything below it
/// - `*.tera` files are rendered with `context` and lose their extension
/// - every other file is copied as is
/// - the blueprint's own `blueprint.toml` is left out
pub fn load_blueprint<P: AsRef<Path>>(
    blueprint_dir: P,
    context: Context,
) -> Result<Vec<Entry>, TemplateError> {
    let root = fs::canonicalize(blueprint_dir.as_ref()).map_err(|error| {
        IoError::new(
            FileOperation::Read,
            blueprint_dir.as_ref().to_path_buf(),
            error,
        )
    })?;

    let pattern = format!("{}/**/*{}", root.display(), TERA_FILE_EXTENSION);

    let tera = Tera::new(&pattern)
        .map_err(|e| TemplateError::TeraInstanceInitialization { pattern, source: e })?;

    let blueprint = Arc::new(Blueprint {
        root,
        tera: Arc::new(tera),
        context,
    });

    list_dir(&blueprint, &blueprint.root)
}
