use crate::{
    config::{self, BlueprintConfig},
    disk::DiskBackend,
    errors::{FileOperation, GenerateError, IoError},
    generator::{CancellationToken, Generator, GeneratorOptions},
    preview, prompt, template,
    transactions::GenerationReport,
};
use colored::Colorize;
use indexmap::IndexMap;
use std::{fs, path::PathBuf};

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum StagehandError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] template::TemplateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Prompt(#[from] prompt::PromptError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Io(#[from] IoError),
}

/// Everything `stagehand new` was asked to do.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub blueprint: PathBuf,
    pub destination: PathBuf,
    /// `--set` answers, by question name.
    pub presets: IndexMap<String, String>,
    /// Use defaults for unanswered questions and skip the confirmation.
    pub assume_yes: bool,
    pub overwrite: bool,
    pub strict_dirs: bool,
    pub clean: bool,
}
impl NewProject {
    /// Applies the command line flags on top of the blueprint's `[options]`.
    fn options(&self, mut options: GeneratorOptions) -> GeneratorOptions {
        if self.overwrite {
            options.error_on_existing_file = false;
        }
        if self.strict_dirs {
            options.error_on_existing_dir = true;
        }
        if self.clean {
            options.empty_output_dir = true;
        }

        options
    }
}

/// Generates the blueprint of `request` into its destination.
///
/// Returns `None` when the user declined the preview.
///
/// # Errors
///
/// Returns a [`StagehandError`] if:
///
/// - `blueprint.toml` cannot be read or parsed.
/// - A question cannot be answered, or a `--set` answer does not fit its question.
/// - Tera fails to initialize or render a path or a template.
/// - The destination cannot be created, or generating into it fails.
pub fn new_project(
    request: &NewProject,
    cancel: &CancellationToken,
) -> Result<Option<GenerationReport>, StagehandError> {
    log::debug!("loading blueprint from {}", request.blueprint.display());

    let config = BlueprintConfig::load(&request.blueprint)?;

    let options = request.options(config.options);
    log::debug!("generator options: {:?}", options);

    let answers = prompt::get_answers(&config.questions, &request.presets, request.assume_yes)?;

    let context = prompt::make_tera_context(&answers);

    let entries = template::load_blueprint(&request.blueprint, context)?;

    if !request.assume_yes {
        preview::preview_as_tree(&entries, &request.destination)?;

        if !prompt::apply_changes()? {
            log::info!("generation declined");
            return Ok(None);
        }
    }

    fs::create_dir_all(&request.destination).map_err(|error| {
        IoError::new(FileOperation::Mkdir, request.destination.clone(), error)
    })?;

    let report = Generator::with_options(DiskBackend::new(&request.destination), options)
        .generate(cancel, entries)?;

    for path in report.directories.iter().chain(&report.files) {
        println!("{} {}", "create".green(), request.destination.join(path).display());
    }
    for path in &report.modified {
        println!("{} {}", "modify".yellow(), request.destination.join(path).display());
    }

    Ok(Some(report))
}
