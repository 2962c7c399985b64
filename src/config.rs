use crate::{
    errors::{FileOperation, IoError},
    generator::GeneratorOptions,
    prompt::Question,
};
use indexmap::IndexMap;
use miette::Diagnostic;
use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Name of the blueprint config file. It is never generated into the output.
pub const CONFIG_FILE: &str = "blueprint.toml";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("I/O error within config domain")]
    #[diagnostic(code(stagehand::config::io))]
    Io(#[from] IoError),

    #[error("Unable to parse toml file at '{path}': {source}")]
    #[diagnostic(code(stagehand::config::parse_toml), help("Review toml file"))]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Contents of a `blueprint.toml`.
///
/// ```toml
/// [options]
/// error_on_existing_file = false
///
/// [questions.project_name]
/// type = "Text"
/// help = "Name of the crate"
/// default = "demo"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BlueprintConfig {
    pub options: GeneratorOptions,
    pub questions: IndexMap<String, Question>,
}
impl BlueprintConfig {
    /// Reads the config of the blueprint in `blueprint_dir`. A blueprint without
    /// a config file gets the defaults.
    pub fn load<P: AsRef<Path>>(blueprint_dir: P) -> Result<Self, ConfigError> {
        let path = blueprint_dir.as_ref().join(CONFIG_FILE);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                log::debug!("no {} in blueprint, using defaults", CONFIG_FILE);
                return Ok(Self::default());
            }
            Err(error) => Err(IoError::new(FileOperation::Read, path.clone(), error))?,
        };

        toml::from_str(&content).map_err(|source| ConfigError::ParseToml { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::QuestionType;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let config = BlueprintConfig::load(dir.path()).unwrap();

        assert_eq!(config.options, GeneratorOptions::default());
        assert!(config.questions.is_empty());
    }

    #[test]
    fn parses_options_and_questions_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
[options]
empty_output_dir = true

[questions.project_name]
type = "Text"
help = "Name of the crate"
default = "demo"

[questions.license]
type = "Select"
help = "License"
choices = ["MIT", "Apache-2.0"]
"#,
        )
        .unwrap();

        let config = BlueprintConfig::load(dir.path()).unwrap();

        assert!(config.options.empty_output_dir);
        assert!(config.options.error_on_existing_file);

        let names: Vec<&String> = config.questions.keys().collect();
        assert_eq!(names, vec!["project_name", "license"]);
        assert!(matches!(
            config.questions["license"].r#type,
            QuestionType::Select
        ));
    }

    #[test]
    fn reports_broken_toml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[options").unwrap();

        let error = BlueprintConfig::load(dir.path()).unwrap_err();

        assert!(matches!(error, ConfigError::ParseToml { .. }));
    }
}
