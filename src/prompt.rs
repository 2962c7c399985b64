use indexmap::IndexMap;
use inquire::{required, validator::MinLengthValidator, Confirm, MultiSelect, Select, Text};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use tera::Context;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PromptError {
    #[error("Error occurred trying to prompt user")]
    #[diagnostic(code(stagehand::prompt::inquire))]
    Inquire(#[from] inquire::InquireError),

    #[error("Question '{question}' has no choices")]
    #[diagnostic(
        code(stagehand::prompt::missing_choices),
        help("Add a `choices` list to the question in blueprint.toml")
    )]
    MissingChoices { question: String },

    #[error("Invalid answer '{value}' for question '{question}'")]
    #[diagnostic(code(stagehand::prompt::invalid_answer))]
    InvalidAnswer { question: String, value: String },
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub enum QuestionType {
    Text,
    Confirm,
    Select,
    MultiSelect,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub r#type: QuestionType,
    pub help: String,
    pub choices: Option<Vec<String>>,
    pub default: Option<toml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    String(String),
    Bool(bool),
    Array(Vec<String>),
}

fn choices_of<'a>(question: &str, config: &'a Question) -> Result<&'a [String], PromptError> {
    match config.choices.as_deref() {
        Some(choices) if !choices.is_empty() => Ok(choices),
        _ => Err(PromptError::MissingChoices {
            question: question.to_string(),
        }),
    }
}

/// Turns a `--set question=value` string into an answer of the right shape.
fn parse_preset(question: &str, config: &Question, value: &str) -> Result<Answer, PromptError> {
    let invalid = || PromptError::InvalidAnswer {
        question: question.to_string(),
        value: value.to_string(),
    };

    match config.r#type {
        QuestionType::Text => Ok(Answer::String(value.to_string())),
        QuestionType::Confirm => match value {
            "true" | "yes" | "y" => Ok(Answer::Bool(true)),
            "false" | "no" | "n" => Ok(Answer::Bool(false)),
            _ => Err(invalid()),
        },
        QuestionType::Select => {
            let choices = choices_of(question, config)?;
            if choices.iter().any(|choice| choice == value) {
                Ok(Answer::String(value.to_string()))
            } else {
                Err(invalid())
            }
        }
        QuestionType::MultiSelect => {
            let choices = choices_of(question, config)?;
            let picked: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect();

            if picked.is_empty() || picked.iter().any(|p| !choices.contains(p)) {
                Err(invalid())
            } else {
                Ok(Answer::Array(picked))
            }
        }
    }
}

fn default_answer(config: &Question) -> Option<Answer> {
    match (&config.default, config.r#type) {
        (Some(toml::Value::Boolean(b)), QuestionType::Confirm) => Some(Answer::Bool(*b)),
        (Some(toml::Value::String(s)), QuestionType::Text | QuestionType::Select) => {
            Some(Answer::String(s.clone()))
        }
        (Some(toml::Value::Array(values)), QuestionType::MultiSelect) => Some(Answer::Array(
            values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        )),
        _ => None,
    }
}

fn ask(question: &str, config: &Question) -> Result<Answer, PromptError> {
    let answer = match config.r#type {
        QuestionType::Text => {
            let mut prompt = Text::new(question)
                .with_help_message(&config.help)
                .with_validator(required!(format!("{} is required", question)));
            if let Some(toml::Value::String(default)) = &config.default {
                prompt = prompt.with_default(default);
            }
            Answer::String(prompt.prompt()?)
        }
        QuestionType::Confirm => {
            let mut prompt = Confirm::new(question).with_help_message(&config.help);
            if let Some(toml::Value::Boolean(default)) = &config.default {
                prompt = prompt.with_default(*default);
            }
            Answer::Bool(prompt.prompt()?)
        }
        QuestionType::Select => {
            let choices = choices_of(question, config)?.to_vec();
            Answer::String(
                Select::new(question, choices)
                    .with_help_message(&config.help)
                    .prompt()?,
            )
        }
        QuestionType::MultiSelect => {
            let choices = choices_of(question, config)?.to_vec();
            Answer::Array(
                MultiSelect::new(question, choices)
                    .with_help_message(&config.help)
                    .with_validator(MinLengthValidator::new(1))
                    .prompt()?,
            )
        }
    };

    Ok(answer)
}

/// Answers every question, in declaration order.
///
/// Presets win; with `use_defaults` a question that has a default is not asked.
/// Everything else is asked interactively.
pub fn get_answers(
    questions: &IndexMap<String, Question>,
    presets: &IndexMap<String, String>,
    use_defaults: bool,
) -> Result<IndexMap<String, Answer>, PromptError> {
    let mut answers: IndexMap<String, Answer> = IndexMap::new();

    for (question, config) in questions {
        let answer = if let Some(value) = presets.get(question) {
            parse_preset(question, config, value)?
        } else if let Some(default) = default_answer(config).filter(|_| use_defaults) {
            default
        } else {
            ask(question, config)?
        };

        answers.insert(question.clone(), answer);
    }

    // Presets without a matching question are passed through as text.
    for (key, value) in presets {
        if !answers.contains_key(key) {
            answers.insert(key.clone(), Answer::String(value.clone()));
        }
    }

    Ok(answers)
}

/// Makes a [`Context`] object, hydrated with the answers.
pub fn make_tera_context(answers: &IndexMap<String, Answer>) -> Context {
    let mut context = Context::new();

    for (key, answer) in answers {
        match answer {
            Answer::String(s) => context.insert(key, s),
            Answer::Bool(b) => context.insert(key, b),
            Answer::Array(arr) => context.insert(key, arr),
        }
    }

    context
}

pub fn apply_changes() -> Result<bool, PromptError> {
    Ok(Confirm::new("Apply changes?").with_default(true).prompt()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(r#type: QuestionType, choices: Option<&[&str]>, default: Option<toml::Value>) -> Question {
        Question {
            r#type,
            help: String::new(),
            choices: choices.map(|c| c.iter().map(|s| s.to_string()).collect()),
            default,
        }
    }

    #[test]
    fn presets_and_defaults_answer_without_prompting() {
        let mut questions = IndexMap::new();
        questions.insert(
            "project_name".to_string(),
            question(QuestionType::Text, None, Some("demo".into())),
        );
        questions.insert(
            "license".to_string(),
            question(QuestionType::Select, Some(&["MIT", "Apache-2.0"]), None),
        );
        questions.insert(
            "ci".to_string(),
            question(QuestionType::Confirm, None, Some(true.into())),
        );

        let mut presets = IndexMap::new();
        presets.insert("license".to_string(), "MIT".to_string());
        presets.insert("author".to_string(), "someone".to_string());

        let answers = get_answers(&questions, &presets, true).unwrap();

        assert_eq!(answers["project_name"], Answer::String("demo".to_string()));
        assert_eq!(answers["license"], Answer::String("MIT".to_string()));
        assert_eq!(answers["ci"], Answer::Bool(true));
        assert_eq!(answers["author"], Answer::String("someone".to_string()));
    }

    #[test]
    fn rejects_presets_outside_the_choices() {
        let config = question(QuestionType::MultiSelect, Some(&["a", "b"]), None);

        assert_eq!(
            parse_preset("features", &config, "a, b").unwrap(),
            Answer::Array(vec!["a".to_string(), "b".to_string()])
        );
        assert!(matches!(
            parse_preset("features", &config, "a,c"),
            Err(PromptError::InvalidAnswer { .. })
        ));
        assert!(matches!(
            parse_preset("ci", &question(QuestionType::Confirm, None, None), "maybe"),
            Err(PromptError::InvalidAnswer { .. })
        ));
    }

    #[test]
    fn context_holds_every_answer() {
        let mut answers = IndexMap::new();
        answers.insert("name".to_string(), Answer::String("demo".to_string()));
        answers.insert("ci".to_string(), Answer::Bool(false));

        let context = make_tera_context(&answers);

        assert_eq!(
            tera::Tera::one_off("{{ name }}-{{ ci }}", &context, false).unwrap(),
            "demo-false"
        );
    }
}
