use clap::{
    crate_authors, crate_description, crate_name, crate_version, Arg, ArgAction, ArgMatches,
    Command,
};
use indexmap::IndexMap;
use miette::IntoDiagnostic;
use stagehand::{
    api::{self, NewProject},
    CancellationToken,
};
use std::path::PathBuf;

// The CLI layer should only parse inputs and forward them to library code.
fn main() -> miette::Result<()> {
    let matches = Command::new(crate_name!())
        .about(crate_description!())
        .author(crate_authors!())
        .version(crate_version!())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("new")
                .about("Generates a project from a local blueprint directory")
                .arg(
                    Arg::new("blueprint")
                        .help("Directory holding the blueprint")
                        .required(true),
                )
                .arg(
                    Arg::new("destination")
                        .help("The destination directory where the project will be created")
                        .required(true),
                )
                .arg(
                    Arg::new("set")
                        .help("Answer a question without prompting, as key=value")
                        .long("set")
                        .value_name("KEY=VALUE")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("yes")
                        .help("Use defaults for unanswered questions and skip the confirmation")
                        .short('y')
                        .long("yes")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("overwrite")
                        .help("Replace files that already exist in the destination")
                        .long("overwrite")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("strict-dirs")
                        .help("Fail if a directory already exists in the destination")
                        .long("strict-dirs")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("clean")
                        .help("Remove everything in the destination before generating")
                        .long("clean")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    let is_verbose = matches.get_flag("verbose");

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if is_verbose { "debug" } else { "warn" }),
    )
    .init();

    match matches.subcommand() {
        Some(("new", args)) => handle_new(args),
        _ => unreachable!(),
    }
}

fn parse_presets(args: &ArgMatches) -> miette::Result<IndexMap<String, String>> {
    let mut presets = IndexMap::new();

    for pair in args.get_many::<String>("set").unwrap_or_default() {
        let Some((key, value)) = pair.split_once('=') else {
            miette::bail!("expected key=value, got '{}'", pair);
        };

        presets.insert(key.trim().to_string(), value.to_string());
    }

    Ok(presets)
}

fn handle_new(args: &ArgMatches) -> miette::Result<()> {
    let blueprint = args
        .get_one::<String>("blueprint")
        .ok_or_else(|| miette::miette!("blueprint required"))?;
    let destination = args
        .get_one::<String>("destination")
        .ok_or_else(|| miette::miette!("destination required"))?;

    let request = NewProject {
        blueprint: PathBuf::from(blueprint),
        destination: PathBuf::from(destination),
        presets: parse_presets(args)?,
        assume_yes: args.get_flag("yes"),
        overwrite: args.get_flag("overwrite"),
        strict_dirs: args.get_flag("strict-dirs"),
        clean: args.get_flag("clean"),
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            log::warn!("interrupted, stopping before the next entry");
            cancel.cancel();
        })
        .into_diagnostic()?;
    }

    api::new_project(&request, &cancel)?;

    Ok(())
}
