// Integration testing can be done either by calling library functions directly or by invoking your CLI as a subprocess.
use predicates::prelude::*;
use std::{fs, path::Path};

fn write_blueprint(dir: &Path) {
    fs::write(
        dir.join("blueprint.toml"),
        r#"
[questions.project_name]
type = "Text"
help = "Name of the crate"

[questions.with_tests]
type = "Confirm"
help = "Add a tests directory?"
default = false
"#,
    )
    .unwrap();

    fs::write(dir.join("README.md.tera"), "# {{ project_name }}\n").unwrap();
    fs::write(dir.join(".gitignore"), "/target\n").unwrap();

    let src = dir.join("{{ project_name }}");
    fs::create_dir(&src).unwrap();
    fs::write(src.join("lib.rs.tera"), "// {{ project_name }}\n").unwrap();

    let tests = dir.join("{% if with_tests %}tests{% endif %}");
    fs::create_dir(&tests).unwrap();
    fs::write(tests.join("smoke.rs"), "").unwrap();
}

#[test]
fn new_project_from_local_blueprint() {
    let blueprint = tempfile::tempdir().unwrap();
    write_blueprint(blueprint.path());

    let parent = tempfile::tempdir().unwrap();
    let destination = parent.path().join("baouncer");

    let mut cmd = assert_cmd::Command::cargo_bin("stagehand").unwrap();

    cmd.arg("new")
        .arg(blueprint.path())
        .arg(&destination)
        .arg("--yes")
        .arg("--set")
        .arg("project_name=baouncer");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("create"));

    assert_eq!(
        fs::read_to_string(destination.join("README.md")).unwrap(),
        "# baouncer\n"
    );
    assert_eq!(
        fs::read_to_string(destination.join("baouncer/lib.rs")).unwrap(),
        "// baouncer\n"
    );
    assert!(destination.join(".gitignore").is_file());
    assert!(!destination.join("tests").exists());
    assert!(!destination.join("blueprint.toml").exists());
}

#[test]
fn existing_files_need_overwrite() {
    let blueprint = tempfile::tempdir().unwrap();
    write_blueprint(blueprint.path());

    let destination = tempfile::tempdir().unwrap();
    fs::write(destination.path().join("README.md"), "mine").unwrap();

    let run = |overwrite: bool| {
        let mut cmd = assert_cmd::Command::cargo_bin("stagehand").unwrap();
        cmd.arg("new")
            .arg(blueprint.path())
            .arg(destination.path())
            .args(["--yes", "--set", "project_name=demo"]);
        if overwrite {
            cmd.arg("--overwrite");
        }
        cmd.assert()
    };

    run(false)
        .failure()
        .stderr(predicate::str::contains("README.md"));
    assert_eq!(
        fs::read_to_string(destination.path().join("README.md")).unwrap(),
        "mine"
    );

    run(true).success();
    assert_eq!(
        fs::read_to_string(destination.path().join("README.md")).unwrap(),
        "# demo\n"
    );
}

#[test]
fn rejects_malformed_set() {
    let blueprint = tempfile::tempdir().unwrap();
    write_blueprint(blueprint.path());
    let destination = tempfile::tempdir().unwrap();

    let mut cmd = assert_cmd::Command::cargo_bin("stagehand").unwrap();

    cmd.arg("new")
        .arg(blueprint.path())
        .arg(destination.path())
        .args(["--yes", "--set", "project_name"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("key=value"));
}
