use clap::Parser;
use contacts_cli::app::{run_cli, Cli, Command, GroupArg, SortArg};
use std::fs;
use tempfile::NamedTempFile;

const SNAPSHOT: &str = r#"
[[contacts]]
uid = "bob"
name = "Bob"

[[rosters]]
uid = "bob@mesh"
account = "mesh0"
presence = "available"
masters = ["bob"]
"#;

fn snapshot_file() -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    fs::write(file.path(), SNAPSHOT).expect("write");
    file
}

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("styrene-contacts").chain(args.iter().copied()))
        .expect("args")
}

#[test]
fn parses_sort_and_group_flags() {
    let cli = parse(&[
        "--json",
        "list",
        "--snapshot",
        "book.toml",
        "--sort",
        "presence",
        "--group",
        "online",
    ]);
    assert!(cli.json);
    let Command::List(args) = cli.command else {
        panic!("expected list");
    };
    assert_eq!(args.view.sort, Some(SortArg::Presence));
    assert_eq!(args.view.group, Some(GroupArg::Online));
}

#[test]
fn list_and_show_succeed_on_snapshot() {
    let file = snapshot_file();
    let path = file.path().to_str().expect("utf-8 path");
    run_cli(parse(&["--quiet", "list", "--snapshot", path])).expect("list");
    run_cli(parse(&["--quiet", "show", "bob", "--snapshot", path])).expect("show");
}

#[test]
fn show_unknown_uid_fails() {
    let file = snapshot_file();
    let path = file.path().to_str().expect("utf-8 path");
    let err = run_cli(parse(&["--quiet", "show", "ghost", "--snapshot", path]))
        .expect_err("unknown");
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn config_file_is_applied_and_validated() {
    let file = snapshot_file();
    let path = file.path().to_str().expect("utf-8 path");

    let config = NamedTempFile::new().expect("temp file");
    fs::write(config.path(), "primary_sort = \"presence\"\n").expect("write");
    let config_path = config.path().to_str().expect("utf-8 path");
    let args = [
        "--quiet",
        "--config",
        config_path,
        "list",
        "--snapshot",
        path,
    ];
    run_cli(parse(&args)).expect("list");

    fs::write(config.path(), "primary_sort = \"age\"\n").expect("write");
    let err = run_cli(parse(&args)).expect_err("invalid config");
    assert!(format!("{err:#}").contains("invalid list store config"));
}

#[test]
fn missing_snapshot_names_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gone.toml");
    let err = run_cli(parse(&["list", "--snapshot", path.to_str().expect("utf-8 path")]))
        .expect_err("missing");
    assert!(err.to_string().contains("gone.toml"));
}
