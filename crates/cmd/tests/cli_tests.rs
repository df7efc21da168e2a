// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use cmd::{Cli, parse_key_value, run};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn setup() -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    fs::create_dir_all(dir.path().join("in")).expect("create in dir");
    fs::write(dir.path().join("in/data.txt"), "header\nline1\nline2\n").expect("write data");
    fs::write(dir.path().join("in/other.csv"), "a;b\n").expect("write csv");
    fs::write(
        dir.path().join("fixed.yaml"),
        "files:\n  - fileName: ${DIR}\n    fileMask: '.*\\.txt'\ncontent:\n  fileType: FIXED\n",
    )
    .expect("write step");
    dir
}

fn cli(dir: &TempDir, extra: &[&str]) -> Cli {
    let step = dir.path().join("fixed.yaml");
    let root = dir.path().to_string_lossy().to_string();
    let mut args = vec![
        "textinput",
        "--step",
        step.to_str().expect("utf-8 path"),
        "--root",
        root.as_str(),
        "--var",
        "DIR=/in",
    ];
    args.extend_from_slice(extra);
    Cli::try_parse_from(args).expect("parse args")
}

#[test]
fn test_parse_key_value() {
    assert_eq!(
        parse_key_value("filter=a=b").expect("valid"),
        ("filter".to_string(), "a=b".to_string())
    );
    assert!(parse_key_value("novalue").is_err());
    assert!(parse_key_value("=x").is_err());
}

#[test]
fn test_step_name_defaults_to_file_stem() {
    let dir = setup();
    let request = cli(&dir, &["--action", "showFiles"]).request();
    assert_eq!(request.step_name(), Some("fixed"));

    let request = cli(&dir, &["--action", "showFiles", "--param", "stepName=input"]).request();
    assert_eq!(request.step_name(), Some("input"));
}

#[tokio::test]
async fn test_show_files_on_host_directory() -> anyhow::Result<()> {
    let dir = setup();
    let response = run(&cli(&dir, &["--action", "showFiles"])).await?;
    assert_eq!(
        response.to_json()?,
        json!({"actionStatus": "SUCCESS", "files": ["/in/data.txt"]})
    );
    Ok(())
}

#[tokio::test]
async fn test_show_content_on_host_directory() -> anyhow::Result<()> {
    let dir = setup();
    let response = run(&cli(
        &dir,
        &[
            "--action",
            "showContent",
            "--param",
            "nrlines=5",
            "--param",
            "skipHeaders=true",
        ],
    ))
    .await?;
    assert_eq!(
        response.to_json()?,
        json!({"actionStatus": "SUCCESS", "firstFileContent": ["line1", "line2"]})
    );
    Ok(())
}

#[tokio::test]
async fn test_failure_response_is_not_an_error() -> anyhow::Result<()> {
    let dir = setup();
    let response = run(&cli(&dir, &["--action", "showContent"])).await?;
    assert!(!response.is_success());
    assert_eq!(response.to_json()?["error"], "PARAM");
    Ok(())
}

#[tokio::test]
async fn test_missing_step_file_is_an_error() {
    let dir = setup();
    let mut cli = cli(&dir, &["--action", "showFiles"]);
    cli.step = dir.path().join("absent.yaml");
    assert!(run(&cli).await.is_err());
}
