#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;

fn drupal_aws() -> Command {
    Command::cargo_bin("drupal_aws").unwrap()
}

/// CLIヘルプにサブコマンドが並ぶことを確認
#[test]
fn test_cli_help() {
    drupal_aws()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Launch a Puppet-managed Drupal stack on AWS"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("destroy"));
}

#[test]
fn test_cli_version_short_flag() {
    drupal_aws()
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

/// 引数なしではヘルプを出して正常終了
#[test]
fn test_cli_without_command_prints_help() {
    drupal_aws()
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_help_subcommand() {
    drupal_aws()
        .arg("help")
        .assert()
        .success()
        .stdout(predicate::str::contains("destroy"));
}

#[test]
fn test_unknown_command_fails() {
    drupal_aws()
        .arg("deploy")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("deploy"));
}

#[test]
fn test_unknown_option_fails() {
    drupal_aws().args(["create", "--force"]).assert().code(1);
}

#[test]
fn test_create_help() {
    drupal_aws()
        .args(["create", "-h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--email"));
}

#[test]
fn test_status_help() {
    drupal_aws()
        .args(["status", "-h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_destroy_help() {
    drupal_aws()
        .args(["destroy", "-h"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--yes"));
}

/// 壊れた設定ファイルはエラー終了
#[test]
fn test_invalid_config_fails() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("drupal-launcher.yaml");
    std::fs::write(&config, "region: [unterminated").unwrap();

    drupal_aws()
        .env("DRUPAL_LAUNCHER_CONFIG", &config)
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

/// 確認プロンプトで拒否すると何も削除しない
#[test]
fn test_destroy_declined() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("drupal-launcher.yaml");
    std::fs::write(&config, "region: us-west-2\n").unwrap();

    drupal_aws()
        .env("DRUPAL_LAUNCHER_CONFIG", &config)
        .arg("destroy")
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Are you sure"))
        .stdout(predicate::str::contains("Aborted."));
}
