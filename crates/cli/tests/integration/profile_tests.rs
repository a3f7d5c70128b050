use std::fs;

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn info_on_fresh_profile_prints_nothing() {
  let env = TestEnv::new();

  env.prof_cmd().arg("info").assert().success().stdout("");
}

#[test]
fn install_then_info() {
  let env = TestEnv::new();
  env.write_package("hello", &[("bin/hello", "#!/bin/sh\necho hello\n")]);

  env
    .prof_cmd()
    .args(["install", "pkgs#hello"])
    .assert()
    .success()
    .stdout(predicate::str::contains("installed pkgs#hello"));

  assert!(env.profile_path().join("bin/hello").exists());

  env
    .prof_cmd()
    .arg("info")
    .assert()
    .success()
    .stdout(predicate::str::starts_with("0 pkgs#hello path:"))
    .stdout(predicate::str::contains("-hello\n"));
}

#[test]
fn info_json_output_is_valid() {
  let env = TestEnv::new();
  env.write_package("hello", &[("bin/hello", "hello")]);
  env.prof_cmd().args(["install", "pkgs#hello"]).assert().success();

  let output = env.prof_cmd().args(["info", "-o", "json"]).output().unwrap();
  assert!(output.status.success());

  let elements: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(elements[0]["index"], 0);
  assert_eq!(elements[0]["original"], "pkgs#hello");
  assert_eq!(elements[0]["active"], true);
  assert_eq!(elements[0]["storePaths"].as_array().unwrap().len(), 1);
}

#[test]
fn remove_reports_counts() {
  let env = TestEnv::new();
  env.write_package("hello", &[("bin/hello", "hello")]);
  env.write_package("cowsay", &[("bin/cowsay", "moo")]);
  env
    .prof_cmd()
    .args(["install", "pkgs#hello", "pkgs#cowsay"])
    .assert()
    .success();

  env
    .prof_cmd()
    .args(["remove", "0"])
    .assert()
    .success()
    .stdout(predicate::str::contains("removed 1 packages, kept 1 packages"));

  env
    .prof_cmd()
    .arg("info")
    .assert()
    .success()
    .stdout(predicate::str::starts_with("0 pkgs#cowsay"));
}

#[test]
fn upgrade_picks_up_source_changes() {
  let env = TestEnv::new();
  env.write_package("hello", &[("bin/hello", "v1")]);
  env.prof_cmd().args(["install", "pkgs#hello"]).assert().success();

  env
    .prof_cmd()
    .args(["upgrade", ".*"])
    .assert()
    .success()
    .stdout(predicate::str::contains("upgraded 0 packages"));

  env.write_package("hello", &[("bin/hello", "v2")]);
  env
    .prof_cmd()
    .args(["upgrade", "hello"])
    .assert()
    .success()
    .stdout(predicate::str::contains("upgraded 1 packages"));

  assert_eq!(fs::read_to_string(env.profile_path().join("bin/hello")).unwrap(), "v2");
}

#[test]
fn install_rejects_store_paths() {
  let env = TestEnv::new();

  env
    .prof_cmd()
    .args(["install", "/some/path"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("is not a package reference"));

  assert!(!env.profile_path().exists());
}

#[test]
fn install_unknown_attribute_fails() {
  let env = TestEnv::new();
  env.write_package("hello", &[("bin/hello", "hello")]);

  env
    .prof_cmd()
    .args(["install", "pkgs#nope"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("does not provide attribute 'nope'"));
}

#[test]
fn invalid_pattern_fails() {
  let env = TestEnv::new();

  env
    .prof_cmd()
    .args(["remove", "[unclosed"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid element pattern"));
}

#[test]
fn unsupported_manifest_version_fails() {
  let env = TestEnv::new();
  let profile = env.profile_path();
  fs::create_dir_all(&profile).unwrap();
  fs::write(profile.join("manifest.json"), r#"{"version":2,"elements":[]}"#).unwrap();

  env
    .prof_cmd()
    .arg("info")
    .assert()
    .failure()
    .stderr(predicate::str::contains("unsupported version 2"));
}

#[test]
fn explicit_profile_flag_overrides_environment() {
  let env = TestEnv::new();
  env.write_package("hello", &[("bin/hello", "hello")]);
  let other = env.temp.path().join("other/profile");

  env
    .prof_cmd()
    .arg("--profile")
    .arg(&other)
    .args(["install", "pkgs#hello"])
    .assert()
    .success();

  assert!(other.join("bin/hello").exists());
  assert!(!env.profile_path().exists());
}
