//! Install, remove, upgrade and info against a local store.

use std::fs;

use prof_lib::ops::{ProfileError, info, install, remove, upgrade};
use prof_lib::resolve::ResolveError;
use prof_lib::store::Store;

use super::common::{Sandbox, args};

#[test]
fn install_links_package_into_profile() {
  let sb = Sandbox::new();
  sb.write_package("hello", &[("bin/hello", "echo hello")]);

  let result = install(&sb.ctx(), &args(&["pkgs#hello"])).unwrap();

  let out_path = &result.installed[0].out_path;
  assert!(sb.store.is_valid_path(out_path));
  assert!(sb.store.is_valid_path(&result.profile));
  assert_eq!(fs::read_to_string(sb.profile.join("bin/hello")).unwrap(), "echo hello");
  assert_eq!(sb.generations.current().unwrap(), Some(1));

  let elements = info(&sb.profile).unwrap();
  assert_eq!(elements.len(), 1);
  assert_eq!(elements[0].original.as_deref(), Some("pkgs#hello"));
  let resolved = elements[0].resolved.as_deref().unwrap();
  let source_dir = dunce::canonicalize(sb.source_dir()).unwrap();
  assert!(resolved.starts_with(&format!("path:{}?rev=", source_dir.display())));
  assert!(resolved.ends_with("#hello"));
}

#[test]
fn every_mutation_creates_a_generation() {
  let sb = Sandbox::new();
  sb.write_package("hello", &[("bin/hello", "hello")]);
  sb.write_package("cowsay", &[("bin/cowsay", "moo")]);

  install(&sb.ctx(), &args(&["pkgs#hello"])).unwrap();
  install(&sb.ctx(), &args(&["pkgs#cowsay"])).unwrap();
  let removed = remove(&sb.ctx(), &args(&["hello"])).unwrap();

  assert_eq!((removed.removed, removed.kept), (1, 1));
  assert_eq!(sb.generations.current().unwrap(), Some(3));
  assert!(!sb.profile.join("bin/hello").exists());
  assert_eq!(fs::read_to_string(sb.profile.join("bin/cowsay")).unwrap(), "moo");

  // Earlier generations still hold what they held.
  let generations = sb.generations.list().unwrap();
  assert_eq!(generations.len(), 3);
  assert!(generations[1].link.join("bin/hello").exists());
}

#[test]
fn upgrade_follows_source_changes_and_is_idempotent() {
  let sb = Sandbox::new();
  sb.write_package("hello", &[("bin/hello", "v1")]);
  install(&sb.ctx(), &args(&["pkgs#hello"])).unwrap();

  let unchanged = upgrade(&sb.ctx(), &args(&[".*"])).unwrap();
  assert!(unchanged.upgraded.is_empty());

  sb.write_package("hello", &[("bin/hello", "v2")]);
  let result = upgrade(&sb.ctx(), &args(&[".*"])).unwrap();
  assert_eq!(result.upgraded.len(), 1);
  assert_eq!(fs::read_to_string(sb.profile.join("bin/hello")).unwrap(), "v2");

  let again = upgrade(&sb.ctx(), &args(&[".*"])).unwrap();
  assert!(again.upgraded.is_empty());
  assert_eq!(again.profile, result.profile);
}

#[test]
fn rebuilding_an_unchanged_profile_reuses_its_object() {
  let sb = Sandbox::new();
  sb.write_package("hello", &[("bin/hello", "hello")]);
  let installed = install(&sb.ctx(), &args(&["pkgs#hello"])).unwrap();

  let removed = remove(&sb.ctx(), &args(&["nothing"])).unwrap();

  assert_eq!(removed.profile, installed.profile);
  assert_eq!(sb.generations.list().unwrap().len(), 1);
}

#[test]
fn conflicting_packages_leave_profile_unchanged() {
  let sb = Sandbox::new();
  sb.write_package("one", &[("bin/tool", "one")]);
  sb.write_package("two", &[("bin/tool", "two")]);
  install(&sb.ctx(), &args(&["pkgs#one"])).unwrap();

  let err = install(&sb.ctx(), &args(&["pkgs#two"])).unwrap_err();

  assert!(matches!(err, ProfileError::Build(_)), "unexpected error: {}", err);
  assert_eq!(sb.generations.current().unwrap(), Some(1));
  assert_eq!(fs::read_to_string(sb.profile.join("bin/tool")).unwrap(), "one");
}

#[test]
fn unknown_attribute_fails_without_publishing() {
  let sb = Sandbox::new();
  sb.write_package("hello", &[("bin/hello", "hello")]);

  let err = install(&sb.ctx(), &args(&["pkgs#nope"])).unwrap_err();

  assert!(matches!(
    err,
    ProfileError::Resolve(ResolveError::MissingAttribute { .. })
  ));
  assert_eq!(sb.generations.current().unwrap(), None);
  assert!(info(&sb.profile).unwrap().is_empty());
}

#[test]
fn removing_the_last_package_leaves_only_the_manifest() {
  let sb = Sandbox::new();
  sb.write_package("hello", &[("bin/hello", "hello")]);
  install(&sb.ctx(), &args(&["pkgs#hello"])).unwrap();

  let result = remove(&sb.ctx(), &args(&["0"])).unwrap();

  assert_eq!((result.removed, result.kept), (1, 0));
  assert_eq!(sb.generations.current().unwrap(), Some(2));
  let entries: Vec<String> = fs::read_dir(&sb.profile)
    .unwrap()
    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
    .collect();
  assert_eq!(entries, vec!["manifest.json"]);
  assert!(info(&sb.profile).unwrap().is_empty());
}
