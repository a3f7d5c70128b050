mod info;
mod install;
mod remove;
mod upgrade;

pub use info::cmd_info;
pub use install::cmd_install;
pub use remove::cmd_remove;
pub use upgrade::cmd_upgrade;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use prof_lib::buildenv::SymlinkEnvBuilder;
use prof_lib::ops::ProfileContext;
use prof_lib::profile::Generations;
use prof_lib::resolve::LocalResolver;
use prof_lib::store::{LocalStore, Store};

/// The local collaborators a mutating command runs with.
struct Session {
  store: LocalStore,
  resolver: LocalResolver,
  env: SymlinkEnvBuilder,
  generations: Generations,
}

impl Session {
  fn open(profile: &Path) -> Result<Self> {
    let store = LocalStore::open_default();
    let resolver = LocalResolver::open_default().context("Failed to load package registry")?;
    debug!(store = %store.store_dir().display(), profile = %profile.display(), "opened session");

    Ok(Self {
      store,
      resolver,
      env: SymlinkEnvBuilder,
      generations: Generations::new(profile),
    })
  }

  fn context<'a>(&'a self, profile: &'a Path) -> ProfileContext<'a> {
    ProfileContext {
      profile,
      store: &self.store,
      resolver: &self.resolver,
      env: &self.env,
      pointer: &self.generations,
    }
  }
}
