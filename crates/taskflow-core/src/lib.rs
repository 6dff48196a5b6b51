pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod filter;
pub mod render;
pub mod scheduler;
pub mod stats;
pub mod storage;
pub mod store;
pub mod task;
pub mod theme;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use crate::app::App;
pub use crate::error::TaskError;
pub use crate::store::TaskStore;
pub use crate::task::{
  NewTask,
  Priority,
  Task,
  TaskPatch
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting taskflow CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.taskflowrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let storage =
    storage::FileStorage::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open storage at {}",
        data_dir.display()
      )
    })?;

  let mut app = App::new(
    storage,
    scheduler::SystemClock,
    &cfg,
    false
  )?;
  let mut renderer =
    render::Renderer::new(&cfg)?;

  let result = commands::dispatch(
    &mut app,
    &mut renderer,
    cli.command
  );

  // the deferred write never fires in
  // a one-shot process
  app.shutdown();

  result?;
  info!("done");
  Ok(())
}
