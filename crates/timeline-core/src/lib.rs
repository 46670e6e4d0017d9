pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod layout;
pub mod render;

use std::ffi::OsString;

use anyhow::{
  Context,
  anyhow
};
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub async fn run(
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
    "starting timeline CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.timelinerc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let real_today =
    datetime::resolve_today(
      cfg.get("timezone").as_deref(),
      Utc::now()
    );
  let today = match cli.today.as_deref()
  {
    | Some(expr) => {
      datetime::parse_date_expr(
        expr, real_today
      )
      .with_context(|| {
        format!(
          "invalid --today value: \
           {expr}"
        )
      })?
    }
    | None => real_today
  };
  debug!(%today, "resolved today");

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store =
    datastore::SnapshotStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open snapshot store \
         at {}",
        data_dir.display()
      )
    })?;

  let renderer =
    render::Renderer::new(&cfg)?;

  let source = match cli.input {
    | Some(path) => {
      commands::ItemSource::File(path)
    }
    | None if cli.offline => {
      commands::ItemSource::Offline
    }
    | None => commands::ItemSource::Api
  };

  let command = match cli.command {
    | Some(command) => command,
    | None => {
      let name = cfg
        .get("default.command")
        .unwrap_or_else(|| {
          "show".to_string()
        });
      cli::Command::from_default_name(
        &name
      )
      .ok_or_else(|| {
        anyhow!(
          "default.command must be \
           show, list or layout, got \
           {name}"
        )
      })?
    }
  };

  let session = commands::Session {
    cfg: &cfg,
    store: &store,
    renderer: &renderer,
    source,
    today
  };
  commands::dispatch(
    &session, command
  )
  .await?;

  info!("done");
  Ok(())
}
