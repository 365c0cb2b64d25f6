pub mod app;
pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod events;
pub mod grid;
pub mod pomodoro;
pub mod render;
pub mod shell;
pub mod techbyte;
pub mod todo;

use std::ffi::OsString;
use std::io::{self, IsTerminal};

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
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
    "starting planner"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.plannerrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let mut app =
    app::App::from_config(&cfg)
      .context(
        "failed to initialize \
         planner state"
      )?;
  let renderer =
    render::Renderer::new(&cfg)?;

  let stdout = io::stdout();
  match cli::Invocation::parse(cli.rest)?
  {
    | Some(inv) => {
      let mut out = stdout.lock();
      commands::dispatch(
        &mut app,
        &cfg,
        &renderer,
        &mut out,
        inv,
        Utc::now()
      )?;
    }
    | None => {
      let stdin = io::stdin();
      let mut shell = shell::Shell {
        app:      &mut app,
        cfg:      &cfg,
        renderer: &renderer,
        prompt:   stdin.is_terminal()
      };
      shell.run(
        stdin.lock(),
        stdout.lock()
      )?;
    }
  }

  info!("done");
  Ok(())
}
