use std::io::{BufRead, Write};

use anyhow::Context;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::app::App;
use crate::cli::Invocation;
use crate::commands::{self, Flow};
use crate::config::Config;
use crate::render::Renderer;

/// Line-oriented front-end. Each input line is one user action.
///
/// While the entry form is open a plain line is the event title; a line that
/// starts with `:` is still read as a command.
pub struct Shell<'a> {
    pub app: &'a mut App,
    pub cfg: &'a Config,
    pub renderer: &'a Renderer,
    pub prompt: bool,
}

impl Shell<'_> {
    #[tracing::instrument(skip_all, fields(prompt = self.prompt))]
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut out: W) -> anyhow::Result<()> {
        info!("shell started");
        self.renderer.print_screen(&mut out, self.app, Utc::now())?;

        let mut line = String::new();
        loop {
            if self.prompt {
                let prompt = if self.app.calendar.is_entering() {
                    "Event Title> "
                } else {
                    "planner> "
                };
                write!(out, "{prompt}")?;
                out.flush()?;
            }

            line.clear();
            let read = input.read_line(&mut line).context("failed reading input")?;
            if read == 0 {
                debug!("end of input");
                break;
            }

            let entry = line.trim_end_matches(['\r', '\n']);
            match self.handle_line(entry, &mut out) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(err) => {
                    warn!(error = %err, "command failed");
                    writeln!(out, "error: {err:#}")?;
                }
            }
        }

        out.flush()?;
        info!("shell finished");
        Ok(())
    }

    fn handle_line(&mut self, entry: &str, out: &mut dyn Write) -> anyhow::Result<Flow> {
        if self.app.calendar.is_entering() && !entry.starts_with(':') {
            commands::cmd_save(self.app, self.renderer, out, entry)?;
            return Ok(Flow::Continue);
        }

        let entry = entry.strip_prefix(':').unwrap_or(entry);
        let Some(inv) = Invocation::from_line(entry)? else {
            return Ok(Flow::Continue);
        };
        commands::dispatch(self.app, self.cfg, self.renderer, out, inv, Utc::now())
    }
}
