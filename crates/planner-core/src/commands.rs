use std::io::Write;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::app::{App, Screen};
use crate::calendar::{CalendarState, SaveOutcome};
use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime::{CalendarDay, parse_day_expr};
use crate::render::Renderer;

/// Whether the front-end loop keeps reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "menu", "open", "back", "calendar", "show", "prev", "next", "today", "goto", "tap", "save",
        "dismiss", "events", "month", "todo", "fact", "pomodoro", "export", "config", "help",
        "version", "quit", "exit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &str, known: &[&'a str]) -> Option<&'a str> {
    if let Some(exact) = known.iter().copied().find(|name| *name == token) {
        return Some(exact);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(app, cfg, renderer, out, inv, now), fields(command = %inv.command))]
pub fn dispatch(
    app: &mut App,
    cfg: &Config,
    renderer: &Renderer,
    out: &mut dyn Write,
    inv: Invocation,
    now: DateTime<Utc>,
) -> anyhow::Result<Flow> {
    let args = inv.command_args.as_slice();
    debug!(args = ?args, "dispatching command");

    match inv.command.as_str() {
        "menu" | "back" => {
            app.back();
            renderer.print_menu(out)?;
        }
        "open" => cmd_open(app, renderer, out, args, now)?,
        "calendar" => {
            app.open(Screen::Calendar);
            renderer.print_calendar(out, &app.calendar, &app.events)?;
        }
        "show" => renderer.print_screen(out, app, now)?,
        "prev" => cmd_navigate(app, renderer, out, -1)?,
        "next" => cmd_navigate(app, renderer, out, 1)?,
        "today" => {
            app.go_today();
            renderer.print_calendar(out, &app.calendar, &app.events)?;
        }
        "goto" => {
            let day = parse_day_arg(app, args)?.ok_or_else(|| anyhow!("goto requires a day expression"))?;
            cmd_select(app, renderer, out, day)?;
        }
        "tap" => cmd_tap(app, renderer, out, args)?,
        "save" => cmd_save(app, renderer, out, &inv.raw_args)?,
        "dismiss" => {
            if !app.dismiss_entry() {
                writeln!(out, "No entry form is open.")?;
            }
            renderer.print_calendar(out, &app.calendar, &app.events)?;
        }
        "events" => {
            let day = parse_day_arg(app, args)?.unwrap_or_else(|| app.calendar.selected());
            writeln!(out, "{}", day.format_long())?;
            renderer.print_events(out, day, app.events_for(day))?;
        }
        "month" => cmd_month(app, renderer, out, args)?,
        "todo" => cmd_todo(app, renderer, out, args)?,
        "fact" => {
            let day = parse_day_arg(app, args)?.unwrap_or_else(|| app.today());
            if args.is_empty() {
                app.open(Screen::TechByte);
            }
            renderer.print_fact(out, day, app.techbytes.fact_for(day))?;
        }
        "pomodoro" => cmd_pomodoro(app, renderer, out, args, now)?,
        "export" => cmd_export(app, out)?,
        "config" => cmd_config(cfg, out)?,
        "help" => cmd_help(out)?,
        "version" => writeln!(out, "{}", env!("CARGO_PKG_VERSION"))?,
        "quit" | "exit" => return Ok(Flow::Quit),
        other => return Err(anyhow!("unknown command: {other}")),
    }

    Ok(Flow::Continue)
}

fn parse_day_arg(app: &App, args: &[String]) -> anyhow::Result<Option<CalendarDay>> {
    if args.is_empty() {
        return Ok(None);
    }
    parse_day_expr(&args.join(" "), app.today()).map(Some)
}

fn cmd_open(
    app: &mut App,
    renderer: &Renderer,
    out: &mut dyn Write,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let target = args.first().ok_or_else(|| anyhow!("open requires a screen name or menu number"))?;
    let screen = match target.parse::<usize>() {
        Ok(n) => *Screen::MENU_ENTRIES
            .get(n.wrapping_sub(1))
            .ok_or_else(|| anyhow!("menu has no entry {n}"))?,
        Err(_) => target.parse::<Screen>()?,
    };

    info!(%screen, "command open");
    app.open(screen);
    renderer.print_screen(out, app, now)
}

fn cmd_navigate(app: &mut App, renderer: &Renderer, out: &mut dyn Write, months: i32) -> anyhow::Result<()> {
    app.open(Screen::Calendar);
    let landed = app.calendar.navigate_months(months);
    debug!(%landed, "month navigation");
    renderer.print_calendar(out, &app.calendar, &app.events)
}

fn cmd_select(app: &mut App, renderer: &Renderer, out: &mut dyn Write, day: CalendarDay) -> anyhow::Result<()> {
    app.open(Screen::Calendar);
    app.calendar.select(day);
    renderer.print_calendar(out, &app.calendar, &app.events)
}

#[instrument(skip(app, renderer, out))]
fn cmd_tap(app: &mut App, renderer: &Renderer, out: &mut dyn Write, args: &[String]) -> anyhow::Result<()> {
    let raw = args.first().ok_or_else(|| anyhow!("tap requires a day number"))?;
    let day: u32 = raw
        .parse()
        .with_context(|| format!("tap expects a day number, got: {raw}"))?;

    app.tap_day(day)?;
    renderer.print_calendar(out, &app.calendar, &app.events)
}

#[instrument(skip(app, renderer, out, title))]
pub fn cmd_save(app: &mut App, renderer: &Renderer, out: &mut dyn Write, title: &str) -> anyhow::Result<()> {
    match app.save_entry(title)? {
        SaveOutcome::Added { day } => {
            writeln!(out, "Added event for {}.", day.format_long())?;
        }
        SaveOutcome::Ignored { .. } => {
            writeln!(out, "No title given; nothing added.")?;
        }
    }
    renderer.print_calendar(out, &app.calendar, &app.events)
}

/// Renders a month without moving the selection.
fn cmd_month(app: &App, renderer: &Renderer, out: &mut dyn Write, args: &[String]) -> anyhow::Result<()> {
    let day = parse_day_arg(app, args)?.unwrap_or_else(|| app.calendar.selected());
    let preview = CalendarState::new(day, app.calendar.week_start());
    renderer.print_calendar(out, &preview, &app.events)
}

#[instrument(skip(app, renderer, out))]
fn cmd_todo(app: &mut App, renderer: &Renderer, out: &mut dyn Write, args: &[String]) -> anyhow::Result<()> {
    app.open(Screen::Todo);

    if let Some((action, rest)) = args.split_first() {
        match action.to_ascii_lowercase().as_str() {
            "add" => {
                let text = rest.join(" ");
                if app.todos.add(&text).is_none() {
                    writeln!(out, "No text given; nothing added.")?;
                }
            }
            "done" | "toggle" => {
                let position = parse_position(rest)?;
                app.todos.toggle(position)?;
            }
            "remove" | "rm" | "delete" => {
                let position = parse_position(rest)?;
                let removed = app.todos.remove(position)?;
                writeln!(out, "Removed \"{}\".", removed.text)?;
            }
            "list" => {}
            other => return Err(anyhow!("unknown todo action: {other} (expected add, done, remove or list)")),
        }
    }

    renderer.print_todos(out, &app.todos)
}

fn parse_position(args: &[String]) -> anyhow::Result<usize> {
    let raw = args.first().ok_or_else(|| anyhow!("expected a to-do number"))?;
    raw.parse()
        .with_context(|| format!("expected a to-do number, got: {raw}"))
}

#[instrument(skip(app, renderer, out, now))]
fn cmd_pomodoro(
    app: &mut App,
    renderer: &Renderer,
    out: &mut dyn Write,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    app.open(Screen::Pomodoro);
    let elapsed = app.pomodoro.observe(now);
    if elapsed > 0 {
        writeln!(out, "{elapsed} phase(s) finished since last check.")?;
    }

    match args.first().map(|s| s.to_ascii_lowercase()).as_deref() {
        None | Some("status") => {}
        Some("start") => {
            if !app.pomodoro.start(now) {
                writeln!(out, "Timer is already running.")?;
            }
        }
        Some("pause") => {
            if !app.pomodoro.pause(now) {
                writeln!(out, "Timer is not running.")?;
            }
        }
        Some("reset") => app.pomodoro.reset(),
        Some("skip") => {
            let phase = app.pomodoro.skip(now);
            writeln!(out, "Skipped to {phase}.")?;
        }
        Some(other) => {
            return Err(anyhow!(
                "unknown pomodoro action: {other} (expected start, pause, reset, skip or status)"
            ));
        }
    }

    renderer.print_pomodoro(out, &app.pomodoro, now)
}

#[instrument(skip_all)]
fn cmd_export(app: &App, out: &mut dyn Write) -> anyhow::Result<()> {
    info!(events = app.events.len(), todos = app.todos.len(), "command export");
    let json = serde_json::to_string_pretty(&app.snapshot())?;
    writeln!(out, "{json}")?;
    Ok(())
}

fn cmd_config(cfg: &Config, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut entries: Vec<_> = cfg.iter().collect();
    entries.sort();
    for (key, value) in entries {
        writeln!(out, "{key}={value}")?;
    }
    for path in &cfg.loaded_files {
        writeln!(out, "# loaded {}", path.display())?;
    }
    Ok(())
}

fn cmd_help(out: &mut dyn Write) -> anyhow::Result<()> {
    writeln!(
        out,
        "Commands: menu, open <screen|1-4>, back, calendar, show, prev, next, today, \
         goto <day>, tap <n>, save <title>, dismiss, events [day], month [day], \
         todo [add <text>|done <n>|remove <n>], fact [day], \
         pomodoro [start|pause|reset|skip], export, config, help, version, quit"
    )?;
    writeln!(
        out,
        "Days: today, tomorrow, yesterday, monday.., march.., +3d, -1w, +1m, 2024-08-01, 2024-08"
    )?;
    writeln!(out, "While adding an event, type the title; prefix commands with ':' (e.g. :dismiss).")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{expand_command_abbrev, known_command_names};

    #[test]
    fn abbreviations_must_be_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("cal", &known), Some("calendar"));
        assert_eq!(expand_command_abbrev("todo", &known), Some("todo"));
        assert_eq!(expand_command_abbrev("e", &known), None);
        assert_eq!(expand_command_abbrev("zzz", &known), None);
    }
}
