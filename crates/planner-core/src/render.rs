use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Screen};
use crate::calendar::{CalendarState, EntryState};
use crate::config::Config;
use crate::datetime::CalendarDay;
use crate::events::EventStore;
use crate::grid::{GridCell, weekday_labels};
use crate::pomodoro::{PomodoroTimer, format_clock};
use crate::todo::TodoList;

const CELL_WIDTH: usize = 5;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    /// No ANSI codes regardless of the terminal.
    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, app, now), fields(screen = %app.screen()))]
    pub fn print_screen(&self, out: &mut dyn Write, app: &App, now: DateTime<Utc>) -> anyhow::Result<()> {
        match app.screen() {
            Screen::Menu => self.print_menu(out),
            Screen::Calendar => self.print_calendar(out, &app.calendar, &app.events),
            Screen::Todo => self.print_todos(out, &app.todos),
            Screen::TechByte => {
                let today = app.normalize(now);
                self.print_fact(out, today, app.techbytes.fact_for(today))
            }
            Screen::Pomodoro => self.print_pomodoro(out, &app.pomodoro, now),
        }
    }

    pub fn print_menu(&self, out: &mut dyn Write) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint("Menu", "1;35"))?;
        for (idx, screen) in Screen::MENU_ENTRIES.iter().enumerate() {
            writeln!(out, "  {}. {screen}", idx + 1)?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(selected = %calendar.selected()))]
    pub fn print_calendar(&self, out: &mut dyn Write, calendar: &CalendarState, events: &EventStore) -> anyhow::Result<()> {
        let selected = calendar.selected();
        let grid = calendar.grid();

        writeln!(out, "{}", self.paint(&selected.format_long(), "1;35"))?;
        writeln!(out)?;

        let header = format!("<  {}  >", selected.format_month());
        let total_width = CELL_WIDTH * 7;
        let pad = total_width.saturating_sub(UnicodeWidthStr::width(header.as_str())) / 2;
        writeln!(out, "{}{header}", " ".repeat(pad))?;

        for label in weekday_labels(grid.week_start) {
            write!(out, "{label:<CELL_WIDTH$}")?;
        }
        writeln!(out)?;

        for row in &grid.rows {
            let mut line = String::new();
            for cell in row {
                line.push_str(&self.grid_cell(*cell, selected, events));
            }
            writeln!(out, "{}", line.trim_end())?;
        }
        writeln!(out)?;

        self.print_events(out, selected, events.get(selected))?;

        if let EntryState::Entering { day } = calendar.entry() {
            writeln!(out)?;
            writeln!(out, "{}", self.paint(&format!("Add Event for {}", day.format_long()), "1"))?;
        }
        Ok(())
    }

    pub fn print_events(&self, out: &mut dyn Write, day: CalendarDay, events: &[String]) -> anyhow::Result<()> {
        if events.is_empty() {
            writeln!(out, "{}", self.paint("No events", "35"))?;
            return Ok(());
        }

        tracing::debug!(day = %day, count = events.len(), "printing events");
        for event in events {
            writeln!(out, "  - {}", self.paint(event, "35"))?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(count = list.len()))]
    pub fn print_todos(&self, out: &mut dyn Write, list: &TodoList) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint("To-Do List", "1;35"))?;
        let todos = list.items();
        if todos.is_empty() {
            writeln!(out, "Nothing to do.")?;
            return Ok(());
        }

        let headers = vec!["#".to_string(), "Done".to_string(), "Task".to_string()];
        let rows = todos
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let check = if item.done { "[x]" } else { "[ ]" };
                let check = if item.done {
                    self.paint(check, "32")
                } else {
                    check.to_string()
                };
                vec![self.paint(&(idx + 1).to_string(), "33"), check, item.text.clone()]
            })
            .collect();

        write_table(out, headers, rows)?;
        writeln!(out, "{} of {} remaining", list.remaining(), list.len())?;
        Ok(())
    }

    pub fn print_fact(&self, out: &mut dyn Write, day: CalendarDay, fact: &str) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&format!("TechByte for {}", day.format_long()), "1;35"))?;
        writeln!(out, "{fact}")?;
        Ok(())
    }

    pub fn print_pomodoro(&self, out: &mut dyn Write, timer: &PomodoroTimer, now: DateTime<Utc>) -> anyhow::Result<()> {
        let state = if timer.is_running() { "running" } else { "paused" };
        writeln!(
            out,
            "{}  {}  ({state})",
            self.paint(&timer.phase().to_string(), "1;35"),
            format_clock(timer.remaining(now)),
        )?;
        writeln!(
            out,
            "Completed focus sessions: {} (long break every {})",
            timer.completed_work(),
            timer.settings().cycles
        )?;
        Ok(())
    }

    fn grid_cell(&self, cell: GridCell, selected: CalendarDay, events: &EventStore) -> String {
        let Some(n) = cell.day() else {
            return " ".repeat(CELL_WIDTH);
        };

        let is_selected = n == selected.day();
        let has_events = selected
            .with_day(n)
            .is_some_and(|day| events.has_events(day));

        let label = if is_selected { format!("[{n:>2}]") } else { format!(" {n:>2} ") };
        let label = if is_selected {
            self.paint(&label, "7")
        } else if has_events {
            self.paint(&label, "35")
        } else {
            label
        };
        let marker = if has_events { "*" } else { " " };
        format!("{label}{marker}")
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write + ?Sized>(writer: &mut W, headers: Vec<String>, rows: Vec<Vec<String>>) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let mut line = String::new();
    for idx in 0..column_count {
        line.push_str(&format!("{:width$} ", headers[idx], width = widths[idx]));
    }
    writeln!(writer, "{}", line.trim_end())?;

    line.clear();
    for width in &widths {
        line.push_str(&format!("{:-<width$} ", "", width = *width));
    }
    writeln!(writer, "{}", line.trim_end())?;

    for row in rows {
        line.clear();
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            line.push_str(cell);
            line.push_str(&" ".repeat(padding + 1));
        }
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
