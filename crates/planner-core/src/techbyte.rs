use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::Datelike;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{Config, expand_tilde};
use crate::datetime::CalendarDay;

const BUILTIN_FACTS: &[&str] = &[
    "The first computer bug was a real moth, taped into the Harvard Mark II logbook in 1947.",
    "Rust's borrow checker enforces at compile time that data is either shared or mutable, never both.",
    "UTF-8 was sketched on a placemat by Ken Thompson and Rob Pike in 1992.",
    "The Unix epoch starts at midnight UTC on January 1, 1970.",
    "A 32-bit signed Unix timestamp overflows on January 19, 2038.",
    "The Gregorian calendar skips leap days in century years not divisible by 400.",
    "TCP was specified in RFC 793 in 1981 and still carries most web traffic.",
    "Git was written by Linus Torvalds in about ten days in 2005.",
    "The pomodoro technique is named after a tomato-shaped kitchen timer.",
    "Grace Hopper's team built the first compiler, A-0, in 1952.",
    "SQLite is deployed on more devices than any other database engine.",
    "ECC memory corrects single-bit flips, many of them caused by cosmic rays.",
];

#[derive(Debug, Deserialize)]
struct FactsFile {
    facts: Vec<String>,
}

/// Daily technology facts; one fact per calendar day, stable for that day.
#[derive(Debug, Clone)]
pub struct TechBytes {
    facts: Vec<String>,
}

impl Default for TechBytes {
    fn default() -> Self {
        Self {
            facts: BUILTIN_FACTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TechBytes {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        match cfg.get("techbytes.file") {
            Some(raw) if !raw.trim().is_empty() => {
                Self::load(&expand_tilde(Path::new(raw.trim())))
            }
            _ => Ok(Self::default()),
        }
    }

    #[tracing::instrument]
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("failed parsing {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let parsed: FactsFile = toml::from_str(raw)?;
        let facts: Vec<String> = parsed
            .facts
            .into_iter()
            .map(|fact| fact.trim().to_string())
            .filter(|fact| !fact.is_empty())
            .collect();

        if facts.is_empty() {
            return Err(anyhow!("facts list must contain at least one entry"));
        }

        info!(count = facts.len(), "loaded tech facts");
        Ok(Self { facts })
    }

    pub fn fact_for(&self, day: CalendarDay) -> &str {
        let days = i64::from(day.date().num_days_from_ce());
        let count = self.facts.len().max(1) as i64;
        let idx = days.rem_euclid(count) as usize;
        debug!(day = %day, idx, "picked tech fact");
        self.facts.get(idx).map(String::as_str).unwrap_or_default()
    }
}
