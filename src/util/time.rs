use anyhow::{anyhow, Result};
use chrono::NaiveTime;

// Parse a wall-clock time like "16:30" or "16:30:15".
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| anyhow!("invalid time of day {s:?} (expected HH:MM)"))
}

// Helper for Option<String> inputs (CLI flag first, then env var)
pub fn time_of_day_opt(flag: Option<&str>, env_key: &str) -> Result<Option<NaiveTime>> {
    let raw = flag.map(str::to_string).or_else(|| std::env::var(env_key).ok().filter(|v| !v.trim().is_empty()));
    raw.as_deref().map(parse_time_of_day).transpose()
}
