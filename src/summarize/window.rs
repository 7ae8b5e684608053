use std::fmt;

use anyhow::Result;
use chrono::NaiveTime;
use serde::Serialize;

use crate::util::time::time_of_day_opt;

/// Daily UTC interval in which summarization may run. `start` is inclusive,
/// `end` exclusive. When `start > end` the window wraps past midnight;
/// `start == end` means always open.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessingWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for ProcessingWindow {
    fn default() -> Self {
        Self { start: hm(16, 30), end: hm(0, 30) }
    }
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

impl ProcessingWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self { Self { start, end } }

    /// Flags win over SUMMARY_WINDOW_START / SUMMARY_WINDOW_END; either side
    /// falls back to the default on its own.
    pub fn resolve(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            start: time_of_day_opt(start, "SUMMARY_WINDOW_START")?.unwrap_or(d.start),
            end: time_of_day_opt(end, "SUMMARY_WINDOW_END")?.unwrap_or(d.end),
        })
    }

    pub fn wraps_midnight(&self) -> bool { self.start > self.end }

    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start == self.end {
            true
        } else if self.wraps_midnight() {
            t >= self.start || t < self.end
        } else {
            t >= self.start && t < self.end
        }
    }
}

impl fmt::Display for ProcessingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} UTC", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}
