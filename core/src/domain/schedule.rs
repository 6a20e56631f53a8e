//! Scheduled unblock entries and block duration parsing.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::AppName;

/// A pending unblock obligation: `app,unblock_at` in the schedule log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// Application slug.
    pub app: String,
    /// Unix epoch seconds at which the block expires.
    pub unblock_at: i64,
}

impl ScheduleEntry {
    pub fn new(app: &AppName, unblock_at: i64) -> Self {
        Self {
            app: app.slug().to_string(),
            unblock_at,
        }
    }

    /// Whether the entry has expired at `now`.
    pub fn is_due(&self, now: i64) -> bool {
        self.unblock_at <= now
    }

    /// Parse one schedule log line.
    pub fn parse_line(line: &str) -> Result<Self> {
        let corrupt = |reason: &str| Error::ScheduleCorrupt {
            line: line.to_string(),
            reason: reason.to_string(),
        };

        let (app, ts) = line
            .trim()
            .rsplit_once(',')
            .ok_or_else(|| corrupt("missing ',' separator"))?;

        let app = AppName::parse(app).map_err(|_| corrupt("invalid application name"))?;
        let unblock_at: i64 = ts
            .trim()
            .parse()
            .map_err(|_| corrupt("timestamp is not an integer"))?;

        Ok(Self::new(&app, unblock_at))
    }
}

impl std::fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.app, self.unblock_at)
    }
}

/// Parse a block duration such as `"30s"`, `"10m"`, `"2h"` or `"45"` (seconds).
///
/// Zero and negative durations are rejected: a scheduled unblock must lie in
/// the future.
pub fn parse_duration(s: &str) -> Result<u64> {
    let s = s.trim();
    let (digits, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], c.to_ascii_lowercase()),
        _ => (s, 's'),
    };

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        _ => return Err(Error::InvalidDuration(s.to_string())),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| Error::InvalidDuration(s.to_string()))?;

    match value.checked_mul(multiplier) {
        Some(secs) if secs > 0 => Ok(secs),
        _ => Err(Error::InvalidDuration(s.to_string())),
    }
}
