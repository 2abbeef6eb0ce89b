use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Used where edits need reproducible timestamps.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// `2026-02-01T09:00:00.000Z`
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Human-readable form of a stored `updatedAt`: `Feb 01, 2026, 09:00` (UTC).
///
/// Blank input reads as `Unknown`; anything that does not parse is shown verbatim.
pub fn display_date(iso: &str) -> String {
    let trimmed = iso.trim();
    if trimmed.is_empty() {
        return "Unknown".to_string();
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return at.with_timezone(&Utc).format("%b %d, %Y, %H:%M").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.format("%b %d, %Y, 00:00").to_string();
    }
    iso.to_string()
}
