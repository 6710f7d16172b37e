//! 5-field cron rule (min hour dom month dow), parsed eagerly at
//! configuration time and matched against zone-local datetimes.
//!
//! Field grammar: `*`, `*/N`, literal `N`, range `N-M`, and comma lists
//! mixing literals and ranges. Weekday numbering is 0 = Sunday.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

use crate::error::ScheduleError;

/// One selector within a cron field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selector {
    Any,
    /// `*/N` — matches values that are exact multiples of N within the
    /// field's natural range.
    Step(u32),
    Exact(u32),
    Range(u32, u32),
}

impl Selector {
    fn matches(self, value: u32) -> bool {
        match self {
            Selector::Any => true,
            Selector::Step(n) => value % n == 0,
            Selector::Exact(n) => value == n,
            Selector::Range(lo, hi) => value >= lo && value <= hi,
        }
    }
}

/// A parsed cron field: matches when any of its selectors matches.
#[derive(Debug, Clone)]
struct Field {
    selectors: Vec<Selector>,
}

impl Field {
    fn any() -> Self {
        Self {
            selectors: vec![Selector::Any],
        }
    }

    fn exact(value: u32) -> Self {
        Self {
            selectors: vec![Selector::Exact(value)],
        }
    }

    fn step(n: u32) -> Self {
        Self {
            selectors: vec![Selector::Step(n)],
        }
    }

    fn matches(&self, value: u32) -> bool {
        self.selectors.iter().any(|s| s.matches(value))
    }
}

const FIELD_NAMES: [&str; 5] = ["minute", "hour", "day-of-month", "month", "weekday"];
const FIELD_RANGES: [(u32, u32); 5] = [(0, 59), (0, 23), (1, 31), (1, 12), (0, 6)];

fn parse_field(raw: &str, index: usize, expr: &str) -> Result<Field, ScheduleError> {
    let (lo, hi) = FIELD_RANGES[index];
    let bad = |detail: String| {
        ScheduleError::InvalidCron(format!("'{expr}': {} field {detail}", FIELD_NAMES[index]))
    };

    if raw == "*" {
        return Ok(Field::any());
    }

    if let Some(step) = raw.strip_prefix("*/") {
        let n: u32 = step
            .parse()
            .map_err(|_| bad(format!("has non-numeric step '{step}'")))?;
        if n == 0 {
            return Err(bad("has zero step".into()));
        }
        return Ok(Field::step(n));
    }

    let mut selectors = Vec::new();
    for part in raw.split(',') {
        if let Some((start_s, end_s)) = part.split_once('-') {
            let start: u32 = start_s
                .parse()
                .map_err(|_| bad(format!("has invalid range start '{start_s}'")))?;
            let end: u32 = end_s
                .parse()
                .map_err(|_| bad(format!("has invalid range end '{end_s}'")))?;
            if start > end {
                return Err(bad(format!("has inverted range {start}-{end}")));
            }
            if start < lo || end > hi {
                return Err(bad(format!("range {start}-{end} outside {lo}-{hi}")));
            }
            selectors.push(Selector::Range(start, end));
        } else {
            let n: u32 = part
                .parse()
                .map_err(|_| bad(format!("has invalid value '{part}'")))?;
            if n < lo || n > hi {
                return Err(bad(format!("value {n} outside {lo}-{hi}")));
            }
            selectors.push(Selector::Exact(n));
        }
    }
    Ok(Field { selectors })
}

/// A parsed 5-field cron rule.
///
/// `CronRule` carries no timezone of its own; callers convert the instant
/// into the schedule's zone first and match against the local datetime.
#[derive(Debug, Clone)]
pub struct CronRule {
    minute: Field,
    hour: Field,
    day_of_month: Field,
    month: Field,
    weekday: Field,
}

impl CronRule {
    /// Parse a 5-field cron expression, rejecting malformed input up front.
    pub fn parse(expr: &str) -> Result<CronRule, ScheduleError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(ScheduleError::InvalidCron(format!(
                "'{expr}': expected 5 fields, got {}",
                fields.len()
            )));
        }
        Ok(CronRule {
            minute: parse_field(fields[0], 0, expr)?,
            hour: parse_field(fields[1], 1, expr)?,
            day_of_month: parse_field(fields[2], 2, expr)?,
            month: parse_field(fields[3], 3, expr)?,
            weekday: parse_field(fields[4], 4, expr)?,
        })
    }

    /// `* * * * *` — the permissive base installed under sub-minute
    /// interval rules so weekday restrictions still participate.
    pub(crate) fn unrestricted() -> CronRule {
        CronRule {
            minute: Field::any(),
            hour: Field::any(),
            day_of_month: Field::any(),
            month: Field::any(),
            weekday: Field::any(),
        }
    }

    /// `m h * * *`
    pub(crate) fn daily_at(hour: u32, minute: u32) -> CronRule {
        CronRule {
            minute: Field::exact(minute),
            hour: Field::exact(hour),
            ..CronRule::unrestricted()
        }
    }

    /// `m * * * *`
    pub(crate) fn hourly_at(minute: u32) -> CronRule {
        CronRule {
            minute: Field::exact(minute),
            ..CronRule::unrestricted()
        }
    }

    /// `*/n * * * *`
    pub(crate) fn every_n_minutes(n: u32) -> CronRule {
        CronRule {
            minute: Field::step(n),
            ..CronRule::unrestricted()
        }
    }

    /// `0 0 * * 1` — Monday midnight.
    pub(crate) fn weekly() -> CronRule {
        CronRule {
            minute: Field::exact(0),
            hour: Field::exact(0),
            weekday: Field::exact(1),
            ..CronRule::unrestricted()
        }
    }

    /// `0 0 1 * *` — first of the month, midnight.
    pub(crate) fn monthly() -> CronRule {
        CronRule {
            minute: Field::exact(0),
            hour: Field::exact(0),
            day_of_month: Field::exact(1),
            ..CronRule::unrestricted()
        }
    }

    /// Full 5-field match against a zone-local datetime.
    pub fn matches(&self, local: &NaiveDateTime) -> bool {
        self.minute.matches(local.minute())
            && self.hour.matches(local.hour())
            && self.day_of_month.matches(local.day())
            && self.month.matches(local.month())
            && self.weekday_matches(local.weekday())
    }

    /// Weekday-field-only match, used by sub-minute interval rules which
    /// ignore the minute/hour/day/month fields.
    pub fn weekday_matches(&self, day: Weekday) -> bool {
        self.weekday.matches(day.num_days_from_sunday())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn every_five_minutes_steps() {
        let rule = CronRule::parse("*/5 * * * *").unwrap();
        assert!(rule.matches(&local(2024, 6, 15, 10, 0)));
        assert!(rule.matches(&local(2024, 6, 15, 10, 55)));
        assert!(!rule.matches(&local(2024, 6, 15, 10, 3)));
    }

    #[test]
    fn specific_time() {
        let rule = CronRule::parse("30 9 * * *").unwrap();
        assert!(rule.matches(&local(2024, 6, 15, 9, 30)));
        assert!(!rule.matches(&local(2024, 6, 15, 10, 30)));
        assert!(!rule.matches(&local(2024, 6, 15, 9, 31)));
    }

    #[test]
    fn hour_range() {
        let rule = CronRule::parse("0 9-17 * * *").unwrap();
        assert!(rule.matches(&local(2024, 6, 15, 10, 0)));
        assert!(rule.matches(&local(2024, 6, 15, 17, 0)));
        assert!(!rule.matches(&local(2024, 6, 15, 20, 0)));
    }

    #[test]
    fn comma_separated_minutes() {
        let rule = CronRule::parse("0,15,30,45 * * * *").unwrap();
        assert!(rule.matches(&local(2024, 6, 15, 10, 15)));
        assert!(!rule.matches(&local(2024, 6, 15, 10, 20)));
    }

    #[test]
    fn mixed_literals_and_ranges() {
        let rule = CronRule::parse("0 1,9-11,23 * * *").unwrap();
        assert!(rule.matches(&local(2024, 6, 15, 1, 0)));
        assert!(rule.matches(&local(2024, 6, 15, 10, 0)));
        assert!(rule.matches(&local(2024, 6, 15, 23, 0)));
        assert!(!rule.matches(&local(2024, 6, 15, 12, 0)));
    }

    #[test]
    fn weekday_field_uses_sunday_zero() {
        // June 16 2024 is a Sunday, June 17 a Monday.
        let sunday = CronRule::parse("* * * * 0").unwrap();
        assert!(sunday.matches(&local(2024, 6, 16, 12, 30)));
        assert!(!sunday.matches(&local(2024, 6, 17, 12, 30)));

        let monday = CronRule::parse("* * * * 1").unwrap();
        assert!(monday.matches(&local(2024, 6, 17, 12, 30)));
    }

    #[test]
    fn unrestricted_matches_anything() {
        let rule = CronRule::unrestricted();
        assert!(rule.matches(&local(2024, 1, 1, 0, 0)));
        assert!(rule.matches(&local(2024, 12, 31, 23, 59)));
    }

    #[test]
    fn builder_rules_match_their_expressions() {
        let daily = CronRule::daily_at(0, 0);
        let parsed = CronRule::parse("0 0 * * *").unwrap();
        // Agreement across a full week of minutes.
        let start = local(2024, 6, 10, 0, 0);
        for i in 0..(7 * 24 * 60) {
            let t = start + chrono::Duration::minutes(i);
            assert_eq!(daily.matches(&t), parsed.matches(&t), "disagree at {t}");
        }
    }

    // ── Parse rejection ───────────────────────────────────────────────

    #[test]
    fn rejects_wrong_field_count() {
        assert!(CronRule::parse("* * *").is_err());
        assert!(CronRule::parse("* * * * * *").is_err());
        assert!(CronRule::parse("").is_err());
    }

    #[test]
    fn rejects_zero_step() {
        assert!(CronRule::parse("*/0 * * * *").is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(CronRule::parse("60 * * * *").is_err());
        assert!(CronRule::parse("* 24 * * *").is_err());
        assert!(CronRule::parse("* * 0 * *").is_err());
        assert!(CronRule::parse("* * * 13 *").is_err());
        assert!(CronRule::parse("* * * * 7").is_err());
    }

    #[test]
    fn rejects_inverted_and_garbage_ranges() {
        assert!(CronRule::parse("30-10 * * * *").is_err());
        assert!(CronRule::parse("a-b * * * *").is_err());
        assert!(CronRule::parse("banana * * * *").is_err());
    }
}
