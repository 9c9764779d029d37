//! Cron utility functions for validating schedules and calculating fire times
//!
//! Expressions use the classic five-field layout (minute, hour, day of month,
//! month, day of week) or a six-field layout with a leading seconds field.
//! Fire times are evaluated in the job's IANA timezone so daylight-saving
//! transitions follow local wall-clock semantics, then converted to UTC.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use std::str::FromStr;
use thiserror::Error;

use crate::errors::AppError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CronError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("Unknown timezone '{timezone}'")]
    UnknownTimezone { timezone: String },
}

impl From<CronError> for AppError {
    fn from(err: CronError) -> Self {
        match err {
            CronError::InvalidExpression { expression, reason } => {
                AppError::invalid_schedule(expression, reason)
            }
            CronError::UnknownTimezone { ref timezone } => {
                AppError::invalid_schedule(timezone.clone(), err.to_string())
            }
        }
    }
}

/// A parsed cron expression bound to a timezone
#[derive(Debug, Clone)]
pub struct CronSchedule {
    schedule: Schedule,
    timezone: Tz,
}

impl CronSchedule {
    pub fn parse(expression: &str, timezone: &str) -> Result<Self, CronError> {
        let tz = parse_timezone(timezone)?;
        let normalized = normalize_expression(expression)?;
        let schedule = Schedule::from_str(&normalized).map_err(|e| CronError::InvalidExpression {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            schedule,
            timezone: tz,
        })
    }

    /// First fire instant strictly after `reference`
    pub fn next_after(&self, reference: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = reference.with_timezone(&self.timezone);
        self.schedule
            .after(&local)
            .map(|t| t.with_timezone(&Utc))
            .find(|t| t > reference)
    }

    /// Last fire instant strictly before `reference`
    pub fn previous_before(&self, reference: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = reference.with_timezone(&self.timezone);
        self.schedule
            .after(&local)
            .rev()
            .map(|t| t.with_timezone(&Utc))
            .find(|t| t < reference)
    }
}

pub fn parse_timezone(timezone: &str) -> Result<Tz, CronError> {
    timezone
        .parse::<Tz>()
        .map_err(|_| CronError::UnknownTimezone {
            timezone: timezone.to_string(),
        })
}

/// Validate an expression under a timezone without computing anything
pub fn validate_cron_expression(expression: &str, timezone: &str) -> Result<(), CronError> {
    CronSchedule::parse(expression, timezone).map(|_| ())
}

/// Calculate the next scheduled time strictly after `after`
///
/// # Returns
/// * `Ok(Some(DateTime<Utc>))` - The next scheduled time
/// * `Ok(None)` - Valid cron but no future schedules
/// * `Err(CronError)` - Invalid expression or timezone
pub fn next_fire_time(
    expression: &str,
    timezone: &str,
    after: &DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, CronError> {
    Ok(CronSchedule::parse(expression, timezone)?.next_after(after))
}

/// Calculate the most recent scheduled time strictly before `before`
pub fn previous_fire_time(
    expression: &str,
    timezone: &str,
    before: &DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, CronError> {
    Ok(CronSchedule::parse(expression, timezone)?.previous_before(before))
}

/// Calculate the next scheduled time from now, or `None` when the schedule is unusable
pub fn calculate_next_scheduled_time(expression: &str, timezone: &str) -> Option<DateTime<Utc>> {
    next_fire_time(expression, timezone, &Utc::now()).ok().flatten()
}

/// Best-effort human readable description of a cron expression
pub fn describe_cron_expression(expression: &str) -> String {
    let parts: Vec<&str> = expression.split_whitespace().collect();
    if parts.len() < 5 || parts.len() > 6 {
        return "Invalid cron expression".to_string();
    }

    let (minute, hour, day_of_month, month, day_of_week) =
        (parts[0], parts[1], parts[2], parts[3], parts[4]);
    let rest_wildcard = day_of_month == "*" && month == "*" && day_of_week == "*";

    if minute == "*" && hour == "*" && rest_wildcard {
        return "Every minute".to_string();
    }
    if minute == "0" && hour == "*" {
        return "Every hour".to_string();
    }
    if minute == "0" && hour == "0" && rest_wildcard {
        return "Every day at midnight".to_string();
    }

    format!("{minute} {hour} {day_of_month} {month} {day_of_week}")
}

/// Rewrite an expression into the seconds-first layout the `cron` crate expects.
///
/// Day-of-week numbers follow the classic convention (0 or 7 is Sunday) and are
/// rewritten to names, since the underlying parser numbers Sunday as 1.
fn normalize_expression(expression: &str) -> Result<String, CronError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let mut fields: Vec<String> = match fields.len() {
        5 => std::iter::once("0")
            .chain(fields.iter().copied())
            .map(str::to_string)
            .collect(),
        6 => fields.iter().map(|f| f.to_string()).collect(),
        n => {
            return Err(CronError::InvalidExpression {
                expression: expression.to_string(),
                reason: format!("expected 5 or 6 fields, got {n}"),
            });
        }
    };

    fields[5] = normalize_day_of_week(&fields[5]).map_err(|reason| {
        CronError::InvalidExpression {
            expression: expression.to_string(),
            reason,
        }
    })?;

    Ok(fields.join(" "))
}

const WEEKDAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

fn weekday_name(token: &str) -> Result<Option<&'static str>, String> {
    match token.parse::<u32>() {
        Ok(n @ 0..=6) => Ok(Some(WEEKDAY_NAMES[n as usize])),
        Ok(7) => Ok(Some("SUN")),
        Ok(n) => Err(format!("day of week {n} is out of range 0-7")),
        Err(_) => Ok(None),
    }
}

fn normalize_day_of_week(field: &str) -> Result<String, String> {
    let mut items = Vec::new();

    for item in field.split(',') {
        let (base, step) = match item.split_once('/') {
            Some((base, step)) => (base, Some(step)),
            None => (item, None),
        };
        let suffix = step.map(|s| format!("/{s}")).unwrap_or_default();

        if let Some((start, end)) = base.split_once('-') {
            let start_name = weekday_name(start)?;
            let end_name = weekday_name(end)?;
            match (start_name, end_name) {
                (Some(s), Some(_)) if end == "7" && s != "SUN" && step.is_none() => {
                    // 5-7 wraps past Saturday onto Sunday
                    items.push(format!("{s}-SAT"));
                    items.push("SUN".to_string());
                }
                (Some(s), Some(_)) if end == "7" => items.push(format!("{s}-SAT{suffix}")),
                (s, e) => items.push(format!(
                    "{}-{}{suffix}",
                    s.unwrap_or(start),
                    e.unwrap_or(end)
                )),
            }
        } else {
            let name = weekday_name(base)?;
            items.push(format!("{}{suffix}", name.unwrap_or(base)));
        }
    }

    Ok(items.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike, Weekday};
    use rstest::rstest;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[rstest]
    #[case("*/5 * * * *")]
    #[case("0 3 * * *")]
    #[case("30 0 9 * * MON-FRI")]
    #[case("0 0 1 1 *")]
    #[case("15 10 * * 0")]
    #[case("15 10 * * 1-5")]
    #[case("0 12 * * 5-7")]
    fn test_valid_expressions(#[case] expression: &str) {
        assert!(validate_cron_expression(expression, "UTC").is_ok());
    }

    #[rstest]
    #[case("invalid")]
    #[case("* * *")]
    #[case("61 * * * *")]
    #[case("* 25 * * *")]
    #[case("* * * * 9")]
    #[case("0 0 0 1 1 * 2030")]
    fn test_invalid_expressions(#[case] expression: &str) {
        let err = validate_cron_expression(expression, "UTC").unwrap_err();
        assert!(matches!(err, CronError::InvalidExpression { .. }));
    }

    #[test]
    fn test_unknown_timezone() {
        let err = validate_cron_expression("* * * * *", "Mars/Olympus").unwrap_err();
        assert_eq!(
            err,
            CronError::UnknownTimezone {
                timezone: "Mars/Olympus".to_string()
            }
        );
        let app: AppError = err.into();
        assert!(matches!(app, AppError::InvalidSchedule { .. }));
    }

    #[test]
    fn test_next_fire_is_strictly_after_reference() {
        let reference = at(2025, 3, 10, 12, 5, 0);
        let next = next_fire_time("*/5 * * * *", "UTC", &reference)
            .unwrap()
            .unwrap();
        assert_eq!(next, at(2025, 3, 10, 12, 10, 0));

        let between = at(2025, 3, 10, 12, 7, 31);
        let next = next_fire_time("*/5 * * * *", "UTC", &between)
            .unwrap()
            .unwrap();
        assert_eq!(next, at(2025, 3, 10, 12, 10, 0));
    }

    #[test]
    fn test_previous_fire_is_strictly_before_reference() {
        let reference = at(2025, 3, 10, 12, 10, 0);
        let previous = previous_fire_time("*/5 * * * *", "UTC", &reference)
            .unwrap()
            .unwrap();
        assert_eq!(previous, at(2025, 3, 10, 12, 5, 0));
    }

    #[test]
    fn test_sunday_as_zero_and_seven() {
        // 2025-03-10 is a Monday
        let reference = at(2025, 3, 10, 0, 0, 0);
        for expr in ["0 9 * * 0", "0 9 * * 7", "0 9 * * SUN"] {
            let next = next_fire_time(expr, "UTC", &reference).unwrap().unwrap();
            assert_eq!(next.weekday(), Weekday::Sun, "expression {expr}");
            assert_eq!(next, at(2025, 3, 16, 9, 0, 0));
        }
    }

    #[test]
    fn test_weekday_range_uses_classic_numbering() {
        // Saturday
        let reference = at(2025, 3, 15, 10, 0, 0);
        let next = next_fire_time("0 9 * * 1-5", "UTC", &reference)
            .unwrap()
            .unwrap();
        assert_eq!(next.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_timezone_is_applied() {
        let reference = at(2025, 1, 15, 0, 0, 0);
        let next = next_fire_time("0 9 * * *", "America/New_York", &reference)
            .unwrap()
            .unwrap();
        // EST is UTC-5 in January
        assert_eq!(next, at(2025, 1, 15, 14, 0, 0));
    }

    #[test]
    fn test_dst_spring_forward_follows_local_time() {
        // US clocks jump from 02:00 to 03:00 on 2025-03-09
        let before = at(2025, 3, 8, 12, 0, 0);
        let schedule = CronSchedule::parse("0 9 * * *", "America/New_York").unwrap();
        let first = schedule.next_after(&before).unwrap();
        let second = schedule.next_after(&first).unwrap();
        assert_eq!(first.hour(), 14);
        assert_eq!(second.hour(), 13);
        assert_eq!(second - first, chrono::Duration::hours(23));
    }

    #[test]
    fn test_six_field_expression_has_seconds_first() {
        let reference = at(2025, 3, 10, 12, 0, 0);
        let next = next_fire_time("30 * * * * *", "UTC", &reference)
            .unwrap()
            .unwrap();
        assert_eq!(next, at(2025, 3, 10, 12, 0, 30));
    }

    #[rstest]
    #[case("* * * * *", "Every minute")]
    #[case("0 * * * *", "Every hour")]
    #[case("0 0 * * *", "Every day at midnight")]
    #[case("* *", "Invalid cron expression")]
    #[case("*/5 2 * * 1", "*/5 2 * * 1")]
    fn test_describe(#[case] expression: &str, #[case] expected: &str) {
        assert_eq!(describe_cron_expression(expression), expected);
    }
}
