//! Deterministic relative-time-expression resolution (§4.3 create-tasks
//! rules, §9 timezone decision). Kept out of the auxiliary-LLM extraction
//! path deliberately: the phrase vocabulary this system needs to support
//! ("today", "tonight", "tomorrow", a bare clock time) is small and fixed,
//! and resolving it in Rust makes the rule testable and removes a model
//! round-trip from the hot path of every task creation.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, TimeZone};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayQualifier {
    Today,
    Tomorrow,
    Unspecified,
}

#[derive(Debug, thiserror::Error)]
pub enum TimeResolveError {
    #[error("could not find a clock time in {0:?}")]
    Unparseable(String),
    #[error("resolved time is in the past")]
    PastTime,
}

fn clock_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(?P<h12>1[0-2]|0?[1-9])(:(?P<m12>[0-5][0-9]))?\s*(?P<ampm>am|pm)\b|\b(?P<h24>[01]?[0-9]|2[0-3]):(?P<m24>[0-5][0-9])\b")
            .expect("static clock-time pattern is valid")
    })
}

/// Parse the first clock-time mention out of an utterance. Only matches an
/// explicit am/pm-qualified time (`"6am"`, `"6:30 pm"`) or 24-hour
/// `HH:MM` (`"18:00"`) — a bare number like "2" in "in 2 hours" is not a
/// clock time and must not be misread as one.
fn parse_clock_time(text: &str) -> Option<NaiveTime> {
    let caps = clock_pattern().captures(text)?;
    if let Some(ampm) = caps.name("ampm") {
        let mut hour: u32 = caps.name("h12")?.as_str().parse().ok()?;
        let minute: u32 = caps
            .name("m12")
            .map(|m| m.as_str().parse().unwrap_or(0))
            .unwrap_or(0);
        let is_pm = ampm.as_str().eq_ignore_ascii_case("pm");
        if is_pm && hour != 12 {
            hour += 12;
        } else if !is_pm && hour == 12 {
            hour = 0;
        }
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }
    let hour: u32 = caps.name("h24")?.as_str().parse().ok()?;
    let minute: u32 = caps.name("m24")?.as_str().parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn day_qualifier(lower: &str) -> DayQualifier {
    if lower.contains("tomorrow") {
        DayQualifier::Tomorrow
    } else if lower.contains("today") || lower.contains("tonight") || lower.contains("this evening") {
        DayQualifier::Today
    } else {
        DayQualifier::Unspecified
    }
}

/// Resolve a relative-time expression against `now` (the current instant in
/// the user's zone, as a `DateTime<FixedOffset>` carrying that zone's
/// offset). Rules (§4.3):
/// - "today"/"tonight"/"this evening" → current calendar date.
/// - "tomorrow" → next calendar date.
/// - no day qualifier (a bare clock time) → today, unless that instant has
///   already passed, in which case this is an error rather than silently
///   rolling forward to tomorrow.
/// - any resolved instant at or before `now` is rejected regardless of
///   qualifier — nothing is ever silently scheduled in the past.
pub fn resolve_time_expression(
    expr: &str,
    now: DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>, TimeResolveError> {
    let lower = expr.to_lowercase();
    let qualifier = day_qualifier(&lower);
    let clock = parse_clock_time(&lower)
        .ok_or_else(|| TimeResolveError::Unparseable(expr.to_string()))?;

    let base_date = match qualifier {
        DayQualifier::Tomorrow => now.date_naive() + Duration::days(1),
        _ => now.date_naive(),
    };

    let naive = base_date.and_time(clock);
    let candidate = now
        .timezone()
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| TimeResolveError::Unparseable(expr.to_string()))?;

    if candidate <= now {
        return Err(TimeResolveError::PastTime);
    }
    Ok(candidate)
}

/// Parse the clock time (if any) mentioned in an utterance, without
/// resolving it to a full instant or rejecting past times — used to
/// disambiguate *which already-created task* a user means (§4.3 delete-tasks
/// "matches on both description and time"), not to schedule a new one.
pub fn mentioned_clock_time(expr: &str) -> Option<NaiveTime> {
    parse_clock_time(&expr.to_lowercase())
}

/// Current instant expressed in `tz_name`'s offset. Falls back to UTC for
/// an unrecognized IANA name rather than failing the turn — a malformed
/// user profile timezone shouldn't block every tool call.
pub fn now_in_zone(tz_name: &str) -> DateTime<FixedOffset> {
    let tz: chrono_tz::Tz = tz_name.parse().unwrap_or(chrono_tz::UTC);
    chrono::Utc::now().with_timezone(&tz).fixed_offset()
}

/// Resolve a get-tasks range phrase to calendar-day boundaries in the
/// user's zone (§4.3 get-tasks rules — boundaries, not rolling 24-hour
/// windows). Recognizes "today", "tomorrow", "yesterday", "this week", and
/// "next week" (week = Monday through Sunday, inclusive). Anything else
/// falls back to a wide one-year window either side of `now` so the tool
/// never fails merely because the phrase wasn't one of the recognized
/// keywords — an empty result for an unmatched query is still a valid,
/// successful answer (§4.3 "an empty list is a success, not an error").
pub fn resolve_day_range_expression(
    expr: &str,
    now: DateTime<FixedOffset>,
) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let lower = expr.to_lowercase();
    let tz = now.timezone();
    let today = now.date_naive();

    let day_bounds = |date: chrono::NaiveDate| -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
        let start = tz
            .from_local_datetime(&date.and_hms_opt(0, 0, 0).expect("valid midnight"))
            .single()
            .unwrap_or(now);
        let end = tz
            .from_local_datetime(&date.and_hms_opt(23, 59, 59).expect("valid end-of-day"))
            .single()
            .unwrap_or(now);
        (start, end)
    };

    if lower.contains("tomorrow") {
        day_bounds(today + Duration::days(1))
    } else if lower.contains("yesterday") {
        day_bounds(today - Duration::days(1))
    } else if lower.contains("next week") {
        let days_since_monday = today.weekday().num_days_from_monday() as i64;
        let next_monday = today - Duration::days(days_since_monday) + Duration::days(7);
        let (start, _) = day_bounds(next_monday);
        let (_, end) = day_bounds(next_monday + Duration::days(6));
        (start, end)
    } else if lower.contains("this week") || lower.contains("week") {
        let days_since_monday = today.weekday().num_days_from_monday() as i64;
        let monday = today - Duration::days(days_since_monday);
        let (start, _) = day_bounds(monday);
        let (_, end) = day_bounds(monday + Duration::days(6));
        (start, end)
    } else if lower.contains("today") || lower.contains("tonight") {
        day_bounds(today)
    } else {
        (now - Duration::days(365), now + Duration::days(365))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pst(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        let offset = FixedOffset::west_opt(8 * 3600).unwrap();
        offset.with_ymd_and_hms(y, m, d, h, mi, 0).unwrap()
    }

    #[test]
    fn bare_time_resolves_to_today_when_still_future() {
        let now = pst(2026, 1, 20, 5, 0);
        let resolved = resolve_time_expression("remind me at 6am to brush my teeth", now).unwrap();
        assert_eq!(resolved, pst(2026, 1, 20, 6, 0));
    }

    #[test]
    fn bare_time_in_the_past_is_rejected_not_rolled_forward() {
        let now = pst(2026, 1, 20, 7, 0);
        let err = resolve_time_expression("remind me at 6am", now).unwrap_err();
        assert!(matches!(err, TimeResolveError::PastTime));
    }

    #[test]
    fn tomorrow_qualifier_advances_the_date() {
        let now = pst(2026, 1, 20, 23, 0);
        let resolved = resolve_time_expression("pack my bag tomorrow at 11am", now).unwrap();
        assert_eq!(resolved, pst(2026, 1, 21, 11, 0));
    }

    #[test]
    fn tonight_qualifier_keeps_todays_date() {
        let now = pst(2026, 1, 20, 10, 0);
        let resolved = resolve_time_expression("call me tonight at 9pm", now).unwrap();
        assert_eq!(resolved, pst(2026, 1, 20, 21, 0));
    }

    #[test]
    fn twenty_four_hour_clock_is_recognized() {
        let now = pst(2026, 1, 20, 5, 0);
        let resolved = resolve_time_expression("meeting at 18:30", now).unwrap();
        assert_eq!(resolved, pst(2026, 1, 20, 18, 30));
    }

    #[test]
    fn bare_number_without_am_pm_or_colon_is_unparseable() {
        let now = pst(2026, 1, 20, 5, 0);
        let err = resolve_time_expression("call mom in 2 hours", now).unwrap_err();
        assert!(matches!(err, TimeResolveError::Unparseable(_)));
    }

    #[test]
    fn noon_and_midnight_hour_wraparound() {
        let now = pst(2026, 1, 20, 0, 0);
        assert_eq!(
            resolve_time_expression("lunch at 12pm", now).unwrap(),
            pst(2026, 1, 20, 12, 0)
        );
    }

    #[test]
    fn today_range_is_calendar_day_not_rolling_24h() {
        // 2026-01-20 is a Tuesday.
        let now = pst(2026, 1, 20, 23, 30);
        let (start, end) = resolve_day_range_expression("what's on today?", now);
        assert_eq!(start, pst(2026, 1, 20, 0, 0));
        assert_eq!(end.date_naive(), start.date_naive());
    }

    #[test]
    fn next_week_spans_the_following_monday_through_sunday() {
        let now = pst(2026, 1, 20, 9, 0); // Tuesday
        let (start, end) = resolve_day_range_expression("what do I have next week?", now);
        assert_eq!(start.date_naive(), pst(2026, 1, 26, 0, 0).date_naive());
        assert_eq!(end.date_naive(), pst(2026, 2, 1, 0, 0).date_naive());
    }

    #[test]
    fn unrecognized_phrase_falls_back_to_a_wide_window_not_an_error() {
        let now = pst(2026, 1, 20, 9, 0);
        let (start, end) = resolve_day_range_expression("whenever I get around to it", now);
        assert!(start < now && end > now);
    }

    #[test]
    fn mentioned_clock_time_does_not_reject_a_time_already_past() {
        // Disambiguation compares against an already-created task's stored
        // time, which may well be in the past relative to "now" — unlike
        // `resolve_time_expression`, this must not error on that.
        let parsed = mentioned_clock_time("delete the 6am call mom reminder").unwrap();
        assert_eq!(parsed, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
    }

    #[test]
    fn mentioned_clock_time_is_none_without_a_clock_mention() {
        assert!(mentioned_clock_time("delete the call mom reminder").is_none());
    }
}
