//! Update policies: how often a remote resource is re-checked.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

/// Refresh interval for remote content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UpdatePolicy {
    Always,
    #[default]
    Daily,
    /// Re-check once this many minutes have elapsed.
    Interval(u32),
    Never,
}

impl UpdatePolicy {
    /// Parse a policy string; anything unrecognised is treated as `never`.
    pub fn parse(policy: &str) -> Self {
        let policy = policy.trim();
        if policy.is_empty() || policy.eq_ignore_ascii_case("daily") {
            return UpdatePolicy::Daily;
        }
        if policy.eq_ignore_ascii_case("always") {
            return UpdatePolicy::Always;
        }
        if policy.eq_ignore_ascii_case("never") {
            return UpdatePolicy::Never;
        }
        if let Some(minutes) = policy
            .split_once(':')
            .filter(|(kind, _)| kind.eq_ignore_ascii_case("interval"))
            .and_then(|(_, minutes)| minutes.trim().parse::<u32>().ok())
        {
            return UpdatePolicy::Interval(minutes);
        }
        warn!(policy, "unknown update policy, assuming 'never'");
        UpdatePolicy::Never
    }

    /// Refresh interval in minutes; smaller means more frequent.
    pub fn ordinal(self) -> u32 {
        match self {
            UpdatePolicy::Always => 0,
            UpdatePolicy::Interval(minutes) => minutes,
            UpdatePolicy::Daily => 24 * 60,
            UpdatePolicy::Never => u32::MAX,
        }
    }

    /// The policy that refreshes more often.
    pub fn effective(self, other: UpdatePolicy) -> UpdatePolicy {
        if other.ordinal() < self.ordinal() {
            other
        } else {
            self
        }
    }

    /// Whether content last checked at `last_updated` is stale at `now`.
    pub fn is_update_required(self, last_updated: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            UpdatePolicy::Always => true,
            UpdatePolicy::Never => false,
            UpdatePolicy::Daily => {
                let midnight = now.date_naive().and_hms_opt(0, 0, 0).map(|t| t.and_utc());
                midnight.map_or(true, |midnight| last_updated < midnight)
            }
            UpdatePolicy::Interval(minutes) => {
                last_updated + Duration::minutes(i64::from(minutes)) <= now
            }
        }
    }
}

impl fmt::Display for UpdatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdatePolicy::Always => write!(f, "always"),
            UpdatePolicy::Daily => write!(f, "daily"),
            UpdatePolicy::Interval(minutes) => write!(f, "interval:{}", minutes),
            UpdatePolicy::Never => write!(f, "never"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(UpdatePolicy::parse("always"), UpdatePolicy::Always);
        assert_eq!(UpdatePolicy::parse("DAILY"), UpdatePolicy::Daily);
        assert_eq!(UpdatePolicy::parse(""), UpdatePolicy::Daily);
        assert_eq!(UpdatePolicy::parse("interval:30"), UpdatePolicy::Interval(30));
        assert_eq!(UpdatePolicy::parse("never"), UpdatePolicy::Never);
        assert_eq!(UpdatePolicy::parse("interval:soon"), UpdatePolicy::Never);
        assert_eq!(UpdatePolicy::parse("hourly"), UpdatePolicy::Never);
    }

    #[test]
    fn test_display_parses_back() {
        for policy in [
            UpdatePolicy::Always,
            UpdatePolicy::Daily,
            UpdatePolicy::Interval(90),
            UpdatePolicy::Never,
        ] {
            assert_eq!(UpdatePolicy::parse(&policy.to_string()), policy);
        }
    }

    #[test]
    fn test_effective_picks_shorter_interval() {
        let daily = UpdatePolicy::Daily;
        assert_eq!(daily.effective(UpdatePolicy::Interval(60)), UpdatePolicy::Interval(60));
        assert_eq!(daily.effective(UpdatePolicy::Never), daily);
        assert_eq!(UpdatePolicy::Never.effective(UpdatePolicy::Always), UpdatePolicy::Always);
        assert_eq!(
            UpdatePolicy::Interval(2000).effective(daily),
            UpdatePolicy::Daily
        );
    }

    #[test]
    fn test_daily_compares_against_midnight() {
        let now = at(9, 0);
        assert!(!UpdatePolicy::Daily.is_update_required(at(0, 30), now));
        assert!(UpdatePolicy::Daily.is_update_required(at(0, 30) - Duration::hours(1), now));
    }

    #[test]
    fn test_interval() {
        let policy = UpdatePolicy::Interval(60);
        assert!(!policy.is_update_required(at(8, 30), at(9, 0)));
        assert!(policy.is_update_required(at(8, 0), at(9, 0)));
    }

    #[test]
    fn test_always_and_never() {
        assert!(UpdatePolicy::Always.is_update_required(at(9, 0), at(9, 0)));
        assert!(!UpdatePolicy::Never.is_update_required(at(0, 0) - Duration::days(365), at(9, 0)));
    }
}
