// src/utils/dates.rs
//! Membership-date helpers.
//!
//! Credential payloads carry the expiry as a compact 8-digit `YYYYMMDD`
//! string (QR-friendly, no separators). The store's `valid_until` column is a
//! regular `YYYY-MM-DD` date. Both funnel into the same membership check.

use chrono::NaiveDate;

/// Compact payload date format (`YYYYMMDD`).
pub const EXPIRY_FORMAT: &str = "%Y%m%d";

/// Sentinel written into a payload when the student has no expiry on file.
///
/// It never parses as a real date, so the verifier treats the credential as
/// already expired. Issuing an "owes" credential instead of failing keeps the
/// front desk in the loop without a hard error.
pub const MIN_EXPIRY: &str = "00000000";

/// Membership state of a student relative to a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// Expiry is today or later.
    Current,
    /// No parseable expiry on record; policy-equivalent to overdue.
    NoExpiry,
    /// Expired strictly before the reference date, with whole days overdue.
    Overdue(i64),
}

/// Formats a date as a compact payload expiry.
pub fn format_expiry(date: NaiveDate) -> String {
    date.format(EXPIRY_FORMAT).to_string()
}

/// Parses a compact `YYYYMMDD` expiry. Returns `None` for anything that is
/// not a real calendar date, including the [`MIN_EXPIRY`] sentinel.
pub fn parse_expiry(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, EXPIRY_FORMAT).ok()
}

/// Classifies a membership expiry against `today`.
///
/// Expiry exactly equal to `today` is still current: `debe` triggers only
/// when expiry < today, strictly.
pub fn membership_state(expiry: Option<NaiveDate>, today: NaiveDate) -> Membership {
    match expiry {
        None => Membership::NoExpiry,
        Some(date) if date < today => Membership::Overdue((today - date).num_days()),
        Some(_) => Membership::Current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_expiry_round_trip() {
        let d = date(2026, 5, 1);
        assert_eq!(format_expiry(d), "20260501");
        assert_eq!(parse_expiry("20260501"), Some(d));
    }

    #[test]
    fn test_sentinel_never_parses() {
        assert_eq!(parse_expiry(MIN_EXPIRY), None);
        assert_eq!(parse_expiry("garbage!"), None);
        assert_eq!(parse_expiry("20261301"), None);
    }

    #[test]
    fn test_today_is_not_expired() {
        let today = date(2026, 5, 1);
        assert_eq!(membership_state(Some(today), today), Membership::Current);
    }

    #[test]
    fn test_days_overdue_count() {
        let today = date(2026, 5, 2);
        assert_eq!(
            membership_state(Some(date(2026, 5, 1)), today),
            Membership::Overdue(1)
        );
        assert_eq!(
            membership_state(Some(date(2026, 4, 2)), today),
            Membership::Overdue(30)
        );
    }

    #[test]
    fn test_missing_expiry_owes() {
        assert_eq!(
            membership_state(None, date(2026, 1, 1)),
            Membership::NoExpiry
        );
    }
}
