//! Receipt wording and the late-payment penalty.

use chrono::{DateTime, Datelike, Month, Utc};
use rust_decimal::Decimal;

use crate::models::PaymentDuration;

const PENALTY_BASE: i64 = 50;
const PENALTY_PER_EXTRA_WEEK: i64 = 25;
const SECONDS_PER_DAY: i64 = 86_400;

fn month_at(start: DateTime<Utc>, offset: u32) -> Month {
    let index = (start.month0() + offset) % 12;
    Month::try_from((index + 1) as u8).unwrap_or(Month::January)
}

fn short_name(month: Month) -> &'static str {
    &month.name()[..3]
}

fn consecutive_months(start: DateTime<Utc>, count: u32) -> String {
    (0..count)
        .map(|offset| short_name(month_at(start, offset)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Human-readable period covered by a registration's tuition line.
pub fn format_payment_duration(duration: PaymentDuration, created_at: DateTime<Utc>) -> String {
    match duration {
        PaymentDuration::OneMonth => month_at(created_at, 0).name().to_string(),
        PaymentDuration::TwoMonths => format!(
            "{} and {}",
            short_name(month_at(created_at, 0)),
            short_name(month_at(created_at, 1))
        ),
        PaymentDuration::Quarter => {
            let quarter = match created_at.month() {
                1..=3 => "First",
                4..=6 => "Second",
                7..=9 => "Third",
                _ => "Fourth",
            };
            format!("{} Quarter", quarter)
        }
        PaymentDuration::ThreeMonths => consecutive_months(created_at, 3),
        PaymentDuration::FourMonths => consecutive_months(created_at, 4),
        PaymentDuration::FiveMonths => consecutive_months(created_at, 5),
        PaymentDuration::TenMonths => "Academic Year (10 months)".to_string(),
    }
}

/// 50 for the first (partial) week late, plus 25 for every week after it.
pub fn calculate_penalty_fee(due_date: DateTime<Utc>, actual_payment_date: DateTime<Utc>) -> Decimal {
    if actual_payment_date <= due_date {
        return Decimal::ZERO;
    }

    let seconds_late = (actual_payment_date - due_date).num_seconds();
    let days_late = (seconds_late + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
    let weeks_late = (days_late + 6) / 7;

    Decimal::from(PENALTY_BASE + (weeks_late - 1).max(0) * PENALTY_PER_EXTRA_WEEK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 9, 0, 0).unwrap()
    }

    #[test]
    fn penalty_grows_per_week() {
        let due = at(2026, 9, 1);
        assert_eq!(calculate_penalty_fee(due, due), Decimal::ZERO);
        assert_eq!(calculate_penalty_fee(due, due - Duration::days(3)), Decimal::ZERO);
        assert_eq!(calculate_penalty_fee(due, due + Duration::days(1)), Decimal::from(50));
        assert_eq!(calculate_penalty_fee(due, due + Duration::days(7)), Decimal::from(50));
        assert_eq!(calculate_penalty_fee(due, due + Duration::days(8)), Decimal::from(75));
        assert_eq!(calculate_penalty_fee(due, due + Duration::days(15)), Decimal::from(100));
    }

    #[test]
    fn partial_day_counts_as_a_day() {
        let due = at(2026, 9, 1);
        assert_eq!(
            calculate_penalty_fee(due, due + Duration::minutes(5)),
            Decimal::from(50)
        );
        assert_eq!(
            calculate_penalty_fee(due, due + Duration::days(7) + Duration::hours(1)),
            Decimal::from(75)
        );
    }

    #[test]
    fn two_month_labels_wrap_at_year_end() {
        assert_eq!(
            format_payment_duration(PaymentDuration::TwoMonths, at(2026, 11, 3)),
            "Nov and Dec"
        );
        assert_eq!(
            format_payment_duration(PaymentDuration::TwoMonths, at(2026, 12, 20)),
            "Dec and Jan"
        );
    }

    #[test]
    fn quarter_is_the_calendar_quarter() {
        let label = |month| format_payment_duration(PaymentDuration::Quarter, at(2026, month, 10));
        assert_eq!(label(2), "First Quarter");
        assert_eq!(label(4), "Second Quarter");
        assert_eq!(label(9), "Third Quarter");
        assert_eq!(label(12), "Fourth Quarter");
    }

    #[test]
    fn other_durations() {
        let nov = at(2026, 11, 3);
        assert_eq!(format_payment_duration(PaymentDuration::OneMonth, nov), "November");
        assert_eq!(
            format_payment_duration(PaymentDuration::ThreeMonths, nov),
            "Nov, Dec, Jan"
        );
        assert_eq!(
            format_payment_duration(PaymentDuration::FiveMonths, nov),
            "Nov, Dec, Jan, Feb, Mar"
        );
        assert_eq!(
            format_payment_duration(PaymentDuration::TenMonths, nov),
            "Academic Year (10 months)"
        );
    }
}
