//! Time-of-day arithmetic and boundary detection.

use chrono::{Local, TimeZone, Timelike};

use crate::protocol::Timestamp;

/// Seconds in a day.
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Instant `seconds_since_midnight` into the local day containing `now`.
///
/// With `must_be_future`, an instant that is not after `now` moves to the
/// following day.
#[must_use]
pub fn next_start_time(
    now: Timestamp,
    seconds_since_midnight: i64,
    must_be_future: bool,
) -> Timestamp {
    let elapsed = Local
        .timestamp_opt(now, 0)
        .earliest()
        .map_or(0, |local| i64::from(local.num_seconds_from_midnight()));
    let start = now
        .saturating_sub(elapsed)
        .saturating_add(seconds_since_midnight);
    if must_be_future && start <= now {
        start.saturating_add(SECONDS_PER_DAY)
    } else {
        start
    }
}

/// `seconds` when it names an instant within a day.
#[must_use]
pub fn time_of_day(seconds: i64) -> Option<i64> {
    (0..SECONDS_PER_DAY).contains(&seconds).then_some(seconds)
}

/// Advance `next_firing` by whole multiples of `interval` until it is after
/// `now`; always advances at least once.
#[must_use]
pub fn catch_up(next_firing: Timestamp, interval: i64, now: Timestamp) -> Timestamp {
    if interval <= 0 {
        return next_firing;
    }
    let next = next_firing.saturating_add(interval);
    if next > now {
        return next;
    }
    let behind = now.saturating_sub(next);
    let steps = behind / interval + 1;
    next.saturating_add(steps.saturating_mul(interval))
}

/// Whether a reading moving from `last` to `current` crosses either boundary
/// of a pair, in either direction.
///
/// A boundary that is not configured is `None`. Reaching a boundary from
/// the inside does not count; leaving it does.
#[must_use]
pub fn value_crosses_boundary(
    last: f64,
    current: f64,
    low: Option<f64>,
    high: Option<f64>,
) -> bool {
    [low, high].into_iter().flatten().any(|boundary| {
        (last <= boundary && boundary < current) || (last >= boundary && boundary > current)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: Timestamp = 1_700_000_000;

    fn midnight(now: Timestamp) -> Timestamp {
        next_start_time(now, 0, false)
    }

    #[test]
    fn start_time_is_relative_to_local_midnight() {
        let base = midnight(NOW);
        assert!(base <= NOW && NOW - base < SECONDS_PER_DAY);
        assert_eq!(next_start_time(NOW, 3600, false), base + 3600);
    }

    #[test]
    fn past_start_moves_to_tomorrow_only_when_required() {
        let elapsed = NOW - midnight(NOW);
        let earlier = elapsed - 1;
        let today = next_start_time(NOW, earlier, false);
        assert_eq!(today, NOW - 1);
        assert_eq!(next_start_time(NOW, earlier, true), NOW - 1 + SECONDS_PER_DAY);
        assert_eq!(next_start_time(NOW, elapsed, true), NOW + SECONDS_PER_DAY);
        assert_eq!(next_start_time(NOW, elapsed + 10, true), NOW + 10);
    }

    #[test]
    fn time_of_day_rejects_values_outside_one_day() {
        assert_eq!(time_of_day(0), Some(0));
        assert_eq!(time_of_day(SECONDS_PER_DAY - 1), Some(SECONDS_PER_DAY - 1));
        assert_eq!(time_of_day(SECONDS_PER_DAY), None);
        assert_eq!(time_of_day(-1), None);
        assert_eq!(time_of_day(i64::MAX), None);
    }

    #[test]
    fn catch_up_skips_missed_periods() {
        assert_eq!(catch_up(100, 60, 120), 160);
        assert_eq!(catch_up(100, 60, 1000), 1060);
        assert_eq!(catch_up(100, 60, 50), 160);
        assert_eq!(catch_up(100, 0, 1000), 100);
    }

    #[test]
    fn catch_up_landing_on_now_moves_one_more_period() {
        assert_eq!(catch_up(100, 60, 160), 220);
        assert_eq!(catch_up(NOW - 120, 60, NOW), NOW + 60);
    }

    #[test]
    fn out_of_range_time_of_day_saturates() {
        assert_eq!(next_start_time(NOW, i64::MAX, true), i64::MAX);
        assert!(next_start_time(NOW, i64::MIN, true) < NOW);
        assert_eq!(catch_up(i64::MAX - 10, 60, NOW), i64::MAX);
    }

    #[test]
    fn crossings_in_every_direction() {
        // rising through low
        assert!(value_crosses_boundary(5.0, 15.0, Some(10.0), Some(20.0)));
        // rising through high
        assert!(value_crosses_boundary(15.0, 25.0, Some(10.0), Some(20.0)));
        // falling through high
        assert!(value_crosses_boundary(25.0, 15.0, Some(10.0), Some(20.0)));
        // falling through low
        assert!(value_crosses_boundary(15.0, 5.0, Some(10.0), Some(20.0)));
        // inside the band
        assert!(!value_crosses_boundary(12.0, 18.0, Some(10.0), Some(20.0)));
        // landing on a boundary
        assert!(!value_crosses_boundary(5.0, 10.0, Some(10.0), None));
        assert!(value_crosses_boundary(10.0, 5.0, Some(10.0), None));
        // unconfigured boundaries never trigger
        assert!(!value_crosses_boundary(5.0, 15.0, None, None));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn catch_up_lands_strictly_after_now_within_one_period(
                next in -10_000i64..10_000,
                interval in 1i64..5_000,
                now in -10_000i64..100_000,
            ) {
                let result = catch_up(next, interval, now);
                prop_assert!(result > next);
                prop_assert_eq!((result - next) % interval, 0);
                prop_assert!(result > now);
                prop_assert!(result - interval <= now.max(next));
            }
        }
    }
}
