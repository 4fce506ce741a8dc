use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use foundation::DateItem;

/// Returns the candidate nearest to `target`. Equidistant candidates resolve to
/// the earlier one.
///
/// An empty `candidates` slice returns `target` unchanged; callers are expected
/// to check for that before asking.
pub fn find_closest_date(target: DateTime<Utc>, candidates: &[DateTime<Utc>]) -> DateTime<Utc> {
    candidates
        .iter()
        .copied()
        .min_by_key(|c| (distance_ms(*c, target), *c))
        .unwrap_or(target)
}

/// Like [`find_closest_date`] over `DateItem`s, keeping the item's metadata.
pub fn find_closest_item(target: DateTime<Utc>, items: &[DateItem]) -> Option<&DateItem> {
    items
        .iter()
        .min_by_key(|i| (distance_ms(i.display_date, target), i.display_date))
}

/// Most recent candidate.
pub fn latest_date(candidates: &[DateTime<Utc>]) -> Option<DateTime<Utc>> {
    candidates.iter().copied().max()
}

/// Binary search for `target` in `sorted` by `key`.
///
/// `sorted` must be ascending by the same key; an unsorted slice gives
/// arbitrary answers.
pub fn binary_includes<T, K, F>(sorted: &[T], target: &K, key: F) -> bool
where
    K: Ord,
    F: Fn(&T) -> K,
{
    sorted
        .binary_search_by(|probe| key(probe).cmp(target))
        .is_ok()
}

/// Calendar-day membership in an ascending timestamp slice.
pub fn includes_day(sorted: &[DateTime<Utc>], day: NaiveDate) -> bool {
    binary_includes(sorted, &day, |ts| ts.date_naive())
}

/// Calendar-day membership in an ascending `DateItem` slice.
pub fn items_include_day(sorted: &[DateItem], day: NaiveDate) -> bool {
    binary_includes(sorted, &day, DateItem::day)
}

fn distance_ms(a: DateTime<Utc>, b: DateTime<Utc>) -> u64 {
    let delta = match a.cmp(&b) {
        Ordering::Less => b - a,
        _ => a - b,
    };
    u64::try_from(delta.num_milliseconds()).unwrap_or(u64::MAX)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    proptest! {
        /// The answer is a candidate, and no candidate is strictly closer.
        #[test]
        fn closest_is_member_and_minimal(
            target in 0i64..4_000_000_000,
            raw in vec(0i64..4_000_000_000, 1..50),
        ) {
            let candidates: Vec<DateTime<Utc>> = raw.iter().map(|s| ts(*s)).collect();
            let t = ts(target);
            let got = find_closest_date(t, &candidates);
            prop_assert!(candidates.contains(&got));
            let best = (got - t).num_seconds().abs();
            for c in &candidates {
                prop_assert!(best <= (*c - t).num_seconds().abs());
            }
        }

        /// Binary search agrees with a linear scan on sorted input.
        #[test]
        fn binary_includes_matches_linear_scan(
            values in vec(0u32..500, 0..80),
            target in 0u32..500,
        ) {
            let mut values = values;
            values.sort();
            let linear = values.iter().any(|v| *v == target);
            prop_assert_eq!(binary_includes(&values, &target, |v| *v), linear);
        }
    }
}
