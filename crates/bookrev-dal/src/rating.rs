//! Incremental rating arithmetic.
//!
//! Averages are kept rounded to one decimal place after every step, the
//! same precision clients display. Rate value 0 means "not rated" and
//! never enters a count or an average.

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Average after one more rating joins `count` existing ones.
pub fn rate_added(current: f64, count: i64, new: f64) -> f64 {
    if count == 0 {
        return round1(new);
    }
    round1((current * count as f64 + new) / (count as f64 + 1.0))
}

/// Average after one of `count` ratings changes value, count stays.
pub fn rate_replaced(current: f64, count: i64, old: f64, new: f64) -> f64 {
    round1((current * count as f64 - old + new) / count as f64)
}

/// Average after one of `count` ratings is withdrawn.
pub fn rate_removed(current: f64, count: i64, old: f64) -> f64 {
    if count <= 1 {
        return 0.0;
    }
    round1((current * count as f64 - old) / (count as f64 - 1.0))
}

/// Mean of the dimension averages, counting only dimensions which have
/// at least one rating. Zero when nothing is rated yet.
pub fn overall_rate(
    book_rate: f64,
    narrator_rate: f64,
    book_count: i64,
    narrator_count: i64,
) -> f64 {
    let mut rated = 0;
    let mut sum = 0.0;
    if book_count > 0 {
        rated += 1;
        sum += book_rate;
    }
    if narrator_count > 0 {
        rated += 1;
        sum += narrator_rate;
    }
    if rated == 0 {
        return 0.0;
    }
    round1(sum / rated as f64)
}
