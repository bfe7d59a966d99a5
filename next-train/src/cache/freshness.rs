//! Cache freshness policy.

/// Whether a cached payload is young enough to serve without a network fetch.
///
/// The refresh interval is truncated to whole minutes before comparing, so
/// any interval under 60 seconds never counts a cached entry as fresh.
///
/// # Examples
///
/// ```
/// use next_train::cache::is_fresh;
///
/// assert!(is_fresh(9, 600));
/// assert!(!is_fresh(10, 600));
/// assert!(!is_fresh(0, 59));
/// ```
pub fn is_fresh(age_minutes: i64, refresh_interval_secs: u64) -> bool {
    let interval_minutes = i64::try_from(refresh_interval_secs / 60).unwrap_or(i64::MAX);
    age_minutes < interval_minutes
}
