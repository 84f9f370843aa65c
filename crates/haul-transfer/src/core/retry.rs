use std::time::Duration;

/// Delay before the retry that follows failed attempt number `attempt`.
///
/// The delay formula is: `min(base * 2^(attempt - 1), max)`
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use haul_transfer::retry_delay;
///
/// let base = Duration::from_millis(100);
/// let max = Duration::from_secs(1);
///
/// assert_eq!(retry_delay(1, base, max), Duration::from_millis(100));
/// assert_eq!(retry_delay(2, base, max), Duration::from_millis(200));
/// assert_eq!(retry_delay(3, base, max), Duration::from_millis(400));
/// assert_eq!(retry_delay(5, base, max), Duration::from_secs(1));
/// ```
pub fn retry_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let multiplier = 2_u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(multiplier).min(max)
}
