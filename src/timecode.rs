//! Tape time composition.
//!
//! Tape times are recorded as day-of-year, hour, minute and second with no year, so
//! every absolute time is composed against a year supplied by the caller. Times are
//! handled as [DateTime<Utc>] while composing and as fractional Unix seconds on the
//! output grid.
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::words::Word;

/// Start of the window, in Unix seconds (1972-01-01), during which recorded times run
/// ahead of true time.
pub const CLOCK_OFFSET_START: f64 = 63_072_000.0;
/// End of the clock offset window, in Unix seconds (1975-04-01).
pub const CLOCK_OFFSET_END: f64 = 165_542_400.0;
/// Seconds subtracted from times inside the clock offset window.
pub const CLOCK_OFFSET: f64 = 12.5;

/// Compose an absolute time from a year and day-of-year (1-based) time of day.
///
/// Components are applied as offsets from January 1st, so out of range hours, minutes
/// or seconds roll over rather than fail. Returns `None` if any component is missing
/// or the result is not representable.
///
/// # Example
/// ```
/// use thir::timecode::compose;
///
/// let t = compose(1970, Some(110), Some(0), Some(38), Some(37)).unwrap();
/// assert_eq!(t.to_rfc3339(), "1970-04-20T00:38:37+00:00");
/// ```
#[must_use]
pub fn compose(
    year: i32,
    day: Word,
    hour: Word,
    minute: Word,
    second: Word,
) -> Option<DateTime<Utc>> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let jan1 = Utc.from_utc_datetime(&jan1);
    jan1.checked_add_signed(Duration::try_days(day? - 1)?)?
        .checked_add_signed(Duration::try_hours(hour?)?)?
        .checked_add_signed(Duration::try_minutes(minute?)?)?
        .checked_add_signed(Duration::try_seconds(second?)?)
}

/// Fractional Unix seconds for `t`.
#[must_use]
pub fn unix_seconds(t: &DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let secs = t.timestamp() as f64;
    secs + f64::from(t.timestamp_subsec_nanos()) * 1e-9
}

/// Returns true if `t`, in Unix seconds, falls strictly inside the clock offset window.
#[must_use]
pub fn in_clock_offset_window(t: f64) -> bool {
    CLOCK_OFFSET_START < t && t < CLOCK_OFFSET_END
}

/// Remove the recorder clock offset from `t` if it falls inside the clock offset
/// window.
#[must_use]
pub fn correct_clock_offset(t: f64) -> f64 {
    if in_clock_offset_window(t) {
        t - CLOCK_OFFSET
    } else {
        t
    }
}
