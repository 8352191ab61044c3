//! Nanosecond-precision store timestamp
//!
//! This is the store's native time representation. It carries more precision
//! than the application layer ever uses: application code works in
//! millisecond-truncated `DateTime<Utc>` values and converts at the codec
//! boundary.
//!
//! ## Representation
//!
//! Seconds since Unix epoch plus a nanosecond fraction in `0..1_000_000_000`.
//! Negative seconds express instants before the epoch; `nanos` always counts
//! forward from `seconds`.
//!
//! ```
//! use bazaar_core::Timestamp;
//!
//! let ts = Timestamp::from_millis(1_500);
//! assert_eq!(ts.seconds(), 1);
//! assert_eq!(ts.nanos(), 500_000_000);
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: i64 = 1_000_000_000;
const NANOS_PER_MILLI: i64 = 1_000_000;

/// Store-native timestamp with nanosecond resolution
///
/// ## Invariants
///
/// - `nanos < 1_000_000_000`
/// - Ordering is chronological (seconds first, then nanos)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    seconds: i64,
    nanos: u32,
}

impl Timestamp {
    /// Unix epoch (1970-01-01 00:00:00 UTC)
    pub const EPOCH: Timestamp = Timestamp {
        seconds: 0,
        nanos: 0,
    };

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a timestamp from seconds and a nanosecond fraction
    ///
    /// Returns `None` if `nanos` is not below one second.
    pub fn new(seconds: i64, nanos: u32) -> Option<Self> {
        if (nanos as i64) < NANOS_PER_SEC {
            Some(Timestamp { seconds, nanos })
        } else {
            None
        }
    }

    /// Create a timestamp for the current moment at full system precision
    ///
    /// Returns epoch if the system clock is before Unix epoch.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp {
            seconds: duration.as_secs() as i64,
            nanos: duration.subsec_nanos(),
        }
    }

    /// Create a timestamp from milliseconds since epoch
    pub fn from_millis(millis: i64) -> Self {
        Self::from_nanos_i128(millis as i128 * NANOS_PER_MILLI as i128)
    }

    /// Create a timestamp from nanoseconds since epoch
    pub fn from_nanos(nanos: i128) -> Self {
        Self::from_nanos_i128(nanos)
    }

    fn from_nanos_i128(total: i128) -> Self {
        let seconds = total.div_euclid(NANOS_PER_SEC as i128) as i64;
        let nanos = total.rem_euclid(NANOS_PER_SEC as i128) as u32;
        Timestamp { seconds, nanos }
    }

    /// Convert a UTC date value into a store timestamp (lossless)
    ///
    /// A leap second (sub-second nanos of one second or more) carries into
    /// the next second.
    pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
        Self::from_nanos_i128(
            dt.timestamp() as i128 * NANOS_PER_SEC as i128 + dt.timestamp_subsec_nanos() as i128,
        )
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Whole seconds since Unix epoch
    #[inline]
    pub const fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Nanosecond fraction of the current second
    #[inline]
    pub const fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Milliseconds since Unix epoch (floors sub-millisecond precision)
    ///
    /// Saturates at the ends of the `i64` range.
    pub fn as_millis(&self) -> i64 {
        self.seconds
            .saturating_mul(1_000)
            .saturating_add((self.nanos as i64) / NANOS_PER_MILLI)
    }

    /// Nanoseconds since Unix epoch
    pub fn as_nanos(&self) -> i128 {
        self.seconds as i128 * NANOS_PER_SEC as i128 + self.nanos as i128
    }

    /// Convert to a UTC date value
    ///
    /// Timestamps outside chrono's representable range clamp to the range ends.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        match Utc.timestamp_opt(self.seconds, self.nanos).single() {
            Some(dt) => dt,
            None if self.seconds < 0 => DateTime::<Utc>::MIN_UTC,
            None => DateTime::<Utc>::MAX_UTC,
        }
    }

    /// Drop everything below millisecond precision
    pub fn truncate_to_millis(&self) -> Self {
        Timestamp {
            seconds: self.seconds,
            nanos: self.nanos - self.nanos % NANOS_PER_MILLI as u32,
        }
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    /// Add a duration
    pub fn saturating_add(&self, duration: Duration) -> Self {
        let total = self
            .as_nanos()
            .saturating_add(duration.as_nanos().min(i128::MAX as u128) as i128);
        Self::from_nanos_i128(total)
    }

    /// The smallest timestamp strictly after this one
    pub fn next_nano(&self) -> Self {
        Self::from_nanos_i128(self.as_nanos() + 1)
    }

    /// Compute duration since an earlier timestamp
    ///
    /// Returns `None` if `earlier` is actually later than `self`.
    pub fn duration_since(&self, earlier: Timestamp) -> Option<Duration> {
        let diff = self.as_nanos() - earlier.as_nanos();
        if diff >= 0 {
            Some(Duration::from_nanos(diff.min(u64::MAX as i128) as u64))
        } else {
            None
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.to_datetime()
                .to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
        )
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp::from_datetime(&dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.to_datetime()
    }
}
