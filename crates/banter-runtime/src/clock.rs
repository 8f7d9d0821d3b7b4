//! Local-time clocks for the announcer.
//!
//! The capability is chosen once at construction: a [`ZonedClock`] when the
//! configured timezone is known, otherwise a [`FixedOffsetClock`] at UTC+3.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Offset used when the named timezone cannot be resolved.
pub const FALLBACK_OFFSET_SECS: i32 = 3 * 3600;

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Timezone-aware clock (DST rules included).
#[derive(Debug, Clone, Copy)]
pub struct ZonedClock(pub Tz);

impl Clock for ZonedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let local = Utc::now().with_timezone(&self.0);
        local.with_timezone(&local.offset().fix())
    }
}

/// Clock pinned to a constant UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct FixedOffsetClock(pub FixedOffset);

impl Clock for FixedOffsetClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.0)
    }
}

fn fallback_offset() -> FixedOffset {
    FixedOffset::east_opt(FALLBACK_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Pick the clock for `timezone`, degrading to the fixed offset.
pub fn clock_for_timezone(timezone: &str) -> Arc<dyn Clock> {
    match timezone.parse::<Tz>() {
        Ok(tz) => Arc::new(ZonedClock(tz)),
        Err(e) => {
            warn!(timezone, error = %e, "unknown timezone, falling back to UTC+3");
            Arc::new(FixedOffsetClock(fallback_offset()))
        }
    }
}
