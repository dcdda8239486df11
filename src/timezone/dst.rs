//! Daylight-saving boundary search
//!
//! Scans a whole year of local wall-clock instants at half-hour resolution
//! and records where the zone's daylight flag flips. The scan walks month,
//! day, hour, and minute in order; invalid local instants (the spring-forward
//! gap skips an hour of wall-clock time) are passed over, and ambiguous
//! instants in the fall-back fold resolve to their first occurrence.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::{OffsetComponents, Tz};

/// Calendar rules for one zone, as seen by the boundary search
pub trait ZoneRules {
    /// Standard offset from UTC in minutes, east positive
    fn raw_offset_minutes(&self, year: i32) -> i32;

    /// Daylight saving displacement in minutes, zero when the zone never
    /// observes daylight time in the given year
    fn dst_savings_minutes(&self, year: i32) -> i32;

    /// Interpret a local wall-clock instant (month zero-based). `None` when
    /// the instant does not exist in this zone.
    fn resolve_local(
        &self,
        year: i32,
        month0: u32,
        day: u32,
        hour: u32,
        minute: u32,
    ) -> Option<DateTime<Utc>>;

    fn in_daylight_time(&self, instant: DateTime<Utc>) -> bool;
}

/// UTC calendar fields of a boundary instant: month (zero-based), day of
/// month, hour, minute
pub type Boundary = [u32; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DstBounds {
    /// First scanned instant inside daylight time
    pub start: Boundary,
    /// Last scanned instant inside daylight time
    pub end: Boundary,
}

fn utc_fields(instant: DateTime<Utc>) -> Boundary {
    [
        instant.month0(),
        instant.day(),
        instant.hour(),
        instant.minute(),
    ]
}

/// Locate the daylight window of `year` by brute force. Returns `None` when
/// the zone never flips within the year.
pub fn find_dst_bounds<Z: ZoneRules>(zone: &Z, year: i32) -> Option<DstBounds> {
    let mut start = None;
    let mut end = None;
    let mut prev: Option<(DateTime<Utc>, bool)> = None;

    for month0 in 0..12u32 {
        for day in 1..32u32 {
            for hour in 0..24u32 {
                for minute in [0u32, 30] {
                    let Some(instant) = zone.resolve_local(year, month0, day, hour, minute)
                    else {
                        continue;
                    };
                    let dst = zone.in_daylight_time(instant);
                    if let Some((prev_instant, prev_dst)) = prev {
                        if start.is_none() && dst && !prev_dst {
                            start = Some(utc_fields(instant));
                        }
                        if end.is_none() && !dst && prev_dst {
                            end = Some(utc_fields(prev_instant));
                        }
                        if let (Some(start), Some(end)) = (start, end) {
                            return Some(DstBounds { start, end });
                        }
                    }
                    prev = Some((instant, dst));
                }
            }
        }
    }
    None
}

impl ZoneRules for Tz {
    fn raw_offset_minutes(&self, year: i32) -> i32 {
        NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .map(|naive| {
                self.offset_from_utc_datetime(&naive)
                    .base_utc_offset()
                    .num_minutes() as i32
            })
            .unwrap_or(0)
    }

    fn dst_savings_minutes(&self, year: i32) -> i32 {
        // The displacement is whatever the zone applies at the height of its
        // daylight period; probe mid-month across the year to find it in
        // either hemisphere.
        (1..=12u32)
            .filter_map(|month| {
                let naive = NaiveDate::from_ymd_opt(year, month, 15)?.and_hms_opt(12, 0, 0)?;
                Some(
                    self.offset_from_utc_datetime(&naive)
                        .dst_offset()
                        .num_minutes() as i32,
                )
            })
            .max()
            .unwrap_or(0)
    }

    fn resolve_local(
        &self,
        year: i32,
        month0: u32,
        day: u32,
        hour: u32,
        minute: u32,
    ) -> Option<DateTime<Utc>> {
        let naive = NaiveDate::from_ymd_opt(year, month0 + 1, day)?
            .and_hms_opt(hour, minute, 0)?;
        self.from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn in_daylight_time(&self, instant: DateTime<Utc>) -> bool {
        !instant.with_timezone(self).offset().dst_offset().is_zero()
    }
}
