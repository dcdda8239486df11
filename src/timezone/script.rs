//! Timezone emulation script generation
//!
//! Builds the JavaScript that rewrites `Date.prototype` so pages observe the
//! configured timezone instead of the host's. The script shifts every read
//! through a temporary date offset by the zone's raw offset, applies the
//! daylight displacement when the shifted instant falls inside the daylight
//! window, and renders offsets as `+HHMM (ABBR)` descriptors. Date string
//! formatting is always en-US.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Datelike, Utc};
use tracing::debug;

use crate::timezone::dst::{find_dst_bounds, DstBounds, ZoneRules};
use crate::timezone::zones::{self, DAYLIGHT_ABBREVIATIONS, STANDARD_ABBREVIATIONS};
use crate::{Error, Result};

/// Everything the generator needs to know about one zone in one year
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimezoneDescriptor {
    pub id: String,
    /// Standard offset from UTC in minutes, east positive
    pub raw_offset_minutes: i32,
    /// Daylight displacement in minutes, zero when never observed
    pub dst_savings_minutes: i32,
    /// UTC boundaries of the daylight window, absent without one
    pub bounds: Option<DstBounds>,
}

impl TimezoneDescriptor {
    pub fn resolve<Z: ZoneRules>(id: &str, zone: &Z, year: i32) -> Self {
        let raw_offset_minutes = zone.raw_offset_minutes(year);
        let dst_savings_minutes = zone.dst_savings_minutes(year);
        let bounds = if dst_savings_minutes == 0 {
            None
        } else {
            find_dst_bounds(zone, year)
        };
        Self {
            id: id.to_string(),
            raw_offset_minutes,
            dst_savings_minutes,
            bounds,
        }
    }
}

/// Render a `+HHMM (ABBR)` descriptor. `tz_minutes` is the JavaScript-style
/// offset (west positive, i.e. the negated raw offset). Offsets without a
/// known abbreviation render bare.
fn offset_descriptor(
    daylight: bool,
    raw_offset_minutes: i32,
    tz_minutes: i32,
    daylight_minutes: i32,
) -> String {
    let total = tz_minutes - if daylight { daylight_minutes } else { 0 };
    let sign = if total <= 0 { '+' } else { '-' };
    let hours = (total / 60).abs();
    let minutes = total.abs() - hours * 60;
    let desc = format!("{}{:02}{:02}", sign, hours, minutes);
    let table = if daylight {
        &DAYLIGHT_ABBREVIATIONS
    } else {
        &STANDARD_ABBREVIATIONS
    };
    match table.get(&raw_offset_minutes) {
        Some(abbreviation) => format!("{} ({})", desc, abbreviation),
        None => desc,
    }
}

/// Generate the full `Date.prototype` override script for one descriptor
pub fn generate_script(descriptor: &TimezoneDescriptor) -> String {
    let raw_ms = i64::from(descriptor.raw_offset_minutes) * 60_000;
    let savings_ms = i64::from(descriptor.dst_savings_minutes) * 60_000;
    let tz_minutes = -descriptor.raw_offset_minutes;
    let daylight_minutes = descriptor.dst_savings_minutes;

    let standard_desc = offset_descriptor(
        false,
        descriptor.raw_offset_minutes,
        tz_minutes,
        daylight_minutes,
    );
    let daylight_desc = offset_descriptor(
        true,
        descriptor.raw_offset_minutes,
        tz_minutes,
        daylight_minutes,
    );

    // Daylight detection over the shifted date's UTC fields. The start
    // comparison scores fields most-significant first (8/4/2/1) so any later
    // field only matters on a tie; the end comparison reverses the sense.
    let is_daylight = match &descriptor.bounds {
        None => "var isDaylightSavings = false;".to_string(),
        Some(DstBounds { start, end }) => {
            let mut s = String::new();
            s.push_str(&format!(
                "var start = tmpDate.getUTCMonth() > {m}? 8: (tmpDate.getUTCMonth() < {m}? -8 : 0);",
                m = start[0]
            ));
            s.push_str(&format!(
                "start += tmpDate.getUTCDate() > {d}? 4: (tmpDate.getUTCDate() < {d}? -4 : 0);",
                d = start[1]
            ));
            s.push_str(&format!(
                "start += tmpDate.getUTCHours() > {h}? 2: (tmpDate.getUTCHours() < {h}? -2 : 0);",
                h = start[2]
            ));
            s.push_str(&format!(
                "start += tmpDate.getUTCMinutes() > {mi}? 1: (tmpDate.getUTCMinutes() < {mi}? -1 : 0);",
                mi = start[3]
            ));
            s.push_str(&format!(
                "var end = tmpDate.getUTCMonth() < {m}? 8: (tmpDate.getUTCMonth() > {m}? -8 : 0);",
                m = end[0]
            ));
            s.push_str(&format!(
                "end += tmpDate.getUTCDate() < {d}? 4: (tmpDate.getUTCDate() > {d}? -4 : 0);",
                d = end[1]
            ));
            s.push_str(&format!(
                "end += tmpDate.getUTCHours() < {h}? 2: (tmpDate.getUTCHours() > {h}? -2 : 0);",
                h = end[2]
            ));
            s.push_str(&format!(
                "end += tmpDate.getUTCMinutes() < {mi}? 1: (tmpDate.getUTCMinutes() > {mi}? -1 : 0);",
                mi = end[3]
            ));
            s.push_str("var isDaylightSavings = start > 0 && end > 0;");
            s
        }
    };

    let desc_expr = format!(
        "var timeZoneDesc = '{}';if(isDaylightSavings){{timeZoneDesc = '{}';}}",
        standard_desc, daylight_desc
    );

    let tmp_date = format!(
        "var tmpDate = new Date(this.getTime() + {});{}if(isDaylightSavings){{  tmpDate = new Date(tmpDate.getTime() + {});}}",
        raw_ms, is_daylight, savings_ms
    );

    let weekday_and_month = "var weekday = ['Sun', 'Mon', 'Tue', 'Wed', 'Thu', 'Fri', 'Sat'];\
         var month = ['Jan', 'Feb', 'Mar', 'Apr', 'May', 'Jun', 'Jul', \
         'Aug', 'Sep', 'Oct', 'Nov', 'Dec'];";

    let time_12_hour = "var minutes = tmpDate.getUTCMinutes();\
         minutes = minutes < 10? '0'+minutes : minutes;\
         var seconds = tmpDate.getUTCSeconds();\
         seconds = seconds < 10? '0'+seconds : seconds;\
         var hours = tmpDate.getUTCHours();\
         var amPM = hours < 12? 'AM' : 'PM';\
         hours = hours % 12;\
         hours = hours == 0? 12 : hours;";

    let time_24_hour = "var minutes = tmpDate.getUTCMinutes();\
         minutes = minutes < 10? '0'+minutes : minutes;\
         var seconds = tmpDate.getUTCSeconds();\
         seconds = seconds < 10? '0'+seconds : seconds;\
         var hours = tmpDate.getUTCHours();\
         hours = hours < 10? '0' + hours : hours;";

    let mut script = String::new();

    script.push_str("Date.prototype.getTimezoneOffset = function(){");
    script.push_str(&tmp_date);
    script.push_str(&format!(
        "if(isDaylightSavings){{ return {} - {};}}return {};",
        tz_minutes, daylight_minutes, tz_minutes
    ));
    script.push_str("};");

    script.push_str("Date.prototype.getFullYear = function(){");
    script.push_str(&tmp_date);
    script.push_str("return tmpDate.getUTCFullYear();};");

    script.push_str("Date.prototype.getYear = function(){");
    script.push_str(&tmp_date);
    script.push_str("return tmpDate.getUTCFullYear() % 100;};");

    script.push_str("Date.prototype.getMonth = function(){");
    script.push_str(&tmp_date);
    script.push_str("return tmpDate.getUTCMonth();};");

    script.push_str("Date.prototype.getDate = function(){");
    script.push_str(&tmp_date);
    script.push_str("return tmpDate.getUTCDate();};");

    script.push_str("Date.prototype.getDay = function(){");
    script.push_str(&tmp_date);
    script.push_str("return tmpDate.getUTCDay();};");

    script.push_str("Date.prototype.getHours = function(){");
    script.push_str(&tmp_date);
    script.push_str("return tmpDate.getUTCHours();};");

    script.push_str("Date.prototype.getMinutes = function(){");
    script.push_str(&tmp_date);
    script.push_str("return tmpDate.getUTCMinutes();};");

    script.push_str("Date.prototype.toDateString = function(){");
    script.push_str(weekday_and_month);
    script.push_str(&tmp_date);
    script.push_str(
        "return weekday[tmpDate.getUTCDay()] + ' ' + month[tmpDate.getUTCMonth()] \
         + ' ' + tmpDate.getUTCDate() + ' ' + tmpDate.getUTCFullYear();};",
    );

    script.push_str("Date.prototype.toLocaleDateString = function(){");
    script.push_str(&tmp_date);
    script.push_str(
        "return (tmpDate.getUTCMonth() + 1) + '/' + tmpDate.getUTCDate() + '/' + tmpDate.getUTCFullYear();};",
    );

    script.push_str("Date.prototype.toLocaleString = function(){");
    script.push_str(&tmp_date);
    script.push_str(time_12_hour);
    script.push_str(
        "return (tmpDate.getUTCMonth() + 1) + '/' + tmpDate.getUTCDate() + '/' + tmpDate.getUTCFullYear() \
         + ', ' + hours + ':' + minutes + ':' + seconds + ' ' + amPM;};",
    );

    script.push_str("Date.prototype.toLocaleTimeString = function(){");
    script.push_str(&tmp_date);
    script.push_str(time_12_hour);
    script.push_str("return hours + ':' + minutes + ':' + seconds + ' ' + amPM;};");

    script.push_str("Date.prototype.toString = function(){");
    script.push_str(weekday_and_month);
    script.push_str(&tmp_date);
    script.push_str(time_24_hour);
    script.push_str(&desc_expr);
    script.push_str(
        "return weekday[tmpDate.getUTCDay()] + ' ' + month[tmpDate.getUTCMonth()] + ' ' + tmpDate.getUTCDate() \
         + ' ' + tmpDate.getUTCFullYear() + ' ' + hours + ':' + minutes + ':' + seconds + ' GMT'+timeZoneDesc;};",
    );

    script.push_str("Date.prototype.toTimeString = function(){");
    script.push_str(&tmp_date);
    script.push_str(time_24_hour);
    script.push_str(&desc_expr);
    script.push_str("return hours + ':' + minutes + ':' + seconds + ' GMT'+timeZoneDesc;};");

    script
}

/// Memoizing script source. Generation runs the year-long boundary scan, so
/// each zone id is generated once and shared.
pub struct TimezoneScripts {
    cache: Mutex<HashMap<String, Arc<str>>>,
}

impl TimezoneScripts {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The emulation script for an IANA zone id, generated for the current
    /// year on first use
    pub fn script_for(&self, id: &str) -> Result<Arc<str>> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
        if let Some(script) = cache.get(id) {
            return Ok(script.clone());
        }

        let zone = zones::resolve(id)?;
        let year = Utc::now().year();
        let descriptor = TimezoneDescriptor::resolve(id, &zone, year);
        debug!(
            zone = %id,
            raw_offset_minutes = descriptor.raw_offset_minutes,
            dst_savings_minutes = descriptor.dst_savings_minutes,
            has_dst_bounds = descriptor.bounds.is_some(),
            "generated timezone script"
        );
        let script: Arc<str> = Arc::from(generate_script(&descriptor));
        cache.insert(id.to_string(), script.clone());
        Ok(script)
    }
}

impl Default for TimezoneScripts {
    fn default() -> Self {
        Self::new()
    }
}
