//! Zone id resolution and offset abbreviation tables
//!
//! Abbreviations are keyed by the zone's raw (standard) offset from UTC in
//! minutes, east positive. Offsets without an entry render without an
//! abbreviation suffix.

use chrono_tz::Tz;
use phf::phf_map;

use crate::{Error, Result};

/// Standard-time abbreviation by raw offset in minutes
pub static STANDARD_ABBREVIATIONS: phf::Map<i32, &'static str> = phf_map! {
    -600i32 => "HAST",
    -540i32 => "AKST",
    -480i32 => "PST",
    -420i32 => "MST",
    -360i32 => "CST",
    -300i32 => "EST",
    0i32 => "UTC",
    60i32 => "CET",
    120i32 => "EET",
    180i32 => "EAT",
    330i32 => "IST",
    360i32 => "BST",
    480i32 => "CST",
    540i32 => "JST",
    570i32 => "ACST",
    660i32 => "SST",
    720i32 => "NZST",
    780i32 => "MIT",
};

/// Daylight-time abbreviation by raw offset in minutes
pub static DAYLIGHT_ABBREVIATIONS: phf::Map<i32, &'static str> = phf_map! {
    -600i32 => "HADT",
    -540i32 => "AKDT",
    -480i32 => "PDT",
    -420i32 => "MDT",
    -360i32 => "CDT",
    -300i32 => "EDT",
    0i32 => "UTC",
    60i32 => "CEST",
    120i32 => "EEST",
    180i32 => "EAT",
    330i32 => "IST",
    360i32 => "BST",
    480i32 => "CST",
    540i32 => "JST",
    570i32 => "ACDT",
    660i32 => "SST",
    720i32 => "NZDT",
    780i32 => "MIT",
};

/// Resolve an IANA zone id such as `America/New_York`
pub fn resolve(id: &str) -> Result<Tz> {
    id.parse().map_err(|_| Error::unknown_timezone(id))
}
