//! Packed 32-bit FATX timestamps.
//!
//! Both platforms pack the same fields into the same bit positions; only the
//! year's reference epoch differs (2000 on the Original Xbox, 1980 on Xbox
//! 360), so one codec serves both by taking the epoch as a parameter instead
//! of being duplicated per platform.

use chrono::NaiveDate;
use fatx_core::TimestampEpoch;

/// The broken-down fields of a packed timestamp, before epoch application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTimestamp {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

/// Unpack a raw 32-bit timestamp field into its component parts, applying
/// `epoch` to the 7-bit year field.
pub fn unpack(value: u32, epoch: TimestampEpoch) -> RawTimestamp {
    let year_offset = (value & 0xFE00_0000) >> 25;
    let month = (value & 0x01E0_0000) >> 21;
    let day = (value & 0x001F_0000) >> 16;
    let hour = (value & 0x0000_F800) >> 11;
    let minute = (value & 0x0000_07E0) >> 5;
    let second = (value & 0x0000_001F) * 2;

    RawTimestamp {
        year: epoch.base_year() + year_offset as i32,
        month,
        day,
        hour,
        minute,
        second,
    }
}

/// `true` if the packed fields form a real calendar date whose year does not
/// exceed `max_year`.
///
/// Deliberately checks only the upper bound: the original tool this was
/// distilled from never rejected an implausibly early year, and callers
/// (orphan validation in particular) rely on that to still accept dates from
/// before a console's release.
pub fn is_plausible(value: u32, epoch: TimestampEpoch, max_year: i32) -> bool {
    let raw = unpack(value, epoch);
    if raw.year > max_year {
        return false;
    }
    if raw.hour > 23 || raw.minute > 59 || raw.second > 59 {
        return false;
    }
    NaiveDate::from_ymd_opt(raw.year, raw.month, raw.day).is_some()
}

/// Convert a packed timestamp to a calendar instant, or `None` if the fields
/// do not form a valid date or time.
pub fn to_naive_datetime(
    value: u32,
    epoch: TimestampEpoch,
) -> Option<chrono::NaiveDateTime> {
    let raw = unpack(value, epoch);
    let date = NaiveDate::from_ymd_opt(raw.year, raw.month, raw.day)?;
    let time = chrono::NaiveTime::from_hms_opt(raw.hour, raw.minute, raw.second)?;
    Some(date.and_time(time))
}
