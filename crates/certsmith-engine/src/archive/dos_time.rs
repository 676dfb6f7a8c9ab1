//! MS-DOS packed date and time, as used in ZIP headers.

use chrono::{Datelike, NaiveDateTime, Timelike};

const MIN_YEAR: i32 = 1980;
const MAX_YEAR: i32 = 2107;

/// Packed DOS timestamp with two-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    /// Seconds/2 in bits 0-4, minutes in 5-10, hours in 11-15.
    pub time: u16,
    /// Day in bits 0-4, month in 5-8, years since 1980 in 9-15.
    pub date: u16,
}

impl DosDateTime {
    /// 1980-01-01 00:00:00.
    pub const MIN: Self = Self {
        time: 0,
        date: (1 << 5) | 1,
    };

    /// 2107-12-31 23:59:58.
    pub const MAX: Self = Self {
        time: (23 << 11) | (59 << 5) | 29,
        date: (127 << 9) | (12 << 5) | 31,
    };

    /// Pack `at`, clamping to the representable range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_datetime(at: &NaiveDateTime) -> Self {
        if at.year() < MIN_YEAR {
            return Self::MIN;
        }
        if at.year() > MAX_YEAR {
            return Self::MAX;
        }

        let time = (at.hour() << 11) | (at.minute() << 5) | (at.second() / 2);
        let date = (((at.year() - MIN_YEAR) as u32) << 9) | (at.month() << 5) | at.day();
        Self {
            time: time as u16,
            date: date as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn packs_fields() {
        let packed = DosDateTime::from_datetime(&at(2024, 3, 15, 13, 45, 31));
        assert_eq!(packed.time, (13 << 11) | (45 << 5) | 15);
        assert_eq!(packed.date, (44 << 9) | (3 << 5) | 15);
    }

    #[test]
    fn epoch_is_min() {
        assert_eq!(
            DosDateTime::from_datetime(&at(1980, 1, 1, 0, 0, 0)),
            DosDateTime::MIN
        );
    }

    #[test]
    fn clamps_out_of_range_years() {
        assert_eq!(
            DosDateTime::from_datetime(&at(1970, 6, 1, 12, 0, 0)),
            DosDateTime::MIN
        );
        assert_eq!(
            DosDateTime::from_datetime(&at(2200, 6, 1, 12, 0, 0)),
            DosDateTime::MAX
        );
    }

    #[test]
    fn last_representable_second() {
        assert_eq!(
            DosDateTime::from_datetime(&at(2107, 12, 31, 23, 59, 59)),
            DosDateTime::MAX
        );
    }
}
