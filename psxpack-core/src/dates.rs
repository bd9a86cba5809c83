//! The two date formats of the volume: 17-byte "long" timestamps in the
//! PVD and 7-byte recording times in directory records.
//!
//! Catalog dates are kept in GMT; on-disc recording times are local per
//! their 15-minute-unit GMT offset byte, so ripping adds the offset and
//! building subtracts it. Some PSX masters carry broken years (a zero
//! year-since-1900 byte, or a "0000" PVD year); those are preserved
//! through a per-node Y2K flag rather than silently corrected.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::FormatError;

/// A 17-byte long-format timestamp: 16 ASCII digits `YYYYMMDDhhmmsscc`
/// plus a GMT offset in 15-minute units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongDate {
    pub digits: [u8; 16],
    pub gmt_offset: i8,
}

impl Default for LongDate {
    fn default() -> Self {
        Self {
            digits: [b'0'; 16],
            gmt_offset: 0,
        }
    }
}

impl LongDate {
    /// Parse the catalog form `YYYY-MM-DD hh:mm:ss.cc OFFSET`.
    pub fn parse(s: &str) -> Result<Self, FormatError> {
        let err = || FormatError::InvalidDate(s.to_string());

        let mut parts = s.split_whitespace();
        let date = parts.next().ok_or_else(err)?;
        let time = parts.next().ok_or_else(err)?;
        let offset = parts.next().ok_or_else(err)?;
        if parts.next().is_some() {
            return Err(err());
        }

        let date_fields: Vec<&str> = date.split('-').collect();
        let time_fields: Vec<&str> = time.split(&[':', '.'][..]).collect();
        let [year, month, day] = date_fields[..] else {
            return Err(err());
        };
        let [hour, minute, second, hundredths] = time_fields[..] else {
            return Err(err());
        };

        let widths = [4, 2, 2, 2, 2, 2, 2];
        let fields = [year, month, day, hour, minute, second, hundredths];
        let mut digits = [0u8; 16];
        let mut pos = 0;
        for (field, width) in fields.iter().zip(widths) {
            if field.len() != width || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(err());
            }
            digits[pos..pos + width].copy_from_slice(field.as_bytes());
            pos += width;
        }

        let gmt_offset: i8 = offset.parse().map_err(|_| err())?;
        Ok(Self { digits, gmt_offset })
    }

    /// Format in the catalog form.
    pub fn format(&self) -> String {
        let d = |range: std::ops::Range<usize>| std::str::from_utf8(&self.digits[range]).unwrap();
        format!(
            "{}-{}-{} {}:{}:{}.{} {}",
            d(0..4),
            d(4..6),
            d(6..8),
            d(8..10),
            d(10..12),
            d(12..14),
            d(14..16),
            self.gmt_offset
        )
    }

    /// Encode as the 17-byte on-disc field.
    pub fn to_bytes(self) -> [u8; 17] {
        let mut out = [0u8; 17];
        out[..16].copy_from_slice(&self.digits);
        out[16] = self.gmt_offset as u8;
        out
    }

    /// Decode the 17-byte on-disc field. Fields that are not ASCII digits
    /// (zero-filled descriptors) come back as the default date.
    pub fn from_bytes(bytes: &[u8; 17]) -> Self {
        let mut date = Self {
            digits: [b'0'; 16],
            gmt_offset: bytes[16] as i8,
        };
        if bytes[..16].iter().all(|b| b.is_ascii_digit()) {
            date.digits.copy_from_slice(&bytes[..16]);
        }
        date
    }

    /// Numeric year, as recorded (may be 0 on Y2K-damaged masters).
    pub fn year(&self) -> i32 {
        std::str::from_utf8(&self.digits[..4])
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    /// The 14-digit `YYYYMMDDhhmmss` prefix used for recording times.
    pub fn date14(&self) -> String {
        String::from_utf8_lossy(&self.digits[..14]).into_owned()
    }

    /// Normalize a damaged century in place: `00xx` becomes `19xx` or
    /// `20xx` depending on the two-digit year. Used by `--fix`.
    pub fn fix_century(&mut self) {
        if &self.digits[0..2] == b"00" {
            let century: &[u8; 2] = if self.digits[2] >= b'7' { b"19" } else { b"20" };
            self.digits[0..2].copy_from_slice(century);
        }
    }
}

/// Raw 7-byte recording time of a directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordTime {
    /// Years since 1900 as stored; anomalous masters carry 0..9 or 0x9C here.
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// GMT offset in 15-minute units.
    pub gmt_offset: i8,
}

impl RecordTime {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            year: bytes[0],
            month: bytes[1],
            day: bytes[2],
            hour: bytes[3],
            minute: bytes[4],
            second: bytes[5],
            gmt_offset: bytes[6] as i8,
        }
    }

    pub fn to_bytes(self) -> [u8; 7] {
        [
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.gmt_offset as u8,
        ]
    }
}

/// A recording time lifted into catalog form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDate {
    /// 14-digit `YYYYMMDDhhmmss`, in GMT.
    pub date: String,
    /// GMT offset in 15-minute units.
    pub timezone: i8,
    /// Set when the on-disc year carried the mastering anomaly and the
    /// caller asked for it to be preserved.
    pub y2k_bug: bool,
}

/// Convert an on-disc recording time into the catalog representation.
///
/// Years below 70 are the Y2K mastering anomaly: the century is restored
/// by adding 100 and, unless `fix` is set, the node is flagged so the
/// builder can reproduce the original byte. Years above 130 are garbage
/// (libcdio-era masters); `fallback` (the corrected PVD creation time)
/// substitutes for them wholesale.
pub fn normalize_record_time(
    time: &RecordTime,
    fallback: Option<&RecordTime>,
    fix: bool,
) -> NormalizedDate {
    let mut time = *time;
    let mut shift_to_gmt = true;

    if time.year < 70 {
        return NormalizedDate {
            date: format_date14(1900 + time.year as i32 + 100, &time),
            timezone: time.gmt_offset,
            y2k_bug: !fix,
        };
    }
    if time.year > 130 {
        if let Some(replacement) = fallback {
            time = *replacement;
        }
        shift_to_gmt = false;
    }

    let year = 1900 + time.year as i32;
    let local = NaiveDate::from_ymd_opt(year, time.month as u32, time.day as u32).and_then(|d| {
        d.and_hms_opt(time.hour as u32, time.minute as u32, time.second as u32)
    });

    let date = match local {
        Some(local) if shift_to_gmt => {
            let gmt = local + Duration::minutes(time.gmt_offset as i64 * 15);
            gmt.format("%Y%m%d%H%M%S").to_string()
        }
        _ => format_date14(year, &time),
    };

    NormalizedDate {
        date,
        timezone: time.gmt_offset,
        y2k_bug: false,
    }
}

fn format_date14(year: i32, time: &RecordTime) -> String {
    format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}",
        year, time.month, time.day, time.hour, time.minute, time.second
    )
}

/// Encode a 14-digit GMT catalog date as the on-disc 7-byte recording time.
///
/// The year field is years-since-1900; when `y2k_bug` is set, 100 is
/// subtracted to reproduce the anomalous byte the original master carried.
/// Years before 1900 (a verbatim "0000" volume date) always encode as the
/// anomalous `-100`.
pub fn encode_record_time(date: &str, timezone: i8, y2k_bug: bool) -> Result<[u8; 7], FormatError> {
    let parsed = parse_date14(date)?;
    let (year, month, day, hour, minute, second) = parsed;

    let local = if y2k_bug {
        // The anomaly was recorded without a GMT shift; reproduce it as-is.
        None
    } else {
        NaiveDate::from_ymd_opt(year, month as u32, day as u32)
            .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, second as u32))
            .map(|gmt| gmt - Duration::minutes(timezone as i64 * 15))
    };

    let (year, month, day, hour, minute, second) = match local {
        Some(t) => datetime_fields(&t),
        None => parsed,
    };

    let year_field: i32 = if year < 1900 {
        -100
    } else {
        year - 1900 - if y2k_bug { 100 } else { 0 }
    };

    Ok([
        year_field as u8,
        month,
        day,
        hour,
        minute,
        second,
        timezone as u8,
    ])
}

fn datetime_fields(t: &NaiveDateTime) -> (i32, u8, u8, u8, u8, u8) {
    use chrono::{Datelike, Timelike};
    (
        t.year(),
        t.month() as u8,
        t.day() as u8,
        t.hour() as u8,
        t.minute() as u8,
        t.second() as u8,
    )
}

fn parse_date14(date: &str) -> Result<(i32, u8, u8, u8, u8, u8), FormatError> {
    if date.len() != 14 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FormatError::InvalidDate(date.to_string()));
    }
    let field = |range: std::ops::Range<usize>| date[range].parse::<i32>().unwrap();
    Ok((
        field(0..4),
        field(4..6) as u8,
        field(6..8) as u8,
        field(8..10) as u8,
        field(10..12) as u8,
        field(12..14) as u8,
    ))
}

#[cfg(test)]
#[path = "tests/dates_tests.rs"]
mod tests;
