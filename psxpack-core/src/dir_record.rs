//! ISO 9660 directory record codec with the CD-XA system-use extension.

use crate::error::FormatError;
use crate::xa::{XaEntry, XA_SYSTEM_USE_SIZE};

/// File-flag bits of a directory record.
pub mod flags {
    /// Existence bit: entry is hidden from listings
    pub const HIDDEN: u8 = 0x01;
    pub const DIRECTORY: u8 = 0x02;
    pub const ASSOCIATED: u8 = 0x04;
    pub const RECORD: u8 = 0x08;
    pub const PROTECTION: u8 = 0x10;
}

/// Fixed part of a record before the file identifier.
const FIXED_SIZE: usize = 33;

/// Identifier of the "." entry.
pub const SELF_ID: &[u8] = &[0x00];
/// Identifier of the ".." entry.
pub const PARENT_ID: &[u8] = &[0x01];

/// Size in bytes of a record with the given identifier length and
/// system-use area length. Identifiers of even length get one pad byte;
/// the total is rounded up to an even size.
pub fn record_size(name_len: usize, su_len: usize) -> usize {
    let size = FIXED_SIZE + name_len + usize::from(name_len % 2 == 0) + su_len;
    size.div_ceil(2) * 2
}

/// One decoded (or to-be-encoded) directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirRecord {
    /// First LSN of the extent
    pub extent: u32,
    /// Data length in bytes as recorded
    pub size: u32,
    /// Raw 7-byte recording time
    pub time: [u8; 7],
    pub flags: u8,
    /// File identifier bytes; [`SELF_ID`]/[`PARENT_ID`] for "." and ".."
    pub name: Vec<u8>,
    /// CD-XA system-use area, when present
    pub xa: Option<XaEntry>,
}

impl DirRecord {
    /// Total encoded size of this record.
    pub fn encoded_size(&self) -> usize {
        let su = if self.xa.is_some() { XA_SYSTEM_USE_SIZE } else { 0 };
        record_size(self.name.len(), su)
    }

    /// Encode into `out`, which must hold at least `encoded_size()` bytes.
    /// Returns the number of bytes written.
    pub fn encode(&self, out: &mut [u8]) -> usize {
        let total = self.encoded_size();
        out[..total].fill(0);

        out[0] = total as u8;
        out[1] = 0; // extended attribute record length
        out[2..6].copy_from_slice(&self.extent.to_le_bytes());
        out[6..10].copy_from_slice(&self.extent.to_be_bytes());
        out[10..14].copy_from_slice(&self.size.to_le_bytes());
        out[14..18].copy_from_slice(&self.size.to_be_bytes());
        out[18..25].copy_from_slice(&self.time);
        out[25] = self.flags;
        // file unit size and interleave gap stay zero
        out[28..30].copy_from_slice(&1u16.to_le_bytes());
        out[30..32].copy_from_slice(&1u16.to_be_bytes());
        out[32] = self.name.len() as u8;
        out[33..33 + self.name.len()].copy_from_slice(&self.name);

        if let Some(xa) = self.xa {
            let su_start = total - XA_SYSTEM_USE_SIZE;
            out[su_start..total].copy_from_slice(&xa.to_bytes());
        }
        total
    }

    /// Decode the record starting at `buf[0]`. Returns `None` for a zero
    /// length byte (the terminator within a sector of records), otherwise
    /// the record and its encoded length.
    pub fn decode(buf: &[u8]) -> Result<Option<(DirRecord, usize)>, FormatError> {
        let len = buf[0] as usize;
        if len == 0 {
            return Ok(None);
        }
        if len < FIXED_SIZE + 1 || len > buf.len() {
            return Err(FormatError::invalid_record(format!(
                "record length {} out of range",
                len
            )));
        }

        let name_len = buf[32] as usize;
        if FIXED_SIZE + name_len > len {
            return Err(FormatError::invalid_record(format!(
                "identifier length {} exceeds record length {}",
                name_len, len
            )));
        }

        let name = buf[33..33 + name_len].to_vec();
        let su_start = 33 + name_len + usize::from(name_len % 2 == 0);
        let xa = if su_start + XA_SYSTEM_USE_SIZE <= len {
            XaEntry::from_bytes(&buf[su_start..len])
        } else {
            None
        };

        let rec = DirRecord {
            extent: u32::from_le_bytes([buf[2], buf[3], buf[4], buf[5]]),
            size: u32::from_le_bytes([buf[10], buf[11], buf[12], buf[13]]),
            time: buf[18..25].try_into().unwrap(),
            flags: buf[25],
            name,
            xa,
        };
        Ok(Some((rec, len)))
    }

    /// Identifier as a display string ("." and ".." for the special ids).
    pub fn name_string(&self) -> String {
        match self.name.as_slice() {
            [0x00] => ".".to_string(),
            [0x01] => "..".to_string(),
            other => String::from_utf8_lossy(other).into_owned(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.flags & flags::DIRECTORY != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xa::XaEntry;

    #[test]
    fn record_size_formula() {
        // "." and "..": 1-byte identifier, XA area
        assert_eq!(record_size(1, XA_SYSTEM_USE_SIZE), 48);
        // PVD-embedded root record: zero-length name, no XA
        assert_eq!(record_size(0, 0), 34);
        // even-length name gets a pad byte
        assert_eq!(record_size(8, XA_SYSTEM_USE_SIZE), 56);
        assert_eq!(record_size(9, XA_SYSTEM_USE_SIZE), 56);
    }

    #[test]
    fn encode_decode_round_trip() {
        let rec = DirRecord {
            extent: 25,
            size: 2000,
            time: [97, 1, 1, 0, 0, 0, 0],
            flags: 0,
            name: b"FOO;1".to_vec(),
            xa: Some(XaEntry::new(0, 0, 0x0D55, 0)),
        };
        let mut buf = [0u8; 256];
        let n = rec.encode(&mut buf);
        assert_eq!(n, rec.encoded_size());
        assert_eq!(n % 2, 0);

        let (decoded, len) = DirRecord::decode(&buf).unwrap().unwrap();
        assert_eq!(len, n);
        assert_eq!(decoded, rec);
    }

    #[test]
    fn both_endian_fields() {
        let rec = DirRecord {
            extent: 0x0102_0304,
            size: 0x0A0B_0C0D,
            time: [0; 7],
            flags: flags::DIRECTORY,
            name: SELF_ID.to_vec(),
            xa: None,
        };
        let mut buf = [0u8; 64];
        rec.encode(&mut buf);
        assert_eq!(&buf[2..6], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&buf[6..10], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&buf[10..14], &[0x0D, 0x0C, 0x0B, 0x0A]);
        assert_eq!(&buf[14..18], &[0x0A, 0x0B, 0x0C, 0x0D]);
        // volume sequence number 1, both orders
        assert_eq!(&buf[28..32], &[1, 0, 0, 1]);
    }

    #[test]
    fn terminator_decodes_to_none() {
        let buf = [0u8; 64];
        assert!(DirRecord::decode(&buf).unwrap().is_none());
    }

    #[test]
    fn special_names() {
        let dot = DirRecord {
            extent: 0,
            size: 0,
            time: [0; 7],
            flags: flags::DIRECTORY,
            name: SELF_ID.to_vec(),
            xa: None,
        };
        assert_eq!(dot.name_string(), ".");
    }
}
