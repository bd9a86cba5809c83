//! CD-XA subheader and system-use area encoding.

/// Subheader submode flag bits.
pub mod submode {
    /// End of record
    pub const EOR: u8 = 0x01;
    /// Video sector
    pub const VIDEO: u8 = 0x02;
    /// Audio sector
    pub const AUDIO: u8 = 0x04;
    /// Data sector
    pub const DATA: u8 = 0x08;
    /// Trigger
    pub const TRIGGER: u8 = 0x10;
    /// Form 2 sector (2324 bytes of user data, no ECC)
    pub const FORM2: u8 = 0x20;
    /// Real-time sector
    pub const REAL_TIME: u8 = 0x40;
    /// End of file
    pub const EOF: u8 = 0x80;
}

/// High-byte flag bits of the CD-XA attribute word.
pub mod attr {
    pub const FORM1: u16 = 0x0800;
    pub const FORM2: u16 = 0x1000;
    pub const INTERLEAVED: u16 = 0x2000;
    pub const CDDA: u16 = 0x4000;
    pub const DIRECTORY: u16 = 0x8000;
}

/// Size of the CD-XA system-use area appended to each directory record.
pub const XA_SYSTEM_USE_SIZE: usize = 14;

const XA_SIGNATURE: [u8; 2] = *b"XA";

/// The four-byte CD-XA subheader, stored twice in every Mode 2 sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubHeader {
    pub file_number: u8,
    pub channel: u8,
    pub submode: u8,
    pub coding_info: u8,
}

impl SubHeader {
    /// Plain data-sector subheader carrying only submode flags.
    pub fn data(submode: u8) -> Self {
        Self {
            submode,
            ..Self::default()
        }
    }

    /// Take the subheader from the first 4 bytes of a 2336-byte XA chunk.
    pub fn from_chunk(chunk: &[u8]) -> Self {
        Self {
            file_number: chunk[0],
            channel: chunk[1],
            submode: chunk[2],
            coding_info: chunk[3],
        }
    }
}

/// Decoded CD-XA system-use area of a directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XaEntry {
    pub group_id: u16,
    pub user_id: u16,
    /// Attribute word: permission low byte plus the `attr` flag bits.
    pub attributes: u16,
    pub file_number: u8,
}

impl XaEntry {
    pub fn new(group_id: u16, user_id: u16, attributes: u16, file_number: u8) -> Self {
        Self {
            group_id,
            user_id,
            attributes,
            file_number,
        }
    }

    /// Encode as the 14-byte big-endian system-use area.
    pub fn to_bytes(self) -> [u8; XA_SYSTEM_USE_SIZE] {
        let mut out = [0u8; XA_SYSTEM_USE_SIZE];
        out[0..2].copy_from_slice(&self.group_id.to_be_bytes());
        out[2..4].copy_from_slice(&self.user_id.to_be_bytes());
        out[4..6].copy_from_slice(&self.attributes.to_be_bytes());
        out[6..8].copy_from_slice(&XA_SIGNATURE);
        out[8] = self.file_number;
        out
    }

    /// Decode a system-use area. Returns `None` when the area is too short
    /// or lacks the "XA" signature.
    pub fn from_bytes(su: &[u8]) -> Option<Self> {
        if su.len() < XA_SYSTEM_USE_SIZE || su[6..8] != XA_SIGNATURE {
            return None;
        }
        Some(Self {
            group_id: u16::from_be_bytes([su[0], su[1]]),
            user_id: u16::from_be_bytes([su[2], su[3]]),
            attributes: u16::from_be_bytes([su[4], su[5]]),
            file_number: su[8],
        })
    }
}
