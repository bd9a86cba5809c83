//! Primary volume descriptor and volume descriptor set terminator.
//!
//! PSX mastering places the descriptor set at a fixed position: PVD at
//! LSN 19, terminator at 20, the four path table copies at 21..=24 and
//! the root directory extent at 25.

use crate::chars::{copy_padded, read_padded};
use crate::dates::LongDate;
use crate::dir_record::DirRecord;
use crate::error::FormatError;
use crate::BLOCK_SIZE;

/// LSN of the primary volume descriptor.
pub const PVD_SECTOR: u32 = 19;
/// LSN of the volume descriptor set terminator.
pub const EVD_SECTOR: u32 = 20;
/// LSN of the first path table (L); copies follow at +1, +2, +3.
pub const PATH_TABLE_SECTOR: u32 = 21;
/// Number of sectors per path table copy.
pub const PATH_TABLE_SECTORS: u32 = 1;
/// LSN of the root directory extent.
pub const ROOT_DIR_SECTOR: u32 = PATH_TABLE_SECTOR + PATH_TABLE_SECTORS * 4;

const STANDARD_ID: &[u8; 5] = b"CD001";

/// The descriptive fields of the primary volume descriptor.
#[derive(Debug, Clone, Default)]
pub struct VolumeDescriptor {
    pub system_id: String,
    pub volume_id: String,
    pub volume_set_id: String,
    pub publisher_id: String,
    pub preparer_id: String,
    pub application_id: String,
    pub copyright_file_id: String,
    pub abstract_file_id: String,
    pub bibliographic_file_id: String,
    pub creation_date: LongDate,
    pub modification_date: LongDate,
    pub expiration_date: LongDate,
    pub effective_date: LongDate,
    /// Total sectors of the volume including postgap and audio tracks.
    pub volume_space_size: u32,
    /// Byte length of one path table.
    pub path_table_size: u32,
}

impl VolumeDescriptor {
    /// Encode the 2048-byte PVD payload. `root_record` is the embedded
    /// 34-byte record pointing at the root directory extent.
    pub fn encode_pvd(&self, root_record: &DirRecord) -> [u8; BLOCK_SIZE] {
        let mut out = [0u8; BLOCK_SIZE];
        out[0] = 1; // volume descriptor type: primary
        out[1..6].copy_from_slice(STANDARD_ID);
        out[6] = 1; // version

        copy_padded(&mut out[8..40], &self.system_id);
        copy_padded(&mut out[40..72], &self.volume_id);

        out[80..84].copy_from_slice(&self.volume_space_size.to_le_bytes());
        out[84..88].copy_from_slice(&self.volume_space_size.to_be_bytes());

        // volume set size and sequence number, both-endian 1
        out[120..122].copy_from_slice(&1u16.to_le_bytes());
        out[122..124].copy_from_slice(&1u16.to_be_bytes());
        out[124..126].copy_from_slice(&1u16.to_le_bytes());
        out[126..128].copy_from_slice(&1u16.to_be_bytes());

        out[128..130].copy_from_slice(&(BLOCK_SIZE as u16).to_le_bytes());
        out[130..132].copy_from_slice(&(BLOCK_SIZE as u16).to_be_bytes());

        out[132..136].copy_from_slice(&self.path_table_size.to_le_bytes());
        out[136..140].copy_from_slice(&self.path_table_size.to_be_bytes());

        out[140..144].copy_from_slice(&PATH_TABLE_SECTOR.to_le_bytes());
        out[144..148].copy_from_slice(&(PATH_TABLE_SECTOR + PATH_TABLE_SECTORS).to_le_bytes());
        out[148..152].copy_from_slice(&(PATH_TABLE_SECTOR + PATH_TABLE_SECTORS * 2).to_be_bytes());
        out[152..156].copy_from_slice(&(PATH_TABLE_SECTOR + PATH_TABLE_SECTORS * 3).to_be_bytes());

        root_record.encode(&mut out[156..190]);

        copy_padded(&mut out[190..318], &self.volume_set_id);
        copy_padded(&mut out[318..446], &self.publisher_id);
        copy_padded(&mut out[446..574], &self.preparer_id);
        copy_padded(&mut out[574..702], &self.application_id);
        copy_padded(&mut out[702..739], &self.copyright_file_id);
        copy_padded(&mut out[739..776], &self.abstract_file_id);
        copy_padded(&mut out[776..813], &self.bibliographic_file_id);

        out[813..830].copy_from_slice(&self.creation_date.to_bytes());
        out[830..847].copy_from_slice(&self.modification_date.to_bytes());
        out[847..864].copy_from_slice(&self.expiration_date.to_bytes());
        out[864..881].copy_from_slice(&self.effective_date.to_bytes());

        out[881] = 1; // file structure version
        out
    }

    /// Parse a PVD payload, returning the fields and the embedded root
    /// directory record.
    pub fn parse_pvd(sector: &[u8]) -> Result<(Self, DirRecord), FormatError> {
        if sector.len() < BLOCK_SIZE {
            return Err(FormatError::other("volume descriptor sector too short"));
        }
        if sector[0] != 1 || &sector[1..6] != STANDARD_ID {
            return Err(FormatError::other(
                "no primary volume descriptor signature found",
            ));
        }

        let root_record = DirRecord::decode(&sector[156..190])?
            .ok_or_else(|| FormatError::invalid_record("empty root directory record in PVD"))?
            .0;

        let date = |offset: usize| {
            let bytes: [u8; 17] = sector[offset..offset + 17].try_into().unwrap();
            LongDate::from_bytes(&bytes)
        };

        let desc = Self {
            system_id: read_padded(&sector[8..40]),
            volume_id: read_padded(&sector[40..72]),
            volume_set_id: read_padded(&sector[190..318]),
            publisher_id: read_padded(&sector[318..446]),
            preparer_id: read_padded(&sector[446..574]),
            application_id: read_padded(&sector[574..702]),
            copyright_file_id: read_padded(&sector[702..739]),
            abstract_file_id: read_padded(&sector[739..776]),
            bibliographic_file_id: read_padded(&sector[776..813]),
            creation_date: date(813),
            modification_date: date(830),
            expiration_date: date(847),
            effective_date: date(864),
            volume_space_size: u32::from_le_bytes(sector[80..84].try_into().unwrap()),
            path_table_size: u32::from_le_bytes(sector[132..136].try_into().unwrap()),
        };
        Ok((desc, root_record))
    }
}

/// Encode the volume descriptor set terminator payload.
pub fn encode_evd() -> [u8; BLOCK_SIZE] {
    let mut out = [0u8; BLOCK_SIZE];
    out[0] = 255;
    out[1..6].copy_from_slice(STANDARD_ID);
    out[6] = 1;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir_record::flags;

    fn root_record() -> DirRecord {
        DirRecord {
            extent: ROOT_DIR_SECTOR,
            size: 2048,
            time: [97, 1, 1, 0, 0, 0, 0],
            flags: flags::DIRECTORY,
            name: vec![0x00],
            xa: None,
        }
    }

    fn sample() -> VolumeDescriptor {
        VolumeDescriptor {
            system_id: "PLAYSTATION".to_string(),
            volume_id: "TEST_VOLUME".to_string(),
            publisher_id: "ACME".to_string(),
            volume_space_size: 176,
            path_table_size: 10,
            creation_date: LongDate::parse("1997-01-01 00:00:00.00 0").unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn fixed_layout_constants() {
        assert_eq!(PVD_SECTOR, 19);
        assert_eq!(EVD_SECTOR, 20);
        assert_eq!(ROOT_DIR_SECTOR, 25);
    }

    #[test]
    fn pvd_round_trip() {
        let desc = sample();
        let sector = desc.encode_pvd(&root_record());

        assert_eq!(sector[0], 1);
        assert_eq!(&sector[1..6], b"CD001");
        // path table locations: 21, 22 (LE), 23, 24 (BE)
        assert_eq!(u32::from_le_bytes(sector[140..144].try_into().unwrap()), 21);
        assert_eq!(u32::from_le_bytes(sector[144..148].try_into().unwrap()), 22);
        assert_eq!(u32::from_be_bytes(sector[148..152].try_into().unwrap()), 23);
        assert_eq!(u32::from_be_bytes(sector[152..156].try_into().unwrap()), 24);

        let (parsed, root) = VolumeDescriptor::parse_pvd(&sector).unwrap();
        assert_eq!(parsed.system_id, "PLAYSTATION");
        assert_eq!(parsed.volume_id, "TEST_VOLUME");
        assert_eq!(parsed.publisher_id, "ACME");
        assert_eq!(parsed.volume_space_size, 176);
        assert_eq!(parsed.path_table_size, 10);
        assert_eq!(parsed.creation_date.format(), "1997-01-01 00:00:00.00 0");
        assert_eq!(root.extent, 25);
        assert_eq!(root.size, 2048);
        assert!(root.is_directory());
    }

    #[test]
    fn zero_year_date_survives() {
        let mut desc = sample();
        desc.creation_date = LongDate::parse("0000-10-25 14:30:00.00 0").unwrap();
        let sector = desc.encode_pvd(&root_record());
        assert_eq!(&sector[813..817], b"0000");

        let (parsed, _) = VolumeDescriptor::parse_pvd(&sector).unwrap();
        assert_eq!(parsed.creation_date.year(), 0);
        assert_eq!(&parsed.creation_date.digits[4..8], b"1025");
    }

    #[test]
    fn evd_shape() {
        let sector = encode_evd();
        assert_eq!(sector[0], 255);
        assert_eq!(&sector[1..6], b"CD001");
        assert_eq!(sector[6], 1);
        assert!(sector[7..].iter().all(|&b| b == 0));
    }

    #[test]
    fn parse_rejects_garbage() {
        let sector = [0u8; BLOCK_SIZE];
        assert!(VolumeDescriptor::parse_pvd(&sector).is_err());
    }
}
