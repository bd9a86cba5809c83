//! On-disc format layer shared by the `psxrip` and `psxbuild` tools.
//!
//! Covers the raw Mode 2 sector codec (sync/header/subheader/EDC/ECC),
//! ISO 9660 directory records with CD-XA system-use fields, path tables,
//! the volume descriptor set, and the two date formats used on disc.

pub mod chars;
pub mod dates;
pub mod dir_record;
pub mod error;
pub mod path_table;
pub mod sector;
pub mod volume;
pub mod xa;

pub use error::FormatError;

/// Logical block size of the ISO 9660 filesystem (user data per sector).
pub const BLOCK_SIZE: usize = 2048;

/// Size of a raw CD frame: sync + header + subheader + data + EDC/ECC.
pub const RAW_SECTOR_SIZE: usize = 2352;

/// Size of a Mode 2 sector without sync and header: subheader + 2328 bytes.
///
/// This is the unit Form 2 files are stored in on the host filesystem.
pub const M2RAW_SECTOR_SIZE: usize = 2336;

/// Form 2 user data per sector (excludes the trailing 4-byte EDC).
pub const M2F2_PAYLOAD_SIZE: usize = 2324;

/// Number of sectors in the track 1 postgap and in the lead-in pregap.
pub const PREGAP_SECTORS: u32 = 150;

/// Maximum number of sectors in an output image (74 minutes).
pub const MAX_ISO_SECTORS: u32 = 74 * 60 * 75;
