//! Catalog data model.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use psxpack_core::dates::LongDate;

use crate::error::CatalogError;
use crate::tree::{FsTree, NodeId};

/// Directory inside the extracted tree holding audio tracks, pregaps and
/// the saved raw postgap sector.
pub const EXTRA_DIR: &str = "_PSXRIP";

/// Saved raw last data-track sector, written when the postgap flavor
/// could not be classified.
pub const LAST_SECTOR_FILE: &str = "Last_sector.bin";

/// File name of an extracted audio track.
pub fn track_file_name(number: u8) -> String {
    format!("Track_{:02}.wav", number)
}

/// File name of an extracted audio-track pregap.
pub fn pregap_file_name(number: u8) -> String {
    format!("Pregap_{:02}.wav", number)
}

/// Volume-level metadata carried into the PVD.
#[derive(Debug, Clone, Default)]
pub struct VolumeInfo {
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
}

/// One row of the track listing: the original disc geometry the builder
/// needs to reproduce the mixed-mode layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEntry {
    pub number: u8,
    /// "MODE2/2352" or "AUDIO".
    pub mode: String,
    /// First LSN of the track including its pregap.
    pub start_lsn: u32,
    /// Pregap length in sectors.
    pub pregap: u32,
    /// LSN of INDEX 01.
    pub data_lsn: u32,
    /// One past the last LSN of the track.
    pub end_lsn: u32,
    pub total_sectors: u32,
}

impl TrackEntry {
    fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.number,
            self.mode,
            self.start_lsn,
            self.pregap,
            self.data_lsn,
            self.end_lsn,
            self.total_sectors
        )
    }

    fn from_csv(line: &str) -> Result<Self, CatalogError> {
        let fields: Vec<&str> = line.split(',').collect();
        let [number, mode, start, pregap, data, end, total] = fields[..] else {
            return Err(CatalogError::invalid_value(format!(
                "Invalid track listing row '{}'",
                line
            )));
        };
        let int = |s: &str| -> Result<u32, CatalogError> {
            s.parse().map_err(|_| {
                CatalogError::invalid_value(format!("Invalid track listing row '{}'", line))
            })
        };
        Ok(Self {
            number: int(number)? as u8,
            mode: mode.to_string(),
            start_lsn: int(start)?,
            pregap: int(pregap)?,
            data_lsn: int(data)?,
            end_lsn: int(end)?,
            total_sectors: int(total)?,
        })
    }

    pub fn is_audio(&self) -> bool {
        self.mode == "AUDIO"
    }
}

/// Encode a track listing as the base64 payload stored in the catalog.
pub fn encode_track_listing(tracks: &[TrackEntry]) -> String {
    let csv: Vec<String> = tracks.iter().map(TrackEntry::to_csv).collect();
    BASE64.encode(csv.join("\n"))
}

/// Decode the base64 track listing payload.
pub fn decode_track_listing(encoded: &str) -> Result<Vec<TrackEntry>, CatalogError> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| CatalogError::invalid_value(format!("Invalid track listing: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| CatalogError::invalid_value("Invalid track listing: not UTF-8"))?;
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(TrackEntry::from_csv)
        .collect()
}

/// Everything a rebuild needs: volume metadata, track geometry and the
/// filesystem tree.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Raw system-area dump to copy into sectors 0..16.
    pub system_area_file: Option<PathBuf>,
    pub volume: VolumeInfo,
    pub default_uid: u16,
    pub default_gid: u16,
    pub track_listing: Vec<TrackEntry>,
    /// Data-track length of the original disc, postgap included.
    pub track1_sector_count: u32,
    /// Postgap flavor 0..=3 (0 = unknown, replay the saved raw sector).
    pub track1_postgap_type: u8,
    /// Total sectors across all audio tracks.
    pub audio_sectors: u32,
    pub strict_rebuild: bool,
    pub tree: FsTree,
    pub root: NodeId,
}
