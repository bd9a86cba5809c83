//! Disc image access: TOC construction and sector reads by absolute LSN.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use psxpack_core::{BLOCK_SIZE, M2RAW_SECTOR_SIZE, RAW_SECTOR_SIZE};

use crate::cue::{self, CueSheet, TrackMode};
use crate::error::ImageError;

/// One entry of the disc TOC, in absolute sector addressing.
#[derive(Debug, Clone, Copy)]
pub struct Track {
    pub number: u8,
    pub mode: TrackMode,
    /// First LSN of the track, pregap included.
    pub start_lsn: u32,
    /// Pregap length in sectors.
    pub pregap: u32,
    /// LSN of INDEX 01, where the track data begins.
    pub data_lsn: u32,
    /// One past the last LSN of the track.
    pub end_lsn: u32,
}

impl Track {
    pub fn total_sectors(&self) -> u32 {
        self.end_lsn - self.start_lsn
    }
}

struct BinFile {
    file: File,
    /// Absolute LSN of this file's first sector.
    base_lsn: u32,
    sectors: u32,
}

/// An opened disc image: one or more bin files described by a cue sheet
/// (or a bare bin treated as a single data track).
pub struct DiscImage {
    files: Vec<BinFile>,
    tracks: Vec<Track>,
    total_sectors: u32,
}

impl DiscImage {
    /// Open a disc image. A `.cue` path loads the sheet and its bin
    /// files; anything else is treated as a single-track raw bin.
    pub fn open(path: &Path) -> Result<Self, ImageError> {
        let is_cue = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("cue"));
        if is_cue {
            let content = std::fs::read_to_string(path)?;
            let sheet = cue::parse_cue(&content)?;
            Self::from_cue(&sheet, path.parent().unwrap_or(Path::new(".")))
        } else {
            Self::from_bare_bin(path)
        }
    }

    fn from_bare_bin(path: &Path) -> Result<Self, ImageError> {
        let file = open_bin(path)?;
        let sectors = file_sectors(&file, path)?;
        let tracks = vec![Track {
            number: 1,
            mode: TrackMode::Mode2Raw,
            start_lsn: 0,
            pregap: 0,
            data_lsn: 0,
            end_lsn: sectors,
        }];
        Ok(Self {
            files: vec![BinFile {
                file,
                base_lsn: 0,
                sectors,
            }],
            tracks,
            total_sectors: sectors,
        })
    }

    fn from_cue(sheet: &CueSheet, cue_dir: &Path) -> Result<Self, ImageError> {
        let mut files = Vec::with_capacity(sheet.files.len());
        let mut base_lsn = 0u32;
        for name in &sheet.files {
            let path = resolve_bin_path(cue_dir, name);
            let file = open_bin(&path)?;
            let sectors = file_sectors(&file, &path)?;
            files.push(BinFile {
                file,
                base_lsn,
                sectors,
            });
            base_lsn += sectors;
        }
        let total_sectors = base_lsn;

        let mut tracks = Vec::with_capacity(sheet.tracks.len());
        for (i, t) in sheet.tracks.iter().enumerate() {
            let base = files[t.file_index].base_lsn;
            let index1 = t.index1.ok_or_else(|| {
                ImageError::cue_syntax(format!("Track {:02} has no INDEX 01", t.number))
            })?;
            let track_start = t.index0.unwrap_or(index1);

            // The track runs until the next track in the same file, or to
            // the end of the file.
            let end = sheet.tracks[i + 1..]
                .iter()
                .find(|n| n.file_index == t.file_index)
                .map(|n| base + n.index0.unwrap_or_else(|| n.index1.unwrap_or(0)))
                .unwrap_or(base + files[t.file_index].sectors);

            tracks.push(Track {
                number: t.number,
                mode: t.mode,
                start_lsn: base + track_start,
                pregap: index1 - track_start,
                data_lsn: base + index1,
                end_lsn: end,
            });
        }

        Ok(Self {
            files,
            tracks,
            total_sectors,
        })
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn total_sectors(&self) -> u32 {
        self.total_sectors
    }

    /// Read a raw 2352-byte frame.
    pub fn read_raw(&mut self, lsn: u32, out: &mut [u8; RAW_SECTOR_SIZE]) -> Result<(), ImageError> {
        let bin = self
            .files
            .iter_mut()
            .find(|f| lsn >= f.base_lsn && lsn < f.base_lsn + f.sectors)
            .ok_or_else(|| ImageError::sector_read(lsn, "sector is beyond end of image"))?;

        let offset = (lsn - bin.base_lsn) as u64 * RAW_SECTOR_SIZE as u64;
        bin.file.seek(SeekFrom::Start(offset))?;
        bin.file
            .read_exact(out)
            .map_err(|e| ImageError::sector_read(lsn, e.to_string()))
    }

    /// Read the 2048 bytes of Form 1 user data of a sector.
    pub fn read_block(&mut self, lsn: u32) -> Result<[u8; BLOCK_SIZE], ImageError> {
        let mut raw = [0u8; RAW_SECTOR_SIZE];
        self.read_raw(lsn, &mut raw)?;
        Ok(raw[24..24 + BLOCK_SIZE].try_into().unwrap())
    }

    /// Read the 2336-byte Mode 2 payload (subheader onward) of a sector.
    pub fn read_m2raw(&mut self, lsn: u32) -> Result<[u8; M2RAW_SECTOR_SIZE], ImageError> {
        let mut raw = [0u8; RAW_SECTOR_SIZE];
        self.read_raw(lsn, &mut raw)?;
        Ok(raw[16..16 + M2RAW_SECTOR_SIZE].try_into().unwrap())
    }
}

/// Resolve a bin reference from a cue sheet. Dumps renamed after the fact
/// often carry stale paths; fall back to the bare file name next to the
/// cue sheet.
fn resolve_bin_path(cue_dir: &Path, name: &str) -> PathBuf {
    let direct = cue_dir.join(name);
    if direct.exists() {
        return direct;
    }
    // Strip any recorded directory part, whichever separator it uses.
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let fallback = cue_dir.join(file_name);
    if fallback.exists() {
        log::warn!(
            "Incorrect path in cue sheet: '{}' not found, using '{}'",
            name,
            fallback.display()
        );
        return fallback;
    }
    direct
}

fn open_bin(path: &Path) -> Result<File, ImageError> {
    File::open(path).map_err(|source| ImageError::BinOpen {
        path: path.to_path_buf(),
        source,
    })
}

fn file_sectors(file: &File, path: &Path) -> Result<u32, ImageError> {
    let len = file.metadata()?.len();
    if len % RAW_SECTOR_SIZE as u64 != 0 {
        log::warn!(
            "Image file {} is not a whole number of 2352-byte sectors",
            path.display()
        );
    }
    Ok((len / RAW_SECTOR_SIZE as u64) as u32)
}

#[cfg(test)]
#[path = "tests/reader_tests.rs"]
mod tests;
