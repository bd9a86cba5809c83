//! Raw-sector stream writer: system area, volume descriptors, path
//! tables, directory and file data, postgap, audio tracks and the cue
//! sheet.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use psxpack_catalog::model::{pregap_file_name, track_file_name, EXTRA_DIR, LAST_SECTOR_FILE};
use psxpack_catalog::{FileForm, FsTree, NodeId, NodeKind, TrackEntry};
use psxpack_core::sector::{encode_mode2, strip_form2_edc, Msf};
use psxpack_core::volume::{EVD_SECTOR, PATH_TABLE_SECTOR, PATH_TABLE_SECTORS, PVD_SECTOR};
use psxpack_core::xa::{submode, SubHeader};
use psxpack_core::{BLOCK_SIZE, M2RAW_SECTOR_SIZE, PREGAP_SECTORS, RAW_SECTOR_SIZE};

use crate::error::BuildError;

/// Number of raw sectors reserved for the system area.
pub const SYSTEM_AREA_SECTORS: usize = 16;

/// Sequential raw-sector writer with a running sector counter.
pub struct SectorStream<W: Write> {
    out: W,
    current: u32,
}

impl<W: Write> SectorStream<W> {
    pub fn new(out: W) -> Self {
        Self { out, current: 0 }
    }

    pub fn current_sector(&self) -> u32 {
        self.current
    }

    /// Write a pre-formed raw sector verbatim.
    pub fn write_raw(&mut self, sector: &[u8; RAW_SECTOR_SIZE]) -> io::Result<()> {
        self.out.write_all(sector)?;
        self.current += 1;
        Ok(())
    }

    /// Synthesize and write one Mode 2 sector at the current position.
    /// `zero_edc` strips the EDC of Form 2 sectors after synthesis.
    pub fn write_mode2(
        &mut self,
        payload: &[u8],
        sub: SubHeader,
        zero_edc: bool,
    ) -> io::Result<()> {
        let mut sector = [0u8; RAW_SECTOR_SIZE];
        encode_mode2(&mut sector, payload, self.current, sub);
        if zero_edc {
            strip_form2_edc(&mut sector);
        }
        self.out.write_all(&sector)?;
        self.current += 1;
        Ok(())
    }

    /// Fill with empty Form 2 sectors until the given sector is reached.
    pub fn write_gap(&mut self, until: u32) -> io::Result<()> {
        while self.current < until {
            self.write_mode2(&[], SubHeader::data(submode::FORM2), false)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn copy_raw_bytes<R: Read>(&mut self, reader: &mut R) -> io::Result<u64> {
        // Audio payloads stream through a small bounce buffer; the sector
        // counter advances by whole sectors at the end.
        let mut chunk = [0u8; 4096];
        let mut total = 0u64;
        loop {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            self.out.write_all(&chunk[..n])?;
            total += n as u64;
        }
        self.current += (total / RAW_SECTOR_SIZE as u64) as u32;
        Ok(total)
    }
}

/// Write the 16-sector system area: raw bytes from the catalog's system
/// area file (zero-padded), or zero sectors when none is given.
pub fn write_system_area<W: Write>(
    stream: &mut SectorStream<W>,
    system_area_file: Option<&Path>,
) -> Result<(), BuildError> {
    let mut data = vec![0u8; SYSTEM_AREA_SECTORS * RAW_SECTOR_SIZE];
    if let Some(path) = system_area_file {
        let mut file =
            File::open(path).map_err(|source| BuildError::host_file(path, source))?;
        read_up_to(&mut file, &mut data)?;
    }
    for sector in 0..SYSTEM_AREA_SECTORS {
        let raw: &[u8; RAW_SECTOR_SIZE] = data
            [sector * RAW_SECTOR_SIZE..(sector + 1) * RAW_SECTOR_SIZE]
            .try_into()
            .unwrap();
        stream.write_raw(raw)?;
    }
    Ok(())
}

/// Write the volume descriptor set and the four path table copies.
pub fn write_descriptors<W: Write>(
    stream: &mut SectorStream<W>,
    pvd: &[u8; BLOCK_SIZE],
    l_table: &[u8],
    m_table: &[u8],
) -> Result<(), BuildError> {
    // Sectors between the system area and the PVD stay blank.
    while stream.current_sector() < PVD_SECTOR {
        stream.write_raw(&[0u8; RAW_SECTOR_SIZE])?;
    }

    stream.write_mode2(pvd, SubHeader::data(submode::DATA | submode::EOR), false)?;

    debug_assert_eq!(stream.current_sector(), EVD_SECTOR);
    let evd = psxpack_core::volume::encode_evd();
    stream.write_mode2(
        &evd,
        SubHeader::data(submode::DATA | submode::EOF | submode::EOR),
        false,
    )?;

    debug_assert_eq!(stream.current_sector(), PATH_TABLE_SECTOR);
    let table_submode = SubHeader::data(submode::DATA | submode::EOF | submode::EOR);
    for table in [l_table, l_table, m_table, m_table] {
        stream.write_mode2(table, table_submode, false)?;
    }
    debug_assert_eq!(
        stream.current_sector(),
        PATH_TABLE_SECTOR + PATH_TABLE_SECTORS * 4
    );
    Ok(())
}

/// Write directory extents and file bodies in allocation order, filling
/// gaps with empty Form 2 sectors.
pub fn write_data<W: Write>(
    stream: &mut SectorStream<W>,
    tree: &FsTree,
    write_order: &[NodeId],
) -> Result<(), BuildError> {
    for &id in write_order {
        let node = tree.node(id);
        match &node.kind {
            NodeKind::Directory(meta) => {
                stream.write_gap(node.first_sector)?;
                for sector in 0..node.num_sectors as usize {
                    let sub = last_sector_submode(sector as u32, node.num_sectors);
                    stream.write_mode2(
                        &meta.extent[sector * BLOCK_SIZE..(sector + 1) * BLOCK_SIZE],
                        sub,
                        false,
                    )?;
                }
            }
            NodeKind::File(meta) => match meta.form {
                FileForm::Cdda => {} // lives in an audio track
                FileForm::Form1 => {
                    stream.write_gap(node.first_sector)?;
                    write_form1_file(stream, node)?;
                }
                FileForm::Form2 => {
                    stream.write_gap(node.first_sector)?;
                    write_form2_file(stream, node, meta.zero_edc)?;
                }
            },
        }
    }
    Ok(())
}

fn last_sector_submode(sector: u32, num_sectors: u32) -> SubHeader {
    if sector == num_sectors.saturating_sub(1) {
        SubHeader::data(submode::DATA | submode::EOF | submode::EOR)
    } else {
        SubHeader::data(submode::DATA)
    }
}

fn write_form1_file<W: Write>(
    stream: &mut SectorStream<W>,
    node: &psxpack_catalog::FsNode,
) -> Result<(), BuildError> {
    let mut file =
        File::open(&node.path).map_err(|source| BuildError::host_file(&node.path, source))?;
    log::info!("Writing \"{}\"...", node.path.display());

    let mut chunk = [0u8; BLOCK_SIZE];
    for sector in 0..node.num_sectors {
        chunk.fill(0);
        read_up_to(&mut file, &mut chunk)?;
        let sub = last_sector_submode(sector, node.num_sectors);
        stream.write_mode2(&chunk, sub, false)?;
    }
    Ok(())
}

fn write_form2_file<W: Write>(
    stream: &mut SectorStream<W>,
    node: &psxpack_catalog::FsNode,
    zero_edc: bool,
) -> Result<(), BuildError> {
    let mut file =
        File::open(&node.path).map_err(|source| BuildError::host_file(&node.path, source))?;
    log::info!("Writing \"{}\"...", node.path.display());

    // Each 2336-byte chunk carries its own subheader in the first 8
    // bytes; the submode decides Form 1 or Form 2 synthesis per sector,
    // which is how interleaved XA streams keep their mixed sector types.
    let mut chunk = [0u8; M2RAW_SECTOR_SIZE];
    for _ in 0..node.num_sectors {
        chunk.fill(0);
        read_up_to(&mut file, &mut chunk)?;
        let sub = SubHeader::from_chunk(&chunk);
        stream.write_mode2(&chunk[8..], sub, zero_edc)?;
    }
    Ok(())
}

/// Write the 150-sector postgap of the data track.
pub fn write_postgap<W: Write>(
    stream: &mut SectorStream<W>,
    postgap_type: u8,
    fs_base: &Path,
) -> Result<(), BuildError> {
    // Flavor 0 replays the raw last sector saved by the ripper, if any.
    let saved_sector: Option<[u8; RAW_SECTOR_SIZE]> = if postgap_type == 0 {
        let path = fs_base.join(EXTRA_DIR).join(LAST_SECTOR_FILE);
        match std::fs::read(&path) {
            Ok(bytes) if bytes.len() == RAW_SECTOR_SIZE => Some(bytes.try_into().unwrap()),
            _ => None,
        }
    } else {
        None
    };

    for _ in 0..PREGAP_SECTORS {
        match (postgap_type, &saved_sector) {
            (0, Some(saved)) => {
                let mut sector = *saved;
                // Keep the blob but restamp the address so MSF stays
                // monotonic across the gap.
                sector[12..15].copy_from_slice(&Msf::from_lsn(stream.current_sector()).to_bcd());
                strip_form2_edc(&mut sector);
                stream.write_raw(&sector)?;
            }
            (2, _) => stream.write_mode2(&[], SubHeader::data(submode::FORM2), true)?,
            (3, _) => stream.write_mode2(&[], SubHeader::data(submode::FORM2), false)?,
            // Type 1 and unclassified gaps without a saved sector: fully
            // blank sectors (submode 0 leaves EDC and parity at zero).
            _ => stream.write_mode2(&[], SubHeader::data(0), false)?,
        }
    }
    Ok(())
}

/// Append the audio tracks (and their pregap files, when present) after
/// the data track.
pub fn append_audio_tracks<W: Write>(
    stream: &mut SectorStream<W>,
    tracks: &[TrackEntry],
    fs_base: &Path,
) -> Result<(), BuildError> {
    let extra_dir = fs_base.join(EXTRA_DIR);
    for track in tracks.iter().filter(|t| t.is_audio()) {
        let pregap_path = extra_dir.join(pregap_file_name(track.number));
        if pregap_path.exists() {
            copy_wav_payload(stream, &pregap_path)?;
        }

        let track_path = extra_dir.join(track_file_name(track.number));
        log::info!("Appending audio track {:02}...", track.number);
        copy_wav_payload(stream, &track_path)?;
    }
    Ok(())
}

fn copy_wav_payload<W: Write>(
    stream: &mut SectorStream<W>,
    path: &Path,
) -> Result<(), BuildError> {
    let mut file =
        File::open(path).map_err(|source| BuildError::host_file(path, source))?;
    psxpack_image::wav::skip_wav_header(&mut file)?;
    stream.copy_raw_bytes(&mut file)?;
    Ok(())
}

/// Emit the cue sheet describing the rebuilt image.
pub fn write_cue_sheet(
    cue_path: &Path,
    image_path: &Path,
    tracks: &[TrackEntry],
    track1_offset: i64,
) -> Result<(), BuildError> {
    let file = File::create(cue_path)?;
    let mut out = BufWriter::new(file);
    let image_name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| image_path.display().to_string());

    writeln!(out, "FILE \"{}\" BINARY\r", image_name)?;

    if tracks.is_empty() {
        writeln!(out, "  TRACK 01 MODE2/2352\r")?;
        writeln!(out, "    INDEX 01 00:00:00\r")?;
        return Ok(());
    }

    for track in tracks {
        writeln!(out, "  TRACK {:02} {}\r", track.number, track.mode)?;

        // Tracks past the data track shift with the rebuilt track length.
        let offset = if track.number > 1 { track1_offset } else { 0 };
        if track.pregap > 0 {
            let start = (track.start_lsn as i64 + offset).max(0) as u32;
            writeln!(out, "    INDEX 00 {}\r", Msf::from_sectors(start))?;
        }
        let data = (track.data_lsn as i64 + offset).max(0) as u32;
        writeln!(out, "    INDEX 01 {}\r", Msf::from_sectors(data))?;
    }
    Ok(())
}

/// Read as many bytes as available into `buf`; callers pre-zero it so a
/// short final chunk comes out padded.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
#[path = "tests/writer_tests.rs"]
mod tests;
