//! ISO tree extraction and catalog assembly.
//!
//! Walks the filesystem from the PVD's root record, classifies every
//! entry by its CD-XA attributes, extracts file bodies into a mirrored
//! host tree, and records everything into a catalog. Directory entries
//! are visited in ascending extent order so extraction stays sequential
//! on disc and the catalog preserves the original layout.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use psxpack_catalog::model::{pregap_file_name, track_file_name, EXTRA_DIR, LAST_SECTOR_FILE};
use psxpack_catalog::{
    writer as catalog_writer, Catalog, DirMeta, FileForm, FileMeta, FsNode, FsTree, NodeId,
    NodeKind, VolumeInfo,
};
use psxpack_core::dates::{normalize_record_time, LongDate, NormalizedDate, RecordTime};
use psxpack_core::dir_record::{flags, DirRecord};
use psxpack_core::volume::{VolumeDescriptor, PVD_SECTOR};
use psxpack_core::xa::attr;
use psxpack_core::{BLOCK_SIZE, RAW_SECTOR_SIZE};
use psxpack_image::{wav, DiscImage};

use crate::error::RipError;
use crate::toc::{analyze_toc, TocAnalysis};

/// Rip behavior switches from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RipOptions {
    /// Normalize Y2K-damaged dates instead of preserving the anomaly.
    pub fix_dates: bool,
    /// Record the LSN of every entry in the catalog.
    pub write_lbns: bool,
    /// Mark the catalog for a strict (LSN-preserving) rebuild.
    pub strict: bool,
}

/// Figures reported after a successful rip.
#[derive(Debug, Clone)]
pub struct RipSummary {
    pub volume_id: String,
    pub files: usize,
    pub directories: usize,
    pub catalog_path: PathBuf,
}

/// Rip an image into `<output_base>.cat`, `<output_base>.sys` and the
/// mirrored tree under `<output_base>/`.
pub fn rip_image(
    image: &mut DiscImage,
    output_base: &Path,
    options: &RipOptions,
) -> Result<RipSummary, RipError> {
    let toc = analyze_toc(image)?;

    let catalog_path = output_base.with_extension("cat");
    let sys_path = output_base.with_extension("sys");
    let tree_dir = output_base.to_path_buf();

    dump_system_area(image, &sys_path)?;
    log::info!("System area data written to {}", sys_path.display());

    let pvd_block = image.read_block(PVD_SECTOR)?;
    let (mut desc, root_record) =
        VolumeDescriptor::parse_pvd(&pvd_block).map_err(|_| RipError::NoFilesystem)?;
    log::info!("Volume ID = {}", desc.volume_id);

    if options.fix_dates {
        desc.creation_date.fix_century();
        desc.modification_date.fix_century();
        desc.expiration_date.fix_century();
        desc.effective_date.fix_century();
    }

    let fallback = creation_fallback(&desc.creation_date);

    log::info!("Dumping filesystem to directory {}...", tree_dir.display());
    let mut walker = Walker {
        image: &mut *image,
        tree: FsTree::new(),
        fix_dates: options.fix_dates,
        fallback,
        files: 0,
        directories: 0,
    };
    let root = walker.walk_directory(
        root_record.extent,
        root_record.size,
        String::new(),
        tree_dir.clone(),
        None,
    )?;
    let Walker {
        mut tree,
        files,
        directories,
        ..
    } = walker;
    tree.sort_children();

    let extra_dir = tree_dir.join(EXTRA_DIR);
    extract_audio_tracks(image, &toc, &extra_dir)?;
    if let Some(sector) = &toc.last_sector {
        fs::create_dir_all(&extra_dir)?;
        fs::write(extra_dir.join(LAST_SECTOR_FILE), &sector[..])?;
        log::info!("Unclassified postgap; raw last sector saved");
    }

    let volume_id = desc.volume_id.clone();
    let catalog = Catalog {
        system_area_file: Some(sys_path),
        volume: volume_info(&desc),
        default_uid: 0,
        default_gid: 0,
        track_listing: toc.tracks,
        track1_sector_count: toc.track1_sector_count,
        track1_postgap_type: toc.postgap_type,
        audio_sectors: toc.audio_sectors,
        strict_rebuild: options.strict,
        tree,
        root,
    };

    let file = File::create(&catalog_path)?;
    let mut out = BufWriter::new(file);
    catalog_writer::write_catalog(&mut out, &catalog, options.write_lbns || options.strict)?;
    out.flush()?;
    log::info!("Catalog written to {}", catalog_path.display());

    Ok(RipSummary {
        volume_id,
        files,
        directories,
        catalog_path,
    })
}

/// Decode all directory records of an extent. Records never straddle
/// sector boundaries; a zero length byte ends each sector's run.
pub fn read_dir_records(
    image: &mut DiscImage,
    extent: u32,
    size: u32,
) -> Result<Vec<DirRecord>, RipError> {
    let sectors = size.div_ceil(BLOCK_SIZE as u32);
    let mut records = Vec::new();
    for i in 0..sectors {
        let block = image.read_block(extent + i)?;
        let mut pos = 0;
        while pos < BLOCK_SIZE {
            match DirRecord::decode(&block[pos..])? {
                Some((rec, len)) => {
                    records.push(rec);
                    pos += len;
                }
                None => break,
            }
        }
    }
    Ok(records)
}

struct Walker<'a> {
    image: &'a mut DiscImage,
    tree: FsTree,
    fix_dates: bool,
    fallback: Option<RecordTime>,
    files: usize,
    directories: usize,
}

impl Walker<'_> {
    fn walk_directory(
        &mut self,
        extent: u32,
        size: u32,
        name: String,
        host_dir: PathBuf,
        parent: Option<NodeId>,
    ) -> Result<NodeId, RipError> {
        log::info!("Dumping '{}' as '{}'", name, host_dir.display());

        let records = read_dir_records(self.image, extent, size)?;
        if records.len() < 2 {
            return Err(psxpack_core::FormatError::invalid_record(format!(
                "directory at sector {} lacks its \".\" and \"..\" records",
                extent
            ))
            .into());
        }

        let self_rec = &records[0];
        let parent_rec = &records[1];
        let self_xa = self_rec.xa.unwrap_or_default();
        let parent_xa = parent_rec.xa.unwrap_or_default();
        let self_date = self.normalize(&self_rec.time);
        let parent_date = self.normalize(&parent_rec.time);

        let id = self.tree.insert(FsNode {
            name,
            path: host_dir.clone(),
            parent,
            children: Vec::new(),
            sorted_children: Vec::new(),
            first_sector: extent,
            num_sectors: size.div_ceil(BLOCK_SIZE as u32),
            requested_start_sector: extent,
            kind: NodeKind::Directory(DirMeta {
                group_id: self_xa.group_id,
                user_id: self_xa.user_id,
                attr_self: self_xa.attributes,
                attr_parent: parent_xa.attributes,
                date_self: self_date.date,
                date_parent: parent_date.date,
                timezone_self: self_date.timezone,
                timezone_parent: parent_date.timezone,
                hidden: self_rec.flags & flags::HIDDEN != 0,
                y2k_self: self_date.y2k_bug,
                y2k_parent: parent_date.y2k_bug,
                extent: Vec::new(),
                record_number: 0,
            }),
        });
        self.directories += 1;
        fs::create_dir_all(&host_dir)?;

        // Visit children by ascending extent so extraction runs in disc
        // order and the catalog keeps the original layout.
        let mut children: Vec<DirRecord> = records[2..].to_vec();
        children.sort_by_key(|r| r.extent);

        for rec in children {
            let entry_name = rec.name_string();
            if rec.is_directory() {
                self.walk_directory(
                    rec.extent,
                    rec.size,
                    entry_name.clone(),
                    host_dir.join(&entry_name),
                    Some(id),
                )?;
            } else {
                self.extract_file(id, &host_dir, &rec)?;
            }
        }
        Ok(id)
    }

    fn extract_file(
        &mut self,
        dir: NodeId,
        host_dir: &Path,
        rec: &DirRecord,
    ) -> Result<(), RipError> {
        let xa = rec.xa.unwrap_or_default();
        let attributes = xa.attributes;

        let form = if attributes & attr::CDDA != 0 {
            FileForm::Cdda
        } else if attributes & (attr::FORM2 | attr::INTERLEAVED) != 0 {
            FileForm::Form2
        } else {
            FileForm::Form1
        };

        let name = rec.name_string();
        let base_name = name.split(';').next().unwrap_or(&name).to_string();
        let host_path = host_dir.join(&base_name);
        let num_sectors = rec.size.div_ceil(BLOCK_SIZE as u32);

        if form != FileForm::Form1 {
            log::info!(
                "XA file '{}' size = {}, secsize = {}, group_id = {}, user_id = {}, attributes = {:04x}, filenum = {}",
                base_name,
                rec.size,
                num_sectors,
                xa.group_id,
                xa.user_id,
                attributes,
                xa.file_number
            );
        }

        let (size, sectors, zero_edc) = match form {
            // CDDA bytes live in an audio track; only the entry is kept.
            FileForm::Cdda => (0u64, 0u32, false),
            FileForm::Form1 => {
                self.extract_form1(rec, &host_path)?;
                (rec.size as u64, num_sectors, false)
            }
            FileForm::Form2 => {
                let zero_edc = self.extract_form2(rec, num_sectors, &host_path)?;
                (
                    num_sectors as u64 * psxpack_core::M2RAW_SECTOR_SIZE as u64,
                    num_sectors,
                    zero_edc,
                )
            }
        };

        let date = self.normalize(&rec.time);
        self.tree.insert(FsNode {
            name,
            path: host_path,
            parent: Some(dir),
            children: Vec::new(),
            sorted_children: Vec::new(),
            first_sector: rec.extent,
            num_sectors: sectors,
            requested_start_sector: rec.extent,
            kind: NodeKind::File(FileMeta {
                form,
                group_id: xa.group_id,
                user_id: xa.user_id,
                attributes,
                date: date.date,
                timezone: date.timezone,
                size,
                node_size: rec.size,
                hidden: rec.flags & flags::HIDDEN != 0,
                y2k_bug: date.y2k_bug,
                zero_edc,
            }),
        });
        self.files += 1;
        Ok(())
    }

    /// Extract a Form 1 file: 2048-byte payloads, truncated to the
    /// recorded size.
    fn extract_form1(&mut self, rec: &DirRecord, host_path: &Path) -> Result<(), RipError> {
        let mut out = BufWriter::new(File::create(host_path)?);
        let mut remaining = rec.size as usize;
        let mut lsn = rec.extent;
        while remaining > 0 {
            let block = self.image.read_block(lsn)?;
            let n = remaining.min(BLOCK_SIZE);
            out.write_all(&block[..n])?;
            remaining -= n;
            lsn += 1;
        }
        out.flush()?;
        Ok(())
    }

    /// Extract a Form 2 file as raw 2336-byte sectors, probing for the
    /// zeroed-EDC mastering style on the way.
    fn extract_form2(
        &mut self,
        rec: &DirRecord,
        num_sectors: u32,
        host_path: &Path,
    ) -> Result<bool, RipError> {
        let mut out = BufWriter::new(File::create(host_path)?);
        let mut zero_edc = false;
        let mut raw = [0u8; RAW_SECTOR_SIZE];
        for i in 0..num_sectors {
            self.image.read_raw(rec.extent + i, &mut raw)?;
            if raw[18] & 0x20 != 0 && raw[2348..] == [0, 0, 0, 0] {
                zero_edc = true;
            }
            out.write_all(&raw[16..])?;
        }
        out.flush()?;
        Ok(zero_edc)
    }

    fn normalize(&self, time: &[u8; 7]) -> NormalizedDate {
        normalize_record_time(
            &RecordTime::from_bytes(time),
            self.fallback.as_ref(),
            self.fix_dates,
        )
    }
}

/// Dump the 16-sector system area as raw bytes.
fn dump_system_area(image: &mut DiscImage, sys_path: &Path) -> Result<(), RipError> {
    let mut out = BufWriter::new(File::create(sys_path)?);
    let mut raw = [0u8; RAW_SECTOR_SIZE];
    for lsn in 0..16 {
        image.read_raw(lsn, &mut raw)?;
        out.write_all(&raw)?;
    }
    out.flush()?;
    Ok(())
}

/// Write audio tracks (and pregaps) as WAV files under the extras dir.
fn extract_audio_tracks(
    image: &mut DiscImage,
    toc: &TocAnalysis,
    extra_dir: &Path,
) -> Result<(), RipError> {
    for track in toc.tracks.iter().filter(|t| t.is_audio()) {
        fs::create_dir_all(extra_dir)?;
        if track.pregap > 0 {
            write_audio_wav(
                image,
                &extra_dir.join(pregap_file_name(track.number)),
                track.start_lsn,
                track.data_lsn,
            )?;
        }
        log::info!("Extracting audio track {:02}...", track.number);
        write_audio_wav(
            image,
            &extra_dir.join(track_file_name(track.number)),
            track.data_lsn,
            track.end_lsn,
        )?;
    }
    Ok(())
}

fn write_audio_wav(
    image: &mut DiscImage,
    path: &Path,
    from: u32,
    to: u32,
) -> Result<(), RipError> {
    let mut out = BufWriter::new(File::create(path)?);
    let data_len = (to - from) * RAW_SECTOR_SIZE as u32;
    out.write_all(&wav::wav_header(data_len))?;

    let mut raw = [0u8; RAW_SECTOR_SIZE];
    for lsn in from..to {
        image.read_raw(lsn, &mut raw)?;
        out.write_all(&raw)?;
    }
    out.flush()?;
    Ok(())
}

/// The replacement recording time for records whose year byte is garbage:
/// the PVD creation date with its century restored.
fn creation_fallback(date: &LongDate) -> Option<RecordTime> {
    let mut fixed = *date;
    fixed.fix_century();
    let year = fixed.year();
    if !(1900..=2155).contains(&year) {
        return None;
    }
    let field = |range: std::ops::Range<usize>| -> u8 {
        std::str::from_utf8(&fixed.digits[range])
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    };
    Some(RecordTime {
        year: (year - 1900) as u8,
        month: field(4..6),
        day: field(6..8),
        hour: field(8..10),
        minute: field(10..12),
        second: field(12..14),
        gmt_offset: fixed.gmt_offset,
    })
}

fn volume_info(desc: &VolumeDescriptor) -> VolumeInfo {
    VolumeInfo {
        system_id: desc.system_id.clone(),
        volume_id: desc.volume_id.clone(),
        volume_set_id: desc.volume_set_id.clone(),
        publisher_id: desc.publisher_id.clone(),
        preparer_id: desc.preparer_id.clone(),
        application_id: desc.application_id.clone(),
        copyright_file_id: desc.copyright_file_id.clone(),
        abstract_file_id: desc.abstract_file_id.clone(),
        bibliographic_file_id: desc.bibliographic_file_id.clone(),
        creation_date: desc.creation_date,
        modification_date: desc.modification_date,
        expiration_date: desc.expiration_date,
        effective_date: desc.effective_date,
    }
}

#[cfg(test)]
#[path = "tests/walker_tests.rs"]
mod tests;
