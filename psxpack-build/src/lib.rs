//! Disc image builder.
//!
//! Reassembles a catalog plus extracted directory tree into a mixed-mode
//! raw image. The pipeline order is a contract: directory sizes, then
//! sector allocation, then directory extents and path tables, then the
//! sequential sector stream (system area, descriptors, data, postgap,
//! audio tracks).

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use psxpack_catalog::{Catalog, NodeKind};
use psxpack_core::dates::encode_record_time;
use psxpack_core::dir_record::{flags, DirRecord};
use psxpack_core::volume::{VolumeDescriptor, ROOT_DIR_SECTOR};
use psxpack_core::{BLOCK_SIZE, MAX_ISO_SECTORS, PREGAP_SECTORS, RAW_SECTOR_SIZE};

pub mod dirs;
pub mod error;
pub mod layout;
pub mod path_tables;
pub mod writer;

pub use error::BuildError;

use writer::SectorStream;

/// Figures reported after a successful build.
#[derive(Debug, Clone, Copy)]
pub struct BuildSummary {
    /// Allocated data sectors, before postgap.
    pub data_sectors: u32,
    /// Total volume size recorded in the PVD.
    pub volume_size: u32,
    /// Shift applied to CDDA extents and audio track addresses.
    pub track1_offset: i64,
}

/// Build the output image (and optionally a cue sheet) from a parsed
/// catalog. `fs_base` is the extracted-tree directory next to the catalog.
pub fn build_image(
    catalog: &mut Catalog,
    fs_base: &Path,
    image_path: &Path,
    write_cue: bool,
) -> Result<BuildSummary, BuildError> {
    layout::calc_dir_sizes(&mut catalog.tree, catalog.root);
    let lay = layout::allocate(&mut catalog.tree, catalog.root, catalog.strict_rebuild);

    let mut volume_size = lay.end_sector + PREGAP_SECTORS;
    let track1_offset = if catalog.track1_sector_count > PREGAP_SECTORS {
        volume_size as i64 - catalog.track1_sector_count as i64
    } else {
        0
    };
    volume_size += catalog.audio_sectors;
    if volume_size > MAX_ISO_SECTORS {
        log::warn!(
            "Output image larger than {} MiB",
            MAX_ISO_SECTORS as u64 * RAW_SECTOR_SIZE as u64 / (1024 * 1024)
        );
    }

    dirs::build_directories(&mut catalog.tree, catalog.root, track1_offset)?;
    let tables = path_tables::build_path_tables(&mut catalog.tree, catalog.root)?;

    log_tree(catalog, &lay.write_order);

    let pvd = encode_pvd(catalog, volume_size, tables.size() as u32)?;

    let file = File::create(image_path)?;
    let mut stream = SectorStream::new(BufWriter::new(file));

    log::info!("Writing system area...");
    let system_area = catalog
        .system_area_file
        .as_ref()
        .map(|p| resolve_side_file(p, fs_base));
    writer::write_system_area(&mut stream, system_area.as_deref())?;

    log::info!("Writing volume descriptors...");
    writer::write_descriptors(&mut stream, &pvd, tables.l_table(), tables.m_table())?;

    writer::write_data(&mut stream, &catalog.tree, &lay.write_order)?;
    stream.write_gap(lay.end_sector)?;

    writer::write_postgap(&mut stream, catalog.track1_postgap_type, fs_base)?;
    writer::append_audio_tracks(&mut stream, &catalog.track_listing, fs_base)?;
    stream.flush()?;

    if write_cue {
        let cue_path = image_path.with_extension("cue");
        writer::write_cue_sheet(&cue_path, image_path, &catalog.track_listing, track1_offset)?;
        log::info!("Cue file written to {}", cue_path.display());
    }

    Ok(BuildSummary {
        data_sectors: lay.end_sector,
        volume_size,
        track1_offset,
    })
}

fn encode_pvd(
    catalog: &Catalog,
    volume_size: u32,
    path_table_size: u32,
) -> Result<[u8; BLOCK_SIZE], BuildError> {
    let v = &catalog.volume;
    let root_node = catalog.tree.node(catalog.root);

    let root_record = DirRecord {
        extent: ROOT_DIR_SECTOR,
        size: root_node.num_sectors * BLOCK_SIZE as u32,
        time: encode_record_time(
            &v.creation_date.date14(),
            v.creation_date.gmt_offset,
            false,
        )?,
        flags: flags::DIRECTORY,
        name: vec![0x00],
        xa: None,
    };

    let desc = VolumeDescriptor {
        system_id: v.system_id.clone(),
        volume_id: v.volume_id.clone(),
        volume_set_id: v.volume_set_id.clone(),
        publisher_id: v.publisher_id.clone(),
        preparer_id: v.preparer_id.clone(),
        application_id: v.application_id.clone(),
        copyright_file_id: v.copyright_file_id.clone(),
        abstract_file_id: v.abstract_file_id.clone(),
        bibliographic_file_id: v.bibliographic_file_id.clone(),
        creation_date: v.creation_date,
        modification_date: v.modification_date,
        expiration_date: v.expiration_date,
        effective_date: v.effective_date,
        volume_space_size: volume_size,
        path_table_size,
    };
    Ok(desc.encode_pvd(&root_record))
}

/// Dump the allocated tree at info level (the `-v` listing).
fn log_tree(catalog: &Catalog, order: &[psxpack_catalog::NodeId]) {
    for &id in order {
        let node = catalog.tree.node(id);
        match &node.kind {
            NodeKind::Directory(meta) => log::info!(
                "{} ({} sectors @ {}, PT record {})",
                node.path.display(),
                node.num_sectors,
                node.first_sector,
                meta.record_number
            ),
            NodeKind::File(meta) => log::info!(
                "{} ({} sectors @ {}, {} bytes)",
                node.path.display(),
                node.num_sectors,
                node.first_sector,
                meta.size
            ),
        }
    }
}

/// Resolve a path recorded in the catalog: as-is when it exists, else
/// next to the extracted tree.
fn resolve_side_file(path: &Path, fs_base: &Path) -> PathBuf {
    if path.exists() || path.is_absolute() {
        return path.to_path_buf();
    }
    let base = fs_base.parent().unwrap_or(Path::new("."));
    let candidate = base.join(path.file_name().unwrap_or(path.as_os_str()));
    if candidate.exists() {
        candidate
    } else {
        path.to_path_buf()
    }
}
