//! The `--lbn-table` listing: one row per filesystem object with its
//! LSN, sector count, byte size and type.

use std::io::Write;

use psxpack_core::dir_record::DirRecord;
use psxpack_core::volume::{VolumeDescriptor, PVD_SECTOR};
use psxpack_core::xa::attr;
use psxpack_core::{BLOCK_SIZE, M2RAW_SECTOR_SIZE};
use psxpack_image::DiscImage;

use crate::error::RipError;
use crate::walker::read_dir_records;

/// Print the LBN table of an image.
pub fn print_lbn_table<W: Write>(out: &mut W, image: &mut DiscImage) -> Result<(), RipError> {
    let pvd_block = image.read_block(PVD_SECTOR)?;
    let (_, root) =
        VolumeDescriptor::parse_pvd(&pvd_block).map_err(|_| RipError::NoFilesystem)?;

    writeln!(out, "{:>8} {:>8} {:>8} T Path", "LBN", "NumSec", "Size")?;
    dump_dir(out, image, root.extent, root.size, "")?;
    Ok(())
}

fn dump_dir<W: Write>(
    out: &mut W,
    image: &mut DiscImage,
    extent: u32,
    size: u32,
    path: &str,
) -> Result<(), RipError> {
    writeln!(
        out,
        "{:08x} {:08x} {:08x} d {}",
        extent,
        size.div_ceil(BLOCK_SIZE as u32),
        size,
        path
    )?;

    let records = read_dir_records(image, extent, size)?;
    let mut children: Vec<DirRecord> = records.into_iter().skip(2).collect();
    children.sort_by_key(|r| r.extent);

    for rec in children {
        let name = rec.name_string();
        let name = name.split(';').next().unwrap_or(&name).to_string();
        let entry_path = if path.is_empty() {
            name
        } else {
            format!("{}/{}", path, name)
        };

        if rec.is_directory() {
            dump_dir(out, image, rec.extent, rec.size, &entry_path)?;
            continue;
        }

        let sectors = rec.size.div_ceil(BLOCK_SIZE as u32);
        let attributes = rec.xa.map(|xa| xa.attributes).unwrap_or(0);
        let mut type_char = 'f';
        let mut file_size = rec.size;
        if attributes & (attr::FORM2 | attr::INTERLEAVED) != 0 {
            type_char = 'x';
            file_size = sectors * M2RAW_SECTOR_SIZE as u32;
        }
        if attributes & attr::CDDA != 0 {
            type_char = 'a';
        }
        writeln!(
            out,
            "{:08x} {:08x} {:08x} {} {}",
            rec.extent, sectors, file_size, type_char, entry_path
        )?;
    }
    Ok(())
}
