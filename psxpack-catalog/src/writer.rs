//! Catalog emission, the ripper's output side of the format.

use std::io::{self, Write};

use crate::model::{encode_track_listing, Catalog};
use crate::tree::{FileForm, FsTree, NodeId};

/// Serialize a catalog. `write_lbns` adds `@LSN` to every entry (the
/// `--lbns` rip option); CDDA placeholders always get one since their
/// extent pointer cannot be reconstructed otherwise.
pub fn write_catalog<W: Write>(
    out: &mut W,
    catalog: &Catalog,
    write_lbns: bool,
) -> io::Result<()> {
    if let Some(path) = &catalog.system_area_file {
        writeln!(out, "system_area {{")?;
        writeln!(out, "  file \"{}\"", path.display())?;
        writeln!(out, "}}")?;
        writeln!(out)?;
    }

    let v = &catalog.volume;
    writeln!(out, "volume {{")?;
    writeln!(out, "  system_id [{}]", v.system_id)?;
    writeln!(out, "  volume_id [{}]", v.volume_id)?;
    writeln!(out, "  volume_set_id [{}]", v.volume_set_id)?;
    writeln!(out, "  publisher_id [{}]", v.publisher_id)?;
    writeln!(out, "  preparer_id [{}]", v.preparer_id)?;
    writeln!(out, "  application_id [{}]", v.application_id)?;
    writeln!(out, "  copyright_file_id [{}]", v.copyright_file_id)?;
    writeln!(out, "  abstract_file_id [{}]", v.abstract_file_id)?;
    writeln!(out, "  bibliographic_file_id [{}]", v.bibliographic_file_id)?;
    writeln!(out, "  creation_date {}", v.creation_date.format())?;
    writeln!(out, "  modification_date {}", v.modification_date.format())?;
    writeln!(out, "  expiration_date {}", v.expiration_date.format())?;
    writeln!(out, "  effective_date {}", v.effective_date.format())?;
    writeln!(
        out,
        "  track_listing [{}]",
        encode_track_listing(&catalog.track_listing)
    )?;
    writeln!(out, "  track1_sector_count {}", catalog.track1_sector_count)?;
    writeln!(out, "  track1_postgap_type {}", catalog.track1_postgap_type)?;
    writeln!(out, "  audio_sectors {}", catalog.audio_sectors)?;
    writeln!(out, "  strict_rebuild {}", catalog.strict_rebuild as u8)?;
    writeln!(out, "  default_uid {}", catalog.default_uid)?;
    writeln!(out, "  default_gid {}", catalog.default_gid)?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    write_dir(out, &catalog.tree, catalog.root, 0, write_lbns)
}

fn write_dir<W: Write>(
    out: &mut W,
    tree: &FsTree,
    id: NodeId,
    level: usize,
    write_lbns: bool,
) -> io::Result<()> {
    let node = tree.node(id);
    let meta = node.dir();
    let indent = "  ".repeat(level);

    write!(out, "{}dir", indent)?;
    if !node.name.is_empty() {
        write!(out, " {}", node.name)?;
    }
    if write_lbns && node.first_sector != 0 {
        write!(out, " @{}", node.first_sector)?;
    }
    let y2k = u8::from(meta.y2k_self) + 10 * u8::from(meta.y2k_parent);
    writeln!(
        out,
        " GID{} UID{} ATRS{} ATRP{} DATES{} DATEP{} TIMEZONES{} TIMEZONEP{} HIDDEN{} Y2KBUG{} {{",
        meta.group_id,
        meta.user_id,
        meta.attr_self,
        meta.attr_parent,
        meta.date_self,
        meta.date_parent,
        meta.timezone_self,
        meta.timezone_parent,
        u8::from(meta.hidden),
        y2k
    )?;

    for &child in &node.children {
        let child_node = tree.node(child);
        if child_node.is_directory() {
            write_dir(out, tree, child, level + 1, write_lbns)?;
        } else {
            write_file(out, tree, child, level + 1, write_lbns)?;
        }
    }

    writeln!(out, "{}}}", indent)
}

fn write_file<W: Write>(
    out: &mut W,
    tree: &FsTree,
    id: NodeId,
    level: usize,
    write_lbns: bool,
) -> io::Result<()> {
    let node = tree.node(id);
    let meta = node.file();
    let keyword = match meta.form {
        FileForm::Form1 => "file",
        FileForm::Form2 => "xafile",
        FileForm::Cdda => "cddafile",
    };
    let name = node.name.strip_suffix(";1").unwrap_or(&node.name);

    write!(out, "{}{} {}", "  ".repeat(level), keyword, name)?;
    if (write_lbns || meta.form == FileForm::Cdda) && node.first_sector != 0 {
        write!(out, " @{}", node.first_sector)?;
    }
    write!(
        out,
        " GID{} UID{} ATR{} DATE{} TIMEZONE{} SIZE{} HIDDEN{} Y2KBUG{}",
        meta.group_id,
        meta.user_id,
        meta.attributes,
        meta.date,
        meta.timezone,
        meta.node_size,
        u8::from(meta.hidden),
        u8::from(meta.y2k_bug)
    )?;
    if meta.form == FileForm::Form2 {
        write!(out, " ZEROEDC{}", u8::from(meta.zero_edc))?;
    }
    writeln!(out)
}
