//! Directory-extent construction.
//!
//! Packs each directory's records ("." and "..", then children sorted by
//! name) into its `num_sectors * 2048` extent buffer, applying the same
//! no-straddle rule the size calculator used. CDDA placeholders get their
//! extent pointer rebased into the audio area here.

use psxpack_catalog::{FileForm, FsTree, NodeId, NodeKind};
use psxpack_core::dates::encode_record_time;
use psxpack_core::dir_record::{flags, DirRecord, PARENT_ID, SELF_ID};
use psxpack_core::error::FormatError;
use psxpack_core::xa::XaEntry;
use psxpack_core::BLOCK_SIZE;

use crate::error::BuildError;

/// Build the extent data of every directory.
///
/// `track1_offset` is the difference between the rebuilt and the original
/// data-track length; CDDA directory entries must shift by it so they
/// still point into their audio track.
pub fn build_directories(
    tree: &mut FsTree,
    root: NodeId,
    track1_offset: i64,
) -> Result<(), BuildError> {
    // Rebase CDDA placeholders before any record is emitted.
    for i in 0..tree.len() {
        let node = tree.node_mut(NodeId(i));
        if node.is_cdda() {
            node.first_sector = (node.requested_start_sector as i64 + track1_offset) as u32;
        }
    }

    for id in tree.preorder_sorted(root) {
        if tree.node(id).is_directory() {
            let extent = pack_directory(tree, id)?;
            tree.node_mut(id).dir_mut().extent = extent;
        }
    }
    Ok(())
}

fn pack_directory(tree: &FsTree, id: NodeId) -> Result<Vec<u8>, BuildError> {
    let node = tree.node(id);
    let meta = node.dir();
    let dir_size = node.num_sectors as usize * BLOCK_SIZE;
    let mut data = vec![0u8; dir_size];

    // ".": the directory itself.
    let self_rec = DirRecord {
        extent: node.first_sector,
        size: dir_size as u32,
        time: record_time(&meta.date_self, meta.timezone_self, meta.y2k_self)?,
        flags: flags::DIRECTORY,
        name: SELF_ID.to_vec(),
        xa: Some(XaEntry::new(0, 0, meta.attr_self, 0)),
    };

    // "..": the parent, or the directory itself at the root.
    let parent = node.parent.map(|p| tree.node(p)).unwrap_or(node);
    let parent_rec = DirRecord {
        extent: parent.first_sector,
        size: parent.num_sectors * BLOCK_SIZE as u32,
        time: record_time(&meta.date_parent, meta.timezone_parent, meta.y2k_parent)?,
        flags: flags::DIRECTORY,
        name: PARENT_ID.to_vec(),
        xa: Some(XaEntry::new(0, 0, meta.attr_parent, 0)),
    };

    let mut offset = 0;
    offset += self_rec.encode(&mut data[offset..]);
    offset += parent_rec.encode(&mut data[offset..]);

    for &child_id in &node.sorted_children {
        let rec = child_record(tree.node(child_id))?;
        let rec_size = rec.encoded_size();
        if offset / BLOCK_SIZE != (offset + rec_size) / BLOCK_SIZE {
            offset += (BLOCK_SIZE - offset) % BLOCK_SIZE;
        }
        rec.encode(&mut data[offset..]);
        offset += rec_size;
    }

    Ok(data)
}

/// Build the directory record for one child node.
fn child_record(child: &psxpack_catalog::FsNode) -> Result<DirRecord, FormatError> {
    let (size, time, record_flags, xa) = match &child.kind {
        NodeKind::Directory(meta) => (
            child.num_sectors * BLOCK_SIZE as u32,
            record_time(&meta.date_self, meta.timezone_self, meta.y2k_self)?,
            dir_flags(meta.hidden),
            XaEntry::new(meta.group_id, meta.user_id, meta.attr_self, 0),
        ),
        NodeKind::File(meta) => {
            let size = match meta.form {
                FileForm::Form1 => meta.size as u32,
                FileForm::Form2 => child.num_sectors * BLOCK_SIZE as u32,
                // The recorded size of a CDDA entry is whatever the catalog
                // says; the bytes live in an audio track, not here.
                FileForm::Cdda => meta.node_size,
            };
            let file_number = u8::from(meta.form == FileForm::Form2);
            (
                size,
                record_time(&meta.date, meta.timezone, meta.y2k_bug)?,
                file_flags(meta.hidden),
                XaEntry::new(meta.group_id, meta.user_id, meta.attributes, file_number),
            )
        }
    };

    Ok(DirRecord {
        extent: child.first_sector,
        size,
        time,
        flags: record_flags,
        name: child.name.as_bytes().to_vec(),
        xa: Some(xa),
    })
}

fn dir_flags(hidden: bool) -> u8 {
    if hidden {
        flags::DIRECTORY | flags::HIDDEN
    } else {
        flags::DIRECTORY
    }
}

fn file_flags(hidden: bool) -> u8 {
    if hidden {
        flags::HIDDEN
    } else {
        0
    }
}

/// Recording time for a catalog date, defaulting missing dates to the
/// epoch.
fn record_time(date: &str, timezone: i8, y2k: bool) -> Result<[u8; 7], FormatError> {
    if date.is_empty() {
        return Ok([70, 1, 1, 0, 0, 0, timezone as u8]);
    }
    encode_record_time(date, timezone, y2k)
}

#[cfg(test)]
#[path = "tests/dirs_tests.rs"]
mod tests;
