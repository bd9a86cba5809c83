//! Directory-size calculation and sector allocation.
//!
//! The allocator's visit order is a contract with the stream writer: the
//! writer replays exactly the order returned here, filling gaps with empty
//! sectors whenever an extent starts past the running sector counter.

use psxpack_catalog::{FileForm, FsTree, NodeId, NodeKind};
use psxpack_core::dir_record::record_size;
use psxpack_core::volume::ROOT_DIR_SECTOR;
use psxpack_core::xa::XA_SYSTEM_USE_SIZE;
use psxpack_core::BLOCK_SIZE;

/// Outcome of the allocation pass.
#[derive(Debug)]
pub struct Layout {
    /// Nodes in the order they were allocated; the writer must follow it.
    pub write_order: Vec<NodeId>,
    /// First sector past the allocated data area.
    pub end_sector: u32,
}

/// Compute `num_sectors` for every directory from its sorted children.
///
/// Records never cross a 2048-byte boundary; a record that would straddle
/// pushes the running size to the next sector first. The extent packer in
/// `dirs` uses the same rule, so the sizes computed here are exact.
pub fn calc_dir_sizes(tree: &mut FsTree, root: NodeId) {
    for id in tree.preorder_sorted(root) {
        if !tree.node(id).is_directory() {
            continue;
        }

        // "." and ".." records
        let mut size = 2 * record_size(1, XA_SYSTEM_USE_SIZE);

        for &child in &tree.node(id).sorted_children {
            let name_len = tree.node(child).name.len();
            let mut rec = record_size(name_len, XA_SYSTEM_USE_SIZE);
            if size / BLOCK_SIZE != (size + rec) / BLOCK_SIZE {
                rec += (BLOCK_SIZE - size) % BLOCK_SIZE;
            }
            size += rec;
        }

        tree.node_mut(id).num_sectors = size.div_ceil(BLOCK_SIZE) as u32;
    }
}

/// Assign `first_sector` to every node.
pub fn allocate(tree: &mut FsTree, root: NodeId, strict: bool) -> Layout {
    if strict {
        allocate_strict(tree, root)
    } else {
        allocate_normal(tree, root)
    }
}

/// Normal mode: pre-order, contiguous, honoring requested LSNs that do not
/// collide with already-allocated content.
fn allocate_normal(tree: &mut FsTree, root: NodeId) -> Layout {
    let order = tree.preorder(root);
    let mut current = ROOT_DIR_SECTOR;
    for &id in &order {
        place(tree, id, &mut current);
    }
    Layout {
        write_order: order,
        end_sector: current,
    }
}

/// Strict mode: place every node back at its original LSN, deferring files
/// that no longer fit their recorded directory size to the end of the
/// track.
fn allocate_strict(tree: &mut FsTree, root: NodeId) -> Layout {
    let mut order = tree.preorder(root);
    order.sort_by_key(|&id| tree.node(id).requested_start_sector);

    let mut write_order = Vec::with_capacity(order.len());
    let mut overflow = Vec::new();
    let mut current = ROOT_DIR_SECTOR;

    for &id in &order {
        if is_overflowing(tree.node(id)) {
            log::warn!(
                "{} no longer fits its original extent, reallocating past the track end",
                tree.node(id).path.display()
            );
            overflow.push(id);
            continue;
        }
        place(tree, id, &mut current);
        write_order.push(id);
    }

    // Overflowing files go after everything else, in original-LSN order
    // (the sort above already arranged that). Their requested sector is
    // rewritten so the directory record points at the new extent.
    for &id in &overflow {
        let node = tree.node_mut(id);
        node.requested_start_sector = current;
        node.first_sector = current;
        current += node.num_sectors;
        write_order.push(id);
    }

    Layout {
        write_order,
        end_sector: current,
    }
}

/// Place one node at its requested or the current sector, advancing the
/// counter. CDDA placeholders keep their requested sector for the
/// directory-record fix-up but consume no track space.
fn place(tree: &mut FsTree, id: NodeId, current: &mut u32) {
    let node = tree.node_mut(id);
    if node.requested_start_sector != 0 && !node.is_cdda() {
        if node.requested_start_sector < *current {
            node.first_sector = *current;
            log::warn!(
                "{} will start at sector {} instead of {}",
                node.path.display(),
                node.first_sector,
                node.requested_start_sector
            );
        } else {
            node.first_sector = node.requested_start_sector;
        }
    } else {
        node.first_sector = *current;
    }
    *current = node.first_sector + node.num_sectors;
}

/// A non-audio file overflows when it needs more sectors than its recorded
/// directory-record size allowed on the original disc.
fn is_overflowing(node: &psxpack_catalog::FsNode) -> bool {
    match &node.kind {
        NodeKind::File(meta) if meta.form != FileForm::Cdda => {
            let original_sectors = (meta.node_size as usize).div_ceil(BLOCK_SIZE) as u32;
            node.num_sectors > original_sectors
        }
        _ => false,
    }
}

#[cfg(test)]
#[path = "tests/layout_tests.rs"]
mod tests;
