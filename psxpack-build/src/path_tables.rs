//! Path-table assembly from the filesystem tree.

use psxpack_catalog::{FsTree, NodeId};
use psxpack_core::path_table::PathTables;

use crate::error::BuildError;

/// Build the L/M path tables and assign every directory its record
/// number. Traversal is breadth-first over name-sorted children, so
/// parent records always precede (and number below) their children.
pub fn build_path_tables(tree: &mut FsTree, root: NodeId) -> Result<PathTables, BuildError> {
    let mut tables = PathTables::new();

    for id in tree.directories_breadth_first(root) {
        let node = tree.node(id);
        let parent_record = node
            .parent
            .map(|p| tree.node(p).dir().record_number)
            .unwrap_or(1);
        let name: Vec<u8> = if node.name.is_empty() {
            vec![0x00]
        } else {
            node.name.as_bytes().to_vec()
        };

        let record = tables.add(&name, node.first_sector, parent_record)?;
        tree.node_mut(id).dir_mut().record_number = record;
    }

    Ok(tables)
}
