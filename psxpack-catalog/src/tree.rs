//! In-memory mirror of the ISO directory tree.
//!
//! Nodes live in an arena indexed by [`NodeId`]; parents are back-indices
//! rather than pointers. Each node keeps both its insertion-order children
//! (the catalog/extraction order, which follows original disc LSNs) and a
//! lexicographically sorted copy (the order ISO directory records and path
//! tables require).

use std::collections::VecDeque;
use std::path::PathBuf;

/// Index of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Storage class of a file node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileForm {
    /// Plain 2048-byte-sector data file.
    Form1,
    /// XA stream stored as 2336-byte sectors.
    Form2,
    /// CDDA placeholder: a directory entry pointing into an audio track.
    Cdda,
}

/// Per-file catalog attributes.
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub form: FileForm,
    pub group_id: u16,
    pub user_id: u16,
    /// CD-XA attribute word, written to the record verbatim.
    pub attributes: u16,
    /// 14-digit GMT recording date; empty when the catalog omitted it.
    pub date: String,
    /// GMT offset in 15-minute units.
    pub timezone: i8,
    /// Byte size of the source file on the host (0 for CDDA placeholders).
    pub size: u64,
    /// The SIZE field from the catalog: the size recorded in the original
    /// directory record. Drives strict-mode overflow detection and is the
    /// recorded size of CDDA entries.
    pub node_size: u32,
    pub hidden: bool,
    pub y2k_bug: bool,
    /// Strip the EDC of Form 2 sectors on rebuild.
    pub zero_edc: bool,
}

/// Per-directory catalog attributes plus builder state.
#[derive(Debug, Clone, Default)]
pub struct DirMeta {
    pub group_id: u16,
    pub user_id: u16,
    /// Attribute word of the "." record.
    pub attr_self: u16,
    /// Attribute word of the ".." record.
    pub attr_parent: u16,
    pub date_self: String,
    pub date_parent: String,
    pub timezone_self: i8,
    pub timezone_parent: i8,
    pub hidden: bool,
    pub y2k_self: bool,
    pub y2k_parent: bool,
    /// Packed directory extent, filled by the directory builder.
    pub extent: Vec<u8>,
    /// Path table record number, filled by the path-table builder.
    pub record_number: u16,
}

/// Variant payload of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    File(FileMeta),
    Directory(DirMeta),
}

/// One node of the filesystem tree.
#[derive(Debug, Clone)]
pub struct FsNode {
    /// ISO identifier; files carry their ";1" version suffix, the root is "".
    pub name: String,
    /// Source (build) or target (rip) path on the host filesystem.
    pub path: PathBuf,
    pub parent: Option<NodeId>,
    /// Children in catalog/insertion order.
    pub children: Vec<NodeId>,
    /// Children sorted by name.
    pub sorted_children: Vec<NodeId>,
    /// First LSN of the extent, assigned by the allocator.
    pub first_sector: u32,
    /// Extent length in sectors.
    pub num_sectors: u32,
    /// Catalog-requested LSN; 0 means no preference.
    pub requested_start_sector: u32,
    pub kind: NodeKind,
}

impl FsNode {
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    pub fn is_cdda(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::File(FileMeta {
                form: FileForm::Cdda,
                ..
            })
        )
    }

    /// File payload, or a fatal tree-corruption panic. The parser only
    /// builds the two variants, so this cannot trip in practice.
    pub fn file(&self) -> &FileMeta {
        match &self.kind {
            NodeKind::File(meta) => meta,
            NodeKind::Directory(_) => panic!("internal filesystem tree corrupt"),
        }
    }

    pub fn dir(&self) -> &DirMeta {
        match &self.kind {
            NodeKind::Directory(meta) => meta,
            NodeKind::File(_) => panic!("internal filesystem tree corrupt"),
        }
    }

    pub fn dir_mut(&mut self) -> &mut DirMeta {
        match &mut self.kind {
            NodeKind::Directory(meta) => meta,
            NodeKind::File(_) => panic!("internal filesystem tree corrupt"),
        }
    }
}

/// Arena of filesystem nodes.
#[derive(Debug, Clone, Default)]
pub struct FsTree {
    nodes: Vec<FsNode>,
}

impl FsTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node and wire it into its parent's child list.
    pub fn insert(&mut self, node: FsNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = node.parent;
        self.nodes.push(node);
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    pub fn node(&self, id: NodeId) -> &FsNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut FsNode {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Fill `sorted_children` of every node from `children`.
    pub fn sort_children(&mut self) {
        for i in 0..self.nodes.len() {
            let mut sorted = self.nodes[i].children.clone();
            sorted.sort_by(|a, b| self.nodes[a.0].name.cmp(&self.nodes[b.0].name));
            self.nodes[i].sorted_children = sorted;
        }
    }

    /// Pre-order traversal in insertion order.
    pub fn preorder(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.walk(root, false, &mut out);
        out
    }

    /// Pre-order traversal with children sorted by name.
    pub fn preorder_sorted(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.walk(root, true, &mut out);
        out
    }

    fn walk(&self, id: NodeId, sorted: bool, out: &mut Vec<NodeId>) {
        out.push(id);
        let node = &self.nodes[id.0];
        let children = if sorted {
            &node.sorted_children
        } else {
            &node.children
        };
        for &child in children {
            self.walk(child, sorted, out);
        }
    }

    /// Breadth-first traversal with children sorted by name. This is the
    /// path-table order: parents always precede children.
    pub fn breadth_first_sorted(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            out.push(id);
            queue.extend(self.nodes[id.0].sorted_children.iter().copied());
        }
        out
    }

    /// Directories of the tree in breadth-first sorted order.
    pub fn directories_breadth_first(&self, root: NodeId) -> Vec<NodeId> {
        self.breadth_first_sorted(root)
            .into_iter()
            .filter(|&id| self.node(id).is_directory())
            .collect()
    }
}
