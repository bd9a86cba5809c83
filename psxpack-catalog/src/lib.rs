//! Catalog descriptor and in-memory filesystem tree.
//!
//! The catalog is the human-editable text file the ripper emits and the
//! builder consumes: volume metadata, the track listing, and a nested
//! directory description mirroring the ISO tree.

pub mod error;
pub mod model;
pub mod parser;
pub mod tree;
pub mod writer;

pub use error::CatalogError;
pub use model::{Catalog, TrackEntry, VolumeInfo};
pub use tree::{DirMeta, FileForm, FileMeta, FsNode, FsTree, NodeId, NodeKind};
