//! Disc image ripper.
//!
//! Disassembles a bin/cue image into a catalog, a raw system-area dump, a
//! mirrored host directory tree, and WAV files for the audio tracks.

pub mod error;
pub mod lbn_table;
pub mod toc;
pub mod walker;

pub use error::RipError;
pub use lbn_table::print_lbn_table;
pub use toc::{analyze_toc, TocAnalysis};
pub use walker::{rip_image, RipOptions, RipSummary};
