//! Storage Module
//!
//! Immutable on-disk sorted cell files. The same format backs both the
//! store's flushed files and MOB files; a `FileInfo` block records which.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                                │
//! │   Magic: "ATCF" (4) | Version: u16 (2) | Count: u64 (8)          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                            │
//! │   [RowLen u32][FamLen u32][QualLen u32][Ts u64][Type u8]         │
//! │   [ValLen u64][Row][Family][Qualifier][Value]                    │
//! │   ... repeated for each cell, ascending key order ...            │
//! │   (Value is LZ4-framed when the file info says so)               │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Index Block (variable)                                           │
//! │   [RowLen u32][FamLen u32][QualLen u32][Ts u64][Offset u64]      │
//! │   [Row][Family][Qualifier]                                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Meta Block                                                       │
//! │   [Len u32][bincode FileInfo]                                    │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ Footer (24 bytes)                                                │
//! │   IndexOffset u64 | MetaOffset u64 | DataCRC u32 | Padding (4)   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian.

mod cell_file;

pub use cell_file::{CellFile, CellFileBuilder, CellFileIterator, CellFileReader, FileInfo, FileKind};
