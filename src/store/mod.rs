//! Store Module
//!
//! A column family's store: memstore, committed store files, the flush
//! pipeline and the scan path.
//!
//! ## Responsibilities
//! - Buffer writes in the memstore and flush them to store files
//! - Merge memstore and store files into one ordered scan stream
//! - Hand flushed snapshots and scan streams to the store's policy
//!
//! ## Flow
//! ```text
//!   add ──► MemStore ──snapshot──► StorePolicy::flush_cells ──► store file (tmp)
//!                                        │                           │
//!                                        └─ side files ─► commit ────┴─► data/{family}/
//!
//!   scan ──► MemStore + store files ──► StoreScanner ──► StorePolicy::wrap_scan
//! ```

mod family;
mod flush;
mod merge;
mod policy;
mod scan;
mod state;

pub use family::Store;
pub use flush::StoreFlushContext;
pub use merge::MergingIterator;
pub use policy::{DefaultStorePolicy, PendingFile, PreparedFlush, StorePolicy};
pub use scan::{bool_attribute, CellStream, Scan, StoreScanner, EMPTY_VALUE_ON_MOB_CELL_MISS, MOB_SCAN_RAW};
pub use state::{StoreFile, StoreState};
