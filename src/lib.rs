//! # AtlasMob
//!
//! Large-value (MOB) indirection for a log-structured cell store:
//! - Values above a per-family threshold are moved into MOB files on flush
//! - The store keeps a small reference cell in their place
//! - MOB files are committed atomically into date partitions
//! - Scans resolve references transparently (or return them raw)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                               │
//! │              (one column family, &self API)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  MemStore   │          │ StorePolicy │──── default | mob
//!   │  (RwLock)   │          └──────┬──────┘
//!   └──────┬──────┘                 │
//!          │ flush                  ├──► MOB files  (mobdir/{family}/{YYYYMMDD})
//!          ▼                        │
//!   ┌─────────────┐                 └──► resolver   (mobdir, then archive)
//!   │ Store files │
//!   │ (cell file) │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod cell;
pub mod memstore;
pub mod storage;
pub mod store;
pub mod mob;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use cell::{Cell, CellKey, CellType};
pub use config::{Compression, Config, FamilyDescriptor};
pub use error::{MobError, Result};
pub use mob::{MobResolver, MobStorePolicy};
pub use store::{Scan, Store, StorePolicy};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of AtlasMob
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
