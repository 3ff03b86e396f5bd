//! MemStore Module
//!
//! In-memory write buffer for recent cells.
//!
//! ## Responsibilities
//! - Fast writes and reads in memory
//! - Freeze the current contents into a snapshot for flushing
//! - Track size for flush triggers
//! - Ordered iteration in cell key order
//!
//! ## Lifecycle
//! ```text
//!   add() ──► active ──snapshot()──► snapshot ──clear_snapshot()──► (gone)
//!                ▲                       │
//!                └── reads see both ─────┘
//! ```

mod table;

pub use table::MemStore;
