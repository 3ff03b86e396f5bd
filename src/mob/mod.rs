//! MOB Module
//!
//! Moderately-sized values kept out of the store files.
//!
//! ## Responsibilities
//! - Decide which values are externalized (`threshold`)
//! - Encode the reference left in their place (`reference`)
//! - Write, seal and name MOB files (`file`)
//! - Move sealed files into their partition atomically (`commit`)
//! - Turn references back into values (`resolver`, `scanner`)
//! - Wire all of the above into a store (`policy`)
//!
//! ## Layout
//! ```text
//!   {data_dir}/mobdir/{family}/{YYYYMMDD}/{file}
//!   {data_dir}/archive/{family}/{YYYYMMDD}/{file}   (searched after mobdir)
//! ```

pub mod commit;
pub mod file;
mod policy;
pub mod reference;
mod resolver;
mod scanner;
pub mod threshold;

pub use commit::{commit_file, commit_file_by_copy};
pub use file::{open_mob_file, MobFileName, MobFileWriter};
pub use policy::MobStorePolicy;
pub use reference::{is_reference, reference_cell, Reference};
pub use resolver::MobResolver;
pub use scanner::{MobScanner, ScanMode};
pub use threshold::{classify, classify_cell, FamilyPolicy, Placement};
