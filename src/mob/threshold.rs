//! Threshold Gate
//!
//! Decides, per cell, whether a value stays inline in the store or is
//! externalized into a MOB file.

use crate::cell::{Cell, CellType};
use crate::config::FamilyDescriptor;

/// MOB settings of one family, fixed for the descriptor's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyPolicy {
    pub is_mob: bool,
    pub threshold_bytes: u64,
}

impl FamilyPolicy {
    pub fn from_descriptor(family: &FamilyDescriptor) -> Self {
        Self {
            is_mob: family.is_mob(),
            threshold_bytes: family.mob_threshold(),
        }
    }

    /// A policy that never externalizes
    pub fn inline_only() -> Self {
        Self {
            is_mob: false,
            threshold_bytes: u64::MAX,
        }
    }
}

/// Where a value is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Inline,
    Externalize,
}

/// Classify a candidate value
///
/// Externalize iff the family is a MOB family and the value is strictly
/// longer than the threshold; a value of exactly `threshold_bytes` is inline.
pub fn classify(value: &[u8], policy: &FamilyPolicy) -> Placement {
    if policy.is_mob && value.len() as u64 > policy.threshold_bytes {
        Placement::Externalize
    } else {
        Placement::Inline
    }
}

/// Classify a cell about to be flushed
///
/// Cells that already hold a reference stay as they are.
pub fn classify_cell(cell: &Cell, policy: &FamilyPolicy) -> Placement {
    match cell.cell_type() {
        CellType::MobReference => Placement::Inline,
        CellType::Put => classify(cell.value(), policy),
    }
}
