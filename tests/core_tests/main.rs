//! Core type tests
//!
//! These tests verify:
//! - Cell key ordering (coordinates ascending, timestamps descending)
//! - Family descriptor properties and the directory layout
//! - Memstore segments, snapshots and size accounting
