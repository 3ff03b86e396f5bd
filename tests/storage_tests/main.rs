//! Cell file format tests
//!
//! These tests verify:
//! - Writing and reading back cells of both types
//! - Strict key ordering on append
//! - Point lookups, seeks and range scans
//! - LZ4 value compression
//! - Checksum and header validation
