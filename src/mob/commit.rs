//! Commit Manager
//!
//! Moves a sealed MOB file from the temp directory into its partition.
//!
//! The move is a hard link followed by unlinking the source: the link either
//! creates the complete target or fails with `AlreadyExists`, so readers never
//! see a partial file and an existing target is never replaced. When linking
//! is not possible (different volumes, no hard-link support) the file is
//! copied to a staging name beside the target, fsynced, and renamed within
//! that directory. The target name is reserved with `create_new` first, so
//! that rename only ever replaces our own empty placeholder.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::error::{MobError, Result};

/// How the sealed file reaches its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommitMethod {
    /// Hard link, falling back to a staged copy when linking fails
    Link,
    /// Staged copy only
    Copy,
}

/// Commit `temp_path` to `target_path`, creating the partition directory
///
/// Safe to retry: a target that is already present and identical (or a
/// source that is already gone while the target exists) is success. A target
/// with different content is a `CommitConflict`.
pub fn commit_file(temp_path: &Path, target_path: &Path) -> Result<()> {
    commit_with(temp_path, target_path, CommitMethod::Link)
}

/// Commit through a staged copy without trying a hard link first
///
/// Same guarantees as [`commit_file`]. Used when the temp directory sits on
/// a different volume than the MOB directory.
pub fn commit_file_by_copy(temp_path: &Path, target_path: &Path) -> Result<()> {
    commit_with(temp_path, target_path, CommitMethod::Copy)
}

fn commit_with(temp_path: &Path, target_path: &Path, method: CommitMethod) -> Result<()> {
    let partition_dir = target_path.parent().ok_or_else(|| {
        MobError::Storage(format!("Commit target {} has no parent", target_path.display()))
    })?;
    fs::create_dir_all(partition_dir)?;

    if !temp_path.try_exists()? {
        if target_path.try_exists()? {
            tracing::debug!(target = %target_path.display(), "MOB file already committed");
            return Ok(());
        }
        return Err(MobError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Neither {} nor {} exists", temp_path.display(), target_path.display()),
        )));
    }

    let placed = match method {
        CommitMethod::Link => match fs::hard_link(temp_path, target_path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => false,
            Err(e) => {
                tracing::warn!(
                    source = %temp_path.display(),
                    target = %target_path.display(),
                    error = %e,
                    "Hard link failed, committing through a staged copy"
                );
                copy_and_rename(temp_path, target_path, partition_dir)?
            }
        },
        CommitMethod::Copy => copy_and_rename(temp_path, target_path, partition_dir)?,
    };
    if !placed {
        return resolve_existing(temp_path, target_path);
    }

    fs::remove_file(temp_path)?;
    sync_dir(partition_dir)?;

    tracing::info!(target = %target_path.display(), "Committed MOB file");
    Ok(())
}

/// Target already present: identical content is a retry, anything else conflicts
fn resolve_existing(temp_path: &Path, target_path: &Path) -> Result<()> {
    if same_contents(temp_path, target_path)? {
        fs::remove_file(temp_path)?;
        tracing::debug!(target = %target_path.display(), "MOB file already committed with identical content");
        Ok(())
    } else {
        Err(MobError::CommitConflict {
            target: target_path.to_path_buf(),
        })
    }
}

/// Returns `false` without touching anything when the target already exists
fn copy_and_rename(temp_path: &Path, target_path: &Path, partition_dir: &Path) -> Result<bool> {
    let file_name = target_path
        .file_name()
        .ok_or_else(|| MobError::Storage(format!("Bad commit target {}", target_path.display())))?;
    let staging = partition_dir.join(format!(".{}.staging", file_name.to_string_lossy()));

    fs::copy(temp_path, &staging)?;
    if let Err(e) = File::open(&staging).and_then(|f| f.sync_all()) {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }

    // Reserve the name; whoever created it first owns the target
    match OpenOptions::new().write(true).create_new(true).open(target_path) {
        Ok(_) => {}
        Err(e) => {
            let _ = fs::remove_file(&staging);
            if e.kind() == io::ErrorKind::AlreadyExists {
                return Ok(false);
            }
            return Err(e.into());
        }
    }

    if let Err(e) = fs::rename(&staging, target_path) {
        let _ = fs::remove_file(&staging);
        let _ = fs::remove_file(target_path);
        return Err(e.into());
    }
    Ok(true)
}

/// Byte-for-byte comparison of two files
fn same_contents(a: &Path, b: &Path) -> Result<bool> {
    if fs::metadata(a)?.len() != fs::metadata(b)?.len() {
        return Ok(false);
    }

    let mut left = BufReader::new(File::open(a)?);
    let mut right = BufReader::new(File::open(b)?);
    let mut left_buf = vec![0u8; 64 * 1024];
    let mut right_buf = vec![0u8; 64 * 1024];

    loop {
        let n = left.read(&mut left_buf)?;
        if n == 0 {
            return Ok(true);
        }
        right.read_exact(&mut right_buf[..n])?;
        if left_buf[..n] != right_buf[..n] {
            return Ok(false);
        }
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
