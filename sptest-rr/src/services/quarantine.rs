//! Quarantine moves into the records root's `Duplicates` directory
//!
//! Name collisions are resolved by appending `_dup1`, `_dup2`, ... before
//! the extension until a free name is found.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Upper bound on disambiguator attempts
pub const MAX_DISAMBIGUATOR: u32 = 10_000;

/// First free destination for `file_name` inside `quarantine_dir`
pub fn free_destination(quarantine_dir: &Path, file_name: &str) -> Option<PathBuf> {
    let candidate = quarantine_dir.join(file_name);
    if !candidate.exists() {
        return Some(candidate);
    }

    let as_path = Path::new(file_name);
    let base = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..=MAX_DISAMBIGUATOR)
        .map(|n| quarantine_dir.join(format!("{}_dup{}{}", base, n, ext)))
        .find(|candidate| !candidate.exists())
}

/// Move a file into quarantine, returning where it landed
///
/// Falls back to copy-then-delete when a plain rename fails (for example
/// across filesystems); a half-finished fallback is rolled back.
pub fn move_to_quarantine(source: &Path, quarantine_dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(quarantine_dir)?;

    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "source has no file name"))?;

    let destination = free_destination(quarantine_dir, &file_name).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free quarantine name for {}", file_name),
        )
    })?;

    match fs::rename(source, &destination) {
        Ok(()) => {}
        Err(rename_err) => {
            if let Err(copy_err) = fs::copy(source, &destination) {
                let _ = fs::remove_file(&destination);
                tracing::debug!(error = %copy_err, "Copy fallback failed");
                return Err(rename_err);
            }
            if let Err(remove_err) = fs::remove_file(source) {
                let _ = fs::remove_file(&destination);
                return Err(remove_err);
            }
        }
    }

    tracing::debug!(
        from = %source.display(),
        to = %destination.display(),
        "Moved to quarantine"
    );
    Ok(destination)
}
