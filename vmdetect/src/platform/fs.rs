// SPDX-License-Identifier: Apache-2.0

//! Filesystem probes: existence/type checks and best-effort text reads.
//!
//! Every function here returns `Option`/`bool` rather than `Result`: a
//! missing file, a permission error, or a non-UTF8 read are all the same
//! signal to a probe ("this evidence isn't available"), not a distinct
//! failure mode worth propagating past this module.

use std::path::{Path, PathBuf};

/// True if `path` exists (file, directory, or otherwise), following
/// symlinks. Never logs; a probe checking for e.g. `/.dockerenv` on a
/// non-Linux host hits this every query and a log line would be noise.
#[must_use]
pub fn exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// True if `path` exists and is a directory.
#[must_use]
pub fn is_directory(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_dir()
}

/// Reads `path` as UTF-8 text, trimming a single trailing newline. Returns
/// `None` (logged at `trace`) for any I/O error or invalid UTF-8, rather
/// than surfacing that distinction to callers.
#[must_use]
pub fn read_file_text(path: impl AsRef<Path>) -> Option<String> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(contents) => Some(contents.trim_end_matches('\n').to_string()),
        Err(err) => {
            log::trace!("read_file_text({}): {err}", path.display());
            None
        }
    }
}

/// Reads `path` as raw bytes. Returns `None` (logged at `trace`) on any I/O
/// error.
#[must_use]
pub fn read_file_bytes(path: impl AsRef<Path>) -> Option<Vec<u8>> {
    let path = path.as_ref();
    match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            log::trace!("read_file_bytes({}): {err}", path.display());
            None
        }
    }
}

/// Lists entries of a directory as file names (not full paths), or an
/// empty vec if the directory can't be read.
#[must_use]
pub fn list_dir_names(path: impl AsRef<Path>) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(path.as_ref()) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect()
}

/// Expands a leading `~` to `$HOME` (or `%USERPROFILE%` on Windows), the
/// shorthand several VM-artifact marker paths use (e.g.
/// `~/Library/Preferences`).
#[must_use]
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .unwrap_or_default();
        let mut full = PathBuf::from(home);
        full.push(rest);
        return full;
    }
    PathBuf::from(path)
}

/// True if any of `candidates` exists on disk, expanding `~` first. Used by
/// probes that accept any one of several equivalent paths as evidence
/// (e.g. the VM driver filename list).
#[must_use]
pub fn any_exists(candidates: &[&str]) -> bool {
    candidates.iter().any(|c| exists(expand_home(c)))
}
