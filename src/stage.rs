//! Asset staging.
//!
//! Copies every manifest content root into the dist directory so the
//! packager sees one merged tree. The `_content` staging root is reset
//! before any copy so files from a previous run never survive.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{IoContext, PackError, Result};
use crate::manifest::{load_manifest, ContentRootMapping};

/// Name of the staging root inside the dist directory.
pub const STAGING_DIR: &str = "_content";

/// Outcome of removing the previous staging root.
///
/// Removal is best-effort: a tree that cannot be deleted is reported as
/// [`Cleanup::Failed`] and staging carries on.
#[derive(Debug)]
pub enum Cleanup {
    Removed,
    Absent,
    Failed(io::Error),
}

impl Cleanup {
    pub fn is_failed(&self) -> bool {
        matches!(self, Cleanup::Failed(_))
    }
}

/// Counters for a staging run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    /// Content roots copied
    pub content_roots: usize,
    pub files: usize,
    pub directories: usize,
    /// The previous staging root could not be removed
    pub stale_staging_kept: bool,
}

/// Remove `<dist_dir>/_content` if present and create it again, empty.
///
/// Only the recreation step can fail.
pub fn reset_staging_root(dist_dir: &Path) -> Result<Cleanup> {
    reset_staging_root_with(dist_dir, |p| fs::remove_dir_all(p))
}

/// [`reset_staging_root`] with the tree removal supplied by the caller.
///
/// A failing `remove` is logged and reported as [`Cleanup::Failed`]; a
/// failing create is returned as an error.
pub fn reset_staging_root_with(
    dist_dir: &Path,
    remove: impl FnOnce(&Path) -> io::Result<()>,
) -> Result<Cleanup> {
    let staging_root = dist_dir.join(STAGING_DIR);

    let cleanup = if staging_root.exists() {
        match remove(&staging_root) {
            Ok(()) => Cleanup::Removed,
            Err(e) => {
                warn!(
                    path = %staging_root.display(),
                    error = %e,
                    "could not remove previous staging directory, continuing"
                );
                Cleanup::Failed(e)
            }
        }
    } else {
        Cleanup::Absent
    };

    fs::create_dir_all(&staging_root)
        .with_path("failed to create staging directory", &staging_root)?;

    Ok(cleanup)
}

/// Resolve a manifest base path against the dist directory.
///
/// Both `/` and `\` separate segments. Empty and `.` segments are ignored;
/// `..` and rooted paths are rejected so nothing is written outside `dist_dir`.
pub fn destination_for(dist_dir: &Path, base_path: &str) -> Result<PathBuf> {
    let invalid = || PackError::InvalidBasePath {
        base_path: base_path.to_string(),
    };

    if base_path.starts_with(['/', '\\']) || Path::new(base_path).has_root() {
        return Err(invalid());
    }

    let mut destination = dist_dir.to_path_buf();
    for segment in base_path.split(['/', '\\']) {
        match Path::new(segment).components().next() {
            None | Some(Component::CurDir) => {}
            Some(Component::Normal(_)) if !segment.contains(':') => destination.push(segment),
            Some(_) => return Err(invalid()),
        }
    }
    Ok(destination)
}

/// Stage `mappings` into `dist_dir`, in order.
///
/// The staging root is reset first. Later mappings overwrite files written
/// by earlier ones when destinations collide. A missing source directory
/// aborts the run.
pub fn stage_assets(mappings: &[ContentRootMapping], dist_dir: &Path) -> Result<StageReport> {
    let cleanup = reset_staging_root(dist_dir)?;

    let mut report = StageReport {
        stale_staging_kept: cleanup.is_failed(),
        ..StageReport::default()
    };
    for mapping in mappings {
        let source = PathBuf::from(&mapping.source_path);
        let destination = destination_for(dist_dir, &mapping.base_path)?;

        if !source.is_dir() {
            return Err(PackError::MissingContentRoot { path: source });
        }

        info!(
            source = %source.display(),
            destination = %destination.display(),
            "staging content root"
        );
        copy_tree(&source, &destination, &mut report)?;
        report.content_roots += 1;
    }

    Ok(report)
}

/// Stage assets declared by the manifest at `manifest_path`.
///
/// A missing manifest means there is nothing to stage: no reset and no copy.
pub fn stage_from_manifest(manifest_path: &Path, dist_dir: &Path) -> Result<StageReport> {
    match load_manifest(manifest_path)? {
        Some(mappings) => stage_assets(&mappings, dist_dir),
        None => {
            info!(
                manifest = %manifest_path.display(),
                "no static web assets manifest, nothing to stage"
            );
            Ok(StageReport::default())
        }
    }
}

/// Recursively copy `source` into `destination`, including empty
/// directories. Existing files are overwritten.
fn copy_tree(source: &Path, destination: &Path, report: &mut StageReport) -> Result<()> {
    for entry in WalkDir::new(source).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            PackError::io("failed to walk content root", &path, e.into())
        })?;

        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).with_path("failed to create directory", &target)?;
            if entry.depth() > 0 {
                report.directories += 1;
            }
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).with_path("failed to create directory", parent)?;
            }
            fs::copy(entry.path(), &target).with_path("failed to copy", entry.path())?;
            debug!(file = %target.display(), "staged");
            report.files += 1;
        }
    }
    Ok(())
}
