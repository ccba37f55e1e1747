//! Archive packaging.
//!
//! Merges the dist tree and the `wwwroot` tree into one zip whose entry
//! names are relative to the tree each file came from.
//!
//! Root precedence: `wwwroot` is enumerated first, then the dist tree. A
//! file under both roots (one root nested inside the other) belongs to the
//! deeper root; identical roots resolve to the dist tree. The outer walk
//! skips the nested root's subtree, and an entry name seen twice keeps its
//! first file.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{IoContext, PackError, Result};
use crate::zip::{ArchiveWriter, DosDateTime};

/// Result of a packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSummary {
    /// Absolute path of the written archive
    pub archive: PathBuf,
    pub entries: usize,
    /// Files dropped because an earlier file already used their entry name
    pub duplicates: usize,
}

/// Delete `path` if it exists. A missing file is not an error.
pub fn remove_existing(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed previous artifact");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_path("failed to remove previous artifact", path),
    }
}

/// Archive entry name for `file`: its path relative to the owning root,
/// `/`-separated, without a leading separator.
///
/// Returns `None` when `file` is under neither root or is a root itself.
/// A path component that is not valid UTF-8 is an error.
pub fn entry_name(file: &Path, dist_root: &Path, wwwroot: &Path) -> Result<Option<String>> {
    let relative = match (file.strip_prefix(dist_root), file.strip_prefix(wwwroot)) {
        (Ok(dist), Ok(www)) => {
            if www.components().count() < dist.components().count() {
                www
            } else {
                dist
            }
        }
        (Ok(dist), Err(_)) => dist,
        (Err(_), Ok(www)) => www,
        (Err(_), Err(_)) => return Ok(None),
    };

    let mut segments = Vec::new();
    for component in relative.components() {
        if let Component::Normal(s) = component {
            let segment = s.to_str().ok_or_else(|| PackError::InvalidEntryName {
                path: file.to_path_buf(),
            })?;
            segments.push(segment);
        }
    }

    if segments.is_empty() {
        Ok(None)
    } else {
        Ok(Some(segments.join("/")))
    }
}

/// Package every file under `dist_root` and `wwwroot` into `output`.
///
/// Any existing file at `output` is replaced. Empty directories produce no
/// entries. An unreadable source file aborts the run and leaves a partial
/// archive behind, which must be treated as invalid.
pub fn package_archive(dist_root: &Path, wwwroot: &Path, output: &Path) -> Result<PackageSummary> {
    let dist_root = std::path::absolute(dist_root).with_path("invalid path", dist_root)?;
    let wwwroot = std::path::absolute(wwwroot).with_path("invalid path", wwwroot)?;
    let output = std::path::absolute(output).with_path("invalid path", output)?;

    for root in [&wwwroot, &dist_root] {
        if !root.is_dir() {
            return Err(PackError::MissingRoot { path: root.clone() });
        }
    }

    remove_existing(&output)?;
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).with_path("failed to create directory", parent)?;
    }

    info!(
        archive = %output.display(),
        dist = %dist_root.display(),
        wwwroot = %wwwroot.display(),
        "packaging"
    );

    let file = File::create(&output).with_path("failed to create archive", &output)?;
    let mut writer =
        ArchiveWriter::new(BufWriter::new(file)).with_path("failed to create archive", &output)?;
    let mut seen = HashSet::new();
    let mut duplicates = 0;

    for (root, other) in [(&wwwroot, &dist_root), (&dist_root, &wwwroot)] {
        for path in enumerate_files(root, other, &output)? {
            let Some(name) = entry_name(&path, &dist_root, &wwwroot)? else {
                warn!(file = %path.display(), "file is outside both package roots, skipping");
                continue;
            };
            if !seen.insert(name.clone()) {
                warn!(entry = %name, file = %path.display(), "duplicate entry name, skipping");
                duplicates += 1;
                continue;
            }

            let source = File::open(&path).with_path("failed to read", &path)?;
            let modified = source
                .metadata()
                .and_then(|m| m.modified())
                .map(DosDateTime::from_system_time)
                .unwrap_or(DosDateTime::EPOCH);
            writer
                .add_file(&name, modified, source)
                .with_path("failed to add to archive", &path)?;
            debug!(entry = %name, "added");
        }
    }

    let entries = writer.entries().len();
    writer
        .finish()
        .with_path("failed to finish archive", &output)?;

    info!(archive = %output.display(), entries, "archive written");
    Ok(PackageSummary {
        archive: output,
        entries,
        duplicates,
    })
}

/// Files under `root` in name order, leaving out `other` when it is nested
/// inside `root` and the archive being written.
fn enumerate_files(root: &Path, other: &Path, output: &Path) -> Result<Vec<PathBuf>> {
    let nested = other != root && other.starts_with(root);

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(nested && e.path() == other));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            PackError::io("failed to walk", &path, e.into())
        })?;
        if entry.file_type().is_dir() || entry.path() == output {
            continue;
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn archive_names(path: &Path) -> Vec<String> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        rt.block_on(crate::zip::verify_archive(path))
            .unwrap()
            .into_iter()
            .map(|e| e.file_name)
            .collect()
    }

    #[test]
    fn entry_names_are_root_relative_with_forward_slashes() {
        let dist = Path::new("/build/dist");
        let www = Path::new("/proj/wwwroot");

        assert_eq!(
            entry_name(Path::new("/build/dist/css/app.css"), dist, www).unwrap().as_deref(),
            Some("css/app.css")
        );
        assert_eq!(
            entry_name(Path::new("/proj/wwwroot/favicon.ico"), dist, www).unwrap().as_deref(),
            Some("favicon.ico")
        );
        assert_eq!(entry_name(Path::new("/elsewhere/x"), dist, www).unwrap(), None);
        assert_eq!(entry_name(dist, dist, www).unwrap(), None);
    }

    #[test]
    fn prefix_match_is_per_component() {
        let dist = Path::new("/build/dist");
        let www = Path::new("/build/dist2");
        assert_eq!(
            entry_name(Path::new("/build/dist2/a.js"), dist, www).unwrap().as_deref(),
            Some("a.js")
        );
    }

    #[test]
    fn nested_root_claims_its_files() {
        let dist = Path::new("/proj/dist");
        let www = Path::new("/proj/dist/wwwroot");
        assert_eq!(
            entry_name(Path::new("/proj/dist/wwwroot/a.js"), dist, www).unwrap().as_deref(),
            Some("a.js")
        );
        assert_eq!(
            entry_name(Path::new("/proj/dist/index.html"), dist, www).unwrap().as_deref(),
            Some("index.html")
        );
    }

    #[test]
    fn packages_both_trees() {
        let dist = tempdir().unwrap();
        let www = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(&dist.path().join("index.html"), "<html/>");
        write(&dist.path().join("css/app.css"), "body {}");
        write(&www.path().join("favicon.ico"), "icon");
        fs::create_dir_all(dist.path().join("empty")).unwrap();

        let output = out.path().join("App.zip");
        let summary = package_archive(dist.path(), www.path(), &output).unwrap();

        assert_eq!(summary.entries, 3);
        assert_eq!(summary.duplicates, 0);
        assert_eq!(
            archive_names(&output),
            ["favicon.ico", "css/app.css", "index.html"]
        );
    }

    #[test]
    fn nested_wwwroot_is_not_packaged_twice() {
        let dist = tempdir().unwrap();
        let out = tempdir().unwrap();
        let www = dist.path().join("wwwroot");
        write(&www.join("favicon.ico"), "icon");
        write(&dist.path().join("index.html"), "<html/>");

        let output = out.path().join("App.zip");
        let summary = package_archive(dist.path(), &www, &output).unwrap();

        assert_eq!(summary.entries, 2);
        assert_eq!(archive_names(&output), ["favicon.ico", "index.html"]);
    }

    #[test]
    fn first_root_wins_on_duplicate_names() {
        let dist = tempdir().unwrap();
        let www = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(&dist.path().join("index.html"), "from dist");
        write(&www.path().join("index.html"), "from wwwroot");

        let output = out.path().join("App.zip");
        let summary = package_archive(dist.path(), www.path(), &output).unwrap();

        assert_eq!(summary.entries, 1);
        assert_eq!(summary.duplicates, 1);

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let content = rt.block_on(async {
            let reader = crate::zip::ArchiveReader::open(&output).unwrap();
            let entries = reader.list_entries().await.unwrap();
            reader.read_entry(&entries[0]).await.unwrap()
        });
        assert_eq!(content, b"from wwwroot");
    }

    #[test]
    fn existing_archive_is_replaced() {
        let dist = tempdir().unwrap();
        let www = tempdir().unwrap();
        let out = tempdir().unwrap();
        write(&dist.path().join("index.html"), "<html/>");
        let output = out.path().join("nested").join("App.zip");
        write(&output, "stale bytes, not a zip");

        package_archive(dist.path(), www.path(), &output).unwrap();

        assert_eq!(archive_names(&output), ["index.html"]);
    }

    #[test]
    fn archive_inside_a_root_does_not_include_itself() {
        let dist = tempdir().unwrap();
        let www = tempdir().unwrap();
        write(&dist.path().join("index.html"), "<html/>");

        let output = dist.path().join("App.zip");
        package_archive(dist.path(), www.path(), &output).unwrap();

        assert_eq!(archive_names(&output), ["index.html"]);
    }

    #[test]
    fn missing_root_is_fatal() {
        let dist = tempdir().unwrap();
        let out = tempdir().unwrap();
        let missing = dist.path().join("wwwroot");

        let err = package_archive(dist.path(), &missing, &out.path().join("App.zip")).unwrap_err();
        assert!(matches!(err, PackError::MissingRoot { path } if path == missing));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_file_name_is_fatal() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dist = tempdir().unwrap();
        let www = tempdir().unwrap();
        let out = tempdir().unwrap();
        // Would both map to "a\u{FFFD}" under lossy conversion
        let first = dist.path().join(OsStr::from_bytes(b"a\xfe"));
        fs::write(&first, "first").unwrap();
        fs::write(dist.path().join(OsStr::from_bytes(b"a\xff")), "second").unwrap();

        let err = package_archive(dist.path(), www.path(), &out.path().join("App.zip")).unwrap_err();
        assert!(matches!(err, PackError::InvalidEntryName { path } if path == first));
    }

    #[test]
    fn removing_missing_artifact_is_not_an_error() {
        let dir = tempdir().unwrap();
        assert!(!remove_existing(&dir.path().join("App.zip")).unwrap());
    }
}
