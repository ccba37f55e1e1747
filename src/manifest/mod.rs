//! Static web assets manifest.
//!
//! The build toolchain writes `<name>.StaticWebAssets.xml` next to the dist
//! directory. Each referenced library contributes one element:
//!
//! ```xml
//! <StaticWebAssets Version="1.0">
//!   <ContentRoot BasePath="_content/Lib" Path="/home/me/.nuget/lib/wwwroot/" />
//! </StaticWebAssets>
//! ```
//!
//! `Path` is the library's asset directory and `BasePath` is where those
//! assets belong relative to the dist directory.

mod scanner;

pub use scanner::{decode_entities, Tag, TagScanner};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IoContext, Result};

/// Suffix appended to the artifact name to form the manifest file name.
pub const MANIFEST_SUFFIX: &str = ".StaticWebAssets.xml";

const CONTENT_ROOT_ELEMENT: &str = "ContentRoot";
const BASE_PATH_ATTR: &str = "BasePath";
const PATH_ATTR: &str = "Path";

/// One content root declared by the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRootMapping {
    /// Directory holding the library's static assets
    pub source_path: String,
    /// Destination relative to the dist directory
    pub base_path: String,
}

impl ContentRootMapping {
    pub fn new(source_path: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            base_path: base_path.into(),
        }
    }
}

/// Extract every `ContentRoot` mapping from manifest text, in document order.
///
/// Elements lacking a non-empty `BasePath` or `Path` are skipped. Text with
/// no matching elements yields an empty list.
pub fn parse_manifest(text: &str) -> Vec<ContentRootMapping> {
    TagScanner::new(text)
        .filter(|tag| tag.name == CONTENT_ROOT_ELEMENT)
        .filter_map(|tag| {
            let base_path = tag.attribute(BASE_PATH_ATTR).filter(|v| !v.is_empty())?;
            let source_path = tag.attribute(PATH_ATTR).filter(|v| !v.is_empty())?;
            Some(ContentRootMapping::new(source_path, base_path))
        })
        .collect()
}

/// Conventional manifest location: `<parent of dist_dir>/<artifact_name>.StaticWebAssets.xml`.
pub fn manifest_path(dist_dir: &Path, artifact_name: &str) -> PathBuf {
    let parent = dist_dir.parent().unwrap_or(dist_dir);
    parent.join(format!("{artifact_name}{MANIFEST_SUFFIX}"))
}

/// Read and parse the manifest at `path`.
///
/// Returns `Ok(None)` when the file does not exist: the project references
/// no library with static assets.
pub fn load_manifest(path: &Path) -> Result<Option<Vec<ContentRootMapping>>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(manifest = %path.display(), "no static web assets manifest");
            return Ok(None);
        }
        Err(e) => return Err(e).with_path("failed to read manifest", path),
    };

    let mappings = parse_manifest(&text);
    debug!(
        manifest = %path.display(),
        content_roots = mappings.len(),
        "parsed static web assets manifest"
    );
    Ok(Some(mappings))
}
