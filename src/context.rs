//! Pipeline configuration.

use std::path::{Path, PathBuf};

use crate::error::{IoContext, PackError, Result};
use crate::manifest;
use crate::paths::fix_quoted_path;

/// Extension the input project file must carry (compared case-insensitively).
pub const PROJECT_EXTENSION: &str = "csproj";

/// Application asset folder next to the project file.
pub const WWWROOT_DIR: &str = "wwwroot";

/// Everything one packaging run needs, resolved to absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageContext {
    /// Project file name without extension; names the manifest and the zip
    pub artifact_name: String,
    pub project_dir: PathBuf,
    pub output_dir: PathBuf,
    pub dist_dir: PathBuf,
}

impl PackageContext {
    /// Validate the inputs. Nothing on disk is modified.
    pub fn new(project_file: &Path, output_dir: &str, dist_dir: &str) -> Result<Self> {
        let invalid_project = || PackError::InvalidProject {
            path: project_file.to_path_buf(),
        };

        let is_project = project_file
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(PROJECT_EXTENSION));
        if !is_project || !project_file.is_file() {
            return Err(invalid_project());
        }

        let artifact_name = project_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(invalid_project)?;

        let output_dir = fix_quoted_path(output_dir);
        if output_dir.is_empty() {
            return Err(PackError::EmptyOutputPath);
        }
        let dist_dir = fix_quoted_path(dist_dir);
        if dist_dir.is_empty() {
            return Err(PackError::EmptyDistPath);
        }

        let project_file =
            std::path::absolute(project_file).with_path("invalid path", project_file)?;
        let project_dir = project_file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(invalid_project)?;

        Ok(Self {
            artifact_name,
            project_dir,
            output_dir: absolute(output_dir)?,
            dist_dir: absolute(dist_dir)?,
        })
    }

    /// `<output_dir>/<artifact_name>.zip`
    pub fn artifact_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.zip", self.artifact_name))
    }

    /// `<parent of dist_dir>/<artifact_name>.StaticWebAssets.xml`
    pub fn manifest_path(&self) -> PathBuf {
        manifest::manifest_path(&self.dist_dir, &self.artifact_name)
    }

    /// `<project_dir>/wwwroot`
    pub fn wwwroot(&self) -> PathBuf {
        self.project_dir.join(WWWROOT_DIR)
    }
}

fn absolute(path: &str) -> Result<PathBuf> {
    let path = Path::new(path);
    std::path::absolute(path).with_path("invalid path", path)
}
