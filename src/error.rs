//! Error types for the packaging pipeline.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias used by the staging and packaging pipeline.
pub type Result<T> = std::result::Result<T, PackError>;

#[derive(Error, Debug)]
pub enum PackError {
    /// Input is missing or is not a `.csproj` project file
    #[error("the input file {path} does not exist or is not a csproj project file")]
    InvalidProject { path: PathBuf },

    /// Output directory resolved to an empty path
    #[error("the output path is not set")]
    EmptyOutputPath,

    /// Dist directory resolved to an empty path
    #[error("the dist path is not set")]
    EmptyDistPath,

    /// A manifest content root points at a directory that does not exist
    #[error("content root {path} declared in the static web assets manifest does not exist")]
    MissingContentRoot { path: PathBuf },

    /// A manifest base path would leave the dist directory
    #[error("invalid content root base path '{base_path}'")]
    InvalidBasePath { base_path: String },

    /// One of the trees to package does not exist
    #[error("directory to package not found: {path}")]
    MissingRoot { path: PathBuf },

    /// A file to package has a name that cannot be stored as a UTF-8 entry name
    #[error("file name is not valid UTF-8: {path}")]
    InvalidEntryName { path: PathBuf },

    #[error("{context} {path}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PackError {
    pub(crate) fn io(context: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Attach a path and a short description of the failed operation to an I/O result.
pub(crate) trait IoContext<T> {
    fn with_path(self, context: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn with_path(self, context: &'static str, path: &Path) -> Result<T> {
        self.map_err(|e| PackError::io(context, path, e))
    }
}
