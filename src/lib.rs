//! # appzip
//!
//! Packages a published web app build into a single zip archive.
//!
//! Libraries referenced by the app ship their static assets separately; the
//! build toolchain records them in a `<name>.StaticWebAssets.xml` manifest.
//! `appzip` runs three steps, in order:
//!
//! 1. [`manifest`]: read the `ContentRoot` mappings from the manifest
//! 2. [`stage`]: reset `dist/_content` and copy every content root into the dist tree
//! 3. [`package`]: zip the dist tree together with the project's `wwwroot`
//!
//! A missing manifest simply means there is nothing to stage.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let summary = appzip::publish_and_zip(
//!         Path::new("App/App.csproj"),
//!         "bin/package",
//!         "App/obj/publish/dist",
//!     )?;
//!     println!("{} entries in {}", summary.entries, summary.archive.display());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod context;
pub mod error;
pub mod io;
pub mod manifest;
pub mod package;
pub mod paths;
pub mod pipeline;
pub mod stage;
pub mod zip;

pub use cli::Cli;
pub use context::PackageContext;
pub use error::{PackError, Result};
pub use manifest::{parse_manifest, ContentRootMapping};
pub use package::{package_archive, PackageSummary};
pub use pipeline::publish_and_zip;
pub use stage::{stage_assets, stage_from_manifest, Cleanup, StageReport};
pub use zip::{verify_archive, ArchiveReader, ArchiveWriter, EntryRecord};
