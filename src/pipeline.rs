//! End-to-end packaging: validate, stage, package.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::context::PackageContext;
use crate::error::{IoContext, Result};
use crate::package::{package_archive, remove_existing, PackageSummary};
use crate::stage::stage_from_manifest;

/// Stage the manifest's content roots into `dist_dir` and zip it together
/// with the project's `wwwroot` into `<output_dir>/<name>.zip`.
///
/// `output_dir` and `dist_dir` are raw arguments and go through quote
/// cleanup first.
pub fn publish_and_zip(
    project_file: &Path,
    output_dir: &str,
    dist_dir: &str,
) -> Result<PackageSummary> {
    let ctx = PackageContext::new(project_file, output_dir, dist_dir)?;
    run(&ctx)
}

/// Run the pipeline for an already validated context.
pub fn run(ctx: &PackageContext) -> Result<PackageSummary> {
    fs::create_dir_all(&ctx.output_dir)
        .with_path("failed to create output directory", &ctx.output_dir)?;

    let artifact = ctx.artifact_path();
    remove_existing(&artifact)?;

    let staged = stage_from_manifest(&ctx.manifest_path(), &ctx.dist_dir)?;
    info!(
        content_roots = staged.content_roots,
        files = staged.files,
        stale_staging_kept = staged.stale_staging_kept,
        "static web assets staged"
    );

    package_archive(&ctx.dist_dir, &ctx.wwwroot(), &artifact)
}
