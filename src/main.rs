//! Main entry point for the appzip CLI application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use appzip::{publish_and_zip, verify_archive, ArchiveReader, Cli, EntryRecord};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let summary = publish_and_zip(&cli.project, &cli.output, &cli.dist)?;

    if cli.verify || cli.list {
        let entries = if cli.verify {
            verify_archive(&summary.archive).await?
        } else {
            ArchiveReader::open(&summary.archive)?.list_entries().await?
        };
        if cli.list {
            list_entries(&entries);
        }
    }

    if !cli.is_quiet() {
        if cli.verify {
            println!("Verified {} entries.", summary.entries);
        }
        println!("App package present in {}.", summary.archive.display());
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` overrides the `-v`/`-q` derived level.
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Print the archive contents as a table.
fn list_entries(entries: &[EntryRecord]) {
    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;

    for entry in entries {
        let (year, month, day) = entry.modified.date();
        let (hour, minute, _second) = entry.modified.time();
        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );
        total_uncompressed += entry.uncompressed_size;
        total_compressed += entry.compressed_size;
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {}  {:>21}  {} files",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        entries.len()
    );
}

/// Space saved by compression, as a right-aligned percentage
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 || compressed >= uncompressed {
        return format!("{:>4}%", 0);
    }
    format!("{:>4}%", 100 - compressed * 100 / uncompressed)
}
