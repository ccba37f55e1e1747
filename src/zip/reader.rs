use flate2::read::DeflateDecoder;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::io::{FileSource, ReadAt};
use anyhow::{bail, Result};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, EntryRecord};

/// Reads entries back out of an archive
pub struct ArchiveReader<R: ReadAt> {
    parser: ZipParser<R>,
}

impl ArchiveReader<FileSource> {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Arc::new(FileSource::open(path)?)))
    }
}

impl<R: ReadAt> ArchiveReader<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all entries in the archive
    pub async fn list_entries(&self) -> Result<Vec<EntryRecord>> {
        self.parser.list_entries().await
    }

    /// Read and decompress an entry, checking its size and CRC-32
    pub async fn read_entry(&self, entry: &EntryRecord) -> Result<Vec<u8>> {
        let data_offset = self.parser.data_offset(entry).await?;
        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser.reader().read_at(data_offset, &mut raw).await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
                DeflateDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
                out
            }
            CompressionMethod::Unknown(method) => {
                bail!(
                    "Unsupported compression method {method} for {}",
                    entry.file_name
                )
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "Size mismatch for {}: expected {} bytes, got {}",
                entry.file_name,
                entry.uncompressed_size,
                data.len()
            );
        }

        let mut crc = flate2::Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            bail!("CRC mismatch for {}", entry.file_name);
        }

        Ok(data)
    }
}

/// Open an archive and check that every entry decompresses intact.
///
/// Returns the entry list on success.
pub async fn verify_archive(path: &Path) -> Result<Vec<EntryRecord>> {
    let reader = ArchiveReader::open(path)?;
    let entries = reader.list_entries().await?;
    for entry in entries.iter().filter(|e| !e.is_directory) {
        reader.read_entry(entry).await?;
    }
    Ok(entries)
}
