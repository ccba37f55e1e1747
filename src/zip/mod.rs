//! ZIP archive writing and reading.
//!
//! - [`structures`]: on-disk records (EOCD, headers, DOS timestamps)
//! - [`writer`]: streaming DEFLATE writer used to build the artifact
//! - [`parser`]: central directory parsing from any [`ReadAt`](crate::io::ReadAt) source
//! - [`reader`]: entry decompression and artifact verification
//!
//! Only single-disk archives without encryption are handled. The writer
//! produces classic (non-ZIP64) archives; the reader accepts ZIP64.

mod parser;
mod reader;
mod structures;
mod writer;

pub use parser::ZipParser;
pub use reader::{verify_archive, ArchiveReader};
pub use structures::{CompressionMethod, DosDateTime, EntryRecord};
pub use writer::ArchiveWriter;
