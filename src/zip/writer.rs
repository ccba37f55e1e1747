//! Streaming ZIP archive writer.
//!
//! Each entry is written as a local file header with placeholder CRC and
//! sizes, followed by the DEFLATE stream. Once the data is written the
//! header fields are patched in place, which is why the sink must be
//! seekable. [`ArchiveWriter::finish`] appends the central directory and
//! the End of Central Directory record.
//!
//! Archives are limited to the classic format: at most 65535 entries and
//! 4 GiB of sizes and offsets. Exceeding either fails with an
//! [`io::ErrorKind::InvalidInput`] error.

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::DeflateEncoder;
use flate2::{Compression, CrcReader};
use std::io::{self, Read, Seek, SeekFrom, Write};

use super::structures::{
    narrow, CompressionMethod, DosDateTime, EndOfCentralDirectory, EntryRecord, LFH_CRC_OFFSET,
};

const MAX_ENTRIES: usize = 0xFFFF;

/// Writes entries into a ZIP archive.
pub struct ArchiveWriter<W: Write + Seek> {
    inner: W,
    entries: Vec<EntryRecord>,
    /// Position where the next local header starts
    offset: u64,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    pub fn new(mut inner: W) -> io::Result<Self> {
        let offset = inner.stream_position()?;
        Ok(Self {
            inner,
            entries: Vec::new(),
            offset,
        })
    }

    /// Entries written so far, in archive order.
    pub fn entries(&self) -> &[EntryRecord] {
        &self.entries
    }

    /// Compress everything `source` yields into a new entry named `name`.
    pub fn add_file<R: Read>(
        &mut self,
        name: &str,
        modified: DosDateTime,
        source: R,
    ) -> io::Result<&EntryRecord> {
        if self.entries.len() >= MAX_ENTRIES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "too many entries, archive would require ZIP64",
            ));
        }

        let mut record = EntryRecord {
            file_name: name.to_string(),
            compression_method: CompressionMethod::Deflate,
            compressed_size: 0,
            uncompressed_size: 0,
            crc32: 0,
            lfh_offset: narrow(self.offset)?.into(),
            modified,
            is_directory: false,
        };
        record.write_local_header(&mut self.inner)?;
        let data_start = self.inner.stream_position()?;

        let mut source = CrcReader::new(source);
        let mut encoder = DeflateEncoder::new(&mut self.inner, Compression::default());
        let uncompressed = io::copy(&mut source, &mut encoder)?;
        encoder.finish()?;

        let data_end = self.inner.stream_position()?;
        record.crc32 = source.crc().sum();
        record.uncompressed_size = uncompressed;
        record.compressed_size = data_end - data_start;

        self.inner
            .seek(SeekFrom::Start(record.lfh_offset + LFH_CRC_OFFSET))?;
        self.inner.write_u32::<LittleEndian>(record.crc32)?;
        self.inner
            .write_u32::<LittleEndian>(narrow(record.compressed_size)?)?;
        self.inner
            .write_u32::<LittleEndian>(narrow(record.uncompressed_size)?)?;
        self.inner.seek(SeekFrom::Start(data_end))?;

        self.offset = data_end;
        self.entries.push(record);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Write the central directory and return the underlying sink, flushed.
    pub fn finish(mut self) -> io::Result<W> {
        let cd_offset = self.offset;
        for record in &self.entries {
            record.write_central_header(&mut self.inner)?;
        }
        let cd_end = self.inner.stream_position()?;

        EndOfCentralDirectory::new(
            self.entries.len() as u16,
            narrow(cd_end - cd_offset)?,
            narrow(cd_offset)?,
        )
        .write_to(&mut self.inner)?;

        self.inner.flush()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::structures::{CDFH_SIGNATURE, LFH_SIGNATURE, LFH_SIZE};
    use flate2::read::DeflateDecoder;
    use std::io::Cursor;

    #[test]
    fn empty_archive_is_only_eocd() {
        let writer = ArchiveWriter::new(Cursor::new(Vec::new())).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert_eq!(bytes.len(), EndOfCentralDirectory::SIZE);
        let eocd = EndOfCentralDirectory::from_bytes(&bytes).unwrap();
        assert_eq!(eocd.total_entries, 0);
        assert_eq!(eocd.cd_offset, 0);
    }

    #[test]
    fn header_fields_are_patched_after_data() {
        let content = b"hello hello hello hello";
        let mut writer = ArchiveWriter::new(Cursor::new(Vec::new())).unwrap();
        let record = writer
            .add_file("index.html", DosDateTime::EPOCH, &content[..])
            .unwrap()
            .clone();
        let bytes = writer.finish().unwrap().into_inner();

        let mut crc = flate2::Crc::new();
        crc.update(content);
        assert_eq!(record.crc32, crc.sum());
        assert_eq!(record.uncompressed_size, content.len() as u64);

        assert_eq!(&bytes[0..4], LFH_SIGNATURE);
        let at = LFH_CRC_OFFSET as usize;
        assert_eq!(&bytes[at..at + 4], &record.crc32.to_le_bytes());
        assert_eq!(
            &bytes[at + 4..at + 8],
            &(record.compressed_size as u32).to_le_bytes()
        );
        assert_eq!(&bytes[at + 8..at + 12], &(content.len() as u32).to_le_bytes());

        let data_start = LFH_SIZE + "index.html".len();
        let data = &bytes[data_start..data_start + record.compressed_size as usize];
        let mut inflated = Vec::new();
        DeflateDecoder::new(data).read_to_end(&mut inflated).unwrap();
        assert_eq!(inflated, content);

        let cd_start = data_start + record.compressed_size as usize;
        assert_eq!(&bytes[cd_start..cd_start + 4], CDFH_SIGNATURE);
    }

    #[test]
    fn entries_are_laid_out_back_to_back() {
        let mut writer = ArchiveWriter::new(Cursor::new(Vec::new())).unwrap();
        writer
            .add_file("a.txt", DosDateTime::EPOCH, &b"first"[..])
            .unwrap();
        writer
            .add_file("dir/b.txt", DosDateTime::EPOCH, &b"second"[..])
            .unwrap();

        let entries = writer.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].lfh_offset, 0);
        assert_eq!(
            entries[1].lfh_offset,
            (LFH_SIZE + "a.txt".len()) as u64 + entries[0].compressed_size
        );
    }
}
