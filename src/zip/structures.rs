use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Datelike, Timelike, Utc};

use anyhow::{bail, Result};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl From<u16> for CompressionMethod {
    fn from(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }
}

impl From<CompressionMethod> for u16 {
    fn from(method: CompressionMethod) -> Self {
        match method {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => v,
        }
    }
}

/// MS-DOS packed date and time, as stored in ZIP headers.
///
/// Two-second resolution, years 1980 through 2107, no time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// 1980-01-01 00:00:00, the earliest representable instant
    pub const EPOCH: Self = Self {
        time: 0,
        date: (1 << 5) | 1,
    };

    /// 2107-12-31 23:59:58
    pub const MAX: Self = Self {
        time: (23 << 11) | (59 << 5) | 29,
        date: (127 << 9) | (12 << 5) | 31,
    };

    /// Convert a system time, read as UTC. Out-of-range values are clamped.
    pub fn from_system_time(time: SystemTime) -> Self {
        let secs = match time.duration_since(UNIX_EPOCH) {
            Ok(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
            Err(_) => return Self::EPOCH,
        };
        let Some(t) = DateTime::<Utc>::from_timestamp(secs, 0) else {
            return Self::MAX;
        };

        if t.year() < 1980 {
            return Self::EPOCH;
        }
        if t.year() > 2107 {
            return Self::MAX;
        }

        Self {
            time: ((t.hour() << 11) | (t.minute() << 5) | (t.second() / 2)) as u16,
            date: (((t.year() - 1980) as u16) << 9) | ((t.month() as u16) << 5) | t.day() as u16,
        }
    }

    /// (year, month, day)
    pub fn date(&self) -> (u16, u8, u8) {
        let day = (self.date & 0x1F) as u8;
        let month = ((self.date >> 5) & 0x0F) as u8;
        let year = ((self.date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// (hour, minute, second)
    pub fn time(&self) -> (u8, u8, u8) {
        let second = ((self.time & 0x1F) * 2) as u8;
        let minute = ((self.time >> 5) & 0x3F) as u8;
        let hour = ((self.time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    /// Single-disk record without comment.
    pub fn new(entries: u16, cd_size: u32, cd_offset: u32) -> Self {
        Self {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: entries,
            total_entries: entries,
            cd_size,
            cd_offset,
            comment_len: 0,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid End of Central Directory");
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(Self::SIGNATURE)?;
        w.write_u16::<LittleEndian>(self.disk_number)?;
        w.write_u16::<LittleEndian>(self.disk_with_cd)?;
        w.write_u16::<LittleEndian>(self.disk_entries)?;
        w.write_u16::<LittleEndian>(self.total_entries)?;
        w.write_u32::<LittleEndian>(self.cd_size)?;
        w.write_u32::<LittleEndian>(self.cd_offset)?;
        w.write_u16::<LittleEndian>(self.comment_len)
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EOCDLocator {
    pub eocd64_offset: u64,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid ZIP64 format");
        }

        // Skip the disk holding the ZIP64 EOCD
        let mut cursor = Cursor::new(&data[8..]);

        Ok(Self {
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
pub struct Zip64EOCD {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            bail!("Invalid ZIP64 format");
        }

        // Skip record size, versions and disk numbers
        let mut cursor = Cursor::new(&data[24..]);
        let _disk_entries = cursor.read_u64::<LittleEndian>()?;

        Ok(Self {
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Offset of the CRC-32 field inside a local file header
pub const LFH_CRC_OFFSET: u64 = 14;

/// Version 2.0: deflate and directories
pub const VERSION_NEEDED: u16 = 20;

/// General purpose flag bit 11: file name is UTF-8
pub const FLAG_UTF8: u16 = 1 << 11;

/// One archive member, as described by the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub modified: DosDateTime,
    pub is_directory: bool,
}

impl EntryRecord {
    /// Write the local file header. Sizes and CRC are written as recorded,
    /// so a streaming writer patches them once the data is known.
    pub fn write_local_header<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(LFH_SIGNATURE)?;
        w.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        w.write_u16::<LittleEndian>(FLAG_UTF8)?;
        w.write_u16::<LittleEndian>(self.compression_method.into())?;
        w.write_u16::<LittleEndian>(self.modified.time)?;
        w.write_u16::<LittleEndian>(self.modified.date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(narrow(self.compressed_size)?)?;
        w.write_u32::<LittleEndian>(narrow(self.uncompressed_size)?)?;
        w.write_u16::<LittleEndian>(self.name_len()?)?;
        w.write_u16::<LittleEndian>(0)?;
        w.write_all(self.file_name.as_bytes())
    }

    pub fn write_central_header<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(CDFH_SIGNATURE)?;
        w.write_u16::<LittleEndian>(VERSION_NEEDED)?; // made by: MS-DOS, 2.0
        w.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        w.write_u16::<LittleEndian>(FLAG_UTF8)?;
        w.write_u16::<LittleEndian>(self.compression_method.into())?;
        w.write_u16::<LittleEndian>(self.modified.time)?;
        w.write_u16::<LittleEndian>(self.modified.date)?;
        w.write_u32::<LittleEndian>(self.crc32)?;
        w.write_u32::<LittleEndian>(narrow(self.compressed_size)?)?;
        w.write_u32::<LittleEndian>(narrow(self.uncompressed_size)?)?;
        w.write_u16::<LittleEndian>(self.name_len()?)?;
        w.write_u16::<LittleEndian>(0)?; // extra field
        w.write_u16::<LittleEndian>(0)?; // comment
        w.write_u16::<LittleEndian>(0)?; // disk number start
        w.write_u16::<LittleEndian>(0)?; // internal attributes
        w.write_u32::<LittleEndian>(0)?; // external attributes
        w.write_u32::<LittleEndian>(narrow(self.lfh_offset)?)?;
        w.write_all(self.file_name.as_bytes())
    }

    fn name_len(&self) -> io::Result<u16> {
        u16::try_from(self.file_name.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("entry name too long: {}", self.file_name),
            )
        })
    }
}

/// Fit a size or offset into a 32-bit header field.
pub(crate) fn narrow(value: u64) -> io::Result<u32> {
    u32::try_from(value).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "archive exceeds 4 GiB, which requires ZIP64",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn dos_time_from_system_time() {
        // 2024-02-29 12:34:56 UTC
        let t = UNIX_EPOCH + Duration::from_secs(1_709_210_096);
        let dos = DosDateTime::from_system_time(t);
        assert_eq!(dos.date(), (2024, 2, 29));
        assert_eq!(dos.time(), (12, 34, 56));
    }

    #[test]
    fn dos_time_clamps_out_of_range() {
        assert_eq!(DosDateTime::from_system_time(UNIX_EPOCH), DosDateTime::EPOCH);
        assert_eq!(DosDateTime::EPOCH.date(), (1980, 1, 1));

        let far = UNIX_EPOCH + Duration::from_secs(5_000_000_000);
        assert_eq!(DosDateTime::from_system_time(far), DosDateTime::MAX);
        assert_eq!(DosDateTime::MAX.date(), (2107, 12, 31));
        assert_eq!(DosDateTime::MAX.time(), (23, 59, 58));

        let before_unix_epoch = UNIX_EPOCH - Duration::from_secs(86_400);
        assert_eq!(
            DosDateTime::from_system_time(before_unix_epoch),
            DosDateTime::EPOCH
        );
    }

    #[test]
    fn dos_time_keeps_end_of_day_in_range() {
        // 2107-12-31 23:59:59 UTC
        let last = UNIX_EPOCH + Duration::from_secs(4_354_819_199);
        let dos = DosDateTime::from_system_time(last);
        assert_eq!(dos, DosDateTime::MAX);

        // 1980-01-01 00:00:01 UTC
        let first = UNIX_EPOCH + Duration::from_secs(315_532_801);
        assert_eq!(DosDateTime::from_system_time(first), DosDateTime::EPOCH);
    }

    #[test]
    fn eocd_written_is_parsed_back() {
        let mut buf = Vec::new();
        EndOfCentralDirectory::new(3, 150, 1024)
            .write_to(&mut buf)
            .unwrap();
        assert_eq!(buf.len(), EndOfCentralDirectory::SIZE);

        let eocd = EndOfCentralDirectory::from_bytes(&buf).unwrap();
        assert_eq!(eocd.total_entries, 3);
        assert_eq!(eocd.cd_size, 150);
        assert_eq!(eocd.cd_offset, 1024);
        assert!(!eocd.is_zip64());
    }

    #[test]
    fn local_header_layout() {
        let record = EntryRecord {
            file_name: "css/app.css".to_string(),
            compression_method: CompressionMethod::Deflate,
            compressed_size: 10,
            uncompressed_size: 20,
            crc32: 0xDEADBEEF,
            lfh_offset: 0,
            modified: DosDateTime::EPOCH,
            is_directory: false,
        };
        let mut buf = Vec::new();
        record.write_local_header(&mut buf).unwrap();

        assert_eq!(buf.len(), LFH_SIZE + record.file_name.len());
        assert_eq!(&buf[0..4], LFH_SIGNATURE);
        let crc_at = LFH_CRC_OFFSET as usize;
        assert_eq!(&buf[crc_at..crc_at + 4], &0xDEADBEEFu32.to_le_bytes());
        assert_eq!(&buf[LFH_SIZE..], b"css/app.css");
    }

    #[test]
    fn oversized_values_need_zip64() {
        assert!(narrow(u64::from(u32::MAX)).is_ok());
        assert!(narrow(u64::from(u32::MAX) + 1).is_err());
    }
}
