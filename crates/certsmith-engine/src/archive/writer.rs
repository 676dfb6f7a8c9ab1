//! ZIP writer using the store method only.
//!
//! Output layout: one local header plus raw content per entry, then the
//! central directory, then the end-of-central-directory record. Every entry
//! carries the same build timestamp.

use chrono::{Local, NaiveDateTime};

use super::dos_time::DosDateTime;

/// Regular file, rw-r--r--.
pub const DEFAULT_MODE: u32 = 0o100_644;

const LOCAL_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const CENTRAL_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x01, 0x02];
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];

/// APPNOTE version 3.0, host Unix.
const VERSION_MADE_BY: [u8; 2] = [0x1E, 0x03];
const VERSION_NEEDED: u16 = 10;

const LOCAL_HEADER_LEN: u64 = 30;
const CENTRAL_HEADER_LEN: u64 = 46;
const END_RECORD_LEN: u64 = 22;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ArchiveError {
    #[error("archive entry path is empty")]
    EmptyPath,

    #[error("archive entry path is {0} bytes; the limit is 65535")]
    PathTooLong(usize),

    #[error("archive entry '{path}' is {size} bytes; the limit is 4294967295")]
    EntryTooLarge { path: String, size: usize },

    #[error("archive cannot hold more than 65535 entries")]
    TooManyEntries,

    #[error("archive would exceed 4 GiB")]
    ArchiveTooLarge,
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// One file to store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub data: Vec<u8>,
    pub mode: u32,
}

/// Collects entries in order and serializes them into a ZIP byte stream.
#[derive(Debug, Default)]
pub struct ArchiveWriter {
    entries: Vec<ArchiveEntry>,
    size: u64,
}

impl ArchiveWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a regular file with [`DEFAULT_MODE`].
    ///
    /// # Errors
    ///
    /// See [`ArchiveWriter::add_file_with_mode`].
    pub fn add_file(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Result<()> {
        self.add_file_with_mode(path, data, DEFAULT_MODE)
    }

    /// Add a file with an explicit Unix mode.
    ///
    /// # Errors
    ///
    /// Rejects entries the format cannot describe: an empty or over-long
    /// path, content over `u32::MAX` bytes, a 65536th entry, or an archive
    /// whose offsets would overflow 32 bits.
    pub fn add_file_with_mode(
        &mut self,
        path: impl Into<String>,
        data: impl Into<Vec<u8>>,
        mode: u32,
    ) -> Result<()> {
        let path = path.into();
        let data = data.into();

        if path.is_empty() {
            return Err(ArchiveError::EmptyPath);
        }
        if u16::try_from(path.len()).is_err() {
            return Err(ArchiveError::PathTooLong(path.len()));
        }
        if u32::try_from(data.len()).is_err() {
            return Err(ArchiveError::EntryTooLarge {
                path,
                size: data.len(),
            });
        }
        if self.entries.len() >= usize::from(u16::MAX) {
            return Err(ArchiveError::TooManyEntries);
        }

        let path_len = path.len() as u64;
        let added = LOCAL_HEADER_LEN + CENTRAL_HEADER_LEN + 2 * path_len + data.len() as u64;
        let size = self.size + added;
        if size + END_RECORD_LEN > u64::from(u32::MAX) {
            return Err(ArchiveError::ArchiveTooLarge);
        }

        self.size = size;
        self.entries.push(ArchiveEntry { path, data, mode });
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Serialize, stamping entries with the local wall clock.
    ///
    /// # Errors
    ///
    /// See [`ArchiveWriter::finish_at`].
    pub fn finish(&self) -> Result<Vec<u8>> {
        self.finish_at(&Local::now().naive_local())
    }

    /// Serialize, stamping entries with `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::ArchiveTooLarge`] if an offset overflows; the
    /// size checks in `add_file_with_mode` normally rule this out.
    pub fn finish_at(&self, timestamp: &NaiveDateTime) -> Result<Vec<u8>> {
        let stamp = DosDateTime::from_datetime(timestamp);
        let capacity = usize::try_from(self.size + END_RECORD_LEN)
            .map_err(|_| ArchiveError::ArchiveTooLarge)?;
        let mut out = Vec::with_capacity(capacity);
        let mut central = Vec::new();

        for entry in &self.entries {
            let offset = to_u32(out.len())?;
            let header = common_header(entry, stamp)?;

            out.extend_from_slice(&LOCAL_HEADER_SIGNATURE);
            out.extend_from_slice(&header);
            out.extend_from_slice(entry.path.as_bytes());
            out.extend_from_slice(&entry.data);

            central.extend_from_slice(&CENTRAL_HEADER_SIGNATURE);
            central.extend_from_slice(&VERSION_MADE_BY);
            central.extend_from_slice(&header);
            central.extend_from_slice(&0u16.to_le_bytes()); // comment length
            central.extend_from_slice(&0u16.to_le_bytes()); // disk number
            central.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
            central.extend_from_slice(&(entry.mode << 16).to_le_bytes());
            central.extend_from_slice(&offset.to_le_bytes());
            central.extend_from_slice(entry.path.as_bytes());
        }

        let central_offset = to_u32(out.len())?;
        let central_len = to_u32(central.len())?;
        let count = u16::try_from(self.entries.len()).map_err(|_| ArchiveError::TooManyEntries)?;
        out.extend_from_slice(&central);

        out.extend_from_slice(&END_OF_CENTRAL_DIRECTORY_SIGNATURE);
        out.extend_from_slice(&0u16.to_le_bytes()); // this disk
        out.extend_from_slice(&0u16.to_le_bytes()); // disk with central directory
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&central_len.to_le_bytes());
        out.extend_from_slice(&central_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // comment length

        tracing::debug!(
            entries = self.entries.len(),
            bytes = out.len(),
            "Archive written"
        );
        Ok(out)
    }
}

/// The 26 bytes shared by the local and central headers.
fn common_header(entry: &ArchiveEntry, stamp: DosDateTime) -> Result<[u8; 26]> {
    let size = to_u32(entry.data.len())?;
    let name_len = u16::try_from(entry.path.len())
        .map_err(|_| ArchiveError::PathTooLong(entry.path.len()))?;

    let mut header = [0u8; 26];
    header[0..2].copy_from_slice(&VERSION_NEEDED.to_le_bytes());
    // flags [2..4] and compression [4..6] stay zero
    header[6..8].copy_from_slice(&stamp.time.to_le_bytes());
    header[8..10].copy_from_slice(&stamp.date.to_le_bytes());
    header[10..14].copy_from_slice(&crc32fast::hash(&entry.data).to_le_bytes());
    header[14..18].copy_from_slice(&size.to_le_bytes());
    header[18..22].copy_from_slice(&size.to_le_bytes());
    header[22..24].copy_from_slice(&name_len.to_le_bytes());
    // extra field length [24..26] stays zero
    Ok(header)
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| ArchiveError::ArchiveTooLarge)
}
