//! Store-only ZIP archive writer.

pub mod dos_time;
pub mod writer;

pub use writer::{ArchiveEntry, ArchiveError, ArchiveWriter, DEFAULT_MODE};
