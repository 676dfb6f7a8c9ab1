//! In-memory named byte buffers presented to a module as files.

use std::collections::BTreeMap;

/// Contents of one virtual file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualFile {
    data: Vec<u8>,
}

impl VirtualFile {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Flat directory of virtual files keyed by name.
///
/// Names are plain file names with no path separators; the directory is the
/// module's only view of a filesystem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualDirectory {
    files: BTreeMap<String, VirtualFile>,
}

impl VirtualDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a file.
    pub fn write(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files
            .insert(name.into(), VirtualFile::new(data.into()));
    }

    #[must_use]
    pub fn read(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(VirtualFile::data)
    }

    /// Remove a file and return its contents.
    pub fn take(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.remove(name).map(VirtualFile::into_data)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.data()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
