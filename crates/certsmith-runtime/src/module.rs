//! The execution-module seam: entry points, the module trait and the
//! instance that pairs a module with its virtual directory.

use std::fmt;
use std::time::Instant;

use crate::error::Result;
use crate::vfs::VirtualDirectory;

/// Exported entry points every module provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    Generate,
    Inspect,
    InspectWithKey,
}

impl EntryPoint {
    pub const ALL: [Self; 3] = [Self::Generate, Self::Inspect, Self::InspectWithKey];

    /// Export name in a compiled module.
    #[must_use]
    pub fn export_name(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Inspect => "inspect",
            Self::InspectWithKey => "inspect_with_key",
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.export_name())
    }
}

/// A module reachable only through named buffers and integer statuses.
pub trait ExecutionModule: Send {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Run `entry` against `dir` and return the raw status.
    ///
    /// # Errors
    ///
    /// Returns a [`RuntimeError`](crate::RuntimeError) only when the call
    /// itself could not complete (trap, I/O). Module-level failures are
    /// reported through the status.
    fn invoke(&mut self, entry: EntryPoint, dir: &mut VirtualDirectory) -> Result<i32>;
}

/// A module together with the virtual directory it operates on.
pub struct ModuleInstance {
    dir: VirtualDirectory,
    module: Box<dyn ExecutionModule>,
}

impl ModuleInstance {
    #[must_use]
    pub fn new(module: Box<dyn ExecutionModule>) -> Self {
        Self {
            dir: VirtualDirectory::new(),
            module,
        }
    }

    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.module.backend()
    }

    pub fn write_file(&mut self, name: &str, data: Vec<u8>) {
        self.dir.write(name, data);
    }

    #[must_use]
    pub fn read_file(&self, name: &str) -> Option<&[u8]> {
        self.dir.read(name)
    }

    /// Drop every file so no output of an earlier call survives.
    pub fn clear(&mut self) {
        self.dir.clear();
    }

    /// # Errors
    ///
    /// Propagates the module's [`RuntimeError`](crate::RuntimeError).
    pub fn invoke(&mut self, entry: EntryPoint) -> Result<i32> {
        let started = Instant::now();
        let status = self.module.invoke(entry, &mut self.dir)?;
        tracing::debug!(
            backend = self.module.backend(),
            entry = %entry,
            status,
            elapsed_ms = started.elapsed().as_millis(),
            "Module entry point returned"
        );
        Ok(status)
    }
}

impl fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("backend", &self.module.backend())
            .field("files", &self.dir.names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl ExecutionModule for Echo {
        fn backend(&self) -> &'static str {
            "echo"
        }

        fn invoke(&mut self, entry: EntryPoint, dir: &mut VirtualDirectory) -> Result<i32> {
            let input = dir.read("input").unwrap_or_default().to_vec();
            dir.write("cert", input);
            Ok(match entry {
                EntryPoint::Generate => 0,
                EntryPoint::Inspect => 101,
                EntryPoint::InspectWithKey => 403,
            })
        }
    }

    #[test]
    fn export_names_are_snake_case() {
        let names: Vec<_> = EntryPoint::ALL.iter().map(|e| e.export_name()).collect();
        assert_eq!(names, vec!["generate", "inspect", "inspect_with_key"]);
    }

    #[test]
    fn instance_routes_through_directory() {
        let mut instance = ModuleInstance::new(Box::new(Echo));
        instance.write_file("input", b"abc".to_vec());
        assert_eq!(instance.invoke(EntryPoint::Generate).unwrap(), 0);
        assert_eq!(instance.read_file("cert"), Some(&b"abc"[..]));
        assert_eq!(instance.invoke(EntryPoint::InspectWithKey).unwrap(), 403);
    }

    #[test]
    fn clear_drops_outputs() {
        let mut instance = ModuleInstance::new(Box::new(Echo));
        instance.write_file("input", b"abc".to_vec());
        instance.invoke(EntryPoint::Generate).unwrap();
        instance.clear();
        assert!(instance.read_file("cert").is_none());
        assert!(format!("{instance:?}").contains("echo"));
    }
}
