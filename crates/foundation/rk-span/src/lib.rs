//! Source files and locations
//!
//! Every CST declaration carries a [`SourceLocation`]; diagnostics are reported
//! as `(message, file, line, column)` so the file id has to be resolvable back
//! to a name through [`SourceFiles`].

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique identifier for a source file
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    /// File id used for synthesized entities that have no source text
    pub const BUILTIN: Self = Self(u32::MAX);

    /// Id with index `id`
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// A line/column position inside a source file (both 1-based)
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File the location is in
    pub file: FileId,
    /// One-based line
    pub line: u32,
    /// One-based column
    pub column: u32,
}

impl SourceLocation {
    /// Location at `line`:`column` of `file`
    pub fn new(file: FileId, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// Location of compiler-provided entities
    pub fn builtin() -> Self {
        Self {
            file: FileId::BUILTIN,
            line: 0,
            column: 0,
        }
    }

    /// Whether this is the builtin location
    pub fn is_builtin(&self) -> bool {
        self.file == FileId::BUILTIN
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Registry of source file names, indexed by [`FileId`]
#[derive(Debug, Clone, Default)]
pub struct SourceFiles {
    names: IndexSet<String>,
}

impl SourceFiles {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file name, returning the existing id if it is already known
    pub fn add(&mut self, name: impl Into<String>) -> FileId {
        let (index, _) = self.names.insert_full(name.into());
        FileId(index as u32)
    }

    /// Name of a registered file; builtin and unknown ids map to `<builtin>`
    pub fn name(&self, file: FileId) -> &str {
        self.names
            .get_index(file.0 as usize)
            .map_or("<builtin>", String::as_str)
    }

    /// Number of registered files
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no file is registered
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_registration_is_idempotent() {
        let mut files = SourceFiles::new();
        let first = files.add("a.rk");
        let second = files.add("b.rk");
        assert_ne!(first, second);
        assert_eq!(files.add("a.rk"), first);
        assert_eq!(files.name(second), "b.rk");
        assert_eq!(files.name(FileId::BUILTIN), "<builtin>");
    }
}
