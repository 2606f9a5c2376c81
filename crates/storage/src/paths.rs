//! Database directory structure
//!
//! A database is a plain directory holding one pair of files per table:
//!
//! ```text
//! db/
//! ├── weather.data     # records, back to back, no header or footer
//! ├── weather.header   # JSON: field list plus free-form metadata
//! ├── spectra.data
//! └── spectra.header
//! ```

use recstore_core::{Error, Result};
use std::path::{Path, PathBuf};

/// Extension of record files
pub const DATA_EXTENSION: &str = "data";

/// Extension of header files
pub const HEADER_EXTENSION: &str = "header";

/// Paths of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePaths {
    data: PathBuf,
    header: PathBuf,
}

impl TablePaths {
    /// Paths of table `name` inside `dir`
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Self {
        let dir = dir.as_ref();
        TablePaths {
            data: dir.join(format!("{}.{}", name, DATA_EXTENSION)),
            header: dir.join(format!("{}.{}", name, HEADER_EXTENSION)),
        }
    }

    /// Record file
    pub fn data(&self) -> &Path {
        &self.data
    }

    /// Header file
    pub fn header(&self) -> &Path {
        &self.header
    }

    /// A table exists when both files are present
    pub fn exists(&self) -> bool {
        self.data.is_file() && self.header.is_file()
    }
}

/// Database directory paths
#[derive(Debug, Clone)]
pub struct DatabasePaths {
    root: PathBuf,
}

impl DatabasePaths {
    /// Create paths from root directory
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        DatabasePaths {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root database directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if the database directory exists
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Paths of one table
    pub fn table(&self, name: &str) -> Result<TablePaths> {
        validate_table_name(name)?;
        Ok(TablePaths::new(&self.root, name))
    }

    /// Stems of every `*.data` file, sorted
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(DATA_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn validate_table_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if invalid {
        return Err(Error::InvalidOperation(format!(
            "invalid table name '{}'",
            name
        )));
    }
    Ok(())
}
