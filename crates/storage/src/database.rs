//! Database directories
//!
//! A [`Database`] is a directory of tables. It lists, creates and opens
//! tables, summarises them, and checks the whole directory out as a tar
//! archive. None of this touches record bytes beyond what [`Table`] does.

use crate::archive::{ArchiveCompression, ArchiveInfo, ArchiveWriter};
use crate::config::StoreConfig;
use crate::header::TableHeader;
use crate::paths::DatabasePaths;
use crate::table::{OpenMode, OpenOptions, Table};
use recstore_core::{Error, Result};
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info};

/// Access mode of a database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbMode {
    /// Existing database, tables open read-only or for append
    #[default]
    Read,
    /// Database is created if missing and tables can be created
    Write,
}

/// Summary of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    /// Table name
    pub name: String,
    /// Data file size in bytes
    pub file_size: u64,
    /// Whole records in the data file
    pub nrecords: usize,
    /// Bytes per record
    pub record_size: usize,
    /// Composite format
    pub format: String,
}

/// An open database directory
#[derive(Debug, Clone)]
pub struct Database {
    paths: DatabasePaths,
    mode: DbMode,
    config: StoreConfig,
}

impl Database {
    /// Open the database at `path` with the default configuration
    pub fn open(path: impl AsRef<Path>, mode: DbMode) -> Result<Self> {
        Self::open_with_config(path, mode, StoreConfig::default())
    }

    /// Open the database at `path`
    ///
    /// In [`DbMode::Write`] a missing directory is created; in
    /// [`DbMode::Read`] it is an error.
    pub fn open_with_config(
        path: impl AsRef<Path>,
        mode: DbMode,
        config: StoreConfig,
    ) -> Result<Self> {
        config.validate()?;
        let paths = DatabasePaths::from_root(path);
        if !paths.exists() {
            match mode {
                DbMode::Read => {
                    return Err(Error::DatabaseNotFound {
                        path: paths.root().to_path_buf(),
                    })
                }
                DbMode::Write => {
                    fs::create_dir_all(paths.root())?;
                    info!(path = %paths.root().display(), "Created database directory");
                }
            }
        }
        debug!(path = %paths.root().display(), ?mode, "Opened database");
        Ok(Database {
            paths,
            mode,
            config,
        })
    }

    /// Database directory
    pub fn path(&self) -> &Path {
        self.paths.root()
    }

    /// Access mode
    pub fn mode(&self) -> DbMode {
        self.mode
    }

    /// Active configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Names of all tables, sorted
    pub fn list_tables(&self) -> Result<Vec<String>> {
        self.paths.table_names()
    }

    /// Create table `name` described by `header`
    ///
    /// Creating a table that already exists does nothing. The header is
    /// validated before anything is written.
    pub fn create_table(&self, name: &str, header: &TableHeader) -> Result<()> {
        if self.mode != DbMode::Write {
            return Err(Error::InvalidOperation(format!(
                "cannot create table '{}' in a database opened read-only",
                name
            )));
        }
        let paths = self.paths.table(name)?;
        if paths.data().exists() {
            debug!(table = name, "Table already exists");
            return Ok(());
        }

        let endian = header
            .declared_endian()?
            .unwrap_or(self.config.default_endian);
        let schema = header.schema(endian)?;
        if schema.is_empty() {
            return Err(Error::schema(format!("table '{}' declares no fields", name)));
        }

        File::create(paths.data())?;
        header.store(paths.header())?;
        info!(
            table = name,
            format = %schema.format(),
            record_size = schema.record_size(),
            "Created table"
        );
        Ok(())
    }

    /// Open table `name`
    pub fn open_table(&self, name: &str, options: impl Into<OpenOptions>) -> Result<Table> {
        let options = options.into();
        if options.mode() == OpenMode::Append && self.mode != DbMode::Write {
            return Err(Error::InvalidOperation(format!(
                "cannot append to table '{}' in a database opened read-only",
                name
            )));
        }
        Table::open(self.paths.root(), name, &options, &self.config)
    }

    /// Summary of every table, sorted by name
    pub fn info(&self) -> Result<Vec<TableInfo>> {
        self.list_tables()?
            .into_iter()
            .map(|name| {
                let table = self.open_table(&name, OpenMode::Read)?;
                let info = TableInfo {
                    file_size: table.file_size()?,
                    nrecords: table.nrecords()?,
                    record_size: table.record_size(),
                    format: table.format(),
                    name,
                };
                table.close()?;
                Ok(info)
            })
            .collect()
    }

    /// Write an uncompressed tar archive of the database to `saveto`
    pub fn checkout(&self, saveto: impl AsRef<Path>) -> Result<ArchiveInfo> {
        self.checkout_with(saveto, ArchiveCompression::None)
    }

    /// Write a tar archive of the database to `saveto` with `compression`
    pub fn checkout_with(
        &self,
        saveto: impl AsRef<Path>,
        compression: ArchiveCompression,
    ) -> Result<ArchiveInfo> {
        ArchiveWriter::new(self.paths.root())
            .with_compression(compression)
            .write(saveto)
    }
}
