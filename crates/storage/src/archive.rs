//! Database checkout archives
//!
//! A checkout is a tar of every regular file in the database directory,
//! stored under `<dirname>/<file>`, optionally zstd-compressed. Entries are
//! sorted by name and carry a zero mtime, so checking out the same contents
//! twice yields identical archives.

use recstore_core::{Error, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tar::{Builder, Header};
use tracing::info;

/// Summary of a written archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    /// Archive location
    pub path: PathBuf,
    /// Number of files archived
    pub entry_count: usize,
    /// Size of the archive file
    pub size_bytes: u64,
}

/// Compression of a checkout archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveCompression {
    /// Plain tar
    #[default]
    None,
    /// zstd stream at the given level (`.tar.zst`)
    Zstd(i32),
}

/// Writes checkout archives of one database directory
pub struct ArchiveWriter {
    root: PathBuf,
    compression: ArchiveCompression,
}

impl ArchiveWriter {
    /// Writer for the database at `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        ArchiveWriter {
            root: root.as_ref().to_path_buf(),
            compression: ArchiveCompression::None,
        }
    }

    /// Compress the archive
    pub fn with_compression(mut self, compression: ArchiveCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Write the archive to `path`
    ///
    /// Either the complete archive is written or no file is left behind.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<ArchiveInfo> {
        let path = path.as_ref();
        let files = self.collect_files(path)?;
        let temp_path = path.with_extension("tmp");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        match self.write_inner(&files, &temp_path) {
            Ok(()) => {
                fs::rename(&temp_path, path)?;
                let info = ArchiveInfo {
                    path: path.to_path_buf(),
                    entry_count: files.len(),
                    size_bytes: fs::metadata(path)?.len(),
                };
                info!(
                    root = %self.root.display(),
                    path = %path.display(),
                    compression = ?self.compression,
                    entries = info.entry_count,
                    size_bytes = info.size_bytes,
                    "Checked out database"
                );
                Ok(info)
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }

    /// Regular files of the database, sorted, excluding the archive itself
    fn collect_files(&self, archive: &Path) -> Result<Vec<PathBuf>> {
        let archive = fs::canonicalize(archive).ok();
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let file = entry?.path();
            if !file.is_file() {
                continue;
            }
            if archive.is_some() && fs::canonicalize(&file).ok() == archive {
                continue;
            }
            files.push(file);
        }
        files.sort();
        Ok(files)
    }

    fn write_inner(&self, files: &[PathBuf], temp_path: &Path) -> Result<()> {
        let prefix = self
            .root
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("db"));

        let writer = BufWriter::new(File::create(temp_path)?);
        let mut writer = match self.compression {
            ArchiveCompression::None => append_files(writer, &prefix, files)?,
            ArchiveCompression::Zstd(level) => {
                let encoder = zstd::Encoder::new(writer, level)
                    .map_err(|e| Error::archive(format!("zstd encoder: {}", e)))?;
                append_files(encoder, &prefix, files)?
                    .finish()
                    .map_err(|e| Error::archive(format!("zstd finish: {}", e)))?
            }
        };
        writer.flush()?;
        Ok(())
    }
}

fn append_files<W: Write>(writer: W, prefix: &Path, files: &[PathBuf]) -> Result<W> {
    let mut builder = Builder::new(writer);
    for file in files {
        let name = file
            .file_name()
            .ok_or_else(|| Error::archive(format!("no file name in '{}'", file.display())))?;
        let data = fs::read(file)?;
        add_file(&mut builder, &prefix.join(name), &data)?;
    }
    builder
        .into_inner()
        .map_err(|e| Error::archive(format!("tar finish: {}", e)))
}

fn add_file<W: Write>(builder: &mut Builder<W>, path: &Path, data: &[u8]) -> Result<()> {
    let mut header = Header::new_gnu();
    header
        .set_path(path)
        .map_err(|e| Error::archive(format!("set path '{}': {}", path.display(), e)))?;
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();

    builder
        .append(&header, data)
        .map_err(|e| Error::archive(format!("append '{}': {}", path.display(), e)))?;
    Ok(())
}
