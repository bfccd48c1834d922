use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use engine_logging::engine_info;
use tempfile::NamedTempFile;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::archive::{ArchiveError, ArchiveWriter};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Zip archive streamed into a temp file and moved to `{dir}/{filename}` on close.
pub struct ZipArchiveWriter {
    target: PathBuf,
    zip: Option<ZipWriter<NamedTempFile>>,
    options: SimpleFileOptions,
}

impl ZipArchiveWriter {
    pub fn create(dir: &Path, filename: &str) -> Result<Self, ArchiveError> {
        ensure_output_dir(dir)?;
        let tmp = NamedTempFile::new_in(dir).map_err(PersistError::from)?;
        Ok(Self {
            target: dir.join(filename),
            zip: Some(ZipWriter::new(tmp)),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        })
    }

    pub fn path(&self) -> &Path {
        &self.target
    }
}

impl ArchiveWriter for ZipArchiveWriter {
    fn add_file(&mut self, path: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        let zip = self.zip.as_mut().ok_or(ArchiveError::Closed)?;
        zip.start_file(path, self.options)?;
        zip.write_all(bytes).map_err(PersistError::from)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), ArchiveError> {
        let Some(zip) = self.zip.take() else {
            return Ok(());
        };
        let mut tmp = zip.finish()?;
        tmp.flush().map_err(PersistError::from)?;
        tmp.as_file_mut().sync_all().map_err(PersistError::from)?;

        // Replace existing file if present to keep determinism.
        if self.target.exists() {
            fs::remove_file(&self.target).map_err(PersistError::from)?;
        }
        tmp.persist(&self.target)
            .map_err(|e| PersistError::Io(e.error))?;
        engine_info!("Wrote {}", self.target.display());
        Ok(())
    }
}
