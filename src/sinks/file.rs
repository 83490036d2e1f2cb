//! File sink

use crate::core::{LoggerError, Result, Sink};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends lines to a file through a `BufWriter`.
///
/// Rotation is left to external tools: after they move the file away, call
/// [`reopen`](FileSink::reopen) to start writing to a fresh file at the same
/// path.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    name: String,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let name = format!("file:{}", path.display());
        let file = open_append(&path).map_err(|e| LoggerError::sink(name.as_str(), e))?;
        Ok(Self {
            path,
            name,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush the current file and open the path again
    pub fn reopen(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| self.map_err(e))?;
        }
        let file = open_append(&self.path).map_err(|e| self.map_err(e))?;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn map_err(&self, e: io::Error) -> LoggerError {
        LoggerError::sink(self.name.as_str(), e)
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        match self.writer {
            Some(ref mut writer) => Ok(writer),
            None => Err(LoggerError::Closed),
        }
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl Sink for FileSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let result = self.writer()?.write_all(buf);
        result.map_err(|e| self.map_err(e))?;
        Ok(buf.len())
    }

    fn sync(&mut self) -> Result<()> {
        let writer = self.writer()?;
        let result = writer.flush().and_then(|_| writer.get_ref().sync_data());
        result.map_err(|e| self.map_err(e))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            let result = writer.flush().and_then(|_| writer.get_ref().sync_data());
            result.map_err(|e| self.map_err(e))?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Some(ref mut writer) = self.writer {
            let _ = writer.flush();
        }
    }
}
