//! Sink over any `std::io::Write`

use crate::core::{LoggerError, Result, Sink};
use std::io::Write;

/// Adapts a writer into a [`Sink`]; `sync` flushes the writer.
///
/// # Example
///
/// ```
/// use rust_secure_logger::{Sink, WriterSink};
///
/// let mut sink = WriterSink::new("vec", Vec::new());
/// sink.write(b"line\n").unwrap();
/// assert_eq!(sink.into_inner(), b"line\n");
/// ```
#[derive(Debug)]
pub struct WriterSink<W: Write + Send> {
    name: String,
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.writer
            .write_all(buf)
            .map_err(|e| LoggerError::sink(self.name.as_str(), e))?;
        Ok(buf.len())
    }

    fn sync(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| LoggerError::sink(self.name.as_str(), e))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
