//! Sink trait for log output destinations

use super::error::Result;

/// A destination for encoded log lines.
///
/// The logger hands each sink one complete line per `write` call and
/// serializes calls into a sink behind a mutex, so implementations need not
/// be thread-safe themselves.
pub trait Sink: Send {
    /// Write the whole buffer; returns the number of bytes written
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Push everything written so far to durable storage
    fn sync(&mut self) -> Result<()>;

    /// Final flush before the logger lets go of the sink
    fn close(&mut self) -> Result<()> {
        self.sync()
    }

    fn name(&self) -> &str;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn sync(&mut self) -> Result<()> {
        (**self).sync()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
