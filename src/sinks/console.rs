//! Console sink

use crate::core::{LoggerError, Result, Sink};
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
}

/// Writes lines to stdout or stderr, holding the stream lock for each line
#[derive(Debug)]
pub struct ConsoleSink {
    target: ConsoleTarget,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self {
            target: ConsoleTarget::Stdout,
        }
    }

    pub fn stderr() -> Self {
        Self {
            target: ConsoleTarget::Stderr,
        }
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }

    fn map_err(&self, e: io::Error) -> LoggerError {
        LoggerError::sink(self.name(), e)
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Sink for ConsoleSink {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let result = match self.target {
            ConsoleTarget::Stdout => io::stdout().lock().write_all(buf),
            ConsoleTarget::Stderr => io::stderr().lock().write_all(buf),
        };
        result.map_err(|e| self.map_err(e))?;
        Ok(buf.len())
    }

    fn sync(&mut self) -> Result<()> {
        let result = match self.target {
            ConsoleTarget::Stdout => io::stdout().flush(),
            ConsoleTarget::Stderr => io::stderr().flush(),
        };
        result.map_err(|e| self.map_err(e))
    }

    fn name(&self) -> &str {
        match self.target {
            ConsoleTarget::Stdout => "stdout",
            ConsoleTarget::Stderr => "stderr",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(ConsoleSink::stdout().name(), "stdout");
        assert_eq!(ConsoleSink::stderr().name(), "stderr");
        assert_eq!(ConsoleSink::default().target(), ConsoleTarget::Stdout);
    }

    #[test]
    fn test_stderr_write_and_sync() {
        let mut sink = ConsoleSink::stderr();
        assert_eq!(sink.write(b"console sink test\n").unwrap(), 18);
        sink.sync().unwrap();
    }
}
