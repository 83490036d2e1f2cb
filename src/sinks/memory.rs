//! In-memory sink

use crate::core::{Result, Sink};
use parking_lot::Mutex;
use std::sync::Arc;

/// Collects lines in a shared buffer.
///
/// Clones share the same buffer, so one handle can be given to the logger
/// and another kept for reading.
///
/// # Example
///
/// ```
/// use rust_secure_logger::{MemorySink, Sink};
///
/// let sink = MemorySink::new();
/// let mut writer = sink.clone();
/// writer.write(b"{\"msg\":\"hi\"}\n").unwrap();
/// assert_eq!(sink.lines(), vec!["{\"msg\":\"hi\"}".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
    syncs: Arc<Mutex<usize>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().clone()
    }

    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Complete lines written so far, without their terminators
    pub fn lines(&self) -> Vec<String> {
        self.contents_string().lines().map(str::to_owned).collect()
    }

    /// Number of `sync` calls seen
    pub fn sync_count(&self) -> usize {
        *self.syncs.lock()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

impl Sink for MemorySink {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn sync(&mut self) -> Result<()> {
        *self.syncs.lock() += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_buffer() {
        let sink = MemorySink::new();
        let mut handle = sink.clone();
        handle.write(b"a\n").unwrap();
        handle.write(b"b\n").unwrap();
        handle.sync().unwrap();

        assert_eq!(sink.lines(), vec!["a", "b"]);
        assert_eq!(sink.sync_count(), 1);

        sink.clear();
        assert!(handle.contents().is_empty());
    }
}
