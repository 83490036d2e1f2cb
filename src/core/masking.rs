//! Masking configuration for sensitive field values
//!
//! A [`MaskConfig`] decides, per dotted key path, whether a value must be
//! replaced by the redaction token when an entry is encoded. Masking is a
//! projection applied by the encoder: the entry and its fields are never
//! modified.
//!
//! Lookup order:
//!
//! 1. exact key paths (`password`, `user.password`), an O(1) set lookup
//! 2. patterns, tried in registration order against the full path; first match wins
//!
//! # Example
//!
//! ```
//! use rust_secure_logger::MaskConfig;
//!
//! let mut mask = MaskConfig::new();
//! mask.add_key("password");
//! mask.add_pattern(".*cardNumber$").unwrap();
//!
//! assert!(mask.is_masked("password"));
//! assert!(mask.is_masked("payment.cardNumber"));
//! assert!(!mask.is_masked("payment.cardNumberLast4"));
//! ```

use super::error::Result;
use super::pattern::MaskPattern;
use arc_swap::{ArcSwap, Guard};
use std::collections::HashSet;
use std::sync::Arc;

/// Redaction token used when none is configured
pub const DEFAULT_REPLACEMENT: &str = "****";

#[derive(Debug, Clone)]
pub struct MaskConfig {
    exact_keys: HashSet<String>,
    patterns: Vec<MaskPattern>,
    replacement: String,
}

impl MaskConfig {
    pub fn new() -> Self {
        Self {
            exact_keys: HashSet::new(),
            patterns: Vec::new(),
            replacement: DEFAULT_REPLACEMENT.to_string(),
        }
    }

    /// Mask the value at this exact key path
    pub fn add_key(&mut self, key: impl Into<String>) {
        self.exact_keys.insert(key.into());
    }

    /// Compile and register a pattern; malformed patterns fail here, never at log time
    pub fn add_pattern(&mut self, pattern: &str) -> Result<()> {
        self.patterns.push(MaskPattern::compile(pattern)?);
        Ok(())
    }

    pub fn set_replacement(&mut self, replacement: impl Into<String>) {
        self.replacement = replacement.into();
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.add_key(key);
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.add_pattern(pattern)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.set_replacement(replacement);
        self
    }

    pub fn remove_key(&mut self, key: &str) -> bool {
        self.exact_keys.remove(key)
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn exact_keys(&self) -> impl Iterator<Item = &str> {
        self.exact_keys.iter().map(String::as_str)
    }

    pub fn patterns(&self) -> &[MaskPattern] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.exact_keys.is_empty() && self.patterns.is_empty()
    }

    /// Whether the value at this full dotted path must be redacted
    #[inline]
    pub fn is_masked(&self, path: &str) -> bool {
        if self.exact_keys.contains(path) {
            return true;
        }
        self.patterns.iter().any(|p| p.is_match(path))
    }
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`MaskConfig`] shared between a logger and all of its children.
///
/// Readers take a lock-free snapshot; updates build a modified copy and swap
/// it in atomically, so an in-flight log call sees either the old or the new
/// configuration in full.
#[derive(Debug, Clone)]
pub struct SharedMaskConfig {
    inner: Arc<ArcSwap<MaskConfig>>,
}

impl SharedMaskConfig {
    pub fn new(config: MaskConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Current configuration as an owned handle
    #[inline]
    pub fn load(&self) -> Arc<MaskConfig> {
        self.inner.load_full()
    }

    /// Short-lived snapshot for the encode path; avoids touching the reference count
    #[inline]
    pub fn snapshot(&self) -> Guard<Arc<MaskConfig>> {
        self.inner.load()
    }

    /// Replace the configuration wholesale
    pub fn store(&self, config: MaskConfig) {
        self.inner.store(Arc::new(config));
    }

    /// Copy-on-write update.
    ///
    /// `f` is applied to a copy of the current configuration and may run more
    /// than once if another update races with this one. If it fails, nothing
    /// is swapped in.
    pub fn update<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut MaskConfig) -> Result<()>,
    {
        loop {
            let current = self.inner.load_full();
            let mut next = MaskConfig::clone(&current);
            f(&mut next)?;
            let previous = self.inner.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&*previous, &current) {
                return Ok(());
            }
        }
    }
}

impl Default for SharedMaskConfig {
    fn default() -> Self {
        Self::new(MaskConfig::new())
    }
}
