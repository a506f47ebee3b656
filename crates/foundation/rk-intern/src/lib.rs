//! String interning for symbols
//!
//! CST and IT nodes refer to names through [`Symbol`] handles. The interner is
//! cheap to clone; clones share the same table.

pub use lasso::Spur as Symbol;
use lasso::ThreadedRodeo;
use std::sync::Arc;
use std::fmt;

/// Shared string interner
#[derive(Clone)]
pub struct Interner {
    inner: Arc<ThreadedRodeo>,
}

impl Interner {
    /// Empty interner
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ThreadedRodeo::new()),
        }
    }

    /// Symbol for `text`, interning it if needed
    pub fn intern(&self, text: &str) -> Symbol {
        self.inner.get_or_intern(text)
    }

    /// Look up an already interned string without inserting it
    pub fn get(&self, text: &str) -> Option<Symbol> {
        self.inner.get(text)
    }

    /// Text of `sym`
    pub fn resolve(&self, sym: &Symbol) -> String {
        self.inner.resolve(sym).to_string()
    }

    /// Text of `sym`, if this interner produced it
    pub fn try_resolve(&self, sym: &Symbol) -> Option<String> {
        self.inner.try_resolve(sym).map(ToString::to_string)
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Interner {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Interner")
            .field("len", &self.inner.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_table() {
        let interner = Interner::new();
        let other = interner.clone();
        let sym = interner.intern("Iterator");
        assert_eq!(other.get("Iterator"), Some(sym));
        assert_eq!(other.resolve(&sym), "Iterator");
        assert_eq!(interner.get("missing"), None);
    }
}
