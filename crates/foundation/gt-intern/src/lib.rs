//! String interning for identifier names

pub use lasso::Spur as Symbol;
use lasso::ThreadedRodeo;
use std::fmt;
use std::sync::Arc;

/// Shared string interner.
///
/// Cloning is cheap; all clones intern into the same table.
#[derive(Clone, Default)]
pub struct Interner {
    inner: Arc<ThreadedRodeo>,
}

impl Interner {
    /// Create an empty interner
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning its symbol
    pub fn intern(&self, name: &str) -> Symbol {
        self.inner.get_or_intern(name)
    }

    /// Symbol for `name` if it was interned before
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.inner.get(name)
    }

    /// Text of an interned symbol
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.inner.resolve(&sym)
    }

    /// Text of a symbol that may belong to another interner
    pub fn try_resolve(&self, sym: Symbol) -> Option<&str> {
        self.inner.try_resolve(&sym)
    }

    /// Number of distinct strings interned so far
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether nothing has been interned
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interner").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable_across_clones() {
        let interner = Interner::new();
        let other = interner.clone();
        let first = interner.intern("each");
        let second = other.intern("each");
        assert_eq!(first, second);
        assert_eq!(other.resolve(first), "each");
        assert_eq!(interner.len(), 1);
        assert!(interner.get("times").is_none());
    }
}
