//! Static scopes tracked while parsing

use crate::error::InternalError;
use indexmap::IndexSet;
use la_arena::{Arena, Idx};

/// Unique identifier for a static scope
pub type ScopeId = Idx<StaticScope>;

/// What kind of frame a scope opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Method, class or module body, or the top level; lookups stop here
    Local,
    /// Block or lambda body; lookups continue into the parent
    Block,
}

/// One lexical scope
#[derive(Debug, Clone)]
pub struct StaticScope {
    /// Frame kind
    pub kind: ScopeKind,
    /// Enclosing scope (None for the root)
    pub parent: Option<ScopeId>,
    /// Declared names; insertion order is slot order
    pub variables: IndexSet<String>,
    /// `cmdarg` stack of the enclosing code, restored when the scope closes
    pub cmdarg_snapshot: u64,
}

/// Where a name was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Scope that declares the name
    pub scope: ScopeId,
    /// Kind of that scope
    pub kind: ScopeKind,
    /// How many scopes out from the current one
    pub depth: usize,
}

/// A scope that has just been popped
#[derive(Debug, Clone)]
pub struct ClosedScope {
    /// Frame kind
    #[cfg_attr(not(test), expect(dead_code, reason = "not yet read by the parser"))]
    pub kind: ScopeKind,
    /// `cmdarg` stack to restore
    pub cmdarg_snapshot: u64,
    /// Declared names in slot order
    pub locals: Vec<String>,
}

/// Stack of static scopes kept in an arena
#[derive(Debug)]
pub struct StaticScopes {
    scopes: Arena<StaticScope>,
    root: ScopeId,
    current: ScopeId,
}

impl StaticScopes {
    /// Start with a single top-level local scope
    pub fn new() -> Self {
        let mut scopes = Arena::default();
        let root = scopes.alloc(StaticScope {
            kind: ScopeKind::Local,
            parent: None,
            variables: IndexSet::new(),
            cmdarg_snapshot: 0,
        });
        Self {
            scopes,
            root,
            current: root,
        }
    }

    /// Innermost open scope
    pub fn current(&self) -> ScopeId {
        self.current
    }

    /// Top-level scope
    pub fn root(&self) -> ScopeId {
        self.root
    }

    /// Scope data
    #[expect(dead_code, reason = "not yet called by the parser")]
    pub fn get(&self, id: ScopeId) -> &StaticScope {
        &self.scopes[id]
    }

    /// Kind of the innermost scope
    pub fn current_kind(&self) -> ScopeKind {
        self.scopes[self.current].kind
    }

    /// Open a method, class or module scope
    pub fn push_local(&mut self, cmdarg: u64) -> ScopeId {
        self.push(ScopeKind::Local, cmdarg)
    }

    /// Open a block scope
    pub fn push_block(&mut self, cmdarg: u64) -> ScopeId {
        self.push(ScopeKind::Block, cmdarg)
    }

    fn push(&mut self, kind: ScopeKind, cmdarg: u64) -> ScopeId {
        let id = self.scopes.alloc(StaticScope {
            kind,
            parent: Some(self.current),
            variables: IndexSet::new(),
            cmdarg_snapshot: cmdarg,
        });
        self.current = id;
        id
    }

    /// Close the innermost scope
    ///
    /// # Errors
    /// Popping the top-level scope is a bookkeeping bug
    pub fn pop(&mut self) -> Result<ClosedScope, InternalError> {
        let scope = &self.scopes[self.current];
        let Some(parent) = scope.parent else {
            return Err(InternalError::ScopeUnderflow);
        };
        let closed = ClosedScope {
            kind: scope.kind,
            cmdarg_snapshot: scope.cmdarg_snapshot,
            locals: scope.variables.iter().cloned().collect(),
        };
        self.current = parent;
        Ok(closed)
    }

    /// Find `name` starting at the current scope
    ///
    /// Block scopes look through to their parent; a local scope is the last
    /// one searched.
    pub fn resolve(&self, name: &str) -> Option<Resolution> {
        let mut current = Some(self.current);
        let mut depth = 0;
        while let Some(id) = current {
            let scope = &self.scopes[id];
            if scope.variables.contains(name) {
                return Some(Resolution {
                    scope: id,
                    kind: scope.kind,
                    depth,
                });
            }
            if scope.kind == ScopeKind::Local {
                return None;
            }
            current = scope.parent;
            depth += 1;
        }
        None
    }

    /// Whether `name` is declared in the innermost scope itself
    pub fn is_defined_in_current(&self, name: &str) -> bool {
        self.scopes[self.current].variables.contains(name)
    }

    /// Declare `name` in the innermost scope, returning its slot
    pub fn declare_in_current(&mut self, name: &str) -> usize {
        let variables = &mut self.scopes[self.current].variables;
        variables.insert_full(name.to_string()).0
    }

    /// Names declared in the innermost scope
    pub fn current_locals(&self) -> Vec<String> {
        self.scopes[self.current].variables.iter().cloned().collect()
    }
}

impl Default for StaticScopes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_sees_enclosing_locals() {
        let mut scopes = StaticScopes::new();
        scopes.push_local(0);
        scopes.declare_in_current("x");
        scopes.push_block(0);
        scopes.declare_in_current("y");

        let found = scopes.resolve("x").expect("captured");
        assert_eq!(found.kind, ScopeKind::Local);
        assert_eq!(found.depth, 1);
        assert_eq!(scopes.resolve("y").map(|found| found.depth), Some(0));
    }

    #[test]
    fn test_local_scope_is_a_barrier() {
        let mut scopes = StaticScopes::new();
        scopes.declare_in_current("top");
        scopes.push_local(0);
        assert!(scopes.resolve("top").is_none());
    }

    #[test]
    fn test_slots_follow_declaration_order() {
        let mut scopes = StaticScopes::new();
        assert_eq!(scopes.declare_in_current("a"), 0);
        assert_eq!(scopes.declare_in_current("b"), 1);
        assert_eq!(scopes.declare_in_current("a"), 0);
        assert_eq!(scopes.current_locals(), vec!["a", "b"]);
    }

    #[test]
    fn test_pop_restores_parent_and_underflows_at_root() {
        let mut scopes = StaticScopes::new();
        let root = scopes.root();
        scopes.push_block(0b101);
        scopes.declare_in_current("it");
        let closed = scopes.pop().expect("balanced");
        assert_eq!(closed.kind, ScopeKind::Block);
        assert_eq!(closed.cmdarg_snapshot, 0b101);
        assert_eq!(closed.locals, vec!["it"]);
        assert_eq!(scopes.current(), root);
        assert_eq!(scopes.pop().err(), Some(InternalError::ScopeUnderflow));
    }
}
