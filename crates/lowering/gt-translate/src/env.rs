//! Translation-time environments
//!
//! Every callable being lowered (top level, method, block, lambda, module
//! body) gets an [`Environment`] in an arena. Parent links are arena
//! indices; name resolution walks them outward through closures and stops
//! at the first method-like environment.

use crate::specialize::Specializer;
use gt_exec::{ExecGraph, FrameId, LocalSlot, MethodId, ReturnId};
use gt_intern::Symbol;
use la_arena::{Arena, Idx};

/// Unique identifier for a translation environment
pub type EnvId = Idx<Environment>;

/// One callable under translation
#[derive(Debug, Clone)]
pub struct Environment {
    /// Lexically enclosing environment
    pub parent: Option<EnvId>,
    /// Frame layout being filled in
    pub frame: FrameId,
    /// Callable metadata
    pub method: MethodId,
    /// What kind of callable this is
    pub specializer: Specializer,
    /// Where `return` inside this environment goes
    pub return_id: ReturnId,
    /// New locals assigned here are declared here rather than in the parent
    pub own_scope_for_assignments: bool,
    /// Assignments never look outward; every name is declared locally
    pub never_assign_in_parent: bool,
    /// Class variables resolve against `self` as if in the class body
    pub class_variables_as_if_in_class: bool,
    /// Flip-flop state slots owned by this environment, reset on entry
    pub flip_flops: Vec<LocalSlot>,
}

/// Arena of environments with a cursor on the one being lowered
#[derive(Debug)]
pub struct Environments {
    arena: Arena<Environment>,
    current: EnvId,
}

impl Environments {
    /// Start with `root` as the current environment
    pub fn new(root: Environment) -> Self {
        let mut arena = Arena::new();
        let current = arena.alloc(root);
        Self { arena, current }
    }

    /// Environment being lowered
    pub fn current(&self) -> EnvId {
        self.current
    }

    /// Environment data
    pub fn get(&self, id: EnvId) -> &Environment {
        &self.arena[id]
    }

    /// Mutable environment data
    pub fn get_mut(&mut self, id: EnvId) -> &mut Environment {
        &mut self.arena[id]
    }

    /// Current environment data
    pub fn current_env(&self) -> &Environment {
        &self.arena[self.current]
    }

    /// Enter a child environment of the current one
    pub fn push(&mut self, mut env: Environment) -> EnvId {
        env.parent = Some(self.current);
        let id = self.arena.alloc(env);
        self.current = id;
        id
    }

    /// Leave the current environment, returning to its parent
    pub fn pop(&mut self) -> Option<EnvId> {
        let parent = self.arena[self.current].parent?;
        let left = self.current;
        self.current = parent;
        Some(left)
    }

    /// Resolve `name` from the current environment
    ///
    /// Every frame crossed on the way to the declaring one records the name
    /// as a capture, so the runtime keeps its declaration frame alive.
    pub fn lookup(&self, graph: &mut ExecGraph, name: Symbol) -> Option<LocalSlot> {
        let mut crossed = Vec::new();
        let mut id = self.current;
        let mut depth = 0;
        loop {
            let env = &self.arena[id];
            if let Some(slot) = graph.frame(env.frame).slot_of(name) {
                for frame in crossed {
                    graph.frame_mut(frame).capture(name);
                }
                return Some(LocalSlot { depth, slot, name });
            }
            if !env.specializer.is_closure() {
                return None;
            }
            crossed.push(env.frame);
            id = env.parent?;
            depth += 1;
        }
    }

    /// Nearest environment, and its distance, that owns new assignments
    pub fn assignment_owner(&self) -> Option<(EnvId, u32)> {
        self.walk_until(|env| env.own_scope_for_assignments)
    }

    /// Nearest environment, and its distance, that is not a closure
    pub fn method_owner(&self) -> Option<(EnvId, u32)> {
        self.walk_until(|env| !env.specializer.is_closure())
    }

    fn walk_until(&self, mut found: impl FnMut(&Environment) -> bool) -> Option<(EnvId, u32)> {
        let mut id = self.current;
        let mut depth = 0;
        loop {
            let env = &self.arena[id];
            if found(env) {
                return Some((id, depth));
            }
            id = env.parent?;
            depth += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_exec::{Arity, FrameDescriptor, FrameKind, SharedMethodInfo};
    use gt_intern::Interner;
    use gt_span::Position;

    fn env(graph: &mut ExecGraph, specializer: Specializer, parent_frame: Option<FrameId>) -> Environment {
        let frame = graph.add_frame(FrameDescriptor::new(specializer.frame_kind(), parent_frame));
        let method = graph.add_method(SharedMethodInfo {
            name: "m".to_string(),
            arity: Arity::NONE,
            pos: Position::default(),
            is_block: specializer.is_closure(),
            lexical_frame: parent_frame,
        });
        Environment {
            parent: None,
            frame,
            method,
            specializer,
            return_id: ReturnId(1),
            own_scope_for_assignments: true,
            never_assign_in_parent: !specializer.is_closure(),
            class_variables_as_if_in_class: false,
            flip_flops: Vec::new(),
        }
    }

    #[test]
    fn test_lookup_marks_captures_up_to_owner() {
        let interner = Interner::new();
        let mut graph = ExecGraph::new(interner.clone());
        let x = interner.intern("x");

        let method = env(&mut graph, Specializer::Method, None);
        let method_frame = method.frame;
        graph.frame_mut(method_frame).declare(x);
        let mut envs = Environments::new(method);
        let outer = env(&mut graph, Specializer::Block, Some(method_frame));
        let outer_frame = outer.frame;
        envs.push(outer);
        let inner = env(&mut graph, Specializer::Block, Some(outer_frame));
        let inner_frame = inner.frame;
        envs.push(inner);

        let slot = envs.lookup(&mut graph, x).expect("resolves");
        assert_eq!((slot.depth, slot.slot), (2, 0));
        assert!(graph.frame(inner_frame).captures(x));
        assert!(graph.frame(outer_frame).captures(x));
        assert!(!graph.frame(method_frame).captures(x));
        assert_eq!(graph.frame(inner_frame).slot_of(x), None);
    }

    #[test]
    fn test_lookup_stops_at_method_barrier() {
        let interner = Interner::new();
        let mut graph = ExecGraph::new(interner.clone());
        let x = interner.intern("x");

        let top = env(&mut graph, Specializer::TopLevel, None);
        graph.frame_mut(top.frame).declare(x);
        let mut envs = Environments::new(top);
        let method = env(&mut graph, Specializer::Method, None);
        envs.push(method);

        assert!(envs.lookup(&mut graph, x).is_none());
        assert_eq!(envs.method_owner().map(|(_, depth)| depth), Some(0));
        assert!(envs.pop().is_some());
        assert!(envs.pop().is_none());
        assert_eq!(graph.frame(envs.current_env().frame).kind, FrameKind::TopLevel);
    }
}
