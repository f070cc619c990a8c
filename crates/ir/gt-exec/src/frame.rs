//! Frame descriptors and callable metadata

use crate::FrameId;
use derive_more::Display;
use gt_intern::Symbol;
use gt_span::Position;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier that routes a `return` to the method boundary that catches it
#[derive(Copy, Clone, Debug, Display, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ReturnId(pub u32);

/// What kind of lexical unit a frame belongs to
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum FrameKind {
    /// Script top level
    TopLevel,
    /// `def`
    Method,
    /// Block, lambda or `for` body
    Block,
    /// Class, module or singleton class body
    Module,
}

/// Slot layout of one runtime frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDescriptor {
    /// Owner kind
    pub kind: FrameKind,
    /// Lexically enclosing frame, for blocks
    pub parent: Option<FrameId>,
    slots: IndexSet<Symbol>,
    captures: IndexSet<Symbol>,
    /// Whether the frame must keep a link to its declaration frame at run time
    pub needs_declaration_frame: bool,
}

impl FrameDescriptor {
    /// An empty frame
    pub fn new(kind: FrameKind, parent: Option<FrameId>) -> Self {
        Self {
            kind,
            parent,
            slots: IndexSet::new(),
            captures: IndexSet::new(),
            needs_declaration_frame: false,
        }
    }

    /// Slot of `name`, adding it if it is new
    pub fn declare(&mut self, name: Symbol) -> u32 {
        self.slots.insert_full(name).0 as u32
    }

    /// Slot of `name` if declared here
    pub fn slot_of(&self, name: Symbol) -> Option<u32> {
        self.slots.get_index_of(&name).map(|index| index as u32)
    }

    /// Number of slots
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slot names in slot order
    pub fn slot_names(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.slots.iter().copied()
    }

    /// Record that `name` resolves to an enclosing frame
    pub fn capture(&mut self, name: Symbol) {
        self.captures.insert(name);
        self.needs_declaration_frame = true;
    }

    /// Whether `name` was resolved to an enclosing frame
    pub fn captures(&self, name: Symbol) -> bool {
        self.captures.contains(&name)
    }

    /// Captured names in first-use order
    pub fn captured_names(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.captures.iter().copied()
    }
}

/// Positional parameter counts of a callable
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Arity {
    /// Required positional parameters, before and after the rest
    pub required: usize,
    /// Optional positional parameters
    pub optional: usize,
    /// `*rest` present
    pub rest: bool,
}

impl Arity {
    /// Arity of a callable taking nothing
    pub const NONE: Self = Self {
        required: 0,
        optional: 0,
        rest: false,
    };

    /// Fewest positional arguments accepted
    pub fn min(self) -> usize {
        self.required
    }

    /// Most positional arguments accepted; `None` when unbounded
    pub fn max(self) -> Option<usize> {
        (!self.rest).then_some(self.required + self.optional)
    }

    /// Whether `count` positional arguments are acceptable
    pub fn accepts(self, count: usize) -> bool {
        count >= self.min() && self.max().is_none_or(|max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max() {
            Some(max) if max == self.required => write!(formatter, "{}", self.required),
            Some(max) => write!(formatter, "{}..{max}", self.required),
            None => write!(formatter, "{}+", self.required),
        }
    }
}

/// What reading a missing positional argument does
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum MissingArgumentBehavior {
    /// Raise an argument error (methods)
    RuntimeError,
    /// Read `nil` (blocks)
    Nil,
}

/// Reflection data shared by every activation of a callable
#[derive(Debug, Clone, PartialEq)]
pub struct SharedMethodInfo {
    /// Method name, or a descriptive name such as `(each-block)`
    pub name: String,
    /// Positional arity
    pub arity: Arity,
    /// Definition site
    pub pos: Position,
    /// Block or lambda rather than a method or module body
    pub is_block: bool,
    /// Frame the callable was defined in
    pub lexical_frame: Option<FrameId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_intern::Interner;

    #[test]
    fn test_declare_is_idempotent() {
        let interner = Interner::new();
        let mut frame = FrameDescriptor::new(FrameKind::Method, None);
        let a = interner.intern("a");
        let b = interner.intern("b");
        assert_eq!(frame.declare(a), 0);
        assert_eq!(frame.declare(b), 1);
        assert_eq!(frame.declare(a), 0);
        assert_eq!(frame.slot_count(), 2);
        assert_eq!(frame.slot_of(b), Some(1));
        assert!(!frame.needs_declaration_frame);
    }

    #[test]
    fn test_capture_marks_declaration_frame() {
        let interner = Interner::new();
        let mut frame = FrameDescriptor::new(FrameKind::Block, None);
        let x = interner.intern("x");
        frame.capture(x);
        assert!(frame.captures(x));
        assert!(frame.needs_declaration_frame);
        assert_eq!(frame.slot_of(x), None);
    }

    #[test]
    fn test_arity_bounds() {
        let arity = Arity {
            required: 2,
            optional: 1,
            rest: true,
        };
        assert_eq!(arity.min(), 2);
        assert_eq!(arity.max(), None);
        assert!(arity.accepts(7));
        assert!(!arity.accepts(1));
        assert_eq!(arity.to_string(), "2+");

        let fixed = Arity {
            required: 1,
            optional: 2,
            rest: false,
        };
        assert!(!fixed.accepts(4));
        assert_eq!(fixed.to_string(), "1..3");
        assert_eq!(Arity::NONE.to_string(), "0");
    }
}
