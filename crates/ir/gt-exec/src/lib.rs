//! Executable node graph
//!
//! The translator lowers a syntax tree into an [`ExecGraph`]: an arena of
//! [`ExecNode`]s with every local resolved to a `(depth, slot)` pair, every
//! desugaring applied and non-local control flow made explicit through
//! catch nodes. Callables carry a [`FrameDescriptor`] and a
//! [`SharedMethodInfo`]; nothing refers to the runtime object model except
//! by name.

mod frame;
mod printer;
pub mod visitor;

pub use frame::{Arity, FrameDescriptor, FrameKind, MissingArgumentBehavior, ReturnId, SharedMethodInfo};

use gt_intern::{Interner, Symbol};
use gt_span::Position;
use gt_syntax::RegexpOptions;
use la_arena::{Arena, Idx};
use std::ops::Index;

/// Executable node ID
pub type ExecId = Idx<ExecNode>;
/// Frame descriptor ID
pub type FrameId = Idx<FrameDescriptor>;
/// Callable metadata ID
pub type MethodId = Idx<SharedMethodInfo>;

/// A lowered node with its source position
#[derive(Debug, Clone, PartialEq)]
pub struct ExecNode {
    /// What the node does
    pub kind: ExecKind,
    /// Originating source position
    pub pos: Position,
}

/// A resolved local variable
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct LocalSlot {
    /// Frames to walk outward; 0 is the current frame
    pub depth: u32,
    /// Slot index in the frame at that depth
    pub slot: u32,
    /// Variable name, for reflection
    pub name: Symbol,
}

/// How a splat treats a `nil` operand
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum SplatNil {
    /// `*nil` is `[]`
    EmptyArray,
    /// `*nil` is `[nil]`
    ArrayWithNil,
    /// `nil` passes through
    Nil,
}

/// One `rescue` clause of a [`ExecKind::Try`]
#[derive(Debug, Clone, PartialEq)]
pub enum RescueClause {
    /// `rescue A, B`
    Classes {
        /// Exception classes
        classes: Vec<ExecId>,
        /// Handler
        body: ExecId,
    },
    /// `rescue *list`
    Splat {
        /// Array of exception classes
        splat: ExecId,
        /// Handler
        body: ExecId,
    },
    /// Bare `rescue`
    Any {
        /// Handler
        body: ExecId,
    },
}

impl RescueClause {
    /// Handler body
    pub fn body(&self) -> ExecId {
        match self {
            Self::Classes { body, .. } | Self::Splat { body, .. } | Self::Any { body } => *body,
        }
    }
}

/// Every kind of executable node
#[derive(Debug, Clone, PartialEq)]
pub enum ExecKind {
    // Literals
    /// `nil`
    Nil,
    /// `true` / `false`
    Boolean(bool),
    /// `self`
    SelfRef,
    /// 64-bit integer
    Fixnum(i64),
    /// Integer outside 64 bits, as decimal digits
    Bignum(String),
    /// Float
    Float(f64),
    /// New string copied from the literal
    Str(Vec<u8>),
    /// Symbol
    Symbol(Symbol),
    /// Regexp literal
    Regexp {
        /// Pattern source
        source: Vec<u8>,
        /// Options
        options: RegexpOptions,
    },
    /// `__ENCODING__`
    Encoding(String),
    /// Range with literal integer ends
    IntegerRange {
        /// Start
        begin: i64,
        /// End
        end: i64,
        /// `...`
        exclusive: bool,
    },
    /// Range with computed ends
    Range {
        /// Start
        begin: ExecId,
        /// End
        end: ExecId,
        /// `...`
        exclusive: bool,
    },
    /// Concatenation of each part's `to_s`
    InterpolatedString(Vec<ExecId>),
    /// Interned string
    StringToSymbol(ExecId),
    /// Regexp compiled at run time
    StringToRegexp {
        /// Pattern string
        string: ExecId,
        /// Options
        options: RegexpOptions,
    },
    /// Backtick command
    System(ExecId),
    /// Array of the values
    ArrayLiteral(Vec<ExecId>),
    /// Concatenation of arrays; each part is already splat-cast
    ArrayConcat(Vec<ExecId>),
    /// Array with one value appended
    ArrayPush {
        /// Array
        array: ExecId,
        /// Appended value
        value: ExecId,
    },
    /// Coerce a value to an array for a splat
    SplatCast {
        /// Operand
        value: ExecId,
        /// Treatment of `nil`
        nil: SplatNil,
    },
    /// Hash from key/value pairs
    HashLiteral(Vec<(ExecId, ExecId)>),

    // Variables
    /// Read a local
    ReadLocal(LocalSlot),
    /// Write a local; evaluates to the value
    WriteLocal {
        /// Slot written
        target: LocalSlot,
        /// Value
        value: ExecId,
    },
    /// Read `@name` of self
    ReadInstance(Symbol),
    /// Write `@name` of self
    WriteInstance {
        /// Variable including `@`
        name: Symbol,
        /// Value
        value: ExecId,
    },
    /// Read a class variable
    ReadClassVar {
        /// Module holding it
        module: ExecId,
        /// Variable including `@@`
        name: Symbol,
    },
    /// Write a class variable
    WriteClassVar {
        /// Module holding it
        module: ExecId,
        /// Variable including `@@`
        name: Symbol,
        /// Value
        value: ExecId,
    },
    /// Class of a value
    ClassOf(ExecId),
    /// Read a global
    ReadGlobal(Symbol),
    /// Write a global
    WriteGlobal {
        /// Variable including `$`
        name: Symbol,
        /// Value
        value: ExecId,
    },
    /// Check the value assigned to `$~` is match data or nil
    CheckMatchData(ExecId),
    /// Read a constant from a module
    ReadConstant {
        /// Lexical module, or the left side of `::`
        module: ExecId,
        /// Constant name
        name: Symbol,
    },
    /// Assign a constant in a module
    WriteConstant {
        /// Target module
        module: ExecId,
        /// Constant name
        name: Symbol,
        /// Value
        value: ExecId,
    },
    /// The `Object` class
    ObjectClass,
    /// The top-level `main` object
    MainObject,

    // Calls
    /// Method call
    Call {
        /// Receiver
        receiver: ExecId,
        /// Method name
        name: Symbol,
        /// Arguments; with `splatted` a single array to spread
        args: Vec<ExecId>,
        /// Block or proc-cast block argument
        block: Option<ExecId>,
        /// Arguments come as one array
        splatted: bool,
        /// Private methods may be called (implicit receiver)
        ignore_visibility: bool,
    },
    /// `&value` block argument
    ProcCast(ExecId),
    /// `super(args)`
    Super {
        /// Arguments
        args: Vec<ExecId>,
        /// Block
        block: Option<ExecId>,
        /// Arguments come as one array
        splatted: bool,
    },
    /// `super` with the current arguments
    ZSuper {
        /// Block
        block: Option<ExecId>,
    },
    /// `yield`
    Yield {
        /// Arguments
        args: Vec<ExecId>,
        /// Spread a single array
        unsplat: bool,
    },
    /// Run-time `defined?`
    Defined(ExecId),
    /// `alias new old` in a module
    Alias {
        /// Module
        module: ExecId,
        /// New name
        new_name: Symbol,
        /// Existing name
        old_name: Symbol,
    },
    /// `alias $new $old`
    AliasGlobal {
        /// New global
        new_name: Symbol,
        /// Existing global
        old_name: Symbol,
    },
    /// `undef name` in a module
    Undef {
        /// Module
        module: ExecId,
        /// Method name
        name: Symbol,
    },

    // Control flow
    /// Conditional
    If {
        /// Boolean condition
        cond: ExecId,
        /// Taken branch
        then_body: ExecId,
        /// Other branch
        else_body: ExecId,
    },
    /// Short-circuit and
    And(ExecId, ExecId),
    /// Short-circuit or
    Or(ExecId, ExecId),
    /// Boolean negation
    Not(ExecId),
    /// Truthiness as a boolean
    BooleanCast(ExecId),
    /// Loop
    While {
        /// Boolean condition
        cond: ExecId,
        /// Body
        body: ExecId,
        /// Run the body once before testing
        do_while: bool,
    },
    /// Statements; evaluates to the last
    Sequence(Vec<ExecId>),
    /// `break`
    Break(ExecId),
    /// `next`
    Next(ExecId),
    /// `redo`
    Redo,
    /// `retry`
    Retry,
    /// `return`
    Return {
        /// Catching method
        return_id: ReturnId,
        /// Returned value
        value: ExecId,
    },
    /// Catch returns addressed to `return_id`
    CatchReturn {
        /// Caught identifier
        return_id: ReturnId,
        /// Protected body
        body: ExecId,
    },
    /// Turn `next` into the body's value
    CatchNext(ExecId),
    /// Restart the body on `redo`
    CatchRedo(ExecId),
    /// Turn an escaping `retry` into an error
    CatchRetryAsError(ExecId),
    /// `begin/rescue/else`
    Try {
        /// Protected body
        body: ExecId,
        /// Clauses in order
        rescues: Vec<RescueClause>,
        /// Runs when the body raised nothing
        else_body: ExecId,
    },
    /// `begin/ensure`
    Ensure {
        /// Protected body
        body: ExecId,
        /// Always runs
        ensure: ExecId,
    },
    /// Flip-flop range condition
    FlipFlop {
        /// Turns it on
        begin: ExecId,
        /// Turns it off
        end: ExecId,
        /// `...`: do not test the end on the same evaluation
        exclusive: bool,
        /// State slot
        state: LocalSlot,
    },
    /// Reset a flip-flop state slot to off
    InitFlipFlopSlot(LocalSlot),
    /// `when *list`: `===` against every element
    WhenSplat {
        /// Case subject
        subject: ExecId,
        /// Array of candidates
        splat: ExecId,
    },
    /// Block received exactly one argument and it passes the check
    ShouldDestructure(ExecId),
    /// `value.respond_to?(name)`
    RespondTo {
        /// Tested value
        value: ExecId,
        /// Method name
        name: Symbol,
    },
    /// Array length is at least `size`
    ArraySizeAtLeast {
        /// Array
        array: ExecId,
        /// Minimum length
        size: usize,
    },

    // Arguments and destructuring
    /// Positional argument by index
    ReadPreArgument {
        /// Argument index
        index: usize,
        /// Behaviour when too few arguments were passed
        missing: MissingArgumentBehavior,
    },
    /// Optional argument, or its default when not enough were passed
    ReadOptionalArgument {
        /// Argument index
        index: usize,
        /// Argument count at which the argument is present
        minimum: usize,
        /// Default value
        default: ExecId,
    },
    /// Argument counted from the end
    ReadPostArgument {
        /// 1 for the last argument
        from_end: usize,
        /// Required positional count of the callable
        required: usize,
        /// Behaviour when too few arguments were passed
        missing: MissingArgumentBehavior,
    },
    /// Remaining arguments as an array
    ReadRestArgument {
        /// First index
        start: usize,
        /// Arguments left for post parameters
        from_end: usize,
    },
    /// Keyword argument from the trailing hash
    ReadKeywordArgument {
        /// Keyword
        name: Symbol,
        /// Default; `None` for a required keyword
        default: Option<ExecId>,
    },
    /// Keywords not taken by named keyword parameters
    ReadKeywordRestArgument {
        /// Keywords already bound
        excluded: Vec<Symbol>,
    },
    /// Block passed to the callable, or nil
    ReadBlockArgument,
    /// Element of an array; negative counts from the end
    ArrayIndex {
        /// Array
        array: ExecId,
        /// Index
        index: i64,
    },
    /// `array[from...len - from_end]`, empty when that is negative
    ArraySlice {
        /// Array
        array: ExecId,
        /// First index
        from: usize,
        /// Elements left off the end
        from_end: usize,
    },

    // Definitions
    /// Callable method object with its own frame
    MethodDefinition {
        /// Metadata
        method: MethodId,
        /// Frame layout
        frame: FrameId,
        /// Body, already wrapped in its catch nodes
        body: ExecId,
    },
    /// Install a method object in a module
    AddMethod {
        /// Target module
        module: ExecId,
        /// Method definition
        method: ExecId,
    },
    /// Singleton class of a value
    SingletonClass(ExecId),
    /// Block or lambda closure
    BlockDefinition {
        /// Metadata
        method: MethodId,
        /// Frame layout
        frame: FrameId,
        /// Body, already wrapped in its catch nodes
        body: ExecId,
        /// `->` lambda semantics
        lambda: bool,
    },
    /// Define or reopen a class
    DefineClass {
        /// Class name
        name: Symbol,
        /// Module the constant lives in
        lexical_parent: ExecId,
        /// Superclass
        superclass: ExecId,
    },
    /// Define or reopen a module
    DefineModule {
        /// Module name
        name: Symbol,
        /// Module the constant lives in
        lexical_parent: ExecId,
    },
    /// Run a module body definition with the module as self
    OpenModule {
        /// Module
        module: ExecId,
        /// Body method definition
        definition: ExecId,
    },
}

impl ExecKind {
    /// Name of the variant
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nil => "Nil",
            Self::Boolean(_) => "Boolean",
            Self::SelfRef => "Self",
            Self::Fixnum(_) => "Fixnum",
            Self::Bignum(_) => "Bignum",
            Self::Float(_) => "Float",
            Self::Str(_) => "Str",
            Self::Symbol(_) => "Symbol",
            Self::Regexp { .. } => "Regexp",
            Self::Encoding(_) => "Encoding",
            Self::IntegerRange { .. } => "IntegerRange",
            Self::Range { .. } => "Range",
            Self::InterpolatedString(_) => "InterpolatedString",
            Self::StringToSymbol(_) => "StringToSymbol",
            Self::StringToRegexp { .. } => "StringToRegexp",
            Self::System(_) => "System",
            Self::ArrayLiteral(_) => "ArrayLiteral",
            Self::ArrayConcat(_) => "ArrayConcat",
            Self::ArrayPush { .. } => "ArrayPush",
            Self::SplatCast { .. } => "SplatCast",
            Self::HashLiteral(_) => "HashLiteral",
            Self::ReadLocal(_) => "ReadLocal",
            Self::WriteLocal { .. } => "WriteLocal",
            Self::ReadInstance(_) => "ReadInstance",
            Self::WriteInstance { .. } => "WriteInstance",
            Self::ReadClassVar { .. } => "ReadClassVar",
            Self::WriteClassVar { .. } => "WriteClassVar",
            Self::ClassOf(_) => "ClassOf",
            Self::ReadGlobal(_) => "ReadGlobal",
            Self::WriteGlobal { .. } => "WriteGlobal",
            Self::CheckMatchData(_) => "CheckMatchData",
            Self::ReadConstant { .. } => "ReadConstant",
            Self::WriteConstant { .. } => "WriteConstant",
            Self::ObjectClass => "ObjectClass",
            Self::MainObject => "MainObject",
            Self::Call { .. } => "Call",
            Self::ProcCast(_) => "ProcCast",
            Self::Super { .. } => "Super",
            Self::ZSuper { .. } => "ZSuper",
            Self::Yield { .. } => "Yield",
            Self::Defined(_) => "Defined",
            Self::Alias { .. } => "Alias",
            Self::AliasGlobal { .. } => "AliasGlobal",
            Self::Undef { .. } => "Undef",
            Self::If { .. } => "If",
            Self::And(..) => "And",
            Self::Or(..) => "Or",
            Self::Not(_) => "Not",
            Self::BooleanCast(_) => "BooleanCast",
            Self::While { .. } => "While",
            Self::Sequence(_) => "Sequence",
            Self::Break(_) => "Break",
            Self::Next(_) => "Next",
            Self::Redo => "Redo",
            Self::Retry => "Retry",
            Self::Return { .. } => "Return",
            Self::CatchReturn { .. } => "CatchReturn",
            Self::CatchNext(_) => "CatchNext",
            Self::CatchRedo(_) => "CatchRedo",
            Self::CatchRetryAsError(_) => "CatchRetryAsError",
            Self::Try { .. } => "Try",
            Self::Ensure { .. } => "Ensure",
            Self::FlipFlop { .. } => "FlipFlop",
            Self::InitFlipFlopSlot(_) => "InitFlipFlopSlot",
            Self::WhenSplat { .. } => "WhenSplat",
            Self::ShouldDestructure(_) => "ShouldDestructure",
            Self::RespondTo { .. } => "RespondTo",
            Self::ArraySizeAtLeast { .. } => "ArraySizeAtLeast",
            Self::ReadPreArgument { .. } => "ReadPreArgument",
            Self::ReadOptionalArgument { .. } => "ReadOptionalArgument",
            Self::ReadPostArgument { .. } => "ReadPostArgument",
            Self::ReadRestArgument { .. } => "ReadRestArgument",
            Self::ReadKeywordArgument { .. } => "ReadKeywordArgument",
            Self::ReadKeywordRestArgument { .. } => "ReadKeywordRestArgument",
            Self::ReadBlockArgument => "ReadBlockArgument",
            Self::ArrayIndex { .. } => "ArrayIndex",
            Self::ArraySlice { .. } => "ArraySlice",
            Self::MethodDefinition { .. } => "MethodDefinition",
            Self::AddMethod { .. } => "AddMethod",
            Self::SingletonClass(_) => "SingletonClass",
            Self::BlockDefinition { .. } => "BlockDefinition",
            Self::DefineClass { .. } => "DefineClass",
            Self::DefineModule { .. } => "DefineModule",
            Self::OpenModule { .. } => "OpenModule",
        }
    }
}

/// Arena holding a whole lowered unit
#[derive(Debug, Clone, Default)]
pub struct ExecGraph {
    nodes: Arena<ExecNode>,
    frames: Arena<FrameDescriptor>,
    methods: Arena<SharedMethodInfo>,
    interner: Interner,
}

impl ExecGraph {
    /// An empty graph interning names into `interner`
    pub fn new(interner: Interner) -> Self {
        Self {
            nodes: Arena::new(),
            frames: Arena::new(),
            methods: Arena::new(),
            interner,
        }
    }

    /// Add a node
    pub fn alloc(&mut self, kind: ExecKind, pos: Position) -> ExecId {
        self.nodes.alloc(ExecNode { kind, pos })
    }

    /// Add a frame descriptor
    pub fn add_frame(&mut self, frame: FrameDescriptor) -> FrameId {
        self.frames.alloc(frame)
    }

    /// Add callable metadata
    pub fn add_method(&mut self, method: SharedMethodInfo) -> MethodId {
        self.methods.alloc(method)
    }

    /// Node by ID
    pub fn node(&self, id: ExecId) -> &ExecNode {
        &self.nodes[id]
    }

    /// Frame by ID
    pub fn frame(&self, id: FrameId) -> &FrameDescriptor {
        &self.frames[id]
    }

    /// Mutable frame by ID
    pub fn frame_mut(&mut self, id: FrameId) -> &mut FrameDescriptor {
        &mut self.frames[id]
    }

    /// Callable metadata by ID
    pub fn method(&self, id: MethodId) -> &SharedMethodInfo {
        &self.methods[id]
    }

    /// Mutable callable metadata by ID
    pub fn method_mut(&mut self, id: MethodId) -> &mut SharedMethodInfo {
        &mut self.methods[id]
    }

    /// Every frame in creation order
    pub fn frames(&self) -> impl Iterator<Item = (FrameId, &FrameDescriptor)> {
        self.frames.iter()
    }

    /// Every callable in creation order
    pub fn methods(&self) -> impl Iterator<Item = (MethodId, &SharedMethodInfo)> {
        self.methods.iter()
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Intern a name
    pub fn intern(&self, name: &str) -> Symbol {
        self.interner.intern(name)
    }

    /// Text of an interned name
    pub fn name(&self, symbol: Symbol) -> &str {
        self.interner.resolve(symbol)
    }

    /// The shared interner
    pub fn interner(&self) -> &Interner {
        &self.interner
    }
}

impl Index<ExecId> for ExecGraph {
    type Output = ExecNode;

    fn index(&self, id: ExecId) -> &ExecNode {
        &self.nodes[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_lookup() {
        let mut graph = ExecGraph::default();
        let pos = Position::default();
        let one = graph.alloc(ExecKind::Fixnum(1), pos);
        let name = graph.intern("succ");
        let call = graph.alloc(
            ExecKind::Call {
                receiver: one,
                name,
                args: Vec::new(),
                block: None,
                splatted: false,
                ignore_visibility: false,
            },
            pos,
        );
        assert_eq!(graph.len(), 2);
        assert_eq!(graph[call].kind.name(), "Call");
        assert_eq!(graph.node(one).kind, ExecKind::Fixnum(1));
        assert_eq!(graph.name(name), "succ");
    }

    #[test]
    fn test_rescue_clause_body() {
        let mut graph = ExecGraph::default();
        let body = graph.alloc(ExecKind::Nil, Position::default());
        assert_eq!(RescueClause::Any { body }.body(), body);
        let clause = RescueClause::Classes {
            classes: Vec::new(),
            body,
        };
        assert_eq!(clause.body(), body);
    }
}
