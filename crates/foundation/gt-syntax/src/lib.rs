//! Concrete syntax tree produced by the parser
//!
//! Every node owns its children exclusively; the tree is acyclic and is
//! dropped once the translator has lowered it.

use gt_span::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

mod args;

pub use args::{ArgsNode, KeywordParam, OptionalParam, Param};

/// A syntax tree node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// What the node is
    pub kind: NodeKind,
    /// Where it came from
    pub pos: Position,
}

/// Boxed child node
pub type NodeBox = Box<Node>;

/// Regexp literal options (`/x/imx`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegexpOptions {
    /// `i`
    pub ignore_case: bool,
    /// `x`
    pub extended: bool,
    /// `m`
    pub multiline: bool,
    /// `o`: interpolate once
    pub once: bool,
    /// Explicit encoding flag (`u`, `e`, `s`, `n`)
    pub encoding: Option<char>,
}

impl RegexpOptions {
    /// Parse a trailing option letter; `None` for an unknown letter
    pub fn with_flag(mut self, flag: char) -> Option<Self> {
        match flag {
            'i' => self.ignore_case = true,
            'x' => self.extended = true,
            'm' => self.multiline = true,
            'o' => self.once = true,
            'u' | 'e' | 's' | 'n' => self.encoding = Some(flag),
            _ => return None,
        }
        Some(self)
    }
}

/// Names of the `(?<name>...)` groups in a regexp source, in order
pub fn named_captures(source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut index = 0;
    while index < source.len() {
        match source[index] {
            b'\\' => index += 2,
            b'(' if source[index + 1..].starts_with(b"?<")
                && !matches!(source.get(index + 3), Some(b'=' | b'!')) =>
            {
                let start = index + 3;
                let Some(length) = source[start..].iter().position(|byte| *byte == b'>') else {
                    break;
                };
                let name = &source[start..start + length];
                let valid = name.first().is_some_and(|byte| byte.is_ascii_lowercase() || *byte == b'_')
                    && name.iter().all(|byte| byte.is_ascii_alphanumeric() || *byte == b'_');
                if valid {
                    let name = String::from_utf8_lossy(name).into_owned();
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                index = start + length + 1;
            }
            _ => index += 1,
        }
    }
    names
}

impl fmt::Display for RegexpOptions {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multiline {
            formatter.write_str("m")?;
        }
        if self.ignore_case {
            formatter.write_str("i")?;
        }
        if self.extended {
            formatter.write_str("x")?;
        }
        if self.once {
            formatter.write_str("o")?;
        }
        if let Some(encoding) = self.encoding {
            write!(formatter, "{encoding}")?;
        }
        Ok(())
    }
}

/// Multiple assignment: `a, (b, c), *d, e = value`
#[derive(Debug, Clone, PartialEq)]
pub struct MultipleAsgn {
    /// Targets before the splat
    pub pre: Vec<Node>,
    /// Splat target; `NodeKind::Star` for an anonymous `*`
    pub rest: Option<NodeBox>,
    /// Targets after the splat
    pub post: Vec<Node>,
    /// Right-hand side; absent while the node is itself a target
    pub value: Option<NodeBox>,
}

impl MultipleAsgn {
    /// Empty target list
    pub fn new() -> Self {
        Self {
            pre: Vec::new(),
            rest: None,
            post: Vec::new(),
            value: None,
        }
    }

    /// Number of targets before the splat
    pub fn pre_count(&self) -> usize {
        self.pre.len()
    }
}

impl Default for MultipleAsgn {
    fn default() -> Self {
        Self::new()
    }
}

/// One `when` clause of a `case`
#[derive(Debug, Clone, PartialEq)]
pub struct WhenClause {
    /// Position of the `when` keyword
    pub pos: Position,
    /// Candidates, possibly including `Splat` nodes
    pub candidates: Vec<Node>,
    /// Clause body
    pub body: Option<NodeBox>,
}

/// One `rescue` clause
#[derive(Debug, Clone, PartialEq)]
pub struct RescueBody {
    /// Position of the `rescue` keyword
    pub pos: Position,
    /// Exception classes; empty means `StandardError`
    pub exceptions: Vec<Node>,
    /// Clause body, already prefixed with the `=> var` assignment
    pub body: Option<NodeBox>,
}

/// Block attached to a call, lambda literal, or `for` body
#[derive(Debug, Clone, PartialEq)]
pub struct IterNode {
    /// Block parameters; `None` when the block has no `| |`
    pub args: Option<Box<ArgsNode>>,
    /// Block body
    pub body: Option<NodeBox>,
    /// Local names the static scope of this block declared, in slot order
    pub locals: Vec<String>,
}

/// Every syntactic form the parser can produce
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// `nil`
    Nil,
    /// `true`
    True,
    /// `false`
    False,
    /// `self`
    SelfRef,
    /// Integer that fits in 64 bits
    Fixnum(i64),
    /// Integer literal too large for 64 bits, as decimal digits with sign
    Bignum(String),
    /// Float literal
    Float(f64),
    /// String without interpolation
    Str(Vec<u8>),
    /// Backtick string without interpolation
    XStr(Vec<u8>),
    /// Interpolated string; parts are `Str` and `EvStr`
    DStr(Vec<Node>),
    /// Interpolated backtick string
    DXStr(Vec<Node>),
    /// Interpolated symbol `:"a#{b}"`
    DSymbol(Vec<Node>),
    /// `#{...}` part of an interpolated literal
    EvStr(Option<NodeBox>),
    /// Symbol literal
    Symbol(String),
    /// Regexp without interpolation
    Regexp {
        /// Pattern source
        source: Vec<u8>,
        /// Trailing options
        options: RegexpOptions,
    },
    /// Interpolated regexp
    DRegexp {
        /// Parts
        parts: Vec<Node>,
        /// Trailing options
        options: RegexpOptions,
    },
    /// Array literal; elements may include `Splat`
    Array(Vec<Node>),
    /// `[]`
    ZArray,
    /// Hash literal; a `None` key is a `**splat` entry
    Hash(Vec<(Option<Node>, Node)>),
    /// Range `a..b` / `a...b`
    Dot {
        /// Start
        begin: NodeBox,
        /// End
        end: NodeBox,
        /// `...`
        exclusive: bool,
    },
    /// Range in a condition: a flip-flop
    Flip {
        /// Turns the flip-flop on
        begin: NodeBox,
        /// Turns the flip-flop off
        end: NodeBox,
        /// `...`
        exclusive: bool,
    },
    /// `__ENCODING__`
    Encoding(String),

    /// Local variable of a method, class body or top level
    LocalVar(String),
    /// Local variable first seen inside a block
    DVar(String),
    /// Assignment to a local variable of the enclosing local scope
    LocalAsgn {
        /// Variable
        name: String,
        /// Value; absent when used as an assignment target
        value: Option<NodeBox>,
    },
    /// Assignment to a block-scoped local variable
    DAsgn {
        /// Variable
        name: String,
        /// Value
        value: Option<NodeBox>,
    },
    /// `@x`
    InstVar(String),
    /// `@x = v`
    InstAsgn {
        /// Variable including `@`
        name: String,
        /// Value
        value: Option<NodeBox>,
    },
    /// `@@x`
    ClassVar(String),
    /// `@@x = v`
    ClassVarAsgn {
        /// Variable including `@@`
        name: String,
        /// Value
        value: Option<NodeBox>,
    },
    /// `$x`
    GlobalVar(String),
    /// `$x = v`
    GlobalAsgn {
        /// Variable including `$`
        name: String,
        /// Value
        value: Option<NodeBox>,
    },
    /// `$1`
    NthRef(u32),
    /// `$&`, `` $` ``, `$'`, `$+`
    BackRef(char),
    /// Bare constant
    Const(String),
    /// Constant assignment; `scope` is the `Colon2`/`Colon3` path if any
    ConstDecl {
        /// Constant name
        name: String,
        /// Explicit path for `A::B = v` or `::B = v`
        scope: Option<NodeBox>,
        /// Value
        value: Option<NodeBox>,
    },
    /// `A::B`
    Colon2 {
        /// Left side; `None` for a bare name in a class path
        left: Option<NodeBox>,
        /// Right-hand name
        name: String,
    },
    /// `::B`
    Colon3(String),

    /// Multiple assignment
    MultipleAsgn(Box<MultipleAsgn>),
    /// Anonymous splat target `*`
    Star,
    /// `a.b op= v`
    OpAsgn {
        /// Receiver
        receiver: NodeBox,
        /// Attribute read and written
        attribute: String,
        /// Operator without `=`
        operator: String,
        /// Right-hand side
        value: NodeBox,
    },
    /// `x ||= v`
    OpAsgnOr {
        /// Read of the target
        first: NodeBox,
        /// Assignment to the target
        second: NodeBox,
    },
    /// `x &&= v`
    OpAsgnAnd {
        /// Read of the target
        first: NodeBox,
        /// Assignment to the target
        second: NodeBox,
    },
    /// `a[i] op= v`
    OpElementAsgn {
        /// Receiver
        receiver: NodeBox,
        /// Index arguments
        args: Option<NodeBox>,
        /// Operator without `=`
        operator: String,
        /// Right-hand side
        value: NodeBox,
    },
    /// `a.b = v` / `a[i] = v`; the value is the last argument
    AttrAssign {
        /// Receiver
        receiver: NodeBox,
        /// Setter name (`b=` or `[]=`)
        name: String,
        /// Arguments including the value
        args: Option<NodeBox>,
    },

    /// Call with an explicit receiver
    Call {
        /// Receiver
        receiver: NodeBox,
        /// Method name
        name: String,
        /// Arguments (`Array`, `Splat`, `ArgsCat`, `ArgsPush`)
        args: Option<NodeBox>,
        /// `Iter` or `BlockPass`
        iter: Option<NodeBox>,
    },
    /// Call on implicit self with arguments or parentheses
    FCall {
        /// Method name
        name: String,
        /// Arguments
        args: Option<NodeBox>,
        /// Block
        iter: Option<NodeBox>,
    },
    /// Bare identifier that is not a known local
    VCall(String),
    /// `super(...)`
    Super {
        /// Arguments
        args: Option<NodeBox>,
        /// Block
        iter: Option<NodeBox>,
    },
    /// `super` without arguments
    ZSuper {
        /// Block
        iter: Option<NodeBox>,
    },
    /// `yield`
    Yield {
        /// Arguments
        args: Option<NodeBox>,
        /// Yield a single array as several values
        unsplat: bool,
    },
    /// Block literal
    Iter(Box<IterNode>),
    /// `->(x) { }`
    Lambda(Box<IterNode>),
    /// `&blk` argument
    BlockPass(NodeBox),
    /// `*x` in arguments or array literals
    Splat(NodeBox),
    /// Single value that is splatted on the way out (`return *a`)
    SValue(NodeBox),
    /// `args, *splat`
    ArgsCat {
        /// Leading arguments
        first: NodeBox,
        /// Splatted tail
        second: NodeBox,
    },
    /// `*splat, arg`
    ArgsPush {
        /// Splatted head
        first: NodeBox,
        /// Trailing argument
        second: NodeBox,
    },
    /// Regexp literal tested against `$_`
    Match(NodeBox),
    /// `/re/ =~ value`
    Match2 {
        /// Regexp literal
        receiver: NodeBox,
        /// Matched value
        value: NodeBox,
    },
    /// `value =~ /re#{x}/`
    Match3 {
        /// Regexp
        receiver: NodeBox,
        /// Matched value
        value: NodeBox,
    },

    /// `def name`
    Defn {
        /// Method name
        name: String,
        /// Parameters
        args: Box<ArgsNode>,
        /// Body
        body: Option<NodeBox>,
        /// Declared local names in slot order
        locals: Vec<String>,
    },
    /// `def recv.name`
    Defs {
        /// Singleton receiver
        receiver: NodeBox,
        /// Method name
        name: String,
        /// Parameters
        args: Box<ArgsNode>,
        /// Body
        body: Option<NodeBox>,
        /// Declared local names in slot order
        locals: Vec<String>,
    },
    /// `class Name < Super`
    Class {
        /// `Colon2`/`Colon3` path
        cpath: NodeBox,
        /// Superclass expression
        superclass: Option<NodeBox>,
        /// Body
        body: Option<NodeBox>,
        /// Declared local names in slot order
        locals: Vec<String>,
    },
    /// `module Name`
    Module {
        /// `Colon2`/`Colon3` path
        cpath: NodeBox,
        /// Body
        body: Option<NodeBox>,
        /// Declared local names in slot order
        locals: Vec<String>,
    },
    /// `class << obj`
    SClass {
        /// Object whose singleton class is opened
        receiver: NodeBox,
        /// Body
        body: Option<NodeBox>,
        /// Declared local names in slot order
        locals: Vec<String>,
    },
    /// `alias new old`
    Alias {
        /// New name
        new_name: String,
        /// Existing name
        old_name: String,
    },
    /// `alias $new $old`
    VAlias {
        /// New global
        new_name: String,
        /// Existing global
        old_name: String,
    },
    /// `undef name`
    Undef(String),

    /// `if` / `unless` / ternary
    If {
        /// Condition
        cond: NodeBox,
        /// Taken branch
        then_body: Option<NodeBox>,
        /// Other branch
        else_body: Option<NodeBox>,
    },
    /// `a && b`, `a and b`
    And(NodeBox, NodeBox),
    /// `a || b`, `a or b`
    Or(NodeBox, NodeBox),
    /// `while`
    While {
        /// Loop condition
        cond: NodeBox,
        /// Loop body
        body: Option<NodeBox>,
        /// `false` for `begin ... end while c`
        evaluate_at_start: bool,
    },
    /// `until`
    Until {
        /// Loop condition
        cond: NodeBox,
        /// Loop body
        body: Option<NodeBox>,
        /// `false` for `begin ... end until c`
        evaluate_at_start: bool,
    },
    /// `for var in iter`
    For {
        /// Assignment target with no value
        var: NodeBox,
        /// Collection
        iter: NodeBox,
        /// Loop body
        body: Option<NodeBox>,
    },
    /// `case`
    Case {
        /// Subject; `None` for a bare `case`
        subject: Option<NodeBox>,
        /// `when` clauses in order
        whens: Vec<WhenClause>,
        /// `else` branch
        else_body: Option<NodeBox>,
    },
    /// `begin ... end`
    Begin(Option<NodeBox>),
    /// Statement sequence
    Block(Vec<Node>),
    /// `begin ... rescue ... else ... end`
    Rescue {
        /// Protected body
        body: Option<NodeBox>,
        /// Clauses in order
        rescues: Vec<RescueBody>,
        /// `else` branch
        else_body: Option<NodeBox>,
    },
    /// `begin ... ensure ... end`
    Ensure {
        /// Protected body
        body: Option<NodeBox>,
        /// Always-run part
        ensure: Option<NodeBox>,
    },
    /// `break`
    Break(Option<NodeBox>),
    /// `next`
    Next(Option<NodeBox>),
    /// `redo`
    Redo,
    /// `retry`
    Retry,
    /// `return`
    Return(Option<NodeBox>),
    /// `defined?(expr)`
    Defined(NodeBox),
    /// `BEGIN { }`
    PreExe(Option<NodeBox>),
    /// `END { }`
    PostExe(Option<NodeBox>),
}

impl Node {
    /// Create a node
    pub fn new(kind: NodeKind, pos: Position) -> Self {
        Self { kind, pos }
    }

    /// Create a boxed node
    pub fn boxed(kind: NodeKind, pos: Position) -> NodeBox {
        Box::new(Self::new(kind, pos))
    }

    /// `nil` at `pos`
    pub fn nil(pos: Position) -> Self {
        Self::new(NodeKind::Nil, pos)
    }

    /// Whether the node is a literal whose value is known statically
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Nil
                | NodeKind::True
                | NodeKind::False
                | NodeKind::Fixnum(_)
                | NodeKind::Bignum(_)
                | NodeKind::Float(_)
                | NodeKind::Str(_)
                | NodeKind::Symbol(_)
                | NodeKind::Regexp { .. }
                | NodeKind::ZArray
        )
    }

    /// Whether the node is an assignment that can take a value
    pub fn is_assignable(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::LocalAsgn { .. }
                | NodeKind::DAsgn { .. }
                | NodeKind::InstAsgn { .. }
                | NodeKind::ClassVarAsgn { .. }
                | NodeKind::GlobalAsgn { .. }
                | NodeKind::ConstDecl { .. }
                | NodeKind::AttrAssign { .. }
                | NodeKind::MultipleAsgn(_)
        )
    }

    /// Whether evaluating the node never produces a usable value
    pub fn is_void_value(&self) -> bool {
        match &self.kind {
            NodeKind::Break(_)
            | NodeKind::Next(_)
            | NodeKind::Redo
            | NodeKind::Retry
            | NodeKind::Return(_) => true,
            NodeKind::Block(statements) => statements.last().is_some_and(Self::is_void_value),
            NodeKind::Begin(Some(body)) => body.is_void_value(),
            NodeKind::If {
                then_body: Some(then_body),
                else_body: Some(else_body),
                ..
            } => then_body.is_void_value() && else_body.is_void_value(),
            _ => false,
        }
    }

    /// Name used in diagnostics, e.g. `OpAsgnAnd`
    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }
}

impl NodeKind {
    /// Name of the variant
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nil => "Nil",
            Self::True => "True",
            Self::False => "False",
            Self::SelfRef => "Self",
            Self::Fixnum(_) => "Fixnum",
            Self::Bignum(_) => "Bignum",
            Self::Float(_) => "Float",
            Self::Str(_) => "Str",
            Self::XStr(_) => "XStr",
            Self::DStr(_) => "DStr",
            Self::DXStr(_) => "DXStr",
            Self::DSymbol(_) => "DSymbol",
            Self::EvStr(_) => "EvStr",
            Self::Symbol(_) => "Symbol",
            Self::Regexp { .. } => "Regexp",
            Self::DRegexp { .. } => "DRegexp",
            Self::Array(_) => "Array",
            Self::ZArray => "ZArray",
            Self::Hash(_) => "Hash",
            Self::Dot { .. } => "Dot",
            Self::Flip { .. } => "Flip",
            Self::Encoding(_) => "Encoding",
            Self::LocalVar(_) => "LocalVar",
            Self::DVar(_) => "DVar",
            Self::LocalAsgn { .. } => "LocalAsgn",
            Self::DAsgn { .. } => "DAsgn",
            Self::InstVar(_) => "InstVar",
            Self::InstAsgn { .. } => "InstAsgn",
            Self::ClassVar(_) => "ClassVar",
            Self::ClassVarAsgn { .. } => "ClassVarAsgn",
            Self::GlobalVar(_) => "GlobalVar",
            Self::GlobalAsgn { .. } => "GlobalAsgn",
            Self::NthRef(_) => "NthRef",
            Self::BackRef(_) => "BackRef",
            Self::Const(_) => "Const",
            Self::ConstDecl { .. } => "ConstDecl",
            Self::Colon2 { .. } => "Colon2",
            Self::Colon3(_) => "Colon3",
            Self::MultipleAsgn(_) => "MultipleAsgn",
            Self::Star => "Star",
            Self::OpAsgn { .. } => "OpAsgn",
            Self::OpAsgnOr { .. } => "OpAsgnOr",
            Self::OpAsgnAnd { .. } => "OpAsgnAnd",
            Self::OpElementAsgn { .. } => "OpElementAsgn",
            Self::AttrAssign { .. } => "AttrAssign",
            Self::Call { .. } => "Call",
            Self::FCall { .. } => "FCall",
            Self::VCall(_) => "VCall",
            Self::Super { .. } => "Super",
            Self::ZSuper { .. } => "ZSuper",
            Self::Yield { .. } => "Yield",
            Self::Iter(_) => "Iter",
            Self::Lambda(_) => "Lambda",
            Self::BlockPass(_) => "BlockPass",
            Self::Splat(_) => "Splat",
            Self::SValue(_) => "SValue",
            Self::ArgsCat { .. } => "ArgsCat",
            Self::ArgsPush { .. } => "ArgsPush",
            Self::Match(_) => "Match",
            Self::Match2 { .. } => "Match2",
            Self::Match3 { .. } => "Match3",
            Self::Defn { .. } => "Defn",
            Self::Defs { .. } => "Defs",
            Self::Class { .. } => "Class",
            Self::Module { .. } => "Module",
            Self::SClass { .. } => "SClass",
            Self::Alias { .. } => "Alias",
            Self::VAlias { .. } => "VAlias",
            Self::Undef(_) => "Undef",
            Self::If { .. } => "If",
            Self::And(..) => "And",
            Self::Or(..) => "Or",
            Self::While { .. } => "While",
            Self::Until { .. } => "Until",
            Self::For { .. } => "For",
            Self::Case { .. } => "Case",
            Self::Begin(_) => "Begin",
            Self::Block(_) => "Block",
            Self::Rescue { .. } => "Rescue",
            Self::Ensure { .. } => "Ensure",
            Self::Break(_) => "Break",
            Self::Next(_) => "Next",
            Self::Redo => "Redo",
            Self::Retry => "Retry",
            Self::Return(_) => "Return",
            Self::Defined(_) => "Defined",
            Self::PreExe(_) => "PreExe",
            Self::PostExe(_) => "PostExe",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}
