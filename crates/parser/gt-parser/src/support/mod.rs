//! Bookkeeping shared by the grammar rules
//!
//! [`ParserSupport`] owns the static scope stack and the diagnostic sink.
//! Grammar rules go through it to declare and resolve variables, to build
//! nodes whose shape depends on their children, and to report warnings.

mod checks;
pub(crate) mod nodes;
pub mod scope;

pub use nodes::CallArgs;
pub use scope::{ClosedScope, ScopeId, ScopeKind, StaticScopes};

use crate::error::{Failure, PResult};
use crate::lexer::{Keyword, LocalLookup};
use gt_diagnostics::{DiagnosticId, DiagnosticSink};
use gt_span::{FileId, Position, Span};
use gt_syntax::{Node, NodeBox, NodeKind};

/// A name as it appears in a variable position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    /// Lower-case identifier
    Identifier(String),
    /// `@x`
    IVar(String),
    /// `$x`
    GVar(String),
    /// `@@x`
    CVar(String),
    /// Constant
    Const(String),
    /// `self`, `nil`, `true`, `false`, `__FILE__`, `__LINE__`, `__ENCODING__`
    Keyword(Keyword),
    /// `$1`
    NthRef(u32),
    /// `$&` and friends
    BackRef(char),
}

/// Parser-side state that outlives single grammar rules
pub struct ParserSupport<'sink> {
    /// Static scope stack
    pub(crate) scopes: StaticScopes,
    sink: &'sink mut DiagnosticSink,
    file_id: FileId,
    filename: String,
    encoding: String,
    inline_source: bool,
    eval: bool,
    /// Inside a `def` body
    pub(crate) in_def: bool,
    /// Nesting of `def recv.name` bodies
    pub(crate) in_single: u32,
    /// Parameter whose default is being parsed
    pub(crate) current_arg: Option<String>,
    /// Hoisted `BEGIN { }` bodies
    pub(crate) begin_nodes: Vec<Node>,
}

impl LocalLookup for ParserSupport<'_> {
    fn is_local(&self, name: &str) -> bool {
        self.scopes.resolve(name).is_some()
    }
}

impl<'sink> ParserSupport<'sink> {
    /// Create support state for one unit
    pub fn new(
        sink: &'sink mut DiagnosticSink,
        filename: impl Into<String>,
        encoding: impl Into<String>,
        inline_source: bool,
        eval: bool,
    ) -> Self {
        let file_id = sink.file_id();
        Self {
            scopes: StaticScopes::new(),
            sink,
            file_id,
            filename: filename.into(),
            encoding: encoding.into(),
            inline_source,
            eval,
            in_def: false,
            in_single: 0,
            current_arg: None,
            begin_nodes: Vec::new(),
        }
    }

    /// Position for a span on `line`
    pub fn position(&self, span: Span, line: u32) -> Position {
        Position::new(self.file_id, line, span)
    }

    /// File name of the unit
    #[expect(dead_code, reason = "not yet called by the parser")]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Source encoding name
    #[expect(dead_code, reason = "not yet called by the parser")]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Whether the unit came from `-e`
    pub fn is_inline_source(&self) -> bool {
        self.inline_source
    }

    /// Whether the unit is an `eval` string
    pub fn is_eval(&self) -> bool {
        self.eval
    }

    /// Whether verbose warnings are recorded
    pub fn is_verbose(&self) -> bool {
        self.sink.is_verbose()
    }

    pub(crate) fn warn(&mut self, id: DiagnosticId, position: Position, message: impl Into<String>) {
        self.sink.warn(id, position, message);
    }

    pub(crate) fn warn_verbose(&mut self, id: DiagnosticId, position: Position, message: impl Into<String>) {
        self.sink.warn_verbose(id, position, message);
    }

    pub(crate) fn report_error(&mut self, id: DiagnosticId, position: Position, message: impl Into<String>) {
        self.sink.error(id, position, message);
    }

    // scopes

    /// Open a method, class or module scope
    pub fn push_local_scope(&mut self, cmdarg: u64) -> ScopeId {
        self.scopes.push_local(cmdarg)
    }

    /// Open a block scope
    pub fn push_block_scope(&mut self, cmdarg: u64) -> ScopeId {
        self.scopes.push_block(cmdarg)
    }

    /// Close the innermost scope
    pub fn pop_current_scope(&mut self) -> PResult<ClosedScope> {
        Ok(self.scopes.pop()?)
    }

    /// Read of a bare identifier: a local if one is visible, else a method call
    pub fn declare_identifier(&mut self, name: &str, pos: Position) -> Node {
        if self.current_arg.as_deref() == Some(name) {
            self.warn(
                DiagnosticId::CircularArgumentReference,
                pos,
                format!("circular argument reference - {name}"),
            );
        }
        let kind = match self.scopes.resolve(name) {
            Some(found) if found.kind == ScopeKind::Block => NodeKind::DVar(name.to_string()),
            Some(_) => NodeKind::LocalVar(name.to_string()),
            None => NodeKind::VCall(name.to_string()),
        };
        Node::new(kind, pos)
    }

    /// Assignment to a local, declaring it where it is first seen
    pub fn assign_local(&mut self, name: &str, value: Option<NodeBox>, pos: Position) -> Node {
        let block = match self.scopes.resolve(name) {
            Some(found) => found.kind == ScopeKind::Block,
            None => {
                self.scopes.declare_in_current(name);
                self.scopes.current_kind() == ScopeKind::Block
            }
        };
        local_asgn(name, value, block, pos)
    }

    /// Assignment to a local declared in the innermost scope regardless of
    /// outer names
    pub fn assignable_in_current(&mut self, name: &str, value: Option<NodeBox>, pos: Position) -> Node {
        self.scopes.declare_in_current(name);
        let block = self.scopes.current_kind() == ScopeKind::Block;
        local_asgn(name, value, block, pos)
    }

    /// Read of a variable-like name
    pub fn gettable(&mut self, variable: &Variable, pos: Position) -> Node {
        let kind = match variable {
            Variable::Identifier(name) => return self.declare_identifier(name, pos),
            Variable::IVar(name) => NodeKind::InstVar(name.clone()),
            Variable::GVar(name) => NodeKind::GlobalVar(name.clone()),
            Variable::CVar(name) => NodeKind::ClassVar(name.clone()),
            Variable::Const(name) => NodeKind::Const(name.clone()),
            Variable::NthRef(index) => NodeKind::NthRef(*index),
            Variable::BackRef(ch) => NodeKind::BackRef(*ch),
            Variable::Keyword(keyword) => match keyword {
                Keyword::Nil => NodeKind::Nil,
                Keyword::True => NodeKind::True,
                Keyword::False => NodeKind::False,
                Keyword::File => NodeKind::Str(self.filename.as_bytes().to_vec()),
                Keyword::Line => NodeKind::Fixnum(i64::from(pos.line)),
                Keyword::Encoding => NodeKind::Encoding(self.encoding.clone()),
                _ => NodeKind::SelfRef,
            },
        };
        Node::new(kind, pos)
    }

    /// Assignment target for a variable-like name
    pub fn assignable(&mut self, variable: &Variable, value: Option<NodeBox>, pos: Position) -> PResult<Node> {
        let kind = match variable {
            Variable::Identifier(name) => return Ok(self.assign_local(name, value, pos)),
            Variable::IVar(name) => NodeKind::InstAsgn {
                name: name.clone(),
                value,
            },
            Variable::GVar(name) => NodeKind::GlobalAsgn {
                name: name.clone(),
                value,
            },
            Variable::CVar(name) => NodeKind::ClassVarAsgn {
                name: name.clone(),
                value,
            },
            Variable::Const(name) => {
                if self.in_def || self.in_single > 0 {
                    return Err(Failure::syntax("dynamic constant assignment", pos.span));
                }
                NodeKind::ConstDecl {
                    name: name.clone(),
                    scope: None,
                    value,
                }
            }
            Variable::NthRef(index) => {
                return Err(Failure::syntax(format!("Can't set variable ${index}."), pos.span));
            }
            Variable::BackRef(ch) => {
                return Err(Failure::syntax(format!("Can't set variable ${ch}."), pos.span));
            }
            Variable::Keyword(keyword) => {
                let message = match keyword {
                    Keyword::SelfKw => "Can't change the value of self",
                    Keyword::Nil => "Can't assign to nil",
                    Keyword::True => "Can't assign to true",
                    Keyword::False => "Can't assign to false",
                    Keyword::File => "Can't assign to __FILE__",
                    Keyword::Line => "Can't assign to __LINE__",
                    _ => "Can't assign to __ENCODING__",
                };
                return Err(Failure::syntax(message, pos.span));
            }
        };
        Ok(Node::new(kind, pos))
    }

    /// Read that mirrors an assignment target, used by `x op= y`
    pub fn gettable_for(&mut self, target: &Node) -> Node {
        let pos = target.pos;
        let kind = match &target.kind {
            NodeKind::LocalAsgn { name, .. } | NodeKind::DAsgn { name, .. } => {
                return self.declare_identifier(name, pos);
            }
            NodeKind::InstAsgn { name, .. } => NodeKind::InstVar(name.clone()),
            NodeKind::ClassVarAsgn { name, .. } => NodeKind::ClassVar(name.clone()),
            NodeKind::GlobalAsgn { name, .. } => NodeKind::GlobalVar(name.clone()),
            NodeKind::ConstDecl { name, scope: None, .. } => NodeKind::Const(name.clone()),
            NodeKind::ConstDecl { name, scope: Some(scope), .. } => match &scope.kind {
                NodeKind::Colon2 { left, .. } => NodeKind::Colon2 {
                    left: left.clone(),
                    name: name.clone(),
                },
                _ => NodeKind::Colon3(name.clone()),
            },
            _ => NodeKind::Nil,
        };
        Node::new(kind, pos)
    }

    // parameters

    /// Check that a parameter name is not already bound where it would clash
    pub fn shadowing_lvar(&mut self, name: &str, pos: Position) -> PResult<()> {
        if name == "_" {
            return Ok(());
        }
        if self.scopes.is_defined_in_current(name) {
            return Err(Failure::syntax("duplicated argument name", pos.span));
        }
        if self.scopes.current_kind() == ScopeKind::Block && self.scopes.resolve(name).is_some() {
            self.warn_verbose(
                DiagnosticId::ShadowingOuterLocal,
                pos,
                format!("shadowing outer local variable - {name}"),
            );
        }
        Ok(())
    }

    /// Validate a token used as a formal parameter name
    pub fn formal_argument(&mut self, variable: &Variable, pos: Position) -> PResult<String> {
        let message = match variable {
            Variable::Identifier(name) => {
                self.shadowing_lvar(name, pos)?;
                return Ok(name.clone());
            }
            Variable::Const(_) => "formal argument cannot be a constant",
            Variable::IVar(_) => "formal argument cannot be an instance variable",
            Variable::GVar(_) => "formal argument cannot be a global variable",
            Variable::CVar(_) => "formal argument cannot be a class variable",
            _ => "syntax error, unexpected formal argument",
        };
        Err(Failure::syntax(message, pos.span))
    }

    /// Declare a parameter in the innermost scope; repeated `_` get fresh names
    pub fn arg_var(&mut self, name: &str) -> String {
        let mut name = name.to_string();
        if name == "_" {
            let mut count = 0;
            while self.scopes.is_defined_in_current(&name) {
                name = format!("_${count}");
                count += 1;
            }
        }
        self.scopes.declare_in_current(&name);
        name
    }

    /// Block-local variable after `;` in a block's parameter list
    pub fn new_bv(&mut self, name: &str, pos: Position) -> PResult<String> {
        self.shadowing_lvar(name, pos)?;
        Ok(self.arg_var(name))
    }

    /// Declare the named groups of a regexp literal as locals
    pub(crate) fn declare_named_captures(&mut self, source: &[u8], pos: Position) {
        for name in capture_local_names(source) {
            if self.scopes.resolve(&name).is_some() {
                self.warn_verbose(
                    DiagnosticId::NamedCaptureConflict,
                    pos,
                    format!("named capture conflicts a local variable - {name}"),
                );
            } else {
                self.scopes.declare_in_current(&name);
            }
        }
    }
}

/// Named groups of a regexp that become locals on `=~`
///
/// Reserved words never do.
pub fn capture_local_names(source: &[u8]) -> Vec<String> {
    gt_syntax::named_captures(source)
        .into_iter()
        .filter(|name| Keyword::from_word(name).is_none())
        .collect()
}

fn local_asgn(name: &str, value: Option<NodeBox>, block: bool, pos: Position) -> Node {
    let name = name.to_string();
    let kind = if block {
        NodeKind::DAsgn { name, value }
    } else {
        NodeKind::LocalAsgn { name, value }
    };
    Node::new(kind, pos)
}

#[cfg(test)]
mod tests;
