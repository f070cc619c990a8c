//! Recursive-descent grammar
//!
//! The parser holds exactly one token of lookahead. The lexer is pulled
//! lazily, so anything declared before [`Parser::advance`] is visible to the
//! lexer when it classifies the next identifier. Grammar rules are split by
//! concern:
//!
//! - `stmt`: statements, modifiers and multiple assignment
//! - `expr`: operator precedence, assignment and argument lists
//! - `primary`: literals, variables and keyword constructs
//! - `call`: method calls, blocks and definitions
//! - `params`: formal parameter lists
//! - `strings`: string-like literals
//!
//! Recovery happens only between top-level statements: after a syntax error
//! the parser skips to the next line or `;` and carries on, so later errors
//! are reported too. Nested rules restore their flag and scope state through
//! closure helpers even when they fail, which keeps that resynchronisation
//! sound.

mod call;
mod expr;
mod params;
mod primary;
mod stmt;
mod strings;

use crate::error::{Failure, PResult};
use crate::lexer::{Keyword, LexState, Lexer, Token, TokenKind};
use crate::support::{ClosedScope, ParserSupport, ScopeKind};
use gt_diagnostics::DiagnosticId;
use gt_span::{Position, Span};
use gt_syntax::{Node, NodeKind};

/// Syntax errors in a row after which the parser gives up on the unit
const MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Stack of one-bit flags packed into an integer; the low bit is innermost
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct BitStack(pub(crate) u64);

impl BitStack {
    fn push(&mut self, bit: bool) {
        self.0 = (self.0 << 1) | u64::from(bit);
    }

    fn is_set(self) -> bool {
        self.0 & 1 == 1
    }
}

/// Output of a successful parse
#[derive(Debug)]
pub(crate) struct Program {
    /// Root node
    pub root: Node,
    /// Top-level locals in slot order
    pub locals: Vec<String>,
    /// Byte offset of the `__END__` data segment
    pub data_start: Option<usize>,
}

/// Parser state for one unit
pub(crate) struct Parser<'src, 'sink> {
    lexer: Lexer<'src>,
    support: ParserSupport<'sink>,
    token: Token,
    prev_end: u32,
    /// `do` belongs to an enclosing `while`/`until`/`for` when set
    cond: BitStack,
    /// `do` belongs to an enclosing command call when set
    cmdarg: BitStack,
    /// `|` closes a block parameter list instead of being an operator
    no_pipe: bool,
}

impl<'src, 'sink> Parser<'src, 'sink> {
    /// Create a parser; nothing is lexed until [`Parser::parse_program`]
    pub(crate) fn new(source: &'src [u8], first_line: u32, utf8: bool, support: ParserSupport<'sink>) -> Self {
        Self {
            lexer: Lexer::new(source, first_line, utf8),
            support,
            token: Token {
                kind: TokenKind::Eof,
                span: Span::new(0, 0),
                line: first_line,
                space_before: false,
            },
            prev_end: 0,
            cond: BitStack::default(),
            cmdarg: BitStack::default(),
            no_pipe: false,
        }
    }

    /// Parse the whole unit
    ///
    /// Every syntax error is recorded in the diagnostic sink; the first one
    /// is returned.
    pub(crate) fn parse_program(mut self) -> PResult<Program> {
        let mut first_error: Option<Failure> = None;
        let mut statements = Vec::new();
        let mut consecutive = 0;

        if let Err(failure) = self.advance().and_then(|_| self.skip_terms()) {
            self.record_failure(&failure, true);
            return Err(failure);
        }
        while !self.at(&TokenKind::Eof) {
            let outcome = self.parse_statement_item().and_then(|item| {
                self.expect_statement_end()?;
                Ok(item)
            });
            match outcome {
                Ok(item) => {
                    consecutive = 0;
                    statements.extend(item);
                }
                Err(Failure::Internal(error)) => return Err(Failure::Internal(error)),
                Err(failure) => {
                    self.record_failure(&failure, first_error.is_none());
                    tracing::debug!(error = %failure, "recovering from syntax error");
                    first_error.get_or_insert(failure);
                    consecutive += 1;
                    if consecutive >= MAX_CONSECUTIVE_ERRORS || !self.synchronize() {
                        break;
                    }
                }
            }
        }
        if let Some(failure) = first_error {
            return Err(failure);
        }

        let mut nodes = std::mem::take(&mut self.support.begin_nodes);
        self.support.check_useless_statements(&statements);
        nodes.extend(statements);
        let root = match nodes.len() {
            0 => Node::nil(self.support.position(Span::new(0, 0), self.token.line)),
            1 => nodes.remove(0),
            _ => {
                let pos = nodes[0].pos.extend_to(nodes[nodes.len() - 1].pos);
                Node::new(NodeKind::Block(nodes), pos)
            }
        };
        Ok(Program {
            root,
            locals: self.support.scopes.current_locals(),
            data_start: self.lexer.data_start(),
        })
    }

    fn record_failure(&mut self, failure: &Failure, first: bool) {
        let Failure::Syntax { message, span } = failure else {
            return;
        };
        let position = self.support.position(*span, self.lexer.line_of(span.start));
        let id = if first {
            DiagnosticId::SyntaxError
        } else {
            DiagnosticId::CascadingSyntaxError
        };
        self.support.report_error(id, position, message.clone());
    }

    /// Skip past the next statement separator; false when input is exhausted
    fn synchronize(&mut self) -> bool {
        loop {
            match self.token.kind {
                TokenKind::Eof => return false,
                TokenKind::NewLine | TokenKind::Semi => {
                    return self.advance().and_then(|_| self.skip_terms()).is_ok();
                }
                _ => {
                    if self.advance().is_err() {
                        return false;
                    }
                }
            }
        }
    }

    fn expect_statement_end(&mut self) -> PResult<()> {
        if self.at(&TokenKind::Eof) {
            return Ok(());
        }
        if !self.at_term() {
            return Err(self.unexpected());
        }
        self.skip_terms()
    }

    // token cursor

    /// Move to the next token, returning the one just left
    fn advance(&mut self) -> PResult<Token> {
        let next = self.lexer.next_token(&self.support)?;
        for warning in self.lexer.take_warnings() {
            let position = self.support.position(warning.span, self.lexer.line_of(warning.span.start));
            if warning.verbose {
                self.support.warn_verbose(warning.id, position, warning.message);
            } else {
                self.support.warn(warning.id, position, warning.message);
            }
        }
        self.prev_end = self.token.span.end;
        Ok(std::mem::replace(&mut self.token, next))
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.token.kind == *kind
    }

    fn at_keyword(&self, keyword: Keyword) -> bool {
        self.token.kind == TokenKind::Keyword(keyword)
    }

    fn eat(&mut self, kind: &TokenKind) -> PResult<bool> {
        if self.at(kind) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> PResult<bool> {
        self.eat(&TokenKind::Keyword(keyword))
    }

    fn expect(&mut self, kind: &TokenKind) -> PResult<Token> {
        self.check(kind)?;
        self.advance()
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> PResult<Token> {
        self.expect(&TokenKind::Keyword(keyword))
    }

    /// Fail unless the current token is `kind`, without consuming it
    fn check(&self, kind: &TokenKind) -> PResult<()> {
        if self.at(kind) {
            return Ok(());
        }
        Err(Failure::syntax(
            format!("syntax error, unexpected {}, expecting {kind}", self.token.kind),
            self.token.span,
        ))
    }

    fn unexpected(&self) -> Failure {
        Failure::syntax(format!("syntax error, unexpected {}", self.token.kind), self.token.span)
    }

    /// Position of the current token
    fn pos(&self) -> Position {
        self.support.position(self.token.span, self.token.line)
    }

    /// Position from `start` to the end of the last consumed token
    fn pos_from(&self, start: Position) -> Position {
        let end = self.prev_end.max(start.span.end);
        Position::new(start.file, start.line, Span::new(start.span.start, end))
    }

    fn at_term(&self) -> bool {
        matches!(self.token.kind, TokenKind::NewLine | TokenKind::Semi)
    }

    fn skip_terms(&mut self) -> PResult<()> {
        while self.at_term() {
            self.advance()?;
        }
        Ok(())
    }

    fn skip_newlines(&mut self) -> PResult<()> {
        while self.at(&TokenKind::NewLine) {
            self.advance()?;
        }
        Ok(())
    }

    fn set_lex_state(&mut self, state: LexState) {
        self.lexer.set_state(state);
    }

    // flag stacks

    /// Run `rule` with `do` and brace binding reset, as inside parentheses
    fn with_fresh_flags<T>(&mut self, rule: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = (self.cond, self.cmdarg, self.no_pipe);
        self.cond.push(false);
        self.cmdarg.push(false);
        self.no_pipe = false;
        let result = rule(self);
        (self.cond, self.cmdarg, self.no_pipe) = saved;
        result
    }

    /// Run `rule` as a loop condition
    fn with_cond<T>(&mut self, rule: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = self.cond;
        self.cond.push(true);
        let result = rule(self);
        self.cond = saved;
        result
    }

    /// Run `rule` as the arguments of a command call
    fn with_cmdarg<T>(&mut self, rule: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = self.cmdarg;
        self.cmdarg.push(true);
        let result = rule(self);
        self.cmdarg = saved;
        result
    }

    /// Whether a `do` here would open a block for the call just parsed
    fn do_block_allowed(&self) -> bool {
        self.at_keyword(Keyword::Do) && !self.cond.is_set() && !self.cmdarg.is_set()
    }

    /// Run `rule` inside a new static scope
    ///
    /// The scope is popped even when `rule` fails. The rule checks for its
    /// closing token; the caller consumes it after the scope is gone so the
    /// following token is lexed with the outer locals.
    fn in_scope<T>(
        &mut self,
        kind: ScopeKind,
        rule: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<(T, ClosedScope)> {
        let saved_cond = self.cond;
        let saved_no_pipe = self.no_pipe;
        match kind {
            ScopeKind::Local => self.support.push_local_scope(self.cmdarg.0),
            ScopeKind::Block => self.support.push_block_scope(self.cmdarg.0),
        };
        self.cond = BitStack::default();
        self.cmdarg = BitStack::default();
        self.no_pipe = false;
        let result = rule(self);
        let closed = self.support.pop_current_scope();
        self.cond = saved_cond;
        self.no_pipe = saved_no_pipe;
        let closed = closed?;
        self.cmdarg = BitStack(closed.cmdarg_snapshot);
        Ok((result?, closed))
    }

    /// Run `rule` with method-definition nesting adjusted, restoring it after
    fn with_def_state<T>(
        &mut self,
        in_def: bool,
        in_single: u32,
        rule: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        let saved = (self.support.in_def, self.support.in_single);
        self.support.in_def = in_def;
        self.support.in_single = in_single;
        let result = rule(self);
        (self.support.in_def, self.support.in_single) = saved;
        result
    }

    // statement lists

    fn at_statements_end(&self) -> bool {
        match &self.token.kind {
            TokenKind::Eof | TokenKind::RBrace | TokenKind::RParen | TokenKind::StringDEnd => true,
            TokenKind::Keyword(keyword) => matches!(
                keyword,
                Keyword::End
                    | Keyword::Else
                    | Keyword::Elsif
                    | Keyword::When
                    | Keyword::Ensure
                    | Keyword::Rescue
                    | Keyword::Then
                    | Keyword::In
            ),
            _ => false,
        }
    }

    /// Statements separated by newlines or `;`
    fn parse_compstmt(&mut self) -> PResult<Option<Node>> {
        self.skip_terms()?;
        let mut statements = Vec::new();
        while !self.at_statements_end() {
            if let Some(node) = self.parse_statement_item()? {
                statements.push(node);
            }
            if !self.at_term() {
                break;
            }
            self.skip_terms()?;
        }
        Ok(self.finish_statements(statements))
    }

    fn finish_statements(&mut self, mut statements: Vec<Node>) -> Option<Node> {
        self.support.check_useless_statements(&statements);
        match statements.len() {
            0 => None,
            1 => statements.pop(),
            _ => {
                let pos = statements[0].pos.extend_to(statements[statements.len() - 1].pos);
                Some(Node::new(NodeKind::Block(statements), pos))
            }
        }
    }

    /// One statement, or a hoisted `BEGIN { }` block
    fn parse_statement_item(&mut self) -> PResult<Option<Node>> {
        if !self.at_keyword(Keyword::UpperBegin) {
            return self.parse_statement().map(Some);
        }
        let start = self.pos();
        if self.support.in_def || self.support.in_single > 0 {
            return Err(Failure::syntax("BEGIN in method", start.span));
        }
        if self.support.scopes.current() != self.support.scopes.root() {
            return Err(Failure::syntax("BEGIN is permitted only at toplevel", start.span));
        }
        self.advance()?;
        self.expect(&TokenKind::LBrace)?;
        let body = self.with_fresh_flags(Self::parse_compstmt)?;
        self.expect(&TokenKind::RBrace)?;
        let node = Node::new(NodeKind::PreExe(body.map(Box::new)), self.pos_from(start));
        self.support.begin_nodes.push(node);
        Ok(None)
    }
}

#[cfg(test)]
mod tests;
