//! Byte-level lexer
//!
//! The lexer is pulled one token at a time by the parser. Most
//! disambiguation (unary vs binary operators, `[` and `(` flavours, regexp
//! vs division, heredoc vs shift) is decided from [`LexState`], which is
//! updated after every token much like the state machine of the reference
//! grammar. String-like literals push a terminator descriptor on a mode
//! stack so that `#{...}` interpolation can nest arbitrarily.

mod number;
mod string;
pub mod token;

pub(crate) use number::negate_decimal;
use string::StrTerm;
pub use token::{Keyword, StringKind, Token, TokenKind};

use crate::error::{Failure, PResult};
use gt_diagnostics::DiagnosticId;
use gt_span::{LineIndex, Span};

/// Where in an expression the lexer believes it is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexState {
    /// Start of an expression
    Beg,
    /// After `return`, `break`, `next`, `rescue`
    Mid,
    /// After a complete operand
    End,
    /// After a method name in a definition or a closing paren
    EndFn,
    /// After a method name that may take command arguments
    Arg,
    /// Expecting a method name (`def`, `alias`, `undef`)
    Fname,
    /// After `.`
    Dot,
    /// After `class`
    Class,
}

impl LexState {
    fn is_beg(self) -> bool {
        matches!(self, Self::Beg | Self::Mid | Self::Class)
    }

    fn is_end(self) -> bool {
        matches!(self, Self::End | Self::EndFn)
    }
}

/// Answers whether an identifier is a known local variable
pub trait LocalLookup {
    /// Whether `name` resolves to a local in the current static scope chain
    fn is_local(&self, name: &str) -> bool;
}

/// A warning the lexer wants reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexWarning {
    /// Category
    pub id: DiagnosticId,
    /// Location
    pub span: Span,
    /// Message
    pub message: String,
    /// Only shown in verbose mode
    pub verbose: bool,
}

#[derive(Debug, Clone)]
enum Mode {
    Str(StrTerm),
    Interp { depth: u32 },
}

/// Tokenizer over one source buffer
pub struct Lexer<'src> {
    src: &'src [u8],
    pos: usize,
    state: LexState,
    modes: Vec<Mode>,
    line_index: LineIndex,
    heredoc_end: Option<usize>,
    dvar_pending: bool,
    ternary_depth: u32,
    space_seen: bool,
    utf8: bool,
    data_start: Option<usize>,
    warnings: Vec<LexWarning>,
}

impl<'src> Lexer<'src> {
    /// Create a lexer; `first_line` numbers the first line of `src`
    pub fn new(src: &'src [u8], first_line: u32, utf8: bool) -> Self {
        let mut lexer = Self {
            src,
            pos: 0,
            state: LexState::Beg,
            modes: Vec::new(),
            line_index: LineIndex::new(src, first_line),
            heredoc_end: None,
            dvar_pending: false,
            ternary_depth: 0,
            space_seen: false,
            utf8,
            data_start: None,
            warnings: Vec::new(),
        };
        // shebang
        if src.starts_with(b"#!") {
            lexer.skip_line_body();
        }
        lexer
    }

    /// Current lexer state
    pub fn state(&self) -> LexState {
        self.state
    }

    /// Force the state used for the next token
    pub fn set_state(&mut self, state: LexState) {
        self.state = state;
    }

    /// Line of a byte offset
    pub fn line_of(&self, offset: u32) -> u32 {
        self.line_index.line_of(offset)
    }

    /// Byte offset where the `__END__` data segment starts, if one was seen
    pub fn data_start(&self) -> Option<usize> {
        self.data_start
    }

    /// Drain warnings collected since the last call
    pub fn take_warnings(&mut self) -> Vec<LexWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Produce the next token
    pub(crate) fn next_token(&mut self, locals: &dyn LocalLookup) -> PResult<Token> {
        if self.dvar_pending {
            self.dvar_pending = false;
            let start = self.pos;
            let kind = self.lex_variable_after_sigil()?;
            return Ok(self.make(kind, start, false));
        }
        if let Some(Mode::Str(_)) = self.modes.last() {
            return self.lex_string_token();
        }
        self.lex_code(locals)
    }

    fn make(&self, kind: TokenKind, start: usize, space_before: bool) -> Token {
        let span = Span::new(start as u32, self.pos as u32);
        Token {
            kind,
            span,
            line: self.line_index.line_of(start as u32),
            space_before,
        }
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn starts_with(&self, text: &[u8]) -> bool {
        self.src[self.pos..].starts_with(text)
    }

    pub(crate) fn error_at(&self, start: usize, message: impl Into<String>) -> Failure {
        let end = self.pos.max(start + 1).min(self.src.len().max(start));
        Failure::syntax(message, Span::new(start as u32, end as u32))
    }

    fn warn(&mut self, id: DiagnosticId, start: usize, message: impl Into<String>, verbose: bool) {
        self.warnings.push(LexWarning {
            id,
            span: Span::new(start as u32, self.pos.max(start + 1) as u32),
            message: message.into(),
            verbose,
        });
    }

    fn at_line_start(&self) -> bool {
        self.pos == 0 || self.src[self.pos - 1] == b'\n'
    }

    fn skip_line_body(&mut self) {
        while let Some(byte) = self.peek() {
            if byte == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_embedded_document(&mut self) -> PResult<()> {
        let start = self.pos;
        loop {
            self.skip_line_body();
            if self.peek().is_none() {
                return Err(self.error_at(start, "embedded document meets end of file"));
            }
            self.pos += 1;
            if self.starts_with(b"=end")
                && self.peek_at(4).is_none_or(|byte| byte.is_ascii_whitespace())
            {
                self.skip_line_body();
                return Ok(());
            }
        }
    }

    fn is_end_marker(&self) -> bool {
        self.starts_with(b"__END__")
            && matches!(self.peek_at(7), None | Some(b'\n' | b'\r'))
    }

    /// Whether the next significant line starts with `.foo` or `&.foo`
    fn continues_with_leading_dot(&self) -> bool {
        let mut cursor = self.pos;
        loop {
            while cursor < self.src.len() && matches!(self.src[cursor], b' ' | b'\t' | b'\r' | b'\x0c') {
                cursor += 1;
            }
            match self.src.get(cursor) {
                Some(b'#') => {
                    while cursor < self.src.len() && self.src[cursor] != b'\n' {
                        cursor += 1;
                    }
                }
                Some(b'\n') => cursor += 1,
                Some(b'.') => return self.src.get(cursor + 1) != Some(&b'.'),
                Some(b'&') => return self.src.get(cursor + 1) == Some(&b'.'),
                _ => return false,
            }
        }
    }

    fn lex_code(&mut self, locals: &dyn LocalLookup) -> PResult<Token> {
        self.space_seen = false;
        loop {
            if self.at_line_start() {
                if self.starts_with(b"=begin")
                    && self.peek_at(6).is_none_or(|byte| byte.is_ascii_whitespace())
                {
                    self.skip_embedded_document()?;
                    continue;
                }
                if self.is_end_marker() {
                    self.skip_line_body();
                    if self.peek() == Some(b'\n') {
                        self.pos += 1;
                    }
                    self.data_start = Some(self.pos);
                    self.src = &self.src[..self.pos];
                    let start = self.pos;
                    return Ok(self.make(TokenKind::Eof, start, true));
                }
            }
            match self.peek() {
                None => {
                    if !self.modes.is_empty() {
                        return Err(self.error_at(self.pos, "unterminated string meets end of file"));
                    }
                    let start = self.pos;
                    return Ok(self.make(TokenKind::Eof, start, self.space_seen));
                }
                Some(b' ' | b'\t' | b'\r' | b'\x0b' | b'\x0c') => {
                    self.pos += 1;
                    self.space_seen = true;
                }
                Some(b'\\') if self.peek_at(1) == Some(b'\n') => {
                    self.pos += 2;
                    self.space_seen = true;
                }
                Some(b'\\') if self.peek_at(1) == Some(b'\r') && self.peek_at(2) == Some(b'\n') => {
                    self.pos += 3;
                    self.space_seen = true;
                }
                Some(b'#') => self.skip_line_body(),
                Some(b'\n') => {
                    let start = self.pos;
                    self.pos += 1;
                    if let Some(end) = self.heredoc_end.take() {
                        if end > self.pos {
                            self.pos = end;
                        }
                    }
                    let skip = matches!(
                        self.state,
                        LexState::Beg | LexState::Class | LexState::Fname | LexState::Dot
                    ) || self.continues_with_leading_dot();
                    if skip {
                        self.space_seen = true;
                        continue;
                    }
                    self.state = LexState::Beg;
                    let mut token = self.make(TokenKind::NewLine, start, self.space_seen);
                    token.span = Span::new(start as u32, start as u32 + 1);
                    return Ok(token);
                }
                Some(_) => break,
            }
        }

        let start = self.pos;
        let space = self.space_seen;
        let kind = self.lex_code_token(locals)?;
        Ok(self.make(kind, start, space))
    }

    fn spcarg(&self) -> bool {
        self.state == LexState::Arg
            && self.space_seen
            && !self.peek().is_some_and(|byte| byte.is_ascii_whitespace())
    }

    fn after_operator(&mut self) {
        self.state = if matches!(self.state, LexState::Fname | LexState::Dot) {
            LexState::Arg
        } else {
            LexState::Beg
        };
    }

    fn lex_code_token(&mut self, locals: &dyn LocalLookup) -> PResult<TokenKind> {
        let start = self.pos;
        let Some(byte) = self.peek() else {
            return Ok(TokenKind::Eof);
        };
        self.pos += 1;
        let kind = match byte {
            b'*' => {
                if self.peek() == Some(b'*') {
                    self.pos += 1;
                    if self.peek() == Some(b'=') {
                        self.pos += 1;
                        self.state = LexState::Beg;
                        return Ok(TokenKind::OpAssign("**".to_string()));
                    }
                    let splat = self.state.is_beg() || self.spcarg();
                    self.after_operator();
                    return Ok(if splat { TokenKind::DSplat } else { TokenKind::Pow });
                }
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    self.state = LexState::Beg;
                    return Ok(TokenKind::OpAssign("*".to_string()));
                }
                let splat = self.state.is_beg() || self.spcarg();
                if self.spcarg() {
                    self.warn(
                        DiagnosticId::AmbiguousFirstArgument,
                        start,
                        "`*' interpreted as argument prefix",
                        true,
                    );
                }
                self.after_operator();
                if splat { TokenKind::Splat } else { TokenKind::Star }
            }
            b'!' => {
                let kind = match self.peek() {
                    Some(b'=') => {
                        self.pos += 1;
                        TokenKind::NotEq
                    }
                    Some(b'~') => {
                        self.pos += 1;
                        TokenKind::NotMatch
                    }
                    Some(b'@') if matches!(self.state, LexState::Fname | LexState::Dot) => {
                        self.pos += 1;
                        TokenKind::Bang
                    }
                    _ => TokenKind::Bang,
                };
                self.after_operator();
                kind
            }
            b'=' => {
                let kind = if self.starts_with(b"==") {
                    self.pos += 2;
                    TokenKind::EqEqEq
                } else if self.peek() == Some(b'=') {
                    self.pos += 1;
                    TokenKind::EqEq
                } else if self.peek() == Some(b'~') {
                    self.pos += 1;
                    TokenKind::Match
                } else if self.peek() == Some(b'>') {
                    self.pos += 1;
                    TokenKind::Arrow
                } else {
                    TokenKind::Assign
                };
                self.after_operator();
                kind
            }
            b'<' => {
                if self.peek() == Some(b'<')
                    && self.state != LexState::Class
                    && (self.state.is_beg() || (self.state == LexState::Arg && self.space_seen))
                {
                    if let Some(kind) = self.try_heredoc(start)? {
                        return Ok(kind);
                    }
                }
                let kind = if self.starts_with(b"=>") {
                    self.pos += 2;
                    TokenKind::Cmp
                } else if self.peek() == Some(b'=') {
                    self.pos += 1;
                    TokenKind::Le
                } else if self.starts_with(b"<=") {
                    self.pos += 2;
                    self.state = LexState::Beg;
                    return Ok(TokenKind::OpAssign("<<".to_string()));
                } else if self.peek() == Some(b'<') {
                    self.pos += 1;
                    TokenKind::LShift
                } else {
                    TokenKind::Lt
                };
                self.after_operator();
                kind
            }
            b'>' => {
                let kind = if self.peek() == Some(b'=') {
                    self.pos += 1;
                    TokenKind::Ge
                } else if self.starts_with(b">=") {
                    self.pos += 2;
                    self.state = LexState::Beg;
                    return Ok(TokenKind::OpAssign(">>".to_string()));
                } else if self.peek() == Some(b'>') {
                    self.pos += 1;
                    TokenKind::RShift
                } else {
                    TokenKind::Gt
                };
                self.after_operator();
                kind
            }
            b'"' => self.begin_string(StringKind::Plain, true, b'"', None),
            b'\'' => self.begin_string(StringKind::Plain, false, b'\'', None),
            b'`' => {
                if matches!(self.state, LexState::Fname | LexState::Dot) {
                    self.state = LexState::EndFn;
                    TokenKind::BacktickName
                } else {
                    self.begin_string(StringKind::XString, true, b'`', None)
                }
            }
            b'?' => self.lex_question(start)?,
            b'&' => {
                let kind = if self.starts_with(b"&=") {
                    self.pos += 2;
                    self.state = LexState::Beg;
                    return Ok(TokenKind::OpAssign("&&".to_string()));
                } else if self.peek() == Some(b'&') {
                    self.pos += 1;
                    TokenKind::AndAnd
                } else if self.peek() == Some(b'=') {
                    self.pos += 1;
                    self.state = LexState::Beg;
                    return Ok(TokenKind::OpAssign("&".to_string()));
                } else if self.peek() == Some(b'.') {
                    self.pos += 1;
                    self.state = LexState::Dot;
                    return Ok(TokenKind::AndDot);
                } else if self.state.is_beg() || self.spcarg() {
                    if self.spcarg() {
                        self.warn(
                            DiagnosticId::AmbiguousFirstArgument,
                            start,
                            "`&' interpreted as argument prefix",
                            true,
                        );
                    }
                    TokenKind::BlockAmper
                } else {
                    TokenKind::Amper
                };
                self.after_operator();
                kind
            }
            b'|' => {
                let kind = if self.starts_with(b"|=") {
                    self.pos += 2;
                    self.state = LexState::Beg;
                    return Ok(TokenKind::OpAssign("||".to_string()));
                } else if self.peek() == Some(b'|') && self.state != LexState::Beg {
                    self.pos += 1;
                    TokenKind::OrOr
                } else if self.peek() == Some(b'=') {
                    self.pos += 1;
                    self.state = LexState::Beg;
                    return Ok(TokenKind::OpAssign("|".to_string()));
                } else {
                    TokenKind::Pipe
                };
                self.after_operator();
                kind
            }
            b'+' => self.lex_sign(start, true),
            b'-' => self.lex_sign(start, false),
            b'.' => {
                if self.starts_with(b"..") {
                    self.pos += 2;
                    self.state = LexState::Beg;
                    TokenKind::Dot3
                } else if self.peek() == Some(b'.') {
                    self.pos += 1;
                    self.state = LexState::Beg;
                    TokenKind::Dot2
                } else if self.peek().is_some_and(|byte| byte.is_ascii_digit()) {
                    return Err(self.error_at(
                        start,
                        "no .<digit> floating literal anymore; put 0 before dot",
                    ));
                } else {
                    self.state = LexState::Dot;
                    TokenKind::Dot
                }
            }
            b'0'..=b'9' => {
                self.pos -= 1;
                let kind = self.lex_number()?;
                self.state = LexState::End;
                kind
            }
            b')' => {
                self.state = LexState::EndFn;
                TokenKind::RParen
            }
            b']' => {
                self.state = LexState::End;
                TokenKind::RBrack
            }
            b'}' => {
                if let Some(Mode::Interp { depth }) = self.modes.last_mut() {
                    if *depth == 0 {
                        self.modes.pop();
                        return Ok(TokenKind::StringDEnd);
                    }
                    *depth -= 1;
                }
                self.state = LexState::End;
                TokenKind::RBrace
            }
            b':' => self.lex_colon(start)?,
            b'/' => {
                if self.state.is_beg() {
                    return Ok(self.begin_string(StringKind::Regexp, true, b'/', None));
                }
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    self.state = LexState::Beg;
                    return Ok(TokenKind::OpAssign("/".to_string()));
                }
                if self.spcarg() {
                    self.warn(
                        DiagnosticId::AmbiguousFirstArgument,
                        start,
                        "ambiguous first argument; put parentheses or a space even after `/' operator",
                        true,
                    );
                    return Ok(self.begin_string(StringKind::Regexp, true, b'/', None));
                }
                self.after_operator();
                TokenKind::Slash
            }
            b'^' => {
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    self.state = LexState::Beg;
                    return Ok(TokenKind::OpAssign("^".to_string()));
                }
                self.after_operator();
                TokenKind::Caret
            }
            b';' => {
                self.state = LexState::Beg;
                TokenKind::Semi
            }
            b',' => {
                self.state = LexState::Beg;
                TokenKind::Comma
            }
            b'~' => {
                if matches!(self.state, LexState::Fname | LexState::Dot) && self.peek() == Some(b'@') {
                    self.pos += 1;
                }
                self.after_operator();
                TokenKind::Tilde
            }
            b'(' => {
                let kind = if self.state.is_beg() {
                    TokenKind::LParen
                } else if !self.space_seen {
                    TokenKind::LParenCall
                } else if self.state == LexState::Arg {
                    TokenKind::LParenArg
                } else {
                    TokenKind::LParen
                };
                self.state = LexState::Beg;
                kind
            }
            b'[' => {
                if matches!(self.state, LexState::Fname | LexState::Dot) {
                    if self.starts_with(b"]=") {
                        self.pos += 2;
                        self.state = LexState::Arg;
                        return Ok(TokenKind::Aset);
                    }
                    if self.peek() == Some(b']') {
                        self.pos += 1;
                        self.state = LexState::Arg;
                        return Ok(TokenKind::Aref);
                    }
                    self.state = LexState::Beg;
                    return Ok(TokenKind::LBrackIndex);
                }
                let kind = if self.state.is_beg() || (self.state == LexState::Arg && self.space_seen) {
                    TokenKind::LBrack
                } else {
                    TokenKind::LBrackIndex
                };
                self.state = LexState::Beg;
                kind
            }
            b'{' => {
                if let Some(Mode::Interp { depth }) = self.modes.last_mut() {
                    *depth += 1;
                }
                self.state = LexState::Beg;
                TokenKind::LBrace
            }
            b'\\' => return Err(self.error_at(start, "backslash not followed by newline")),
            b'%' => {
                if self.state.is_beg()
                    || (self.spcarg() && self.peek() != Some(b'='))
                {
                    return self.begin_percent_literal(start);
                }
                if self.peek() == Some(b'=') {
                    self.pos += 1;
                    self.state = LexState::Beg;
                    return Ok(TokenKind::OpAssign("%".to_string()));
                }
                self.after_operator();
                TokenKind::Percent
            }
            b'$' => {
                self.pos -= 1;
                let kind = self.lex_variable_after_sigil()?;
                self.state = LexState::End;
                kind
            }
            b'@' => {
                self.pos -= 1;
                let kind = self.lex_variable_after_sigil()?;
                self.state = LexState::End;
                kind
            }
            byte if is_identifier_start(byte) => {
                self.pos -= 1;
                self.lex_identifier(start, locals)?
            }
            other => {
                return Err(self.error_at(
                    start,
                    format!("Invalid char `\\x{other:02X}' in expression"),
                ));
            }
        };
        Ok(kind)
    }

    fn lex_sign(&mut self, start: usize, plus: bool) -> TokenKind {
        let op = if plus { "+" } else { "-" };
        if matches!(self.state, LexState::Fname | LexState::Dot) {
            self.state = LexState::Arg;
            if self.peek() == Some(b'@') {
                self.pos += 1;
                return TokenKind::UnaryOpName(format!("{op}@"));
            }
            return if plus { TokenKind::Plus } else { TokenKind::Minus };
        }
        if self.peek() == Some(b'=') {
            self.pos += 1;
            self.state = LexState::Beg;
            return TokenKind::OpAssign(op.to_string());
        }
        if !plus && self.peek() == Some(b'>') {
            self.pos += 1;
            self.state = LexState::EndFn;
            return TokenKind::Lambda;
        }
        let spcarg = self.spcarg();
        if self.state.is_beg() || spcarg {
            if spcarg {
                self.warn(
                    DiagnosticId::AmbiguousFirstArgument,
                    start,
                    format!("ambiguous first argument; put parentheses or a space even after `{op}' operator"),
                    true,
                );
            }
            self.state = LexState::Beg;
            let before_digit = self.peek().is_some_and(|byte| byte.is_ascii_digit());
            return match (plus, before_digit) {
                (true, _) => TokenKind::UPlus,
                (false, true) => TokenKind::UMinusNum,
                (false, false) => TokenKind::UMinus,
            };
        }
        self.state = LexState::Beg;
        if plus { TokenKind::Plus } else { TokenKind::Minus }
    }

    fn lex_question(&mut self, start: usize) -> PResult<TokenKind> {
        let ternary = |lexer: &mut Self| {
            lexer.ternary_depth += 1;
            lexer.state = LexState::Beg;
            TokenKind::Question
        };
        if self.state.is_end() {
            return Ok(ternary(self));
        }
        let Some(next) = self.peek() else {
            return Err(self.error_at(start, "incomplete character syntax"));
        };
        if next.is_ascii_whitespace() {
            return Ok(ternary(self));
        }
        if is_identifier_char(next) && self.peek_at(1).is_some_and(is_identifier_char) {
            return Ok(ternary(self));
        }
        let bytes = if next == b'\\' {
            self.pos += 1;
            self.read_escape(start)?
        } else {
            let len = utf8_sequence_len(next);
            let end = (self.pos + len).min(self.src.len());
            let bytes = self.src[self.pos..end].to_vec();
            if self.utf8 && std::str::from_utf8(&bytes).is_err() {
                return Err(self.error_at(start, "invalid multibyte char (UTF-8)"));
            }
            self.pos = end;
            bytes
        };
        self.state = LexState::End;
        Ok(TokenKind::Char(bytes))
    }

    fn lex_colon(&mut self, start: usize) -> PResult<TokenKind> {
        if self.peek() == Some(b':') {
            self.pos += 1;
            if self.state.is_beg() || (self.state == LexState::Arg && self.space_seen) {
                self.state = LexState::Beg;
                return Ok(TokenKind::Colon3);
            }
            self.state = LexState::Dot;
            return Ok(TokenKind::Colon2);
        }
        let in_ternary = self.ternary_depth > 0 && !self.state.is_beg();
        if in_ternary
            || self.state.is_end()
            || self.peek().is_none_or(|byte| byte.is_ascii_whitespace() || byte == b'#')
        {
            self.ternary_depth = self.ternary_depth.saturating_sub(1);
            self.state = LexState::Beg;
            return Ok(TokenKind::Colon);
        }
        match self.peek() {
            Some(b'"') => {
                self.pos += 1;
                return Ok(self.begin_string(StringKind::Symbol, true, b'"', None));
            }
            Some(b'\'') => {
                self.pos += 1;
                return Ok(self.begin_string(StringKind::Symbol, false, b'\'', None));
            }
            _ => {}
        }
        let name = self.lex_symbol_name(start)?;
        self.state = LexState::End;
        Ok(TokenKind::Symbol(name))
    }

    fn lex_symbol_name(&mut self, start: usize) -> PResult<String> {
        const OPERATORS: [&str; 28] = [
            "[]=", "[]", "<=>", "===", "==", "=~", "!=", "!~", "**", "+@", "-@", "<<", ">>",
            "<=", ">=", "!", "+", "-", "*", "/", "%", "<", ">", "&", "|", "^", "~", "`",
        ];
        for op in OPERATORS {
            if self.starts_with(op.as_bytes()) {
                self.pos += op.len();
                return Ok(op.to_string());
            }
        }
        let name_start = self.pos;
        if matches!(self.peek(), Some(b'@' | b'$')) {
            let kind = self.lex_variable_after_sigil()?;
            return match kind {
                TokenKind::IVar(name) | TokenKind::CVar(name) | TokenKind::GVar(name) => Ok(name),
                TokenKind::NthRef(index) => Ok(format!("${index}")),
                TokenKind::BackRef(ch) => Ok(format!("${ch}")),
                _ => Err(self.error_at(start, "invalid symbol")),
            };
        }
        if !self.peek().is_some_and(is_identifier_start) {
            return Err(self.error_at(start, "syntax error, unexpected ':'"));
        }
        while self.peek().is_some_and(is_identifier_char) {
            self.pos += 1;
        }
        match self.peek() {
            Some(b'?' | b'!') if self.peek_at(1) != Some(b'=') => self.pos += 1,
            Some(b'=') if !matches!(self.peek_at(1), Some(b'=' | b'~' | b'>')) => self.pos += 1,
            _ => {}
        }
        self.text(name_start, self.pos)
    }

    /// `$x`, `@x`, `@@x` starting at the sigil
    fn lex_variable_after_sigil(&mut self) -> PResult<TokenKind> {
        let start = self.pos;
        if self.peek() == Some(b'@') {
            self.pos += 1;
            let class_var = self.peek() == Some(b'@');
            if class_var {
                self.pos += 1;
            }
            if self.peek().is_some_and(|byte| byte.is_ascii_digit()) {
                let what = if class_var { "class" } else { "instance" };
                return Err(self.error_at(
                    start,
                    format!("`{}' is not allowed as {what} variable name", self.lossy(start, self.pos + 1)),
                ));
            }
            if !self.peek().is_some_and(is_identifier_start) {
                return Err(self.error_at(start, "`@' without identifiers is not allowed as an instance variable name"));
            }
            while self.peek().is_some_and(is_identifier_char) {
                self.pos += 1;
            }
            let name = self.text(start, self.pos)?;
            return Ok(if class_var { TokenKind::CVar(name) } else { TokenKind::IVar(name) });
        }

        // global variable
        self.pos += 1;
        let Some(byte) = self.peek() else {
            return Err(self.error_at(start, "`$' without identifiers is not allowed as a global variable name"));
        };
        match byte {
            b'_' if !self.peek_at(1).is_some_and(is_identifier_char) => {
                self.pos += 1;
                Ok(TokenKind::GVar("$_".to_string()))
            }
            b'~' | b'*' | b'$' | b'?' | b'!' | b'@' | b'/' | b'\\' | b';' | b',' | b'.' | b'='
            | b':' | b'<' | b'>' | b'"' | b'0' => {
                self.pos += 1;
                Ok(TokenKind::GVar(format!("${}", char::from(byte))))
            }
            b'-' => {
                self.pos += 1;
                if self.peek().is_some_and(is_identifier_char) {
                    self.pos += 1;
                }
                Ok(TokenKind::GVar(self.text(start, self.pos)?))
            }
            b'&' | b'`' | b'\'' | b'+' => {
                self.pos += 1;
                if self.state == LexState::Fname {
                    return Ok(TokenKind::GVar(format!("${}", char::from(byte))));
                }
                Ok(TokenKind::BackRef(char::from(byte)))
            }
            b'1'..=b'9' => {
                let digits_start = self.pos;
                while self.peek().is_some_and(|digit| digit.is_ascii_digit()) {
                    self.pos += 1;
                }
                let digits = self.text(digits_start, self.pos)?;
                if self.state == LexState::Fname {
                    return Ok(TokenKind::GVar(format!("${digits}")));
                }
                digits
                    .parse::<u32>()
                    .map(TokenKind::NthRef)
                    .map_err(|_| self.error_at(start, format!("`${digits}' is too big for a back reference")))
            }
            byte if is_identifier_start(byte) => {
                while self.peek().is_some_and(is_identifier_char) {
                    self.pos += 1;
                }
                Ok(TokenKind::GVar(self.text(start, self.pos)?))
            }
            _ => Err(self.error_at(
                start,
                format!("`{}' is not allowed as a global variable name", self.lossy(start, self.pos + 1)),
            )),
        }
    }

    fn lex_identifier(&mut self, start: usize, locals: &dyn LocalLookup) -> PResult<TokenKind> {
        while self.peek().is_some_and(is_identifier_char) {
            self.pos += 1;
        }
        let mut end = self.pos;
        let mut fid = false;
        if matches!(self.peek(), Some(b'?' | b'!'))
            && (self.peek_at(1) != Some(b'=') || matches!(self.peek_at(2), Some(b'=' | b'~' | b'>')))
        {
            self.pos += 1;
            end = self.pos;
            fid = true;
        }
        let word = self.text(start, end)?;
        let prior = self.state;

        // setter names in definitions
        if prior == LexState::Fname
            && !fid
            && self.peek() == Some(b'=')
            && !matches!(self.peek_at(1), Some(b'~' | b'>'))
            && (self.peek_at(1) != Some(b'=') || self.peek_at(2) == Some(b'>'))
        {
            self.pos += 1;
            self.state = LexState::EndFn;
            return Ok(TokenKind::Ident(format!("{word}=")));
        }

        let label_possible = matches!(prior, LexState::Beg | LexState::Arg | LexState::EndFn | LexState::Mid)
            && self.ternary_depth == 0;
        if label_possible && self.peek() == Some(b':') && self.peek_at(1) != Some(b':') {
            self.pos += 1;
            self.state = LexState::Beg;
            return Ok(TokenKind::Label(word));
        }

        if prior != LexState::Dot {
            if let Some(keyword) = Keyword::from_word(&word) {
                let is_def_receiver = keyword == Keyword::SelfKw && self.peek() == Some(b'.');
                if prior != LexState::Fname || is_def_receiver {
                    return Ok(TokenKind::Keyword(self.keyword_state(keyword, prior)));
                }
            }
        }

        let first = word.as_bytes()[0];
        self.state = match prior {
            LexState::Fname => LexState::EndFn,
            LexState::Dot => LexState::Arg,
            _ if !fid && locals.is_local(&word) => LexState::End,
            _ => LexState::Arg,
        };
        if first.is_ascii_uppercase() {
            return Ok(TokenKind::Const(word));
        }
        if fid {
            return Ok(TokenKind::FId(word));
        }
        Ok(TokenKind::Ident(word))
    }

    fn keyword_state(&mut self, keyword: Keyword, prior: LexState) -> Keyword {
        let modifier = !matches!(prior, LexState::Beg | LexState::Class | LexState::Fname);
        let keyword = if modifier { keyword.as_modifier() } else { keyword };
        self.state = match keyword {
            Keyword::Def | Keyword::Alias | Keyword::Undef => LexState::Fname,
            Keyword::Class => LexState::Class,
            Keyword::Return | Keyword::Break | Keyword::Next | Keyword::Rescue => LexState::Mid,
            Keyword::Defined | Keyword::Super | Keyword::Yield | Keyword::Not => LexState::Arg,
            Keyword::End
            | Keyword::SelfKw
            | Keyword::Nil
            | Keyword::True
            | Keyword::False
            | Keyword::File
            | Keyword::Line
            | Keyword::Encoding
            | Keyword::Redo
            | Keyword::Retry => LexState::End,
            _ => LexState::Beg,
        };
        keyword
    }

    fn text(&self, start: usize, end: usize) -> PResult<String> {
        let bytes = &self.src[start..end];
        match std::str::from_utf8(bytes) {
            Ok(text) => Ok(text.to_string()),
            Err(_) if !self.utf8 => Ok(String::from_utf8_lossy(bytes).into_owned()),
            Err(_) => Err(Failure::syntax(
                "invalid multibyte char (UTF-8)",
                Span::new(start as u32, end as u32),
            )),
        }
    }

    fn lossy(&self, start: usize, end: usize) -> String {
        let end = end.min(self.src.len());
        String::from_utf8_lossy(&self.src[start..end]).into_owned()
    }
}

/// Whether `byte` can start an identifier
pub(crate) fn is_identifier_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte >= 0x80
}

/// Whether `byte` can continue an identifier
pub(crate) fn is_identifier_char(byte: u8) -> bool {
    is_identifier_start(byte) || byte.is_ascii_digit()
}

/// Length of the UTF-8 sequence introduced by `byte`
pub(crate) fn utf8_sequence_len(byte: u8) -> usize {
    match byte {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

#[cfg(test)]
mod tests;
