//! String-like literal bodies: quotes, `%` literals, regexps and heredocs

use super::token::{StringKind, TokenKind};
use super::{LexState, Lexer, Mode, is_identifier_char, is_identifier_start, utf8_sequence_len};
use crate::error::{InternalError, PResult};
use gt_syntax::RegexpOptions;

/// What terminates the literal currently being lexed
#[derive(Debug, Clone)]
pub(super) struct StrTerm {
    kind: StringKind,
    expand: bool,
    term: u8,
    open: Option<u8>,
    nest: u32,
    opened_at: usize,
    heredoc: Option<Heredoc>,
}

#[derive(Debug, Clone)]
struct Heredoc {
    id: Vec<u8>,
    indented: bool,
    dedent: Option<usize>,
    resume: usize,
    at_line_start: bool,
}

const TAB_WIDTH: usize = 8;

impl Lexer<'_> {
    /// Push a quoted literal and return its opening token
    pub(super) fn begin_string(
        &mut self,
        kind: StringKind,
        expand: bool,
        term: u8,
        open: Option<u8>,
    ) -> TokenKind {
        let opened_at = self.pos.saturating_sub(1);
        self.modes.push(Mode::Str(StrTerm {
            kind,
            expand,
            term,
            open,
            nest: 0,
            opened_at,
            heredoc: None,
        }));
        TokenKind::StringBeg(kind)
    }

    /// `%` literal; the cursor is just past the `%`
    pub(super) fn begin_percent_literal(&mut self, start: usize) -> PResult<TokenKind> {
        let Some(first) = self.peek() else {
            return Err(self.error_at(start, "unterminated quoted string meets end of file"));
        };
        let (kind_char, delimiter) = if first.is_ascii_alphanumeric() {
            self.pos += 1;
            match self.peek() {
                Some(delimiter) if !delimiter.is_ascii_alphanumeric() => (first, delimiter),
                Some(_) => return Err(self.error_at(start, "unknown type of %string")),
                None => {
                    return Err(self.error_at(start, "unterminated quoted string meets end of file"));
                }
            }
        } else {
            (b'Q', first)
        };
        let (kind, expand) = match kind_char {
            b'Q' => (StringKind::Plain, true),
            b'q' => (StringKind::Plain, false),
            b'W' => (StringKind::Words, true),
            b'w' => (StringKind::Words, false),
            b'I' => (StringKind::Symbols, true),
            b'i' => (StringKind::Symbols, false),
            b's' => (StringKind::Symbol, false),
            b'r' => (StringKind::Regexp, true),
            b'x' => (StringKind::XString, true),
            _ => return Err(self.error_at(start, "unknown type of %string")),
        };
        self.pos += 1;
        let (open, term) = match delimiter {
            b'(' => (Some(b'('), b')'),
            b'[' => (Some(b'['), b']'),
            b'{' => (Some(b'{'), b'}'),
            b'<' => (Some(b'<'), b'>'),
            other => (None, other),
        };
        let token = self.begin_string(kind, expand, term, open);
        if let Some(Mode::Str(str_term)) = self.modes.last_mut() {
            str_term.opened_at = start;
        }
        if matches!(kind, StringKind::Words | StringKind::Symbols) {
            while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
                self.pos += 1;
            }
        }
        Ok(token)
    }

    /// `<<ID`, `<<-ID`, `<<~ID` and quoted forms; the cursor is on the second `<`.
    ///
    /// Returns `None` without consuming anything when no identifier follows.
    pub(super) fn try_heredoc(&mut self, start: usize) -> PResult<Option<TokenKind>> {
        let mut cursor = self.pos + 1;
        let mut indented = false;
        let mut squiggly = false;
        match self.src.get(cursor) {
            Some(b'-') => {
                indented = true;
                cursor += 1;
            }
            Some(b'~') => {
                indented = true;
                squiggly = true;
                cursor += 1;
            }
            _ => {}
        }
        let (id, expand, kind) = match self.src.get(cursor).copied() {
            Some(quote @ (b'"' | b'\'' | b'`')) => {
                let id_start = cursor + 1;
                let length = self.src[id_start..]
                    .iter()
                    .position(|byte| *byte == quote || *byte == b'\n');
                let Some(length) = length.filter(|length| self.src[id_start + length] == quote) else {
                    return Err(self.error_at(start, "unterminated here document identifier"));
                };
                cursor = id_start + length + 1;
                let kind = if quote == b'`' { StringKind::XString } else { StringKind::Plain };
                (self.src[id_start..id_start + length].to_vec(), quote != b'\'', kind)
            }
            Some(byte) if is_identifier_char(byte) => {
                let id_start = cursor;
                while self.src.get(cursor).copied().is_some_and(is_identifier_char) {
                    cursor += 1;
                }
                (self.src[id_start..cursor].to_vec(), true, StringKind::Plain)
            }
            _ => return Ok(None),
        };

        let body_start = match self.heredoc_end {
            Some(end) => end,
            None => self.src[cursor..]
                .iter()
                .position(|byte| *byte == b'\n')
                .map_or(self.src.len(), |offset| cursor + offset + 1),
        };
        let dedent = squiggly.then(|| self.heredoc_dedent(body_start, &id));
        self.modes.push(Mode::Str(StrTerm {
            kind,
            expand,
            term: b'\n',
            open: None,
            nest: 0,
            opened_at: start,
            heredoc: Some(Heredoc {
                id,
                indented,
                dedent,
                resume: cursor,
                at_line_start: true,
            }),
        }));
        self.pos = body_start;
        Ok(Some(TokenKind::StringBeg(kind)))
    }

    /// Next token inside the literal on top of the mode stack
    pub(super) fn lex_string_token(&mut self) -> PResult<super::Token> {
        let Some(Mode::Str(mut term)) = self.modes.pop() else {
            return Err(InternalError::StringStack.into());
        };
        let start = self.pos;
        let kind = if term.heredoc.is_some() {
            self.heredoc_part(&mut term)?
        } else {
            self.string_part(&mut term)?
        };
        match &kind {
            TokenKind::StringEnd | TokenKind::RegexpEnd(_) => self.state = LexState::End,
            TokenKind::StringDBeg => {
                self.modes.push(Mode::Str(term));
                self.modes.push(Mode::Interp { depth: 0 });
                self.state = LexState::Beg;
            }
            TokenKind::StringDVar => {
                self.modes.push(Mode::Str(term));
                self.dvar_pending = true;
                self.state = LexState::Beg;
            }
            _ => self.modes.push(Mode::Str(term)),
        }
        Ok(self.make(kind, start, false))
    }

    fn string_part(&mut self, term: &mut StrTerm) -> PResult<TokenKind> {
        let words = matches!(term.kind, StringKind::Words | StringKind::Symbols);
        if words && self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.peek() != Some(term.term) || term.nest > 0 {
                return Ok(TokenKind::WordSep);
            }
        }

        let mut buf = Vec::new();
        loop {
            let Some(byte) = self.peek() else {
                let what = match term.kind {
                    StringKind::Regexp => "unterminated regexp meets end of file",
                    StringKind::Words | StringKind::Symbols => "unterminated list meets end of file",
                    _ => "unterminated string meets end of file",
                };
                return Err(self.error_at(term.opened_at, what));
            };
            if term.open == Some(byte) {
                term.nest += 1;
                buf.push(byte);
                self.pos += 1;
                continue;
            }
            if byte == term.term {
                if term.nest > 0 {
                    term.nest -= 1;
                    buf.push(byte);
                    self.pos += 1;
                    continue;
                }
                if !buf.is_empty() {
                    return Ok(TokenKind::StringContent(buf));
                }
                self.pos += 1;
                if term.kind == StringKind::Regexp {
                    return self.regexp_options().map(TokenKind::RegexpEnd);
                }
                return Ok(TokenKind::StringEnd);
            }
            if words && byte.is_ascii_whitespace() {
                return Ok(TokenKind::StringContent(buf));
            }
            if byte == b'#' && term.expand {
                if let Some((consume, kind)) = self.interpolation_ahead() {
                    if !buf.is_empty() {
                        return Ok(TokenKind::StringContent(buf));
                    }
                    self.pos += consume;
                    return Ok(kind);
                }
            }
            if byte == b'\\' {
                self.pos += 1;
                self.string_escape(term, words, &mut buf)?;
                continue;
            }
            self.push_source_char(&mut buf)?;
        }
    }

    fn string_escape(&mut self, term: &StrTerm, words: bool, buf: &mut Vec<u8>) -> PResult<()> {
        let Some(next) = self.peek() else {
            return Err(self.error_at(term.opened_at, "unterminated string meets end of file"));
        };
        if words && next.is_ascii_whitespace() {
            buf.push(next);
            self.pos += 1;
            return Ok(());
        }
        if term.kind == StringKind::Regexp {
            self.pos += 1;
            if next == term.term && term.term == b'/' {
                buf.push(next);
            } else if next != b'\n' {
                buf.push(b'\\');
                buf.push(next);
            }
            return Ok(());
        }
        if term.expand {
            let bytes = self.read_escape(term.opened_at)?;
            buf.extend_from_slice(&bytes);
            return Ok(());
        }
        if next == b'\\' || next == term.term || term.open == Some(next) {
            buf.push(next);
            self.pos += 1;
        } else {
            buf.push(b'\\');
        }
        Ok(())
    }

    fn heredoc_part(&mut self, term: &mut StrTerm) -> PResult<TokenKind> {
        let expand = term.expand;
        let opened_at = term.opened_at;
        let Some(heredoc) = term.heredoc.as_mut() else {
            return Err(InternalError::StringStack.into());
        };
        let mut buf = Vec::new();
        loop {
            if heredoc.at_line_start {
                if let Some(line_end) = self.heredoc_terminator_at(self.pos, &heredoc.id, heredoc.indented) {
                    if !buf.is_empty() {
                        return Ok(TokenKind::StringContent(buf));
                    }
                    self.heredoc_end = Some(line_end);
                    self.pos = heredoc.resume;
                    return Ok(TokenKind::StringEnd);
                }
                if let Some(width) = heredoc.dedent {
                    self.skip_indent(width);
                }
                heredoc.at_line_start = false;
            }
            let Some(byte) = self.peek() else {
                let id = String::from_utf8_lossy(&heredoc.id).into_owned();
                return Err(self.error_at(
                    opened_at,
                    format!("can't find string \"{id}\" anywhere before EOF"),
                ));
            };
            match byte {
                b'\n' => {
                    buf.push(b'\n');
                    self.pos += 1;
                    heredoc.at_line_start = true;
                }
                b'#' if expand => {
                    if let Some((consume, kind)) = self.interpolation_ahead() {
                        if !buf.is_empty() {
                            return Ok(TokenKind::StringContent(buf));
                        }
                        self.pos += consume;
                        return Ok(kind);
                    }
                    buf.push(byte);
                    self.pos += 1;
                }
                b'\\' if expand => {
                    self.pos += 1;
                    let continues_line = self.peek() == Some(b'\n');
                    let bytes = self.read_escape(opened_at)?;
                    buf.extend_from_slice(&bytes);
                    if continues_line {
                        heredoc.at_line_start = true;
                    }
                }
                _ => self.push_source_char(&mut buf)?,
            }
        }
    }

    /// End of the terminator line when the line at `pos` terminates the heredoc
    fn heredoc_terminator_at(&self, pos: usize, id: &[u8], indented: bool) -> Option<usize> {
        let mut cursor = pos;
        if indented {
            while matches!(self.src.get(cursor), Some(b' ' | b'\t')) {
                cursor += 1;
            }
        }
        if !self.src[cursor.min(self.src.len())..].starts_with(id) {
            return None;
        }
        cursor += id.len();
        if self.src.get(cursor) == Some(&b'\r') {
            cursor += 1;
        }
        match self.src.get(cursor) {
            None => Some(cursor),
            Some(b'\n') => Some(cursor + 1),
            Some(_) => None,
        }
    }

    /// Smallest indentation of the non-blank body lines of a `<<~` heredoc
    fn heredoc_dedent(&self, body_start: usize, id: &[u8]) -> usize {
        let mut smallest: Option<usize> = None;
        let mut line_start = body_start;
        while line_start < self.src.len() {
            if self.heredoc_terminator_at(line_start, id, true).is_some() {
                break;
            }
            let mut cursor = line_start;
            let mut width = 0;
            while let Some(byte) = self.src.get(cursor) {
                match byte {
                    b' ' => width += 1,
                    b'\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                    _ => break,
                }
                cursor += 1;
            }
            let blank = matches!(self.src.get(cursor), None | Some(b'\n' | b'\r'));
            if !blank {
                smallest = Some(smallest.map_or(width, |current| current.min(width)));
            }
            line_start = self.src[cursor..]
                .iter()
                .position(|byte| *byte == b'\n')
                .map_or(self.src.len(), |offset| cursor + offset + 1);
        }
        smallest.unwrap_or(0)
    }

    fn skip_indent(&mut self, width: usize) {
        let mut column = 0;
        while column < width {
            match self.peek() {
                Some(b' ') => column += 1,
                Some(b'\t') => {
                    let next = (column / TAB_WIDTH + 1) * TAB_WIDTH;
                    if next > width {
                        break;
                    }
                    column = next;
                }
                _ => break,
            }
            self.pos += 1;
        }
    }

    /// Interpolation start at the cursor: bytes to consume and the token
    fn interpolation_ahead(&self) -> Option<(usize, TokenKind)> {
        match self.peek_at(1)? {
            b'{' => Some((2, TokenKind::StringDBeg)),
            b'@' => {
                let after = match self.peek_at(2)? {
                    b'@' => self.peek_at(3)?,
                    other => other,
                };
                is_identifier_start(after).then_some((1, TokenKind::StringDVar))
            }
            b'$' => {
                let after = self.peek_at(2)?;
                let special = b"~*$?!@/\\;,.=:<>\"&`'+0123456789_".contains(&after);
                (is_identifier_start(after) || special).then_some((1, TokenKind::StringDVar))
            }
            _ => None,
        }
    }

    fn regexp_options(&mut self) -> PResult<RegexpOptions> {
        let mut options = RegexpOptions::default();
        let mut unknown = String::new();
        while let Some(byte) = self.peek().filter(u8::is_ascii_alphabetic) {
            match options.with_flag(char::from(byte)) {
                Some(updated) => options = updated,
                None => unknown.push(char::from(byte)),
            }
            self.pos += 1;
        }
        if !unknown.is_empty() {
            let start = self.pos - unknown.len();
            return Err(self.error_at(start, format!("unknown regexp option - {unknown}")));
        }
        Ok(options)
    }

    fn push_source_char(&mut self, buf: &mut Vec<u8>) -> PResult<()> {
        let byte = self.src[self.pos];
        if byte < 0x80 || !self.utf8 {
            buf.push(byte);
            self.pos += 1;
            return Ok(());
        }
        let end = (self.pos + utf8_sequence_len(byte)).min(self.src.len());
        if std::str::from_utf8(&self.src[self.pos..end]).is_err() {
            return Err(self.error_at(self.pos, "invalid multibyte char (UTF-8)"));
        }
        buf.extend_from_slice(&self.src[self.pos..end]);
        self.pos = end;
        Ok(())
    }

    /// Decode a double-quoted escape; the cursor is just past the backslash
    pub(super) fn read_escape(&mut self, start: usize) -> PResult<Vec<u8>> {
        let Some(byte) = self.peek() else {
            return Err(self.error_at(start, "unterminated string meets end of file"));
        };
        self.pos += 1;
        let bytes = match byte {
            b'n' => vec![b'\n'],
            b't' => vec![b'\t'],
            b'r' => vec![b'\r'],
            b's' => vec![b' '],
            b'e' => vec![0x1b],
            b'a' => vec![0x07],
            b'b' => vec![0x08],
            b'f' => vec![0x0c],
            b'v' => vec![0x0b],
            b'0'..=b'7' => {
                let mut value = u32::from(byte - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(digit @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(digit - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                vec![(value & 0xff) as u8]
            }
            b'x' => {
                let mut value = 0u32;
                let mut count = 0;
                while count < 2 {
                    match self.peek().and_then(|digit| char::from(digit).to_digit(16)) {
                        Some(digit) => {
                            value = value * 16 + digit;
                            self.pos += 1;
                            count += 1;
                        }
                        None => break,
                    }
                }
                if count == 0 {
                    return Err(self.error_at(start, "invalid hex escape"));
                }
                vec![value as u8]
            }
            b'u' => self.read_unicode_escape(start)?,
            b'c' => vec![self.read_control(start)?],
            b'C' if self.peek() == Some(b'-') => {
                self.pos += 1;
                vec![self.read_control(start)?]
            }
            b'M' if self.peek() == Some(b'-') => {
                self.pos += 1;
                let inner = match self.peek() {
                    Some(b'\\') => {
                        self.pos += 1;
                        self.read_escape(start)?.first().copied().unwrap_or_default()
                    }
                    Some(inner) => {
                        self.pos += 1;
                        inner
                    }
                    None => return Err(self.error_at(start, "invalid escape character syntax")),
                };
                vec![inner | 0x80]
            }
            b'\n' => Vec::new(),
            b'\r' if self.peek() == Some(b'\n') => {
                self.pos += 1;
                Vec::new()
            }
            other if other >= 0x80 => {
                let begin = self.pos - 1;
                let end = (begin + utf8_sequence_len(other)).min(self.src.len());
                self.pos = end;
                self.src[begin..end].to_vec()
            }
            other => vec![other],
        };
        Ok(bytes)
    }

    fn read_control(&mut self, start: usize) -> PResult<u8> {
        let Some(byte) = self.peek() else {
            return Err(self.error_at(start, "invalid escape character syntax"));
        };
        self.pos += 1;
        let byte = if byte == b'\\' {
            self.read_escape(start)?.first().copied().unwrap_or_default()
        } else {
            byte
        };
        Ok(if byte == b'?' { 0x7f } else { byte & 0x9f })
    }

    fn read_unicode_escape(&mut self, start: usize) -> PResult<Vec<u8>> {
        let mut out = Vec::new();
        if self.peek() == Some(b'{') {
            self.pos += 1;
            loop {
                while matches!(self.peek(), Some(b' ' | b'\t')) {
                    self.pos += 1;
                }
                match self.peek() {
                    Some(b'}') => {
                        self.pos += 1;
                        break;
                    }
                    Some(digit) if digit.is_ascii_hexdigit() => {
                        let mut code = 0u32;
                        let mut count = 0;
                        while let Some(value) = self.peek().and_then(|digit| char::from(digit).to_digit(16)) {
                            if count == 6 {
                                return Err(self.error_at(start, "invalid Unicode codepoint (too large)"));
                            }
                            code = code * 16 + value;
                            count += 1;
                            self.pos += 1;
                        }
                        self.push_codepoint(code, start, &mut out)?;
                    }
                    _ => return Err(self.error_at(start, "unterminated Unicode escape")),
                }
            }
            return Ok(out);
        }
        let mut code = 0u32;
        for _ in 0..4 {
            let Some(value) = self.peek().and_then(|digit| char::from(digit).to_digit(16)) else {
                return Err(self.error_at(start, "invalid Unicode escape"));
            };
            code = code * 16 + value;
            self.pos += 1;
        }
        self.push_codepoint(code, start, &mut out)?;
        Ok(out)
    }

    fn push_codepoint(&self, code: u32, start: usize, out: &mut Vec<u8>) -> PResult<()> {
        let Some(ch) = char::from_u32(code) else {
            return Err(self.error_at(start, "invalid Unicode codepoint"));
        };
        let mut encoded = [0u8; 4];
        out.extend_from_slice(ch.encode_utf8(&mut encoded).as_bytes());
        Ok(())
    }
}
