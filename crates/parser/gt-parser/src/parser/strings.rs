//! String-like literals: strings, symbols, backticks, regexps, word lists

use super::Parser;
use crate::error::PResult;
use crate::lexer::{StringKind, TokenKind};
use crate::support::Variable;
use crate::support::nodes::{literal_concat, new_regexp_node};
use gt_span::Position;
use gt_syntax::{Node, NodeKind, RegexpOptions};

impl Parser<'_, '_> {
    /// Literal opened by the current `StringBeg`; adjacent plain strings join
    pub(super) fn parse_string_literal(&mut self, kind: StringKind) -> PResult<Node> {
        let start = self.pos();
        let mut node = self.parse_string_body(kind, start)?;
        if kind != StringKind::Plain {
            return Ok(node);
        }
        while self.at(&TokenKind::StringBeg(StringKind::Plain)) {
            let next_start = self.pos();
            let next = self.parse_string_body(StringKind::Plain, next_start)?;
            let joined = literal_concat(Some(node), next);
            node = Node::new(joined.kind, self.pos_from(start));
        }
        Ok(node)
    }

    fn parse_string_body(&mut self, kind: StringKind, start: Position) -> PResult<Node> {
        self.advance()?;
        if matches!(kind, StringKind::Words | StringKind::Symbols) {
            return self.parse_word_list(kind, start);
        }
        let contents = self.parse_string_contents()?;
        let end = self.advance()?;
        let pos = self.pos_from(start);
        let node = match kind {
            StringKind::XString => {
                let kind = match contents.map(|node| node.kind) {
                    None => NodeKind::XStr(Vec::new()),
                    Some(NodeKind::Str(bytes)) => NodeKind::XStr(bytes),
                    Some(NodeKind::DStr(parts)) => NodeKind::DXStr(parts),
                    Some(kind) => NodeKind::DXStr(vec![Node::new(kind, pos)]),
                };
                Node::new(kind, pos)
            }
            StringKind::Symbol => match contents {
                Some(contents) => into_symbol(contents, pos),
                None => Node::new(NodeKind::Symbol(String::new()), pos),
            },
            StringKind::Regexp => {
                let options = match end.kind {
                    TokenKind::RegexpEnd(options) => options,
                    _ => RegexpOptions::default(),
                };
                new_regexp_node(contents, options, pos)
            }
            _ => match contents {
                Some(contents) => into_dstr(contents, pos),
                None => Node::new(NodeKind::Str(Vec::new()), pos),
            },
        };
        Ok(node)
    }

    /// Content, interpolation and `#@var` parts up to the closing token
    fn parse_string_contents(&mut self) -> PResult<Option<Node>> {
        let mut head: Option<Node> = None;
        loop {
            let pos = self.pos();
            let part = match self.token.kind.clone() {
                TokenKind::StringContent(bytes) => {
                    self.advance()?;
                    Node::new(NodeKind::Str(bytes), pos)
                }
                TokenKind::StringDBeg => {
                    self.advance()?;
                    let body = self.with_fresh_flags(Self::parse_compstmt)?;
                    self.check(&TokenKind::StringDEnd)?;
                    self.advance()?;
                    Node::new(NodeKind::EvStr(body.map(Box::new)), self.pos_from(pos))
                }
                TokenKind::StringDVar => {
                    self.advance()?;
                    let var = self.parse_string_dvar()?;
                    Node::new(NodeKind::EvStr(Some(Box::new(var))), self.pos_from(pos))
                }
                _ => return Ok(head),
            };
            head = Some(literal_concat(head, part));
        }
    }

    /// Variable after `#` in `"#@ivar"`
    fn parse_string_dvar(&mut self) -> PResult<Node> {
        let pos = self.pos();
        let variable = match self.token.kind.clone() {
            TokenKind::IVar(name) => Variable::IVar(name),
            TokenKind::CVar(name) => Variable::CVar(name),
            TokenKind::GVar(name) => Variable::GVar(name),
            TokenKind::NthRef(index) => Variable::NthRef(index),
            TokenKind::BackRef(ch) => Variable::BackRef(ch),
            _ => return Err(self.unexpected()),
        };
        self.advance()?;
        Ok(self.support.gettable(&variable, pos))
    }

    /// `%w(...)`, `%W(...)`, `%i(...)`, `%I(...)`
    fn parse_word_list(&mut self, kind: StringKind, start: Position) -> PResult<Node> {
        let mut words = Vec::new();
        loop {
            match self.token.kind {
                TokenKind::WordSep => {
                    self.advance()?;
                }
                TokenKind::StringEnd => {
                    self.advance()?;
                    break;
                }
                _ => {
                    let word_pos = self.pos();
                    let Some(word) = self.parse_string_contents()? else {
                        return Err(self.unexpected());
                    };
                    let word_pos = self.pos_from(word_pos);
                    words.push(if kind == StringKind::Symbols {
                        into_symbol(word, word_pos)
                    } else {
                        into_dstr(word, word_pos)
                    });
                }
            }
        }
        let pos = self.pos_from(start);
        Ok(if words.is_empty() {
            Node::new(NodeKind::ZArray, pos)
        } else {
            Node::new(NodeKind::Array(words), pos)
        })
    }
}

/// String contents as a string node; a lone interpolation becomes a `DStr`
fn into_dstr(contents: Node, pos: Position) -> Node {
    let kind = match contents.kind {
        NodeKind::EvStr(body) => NodeKind::DStr(vec![Node::new(NodeKind::EvStr(body), contents.pos)]),
        kind => kind,
    };
    Node::new(kind, pos)
}

fn into_symbol(contents: Node, pos: Position) -> Node {
    let kind = match contents.kind {
        NodeKind::Str(bytes) => NodeKind::Symbol(String::from_utf8_lossy(&bytes).into_owned()),
        NodeKind::DStr(parts) => NodeKind::DSymbol(parts),
        kind => NodeKind::DSymbol(vec![Node::new(kind, contents.pos)]),
    };
    Node::new(kind, pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_span::{FileId, Span};

    fn pos() -> Position {
        Position::new(FileId(0), 1, Span::new(0, 4))
    }

    #[test]
    fn test_symbol_contents() {
        let plain = into_symbol(Node::new(NodeKind::Str(b"abc".to_vec()), pos()), pos());
        assert_eq!(plain.kind, NodeKind::Symbol("abc".into()));

        let interpolated = Node::new(NodeKind::EvStr(None), pos());
        assert_eq!(into_symbol(interpolated, pos()).kind.name(), "DSymbol");
    }

    #[test]
    fn test_lone_interpolation_is_wrapped() {
        let interpolated = Node::new(NodeKind::EvStr(None), pos());
        let NodeKind::DStr(parts) = into_dstr(interpolated, pos()).kind else {
            panic!("expected DStr");
        };
        assert_eq!(parts.len(), 1);
    }
}
