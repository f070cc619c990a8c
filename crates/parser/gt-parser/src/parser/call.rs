//! Method calls, blocks and definitions

use super::Parser;
use super::params::ParamContext;
use super::stmt::unexpected_token;
use crate::error::{Failure, PResult};
use crate::lexer::{Keyword, LexState, Token, TokenKind};
use crate::support::nodes::new_colon2;
use crate::support::{CallArgs, ScopeKind};
use gt_syntax::{ArgsNode, IterNode, Node, NodeKind};

impl Parser<'_, '_> {
    /// Primary followed by `.m`, `::m` and `[i]` suffixes
    pub(super) fn parse_postfix(&mut self) -> PResult<Node> {
        let primary = self.parse_primary()?;
        self.parse_postfix_tail(primary)
    }

    pub(super) fn parse_postfix_tail(&mut self, mut node: Node) -> PResult<Node> {
        loop {
            node = match self.token.kind {
                TokenKind::Dot | TokenKind::AndDot => {
                    self.advance()?;
                    self.parse_method_call(node)?
                }
                TokenKind::Colon2 => {
                    self.advance()?;
                    self.parse_colon2(node)?
                }
                TokenKind::LBrackIndex => self.parse_index(node)?,
                _ => return Ok(node),
            };
        }
    }

    /// Name, arguments and block after `recv.`
    fn parse_method_call(&mut self, receiver: Node) -> PResult<Node> {
        let start = receiver.pos;
        let name = if self.at(&TokenKind::LParenCall) {
            "call".to_string()
        } else {
            method_name(&self.advance()?)?
        };
        let (args, command) = if self.at(&TokenKind::LParenCall) {
            (self.parse_paren_args()?, false)
        } else if self.can_start_command_arg() {
            (self.parse_command_args()?, true)
        } else {
            (CallArgs::none(), false)
        };
        let iter = if command {
            self.parse_do_block_opt()?
        } else {
            self.parse_block_opt(true)?
        };
        let node = self.support.new_call(receiver, &name, args, iter)?;
        Ok(Node::new(node.kind, self.pos_from(start)))
    }

    fn parse_colon2(&mut self, left: Node) -> PResult<Node> {
        let TokenKind::Const(name) = &self.token.kind else {
            return self.parse_method_call(left);
        };
        let name = name.clone();
        self.advance()?;
        let start = left.pos;
        if self.at(&TokenKind::LParenCall) {
            let args = self.parse_paren_args()?;
            let iter = self.parse_block_opt(true)?;
            let node = self.support.new_call(left, &name, args, iter)?;
            return Ok(Node::new(node.kind, self.pos_from(start)));
        }
        Ok(new_colon2(Some(left), &name, self.pos_from(start)))
    }

    fn parse_index(&mut self, receiver: Node) -> PResult<Node> {
        let start = receiver.pos;
        self.advance()?;
        let args = self.with_fresh_flags(|parser| parser.parse_arg_list(Some(&TokenKind::RBrack)))?;
        self.expect(&TokenKind::RBrack)?;
        let node = self.support.new_call(receiver, "[]", args, None)?;
        Ok(Node::new(node.kind, self.pos_from(start)))
    }

    // blocks

    /// Block after a call: braces when `brace`, or `do` when it binds here
    pub(super) fn parse_block_opt(&mut self, brace: bool) -> PResult<Option<Node>> {
        if brace && self.at(&TokenKind::LBrace) {
            return self.parse_block(TokenKind::RBrace).map(Some);
        }
        self.parse_do_block_opt()
    }

    pub(super) fn parse_do_block_opt(&mut self) -> PResult<Option<Node>> {
        if !self.do_block_allowed() {
            return Ok(None);
        }
        self.parse_block(TokenKind::Keyword(Keyword::End)).map(Some)
    }

    /// `{ |params| body }` or `do |params| body end`
    fn parse_block(&mut self, closer: TokenKind) -> PResult<Node> {
        let start = self.pos();
        self.advance()?;
        let ((args, body), closed) = self.in_scope(ScopeKind::Block, |parser| {
            let args = parser.parse_block_params()?;
            let body = if closer == TokenKind::RBrace {
                parser.parse_compstmt()?
            } else {
                parser.parse_bodystmt()?
            };
            parser.check(&closer)?;
            Ok((args, body))
        })?;
        self.advance()?;
        let iter = IterNode {
            args,
            body: body.map(Box::new),
            locals: closed.locals,
        };
        Ok(Node::new(NodeKind::Iter(Box::new(iter)), self.pos_from(start)))
    }

    /// `|a, b; c|`; `None` when the block has no parameter list
    fn parse_block_params(&mut self) -> PResult<Option<Box<ArgsNode>>> {
        let pos = self.pos();
        match self.token.kind {
            TokenKind::OrOr => {
                self.advance()?;
                Ok(Some(Box::new(ArgsNode::empty(pos))))
            }
            TokenKind::Pipe => {
                self.advance()?;
                let mut args = self.parse_param_list(ParamContext::Block, Some(&TokenKind::Pipe))?;
                if self.eat(&TokenKind::Semi)? {
                    loop {
                        let token = self.advance()?;
                        let TokenKind::Ident(name) = &token.kind else {
                            return Err(unexpected_token(&token));
                        };
                        let position = self.support.position(token.span, token.line);
                        args.block_locals.push(self.support.new_bv(name, position)?);
                        if !self.eat(&TokenKind::Comma)? {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::Pipe)?;
                args.pos = self.pos_from(pos);
                Ok(Some(Box::new(args)))
            }
            _ => Ok(None),
        }
    }

    /// `-> (params) { body }`
    pub(super) fn parse_lambda(&mut self) -> PResult<Node> {
        let start = self.pos();
        self.advance()?;
        let ((args, body), closed) = self.in_scope(ScopeKind::Block, |parser| {
            let params_pos = parser.pos();
            let args = match parser.token.kind {
                TokenKind::LParen | TokenKind::LParenArg | TokenKind::LParenCall => {
                    parser.advance()?;
                    let args = parser.parse_param_list(ParamContext::Lambda, Some(&TokenKind::RParen))?;
                    parser.expect(&TokenKind::RParen)?;
                    args
                }
                TokenKind::Ident(_) | TokenKind::Splat | TokenKind::BlockAmper | TokenKind::Label(_) => {
                    parser.parse_param_list(ParamContext::Lambda, None)?
                }
                _ => ArgsNode::empty(params_pos),
            };
            let body = if parser.eat(&TokenKind::LBrace)? {
                let body = parser.parse_compstmt()?;
                parser.check(&TokenKind::RBrace)?;
                body
            } else if parser.eat_keyword(Keyword::Do)? {
                let body = parser.parse_bodystmt()?;
                parser.check(&TokenKind::Keyword(Keyword::End))?;
                body
            } else {
                return Err(parser.unexpected());
            };
            Ok((args, body))
        })?;
        self.advance()?;
        let iter = IterNode {
            args: Some(Box::new(args)),
            body: body.map(Box::new),
            locals: closed.locals,
        };
        Ok(Node::new(NodeKind::Lambda(Box::new(iter)), self.pos_from(start)))
    }

    // definitions

    /// `def name(params) body end` and `def recv.name ...`
    pub(super) fn parse_def(&mut self) -> PResult<Node> {
        let start = self.pos();
        self.advance()?;
        let first = self.advance()?;
        let (receiver, name) = if self.at(&TokenKind::Dot) {
            let receiver = self.singleton_receiver(&first)?;
            self.set_lex_state(LexState::Fname);
            self.advance()?;
            (Some(receiver), method_name(&self.advance()?)?)
        } else {
            (None, method_name(&first)?)
        };
        let (in_def, in_single) = match receiver {
            Some(_) => (self.support.in_def, self.support.in_single + 1),
            None => (true, self.support.in_single),
        };
        let ((args, body), closed) = self.with_def_state(in_def, in_single, |parser| {
            parser.in_scope(ScopeKind::Local, |parser| {
                let args = parser.parse_def_params()?;
                let body = parser.parse_bodystmt()?;
                parser.check(&TokenKind::Keyword(Keyword::End))?;
                Ok((args, body))
            })
        })?;
        self.advance()?;
        let args = Box::new(args);
        let body = body.map(Box::new);
        let kind = match receiver {
            Some(receiver) => NodeKind::Defs {
                receiver: Box::new(receiver),
                name,
                args,
                body,
                locals: closed.locals,
            },
            None => NodeKind::Defn {
                name,
                args,
                body,
                locals: closed.locals,
            },
        };
        Ok(Node::new(kind, self.pos_from(start)))
    }

    fn singleton_receiver(&mut self, token: &Token) -> PResult<Node> {
        let pos = self.support.position(token.span, token.line);
        let kind = match &token.kind {
            TokenKind::Keyword(Keyword::SelfKw) => NodeKind::SelfRef,
            TokenKind::Ident(name) => return Ok(self.support.declare_identifier(name, pos)),
            TokenKind::Const(name) => NodeKind::Const(name.clone()),
            TokenKind::IVar(name) => NodeKind::InstVar(name.clone()),
            TokenKind::CVar(name) => NodeKind::ClassVar(name.clone()),
            TokenKind::GVar(name) => NodeKind::GlobalVar(name.clone()),
            _ => return Err(Failure::syntax("can't define singleton method for literals", token.span)),
        };
        Ok(Node::new(kind, pos))
    }

    fn parse_def_params(&mut self) -> PResult<ArgsNode> {
        match self.token.kind {
            TokenKind::LParen | TokenKind::LParenArg | TokenKind::LParenCall => {
                let pos = self.pos();
                self.advance()?;
                let mut args = self.parse_param_list(ParamContext::Method, Some(&TokenKind::RParen))?;
                self.expect(&TokenKind::RParen)?;
                args.pos = self.pos_from(pos);
                Ok(args)
            }
            _ if self.at_term() => Ok(ArgsNode::empty(self.pos())),
            _ => {
                let args = self.parse_param_list(ParamContext::Method, None)?;
                if !self.at_term() {
                    return Err(self.unexpected());
                }
                Ok(args)
            }
        }
    }

    /// `class Name < Super ... end` and `class << obj ... end`
    pub(super) fn parse_class(&mut self) -> PResult<Node> {
        let start = self.pos();
        self.advance()?;
        if self.eat(&TokenKind::LShift)? {
            let receiver = self.parse_expr()?;
            self.support.check_expression(&receiver)?;
            let (body, closed) = self.with_def_state(false, 0, |parser| {
                parser.in_scope(ScopeKind::Local, Self::parse_definition_body)
            })?;
            self.advance()?;
            return Ok(Node::new(
                NodeKind::SClass {
                    receiver: Box::new(receiver),
                    body: body.map(Box::new),
                    locals: closed.locals,
                },
                self.pos_from(start),
            ));
        }
        if self.support.in_def || self.support.in_single > 0 {
            return Err(Failure::syntax("class definition in method body", start.span));
        }
        let cpath = self.parse_cpath()?;
        let superclass = if self.eat(&TokenKind::Lt)? {
            let superclass = self.parse_expr()?;
            self.support.check_expression(&superclass)?;
            Some(Box::new(superclass))
        } else {
            None
        };
        let (body, closed) = self.in_scope(ScopeKind::Local, Self::parse_definition_body)?;
        self.advance()?;
        Ok(Node::new(
            NodeKind::Class {
                cpath: Box::new(cpath),
                superclass,
                body: body.map(Box::new),
                locals: closed.locals,
            },
            self.pos_from(start),
        ))
    }

    pub(super) fn parse_module(&mut self) -> PResult<Node> {
        let start = self.pos();
        self.advance()?;
        if self.support.in_def || self.support.in_single > 0 {
            return Err(Failure::syntax("module definition in method body", start.span));
        }
        let cpath = self.parse_cpath()?;
        let (body, closed) = self.in_scope(ScopeKind::Local, Self::parse_definition_body)?;
        self.advance()?;
        Ok(Node::new(
            NodeKind::Module {
                cpath: Box::new(cpath),
                body: body.map(Box::new),
                locals: closed.locals,
            },
            self.pos_from(start),
        ))
    }

    fn parse_definition_body(&mut self) -> PResult<Option<Node>> {
        let body = self.parse_bodystmt()?;
        self.check(&TokenKind::Keyword(Keyword::End))?;
        Ok(body)
    }

    /// `Name`, `::Name` or `A::B::Name` after `class`/`module`
    fn parse_cpath(&mut self) -> PResult<Node> {
        let start = self.pos();
        let mut path = match self.token.kind.clone() {
            TokenKind::Colon3 => {
                self.advance()?;
                let name = self.expect_constant()?;
                Node::new(NodeKind::Colon3(name), self.pos_from(start))
            }
            TokenKind::Const(name) => {
                self.advance()?;
                new_colon2(None, &name, start)
            }
            _ => return Err(Failure::syntax("class/module name must be CONSTANT", self.token.span)),
        };
        while self.eat(&TokenKind::Colon2)? {
            let name = self.expect_constant()?;
            let left = match path.kind {
                NodeKind::Colon2 { left: None, name } => Node::new(NodeKind::Const(name), path.pos),
                kind => Node::new(kind, path.pos),
            };
            path = new_colon2(Some(left), &name, self.pos_from(start));
        }
        Ok(path)
    }

    fn expect_constant(&mut self) -> PResult<String> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Const(name) => Ok(name),
            _ => Err(Failure::syntax("class/module name must be CONSTANT", token.span)),
        }
    }
}

/// Method name carried by a token after `.`, `::` or `def`
fn method_name(token: &Token) -> PResult<String> {
    match &token.kind {
        TokenKind::Ident(name) | TokenKind::FId(name) | TokenKind::Const(name) | TokenKind::UnaryOpName(name) => {
            Ok(name.clone())
        }
        TokenKind::Keyword(keyword) => Ok(keyword.text().to_string()),
        kind => kind
            .operator_name()
            .map(str::to_string)
            .ok_or_else(|| unexpected_token(token)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_span::Span;

    fn token(kind: TokenKind) -> Token {
        Token {
            kind,
            span: Span::new(0, 1),
            line: 1,
            space_before: false,
        }
    }

    #[test]
    fn test_method_names_from_tokens() {
        assert_eq!(method_name(&token(TokenKind::Ident("size=".into()))).ok(), Some("size=".to_string()));
        assert_eq!(method_name(&token(TokenKind::Aset)).ok(), Some("[]=".to_string()));
        assert_eq!(method_name(&token(TokenKind::UnaryOpName("-@".into()))).ok(), Some("-@".to_string()));
        assert_eq!(method_name(&token(TokenKind::Keyword(Keyword::Class))).ok(), Some("class".to_string()));
        assert!(method_name(&token(TokenKind::Comma)).is_err());
    }
}
