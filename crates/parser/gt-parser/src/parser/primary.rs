//! Literals, variables and keyword constructs

use super::Parser;
use super::stmt::Mlhs;
use crate::error::{Failure, PResult};
use crate::lexer::{Keyword, LocalLookup, TokenKind};
use crate::support::nodes::{new_case_node, new_colon3, new_defined, new_splat, new_when_node, set_value};
use crate::support::{CallArgs, Variable};
use gt_diagnostics::DiagnosticId;
use gt_span::Position;
use gt_syntax::{Node, NodeKind, RescueBody};

impl Parser<'_, '_> {
    /// Operand of the postfix chain
    pub(super) fn parse_primary(&mut self) -> PResult<Node> {
        let pos = self.pos();
        match self.token.kind.clone() {
            TokenKind::Integer(_) | TokenKind::BigInteger(_) | TokenKind::Float(_) => self.parse_numeric(),
            TokenKind::Char(bytes) => {
                self.advance()?;
                Ok(Node::new(NodeKind::Str(bytes), pos))
            }
            TokenKind::Symbol(name) => {
                self.advance()?;
                Ok(Node::new(NodeKind::Symbol(name), pos))
            }
            TokenKind::StringBeg(kind) => self.parse_string_literal(kind),
            TokenKind::Ident(name) => self.parse_identifier(name, pos),
            TokenKind::FId(name) => self.parse_fid(name, pos),
            TokenKind::Const(name) => self.parse_constant(name, pos),
            TokenKind::IVar(name) => self.parse_variable(&Variable::IVar(name), pos),
            TokenKind::CVar(name) => self.parse_variable(&Variable::CVar(name), pos),
            TokenKind::GVar(name) => self.parse_variable(&Variable::GVar(name), pos),
            TokenKind::NthRef(index) => self.parse_variable(&Variable::NthRef(index), pos),
            TokenKind::BackRef(ch) => self.parse_variable(&Variable::BackRef(ch), pos),
            TokenKind::LBrack => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_hash_literal(),
            TokenKind::LParen | TokenKind::LParenArg | TokenKind::LParenCall => {
                self.advance()?;
                let body = self.with_fresh_flags(Self::parse_compstmt)?;
                self.expect(&TokenKind::RParen)?;
                Ok(match body {
                    Some(node) => node,
                    None => Node::nil(self.pos_from(pos)),
                })
            }
            TokenKind::Colon3 => {
                self.advance()?;
                let TokenKind::Const(name) = self.token.kind.clone() else {
                    return Err(self.unexpected());
                };
                self.advance()?;
                Ok(new_colon3(&name, self.pos_from(pos)))
            }
            TokenKind::Lambda => self.parse_lambda(),
            TokenKind::Keyword(keyword) => self.parse_keyword(keyword, pos),
            _ => Err(self.unexpected()),
        }
    }

    /// Integer or float literal
    pub(super) fn parse_numeric(&mut self) -> PResult<Node> {
        let pos = self.pos();
        let kind = match &self.token.kind {
            TokenKind::Integer(value) => NodeKind::Fixnum(*value),
            TokenKind::BigInteger(digits) => NodeKind::Bignum(digits.clone()),
            TokenKind::Float(value) => NodeKind::Float(*value),
            _ => return Err(self.unexpected()),
        };
        self.advance()?;
        Ok(Node::new(kind, pos))
    }

    fn parse_variable(&mut self, variable: &Variable, pos: Position) -> PResult<Node> {
        self.advance()?;
        Ok(self.support.gettable(variable, pos))
    }

    /// Identifier: local read, or a call in one of its several spellings
    fn parse_identifier(&mut self, name: String, pos: Position) -> PResult<Node> {
        self.advance()?;
        if self.at(&TokenKind::LParenCall) {
            return self.finish_fcall_with_parens(&name, pos);
        }
        if self.support.is_local(&name) {
            return Ok(self.support.declare_identifier(&name, pos));
        }
        if self.can_start_command_arg() {
            return self.finish_command_fcall(&name, pos);
        }
        if self.at(&TokenKind::LBrace) || self.do_block_allowed() {
            let iter = self.parse_block_opt(true)?;
            return self.support.new_fcall(&name, CallArgs::none(), iter, self.pos_from(pos));
        }
        Ok(self.support.declare_identifier(&name, pos))
    }

    /// `name?` / `name!` are always method calls
    fn parse_fid(&mut self, name: String, pos: Position) -> PResult<Node> {
        self.advance()?;
        if self.at(&TokenKind::LParenCall) {
            return self.finish_fcall_with_parens(&name, pos);
        }
        if self.can_start_command_arg() {
            return self.finish_command_fcall(&name, pos);
        }
        let iter = self.parse_block_opt(true)?;
        self.support.new_fcall(&name, CallArgs::none(), iter, self.pos_from(pos))
    }

    fn parse_constant(&mut self, name: String, pos: Position) -> PResult<Node> {
        self.advance()?;
        if self.at(&TokenKind::LParenCall) {
            return self.finish_fcall_with_parens(&name, pos);
        }
        if self.token.space_before && self.can_start_command_arg() && !self.at(&TokenKind::LBrack) {
            return self.finish_command_fcall(&name, pos);
        }
        if self.at(&TokenKind::LBrace) {
            let iter = self.parse_block_opt(true)?;
            return self.support.new_fcall(&name, CallArgs::none(), iter, self.pos_from(pos));
        }
        Ok(self.support.gettable(&Variable::Const(name), pos))
    }

    fn finish_fcall_with_parens(&mut self, name: &str, pos: Position) -> PResult<Node> {
        let args = self.parse_paren_args()?;
        let iter = self.parse_block_opt(true)?;
        self.support.new_fcall(name, args, iter, self.pos_from(pos))
    }

    fn finish_command_fcall(&mut self, name: &str, pos: Position) -> PResult<Node> {
        let args = self.parse_command_args()?;
        let iter = self.parse_do_block_opt()?;
        self.support.new_fcall(name, args, iter, self.pos_from(pos))
    }

    fn parse_array_literal(&mut self) -> PResult<Node> {
        let pos = self.pos();
        self.advance()?;
        let args = self.with_fresh_flags(|parser| parser.parse_arg_list(Some(&TokenKind::RBrack)))?;
        self.expect(&TokenKind::RBrack)?;
        if let Some(block) = args.block {
            return Err(Failure::syntax("block argument should not be given", block.pos.span));
        }
        let pos = self.pos_from(pos);
        Ok(match args.args {
            None => Node::new(NodeKind::ZArray, pos),
            Some(node) => Node::new(node.kind, pos),
        })
    }

    fn parse_hash_literal(&mut self) -> PResult<Node> {
        let pos = self.pos();
        self.advance()?;
        let pairs = self.with_fresh_flags(|parser| {
            let mut pairs = Vec::new();
            loop {
                parser.skip_newlines()?;
                if parser.at(&TokenKind::RBrace) {
                    break;
                }
                pairs.push(parser.parse_assoc()?);
                parser.skip_newlines()?;
                if !parser.eat(&TokenKind::Comma)? {
                    break;
                }
            }
            Ok(pairs)
        })?;
        self.skip_newlines()?;
        self.expect(&TokenKind::RBrace)?;
        let pairs = self.support.remove_duplicate_keys(pairs, pos);
        Ok(Node::new(NodeKind::Hash(pairs), self.pos_from(pos)))
    }

    fn parse_assoc(&mut self) -> PResult<(Option<Node>, Node)> {
        let pos = self.pos();
        match self.token.kind.clone() {
            TokenKind::Label(name) => {
                self.advance()?;
                let value = self.parse_arg()?;
                Ok((Some(Node::new(NodeKind::Symbol(name), pos)), value))
            }
            TokenKind::DSplat => {
                self.advance()?;
                Ok((None, self.parse_arg()?))
            }
            _ => {
                let key = self.parse_arg()?;
                self.expect(&TokenKind::Arrow)?;
                let value = self.parse_arg()?;
                Ok((Some(key), value))
            }
        }
    }

    fn parse_keyword(&mut self, keyword: Keyword, pos: Position) -> PResult<Node> {
        match keyword {
            Keyword::Nil
            | Keyword::SelfKw
            | Keyword::True
            | Keyword::False
            | Keyword::File
            | Keyword::Line
            | Keyword::Encoding => {
                self.advance()?;
                let variable = Variable::Keyword(keyword);
                if self.at(&TokenKind::Assign) && matches!(keyword, Keyword::File | Keyword::Line | Keyword::Encoding) {
                    return self.support.assignable(&variable, None, pos);
                }
                Ok(self.support.gettable(&variable, pos))
            }
            Keyword::If => self.parse_if(false),
            Keyword::Unless => self.parse_if(true),
            Keyword::While => self.parse_while(false),
            Keyword::Until => self.parse_while(true),
            Keyword::Case => self.parse_case(),
            Keyword::For => self.parse_for(),
            Keyword::Begin => {
                self.advance()?;
                let body = self.parse_bodystmt()?;
                self.expect_keyword(Keyword::End)?;
                Ok(Node::new(NodeKind::Begin(body.map(Box::new)), self.pos_from(pos)))
            }
            Keyword::Return | Keyword::Break | Keyword::Next => self.parse_jump(keyword, pos),
            Keyword::Redo => {
                self.advance()?;
                Ok(Node::new(NodeKind::Redo, pos))
            }
            Keyword::Retry => {
                self.advance()?;
                Ok(Node::new(NodeKind::Retry, pos))
            }
            Keyword::Yield => self.parse_yield(pos),
            Keyword::Super => self.parse_super(pos),
            Keyword::Defined => {
                self.advance()?;
                let expression = if self.at(&TokenKind::LParenCall) {
                    self.advance()?;
                    let expression = self.with_fresh_flags(|parser| {
                        parser.skip_newlines()?;
                        parser.parse_expr()
                    })?;
                    self.skip_newlines()?;
                    self.expect(&TokenKind::RParen)?;
                    expression
                } else {
                    self.parse_arg()?
                };
                Ok(new_defined(expression, self.pos_from(pos)))
            }
            Keyword::Def => self.parse_def(),
            Keyword::Class => self.parse_class(),
            Keyword::Module => self.parse_module(),
            Keyword::UpperBegin => Err(Failure::syntax("BEGIN is permitted only at toplevel", pos.span)),
            _ => Err(self.unexpected()),
        }
    }

    /// `then` after a condition, or a line break, or both
    pub(super) fn parse_then(&mut self) -> PResult<()> {
        if self.at_term() {
            self.skip_terms()?;
            self.eat_keyword(Keyword::Then)?;
            return Ok(());
        }
        self.expect_keyword(Keyword::Then)?;
        Ok(())
    }

    /// `do` or a line break after a loop header
    fn parse_do_cond(&mut self) -> PResult<()> {
        if self.at_term() {
            return self.skip_terms();
        }
        self.expect_keyword(Keyword::Do)?;
        Ok(())
    }

    fn parse_if(&mut self, negate: bool) -> PResult<Node> {
        let pos = self.pos();
        self.advance()?;
        let cond = self.parse_condition()?;
        self.parse_then()?;
        let body = self.parse_compstmt()?;
        let alternative = if negate {
            self.parse_else()?
        } else {
            self.parse_if_tail()?
        };
        self.expect_keyword(Keyword::End)?;
        let (then_body, else_body) = if negate { (alternative, body) } else { (body, alternative) };
        Ok(Node::new(
            NodeKind::If {
                cond: Box::new(cond),
                then_body: then_body.map(Box::new),
                else_body: else_body.map(Box::new),
            },
            self.pos_from(pos),
        ))
    }

    /// `elsif` chain and final `else`
    fn parse_if_tail(&mut self) -> PResult<Option<Node>> {
        if !self.at_keyword(Keyword::Elsif) {
            return self.parse_else();
        }
        let pos = self.pos();
        self.advance()?;
        let cond = self.parse_condition()?;
        self.parse_then()?;
        let body = self.parse_compstmt()?;
        let else_body = self.parse_if_tail()?;
        Ok(Some(Node::new(
            NodeKind::If {
                cond: Box::new(cond),
                then_body: body.map(Box::new),
                else_body: else_body.map(Box::new),
            },
            self.pos_from(pos),
        )))
    }

    fn parse_else(&mut self) -> PResult<Option<Node>> {
        if !self.eat_keyword(Keyword::Else)? {
            return Ok(None);
        }
        self.parse_compstmt()
    }

    fn parse_while(&mut self, until: bool) -> PResult<Node> {
        let pos = self.pos();
        self.advance()?;
        let cond = Box::new(self.with_cond(Self::parse_condition)?);
        self.parse_do_cond()?;
        let body = self.parse_compstmt()?.map(Box::new);
        self.expect_keyword(Keyword::End)?;
        let kind = if until {
            NodeKind::Until {
                cond,
                body,
                evaluate_at_start: true,
            }
        } else {
            NodeKind::While {
                cond,
                body,
                evaluate_at_start: true,
            }
        };
        Ok(Node::new(kind, self.pos_from(pos)))
    }

    fn parse_case(&mut self) -> PResult<Node> {
        let pos = self.pos();
        self.advance()?;
        let subject = if self.at_keyword(Keyword::When) || self.at_term() {
            None
        } else {
            let subject = self.parse_expr()?;
            self.support.check_expression(&subject)?;
            Some(subject)
        };
        self.skip_terms()?;
        if !self.at_keyword(Keyword::When) {
            return Err(Failure::syntax(
                format!("syntax error, unexpected {}, expecting keyword `when'", self.token.kind),
                self.token.span,
            ));
        }
        let mut whens = Vec::new();
        while self.at_keyword(Keyword::When) {
            let when_pos = self.pos();
            self.advance()?;
            let args = self.parse_arg_list(None)?;
            if let Some(block) = args.block {
                return Err(Failure::syntax("block argument should not be given", block.pos.span));
            }
            let Some(candidates) = args.args else {
                return Err(self.unexpected());
            };
            self.parse_then()?;
            let body = self.parse_compstmt()?;
            whens.push(new_when_node(candidates, body, self.pos_from(when_pos)));
        }
        let else_body = self.parse_else()?;
        self.expect_keyword(Keyword::End)?;
        Ok(new_case_node(subject, whens, else_body, self.pos_from(pos)))
    }

    fn parse_for(&mut self) -> PResult<Node> {
        let pos = self.pos();
        self.advance()?;
        let var_pos = self.pos();
        let mut mlhs = Mlhs::default();
        self.parse_mlhs_items(&mut mlhs)?;
        let var = if mlhs.is_multiple() {
            mlhs.into_node(self.pos_from(var_pos))
        } else {
            match mlhs.into_single() {
                Some(var) => var,
                None => return Err(self.unexpected()),
            }
        };
        self.expect_keyword(Keyword::In)?;
        let iter = self.with_cond(Self::parse_expr)?;
        self.support.check_expression(&iter)?;
        self.parse_do_cond()?;
        let body = self.parse_compstmt()?;
        self.expect_keyword(Keyword::End)?;
        Ok(Node::new(
            NodeKind::For {
                var: Box::new(var),
                iter: Box::new(iter),
                body: body.map(Box::new),
            },
            self.pos_from(pos),
        ))
    }

    /// `return`, `break` and `next` with an optional value
    fn parse_jump(&mut self, keyword: Keyword, pos: Position) -> PResult<Node> {
        self.advance()?;
        let value = if self.can_start_command_arg() || self.at(&TokenKind::LParen) {
            let args = self.parse_command_args()?;
            self.support.ret_args(args, pos)?
        } else {
            None
        };
        let kind = match keyword {
            Keyword::Return => NodeKind::Return(value),
            Keyword::Break => NodeKind::Break(value),
            _ => NodeKind::Next(value),
        };
        Ok(Node::new(kind, self.pos_from(pos)))
    }

    fn parse_yield(&mut self, pos: Position) -> PResult<Node> {
        self.advance()?;
        let args = if self.at(&TokenKind::LParenCall) {
            self.parse_paren_args()?
        } else if self.can_start_command_arg() {
            self.parse_command_args()?
        } else {
            CallArgs::none()
        };
        self.support.new_yield(args, self.pos_from(pos))
    }

    fn parse_super(&mut self, pos: Position) -> PResult<Node> {
        self.advance()?;
        if self.at(&TokenKind::LParenCall) {
            let args = self.parse_paren_args()?;
            let iter = self.parse_block_opt(true)?;
            return self.support.new_super(args, iter, self.pos_from(pos));
        }
        if self.can_start_command_arg() {
            let args = self.parse_command_args()?;
            let iter = self.parse_do_block_opt()?;
            return self.support.new_super(args, iter, self.pos_from(pos));
        }
        let iter = self.parse_block_opt(true)?;
        Ok(Node::new(
            NodeKind::ZSuper {
                iter: iter.map(Box::new),
            },
            self.pos_from(pos),
        ))
    }

    /// Body with optional `rescue`, `else` and `ensure` sections
    pub(super) fn parse_bodystmt(&mut self) -> PResult<Option<Node>> {
        let pos = self.pos();
        let mut result = self.parse_compstmt()?;
        let mut rescues = Vec::new();
        while self.at_keyword(Keyword::Rescue) {
            rescues.push(self.parse_rescue_clause()?);
        }
        let mut else_body = None;
        if self.at_keyword(Keyword::Else) {
            let else_pos = self.pos();
            self.advance()?;
            let body = self.parse_compstmt()?;
            if rescues.is_empty() {
                self.support
                    .warn(DiagnosticId::ElseWithoutRescue, else_pos, "else without rescue is useless");
                result = join_statements(result, body);
            } else {
                else_body = body;
            }
        }
        if !rescues.is_empty() {
            result = Some(Node::new(
                NodeKind::Rescue {
                    body: result.map(Box::new),
                    rescues,
                    else_body: else_body.map(Box::new),
                },
                self.pos_from(pos),
            ));
        }
        if self.eat_keyword(Keyword::Ensure)? {
            let ensure = self.parse_compstmt()?;
            result = Some(Node::new(
                NodeKind::Ensure {
                    body: result.map(Box::new),
                    ensure: ensure.map(Box::new),
                },
                self.pos_from(pos),
            ));
        }
        Ok(result)
    }

    fn parse_rescue_clause(&mut self) -> PResult<RescueBody> {
        let pos = self.pos();
        self.advance()?;
        let mut exceptions = Vec::new();
        while !self.at(&TokenKind::Arrow) && !self.at_term() && !self.at_keyword(Keyword::Then) {
            let item_pos = self.pos();
            if self.eat(&TokenKind::Splat)? {
                let value = self.parse_arg()?;
                exceptions.push(new_splat(value, self.pos_from(item_pos)));
            } else {
                exceptions.push(self.parse_arg()?);
            }
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        let target = if self.eat(&TokenKind::Arrow)? {
            let node = self.parse_postfix()?;
            Some(self.to_assignable(node)?)
        } else {
            None
        };
        self.parse_then()?;
        let mut body = self.parse_compstmt()?;
        if let Some(target) = target {
            let target_pos = target.pos;
            let error = Node::new(NodeKind::GlobalVar("$!".to_string()), target_pos);
            body = join_statements(Some(set_value(target, error)), body);
        }
        Ok(RescueBody {
            pos,
            exceptions,
            body: body.map(Box::new),
        })
    }
}

/// `first` followed by `second` as one statement sequence
fn join_statements(first: Option<Node>, second: Option<Node>) -> Option<Node> {
    let (first, second) = match (first, second) {
        (None, node) | (node, None) => return node,
        (Some(first), Some(second)) => (first, second),
    };
    let pos = first.pos.extend_to(second.pos);
    let mut statements = match first.kind {
        NodeKind::Block(statements) => statements,
        kind => vec![Node::new(kind, first.pos)],
    };
    match second.kind {
        NodeKind::Block(more) => statements.extend(more),
        kind => statements.push(Node::new(kind, second.pos)),
    }
    Some(Node::new(NodeKind::Block(statements), pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_span::{FileId, Span};

    fn node(kind: NodeKind, start: u32) -> Node {
        Node::new(kind, Position::new(FileId(0), 1, Span::new(start, start + 1)))
    }

    #[test]
    fn test_join_statements_flattens_blocks() {
        let block = node(
            NodeKind::Block(vec![node(NodeKind::Fixnum(1), 0), node(NodeKind::Fixnum(2), 2)]),
            0,
        );
        let joined = join_statements(Some(block), Some(node(NodeKind::Fixnum(3), 4))).expect("joined");
        assert!(matches!(&joined.kind, NodeKind::Block(items) if items.len() == 3));
        assert_eq!(joined.pos.span, Span::new(0, 5));

        let only = join_statements(None, Some(node(NodeKind::Nil, 0))).expect("kept");
        assert_eq!(only.kind, NodeKind::Nil);
        assert!(join_statements(None, None).is_none());
    }
}
