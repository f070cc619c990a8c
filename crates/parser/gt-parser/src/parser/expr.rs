//! Operators, assignment and argument lists

use super::Parser;
use super::stmt::is_attribute_name;
use crate::error::{Failure, PResult};
use crate::lexer::{Keyword, TokenKind};
use crate::support::nodes::{
    arg_append, arg_blk_pass, arg_concat, negate_float, negate_integer, new_op_asgn, new_op_element_asgn_node,
    new_rescue_mod_node, new_splat, set_value,
};
use crate::support::{CallArgs, Variable};
use gt_span::Position;
use gt_syntax::{Node, NodeKind};

/// Binding power of a binary operator; `None` for anything else
fn binary_precedence(kind: &TokenKind, no_pipe: bool) -> Option<u8> {
    let precedence = match kind {
        TokenKind::OrOr => 1,
        TokenKind::AndAnd => 2,
        TokenKind::Cmp
        | TokenKind::EqEq
        | TokenKind::EqEqEq
        | TokenKind::NotEq
        | TokenKind::Match
        | TokenKind::NotMatch => 3,
        TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => 4,
        TokenKind::Pipe if !no_pipe => 5,
        TokenKind::Caret => 5,
        TokenKind::Amper => 6,
        TokenKind::LShift | TokenKind::RShift => 7,
        TokenKind::Plus | TokenKind::Minus => 8,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 9,
        _ => return None,
    };
    Some(precedence)
}

/// Arguments collected for one call
#[derive(Debug, Default)]
pub(super) struct ArgList {
    args: Option<Node>,
    pairs: Vec<(Option<Node>, Node)>,
    pairs_pos: Option<Position>,
    block: Option<Node>,
}

impl ArgList {
    pub(super) fn push_positional(&mut self, value: Node) {
        self.args = Some(arg_append(self.args.take(), value));
    }

    fn push_splat(&mut self, value: Node, pos: Position) {
        self.args = Some(match self.args.take() {
            None => new_splat(value, pos),
            Some(args) => arg_concat(args, Some(value)),
        });
    }

    fn push_pair(&mut self, key: Option<Node>, value: Node, pos: Position) {
        self.pairs_pos.get_or_insert(pos);
        self.pairs.push((key, value));
    }

    /// Trailing `key: value` pairs become one hash argument
    pub(super) fn finish(mut self, parser: &mut Parser<'_, '_>) -> CallArgs {
        if !self.pairs.is_empty() {
            let pos = self.pairs_pos.unwrap_or_default();
            let pairs = parser
                .support
                .remove_duplicate_keys(std::mem::take(&mut self.pairs), pos);
            self.push_positional(Node::new(NodeKind::Hash(pairs), pos));
        }
        arg_blk_pass(self.args, self.block)
    }
}

impl Parser<'_, '_> {
    /// `a and b`, `a or b`, `not a`
    pub(super) fn parse_expr(&mut self) -> PResult<Node> {
        let mut left = self.parse_not_expr()?;
        loop {
            let and = if self.at_keyword(Keyword::And) {
                true
            } else if self.at_keyword(Keyword::Or) {
                false
            } else {
                return Ok(left);
            };
            self.advance()?;
            let right = self.parse_not_expr()?;
            left = if and {
                self.support.new_and_node(left, right)?
            } else {
                self.support.new_or_node(left, right)?
            };
        }
    }

    fn parse_not_expr(&mut self) -> PResult<Node> {
        if !self.at_keyword(Keyword::Not) {
            return self.parse_arg();
        }
        self.advance()?;
        let operand = self.parse_not_expr()?;
        let cond = self.support.get_condition_node(Some(operand))?;
        self.support.get_operator_call_node(cond, "!", None)
    }

    /// Operator expression without `and`/`or`; ternaries bind loosest
    pub(super) fn parse_arg(&mut self) -> PResult<Node> {
        let cond = self.parse_range()?;
        if !self.at(&TokenKind::Question) {
            return Ok(cond);
        }
        let pos = cond.pos;
        self.advance()?;
        self.skip_newlines()?;
        let then_branch = self.parse_arg()?;
        self.skip_newlines()?;
        self.expect(&TokenKind::Colon)?;
        self.skip_newlines()?;
        let else_branch = self.parse_arg()?;
        self.support.check_expression(&cond)?;
        let cond = self.support.get_condition_node(Some(cond))?;
        Ok(Node::new(
            NodeKind::If {
                cond: Box::new(cond),
                then_body: Some(Box::new(then_branch)),
                else_body: Some(Box::new(else_branch)),
            },
            self.pos_from(pos),
        ))
    }

    /// Value of an assignment, with an optional `rescue` fallback
    fn parse_arg_rhs(&mut self) -> PResult<Node> {
        let value = self.parse_arg()?;
        if !self.at_keyword(Keyword::RescueMod) {
            return Ok(value);
        }
        self.advance()?;
        let rescue = self.parse_arg()?;
        Ok(new_rescue_mod_node(value, Some(rescue)))
    }

    fn parse_range(&mut self) -> PResult<Node> {
        let begin = self.parse_binary(1)?;
        let exclusive = match self.token.kind {
            TokenKind::Dot2 => false,
            TokenKind::Dot3 => true,
            _ => return Ok(begin),
        };
        self.advance()?;
        let end = self.parse_binary(1)?;
        self.support.check_expression(&begin)?;
        self.support.check_expression(&end)?;
        let pos = self.pos_from(begin.pos);
        Ok(Node::new(
            NodeKind::Dot {
                begin: Box::new(begin),
                end: Box::new(end),
                exclusive,
            },
            pos,
        ))
    }

    /// Left-associative binary operators of at least `min` binding power
    fn parse_binary(&mut self, min: u8) -> PResult<Node> {
        let mut left = self.parse_unary_minus()?;
        while let Some(precedence) = binary_precedence(&self.token.kind, self.no_pipe) {
            if precedence < min {
                break;
            }
            let operator = self.advance()?.kind;
            let right = self.parse_binary(precedence + 1)?;
            left = self.build_binary(left, &operator, right)?;
        }
        Ok(left)
    }

    fn build_binary(&mut self, left: Node, operator: &TokenKind, right: Node) -> PResult<Node> {
        match operator {
            TokenKind::OrOr => self.support.new_or_node(left, right),
            TokenKind::AndAnd => self.support.new_and_node(left, right),
            TokenKind::Match => self.support.get_match_node(left, right),
            _ => {
                let Some(name) = operator.operator_name() else {
                    return Err(Failure::syntax(format!("syntax error, unexpected {operator}"), left.pos.span));
                };
                self.support.get_operator_call_node(left, name, Some(right))
            }
        }
    }

    fn parse_unary_minus(&mut self) -> PResult<Node> {
        match self.token.kind {
            TokenKind::UMinus => {
                self.advance()?;
                let operand = self.parse_unary_minus()?;
                self.support.get_operator_call_node(operand, "-@", None)
            }
            TokenKind::UMinusNum => {
                self.advance()?;
                let literal = self.parse_numeric()?;
                if self.at(&TokenKind::Pow) {
                    self.advance()?;
                    let exponent = self.parse_unary_minus()?;
                    let power = self.support.get_operator_call_node(literal, "**", Some(exponent))?;
                    return self.support.get_operator_call_node(power, "-@", None);
                }
                let negated = match literal.kind {
                    NodeKind::Float(_) => negate_float(literal),
                    _ => negate_integer(literal),
                };
                let node = self.parse_postfix_tail(negated)?;
                self.parse_pow_tail(node)
            }
            _ => {
                let base = self.parse_unary()?;
                self.parse_pow_tail(base)
            }
        }
    }

    /// Right-associative `**`
    fn parse_pow_tail(&mut self, base: Node) -> PResult<Node> {
        if !self.at(&TokenKind::Pow) {
            return Ok(base);
        }
        self.advance()?;
        let exponent = self.parse_unary_minus()?;
        self.support.get_operator_call_node(base, "**", Some(exponent))
    }

    fn parse_unary(&mut self) -> PResult<Node> {
        match self.token.kind {
            TokenKind::Bang => {
                self.advance()?;
                let operand = self.parse_unary()?;
                let cond = self.support.get_condition_node(Some(operand))?;
                self.support.get_operator_call_node(cond, "!", None)
            }
            TokenKind::Tilde => {
                self.advance()?;
                let operand = self.parse_unary()?;
                self.support.get_operator_call_node(operand, "~", None)
            }
            TokenKind::UPlus => {
                self.advance()?;
                let operand = self.parse_unary()?;
                if matches!(operand.kind, NodeKind::Fixnum(_) | NodeKind::Bignum(_) | NodeKind::Float(_)) {
                    return Ok(operand);
                }
                self.support.get_operator_call_node(operand, "+@", None)
            }
            _ => self.parse_operand(),
        }
    }

    /// Postfix expression, possibly the target of `=` or `op=`
    fn parse_operand(&mut self) -> PResult<Node> {
        let node = self.parse_postfix()?;
        match self.token.kind {
            TokenKind::Assign if super::stmt::is_assignable_target(&node) => self.parse_assignment(node),
            TokenKind::OpAssign(_) if super::stmt::is_assignable_target(&node) => self.parse_op_assignment(node),
            _ => Ok(node),
        }
    }

    fn parse_assignment(&mut self, node: Node) -> PResult<Node> {
        let start = node.pos;
        // declared before `=` is passed so the value sees the new local
        let target = self.to_assignable(node)?;
        self.advance()?;
        let value = if self.at(&TokenKind::Splat) || matches!(target.kind, NodeKind::MultipleAsgn(_)) {
            self.parse_mrhs()?
        } else {
            self.parse_arg_rhs()?
        };
        let node = self.support.node_assign(target, value)?;
        Ok(Node::new(node.kind, self.pos_from(start)))
    }

    fn parse_op_assignment(&mut self, node: Node) -> PResult<Node> {
        let TokenKind::OpAssign(operator) = &self.token.kind else {
            return Ok(node);
        };
        let operator = operator.clone();
        let pos = node.pos;
        match node.kind {
            NodeKind::Call {
                receiver,
                name,
                args,
                iter: None,
            } if name == "[]" => {
                self.advance()?;
                let value = self.parse_arg_rhs()?;
                let node = new_op_element_asgn_node(*receiver, &operator, args.map(|args| *args), value);
                Ok(Node::new(node.kind, self.pos_from(pos)))
            }
            NodeKind::Call {
                receiver,
                name,
                args: None,
                iter: None,
            } => {
                self.advance()?;
                let value = self.parse_arg_rhs()?;
                Ok(new_op_asgn(*receiver, &name, &operator, value, self.pos_from(pos)))
            }
            kind => {
                let target = self.to_assignable(Node::new(kind, pos))?;
                self.advance()?;
                let value = self.parse_arg_rhs()?;
                self.support.check_expression(&value)?;
                let read = self.support.gettable_for(&target);
                let pos = self.pos_from(pos);
                let kind = match operator.as_str() {
                    "||" => NodeKind::OpAsgnOr {
                        first: Box::new(read),
                        second: Box::new(set_value(target, value)),
                    },
                    "&&" => NodeKind::OpAsgnAnd {
                        first: Box::new(read),
                        second: Box::new(set_value(target, value)),
                    },
                    _ => {
                        let call = self.support.get_operator_call_node(read, &operator, Some(value))?;
                        return Ok(Node::new(set_value(target, call).kind, pos));
                    }
                };
                Ok(Node::new(kind, pos))
            }
        }
    }

    /// Turn an expression into the matching assignment target
    pub(super) fn to_assignable(&mut self, node: Node) -> PResult<Node> {
        let pos = node.pos;
        let variable = match node.kind {
            NodeKind::VCall(name) | NodeKind::LocalVar(name) | NodeKind::DVar(name) => Variable::Identifier(name),
            NodeKind::InstVar(name) => Variable::IVar(name),
            NodeKind::GlobalVar(name) => Variable::GVar(name),
            NodeKind::ClassVar(name) => Variable::CVar(name),
            NodeKind::Const(name) => Variable::Const(name),
            NodeKind::NthRef(index) => Variable::NthRef(index),
            NodeKind::BackRef(ch) => Variable::BackRef(ch),
            NodeKind::Nil => Variable::Keyword(Keyword::Nil),
            NodeKind::True => Variable::Keyword(Keyword::True),
            NodeKind::False => Variable::Keyword(Keyword::False),
            NodeKind::SelfRef => Variable::Keyword(Keyword::SelfKw),
            NodeKind::Colon2 { left: Some(left), name } => {
                let scope = Node::new(
                    NodeKind::Colon2 {
                        left: Some(left),
                        name: name.clone(),
                    },
                    pos,
                );
                return self.scoped_const_decl(name, scope);
            }
            NodeKind::Colon3(name) => {
                let scope = Node::new(NodeKind::Colon3(name.clone()), pos);
                return self.scoped_const_decl(name, scope);
            }
            NodeKind::Call {
                receiver,
                name,
                args,
                iter: None,
            } if name == "[]" => return self.support.aryset(*receiver, args.map(|args| *args)),
            NodeKind::Call {
                receiver,
                name,
                args: None,
                iter: None,
            } if is_attribute_name(&name) => return self.support.attrset(*receiver, &name),
            NodeKind::MultipleAsgn(masgn) if masgn.value.is_none() => {
                return Ok(Node::new(NodeKind::MultipleAsgn(masgn), pos));
            }
            _ => return Err(Failure::syntax("syntax error, unexpected `='", pos.span)),
        };
        self.support.assignable(&variable, None, pos)
    }

    fn scoped_const_decl(&mut self, name: String, scope: Node) -> PResult<Node> {
        let pos = scope.pos;
        if self.support.in_def || self.support.in_single > 0 {
            return Err(Failure::syntax("dynamic constant assignment", pos.span));
        }
        Ok(Node::new(
            NodeKind::ConstDecl {
                name,
                scope: Some(Box::new(scope)),
                value: None,
            },
            pos,
        ))
    }

    // argument lists

    /// Whether the current token can begin the first argument of a command
    pub(super) fn can_start_command_arg(&self) -> bool {
        match &self.token.kind {
            TokenKind::Ident(_)
            | TokenKind::FId(_)
            | TokenKind::Const(_)
            | TokenKind::IVar(_)
            | TokenKind::CVar(_)
            | TokenKind::GVar(_)
            | TokenKind::NthRef(_)
            | TokenKind::BackRef(_)
            | TokenKind::Label(_)
            | TokenKind::Integer(_)
            | TokenKind::BigInteger(_)
            | TokenKind::Float(_)
            | TokenKind::Char(_)
            | TokenKind::Symbol(_)
            | TokenKind::StringBeg(_)
            | TokenKind::LBrack
            | TokenKind::LParenArg
            | TokenKind::Splat
            | TokenKind::DSplat
            | TokenKind::BlockAmper
            | TokenKind::UMinus
            | TokenKind::UMinusNum
            | TokenKind::UPlus
            | TokenKind::Colon3
            | TokenKind::Lambda => true,
            TokenKind::Bang | TokenKind::Tilde => self.token.space_before,
            TokenKind::Keyword(keyword) => matches!(
                keyword,
                Keyword::Nil
                    | Keyword::SelfKw
                    | Keyword::True
                    | Keyword::False
                    | Keyword::Defined
                    | Keyword::File
                    | Keyword::Line
                    | Keyword::Encoding
                    | Keyword::Case
                    | Keyword::If
                    | Keyword::Unless
                    | Keyword::While
                    | Keyword::Until
                    | Keyword::Begin
                    | Keyword::Def
                    | Keyword::Yield
                    | Keyword::Super
                    | Keyword::For
            ),
            _ => false,
        }
    }

    /// `(args)` directly after a method name
    pub(super) fn parse_paren_args(&mut self) -> PResult<CallArgs> {
        self.advance()?;
        let args = self.with_fresh_flags(|parser| parser.parse_arg_list(Some(&TokenKind::RParen)))?;
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    /// Arguments of a call written without parentheses
    pub(super) fn parse_command_args(&mut self) -> PResult<CallArgs> {
        self.with_cmdarg(|parser| parser.parse_arg_list(None))
    }

    /// Comma-separated arguments, optionally up to `closer`
    pub(super) fn parse_arg_list(&mut self, closer: Option<&TokenKind>) -> PResult<CallArgs> {
        let mut list = ArgList::default();
        self.parse_arg_items(&mut list, closer)?;
        Ok(list.finish(self))
    }

    pub(super) fn parse_arg_items(&mut self, list: &mut ArgList, closer: Option<&TokenKind>) -> PResult<()> {
        loop {
            if closer.is_some() {
                self.skip_newlines()?;
            }
            if closer.is_some_and(|closer| self.at(closer)) {
                return Ok(());
            }
            self.parse_arg_item(list)?;
            if list.block.is_some() || !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        if closer.is_some() {
            self.skip_newlines()?;
        }
        Ok(())
    }

    fn parse_arg_item(&mut self, list: &mut ArgList) -> PResult<()> {
        let pos = self.pos();
        match &self.token.kind {
            TokenKind::Splat | TokenKind::Star => {
                self.advance()?;
                let value = self.parse_arg()?;
                self.support.check_expression(&value)?;
                if !list.pairs.is_empty() {
                    return Err(positional_after_keywords(&value));
                }
                list.push_splat(value, pos);
            }
            TokenKind::DSplat | TokenKind::Pow => {
                self.advance()?;
                let value = self.parse_arg()?;
                list.push_pair(None, value, pos);
            }
            TokenKind::BlockAmper | TokenKind::Amper => {
                self.advance()?;
                let value = self.parse_arg()?;
                list.block = Some(Node::new(NodeKind::BlockPass(Box::new(value)), self.pos_from(pos)));
            }
            TokenKind::Label(name) => {
                let key = Node::new(NodeKind::Symbol(name.clone()), pos);
                self.advance()?;
                let value = self.parse_arg()?;
                list.push_pair(Some(key), value, pos);
            }
            _ => {
                let value = self.parse_arg()?;
                if self.eat(&TokenKind::Arrow)? {
                    let pair_value = self.parse_arg()?;
                    list.push_pair(Some(value), pair_value, pos);
                } else {
                    self.support.check_expression(&value)?;
                    if !list.pairs.is_empty() {
                        return Err(positional_after_keywords(&value));
                    }
                    list.push_positional(value);
                }
            }
        }
        Ok(())
    }
}

fn positional_after_keywords(value: &Node) -> Failure {
    Failure::syntax(
        "syntax error, unexpected argument after keyword arguments",
        value.pos.span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_precedence_table() {
        assert!(binary_precedence(&TokenKind::Star, false) > binary_precedence(&TokenKind::Plus, false));
        assert!(binary_precedence(&TokenKind::AndAnd, false) > binary_precedence(&TokenKind::OrOr, false));
        assert_eq!(binary_precedence(&TokenKind::Pipe, true), None);
        assert_eq!(binary_precedence(&TokenKind::Caret, true), Some(5));
        assert_eq!(binary_precedence(&TokenKind::Comma, false), None);
    }
}
