//! Formal parameter lists

use super::Parser;
use crate::error::{Failure, PResult};
use crate::lexer::TokenKind;
use crate::support::Variable;
use crate::support::nodes::ArgsTail;
use gt_span::Position;
use gt_syntax::{ArgsNode, KeywordParam, MultipleAsgn, Node, NodeKind, OptionalParam, Param};

/// What the parameter list belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ParamContext {
    /// `def`
    Method,
    /// `{ |...| }` and `do |...|`
    Block,
    /// `->(...)`
    Lambda,
}

impl ParamContext {
    fn allows_destructuring(self) -> bool {
        self != Self::Method
    }
}

#[derive(Default)]
struct ParamsBuilder {
    pre: Vec<Param>,
    optional: Vec<OptionalParam>,
    rest: Option<Option<String>>,
    post: Vec<Param>,
    tail: ArgsTail,
}

impl ParamsBuilder {
    /// Required parameters after an optional or rest one go to `post`
    fn push_required(&mut self, param: Param) {
        if self.rest.is_some() || !self.optional.is_empty() {
            self.post.push(param);
        } else {
            self.pre.push(param);
        }
    }
}

impl Parser<'_, '_> {
    /// Parameters up to `closer` (or up to the first token that cannot
    /// continue the list when there is none)
    pub(super) fn parse_param_list(
        &mut self,
        context: ParamContext,
        closer: Option<&TokenKind>,
    ) -> PResult<ArgsNode> {
        let pos = self.pos();
        let mut builder = ParamsBuilder::default();
        let mut excess_comma = false;
        loop {
            if closer.is_some_and(|closer| self.at(closer)) || self.at(&TokenKind::Semi) {
                break;
            }
            self.parse_param(context, &mut builder)?;
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
            if closer.is_some_and(|closer| self.at(closer)) {
                if context != ParamContext::Block {
                    return Err(self.unexpected());
                }
                excess_comma = true;
                break;
            }
        }
        let pos = self.pos_from(pos);
        let ParamsBuilder {
            pre,
            optional,
            rest,
            post,
            tail,
        } = builder;
        let mut args = self.support.new_args(pos, pre, optional, rest, post, tail);
        args.excess_comma = excess_comma;
        Ok(args)
    }

    fn parse_param(&mut self, context: ParamContext, builder: &mut ParamsBuilder) -> PResult<()> {
        let pos = self.pos();
        match self.token.kind.clone() {
            TokenKind::Ident(name) => {
                let name = self.declare_param(Variable::Identifier(name), pos)?;
                self.advance()?;
                if !self.eat(&TokenKind::Assign)? {
                    builder.push_required(Param::Required(name));
                    return Ok(());
                }
                if builder.rest.is_some() || !builder.post.is_empty() {
                    return Err(Failure::syntax("syntax error, unexpected `='", pos.span));
                }
                let default = self.parse_param_default(context, &name)?;
                builder.optional.push(OptionalParam { name, default });
            }
            TokenKind::Const(name) => return Err(self.bad_param(Variable::Const(name), pos)),
            TokenKind::IVar(name) => return Err(self.bad_param(Variable::IVar(name), pos)),
            TokenKind::GVar(name) => return Err(self.bad_param(Variable::GVar(name), pos)),
            TokenKind::CVar(name) => return Err(self.bad_param(Variable::CVar(name), pos)),
            TokenKind::Label(name) => {
                let name = self.declare_param(Variable::Identifier(name), pos)?;
                self.advance()?;
                let required = matches!(
                    self.token.kind,
                    TokenKind::Comma | TokenKind::Pipe | TokenKind::RParen | TokenKind::NewLine | TokenKind::Semi
                );
                let default = if required {
                    None
                } else {
                    Some(self.parse_param_default(context, &name)?)
                };
                builder.tail.keywords.push(KeywordParam { name, default });
            }
            TokenKind::Splat | TokenKind::Star => {
                if builder.rest.is_some() {
                    return Err(self.unexpected());
                }
                self.advance()?;
                builder.rest = Some(self.parse_optional_param_name()?);
            }
            TokenKind::DSplat | TokenKind::Pow => {
                self.advance()?;
                builder.tail.keyword_rest = Some(self.parse_optional_param_name()?);
            }
            TokenKind::BlockAmper | TokenKind::Amper => {
                self.advance()?;
                let name_pos = self.pos();
                let TokenKind::Ident(name) = self.token.kind.clone() else {
                    return Err(self.unexpected());
                };
                builder.tail.block = Some(self.declare_param(Variable::Identifier(name), name_pos)?);
                self.advance()?;
            }
            TokenKind::LParen | TokenKind::LParenArg | TokenKind::LParenCall if context.allows_destructuring() => {
                let masgn = self.parse_destructure_param()?;
                builder.push_required(Param::Destructure(Box::new(masgn)));
            }
            _ => return Err(self.unexpected()),
        }
        Ok(())
    }

    /// Declare a parameter before the token after it is lexed
    fn declare_param(&mut self, variable: Variable, pos: Position) -> PResult<String> {
        let name = self.support.formal_argument(&variable, pos)?;
        Ok(self.support.arg_var(&name))
    }

    fn bad_param(&mut self, variable: Variable, pos: Position) -> Failure {
        match self.support.formal_argument(&variable, pos) {
            Err(failure) => failure,
            Ok(_) => self.unexpected(),
        }
    }

    /// Name after `*` or `**`; `None` for the anonymous form
    fn parse_optional_param_name(&mut self) -> PResult<Option<String>> {
        let pos = self.pos();
        let TokenKind::Ident(name) = self.token.kind.clone() else {
            return Ok(None);
        };
        let name = self.declare_param(Variable::Identifier(name), pos)?;
        self.advance()?;
        Ok(Some(name))
    }

    /// Default value; the parameter itself is in scope but reading it warns
    fn parse_param_default(&mut self, context: ParamContext, name: &str) -> PResult<Node> {
        let saved_arg = self.support.current_arg.replace(name.to_string());
        let saved_no_pipe = self.no_pipe;
        self.no_pipe = context == ParamContext::Block;
        let default = self.parse_arg();
        self.no_pipe = saved_no_pipe;
        self.support.current_arg = saved_arg;
        default
    }

    /// `(a, (b, *c))` in a block parameter list
    fn parse_destructure_param(&mut self) -> PResult<MultipleAsgn> {
        self.advance()?;
        let mut masgn = MultipleAsgn::new();
        loop {
            if self.at(&TokenKind::RParen) {
                break;
            }
            let pos = self.pos();
            let target = match self.token.kind.clone() {
                TokenKind::Ident(name) => {
                    let name = self.support.formal_argument(&Variable::Identifier(name), pos)?;
                    let target = self.support.assignable_in_current(&name, None, pos);
                    self.advance()?;
                    target
                }
                TokenKind::Splat | TokenKind::Star => {
                    if masgn.rest.is_some() {
                        return Err(self.unexpected());
                    }
                    self.advance()?;
                    let rest = self.parse_destructure_rest(pos)?;
                    masgn.rest = Some(Box::new(rest));
                    if !self.eat(&TokenKind::Comma)? {
                        break;
                    }
                    continue;
                }
                TokenKind::LParen | TokenKind::LParenArg | TokenKind::LParenCall => {
                    let nested = self.parse_destructure_param()?;
                    Node::new(NodeKind::MultipleAsgn(Box::new(nested)), self.pos_from(pos))
                }
                _ => return Err(self.unexpected()),
            };
            if masgn.rest.is_some() {
                masgn.post.push(target);
            } else {
                masgn.pre.push(target);
            }
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(masgn)
    }

    /// Name after `*` in a destructuring parameter, or an anonymous `*`
    fn parse_destructure_rest(&mut self, pos: Position) -> PResult<Node> {
        let name_pos = self.pos();
        let TokenKind::Ident(name) = self.token.kind.clone() else {
            return Ok(Node::new(NodeKind::Star, pos));
        };
        let name = self.support.formal_argument(&Variable::Identifier(name), name_pos)?;
        let target = self.support.assignable_in_current(&name, None, name_pos);
        self.advance()?;
        Ok(target)
    }
}
