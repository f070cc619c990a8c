//! Statements, modifiers and multiple assignment

use super::Parser;
use crate::error::{Failure, PResult};
use crate::lexer::{Keyword, LexState, Token, TokenKind};
use crate::support::ScopeKind;
use crate::support::nodes::{new_alias, new_rescue_mod_node, new_undef};
use gt_diagnostics::DiagnosticId;
use gt_span::Position;
use gt_syntax::{MultipleAsgn, Node, NodeBox, NodeKind};

/// Targets of a multiple assignment collected left to right
#[derive(Debug, Default)]
pub(super) struct Mlhs {
    masgn: MultipleAsgn,
}

impl Mlhs {
    fn push(&mut self, target: Node) {
        if self.masgn.rest.is_some() {
            self.masgn.post.push(target);
        } else {
            self.masgn.pre.push(target);
        }
    }

    /// Whether more than a single plain target was written
    pub(super) fn is_multiple(&self) -> bool {
        self.masgn.pre.len() + self.masgn.post.len() > 1 || self.masgn.rest.is_some()
    }

    pub(super) fn into_node(self, pos: Position) -> Node {
        Node::new(NodeKind::MultipleAsgn(Box::new(self.masgn)), pos)
    }

    pub(super) fn into_single(mut self) -> Option<Node> {
        self.masgn.pre.pop()
    }
}

impl Parser<'_, '_> {
    /// Statement with any trailing `if`/`unless`/`while`/`until`/`rescue`
    pub(super) fn parse_statement(&mut self) -> PResult<Node> {
        let mut node = self.parse_statement_head()?;
        loop {
            let TokenKind::Keyword(keyword) = self.token.kind else {
                return Ok(node);
            };
            let pos = node.pos;
            node = match keyword {
                Keyword::IfMod | Keyword::UnlessMod => {
                    self.advance()?;
                    let cond = self.parse_condition()?;
                    let body = Some(Box::new(node));
                    let (then_body, else_body) = if keyword == Keyword::IfMod {
                        (body, None)
                    } else {
                        (None, body)
                    };
                    Node::new(
                        NodeKind::If {
                            cond: Box::new(cond),
                            then_body,
                            else_body,
                        },
                        self.pos_from(pos),
                    )
                }
                Keyword::WhileMod | Keyword::UntilMod => {
                    self.advance()?;
                    let cond = Box::new(self.parse_condition()?);
                    let (body, evaluate_at_start) = match node.kind {
                        NodeKind::Begin(body) => (body, false),
                        kind => (Some(Node::boxed(kind, pos)), true),
                    };
                    let kind = if keyword == Keyword::WhileMod {
                        NodeKind::While {
                            cond,
                            body,
                            evaluate_at_start,
                        }
                    } else {
                        NodeKind::Until {
                            cond,
                            body,
                            evaluate_at_start,
                        }
                    };
                    Node::new(kind, self.pos_from(pos))
                }
                Keyword::RescueMod => {
                    self.advance()?;
                    let rescue = self.parse_statement_head()?;
                    new_rescue_mod_node(node, Some(rescue))
                }
                _ => return Ok(node),
            };
        }
    }

    /// Expression used as a condition
    pub(super) fn parse_condition(&mut self) -> PResult<Node> {
        let node = self.parse_expr()?;
        self.support.check_expression(&node)?;
        self.support.get_condition_node(Some(node))
    }

    fn parse_statement_head(&mut self) -> PResult<Node> {
        match self.token.kind {
            TokenKind::Keyword(Keyword::Alias) => return self.parse_alias(),
            TokenKind::Keyword(Keyword::Undef) => return self.parse_undef(),
            TokenKind::Keyword(Keyword::UpperEnd) => return self.parse_end_block(),
            TokenKind::Splat | TokenKind::Star => {
                let pos = self.pos();
                let mut mlhs = Mlhs::default();
                self.parse_mlhs_items(&mut mlhs)?;
                return self.finish_mlhs(mlhs, pos);
            }
            _ => {}
        }

        let mut node = self.parse_expr()?;
        if !self.at(&TokenKind::Comma) {
            return Ok(node);
        }
        if let Some(first) = take_assigned_value(&mut node) {
            return self.parse_mrhs_tail(node, *first);
        }
        if !is_assignable_target(&node) {
            return Err(self.unexpected());
        }
        let pos = node.pos;
        let mut mlhs = Mlhs::default();
        mlhs.push(self.to_assignable(node)?);
        self.advance()?;
        self.parse_mlhs_items(&mut mlhs)?;
        self.finish_mlhs(mlhs, pos)
    }

    /// `a = 1, 2` after the first value
    fn parse_mrhs_tail(&mut self, target: Node, first: Node) -> PResult<Node> {
        let mut list = super::expr::ArgList::default();
        list.push_positional(first);
        self.advance()?;
        self.parse_arg_items(&mut list, None)?;
        let args = list.finish(self);
        if let Some(block) = &args.block {
            return Err(Failure::syntax("block argument should not be given", block.pos.span));
        }
        let Some(value) = args.args else {
            return Err(self.unexpected());
        };
        self.support.node_assign(target, value)
    }

    /// Targets after a comma, up to `=`, `)`, `|` or `in`
    pub(super) fn parse_mlhs_items(&mut self, mlhs: &mut Mlhs) -> PResult<()> {
        loop {
            let done = matches!(
                self.token.kind,
                TokenKind::Assign | TokenKind::RParen | TokenKind::Pipe | TokenKind::Keyword(Keyword::In)
            );
            if done {
                return Ok(());
            }
            self.parse_mlhs_item(mlhs)?;
            if !self.eat(&TokenKind::Comma)? {
                return Ok(());
            }
        }
    }

    fn parse_mlhs_item(&mut self, mlhs: &mut Mlhs) -> PResult<()> {
        let pos = self.pos();
        match self.token.kind {
            TokenKind::LParen | TokenKind::LParenArg => {
                self.advance()?;
                let mut nested = Mlhs::default();
                self.parse_mlhs_items(&mut nested)?;
                self.expect(&TokenKind::RParen)?;
                mlhs.push(nested.into_node(self.pos_from(pos)));
            }
            TokenKind::Splat | TokenKind::Star => {
                if mlhs.masgn.rest.is_some() {
                    return Err(self.unexpected());
                }
                self.advance()?;
                let bare = matches!(
                    self.token.kind,
                    TokenKind::Comma
                        | TokenKind::Assign
                        | TokenKind::RParen
                        | TokenKind::Pipe
                        | TokenKind::Keyword(Keyword::In)
                );
                let rest = if bare {
                    Node::new(NodeKind::Star, pos)
                } else {
                    let node = self.parse_postfix()?;
                    self.to_assignable(node)?
                };
                mlhs.masgn.rest = Some(Box::new(rest));
            }
            _ => {
                let node = self.parse_postfix()?;
                mlhs.push(self.to_assignable(node)?);
            }
        }
        Ok(())
    }

    /// Complete a target list with `= values`, or leave it bare inside parens
    fn finish_mlhs(&mut self, mlhs: Mlhs, pos: Position) -> PResult<Node> {
        let target = mlhs.into_node(pos);
        if self.at(&TokenKind::RParen) {
            return Ok(target);
        }
        self.expect(&TokenKind::Assign)?;
        let value = self.parse_mrhs()?;
        let node = self.support.node_assign(target, value)?;
        Ok(Node::new(node.kind, self.pos_from(pos)))
    }

    /// Right-hand side of a multiple assignment
    pub(super) fn parse_mrhs(&mut self) -> PResult<Node> {
        let args = self.parse_arg_list(None)?;
        if let Some(block) = &args.block {
            return Err(Failure::syntax("block argument should not be given", block.pos.span));
        }
        let Some(node) = args.args else {
            return Err(self.unexpected());
        };
        Ok(match node.kind {
            NodeKind::Array(mut items) if items.len() == 1 => items.remove(0),
            kind => Node::new(kind, node.pos),
        })
    }

    // alias, undef, END

    fn parse_alias(&mut self) -> PResult<Node> {
        let pos = self.pos();
        self.advance()?;
        if let TokenKind::GVar(new_name) = &self.token.kind {
            let new_name = new_name.clone();
            self.set_lex_state(LexState::Fname);
            self.advance()?;
            let old = self.advance()?;
            let old_name = match old.kind {
                TokenKind::GVar(name) => name,
                TokenKind::BackRef(ch) => format!("${ch}"),
                TokenKind::NthRef(_) => {
                    return Err(Failure::syntax("can't make alias for the number variables", old.span));
                }
                _ => return Err(unexpected_token(&old)),
            };
            if old_name[1..].starts_with(|ch: char| ch.is_ascii_digit()) {
                return Err(Failure::syntax("can't make alias for the number variables", old.span));
            }
            return Ok(Node::new(NodeKind::VAlias { new_name, old_name }, self.pos_from(pos)));
        }
        self.set_lex_state(LexState::Fname);
        let new_name = fitem(&self.advance()?)?;
        let old_name = fitem(&self.advance()?)?;
        Ok(new_alias(new_name, old_name, self.pos_from(pos)))
    }

    fn parse_undef(&mut self) -> PResult<Node> {
        let pos = self.pos();
        self.advance()?;
        let mut nodes = Vec::new();
        loop {
            let item_pos = self.pos();
            let name = fitem(&self.advance()?)?;
            nodes.push(new_undef(name, item_pos));
            if !self.at(&TokenKind::Comma) {
                break;
            }
            self.set_lex_state(LexState::Fname);
            self.advance()?;
        }
        if nodes.len() == 1 {
            return Ok(nodes.remove(0));
        }
        Ok(Node::new(NodeKind::Block(nodes), self.pos_from(pos)))
    }

    fn parse_end_block(&mut self) -> PResult<Node> {
        let pos = self.pos();
        if self.support.in_def || self.support.in_single > 0 {
            self.support
                .warn(DiagnosticId::EndInMethod, pos, "END in method; use at_exit");
        }
        self.advance()?;
        self.expect(&TokenKind::LBrace)?;
        let (body, _) = self.in_scope(ScopeKind::Block, |parser| {
            let body = parser.parse_compstmt()?;
            parser.check(&TokenKind::RBrace)?;
            Ok(body)
        })?;
        self.advance()?;
        Ok(Node::new(NodeKind::PostExe(body.map(Box::new)), self.pos_from(pos)))
    }
}

/// Detach the value of a single assignment, leaving the bare target
fn take_assigned_value(node: &mut Node) -> Option<NodeBox> {
    match &mut node.kind {
        NodeKind::LocalAsgn { value, .. }
        | NodeKind::DAsgn { value, .. }
        | NodeKind::InstAsgn { value, .. }
        | NodeKind::ClassVarAsgn { value, .. }
        | NodeKind::GlobalAsgn { value, .. }
        | NodeKind::ConstDecl { value, .. } => value.take(),
        _ => None,
    }
}

/// Whether `node` can stand on the left of `=`
pub(super) fn is_assignable_target(node: &Node) -> bool {
    match &node.kind {
        NodeKind::VCall(_)
        | NodeKind::LocalVar(_)
        | NodeKind::DVar(_)
        | NodeKind::InstVar(_)
        | NodeKind::GlobalVar(_)
        | NodeKind::ClassVar(_)
        | NodeKind::Const(_)
        | NodeKind::Colon3(_)
        | NodeKind::NthRef(_)
        | NodeKind::BackRef(_)
        | NodeKind::Nil
        | NodeKind::True
        | NodeKind::False
        | NodeKind::SelfRef => true,
        NodeKind::Colon2 { left, .. } => left.is_some(),
        NodeKind::Call {
            name, args, iter: None, ..
        } => name == "[]" || (args.is_none() && is_attribute_name(name)),
        NodeKind::MultipleAsgn(masgn) => masgn.value.is_none(),
        _ => false,
    }
}

/// Plain method name usable as `recv.name = v`
pub(super) fn is_attribute_name(name: &str) -> bool {
    name.starts_with(|ch: char| ch.is_alphabetic() || ch == '_')
        && !name.ends_with(['?', '!', '='])
}

/// Method name in `alias` or `undef`
fn fitem(token: &Token) -> PResult<String> {
    match &token.kind {
        TokenKind::Ident(name) | TokenKind::FId(name) | TokenKind::Const(name) | TokenKind::Symbol(name) => {
            Ok(name.clone())
        }
        TokenKind::UnaryOpName(name) => Ok(name.clone()),
        TokenKind::Keyword(keyword) => Ok(keyword.text().to_string()),
        kind => kind
            .operator_name()
            .map(str::to_string)
            .ok_or_else(|| unexpected_token(token)),
    }
}

pub(super) fn unexpected_token(token: &Token) -> Failure {
    Failure::syntax(format!("syntax error, unexpected {}", token.kind), token.span)
}
