//! Checks and rewrites applied to expressions in special positions

use super::ParserSupport;
use crate::error::{Failure, PResult};
use gt_diagnostics::DiagnosticId;
use gt_syntax::{Node, NodeKind};

/// Operators whose result is pointless when discarded
static USELESS_OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "%", "**", "+@", "-@", "|", "^", "&", "<=>", ">", ">=", "<", "<=", "==", "!=",
];

impl ParserSupport<'_> {
    /// Reject `return`, `break` and friends where a value is required
    pub fn check_expression(&mut self, node: &Node) -> PResult<()> {
        if let Some(void) = find_void_value(node, false) {
            return Err(Failure::syntax("void value expression", void.pos.span));
        }
        Ok(())
    }

    /// Verbose warning for a statement whose value is discarded to no effect
    pub fn check_useless_statement(&mut self, node: &Node) {
        if !self.is_verbose() || (self.is_eval() && !self.is_inline_source()) {
            return;
        }
        let useless = match &node.kind {
            NodeKind::Call { name, .. } if USELESS_OPERATORS.contains(&name.as_str()) => name.clone(),
            NodeKind::BackRef(_)
            | NodeKind::DVar(_)
            | NodeKind::GlobalVar(_)
            | NodeKind::LocalVar(_)
            | NodeKind::NthRef(_)
            | NodeKind::ClassVar(_)
            | NodeKind::InstVar(_) => "a variable".to_string(),
            NodeKind::Bignum(_)
            | NodeKind::DRegexp { .. }
            | NodeKind::DStr(_)
            | NodeKind::DSymbol(_)
            | NodeKind::Fixnum(_)
            | NodeKind::Float(_)
            | NodeKind::Regexp { .. }
            | NodeKind::Str(_)
            | NodeKind::Symbol(_) => "a literal".to_string(),
            NodeKind::Dot { exclusive, .. } => {
                if *exclusive { "..." } else { ".." }.to_string()
            }
            NodeKind::Defined(_) => "defined?".to_string(),
            NodeKind::False => "false".to_string(),
            NodeKind::Nil => "nil".to_string(),
            NodeKind::True => "true".to_string(),
            _ => return,
        };
        self.warn_verbose(
            DiagnosticId::UselessStatement,
            node.pos,
            format!("Useless use of {useless} in void context."),
        );
    }

    /// Check every statement of a sequence but the last
    pub fn check_useless_statements(&mut self, statements: &[Node]) {
        if let Some((_, leading)) = statements.split_last() {
            for statement in leading {
                self.check_useless_statement(statement);
            }
        }
    }

    /// Diagnose an assignment used as a condition; true when one was found
    pub fn check_assignment_in_condition(&mut self, node: &Node) -> PResult<bool> {
        let value = match &node.kind {
            NodeKind::MultipleAsgn(_) => {
                return Err(Failure::syntax("multiple assignment in conditional", node.pos.span));
            }
            NodeKind::LocalAsgn { value, .. }
            | NodeKind::DAsgn { value, .. }
            | NodeKind::GlobalAsgn { value, .. }
            | NodeKind::InstAsgn { value, .. } => value,
            _ => return Ok(false),
        };
        if value.as_deref().is_some_and(is_static_content) {
            self.warn(
                DiagnosticId::AssignmentInCondition,
                node.pos,
                "found = in conditional, should be ==",
            );
        }
        Ok(true)
    }

    /// Rewrite an expression used as a condition
    pub fn get_condition_node(&mut self, node: Option<Node>) -> PResult<Node> {
        let Some(node) = node else {
            return Ok(Node::nil(gt_span::Position::default()));
        };
        self.check_assignment_in_condition(&node)?;
        let pos = node.pos;
        let kind = match node.kind {
            NodeKind::DRegexp { parts, options } => NodeKind::Match2 {
                receiver: Node::boxed(NodeKind::DRegexp { parts, options }, pos),
                value: Node::boxed(NodeKind::GlobalVar("$_".to_string()), pos),
            },
            NodeKind::And(left, right) => NodeKind::And(
                Box::new(self.get_condition_node(Some(*left))?),
                Box::new(self.get_condition_node(Some(*right))?),
            ),
            NodeKind::Or(left, right) => NodeKind::Or(
                Box::new(self.get_condition_node(Some(*left))?),
                Box::new(self.get_condition_node(Some(*right))?),
            ),
            NodeKind::Dot {
                begin,
                end,
                exclusive,
            } => {
                if begin.is_literal() && end.is_literal() {
                    NodeKind::Dot {
                        begin,
                        end,
                        exclusive,
                    }
                } else {
                    NodeKind::Flip {
                        begin: Box::new(self.flip_condition(*begin)?),
                        end: Box::new(self.flip_condition(*end)?),
                        exclusive,
                    }
                }
            }
            NodeKind::Regexp { source, options } => {
                if !self.is_inline_source() {
                    self.warn_verbose(DiagnosticId::RegexpLiteralInCondition, pos, "regex literal in condition");
                }
                NodeKind::Match(Node::boxed(NodeKind::Regexp { source, options }, pos))
            }
            kind => kind,
        };
        Ok(Node::new(kind, pos))
    }

    /// Endpoint of a flip-flop; in `-e` scripts an integer compares with `$.`
    fn flip_condition(&mut self, node: Node) -> PResult<Node> {
        if !self.is_inline_source() {
            return Ok(node);
        }
        if let NodeKind::Fixnum(_) = node.kind {
            let pos = node.pos;
            let line_var = Node::new(NodeKind::GlobalVar("$.".to_string()), pos);
            return self.get_operator_call_node(node, "==", Some(line_var));
        }
        self.get_condition_node(Some(node))
    }
}

/// First node that would make `node` produce no value
fn find_void_value(node: &Node, conditional: bool) -> Option<&Node> {
    match &node.kind {
        NodeKind::Return(_) | NodeKind::Break(_) | NodeKind::Next(_) | NodeKind::Redo | NodeKind::Retry => {
            (!conditional).then_some(node)
        }
        NodeKind::Block(statements) => statements.last().and_then(|last| find_void_value(last, conditional)),
        NodeKind::Begin(Some(body)) => find_void_value(body, conditional),
        NodeKind::If {
            then_body,
            else_body,
            ..
        } => then_body
            .as_deref()
            .and_then(|body| find_void_value(body, false))
            .or_else(|| else_body.as_deref().and_then(|body| find_void_value(body, conditional))),
        NodeKind::And(_, right) | NodeKind::Or(_, right) => find_void_value(right, true),
        _ => None,
    }
}

/// Whether an assigned value is a compile-time constant
fn is_static_content(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Hash(pairs) => pairs.iter().all(|(key, value)| {
            key.as_ref().is_some_and(is_static_content) && is_static_content(value)
        }),
        NodeKind::Array(items) => items.iter().all(is_static_content),
        NodeKind::ZArray
        | NodeKind::Str(_)
        | NodeKind::DStr(_)
        | NodeKind::Symbol(_)
        | NodeKind::DSymbol(_)
        | NodeKind::Fixnum(_)
        | NodeKind::Bignum(_)
        | NodeKind::Float(_)
        | NodeKind::Regexp { .. }
        | NodeKind::DRegexp { .. }
        | NodeKind::Nil
        | NodeKind::True
        | NodeKind::False => true,
        _ => false,
    }
}
