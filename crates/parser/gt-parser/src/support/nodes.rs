//! Node builders whose result shape depends on their operands

use super::ParserSupport;
use crate::error::{Failure, PResult};
use crate::lexer::negate_decimal;
use gt_diagnostics::DiagnosticId;
use gt_span::Position;
use gt_syntax::{
    ArgsNode, KeywordParam, Node, NodeBox, NodeKind, OptionalParam, Param, RegexpOptions, RescueBody,
    WhenClause,
};

/// Call arguments split from an optional `&blk`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    /// Positional arguments (`Array`, `Splat`, `ArgsCat`, `ArgsPush`)
    pub args: Option<Node>,
    /// `BlockPass` node for `&blk`
    pub block: Option<Node>,
}

impl CallArgs {
    /// No arguments at all
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether nothing was passed
    #[expect(dead_code, reason = "not yet called by the parser")]
    pub fn is_empty(&self) -> bool {
        self.args.is_none() && self.block.is_none()
    }
}

/// Trailing part of a parameter list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgsTail {
    /// Keyword parameters
    pub keywords: Vec<KeywordParam>,
    /// `**rest`
    pub keyword_rest: Option<Option<String>>,
    /// `&blk`
    pub block: Option<String>,
}

/// Append one positional argument
pub fn arg_append(args: Option<Node>, item: Node) -> Node {
    let Some(args) = args else {
        let pos = item.pos;
        return Node::new(NodeKind::Array(vec![item]), pos);
    };
    let pos = args.pos;
    match args.kind {
        NodeKind::Array(mut items) => {
            items.push(item);
            Node::new(NodeKind::Array(items), pos)
        }
        NodeKind::ArgsPush { first, second } => {
            let tail_pos = second.pos;
            let tail = Node::boxed(NodeKind::Array(vec![*second, item]), tail_pos);
            Node::new(NodeKind::ArgsCat { first, second: tail }, pos)
        }
        kind => Node::new(
            NodeKind::ArgsPush {
                first: Node::boxed(kind, pos),
                second: Box::new(item),
            },
            pos,
        ),
    }
}

/// Append a splatted tail to the arguments
pub fn arg_concat(first: Node, second: Option<Node>) -> Node {
    match second {
        None => first,
        Some(second) => {
            let pos = first.pos;
            Node::new(
                NodeKind::ArgsCat {
                    first: Box::new(first),
                    second: Box::new(second),
                },
                pos,
            )
        }
    }
}

/// Attach an optional `&blk` to the arguments
pub fn arg_blk_pass(args: Option<Node>, block: Option<Node>) -> CallArgs {
    CallArgs { args, block }
}

/// Append to a list node, turning a lone node into a list
#[expect(dead_code, reason = "not yet called by the parser")]
pub fn list_append(list: Option<Node>, item: Node) -> Node {
    match list {
        None => {
            let pos = item.pos;
            Node::new(NodeKind::Array(vec![item]), pos)
        }
        Some(Node {
            kind: NodeKind::Array(mut items),
            pos,
        }) => {
            items.push(item);
            Node::new(NodeKind::Array(items), pos)
        }
        Some(other) => {
            let pos = other.pos;
            Node::new(NodeKind::Array(vec![other, item]), pos)
        }
    }
}

/// Join two adjacent pieces of a string literal
pub fn literal_concat(head: Option<Node>, tail: Node) -> Node {
    let Some(head) = head else {
        return tail;
    };
    let pos = head.pos;
    let head_parts = match head.kind {
        NodeKind::Str(front) => match tail.kind {
            NodeKind::Str(back) => {
                if front.is_empty() {
                    return Node::new(NodeKind::Str(back), tail.pos);
                }
                let mut joined = front;
                joined.extend_from_slice(&back);
                return Node::new(NodeKind::Str(joined), pos);
            }
            _ if front.is_empty() => Vec::new(),
            _ => vec![Node::new(NodeKind::Str(front), pos)],
        },
        NodeKind::EvStr(body) => vec![Node::new(NodeKind::EvStr(body), pos)],
        NodeKind::DStr(parts) => parts,
        other => vec![Node::new(other, pos)],
    };
    let mut parts = head_parts;
    match tail.kind {
        NodeKind::DStr(more) => parts.extend(more),
        NodeKind::Str(back) => {
            if let Some(Node {
                kind: NodeKind::Str(last),
                ..
            }) = parts.last_mut()
            {
                last.extend_from_slice(&back);
            } else {
                parts.push(Node::new(NodeKind::Str(back), tail.pos));
            }
        }
        kind => parts.push(Node::new(kind, tail.pos)),
    }
    Node::new(NodeKind::DStr(parts), pos)
}

/// Regexp literal from its string contents
pub fn new_regexp_node(contents: Option<Node>, options: RegexpOptions, pos: Position) -> Node {
    match contents {
        None => Node::new(
            NodeKind::Regexp {
                source: Vec::new(),
                options,
            },
            pos,
        ),
        Some(Node {
            kind: NodeKind::Str(source),
            ..
        }) => Node::new(NodeKind::Regexp { source, options }, pos),
        Some(Node {
            kind: NodeKind::DStr(parts),
            ..
        }) => Node::new(NodeKind::DRegexp { parts, options }, pos),
        Some(other) => Node::new(
            NodeKind::DRegexp {
                parts: vec![other],
                options,
            },
            pos,
        ),
    }
}

/// `*value` in an argument or array position
pub fn new_splat(value: Node, pos: Position) -> Node {
    Node::new(NodeKind::Splat(Box::new(value)), pos)
}

/// Single value splatted into several (`return *a`)
pub fn new_svalue(value: Node, pos: Position) -> Node {
    Node::new(NodeKind::SValue(Box::new(value)), pos)
}

/// Negate a numeric literal after a unary minus
pub fn negate_integer(node: Node) -> Node {
    let pos = node.pos;
    let kind = match node.kind {
        NodeKind::Fixnum(value) => match value.checked_neg() {
            Some(negated) => NodeKind::Fixnum(negated),
            None => NodeKind::Bignum(negate_decimal(&value.to_string())),
        },
        NodeKind::Bignum(digits) => {
            let negated = negate_decimal(&digits);
            match negated.parse::<i64>() {
                Ok(value) => NodeKind::Fixnum(value),
                Err(_) => NodeKind::Bignum(negated),
            }
        }
        other => other,
    };
    Node::new(kind, pos)
}

/// Negate a float literal after a unary minus
pub fn negate_float(node: Node) -> Node {
    let pos = node.pos;
    match node.kind {
        NodeKind::Float(value) => Node::new(NodeKind::Float(-value), pos),
        other => Node::new(other, pos),
    }
}

/// `A::B`
pub fn new_colon2(left: Option<Node>, name: &str, pos: Position) -> Node {
    Node::new(
        NodeKind::Colon2 {
            left: left.map(Box::new),
            name: name.to_string(),
        },
        pos,
    )
}

/// `::B`
pub fn new_colon3(name: &str, pos: Position) -> Node {
    Node::new(NodeKind::Colon3(name.to_string()), pos)
}

/// `alias new old`
pub fn new_alias(new_name: String, old_name: String, pos: Position) -> Node {
    Node::new(NodeKind::Alias { new_name, old_name }, pos)
}

/// `undef name`
pub fn new_undef(name: String, pos: Position) -> Node {
    Node::new(NodeKind::Undef(name), pos)
}

/// `defined?(expr)`
pub fn new_defined(expression: Node, pos: Position) -> Node {
    Node::new(NodeKind::Defined(Box::new(expression)), pos)
}

/// `body rescue fallback`
pub fn new_rescue_mod_node(body: Node, rescue: Option<Node>) -> Node {
    let pos = body.pos;
    let rescue = rescue.unwrap_or_else(|| Node::nil(pos));
    Node::new(
        NodeKind::Rescue {
            body: Some(Box::new(body)),
            rescues: vec![RescueBody {
                pos,
                exceptions: Vec::new(),
                body: Some(Box::new(rescue)),
            }],
            else_body: None,
        },
        pos,
    )
}

/// `a.b op= v`
pub fn new_op_asgn(receiver: Node, attribute: &str, operator: &str, value: Node, pos: Position) -> Node {
    Node::new(
        NodeKind::OpAsgn {
            receiver: Box::new(receiver),
            attribute: attribute.to_string(),
            operator: operator.to_string(),
            value: Box::new(value),
        },
        pos,
    )
}

/// `a[i] op= v`
pub fn new_op_element_asgn_node(receiver: Node, operator: &str, args: Option<Node>, value: Node) -> Node {
    let pos = receiver.pos;
    Node::new(
        NodeKind::OpElementAsgn {
            receiver: Box::new(receiver),
            args: args.map(Box::new),
            operator: operator.to_string(),
            value: Box::new(value),
        },
        pos,
    )
}

/// Case expression from its clauses
pub fn new_case_node(
    subject: Option<Node>,
    whens: Vec<WhenClause>,
    else_body: Option<Node>,
    pos: Position,
) -> Node {
    Node::new(
        NodeKind::Case {
            subject: subject.map(Box::new),
            whens,
            else_body: else_body.map(Box::new),
        },
        pos,
    )
}

/// One `when` clause; argument-list shapes become a flat candidate list
pub fn new_when_node(candidates: Node, body: Option<Node>, pos: Position) -> WhenClause {
    let mut flat = Vec::new();
    flatten_candidates(candidates, &mut flat);
    WhenClause {
        pos,
        candidates: flat,
        body: body.map(Box::new),
    }
}

fn flatten_candidates(node: Node, out: &mut Vec<Node>) {
    let pos = node.pos;
    match node.kind {
        NodeKind::Array(items) => out.extend(items),
        NodeKind::ArgsCat { first, second } => {
            flatten_candidates(*first, out);
            out.push(new_splat(*second, pos));
        }
        NodeKind::ArgsPush { first, second } => {
            flatten_candidates(*first, out);
            out.push(*second);
        }
        kind => out.push(Node::new(kind, pos)),
    }
}

/// Set the value of an assignment target
pub fn set_value(target: Node, value: Node) -> Node {
    let pos = target.pos;
    let value = Some(Box::new(value));
    let kind = match target.kind {
        NodeKind::LocalAsgn { name, .. } => NodeKind::LocalAsgn { name, value },
        NodeKind::DAsgn { name, .. } => NodeKind::DAsgn { name, value },
        NodeKind::InstAsgn { name, .. } => NodeKind::InstAsgn { name, value },
        NodeKind::ClassVarAsgn { name, .. } => NodeKind::ClassVarAsgn { name, value },
        NodeKind::GlobalAsgn { name, .. } => NodeKind::GlobalAsgn { name, value },
        NodeKind::ConstDecl { name, scope, .. } => NodeKind::ConstDecl { name, scope, value },
        NodeKind::MultipleAsgn(mut masgn) => {
            masgn.value = value;
            NodeKind::MultipleAsgn(masgn)
        }
        NodeKind::AttrAssign {
            receiver,
            name,
            args,
        } => {
            let value = value.map_or_else(|| Node::nil(pos), |value| *value);
            NodeKind::AttrAssign {
                receiver,
                name,
                args: Some(Box::new(arg_append(args.map(|args| *args), value))),
            }
        }
        other => other,
    };
    Node::new(kind, pos)
}

impl ParserSupport<'_> {
    /// Assign `value` to `target` after checking the value is usable
    pub fn node_assign(&mut self, target: Node, value: Node) -> PResult<Node> {
        self.check_expression(&value)?;
        Ok(set_value(target, value))
    }

    /// `recv[args] = v` target
    pub fn aryset(&mut self, receiver: Node, args: Option<Node>) -> PResult<Node> {
        self.check_expression(&receiver)?;
        let pos = receiver.pos;
        Ok(Node::new(
            NodeKind::AttrAssign {
                receiver: Box::new(receiver),
                name: "[]=".to_string(),
                args: args.map(Box::new),
            },
            pos,
        ))
    }

    /// `recv.name = v` target
    pub fn attrset(&mut self, receiver: Node, name: &str) -> PResult<Node> {
        self.check_expression(&receiver)?;
        let pos = receiver.pos;
        Ok(Node::new(
            NodeKind::AttrAssign {
                receiver: Box::new(receiver),
                name: format!("{name}="),
                args: None,
            },
            pos,
        ))
    }

    /// Binary or unary operator call
    pub fn get_operator_call_node(&mut self, receiver: Node, operator: &str, arg: Option<Node>) -> PResult<Node> {
        self.check_expression(&receiver)?;
        if let Some(arg) = &arg {
            self.check_expression(arg)?;
        }
        let pos = receiver.pos;
        let args = arg.map(|arg| {
            let arg_pos = arg.pos;
            Node::boxed(NodeKind::Array(vec![arg]), arg_pos)
        });
        Ok(Node::new(
            NodeKind::Call {
                receiver: Box::new(receiver),
                name: operator.to_string(),
                args,
                iter: None,
            },
            pos,
        ))
    }

    /// `a =~ b`, specialised when either side is a regexp literal
    pub fn get_match_node(&mut self, first: Node, second: Node) -> PResult<Node> {
        let pos = first.pos;
        match &first.kind {
            NodeKind::DRegexp { .. } => {
                return Ok(Node::new(
                    NodeKind::Match2 {
                        receiver: Box::new(first),
                        value: Box::new(second),
                    },
                    pos,
                ));
            }
            NodeKind::Regexp { source, .. } => {
                let source = source.clone();
                self.declare_named_captures(&source, pos);
                return Ok(Node::new(
                    NodeKind::Match2 {
                        receiver: Box::new(first),
                        value: Box::new(second),
                    },
                    pos,
                ));
            }
            _ => {}
        }
        if matches!(second.kind, NodeKind::Regexp { .. } | NodeKind::DRegexp { .. }) {
            return Ok(Node::new(
                NodeKind::Match3 {
                    receiver: Box::new(second),
                    value: Box::new(first),
                },
                pos,
            ));
        }
        self.get_operator_call_node(first, "=~", Some(second))
    }

    /// `a && b`
    pub fn new_and_node(&mut self, left: Node, right: Node) -> PResult<Node> {
        self.check_expression(&left)?;
        let pos = left.pos;
        Ok(Node::new(NodeKind::And(Box::new(left), Box::new(right)), pos))
    }

    /// `a || b`
    pub fn new_or_node(&mut self, left: Node, right: Node) -> PResult<Node> {
        self.check_expression(&left)?;
        let pos = left.pos;
        Ok(Node::new(NodeKind::Or(Box::new(left), Box::new(right)), pos))
    }

    /// Call with an explicit receiver
    pub fn new_call(&mut self, receiver: Node, name: &str, args: CallArgs, iter: Option<Node>) -> PResult<Node> {
        let pos = receiver.pos;
        let iter = merge_block(args.block, iter, pos)?;
        Ok(Node::new(
            NodeKind::Call {
                receiver: Box::new(receiver),
                name: name.to_string(),
                args: args.args.map(Box::new),
                iter: iter.map(Box::new),
            },
            pos,
        ))
    }

    /// Call on the implicit receiver
    pub fn new_fcall(&mut self, name: &str, args: CallArgs, iter: Option<Node>, pos: Position) -> PResult<Node> {
        let iter = merge_block(args.block, iter, pos)?;
        Ok(Node::new(
            NodeKind::FCall {
                name: name.to_string(),
                args: args.args.map(Box::new),
                iter: iter.map(Box::new),
            },
            pos,
        ))
    }

    /// `super(...)`
    pub fn new_super(&mut self, args: CallArgs, iter: Option<Node>, pos: Position) -> PResult<Node> {
        let iter = merge_block(args.block, iter, pos)?;
        Ok(Node::new(
            NodeKind::Super {
                args: args.args.map(Box::new),
                iter: iter.map(Box::new),
            },
            pos,
        ))
    }

    /// `yield args`
    pub fn new_yield(&mut self, args: CallArgs, pos: Position) -> PResult<Node> {
        if let Some(block) = &args.block {
            return Err(Failure::syntax("Block argument should not be given.", block.pos.span));
        }
        let unsplat = matches!(
            args.args.as_ref().map(|args| &args.kind),
            Some(NodeKind::Splat(_) | NodeKind::ArgsCat { .. } | NodeKind::ArgsPush { .. })
        );
        Ok(Node::new(
            NodeKind::Yield {
                args: args.args.map(Box::new),
                unsplat,
            },
            pos,
        ))
    }

    /// Value carried by `return`, `break` or `next`
    pub fn ret_args(&mut self, args: CallArgs, pos: Position) -> PResult<Option<NodeBox>> {
        if let Some(block) = &args.block {
            return Err(Failure::syntax("block argument should not be given", block.pos.span));
        }
        let Some(node) = args.args else {
            return Ok(None);
        };
        let node = match node.kind {
            NodeKind::Array(mut items) if items.len() == 1 => items.remove(0),
            NodeKind::Splat(value) => new_svalue(Node::new(NodeKind::Splat(value), node.pos), pos),
            kind => Node::new(kind, node.pos),
        };
        Ok(Some(Box::new(node)))
    }

    /// Warn about literal keys that appear twice in a hash literal
    pub fn remove_duplicate_keys(&mut self, pairs: Vec<(Option<Node>, Node)>, pos: Position) -> Vec<(Option<Node>, Node)> {
        let mut seen: Vec<&Node> = Vec::new();
        let mut duplicates = Vec::new();
        for key in pairs.iter().filter_map(|(key, _)| key.as_ref()) {
            if !is_static_key(key) {
                continue;
            }
            match seen.iter().find(|earlier| earlier.kind == key.kind) {
                Some(earlier) => duplicates.push((describe_key(key), earlier.pos.line)),
                None => seen.push(key),
            }
        }
        for (key, line) in duplicates {
            self.warn(
                DiagnosticId::DuplicateHashKey,
                pos,
                format!("key {key} is duplicated and overwritten on line {line}"),
            );
        }
        pairs
    }

    /// Complete parameter list
    #[allow(clippy::too_many_arguments, reason = "one argument per part of a parameter list")]
    pub fn new_args(
        &mut self,
        pos: Position,
        pre: Vec<Param>,
        optional: Vec<OptionalParam>,
        rest: Option<Option<String>>,
        post: Vec<Param>,
        tail: ArgsTail,
    ) -> ArgsNode {
        let mut args = ArgsNode::empty(pos);
        args.pre = pre;
        args.optional = optional;
        args.rest = rest;
        args.post = post;
        args.keywords = tail.keywords;
        if let Some(Some(name)) = &tail.keyword_rest {
            if !self.scopes.is_defined_in_current(name) {
                self.scopes.declare_in_current(name);
            }
        }
        args.keyword_rest = tail.keyword_rest;
        args.block = tail.block;
        args
    }
}

fn merge_block(block: Option<Node>, iter: Option<Node>, pos: Position) -> PResult<Option<Node>> {
    match (block, iter) {
        (Some(_), Some(_)) => Err(Failure::syntax("Both block arg and actual block given.", pos.span)),
        (Some(block), None) => Ok(Some(block)),
        (None, iter) => Ok(iter),
    }
}

fn is_static_key(key: &Node) -> bool {
    matches!(
        key.kind,
        NodeKind::Symbol(_)
            | NodeKind::Str(_)
            | NodeKind::Fixnum(_)
            | NodeKind::Bignum(_)
            | NodeKind::Float(_)
            | NodeKind::Nil
            | NodeKind::True
            | NodeKind::False
    )
}

fn describe_key(key: &Node) -> String {
    match &key.kind {
        NodeKind::Symbol(name) => format!(":{name}"),
        NodeKind::Str(bytes) => format!("{:?}", String::from_utf8_lossy(bytes)),
        NodeKind::Fixnum(value) => value.to_string(),
        NodeKind::Bignum(digits) => digits.clone(),
        NodeKind::Float(value) => value.to_string(),
        NodeKind::Nil => "nil".to_string(),
        NodeKind::True => "true".to_string(),
        NodeKind::False => "false".to_string(),
        other => other.name().to_string(),
    }
}
