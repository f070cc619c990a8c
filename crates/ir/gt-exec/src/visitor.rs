//! Traversal of executable nodes

use crate::{ExecGraph, ExecId, ExecKind, ExecNode, RescueClause};

impl ExecKind {
    /// Direct children in evaluation order
    pub fn children(&self) -> Vec<ExecId> {
        match self {
            Self::Nil
            | Self::Boolean(_)
            | Self::SelfRef
            | Self::Fixnum(_)
            | Self::Bignum(_)
            | Self::Float(_)
            | Self::Str(_)
            | Self::Symbol(_)
            | Self::Regexp { .. }
            | Self::Encoding(_)
            | Self::IntegerRange { .. }
            | Self::ReadLocal(_)
            | Self::ReadInstance(_)
            | Self::ReadGlobal(_)
            | Self::ObjectClass
            | Self::MainObject
            | Self::ZSuper { block: None }
            | Self::AliasGlobal { .. }
            | Self::Redo
            | Self::Retry
            | Self::InitFlipFlopSlot(_)
            | Self::ReadPreArgument { .. }
            | Self::ReadPostArgument { .. }
            | Self::ReadRestArgument { .. }
            | Self::ReadKeywordArgument { default: None, .. }
            | Self::ReadKeywordRestArgument { .. }
            | Self::ReadBlockArgument => Vec::new(),

            Self::StringToSymbol(value)
            | Self::StringToRegexp { string: value, .. }
            | Self::System(value)
            | Self::SplatCast { value, .. }
            | Self::WriteLocal { value, .. }
            | Self::WriteInstance { value, .. }
            | Self::ClassOf(value)
            | Self::WriteGlobal { value, .. }
            | Self::CheckMatchData(value)
            | Self::ProcCast(value)
            | Self::ZSuper { block: Some(value) }
            | Self::Defined(value)
            | Self::Not(value)
            | Self::BooleanCast(value)
            | Self::Break(value)
            | Self::Next(value)
            | Self::Return { value, .. }
            | Self::CatchReturn { body: value, .. }
            | Self::CatchNext(value)
            | Self::CatchRedo(value)
            | Self::CatchRetryAsError(value)
            | Self::ShouldDestructure(value)
            | Self::RespondTo { value, .. }
            | Self::ArraySizeAtLeast { array: value, .. }
            | Self::ReadOptionalArgument { default: value, .. }
            | Self::ReadKeywordArgument {
                default: Some(value), ..
            }
            | Self::ArrayIndex { array: value, .. }
            | Self::ArraySlice { array: value, .. }
            | Self::MethodDefinition { body: value, .. }
            | Self::SingletonClass(value)
            | Self::BlockDefinition { body: value, .. }
            | Self::ReadClassVar { module: value, .. }
            | Self::ReadConstant { module: value, .. }
            | Self::Alias { module: value, .. }
            | Self::Undef { module: value, .. }
            | Self::DefineModule {
                lexical_parent: value, ..
            } => vec![*value],

            Self::Range { begin, end, .. } => vec![*begin, *end],
            Self::ArrayPush { array, value } => vec![*array, *value],
            Self::WriteClassVar { module, value, .. } | Self::WriteConstant { module, value, .. } => {
                vec![*module, *value]
            }
            Self::And(left, right) | Self::Or(left, right) => vec![*left, *right],
            Self::While { cond, body, do_while } => {
                if *do_while {
                    vec![*body, *cond]
                } else {
                    vec![*cond, *body]
                }
            }
            Self::Ensure { body, ensure } => vec![*body, *ensure],
            Self::FlipFlop { begin, end, .. } => vec![*begin, *end],
            Self::WhenSplat { subject, splat } => vec![*subject, *splat],
            Self::AddMethod { module, method } => vec![*module, *method],
            Self::DefineClass {
                lexical_parent,
                superclass,
                ..
            } => vec![*lexical_parent, *superclass],
            Self::OpenModule { module, definition } => vec![*module, *definition],
            Self::If {
                cond,
                then_body,
                else_body,
            } => vec![*cond, *then_body, *else_body],

            Self::InterpolatedString(parts)
            | Self::ArrayLiteral(parts)
            | Self::ArrayConcat(parts)
            | Self::Sequence(parts)
            | Self::Yield { args: parts, .. } => parts.clone(),
            Self::HashLiteral(pairs) => pairs.iter().flat_map(|(key, value)| [*key, *value]).collect(),
            Self::Call {
                receiver, args, block, ..
            } => std::iter::once(*receiver).chain(args.iter().copied()).chain(*block).collect(),
            Self::Super { args, block, .. } => args.iter().copied().chain(*block).collect(),
            Self::Try {
                body,
                rescues,
                else_body,
            } => {
                let mut children = vec![*body];
                for rescue in rescues {
                    match rescue {
                        RescueClause::Classes { classes, body } => {
                            children.extend(classes);
                            children.push(*body);
                        }
                        RescueClause::Splat { splat, body } => children.extend([*splat, *body]),
                        RescueClause::Any { body } => children.push(*body),
                    }
                }
                children.push(*else_body);
                children
            }
        }
    }
}

/// Visitor over an executable graph
///
/// The default implementation walks every node depth-first, parents
/// before children.
pub trait ExecVisitor {
    /// Visit one node; call [`ExecVisitor::walk_children`] to recurse
    fn visit_node(&mut self, graph: &ExecGraph, id: ExecId, _node: &ExecNode) {
        self.walk_children(graph, id);
    }

    /// Visit each child of `id`
    fn walk_children(&mut self, graph: &ExecGraph, id: ExecId) {
        for child in graph[id].kind.children() {
            self.visit(graph, child);
        }
    }

    /// Visit the node `id`
    fn visit(&mut self, graph: &ExecGraph, id: ExecId) {
        let node = &graph[id];
        self.visit_node(graph, id, node);
    }
}

/// Every node reachable from `root`, parents first
pub fn descendants(graph: &ExecGraph, root: ExecId) -> Vec<ExecId> {
    struct Collect(Vec<ExecId>);

    impl ExecVisitor for Collect {
        fn visit_node(&mut self, graph: &ExecGraph, id: ExecId, _node: &ExecNode) {
            self.0.push(id);
            self.walk_children(graph, id);
        }
    }

    let mut collect = Collect(Vec::new());
    collect.visit(graph, root);
    collect.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt_span::Position;

    #[test]
    fn test_descendants_in_preorder() {
        let mut graph = ExecGraph::default();
        let pos = Position::default();
        let cond = graph.alloc(ExecKind::Boolean(true), pos);
        let then_body = graph.alloc(ExecKind::Fixnum(1), pos);
        let else_body = graph.alloc(ExecKind::Nil, pos);
        let root = graph.alloc(
            ExecKind::If {
                cond,
                then_body,
                else_body,
            },
            pos,
        );
        assert_eq!(descendants(&graph, root), vec![root, cond, then_body, else_body]);
    }

    #[test]
    fn test_counting_visitor() {
        struct CountFixnums(usize);

        impl ExecVisitor for CountFixnums {
            fn visit_node(&mut self, graph: &ExecGraph, id: ExecId, node: &ExecNode) {
                if matches!(node.kind, ExecKind::Fixnum(_)) {
                    self.0 += 1;
                }
                self.walk_children(graph, id);
            }
        }

        let mut graph = ExecGraph::default();
        let pos = Position::default();
        let one = graph.alloc(ExecKind::Fixnum(1), pos);
        let two = graph.alloc(ExecKind::Fixnum(2), pos);
        let array = graph.alloc(ExecKind::ArrayLiteral(vec![one, two]), pos);
        let root = graph.alloc(ExecKind::Sequence(vec![array, one]), pos);

        let mut count = CountFixnums(0);
        count.visit(&graph, root);
        assert_eq!(count.0, 3);
    }
}
