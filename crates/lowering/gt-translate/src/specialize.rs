//! Per-callable behaviour of the translator
//!
//! Methods, blocks, lambdas and module bodies are lowered by the same code;
//! a [`Specializer`] answers the handful of questions where they differ.

use crate::env::Environment;
use crate::error::TResult;
use crate::Translator;
use gt_exec::{Arity, ExecId, ExecKind, FrameDescriptor, FrameId, FrameKind, MethodId, MissingArgumentBehavior, SharedMethodInfo};
use gt_span::Position;
use gt_syntax::{ArgsNode, Node, Param};

/// Kind of callable being lowered
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum Specializer {
    /// Script top level
    TopLevel,
    /// `def`
    Method,
    /// Block attached to a call, or a `for` body
    Block,
    /// `->` literal
    Lambda,
    /// Class, module or singleton class body
    Module,
}

impl Specializer {
    /// Frame kind recorded in the descriptor
    pub fn frame_kind(self) -> FrameKind {
        match self {
            Self::TopLevel => FrameKind::TopLevel,
            Self::Method => FrameKind::Method,
            Self::Block | Self::Lambda => FrameKind::Block,
            Self::Module => FrameKind::Module,
        }
    }

    /// `return` leaves the enclosing method rather than this callable
    pub fn shares_return_id(self) -> bool {
        self == Self::Block
    }

    /// Body is wrapped in a redo catcher
    pub fn catches_redo(self) -> bool {
        self == Self::Block
    }

    /// What reading a missing positional argument does
    pub fn missing_argument(self) -> MissingArgumentBehavior {
        match self {
            Self::Block => MissingArgumentBehavior::Nil,
            _ => MissingArgumentBehavior::RuntimeError,
        }
    }

    /// Sees the locals of its lexical parent
    pub fn is_closure(self) -> bool {
        matches!(self, Self::Block | Self::Lambda)
    }

    /// `self` is the module being defined
    pub fn is_module_body(self) -> bool {
        self == Self::Module
    }

    /// A single array argument may be spread over the parameters
    pub fn destructures_single_argument(self) -> bool {
        self == Self::Block
    }
}

/// Everything needed to lower one callable
pub(crate) struct Callable<'a> {
    pub specializer: Specializer,
    pub name: String,
    pub args: Option<&'a ArgsNode>,
    pub body: Option<&'a Node>,
    pub locals: &'a [String],
    pub pos: Position,
    /// `for` loop variable assigned from the first parameter
    pub for_target: Option<&'a Node>,
}

/// A lowered callable
pub(crate) struct LoweredCallable {
    pub method: MethodId,
    pub frame: FrameId,
    pub body: ExecId,
}

pub(crate) fn arity_of(args: Option<&ArgsNode>) -> Arity {
    args.map_or(Arity::NONE, |args| Arity {
        required: args.required_count(),
        optional: args.optional.len(),
        rest: args.has_rest(),
    })
}

impl Translator<'_> {
    /// Lower a method, block, lambda or module body in a new environment
    pub(crate) fn translate_callable(&mut self, callable: Callable<'_>) -> TResult<LoweredCallable> {
        let Callable {
            specializer,
            name,
            args,
            body,
            locals,
            pos,
            for_target,
        } = callable;
        let parent = self.envs.current_env();
        let parent_frame = parent.frame;
        let parent_return_id = parent.return_id;
        let parent_is_module = parent.specializer.is_module_body();

        let closure = specializer.is_closure();
        let mut descriptor = FrameDescriptor::new(specializer.frame_kind(), closure.then_some(parent_frame));
        for local in locals {
            descriptor.declare(self.sym(local));
        }
        let frame = self.graph.add_frame(descriptor);
        let method = self.graph.add_method(SharedMethodInfo {
            name,
            arity: arity_of(args),
            pos,
            is_block: closure,
            lexical_frame: Some(parent_frame),
        });

        let return_id = if specializer.shares_return_id() {
            parent_return_id
        } else {
            self.next_return_id(pos)?
        };
        let for_statement = specializer == Specializer::Block && self.translating_for_statement;
        if for_statement {
            tracing::debug!(line = pos.line, "for loop body assigns into the enclosing frame");
        }
        let env = Environment {
            parent: None,
            frame,
            method,
            specializer,
            return_id,
            own_scope_for_assignments: !for_statement,
            never_assign_in_parent: !closure,
            class_variables_as_if_in_class: for_statement && parent_is_module,
            flip_flops: Vec::new(),
        };
        let env_id = self.envs.push(env);

        let saved_for = std::mem::replace(&mut self.translating_for_statement, false);
        let saved_next = std::mem::replace(&mut self.translating_next_expression, false);
        let lowered = self.lower_callable_body(specializer, args, body, for_target, pos);
        self.translating_for_statement = saved_for;
        self.translating_next_expression = saved_next;
        let body = lowered?;

        self.leave_environment(env_id, pos)?;
        Ok(LoweredCallable { method, frame, body })
    }

    fn lower_callable_body(
        &mut self,
        specializer: Specializer,
        args: Option<&ArgsNode>,
        body: Option<&Node>,
        for_target: Option<&Node>,
        pos: Position,
    ) -> TResult<ExecId> {
        let mut statements = match args {
            Some(args) => self.load_arguments(args, specializer)?,
            None => Vec::new(),
        };
        if let Some(target) = for_target {
            let value = match args.and_then(|args| args.pre.first()) {
                Some(Param::Required(name)) => {
                    let name = self.sym(name);
                    let slot = self.declare_here(name);
                    self.read_local(slot, pos)
                }
                _ => self.nil(pos),
            };
            statements.push(self.assign_to(target, value)?);
        }
        statements.push(self.lower_opt(body, pos)?);
        let body = self.sequence(statements, pos);
        self.wrap_body(body, pos)
    }

    /// Wrap a callable body in its catch nodes, innermost first
    ///
    /// body, flip-flop reset, redo (blocks), return (non-blocks), next,
    /// retry-as-error.
    pub(crate) fn wrap_body(&mut self, body: ExecId, pos: Position) -> TResult<ExecId> {
        let env = self.envs.current_env();
        let specializer = env.specializer;
        let return_id = env.return_id;
        let flip_flops = env.flip_flops.clone();

        let mut body = body;
        if !flip_flops.is_empty() {
            let mut statements: Vec<ExecId> = flip_flops
                .into_iter()
                .map(|slot| self.alloc(ExecKind::InitFlipFlopSlot(slot), pos))
                .collect();
            statements.push(body);
            body = self.alloc(ExecKind::Sequence(statements), pos);
        }
        if specializer.catches_redo() {
            body = self.alloc(ExecKind::CatchRedo(body), pos);
        }
        if !specializer.shares_return_id() {
            body = self.alloc(ExecKind::CatchReturn { return_id, body }, pos);
        }
        body = self.alloc(ExecKind::CatchNext(body), pos);
        Ok(self.alloc(ExecKind::CatchRetryAsError(body), pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_and_method_differ() {
        assert!(Specializer::Block.shares_return_id());
        assert!(!Specializer::Lambda.shares_return_id());
        assert_eq!(Specializer::Block.missing_argument(), MissingArgumentBehavior::Nil);
        assert_eq!(Specializer::Method.missing_argument(), MissingArgumentBehavior::RuntimeError);
        assert!(Specializer::Lambda.is_closure());
        assert!(!Specializer::Module.is_closure());
        assert_eq!(Specializer::Lambda.frame_kind(), FrameKind::Block);
    }

    #[test]
    fn test_arity_from_parameters() {
        let pos = Position::default();
        let mut args = ArgsNode::empty(pos);
        args.pre.push(gt_syntax::Param::Required("a".into()));
        args.post.push(gt_syntax::Param::Required("b".into()));
        args.optional.push(gt_syntax::OptionalParam {
            name: "c".into(),
            default: Node::nil(pos),
        });
        args.rest = Some(None);
        assert_eq!(
            arity_of(Some(&args)),
            Arity {
                required: 2,
                optional: 1,
                rest: true
            }
        );
        assert_eq!(arity_of(None), Arity::NONE);
    }
}
