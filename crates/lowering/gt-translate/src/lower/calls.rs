use crate::Translator;
use crate::error::TResult;
use crate::specialize::{Callable, Specializer};
use gt_exec::{ExecId, ExecKind};
use gt_span::Position;
use gt_syntax::{IterNode, Node, NodeKind};

/// Iterators whose blocks are too common to be worth a debug line
static DEBUG_IGNORED_CALLS: &[&str] = &["downto", "each", "times", "upto"];

/// Lowered call arguments
pub(crate) struct CallArgs {
    pub args: Vec<ExecId>,
    /// `args` is one array to spread
    pub splatted: bool,
}

impl Translator<'_> {
    pub(crate) fn lower_call(
        &mut self,
        receiver: ExecId,
        name: &str,
        args: Option<&Node>,
        iter: Option<&Node>,
        ignore_visibility: bool,
        pos: Position,
    ) -> TResult<ExecId> {
        let args = self.lower_call_args(args)?;
        let block = self.lower_block_argument(iter, Some(name))?;
        Ok(self.build_call(receiver, name, args, block, ignore_visibility, pos))
    }

    pub(crate) fn build_call(
        &mut self,
        receiver: ExecId,
        name: &str,
        args: CallArgs,
        block: Option<ExecId>,
        ignore_visibility: bool,
        pos: Position,
    ) -> ExecId {
        let name = self.sym(name);
        self.alloc(
            ExecKind::Call {
                receiver,
                name,
                args: args.args,
                block,
                splatted: args.splatted,
                ignore_visibility,
            },
            pos,
        )
    }

    /// Plain argument lists stay positional; anything with a splat becomes
    /// one array
    pub(crate) fn lower_call_args(&mut self, args: Option<&Node>) -> TResult<CallArgs> {
        let Some(args) = args else {
            return Ok(CallArgs {
                args: Vec::new(),
                splatted: false,
            });
        };
        match &args.kind {
            NodeKind::Array(items) if !items.iter().any(|item| matches!(item.kind, NodeKind::Splat(_))) => {
                let args = items.iter().map(|item| self.lower(item)).collect::<TResult<Vec<_>>>()?;
                Ok(CallArgs { args, splatted: false })
            }
            NodeKind::ZArray => Ok(CallArgs {
                args: Vec::new(),
                splatted: false,
            }),
            _ => Ok(CallArgs {
                args: vec![self.lower_array_value(args)?],
                splatted: true,
            }),
        }
    }

    pub(crate) fn lower_block_argument(&mut self, iter: Option<&Node>, call_name: Option<&str>) -> TResult<Option<ExecId>> {
        let Some(iter) = iter else {
            return Ok(None);
        };
        let block = match &iter.kind {
            NodeKind::BlockPass(value) => {
                let value = self.lower(value)?;
                self.alloc(ExecKind::ProcCast(value), iter.pos)
            }
            NodeKind::Iter(block) => self.lower_block(block, call_name, iter.pos)?,
            _ => self.lower(iter)?,
        };
        Ok(Some(block))
    }

    pub(crate) fn lower_block(&mut self, iter: &IterNode, call_name: Option<&str>, pos: Position) -> TResult<ExecId> {
        let name = match call_name {
            Some(call) => {
                if !DEBUG_IGNORED_CALLS.contains(&call) {
                    tracing::debug!(call, line = pos.line, "lowering block");
                }
                format!("({call}-block)")
            }
            None => "(block)".to_string(),
        };
        let lowered = self.translate_callable(Callable {
            specializer: Specializer::Block,
            name,
            args: iter.args.as_deref(),
            body: iter.body.as_deref(),
            locals: &iter.locals,
            pos,
            for_target: None,
        })?;
        Ok(self.alloc(
            ExecKind::BlockDefinition {
                method: lowered.method,
                frame: lowered.frame,
                body: lowered.body,
                lambda: false,
            },
            pos,
        ))
    }

    pub(crate) fn lower_lambda(&mut self, iter: &IterNode, pos: Position) -> TResult<ExecId> {
        let lowered = self.translate_callable(Callable {
            specializer: Specializer::Lambda,
            name: "(lambda)".to_string(),
            args: iter.args.as_deref(),
            body: iter.body.as_deref(),
            locals: &iter.locals,
            pos,
            for_target: None,
        })?;
        Ok(self.alloc(
            ExecKind::BlockDefinition {
                method: lowered.method,
                frame: lowered.frame,
                body: lowered.body,
                lambda: true,
            },
            pos,
        ))
    }

    pub(crate) fn lower_super(&mut self, args: Option<&Node>, iter: Option<&Node>, pos: Position) -> TResult<ExecId> {
        let CallArgs { args, splatted } = self.lower_call_args(args)?;
        let block = self.lower_block_argument(iter, None)?;
        Ok(self.alloc(ExecKind::Super { args, block, splatted }, pos))
    }

    pub(crate) fn lower_yield(&mut self, args: Option<&Node>, unsplat: bool, pos: Position) -> TResult<ExecId> {
        let CallArgs { args, splatted } = self.lower_call_args(args)?;
        Ok(self.alloc(
            ExecKind::Yield {
                args,
                unsplat: unsplat || splatted,
            },
            pos,
        ))
    }

    /// Bare regexp in a condition matches against `$_`
    pub(crate) fn lower_match(&mut self, regexp: &Node, pos: Position) -> TResult<ExecId> {
        let regexp = self.lower(regexp)?;
        let line = self.lower_global_read("$_", pos);
        Ok(self.call(regexp, "=~", vec![line], pos))
    }

    /// `/re/ =~ value`, assigning named groups to locals
    pub(crate) fn lower_match2(&mut self, receiver: &Node, value: &Node, pos: Position) -> TResult<ExecId> {
        let regexp = self.lower(receiver)?;
        let value = self.lower(value)?;
        let matched = self.call(regexp, "=~", vec![value], pos);

        let names = match &receiver.kind {
            NodeKind::Regexp { source, .. } => gt_parser::capture_local_names(source),
            _ => Vec::new(),
        };
        if names.is_empty() {
            return Ok(matched);
        }

        let result = self.new_temp("match");
        let mut statements = vec![self.write_local(result, matched, pos)];
        for name in names {
            let group = self.sym(&name);
            let group = self.alloc(ExecKind::Symbol(group), pos);
            let capture = self.match_data_reference("[]", vec![group], pos);
            statements.push(self.lower_local_write(&name, capture, pos)?);
        }
        statements.push(self.read_local(result, pos));
        Ok(self.sequence(statements, pos))
    }

    /// `recv.name = value` / `recv[i] = value`; evaluates to the value
    pub(crate) fn lower_attribute_assignment(
        &mut self,
        receiver: &Node,
        name: &str,
        args: Option<&Node>,
        pos: Position,
    ) -> TResult<ExecId> {
        let ignore_visibility = matches!(receiver.kind, NodeKind::SelfRef);
        let receiver = self.lower(receiver)?;
        match args.map(|args| &args.kind) {
            Some(NodeKind::Array(items))
                if !items.is_empty() && !items.iter().any(|item| matches!(item.kind, NodeKind::Splat(_))) =>
            {
                let Some((value, indices)) = items.split_last() else {
                    return Ok(self.nil(pos));
                };
                let mut lowered = indices.iter().map(|index| self.lower(index)).collect::<TResult<Vec<_>>>()?;
                let value = self.lower(value)?;
                let result = self.new_temp("attrasgn");
                lowered.push(self.write_local(result, value, pos));
                let args = CallArgs {
                    args: lowered,
                    splatted: false,
                };
                let call = self.build_call(receiver, name, args, None, ignore_visibility, pos);
                let read = self.read_local(result, pos);
                Ok(self.sequence(vec![call, read], pos))
            }
            Some(NodeKind::ArgsPush { first, second }) => {
                let array = self.lower_array_value(first)?;
                let value = self.lower(second)?;
                let result = self.new_temp("attrasgn");
                let value = self.write_local(result, value, pos);
                let pushed = self.alloc(ExecKind::ArrayPush { array, value }, pos);
                let args = CallArgs {
                    args: vec![pushed],
                    splatted: true,
                };
                let call = self.build_call(receiver, name, args, None, ignore_visibility, pos);
                let read = self.read_local(result, pos);
                Ok(self.sequence(vec![call, read], pos))
            }
            _ => {
                let args = self.lower_call_args(args)?;
                Ok(self.build_call(receiver, name, args, None, ignore_visibility, pos))
            }
        }
    }
}
