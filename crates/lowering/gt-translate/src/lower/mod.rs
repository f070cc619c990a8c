//! Per-node lowering rules

mod args;
mod assign;
mod calls;
mod control;
mod defined;
mod definitions;
mod literals;
mod variables;

use crate::Translator;
use crate::error::TResult;
use gt_diagnostics::DiagnosticId;
use gt_exec::{ExecId, ExecKind};
use gt_span::Position;
use gt_syntax::{Node, NodeKind};

impl Translator<'_> {
    /// Lower one node
    pub(crate) fn lower(&mut self, node: &Node) -> TResult<ExecId> {
        let pos = node.pos;
        match &node.kind {
            NodeKind::Nil => Ok(self.nil(pos)),
            NodeKind::True => Ok(self.alloc(ExecKind::Boolean(true), pos)),
            NodeKind::False => Ok(self.alloc(ExecKind::Boolean(false), pos)),
            NodeKind::SelfRef => Ok(self.alloc(ExecKind::SelfRef, pos)),
            NodeKind::Fixnum(value) => Ok(self.alloc(ExecKind::Fixnum(*value), pos)),
            NodeKind::Bignum(digits) => Ok(self.alloc(ExecKind::Bignum(digits.clone()), pos)),
            NodeKind::Float(value) => Ok(self.alloc(ExecKind::Float(*value), pos)),
            NodeKind::Str(bytes) => Ok(self.alloc(ExecKind::Str(bytes.clone()), pos)),
            NodeKind::XStr(bytes) => {
                let command = self.alloc(ExecKind::Str(bytes.clone()), pos);
                Ok(self.alloc(ExecKind::System(command), pos))
            }
            NodeKind::DStr(parts) => self.lower_interpolation(parts, pos),
            NodeKind::DXStr(parts) => {
                let command = self.lower_interpolation(parts, pos)?;
                Ok(self.alloc(ExecKind::System(command), pos))
            }
            NodeKind::DSymbol(parts) => {
                let string = self.lower_interpolation(parts, pos)?;
                Ok(self.alloc(ExecKind::StringToSymbol(string), pos))
            }
            NodeKind::EvStr(inner) => match inner {
                Some(inner) => self.lower(inner),
                None => Ok(self.alloc(ExecKind::Str(Vec::new()), pos)),
            },
            NodeKind::Symbol(name) => {
                let name = self.sym(name);
                Ok(self.alloc(ExecKind::Symbol(name), pos))
            }
            NodeKind::Regexp { source, options } => Ok(self.alloc(
                ExecKind::Regexp {
                    source: source.clone(),
                    options: *options,
                },
                pos,
            )),
            NodeKind::DRegexp { parts, options } => {
                let string = self.lower_interpolation(parts, pos)?;
                Ok(self.alloc(
                    ExecKind::StringToRegexp {
                        string,
                        options: *options,
                    },
                    pos,
                ))
            }
            NodeKind::Array(_) | NodeKind::Splat(_) | NodeKind::ArgsCat { .. } | NodeKind::ArgsPush { .. } => {
                self.lower_array_value(node)
            }
            NodeKind::ZArray => Ok(self.alloc(ExecKind::ArrayLiteral(Vec::new()), pos)),
            NodeKind::Hash(pairs) => self.lower_hash(pairs, pos),
            NodeKind::Dot { begin, end, exclusive } => self.lower_range(begin, end, *exclusive, pos),
            NodeKind::Flip { begin, end, exclusive } => self.lower_flip_flop(begin, end, *exclusive, pos),
            NodeKind::Encoding(name) => Ok(self.alloc(ExecKind::Encoding(name.clone()), pos)),
            NodeKind::SValue(value) => self.lower(value),

            NodeKind::LocalVar(name) | NodeKind::DVar(name) => {
                let from_block = matches!(node.kind, NodeKind::DVar(_));
                self.lower_local_read(name, from_block, pos)
            }
            NodeKind::LocalAsgn { name, value } | NodeKind::DAsgn { name, value } => {
                let value = self.lower_opt(value.as_deref(), pos)?;
                self.lower_local_write(name, value, pos)
            }
            NodeKind::InstVar(name) => {
                let name = self.sym(name);
                Ok(self.alloc(ExecKind::ReadInstance(name), pos))
            }
            NodeKind::InstAsgn { name, value } => {
                let value = self.lower_opt(value.as_deref(), pos)?;
                Ok(self.write_instance(name, value, pos))
            }
            NodeKind::ClassVar(name) => {
                let module = self.class_variable_module(pos);
                let name = self.sym(name);
                Ok(self.alloc(ExecKind::ReadClassVar { module, name }, pos))
            }
            NodeKind::ClassVarAsgn { name, value } => {
                let value = self.lower_opt(value.as_deref(), pos)?;
                Ok(self.write_class_variable(name, value, pos))
            }
            NodeKind::GlobalVar(name) => Ok(self.lower_global_read(name, pos)),
            NodeKind::GlobalAsgn { name, value } => {
                let value = self.lower_opt(value.as_deref(), pos)?;
                Ok(self.write_global(name, value, pos))
            }
            NodeKind::NthRef(index) => {
                let index = self.alloc(ExecKind::Fixnum(i64::from(*index)), pos);
                Ok(self.match_data_reference("[]", vec![index], pos))
            }
            NodeKind::BackRef(kind) => Ok(self.lower_back_reference(*kind, pos)),
            NodeKind::Const(name) => {
                let module = self.lexical_module(pos);
                let name = self.sym(name);
                Ok(self.alloc(ExecKind::ReadConstant { module, name }, pos))
            }
            NodeKind::ConstDecl { name, scope, value } => {
                let value = self.lower_opt(value.as_deref(), pos)?;
                self.write_constant(name, scope.as_deref(), value, pos)
            }
            NodeKind::Colon2 { left, name } => {
                let module = match left {
                    Some(left) => self.lower(left)?,
                    None => self.lexical_module(pos),
                };
                let name = self.sym(name);
                Ok(self.alloc(ExecKind::ReadConstant { module, name }, pos))
            }
            NodeKind::Colon3(name) => {
                let module = self.alloc(ExecKind::MainObject, pos);
                let name = self.sym(name);
                Ok(self.alloc(ExecKind::ReadConstant { module, name }, pos))
            }

            NodeKind::MultipleAsgn(masgn) => self.lower_multiple_assignment(masgn, pos),
            NodeKind::OpAsgn {
                receiver,
                attribute,
                operator,
                value,
            } => self.lower_op_assignment(receiver, attribute, operator, value, pos),
            NodeKind::OpAsgnOr { first, second } => {
                let first = self.lower(first)?;
                let second = self.lower(second)?;
                Ok(self.alloc(ExecKind::Or(first, second), pos))
            }
            NodeKind::OpAsgnAnd { first, second } => {
                let first = self.lower(first)?;
                let second = self.lower(second)?;
                Ok(self.alloc(ExecKind::And(first, second), pos))
            }
            NodeKind::OpElementAsgn {
                receiver,
                args,
                operator,
                value,
            } => self.lower_op_element_assignment(receiver, args.as_deref(), operator, value, pos),
            NodeKind::AttrAssign { receiver, name, args } => {
                self.lower_attribute_assignment(receiver, name, args.as_deref(), pos)
            }

            NodeKind::Call {
                receiver,
                name,
                args,
                iter,
            } => {
                let receiver = self.lower(receiver)?;
                self.lower_call(receiver, name, args.as_deref(), iter.as_deref(), false, pos)
            }
            NodeKind::FCall { name, args, iter } => {
                let receiver = self.alloc(ExecKind::SelfRef, pos);
                self.lower_call(receiver, name, args.as_deref(), iter.as_deref(), true, pos)
            }
            NodeKind::VCall(name) => {
                let receiver = self.alloc(ExecKind::SelfRef, pos);
                self.lower_call(receiver, name, None, None, true, pos)
            }
            NodeKind::Super { args, iter } => self.lower_super(args.as_deref(), iter.as_deref(), pos),
            NodeKind::ZSuper { iter } => {
                let block = self.lower_block_argument(iter.as_deref(), None)?;
                Ok(self.alloc(ExecKind::ZSuper { block }, pos))
            }
            NodeKind::Yield { args, unsplat } => self.lower_yield(args.as_deref(), *unsplat, pos),
            NodeKind::Iter(iter) => self.lower_block(iter, None, pos),
            NodeKind::Lambda(iter) => self.lower_lambda(iter, pos),
            NodeKind::Match(regexp) => self.lower_match(regexp, pos),
            NodeKind::Match2 { receiver, value } => self.lower_match2(receiver, value, pos),
            NodeKind::Match3 { receiver, value } => {
                let value = self.lower(value)?;
                let regexp = self.lower(receiver)?;
                Ok(self.call(value, "=~", vec![regexp], pos))
            }
            NodeKind::Defined(expression) => self.lower_defined(expression, pos),

            NodeKind::Defn {
                name,
                args,
                body,
                locals,
            } => self.lower_method_definition(None, name, args, body.as_deref(), locals, pos),
            NodeKind::Defs {
                receiver,
                name,
                args,
                body,
                locals,
            } => self.lower_method_definition(Some(receiver), name, args, body.as_deref(), locals, pos),
            NodeKind::Class {
                cpath,
                superclass,
                body,
                locals,
            } => self.lower_class(cpath, superclass.as_deref(), body.as_deref(), locals, pos),
            NodeKind::Module { cpath, body, locals } => self.lower_module(cpath, body.as_deref(), locals, pos),
            NodeKind::SClass { receiver, body, locals } => {
                self.lower_singleton_class(receiver, body.as_deref(), locals, pos)
            }
            NodeKind::Alias { new_name, old_name } => {
                let module = self.lexical_module(pos);
                let new_name = self.sym(new_name);
                let old_name = self.sym(old_name);
                Ok(self.alloc(
                    ExecKind::Alias {
                        module,
                        new_name,
                        old_name,
                    },
                    pos,
                ))
            }
            NodeKind::VAlias { new_name, old_name } => {
                let new_name = self.sym(new_name);
                let old_name = self.sym(old_name);
                Ok(self.alloc(ExecKind::AliasGlobal { new_name, old_name }, pos))
            }
            NodeKind::Undef(name) => {
                let module = self.lexical_module(pos);
                let name = self.sym(name);
                Ok(self.alloc(ExecKind::Undef { module, name }, pos))
            }

            NodeKind::If {
                cond,
                then_body,
                else_body,
            } => self.lower_if(cond, then_body.as_deref(), else_body.as_deref(), pos),
            NodeKind::And(left, right) => {
                let left = self.lower(left)?;
                let right = self.lower(right)?;
                Ok(self.alloc(ExecKind::And(left, right), pos))
            }
            NodeKind::Or(left, right) => {
                let left = self.lower(left)?;
                let right = self.lower(right)?;
                Ok(self.alloc(ExecKind::Or(left, right), pos))
            }
            NodeKind::While {
                cond,
                body,
                evaluate_at_start,
            } => self.lower_while(cond, body.as_deref(), *evaluate_at_start, false, pos),
            NodeKind::Until {
                cond,
                body,
                evaluate_at_start,
            } => self.lower_while(cond, body.as_deref(), *evaluate_at_start, true, pos),
            NodeKind::For { var, iter, body } => self.lower_for(var, iter, body.as_deref(), pos),
            NodeKind::Case {
                subject,
                whens,
                else_body,
            } => self.lower_case(subject.as_deref(), whens, else_body.as_deref(), pos),
            NodeKind::Begin(body) | NodeKind::PreExe(body) => self.lower_opt(body.as_deref(), pos),
            NodeKind::Block(statements) => {
                let statements = statements
                    .iter()
                    .map(|statement| self.lower(statement))
                    .collect::<TResult<Vec<_>>>()?;
                Ok(self.sequence(statements, pos))
            }
            NodeKind::Rescue {
                body,
                rescues,
                else_body,
            } => self.lower_rescue(body.as_deref(), rescues, else_body.as_deref(), pos),
            NodeKind::Ensure { body, ensure } => {
                let body = self.lower_opt(body.as_deref(), pos)?;
                let ensure = self.lower_opt(ensure.as_deref(), pos)?;
                Ok(self.alloc(ExecKind::Ensure { body, ensure }, pos))
            }
            NodeKind::Break(value) => {
                let value = self.lower_opt(value.as_deref(), pos)?;
                Ok(self.alloc(ExecKind::Break(value), pos))
            }
            NodeKind::Next(value) => {
                let saved = std::mem::replace(&mut self.translating_next_expression, true);
                let value = self.lower_opt(value.as_deref(), pos);
                self.translating_next_expression = saved;
                let value = value?;
                Ok(self.alloc(ExecKind::Next(value), pos))
            }
            NodeKind::Redo => Ok(self.alloc(ExecKind::Redo, pos)),
            NodeKind::Retry => Ok(self.alloc(ExecKind::Retry, pos)),
            NodeKind::Return(value) => {
                let value = self.lower_opt(value.as_deref(), pos)?;
                let return_id = self.envs.current_env().return_id;
                Ok(self.alloc(ExecKind::Return { return_id, value }, pos))
            }

            NodeKind::Star | NodeKind::BlockPass(_) | NodeKind::PostExe(_) => Ok(self.does_nothing(node)),
        }
    }

    /// Lower an optional node; absent is `nil`
    pub(crate) fn lower_opt(&mut self, node: Option<&Node>, pos: Position) -> TResult<ExecId> {
        match node {
            Some(node) => self.lower(node),
            None => Ok(self.nil(pos)),
        }
    }

    fn does_nothing(&mut self, node: &Node) -> ExecId {
        self.warn(
            DiagnosticId::UnsupportedNode,
            node.pos,
            format!("{} does nothing - translating as nil", node.kind_name()),
        );
        self.nil(node.pos)
    }
}
