//! Multiple, operator and element assignment
//!
//! Every form evaluates each receiver, index and right-hand side exactly
//! once by parking it in a temporary before the expansion reads it again.

use crate::Translator;
use crate::error::TResult;
use crate::lower::calls::CallArgs;
use gt_diagnostics::DiagnosticId;
use gt_exec::{ExecId, ExecKind, LocalSlot, SplatNil};
use gt_span::Position;
use gt_syntax::{MultipleAsgn, Node, NodeKind};

fn has_splat(items: &[Node]) -> bool {
    items.iter().any(|item| matches!(item.kind, NodeKind::Splat(_)))
}

fn is_array_form(node: &Node) -> bool {
    matches!(
        node.kind,
        NodeKind::Array(_) | NodeKind::ZArray | NodeKind::Splat(_) | NodeKind::ArgsCat { .. } | NodeKind::ArgsPush { .. }
    )
}

impl Translator<'_> {
    pub(crate) fn lower_multiple_assignment(&mut self, masgn: &MultipleAsgn, pos: Position) -> TResult<ExecId> {
        let Some(value) = masgn.value.as_deref() else {
            self.warn(
                DiagnosticId::UnknownMultipleAssignment,
                pos,
                "no RHS for multiple assignment - using nil",
            );
            let nil = self.nil(pos);
            return self.destructure(masgn, nil, pos);
        };

        if masgn.rest.is_none() && masgn.post.is_empty() {
            if let NodeKind::Array(items) = &value.kind {
                if items.len() == masgn.pre.len() && !has_splat(items) {
                    return self.lower_parallel_assignment(&masgn.pre, items, pos);
                }
            }
        }

        if masgn.pre.is_empty() && masgn.post.is_empty() {
            if let Some(rest) = masgn.rest.as_deref() {
                let array = if is_array_form(value) {
                    self.lower_array_value(value)?
                } else {
                    let value = self.lower(value)?;
                    self.splat_cast(value, SplatNil::ArrayWithNil, pos)
                };
                return match rest.kind {
                    NodeKind::Star => Ok(array),
                    _ => self.assign_to(rest, array),
                };
            }
            self.warn(
                DiagnosticId::UnknownMultipleAssignment,
                pos,
                "unknown form of multiple assignment",
            );
            return Ok(self.nil(pos));
        }

        let rhs = if is_array_form(value) {
            self.lower_array_value(value)?
        } else {
            self.lower(value)?
        };
        self.destructure(masgn, rhs, pos)
    }

    /// `a, b = x, y`: every value into a temp first, then every target
    fn lower_parallel_assignment(&mut self, targets: &[Node], values: &[Node], pos: Position) -> TResult<ExecId> {
        let mut statements = Vec::with_capacity(targets.len() * 2 + 1);
        let mut temps = Vec::with_capacity(values.len());
        for value in values {
            let value = self.lower(value)?;
            let temp = self.new_temp("multi");
            statements.push(self.write_local(temp, value, pos));
            temps.push(temp);
        }
        for (target, temp) in targets.iter().zip(&temps) {
            let value = self.read_local(*temp, pos);
            statements.push(self.assign_to(target, value)?);
        }
        let reads = temps.iter().map(|temp| self.read_local(*temp, pos)).collect();
        statements.push(self.alloc(ExecKind::ArrayLiteral(reads), pos));
        Ok(self.sequence(statements, pos))
    }

    /// Spread an already lowered value over the targets of `masgn`
    pub(crate) fn destructure(&mut self, masgn: &MultipleAsgn, rhs: ExecId, pos: Position) -> TResult<ExecId> {
        let nil = if self.translating_next_expression {
            SplatNil::EmptyArray
        } else {
            SplatNil::ArrayWithNil
        };
        let array = self.splat_cast(rhs, nil, pos);
        let temp = self.new_temp("array");
        let mut statements = vec![self.write_local(temp, array, pos)];

        let pre = masgn.pre.len();
        let post = masgn.post.len();
        for (index, target) in masgn.pre.iter().enumerate() {
            let value = self.array_index(temp, index as i64, pos);
            statements.push(self.assign_to(target, value)?);
        }
        if let Some(rest) = masgn.rest.as_deref() {
            if !matches!(rest.kind, NodeKind::Star) {
                let array = self.read_local(temp, pos);
                let value = self.alloc(
                    ExecKind::ArraySlice {
                        array,
                        from: pre,
                        from_end: post,
                    },
                    pos,
                );
                statements.push(self.assign_to(rest, value)?);
            }
        }
        for (index, target) in masgn.post.iter().enumerate() {
            let array = self.read_local(temp, pos);
            let cond = self.alloc(ExecKind::ArraySizeAtLeast { array, size: pre + post }, pos);
            let then_body = self.array_index(temp, -((post - index) as i64), pos);
            let else_body = self.array_index(temp, (pre + index) as i64, pos);
            let value = self.alloc(
                ExecKind::If {
                    cond,
                    then_body,
                    else_body,
                },
                pos,
            );
            statements.push(self.assign_to(target, value)?);
        }
        statements.push(self.read_local(temp, pos));
        Ok(self.sequence(statements, pos))
    }

    pub(crate) fn array_index(&mut self, array: LocalSlot, index: i64, pos: Position) -> ExecId {
        let array = self.read_local(array, pos);
        self.alloc(ExecKind::ArrayIndex { array, index }, pos)
    }

    /// Assign `value` to an assignment target that carries no value itself
    pub(crate) fn assign_to(&mut self, target: &Node, value: ExecId) -> TResult<ExecId> {
        let pos = target.pos;
        match &target.kind {
            NodeKind::LocalAsgn { name, .. } | NodeKind::DAsgn { name, .. } => self.lower_local_write(name, value, pos),
            NodeKind::InstAsgn { name, .. } => Ok(self.write_instance(name, value, pos)),
            NodeKind::ClassVarAsgn { name, .. } => Ok(self.write_class_variable(name, value, pos)),
            NodeKind::GlobalAsgn { name, .. } => Ok(self.write_global(name, value, pos)),
            NodeKind::ConstDecl { name, scope, .. } => self.write_constant(name, scope.as_deref(), value, pos),
            NodeKind::AttrAssign { receiver, name, args } => {
                let ignore_visibility = matches!(receiver.kind, NodeKind::SelfRef);
                let receiver = self.lower(receiver)?;
                let args = match args.as_deref() {
                    None => CallArgs {
                        args: vec![value],
                        splatted: false,
                    },
                    Some(Node {
                        kind: NodeKind::Array(items),
                        ..
                    }) if !has_splat(items) => {
                        let mut args = items.iter().map(|item| self.lower(item)).collect::<TResult<Vec<_>>>()?;
                        args.push(value);
                        CallArgs { args, splatted: false }
                    }
                    Some(args) => {
                        let array = self.lower_array_value(args)?;
                        let pushed = self.alloc(ExecKind::ArrayPush { array, value }, pos);
                        CallArgs {
                            args: vec![pushed],
                            splatted: true,
                        }
                    }
                };
                Ok(self.build_call(receiver, name, args, None, ignore_visibility, pos))
            }
            NodeKind::MultipleAsgn(inner) => self.destructure(inner, value, pos),
            NodeKind::Splat(inner) => {
                let array = self.splat_cast(value, SplatNil::EmptyArray, pos);
                self.assign_to(inner, array)
            }
            NodeKind::Star => Ok(value),
            _ => {
                let dummy = self.new_temp("dummy");
                Ok(self.write_local(dummy, value, pos))
            }
        }
    }

    /// `recv.attr op= value`
    pub(crate) fn lower_op_assignment(
        &mut self,
        receiver: &Node,
        attribute: &str,
        operator: &str,
        value: &Node,
        pos: Position,
    ) -> TResult<ExecId> {
        let receiver = self.lower(receiver)?;
        let temp = self.new_temp("opassign");
        let write = self.write_local(temp, receiver, pos);
        let setter = format!("{attribute}=");

        let object = self.read_local(temp, pos);
        let current = self.call(object, attribute, Vec::new(), pos);
        let value = self.lower(value)?;
        let object = self.read_local(temp, pos);
        let update = match operator {
            "||" | "&&" => {
                let assign = self.call(object, &setter, vec![value], pos);
                if operator == "||" {
                    self.alloc(ExecKind::Or(current, assign), pos)
                } else {
                    self.alloc(ExecKind::And(current, assign), pos)
                }
            }
            _ => {
                let combined = self.call(current, operator, vec![value], pos);
                self.call(object, &setter, vec![combined], pos)
            }
        };
        Ok(self.alloc(ExecKind::Sequence(vec![write, update]), pos))
    }

    /// `recv[index] op= value`
    pub(crate) fn lower_op_element_assignment(
        &mut self,
        receiver: &Node,
        args: Option<&Node>,
        operator: &str,
        value: &Node,
        pos: Position,
    ) -> TResult<ExecId> {
        let receiver = self.lower(receiver)?;
        let object = self.new_temp("opelementassign");
        let mut statements = vec![self.write_local(object, receiver, pos)];

        enum Indices {
            Positional(Vec<LocalSlot>),
            Splatted(LocalSlot),
        }
        let indices = match args {
            None => Indices::Positional(Vec::new()),
            Some(Node {
                kind: NodeKind::Array(items),
                ..
            }) if !has_splat(items) => {
                let mut temps = Vec::with_capacity(items.len());
                for item in items {
                    let index = self.lower(item)?;
                    let temp = self.new_temp("index");
                    statements.push(self.write_local(temp, index, pos));
                    temps.push(temp);
                }
                Indices::Positional(temps)
            }
            Some(args) => {
                let array = self.lower_array_value(args)?;
                let temp = self.new_temp("index");
                statements.push(self.write_local(temp, array, pos));
                Indices::Splatted(temp)
            }
        };

        let read_args = match &indices {
            Indices::Positional(temps) => CallArgs {
                args: temps.iter().map(|temp| self.read_local(*temp, pos)).collect(),
                splatted: false,
            },
            Indices::Splatted(temp) => CallArgs {
                args: vec![self.read_local(*temp, pos)],
                splatted: true,
            },
        };
        let target = self.read_local(object, pos);
        let current = self.build_call(target, "[]", read_args, None, false, pos);
        let value = self.lower(value)?;
        let new_value = match operator {
            "||" | "&&" => value,
            _ => self.call(current, operator, vec![value], pos),
        };

        let write_args = match &indices {
            Indices::Positional(temps) => {
                let mut args: Vec<ExecId> = temps.iter().map(|temp| self.read_local(*temp, pos)).collect();
                args.push(new_value);
                CallArgs { args, splatted: false }
            }
            Indices::Splatted(temp) => {
                let array = self.read_local(*temp, pos);
                let pushed = self.alloc(
                    ExecKind::ArrayPush {
                        array,
                        value: new_value,
                    },
                    pos,
                );
                CallArgs {
                    args: vec![pushed],
                    splatted: true,
                }
            }
        };
        let target = self.read_local(object, pos);
        let assign = self.build_call(target, "[]=", write_args, None, false, pos);
        let update = match operator {
            "||" => self.alloc(ExecKind::Or(current, assign), pos),
            "&&" => self.alloc(ExecKind::And(current, assign), pos),
            _ => assign,
        };
        statements.push(update);
        Ok(self.alloc(ExecKind::Sequence(statements), pos))
    }
}
