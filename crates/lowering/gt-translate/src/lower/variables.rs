use crate::error::TResult;
use crate::{InternalError, Translator};
use gt_diagnostics::DiagnosticId;
use gt_exec::{ExecId, ExecKind, LocalSlot};
use gt_span::Position;
use gt_syntax::{Node, NodeKind};

/// Globals that live in the frame of the method that set them
const FRAME_LOCAL_GLOBALS: &[&str] = &["$_", "$~", "$+"];

fn is_frame_local_global(name: &str) -> bool {
    FRAME_LOCAL_GLOBALS.contains(&name)
}

impl Translator<'_> {
    pub(crate) fn lower_local_read(&mut self, name: &str, from_block: bool, pos: Position) -> TResult<ExecId> {
        let symbol = self.sym(name);
        if let Some(slot) = self.envs.lookup(&mut self.graph, symbol) {
            return Ok(self.read_local(slot, pos));
        }
        let message = if from_block {
            format!("can't find variable {name}, translating as nil")
        } else {
            format!("local variable {name} found by parser but not by translator")
        };
        self.warn(DiagnosticId::UnresolvedVariable, pos, message);
        Ok(self.nil(pos))
    }

    pub(crate) fn lower_local_write(&mut self, name: &str, value: ExecId, pos: Position) -> TResult<ExecId> {
        let target = self.local_assignment_slot(name, pos)?;
        Ok(self.write_local(target, value, pos))
    }

    /// Slot an assignment to `name` writes, declaring it where needed
    pub(crate) fn local_assignment_slot(&mut self, name: &str, pos: Position) -> TResult<LocalSlot> {
        let symbol = self.sym(name);
        if self.envs.current_env().never_assign_in_parent {
            return Ok(self.declare_here(symbol));
        }
        if let Some(slot) = self.envs.lookup(&mut self.graph, symbol) {
            return Ok(slot);
        }
        let Some((owner, _)) = self.envs.assignment_owner() else {
            return Err(self.internal(pos, InternalError::NoScopeOwner { name: name.to_string() }));
        };
        let frame = self.envs.get(owner).frame;
        self.graph.frame_mut(frame).declare(symbol);
        self.envs
            .lookup(&mut self.graph, symbol)
            .ok_or_else(|| self.internal(pos, InternalError::UnresolvedSlot { name: name.to_string() }))
    }

    pub(crate) fn write_instance(&mut self, name: &str, value: ExecId, pos: Position) -> ExecId {
        let name = self.sym(name);
        self.alloc(ExecKind::WriteInstance { name, value }, pos)
    }

    /// Module holding class variables here
    pub(crate) fn class_variable_module(&mut self, pos: Position) -> ExecId {
        let env = self.envs.current_env();
        let in_class = env.specializer.is_module_body() || env.class_variables_as_if_in_class;
        let receiver = self.alloc(ExecKind::SelfRef, pos);
        if in_class {
            receiver
        } else {
            self.alloc(ExecKind::ClassOf(receiver), pos)
        }
    }

    pub(crate) fn write_class_variable(&mut self, name: &str, value: ExecId, pos: Position) -> ExecId {
        let module = self.class_variable_module(pos);
        let name = self.sym(name);
        self.alloc(ExecKind::WriteClassVar { module, name, value }, pos)
    }

    /// Module that `def`, constants and `alias` apply to
    pub(crate) fn lexical_module(&mut self, pos: Position) -> ExecId {
        let in_module_body = self
            .envs
            .method_owner()
            .is_some_and(|(owner, _)| self.envs.get(owner).specializer.is_module_body());
        let receiver = self.alloc(ExecKind::SelfRef, pos);
        if in_module_body {
            receiver
        } else {
            self.alloc(ExecKind::ClassOf(receiver), pos)
        }
    }

    pub(crate) fn lower_global_read(&mut self, name: &str, pos: Position) -> ExecId {
        if is_frame_local_global(name) {
            let slot = self.frame_local_global(name);
            return self.read_local(slot, pos);
        }
        let name = self.sym(name);
        self.alloc(ExecKind::ReadGlobal(name), pos)
    }

    pub(crate) fn write_global(&mut self, name: &str, value: ExecId, pos: Position) -> ExecId {
        if is_frame_local_global(name) {
            let value = if name == "$~" {
                self.alloc(ExecKind::CheckMatchData(value), pos)
            } else {
                value
            };
            let slot = self.frame_local_global(name);
            return self.write_local(slot, value, pos);
        }
        let name = self.sym(name);
        self.alloc(ExecKind::WriteGlobal { name, value }, pos)
    }

    fn frame_local_global(&mut self, name: &str) -> LocalSlot {
        let symbol = self.sym(name);
        match self.envs.lookup(&mut self.graph, symbol) {
            Some(slot) => slot,
            None => self.declare_here(symbol),
        }
    }

    /// `$~.method(args)`, or nil when there is no last match
    pub(crate) fn match_data_reference(&mut self, method: &str, args: Vec<ExecId>, pos: Position) -> ExecId {
        let match_data = self.lower_global_read("$~", pos);
        let cond = self.boolean_cast(match_data, pos);
        let match_data = self.lower_global_read("$~", pos);
        let then_body = self.call(match_data, method, args, pos);
        let else_body = self.nil(pos);
        self.alloc(
            ExecKind::If {
                cond,
                then_body,
                else_body,
            },
            pos,
        )
    }

    pub(crate) fn lower_back_reference(&mut self, kind: char, pos: Position) -> ExecId {
        match kind {
            '`' => self.match_data_reference("pre_match", Vec::new(), pos),
            '\'' => self.match_data_reference("post_match", Vec::new(), pos),
            '+' => {
                let last = self.alloc(ExecKind::Fixnum(-1), pos);
                self.match_data_reference("[]", vec![last], pos)
            }
            _ => {
                let whole = self.alloc(ExecKind::Fixnum(0), pos);
                self.match_data_reference("[]", vec![whole], pos)
            }
        }
    }

    pub(crate) fn write_constant(
        &mut self,
        name: &str,
        scope: Option<&Node>,
        value: ExecId,
        pos: Position,
    ) -> TResult<ExecId> {
        let module = match scope.map(|scope| &scope.kind) {
            Some(NodeKind::Colon2 { left: Some(left), .. }) => self.lower(left)?,
            Some(NodeKind::Colon3(_)) => self.alloc(ExecKind::ObjectClass, pos),
            _ => self.lexical_module(pos),
        };
        let name = self.sym(name);
        Ok(self.alloc(ExecKind::WriteConstant { module, name, value }, pos))
    }

    /// Flip-flop with its state in the enclosing method's frame
    pub(crate) fn lower_flip_flop(&mut self, begin: &Node, end: &Node, exclusive: bool, pos: Position) -> TResult<ExecId> {
        let begin = self.lower(begin)?;
        let begin = self.boolean_cast(begin, pos);
        let end = self.lower(end)?;
        let end = self.boolean_cast(end, pos);

        let name = self.temp_name("flipflop");
        let Some((owner, _)) = self.envs.method_owner() else {
            return Err(self.internal(pos, InternalError::NoScopeOwner { name }));
        };
        let symbol = self.sym(&name);
        let frame = self.envs.get(owner).frame;
        let slot = self.graph.frame_mut(frame).declare(symbol);
        self.envs.get_mut(owner).flip_flops.push(LocalSlot {
            depth: 0,
            slot,
            name: symbol,
        });
        let state = self
            .envs
            .lookup(&mut self.graph, symbol)
            .ok_or_else(|| self.internal(pos, InternalError::UnresolvedSlot { name }))?;
        Ok(self.alloc(
            ExecKind::FlipFlop {
                begin,
                end,
                exclusive,
                state,
            },
            pos,
        ))
    }
}
