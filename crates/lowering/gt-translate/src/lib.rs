//! Lowering from syntax trees to executable graphs
//!
//! This crate walks a [`gt_syntax::Node`] tree and produces an
//! [`ExecGraph`]. It handles:
//! - Resolving every local to a `(depth, slot)` pair against a chain of
//!   translation environments, recording closure captures on the way
//! - Building a frame descriptor and shared method info per callable
//! - Wrapping callable bodies in their return, next, redo and retry catchers
//! - Desugaring multiple assignment, operator assignment, `case`, `for` and
//!   flip-flops through temporaries so every operand is evaluated once
//!
//! Unsupported shapes are lowered to `nil` with a warning; only broken
//! bookkeeping is an error.

mod env;
mod error;
mod lower;
mod specialize;

pub use env::{EnvId, Environment, Environments};
pub use error::{InternalError, TranslateError};
pub use specialize::Specializer;

use error::TResult;
use gt_diagnostics::{DiagnosticId, DiagnosticSink};
use gt_exec::{
    Arity, ExecGraph, ExecId, ExecKind, FrameDescriptor, FrameId, LocalSlot, MethodId, ReturnId, SharedMethodInfo,
};
use gt_intern::{Interner, Symbol};
use gt_parser::ParseResult;
use gt_span::Position;

/// A translated unit
#[derive(Debug, Clone)]
pub struct TranslatedRoot {
    /// Every node, frame and callable of the unit
    pub graph: ExecGraph,
    /// Wrapped top-level body
    pub root: ExecId,
    /// Top-level frame
    pub root_frame: FrameId,
    /// Top-level callable info
    pub root_method: MethodId,
}

/// Lowers one parsed unit
pub struct Translator<'sink> {
    /// Diagnostics of the unit
    sink: &'sink mut DiagnosticSink,
    /// Graph under construction
    graph: ExecGraph,
    /// Environment chain
    envs: Environments,
    /// Next return identifier to hand out
    next_return_id: u32,
    /// Counter for temporary names
    next_temp: u32,
    /// Lowering the body of a `for` loop
    translating_for_statement: bool,
    /// Lowering the value of a `next`
    translating_next_expression: bool,
}

impl<'sink> Translator<'sink> {
    /// Create a translator with a fresh top-level environment
    pub fn new(sink: &'sink mut DiagnosticSink, interner: Interner) -> Self {
        let mut graph = ExecGraph::new(interner);
        let specializer = Specializer::TopLevel;
        let frame = graph.add_frame(FrameDescriptor::new(specializer.frame_kind(), None));
        let method = graph.add_method(SharedMethodInfo {
            name: "<main>".to_string(),
            arity: Arity::NONE,
            pos: Position::new(sink.file_id(), 1, Default::default()),
            is_block: false,
            lexical_frame: None,
        });
        let root = Environment {
            parent: None,
            frame,
            method,
            specializer,
            return_id: ReturnId(1),
            own_scope_for_assignments: true,
            never_assign_in_parent: true,
            class_variables_as_if_in_class: false,
            flip_flops: Vec::new(),
        };
        Self {
            sink,
            graph,
            envs: Environments::new(root),
            next_return_id: 2,
            next_temp: 0,
            translating_for_statement: false,
            translating_next_expression: false,
        }
    }

    /// Lower a parsed unit
    ///
    /// # Errors
    ///
    /// Returns a [`TranslateError`] when the environment bookkeeping breaks.
    /// User-level problems are reported to the sink instead.
    pub fn translate_root(mut self, parsed: &ParseResult) -> Result<TranslatedRoot, TranslateError> {
        let root_env = self.envs.current();
        let env = self.envs.get(root_env);
        let (root_frame, root_method) = (env.frame, env.method);
        let pos = parsed.root.pos;
        self.graph.method_mut(root_method).pos = pos;

        let locals: Vec<Symbol> = parsed.locals.iter().map(|name| self.sym(name)).collect();
        for name in locals {
            self.graph.frame_mut(root_frame).declare(name);
        }

        tracing::debug!(file = %self.sink.file(), locals = parsed.locals.len(), "translating unit");
        let body = self.lower(&parsed.root)?;
        let root = self.wrap_body(body, pos)?;
        if self.envs.current() != root_env {
            return Err(self.internal(pos, InternalError::UnbalancedEnvironment));
        }

        Ok(TranslatedRoot {
            graph: self.graph,
            root,
            root_frame,
            root_method,
        })
    }

    fn alloc(&mut self, kind: ExecKind, pos: Position) -> ExecId {
        self.graph.alloc(kind, pos)
    }

    fn nil(&mut self, pos: Position) -> ExecId {
        self.alloc(ExecKind::Nil, pos)
    }

    fn sym(&self, name: &str) -> Symbol {
        self.graph.intern(name)
    }

    fn internal(&self, pos: Position, error: InternalError) -> TranslateError {
        TranslateError {
            file: self.sink.file().to_string(),
            line: pos.line,
            error,
        }
    }

    fn warn(&mut self, id: DiagnosticId, pos: Position, message: impl Into<String>) {
        self.sink.warn(id, pos, message);
    }

    fn next_return_id(&mut self, pos: Position) -> TResult<ReturnId> {
        let id = self.next_return_id;
        self.next_return_id = id
            .checked_add(1)
            .ok_or_else(|| self.internal(pos, InternalError::ReturnIdOverflow))?;
        Ok(ReturnId(id))
    }

    /// Leave `env`, which must be the environment being lowered
    fn leave_environment(&mut self, env: EnvId, pos: Position) -> TResult<()> {
        if self.envs.current() != env || self.envs.pop().is_none() {
            return Err(self.internal(pos, InternalError::UnbalancedEnvironment));
        }
        Ok(())
    }

    /// Name for a new temporary, unique within this translator
    fn temp_name(&mut self, prefix: &str) -> String {
        self.next_temp += 1;
        format!("%{prefix}_{}", self.next_temp)
    }

    /// Declare a temporary in the current frame
    fn new_temp(&mut self, prefix: &str) -> LocalSlot {
        let name = self.temp_name(prefix);
        let name = self.sym(&name);
        self.declare_here(name)
    }

    /// Slot of `name` in the current frame, declaring it if needed
    fn declare_here(&mut self, name: Symbol) -> LocalSlot {
        let frame = self.envs.current_env().frame;
        let slot = self.graph.frame_mut(frame).declare(name);
        LocalSlot { depth: 0, slot, name }
    }

    fn write_local(&mut self, target: LocalSlot, value: ExecId, pos: Position) -> ExecId {
        self.alloc(ExecKind::WriteLocal { target, value }, pos)
    }

    fn read_local(&mut self, slot: LocalSlot, pos: Position) -> ExecId {
        self.alloc(ExecKind::ReadLocal(slot), pos)
    }

    fn sequence(&mut self, mut statements: Vec<ExecId>, pos: Position) -> ExecId {
        match statements.len() {
            0 => self.nil(pos),
            1 => statements.remove(0),
            _ => self.alloc(ExecKind::Sequence(statements), pos),
        }
    }

    fn call(&mut self, receiver: ExecId, name: &str, args: Vec<ExecId>, pos: Position) -> ExecId {
        let name = self.sym(name);
        self.alloc(
            ExecKind::Call {
                receiver,
                name,
                args,
                block: None,
                splatted: false,
                ignore_visibility: false,
            },
            pos,
        )
    }

    fn boolean_cast(&mut self, value: ExecId, pos: Position) -> ExecId {
        self.alloc(ExecKind::BooleanCast(value), pos)
    }
}

#[cfg(test)]
mod tests;
