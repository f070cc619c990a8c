use crate::Translator;
use crate::error::TResult;
use crate::specialize::{Callable, Specializer};
use gt_exec::{ExecId, ExecKind};
use gt_span::Position;
use gt_syntax::{ArgsNode, Node, NodeKind};

impl Translator<'_> {
    /// `def name` installs into the lexical module; `def recv.name` into the
    /// receiver's singleton class
    pub(crate) fn lower_method_definition(
        &mut self,
        receiver: Option<&Node>,
        name: &str,
        args: &ArgsNode,
        body: Option<&Node>,
        locals: &[String],
        pos: Position,
    ) -> TResult<ExecId> {
        let module = match receiver {
            Some(receiver) => {
                let receiver = self.lower(receiver)?;
                self.alloc(ExecKind::SingletonClass(receiver), pos)
            }
            None => self.lexical_module(pos),
        };
        let lowered = self.translate_callable(Callable {
            specializer: Specializer::Method,
            name: name.to_string(),
            args: Some(args),
            body,
            locals,
            pos,
            for_target: None,
        })?;
        let method = self.alloc(
            ExecKind::MethodDefinition {
                method: lowered.method,
                frame: lowered.frame,
                body: lowered.body,
            },
            pos,
        );
        Ok(self.alloc(ExecKind::AddMethod { module, method }, pos))
    }

    pub(crate) fn lower_class(
        &mut self,
        cpath: &Node,
        superclass: Option<&Node>,
        body: Option<&Node>,
        locals: &[String],
        pos: Position,
    ) -> TResult<ExecId> {
        let (lexical_parent, name) = self.lower_class_path(cpath)?;
        let superclass = match superclass {
            Some(superclass) => self.lower(superclass)?,
            None => self.alloc(ExecKind::ObjectClass, pos),
        };
        let body_name = format!("<class:{name}>");
        let name = self.sym(&name);
        let module = self.alloc(
            ExecKind::DefineClass {
                name,
                lexical_parent,
                superclass,
            },
            pos,
        );
        self.open_module(module, body_name, body, locals, pos)
    }

    pub(crate) fn lower_module(&mut self, cpath: &Node, body: Option<&Node>, locals: &[String], pos: Position) -> TResult<ExecId> {
        let (lexical_parent, name) = self.lower_class_path(cpath)?;
        let body_name = format!("<module:{name}>");
        let name = self.sym(&name);
        let module = self.alloc(ExecKind::DefineModule { name, lexical_parent }, pos);
        self.open_module(module, body_name, body, locals, pos)
    }

    pub(crate) fn lower_singleton_class(
        &mut self,
        receiver: &Node,
        body: Option<&Node>,
        locals: &[String],
        pos: Position,
    ) -> TResult<ExecId> {
        let receiver = self.lower(receiver)?;
        let module = self.alloc(ExecKind::SingletonClass(receiver), pos);
        self.open_module(module, "singleton class".to_string(), body, locals, pos)
    }

    /// Module the constant of a class path lives in, and its name
    fn lower_class_path(&mut self, cpath: &Node) -> TResult<(ExecId, String)> {
        let pos = cpath.pos;
        match &cpath.kind {
            NodeKind::Colon2 { left: Some(left), name } => Ok((self.lower(left)?, name.clone())),
            NodeKind::Colon3(name) => Ok((self.alloc(ExecKind::ObjectClass, pos), name.clone())),
            NodeKind::Colon2 { left: None, name } | NodeKind::Const(name) => Ok((self.lexical_module(pos), name.clone())),
            _ => {
                let parent = self.lexical_module(pos);
                Ok((parent, cpath.kind_name().to_string()))
            }
        }
    }

    fn open_module(
        &mut self,
        module: ExecId,
        name: String,
        body: Option<&Node>,
        locals: &[String],
        pos: Position,
    ) -> TResult<ExecId> {
        let lowered = self.translate_callable(Callable {
            specializer: Specializer::Module,
            name,
            args: None,
            body,
            locals,
            pos,
            for_target: None,
        })?;
        let definition = self.alloc(
            ExecKind::MethodDefinition {
                method: lowered.method,
                frame: lowered.frame,
                body: lowered.body,
            },
            pos,
        );
        Ok(self.alloc(ExecKind::OpenModule { module, definition }, pos))
    }
}
