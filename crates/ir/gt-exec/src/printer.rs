//! S-expression rendering of executable nodes
//!
//! Two graphs that render to the same text have the same node kinds,
//! names and slot indices.

use crate::{ExecGraph, ExecId, ExecKind, FrameId, LocalSlot, MethodId, MissingArgumentBehavior, RescueClause, SplatNil};
use std::fmt::{self, Write};

/// Displays the subtree under a node
pub struct Render<'graph> {
    graph: &'graph ExecGraph,
    root: ExecId,
}

impl ExecGraph {
    /// Printable s-expression for the subtree under `root`
    pub fn display(&self, root: ExecId) -> Render<'_> {
        Render { graph: self, root }
    }

    /// The subtree under `root` as an s-expression
    pub fn render(&self, root: ExecId) -> String {
        self.display(root).to_string()
    }
}

impl fmt::Display for Render<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        Printer {
            graph: self.graph,
            out: formatter,
        }
        .node(self.root)
    }
}

struct Printer<'graph, 'out, 'fmt> {
    graph: &'graph ExecGraph,
    out: &'out mut fmt::Formatter<'fmt>,
}

impl Printer<'_, '_, '_> {
    /// `(head child child ...)`
    fn list(&mut self, head: &str, children: &[ExecId]) -> fmt::Result {
        write!(self.out, "({head}")?;
        self.tail(children)
    }

    fn tail(&mut self, children: &[ExecId]) -> fmt::Result {
        for child in children {
            self.out.write_char(' ')?;
            self.node(*child)?;
        }
        self.out.write_char(')')
    }

    fn slot(&mut self, slot: LocalSlot) -> fmt::Result {
        write!(self.out, "{}@{}", self.graph.name(slot.name), slot.slot)?;
        if slot.depth > 0 {
            write!(self.out, "^{}", slot.depth)?;
        }
        Ok(())
    }

    fn callable(&mut self, head: &str, method: MethodId, frame: FrameId, body: ExecId) -> fmt::Result {
        let info = self.graph.method(method);
        write!(self.out, "({head} {}/{} [", info.name, info.arity)?;
        let frame = self.graph.frame(frame);
        for (index, name) in frame.slot_names().enumerate() {
            if index > 0 {
                self.out.write_char(' ')?;
            }
            self.out.write_str(self.graph.name(name))?;
        }
        self.out.write_char(']')?;
        if frame.needs_declaration_frame {
            self.out.write_str(" ^[")?;
            for (index, name) in frame.captured_names().enumerate() {
                if index > 0 {
                    self.out.write_char(' ')?;
                }
                self.out.write_str(self.graph.name(name))?;
            }
            self.out.write_char(']')?;
        }
        self.tail(&[body])
    }

    fn node(&mut self, id: ExecId) -> fmt::Result {
        let graph = self.graph;
        match &graph[id].kind {
            ExecKind::Nil => self.out.write_str("nil"),
            ExecKind::Boolean(value) => write!(self.out, "{value}"),
            ExecKind::SelfRef => self.out.write_str("self"),
            ExecKind::Fixnum(value) => write!(self.out, "{value}"),
            ExecKind::Bignum(digits) => self.out.write_str(digits),
            ExecKind::Float(value) => write!(self.out, "{value:?}"),
            ExecKind::Str(bytes) => write!(self.out, "{:?}", String::from_utf8_lossy(bytes)),
            ExecKind::Symbol(name) => write!(self.out, ":{}", graph.name(*name)),
            ExecKind::Regexp { source, options } => {
                write!(self.out, "/{}/{options}", String::from_utf8_lossy(source))
            }
            ExecKind::Encoding(name) => write!(self.out, "(encoding {name})"),
            ExecKind::IntegerRange { begin, end, exclusive } => {
                let dots = if *exclusive { "..." } else { ".." };
                write!(self.out, "{begin}{dots}{end}")
            }
            ExecKind::Range { begin, end, exclusive } => {
                self.list(if *exclusive { "dot3" } else { "dot2" }, &[*begin, *end])
            }
            ExecKind::InterpolatedString(parts) => self.list("dstr", parts),
            ExecKind::StringToSymbol(string) => self.list("dsym", &[*string]),
            ExecKind::StringToRegexp { string, options } => {
                write!(self.out, "(dregexp/{options}")?;
                self.tail(&[*string])
            }
            ExecKind::System(command) => self.list("xstr", &[*command]),
            ExecKind::ArrayLiteral(values) => {
                self.out.write_char('[')?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        self.out.write_char(' ')?;
                    }
                    self.node(*value)?;
                }
                self.out.write_char(']')
            }
            ExecKind::ArrayConcat(parts) => self.list("concat", parts),
            ExecKind::ArrayPush { array, value } => self.list("push", &[*array, *value]),
            ExecKind::SplatCast { value, nil } => {
                let head = match nil {
                    SplatNil::EmptyArray => "splat",
                    SplatNil::ArrayWithNil => "splat-nil",
                    SplatNil::Nil => "splat-keep",
                };
                self.list(head, &[*value])
            }
            ExecKind::HashLiteral(pairs) => {
                let children: Vec<ExecId> = pairs.iter().flat_map(|(key, value)| [*key, *value]).collect();
                self.list("hash", &children)
            }
            ExecKind::ReadLocal(slot) => self.slot(*slot),
            ExecKind::WriteLocal { target, value } => {
                self.out.write_str("(lasgn ")?;
                self.slot(*target)?;
                self.tail(&[*value])
            }
            ExecKind::ReadInstance(name) => self.out.write_str(graph.name(*name)),
            ExecKind::WriteInstance { name, value } => {
                write!(self.out, "(iasgn {}", graph.name(*name))?;
                self.tail(&[*value])
            }
            ExecKind::ReadClassVar { module, name } => {
                self.out.write_str("(cvar ")?;
                self.node(*module)?;
                write!(self.out, " {})", graph.name(*name))
            }
            ExecKind::WriteClassVar { module, name, value } => {
                self.out.write_str("(cvasgn ")?;
                self.node(*module)?;
                write!(self.out, " {}", graph.name(*name))?;
                self.tail(&[*value])
            }
            ExecKind::ClassOf(value) => self.list("class-of", &[*value]),
            ExecKind::ReadGlobal(name) => self.out.write_str(graph.name(*name)),
            ExecKind::WriteGlobal { name, value } => {
                write!(self.out, "(gasgn {}", graph.name(*name))?;
                self.tail(&[*value])
            }
            ExecKind::CheckMatchData(value) => self.list("check-match", &[*value]),
            ExecKind::ReadConstant { module, name } => {
                self.out.write_str("(const ")?;
                self.node(*module)?;
                write!(self.out, " {})", graph.name(*name))
            }
            ExecKind::WriteConstant { module, name, value } => {
                self.out.write_str("(cdecl ")?;
                self.node(*module)?;
                write!(self.out, " {}", graph.name(*name))?;
                self.tail(&[*value])
            }
            ExecKind::ObjectClass => self.out.write_str("Object"),
            ExecKind::MainObject => self.out.write_str("main"),
            ExecKind::Call {
                receiver,
                name,
                args,
                block,
                splatted,
                ignore_visibility,
            } => {
                if *ignore_visibility && matches!(graph[*receiver].kind, ExecKind::SelfRef) {
                    write!(self.out, "(fcall {}", graph.name(*name))?;
                } else {
                    self.out.write_str("(call ")?;
                    self.node(*receiver)?;
                    write!(self.out, " {}", graph.name(*name))?;
                }
                self.arguments(args, *block, *splatted)
            }
            ExecKind::ProcCast(value) => self.list("to-proc", &[*value]),
            ExecKind::Super { args, block, splatted } => {
                self.out.write_str("(super")?;
                self.arguments(args, *block, *splatted)
            }
            ExecKind::ZSuper { block } => {
                self.out.write_str("(zsuper")?;
                self.arguments(&[], *block, false)
            }
            ExecKind::Yield { args, unsplat } => self.list(if *unsplat { "yield*" } else { "yield" }, args),
            ExecKind::Defined(value) => self.list("defined", &[*value]),
            ExecKind::Alias {
                module,
                new_name,
                old_name,
            } => {
                self.out.write_str("(alias ")?;
                self.node(*module)?;
                write!(self.out, " {} {})", graph.name(*new_name), graph.name(*old_name))
            }
            ExecKind::AliasGlobal { new_name, old_name } => {
                write!(self.out, "(valias {} {})", graph.name(*new_name), graph.name(*old_name))
            }
            ExecKind::Undef { module, name } => {
                self.out.write_str("(undef ")?;
                self.node(*module)?;
                write!(self.out, " {})", graph.name(*name))
            }
            ExecKind::If {
                cond,
                then_body,
                else_body,
            } => self.list("if", &[*cond, *then_body, *else_body]),
            ExecKind::And(left, right) => self.list("and", &[*left, *right]),
            ExecKind::Or(left, right) => self.list("or", &[*left, *right]),
            ExecKind::Not(value) => self.list("not", &[*value]),
            ExecKind::BooleanCast(value) => self.list("bool", &[*value]),
            ExecKind::While { cond, body, do_while } => {
                self.list(if *do_while { "do-while" } else { "while" }, &[*cond, *body])
            }
            ExecKind::Sequence(statements) => self.list("seq", statements),
            ExecKind::Break(value) => self.list("break", &[*value]),
            ExecKind::Next(value) => self.list("next", &[*value]),
            ExecKind::Redo => self.out.write_str("(redo)"),
            ExecKind::Retry => self.out.write_str("(retry)"),
            ExecKind::Return { return_id, value } => self.list(&format!("return#{return_id}"), &[*value]),
            ExecKind::CatchReturn { return_id, body } => {
                self.list(&format!("catch-return#{return_id}"), &[*body])
            }
            ExecKind::CatchNext(body) => self.list("catch-next", &[*body]),
            ExecKind::CatchRedo(body) => self.list("catch-redo", &[*body]),
            ExecKind::CatchRetryAsError(body) => self.list("catch-retry", &[*body]),
            ExecKind::Try {
                body,
                rescues,
                else_body,
            } => {
                self.out.write_str("(try ")?;
                self.node(*body)?;
                for rescue in rescues {
                    match rescue {
                        RescueClause::Classes { classes, body } => {
                            self.out.write_str(" (rescue [")?;
                            for (index, class) in classes.iter().enumerate() {
                                if index > 0 {
                                    self.out.write_char(' ')?;
                                }
                                self.node(*class)?;
                            }
                            self.out.write_char(']')?;
                            self.tail(&[*body])?;
                        }
                        RescueClause::Splat { splat, body } => {
                            self.out.write_char(' ')?;
                            self.list("rescue-splat", &[*splat, *body])?;
                        }
                        RescueClause::Any { body } => {
                            self.out.write_char(' ')?;
                            self.list("rescue", &[*body])?;
                        }
                    }
                }
                self.out.write_char(' ')?;
                self.list("else", &[*else_body])?;
                self.out.write_char(')')
            }
            ExecKind::Ensure { body, ensure } => self.list("ensure", &[*body, *ensure]),
            ExecKind::FlipFlop {
                begin,
                end,
                exclusive,
                state,
            } => {
                self.out.write_str(if *exclusive { "(flip3 " } else { "(flip2 " })?;
                self.slot(*state)?;
                self.tail(&[*begin, *end])
            }
            ExecKind::InitFlipFlopSlot(state) => {
                self.out.write_str("(init-flip ")?;
                self.slot(*state)?;
                self.out.write_char(')')
            }
            ExecKind::WhenSplat { subject, splat } => self.list("when-splat", &[*subject, *splat]),
            ExecKind::ShouldDestructure(check) => self.list("destructure?", &[*check]),
            ExecKind::RespondTo { value, name } => {
                self.out.write_str("(respond-to? ")?;
                self.node(*value)?;
                write!(self.out, " :{})", graph.name(*name))
            }
            ExecKind::ArraySizeAtLeast { array, size } => {
                self.out.write_str("(size>= ")?;
                self.node(*array)?;
                write!(self.out, " {size})")
            }
            ExecKind::ReadPreArgument { index, missing } => {
                write!(self.out, "({} {index})", argument_head("arg", *missing))
            }
            ExecKind::ReadOptionalArgument {
                index,
                minimum,
                default,
            } => {
                write!(self.out, "(optarg {index} {minimum}")?;
                self.tail(&[*default])
            }
            ExecKind::ReadPostArgument {
                from_end,
                required,
                missing,
            } => write!(self.out, "({} -{from_end} {required})", argument_head("postarg", *missing)),
            ExecKind::ReadRestArgument { start, from_end } => write!(self.out, "(restarg {start} -{from_end})"),
            ExecKind::ReadKeywordArgument { name, default } => {
                write!(self.out, "(kwarg {}", graph.name(*name))?;
                match default {
                    Some(default) => self.tail(&[*default]),
                    None => self.out.write_str(" required)"),
                }
            }
            ExecKind::ReadKeywordRestArgument { excluded } => {
                self.out.write_str("(kwrest")?;
                for name in excluded {
                    write!(self.out, " {}", graph.name(*name))?;
                }
                self.out.write_char(')')
            }
            ExecKind::ReadBlockArgument => self.out.write_str("(blockarg)"),
            ExecKind::ArrayIndex { array, index } => {
                self.out.write_str("(index ")?;
                self.node(*array)?;
                write!(self.out, " {index})")
            }
            ExecKind::ArraySlice { array, from, from_end } => {
                self.out.write_str("(slice ")?;
                self.node(*array)?;
                write!(self.out, " {from} -{from_end})")
            }
            ExecKind::MethodDefinition { method, frame, body } => self.callable("def", *method, *frame, *body),
            ExecKind::AddMethod { module, method } => self.list("add-method", &[*module, *method]),
            ExecKind::SingletonClass(value) => self.list("singleton", &[*value]),
            ExecKind::BlockDefinition {
                method,
                frame,
                body,
                lambda,
            } => self.callable(if *lambda { "lambda" } else { "block" }, *method, *frame, *body),
            ExecKind::DefineClass {
                name,
                lexical_parent,
                superclass,
            } => {
                write!(self.out, "(define-class {}", graph.name(*name))?;
                self.tail(&[*lexical_parent, *superclass])
            }
            ExecKind::DefineModule { name, lexical_parent } => {
                write!(self.out, "(define-module {}", graph.name(*name))?;
                self.tail(&[*lexical_parent])
            }
            ExecKind::OpenModule { module, definition } => self.list("open", &[*module, *definition]),
        }
    }

    fn arguments(&mut self, args: &[ExecId], block: Option<ExecId>, splatted: bool) -> fmt::Result {
        for arg in args {
            self.out.write_str(if splatted { " *" } else { " " })?;
            self.node(*arg)?;
        }
        if let Some(block) = block {
            self.out.write_str(" &")?;
            self.node(block)?;
        }
        self.out.write_char(')')
    }
}

fn argument_head(base: &str, missing: MissingArgumentBehavior) -> String {
    match missing {
        MissingArgumentBehavior::RuntimeError => base.to_string(),
        MissingArgumentBehavior::Nil => format!("{base}-or-nil"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arity, ExecKind, FrameDescriptor, FrameKind, ReturnId, SharedMethodInfo};
    use expect_test::expect;
    use gt_span::Position;

    #[test]
    fn test_render_case_shape() {
        let mut graph = ExecGraph::default();
        let pos = Position::default();
        let name = graph.intern("%case_1");
        let slot = LocalSlot { depth: 0, slot: 0, name };
        let five = graph.alloc(ExecKind::Fixnum(5), pos);
        let write = graph.alloc(ExecKind::WriteLocal { target: slot, value: five }, pos);
        let candidate = graph.alloc(ExecKind::Fixnum(5), pos);
        let subject = graph.alloc(ExecKind::ReadLocal(slot), pos);
        let triple_eq = graph.intern("===");
        let test = graph.alloc(
            ExecKind::Call {
                receiver: candidate,
                name: triple_eq,
                args: vec![subject],
                block: None,
                splatted: false,
                ignore_visibility: false,
            },
            pos,
        );
        let cond = graph.alloc(ExecKind::BooleanCast(test), pos);
        let symbol = graph.intern("b");
        let then_body = graph.alloc(ExecKind::Symbol(symbol), pos);
        let else_body = graph.alloc(ExecKind::Nil, pos);
        let branch = graph.alloc(
            ExecKind::If {
                cond,
                then_body,
                else_body,
            },
            pos,
        );
        let root = graph.alloc(ExecKind::Sequence(vec![write, branch]), pos);

        expect![[r#"(seq (lasgn %case_1@0 5) (if (bool (call 5 === %case_1@0)) :b nil))"#]]
            .assert_eq(&graph.render(root));
    }

    #[test]
    fn test_render_callable_with_capture() {
        let mut graph = ExecGraph::default();
        let pos = Position::default();
        let x = graph.intern("x");
        let y = graph.intern("y");
        let mut frame = FrameDescriptor::new(FrameKind::Block, None);
        frame.declare(y);
        frame.capture(x);
        let frame = graph.add_frame(frame);
        let method = graph.add_method(SharedMethodInfo {
            name: "(each-block)".to_string(),
            arity: Arity {
                required: 1,
                optional: 0,
                rest: false,
            },
            pos,
            is_block: true,
            lexical_frame: None,
        });
        let read = graph.alloc(ExecKind::ReadLocal(LocalSlot { depth: 1, slot: 0, name: x }), pos);
        let value = graph.alloc(
            ExecKind::ReadPreArgument {
                index: 0,
                missing: MissingArgumentBehavior::Nil,
            },
            pos,
        );
        let load = graph.alloc(
            ExecKind::WriteLocal {
                target: LocalSlot { depth: 0, slot: 0, name: y },
                value,
            },
            pos,
        );
        let body = graph.alloc(ExecKind::Sequence(vec![load, read]), pos);
        let body = graph.alloc(
            ExecKind::CatchReturn {
                return_id: ReturnId(1),
                body,
            },
            pos,
        );
        let root = graph.alloc(
            ExecKind::BlockDefinition {
                method,
                frame,
                body,
                lambda: false,
            },
            pos,
        );

        expect![[r#"(block (each-block)/1 [y] ^[x] (catch-return#1 (seq (lasgn y@0 (arg-or-nil 0)) x@0^1)))"#]]
            .assert_eq(&graph.render(root));
    }
}
