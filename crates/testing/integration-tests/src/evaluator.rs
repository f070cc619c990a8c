//! Tree-walking evaluator over the executable graph
//!
//! The evaluator models just enough of the runtime to observe what a
//! translated program does: integers, strings, symbols, arrays, hashes,
//! integer ranges, blocks and the methods the program defines itself.
//! Methods live in one global table regardless of the module they were
//! added to.

use crate::builtins;
use crate::value::{Closure, Exception, Value};
use gt_exec::{
    ExecGraph, ExecId, ExecKind, FrameId, LocalSlot, MethodId, MissingArgumentBehavior, RescueClause, ReturnId,
    SplatNil,
};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Evaluation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// An exception reached the top level
    #[error("{class}: {message}")]
    Raised {
        /// Exception class
        class: String,
        /// Exception message
        message: String,
    },

    /// The node kind is not modelled
    #[error("unsupported node: {0}")]
    Unsupported(&'static str),

    /// A jump found nothing to catch it
    #[error("{0} escaped to the top level")]
    Escaped(&'static str),

    /// A local read walked past the outermost frame
    #[error("no frame {0} levels out")]
    MissingFrame(u32),
}

/// Non-local exits travelling up the Rust stack
#[derive(Debug)]
pub(crate) enum Unwind {
    Raise(Rc<Exception>),
    Break(Value),
    Next(Value),
    Redo,
    Retry,
    Return(ReturnId, Value),
    Fatal(EvalError),
}

pub(crate) type EvalResult<T = Value> = Result<T, Unwind>;

/// Raise `class` with `message`
pub(crate) fn raise(class: &str, message: impl Into<String>) -> Unwind {
    Unwind::Raise(Rc::new(Exception {
        class: class.to_string(),
        message: message.into(),
    }))
}

/// One activation of a method, block or the top level
#[derive(Debug)]
pub struct Frame {
    slots: RefCell<Vec<Value>>,
    /// Frame the block was created in; `None` for methods
    declaration: Option<Rc<Frame>>,
    self_value: Value,
    args: Vec<Value>,
    /// Block passed to this activation
    block: Option<Rc<Closure>>,
    /// Block `yield` calls; a block yields to its method's block
    yield_block: Option<Rc<Closure>>,
}

impl Frame {
    fn method(slot_count: usize, self_value: Value, args: Vec<Value>, block: Option<Rc<Closure>>) -> Self {
        Self {
            slots: RefCell::new(vec![Value::Nil; slot_count]),
            declaration: None,
            self_value,
            args,
            yield_block: block.clone(),
            block,
        }
    }

    fn at_depth(self: &Rc<Self>, depth: u32) -> EvalResult<&Rc<Self>> {
        let mut current = self;
        for _ in 0..depth {
            current = current
                .declaration
                .as_ref()
                .ok_or(Unwind::Fatal(EvalError::MissingFrame(depth)))?;
        }
        Ok(current)
    }

    fn read(self: &Rc<Self>, slot: LocalSlot) -> EvalResult {
        let frame = self.at_depth(slot.depth)?;
        Ok(frame
            .slots
            .borrow()
            .get(slot.slot as usize)
            .cloned()
            .unwrap_or(Value::Nil))
    }

    fn write(self: &Rc<Self>, slot: LocalSlot, value: Value) -> EvalResult<()> {
        let frame = self.at_depth(slot.depth)?;
        let mut slots = frame.slots.borrow_mut();
        let index = slot.slot as usize;
        if index >= slots.len() {
            slots.resize(index + 1, Value::Nil);
        }
        slots[index] = value;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Method {
    info: MethodId,
    layout: FrameId,
    body: ExecId,
}

/// Evaluator for one translated unit
pub struct Evaluator<'g> {
    graph: &'g ExecGraph,
    methods: FxHashMap<String, Method>,
    globals: FxHashMap<String, Value>,
    constants: FxHashMap<String, Value>,
    instance_vars: FxHashMap<String, Value>,
    class_vars: FxHashMap<String, Value>,
    calls: FxHashMap<String, usize>,
    output: Vec<String>,
    top: Option<Rc<Frame>>,
}

impl<'g> Evaluator<'g> {
    /// Create an evaluator over `graph`
    pub fn new(graph: &'g ExecGraph) -> Self {
        Self {
            graph,
            methods: FxHashMap::default(),
            globals: FxHashMap::default(),
            constants: FxHashMap::default(),
            instance_vars: FxHashMap::default(),
            class_vars: FxHashMap::default(),
            calls: FxHashMap::default(),
            output: Vec::new(),
            top: None,
        }
    }

    /// Run the top-level body
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Raised`] for an uncaught exception, and the
    /// other variants when the program leaves what the evaluator models.
    pub fn run(&mut self, root: ExecId, root_frame: FrameId) -> Result<Value, EvalError> {
        let slots = self.graph.frame(root_frame).slot_count();
        let frame = Rc::new(Frame::method(slots, Value::Main, Vec::new(), None));
        self.top = Some(Rc::clone(&frame));
        self.eval(root, &frame).map_err(|unwind| match unwind {
            Unwind::Raise(exception) => EvalError::Raised {
                class: exception.class.clone(),
                message: exception.message.clone(),
            },
            Unwind::Break(_) => EvalError::Escaped("break"),
            Unwind::Next(_) => EvalError::Escaped("next"),
            Unwind::Redo => EvalError::Escaped("redo"),
            Unwind::Retry => EvalError::Escaped("retry"),
            Unwind::Return(..) => EvalError::Escaped("return"),
            Unwind::Fatal(error) => error,
        })
    }

    /// Named top-level locals after [`Self::run`]; temporaries are left out
    pub fn locals(&self, root_frame: FrameId) -> FxHashMap<String, Value> {
        let Some(top) = &self.top else {
            return FxHashMap::default();
        };
        let slots = top.slots.borrow();
        self.graph
            .frame(root_frame)
            .slot_names()
            .zip(slots.iter())
            .map(|(name, value)| (self.graph.name(name).to_string(), value.clone()))
            .filter(|(name, _)| !name.starts_with('%'))
            .collect()
    }

    /// Global variables
    pub fn globals(&self) -> &FxHashMap<String, Value> {
        &self.globals
    }

    /// How often each method name was called
    pub fn call_counts(&self) -> &FxHashMap<String, usize> {
        &self.calls
    }

    /// Lines written by `puts` and `p`
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub(crate) fn print(&mut self, line: String) {
        self.output.push(line);
    }

    pub(crate) fn responds_to(&self, value: &Value, name: &str) -> bool {
        self.methods.contains_key(name) || builtins::responds_to(value, name)
    }

    fn eval_all(&mut self, ids: &[ExecId], frame: &Rc<Frame>) -> EvalResult<Vec<Value>> {
        ids.iter().map(|id| self.eval(*id, frame)).collect()
    }

    /// Call arguments; `spread` unpacks a single array
    fn eval_args(&mut self, ids: &[ExecId], spread: bool, frame: &Rc<Frame>) -> EvalResult<Vec<Value>> {
        let values = self.eval_all(ids, frame)?;
        match values.as_slice() {
            [single] if spread => Ok(single.as_array().unwrap_or_else(|| vec![single.clone()])),
            _ => Ok(values),
        }
    }

    fn eval(&mut self, id: ExecId, frame: &Rc<Frame>) -> EvalResult {
        let graph = self.graph;
        let kind = &graph[id].kind;
        match kind {
            ExecKind::Nil => Ok(Value::Nil),
            ExecKind::Boolean(value) => Ok(Value::Bool(*value)),
            ExecKind::SelfRef => Ok(frame.self_value.clone()),
            ExecKind::Fixnum(value) => Ok(Value::Int(*value)),
            ExecKind::Float(value) => Ok(Value::Float(*value)),
            ExecKind::Str(bytes) => Ok(Value::Str(String::from_utf8_lossy(bytes).into_owned())),
            ExecKind::Symbol(name) => Ok(Value::sym(graph.name(*name))),
            ExecKind::Encoding(name) => Ok(Value::Str(name.clone())),
            ExecKind::IntegerRange { begin, end, exclusive } => Ok(Value::Range {
                begin: *begin,
                end: *end,
                exclusive: *exclusive,
            }),
            ExecKind::Range { begin, end, exclusive } => {
                let begin = self.eval(*begin, frame)?;
                let end = self.eval(*end, frame)?;
                match (begin.as_int(), end.as_int()) {
                    (Some(begin), Some(end)) => Ok(Value::Range {
                        begin,
                        end,
                        exclusive: *exclusive,
                    }),
                    _ => Err(raise("ArgumentError", "bad value for range")),
                }
            }
            ExecKind::InterpolatedString(parts) => {
                let mut text = String::new();
                for part in parts {
                    text.push_str(&self.eval(*part, frame)?.to_text());
                }
                Ok(Value::Str(text))
            }
            ExecKind::StringToSymbol(value) => Ok(Value::Symbol(self.eval(*value, frame)?.to_text())),

            ExecKind::ArrayLiteral(items) => Ok(Value::array(self.eval_all(items, frame)?)),
            ExecKind::ArrayConcat(parts) => {
                let mut items = Vec::new();
                for part in parts {
                    let part = self.eval(*part, frame)?;
                    match part.as_array() {
                        Some(elements) => items.extend(elements),
                        None => items.push(part),
                    }
                }
                Ok(Value::array(items))
            }
            ExecKind::ArrayPush { array, value } => {
                let array = self.eval(*array, frame)?;
                let value = self.eval(*value, frame)?;
                let mut items = array.as_array().unwrap_or_else(|| vec![array.clone()]);
                items.push(value);
                Ok(Value::array(items))
            }
            ExecKind::SplatCast { value, nil } => Ok(splat_cast(self.eval(*value, frame)?, *nil)),
            ExecKind::HashLiteral(pairs) => {
                let mut entries = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let key = self.eval(*key, frame)?;
                    let value = self.eval(*value, frame)?;
                    builtins::hash_insert(&mut entries, key, value);
                }
                Ok(Value::hash(entries))
            }

            ExecKind::ReadLocal(slot) => frame.read(*slot),
            ExecKind::WriteLocal { target, value } => {
                let value = self.eval(*value, frame)?;
                frame.write(*target, value.clone())?;
                Ok(value)
            }
            ExecKind::ReadInstance(name) => Ok(self.instance_vars.get(graph.name(*name)).cloned().unwrap_or(Value::Nil)),
            ExecKind::WriteInstance { name, value } => {
                let value = self.eval(*value, frame)?;
                self.instance_vars.insert(graph.name(*name).to_string(), value.clone());
                Ok(value)
            }
            ExecKind::ReadClassVar { module, name } => {
                self.eval(*module, frame)?;
                let name = graph.name(*name);
                self.class_vars
                    .get(name)
                    .cloned()
                    .ok_or_else(|| raise("NameError", format!("uninitialized class variable {name}")))
            }
            ExecKind::WriteClassVar { module, name, value } => {
                self.eval(*module, frame)?;
                let value = self.eval(*value, frame)?;
                self.class_vars.insert(graph.name(*name).to_string(), value.clone());
                Ok(value)
            }
            ExecKind::ClassOf(value) => Ok(Value::Module(self.eval(*value, frame)?.class_name())),
            ExecKind::ReadGlobal(name) => Ok(self.globals.get(graph.name(*name)).cloned().unwrap_or(Value::Nil)),
            ExecKind::WriteGlobal { name, value } => {
                let value = self.eval(*value, frame)?;
                self.globals.insert(graph.name(*name).to_string(), value.clone());
                Ok(value)
            }
            ExecKind::CheckMatchData(value) => self.eval(*value, frame),
            ExecKind::ReadConstant { module, name } => {
                self.eval(*module, frame)?;
                self.constant(graph.name(*name))
            }
            ExecKind::WriteConstant { module, name, value } => {
                self.eval(*module, frame)?;
                let value = self.eval(*value, frame)?;
                self.constants.insert(graph.name(*name).to_string(), value.clone());
                Ok(value)
            }
            ExecKind::ObjectClass => Ok(Value::Module("Object".to_string())),
            ExecKind::MainObject => Ok(Value::Main),

            ExecKind::Call {
                receiver,
                name,
                args,
                block,
                splatted,
                ..
            } => {
                let receiver = self.eval(*receiver, frame)?;
                let args = self.eval_args(args, *splatted, frame)?;
                let closure = match block {
                    Some(block) => block_closure(self.eval(*block, frame)?)?,
                    None => None,
                };
                let result = self.call(receiver, graph.name(*name), args, closure);
                match (result, block.map(|block| &graph[block].kind)) {
                    // `break` in a block literal ends the call it was passed to
                    (Err(Unwind::Break(value)), Some(ExecKind::BlockDefinition { lambda: false, .. })) => Ok(value),
                    (result, _) => result,
                }
            }
            ExecKind::ProcCast(value) => {
                let value = self.eval(*value, frame)?;
                Ok(block_closure(value)?.map_or(Value::Nil, Value::Proc))
            }
            ExecKind::Yield { args, unsplat } => {
                let args = self.eval_args(args, *unsplat, frame)?;
                let Some(block) = frame.yield_block.clone() else {
                    return Err(raise("LocalJumpError", "no block given (yield)"));
                };
                self.call_closure(&block, args, None)
            }
            ExecKind::Defined(value) => match self.eval(*value, frame) {
                Ok(_) => Ok(Value::str("expression")),
                Err(Unwind::Raise(_)) => Ok(Value::Nil),
                Err(other) => Err(other),
            },
            ExecKind::Alias {
                module,
                new_name,
                old_name,
            } => {
                self.eval(*module, frame)?;
                let old_name = graph.name(*old_name);
                let Some(method) = self.methods.get(old_name).copied() else {
                    return Err(raise("NameError", format!("undefined method `{old_name}' for class")));
                };
                self.methods.insert(graph.name(*new_name).to_string(), method);
                Ok(Value::Nil)
            }
            ExecKind::Undef { module, name } => {
                self.eval(*module, frame)?;
                let name = graph.name(*name);
                match self.methods.remove(name) {
                    Some(_) => Ok(Value::Nil),
                    None => Err(raise("NameError", format!("undefined method `{name}' for class"))),
                }
            }

            ExecKind::If {
                cond,
                then_body,
                else_body,
            } => {
                if self.eval(*cond, frame)?.is_truthy() {
                    self.eval(*then_body, frame)
                } else {
                    self.eval(*else_body, frame)
                }
            }
            ExecKind::And(left, right) => {
                let left = self.eval(*left, frame)?;
                if left.is_truthy() { self.eval(*right, frame) } else { Ok(left) }
            }
            ExecKind::Or(left, right) => {
                let left = self.eval(*left, frame)?;
                if left.is_truthy() { Ok(left) } else { self.eval(*right, frame) }
            }
            ExecKind::Not(value) => Ok(Value::Bool(!self.eval(*value, frame)?.is_truthy())),
            ExecKind::BooleanCast(value) => Ok(Value::Bool(self.eval(*value, frame)?.is_truthy())),
            ExecKind::While { cond, body, do_while } => {
                let mut skip_test = *do_while;
                loop {
                    if !skip_test && !self.eval(*cond, frame)?.is_truthy() {
                        return Ok(Value::Nil);
                    }
                    skip_test = false;
                    match self.eval(*body, frame) {
                        Ok(_) | Err(Unwind::Next(_)) => {}
                        Err(Unwind::Break(value)) => return Ok(value),
                        Err(other) => return Err(other),
                    }
                }
            }
            ExecKind::Sequence(statements) => {
                let mut last = Value::Nil;
                for statement in statements {
                    last = self.eval(*statement, frame)?;
                }
                Ok(last)
            }
            ExecKind::Break(value) => Err(Unwind::Break(self.eval(*value, frame)?)),
            ExecKind::Next(value) => Err(Unwind::Next(self.eval(*value, frame)?)),
            ExecKind::Redo => Err(Unwind::Redo),
            ExecKind::Retry => Err(Unwind::Retry),
            ExecKind::Return { return_id, value } => Err(Unwind::Return(*return_id, self.eval(*value, frame)?)),
            ExecKind::CatchReturn { return_id, body } => match self.eval(*body, frame) {
                Err(Unwind::Return(target, value)) if target == *return_id => Ok(value),
                other => other,
            },
            ExecKind::CatchNext(body) => match self.eval(*body, frame) {
                Err(Unwind::Next(value)) => Ok(value),
                other => other,
            },
            ExecKind::CatchRedo(body) => loop {
                match self.eval(*body, frame) {
                    Err(Unwind::Redo) => {}
                    other => return other,
                }
            },
            ExecKind::CatchRetryAsError(body) => match self.eval(*body, frame) {
                Err(Unwind::Retry) => Err(raise("SyntaxError", "Invalid retry")),
                other => other,
            },
            ExecKind::Try {
                body,
                rescues,
                else_body,
            } => loop {
                match self.eval(*body, frame) {
                    // A missing else clause is lowered to nil
                    Ok(value) if matches!(graph[*else_body].kind, ExecKind::Nil) => return Ok(value),
                    Ok(_) => return self.eval(*else_body, frame),
                    Err(Unwind::Raise(exception)) => {
                        let Some(handler) = self.find_handler(rescues, &exception, frame)? else {
                            return Err(Unwind::Raise(exception));
                        };
                        self.globals.insert("$!".to_string(), Value::Exception(exception));
                        match self.eval(handler, frame) {
                            Err(Unwind::Retry) => {}
                            other => return other,
                        }
                    }
                    Err(other) => return Err(other),
                }
            },
            ExecKind::Ensure { body, ensure } => {
                let result = self.eval(*body, frame);
                self.eval(*ensure, frame)?;
                result
            }

            ExecKind::FlipFlop {
                begin,
                end,
                exclusive,
                state,
            } => {
                if frame.read(*state)?.is_truthy() {
                    if self.eval(*end, frame)?.is_truthy() {
                        frame.write(*state, Value::Bool(false))?;
                    }
                    Ok(Value::Bool(true))
                } else if self.eval(*begin, frame)?.is_truthy() {
                    let stays_on = *exclusive || !self.eval(*end, frame)?.is_truthy();
                    frame.write(*state, Value::Bool(stays_on))?;
                    Ok(Value::Bool(true))
                } else {
                    Ok(Value::Bool(false))
                }
            }
            ExecKind::InitFlipFlopSlot(slot) => {
                frame.write(*slot, Value::Bool(false))?;
                Ok(Value::Nil)
            }
            ExecKind::WhenSplat { subject, splat } => {
                let subject = self.eval(*subject, frame)?;
                let candidates = self.eval(*splat, frame)?.as_array().unwrap_or_default();
                for candidate in candidates {
                    if self.call(candidate, "===", vec![subject.clone()], None)?.is_truthy() {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            ExecKind::ShouldDestructure(check) => {
                Ok(Value::Bool(frame.args.len() == 1 && self.eval(*check, frame)?.is_truthy()))
            }
            ExecKind::RespondTo { value, name } => {
                let value = self.eval(*value, frame)?;
                Ok(Value::Bool(self.responds_to(&value, graph.name(*name))))
            }
            ExecKind::ArraySizeAtLeast { array, size } => {
                let items = self.eval_array(*array, frame)?;
                Ok(Value::Bool(items.len() >= *size))
            }

            ExecKind::ReadPreArgument { index, missing } => match frame.args.get(*index) {
                Some(value) => Ok(value.clone()),
                None => missing_argument(*missing, frame),
            },
            ExecKind::ReadOptionalArgument { index, minimum, default } => {
                if frame.args.len() >= *minimum {
                    Ok(frame.args.get(*index).cloned().unwrap_or(Value::Nil))
                } else {
                    self.eval(*default, frame)
                }
            }
            ExecKind::ReadPostArgument {
                from_end,
                required,
                missing,
            } => {
                let len = frame.args.len();
                let index = if len >= *required {
                    len.checked_sub(*from_end)
                } else {
                    required.checked_sub(*from_end)
                };
                match index.and_then(|index| frame.args.get(index)) {
                    Some(value) => Ok(value.clone()),
                    None => missing_argument(*missing, frame),
                }
            }
            ExecKind::ReadRestArgument { start, from_end } => Ok(Value::array(slice(&frame.args, *start, *from_end))),
            ExecKind::ReadKeywordArgument { name, default } => {
                let keyword = graph.name(*name);
                if let Some(Value::Hash(pairs)) = frame.args.last()
                    && let Some(value) = builtins::hash_get(&pairs.borrow(), &Value::sym(keyword))
                {
                    return Ok(value);
                }
                match default {
                    Some(default) => self.eval(*default, frame),
                    None => Err(raise("ArgumentError", format!("missing keyword: :{keyword}"))),
                }
            }
            ExecKind::ReadKeywordRestArgument { excluded } => {
                let excluded: Vec<Value> = excluded.iter().map(|name| Value::sym(graph.name(*name))).collect();
                let pairs = match frame.args.last() {
                    Some(Value::Hash(pairs)) => pairs
                        .borrow()
                        .iter()
                        .filter(|(key, _)| !excluded.contains(key))
                        .cloned()
                        .collect(),
                    _ => Vec::new(),
                };
                Ok(Value::hash(pairs))
            }
            ExecKind::ReadBlockArgument => Ok(frame.block.clone().map_or(Value::Nil, Value::Proc)),
            ExecKind::ArrayIndex { array, index } => {
                let items = self.eval_array(*array, frame)?;
                Ok(builtins::index(&items, *index))
            }
            ExecKind::ArraySlice { array, from, from_end } => {
                let items = self.eval_array(*array, frame)?;
                Ok(Value::array(slice(&items, *from, *from_end)))
            }

            ExecKind::AddMethod { module, method } => {
                self.eval(*module, frame)?;
                let ExecKind::MethodDefinition {
                    method: info,
                    frame: layout,
                    body,
                } = graph[*method].kind
                else {
                    return Err(Unwind::Fatal(EvalError::Unsupported(graph[*method].kind.name())));
                };
                let name = graph.method(info).name.clone();
                self.methods.insert(name.clone(), Method { info, layout, body });
                Ok(Value::Symbol(name))
            }
            ExecKind::SingletonClass(value) => {
                let value = self.eval(*value, frame)?;
                Ok(Value::Module(format!("#<Class:{value}>")))
            }
            ExecKind::BlockDefinition {
                method,
                frame: layout,
                body,
                lambda,
            } => Ok(Value::Proc(Rc::new(Closure {
                method: *method,
                frame: *layout,
                body: *body,
                lambda: *lambda,
                declaration: Rc::clone(frame),
            }))),
            ExecKind::DefineClass {
                name,
                lexical_parent,
                superclass,
            } => {
                self.eval(*lexical_parent, frame)?;
                self.eval(*superclass, frame)?;
                Ok(self.define_module(graph.name(*name)))
            }
            ExecKind::DefineModule { name, lexical_parent } => {
                self.eval(*lexical_parent, frame)?;
                Ok(self.define_module(graph.name(*name)))
            }
            ExecKind::OpenModule { module, definition } => {
                let module = self.eval(*module, frame)?;
                let ExecKind::MethodDefinition { frame: layout, body, .. } = graph[*definition].kind else {
                    return Err(Unwind::Fatal(EvalError::Unsupported(graph[*definition].kind.name())));
                };
                let slots = graph.frame(layout).slot_count();
                let body_frame = Rc::new(Frame::method(slots, module, Vec::new(), None));
                self.eval(body, &body_frame)
            }

            ExecKind::Bignum(_)
            | ExecKind::Regexp { .. }
            | ExecKind::StringToRegexp { .. }
            | ExecKind::System(_)
            | ExecKind::Super { .. }
            | ExecKind::ZSuper { .. }
            | ExecKind::AliasGlobal { .. }
            | ExecKind::MethodDefinition { .. } => Err(Unwind::Fatal(EvalError::Unsupported(kind.name()))),
        }
    }

    fn eval_array(&mut self, id: ExecId, frame: &Rc<Frame>) -> EvalResult<Vec<Value>> {
        let value = self.eval(id, frame)?;
        value
            .as_array()
            .ok_or_else(|| raise("TypeError", format!("{} is not an array", value.class_name())))
    }

    fn find_handler(
        &mut self,
        rescues: &[RescueClause],
        exception: &Exception,
        frame: &Rc<Frame>,
    ) -> EvalResult<Option<ExecId>> {
        for clause in rescues {
            let classes = match clause {
                RescueClause::Any { .. } => vec![Value::Module("StandardError".to_string())],
                RescueClause::Classes { classes, .. } => self.eval_all(classes, frame)?,
                RescueClause::Splat { splat, .. } => self.eval_array(*splat, frame)?,
            };
            let matched = classes
                .iter()
                .any(|class| matches!(class, Value::Module(name) if builtins::is_a(&exception.class, name)));
            if matched {
                return Ok(Some(clause.body()));
            }
        }
        Ok(None)
    }

    fn constant(&self, name: &str) -> EvalResult {
        if let Some(value) = self.constants.get(name) {
            return Ok(value.clone());
        }
        if builtins::is_builtin_class(name) {
            return Ok(Value::Module(name.to_string()));
        }
        Err(raise("NameError", format!("uninitialized constant {name}")))
    }

    fn define_module(&mut self, name: &str) -> Value {
        self.constants
            .entry(name.to_string())
            .or_insert_with(|| Value::Module(name.to_string()))
            .clone()
    }

    /// Dispatch `name`: program-defined methods first, then builtins
    pub(crate) fn call(
        &mut self,
        receiver: Value,
        name: &str,
        args: Vec<Value>,
        block: Option<Rc<Closure>>,
    ) -> EvalResult {
        *self.calls.entry(name.to_string()).or_default() += 1;
        match self.methods.get(name).copied() {
            Some(method) => self.invoke(method, receiver, args, block),
            None => builtins::call(self, receiver, name, args, block),
        }
    }

    fn invoke(&mut self, method: Method, receiver: Value, args: Vec<Value>, block: Option<Rc<Closure>>) -> EvalResult {
        let graph = self.graph;
        let arity = graph.method(method.info).arity;
        let keywords = matches!(args.last(), Some(Value::Hash(_)));
        if !arity.accepts(args.len()) && !(keywords && arity.accepts(args.len() - 1)) {
            return Err(raise(
                "ArgumentError",
                format!("wrong number of arguments (given {}, expected {arity})", args.len()),
            ));
        }
        let slots = graph.frame(method.layout).slot_count();
        let frame = Rc::new(Frame::method(slots, receiver, args, block));
        self.eval(method.body, &frame)
    }

    /// Run a block or lambda with `args`
    pub(crate) fn call_closure(
        &mut self,
        closure: &Rc<Closure>,
        args: Vec<Value>,
        block: Option<Rc<Closure>>,
    ) -> EvalResult {
        let graph = self.graph;
        if closure.lambda {
            let arity = graph.method(closure.method).arity;
            if !arity.accepts(args.len()) {
                return Err(raise(
                    "ArgumentError",
                    format!("wrong number of arguments (given {}, expected {arity})", args.len()),
                ));
            }
        }
        let declaration = &closure.declaration;
        let frame = Rc::new(Frame {
            slots: RefCell::new(vec![Value::Nil; graph.frame(closure.frame).slot_count()]),
            declaration: Some(Rc::clone(declaration)),
            self_value: declaration.self_value.clone(),
            args,
            block,
            yield_block: declaration.yield_block.clone(),
        });
        self.eval(closure.body, &frame)
    }
}

fn missing_argument(missing: MissingArgumentBehavior, frame: &Frame) -> EvalResult {
    match missing {
        MissingArgumentBehavior::Nil => Ok(Value::Nil),
        MissingArgumentBehavior::RuntimeError => Err(raise(
            "ArgumentError",
            format!("wrong number of arguments (given {})", frame.args.len()),
        )),
    }
}

/// A block argument: a proc, or nothing for `nil`
fn block_closure(value: Value) -> EvalResult<Option<Rc<Closure>>> {
    match value {
        Value::Proc(closure) => Ok(Some(closure)),
        Value::Nil => Ok(None),
        other => Err(raise(
            "TypeError",
            format!("wrong argument type {} (expected Proc)", other.class_name()),
        )),
    }
}

/// `items[from...len - from_end]`, empty when that is negative
fn slice(items: &[Value], from: usize, from_end: usize) -> Vec<Value> {
    let end = items.len().saturating_sub(from_end);
    items.get(from..end).map(<[Value]>::to_vec).unwrap_or_default()
}

fn splat_cast(value: Value, nil: SplatNil) -> Value {
    match value {
        Value::Array(_) => value,
        Value::Nil => match nil {
            SplatNil::EmptyArray => Value::array(Vec::new()),
            SplatNil::ArrayWithNil => Value::array(vec![Value::Nil]),
            SplatNil::Nil => Value::Nil,
        },
        Value::Range { .. } => Value::array(builtins::range_items(&value)),
        other => Value::array(vec![other]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_bounds() {
        let items = vec![Value::Int(1), Value::Int(2), Value::Int(3)];
        assert_eq!(slice(&items, 1, 1), vec![Value::Int(2)]);
        assert_eq!(slice(&items, 2, 2), Vec::<Value>::new());
        assert_eq!(slice(&items, 5, 0), Vec::<Value>::new());
    }

    #[test]
    fn test_splat_nil_variants() {
        assert_eq!(splat_cast(Value::Nil, SplatNil::EmptyArray), Value::array(vec![]));
        assert_eq!(splat_cast(Value::Nil, SplatNil::ArrayWithNil), Value::array(vec![Value::Nil]));
        assert_eq!(splat_cast(Value::Nil, SplatNil::Nil), Value::Nil);
        assert_eq!(splat_cast(Value::Int(1), SplatNil::Nil), Value::array(vec![Value::Int(1)]));
    }
}
