//! Core library methods known to the evaluator

use crate::evaluator::{EvalResult, Evaluator, Unwind, raise};
use crate::value::{Closure, Exception, Value};
use std::cell::RefCell;
use std::rc::Rc;

static OBJECT_METHODS: &[&str] = &[
    "==", "!=", "!", "===", "class", "dup", "equal?", "eql?", "freeze", "inspect", "instance_of?", "is_a?",
    "kind_of?", "nil?", "respond_to?", "to_s",
];
static INTEGER_METHODS: &[&str] = &[
    "+", "-", "*", "/", "%", "<", "<=", ">", ">=", "-@", "succ", "times", "to_i", "upto", "zero?",
];
static STRING_METHODS: &[&str] = &["+", "empty?", "length", "size", "to_str", "to_sym", "upcase"];
static ARRAY_METHODS: &[&str] = &[
    "+", "<<", "[]", "[]=", "each", "each_with_index", "empty?", "first", "include?", "join", "last", "length",
    "map", "pop", "push", "select", "size", "sum", "to_a", "to_ary",
];
static HASH_METHODS: &[&str] = &[
    "[]", "[]=", "each", "empty?", "fetch", "has_key?", "include?", "key?", "keys", "size", "to_h", "values",
];
static RANGE_METHODS: &[&str] = &["===", "cover?", "each", "first", "include?", "last", "size", "to_a"];
static PROC_METHODS: &[&str] = &["()", "[]", "===", "arity", "call", "lambda?", "yield"];

static BUILTIN_CLASSES: &[&str] = &[
    "Array", "BasicObject", "Comparable", "FalseClass", "Float", "Hash", "Integer", "Kernel", "NilClass",
    "Numeric", "Object", "Proc", "Range", "String", "Symbol", "TrueClass",
];

fn superclass(class: &str) -> Option<&'static str> {
    match class {
        "BasicObject" => None,
        "Object" => Some("BasicObject"),
        "Exception" | "Numeric" => Some("Object"),
        "Integer" | "Float" => Some("Numeric"),
        "StandardError" | "ScriptError" => Some("Exception"),
        "SyntaxError" => Some("ScriptError"),
        "ArgumentError" | "IndexError" | "LocalJumpError" | "NameError" | "RuntimeError" | "TypeError"
        | "ZeroDivisionError" => Some("StandardError"),
        "KeyError" | "StopIteration" => Some("IndexError"),
        "NoMethodError" => Some("NameError"),
        _ => Some("Object"),
    }
}

/// Whether `class` is `ancestor` or inherits from it
pub(crate) fn is_a(class: &str, ancestor: &str) -> bool {
    let mut current = Some(class);
    while let Some(class) = current {
        if class == ancestor {
            return true;
        }
        current = superclass(class);
    }
    false
}

/// Constants that resolve without a definition
pub(crate) fn is_builtin_class(name: &str) -> bool {
    BUILTIN_CLASSES.contains(&name) || is_a(name, "Exception")
}

pub(crate) fn responds_to(value: &Value, name: &str) -> bool {
    let methods = match value {
        Value::Int(_) => INTEGER_METHODS,
        Value::Str(_) => STRING_METHODS,
        Value::Array(_) => ARRAY_METHODS,
        Value::Hash(_) => HASH_METHODS,
        Value::Range { .. } => RANGE_METHODS,
        Value::Proc(_) => PROC_METHODS,
        _ => &[],
    };
    methods.contains(&name) || OBJECT_METHODS.contains(&name)
}

/// Element at `index`; negative counts from the end
pub(crate) fn index(items: &[Value], index: i64) -> Value {
    let index = if index < 0 { index + items.len() as i64 } else { index };
    usize::try_from(index)
        .ok()
        .and_then(|index| items.get(index))
        .cloned()
        .unwrap_or(Value::Nil)
}

pub(crate) fn hash_get(pairs: &[(Value, Value)], key: &Value) -> Option<Value> {
    pairs
        .iter()
        .find(|(candidate, _)| candidate == key)
        .map(|(_, value)| value.clone())
}

pub(crate) fn hash_insert(pairs: &mut Vec<(Value, Value)>, key: Value, value: Value) {
    match pairs.iter_mut().find(|(candidate, _)| *candidate == key) {
        Some(entry) => entry.1 = value,
        None => pairs.push((key, value)),
    }
}

/// Integers covered by a range value
pub(crate) fn range_items(range: &Value) -> Vec<Value> {
    match range {
        Value::Range {
            begin,
            end,
            exclusive: true,
        } => (*begin..*end).map(Value::Int).collect(),
        Value::Range { begin, end, .. } => (*begin..=*end).map(Value::Int).collect(),
        _ => Vec::new(),
    }
}

fn floor_div(left: i64, right: i64) -> i64 {
    let quotient = left.wrapping_div(right);
    if left.wrapping_rem(right) != 0 && ((left < 0) != (right < 0)) {
        quotient.wrapping_sub(1)
    } else {
        quotient
    }
}

fn no_method(receiver: &Value, name: &str) -> Unwind {
    raise("NoMethodError", format!("undefined method `{name}' for {receiver}"))
}

fn int_arg(args: &[Value], name: &str) -> EvalResult<i64> {
    match args.first() {
        Some(Value::Int(value)) => Ok(*value),
        Some(other) => Err(raise(
            "TypeError",
            format!("{} can't be coerced into Integer for {name}", other.class_name()),
        )),
        None => Err(raise("ArgumentError", "wrong number of arguments (given 0, expected 1)")),
    }
}

/// Call a builtin method
pub(crate) fn call(
    evaluator: &mut Evaluator<'_>,
    receiver: Value,
    name: &str,
    args: Vec<Value>,
    block: Option<Rc<Closure>>,
) -> EvalResult {
    let handled = match &receiver {
        Value::Int(value) => integer(evaluator, *value, name, &args, block.as_ref())?,
        Value::Str(text) => string(text, name, &args)?,
        Value::Array(items) => array(evaluator, items, name, &args, block.as_ref())?,
        Value::Hash(pairs) => hash(evaluator, pairs, name, &args, block.as_ref())?,
        Value::Range { .. } => range(evaluator, &receiver, name, &args, block.as_ref())?,
        Value::Proc(closure) => procedure(evaluator, closure, name, &args, block.clone())?,
        Value::Module(module) => module_method(module, name, &args),
        Value::Exception(exception) => match name {
            "message" | "to_s" => Some(Value::Str(exception.message.clone())),
            _ => None,
        },
        _ => None,
    };
    match handled {
        Some(value) => Ok(value),
        None => object(evaluator, receiver, name, args, block),
    }
}

fn integer(
    evaluator: &mut Evaluator<'_>,
    value: i64,
    name: &str,
    args: &[Value],
    block: Option<&Rc<Closure>>,
) -> EvalResult<Option<Value>> {
    let result = match name {
        "+" => Value::Int(value.wrapping_add(int_arg(args, name)?)),
        "-" => Value::Int(value.wrapping_sub(int_arg(args, name)?)),
        "*" => Value::Int(value.wrapping_mul(int_arg(args, name)?)),
        "/" | "%" => {
            let divisor = int_arg(args, name)?;
            if divisor == 0 {
                return Err(raise("ZeroDivisionError", "divided by 0"));
            }
            let quotient = floor_div(value, divisor);
            if name == "/" {
                Value::Int(quotient)
            } else {
                Value::Int(value.wrapping_sub(quotient.wrapping_mul(divisor)))
            }
        }
        "<" => Value::Bool(value < int_arg(args, name)?),
        "<=" => Value::Bool(value <= int_arg(args, name)?),
        ">" => Value::Bool(value > int_arg(args, name)?),
        ">=" => Value::Bool(value >= int_arg(args, name)?),
        "-@" => Value::Int(value.wrapping_neg()),
        "succ" => Value::Int(value.wrapping_add(1)),
        "to_i" => Value::Int(value),
        "zero?" => Value::Bool(value == 0),
        "times" => {
            let Some(block) = block else { return Ok(None) };
            for count in 0..value {
                evaluator.call_closure(block, vec![Value::Int(count)], None)?;
            }
            Value::Int(value)
        }
        "upto" => {
            let Some(block) = block else { return Ok(None) };
            for count in value..=int_arg(args, name)? {
                evaluator.call_closure(block, vec![Value::Int(count)], None)?;
            }
            Value::Int(value)
        }
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn string(text: &str, name: &str, args: &[Value]) -> EvalResult<Option<Value>> {
    let result = match name {
        "+" => match args.first() {
            Some(Value::Str(other)) => Value::Str(format!("{text}{other}")),
            _ => return Err(raise("TypeError", "no implicit conversion into String")),
        },
        "size" | "length" => Value::Int(text.chars().count() as i64),
        "empty?" => Value::Bool(text.is_empty()),
        "to_str" => Value::str(text),
        "to_sym" => Value::sym(text),
        "upcase" => Value::Str(text.to_uppercase()),
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn array(
    evaluator: &mut Evaluator<'_>,
    items: &Rc<RefCell<Vec<Value>>>,
    name: &str,
    args: &[Value],
    block: Option<&Rc<Closure>>,
) -> EvalResult<Option<Value>> {
    let receiver = || Value::Array(Rc::clone(items));
    let result = match name {
        "[]" => index(&items.borrow(), int_arg(args, name)?),
        "[]=" => {
            let position = int_arg(args, name)?;
            let value = args.get(1).cloned().unwrap_or(Value::Nil);
            let mut items = items.borrow_mut();
            let position = if position < 0 { position + items.len() as i64 } else { position };
            let Ok(position) = usize::try_from(position) else {
                return Err(raise("IndexError", "index too small for array"));
            };
            if position >= items.len() {
                items.resize(position + 1, Value::Nil);
            }
            items[position] = value.clone();
            value
        }
        "size" | "length" => Value::Int(items.borrow().len() as i64),
        "empty?" => Value::Bool(items.borrow().is_empty()),
        "first" => items.borrow().first().cloned().unwrap_or(Value::Nil),
        "last" => items.borrow().last().cloned().unwrap_or(Value::Nil),
        "include?" => Value::Bool(args.first().is_some_and(|value| items.borrow().contains(value))),
        "push" | "<<" => {
            items.borrow_mut().extend(args.iter().cloned());
            receiver()
        }
        "pop" => items.borrow_mut().pop().unwrap_or(Value::Nil),
        "+" => match args.first().and_then(Value::as_array) {
            Some(other) => {
                let mut joined = items.borrow().clone();
                joined.extend(other);
                Value::array(joined)
            }
            None => return Err(raise("TypeError", "no implicit conversion into Array")),
        },
        "to_a" | "to_ary" => receiver(),
        "join" => {
            let separator = args.first().map(Value::to_text).unwrap_or_default();
            let parts: Vec<String> = items.borrow().iter().map(Value::to_text).collect();
            Value::Str(parts.join(&separator))
        }
        "sum" => {
            let mut total = 0_i64;
            for item in items.borrow().iter() {
                match item {
                    Value::Int(value) => total = total.wrapping_add(*value),
                    other => return Err(raise("TypeError", format!("{} can't be summed", other.class_name()))),
                }
            }
            Value::Int(total)
        }
        "each" | "each_with_index" | "map" | "select" => {
            let Some(block) = block else { return Ok(None) };
            // The block may change the array while it runs
            let snapshot = items.borrow().clone();
            let mut collected = Vec::new();
            for (position, item) in snapshot.into_iter().enumerate() {
                let block_args = if name == "each_with_index" {
                    vec![item.clone(), Value::Int(position as i64)]
                } else {
                    vec![item.clone()]
                };
                let result = evaluator.call_closure(block, block_args, None)?;
                match name {
                    "map" => collected.push(result),
                    "select" if result.is_truthy() => collected.push(item),
                    _ => {}
                }
            }
            match name {
                "map" | "select" => Value::array(collected),
                _ => receiver(),
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn hash(
    evaluator: &mut Evaluator<'_>,
    pairs: &Rc<RefCell<Vec<(Value, Value)>>>,
    name: &str,
    args: &[Value],
    block: Option<&Rc<Closure>>,
) -> EvalResult<Option<Value>> {
    let key = args.first().cloned().unwrap_or(Value::Nil);
    let result = match name {
        "[]" => hash_get(&pairs.borrow(), &key).unwrap_or(Value::Nil),
        "[]=" => {
            let value = args.get(1).cloned().unwrap_or(Value::Nil);
            hash_insert(&mut pairs.borrow_mut(), key, value.clone());
            value
        }
        "fetch" => match hash_get(&pairs.borrow(), &key) {
            Some(value) => value,
            None => return Err(raise("KeyError", format!("key not found: {key}"))),
        },
        "key?" | "has_key?" | "include?" => Value::Bool(hash_get(&pairs.borrow(), &key).is_some()),
        "size" => Value::Int(pairs.borrow().len() as i64),
        "empty?" => Value::Bool(pairs.borrow().is_empty()),
        "keys" => Value::array(pairs.borrow().iter().map(|(key, _)| key.clone()).collect()),
        "values" => Value::array(pairs.borrow().iter().map(|(_, value)| value.clone()).collect()),
        "to_h" => Value::Hash(Rc::clone(pairs)),
        "each" => {
            let Some(block) = block else { return Ok(None) };
            let snapshot = pairs.borrow().clone();
            for (key, value) in snapshot {
                evaluator.call_closure(block, vec![Value::array(vec![key, value])], None)?;
            }
            Value::Hash(Rc::clone(pairs))
        }
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn range(
    evaluator: &mut Evaluator<'_>,
    receiver: &Value,
    name: &str,
    args: &[Value],
    block: Option<&Rc<Closure>>,
) -> EvalResult<Option<Value>> {
    let items = range_items(receiver);
    let result = match name {
        "===" | "include?" | "cover?" => Value::Bool(args.first().is_some_and(|value| items.contains(value))),
        "to_a" => Value::array(items),
        "first" => items.first().cloned().unwrap_or(Value::Nil),
        "last" => items.last().cloned().unwrap_or(Value::Nil),
        "size" => Value::Int(items.len() as i64),
        "each" => {
            let Some(block) = block else { return Ok(None) };
            for item in items {
                evaluator.call_closure(block, vec![item], None)?;
            }
            receiver.clone()
        }
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn procedure(
    evaluator: &mut Evaluator<'_>,
    closure: &Rc<Closure>,
    name: &str,
    args: &[Value],
    block: Option<Rc<Closure>>,
) -> EvalResult<Option<Value>> {
    let result = match name {
        "call" | "()" | "yield" | "[]" | "===" => evaluator.call_closure(closure, args.to_vec(), block)?,
        "lambda?" => Value::Bool(closure.lambda),
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn module_method(module: &str, name: &str, args: &[Value]) -> Option<Value> {
    match name {
        "===" => Some(Value::Bool(
            args.first().is_some_and(|value| is_a(&value.class_name(), module)),
        )),
        "name" | "to_s" | "inspect" => Some(Value::str(module)),
        "new" if is_a(module, "Exception") => Some(Value::Exception(Rc::new(Exception {
            class: module.to_string(),
            message: args.first().map_or_else(|| module.to_string(), Value::to_text),
        }))),
        _ => None,
    }
}

/// Methods every object has, and the private helpers of `main`
fn object(
    evaluator: &mut Evaluator<'_>,
    receiver: Value,
    name: &str,
    args: Vec<Value>,
    block: Option<Rc<Closure>>,
) -> EvalResult {
    let first = args.first().cloned().unwrap_or(Value::Nil);
    match name {
        "==" | "===" | "eql?" | "equal?" => Ok(Value::Bool(receiver == first)),
        "!=" => Ok(Value::Bool(receiver != first)),
        "!" => Ok(Value::Bool(!receiver.is_truthy())),
        "nil?" => Ok(Value::Bool(matches!(receiver, Value::Nil))),
        "class" => Ok(Value::Module(receiver.class_name())),
        "is_a?" | "kind_of?" | "instance_of?" => match first {
            Value::Module(class) => Ok(Value::Bool(is_a(&receiver.class_name(), &class))),
            _ => Err(raise("TypeError", "class or module required")),
        },
        "respond_to?" => Ok(Value::Bool(evaluator.responds_to(&receiver, &first.to_text()))),
        "to_s" => Ok(Value::Str(receiver.to_text())),
        "inspect" => Ok(Value::Str(receiver.to_string())),
        "to_a" if matches!(receiver, Value::Nil) => Ok(Value::array(Vec::new())),
        "dup" => Ok(match &receiver {
            Value::Array(items) => Value::array(items.borrow().clone()),
            Value::Hash(pairs) => Value::hash(pairs.borrow().clone()),
            other => other.clone(),
        }),
        "freeze" => Ok(receiver),
        "puts" => {
            if args.is_empty() {
                evaluator.print(String::new());
            }
            for arg in &args {
                match arg.as_array() {
                    Some(items) => items.iter().for_each(|item| evaluator.print(item.to_text())),
                    None => evaluator.print(arg.to_text()),
                }
            }
            Ok(Value::Nil)
        }
        "p" => {
            for arg in &args {
                evaluator.print(arg.to_string());
            }
            Ok(match args.len() {
                0 => Value::Nil,
                1 => first,
                _ => Value::array(args),
            })
        }
        "raise" => Err(raise_from(args)),
        "lambda" | "proc" => block
            .map(Value::Proc)
            .ok_or_else(|| raise("ArgumentError", "tried to create Proc object without a block")),
        "loop" => {
            let Some(block) = block else {
                return Err(no_method(&receiver, name));
            };
            loop {
                evaluator.call_closure(&block, Vec::new(), None)?;
            }
        }
        "private" | "public" | "protected" | "module_function" => Ok(Value::Nil),
        _ => Err(no_method(&receiver, name)),
    }
}

fn raise_from(args: Vec<Value>) -> Unwind {
    match args.as_slice() {
        [] => raise("RuntimeError", "unhandled exception"),
        [Value::Str(message)] => raise("RuntimeError", message.clone()),
        [Value::Exception(exception)] => Unwind::Raise(Rc::clone(exception)),
        [Value::Module(class)] => raise(class, class.clone()),
        [Value::Module(class), message] => raise(class, message.to_text()),
        _ => raise("TypeError", "exception class/object expected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_hierarchy() {
        assert!(is_a("NoMethodError", "StandardError"));
        assert!(is_a("KeyError", "IndexError"));
        assert!(!is_a("SyntaxError", "StandardError"));
        assert!(is_a("Integer", "Object"));
    }

    #[test]
    fn test_builtin_classes() {
        assert!(is_builtin_class("ArgumentError"));
        assert!(is_builtin_class("Array"));
        assert!(!is_builtin_class("Widget"));
    }

    #[test]
    fn test_negative_index() {
        let items = vec![Value::Int(1), Value::Int(2)];
        assert_eq!(index(&items, -1), Value::Int(2));
        assert_eq!(index(&items, -3), Value::Nil);
        assert_eq!(index(&items, 2), Value::Nil);
    }

    #[test]
    fn test_floor_division() {
        assert_eq!(floor_div(7, 2), 3);
        assert_eq!(floor_div(-7, 2), -4);
        assert_eq!(floor_div(7, -2), -4);
    }

    #[test]
    fn test_destructuring_probe() {
        assert!(responds_to(&Value::array(vec![]), "to_ary"));
        assert!(!responds_to(&Value::Int(1), "to_ary"));
        assert!(!responds_to(&Value::Nil, "to_ary"));
    }
}
