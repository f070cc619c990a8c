//! Runtime value representation

#![allow(
    clippy::min_ident_chars,
    reason = "Short identifiers like i, f, b, s are conventional in value implementations"
)]

use crate::evaluator::Frame;
use gt_exec::{ExecId, FrameId, MethodId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    /// `nil`
    Nil,
    /// `true` / `false`
    Bool(bool),
    /// Integer value (i64)
    Int(i64),
    /// Float value (f64)
    Float(f64),
    /// String value
    Str(String),
    /// Symbol, without the colon
    Symbol(String),
    /// Shared mutable array
    Array(Rc<RefCell<Vec<Self>>>),
    /// Shared mutable hash, in insertion order
    Hash(Rc<RefCell<Vec<(Self, Self)>>>),
    /// Integer range
    Range {
        /// Start
        begin: i64,
        /// End
        end: i64,
        /// `...`
        exclusive: bool,
    },
    /// Block or lambda
    Proc(Rc<Closure>),
    /// Class or module, by name
    Module(String),
    /// Raised exception
    Exception(Rc<Exception>),
    /// The top-level object
    Main,
}

/// A block or lambda with the frame it was created in
pub struct Closure {
    /// Callable metadata
    pub method: MethodId,
    /// Frame layout
    pub frame: FrameId,
    /// Body
    pub body: ExecId,
    /// `->` semantics
    pub lambda: bool,
    /// Frame the closure was created in
    pub declaration: Rc<Frame>,
}

impl fmt::Debug for Closure {
    // The declaration frame may hold this closure
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("method", &self.method)
            .field("body", &self.body)
            .field("lambda", &self.lambda)
            .finish_non_exhaustive()
    }
}

/// An exception object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    /// Class name
    pub class: String,
    /// Message
    pub message: String,
}

impl Value {
    /// Array of the values
    pub fn array(values: Vec<Self>) -> Self {
        Self::Array(Rc::new(RefCell::new(values)))
    }

    /// Hash of the pairs
    pub fn hash(pairs: Vec<(Self, Self)>) -> Self {
        Self::Hash(Rc::new(RefCell::new(pairs)))
    }

    /// Symbol named `name`
    pub fn sym(name: &str) -> Self {
        Self::Symbol(name.to_string())
    }

    /// String with the text
    pub fn str(text: &str) -> Self {
        Self::Str(text.to_string())
    }

    /// Get the value as an integer, if possible
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Copy of the elements, if this is an array
    #[must_use]
    pub fn as_array(&self) -> Option<Vec<Self>> {
        match self {
            Self::Array(items) => Some(items.borrow().clone()),
            _ => None,
        }
    }

    /// Everything except `nil` and `false` is true
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }

    /// Name of the value's class
    pub fn class_name(&self) -> String {
        match self {
            Self::Nil => "NilClass".to_string(),
            Self::Bool(true) => "TrueClass".to_string(),
            Self::Bool(false) => "FalseClass".to_string(),
            Self::Int(_) => "Integer".to_string(),
            Self::Float(_) => "Float".to_string(),
            Self::Str(_) => "String".to_string(),
            Self::Symbol(_) => "Symbol".to_string(),
            Self::Array(_) => "Array".to_string(),
            Self::Hash(_) => "Hash".to_string(),
            Self::Range { .. } => "Range".to_string(),
            Self::Proc(_) => "Proc".to_string(),
            Self::Module(_) => "Class".to_string(),
            Self::Exception(exception) => exception.class.clone(),
            Self::Main => "Object".to_string(),
        }
    }

    /// Text produced by `to_s`
    pub fn to_text(&self) -> String {
        match self {
            Self::Nil => String::new(),
            Self::Str(s) | Self::Symbol(s) | Self::Module(s) => s.clone(),
            Self::Exception(exception) => exception.message.clone(),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    #[allow(clippy::float_cmp, reason = "Direct float comparison is intentional for interpreter semantics")]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) | (Self::Main, Self::Main) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (*a as f64) == *b,
            (Self::Str(a), Self::Str(b))
            | (Self::Symbol(a), Self::Symbol(b))
            | (Self::Module(a), Self::Module(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Self::Hash(a), Self::Hash(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (
                Self::Range {
                    begin: a_begin,
                    end: a_end,
                    exclusive: a_exclusive,
                },
                Self::Range {
                    begin: b_begin,
                    end: b_end,
                    exclusive: b_exclusive,
                },
            ) => a_begin == b_begin && a_end == b_end && a_exclusive == b_exclusive,
            (Self::Proc(a), Self::Proc(b)) => Rc::ptr_eq(a, b),
            (Self::Exception(a), Self::Exception(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Formats like `inspect`
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Symbol(s) => write!(f, ":{s}"),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Hash(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}=>{value}")?;
                }
                write!(f, "}}")
            }
            Self::Range { begin, end, exclusive } => {
                write!(f, "{begin}{}{end}", if *exclusive { "..." } else { ".." })
            }
            Self::Proc(closure) => write!(f, "#<Proc{}>", if closure.lambda { " (lambda)" } else { "" }),
            Self::Module(name) => write!(f, "{name}"),
            Self::Exception(exception) => write!(f, "#<{}: {}>", exception.class, exception.message),
            Self::Main => write!(f, "main"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::str("").is_truthy());
    }

    #[test]
    fn test_inspect() {
        let value = Value::array(vec![Value::Int(1), Value::str("a"), Value::sym("b"), Value::Nil]);
        assert_eq!(value.to_string(), "[1, \"a\", :b, nil]");
        assert_eq!(Value::hash(vec![(Value::sym("k"), Value::Int(1))]).to_string(), "{:k=>1}");
        assert_eq!(Value::Nil.to_text(), "");
    }

    #[test]
    fn test_arrays_compare_by_contents() {
        assert_eq!(Value::array(vec![Value::Int(1)]), Value::array(vec![Value::Int(1)]));
        assert_ne!(Value::array(vec![Value::Int(1)]), Value::array(vec![Value::Int(2)]));
        assert_eq!(Value::Int(1), Value::Float(1.0));
    }
}
