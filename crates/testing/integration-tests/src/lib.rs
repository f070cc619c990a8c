//! Integration test utilities for the Garnet translator
//!
//! Programs are translated with [`gt_driver`] and run by a small reference
//! evaluator, so tests can check what a translated program *does* rather
//! than only how its graph is printed.

mod builtins;
mod evaluator;
mod value;

pub use evaluator::{EvalError, Evaluator, Frame};
pub use value::{Closure, Exception, Value};

use anyhow::Result;
use gt_driver::{ExecUnit, TranslateConfig};
use rustc_hash::FxHashMap;

/// Everything observable after running a program
#[derive(Debug)]
pub struct Outcome {
    /// Value of the last top-level statement, or the error that ended the run
    pub result: Result<Value, EvalError>,
    /// Named top-level locals
    pub locals: FxHashMap<String, Value>,
    /// Global variables
    pub globals: FxHashMap<String, Value>,
    /// Calls made, by method name
    pub calls: FxHashMap<String, usize>,
    /// Lines printed
    pub output: Vec<String>,
}

impl Outcome {
    /// The program's value
    ///
    /// # Errors
    ///
    /// Returns the evaluation error when the program did not finish
    pub fn value(&self) -> Result<&Value> {
        self.result.as_ref().map_err(|error| anyhow::anyhow!("{error}"))
    }

    /// A top-level local; `nil` when it was never assigned
    pub fn local(&self, name: &str) -> Value {
        self.locals.get(name).cloned().unwrap_or(Value::Nil)
    }

    /// A global variable; `nil` when unset
    pub fn global(&self, name: &str) -> Value {
        self.globals.get(name).cloned().unwrap_or(Value::Nil)
    }

    /// How often `name` was called
    pub fn calls_to(&self, name: &str) -> usize {
        self.calls.get(name).copied().unwrap_or(0)
    }
}

/// Translate `source` with the default configuration
///
/// # Errors
///
/// Returns an error if the source does not translate
pub fn translate(source: &str) -> Result<ExecUnit> {
    Ok(gt_driver::translate_source(source.as_bytes(), &TranslateConfig::default())?)
}

/// Run a translated unit
pub fn execute(unit: &ExecUnit) -> Outcome {
    let mut evaluator = Evaluator::new(&unit.graph);
    let result = evaluator.run(unit.root, unit.root_frame);
    Outcome {
        result,
        locals: evaluator.locals(unit.root_frame),
        globals: evaluator.globals().clone(),
        calls: evaluator.call_counts().clone(),
        output: evaluator.output().to_vec(),
    }
}

/// Translate and run `source`
///
/// # Errors
///
/// Returns an error if the source does not translate; evaluation errors
/// are reported in [`Outcome::result`]
pub fn run(source: &str) -> Result<Outcome> {
    Ok(execute(&translate(source)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_reports_locals_and_value() {
        let outcome = run("x = 1\ny = x + 2\ny * 10").expect("translates");
        assert_eq!(outcome.value().expect("runs"), &Value::Int(30));
        assert_eq!(outcome.local("x"), Value::Int(1));
        assert_eq!(outcome.local("y"), Value::Int(3));
        assert_eq!(outcome.calls_to("+"), 1);
    }

    #[test]
    fn test_uncaught_exception_is_reported() {
        let outcome = run("raise ArgumentError, \"bad\"").expect("translates");
        assert_eq!(
            outcome.result,
            Err(EvalError::Raised {
                class: "ArgumentError".to_string(),
                message: "bad".to_string(),
            })
        );
    }

    #[test]
    fn test_output_is_captured() {
        let outcome = run("puts \"a\"\np :b\nlist = [1, 2]\nputs list").expect("translates");
        assert_eq!(outcome.output, vec!["a", ":b", "1", "2"]);
    }

    #[test]
    fn test_syntax_error_does_not_run() {
        assert!(run("def m(a, a)\nend").is_err());
    }
}
