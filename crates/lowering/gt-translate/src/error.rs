//! Failures of the translator's own bookkeeping
//!
//! User mistakes never reach here: unsupported shapes are lowered to `nil`
//! with a warning. These errors mean the environment chain is broken.

use miette::Diagnostic;
use thiserror::Error;

/// A broken translator invariant
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum InternalError {
    /// A local was declared but could not be found right after
    #[error("no slot for local variable `{name}` after declaring it")]
    #[diagnostic(code(translate::unresolved_slot))]
    UnresolvedSlot {
        /// Variable name
        name: String,
    },

    /// No enclosing environment owns assignments
    #[error("no environment owns assignments to `{name}`")]
    #[diagnostic(code(translate::no_scope_owner))]
    NoScopeOwner {
        /// Variable name
        name: String,
    },

    /// The return identifier counter wrapped around
    #[error("return identifiers exhausted")]
    #[diagnostic(code(translate::return_id_overflow))]
    ReturnIdOverflow,

    /// The environment chain did not unwind to the frame it started from
    #[error("environment chain out of balance")]
    #[diagnostic(code(translate::unbalanced_environment))]
    UnbalancedEnvironment,
}

/// Fatal translation failure with the position it was detected at
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[error("{file}:{line}: internal translator error: {error}")]
#[diagnostic(code(translate::internal))]
pub struct TranslateError {
    /// File being translated
    pub file: String,
    /// 1-based line
    pub line: u32,
    /// What broke
    #[source]
    pub error: InternalError,
}

pub(crate) type TResult<T> = Result<T, TranslateError>;
