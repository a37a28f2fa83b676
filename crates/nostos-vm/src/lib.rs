//! Tree-walking evaluator for the Nostos DSL.
//!
//! The VM keeps an explicit value stack and a scope chain of environments.
//! Evaluation is single-threaded; each call owns its stack. Imports evaluate
//! re-entrantly in a child VM that shares the active-import stack so cyclic
//! imports are detected instead of recursing unboundedly.

mod builtins;
mod eval;

pub use eval::{eval, eval_with_dir, Vm};
pub use nostos_types::Value;
