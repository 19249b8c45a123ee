//! A PHP value and array runtime: copy-on-write values, references and the
//! ordered dictionary behind PHP arrays, with the standard array and
//! variable-handling library on top.

pub mod builtins;
pub mod core;
pub mod runtime;
