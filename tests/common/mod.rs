//! Common test helpers
//!
//! Builds request contexts backed by the standard extension and calls
//! builtins by name, the way compiled code would.

#![allow(dead_code)]

use php_runtime::core::array::{IntStringKey, OrderedDictionary, PhpArray};
use php_runtime::core::value::PhpValue;
use php_runtime::runtime::config::RuntimeConfig;
use php_runtime::runtime::context::{EngineBuilder, RequestContext};
use php_runtime::runtime::diagnostics::{CapturingErrorHandler, ErrorLevel};
use php_runtime::runtime::error::PhpError;
use std::cell::RefCell;
use std::rc::Rc;

pub type Diagnostics = Rc<RefCell<Vec<(ErrorLevel, String)>>>;

/// A request on a fresh engine with the standard extension loaded.
pub fn request() -> RequestContext {
    request_with_config(RuntimeConfig::default())
}

pub fn request_with_config(config: RuntimeConfig) -> RequestContext {
    let engine = EngineBuilder::new()
        .with_standard_extension()
        .build()
        .expect("engine build failed");
    RequestContext::with_config(engine, config)
}

/// A request whose diagnostics are collected instead of printed.
pub fn capture_context() -> (RequestContext, Diagnostics) {
    let mut ctx = request();
    let seen: Diagnostics = Rc::default();
    let sink = Rc::clone(&seen);
    ctx.set_error_handler(CapturingErrorHandler::new(move |level, message: &str| {
        sink.borrow_mut().push((level, message.to_string()));
    }));
    (ctx, seen)
}

/// Call a registered function. Returns the result and the argument slots,
/// so by-reference parameters can be inspected afterwards.
pub fn run_builtin(
    ctx: &mut RequestContext,
    name: &str,
    args: Vec<PhpValue>,
) -> Result<(PhpValue, Vec<PhpValue>), PhpError> {
    let mut args = args;
    let result = ctx.call_function(name, &mut args)?;
    Ok((result, args))
}

/// Like [`run_builtin`] but only the return value, panicking on error.
pub fn call(ctx: &mut RequestContext, name: &str, args: Vec<PhpValue>) -> PhpValue {
    run_builtin(ctx, name, args)
        .unwrap_or_else(|e| panic!("{name}() failed: {e}"))
        .0
}

/// `[v0, v1, ...]`
pub fn list<V: Into<PhpValue>>(values: impl IntoIterator<Item = V>) -> PhpValue {
    PhpValue::Array(values.into_iter().map(Into::<PhpValue>::into).collect::<PhpArray>())
}

/// `[k0 => v0, k1 => v1, ...]`
pub fn assoc<K: Into<IntStringKey>, V: Into<PhpValue>>(pairs: impl IntoIterator<Item = (K, V)>) -> PhpValue {
    PhpValue::Array(
        pairs
            .into_iter()
            .map(|(k, v)| -> (IntStringKey, PhpValue) { (k.into(), v.into()) })
            .collect::<PhpArray>(),
    )
}

/// Keys of an array value in iteration order.
pub fn keys(value: &PhpValue) -> Vec<IntStringKey> {
    value.as_array().expect("not an array").keys().collect()
}

/// Values of an array value in iteration order, dereferenced.
pub fn values(value: &PhpValue) -> Vec<PhpValue> {
    value
        .as_array()
        .expect("not an array")
        .values()
        .map(PhpValue::copy_value)
        .collect()
}

pub fn dict(value: &PhpValue) -> OrderedDictionary {
    value.as_array().expect("not an array").into_dictionary()
}
