//! Native library functions
//!
//! Every function has the [`NativeHandler`] signature. Argument checking
//! follows PHP 8: wrong counts raise `ArgumentCountError`, wrong types raise
//! `TypeError` naming the parameter.
//!
//! [`NativeHandler`]: crate::runtime::context::NativeHandler

pub mod array;
pub mod variable;

use crate::core::array::{OrderedDictionary, PhpArray};
use crate::core::value::PhpValue;
use crate::runtime::error::PhpError;

/// Variadic upper bound for [`expect_args`].
const VARIADIC: usize = usize::MAX;

fn plural(n: usize) -> &'static str {
    if n == 1 { "argument" } else { "arguments" }
}

fn expect_args(name: &str, args: &[PhpValue], min: usize, max: usize) -> Result<(), PhpError> {
    let given = args.len();
    if given >= min && given <= max {
        return Ok(());
    }
    let message = if min == max {
        format!("{name}() expects exactly {min} {}, {given} given", plural(min))
    } else if given < min {
        format!("{name}() expects at least {min} {}, {given} given", plural(min))
    } else {
        format!("{name}() expects at most {max} {}, {given} given", plural(max))
    };
    Err(PhpError::ArgumentCountError(message))
}

fn type_error(name: &str, index: usize, param: &str, expected: &str, given: &PhpValue) -> PhpError {
    PhpError::TypeError(format!(
        "{name}(): Argument #{} (${param}) must be of type {expected}, {} given",
        index + 1,
        given.debug_type_name()
    ))
}

/// By-value array parameter.
fn array_arg(name: &str, args: &[PhpValue], index: usize, param: &str) -> Result<PhpArray, PhpError> {
    args[index]
        .as_array()
        .ok_or_else(|| type_error(name, index, param, "array", &args[index]))
}

/// By-reference array parameter, modified in place through the caller's slot.
fn with_array_arg_mut<R>(
    name: &str,
    args: &mut [PhpValue],
    index: usize,
    param: &str,
    f: impl FnOnce(&mut OrderedDictionary) -> R,
) -> Result<R, PhpError> {
    args[index].with_deref_mut(|slot| match slot {
        PhpValue::Array(array) => Ok(f(array.make_mut())),
        other => Err(type_error(name, index, param, "array", other)),
    })?
}

/// Optional argument, `None` when omitted or null.
fn opt_arg(args: &[PhpValue], index: usize) -> Option<&PhpValue> {
    args.get(index).filter(|v| !v.is_null())
}

fn bool_arg(args: &[PhpValue], index: usize, default: bool) -> bool {
    args.get(index).map_or(default, PhpValue::to_bool)
}

fn long_arg(args: &[PhpValue], index: usize, default: i64) -> i64 {
    opt_arg(args, index).map_or(default, PhpValue::to_long)
}
