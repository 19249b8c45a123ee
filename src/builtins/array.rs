use super::{
    VARIADIC, array_arg, bool_arg, expect_args, long_arg, opt_arg, type_error, with_array_arg_mut,
};
use crate::core::alias::PhpAlias;
use crate::core::array::{Entry, IntStringKey, OrderedDictionary, PhpArray, SetOperation, separate_slot};
use crate::core::compare::{self, SortFlags};
use crate::core::value::PhpValue;
use crate::runtime::context::RequestContext;
use crate::runtime::diagnostics::ErrorLevel;
use crate::runtime::error::PhpError;
use std::cmp::Ordering;

const COUNT_RECURSIVE: i64 = 1;

pub fn php_count(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("count", args, 1, 2)?;
    let array = args[0]
        .as_array()
        .ok_or_else(|| type_error("count", 0, "value", "Countable|array", &args[0]))?;
    let count = if long_arg(args, 1, 0) == COUNT_RECURSIVE {
        count_recursive(ctx, &array, &mut Vec::new())
    } else {
        array.len()
    };
    Ok(PhpValue::Long(count as i64))
}

/// Nested arrays reachable only through a reference can form a cycle; each
/// reference is entered at most once per path.
fn count_recursive(ctx: &mut RequestContext, dict: &OrderedDictionary, path: &mut Vec<PhpAlias>) -> usize {
    let mut count = 0;
    for value in dict.values() {
        count += 1;
        match value {
            PhpValue::Array(nested) => count += count_recursive(ctx, nested, path),
            PhpValue::Alias(alias) => {
                if path.iter().any(|seen| seen.ptr_eq(alias)) {
                    ctx.report(ErrorLevel::Warning, "count(): Recursion detected");
                    continue;
                }
                if let Some(nested) = alias.get().as_array() {
                    path.push(alias.clone());
                    count += count_recursive(ctx, &nested, path);
                    path.pop();
                }
            }
            _ => {}
        }
    }
    count
}

// ---- sorting ----

fn key_order(a: &IntStringKey, b: &IntStringKey, flags: SortFlags) -> Ordering {
    match flags {
        SortFlags::Regular => compare::compare_keys(a, b),
        _ => compare::compare_with_flags(&a.to_value(), &b.to_value(), flags),
    }
}

/// Shared body of the flag-driven sorts.
/// Reference: $PHP_SRC_PATH/ext/standard/array.c - php_get_data_compare_func
fn flag_sort(
    name: &str,
    args: &mut [PhpValue],
    preserve_keys: bool,
    by_key: bool,
    descending: bool,
) -> Result<PhpValue, PhpError> {
    expect_args(name, args, 1, 2)?;
    let flags = SortFlags::from_long(long_arg(args, 1, 0));
    with_array_arg_mut(name, args, 0, "array", |dict| {
        dict.sort_by(preserve_keys, |a, b| {
            let order = if by_key {
                key_order(&a.0, &b.0, flags)
            } else {
                compare::compare_with_flags(&a.1, &b.1, flags)
            };
            if descending { order.reverse() } else { order }
        })
    })?;
    Ok(PhpValue::Bool(true))
}

/// Shared body of `usort`, `uasort` and `uksort`.
///
/// The callback may touch the array being sorted, so the sort runs on a
/// separate copy that replaces the argument only when every comparison
/// succeeded.
fn user_sort(
    ctx: &mut RequestContext,
    name: &str,
    args: &mut [PhpValue],
    preserve_keys: bool,
    by_key: bool,
) -> Result<PhpValue, PhpError> {
    expect_args(name, args, 2, 2)?;
    let callback = args[1].copy_value();
    ctx.expect_callable(&callback, name, 2)?;
    let mut array = array_arg(name, args, 0, "array")?;
    array.make_mut().try_sort_by(preserve_keys, |a: &Entry, b: &Entry| {
        let mut pair = if by_key {
            [a.0.to_value(), b.0.to_value()]
        } else {
            [a.1.copy_value(), b.1.copy_value()]
        };
        Ok::<_, PhpError>(ctx.call_callable(&callback, &mut pair)?.to_long().cmp(&0))
    })?;
    args[0].assign(PhpValue::Array(array));
    Ok(PhpValue::Bool(true))
}

pub fn php_sort(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    flag_sort("sort", args, false, false, false)
}

pub fn php_rsort(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    flag_sort("rsort", args, false, false, true)
}

pub fn php_asort(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    flag_sort("asort", args, true, false, false)
}

pub fn php_arsort(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    flag_sort("arsort", args, true, false, true)
}

pub fn php_ksort(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    flag_sort("ksort", args, true, true, false)
}

pub fn php_krsort(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    flag_sort("krsort", args, true, true, true)
}

pub fn php_usort(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    user_sort(ctx, "usort", args, false, false)
}

pub fn php_uasort(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    user_sort(ctx, "uasort", args, true, false)
}

pub fn php_uksort(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    user_sort(ctx, "uksort", args, true, true)
}

pub fn php_shuffle(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("shuffle", args, 1, 1)?;
    with_array_arg_mut("shuffle", args, 0, "array", |dict| dict.shuffle(ctx.rng_mut()))?;
    Ok(PhpValue::Bool(true))
}

pub fn php_array_reverse(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_reverse", args, 1, 2)?;
    let preserve_keys = bool_arg(args, 1, false);
    let mut dict = array_arg("array_reverse", args, 0, "array")?.into_dictionary();
    dict.reverse();
    if !preserve_keys {
        dict.renumber_int_keys();
    }
    Ok(PhpValue::from(dict))
}

// ---- difference / intersection ----

fn value_order(a: &Entry, b: &Entry) -> Ordering {
    a.1.to_php_string().cmp(&b.1.to_php_string())
}

fn key_identity(a: &Entry, b: &Entry) -> Ordering {
    compare::key_identity_order(&a.0, &b.0)
}

fn assoc_order(a: &Entry, b: &Entry) -> Ordering {
    key_identity(a, b).then_with(|| value_order(a, b))
}

fn array_args(name: &str, args: &[PhpValue], count: usize) -> Result<Vec<PhpArray>, PhpError> {
    (0..count)
        .map(|i| array_arg(name, args, i, if i == 0 { "array" } else { "arrays" }))
        .collect()
}

fn set_operation(
    name: &str,
    args: &[PhpValue],
    op: SetOperation,
    compare: fn(&Entry, &Entry) -> Ordering,
) -> Result<PhpValue, PhpError> {
    expect_args(name, args, 1, VARIADIC)?;
    let arrays = array_args(name, args, args.len())?;
    let others: Vec<&OrderedDictionary> = arrays[1..].iter().map(|a| &**a).collect();
    Ok(PhpValue::from(arrays[0].set_operation(op, &others, compare)))
}

/// Set operation comparing values by their string form. Every element is
/// converted once up front, so arrays warn and objects without
/// `__toString` throw before anything is compared.
fn string_set_operation(
    ctx: &mut RequestContext,
    name: &str,
    args: &[PhpValue],
    op: SetOperation,
    compare: fn(&Entry, &Entry) -> Ordering,
) -> Result<PhpValue, PhpError> {
    expect_args(name, args, 1, VARIADIC)?;
    let arrays = array_args(name, args, args.len())?;
    let mut converted = Vec::with_capacity(arrays.len());
    for array in &arrays {
        let mut strings = OrderedDictionary::with_capacity(array.len());
        for (key, value) in array.iter() {
            strings.insert(key, PhpValue::String(ctx.convert_to_string(value)?));
        }
        converted.push(strings);
    }
    let others: Vec<&OrderedDictionary> = converted[1..].iter().collect();
    let kept = converted[0].set_operation(op, &others, compare);

    let mut result = OrderedDictionary::new();
    for (key, value) in arrays[0].iter() {
        if kept.contains_key(&key) {
            result.insert(key, separate_slot(value));
        }
    }
    Ok(PhpValue::from(result))
}

pub fn php_array_diff(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    string_set_operation(ctx, "array_diff", args, SetOperation::Difference, value_order)
}

pub fn php_array_diff_key(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    set_operation("array_diff_key", args, SetOperation::Difference, key_identity)
}

pub fn php_array_diff_assoc(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    string_set_operation(ctx, "array_diff_assoc", args, SetOperation::Difference, assoc_order)
}

pub fn php_array_intersect(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    string_set_operation(ctx, "array_intersect", args, SetOperation::Intersection, value_order)
}

pub fn php_array_intersect_key(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    set_operation("array_intersect_key", args, SetOperation::Intersection, key_identity)
}

pub fn php_array_intersect_assoc(
    ctx: &mut RequestContext,
    args: &mut [PhpValue],
) -> Result<PhpValue, PhpError> {
    string_set_operation(ctx, "array_intersect_assoc", args, SetOperation::Intersection, assoc_order)
}

/// `array_udiff($array, ...$arrays, $callback)`
pub fn php_array_udiff(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_udiff", args, 2, VARIADIC)?;
    let last = args.len() - 1;
    let callback = args[last].copy_value();
    ctx.expect_callable(&callback, "array_udiff", args.len())?;
    let arrays = array_args("array_udiff", args, last)?;
    let others: Vec<&OrderedDictionary> = arrays[1..].iter().map(|a| &**a).collect();
    let result = arrays[0].try_set_operation(SetOperation::Difference, &others, |a, b| {
        let mut pair = [a.1.copy_value(), b.1.copy_value()];
        Ok::<_, PhpError>(ctx.call_callable(&callback, &mut pair)?.to_long().cmp(&0))
    })?;
    Ok(PhpValue::from(result))
}

/// Keeps the first entry of every group of equal values.
/// Reference: $PHP_SRC_PATH/ext/standard/array.c - PHP_FUNCTION(array_unique)
pub fn php_array_unique(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_unique", args, 1, 2)?;
    let array = array_arg("array_unique", args, 0, "array")?;
    let flags = SortFlags::from_long(long_arg(args, 1, 2));
    let duplicates = match flags {
        SortFlags::String => array.select_duplicates(|_, value| value.to_php_string()),
        _ => array.select_duplicates_by(|a, b| compare::compare_with_flags(a, b, flags)),
    };
    let mut dict = array.into_dictionary();
    for (key, _) in duplicates {
        dict.remove(&key);
    }
    Ok(PhpValue::from(dict))
}

// ---- stack and queue ----

pub fn php_array_push(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_push", args, 1, VARIADIC)?;
    let (target, values) = args.split_at_mut(1);
    let count = with_array_arg_mut("array_push", target, 0, "array", |dict| {
        for value in values.iter() {
            if dict.push(value.copy_value()).is_none() {
                return Err(PhpError::Error(
                    "Cannot add element to the array as the next element is already occupied".into(),
                ));
            }
        }
        Ok(dict.len())
    })??;
    Ok(PhpValue::Long(count as i64))
}

pub fn php_array_pop(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_pop", args, 1, 1)?;
    let popped = with_array_arg_mut("array_pop", args, 0, "array", |dict| {
        let popped = dict.pop();
        dict.move_first();
        popped
    })?;
    Ok(popped.map_or(PhpValue::Null, |(_, value)| value.into_dereferenced()))
}

pub fn php_array_shift(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_shift", args, 1, 1)?;
    let shifted = with_array_arg_mut("array_shift", args, 0, "array", |dict| {
        let shifted = dict.shift();
        dict.move_first();
        shifted
    })?;
    Ok(shifted.map_or(PhpValue::Null, |(_, value)| value.into_dereferenced()))
}

pub fn php_array_unshift(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_unshift", args, 1, VARIADIC)?;
    let (target, values) = args.split_at_mut(1);
    let count = with_array_arg_mut("array_unshift", target, 0, "array", |dict| {
        dict.unshift(values.iter().map(PhpValue::copy_value).collect());
        dict.len()
    })?;
    Ok(PhpValue::Long(count as i64))
}

// ---- projections ----

fn values_match(needle: &PhpValue, candidate: &PhpValue, strict: bool) -> bool {
    if strict {
        compare::strict_equals(needle, candidate)
    } else {
        compare::loose_equals(needle, candidate)
    }
}

pub fn php_array_keys(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_keys", args, 1, 3)?;
    let array = array_arg("array_keys", args, 0, "array")?;
    let filter = args.get(1);
    let strict = bool_arg(args, 2, false);
    let keys: PhpArray = array
        .iter()
        .filter(|(_, value)| filter.is_none_or(|needle| values_match(needle, value, strict)))
        .map(|(key, _)| key.to_value())
        .collect();
    Ok(PhpValue::Array(keys))
}

pub fn php_array_values(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_values", args, 1, 1)?;
    let array = array_arg("array_values", args, 0, "array")?;
    if array.is_list() {
        return Ok(PhpValue::Array(array));
    }
    Ok(PhpValue::Array(array.values().map(PhpValue::copy_value).collect()))
}

/// Integer keys are renumbered, string keys from later arrays overwrite.
pub fn php_array_merge(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    let mut result = OrderedDictionary::with_capacity(ctx.config.array_initial_capacity);
    for array in array_args("array_merge", args, args.len())? {
        for (key, value) in array.iter() {
            match key {
                IntStringKey::Int(_) => {
                    result.push(value.copy_value());
                }
                key => result.set(key, value.copy_value()),
            }
        }
    }
    Ok(PhpValue::from(result))
}

/// Reference: $PHP_SRC_PATH/ext/standard/array.c - PHP_FUNCTION(array_slice)
pub fn php_array_slice(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_slice", args, 2, 4)?;
    let array = array_arg("array_slice", args, 0, "array")?;
    let preserve_keys = bool_arg(args, 3, false);
    let len = array.len() as i64;

    let mut offset = long_arg(args, 1, 0);
    if offset > len {
        return Ok(PhpValue::Array(PhpArray::new()));
    }
    if offset < 0 {
        offset = (len + offset).max(0);
    }
    let length = match opt_arg(args, 2).map(PhpValue::to_long) {
        None => len - offset,
        Some(l) if l < 0 => (len - offset + l).max(0),
        Some(l) => l.min(len - offset),
    };

    let mut result = OrderedDictionary::with_capacity(length as usize);
    for (key, value) in array.iter().skip(offset as usize).take(length as usize) {
        match key {
            IntStringKey::Int(_) if !preserve_keys => {
                result.push(value.copy_value());
            }
            key => result.set(key, value.copy_value()),
        }
    }
    Ok(PhpValue::from(result))
}

pub fn php_array_chunk(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_chunk", args, 2, 3)?;
    let array = array_arg("array_chunk", args, 0, "array")?;
    let size = long_arg(args, 1, 0);
    if size < 1 {
        return Err(PhpError::ValueError(
            "array_chunk(): Argument #2 ($length) must be greater than 0".into(),
        ));
    }
    let preserve_keys = bool_arg(args, 2, false);

    let mut chunks = OrderedDictionary::new();
    let mut chunk = OrderedDictionary::new();
    for (key, value) in array.iter() {
        if preserve_keys {
            chunk.set(key, value.copy_value());
        } else {
            chunk.push(value.copy_value());
        }
        if chunk.len() as i64 == size {
            chunks.push(PhpValue::from(std::mem::take(&mut chunk)));
        }
    }
    if !chunk.is_empty() {
        chunks.push(PhpValue::from(chunk));
    }
    Ok(PhpValue::from(chunks))
}

// ---- lookup ----

pub fn php_array_key_exists(ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_key_exists", args, 2, 2)?;
    let array = array_arg("array_key_exists", args, 1, "array")?;
    let key = ctx.convert_to_key(&args[0]).map_err(|_| {
        PhpError::TypeError(
            "array_key_exists(): Argument #1 ($key) must be a valid array offset type".into(),
        )
    })?;
    Ok(PhpValue::Bool(array.contains_key(&key)))
}

fn search(dict: &OrderedDictionary, needle: &PhpValue, strict: bool) -> Option<IntStringKey> {
    dict.iter()
        .find(|(_, value)| values_match(needle, value, strict))
        .map(|(key, _)| key)
}

pub fn php_in_array(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("in_array", args, 2, 3)?;
    let haystack = array_arg("in_array", args, 1, "haystack")?;
    let found = search(&haystack, &args[0], bool_arg(args, 2, false)).is_some();
    Ok(PhpValue::Bool(found))
}

pub fn php_array_search(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_search", args, 2, 3)?;
    let haystack = array_arg("array_search", args, 1, "haystack")?;
    Ok(search(&haystack, &args[0], bool_arg(args, 2, false))
        .map_or(PhpValue::Bool(false), |key| key.to_value()))
}

pub fn php_array_is_list(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_is_list", args, 1, 1)?;
    let array = array_arg("array_is_list", args, 0, "array")?;
    Ok(PhpValue::Bool(array.is_list()))
}

pub fn php_array_key_first(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_key_first", args, 1, 1)?;
    let array = array_arg("array_key_first", args, 0, "array")?;
    Ok(array.first().map_or(PhpValue::Null, |(key, _)| key.to_value()))
}

pub fn php_array_key_last(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("array_key_last", args, 1, 1)?;
    let array = array_arg("array_key_last", args, 0, "array")?;
    Ok(array.last().map_or(PhpValue::Null, |(key, _)| key.to_value()))
}

// ---- internal pointer ----

fn pointer_result(value: Option<&PhpValue>) -> PhpValue {
    value.map_or(PhpValue::Bool(false), PhpValue::copy_value)
}

pub fn php_current(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("current", args, 1, 1)?;
    let array = array_arg("current", args, 0, "array")?;
    Ok(pointer_result(array.current()))
}

pub fn php_key(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("key", args, 1, 1)?;
    let array = array_arg("key", args, 0, "array")?;
    Ok(array.current_key().map_or(PhpValue::Null, |key| key.to_value()))
}

pub fn php_next(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("next", args, 1, 1)?;
    with_array_arg_mut("next", args, 0, "array", |dict| pointer_result(dict.move_next()))
}

pub fn php_prev(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("prev", args, 1, 1)?;
    with_array_arg_mut("prev", args, 0, "array", |dict| pointer_result(dict.move_prev()))
}

pub fn php_reset(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("reset", args, 1, 1)?;
    with_array_arg_mut("reset", args, 0, "array", |dict| pointer_result(dict.move_first()))
}

pub fn php_end(_ctx: &mut RequestContext, args: &mut [PhpValue]) -> Result<PhpValue, PhpError> {
    expect_args("end", args, 1, 1)?;
    with_array_arg_mut("end", args, 0, "array", |dict| pointer_result(dict.move_last()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::array::ArrayBuilder;
    use crate::runtime::context::EngineContext;

    fn ctx() -> RequestContext {
        RequestContext::new(EngineContext::new().unwrap())
    }

    fn keys(value: &PhpValue) -> Vec<String> {
        value.as_array().unwrap().keys().map(|k| k.to_string()).collect()
    }

    #[test]
    fn sort_renumbers_and_asort_keeps_keys() {
        let mut ctx = ctx();
        let source = PhpValue::from(ArrayBuilder::new().insert("b", 2).insert("a", 10).insert("c", 1).finish());

        let mut args = [source.clone()];
        php_sort(&mut ctx, &mut args).unwrap();
        assert_eq!(keys(&args[0]), vec!["0", "1", "2"]);

        let mut args = [source.clone()];
        php_arsort(&mut ctx, &mut args).unwrap();
        assert_eq!(keys(&args[0]), vec!["a", "b", "c"]);

        // the caller's copy is untouched
        assert_eq!(keys(&source), vec!["b", "a", "c"]);
    }

    #[test]
    fn sort_writes_through_reference() {
        let mut ctx = ctx();
        let alias = PhpAlias::new(PhpValue::from(ArrayBuilder::new().push(3).push(1).push(2).finish()));
        php_sort(&mut ctx, &mut [PhpValue::Alias(alias.clone())]).unwrap();
        let sorted: Vec<i64> = alias.get().as_array().unwrap().values().map(|v| v.to_long()).collect();
        assert_eq!(sorted, vec![1, 2, 3]);
    }

    #[test]
    fn usort_failure_leaves_array_unchanged() {
        let mut ctx = ctx();
        let failing = ctx.new_closure(|_, _| Err(PhpError::Error("boom".into())));
        let mut args = [
            PhpValue::from(ArrayBuilder::new().push(2).push(1).finish()),
            failing,
        ];
        assert!(php_usort(&mut ctx, &mut args).is_err());
        assert_eq!(args[0].as_array().unwrap().get_int(0), Some(&PhpValue::Long(2)));
    }

    #[test]
    fn array_push_reports_new_count() {
        let mut ctx = ctx();
        let mut args = [
            PhpValue::from(ArrayBuilder::new().push("a").finish()),
            PhpValue::from("b"),
            PhpValue::from("c"),
        ];
        assert_eq!(php_array_push(&mut ctx, &mut args).unwrap(), PhpValue::Long(3));
        assert_eq!(keys(&args[0]), vec!["0", "1", "2"]);
    }

    #[test]
    fn wrong_argument_type_is_type_error() {
        let mut ctx = ctx();
        let err = php_sort(&mut ctx, &mut [PhpValue::Long(1)]).unwrap_err();
        assert_eq!(
            err.message(),
            "sort(): Argument #1 ($array) must be of type array, int given"
        );
        let err = php_count(&mut ctx, &mut []).unwrap_err();
        assert_eq!(err, PhpError::ArgumentCountError("count() expects at least 1 argument, 0 given".into()));
    }

    #[test]
    fn slice_handles_negative_bounds() {
        let mut ctx = ctx();
        let list = PhpValue::from(ArrayBuilder::new().push(1).push(2).push(3).push(4).finish());
        let mut args = [list, PhpValue::Long(-3), PhpValue::Long(-1)];
        let slice = php_array_slice(&mut ctx, &mut args).unwrap();
        let values: Vec<i64> = slice.as_array().unwrap().values().map(|v| v.to_long()).collect();
        assert_eq!(values, vec![2, 3]);
    }

    #[test]
    fn pointer_functions_walk_the_array() {
        let mut ctx = ctx();
        let mut args = [PhpValue::from(ArrayBuilder::new().insert("x", 1).insert("y", 2).finish())];
        assert_eq!(php_next(&mut ctx, &mut args).unwrap(), PhpValue::Long(2));
        assert_eq!(php_key(&mut ctx, &mut args).unwrap(), PhpValue::from("y"));
        assert_eq!(php_next(&mut ctx, &mut args).unwrap(), PhpValue::Bool(false));
        assert_eq!(php_key(&mut ctx, &mut args).unwrap(), PhpValue::Null);
        assert_eq!(php_reset(&mut ctx, &mut args).unwrap(), PhpValue::Long(1));
        assert_eq!(php_end(&mut ctx, &mut args).unwrap(), PhpValue::Long(2));
        assert_eq!(php_prev(&mut ctx, &mut args).unwrap(), PhpValue::Long(1));
    }
}
