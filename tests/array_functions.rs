mod common;

use common::{assoc, call, capture_context, keys, list, request, request_with_config, run_builtin, values};
use php_runtime::core::array::IntStringKey;
use php_runtime::core::object::ClassDef;
use php_runtime::core::value::PhpValue;
use php_runtime::runtime::config::RuntimeConfig;
use php_runtime::runtime::diagnostics::ErrorLevel;
use php_runtime::runtime::error::PhpError;
use std::rc::Rc;

fn key(k: impl Into<IntStringKey>) -> IntStringKey {
    k.into()
}

#[test]
fn test_array_merge() {
    // array_merge(['a' => 1, 0 => 2], [0 => 3, 'b' => 4], ['a' => 5])
    let mut ctx = request();
    let a = assoc([(key("a"), 1), (key(0), 2)]);
    let b = assoc([(key(0), 3), (key("b"), 4)]);
    let c = assoc([("a", 5)]);
    let merged = call(&mut ctx, "array_merge", vec![a, b, c]);
    assert_eq!(keys(&merged), vec![key("a"), key(0), key(1), key("b")]);
    assert_eq!(values(&merged), vec![PhpValue::Long(5), PhpValue::Long(2), PhpValue::Long(3), PhpValue::Long(4)]);
}

#[test]
fn test_sort_flags() {
    let mut ctx = request();
    let input = list(["10", "9", "2", "1"]);
    let (_, args) = run_builtin(&mut ctx, "sort", vec![input.clone()]).unwrap();
    assert_eq!(args[0], list(["1", "2", "9", "10"]));

    let (_, args) = run_builtin(&mut ctx, "sort", vec![input, PhpValue::Long(2)]).unwrap();
    assert_eq!(args[0], list(["1", "10", "2", "9"]));
}

#[test]
fn test_ksort_mixed_keys() {
    let mut ctx = request();
    let input = assoc([(key("b"), 1), (key(10), 2), (key("a"), 3), (key(2), 4)]);
    let (result, args) = run_builtin(&mut ctx, "ksort", vec![input]).unwrap();
    assert_eq!(result, PhpValue::Bool(true));
    assert_eq!(keys(&args[0]), vec![key(2), key(10), key("a"), key("b")]);
}

#[test]
fn test_uasort_with_closure() {
    let mut ctx = request();
    let by_length = ctx.new_closure(|_, args| {
        let a = args[0].to_php_string().len() as i64;
        let b = args[1].to_php_string().len() as i64;
        Ok(PhpValue::Long(a - b))
    });
    let input = assoc([("x", "ccc"), ("y", "a"), ("z", "bb")]);
    let (_, args) = run_builtin(&mut ctx, "uasort", vec![input, by_length]).unwrap();
    assert_eq!(keys(&args[0]), vec![key("y"), key("z"), key("x")]);
}

#[test]
fn test_usort_rejects_non_callable() {
    let mut ctx = request();
    let err = run_builtin(&mut ctx, "usort", vec![list([2, 1]), PhpValue::from("no_such_function")])
        .unwrap_err();
    assert!(matches!(err, PhpError::TypeError(_)));
    assert!(err.message().contains("must be a valid callback"), "{err}");
}

#[test]
fn test_uksort_with_closure_sees_keys() {
    let mut ctx = request();
    let by_key_desc = ctx.new_closure(|_, args| Ok(PhpValue::Long(args[1].to_long() - args[0].to_long())));
    let input = assoc([(key(1), "a"), (key(3), "b"), (key(2), "c")]);
    let (_, args) = run_builtin(&mut ctx, "uksort", vec![input, by_key_desc]).unwrap();
    assert_eq!(keys(&args[0]), vec![key(3), key(2), key(1)]);
}

#[test]
fn test_shuffle_uses_request_seed() {
    let config = RuntimeConfig {
        random_seed: Some(99),
        ..RuntimeConfig::default()
    };
    let shuffled = || {
        let mut ctx = request_with_config(config.clone());
        let (_, args) = run_builtin(&mut ctx, "shuffle", vec![list(0..20)]).unwrap();
        args[0].clone()
    };
    let first = shuffled();
    assert_eq!(first, shuffled());
    assert_eq!(keys(&first), (0..20).map(key).collect::<Vec<_>>());
}

#[test]
fn test_array_reverse_preserve_keys() {
    let mut ctx = request();
    let input = assoc([(key("php"), 1), (key(0), 2), (key(1), 3)]);
    let renumbered = call(&mut ctx, "array_reverse", vec![input.clone()]);
    assert_eq!(keys(&renumbered), vec![key(0), key(1), key("php")]);
    let preserved = call(&mut ctx, "array_reverse", vec![input, PhpValue::Bool(true)]);
    assert_eq!(keys(&preserved), vec![key(1), key(0), key("php")]);
}

#[test]
fn test_array_diff_family() {
    let mut ctx = request();
    let a = assoc([(key("a"), "green"), (key(0), "red"), (key(1), "blue"), (key(2), "red")]);
    let b = assoc([(key("b"), "green"), (key(0), "yellow"), (key(1), "red")]);

    let diff = call(&mut ctx, "array_diff", vec![a.clone(), b.clone()]);
    assert_eq!(keys(&diff), vec![key(1)]);

    let diff_key = call(&mut ctx, "array_diff_key", vec![a.clone(), b.clone()]);
    assert_eq!(keys(&diff_key), vec![key("a"), key(2)]);

    let diff_assoc = call(&mut ctx, "array_diff_assoc", vec![a.clone(), b.clone()]);
    assert_eq!(keys(&diff_assoc), vec![key("a"), key(0), key(1), key(2)]);

    let intersect = call(&mut ctx, "array_intersect", vec![a.clone(), b.clone()]);
    assert_eq!(keys(&intersect), vec![key("a"), key(0), key(2)]);

    let intersect_assoc = call(&mut ctx, "array_intersect_assoc", vec![a, b]);
    assert!(keys(&intersect_assoc).is_empty());
}

#[test]
fn test_array_diff_converts_values_with_diagnostics() {
    let (mut ctx, seen) = capture_context();
    let left = list([list([1]), PhpValue::from("x")]);
    let diff = call(&mut ctx, "array_diff", vec![left.clone(), list(["Array"])]);
    assert_eq!(keys(&diff), vec![key(1)]);
    assert_eq!(
        *seen.borrow(),
        vec![(ErrorLevel::Warning, "Array to string conversion".to_string())]
    );

    seen.borrow_mut().clear();
    let both = call(&mut ctx, "array_intersect", vec![left.clone(), left]);
    assert_eq!(keys(&both), vec![key(0), key(1)]);
    assert_eq!(seen.borrow().len(), 2);

    let object = ctx.new_object(Rc::new(ClassDef::new("Foo")));
    let err = run_builtin(&mut ctx, "array_diff", vec![list([PhpValue::Object(object)]), list([1])]).unwrap_err();
    assert_eq!(
        err,
        PhpError::TypeError("Object of class Foo could not be converted to string".into())
    );
}

#[test]
fn test_array_diff_rejects_scalar() {
    let mut ctx = request();
    let err = run_builtin(&mut ctx, "array_diff", vec![list([1]), PhpValue::Long(1)]).unwrap_err();
    assert_eq!(
        err.message(),
        "array_diff(): Argument #2 ($arrays) must be of type array, int given"
    );
}

#[test]
fn test_array_unique_keeps_first() {
    let mut ctx = request();
    let input = assoc([(key("a"), PhpValue::from("green")), (key(0), PhpValue::from("red")), (key("b"), PhpValue::from("green")), (key(1), PhpValue::Long(4)), (key(2), PhpValue::from("4"))]);
    let unique = call(&mut ctx, "array_unique", vec![input]);
    assert_eq!(keys(&unique), vec![key("a"), key(0), key(1)]);
}

#[test]
fn test_array_unique_loose_flags() {
    let mut ctx = request();
    let input = list([
        PhpValue::Long(4),
        PhpValue::from("4"),
        PhpValue::from("3"),
        PhpValue::Long(4),
        PhpValue::Long(3),
        PhpValue::from("3"),
    ]);
    for flags in [0, 1] {
        let unique = call(&mut ctx, "array_unique", vec![input.clone(), PhpValue::Long(flags)]);
        assert_eq!(keys(&unique), vec![key(0), key(2)], "flags {flags}");
        assert_eq!(values(&unique), vec![PhpValue::Long(4), PhpValue::from("3")]);
    }

    let many = list((0..2000).map(|i| PhpValue::Long(i % 7)));
    let unique = call(&mut ctx, "array_unique", vec![many, PhpValue::Long(0)]);
    assert_eq!(keys(&unique), (0..7i64).map(key).collect::<Vec<_>>());
}

#[test]
fn test_push_pop_shift_unshift() {
    let mut ctx = request();
    let (count, args) = run_builtin(&mut ctx, "array_push", vec![list([1]), PhpValue::Long(2), PhpValue::Long(3)]).unwrap();
    assert_eq!(count, PhpValue::Long(3));
    let stack = args.into_iter().next().unwrap();

    let (popped, args) = run_builtin(&mut ctx, "array_pop", vec![stack]).unwrap();
    assert_eq!(popped, PhpValue::Long(3));
    let stack = args.into_iter().next().unwrap();

    let (shifted, args) = run_builtin(&mut ctx, "array_shift", vec![stack]).unwrap();
    assert_eq!(shifted, PhpValue::Long(1));
    let stack = args.into_iter().next().unwrap();
    assert_eq!(stack, list([2]));

    let (count, args) = run_builtin(&mut ctx, "array_unshift", vec![stack, PhpValue::from("a"), PhpValue::from("b")]).unwrap();
    assert_eq!(count, PhpValue::Long(3));
    assert_eq!(args[0], list([PhpValue::from("a"), PhpValue::from("b"), PhpValue::Long(2)]));

    let (empty, _) = run_builtin(&mut ctx, "array_pop", vec![list(Vec::<i64>::new())]).unwrap();
    assert_eq!(empty, PhpValue::Null);
}

#[test]
fn test_array_pop_steps_next_key_back() {
    let mut ctx = request();
    let (_, args) = run_builtin(&mut ctx, "array_pop", vec![list([1, 2, 3])]).unwrap();
    let (_, args) = run_builtin(&mut ctx, "array_push", vec![args[0].clone(), PhpValue::Long(9)]).unwrap();
    assert_eq!(keys(&args[0]), vec![key(0), key(1), key(2)]);
}

#[test]
fn test_keys_values_search() {
    let mut ctx = request();
    let input = assoc([(key("a"), PhpValue::Long(1)), (key("b"), PhpValue::from("1")), (key("c"), PhpValue::Long(2))]);

    let all = call(&mut ctx, "array_keys", vec![input.clone()]);
    assert_eq!(all, list(["a", "b", "c"]));
    let loose = call(&mut ctx, "array_keys", vec![input.clone(), PhpValue::Long(1)]);
    assert_eq!(loose, list(["a", "b"]));
    let strict = call(&mut ctx, "array_keys", vec![input.clone(), PhpValue::Long(1), PhpValue::Bool(true)]);
    assert_eq!(strict, list(["a"]));

    assert_eq!(call(&mut ctx, "array_values", vec![input.clone()]), list([PhpValue::Long(1), PhpValue::from("1"), PhpValue::Long(2)]));
    assert_eq!(call(&mut ctx, "array_search", vec![PhpValue::Long(2), input.clone()]), PhpValue::from("c"));
    assert_eq!(call(&mut ctx, "array_search", vec![PhpValue::Long(7), input.clone()]), PhpValue::Bool(false));
    assert_eq!(call(&mut ctx, "in_array", vec![PhpValue::from("2"), input.clone()]), PhpValue::Bool(true));
    assert_eq!(call(&mut ctx, "in_array", vec![PhpValue::from("2"), input, PhpValue::Bool(true)]), PhpValue::Bool(false));
}

#[test]
fn test_key_exists_and_bounds() {
    let mut ctx = request();
    let input = assoc([(key("x"), PhpValue::Null), (key(5), PhpValue::Long(1))]);
    assert_eq!(call(&mut ctx, "array_key_exists", vec![PhpValue::from("x"), input.clone()]), PhpValue::Bool(true));
    assert_eq!(call(&mut ctx, "key_exists", vec![PhpValue::from("5"), input.clone()]), PhpValue::Bool(true));
    assert_eq!(call(&mut ctx, "array_key_first", vec![input.clone()]), PhpValue::from("x"));
    assert_eq!(call(&mut ctx, "array_key_last", vec![input.clone()]), PhpValue::Long(5));
    assert_eq!(call(&mut ctx, "array_is_list", vec![input]), PhpValue::Bool(false));
    assert_eq!(call(&mut ctx, "array_is_list", vec![list([1, 2])]), PhpValue::Bool(true));
}

#[test]
fn test_slice_and_chunk() {
    let mut ctx = request();
    let input = assoc([(key(10), "a"), (key("k"), "b"), (key(11), "c"), (key(12), "d")]);
    let slice = call(&mut ctx, "array_slice", vec![input.clone(), PhpValue::Long(1), PhpValue::Long(2)]);
    assert_eq!(keys(&slice), vec![key("k"), key(0)]);
    let kept = call(&mut ctx, "array_slice", vec![input.clone(), PhpValue::Long(-2), PhpValue::Null, PhpValue::Bool(true)]);
    assert_eq!(keys(&kept), vec![key(11), key(12)]);

    let chunks = call(&mut ctx, "array_chunk", vec![input.clone(), PhpValue::Long(3)]);
    assert_eq!(keys(&chunks), vec![key(0), key(1)]);
    let err = run_builtin(&mut ctx, "array_chunk", vec![input, PhpValue::Long(0)]).unwrap_err();
    assert!(matches!(err, PhpError::ValueError(_)));
}

#[test]
fn test_count_recursive() {
    let (mut ctx, seen) = capture_context();
    let nested = list([list([1, 2]), list([3])]);
    assert_eq!(call(&mut ctx, "count", vec![nested.clone()]), PhpValue::Long(2));
    assert_eq!(call(&mut ctx, "sizeof", vec![nested, PhpValue::Long(1)]), PhpValue::Long(5));
    assert!(seen.borrow().is_empty());

    let err = run_builtin(&mut ctx, "count", vec![PhpValue::Long(3)]).unwrap_err();
    assert_eq!(
        err.message(),
        "count(): Argument #1 ($value) must be of type Countable|array, int given"
    );
}

#[test]
fn test_count_recursive_detects_reference_cycle() {
    let (mut ctx, seen) = capture_context();
    let mut slot = list([1]);
    let alias = slot.ensure_alias();
    slot.with_array_mut(|arr| arr.set_alias(key(1), alias.clone())).unwrap();

    run_builtin(&mut ctx, "count", vec![slot, PhpValue::Long(1)]).unwrap();
    assert!(seen
        .borrow()
        .iter()
        .any(|(level, msg)| *level == ErrorLevel::Warning && msg == "count(): Recursion detected"));
}

#[test]
fn test_internal_pointer() {
    let mut ctx = request();
    let mut args = vec![list(["a", "b", "c"])];
    assert_eq!(ctx.call_function("end", &mut args).unwrap(), PhpValue::from("c"));
    assert_eq!(ctx.call_function("key", &mut args).unwrap(), PhpValue::Long(2));
    assert_eq!(ctx.call_function("prev", &mut args).unwrap(), PhpValue::from("b"));
    assert_eq!(ctx.call_function("pos", &mut args).unwrap(), PhpValue::from("b"));
    assert_eq!(ctx.call_function("reset", &mut args).unwrap(), PhpValue::from("a"));
    assert_eq!(ctx.call_function("prev", &mut args).unwrap(), PhpValue::Bool(false));
    assert_eq!(ctx.call_function("current", &mut args).unwrap(), PhpValue::Bool(false));
}

#[test]
fn test_function_names_are_case_insensitive() {
    let mut ctx = request();
    assert_eq!(call(&mut ctx, "COUNT", vec![list([1, 2, 3])]), PhpValue::Long(3));
    let err = run_builtin(&mut ctx, "array_frobnicate", vec![]).unwrap_err();
    assert_eq!(err.message(), "Call to undefined function array_frobnicate()");
}
