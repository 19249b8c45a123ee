mod common;

use common::{call, list, request};
use php_runtime::core::array::{ArrayBuilder, IntStringKey, OrderedDictionary, SetOperation};
use php_runtime::core::value::PhpValue;
use php_runtime::core::variables::LocalScope;
use php_runtime::runtime::error::PhpError;

fn long_at(scope: &LocalScope, name: &str, key: i64) -> i64 {
    scope
        .get(name)
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.get_int(key).map(PhpValue::to_long))
        .unwrap_or_else(|| panic!("${name}[{key}] is not set"))
}

#[test]
fn test_basic_reference() {
    // $a = 1; $b = &$a; $b = 2;
    let mut scope = LocalScope::new();
    scope.assign("a", PhpValue::Long(1));
    scope.assign_by_ref("b", "a");
    scope.assign("b", PhpValue::Long(2));
    assert_eq!(scope.get("a"), Some(PhpValue::Long(2)));
}

#[test]
fn test_reference_chain() {
    // $a = 1; $b = &$a; $c = &$b; $c = 3;
    let mut scope = LocalScope::new();
    scope.assign("a", PhpValue::Long(1));
    scope.assign_by_ref("b", "a");
    scope.assign_by_ref("c", "b");
    scope.assign("c", PhpValue::Long(3));
    assert_eq!(scope.get("a"), Some(PhpValue::Long(3)));
}

#[test]
fn test_reference_separation() {
    // $a = 1; $b = &$a; $c = $a; $c = 4;
    let mut scope = LocalScope::new();
    scope.assign("a", PhpValue::Long(1));
    scope.assign_by_ref("b", "a");
    let copy = scope.get("a").unwrap();
    scope.assign("c", copy);
    scope.assign("c", PhpValue::Long(4));
    assert_eq!(scope.get("a"), Some(PhpValue::Long(1)));
}

#[test]
fn test_unset_keeps_other_binding() {
    // $a = 1; $b = &$a; unset($a); $b = 5;
    let mut scope = LocalScope::new();
    scope.assign("a", PhpValue::Long(1));
    scope.assign_by_ref("b", "a");
    assert!(scope.unset("a"));
    scope.assign("b", PhpValue::Long(5));
    assert!(!scope.is_set("a"));
    assert_eq!(scope.get("b"), Some(PhpValue::Long(5)));
}

#[test]
fn test_copy_on_write_independence() {
    let packed = PhpValue::from(ArrayBuilder::new().push(1).push(2).push(3).finish());
    let hashed = PhpValue::from(
        ArrayBuilder::new()
            .insert("x", 1)
            .insert(10, 2)
            .insert("y", list([3]))
            .finish(),
    );
    for original in [packed, hashed] {
        let snapshot = original.as_array().unwrap().into_dictionary();
        let mut scope = LocalScope::new();
        scope.assign("a", original);
        let b = scope.get("a").unwrap();
        scope.assign("b", b);
        scope
            .with_array_mut("b", |arr| {
                arr.set(IntStringKey::from("new"), PhpValue::Long(9));
                arr.remove(&IntStringKey::Int(1));
            })
            .unwrap();
        assert_eq!(*scope.get("a").unwrap().as_array().unwrap(), snapshot);
    }
}

#[test]
fn test_unset_element_reference_breaks_sharing() {
    // $x = [1, 2]; $ref = &$x[1]; unset($ref); $y = $x; $y[1] = 22;
    let mut scope = LocalScope::new();
    scope.assign("x", list([1, 2]));
    let alias = scope.reference_element("x", IntStringKey::Int(1)).unwrap();
    scope.bind("ref", alias);
    scope.unset("ref");
    let x = scope.get("x").unwrap();
    scope.assign("y", x);
    scope
        .with_array_mut("y", |arr| arr.set(IntStringKey::Int(1), PhpValue::Long(22)))
        .unwrap();

    assert_eq!(long_at(&scope, "x", 1), 2);
    assert_eq!(long_at(&scope, "y", 1), 22);
}

#[test]
fn test_live_element_reference_survives_copy() {
    // $x = [1, 2]; $ref = &$x[1]; $y = $x; $y[1] = 22;
    let mut scope = LocalScope::new();
    scope.assign("x", list([1, 2]));
    let alias = scope.reference_element("x", IntStringKey::Int(1)).unwrap();
    scope.bind("ref", alias);
    let x = scope.get("x").unwrap();
    scope.assign("y", x);
    scope
        .with_array_mut("y", |arr| arr.set(IntStringKey::Int(1), PhpValue::Long(22)))
        .unwrap();

    assert_eq!(long_at(&scope, "x", 1), 22);
    assert_eq!(scope.get("ref"), Some(PhpValue::Long(22)));
}

#[test]
fn test_foreach_by_reference_then_unset() {
    // foreach ($arr as &$v) {} unset($v); $v = [3];
    let mut scope = LocalScope::new();
    scope.assign("arr", list([list([1]), list([2])]));
    for key in 0..2 {
        let alias = scope.reference_element("arr", IntStringKey::Int(key)).unwrap();
        scope.bind("v", alias);
    }
    scope.unset("v");
    scope.assign("v", list([3]));

    let inner = scope.get("arr").unwrap().as_array().unwrap().get_int(1).unwrap().copy_value();
    assert_eq!(inner, list([2]));
}

#[test]
fn test_by_reference_builtin_writes_through_alias() {
    // $a = [3, 1, 2]; $b = &$a; sort($b);
    let mut ctx = request();
    let mut scope = LocalScope::new();
    scope.assign("a", list([3, 1, 2]));
    let alias = scope.reference("a");
    call(&mut ctx, "sort", vec![PhpValue::Alias(alias)]);
    assert_eq!(scope.get("a"), Some(list([1, 2, 3])));
}

/// `$x = [1, 2]; $r = &$x[1];` with `$r` optionally unset again.
fn array_with_element_reference(scope: &mut LocalScope, keep_reference: bool) {
    scope.assign("x", list([1, 2]));
    let alias = scope.reference_element("x", IntStringKey::Int(1)).unwrap();
    scope.bind("r", alias);
    if !keep_reference {
        scope.unset("r");
    }
}

#[test]
fn test_array_diff_result_is_independent() {
    // unset($r); $d = array_diff($x, [9]); $d[1] = 77;
    let mut ctx = request();
    let mut scope = LocalScope::new();
    array_with_element_reference(&mut scope, false);
    let x = scope.get("x").unwrap();
    let diff = call(&mut ctx, "array_diff", vec![x, list([9])]);
    scope.assign("d", diff);
    scope
        .with_array_mut("d", |arr| arr.set(IntStringKey::Int(1), PhpValue::Long(77)))
        .unwrap();

    assert_eq!(long_at(&scope, "x", 1), 2);
    assert_eq!(long_at(&scope, "d", 1), 77);
}

#[test]
fn test_array_diff_keeps_live_reference() {
    // $d = array_diff($x, [9]); $d[1] = 77;
    let mut ctx = request();
    let mut scope = LocalScope::new();
    array_with_element_reference(&mut scope, true);
    let x = scope.get("x").unwrap();
    let diff = call(&mut ctx, "array_diff", vec![x, list([9])]);
    scope.assign("d", diff);
    scope
        .with_array_mut("d", |arr| arr.set(IntStringKey::Int(1), PhpValue::Long(77)))
        .unwrap();

    assert_eq!(long_at(&scope, "x", 1), 77);
    assert_eq!(scope.get("r"), Some(PhpValue::Long(77)));
}

#[test]
fn test_intersect_and_unique_results_are_independent() {
    // unset($r); $i = array_intersect($x, [2]); $u = array_unique($x); $i[1] = 0; $u[1] = 0;
    let mut ctx = request();
    let mut scope = LocalScope::new();
    array_with_element_reference(&mut scope, false);
    let x = scope.get("x").unwrap();
    let intersect = call(&mut ctx, "array_intersect", vec![x.clone(), list([2])]);
    let unique = call(&mut ctx, "array_unique", vec![x]);
    scope.assign("i", intersect);
    scope.assign("u", unique);
    for name in ["i", "u"] {
        scope
            .with_array_mut(name, |arr| arr.set(IntStringKey::Int(1), PhpValue::Long(0)))
            .unwrap();
        assert_eq!(long_at(&scope, name, 1), 0);
    }

    assert_eq!(long_at(&scope, "x", 1), 2);
}

#[test]
fn test_dictionary_set_operation_separates_dead_references() {
    let mut source: OrderedDictionary = [1i64, 2].into_iter().map(PhpValue::Long).collect();
    let alias = source.ensure_alias(IntStringKey::Int(1));
    drop(alias);
    let empty = OrderedDictionary::new();
    let mut diff = source.set_operation(SetOperation::Difference, &[&empty], |a, b| {
        a.1.to_long().cmp(&b.1.to_long())
    });
    diff.set(IntStringKey::Int(1), PhpValue::Long(77));

    assert_eq!(source.get_int(1).map(PhpValue::copy_value), Some(PhpValue::Long(2)));
    assert!(!diff.get_int(1).unwrap().is_alias());
}

#[test]
fn test_append_through_self_reference_is_an_error() {
    // $a = []; $a[0] = &$a; $a[0][] = 1;
    let mut scope = LocalScope::new();
    scope.assign("a", list(Vec::<i64>::new()));
    let alias = scope.reference("a");
    scope
        .with_array_mut("a", |arr| arr.set_alias(IntStringKey::Int(0), alias.clone()))
        .unwrap();

    let appended = scope
        .with_array_mut("a", |arr| {
            arr.get_or_insert_null(IntStringKey::Int(0))
                .with_array_mut(|inner| inner.push(PhpValue::Long(1)))
        })
        .unwrap();
    assert!(matches!(appended, Err(PhpError::Error(_))), "{appended:?}");
    assert_eq!(scope.get("a").unwrap().as_array().unwrap().len(), 1);
}
