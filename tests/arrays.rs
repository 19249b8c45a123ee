use php_runtime::core::array::{ArrayBuilder, IntStringKey, OrderedDictionary, SetOperation};
use php_runtime::core::compare::loose_compare;
use php_runtime::core::value::PhpValue;
use php_runtime::runtime::error::ContractError;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn key(k: impl Into<IntStringKey>) -> IntStringKey {
    k.into()
}

fn mixed() -> OrderedDictionary {
    ArrayBuilder::new()
        .push("a")
        .insert("name", "php")
        .insert(7, "b")
        .push("c")
        .insert("x", 1.5)
        .finish_dictionary()
}

fn entries(dict: &OrderedDictionary) -> Vec<(IntStringKey, PhpValue)> {
    dict.iter().map(|(k, v)| (k, v.copy_value())).collect()
}

#[test]
fn test_hello_world_scenario() {
    let mut dict: OrderedDictionary = ["Hello", " ", "World"].into_iter().map(PhpValue::from).collect();
    assert!(dict.remove(&key(1)).is_some());

    let mut text = String::new();
    let mut it = dict.enumerator();
    while let Some((_, value)) = it.move_next(&mut dict).unwrap() {
        text.push_str(&value.to_php_string().to_string_lossy());
    }
    dict.release_enumerator(it).unwrap();
    assert_eq!(text, "HelloWorld");

    assert_eq!(dict.push(PhpValue::from("!")), Some(3));
    assert_eq!(dict.get_int(3), Some(&PhpValue::from("!")));
}

#[test]
fn test_auto_key_never_reused() {
    let mut dict = OrderedDictionary::new();
    dict.set(key(5), PhpValue::from("x"));
    dict.remove(&key(5));
    assert_eq!(dict.push(PhpValue::from("y")), Some(6));
    assert_eq!(dict.keys().collect::<Vec<_>>(), vec![key(6)]);
}

#[test]
fn test_negative_keys_and_next_free() {
    let mut dict = OrderedDictionary::new();
    dict.set(key(-5), PhpValue::Long(1));
    dict.push(PhpValue::Long(2));
    // PHP >= 8.3 continues after a negative maximum
    assert_eq!(dict.keys().collect::<Vec<_>>(), vec![key(-5), key(-4)]);
}

#[test]
fn test_overwrite_keeps_position() {
    let mut dict = mixed();
    dict.set(key("name"), PhpValue::from("rust"));
    let keys: Vec<_> = dict.keys().collect();
    assert_eq!(keys, vec![key(0), key("name"), key(7), key(8), key("x")]);
    assert_eq!(dict.get_str("name"), Some(&PhpValue::from("rust")));
}

#[test]
fn test_numeric_string_keys_normalise() {
    let mut dict = OrderedDictionary::new();
    dict.set(key("10"), PhpValue::Long(1));
    dict.set(key("010"), PhpValue::Long(2));
    dict.set(key("-0"), PhpValue::Long(3));
    assert_eq!(dict.get_int(10), Some(&PhpValue::Long(1)));
    assert!(dict.get_str("010").is_some());
    assert!(dict.get_str("-0").is_some());
    assert_eq!(dict.len(), 3);
}

#[test]
fn test_packed_and_hashed_are_indistinguishable() {
    let mut packed = OrderedDictionary::new();
    let mut hashed = OrderedDictionary::new();
    hashed.set(key("tmp"), PhpValue::Null);
    hashed.remove(&key("tmp"));
    for i in 0..20 {
        packed.push(PhpValue::Long(i * 3));
        hashed.push(PhpValue::Long(i * 3));
    }
    for d in [&mut packed, &mut hashed] {
        d.remove(&key(19));
        d.remove(&key(4));
        d.set(key(2), PhpValue::from("two"));
    }
    assert!(!hashed.is_packed());
    assert_eq!(entries(&packed), entries(&hashed));
    for i in 0..25 {
        assert_eq!(packed.get_int(i), hashed.get_int(i));
    }
    assert_eq!(packed.push(PhpValue::Null), hashed.push(PhpValue::Null));
}

#[test]
fn test_reverse_twice_restores_order() {
    let mut dict = mixed();
    dict.remove(&key(7));
    dict.remove(&key("name"));
    let before = entries(&dict);
    dict.reverse();
    assert_eq!(dict.keys().collect::<Vec<_>>(), vec![key("x"), key(8), key(0)]);
    dict.reverse();
    assert_eq!(entries(&dict), before);
}

#[test]
fn test_shuffle_is_permutation_with_list_keys() {
    let mut dict = mixed();
    let mut rng = StdRng::seed_from_u64(42);
    let mut before: Vec<String> = dict.values().map(|v| v.to_php_string().to_string()).collect();
    dict.shuffle(&mut rng);

    assert_eq!(dict.keys().collect::<Vec<_>>(), (0..5).map(key).collect::<Vec<_>>());
    let mut after: Vec<String> = dict.values().map(|v| v.to_php_string().to_string()).collect();
    before.sort();
    after.sort();
    assert_eq!(before, after);
    assert!(dict.is_list());
}

#[test]
fn test_shuffle_is_deterministic_per_seed() {
    let shuffled = |seed| {
        let mut dict: OrderedDictionary = (0..30).map(PhpValue::Long).collect();
        dict.shuffle(&mut StdRng::seed_from_u64(seed));
        entries(&dict)
    };
    assert_eq!(shuffled(7), shuffled(7));
}

#[test]
fn test_stable_sort() {
    let mut dict = ArrayBuilder::new()
        .insert("a", 2)
        .insert("b", 1)
        .insert("c", 2)
        .insert("d", 1)
        .finish_dictionary();
    dict.sort_by(true, |x, y| loose_compare(&x.1, &y.1));
    assert_eq!(
        dict.keys().collect::<Vec<_>>(),
        vec![key("b"), key("d"), key("a"), key("c")]
    );
}

#[test]
fn test_difference_converges() {
    let a: OrderedDictionary = [1, 2, 3, 4, 2].into_iter().map(PhpValue::from).collect();
    let b: OrderedDictionary = [2, 4].into_iter().map(PhpValue::from).collect();
    let by_value = |x: &(IntStringKey, PhpValue), y: &(IntStringKey, PhpValue)| {
        x.1.to_php_string().cmp(&y.1.to_php_string())
    };
    let once = a.set_operation(SetOperation::Difference, &[&b], by_value);
    assert_eq!(once.keys().collect::<Vec<_>>(), vec![key(0), key(2)]);
    let twice = once.set_operation(SetOperation::Difference, &[&b], by_value);
    assert_eq!(entries(&twice), entries(&once));
}

#[test]
fn test_intersection_keeps_left_keys() {
    let a = ArrayBuilder::new()
        .insert("x", "green")
        .insert("y", "red")
        .insert(5, "blue")
        .finish_dictionary();
    let b: OrderedDictionary = ["blue", "green", "yellow"].into_iter().map(PhpValue::from).collect();
    let c: OrderedDictionary = ["green", "blue"].into_iter().map(PhpValue::from).collect();
    let result = a.set_operation(SetOperation::Intersection, &[&b, &c], |x, y| {
        x.1.to_php_string().cmp(&y.1.to_php_string())
    });
    assert_eq!(result.keys().collect::<Vec<_>>(), vec![key("x"), key(5)]);
}

#[test]
fn test_select_duplicates_skips_first_occurrence() {
    let dict: OrderedDictionary = ["a", "b", "a", "c", "b", "a"].into_iter().map(PhpValue::from).collect();
    let dups = dict.select_duplicates(|_, v| v.to_php_string());
    assert_eq!(
        dups.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>(),
        vec![key(2), key(4), key(5)]
    );

    let only_a = dict.select_duplicates_where(|_, v| v.to_php_string(), |_, v| v.to_php_string() == "a");
    assert_eq!(only_a.len(), 2);
}

#[test]
fn test_add_first_renumbers_int_keys() {
    let mut dict = ArrayBuilder::new()
        .insert(3, "x")
        .insert("k", "y")
        .insert(9, "z")
        .finish_dictionary();
    dict.add_first(key(100), PhpValue::from("first"));
    assert_eq!(
        dict.keys().collect::<Vec<_>>(),
        vec![key(0), key(1), key("k"), key(2)]
    );
    assert_eq!(dict.push(PhpValue::Null), Some(3));

    dict.add_first(key("k"), PhpValue::from("moved"));
    assert_eq!(dict.first().map(|(k, _)| k), Some(key("k")));
    assert_eq!(dict.len(), 5);
}

#[test]
fn test_enumerator_tolerates_removing_current() {
    let mut dict: OrderedDictionary = (0..6).map(PhpValue::Long).collect();
    let mut it = dict.enumerator();
    let mut seen = Vec::new();
    while let Some((k, v)) = it.move_next(&mut dict).unwrap() {
        seen.push(v.to_long());
        if v.to_long() % 2 == 0 {
            dict.remove(&k);
        }
    }
    dict.release_enumerator(it).unwrap();
    assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(dict.keys().collect::<Vec<_>>(), vec![key(1), key(3), key(5)]);
}

#[test]
fn test_enumerator_from_other_dictionary_is_rejected() {
    let mut a = OrderedDictionary::new();
    let mut b = OrderedDictionary::new();
    let _first = a.enumerator();
    let second = a.enumerator();
    assert!(matches!(
        second.peek_key(&b),
        Err(ContractError::UnknownEnumerator { id: 1 })
    ));
    assert!(b.release_enumerator(second).is_err());
}

#[test]
fn test_positional_access() {
    let dict = mixed();
    assert_eq!(dict[1], PhpValue::from("php"));
    assert!(matches!(
        dict.entry_at(5),
        Err(ContractError::IndexOutOfRange { index: 5, len: 5 })
    ));
}

#[test]
#[should_panic(expected = "index 9 out of range for array of length 5")]
fn test_positional_access_out_of_range_panics() {
    let dict = mixed();
    let _ = &dict[9];
}

#[test]
fn test_pop_and_shift() {
    let mut dict = mixed();
    assert_eq!(dict.pop(), Some((key("x"), PhpValue::Double(1.5))));
    assert_eq!(dict.shift(), Some((key(0), PhpValue::from("a"))));
    assert_eq!(
        dict.keys().collect::<Vec<_>>(),
        vec![key("name"), key(0), key(1)]
    );
    assert_eq!(dict.next_free_key(), 2);
}
