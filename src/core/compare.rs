//! PHP 8 comparison semantics
//!
//! - [`loose_compare`]: the `<=>` operator, also used by `==`, `<` and the
//!   default sort order.
//! - [`strict_equals`]: the `===` operator; also backs `PartialEq` for
//!   [`PhpValue`].
//!
//! Incomparable pairs (arrays with different keys, objects of different
//! classes) compare as greater, like Zend's `1` result.
//!
//! ## References
//!
//! - Zend: `$PHP_SRC_PATH/Zend/zend_operators.c` - zend_compare, zend_is_identical,
//!   zendi_smart_strcmp, compare_longs_to_string
//! - Zend: `$PHP_SRC_PATH/ext/standard/array.c` - php_array_key_compare_unstable_i

use crate::core::array::{IntStringKey, OrderedDictionary};
use crate::core::convert::{self, Number};
use crate::core::string::PhpString;
use crate::core::value::PhpValue;
use std::cmp::Ordering;

/// `sort()` flag subset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortFlags {
    /// SORT_REGULAR
    #[default]
    Regular,
    /// SORT_NUMERIC
    Numeric,
    /// SORT_STRING
    String,
}

impl SortFlags {
    pub fn from_long(flags: i64) -> Self {
        match flags & !8 {
            1 => SortFlags::Numeric,
            2 => SortFlags::String,
            _ => SortFlags::Regular,
        }
    }
}

#[inline]
fn three_way(a: f64, b: f64) -> Ordering {
    if a == b {
        Ordering::Equal
    } else if a < b {
        Ordering::Less
    } else {
        // NaN lands here, as in ZEND_THREEWAY_COMPARE
        Ordering::Greater
    }
}

fn compare_numbers(a: Number, b: Number) -> Ordering {
    match (a, b) {
        (Number::Long(x), Number::Long(y)) => x.cmp(&y),
        (x, y) => three_way(x.to_double(), y.to_double()),
    }
}

fn compare_bytes(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// String <=> string: numeric when both are numeric strings, bytewise
/// otherwise.
pub fn smart_string_compare(a: &PhpString, b: &PhpString) -> Ordering {
    let pa = convert::parse_numeric(a.as_bytes());
    if pa.is_numeric() {
        let pb = convert::parse_numeric(b.as_bytes());
        if pb.is_numeric() {
            return compare_numbers(pa.number, pb.number);
        }
    }
    compare_bytes(a.as_bytes(), b.as_bytes())
}

/// Number <=> string (PHP 8): numeric comparison only when the string is
/// numeric, otherwise the number is compared as a string.
fn compare_number_to_string(n: Number, s: &PhpString) -> Ordering {
    let parsed = convert::parse_numeric(s.as_bytes());
    if parsed.is_numeric() {
        return compare_numbers(n, parsed.number);
    }
    let text = match n {
        Number::Long(i) => i.to_string(),
        Number::Double(d) => convert::format_double(d, convert::DEFAULT_PRECISION),
    };
    compare_bytes(text.as_bytes(), s.as_bytes())
}

fn compare_arrays(a: &OrderedDictionary, b: &OrderedDictionary) -> Ordering {
    match a.len().cmp(&b.len()) {
        Ordering::Equal => {}
        unequal => return unequal,
    }
    for (key, value) in a.iter() {
        let Some(other) = b.get(&key) else {
            return Ordering::Greater;
        };
        match loose_compare(value, other) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
    }
    Ordering::Equal
}

/// `$a <=> $b`
pub fn loose_compare(a: &PhpValue, b: &PhpValue) -> Ordering {
    a.with_deref(|a| b.with_deref(|b| compare_concrete(a, b)))
}

fn compare_concrete(a: &PhpValue, b: &PhpValue) -> Ordering {
    use PhpValue::*;
    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Bool(x), _) => x.cmp(&b.to_bool()),
        (_, Bool(y)) => a.to_bool().cmp(y),
        (Null, String(s)) => {
            if s.is_empty() { Ordering::Equal } else { Ordering::Less }
        }
        (String(s), Null) => {
            if s.is_empty() { Ordering::Equal } else { Ordering::Greater }
        }
        (Null, _) => {
            if b.to_bool() { Ordering::Less } else { Ordering::Equal }
        }
        (_, Null) => {
            if a.to_bool() { Ordering::Greater } else { Ordering::Equal }
        }
        (Long(x), Long(y)) => x.cmp(y),
        (Long(x), Double(y)) => three_way(*x as f64, *y),
        (Double(x), Long(y)) => three_way(*x, *y as f64),
        (Double(x), Double(y)) => three_way(*x, *y),
        (String(x), String(y)) => smart_string_compare(x, y),
        (Long(x), String(s)) => compare_number_to_string(Number::Long(*x), s),
        (Double(x), String(s)) => compare_number_to_string(Number::Double(*x), s),
        (String(s), Long(y)) => compare_number_to_string(Number::Long(*y), s).reverse(),
        (String(s), Double(y)) => compare_number_to_string(Number::Double(*y), s).reverse(),
        (Array(x), Array(y)) => compare_arrays(x, y),
        (Array(_), _) => Ordering::Greater,
        (_, Array(_)) => Ordering::Less,
        (Object(x), Object(y)) => {
            if x.ptr_eq(y) {
                Ordering::Equal
            } else if x.class_name() != y.class_name() {
                Ordering::Greater
            } else {
                let left: OrderedDictionary = a.to_array().into_dictionary();
                let right: OrderedDictionary = b.to_array().into_dictionary();
                compare_arrays(&left, &right)
            }
        }
        (Object(o), String(s)) => match o.to_php_string() {
            Some(text) => smart_string_compare(&text, s),
            None => Ordering::Greater,
        },
        (String(s), Object(o)) => match o.to_php_string() {
            Some(text) => smart_string_compare(s, &text),
            None => Ordering::Less,
        },
        (Object(_), _) => Ordering::Greater,
        (_, Object(_)) => Ordering::Less,
        (Resource(_), _) | (_, Resource(_)) => compare_numbers(a.to_number().number, b.to_number().number),
        (Alias(_), _) | (_, Alias(_)) => unreachable!("dereferenced by loose_compare"),
    }
}

/// `$a == $b`
pub fn loose_equals(a: &PhpValue, b: &PhpValue) -> bool {
    loose_compare(a, b) == Ordering::Equal
}

/// `$a === $b`
pub fn strict_equals(a: &PhpValue, b: &PhpValue) -> bool {
    a.with_deref(|a| {
        b.with_deref(|b| match (a, b) {
            (PhpValue::Null, PhpValue::Null) => true,
            (PhpValue::Bool(x), PhpValue::Bool(y)) => x == y,
            (PhpValue::Long(x), PhpValue::Long(y)) => x == y,
            (PhpValue::Double(x), PhpValue::Double(y)) => x == y,
            (PhpValue::String(x), PhpValue::String(y)) => x == y,
            (PhpValue::Array(x), PhpValue::Array(y)) => x == y,
            (PhpValue::Object(x), PhpValue::Object(y)) => x.ptr_eq(y),
            (PhpValue::Resource(x), PhpValue::Resource(y)) => x.ptr_eq(y),
            _ => false,
        })
    })
}

impl PartialEq for PhpValue {
    fn eq(&self, other: &Self) -> bool {
        strict_equals(self, other)
    }
}

/// Comparison used by `sort()` and friends.
pub fn compare_with_flags(a: &PhpValue, b: &PhpValue, flags: SortFlags) -> Ordering {
    match flags {
        SortFlags::Regular => loose_compare(a, b),
        SortFlags::Numeric => three_way(a.to_double(), b.to_double()),
        SortFlags::String => compare_bytes(a.to_php_string().as_bytes(), b.to_php_string().as_bytes()),
    }
}

/// Key order used by `ksort()`: integers numerically, strings by
/// [`smart_string_compare`], mixed pairs by the number/string rule.
pub fn compare_keys(a: &IntStringKey, b: &IntStringKey) -> Ordering {
    match (a, b) {
        (IntStringKey::Int(x), IntStringKey::Int(y)) => x.cmp(y),
        (IntStringKey::Str(x), IntStringKey::Str(y)) => smart_string_compare(x, y),
        (IntStringKey::Int(x), IntStringKey::Str(s)) => compare_number_to_string(Number::Long(*x), s),
        (IntStringKey::Str(s), IntStringKey::Int(y)) => {
            compare_number_to_string(Number::Long(*y), s).reverse()
        }
    }
}

/// Total order on keys for searching: integers before strings.
pub fn key_identity_order(a: &IntStringKey, b: &IntStringKey) -> Ordering {
    match (a, b) {
        (IntStringKey::Int(x), IntStringKey::Int(y)) => x.cmp(y),
        (IntStringKey::Int(_), IntStringKey::Str(_)) => Ordering::Less,
        (IntStringKey::Str(_), IntStringKey::Int(_)) => Ordering::Greater,
        (IntStringKey::Str(x), IntStringKey::Str(y)) => x.cmp(y),
    }
}
