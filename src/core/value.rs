//! The dynamic PHP value
//!
//! [`PhpValue`] is a closed sum type over every kind of PHP datum. Copying a
//! value is always cheap:
//!
//! | Kind | Copy cost | Semantics |
//! |------|-----------|-----------|
//! | null, bool, int, float | O(1) | value |
//! | string | refcount bump | value (copy-on-write buffer) |
//! | array | refcount bump | value (copy-on-write dictionary) |
//! | object, resource | refcount bump | handle (shared instance) |
//! | alias | refcount bump | reference (shared cell) |
//!
//! A storage location (variable, array slot, property) holds a `PhpValue`.
//! When it has been bound by reference it holds `PhpValue::Alias`; every read
//! dereferences through [`PhpValue::copy_value`] / [`PhpValue::with_deref`]
//! and every write goes through [`PhpValue::assign`] /
//! [`PhpValue::with_deref_mut`], so callers never see the indirection.
//!
//! The casts on this type are silent (`(int)$x` semantics). Conversions that
//! must warn or throw live on
//! [`RequestContext`](crate::runtime::context::RequestContext).
//!
//! ## References
//!
//! - Zend: `$PHP_SRC_PATH/Zend/zend_types.h` - zval, IS_* type tags
//! - Zend: `$PHP_SRC_PATH/Zend/zend_operators.c` - convert_to_*, zend_is_true

use crate::core::alias::PhpAlias;
use crate::core::array::{ArrayBuilder, OrderedDictionary, PhpArray};
use crate::core::convert::{self, DEFAULT_PRECISION, Number, NumericKind, NumericParse};
use crate::core::object::{PhpObject, PhpResource};
use crate::core::string::PhpString;
use crate::runtime::error::PhpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Null,
    Bool,
    Long,
    Double,
    String,
    Array,
    Object,
    Alias,
    Resource,
}

#[derive(Debug, Clone, Default)]
pub enum PhpValue {
    #[default]
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    String(PhpString),
    Array(PhpArray),
    Object(PhpObject),
    Alias(PhpAlias),
    Resource(PhpResource),
}

impl PhpValue {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            PhpValue::Null => TypeTag::Null,
            PhpValue::Bool(_) => TypeTag::Bool,
            PhpValue::Long(_) => TypeTag::Long,
            PhpValue::Double(_) => TypeTag::Double,
            PhpValue::String(_) => TypeTag::String,
            PhpValue::Array(_) => TypeTag::Array,
            PhpValue::Object(_) => TypeTag::Object,
            PhpValue::Alias(_) => TypeTag::Alias,
            PhpValue::Resource(_) => TypeTag::Resource,
        }
    }

    /// Type tag of the referenced value (never `TypeTag::Alias`).
    pub fn deref_type_tag(&self) -> TypeTag {
        self.with_deref(PhpValue::type_tag)
    }

    /// `gettype()` name
    /// Reference: $PHP_SRC_PATH/ext/standard/type.c - PHP_FUNCTION(gettype)
    pub fn type_name(&self) -> &'static str {
        self.with_deref(|v| match v {
            PhpValue::Null => "NULL",
            PhpValue::Bool(_) => "boolean",
            PhpValue::Long(_) => "integer",
            PhpValue::Double(_) => "double",
            PhpValue::String(_) => "string",
            PhpValue::Array(_) => "array",
            PhpValue::Object(_) => "object",
            PhpValue::Resource(r) if r.is_open() => "resource",
            PhpValue::Resource(_) => "resource (closed)",
            PhpValue::Alias(_) => unreachable!("aliases never nest"),
        })
    }

    /// Short type name used in error messages (`int`, `float`, ...)
    pub fn debug_type_name(&self) -> String {
        self.with_deref(|v| match v {
            PhpValue::Null => "null".to_string(),
            PhpValue::Bool(_) => "bool".to_string(),
            PhpValue::Long(_) => "int".to_string(),
            PhpValue::Double(_) => "float".to_string(),
            PhpValue::String(_) => "string".to_string(),
            PhpValue::Array(_) => "array".to_string(),
            PhpValue::Object(o) => o.class_name().to_string(),
            PhpValue::Resource(_) => "resource".to_string(),
            PhpValue::Alias(_) => unreachable!("aliases never nest"),
        })
    }

    pub fn is_null(&self) -> bool {
        self.deref_type_tag() == TypeTag::Null
    }

    pub fn is_bool(&self) -> bool {
        self.deref_type_tag() == TypeTag::Bool
    }

    pub fn is_long(&self) -> bool {
        self.deref_type_tag() == TypeTag::Long
    }

    pub fn is_double(&self) -> bool {
        self.deref_type_tag() == TypeTag::Double
    }

    pub fn is_string(&self) -> bool {
        self.deref_type_tag() == TypeTag::String
    }

    pub fn is_array(&self) -> bool {
        self.deref_type_tag() == TypeTag::Array
    }

    pub fn is_object(&self) -> bool {
        self.deref_type_tag() == TypeTag::Object
    }

    pub fn is_resource(&self) -> bool {
        self.deref_type_tag() == TypeTag::Resource
    }

    /// Whether this storage location is bound by reference.
    pub fn is_alias(&self) -> bool {
        matches!(self, PhpValue::Alias(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self.deref_type_tag(),
            TypeTag::Bool | TypeTag::Long | TypeTag::Double | TypeTag::String
        )
    }

    // ---- narrowing accessors (no coercion) ----

    pub fn as_bool(&self) -> Option<bool> {
        self.with_deref(|v| match v {
            PhpValue::Bool(b) => Some(*b),
            _ => None,
        })
    }

    pub fn as_long(&self) -> Option<i64> {
        self.with_deref(|v| match v {
            PhpValue::Long(i) => Some(*i),
            _ => None,
        })
    }

    pub fn as_double(&self) -> Option<f64> {
        self.with_deref(|v| match v {
            PhpValue::Double(d) => Some(*d),
            _ => None,
        })
    }

    pub fn as_string(&self) -> Option<PhpString> {
        self.with_deref(|v| match v {
            PhpValue::String(s) => Some(s.clone()),
            _ => None,
        })
    }

    /// Shared handle to the array. Holding it keeps the dictionary shared, so
    /// a later write through the original slot will copy it.
    pub fn as_array(&self) -> Option<PhpArray> {
        self.with_deref(|v| match v {
            PhpValue::Array(a) => Some(a.clone()),
            _ => None,
        })
    }

    pub fn as_object(&self) -> Option<PhpObject> {
        self.with_deref(|v| match v {
            PhpValue::Object(o) => Some(o.clone()),
            _ => None,
        })
    }

    pub fn as_resource(&self) -> Option<PhpResource> {
        self.with_deref(|v| match v {
            PhpValue::Resource(r) => Some(r.clone()),
            _ => None,
        })
    }

    pub fn as_alias(&self) -> Option<&PhpAlias> {
        match self {
            PhpValue::Alias(a) => Some(a),
            _ => None,
        }
    }

    // ---- dereference and write paths ----

    /// Value-semantics copy: aliases are dereferenced, everything else is a
    /// cheap handle copy.
    pub fn copy_value(&self) -> PhpValue {
        match self {
            PhpValue::Alias(alias) => alias.get(),
            other => other.clone(),
        }
    }

    pub fn into_dereferenced(self) -> PhpValue {
        match self {
            PhpValue::Alias(alias) => alias.get(),
            other => other,
        }
    }

    /// Run `f` on the concrete value behind this location.
    pub fn with_deref<R>(&self, f: impl FnOnce(&PhpValue) -> R) -> R {
        match self {
            PhpValue::Alias(alias) => alias.with(f),
            other => f(other),
        }
    }

    /// Run `f` on the writable slot behind this location: the shared cell for
    /// a reference, the location itself otherwise.
    ///
    /// Fails only for a reference that is already being modified further up
    /// the stack (see [`PhpAlias::with_mut`]).
    pub fn with_deref_mut<R>(&mut self, f: impl FnOnce(&mut PhpValue) -> R) -> Result<R, PhpError> {
        match self {
            PhpValue::Alias(alias) => alias.with_mut(f),
            other => Ok(f(other)),
        }
    }

    /// Assignment (`$x = value`): writes through a reference bound to this
    /// location and never stores an alias.
    pub fn assign(&mut self, value: PhpValue) {
        let value = value.into_dereferenced();
        match self {
            PhpValue::Alias(alias) => alias.set(value),
            slot => *slot = value,
        }
    }

    /// Upgrade this location to a reference and return the shared cell.
    ///
    /// The current value moves into the new alias; a location that already
    /// holds an alias returns it unchanged.
    pub fn ensure_alias(&mut self) -> PhpAlias {
        if let PhpValue::Alias(alias) = self {
            return alias.clone();
        }
        let alias = PhpAlias::new(std::mem::take(self));
        *self = PhpValue::Alias(alias.clone());
        alias
    }

    /// Bind this location to an existing reference (`$x = &$y`).
    pub fn bind_alias(&mut self, alias: PhpAlias) {
        *self = PhpValue::Alias(alias);
    }

    /// Writable access to the array stored here; null becomes an empty array
    /// first (`$a[] = 1` on an undefined variable).
    pub fn with_array_mut<R>(
        &mut self,
        f: impl FnOnce(&mut OrderedDictionary) -> R,
    ) -> Result<R, PhpError> {
        self.with_deref_mut(|slot| {
            if let PhpValue::Null = slot {
                *slot = PhpValue::Array(PhpArray::new());
            }
            match slot {
                PhpValue::Array(array) => Ok(f(array.make_mut())),
                other => Err(PhpError::TypeError(format!(
                    "Cannot use a scalar value of type {} as an array",
                    other.debug_type_name()
                ))),
            }
        })?
    }

    // ---- silent casts ----

    /// Reference: $PHP_SRC_PATH/Zend/zend_operators.c - zend_is_true
    pub fn to_bool(&self) -> bool {
        self.with_deref(|v| match v {
            PhpValue::Null => false,
            PhpValue::Bool(b) => *b,
            PhpValue::Long(i) => *i != 0,
            PhpValue::Double(d) => *d != 0.0,
            PhpValue::String(s) => !(s.is_empty() || s.as_bytes() == b"0"),
            PhpValue::Array(a) => !a.is_empty(),
            PhpValue::Object(_) | PhpValue::Resource(_) => true,
            PhpValue::Alias(_) => unreachable!("aliases never nest"),
        })
    }

    /// `(int)$x`
    /// Reference: $PHP_SRC_PATH/Zend/zend_operators.c - zval_get_long
    pub fn to_long(&self) -> i64 {
        self.with_deref(|v| match v {
            PhpValue::Null => 0,
            PhpValue::Bool(b) => i64::from(*b),
            PhpValue::Long(i) => *i,
            PhpValue::Double(d) => convert::double_to_long(*d),
            PhpValue::String(s) => convert::string_to_long(s.as_bytes()),
            PhpValue::Array(a) => i64::from(!a.is_empty()),
            PhpValue::Object(_) => 1,
            PhpValue::Resource(r) => r.id(),
            PhpValue::Alias(_) => unreachable!("aliases never nest"),
        })
    }

    /// `(float)$x`
    pub fn to_double(&self) -> f64 {
        self.with_deref(|v| match v {
            PhpValue::Null => 0.0,
            PhpValue::Bool(b) => f64::from(u8::from(*b)),
            PhpValue::Long(i) => *i as f64,
            PhpValue::Double(d) => *d,
            PhpValue::String(s) => convert::string_to_double(s.as_bytes()),
            PhpValue::Array(a) => f64::from(u8::from(!a.is_empty())),
            PhpValue::Object(_) => 1.0,
            PhpValue::Resource(r) => r.id() as f64,
            PhpValue::Alias(_) => unreachable!("aliases never nest"),
        })
    }

    /// Numeric view used by arithmetic. Strings report how much of them was
    /// numeric; arrays and objects report `NonNumeric` so the caller can
    /// decide between a warning and a type error.
    pub fn to_number(&self) -> NumericParse {
        self.with_deref(|v| {
            let numeric = |number| NumericParse {
                number,
                kind: NumericKind::Numeric,
            };
            match v {
                PhpValue::Null => numeric(Number::Long(0)),
                PhpValue::Bool(b) => numeric(Number::Long(i64::from(*b))),
                PhpValue::Long(i) => numeric(Number::Long(*i)),
                PhpValue::Double(d) => numeric(Number::Double(*d)),
                PhpValue::String(s) => convert::parse_numeric(s.as_bytes()),
                PhpValue::Resource(r) => numeric(Number::Long(r.id())),
                PhpValue::Array(_) | PhpValue::Object(_) => NumericParse {
                    number: Number::Long(v.to_long()),
                    kind: NumericKind::NonNumeric,
                },
                PhpValue::Alias(_) => unreachable!("aliases never nest"),
            }
        })
    }

    /// `(string)$x` with the default precision; arrays become `"Array"` and
    /// objects without `__toString` become `"Object"` without a diagnostic.
    pub fn to_php_string(&self) -> PhpString {
        self.to_php_string_with_precision(DEFAULT_PRECISION)
    }

    pub fn to_php_string_with_precision(&self, precision: i32) -> PhpString {
        self.with_deref(|v| match v {
            PhpValue::Null => PhpString::new(),
            PhpValue::Bool(true) => PhpString::from("1"),
            PhpValue::Bool(false) => PhpString::new(),
            PhpValue::Long(i) => PhpString::from(i.to_string()),
            PhpValue::Double(d) => PhpString::from(convert::format_double(*d, precision)),
            PhpValue::String(s) => s.clone(),
            PhpValue::Array(_) => PhpString::from("Array"),
            PhpValue::Object(o) => o.to_php_string().unwrap_or_else(|| PhpString::from("Object")),
            PhpValue::Resource(r) => PhpString::from(format!("Resource id #{}", r.id())),
            PhpValue::Alias(_) => unreachable!("aliases never nest"),
        })
    }

    /// `(array)$x`
    /// Reference: $PHP_SRC_PATH/Zend/zend_operators.c - convert_to_array
    pub fn to_array(&self) -> PhpArray {
        self.with_deref(|v| match v {
            PhpValue::Null => PhpArray::new(),
            PhpValue::Array(a) => a.clone(),
            PhpValue::Object(o) => {
                let mut builder = ArrayBuilder::with_capacity(o.property_count());
                for (name, value) in o.properties().iter() {
                    builder = builder.insert(name.clone(), value.copy_value());
                }
                builder.finish()
            }
            scalar => ArrayBuilder::new().push(scalar.clone()).finish(),
        })
    }
}

impl From<bool> for PhpValue {
    fn from(b: bool) -> Self {
        PhpValue::Bool(b)
    }
}

impl From<i64> for PhpValue {
    fn from(i: i64) -> Self {
        PhpValue::Long(i)
    }
}

impl From<i32> for PhpValue {
    fn from(i: i32) -> Self {
        PhpValue::Long(i64::from(i))
    }
}

impl From<f64> for PhpValue {
    fn from(d: f64) -> Self {
        PhpValue::Double(d)
    }
}

impl From<&str> for PhpValue {
    fn from(s: &str) -> Self {
        PhpValue::String(PhpString::from(s))
    }
}

impl From<String> for PhpValue {
    fn from(s: String) -> Self {
        PhpValue::String(PhpString::from(s))
    }
}

impl From<Vec<u8>> for PhpValue {
    fn from(bytes: Vec<u8>) -> Self {
        PhpValue::String(PhpString::from_bytes(bytes))
    }
}

impl From<PhpString> for PhpValue {
    fn from(s: PhpString) -> Self {
        PhpValue::String(s)
    }
}

impl From<PhpArray> for PhpValue {
    fn from(a: PhpArray) -> Self {
        PhpValue::Array(a)
    }
}

impl From<OrderedDictionary> for PhpValue {
    fn from(d: OrderedDictionary) -> Self {
        PhpValue::Array(PhpArray::from(d))
    }
}

impl From<PhpObject> for PhpValue {
    fn from(o: PhpObject) -> Self {
        PhpValue::Object(o)
    }
}

impl From<PhpAlias> for PhpValue {
    fn from(a: PhpAlias) -> Self {
        PhpValue::Alias(a)
    }
}

impl From<PhpResource> for PhpValue {
    fn from(r: PhpResource) -> Self {
        PhpValue::Resource(r)
    }
}

impl<T: Into<PhpValue>> From<Option<T>> for PhpValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(PhpValue::Null, Into::into)
    }
}
