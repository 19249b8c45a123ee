//! Array keys
//!
//! PHP arrays are keyed by integers or byte strings. Strings that spell a
//! canonical decimal integer are stored as integers, so `$a["7"]` and `$a[7]`
//! address the same entry.
//!
//! ## References
//!
//! - Zend: `$PHP_SRC_PATH/Zend/zend_hash.h` - ZEND_HANDLE_NUMERIC_STR
//! - Zend: `$PHP_SRC_PATH/Zend/zend_execute.c` - zend_fetch_dimension_address_inner

use crate::core::string::PhpString;
use crate::core::value::PhpValue;
use crate::runtime::error::PhpError;
use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IntStringKey {
    Int(i64),
    Str(PhpString),
}

/// A lossy key conversion the caller may want to report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyCastNotice {
    /// A float with a fractional part was truncated.
    FractionalFloat(f64),
    /// A resource was used as an offset (its id becomes the key).
    Resource(i64),
}

impl IntStringKey {
    /// Build a key from string bytes, normalising canonical integers.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match canonical_int(bytes) {
            Some(i) => IntStringKey::Int(i),
            None => IntStringKey::Str(PhpString::from(bytes)),
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, IntStringKey::Int(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            IntStringKey::Int(i) => Some(*i),
            IntStringKey::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&PhpString> {
        match self {
            IntStringKey::Int(_) => None,
            IntStringKey::Str(s) => Some(s),
        }
    }

    /// Hash used by the bucket table: integers hash to themselves.
    pub fn hash_code(&self) -> u64 {
        match self {
            IntStringKey::Int(i) => *i as u64,
            IntStringKey::Str(s) => xxh3_64(s.as_bytes()),
        }
    }

    pub fn to_value(&self) -> PhpValue {
        match self {
            IntStringKey::Int(i) => PhpValue::Long(*i),
            IntStringKey::Str(s) => PhpValue::String(s.clone()),
        }
    }

    pub fn to_php_string(&self) -> PhpString {
        match self {
            IntStringKey::Int(i) => PhpString::from(i.to_string()),
            IntStringKey::Str(s) => s.clone(),
        }
    }

    /// Convert an offset value to a key.
    ///
    /// Arrays and objects are illegal offsets. Floats truncate and resources
    /// use their id; both are reported back so the caller can emit the
    /// matching diagnostic.
    pub fn try_from_value(value: &PhpValue) -> Result<(Self, Option<KeyCastNotice>), PhpError> {
        value.with_deref(|v| match v {
            PhpValue::Null => Ok((IntStringKey::Str(PhpString::new()), None)),
            PhpValue::Bool(b) => Ok((IntStringKey::Int(i64::from(*b)), None)),
            PhpValue::Long(i) => Ok((IntStringKey::Int(*i), None)),
            PhpValue::Double(d) => {
                let key = IntStringKey::Int(crate::core::convert::double_to_long(*d));
                let notice = if d.is_finite() && d.fract() == 0.0 {
                    None
                } else {
                    Some(KeyCastNotice::FractionalFloat(*d))
                };
                Ok((key, notice))
            }
            PhpValue::String(s) => Ok((IntStringKey::from(s.clone()), None)),
            PhpValue::Resource(r) => Ok((
                IntStringKey::Int(r.id()),
                Some(KeyCastNotice::Resource(r.id())),
            )),
            PhpValue::Array(_) | PhpValue::Object(_) => {
                Err(PhpError::TypeError("Illegal offset type".into()))
            }
            PhpValue::Alias(_) => unreachable!("aliases never nest"),
        })
    }
}

/// Decimal integer in canonical form: no sign on zero, no leading zeros, no
/// whitespace, within `i64` range.
fn canonical_int(bytes: &[u8]) -> Option<i64> {
    let digits = match bytes.first()? {
        b'-' => &bytes[1..],
        _ => bytes,
    };
    if digits.is_empty() || digits.len() > 19 || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if digits[0] == b'0' && (digits.len() > 1 || bytes.len() > 1) {
        return None;
    }
    std::str::from_utf8(bytes).ok()?.parse::<i64>().ok()
}

impl From<i64> for IntStringKey {
    fn from(i: i64) -> Self {
        IntStringKey::Int(i)
    }
}

impl From<i32> for IntStringKey {
    fn from(i: i32) -> Self {
        IntStringKey::Int(i64::from(i))
    }
}

impl From<usize> for IntStringKey {
    fn from(i: usize) -> Self {
        IntStringKey::Int(i as i64)
    }
}

impl From<&str> for IntStringKey {
    fn from(s: &str) -> Self {
        match canonical_int(s.as_bytes()) {
            Some(i) => IntStringKey::Int(i),
            None => IntStringKey::Str(PhpString::from(s)),
        }
    }
}

impl From<String> for IntStringKey {
    fn from(s: String) -> Self {
        match canonical_int(s.as_bytes()) {
            Some(i) => IntStringKey::Int(i),
            None => IntStringKey::Str(PhpString::from(s)),
        }
    }
}

impl From<PhpString> for IntStringKey {
    fn from(s: PhpString) -> Self {
        match canonical_int(s.as_bytes()) {
            Some(i) => IntStringKey::Int(i),
            None => IntStringKey::Str(s),
        }
    }
}

impl fmt::Display for IntStringKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntStringKey::Int(i) => write!(f, "{}", i),
            IntStringKey::Str(s) => write!(f, "{}", s),
        }
    }
}
