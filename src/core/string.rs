//! Binary-safe PHP strings
//!
//! PHP strings are byte arrays with value semantics. Copies share one
//! backing buffer and a private copy is made on the first in-place write.
//!
//! Two representations are kept:
//! - **Text**: an immutable `Rc<str>`, produced from Rust literals and
//!   conversions that are known to be UTF-8.
//! - **Blob**: a growable `Rc<Vec<u8>>`, produced by binary input and by any
//!   mutation (append, offset write). Text is promoted to Blob on first write.
//!
//! Both compare, hash and order by their bytes, so the representation is
//! never observable.
//!
//! ## References
//!
//! - Zend: `$PHP_SRC_PATH/Zend/zend_string.h` - zend_string, separation

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

#[derive(Clone)]
enum Repr {
    Text(Rc<str>),
    Blob(Rc<Vec<u8>>),
}

#[derive(Clone)]
pub struct PhpString {
    repr: Repr,
}

impl PhpString {
    pub fn new() -> Self {
        Self {
            repr: Repr::Text(Rc::from("")),
        }
    }

    pub fn from_text(s: &str) -> Self {
        Self {
            repr: Repr::Text(Rc::from(s)),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            repr: Repr::Blob(Rc::new(bytes)),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.repr {
            Repr::Text(s) => s.as_bytes(),
            Repr::Blob(b) => b.as_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// True while the string still uses the immutable text representation.
    pub fn is_text(&self) -> bool {
        matches!(self.repr, Repr::Text(_))
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        match &self.repr {
            Repr::Text(s) => Cow::Borrowed(s),
            Repr::Blob(b) => String::from_utf8_lossy(b),
        }
    }

    /// Whether two strings currently share one backing buffer.
    pub fn shares_buffer_with(&self, other: &PhpString) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Text(a), Repr::Text(b)) => Rc::ptr_eq(a, b),
            (Repr::Blob(a), Repr::Blob(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Separate from any sharers and return the private byte buffer.
    fn make_mut(&mut self) -> &mut Vec<u8> {
        if let Repr::Text(s) = &self.repr {
            self.repr = Repr::Blob(Rc::new(s.as_bytes().to_vec()));
        }
        match &mut self.repr {
            Repr::Blob(b) => Rc::make_mut(b),
            Repr::Text(_) => unreachable!("text representation promoted above"),
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.make_mut().extend_from_slice(bytes);
    }

    pub fn push_str(&mut self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    /// Concatenation (`.` operator)
    pub fn concat(&self, other: &PhpString) -> PhpString {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut bytes = Vec::with_capacity(self.len() + other.len());
        bytes.extend_from_slice(self.as_bytes());
        bytes.extend_from_slice(other.as_bytes());
        PhpString::from_bytes(bytes)
    }

    /// Read the byte at a PHP string offset (negative offsets count from the end).
    pub fn byte_at(&self, offset: i64) -> Option<u8> {
        let index = self.resolve_offset(offset)?;
        self.as_bytes().get(index).copied()
    }

    /// Write a byte at a PHP string offset (`$s[$i] = 'x'`).
    ///
    /// Writing past the end pads with spaces. Returns `false` for a negative
    /// offset that lands before the start of the string; the string is left
    /// unchanged in that case.
    /// Reference: $PHP_SRC_PATH/Zend/zend_execute.c - zend_assign_to_string_offset
    pub fn set_byte(&mut self, offset: i64, byte: u8) -> bool {
        let Some(index) = self.resolve_offset(offset) else {
            return false;
        };
        let buf = self.make_mut();
        if index >= buf.len() {
            buf.resize(index, b' ');
            buf.push(byte);
        } else {
            buf[index] = byte;
        }
        true
    }

    fn resolve_offset(&self, offset: i64) -> Option<usize> {
        if offset >= 0 {
            return usize::try_from(offset).ok();
        }
        let len = self.len() as i64;
        let index = len + offset;
        if index < 0 { None } else { Some(index as usize) }
    }
}

impl Default for PhpString {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for PhpString {
    fn from(s: &str) -> Self {
        PhpString::from_text(s)
    }
}

impl From<String> for PhpString {
    fn from(s: String) -> Self {
        Self {
            repr: Repr::Text(Rc::from(s)),
        }
    }
}

impl From<Vec<u8>> for PhpString {
    fn from(bytes: Vec<u8>) -> Self {
        PhpString::from_bytes(bytes)
    }
}

impl From<&[u8]> for PhpString {
    fn from(bytes: &[u8]) -> Self {
        PhpString::from_bytes(bytes.to_vec())
    }
}

impl PartialEq for PhpString {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for PhpString {}

impl PartialEq<str> for PhpString {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for PhpString {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Hash for PhpString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl PartialOrd for PhpString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PhpString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl fmt::Debug for PhpString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

impl fmt::Display for PhpString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_separates_shared_buffer() {
        let a = PhpString::from_bytes(b"hello".to_vec());
        let mut b = a.clone();
        assert!(a.shares_buffer_with(&b));

        assert!(b.set_byte(0, b'j'));
        assert_eq!(a.as_bytes(), b"hello");
        assert_eq!(b.as_bytes(), b"jello");
        assert!(!a.shares_buffer_with(&b));
    }

    #[test]
    fn text_promotes_to_blob_on_write() {
        let mut s = PhpString::from("abc");
        assert!(s.is_text());
        s.push_str("def");
        assert!(!s.is_text());
        assert_eq!(s, "abcdef");
    }

    #[test]
    fn offset_write_pads_with_spaces() {
        let mut s = PhpString::from("ab");
        assert!(s.set_byte(4, b'z'));
        assert_eq!(s.as_bytes(), b"ab  z");
    }

    #[test]
    fn negative_offsets() {
        let mut s = PhpString::from("abc");
        assert_eq!(s.byte_at(-1), Some(b'c'));
        assert!(s.set_byte(-3, b'X'));
        assert_eq!(s, "Xbc");
        assert!(!s.set_byte(-4, b'Y'));
        assert_eq!(s, "Xbc");
    }

    #[test]
    fn representations_compare_by_bytes() {
        let text = PhpString::from("same");
        let blob = PhpString::from_bytes(b"same".to_vec());
        assert_eq!(text, blob);
        assert_eq!(text.cmp(&blob), Ordering::Equal);
    }
}
