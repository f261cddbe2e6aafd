//! Immutable views over cached bytes.
//!
//! A [`ByteView`] is what the cache hands out on a hit. The bytes behind it are
//! shared between clones of the view but never mutated; anyone asking for the
//! bytes as an owned buffer gets a fresh copy via [`ByteView::byte_slice`], so a
//! caller can never scribble over what the cache holds.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::lru::Weighted;

/// A read-only snapshot of a byte sequence.
///
/// Cloning a `ByteView` is cheap: clones share the same immutable buffer.
///
/// # Examples
///
/// ```
/// use peercache::ByteView;
///
/// let view = ByteView::from("ABC");
/// let mut bytes = view.byte_slice();
/// bytes[0] = b'X';
///
/// // The view is untouched by changes to the copy.
/// assert_eq!(view.to_string(), "ABC");
/// assert_eq!(view.len(), 3);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ByteView {
    bytes: Arc<[u8]>,
}

impl ByteView {
    /// Creates a view over a private copy of `bytes`.
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        ByteView {
            bytes: Arc::from(bytes),
        }
    }

    /// Number of bytes in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the view holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns an owned copy of the bytes.
    pub fn byte_slice(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// Borrows the bytes without copying them.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Interprets the bytes as UTF-8, replacing invalid sequences.
    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

impl Default for ByteView {
    fn default() -> Self {
        ByteView::copy_from_slice(&[])
    }
}

impl Weighted for ByteView {
    fn weight(&self) -> usize {
        self.len()
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(bytes: Vec<u8>) -> Self {
        ByteView {
            bytes: Arc::from(bytes),
        }
    }
}

impl From<&[u8]> for ByteView {
    fn from(bytes: &[u8]) -> Self {
        ByteView::copy_from_slice(bytes)
    }
}

impl From<&str> for ByteView {
    fn from(s: &str) -> Self {
        ByteView::copy_from_slice(s.as_bytes())
    }
}

impl From<String> for ByteView {
    fn from(s: String) -> Self {
        ByteView::from(s.into_bytes())
    }
}

impl PartialEq<[u8]> for ByteView {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_slice() == other
    }
}

impl PartialEq<&str> for ByteView {
    fn eq(&self, other: &&str) -> bool {
        self.as_slice() == other.as_bytes()
    }
}

impl fmt::Display for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str_lossy())
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteView")
            .field("len", &self.len())
            .field("bytes", &self.as_str_lossy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_slice_is_a_copy() {
        let view = ByteView::from(vec![1u8, 2, 3]);
        let mut copy = view.byte_slice();
        copy[0] = 42;
        assert_eq!(view.as_slice(), &[1, 2, 3]);
        assert_eq!(view.byte_slice(), vec![1, 2, 3]);
    }

    #[test]
    fn test_clones_share_storage() {
        let view = ByteView::from("shared");
        let clone = view.clone();
        assert_eq!(view, clone);
        assert!(core::ptr::eq(view.as_slice(), clone.as_slice()));
    }

    #[test]
    fn test_len_and_display() {
        let view = ByteView::from(String::from("hello"));
        assert_eq!(view.len(), 5);
        assert!(!view.is_empty());
        assert_eq!(view.weight(), 5);
        assert_eq!(view.to_string(), "hello");
        assert!(ByteView::default().is_empty());
    }

    #[test]
    fn test_lossy_display_of_binary() {
        let view = ByteView::from(&[0xffu8, b'a'][..]);
        assert_eq!(view.as_str_lossy(), "\u{fffd}a");
    }
}
