//! DNS domain name representation.
//!
//! The cache stores every name it keeps, so names here own their bytes:
//! uncompressed wire format in an inline small buffer. Comparison, hashing
//! and suffix matching are case-insensitive per RFC 1035 / RFC 4343.

use crate::error::{Error, Result};
use crate::{MAX_LABEL_LENGTH, MAX_NAME_LENGTH};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A DNS domain name in uncompressed wire format.
///
/// Wire format is a sequence of length-prefixed labels terminated by the
/// zero-length root label. `www.example.com.` is stored as:
///
/// ```text
/// 03 'w' 'w' 'w' 07 'e' 'x' 'a' 'm' 'p' 'l' 'e' 03 'c' 'o' 'm' 00
/// ```
///
/// Compression pointers are rejected: a stored name must stand on its own.
/// Equality and hashing are ASCII-case-insensitive; the label length bytes
/// are below `0x41` so a plain byte-wise case fold is exact.
#[derive(Clone)]
pub struct Name {
    /// Uncompressed wire bytes, including the terminating root label.
    wire: SmallVec<[u8; 64]>,
}

impl Name {
    /// Creates the root domain name.
    #[inline]
    pub fn root() -> Self {
        let mut wire = SmallVec::new();
        wire.push(0);
        Self { wire }
    }

    /// Creates a domain name from uncompressed wire-format bytes.
    ///
    /// The slice must cover exactly one name, terminating root label
    /// included.
    pub fn from_wire(slice: &[u8]) -> Result<Self> {
        Self::validate_wire(slice)?;
        Ok(Self {
            wire: SmallVec::from_slice(slice),
        })
    }

    /// Validates one uncompressed wire-format name spanning the whole slice.
    fn validate_wire(bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Err(Error::unexpected_eof(0));
        }
        if bytes.len() > MAX_NAME_LENGTH {
            return Err(Error::NameTooLong { length: bytes.len() });
        }

        let mut pos = 0;
        loop {
            if pos >= bytes.len() {
                return Err(Error::unexpected_eof(pos));
            }
            let len = bytes[pos] as usize;
            if len == 0 {
                // Root label must be the final byte.
                if pos + 1 != bytes.len() {
                    return Err(Error::invalid_data(pos, "data after root label"));
                }
                return Ok(());
            }
            if len >= 0xC0 {
                return Err(Error::invalid_data(pos, "compression pointer in stored name"));
            }
            if len > MAX_LABEL_LENGTH {
                return Err(Error::LabelTooLong { length: len });
            }
            pos += 1 + len;
        }
    }

    /// Returns the wire-format bytes, terminating root label included.
    #[inline]
    pub fn as_wire(&self) -> &[u8] {
        &self.wire
    }

    /// Returns the wire-format length in bytes.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.wire.len()
    }

    /// Returns true if this is the root domain.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.wire.len() == 1
    }

    /// Returns an iterator over the label byte slices, root excluded.
    #[inline]
    pub fn labels(&self) -> Labels<'_> {
        Labels {
            wire: &self.wire,
            pos: 0,
        }
    }

    /// Returns the number of labels, root excluded.
    pub fn label_count(&self) -> usize {
        self.labels().count()
    }

    /// Lowercases the name in place.
    pub fn make_lowercase(&mut self) {
        for byte in self.wire.iter_mut() {
            byte.make_ascii_lowercase();
        }
    }

    /// Returns a lowercased copy of the name.
    #[must_use]
    pub fn lowercased(&self) -> Self {
        let mut copy = self.clone();
        copy.make_lowercase();
        copy
    }

    /// Returns true if this name equals `other` or sits below it in the
    /// DNS tree.
    ///
    /// `www.example.com` is part of `example.com` and of the root; the
    /// comparison is case-insensitive and respects label boundaries, so
    /// `notexample.com` is not part of `example.com`.
    pub fn is_part_of(&self, other: &Name) -> bool {
        if other.wire_len() > self.wire_len() {
            return false;
        }

        let tail_start = self.wire_len() - other.wire_len();
        let tail = &self.wire[tail_start..];
        if !tail.eq_ignore_ascii_case(other.as_wire()) {
            return false;
        }

        // The match must begin at a label boundary of this name.
        let mut pos = 0;
        while pos < tail_start {
            pos += 1 + self.wire[pos] as usize;
        }
        pos == tail_start
    }
}

/// Iterator over the labels of a [`Name`], root label excluded.
pub struct Labels<'a> {
    wire: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let len = *self.wire.get(self.pos)? as usize;
        if len == 0 {
            return None;
        }
        let start = self.pos + 1;
        let end = start + len;
        let label = self.wire.get(start..end)?;
        self.pos = end;
        Some(label)
    }
}

impl std::iter::FusedIterator for Labels<'_> {}

impl FromStr for Name {
    type Err = Error;

    /// Parses a name from dotted text. A trailing dot is accepted and
    /// implied when absent.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || s == "." {
            return Ok(Self::root());
        }

        let s = s.strip_suffix('.').unwrap_or(s);
        let mut wire = SmallVec::<[u8; 64]>::new();

        for part in s.split('.') {
            if part.is_empty() {
                return Err(Error::invalid_data(0, "empty label"));
            }
            if part.len() > MAX_LABEL_LENGTH {
                return Err(Error::LabelTooLong { length: part.len() });
            }
            for (i, c) in part.chars().enumerate() {
                if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '*' {
                    return Err(Error::InvalidLabelChar {
                        character: c,
                        position: i,
                    });
                }
            }
            wire.push(part.len() as u8);
            wire.extend_from_slice(part.as_bytes());
        }

        wire.push(0);
        if wire.len() > MAX_NAME_LENGTH {
            return Err(Error::NameTooLong { length: wire.len() });
        }

        Ok(Self { wire })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, ".");
        }
        let mut out = CompactString::default();
        for label in self.labels() {
            for &byte in label {
                if byte == b'.' || byte == b'\\' {
                    out.push('\\');
                    out.push(byte as char);
                } else if byte.is_ascii_graphic() || byte == b' ' {
                    out.push(byte as char);
                } else {
                    out.push_str(&format!("\\{byte:03}"));
                }
            }
            out.push('.');
        }
        write!(f, "{out}")
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name(\"{self}\")")
    }
}

impl PartialEq for Name {
    /// Case-insensitive comparison per DNS semantics.
    fn eq(&self, other: &Self) -> bool {
        self.wire.eq_ignore_ascii_case(&other.wire)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for &byte in self.wire.iter() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::root()
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_name() {
        let root = Name::root();
        assert!(root.is_root());
        assert_eq!(root.wire_len(), 1);
        assert_eq!(root.label_count(), 0);
        assert_eq!(root.to_string(), ".");
    }

    #[test]
    fn test_from_str_roundtrip() {
        let name = Name::from_str("www.example.com.").unwrap();
        assert_eq!(name.label_count(), 3);
        assert_eq!(name.to_string(), "www.example.com.");
        assert_eq!(
            name.as_wire(),
            b"\x03www\x07example\x03com\x00".as_slice()
        );

        // Without trailing dot
        let name2 = Name::from_str("www.example.com").unwrap();
        assert_eq!(name, name2);
    }

    #[test]
    fn test_case_insensitive_equality() {
        let lower = Name::from_str("www.example.com").unwrap();
        let upper = Name::from_str("WWW.EXAMPLE.COM").unwrap();
        let mixed = Name::from_str("Www.ExAmPlE.CoM").unwrap();

        assert_eq!(lower, upper);
        assert_eq!(lower, mixed);

        use std::collections::hash_map::DefaultHasher;
        let mut h1 = DefaultHasher::new();
        let mut h2 = DefaultHasher::new();
        lower.hash(&mut h1);
        upper.hash(&mut h2);
        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn test_lowercased() {
        let name = Name::from_str("WWW.Example.COM").unwrap();
        assert_eq!(name.lowercased().as_wire(), b"\x03www\x07example\x03com\x00");
    }

    #[test]
    fn test_from_wire_validation() {
        assert!(Name::from_wire(b"\x03www\x07example\x03com\x00").is_ok());

        // Truncated
        assert!(Name::from_wire(b"\x03www").is_err());
        // Compression pointer
        assert!(Name::from_wire(b"\xC0\x0C").is_err());
        // Trailing junk after root
        assert!(Name::from_wire(b"\x03www\x00\x01").is_err());
        // Empty slice
        assert!(Name::from_wire(b"").is_err());
    }

    #[test]
    fn test_labels_iterator() {
        let name = Name::from_str("www.example.com").unwrap();
        let labels: Vec<&[u8]> = name.labels().collect();
        assert_eq!(labels, vec![b"www".as_slice(), b"example", b"com"]);
    }

    #[test]
    fn test_is_part_of() {
        let www = Name::from_str("www.example.com").unwrap();
        let parent = Name::from_str("example.com").unwrap();
        let upper_parent = Name::from_str("EXAMPLE.COM").unwrap();
        let other = Name::from_str("other.com").unwrap();
        let overlap = Name::from_str("notexample.com").unwrap();

        assert!(www.is_part_of(&parent));
        assert!(www.is_part_of(&upper_parent));
        assert!(www.is_part_of(&www));
        assert!(www.is_part_of(&Name::root()));
        assert!(!parent.is_part_of(&www));
        assert!(!www.is_part_of(&other));
        assert!(!overlap.is_part_of(&parent));
    }

    #[test]
    fn test_empty_label_rejected() {
        assert!(Name::from_str("a..b").is_err());
        assert!(Name::from_str(".example.com").is_err());
    }

    #[test]
    fn test_label_too_long() {
        let long_label = "a".repeat(64);
        assert!(matches!(
            Name::from_str(&long_label),
            Err(Error::LabelTooLong { .. })
        ));
    }

    #[test]
    fn test_name_too_long() {
        let label = "a".repeat(63);
        let long_name = format!("{label}.{label}.{label}.{label}.{label}");
        assert!(matches!(
            Name::from_str(&long_name),
            Err(Error::NameTooLong { .. })
        ));
    }
}
