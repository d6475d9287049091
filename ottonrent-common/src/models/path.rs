// File: ottonrent-common/src/models/path.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A slash-separated location inside a tenant's document tree.
///
/// Paths are normalized on construction: leading, trailing and repeated
/// slashes are dropped, so `"/cred1/"`, `"cred1"` and `"//cred1"` are the same
/// path. The root path has no segments and displays as `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn parse(raw: &str) -> Self {
        Self {
            segments: raw
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Appends `child`, which may itself contain slashes.
    pub fn child(&self, child: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(
            child
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        Self { segments }
    }

    pub fn join<I, S>(&self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        parts
            .into_iter()
            .fold(self.clone(), |acc, part| acc.child(part.as_ref()))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    /// True when `self` equals `other` or lies above it.
    pub fn contains(&self, other: &StorePath) -> bool {
        other.segments.len() >= self.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// True when a write at `other` can change the value visible at `self`.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// The segments of `other` below `self`, if `self` contains it.
    pub fn relative<'a>(&self, other: &'a StorePath) -> Option<&'a [String]> {
        if self.contains(other) {
            other.segments.get(self.segments.len()..)
        } else {
            None
        }
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.segments {
            write!(f, "/{}", seg)?;
        }
        Ok(())
    }
}

impl FromStr for StorePath {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(StorePath::parse(s))
    }
}

impl From<&str> for StorePath {
    fn from(s: &str) -> Self {
        StorePath::parse(s)
    }
}

impl Serialize for StorePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StorePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(StorePath::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_slashes() {
        assert_eq!(StorePath::parse("//cred1/locked/"), StorePath::parse("cred1/locked"));
        assert_eq!(StorePath::parse("/").to_string(), "/");
        assert_eq!(StorePath::parse("cred1/locked").to_string(), "/cred1/locked");
    }

    #[test]
    fn child_accepts_nested_segments() {
        let p = StorePath::root().child("transactions").child("FTRIAL-ID/u1");
        assert_eq!(p.segments(), &["transactions", "FTRIAL-ID", "u1"]);
        assert_eq!(p.parent().map(|p| p.to_string()), Some("/transactions/FTRIAL-ID".to_string()));
    }

    #[test]
    fn containment_and_overlap() {
        let users = StorePath::parse("/users");
        let u1 = StorePath::parse("/users/u1");
        let slots = StorePath::parse("/slots");
        assert!(users.contains(&u1));
        assert!(!u1.contains(&users));
        assert!(u1.overlaps(&users));
        assert!(!slots.overlaps(&u1));
        assert!(StorePath::root().contains(&slots));
        assert_eq!(users.relative(&u1), Some(&["u1".to_string()][..]));
        assert_eq!(slots.relative(&u1), None);
    }
}
