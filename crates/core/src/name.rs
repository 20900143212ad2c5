//! Indexed backup names
//!
//! Backups of `save.dat` are stored as `save.dat`, `save_00000000000000000001.dat`,
//! `save_00000000000000000002.dat` and so on. The index is always rendered at the
//! width of `u64::MAX`, so lexicographic order of the names matches numeric order.
//!
//! Known limitation: a logical name that itself ends in `_<digits>` is
//! indistinguishable from an indexed one (`log_2024.txt` parses as `log` with
//! index 2024).

use crate::error::{BackupError, Result};
use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Separator between the logical name and its index
pub const INDEX_SEP: &str = "_";

/// Rendered width of every non-zero index
pub const INDEX_WIDTH: usize = Index::MAX.width();

/// Ordering index of a backup copy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Index(pub u64);

impl Index {
    pub const MAX: Index = Index(u64::MAX);

    /// Number of decimal digits in the value (`0` has width 1)
    pub const fn width(self) -> usize {
        let mut val = self.0;
        if val == 0 {
            return 1;
        }
        let mut out = 0;
        while val > 0 {
            out += 1;
            val /= 10;
        }
        out
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// The following index, or `None` at `u64::MAX`
    pub fn checked_next(self) -> Option<Index> {
        self.0.checked_add(1).map(Index)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = INDEX_WIDTH)
    }
}

/// A file name split into `name`, `index` and `ext`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IndexedName {
    pub name: String,
    pub index: Index,
    pub ext: String,
}

impl IndexedName {
    pub fn new(name: impl Into<String>, index: u64, ext: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: Index(index),
            ext: ext.into(),
        }
    }

    /// Parse the final component of `path`
    pub fn parse(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match path.file_name() {
            Some(file_name) => Self::from_file_name(&file_name.to_string_lossy()),
            None => Self::from_file_name(&path.to_string_lossy()),
        }
    }

    /// Parse a bare file name. Never fails: an unparseable suffix stays part of `name`.
    pub fn from_file_name(src: &str) -> Self {
        let (base, ext) = split_file_name(src);

        if let Some(pos) = base.rfind(INDEX_SEP) {
            if let Some(index) = parse_index(&base[pos + INDEX_SEP.len()..]) {
                return Self::new(&base[..pos], index, ext);
            }
        }

        Self::new(base, 0, ext)
    }

    /// Same logical file, index ignored
    pub fn related(&self, other: &IndexedName) -> bool {
        self.name == other.name && self.ext == other.ext
    }

    /// Ascending by index
    pub fn cmp_index(&self, other: &IndexedName) -> Ordering {
        self.index.cmp(&other.index)
    }

    /// The same name with the index incremented
    pub fn next(&self) -> Result<IndexedName> {
        let index = self
            .index
            .checked_next()
            .ok_or_else(|| BackupError::IndexOverflow {
                name: self.to_string(),
            })?;

        Ok(Self {
            name: self.name.clone(),
            index,
            ext: self.ext.clone(),
        })
    }
}

impl fmt::Display for IndexedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index.is_zero() {
            write!(f, "{}{}", self.name, self.ext)
        } else {
            write!(f, "{}{}{}{}", self.name, INDEX_SEP, self.index, self.ext)
        }
    }
}

impl FromStr for IndexedName {
    type Err = Infallible;

    fn from_str(src: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(src))
    }
}

/// Split a file name into base and extension.
///
/// Unlike `Path::extension`, the extension keeps its leading dot, and a name
/// whose only dot is the first character (`.gitignore`) has no extension.
fn split_file_name(src: &str) -> (&str, &str) {
    match src.rfind('.') {
        Some(pos) if pos > 0 => (&src[..pos], &src[pos..]),
        _ => (src, ""),
    }
}

/// Strict base-10 parse: no sign, no whitespace, no empty string
fn parse_index(src: &str) -> Option<u64> {
    if src.is_empty() || !src.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    src.parse().ok()
}
