//! Board squares as 1-based (file, rank) pairs and their `a1`..`h8` labels.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::CoreError;

/// A board square. `file` 1..=8 maps to a..h, `rank` 1..=8 to ranks 1..8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    pub const A1: Square = Square { file: 1, rank: 1 };
    pub const A8: Square = Square { file: 1, rank: 8 };

    /// Build a square from 1-based coordinates, `None` when either is out of range.
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        if (1..=8).contains(&file) && (1..=8).contains(&rank) {
            Some(Self { file, rank })
        } else {
            None
        }
    }

    pub fn file(self) -> u8 {
        self.file
    }

    pub fn rank(self) -> u8 {
        self.rank
    }

    /// Parse a two-character label such as `e4`.
    pub fn from_label(label: &str) -> Option<Self> {
        let bytes = label.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = bytes[0].checked_sub(b'a')? + 1;
        let rank = bytes[1].checked_sub(b'0')?;
        Self::new(file, rank)
    }

    pub fn label(self) -> String {
        self.to_string()
    }

    pub fn file_char(self) -> char {
        (b'a' + self.file - 1) as char
    }

    /// Grid coordinates `(row, col)` with row 0 = rank 8 and col 0 = file a.
    pub fn grid_index(self) -> (usize, usize) {
        ((8 - self.rank) as usize, (self.file - 1) as usize)
    }

    /// All 64 squares, a1, b1, .. h8.
    pub fn all() -> impl Iterator<Item = Square> {
        (1..=8).flat_map(|rank| (1..=8).map(move |file| Square { file, rank }))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank)
    }
}

impl FromStr for Square {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| CoreError::InvalidSquare(s.to_string()))
    }
}

impl Serialize for Square {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
