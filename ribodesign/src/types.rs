// src/types.rs
//
// Small shared value types: nucleotides, target ids, encoded sites.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier attached to a target structure (for result attribution).
pub type TargetId = u64;

/// One RNA nucleotide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nucleotide {
    A,
    C,
    G,
    U,
}

impl Nucleotide {
    /// Enumeration order used by local-improvement search.
    pub const SEARCH_ORDER: [Nucleotide; 4] =
        [Nucleotide::A, Nucleotide::G, Nucleotide::C, Nucleotide::U];

    pub fn as_char(self) -> char {
        match self {
            Nucleotide::A => 'A',
            Nucleotide::C => 'C',
            Nucleotide::G => 'G',
            Nucleotide::U => 'U',
        }
    }

    /// Parse a nucleotide (case-insensitive, `T` read as `U`).
    pub fn from_char(c: char) -> Option<Nucleotide> {
        match c.to_ascii_uppercase() {
            'A' => Some(Nucleotide::A),
            'C' => Some(Nucleotide::C),
            'G' => Some(Nucleotide::G),
            'U' | 'T' => Some(Nucleotide::U),
            _ => None,
        }
    }

    /// Whether `self` and `other` can form a canonical or wobble pair.
    pub fn pairs_with(self, other: Nucleotide) -> bool {
        matches!(
            (self, other),
            (Nucleotide::G, Nucleotide::C)
                | (Nucleotide::C, Nucleotide::G)
                | (Nucleotide::A, Nucleotide::U)
                | (Nucleotide::U, Nucleotide::A)
                | (Nucleotide::G, Nucleotide::U)
                | (Nucleotide::U, Nucleotide::G)
        )
    }
}

impl fmt::Display for Nucleotide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Encoded value of one site of the padded target structure.
///
/// Serializes untagged: a flat site is a bare integer, a one-channel site is
/// a single-element list (`0` vs `[0]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SiteCode {
    Flat(u8),
    Channel([u8; 1]),
}

impl SiteCode {
    /// The underlying code regardless of layout.
    pub fn value(self) -> u8 {
        match self {
            SiteCode::Flat(v) => v,
            SiteCode::Channel([v]) => v,
        }
    }
}
