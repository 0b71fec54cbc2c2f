// src/structure.rs
//
// Dot-bracket structure encoders.
//
// Pure functions only: pairing table from bracket matching, padded site
// encoding for the observation window, and positional structure distance.

use std::fmt;

use crate::types::SiteCode;

/// Symbol used to pad the structure on both sides.
pub const PAD: char = '=';

/// Errors raised for malformed dot-bracket input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    /// Structure has no sites.
    Empty,
    /// A symbol outside `{'.', '(', ')'}`.
    InvalidSymbol { index: usize, symbol: char },
    /// A `)` with no open bracket to close.
    UnmatchedClose { index: usize },
    /// A `(` still open at the end of the structure.
    UnmatchedOpen { index: usize },
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureError::Empty => write!(f, "dot-bracket structure is empty"),
            StructureError::InvalidSymbol { index, symbol } => {
                write!(f, "invalid symbol {:?} at site {}", symbol, index)
            }
            StructureError::UnmatchedClose { index } => {
                write!(f, "unbalanced structure: ')' at site {} has no partner", index)
            }
            StructureError::UnmatchedOpen { index } => {
                write!(f, "unbalanced structure: '(' at site {} is never closed", index)
            }
        }
    }
}

impl std::error::Error for StructureError {}

/// Build the pairing table of a dot-bracket structure.
///
/// `table[i] == Some(j)` iff sites `i` and `j` form a base pair; the table is
/// symmetric by construction.
pub fn encode_pairing(dot_bracket: &str) -> Result<Vec<Option<usize>>, StructureError> {
    if dot_bracket.is_empty() {
        return Err(StructureError::Empty);
    }

    let mut table = vec![None; dot_bracket.chars().count()];
    let mut stack: Vec<usize> = Vec::new();

    for (index, symbol) in dot_bracket.chars().enumerate() {
        match symbol {
            '(' => stack.push(index),
            ')' => {
                let open = stack
                    .pop()
                    .ok_or(StructureError::UnmatchedClose { index })?;
                table[open] = Some(index);
                table[index] = Some(open);
            }
            '.' => {}
            other => {
                return Err(StructureError::InvalidSymbol {
                    index,
                    symbol: other,
                })
            }
        }
    }

    if let Some(&index) = stack.last() {
        return Err(StructureError::UnmatchedOpen { index });
    }

    Ok(table)
}

fn site_code(symbol: char, use_embedding: bool) -> u8 {
    if use_embedding {
        match symbol {
            '.' => 0,
            '(' => 1,
            ')' => 2,
            _ => 3,
        }
    } else {
        match symbol {
            '(' | ')' => 1,
            _ => 0,
        }
    }
}

/// Encode a structure padded with `radius` neutral sites on each side.
///
/// Embedding mode uses four codes (unpaired, open, close, pad); binary mode
/// collapses to paired = 1 and unpaired/pad = 0. In binary mode with
/// `use_conv` every site is emitted as a one-channel vector.
pub fn encode_structure(
    dot_bracket: &str,
    radius: usize,
    use_conv: bool,
    use_embedding: bool,
) -> Vec<SiteCode> {
    let channels = use_conv && !use_embedding;
    let padding = std::iter::repeat(PAD).take(radius);

    padding
        .clone()
        .chain(dot_bracket.chars())
        .chain(padding)
        .map(|symbol| {
            let code = site_code(symbol, use_embedding);
            if channels {
                SiteCode::Channel([code])
            } else {
                SiteCode::Flat(code)
            }
        })
        .collect()
}

/// Positional mismatch count; `None` if the strings differ in length.
pub fn hamming(a: &str, b: &str) -> Option<usize> {
    if a.len() != b.len() {
        return None;
    }
    Some(a.bytes().zip(b.bytes()).filter(|(x, y)| x != y).count())
}

/// Indices at which two equal-length strings differ.
pub fn differing_sites(a: &str, b: &str) -> Vec<usize> {
    a.bytes()
        .zip(b.bytes())
        .enumerate()
        .filter(|(_, (x, y))| x != y)
        .map(|(i, _)| i)
        .collect()
}
