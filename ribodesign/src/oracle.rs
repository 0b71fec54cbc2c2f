// src/oracle.rs
//
// Folding oracle seam.
//
// The environment only needs `fold(sequence) -> structure`. Implementations:
// - any `Fn(&str) -> Result<String, OracleError>` closure
// - NussinovOracle: built-in base-pair maximisation, deterministic, no deps
// - CommandOracle: blocking call to an external folding binary (RNAfold)

use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};

use crate::types::Nucleotide;

/// Failures of a folding oracle. Fatal to the current episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The sequence contains a symbol the oracle cannot fold.
    InvalidSequence { index: usize, symbol: char },
    /// The external program could not be run or exited unsuccessfully.
    Failed { message: String },
    /// The oracle returned output that is not a structure for the sequence.
    MalformedOutput { output: String },
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::InvalidSequence { index, symbol } => {
                write!(f, "cannot fold symbol {:?} at site {}", symbol, index)
            }
            OracleError::Failed { message } => write!(f, "folding oracle failed: {}", message),
            OracleError::MalformedOutput { output } => {
                write!(f, "folding oracle returned malformed output: {:?}", output)
            }
        }
    }
}

impl std::error::Error for OracleError {}

/// Predicts the secondary structure a sequence folds into.
///
/// Assumed deterministic for a given sequence.
pub trait FoldingOracle {
    fn fold(&self, sequence: &str) -> Result<String, OracleError>;
}

impl<F> FoldingOracle for F
where
    F: Fn(&str) -> Result<String, OracleError>,
{
    fn fold(&self, sequence: &str) -> Result<String, OracleError> {
        self(sequence)
    }
}

fn parse_sequence(sequence: &str) -> Result<Vec<Nucleotide>, OracleError> {
    sequence
        .chars()
        .enumerate()
        .map(|(index, symbol)| {
            Nucleotide::from_char(symbol).ok_or(OracleError::InvalidSequence { index, symbol })
        })
        .collect()
}

/// Nussinov base-pair maximisation with a minimum hairpin loop.
///
/// Allows Watson-Crick and GU wobble pairs. Ties are broken towards leaving
/// the rightmost site unpaired, which makes the output deterministic.
#[derive(Debug, Clone, Copy)]
pub struct NussinovOracle {
    pub min_loop: usize,
}

impl Default for NussinovOracle {
    fn default() -> Self {
        Self { min_loop: 3 }
    }
}

impl FoldingOracle for NussinovOracle {
    fn fold(&self, sequence: &str) -> Result<String, OracleError> {
        let seq = parse_sequence(sequence)?;
        let n = seq.len();
        if n == 0 {
            return Ok(String::new());
        }

        // best[i][j]: max pairs within seq[i..=j]
        let mut best = vec![vec![0u32; n]; n];
        for span in (self.min_loop + 1)..n {
            for i in 0..n - span {
                let j = i + span;
                let mut score = best[i][j - 1];
                for k in i..(j - self.min_loop) {
                    if seq[k].pairs_with(seq[j]) {
                        let left = if k > i { best[i][k - 1] } else { 0 };
                        let inner = best[k + 1][j - 1];
                        score = score.max(left + inner + 1);
                    }
                }
                best[i][j] = score;
            }
        }

        let mut structure = vec!['.'; n];
        let mut stack = vec![(0usize, n - 1)];
        while let Some((i, j)) = stack.pop() {
            if i >= j || j - i <= self.min_loop {
                continue;
            }
            if best[i][j] == best[i][j - 1] {
                stack.push((i, j - 1));
                continue;
            }
            for k in i..(j - self.min_loop) {
                if !seq[k].pairs_with(seq[j]) {
                    continue;
                }
                let left = if k > i { best[i][k - 1] } else { 0 };
                if left + best[k + 1][j - 1] + 1 == best[i][j] {
                    structure[k] = '(';
                    structure[j] = ')';
                    if k > i {
                        stack.push((i, k - 1));
                    }
                    stack.push((k + 1, j - 1));
                    break;
                }
            }
        }

        Ok(structure.into_iter().collect())
    }
}

/// Blocking subprocess oracle.
///
/// Writes the sequence on stdin and reads the structure from the first
/// whitespace-separated token of the second output line (RNAfold layout:
/// sequence, then `structure ( energy)`).
#[derive(Debug, Clone)]
pub struct CommandOracle {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for CommandOracle {
    fn default() -> Self {
        Self {
            program: "RNAfold".to_string(),
            args: vec!["--noPS".to_string()],
        }
    }
}

impl FoldingOracle for CommandOracle {
    fn fold(&self, sequence: &str) -> Result<String, OracleError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OracleError::Failed {
                message: format!("failed to spawn {}: {}", self.program, e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            writeln!(stdin, "{sequence}").map_err(|e| OracleError::Failed {
                message: format!("failed to write to {}: {}", self.program, e),
            })?;
        }

        let output = child.wait_with_output().map_err(|e| OracleError::Failed {
            message: format!("failed to wait for {}: {}", self.program, e),
        })?;
        if !output.status.success() {
            return Err(OracleError::Failed {
                message: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_fold_output(&stdout, sequence.len())
    }
}

/// Extract the dot-bracket line from RNAfold-style output.
pub fn parse_fold_output(stdout: &str, expected_len: usize) -> Result<String, OracleError> {
    stdout
        .lines()
        .nth(1)
        .and_then(|line| line.split_whitespace().next())
        .filter(|s| s.len() == expected_len && s.chars().all(|c| matches!(c, '.' | '(' | ')')))
        .map(str::to_string)
        .ok_or_else(|| OracleError::MalformedOutput {
            output: stdout.trim().to_string(),
        })
}
