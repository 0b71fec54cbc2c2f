// src/inverse.rs
//
// Batch inverse-design tooling.
//
// For each target: draw `tries` start sequences biased towards a GC content
// and restricted by optional IUPAC constraints, hand each one to an
// inverse-folding designer (RNAinverse by default), fold the result on a
// blocking worker and record sequence / elapsed time / distance. The whole request
// runs under an optional wall-clock limit. A request that times out or whose
// start-sequence sampling degenerates yields an empty outcome instead of an
// error, so a batch keeps going.

use std::fmt;
use std::future::Future;
use std::process::Stdio;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::candidate::ACTION_TO_PAIR;
use crate::oracle::{FoldingOracle, OracleError};
use crate::structure::{encode_pairing, hamming, StructureError};
use crate::types::Nucleotide;

#[derive(Debug, Clone, PartialEq)]
pub enum DesignError {
    /// Target is not a valid dot-bracket structure.
    Structure(StructureError),
    /// Start-sequence sampling has nothing to draw from.
    Degenerate { message: String },
    /// Sequence constraint with a bad symbol or the wrong length.
    InvalidConstraint { message: String },
    /// The request exceeded its time limit.
    Timeout { limit: Duration },
    /// The designer could not be run or returned unusable output.
    Failed { message: String },
    Oracle(OracleError),
}

impl fmt::Display for DesignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesignError::Structure(e) => write!(f, "invalid target structure: {}", e),
            DesignError::Degenerate { message } => {
                write!(f, "start-sequence sampling degenerate: {}", message)
            }
            DesignError::InvalidConstraint { message } => {
                write!(f, "invalid sequence constraint: {}", message)
            }
            DesignError::Timeout { limit } => write!(f, "design timed out after {:?}", limit),
            DesignError::Failed { message } => write!(f, "designer failed: {}", message),
            DesignError::Oracle(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DesignError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DesignError::Structure(e) => Some(e),
            DesignError::Oracle(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StructureError> for DesignError {
    fn from(e: StructureError) -> Self {
        DesignError::Structure(e)
    }
}

impl From<OracleError> for DesignError {
    fn from(e: OracleError) -> Self {
        DesignError::Oracle(e)
    }
}

impl DesignError {
    /// Whether the batch should record an empty outcome and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DesignError::Timeout { .. } | DesignError::Degenerate { .. }
        )
    }
}

/// Inverse folding from a start sequence.
pub trait InverseDesigner {
    fn design(
        &self,
        target: &str,
        start: &str,
    ) -> impl Future<Output = Result<String, DesignError>> + Send;
}

/// ViennaRNA `RNAinverse` subprocess.
///
/// Reads the target and the start sequence on stdin and prints the designed
/// sequence as the first token of its output. The child is killed if the
/// future is dropped, so a timed-out request leaves no process behind.
#[derive(Debug, Clone)]
pub struct RnaInverse {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for RnaInverse {
    fn default() -> Self {
        Self {
            program: "RNAinverse".to_string(),
            args: Vec::new(),
        }
    }
}

impl InverseDesigner for RnaInverse {
    fn design(
        &self,
        target: &str,
        start: &str,
    ) -> impl Future<Output = Result<String, DesignError>> + Send {
        let program = self.program.clone();
        let args = self.args.clone();
        let input = format!("{target}\n{start}\n");
        let expected_len = target.len();

        async move {
            let mut child = Command::new(&program)
                .args(&args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| DesignError::Failed {
                    message: format!("failed to spawn {}: {}", program, e),
                })?;

            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(input.as_bytes())
                    .await
                    .map_err(|e| DesignError::Failed {
                        message: format!("failed to write to {}: {}", program, e),
                    })?;
            }

            let output = child
                .wait_with_output()
                .await
                .map_err(|e| DesignError::Failed {
                    message: format!("failed to wait for {}: {}", program, e),
                })?;
            if !output.status.success() {
                return Err(DesignError::Failed {
                    message: format!(
                        "{} exited with {}: {}",
                        program,
                        output.status,
                        String::from_utf8_lossy(&output.stderr).trim()
                    ),
                });
            }

            parse_designed_sequence(&String::from_utf8_lossy(&output.stdout), expected_len)
        }
    }
}

/// First token of the designer output, upper-cased, if it is a sequence of
/// the expected length.
pub fn parse_designed_sequence(stdout: &str, expected_len: usize) -> Result<String, DesignError> {
    let token = stdout.split_whitespace().next().unwrap_or("");
    let bases: Option<Vec<Nucleotide>> = token.chars().map(Nucleotide::from_char).collect();
    match bases {
        Some(bases) if bases.len() == expected_len => {
            Ok(bases.into_iter().map(Nucleotide::as_char).collect())
        }
        _ => Err(DesignError::Failed {
            message: format!("unexpected designer output: {:?}", stdout.trim()),
        }),
    }
}

/// Nucleotides allowed by an IUPAC code (`N` = any, `T` read as `U`).
pub fn iupac_bases(code: char) -> Option<&'static [Nucleotide]> {
    use Nucleotide::{A, C, G, U};
    let bases: &'static [Nucleotide] = match code.to_ascii_uppercase() {
        'A' => &[A],
        'C' => &[C],
        'G' => &[G],
        'U' | 'T' => &[U],
        'R' => &[A, G],
        'Y' => &[C, U],
        'S' => &[G, C],
        'W' => &[A, U],
        'K' => &[G, U],
        'M' => &[A, C],
        'B' => &[C, G, U],
        'D' => &[A, G, U],
        'H' => &[A, C, U],
        'V' => &[A, C, G],
        'N' => &[A, C, G, U],
        _ => return None,
    };
    Some(bases)
}

fn parse_constraints(
    constraints: Option<&str>,
    len: usize,
) -> Result<Vec<&'static [Nucleotide]>, DesignError> {
    let Some(constraints) = constraints else {
        let any: &'static [Nucleotide] = &[Nucleotide::A, Nucleotide::C, Nucleotide::G, Nucleotide::U];
        return Ok(vec![any; len]);
    };
    let allowed = constraints
        .chars()
        .enumerate()
        .map(|(index, code)| {
            iupac_bases(code).ok_or_else(|| DesignError::InvalidConstraint {
                message: format!("unknown code {:?} at site {}", code, index),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if allowed.len() != len {
        return Err(DesignError::InvalidConstraint {
            message: format!("length {} does not match target length {}", allowed.len(), len),
        });
    }
    Ok(allowed)
}

fn is_gc(base: Nucleotide) -> bool {
    matches!(base, Nucleotide::G | Nucleotide::C)
}

/// Draw a start sequence compatible with `target`.
///
/// Each unpaired site is G/C with probability `gc_content` (A/U otherwise);
/// each base pair is GC/CG with probability `gc_content` (AU/UA otherwise).
/// `None` samples both classes equally. `constraints` is an IUPAC string of
/// the target's length restricting each site; when it rules out one class
/// the other is used, and when it rules out both the draw is degenerate.
pub fn seed_sequence<R: Rng + ?Sized>(
    target: &str,
    constraints: Option<&str>,
    gc_content: Option<f64>,
    rng: &mut R,
) -> Result<String, DesignError> {
    let pairing = encode_pairing(target)?;
    let allowed = parse_constraints(constraints, pairing.len())?;
    let p_gc = gc_content.unwrap_or(0.5);
    if !(0.0..=1.0).contains(&p_gc) {
        return Err(DesignError::Degenerate {
            message: format!("gc content {} outside [0, 1]", p_gc),
        });
    }

    let mut sites: Vec<Option<Nucleotide>> = vec![None; pairing.len()];
    for i in 0..pairing.len() {
        if sites[i].is_some() {
            continue;
        }
        // (base at i, base at partner); unpaired sites ignore the second.
        let options: Vec<(Nucleotide, Nucleotide)> = match pairing[i] {
            Some(j) => ACTION_TO_PAIR
                .iter()
                .copied()
                .filter(|(a, b)| allowed[i].contains(a) && allowed[j].contains(b))
                .collect(),
            None => allowed[i].iter().map(|&a| (a, a)).collect(),
        };

        let (gc, au): (Vec<_>, Vec<_>) = options.into_iter().partition(|(a, _)| is_gc(*a));
        let class = match (gc.is_empty(), au.is_empty()) {
            (true, true) => {
                return Err(DesignError::Degenerate {
                    message: format!("constraints leave no choice at site {}", i),
                })
            }
            (false, true) => gc,
            (true, false) => au,
            (false, false) => {
                if rng.gen_bool(p_gc) {
                    gc
                } else {
                    au
                }
            }
        };
        let Some(&(a, b)) = class.choose(rng) else {
            continue;
        };

        sites[i] = Some(a);
        if let Some(j) = pairing[i] {
            sites[j] = Some(b);
        }
    }

    Ok(sites.into_iter().flatten().map(Nucleotide::as_char).collect())
}

/// One target of a design batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignRequest {
    pub target: String,
    pub tries: usize,
    /// IUPAC code per site (`N` = free).
    pub constraints: Option<String>,
    pub gc_content: Option<f64>,
    /// Wall-clock limit for the whole request.
    pub time_limit: Option<Duration>,
}

impl DesignRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            tries: 1,
            constraints: None,
            gc_content: None,
            time_limit: None,
        }
    }
}

/// Designed sequences with per-try elapsed seconds and structural distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignOutcome {
    pub sequences: Vec<String>,
    pub times: Vec<f64>,
    pub distances: Vec<usize>,
}

impl DesignOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

async fn design_tries<D, O, R>(
    designer: &D,
    oracle: &O,
    request: &DesignRequest,
    rng: &mut R,
) -> Result<DesignOutcome, DesignError>
where
    D: InverseDesigner + ?Sized,
    O: FoldingOracle + Clone + Send + 'static,
    R: Rng + ?Sized,
{
    let request_start = Instant::now();
    let starts = (0..request.tries)
        .map(|_| {
            seed_sequence(
                &request.target,
                request.constraints.as_deref(),
                request.gc_content,
                rng,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    // Sampling time is charged to every try.
    let sampling_secs = request_start.elapsed().as_secs_f64();

    let mut outcome = DesignOutcome::empty();
    for start in &starts {
        let started = Instant::now();
        let sequence = designer.design(&request.target, start).await?;
        let elapsed = started.elapsed().as_secs_f64();

        // Folding may block (external RNAfold); keep it off the runtime so
        // the deadline can fire while it runs.
        let fold_oracle = oracle.clone();
        let fold_input = sequence.clone();
        let folded = tokio::task::spawn_blocking(move || fold_oracle.fold(&fold_input))
            .await
            .map_err(|e| DesignError::Failed {
                message: format!("fold task failed: {}", e),
            })??;
        let distance = hamming(&folded, &request.target).ok_or_else(|| DesignError::Failed {
            message: format!(
                "folded structure {:?} does not match target length {}",
                folded,
                request.target.len()
            ),
        })?;

        // Work that never yields (a blocking designer) is caught here.
        if let Some(limit) = request.time_limit {
            if request_start.elapsed() > limit {
                return Err(DesignError::Timeout { limit });
            }
        }

        outcome.sequences.push(sequence);
        outcome.times.push(sampling_secs + elapsed);
        outcome.distances.push(distance);
    }
    Ok(outcome)
}

/// Run one request under its time limit.
///
/// Timeouts and degenerate sampling are logged and produce an empty outcome;
/// every other failure is returned.
pub async fn run_design<D, O, R>(
    designer: &D,
    oracle: &O,
    request: &DesignRequest,
    rng: &mut R,
) -> Result<DesignOutcome, DesignError>
where
    D: InverseDesigner + ?Sized,
    O: FoldingOracle + Clone + Send + 'static,
    R: Rng + ?Sized,
{
    let work = design_tries(designer, oracle, request, rng);
    let result = match request.time_limit {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .unwrap_or_else(|_| Err(DesignError::Timeout { limit })),
        None => work.await,
    };

    match result {
        Err(e) if e.is_recoverable() => {
            eprintln!(
                "[inverse] WARN: {} for target {}; recording empty outcome",
                e, request.target
            );
            Ok(DesignOutcome::empty())
        }
        other => other,
    }
}

/// Run every request in order, sharing one rng.
pub async fn run_design_batch<D, O, R>(
    designer: &D,
    oracle: &O,
    requests: &[DesignRequest],
    rng: &mut R,
) -> Result<Vec<DesignOutcome>, DesignError>
where
    D: InverseDesigner + ?Sized,
    O: FoldingOracle + Clone + Send + 'static,
    R: Rng + ?Sized,
{
    let mut outcomes = Vec::with_capacity(requests.len());
    for request in requests {
        outcomes.push(run_design(designer, oracle, request, rng).await?);
    }
    Ok(outcomes)
}
