// src/target.rs
//
// Target structures: the immutable goal of each design episode.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::EnvConfig;
use crate::structure::{encode_pairing, encode_structure, StructureError};
use crate::types::{SiteCode, TargetId};

/// Source of auto-assigned target ids.
///
/// Owned by whoever builds the target pool; starts at 1 by default and
/// increments once per auto-assigned target.
#[derive(Debug, Clone)]
pub struct TargetIds {
    next: TargetId,
}

impl Default for TargetIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl TargetIds {
    pub fn starting_at(first: TargetId) -> Self {
        Self { next: first }
    }

    pub fn next_id(&mut self) -> TargetId {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// A target secondary structure with its precomputed encodings.
#[derive(Debug, Clone)]
pub struct Target {
    id: TargetId,
    dot_bracket: String,
    pairing: Vec<Option<usize>>,
    padded_encoding: Vec<SiteCode>,
}

impl Target {
    /// Build a target with the next id from `ids`.
    pub fn new(
        dot_bracket: &str,
        cfg: &EnvConfig,
        ids: &mut TargetIds,
    ) -> Result<Self, StructureError> {
        // Validate before consuming an id.
        let pairing = encode_pairing(dot_bracket)?;
        Ok(Self::from_parts(ids.next_id(), dot_bracket, pairing, cfg))
    }

    /// Build a target with a caller-supplied id.
    pub fn with_id(id: TargetId, dot_bracket: &str, cfg: &EnvConfig) -> Result<Self, StructureError> {
        let pairing = encode_pairing(dot_bracket)?;
        Ok(Self::from_parts(id, dot_bracket, pairing, cfg))
    }

    fn from_parts(
        id: TargetId,
        dot_bracket: &str,
        pairing: Vec<Option<usize>>,
        cfg: &EnvConfig,
    ) -> Self {
        Self {
            id,
            dot_bracket: dot_bracket.to_string(),
            pairing,
            padded_encoding: encode_structure(
                dot_bracket,
                cfg.state_radius,
                cfg.use_conv,
                cfg.use_embedding,
            ),
        }
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn dot_bracket(&self) -> &str {
        &self.dot_bracket
    }

    /// Number of sites.
    pub fn len(&self) -> usize {
        self.pairing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairing.is_empty()
    }

    /// Structural partner of `site`, if it is paired.
    pub fn paired_site(&self, site: usize) -> Option<usize> {
        self.pairing.get(site).copied().flatten()
    }

    pub fn padded_encoding(&self) -> &[SiteCode] {
        &self.padded_encoding
    }
}

/// One entry of a batch of targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetSpec {
    /// Bare dot-bracket string; the id is auto-assigned.
    Raw(String),
    /// Dot-bracket string with an id preserved for result attribution.
    Identified { id: TargetId, dot_bracket: String },
}

impl From<&str> for TargetSpec {
    fn from(s: &str) -> Self {
        TargetSpec::Raw(s.to_string())
    }
}

impl From<(TargetId, &str)> for TargetSpec {
    fn from((id, s): (TargetId, &str)) -> Self {
        TargetSpec::Identified {
            id,
            dot_bracket: s.to_string(),
        }
    }
}

impl TargetSpec {
    /// Parse one line of a targets file: `structure` or `id<TAB>structure`.
    pub fn parse_line(line: &str) -> Option<TargetSpec> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        match line.split_once(char::is_whitespace) {
            Some((id, rest)) => match id.parse::<TargetId>() {
                Ok(id) => Some(TargetSpec::Identified {
                    id,
                    dot_bracket: rest.trim().to_string(),
                }),
                Err(_) => Some(TargetSpec::Raw(line.to_string())),
            },
            None => Some(TargetSpec::Raw(line.to_string())),
        }
    }

    /// Parse a whole targets file, one spec per non-blank, non-comment line.
    pub fn parse_batch(text: &str) -> Vec<TargetSpec> {
        text.lines().filter_map(TargetSpec::parse_line).collect()
    }
}

/// Build a shared, read-only target pool from a batch.
pub fn build_targets(
    specs: &[TargetSpec],
    cfg: &EnvConfig,
    ids: &mut TargetIds,
) -> Result<Vec<Arc<Target>>, StructureError> {
    specs
        .iter()
        .map(|spec| {
            let target = match spec {
                TargetSpec::Raw(s) => Target::new(s, cfg, ids)?,
                TargetSpec::Identified { id, dot_bracket } => {
                    Target::with_id(*id, dot_bracket, cfg)?
                }
            };
            Ok(Arc::new(target))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_skips_comments() {
        let text = "# targets\n(((....)))\n\n7\t((...))\n  ....  \n";
        let specs = TargetSpec::parse_batch(text);
        assert_eq!(
            specs,
            vec![
                TargetSpec::from("(((....)))"),
                TargetSpec::from((7, "((...))")),
                TargetSpec::from("...."),
            ]
        );
    }

    #[test]
    fn test_auto_ids_increment_from_one() {
        let cfg = EnvConfig::default();
        let mut ids = TargetIds::default();
        let a = Target::new("(...)", &cfg, &mut ids).unwrap();
        let b = Target::new("..", &cfg, &mut ids).unwrap();
        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
    }

    #[test]
    fn test_invalid_structure_does_not_consume_id() {
        let cfg = EnvConfig::default();
        let mut ids = TargetIds::default();
        assert!(Target::new("((", &cfg, &mut ids).is_err());
        assert_eq!(Target::new("()", &cfg, &mut ids).unwrap().id(), 1);
    }

    #[test]
    fn test_paired_site_lookup() {
        let cfg = EnvConfig::default();
        let t = Target::with_id(42, "((..))", &cfg).unwrap();
        assert_eq!(t.id(), 42);
        assert_eq!(t.len(), 6);
        assert_eq!(t.paired_site(0), Some(5));
        assert_eq!(t.paired_site(4), Some(1));
        assert_eq!(t.paired_site(2), None);
        assert_eq!(t.paired_site(99), None);
        assert_eq!(t.padded_encoding().len(), 6 + 2 * cfg.state_radius);
    }

    #[test]
    fn test_build_targets_mixed_batch() {
        let cfg = EnvConfig::default();
        let mut ids = TargetIds::starting_at(10);
        let specs: Vec<TargetSpec> = vec!["(..)".into(), (7, "....").into(), "()".into()];
        let pool = build_targets(&specs, &cfg, &mut ids).unwrap();
        let got: Vec<TargetId> = pool.iter().map(|t| t.id()).collect();
        assert_eq!(got, vec![10, 7, 11]);
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(TargetSpec::parse_line("  "), None);
        assert_eq!(TargetSpec::parse_line("# comment"), None);
        assert_eq!(
            TargetSpec::parse_line("((..))"),
            Some(TargetSpec::Raw("((..))".to_string()))
        );
        assert_eq!(
            TargetSpec::parse_line("17\t((..))"),
            Some(TargetSpec::Identified {
                id: 17,
                dot_bracket: "((..))".to_string()
            })
        );
    }
}
