// src/candidate.rs
//
// The candidate sequence under construction.
//
// Sites are assigned left to right by the agent; a paired site writes both
// partners in one call. Once set, a site is never unset.

use crate::types::Nucleotide;

/// Single-site alphabet, indexed by action.
pub const ACTION_TO_BASE: [Nucleotide; 4] =
    [Nucleotide::G, Nucleotide::A, Nucleotide::U, Nucleotide::C];

/// Base-pair alphabet, indexed by action: (site, partner).
pub const ACTION_TO_PAIR: [(Nucleotide, Nucleotide); 4] = [
    (Nucleotide::G, Nucleotide::C),
    (Nucleotide::C, Nucleotide::G),
    (Nucleotide::A, Nucleotide::U),
    (Nucleotide::U, Nucleotide::A),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    sites: Vec<Option<Nucleotide>>,
    /// Lowest site that may still be unset; never decreases.
    cursor: usize,
    assigned: usize,
}

impl Candidate {
    /// A candidate with every site unset.
    pub fn new(len: usize) -> Self {
        Self {
            sites: vec![None; len],
            cursor: 0,
            assigned: 0,
        }
    }

    /// A fully assigned candidate.
    pub fn from_nucleotides(sequence: Vec<Nucleotide>) -> Self {
        let assigned = sequence.len();
        Self {
            sites: sequence.into_iter().map(Some).collect(),
            cursor: assigned,
            assigned,
        }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn assigned_count(&self) -> usize {
        self.assigned
    }

    pub fn is_complete(&self) -> bool {
        self.assigned == self.sites.len()
    }

    pub fn site(&self, index: usize) -> Option<Nucleotide> {
        self.sites.get(index).copied().flatten()
    }

    /// Lowest unset site, or `None` once every site is assigned.
    pub fn first_unassigned_site(&mut self) -> Option<usize> {
        while self.cursor < self.sites.len() && self.sites[self.cursor].is_some() {
            self.cursor += 1;
        }
        (self.cursor < self.sites.len()).then_some(self.cursor)
    }

    /// Assign `site` (and `paired_site`, if any) from a 4-way action.
    ///
    /// # Panics
    ///
    /// If `action >= 4` or either site is already set.
    pub fn assign(&mut self, action: usize, site: usize, paired_site: Option<usize>) {
        assert!(action < 4, "action {action} out of range");
        match paired_site {
            Some(partner) => {
                let (base, partner_base) = ACTION_TO_PAIR[action];
                self.set(site, base);
                self.set(partner, partner_base);
            }
            None => self.set(site, ACTION_TO_BASE[action]),
        }
    }

    fn set(&mut self, site: usize, base: Nucleotide) {
        assert!(
            self.sites[site].is_none(),
            "site {site} is already assigned"
        );
        self.sites[site] = Some(base);
        self.assigned += 1;
    }

    /// Independent copy with `sites[i]` overwritten by `bases[i]`.
    pub fn branch(&self, sites: &[usize], bases: &[Nucleotide]) -> Candidate {
        debug_assert_eq!(sites.len(), bases.len());
        let mut branch = self.clone();
        for (&site, &base) in sites.iter().zip(bases) {
            if branch.sites[site].replace(base).is_none() {
                branch.assigned += 1;
            }
        }
        branch
    }

    /// The assigned sequence, or `None` while any site is unset.
    pub fn sequence(&self) -> Option<String> {
        self.sites
            .iter()
            .map(|site| site.map(Nucleotide::as_char))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_str(c: &Candidate, a: usize, b: usize) -> String {
        format!("{}{}", c.site(a).unwrap(), c.site(b).unwrap())
    }

    #[test]
    fn test_single_assignment_alphabet() {
        for (action, expected) in ['G', 'A', 'U', 'C'].into_iter().enumerate() {
            let mut c = Candidate::new(1);
            c.assign(action, 0, None);
            assert_eq!(c.sequence().unwrap(), expected.to_string());
        }
    }

    #[test]
    fn test_paired_assignment_sets_both_sites() {
        for (action, expected) in ["GC", "CG", "AU", "UA"].into_iter().enumerate() {
            let mut c = Candidate::new(4);
            c.assign(action, 0, Some(3));
            assert_eq!(c.assigned_count(), 2);
            assert_eq!(pair_str(&c, 0, 3), expected);
        }
    }

    #[test]
    fn test_cursor_monotone_and_skips_partners() {
        // (.)  -> site 0 pairs with 2
        let mut c = Candidate::new(3);
        assert_eq!(c.first_unassigned_site(), Some(0));
        c.assign(0, 0, Some(2));
        assert_eq!(c.first_unassigned_site(), Some(1));
        assert_eq!(c.first_unassigned_site(), Some(1));
        c.assign(1, 1, None);
        assert_eq!(c.first_unassigned_site(), None);
        assert!(c.is_complete());
        assert_eq!(c.sequence().unwrap(), "GAC");
    }

    #[test]
    fn test_partial_sequence_is_none() {
        let mut c = Candidate::new(2);
        c.assign(0, 0, None);
        assert_eq!(c.sequence(), None);
    }

    #[test]
    #[should_panic(expected = "already assigned")]
    fn test_reassign_panics() {
        let mut c = Candidate::new(2);
        c.assign(0, 0, None);
        c.assign(1, 0, None);
    }

    #[test]
    fn test_branch_leaves_original_untouched() {
        let original = Candidate::from_nucleotides(vec![Nucleotide::G; 4]);
        let branch = original.branch(&[1, 3], &[Nucleotide::A, Nucleotide::U]);
        assert_eq!(original.sequence().unwrap(), "GGGG");
        assert_eq!(branch.sequence().unwrap(), "GAGU");
        assert!(branch.is_complete());
    }
}
