//! Evolution lineage: which chain to show and which actions it unlocks.
//!
//! Every record stores its own `evolution_chain`, and records from the same
//! lineage often disagree. The longest known chain that mentions the current
//! creature is treated as authoritative. Two branches that disagree on names
//! are not reconciled; whichever chain is longest (first seen on ties) wins.
//!
//! Lineages follow a three-stage model: base, evolved, ultimate.

use crate::creature::{CreatureRecord, HistoryRecord};

/// Stage index at which only ultimate evolution is offered.
pub const ULTIMATE_STAGE: usize = 2;

/// Longest chain among history chains containing `current.name` and
/// `current`'s own chain. Empty when there is no candidate.
pub fn compute_display_chain(current: &CreatureRecord, history: &[HistoryRecord]) -> Vec<String> {
    let own = Some(&current.evolution_chain).filter(|chain| !chain.is_empty());

    let candidates = history
        .iter()
        .map(|h| &h.data.evolution_chain)
        .filter(|chain| !chain.is_empty() && chain.contains(&current.name))
        .chain(own);

    let mut best: Option<&Vec<String>> = None;
    for chain in candidates {
        if best.map_or(true, |b| chain.len() > b.len()) {
            best = Some(chain);
        }
    }
    best.cloned().unwrap_or_default()
}

/// Position of `name` in `chain`.
pub fn stage_index_of(chain: &[String], name: &str) -> Option<usize> {
    chain.iter().position(|n| n == name)
}

/// Which lineage actions are open for a creature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Eligibility {
    pub stage: Option<usize>,
    pub can_evolve: bool,
    pub can_ultimate_evolve: bool,
    pub can_pre_evolve: bool,
}

impl Eligibility {
    pub fn for_chain(chain: &[String], name: &str) -> Self {
        let stage = stage_index_of(chain, name);
        Self {
            stage,
            can_evolve: matches!(stage, Some(i) if i < ULTIMATE_STAGE),
            can_ultimate_evolve: stage == Some(ULTIMATE_STAGE),
            // Only when the creature is the sole link so far.
            can_pre_evolve: stage == Some(0) && chain.len() == 1,
        }
    }
}

/// One name in a displayed lineage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEntry {
    pub name: String,
    pub is_current: bool,
    /// A saved record exists for this name (or it is the current creature).
    pub unlocked: bool,
}

/// The lineage as presented for the current creature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageView {
    pub chain: Vec<String>,
    pub stages: Vec<StageEntry>,
    pub eligibility: Eligibility,
}

impl LineageView {
    pub fn new(current: &CreatureRecord, history: &[HistoryRecord]) -> Self {
        let chain = compute_display_chain(current, history);

        let stages = chain
            .iter()
            .map(|name| {
                let is_current = *name == current.name;
                StageEntry {
                    name: name.clone(),
                    is_current,
                    unlocked: is_current || history.iter().any(|h| h.data.name == *name),
                }
            })
            .collect();

        let eligibility = Eligibility::for_chain(&chain, &current.name);
        Self {
            chain,
            stages,
            eligibility,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn creature(name: &str, lineage: &[&str]) -> CreatureRecord {
        CreatureRecord {
            id: CreatureRecord::generate_id(),
            name: name.to_string(),
            evolution_chain: chain(lineage),
            ..CreatureRecord::default()
        }
    }

    fn saved(name: &str, lineage: &[&str]) -> HistoryRecord {
        HistoryRecord::new(creature(name, lineage), None)
    }

    #[test]
    fn test_longest_chain_wins() {
        let history = vec![saved("A", &["A", "B"]), saved("C", &["A", "B", "C"])];
        let current = creature("B", &["A", "B"]);
        assert_eq!(compute_display_chain(&current, &history), chain(&["A", "B", "C"]));
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let history = vec![saved("X", &["A", "B", "X"]), saved("Y", &["A", "B", "Y"])];
        let current = creature("B", &["Z", "B", "W"]);
        assert_eq!(compute_display_chain(&current, &history), chain(&["A", "B", "X"]));
    }

    #[test]
    fn test_chains_without_current_are_ignored() {
        let history = vec![saved("Q", &["P", "Q", "R", "S"])];
        let current = creature("B", &["A", "B"]);
        assert_eq!(compute_display_chain(&current, &history), chain(&["A", "B"]));
    }

    #[test]
    fn test_no_candidates_is_empty() {
        let current = creature("B", &[]);
        assert!(compute_display_chain(&current, &[]).is_empty());
    }

    #[test]
    fn test_own_chain_counts_even_without_current_name() {
        let current = creature("B", &["A", "C"]);
        assert_eq!(compute_display_chain(&current, &[]), chain(&["A", "C"]));
    }

    #[test]
    fn test_stage_gating() {
        let display = chain(&["A", "B", "C"]);

        for name in ["A", "B"] {
            let e = Eligibility::for_chain(&display, name);
            assert!(e.can_evolve);
            assert!(!e.can_ultimate_evolve);
        }

        let c = Eligibility::for_chain(&display, "C");
        assert!(!c.can_evolve);
        assert!(c.can_ultimate_evolve);

        let missing = Eligibility::for_chain(&display, "D");
        assert_eq!(missing.stage, None);
        assert!(!missing.can_evolve && !missing.can_ultimate_evolve && !missing.can_pre_evolve);
    }

    #[test]
    fn test_fourth_stage_has_no_actions() {
        let e = Eligibility::for_chain(&chain(&["A", "B", "C", "D"]), "D");
        assert_eq!(e.stage, Some(3));
        assert!(!e.can_evolve && !e.can_ultimate_evolve);
    }

    #[test]
    fn test_pre_evolve_only_for_lone_base() {
        assert!(Eligibility::for_chain(&chain(&["A"]), "A").can_pre_evolve);
        assert!(!Eligibility::for_chain(&chain(&["A", "B"]), "A").can_pre_evolve);
        assert!(!Eligibility::for_chain(&chain(&["B"]), "A").can_pre_evolve);
    }

    #[test]
    fn test_view_of_chain_missing_current() {
        let current = creature("B", &["A", "C", "D"]);
        let view = LineageView::new(&current, &[]);
        assert_eq!(view.chain, chain(&["A", "C", "D"]));
        assert_eq!(view.eligibility.stage, None);
    }

    #[test]
    fn test_view_marks_unlocked_stages() {
        let history = vec![saved("A", &["A", "B", "C"])];
        let current = creature("B", &["A", "B"]);
        let view = LineageView::new(&current, &history);

        assert_eq!(view.chain, chain(&["A", "B", "C"]));
        let flags: Vec<_> = view
            .stages
            .iter()
            .map(|s| (s.name.as_str(), s.is_current, s.unlocked))
            .collect();
        assert_eq!(
            flags,
            vec![("A", false, true), ("B", true, true), ("C", false, false)]
        );
        assert!(view.eligibility.can_evolve);
    }
}
