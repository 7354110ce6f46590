//! GC victim selection.
//!
//! Picks the full block that is cheapest to reclaim, trading the number of
//! valid pages that have to be migrated (write amplification) against how
//! much of its rated endurance the block has already used (wear leveling).
//!
//! Selection is a pure single pass over a caller-owned snapshot: nothing is
//! allocated, logged or mutated here.

use std::cmp::Ordering;

use crate::config::{BlockId, Counter, CURRENT_PE_AVG, ERASE_COUNT_MAX, WL_WEIGHT};

/// Snapshot of one erase block offered for reclamation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Reporting only, selection never looks at it.
    pub id: Option<BlockId>,
    pub valid_page_count: Counter,
    pub erase_count: Counter,
}

impl Candidate {
    pub fn new(valid_page_count: Counter, erase_count: Counter) -> Self {
        Candidate {
            id: None,
            valid_page_count,
            erase_count,
        }
    }

    pub fn with_id(id: BlockId, valid_page_count: Counter, erase_count: Counter) -> Self {
        Candidate {
            id: Some(id),
            valid_page_count,
            erase_count,
        }
    }
}

/// Tunables of the cost model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionParams {
    /// Rated P/E endurance of a block. Zero means every block is treated as worn out.
    pub erase_count_max: Counter,
    /// Weight of the linear erase-count penalty, zero disables it.
    pub wl_weight: f64,
    /// Fleet-wide average erase count. Reserved: the current cost model does
    /// not read it, fleet-relative heuristics will.
    pub current_pe_avg: f64,
}

impl SelectionParams {
    pub fn new(erase_count_max: Counter, wl_weight: f64) -> Self {
        SelectionParams {
            erase_count_max,
            wl_weight,
            current_pe_avg: 0.0,
        }
    }

    pub fn with_pe_avg(mut self, current_pe_avg: f64) -> Self {
        self.current_pe_avg = current_pe_avg;
        self
    }
}

impl Default for SelectionParams {
    fn default() -> Self {
        SelectionParams {
            erase_count_max: ERASE_COUNT_MAX,
            wl_weight: WL_WEIGHT,
            current_pe_avg: CURRENT_PE_AVG,
        }
    }
}

/// Reclamation cost of a block.
///
/// A block with no endurance budget left has an unbounded valid-page term.
/// Instead of folding that into a float sentinel, `Saturated` orders above
/// every `Finite` cost, and saturated blocks are ranked among themselves by
/// wear penalty, then by raw erase count. This keeps the ordering total and
/// lets a zero endurance ceiling fall back to least-worn-first.
#[derive(Clone, Copy, Debug)]
pub enum Cost {
    Finite(f64),
    Saturated { wl_penalty: f64, erase_count: Counter },
}

impl Cost {
    pub fn is_saturated(&self) -> bool {
        matches!(self, Cost::Saturated { .. })
    }

    /// Scalar view, saturated costs report `f64::MAX`.
    pub fn total(&self) -> f64 {
        match *self {
            Cost::Finite(total) => total,
            Cost::Saturated { .. } => f64::MAX,
        }
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Cost::Finite(a), Cost::Finite(b)) => a.total_cmp(b),
            (Cost::Finite(_), Cost::Saturated { .. }) => Ordering::Less,
            (Cost::Saturated { .. }, Cost::Finite(_)) => Ordering::Greater,
            (
                Cost::Saturated { wl_penalty: pa, erase_count: ea },
                Cost::Saturated { wl_penalty: pb, erase_count: eb },
            ) => pa.total_cmp(pb).then(ea.cmp(eb)),
        }
    }
}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Cost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cost {}

/// Fraction of rated endurance already consumed, clamped to `[0, 1]`.
pub fn wear_leveling_factor(erase_count: Counter, erase_count_max: Counter) -> f64 {
    if erase_count_max == 0 || erase_count >= erase_count_max {
        return 1.0;
    }
    (erase_count as f64 / erase_count_max as f64).clamp(0.0, 1.0)
}

pub fn block_cost(block: &Candidate, params: &SelectionParams) -> Cost {
    let wlf = wear_leveling_factor(block.erase_count, params.erase_count_max);
    let remaining = 1.0 - wlf;
    let wl_penalty = params.wl_weight * block.erase_count as f64;

    if remaining <= 0.0 {
        return Cost::Saturated {
            wl_penalty,
            erase_count: block.erase_count,
        };
    }

    let cost_term1 = block.valid_page_count as f64 / remaining;
    Cost::Finite(cost_term1 + wl_penalty)
}

/// Index of the cheapest candidate, the earliest one on ties.
pub fn select_victim_index(candidates: &[Candidate], params: &SelectionParams) -> Option<usize> {
    let mut best: Option<(usize, Cost)> = None;

    for (idx, block) in candidates.iter().enumerate() {
        let cost = block_cost(block, params);
        match best {
            Some((_, min)) if cost >= min => {}
            _ => best = Some((idx, cost)),
        }
    }

    best.map(|(idx, _)| idx)
}

/// Cheapest candidate to reclaim, or `None` when there is nothing to choose from.
pub fn select_victim<'a>(
    candidates: &'a [Candidate],
    params: &SelectionParams,
) -> Option<&'a Candidate> {
    select_victim_index(candidates, params).map(|idx| &candidates[idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn reference_blocks() -> Vec<Candidate> {
        vec![
            Candidate::with_id(1, 10, 1000),
            Candidate::with_id(2, 5, 2000),
            Candidate::with_id(3, 15, 500),
            Candidate::with_id(4, 8, 1500),
        ]
    }

    fn random_candidates(
        rng: &mut SmallRng,
        len: usize,
        erase_count_max: Counter,
    ) -> Vec<Candidate> {
        (0..len)
            .map(|i| {
                let valid = rng.gen_range(0..=1028);
                let erase_count = rng.gen_range(0..=erase_count_max + 100);
                Candidate::with_id(i, valid, erase_count)
            })
            .collect()
    }

    #[test]
    fn empty_input_has_no_victim() {
        assert_eq!(select_victim(&[], &SelectionParams::default()), None);
        assert_eq!(select_victim_index(&[], &SelectionParams::new(0, 0.0)), None);
    }

    #[test]
    fn single_candidate_is_always_chosen() {
        let params = SelectionParams::default();
        let blocks = [
            Candidate::new(0, 0),
            Candidate::new(1028, 2999),
            Candidate::new(1028, 9000),
        ];
        for block in blocks {
            assert_eq!(select_victim(&[block], &params), Some(&block));
        }
    }

    #[test]
    fn picks_reference_block() {
        let blocks = reference_blocks();
        let params = SelectionParams::default();

        let victim = select_victim(&blocks, &params).unwrap();
        assert_eq!(victim.id, Some(3));

        let cost = block_cost(victim, &params);
        assert!((cost.total() - 43.0).abs() < 1e-9, "cost was {:?}", cost);
        for other in blocks.iter().filter(|b| b.id != Some(3)) {
            assert!(block_cost(other, &params) > cost);
        }
    }

    #[test]
    fn picks_least_valid_pages_per_budget() {
        let blocks = [
            Candidate::with_id(1, 20, 800),
            Candidate::with_id(2, 10, 600),
            Candidate::with_id(3, 25, 400),
        ];
        let victim = select_victim(&blocks, &SelectionParams::default()).unwrap();
        assert_eq!(victim.id, Some(2));
    }

    #[test]
    fn returned_reference_aliases_input() {
        let blocks = reference_blocks();
        let victim = select_victim(&blocks, &SelectionParams::default()).unwrap();
        assert!(std::ptr::eq(victim, &blocks[2]));
    }

    #[test]
    fn wear_leveling_factor_is_clamped() {
        assert_eq!(wear_leveling_factor(0, 3000), 0.0);
        assert_eq!(wear_leveling_factor(1500, 3000), 0.5);
        assert_eq!(wear_leveling_factor(3000, 3000), 1.0);
        assert_eq!(wear_leveling_factor(12000, 3000), 1.0);
        assert_eq!(wear_leveling_factor(0, 0), 1.0);
        assert_eq!(wear_leveling_factor(7, 0), 1.0);
    }

    #[test]
    fn zero_ceiling_orders_by_wear() {
        let blocks = [
            Candidate::with_id(1, 0, 40),
            Candidate::with_id(2, 500, 12),
            Candidate::with_id(3, 3, 12),
            Candidate::with_id(4, 1, 90),
        ];
        let params = SelectionParams::new(0, 0.05);
        assert!(blocks.iter().all(|b| block_cost(b, &params).is_saturated()));
        assert_eq!(select_victim(&blocks, &params).unwrap().id, Some(2));

        // no weight at all still prefers the least worn block
        let params = SelectionParams::new(0, 0.0);
        assert_eq!(select_victim(&blocks, &params).unwrap().id, Some(2));
    }

    #[test]
    fn zero_ceiling_random_inputs_pick_min_erase_count() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..200 {
            let len = rng.gen_range(1..32);
            let blocks = random_candidates(&mut rng, len, 3000);
            let params = SelectionParams::new(0, rng.gen_range(0.0..1.0));

            let min_erase = blocks.iter().map(|b| b.erase_count).min().unwrap();
            let first = blocks.iter().position(|b| b.erase_count == min_erase);
            assert_eq!(select_victim_index(&blocks, &params), first);
        }
    }

    #[test]
    fn worn_out_block_loses_to_finite_cost() {
        let worn = Candidate::with_id(1, 0, 3000);
        let fresh = Candidate::with_id(2, 1028, 2999);
        let params = SelectionParams::default();

        assert!(block_cost(&worn, &params).is_saturated());
        assert_eq!(block_cost(&worn, &params).total(), f64::MAX);
        assert!(!block_cost(&fresh, &params).is_saturated());

        assert_eq!(select_victim(&[worn, fresh], &params).unwrap().id, Some(2));
        assert_eq!(select_victim(&[fresh, worn], &params).unwrap().id, Some(2));
    }

    #[test]
    fn saturated_block_never_beats_finite_one() {
        let mut rng = SmallRng::seed_from_u64(7);
        let params = SelectionParams::default();
        for _ in 0..500 {
            let len = rng.gen_range(1..32);
            let blocks = random_candidates(&mut rng, len, params.erase_count_max);
            let any_finite = blocks.iter().any(|b| b.erase_count < params.erase_count_max);

            let victim = select_victim(&blocks, &params).unwrap();
            if any_finite {
                assert!(
                    victim.erase_count < params.erase_count_max,
                    "{:?} in {:?}",
                    victim,
                    blocks
                );
            }
        }
    }

    #[test]
    fn all_worn_out_blocks_order_by_wear() {
        let blocks = [
            Candidate::with_id(1, 0, 5000),
            Candidate::with_id(2, 900, 3100),
            Candidate::with_id(3, 10, 3000),
        ];

        let params = SelectionParams::default();
        assert!(blocks.iter().all(|b| block_cost(b, &params).is_saturated()));
        assert_eq!(select_victim(&blocks, &params).unwrap().id, Some(3));
        assert_eq!(select_victim(&blocks[..2], &params).unwrap().id, Some(2));
        assert!(block_cost(&blocks[0], &params) > block_cost(&blocks[1], &params));

        // without a penalty the raw erase count still ranks them
        let params = SelectionParams::new(3000, 0.0);
        assert_eq!(select_victim(&blocks[..2], &params).unwrap().id, Some(2));
    }

    #[test]
    fn ties_go_to_first_candidate() {
        let params = SelectionParams::new(1000, 0.0);
        let a = Candidate::with_id(1, 5, 500);
        let b = Candidate::with_id(2, 10, 0);
        assert_eq!(block_cost(&a, &params), block_cost(&b, &params));

        assert_eq!(select_victim(&[a, b], &params).unwrap().id, Some(1));
        assert_eq!(select_victim(&[b, a], &params).unwrap().id, Some(2));

        let same = [
            Candidate::with_id(7, 3, 3),
            Candidate::with_id(8, 3, 3),
            Candidate::with_id(9, 3, 3),
        ];
        assert_eq!(select_victim_index(&same, &SelectionParams::default()), Some(0));
    }

    #[test]
    fn cost_grows_with_valid_pages() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let params = SelectionParams::new(rng.gen_range(1..10_000), rng.gen_range(0.0..2.0));
            let erase_count = rng.gen_range(0..params.erase_count_max);
            let valid = rng.gen_range(0..1028);

            let low = block_cost(&Candidate::new(valid, erase_count), &params);
            let high = block_cost(&Candidate::new(valid + 1, erase_count), &params);
            assert!(high > low, "{:?} !> {:?} for {:?}", high, low, params);
        }
    }

    #[test]
    fn selection_is_deterministic() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..100 {
            let len = rng.gen_range(0..64);
            let blocks = random_candidates(&mut rng, len, 3000);
            let params = SelectionParams::new(3000, rng.gen_range(0.0..1.0))
                .with_pe_avg(rng.gen_range(0.0..3000.0));

            let first = select_victim_index(&blocks, &params);
            for _ in 0..3 {
                assert_eq!(select_victim_index(&blocks, &params), first);
            }
        }
    }

    #[test]
    fn fleet_average_does_not_change_choice() {
        let blocks = reference_blocks();
        let base = SelectionParams::default();
        for avg in [0.0, 500.0, 2999.0, 1e9] {
            assert_eq!(select_victim_index(&blocks, &base.with_pe_avg(avg)), Some(2));
        }
    }

    #[test]
    fn selection_is_argmin_of_cost() {
        let mut rng = SmallRng::seed_from_u64(11);
        let params = SelectionParams::default();
        for _ in 0..200 {
            let len = rng.gen_range(1..48);
            let blocks = random_candidates(&mut rng, len, params.erase_count_max);
            let idx = select_victim_index(&blocks, &params).unwrap();
            let chosen = block_cost(&blocks[idx], &params);

            for (i, block) in blocks.iter().enumerate() {
                let cost = block_cost(block, &params);
                if i < idx {
                    assert!(cost > chosen);
                } else {
                    assert!(cost >= chosen);
                }
            }
        }
    }
}
