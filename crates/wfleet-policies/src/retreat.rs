//! Deadlock-chain retreat priority
//!
//! Decides which robot in a detected `deadlock_chain` should attempt to
//! back off this tick, and picks the cell it backs off into. The
//! decision is pure and side-effect free: the caller (`wfleet-sim`'s
//! agent loop) is responsible for actually releasing/reserving cells and
//! scheduling the follow-up wait.

use wfleet_core::{RobotId, SimRng};
use wfleet_map::{euclidean_distance, Cell, CellType, Grid, ReservationRegistry};

const RETREAT_RADIUS: f64 = 4.0;
const RETREAT_CANDIDATES: usize = 5;
const RETREAT_TOP_CHOICES: usize = 3;
const EVEN_CHAIN_WAIT_TICKS: u32 = 10;
const NEITHER_CAN_RETREAT_WAIT_SECONDS: f64 = 5.0;

/// What a robot in a deadlock chain should do this tick.
#[derive(Clone, Debug, PartialEq)]
pub enum RetreatDecision {
    /// This robot should attempt to retreat to a free neighboring cell.
    Retreat(RobotId),
    /// No free neighbor anywhere in the chain; wait and replan from scratch.
    ReplanAfter(f64),
    /// Chain of length >= 3 with no even-indexed retreat candidate; wait.
    WaitTicks(u32),
}

/// Apply the chain-length-dependent retreat priority rule (pairwise vs.
/// chain-of-three-or-more) described for the deadlock-chain escalation.
///
/// `has_free_neighbor` and `cannot_retreat` let the caller report,
/// per-candidate, whether a free neighbor exists and whether the robot
/// has already posted to the registry's `cannot_retreat` set.
pub fn decide(
    chain: &[RobotId],
    has_free_neighbor: impl Fn(RobotId) -> bool,
    cannot_retreat: impl Fn(RobotId) -> bool,
) -> RetreatDecision {
    match chain.len() {
        0 | 1 => RetreatDecision::ReplanAfter(NEITHER_CAN_RETREAT_WAIT_SECONDS),
        2 => {
            let larger = chain.iter().max_by_key(|r| r.as_u32()).copied().unwrap();
            let smaller = chain.iter().min_by_key(|r| r.as_u32()).copied().unwrap();
            if has_free_neighbor(larger) {
                RetreatDecision::Retreat(larger)
            } else if !cannot_retreat(smaller) && has_free_neighbor(smaller) {
                RetreatDecision::Retreat(smaller)
            } else {
                RetreatDecision::ReplanAfter(NEITHER_CAN_RETREAT_WAIT_SECONDS)
            }
        }
        _ => {
            for (idx, &robot) in chain.iter().enumerate() {
                if idx % 2 == 0 && has_free_neighbor(robot) {
                    return RetreatDecision::Retreat(robot);
                }
            }
            RetreatDecision::WaitTicks(EVEN_CHAIN_WAIT_TICKS)
        }
    }
}

/// The retreat maneuver's cell selection: the up-to-5 nearest free cells
/// by Euclidean distance within `RETREAT_RADIUS`, then a uniform pick
/// among the closest 3 of those. Returns `None` if no free cell exists
/// in range at all, which the caller treats as a failed retreat.
pub fn select_retreat_cell(
    grid: &Grid,
    registry: &ReservationRegistry,
    robot: RobotId,
    from: Cell,
    rng: &mut SimRng,
) -> Option<Cell> {
    let mut candidates: Vec<(f64, Cell)> = Vec::new();
    let radius = RETREAT_RADIUS.ceil() as i32;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let cell = (from.0 + dx, from.1 + dy);
            if cell == from || !grid.in_bounds(cell) {
                continue;
            }
            let dist = euclidean_distance(from, cell);
            if dist > RETREAT_RADIUS {
                continue;
            }
            if !matches!(grid.cell_type(cell), Some(CellType::Free)) {
                continue;
            }
            if registry.is_blocked(grid, cell, robot, cell) {
                continue;
            }
            candidates.push((dist, cell));
        }
    }

    candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    candidates.truncate(RETREAT_CANDIDATES);
    let top: Vec<Cell> = candidates.into_iter().take(RETREAT_TOP_CHOICES).map(|(_, c)| c).collect();
    rng.choose(&top).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairwise_larger_id_retreats_when_it_can() {
        let decision = decide(&[RobotId(76), RobotId(77)], |r| r == RobotId(77), |_| false);
        assert_eq!(decision, RetreatDecision::Retreat(RobotId(77)));
    }

    #[test]
    fn test_pairwise_falls_back_to_smaller_id() {
        let decision = decide(&[RobotId(76), RobotId(77)], |r| r == RobotId(76), |_| false);
        assert_eq!(decision, RetreatDecision::Retreat(RobotId(76)));
    }

    #[test]
    fn test_pairwise_neither_can_retreat_replans() {
        let decision = decide(&[RobotId(76), RobotId(77)], |_| false, |_| false);
        assert_eq!(decision, RetreatDecision::ReplanAfter(NEITHER_CAN_RETREAT_WAIT_SECONDS));
    }

    #[test]
    fn test_chain_of_three_picks_even_index_with_room() {
        let chain = [RobotId(1), RobotId(2), RobotId(3)];
        let decision = decide(&chain, |r| r == RobotId(3), |_| false);
        assert_eq!(decision, RetreatDecision::Retreat(RobotId(3)));
    }

    #[test]
    fn test_chain_of_three_waits_if_no_even_candidate_has_room() {
        let chain = [RobotId(1), RobotId(2), RobotId(3)];
        let decision = decide(&chain, |_| false, |_| false);
        assert_eq!(decision, RetreatDecision::WaitTicks(EVEN_CHAIN_WAIT_TICKS));
    }

    #[test]
    fn test_select_retreat_cell_finds_free_neighbor() {
        let grid = Grid::new(10, 10);
        let registry = ReservationRegistry::new();
        let mut rng = SimRng::new(1);
        let cell = select_retreat_cell(&grid, &registry, RobotId(1), (5, 5), &mut rng);
        assert!(cell.is_some());
        assert_ne!(cell, Some((5, 5)));
    }

    #[test]
    fn test_select_retreat_cell_none_when_boxed_in() {
        let mut grid = Grid::new(3, 3);
        for x in 0..3 {
            for y in 0..3 {
                if (x, y) != (1, 1) {
                    grid.set_cell_type((x, y), CellType::Pallet);
                }
            }
        }
        let registry = ReservationRegistry::new();
        let mut rng = SimRng::new(1);
        let cell = select_retreat_cell(&grid, &registry, RobotId(1), (1, 1), &mut rng);
        assert_eq!(cell, None);
    }
}
