//! Deadlock chain detection over the reservation registry's destination map
//!
//! Unlike a general wait-for graph with multiple blockers per waiter, a
//! robot's motion is always blocked by at most one occupant of the next
//! cell, so the wait-for relation degenerates into a simple successor
//! function (`robot -> cell it owns that another robot wants`). Detecting
//! a deadlock is then just "does walking destinations from the blocking
//! robot eventually lead back to a robot already on the path".

use std::collections::HashMap;
use wfleet_core::RobotId;

use crate::grid::Cell;

/// Follow the chain of robots blocking `start`'s path to `target`.
///
/// `owner_of` maps a cell to the robot currently parked on it;
/// `destination_of` maps a robot to the cell it is trying to reach next.
/// Returns `Some(chain)` with `chain[0] == start` when the chain closes
/// into a cycle (a true deadlock), `None` if the blocking chain runs out
/// (someone is free to move, so waiting will eventually resolve on its
/// own).
pub fn find_chain(
    owner_of: &HashMap<Cell, RobotId>,
    destination_of: &HashMap<RobotId, Cell>,
    start: RobotId,
    target: Cell,
) -> Option<Vec<RobotId>> {
    let mut chain = vec![start];
    let mut current_target = target;

    loop {
        let blocker = *owner_of.get(&current_target)?;

        if let Some(pos) = chain.iter().position(|&r| r == blocker) {
            // Cycle closes back into the chain at `pos`; that suffix is
            // the deadlock (a robot outside the cycle that merely feeds
            // into it isn't part of the deadlock itself).
            return Some(chain[pos..].to_vec());
        }

        chain.push(blocker);

        current_target = *destination_of.get(&blocker)?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_blocker_is_no_chain() {
        let owner_of = HashMap::new();
        let destination_of = HashMap::new();
        assert_eq!(find_chain(&owner_of, &destination_of, RobotId(1), (0, 0)), None);
    }

    #[test]
    fn test_blocker_not_waiting_breaks_chain() {
        let mut owner_of = HashMap::new();
        owner_of.insert((1, 0), RobotId(2));
        let destination_of = HashMap::new(); // robot 2 has no destination: not waiting

        assert_eq!(find_chain(&owner_of, &destination_of, RobotId(1), (1, 0)), None);
    }

    #[test]
    fn test_pairwise_deadlock() {
        let mut owner_of = HashMap::new();
        owner_of.insert((1, 0), RobotId(2)); // robot 2 sits where 1 wants to go
        owner_of.insert((0, 0), RobotId(1)); // robot 1 sits where 2 wants to go

        let mut destination_of = HashMap::new();
        destination_of.insert(RobotId(1), (1, 0));
        destination_of.insert(RobotId(2), (0, 0));

        let chain = find_chain(&owner_of, &destination_of, RobotId(1), (1, 0)).unwrap();
        assert_eq!(chain, vec![RobotId(1), RobotId(2)]);
    }

    #[test]
    fn test_three_robot_cycle() {
        let mut owner_of = HashMap::new();
        owner_of.insert((1, 0), RobotId(2));
        owner_of.insert((2, 0), RobotId(3));
        owner_of.insert((0, 0), RobotId(1));

        let mut destination_of = HashMap::new();
        destination_of.insert(RobotId(1), (1, 0));
        destination_of.insert(RobotId(2), (2, 0));
        destination_of.insert(RobotId(3), (0, 0));

        let chain = find_chain(&owner_of, &destination_of, RobotId(1), (1, 0)).unwrap();
        assert_eq!(chain, vec![RobotId(1), RobotId(2), RobotId(3)]);
    }
}
