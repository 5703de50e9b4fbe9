//! Path planning over the 4-neighborhood grid
//!
//! Both algorithms share the same neighbor-admissibility rule: a neighbor
//! is a candidate if it's the goal, or if the caller-supplied oracle says
//! it isn't currently blocked. The planner owns no map or occupancy state
//! itself — it is handed an oracle closure each call, so the same
//! `Router` serves every robot without needing per-robot instances.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::Serialize;

use crate::grid::{euclidean_distance, Cell, Grid, DIRECTIONS_4};

/// Which search algorithm to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    AStar,
    Dijkstra,
}

impl Algorithm {
    fn other(self) -> Self {
        match self {
            Algorithm::AStar => Algorithm::Dijkstra,
            Algorithm::Dijkstra => Algorithm::AStar,
        }
    }
}

/// Running statistics for one algorithm, used by `auto` selection.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AlgorithmStats {
    pub calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_time_s: f64,
    pub total_path_length: u64,
    pub min_time_s: f64,
    pub max_time_s: f64,
    pub min_path_length: u64,
    pub max_path_length: u64,
}

impl AlgorithmStats {
    fn record(&mut self, elapsed_s: f64, path_len: Option<usize>) {
        self.calls += 1;
        self.total_time_s += elapsed_s;
        self.min_time_s = if self.calls == 1 {
            elapsed_s
        } else {
            self.min_time_s.min(elapsed_s)
        };
        self.max_time_s = self.max_time_s.max(elapsed_s);

        match path_len {
            Some(len) => {
                self.successes += 1;
                let len = len as u64;
                self.total_path_length += len;
                self.min_path_length = if self.successes == 1 {
                    len
                } else {
                    self.min_path_length.min(len)
                };
                self.max_path_length = self.max_path_length.max(len);
            }
            None => self.failures += 1,
        }
    }

    pub fn avg_time_s(&self) -> f64 {
        if self.calls == 0 { 0.0 } else { self.total_time_s / self.calls as f64 }
    }

    pub fn avg_path_length(&self) -> f64 {
        if self.successes == 0 {
            0.0
        } else {
            self.total_path_length as f64 / self.successes as f64
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.calls == 0 { 0.0 } else { self.successes as f64 / self.calls as f64 }
    }

    /// Lower is better: a blend of speed and path length, penalized by
    /// failure rate. Matches the selection formula `auto` relies on.
    fn score(&self, performance_weight: f64) -> f64 {
        let rate = self.success_rate();
        if rate <= 0.0 {
            return f64::INFINITY;
        }
        (performance_weight * self.avg_time_s() + (1.0 - performance_weight) * self.avg_path_length()) / rate
    }
}

/// Planner choice passed to `Router::find_path`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlgorithmChoice {
    Fixed(Algorithm),
    Auto,
}

const AUTO_SWITCH_THRESHOLD: u64 = 20;
const PERFORMANCE_WEIGHT: f64 = 0.7;
const ALTERNATIVE_ROUTE_PENALTY: f64 = 5.0;

/// Planner over the grid. Stateless with respect to the map and occupancy
/// (both are passed in per call); stateful only in its running
/// per-algorithm statistics, which is what lets `auto` improve over time.
pub struct Router {
    stats: HashMap<Algorithm, AlgorithmStats>,
    default_algorithm: Algorithm,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        let mut stats = HashMap::new();
        stats.insert(Algorithm::AStar, AlgorithmStats::default());
        stats.insert(Algorithm::Dijkstra, AlgorithmStats::default());
        Self {
            stats,
            default_algorithm: Algorithm::AStar,
        }
    }

    pub fn stats(&self, algo: Algorithm) -> &AlgorithmStats {
        &self.stats[&algo]
    }

    /// Choose the best-scoring algorithm once both have enough samples;
    /// otherwise fall back to the configured default.
    pub fn choose_best_algorithm(&self) -> Algorithm {
        let total_calls: u64 = self.stats.values().map(|s| s.calls).sum();
        if total_calls < AUTO_SWITCH_THRESHOLD {
            return self.default_algorithm;
        }

        let a = self.stats[&Algorithm::AStar].score(PERFORMANCE_WEIGHT);
        let d = self.stats[&Algorithm::Dijkstra].score(PERFORMANCE_WEIGHT);
        if a <= d { Algorithm::AStar } else { Algorithm::Dijkstra }
    }

    /// Find a path from `start` to `goal`, excluding `start`, including
    /// `goal`. `is_blocked(cell)` is the caller's cell-occupancy oracle;
    /// it is never consulted for `goal` itself (the goal is always
    /// admissible, which is what lets a robot path onto a shelf cell).
    pub fn find_path(
        &mut self,
        grid: &Grid,
        start: Cell,
        goal: Cell,
        choice: AlgorithmChoice,
        is_blocked: &dyn Fn(Cell) -> bool,
    ) -> Vec<Cell> {
        let algo = match choice {
            AlgorithmChoice::Fixed(a) => a,
            AlgorithmChoice::Auto => self.choose_best_algorithm(),
        };

        let started = Instant::now();
        let result = match algo {
            Algorithm::AStar => a_star(grid, start, goal, is_blocked, 0.0),
            Algorithm::Dijkstra => dijkstra(grid, start, goal, is_blocked),
        };
        let elapsed = started.elapsed_seconds();

        self.stats
            .get_mut(&algo)
            .unwrap()
            .record(elapsed, result.as_ref().map(|p| p.len()));

        result.unwrap_or_default()
    }

    /// Alternative-route planner for contested corridors: A* with a
    /// penalty added for neighbors adjacent to a currently blocked cell,
    /// biasing the path away from congestion rather than through it.
    pub fn find_alternative_path(
        &mut self,
        grid: &Grid,
        start: Cell,
        goal: Cell,
        is_blocked: &dyn Fn(Cell) -> bool,
    ) -> Vec<Cell> {
        a_star(grid, start, goal, is_blocked, ALTERNATIVE_ROUTE_PENALTY).unwrap_or_default()
    }
}

fn admissible(grid: &Grid, cell: Cell, goal: Cell, is_blocked: &dyn Fn(Cell) -> bool) -> bool {
    grid.in_bounds(cell) && (cell == goal || !is_blocked(cell))
}

fn reconstruct(came_from: &HashMap<Cell, Cell>, mut current: Cell) -> Vec<Cell> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path.remove(0); // drop `start`
    path
}

#[derive(Clone, PartialEq)]
struct DState {
    cost: f64,
    cell: Cell,
}
impl Eq for DState {}
impl Ord for DState {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for DState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn dijkstra(grid: &Grid, start: Cell, goal: Cell, is_blocked: &dyn Fn(Cell) -> bool) -> Option<Vec<Cell>> {
    if start == goal {
        return Some(vec![]);
    }
    let mut cost_so_far: HashMap<Cell, f64> = HashMap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut heap = BinaryHeap::new();

    cost_so_far.insert(start, 0.0);
    heap.push(DState { cost: 0.0, cell: start });

    while let Some(DState { cost, cell }) = heap.pop() {
        if cell == goal {
            return Some(reconstruct(&came_from, cell));
        }
        if cost > *cost_so_far.get(&cell).unwrap_or(&f64::INFINITY) {
            continue;
        }
        for (dx, dy) in DIRECTIONS_4 {
            let next = (cell.0 + dx, cell.1 + dy);
            if !admissible(grid, next, goal, is_blocked) {
                continue;
            }
            let next_cost = cost + 1.0;
            if next_cost < *cost_so_far.get(&next).unwrap_or(&f64::INFINITY) {
                cost_so_far.insert(next, next_cost);
                came_from.insert(next, cell);
                heap.push(DState { cost: next_cost, cell: next });
            }
        }
    }
    None
}

#[derive(Clone, PartialEq)]
struct AState {
    f: f64,
    g: f64,
    cell: Cell,
}
impl Eq for AState {}
impl Ord for AState {
    fn cmp(&self, other: &Self) -> Ordering {
        other.f.partial_cmp(&self.f).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for AState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// `congestion_penalty` > 0 turns this into the alternative-route
/// planner: each neighbor adjacent to a blocked cell gets that much added
/// to its step cost, biasing detours away from contested corridors.
fn a_star(
    grid: &Grid,
    start: Cell,
    goal: Cell,
    is_blocked: &dyn Fn(Cell) -> bool,
    congestion_penalty: f64,
) -> Option<Vec<Cell>> {
    if start == goal {
        return Some(vec![]);
    }
    let mut g_score: HashMap<Cell, f64> = HashMap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut heap = BinaryHeap::new();

    g_score.insert(start, 0.0);
    heap.push(AState { f: euclidean_distance(start, goal), g: 0.0, cell: start });

    while let Some(AState { g, cell, .. }) = heap.pop() {
        if cell == goal {
            return Some(reconstruct(&came_from, cell));
        }
        if g > *g_score.get(&cell).unwrap_or(&f64::INFINITY) {
            continue;
        }
        for (dx, dy) in DIRECTIONS_4 {
            let next = (cell.0 + dx, cell.1 + dy);
            if !admissible(grid, next, goal, is_blocked) {
                continue;
            }
            let mut step_cost = 1.0;
            if congestion_penalty > 0.0 {
                let near_blocked = DIRECTIONS_4
                    .iter()
                    .map(|(dx, dy)| (next.0 + dx, next.1 + dy))
                    .filter(|&n| grid.in_bounds(n))
                    .any(|n| n != goal && is_blocked(n));
                if near_blocked {
                    step_cost += congestion_penalty;
                }
            }
            let tentative_g = g + step_cost;
            if tentative_g < *g_score.get(&next).unwrap_or(&f64::INFINITY) {
                g_score.insert(next, tentative_g);
                came_from.insert(next, cell);
                let h = euclidean_distance(next, goal);
                heap.push(AState { f: tentative_g + h, g: tentative_g, cell: next });
            }
        }
    }
    None
}

/// Tiny wall-clock helper isolated so planner logic doesn't sprinkle
/// `std::time` calls throughout; not used for anything simulation-visible.
struct Instant(std::time::Instant);
impl Instant {
    fn now() -> Self {
        Instant(std::time::Instant::now())
    }
    fn elapsed_seconds(&self) -> f64 {
        self.0.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never_blocked(_: Cell) -> bool {
        false
    }

    #[test]
    fn test_astar_straight_line() {
        let grid = Grid::new(10, 10);
        let mut router = Router::new();
        let path = router.find_path(&grid, (0, 0), (3, 0), AlgorithmChoice::Fixed(Algorithm::AStar), &never_blocked);
        assert_eq!(path, vec![(1, 0), (2, 0), (3, 0)]);
    }

    #[test]
    fn test_dijkstra_matches_astar_length() {
        let grid = Grid::new(10, 10);
        let mut router = Router::new();
        let a = router.find_path(&grid, (0, 0), (4, 4), AlgorithmChoice::Fixed(Algorithm::AStar), &never_blocked);
        let d = router.find_path(&grid, (0, 0), (4, 4), AlgorithmChoice::Fixed(Algorithm::Dijkstra), &never_blocked);
        assert_eq!(a.len(), d.len());
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn test_unreachable_goal_returns_empty() {
        let grid = Grid::new(3, 3);
        let mut router = Router::new();
        let path = router.find_path(&grid, (0, 0), (2, 2), AlgorithmChoice::Fixed(Algorithm::AStar), &|c| c != (2, 2));
        assert!(path.is_empty());
    }

    #[test]
    fn test_goal_always_admissible_even_if_oracle_blocks_it() {
        let grid = Grid::new(3, 3);
        let mut router = Router::new();
        let path = router.find_path(&grid, (0, 0), (1, 0), AlgorithmChoice::Fixed(Algorithm::AStar), &|_| true);
        assert_eq!(path, vec![(1, 0)]);
    }

    #[test]
    fn test_auto_defaults_before_threshold() {
        let router = Router::new();
        assert_eq!(router.choose_best_algorithm(), Algorithm::AStar);
    }

    #[test]
    fn test_round_trip_symmetric_length() {
        let grid = Grid::new(10, 10);
        let mut router = Router::new();
        let there = router.find_path(&grid, (1, 1), (6, 5), AlgorithmChoice::Fixed(Algorithm::AStar), &never_blocked);
        let back = router.find_path(&grid, (6, 5), (1, 1), AlgorithmChoice::Fixed(Algorithm::AStar), &never_blocked);
        assert_eq!(there.len(), back.len());
    }
}
