//! Robot control loop (C6)
//!
//! One `AgentTask` per robot holds everything its state machine needs
//! between wakes: the order it's working, how far into that order it
//! got, and (while in motion) the path it's following. `on_wake` is the
//! single entry point the event handler calls for every `AgentWake`; it
//! dispatches on `task.next` and returns the delay until the following
//! wake, mirroring the donor script's "every sleep is a suspension
//! point" design without needing a real thread per robot.
//!
//! One simplification from a fully literal reading of the control loop,
//! noted in the grounding ledger: a deadlock retreat is modeled as an
//! instantaneous relocation (distance-costed, but not stepped
//! cell-by-cell) followed by one consolidated pause instead of a
//! sequence of separately scheduled waits.

use wfleet_core::{ItemId, OrderId, PalletId, RobotId, ShelfId};
use wfleet_entities::{CarriedItem, Order, OrderLine, RobotState};
use wfleet_map::{euclidean_distance, AlgorithmChoice, Cell, Grid, ReservationRegistry};
use wfleet_storage::OrderStatus;

use crate::world::World;

const CHARGE_POWER_W: f64 = 1000.0;
const CHARGE_EFFICIENCY: f64 = 0.9;
const MAX_LINE_RETRIES: u32 = 10;
const MAX_DELIVERY_ATTEMPTS: u32 = 5;
const MAX_MOVE_PLAN_ATTEMPTS: u32 = 5;
const MAX_BLOCKED_RETRIES: u32 = 20;
const BLOCKED_DEADLOCK_CHECK_AFTER_S: f64 = 2.0;
const BLOCKED_CHECK_INTERVAL_S: f64 = 0.8;
const SAFETY_MARGIN_PERCENT: f64 = 15.0;
const OPPORTUNISTIC_CHARGE_THRESHOLD: f64 = 90.0;

/// Where a `Motion` is headed and what to do on arrival.
#[derive(Clone, Debug)]
pub enum MotionPurpose {
    ToCharger,
    ToParking,
    ToPalletApproach { pallet_id: PalletId, item_id: ItemId },
    ToShelfApproach { shelf_id: ShelfId },
}

#[derive(Clone, Debug)]
struct Motion {
    dest: Cell,
    path: Vec<Cell>,
    idx: usize,
    blocked_retries: u32,
    blocked_since: Option<f64>,
    purpose: MotionPurpose,
}

/// What `on_wake` should do the next time this robot's clock fires.
#[derive(Clone, Debug, Default)]
pub enum NextAction {
    #[default]
    ControlTick,
    ChargingTick,
    MotionStep,
    MotionRetryPlan,
    RetreatResume,
    LineRetryWait,
    DeliveryRetry,
}

/// Per-robot task state: which order it's working, how far into that
/// order's lines it got, and (while moving) the active `Motion`.
/// `Robot` itself (in `world.robots`) is the physical half; this is the
/// task half.
#[derive(Clone, Debug, Default)]
pub struct AgentTask {
    pub order: Option<Order>,
    pub line_idx: usize,
    pub line_qty_remaining: u32,
    pub line_retry: u32,
    pub failed_pallets: Vec<PalletId>,
    pub skipped_items: Vec<ItemId>,
    pub delivery_attempts: u32,
    pub diverted_order: Option<OrderId>,
    pub move_fail_attempts: u32,
    pub pending_motion_target: Option<(Cell, MotionPurpose)>,
    pub retreat_resume: Option<(Cell, MotionPurpose)>,
    motion: Option<Motion>,
    pub next: NextAction,
}

impl AgentTask {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Advance a robot's control loop by exactly one state transition.
/// Returns the delay until its next wake.
pub fn on_wake(world: &mut World, robot_id: RobotId, now: f64) -> f64 {
    let action = world.tasks.get(&robot_id).map(|t| t.next.clone()).unwrap_or_default();
    match action {
        NextAction::ControlTick => control_tick(world, robot_id, now),
        NextAction::ChargingTick => charging_tick(world, robot_id, now),
        NextAction::MotionStep => motion_step(world, robot_id, now),
        NextAction::MotionRetryPlan => {
            let target = world.tasks.get_mut(&robot_id).and_then(|t| t.pending_motion_target.take());
            match target {
                Some((dest, purpose)) => begin_move_to(world, robot_id, dest, purpose, now),
                None => control_tick(world, robot_id, now),
            }
        }
        NextAction::RetreatResume => retreat_resume(world, robot_id, now),
        NextAction::LineRetryWait => begin_fetch_line(world, robot_id, now),
        NextAction::DeliveryRetry => begin_delivery(world, robot_id, now),
    }
}

// --- 4.4.1 control loop -----------------------------------------------

fn control_tick(world: &mut World, robot_id: RobotId, now: f64) -> f64 {
    let pending = world.store.lowest_pending_order().is_some();
    let robot = world.robots.get(&robot_id).unwrap();

    if robot.is_battery_critical() && !robot.is_charging {
        return begin_route_to_charger(world, robot_id, now, false);
    }
    if !robot.is_idle() {
        world.tasks.get_mut(&robot_id).unwrap().next = NextAction::ControlTick;
        return 1.0;
    }
    if pending {
        return attempt_claim(world, robot_id, now);
    }
    if robot.battery < OPPORTUNISTIC_CHARGE_THRESHOLD {
        return begin_route_to_charger(world, robot_id, now, false);
    }
    begin_route_to_parking(world, robot_id, now)
}

fn begin_route_to_charger(world: &mut World, robot_id: RobotId, now: f64, diverted: bool) -> f64 {
    if diverted {
        let order_id = world.tasks.get(&robot_id).and_then(|t| t.order.as_ref().map(|o| o.id));
        world.tasks.get_mut(&robot_id).unwrap().diverted_order = order_id;
    }
    let dest = world.robots.get(&robot_id).unwrap().charging_cell;
    world.robots.get_mut(&robot_id).unwrap().state = RobotState::Moving;
    begin_move_to(world, robot_id, dest, MotionPurpose::ToCharger, now)
}

fn begin_route_to_parking(world: &mut World, robot_id: RobotId, now: f64) -> f64 {
    let dest = world.robots.get(&robot_id).unwrap().parking_cell;
    world.robots.get_mut(&robot_id).unwrap().state = RobotState::Moving;
    begin_move_to(world, robot_id, dest, MotionPurpose::ToParking, now)
}

fn start_charging(world: &mut World, robot_id: RobotId, now: f64) -> f64 {
    let robot = world.robots.get_mut(&robot_id).unwrap();
    robot.is_charging = true;
    robot.state = RobotState::Charging;
    let _ = now;
    world.write_through_robot(robot_id);
    world.tasks.get_mut(&robot_id).unwrap().next = NextAction::ChargingTick;
    1.0
}

fn charging_tick(world: &mut World, robot_id: RobotId, now: f64) -> f64 {
    let charging_cell = world.robots.get(&robot_id).unwrap().charging_cell;
    let position = world.robots.get(&robot_id).unwrap().position;
    if position != charging_cell {
        let robot = world.robots.get_mut(&robot_id).unwrap();
        robot.is_charging = false;
        robot.state = RobotState::Idle;
        world.tasks.get_mut(&robot_id).unwrap().next = NextAction::ControlTick;
        return 1.0;
    }

    let capacity_wh = world.energy.battery_capacity_wh;
    let rate = 100.0 * CHARGE_POWER_W * CHARGE_EFFICIENCY / (3600.0 * capacity_wh);
    let robot = world.robots.get_mut(&robot_id).unwrap();
    robot.battery = (robot.battery + rate).min(100.0);
    world.write_through_robot(robot_id);

    let has_diverted_work = world.tasks.get(&robot_id).map_or(false, |t| t.diverted_order.is_some());
    let has_pending_work = has_diverted_work || world.store.lowest_pending_order().is_some();
    let robot = world.robots.get(&robot_id).unwrap();
    if robot.can_resume_from_charging(has_pending_work) {
        return leave_charging(world, robot_id, now);
    }
    world.tasks.get_mut(&robot_id).unwrap().next = NextAction::ChargingTick;
    1.0
}

fn leave_charging(world: &mut World, robot_id: RobotId, now: f64) -> f64 {
    let robot = world.robots.get_mut(&robot_id).unwrap();
    robot.is_charging = false;
    robot.state = RobotState::Idle;

    let task = world.tasks.get_mut(&robot_id).unwrap();
    if task.diverted_order.take().is_some() || task.order.is_some() {
        return begin_fetch_line(world, robot_id, now);
    }
    task.next = NextAction::ControlTick;
    1.0
}

// --- 4.4.2 order claim --------------------------------------------------

fn attempt_claim(world: &mut World, robot_id: RobotId, now: f64) -> f64 {
    let Some(order_id) = world.store.lowest_pending_order() else {
        world.tasks.get_mut(&robot_id).unwrap().next = NextAction::ControlTick;
        return 1.0;
    };

    let items = world.store.order_items(order_id);
    let mut lines = Vec::with_capacity(items.len());
    let mut skipped = Vec::new();
    let mut first_pallet: Option<(ItemId, PalletId)> = None;
    for oi in &items {
        lines.push(OrderLine::new(oi.item_id, oi.quantity));
        match world.store.find_pallet_stock(oi.item_id, &[]) {
            Some(row) if first_pallet.is_none() => first_pallet = Some((oi.item_id, PalletId(row.location_id))),
            Some(_) => {}
            None => skipped.push(oi.item_id),
        }
    }

    if first_pallet.is_none() {
        world.store.set_order_status(order_id, OrderStatus::Failed);
        world.metrics.record_order_status(order_id, OrderStatus::Failed);
        world.tasks.get_mut(&robot_id).unwrap().next = NextAction::ControlTick;
        return 1.0;
    }

    let (_, pallet_id) = first_pallet.unwrap();
    let pallet = world.store.get_pallet(pallet_id).unwrap();
    let pallet_cell = (pallet.x, pallet.y);
    let shelf_approach_cell = (4, pallet.y);
    let robot = world.robots.get(&robot_id).unwrap();
    let (position, parking_cell, battery) = (robot.position, robot.parking_cell, robot.battery);

    let leg1 = plan_leg_length(world, robot_id, position, pallet_cell);
    let leg2 = plan_leg_length(world, robot_id, pallet_cell, shelf_approach_cell);
    let leg3 = plan_leg_length(world, robot_id, shelf_approach_cell, parking_cell);
    let (_, feasible) = world.energy.three_leg_feasible(battery, leg1, leg2, leg3, SAFETY_MARGIN_PERCENT);
    if !feasible {
        return begin_route_to_charger(world, robot_id, now, false);
    }

    if !world.store.claim_order(order_id) {
        world.tasks.get_mut(&robot_id).unwrap().next = NextAction::ControlTick;
        return 1.0;
    }

    let row = world.store.get_order(order_id).unwrap();
    let mut order = Order::from_row(&row, lines);
    order.start();

    let task = world.tasks.get_mut(&robot_id).unwrap();
    task.order = Some(order);
    task.skipped_items = skipped;
    task.line_idx = 0;
    task.line_retry = 0;
    task.failed_pallets.clear();
    task.delivery_attempts = 0;
    skip_unavailable_lines(task);

    if task.line_idx >= task.order.as_ref().unwrap().lines.len() {
        return finalize_order(world, robot_id, now);
    }
    let qty = task.order.as_ref().unwrap().lines[task.line_idx].quantity;
    task.line_qty_remaining = qty;
    world.robots.get_mut(&robot_id).unwrap().state = RobotState::Processing(order_id);
    begin_fetch_line(world, robot_id, now)
}

fn skip_unavailable_lines(task: &mut AgentTask) {
    let order = task.order.as_ref().unwrap();
    while task.line_idx < order.lines.len() && task.skipped_items.contains(&order.lines[task.line_idx].item_id) {
        task.line_idx += 1;
    }
}

// --- 4.4.3 order execution -----------------------------------------------

fn begin_fetch_line(world: &mut World, robot_id: RobotId, now: f64) -> f64 {
    let task = world.tasks.get_mut(&robot_id).unwrap();
    if task.order.is_none() {
        task.next = NextAction::ControlTick;
        return 1.0;
    }
    if task.line_qty_remaining == 0 {
        return advance_or_finalize(world, robot_id, now);
    }

    let item_id = task.order.as_ref().unwrap().lines[task.line_idx].item_id;
    task.line_retry += 1;
    if task.line_retry > MAX_LINE_RETRIES {
        tracing::warn!(?robot_id, item_id = item_id.as_u32(), "line retry budget exhausted, marking unsatisfiable");
        task.failed_pallets.clear();
        task.line_retry = 0;
        return advance_or_finalize(world, robot_id, now);
    }

    match world.store.find_pallet_stock(item_id, &world.tasks[&robot_id].failed_pallets) {
        Some(row) => {
            let pallet = world.store.get_pallet(PalletId(row.location_id)).unwrap();
            let approach = approach_position_generic(&world.grid, &world.registry, (pallet.x, pallet.y))
                .unwrap_or((pallet.x, pallet.y));
            begin_move_to(
                world,
                robot_id,
                approach,
                MotionPurpose::ToPalletApproach { pallet_id: pallet.id, item_id },
                now,
            )
        }
        None => {
            let task = world.tasks.get_mut(&robot_id).unwrap();
            if !task.failed_pallets.is_empty() {
                task.failed_pallets.clear();
                task.next = NextAction::LineRetryWait;
                5.0
            } else {
                advance_or_finalize(world, robot_id, now)
            }
        }
    }
}

fn arrived_at_pallet(world: &mut World, robot_id: RobotId, now: f64, pallet_id: PalletId, item_id: ItemId) -> f64 {
    let robot = world.robots.get(&robot_id).unwrap();
    let capacity_remaining = robot.capacity_units.saturating_sub(robot.carried_units());
    let task = world.tasks.get(&robot_id).unwrap();
    let want = task.line_qty_remaining.min(capacity_remaining);

    if want == 0 {
        return begin_delivery(world, robot_id, now);
    }

    let failed = task.failed_pallets.clone();
    match world.store.find_pallet_stock(item_id, &failed) {
        Some(row) => {
            let take = want.min(row.quantity);
            match world.store.inventory_take(row.id, take) {
                Ok(taken) if taken > 0 => {
                    let order_id = world.tasks[&robot_id].order.as_ref().unwrap().id;
                    world.robots.get_mut(&robot_id).unwrap().carrying.push(CarriedItem { item_id, order_id, quantity: taken });
                    let task = world.tasks.get_mut(&robot_id).unwrap();
                    task.line_qty_remaining = task.line_qty_remaining.saturating_sub(taken);
                }
                _ => {
                    world.tasks.get_mut(&robot_id).unwrap().failed_pallets.push(pallet_id);
                }
            }
        }
        None => {
            world.tasks.get_mut(&robot_id).unwrap().failed_pallets.push(pallet_id);
        }
    }

    let robot = world.robots.get(&robot_id).unwrap();
    if robot.carried_units() >= robot.capacity_units {
        return begin_delivery(world, robot_id, now);
    }
    let task = world.tasks.get(&robot_id).unwrap();
    if task.line_qty_remaining == 0 {
        return advance_or_finalize(world, robot_id, now);
    }
    begin_fetch_line(world, robot_id, now)
}

fn advance_or_finalize(world: &mut World, robot_id: RobotId, now: f64) -> f64 {
    let task = world.tasks.get_mut(&robot_id).unwrap();
    task.line_idx += 1;
    skip_unavailable_lines(task);
    let order = task.order.as_ref().unwrap();

    if task.line_idx < order.lines.len() {
        task.line_qty_remaining = order.lines[task.line_idx].quantity - order.lines[task.line_idx].fulfilled;
        task.failed_pallets.clear();
        task.line_retry = 0;
        return begin_fetch_line(world, robot_id, now);
    }

    if !world.robots.get(&robot_id).unwrap().carrying.is_empty() {
        return begin_delivery(world, robot_id, now);
    }
    finalize_order(world, robot_id, now)
}

fn begin_delivery(world: &mut World, robot_id: RobotId, now: f64) -> f64 {
    let task = world.tasks.get_mut(&robot_id).unwrap();
    let order_id = task.order.as_ref().unwrap().id;
    task.delivery_attempts += 1;
    if task.delivery_attempts > MAX_DELIVERY_ATTEMPTS {
        task.delivery_attempts = 0;
        task.next = NextAction::DeliveryRetry;
        return 5.0;
    }

    let shelf_id = world.store.find_shelf_for_order(order_id).or_else(|| world.store.find_empty_free_shelf());
    match shelf_id {
        None => {
            world.tasks.get_mut(&robot_id).unwrap().next = NextAction::DeliveryRetry;
            2.0
        }
        Some(shelf_id) => {
            if !world.store.claim_shelf(shelf_id, robot_id, order_id) {
                world.tasks.get_mut(&robot_id).unwrap().next = NextAction::DeliveryRetry;
                return 2.0;
            }
            let row = world.store.get_shelf(shelf_id).unwrap();
            let target = (row.x, row.y);
            let approach = approach_position_for_shelf(&world.grid, &world.registry, target).unwrap_or(target);
            begin_move_to(world, robot_id, approach, MotionPurpose::ToShelfApproach { shelf_id }, now)
        }
    }
}

fn arrived_at_shelf(world: &mut World, robot_id: RobotId, now: f64, shelf_id: ShelfId) -> f64 {
    let order_id = world.tasks[&robot_id].order.as_ref().unwrap().id;
    let carried: Vec<CarriedItem> = world.robots.get_mut(&robot_id).unwrap().carrying.drain(..).collect();

    for item in carried {
        match world.store.inventory_place_on_shelf(shelf_id, item.item_id, item.quantity, order_id) {
            Ok(()) => {
                let task = world.tasks.get_mut(&robot_id).unwrap();
                if let Some(line) = task.order.as_mut().unwrap().lines.iter_mut().find(|l| l.item_id == item.item_id) {
                    line.fulfilled += item.quantity;
                }
            }
            Err(_) => {
                world.robots.get_mut(&robot_id).unwrap().carrying.push(item);
            }
        }
    }

    let mut row = world.store.get_shelf(shelf_id).unwrap();
    row.status = wfleet_storage::ShelfStatus::Busy;
    row.robot_id = None;
    world.store.put_shelf(row);
    world.tasks.get_mut(&robot_id).unwrap().delivery_attempts = 0;

    if !world.robots.get(&robot_id).unwrap().carrying.is_empty() {
        return begin_delivery(world, robot_id, now);
    }
    advance_or_finalize(world, robot_id, now)
}

fn finalize_order(world: &mut World, robot_id: RobotId, now: f64) -> f64 {
    let task = world.tasks.get_mut(&robot_id).unwrap();
    let mut order = task.order.take().unwrap();
    let had_skipped = !task.skipped_items.is_empty();
    let status = if order.all_lines_fulfilled() && !had_skipped {
        OrderStatus::Done
    } else if order.lines.iter().any(|l| l.fulfilled > 0) {
        OrderStatus::Partial
    } else {
        OrderStatus::Failed
    };
    order.finish(status, now);
    tracing::info!(order_id = order.id.as_u32(), ?status, ?robot_id, "order finalized");
    world.store.set_order_status(order.id, status);
    world.metrics.record_order_status(order.id, status);
    world.metrics.record_order_completion(order.cycle_time().unwrap_or(0.0), status);

    world.robots.get_mut(&robot_id).unwrap().state = RobotState::Idle;
    let task = world.tasks.get_mut(&robot_id).unwrap();
    task.skipped_items.clear();
    task.next = NextAction::ControlTick;
    let _ = now;
    1.0
}

// --- 4.4.4 motion sub-machine --------------------------------------------

fn begin_move_to(world: &mut World, robot_id: RobotId, dest: Cell, purpose: MotionPurpose, now: f64) -> f64 {
    let pos = world.robots.get(&robot_id).unwrap().position;
    if pos == dest {
        return handle_arrival(world, robot_id, now, purpose);
    }

    let path = {
        let grid = &world.grid;
        let registry = &world.registry;
        world.router.find_path(grid, pos, dest, AlgorithmChoice::Auto, &|c| registry.is_blocked(grid, c, robot_id, dest))
    };

    if path.is_empty() {
        let task = world.tasks.get_mut(&robot_id).unwrap();
        task.move_fail_attempts += 1;
        if task.move_fail_attempts >= MAX_MOVE_PLAN_ATTEMPTS {
            task.move_fail_attempts = 0;
            return abandon_motion(world, robot_id, now, purpose);
        }
        task.pending_motion_target = Some((dest, purpose));
        task.next = NextAction::MotionRetryPlan;
        return 2.0;
    }

    let task = world.tasks.get_mut(&robot_id).unwrap();
    task.move_fail_attempts = 0;
    task.motion = Some(Motion { dest, path, idx: 0, blocked_retries: 0, blocked_since: None, purpose });
    task.next = NextAction::MotionStep;
    motion_step(world, robot_id, now)
}

fn motion_step(world: &mut World, robot_id: RobotId, now: f64) -> f64 {
    let Some(motion) = world.tasks.get(&robot_id).unwrap().motion.clone() else {
        return control_tick(world, robot_id, now);
    };
    let next = motion.path[motion.idx];

    if world.registry.try_reserve(robot_id, next) {
        let prev = world.robots.get(&robot_id).unwrap().position;
        world.registry.release(robot_id, prev);

        let payload = world.robots.get(&robot_id).unwrap().current_payload_kg();
        let cost = world.energy.cost_percent(1.0, payload);
        {
            let robot = world.robots.get_mut(&robot_id).unwrap();
            robot.battery = (robot.battery - cost).max(0.0);
            robot.position = next;
        }
        world.write_through_robot(robot_id);

        let purpose_is_charger = matches!(motion.purpose, MotionPurpose::ToCharger);
        let critical_diversion = world.robots.get(&robot_id).unwrap().is_battery_critical() && !purpose_is_charger;
        if critical_diversion {
            world.registry.clear_destination(robot_id);
            world.tasks.get_mut(&robot_id).unwrap().motion = None;
            return begin_route_to_charger(world, robot_id, now, true);
        }

        let idx = motion.idx + 1;
        if idx >= motion.path.len() {
            world.registry.clear_destination(robot_id);
            world.tasks.get_mut(&robot_id).unwrap().motion = None;
            return handle_arrival(world, robot_id, now, motion.purpose);
        }
        let task = world.tasks.get_mut(&robot_id).unwrap();
        let m = task.motion.as_mut().unwrap();
        m.idx = idx;
        m.blocked_retries = 0;
        m.blocked_since = None;
        task.next = NextAction::MotionStep;
        return 0.5;
    }

    blocked(world, robot_id, now, motion, next)
}

fn blocked(world: &mut World, robot_id: RobotId, now: f64, motion: Motion, next: Cell) -> f64 {
    let since = motion.blocked_since.unwrap_or(now);
    let waited = now - since;

    {
        let task = world.tasks.get_mut(&robot_id).unwrap();
        let m = task.motion.as_mut().unwrap();
        m.blocked_retries += 1;
        m.blocked_since = Some(since);
    }

    if waited > BLOCKED_DEADLOCK_CHECK_AFTER_S {
        if let Some(chain) = world.registry.deadlock_chain(robot_id, next) {
            return handle_deadlock(world, robot_id, now, chain, motion);
        }
    }

    if motion.blocked_retries < MAX_BLOCKED_RETRIES {
        world.tasks.get_mut(&robot_id).unwrap().next = NextAction::MotionStep;
        return BLOCKED_CHECK_INTERVAL_S;
    }

    // Exhausted local retries: try the alternative-route planner before
    // giving up on this `move_to_basic` attempt entirely.
    let pos = world.robots.get(&robot_id).unwrap().position;
    let alt = {
        let grid = &world.grid;
        let registry = &world.registry;
        world.router.find_alternative_path(grid, pos, motion.dest, &|c| registry.is_blocked(grid, c, robot_id, motion.dest))
    };
    if !alt.is_empty() {
        let task = world.tasks.get_mut(&robot_id).unwrap();
        let m = task.motion.as_mut().unwrap();
        m.path = alt;
        m.idx = 0;
        m.blocked_retries = 0;
        m.blocked_since = None;
        task.next = NextAction::MotionStep;
        return 0.1;
    }

    let (dest, purpose) = (motion.dest, motion.purpose.clone());
    let task = world.tasks.get_mut(&robot_id).unwrap();
    task.motion = None;
    task.pending_motion_target = Some((dest, purpose));
    task.next = NextAction::MotionRetryPlan;
    world.rng.uniform(2.0, 4.0)
}

fn handle_deadlock(world: &mut World, robot_id: RobotId, now: f64, chain: Vec<RobotId>, motion: Motion) -> f64 {
    let decision = wfleet_policies::decide(
        &chain,
        |r| world.has_free_neighbor(r),
        |r| world.registry.is_cannot_retreat(r),
    );
    world.metrics.record_deadlock_chain_resolved();

    match decision {
        wfleet_policies::RetreatDecision::Retreat(who) if who == robot_id => {
            execute_retreat(world, robot_id, now, motion.dest, motion.purpose)
        }
        wfleet_policies::RetreatDecision::Retreat(_) => {
            world.tasks.get_mut(&robot_id).unwrap().next = NextAction::MotionStep;
            BLOCKED_CHECK_INTERVAL_S
        }
        wfleet_policies::RetreatDecision::ReplanAfter(delay) => {
            world.tasks.get_mut(&robot_id).unwrap().next = NextAction::MotionStep;
            delay
        }
        wfleet_policies::RetreatDecision::WaitTicks(ticks) => {
            world.tasks.get_mut(&robot_id).unwrap().next = NextAction::MotionStep;
            ticks as f64
        }
    }
}

fn execute_retreat(world: &mut World, robot_id: RobotId, now: f64, resume_dest: Cell, resume_purpose: MotionPurpose) -> f64 {
    let from = world.robots.get(&robot_id).unwrap().position;
    let retreat_cell = wfleet_policies::select_retreat_cell(&world.grid, &world.registry, robot_id, from, &mut world.rng);
    let _ = now;

    match retreat_cell {
        Some(cell) => {
            world.registry.release(robot_id, from);
            world.registry.try_reserve(robot_id, cell);

            let payload = world.robots.get(&robot_id).unwrap().current_payload_kg();
            let cost = world.energy.cost_percent(euclidean_distance(from, cell), payload);
            let robot = world.robots.get_mut(&robot_id).unwrap();
            robot.battery = (robot.battery - cost).max(0.0);
            robot.position = cell;
            world.write_through_robot(robot_id);
            world.registry.release(robot_id, cell);
            world.registry.clear_cannot_retreat(robot_id);
            world.metrics.record_retreat_maneuver(true);

            let pause = world.rng.uniform(2.0, 4.0) + world.rng.uniform(0.5, 1.5);
            let task = world.tasks.get_mut(&robot_id).unwrap();
            task.motion = None;
            task.retreat_resume = Some((resume_dest, resume_purpose));
            task.next = NextAction::RetreatResume;
            pause
        }
        None => {
            world.registry.mark_cannot_retreat(robot_id);
            world.metrics.record_retreat_maneuver(false);
            world.metrics.record_cannot_retreat();
            world.tasks.get_mut(&robot_id).unwrap().next = NextAction::MotionStep;
            BLOCKED_CHECK_INTERVAL_S
        }
    }
}

fn retreat_resume(world: &mut World, robot_id: RobotId, now: f64) -> f64 {
    let (dest, purpose) = world.tasks.get_mut(&robot_id).unwrap().retreat_resume.take().unwrap();
    begin_move_to(world, robot_id, dest, purpose, now)
}

fn abandon_motion(world: &mut World, robot_id: RobotId, now: f64, purpose: MotionPurpose) -> f64 {
    match purpose {
        MotionPurpose::ToCharger | MotionPurpose::ToParking => {
            world.tasks.get_mut(&robot_id).unwrap().next = NextAction::ControlTick;
            2.0
        }
        MotionPurpose::ToPalletApproach { pallet_id, .. } => {
            world.tasks.get_mut(&robot_id).unwrap().failed_pallets.push(pallet_id);
            begin_fetch_line(world, robot_id, now)
        }
        MotionPurpose::ToShelfApproach { shelf_id } => {
            let mut row = world.store.get_shelf(shelf_id).unwrap();
            if row.robot_id == Some(robot_id) {
                row.status = wfleet_storage::ShelfStatus::Free;
                row.robot_id = None;
                row.order_id = None;
                world.store.put_shelf(row);
            }
            begin_delivery(world, robot_id, now)
        }
    }
}

fn handle_arrival(world: &mut World, robot_id: RobotId, now: f64, purpose: MotionPurpose) -> f64 {
    match purpose {
        MotionPurpose::ToCharger => start_charging(world, robot_id, now),
        MotionPurpose::ToParking => {
            world.robots.get_mut(&robot_id).unwrap().state = RobotState::Idle;
            world.tasks.get_mut(&robot_id).unwrap().next = NextAction::ControlTick;
            1.0
        }
        MotionPurpose::ToPalletApproach { pallet_id, item_id } => arrived_at_pallet(world, robot_id, now, pallet_id, item_id),
        MotionPurpose::ToShelfApproach { shelf_id } => arrived_at_shelf(world, robot_id, now, shelf_id),
    }
}

/// Planned path length in cells between two points, used by the claim-time
/// energy feasibility check. A plan, not a commitment: it consults current
/// occupancy but reserves nothing.
fn plan_leg_length(world: &mut World, robot_id: RobotId, from: Cell, to: Cell) -> f64 {
    let grid = &world.grid;
    let registry = &world.registry;
    world
        .router
        .find_path(grid, from, to, AlgorithmChoice::Auto, &|c| registry.is_blocked(grid, c, robot_id, to))
        .len() as f64
}

/// First free 4-neighbor of `target`, else an expanding ring out to
/// radius 3.
fn approach_position_generic(grid: &Grid, registry: &ReservationRegistry, target: Cell) -> Option<Cell> {
    if let Some(cell) = grid.neighbors(target).find(|&c| cell_is_free(grid, registry, c)) {
        return Some(cell);
    }
    for r in 2..=3 {
        for dx in -r..=r {
            for dy in -r..=r {
                if dx.abs().max(dy.abs()) != r {
                    continue;
                }
                let cell = (target.0 + dx, target.1 + dy);
                if cell_is_free(grid, registry, cell) {
                    return Some(cell);
                }
            }
        }
    }
    None
}

/// Shelf approach per 4.4.3: prefer the `x=4` column nearest the
/// shelf's row before falling back to the generic ring search.
fn approach_position_for_shelf(grid: &Grid, registry: &ReservationRegistry, target: Cell) -> Option<Cell> {
    let y = target.1;
    for cell in [(4, y), (4, y - 1), (4, y + 1), (4, y - 2), (4, y + 2)] {
        if cell_is_free(grid, registry, cell) {
            return Some(cell);
        }
    }
    approach_position_generic(grid, registry, target)
}

fn cell_is_free(grid: &Grid, registry: &ReservationRegistry, cell: Cell) -> bool {
    grid.in_bounds(cell) && grid.cell_type(cell).map_or(false, |t| t.is_walkable()) && registry.owner_of(cell).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wfleet_entities::Robot;
    use wfleet_storage::{LocationType, MemStore, OrderItemRow, OrderRow};

    fn setup() -> (World, RobotId) {
        let store = Arc::new(MemStore::new());
        store.put_pallet(wfleet_storage::PalletRow { id: PalletId(1), label: "P-01".into(), x: 6, y: 2 });
        store.seed_inventory(ItemId(1), LocationType::Pallet, 1, 10);
        store.put_shelf(wfleet_storage::ShelfRow {
            id: ShelfId(1),
            shelf_code: "S-01".into(),
            x: 4,
            y: 2,
            capacity: 50,
            status: wfleet_storage::ShelfStatus::Free,
            robot_id: None,
            order_id: None,
            updated_at: 0.0,
        });
        store.put_order(OrderRow { id: OrderId(1), created_at: 0.0, status: OrderStatus::Pending });
        store.put_order_item(OrderItemRow { id: 1, order_id: OrderId(1), item_id: ItemId(1), quantity: 3 });

        let mut world = World::new(1, store);
        let robot = Robot::new(RobotId(76), "R76", (18, 2), (19, 2), (18, 2));
        world.robots.insert(RobotId(76), robot);
        world.tasks.insert(RobotId(76), AgentTask::new());
        (world, RobotId(76))
    }

    #[test]
    fn test_claim_gated_on_energy_feasibility() {
        let (mut world, robot_id) = setup();
        world.robots.get_mut(&robot_id).unwrap().battery = 16.0;
        attempt_claim(&mut world, robot_id, 0.0);
        assert!(world.tasks[&robot_id].order.is_none());
        assert_eq!(world.store.get_order(OrderId(1)).unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn test_claim_succeeds_and_begins_fetching() {
        let (mut world, robot_id) = setup();
        attempt_claim(&mut world, robot_id, 0.0);
        assert!(world.tasks[&robot_id].order.is_some());
        assert_eq!(world.store.get_order(OrderId(1)).unwrap().status, OrderStatus::Processing);
    }

    #[test]
    fn test_order_with_no_stock_anywhere_fails_immediately() {
        let (mut world, robot_id) = setup();
        // Drain the only stock so no pallet has it.
        let row = world.store.find_pallet_stock(ItemId(1), &[]).unwrap();
        world.store.inventory_take(row.id, 10).unwrap();
        attempt_claim(&mut world, robot_id, 0.0);
        assert_eq!(world.store.get_order(OrderId(1)).unwrap().status, OrderStatus::Failed);
    }
}
