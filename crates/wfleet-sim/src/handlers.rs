//! Event handlers for simulation events

use tracing::{info, warn};

use wfleet_core::{Kernel, ScheduledEvent, SimEvent, SimTime};
use wfleet_metrics::RobotSnapshot;

use crate::agent;
use crate::world::World;

/// How often a `MetricsSampleTick` re-schedules itself. Distinct from the
/// ~1s agent control-loop cadence (§4.4.1) since diagnostics sampling
/// doesn't need to be as fine-grained as the control loop itself.
const METRICS_SAMPLE_INTERVAL_S: f64 = 5.0;

/// Dispatches scheduled events to the agent control loop, order
/// admission, and diagnostics sampling.
#[derive(Default)]
pub struct EventHandler;

impl EventHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&mut self, kernel: &mut Kernel, world: &mut World, event: &ScheduledEvent) {
        let now = event.time.as_seconds();

        match &event.event {
            SimEvent::AgentWake { robot_id } => {
                if !world.tasks.contains_key(robot_id) {
                    warn!(?robot_id, "AgentWake for unknown robot, dropping");
                    return;
                }
                let delay = agent::on_wake(world, *robot_id, now);
                kernel.schedule_after(SimTime::from_seconds(delay), SimEvent::AgentWake { robot_id: *robot_id });
            }
            SimEvent::OrderArrival { order_id } => {
                match world.store.get_order(*order_id) {
                    Some(row) => info!(order_id = row.id.as_u32(), status = ?row.status, "order arrived"),
                    None => warn!(?order_id, "OrderArrival for an order never written to the store"),
                }
            }
            SimEvent::MetricsSampleTick => {
                self.sample(world);
                kernel.schedule_after(SimTime::from_seconds(METRICS_SAMPLE_INTERVAL_S), SimEvent::MetricsSampleTick);
            }
        }
    }

    fn sample(&mut self, world: &mut World) {
        let snapshots: Vec<RobotSnapshot> = world
            .robots
            .values()
            .map(|r| RobotSnapshot {
                robot_id: r.id,
                status: format!("{:?}", r.state),
                x: r.position.0,
                y: r.position.1,
                battery: r.battery,
            })
            .collect();
        for snapshot in snapshots {
            world.metrics.record_robot_snapshot(snapshot);
        }

        for order in world.store.list_orders() {
            world.metrics.record_order_status(order.id, order.status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wfleet_core::{EventId, OrderId, RobotId};
    use wfleet_storage::{MemStore, OrderRow, OrderStatus};

    fn setup() -> (World, Kernel) {
        let store: Arc<dyn wfleet_storage::Store> = Arc::new(MemStore::new());
        (World::new(1, store), Kernel::new())
    }

    #[test]
    fn test_order_arrival_for_missing_order_does_not_panic() {
        let (mut world, mut kernel) = setup();
        let mut handler = EventHandler::new();
        let event = ScheduledEvent::new(EventId(1), SimTime::ZERO, SimEvent::OrderArrival { order_id: OrderId(99) });
        handler.handle(&mut kernel, &mut world, &event);
    }

    #[test]
    fn test_metrics_sample_tick_reschedules_itself() {
        let (mut world, mut kernel) = setup();
        let mut handler = EventHandler::new();
        let event = ScheduledEvent::new(EventId(1), SimTime::ZERO, SimEvent::MetricsSampleTick);
        handler.handle(&mut kernel, &mut world, &event);
        assert_eq!(kernel.pending_count(), 1);
    }

    #[test]
    fn test_metrics_sample_records_order_status() {
        let (mut world, mut kernel) = setup();
        world.store.put_order(OrderRow { id: OrderId(1), created_at: 0.0, status: OrderStatus::Pending });
        let mut handler = EventHandler::new();
        handler.sample(&mut world);
        assert_eq!(world.metrics.order_status().get(&OrderId(1)), Some(&OrderStatus::Pending));
        let _ = kernel;
    }

    #[test]
    fn test_agent_wake_for_unknown_robot_is_dropped() {
        let (mut world, mut kernel) = setup();
        let mut handler = EventHandler::new();
        let event = ScheduledEvent::new(EventId(1), SimTime::ZERO, SimEvent::AgentWake { robot_id: RobotId(999) });
        handler.handle(&mut kernel, &mut world, &event);
        assert_eq!(kernel.pending_count(), 0);
    }
}
