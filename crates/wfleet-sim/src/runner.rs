//! Simulation runner

use std::sync::Arc;

use wfleet_core::{Kernel, SimEvent, SimTime};
use wfleet_metrics::RunReport;
use wfleet_storage::Store;

use crate::fleet;
use crate::handlers::EventHandler;
use crate::world::World;

/// Orchestrates one run: bootstraps the fleet, drains the kernel's event
/// queue up to `end_time`, and builds a `RunReport` from the accumulated
/// diagnostics. `warmup_time` is recorded for callers that want to
/// exclude startup transients from their own analysis; the kernel itself
/// processes every event regardless of warmup.
pub struct SimulationRunner {
    kernel: Kernel,
    world: World,
    handler: EventHandler,
    end_time: SimTime,
    warmup_time: SimTime,
}

impl SimulationRunner {
    /// Build a runner with a fleet already spawned onto a fresh kernel.
    pub fn new(seed: u64, store: Arc<dyn Store>, robot_ids: &[u32], duration_s: f64, warmup_s: f64) -> Self {
        let mut kernel = Kernel::new();
        let world = fleet::bootstrap(seed, store, robot_ids, &mut kernel);
        kernel.schedule_after(SimTime::from_seconds(5.0), SimEvent::MetricsSampleTick);

        Self {
            kernel,
            world,
            handler: EventHandler::new(),
            end_time: SimTime::from_seconds(warmup_s + duration_s),
            warmup_time: SimTime::from_seconds(warmup_s),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn now(&self) -> SimTime {
        self.kernel.now()
    }

    /// Insert an order (and its lines) into the store and schedule its
    /// `OrderArrival` notification for the current time. Order content
    /// itself is the caller's concern (a scenario builder or operator
    /// surface, §6) — the runner only wires the event.
    pub fn admit_order(&mut self, order: wfleet_storage::OrderRow, lines: Vec<wfleet_storage::OrderItemRow>) {
        let order_id = order.id;
        self.world.store.put_order(order);
        for line in lines {
            self.world.store.put_order_item(line);
        }
        self.kernel.schedule_now(SimEvent::OrderArrival { order_id });
    }

    /// Run until the kernel empties or `end_time` is reached.
    pub fn run(&mut self) -> RunReport {
        while self.kernel.has_events() {
            if self.kernel.now() >= self.end_time {
                break;
            }
            if let Some(event) = self.kernel.pop_next() {
                self.handler.handle(&mut self.kernel, &mut self.world, &event);
            }
        }
        self.build_report()
    }

    fn build_report(&self) -> RunReport {
        let routing_stats = [
            (wfleet_map::Algorithm::AStar, "a_star"),
            (wfleet_map::Algorithm::Dijkstra, "dijkstra"),
        ]
        .into_iter()
        .map(|(algo, name)| (name.to_string(), self.world.router.stats(algo).clone()))
        .collect();

        RunReport::build(&self.world.metrics, self.world.registry.reserved_count(), routing_stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wfleet_core::OrderId;
    use wfleet_storage::{MemStore, OrderItemRow, OrderRow, OrderStatus};

    #[test]
    fn test_runner_bootstraps_default_fleet_and_runs_to_end_time() {
        let store: Arc<dyn Store> = Arc::new(MemStore::new());
        let mut runner = SimulationRunner::new(1, store, &[76, 77], 3.0, 0.0);
        let report = runner.run();
        assert_eq!(report.robots.len(), 0); // the first MetricsSampleTick is scheduled at t=5s, past end_time
        assert!(runner.now().as_seconds() <= 3.0);
    }

    #[test]
    fn test_runner_admits_and_completes_a_simple_order() {
        let store: Arc<dyn Store> = Arc::new(MemStore::new());
        let mut runner = SimulationRunner::new(1, store, &[76], 600.0, 0.0);

        let item_id = runner.world().store.list_items()[0].id;
        runner.admit_order(
            OrderRow { id: OrderId(1), created_at: 0.0, status: OrderStatus::Pending },
            vec![OrderItemRow { id: 0, order_id: OrderId(1), item_id, quantity: 1 }],
        );

        let report = runner.run();
        let order = runner.world().store.get_order(OrderId(1)).unwrap();
        assert_ne!(order.status, OrderStatus::Pending);
        assert!(report.order_outcomes.done + report.order_outcomes.partial + report.order_outcomes.failed <= 1);
    }
}
