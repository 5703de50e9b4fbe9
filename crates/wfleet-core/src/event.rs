//! Scheduled events for the discrete-event fleet simulation
//!
//! Every suspension point in a robot's control loop — a contention wait, a
//! retry backoff, a charging tick, a motion step — is represented as a
//! scheduled event rather than a blocked thread. An agent's "thread of
//! control" is the chain of `AgentWake` events it keeps re-scheduling for
//! itself; `step()` on the agent advances it by exactly one state
//! transition and returns the delay until its next wake.

use crate::{EventId, OrderId, RobotId, SimTime};
use rkyv::{Archive, Deserialize, Serialize};
use std::cmp::Ordering;

/// All possible simulation events
#[derive(Archive, Deserialize, Serialize, Clone, Debug)]
pub enum SimEvent {
    /// Wake a robot's control loop for its next state transition.
    AgentWake { robot_id: RobotId },

    /// An order becomes visible to the fleet (injected by the scenario
    /// generator or operator surface, never by a robot).
    OrderArrival { order_id: OrderId },

    /// Periodic diagnostics sampling tick.
    MetricsSampleTick,
}

impl SimEvent {
    /// Get a string name for the event type
    pub fn event_type_name(&self) -> &'static str {
        match self {
            SimEvent::AgentWake { .. } => "agent_wake",
            SimEvent::OrderArrival { .. } => "order_arrival",
            SimEvent::MetricsSampleTick => "metrics_sample_tick",
        }
    }

    /// Get the robot ID associated with this event, if any
    pub fn robot_id(&self) -> Option<RobotId> {
        match self {
            SimEvent::AgentWake { robot_id } => Some(*robot_id),
            _ => None,
        }
    }

    /// Get the order ID associated with this event, if any
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            SimEvent::OrderArrival { order_id } => Some(*order_id),
            _ => None,
        }
    }
}

/// A scheduled event with timestamp and unique ID
#[derive(Archive, Deserialize, Serialize, Clone, Debug)]
pub struct ScheduledEvent {
    pub id: EventId,
    pub time: SimTime,
    pub event: SimEvent,
}

impl ScheduledEvent {
    /// Create a new scheduled event
    pub fn new(id: EventId, time: SimTime, event: SimEvent) -> Self {
        Self { id, time, event }
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (earliest time first).
        // If times are equal, use event ID for deterministic ordering.
        match other.time.0.partial_cmp(&self.time.0) {
            Some(Ordering::Equal) | None => other.id.0.cmp(&self.id.0),
            Some(ord) => ord,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ordering() {
        let e1 = ScheduledEvent::new(
            EventId(1),
            SimTime::from_seconds(10.0),
            SimEvent::MetricsSampleTick,
        );
        let e2 = ScheduledEvent::new(
            EventId(2),
            SimTime::from_seconds(5.0),
            SimEvent::MetricsSampleTick,
        );

        // e2 should come first (earlier time)
        assert!(e2 > e1);
    }

    #[test]
    fn test_event_type_name() {
        let event = SimEvent::OrderArrival { order_id: OrderId(1) };
        assert_eq!(event.event_type_name(), "order_arrival");
    }

    #[test]
    fn test_agent_wake_robot_id() {
        let event = SimEvent::AgentWake { robot_id: RobotId(76) };
        assert_eq!(event.robot_id(), Some(RobotId(76)));
    }
}
