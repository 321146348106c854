//! Change feed.
//!
//! Every write that other clients should notice is published here. The HTTP
//! layer forwards the feed as Server-Sent Events.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::attendance::AttendanceRecord;
use crate::directory::Employee;
use crate::messaging::{Message, Suggestion};
use crate::workflow::Task;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// A chain or a single task was created
    TasksCreated { tasks: Vec<Task> },
    TaskUpdated { task: Task },
    TaskDeleted { id: String },
    EmployeeChanged { employee: Employee },
    AttendanceChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        record: Option<AttendanceRecord>,
        #[serde(rename = "employeeId")]
        employee_id: String,
    },
    MessageSent { message: Message },
    SuggestionChanged {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        suggestion: Option<Suggestion>,
    },
    /// Subscriber fell behind and missed events
    Error { message: String },
}

impl ChangeEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ChangeEvent::TasksCreated { .. } => "tasks_created",
            ChangeEvent::TaskUpdated { .. } => "task_updated",
            ChangeEvent::TaskDeleted { .. } => "task_deleted",
            ChangeEvent::EmployeeChanged { .. } => "employee_changed",
            ChangeEvent::AttendanceChanged { .. } => "attendance_changed",
            ChangeEvent::MessageSent { .. } => "message_sent",
            ChangeEvent::SuggestionChanged { .. } => "suggestion_changed",
            ChangeEvent::Error { .. } => "error",
        }
    }
}

/// Cloneable publisher for [`ChangeEvent`]s.
#[derive(Clone)]
pub struct EventHub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        let name = event.event_name();
        match self.tx.send(event) {
            Ok(receivers) => tracing::trace!(event = name, receivers, "Published change"),
            Err(_) => tracing::trace!(event = name, "No subscribers for change"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let hub = EventHub::new(8);
        let mut rx = hub.subscribe();
        hub.publish(ChangeEvent::TaskDeleted { id: "t1".into() });

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.event_name(), "task_deleted");
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "task_deleted");
        assert_eq!(json["id"], "t1");
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let hub = EventHub::new(1);
        hub.publish(ChangeEvent::TaskDeleted { id: "x".into() });
        assert_eq!(hub.subscriber_count(), 0);
    }
}
