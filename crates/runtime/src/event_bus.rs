use std::sync::Arc;

use parking_lot::Mutex;
use scene::EntityId;

/// Outcome of a completed core operation, for the UI layer to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Loaded { entities: usize, replayed: usize },
    LoadSuperseded,
    Created(EntityId),
    Updated(EntityId),
    Deleted(EntityId),
    DrawCancelled,
    Failed { operation: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub seq: u64,
    pub kind: EventKind,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EventBus {
    next_seq: u64,
    events: Vec<Event>,
}

/// Bus handle shared between the controller and the draw session.
pub type SharedEvents = Arc<Mutex<EventBus>>;

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedEvents {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn emit(&mut self, kind: EventKind, message: impl Into<String>) {
        self.events.push(Event {
            seq: self.next_seq,
            kind,
            message: message.into(),
        });
        self.next_seq += 1;
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_events_in_emission_order() {
        let mut bus = EventBus::new();
        bus.emit(EventKind::Created(EntityId(4)), "saved");
        bus.emit(EventKind::DrawCancelled, "cancelled");
        let seqs: Vec<u64> = bus.events().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(bus.events()[0].kind, EventKind::Created(EntityId(4)));
    }

    #[test]
    fn drain_clears_events_but_keeps_numbering() {
        let mut bus = EventBus::new();
        bus.emit(EventKind::Deleted(EntityId(1)), "m");
        assert_eq!(bus.drain().len(), 1);
        assert!(bus.events().is_empty());
        bus.emit(EventKind::Deleted(EntityId(2)), "m");
        assert_eq!(bus.events()[0].seq, 1);
    }
}
