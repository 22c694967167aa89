use crate::event::GeneratedEvent;
use std::collections::VecDeque;

/// Bounded, time-ordered output buffer. Newest events are appended last and the
/// oldest evicted once `capacity` is exceeded.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBuffer {
    capacity: usize,
    display_limit: usize,
    events: VecDeque<GeneratedEvent>,
}

impl EventBuffer {
    pub fn new(capacity: usize, display_limit: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            display_limit: display_limit.clamp(1, capacity),
            events: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append `event`, evicting the oldest entries beyond capacity.
    pub fn push(&mut self, event: GeneratedEvent) {
        self.events.push_back(event);
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
    }

    /// Remove the event with `id`. Returns whether one was removed.
    pub fn dismiss(&mut self, id: &str) -> bool {
        let before = self.events.len();
        self.events.retain(|event| event.id != id);
        self.events.len() != before
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// All buffered events, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &GeneratedEvent> {
        self.events.iter()
    }

    /// The newest `display_limit` events, oldest first.
    pub fn visible(&self) -> impl Iterator<Item = &GeneratedEvent> {
        self.events
            .iter()
            .skip(self.events.len().saturating_sub(self.display_limit))
    }

    pub fn snapshot(&self) -> Vec<GeneratedEvent> {
        self.events.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        random::SimRng,
        template::activity,
    };
    use chrono::{TimeZone, Utc};

    fn event(index: i64, rng: &mut SimRng) -> GeneratedEvent {
        let timestamp = Utc.timestamp_millis_opt(1_700_000_000_000 + index).unwrap();
        GeneratedEvent::new(
            &activity::TEMPLATES[0],
            format!("event {index}"),
            "BTC/USDT".into(),
            timestamp,
            rng,
        )
    }

    #[test]
    fn test_buffer_evicts_oldest_first() {
        let mut rng = SimRng::seeded(41);
        let mut buffer = EventBuffer::new(50, 30);
        for index in 0..55 {
            buffer.push(event(index, &mut rng));
        }

        assert_eq!(buffer.len(), 50);
        assert_eq!(buffer.iter().next().unwrap().body, "event 5");
        assert_eq!(buffer.iter().last().unwrap().body, "event 54");

        let visible: Vec<_> = buffer.visible().map(|event| event.body.clone()).collect();
        assert_eq!(visible.len(), 30);
        assert_eq!(visible[0], "event 25");
    }

    #[test]
    fn test_dismiss_and_clear() {
        let mut rng = SimRng::seeded(42);
        let mut buffer = EventBuffer::new(3, 3);
        for index in 0..3 {
            buffer.push(event(index, &mut rng));
        }

        let id = buffer.iter().nth(1).unwrap().id.clone();
        assert!(buffer.dismiss(&id));
        assert!(!buffer.dismiss(&id));
        assert_eq!(buffer.len(), 2);

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
