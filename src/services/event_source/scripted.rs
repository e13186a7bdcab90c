use std::collections::VecDeque;
use std::time::Duration;

use super::r#trait::EventSource;
use crate::events::RawEvent;

/// Конечная заранее заданная последовательность событий
pub struct ScriptedEventSource {
    events: VecDeque<RawEvent>,
    delay: Option<Duration>,
}

impl ScriptedEventSource {
    pub fn new(events: impl IntoIterator<Item = RawEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
            delay: None,
        }
    }

    /// Пауза перед каждым событием
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

#[async_trait::async_trait]
impl EventSource for ScriptedEventSource {
    async fn next_event(&mut self) -> Option<RawEvent> {
        if self.events.is_empty() {
            return None;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.events.pop_front()
    }
}
