use tokio::time::{interval, Duration, Interval, MissedTickBehavior};
use tracing::info;

use super::r#trait::EventSource;
use crate::debug_if_enabled;
use crate::events::{EventCode, RawEvent, WindowHandle};

/// Эмуляция хука: периодически выдаёт события, перебирая окна и коды по кругу
pub struct DryRunEventSource {
    handles: Vec<WindowHandle>,
    codes: Vec<EventCode>,
    ticker: Interval,
    step: usize,
}

impl DryRunEventSource {
    pub fn new(handles: Vec<WindowHandle>, codes: Vec<EventCode>, period: Duration) -> Self {
        info!(
            "Dry-run режим - источник событий эмулирует {} окон и {} типов событий",
            handles.len(),
            codes.len()
        );

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            handles,
            codes,
            ticker,
            step: 0,
        }
    }
}

#[async_trait::async_trait]
impl EventSource for DryRunEventSource {
    async fn next_event(&mut self) -> Option<RawEvent> {
        if self.codes.is_empty() {
            return None;
        }

        self.ticker.tick().await;

        let code = self.codes[self.step % self.codes.len()];
        let handle = if self.handles.is_empty() {
            None
        } else {
            // Окна сдвигаются на каждом полном круге кодов, чтобы перебрать все пары
            Some(self.handles[(self.step / self.codes.len()) % self.handles.len()])
        };
        self.step = self.step.wrapping_add(1);

        let event = RawEvent::new(code, handle).with_ids(0, 0, std::process::id());
        debug_if_enabled!("Dry-run: эмулируем событие {}", event);
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cycles_codes_then_windows() {
        let mut source = DryRunEventSource::new(
            vec![WindowHandle(1), WindowHandle(2)],
            vec![EventCode::OBJECT_CREATE, EventCode::OBJECT_DESTROY],
            Duration::from_millis(1),
        );

        let mut seen = Vec::new();
        for _ in 0..4 {
            let event = source.next_event().await.unwrap();
            seen.push((event.code, event.window_handle));
        }

        assert_eq!(
            seen,
            vec![
                (EventCode::OBJECT_CREATE, Some(WindowHandle(1))),
                (EventCode::OBJECT_DESTROY, Some(WindowHandle(1))),
                (EventCode::OBJECT_CREATE, Some(WindowHandle(2))),
                (EventCode::OBJECT_DESTROY, Some(WindowHandle(2))),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_codes_means_closed() {
        let mut source = DryRunEventSource::new(vec![WindowHandle(1)], vec![], Duration::from_millis(1));
        assert!(source.next_event().await.is_none());
    }
}
