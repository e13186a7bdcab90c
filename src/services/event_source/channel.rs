use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use super::r#trait::EventSource;
use crate::events::RawEvent;

/// Источник, в который внешний хук проталкивает события через `EventFeed`
pub struct ChannelEventSource {
    rx: mpsc::Receiver<RawEvent>,
}

/// Отправляющая сторона канала; клонируется и передаётся в поток хука
#[derive(Clone)]
pub struct EventFeed {
    tx: mpsc::Sender<RawEvent>,
    dropped: Arc<AtomicU64>,
}

impl ChannelEventSource {
    /// Канал с ограниченной ёмкостью
    pub fn new(capacity: usize) -> (Self, EventFeed) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let feed = EventFeed {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (Self { rx }, feed)
    }
}

#[async_trait::async_trait]
impl EventSource for ChannelEventSource {
    async fn next_event(&mut self) -> Option<RawEvent> {
        self.rx.recv().await
    }
}

impl EventFeed {
    /// Неблокирующая отправка: при переполнении или закрытом канале событие
    /// отбрасывается и учитывается в `dropped()`
    pub fn push(&self, event: RawEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) | Err(TrySendError::Closed(event)) => {
                debug!("Событие {} отброшено: канал переполнен или закрыт", event);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Отправка с ожиданием свободного места; `false`, если источник закрыт
    pub async fn send(&self, event: RawEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventCode;

    #[tokio::test]
    async fn test_push_and_receive_in_order() {
        let (mut source, feed) = ChannelEventSource::new(8);
        assert!(feed.push(RawEvent::windowless(EventCode::OBJECT_CREATE)));
        assert!(feed.send(RawEvent::windowless(EventCode::OBJECT_DESTROY)).await);

        assert_eq!(source.next_event().await.map(|e| e.code), Some(EventCode::OBJECT_CREATE));
        assert_eq!(source.next_event().await.map(|e| e.code), Some(EventCode::OBJECT_DESTROY));
    }

    #[tokio::test]
    async fn test_full_channel_drops() {
        let (_source, feed) = ChannelEventSource::new(1);
        assert!(feed.push(RawEvent::windowless(EventCode::OBJECT_CREATE)));
        assert!(!feed.push(RawEvent::windowless(EventCode::OBJECT_CREATE)));
        assert_eq!(feed.dropped(), 1);
    }

    #[tokio::test]
    async fn test_source_ends_when_feeds_dropped() {
        let (mut source, feed) = ChannelEventSource::new(4);
        drop(feed);
        assert!(source.next_event().await.is_none());
    }
}
