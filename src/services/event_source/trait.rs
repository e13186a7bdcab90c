use crate::events::RawEvent;

/// Источник сырых событий.
///
/// Ленивый и фактически бесконечный поток; `None` означает, что источник
/// закрыт и больше событий не будет. Перезапуск внутри одного диспетчера не
/// поддерживается.
#[async_trait::async_trait]
pub trait EventSource: Send {
    /// Дождаться следующего события. Будущее может быть брошено до готовности
    /// (остановка, срок, тик простоя), поэтому событие не должно теряться при отмене.
    async fn next_event(&mut self) -> Option<RawEvent>;
}
