use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::shortcut::Shortcut;
use crate::error::{Result, WinEventError};
use crate::events::{EventData, EventRange};
use crate::filters::{all, PredicateNode};
use crate::idle::NewIdleWatch;
use crate::registry::{Callback, InterestId, NewInterest, RangeList, Signal};
use crate::services::Dispatcher;

/// Построитель подписки: сначала события, затем фильтры, затем обработчик.
///
/// Каждый набор диапазонов (`listen`/`or_events`) становится отдельной
/// подпиской с общими фильтром и обработчиком: "любое из этих событий, и
/// при этом все фильтры".
#[must_use = "подписка не зарегистрирована, пока не вызван call()"]
pub struct Listen<'d> {
    dispatcher: &'d Dispatcher,
    range_sets: Vec<RangeList>,
    filters: Vec<PredicateNode>,
    label: Option<String>,
}

impl<'d> Listen<'d> {
    fn new(dispatcher: &'d Dispatcher, ranges: RangeList) -> Self {
        Self {
            dispatcher,
            range_sets: vec![ranges],
            filters: Vec::new(),
            label: None,
        }
    }

    /// Ещё один набор событий для того же обработчика
    pub fn or_events(mut self, ranges: impl IntoIterator<Item = EventRange>) -> Self {
        self.range_sets.push(ranges.into_iter().collect());
        self
    }

    pub fn or_on(self, shortcut: Shortcut) -> Self {
        self.or_events([shortcut.range()])
    }

    /// Сузить подписку; несколько фильтров объединяются через `all`
    pub fn filter(mut self, node: PredicateNode) -> Self {
        self.filters.push(node);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Текущий предикат подписки, если фильтры заданы
    pub fn predicate(&self) -> Option<PredicateNode> {
        match self.filters.as_slice() {
            [] => None,
            [single] => Some(single.clone()),
            many => Some(all(many.iter().cloned())),
        }
    }

    /// Зарегистрировать обработчик. При ошибке ни одна из подписок не остаётся в реестре.
    pub fn call<F>(self, callback: F) -> Result<Subscription>
    where
        F: Fn(&EventData) -> anyhow::Result<Signal> + Send + Sync + 'static,
    {
        self.register(Arc::new(callback))
    }

    /// Обработчик без сигнала остановки
    pub fn each<F>(self, callback: F) -> Result<Subscription>
    where
        F: Fn(&EventData) + Send + Sync + 'static,
    {
        self.call(move |data| {
            callback(data);
            Ok(Signal::Continue)
        })
    }

    fn register(self, callback: Callback) -> Result<Subscription> {
        let label = self.label.clone().unwrap_or_else(|| String::from("listen"));

        if let Some(position) = self.range_sets.iter().position(|set| set.is_empty()) {
            return WinEventError::registration(format!(
                "подписка '{}': набор событий #{} пуст",
                label,
                position + 1
            ));
        }

        let predicate = self.predicate();
        let mut ids = SmallVec::new();

        for ranges in &self.range_sets {
            let interest = NewInterest {
                label: label.clone(),
                ranges: ranges.clone(),
                predicate: predicate.clone(),
                callback: Arc::clone(&callback),
            };

            match self.dispatcher.register(interest) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    warn!("Откат подписки '{}': {}", label, e);
                    for id in &ids {
                        self.dispatcher.unregister(*id);
                    }
                    return Err(e);
                }
            }
        }

        info!(
            "Подписка '{}': {} набор(ов) событий, фильтр: {}",
            label,
            ids.len(),
            predicate.as_ref().map_or_else(|| String::from("нет"), |p| p.to_string())
        );

        Ok(Subscription { ids })
    }
}

/// Построитель подписки на простой системы
#[must_use = "подписка не зарегистрирована, пока не вызван call()"]
pub struct IdleListen<'d> {
    dispatcher: &'d Dispatcher,
    threshold: Duration,
    call_limit: u32,
    filters: Vec<PredicateNode>,
    label: Option<String>,
}

impl<'d> IdleListen<'d> {
    /// Сколько раз вызывать обработчик за один период простоя (по умолчанию 1)
    pub fn call_limit(mut self, call_limit: u32) -> Self {
        self.call_limit = call_limit;
        self
    }

    pub fn filter(mut self, node: PredicateNode) -> Self {
        self.filters.push(node);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn call<F>(self, callback: F) -> Result<Subscription>
    where
        F: Fn(&EventData) -> anyhow::Result<Signal> + Send + Sync + 'static,
    {
        let label = self.label.unwrap_or_else(|| String::from("idle"));
        let mut watch = NewIdleWatch::new(self.threshold, callback)
            .with_call_limit(self.call_limit)
            .with_label(label.as_str());
        match self.filters.len() {
            0 => {}
            1 => watch = watch.with_predicate(self.filters[0].clone()),
            _ => watch = watch.with_predicate(all(self.filters)),
        }

        let id = self.dispatcher.register_idle(watch)?;
        info!(
            "Подписка на простой '{}': порог {:?}, лимит {}",
            label, self.threshold, self.call_limit
        );

        let mut ids = SmallVec::new();
        ids.push(id);
        Ok(Subscription { ids })
    }

    pub fn each<F>(self, callback: F) -> Result<Subscription>
    where
        F: Fn(&EventData) + Send + Sync + 'static,
    {
        self.call(move |data| {
            callback(data);
            Ok(Signal::Continue)
        })
    }
}

/// Результат `call`: id всех созданных подписок
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    ids: SmallVec<[InterestId; 1]>,
}

impl Subscription {
    pub fn ids(&self) -> &[InterestId] {
        &self.ids
    }

    /// Отменить все подписки; возвращает число действительно удалённых
    pub fn cancel(&self, dispatcher: &Dispatcher) -> usize {
        self.ids.iter().filter(|id| dispatcher.unregister(**id)).count()
    }
}

impl Dispatcher {
    /// Начать объявление подписки на явные диапазоны событий
    pub fn listen(&self, ranges: impl IntoIterator<Item = EventRange>) -> Listen<'_> {
        Listen::new(self, ranges.into_iter().collect())
    }

    pub fn on(&self, shortcut: Shortcut) -> Listen<'_> {
        self.listen([shortcut.range()])
    }

    pub fn on_create(&self) -> Listen<'_> {
        self.on(Shortcut::Create)
    }

    pub fn on_destroy(&self) -> Listen<'_> {
        self.on(Shortcut::Destroy)
    }

    pub fn on_existence_change(&self) -> Listen<'_> {
        self.on(Shortcut::ExistenceChange)
    }

    pub fn on_foreground(&self) -> Listen<'_> {
        self.on(Shortcut::Foreground)
    }

    pub fn on_location_change(&self) -> Listen<'_> {
        self.on(Shortcut::LocationChange)
    }

    pub fn on_maximize(&self) -> Listen<'_> {
        self.on(Shortcut::Maximize)
    }

    pub fn on_minimize(&self) -> Listen<'_> {
        self.on(Shortcut::Minimize)
    }

    pub fn on_restore(&self) -> Listen<'_> {
        self.on(Shortcut::Restore)
    }

    pub fn on_any_event(&self) -> Listen<'_> {
        self.on(Shortcut::AnyEvent)
    }

    /// Простой системы не короче `threshold`; проверяется по таймеру, а не по событиям
    pub fn on_idle(&self, threshold: Duration) -> IdleListen<'_> {
        IdleListen {
            dispatcher: self,
            threshold,
            call_limit: 1,
            filters: Vec::new(),
            label: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventCode, Point, RawEvent, WindowHandle, WindowSnapshot};
    use crate::filters::{constant, is_maximized, size_less_than};
    use crate::services::{DispatcherOptions, MemoryWindows, ScriptedEventSource};
    use parking_lot::Mutex;

    fn dispatcher(events: Vec<RawEvent>) -> Dispatcher {
        let windows = Arc::new(MemoryWindows::new());
        windows.insert(
            WindowSnapshot::new(WindowHandle(1), "Editor")
                .with_geometry(Point::new(0, 0), 150, 150)
                .maximized(true),
        );
        Dispatcher::new(Box::new(ScriptedEventSource::new(events)), windows, DispatcherOptions::default())
    }

    fn codes_of(dispatcher: &Dispatcher, sub: &Subscription) -> Vec<Vec<EventRange>> {
        sub.ids()
            .iter()
            .map(|id| dispatcher.registry().get(*id).unwrap().ranges().to_vec())
            .collect()
    }

    #[test]
    fn test_shortcut_forwards_to_single_range() {
        let d = dispatcher(vec![]);
        let sub = d.on_maximize().each(|_| {}).unwrap();
        assert_eq!(codes_of(&d, &sub), vec![vec![EventRange::single(EventCode::OBJECT_LOCATIONCHANGE)]]);
    }

    #[test]
    fn test_multiple_event_sets_share_predicate_and_callback() {
        let d = dispatcher(vec![]);
        let sub = d
            .on_create()
            .or_on(Shortcut::Foreground)
            .filter(is_maximized())
            .filter(size_less_than(200, 200))
            .label("pair")
            .each(|_| {})
            .unwrap();

        assert_eq!(sub.ids().len(), 2);
        for id in sub.ids() {
            let interest = d.registry().get(*id).unwrap();
            assert_eq!(interest.label(), "pair");
            assert_eq!(
                interest.predicate().map(|p| p.to_string()).as_deref(),
                Some("all(is_maximized, size_less_than(200x200))")
            );
        }
    }

    #[test]
    fn test_empty_range_set_rejected_without_leftovers() {
        let d = dispatcher(vec![]);
        let err = d.on_create().or_events(Vec::new()).each(|_| {}).unwrap_err();
        assert!(matches!(err, WinEventError::Registration(_)));
        assert!(d.registry().is_empty());

        let err = d.listen(Vec::new()).filter(constant(true)).each(|_| {}).unwrap_err();
        assert!(matches!(err, WinEventError::Registration(_)));
        assert!(d.registry().is_empty());
    }

    #[test]
    fn test_cancel_removes_all_ids() {
        let d = dispatcher(vec![]);
        let sub = d.on_create().or_on(Shortcut::Destroy).each(|_| {}).unwrap();
        assert_eq!(d.registry().len(), 2);
        assert_eq!(sub.cancel(&d), 2);
        assert_eq!(sub.cancel(&d), 0);
        assert!(d.registry().is_empty());
    }

    #[tokio::test]
    async fn test_filtered_listen_end_to_end() {
        let events = vec![
            RawEvent::for_window(EventCode::OBJECT_LOCATIONCHANGE, WindowHandle(1)),
            RawEvent::for_window(EventCode::OBJECT_LOCATIONCHANGE, WindowHandle(2)),
            RawEvent::for_window(EventCode::OBJECT_CREATE, WindowHandle(1)),
        ];
        let d = dispatcher(events);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&seen);
        d.on_maximize()
            .filter(is_maximized())
            .each(move |data| log.lock().push(data.code()))
            .unwrap();

        d.run(None).await.unwrap();
        // Окно 2 неизвестно, CREATE не входит в подписку
        assert_eq!(*seen.lock(), vec![EventCode::OBJECT_LOCATIONCHANGE]);
    }

    #[test]
    fn test_idle_listen_registers_and_cancels() {
        let d = dispatcher(vec![]);
        let sub = d
            .on_idle(Duration::from_secs(60))
            .call_limit(3)
            .label("away")
            .each(|_| {})
            .unwrap();

        let watches = d.idle_watches().snapshot();
        assert_eq!(watches.len(), 1);
        assert_eq!(watches[0].id(), sub.ids()[0]);
        assert_eq!(watches[0].label(), "away");
        assert_eq!(watches[0].call_limit(), 3);
        assert!(d.registry().is_empty());

        assert_eq!(sub.cancel(&d), 1);
        assert!(d.idle_watches().is_empty());
    }

    #[test]
    fn test_idle_listen_zero_limit_rejected() {
        let d = dispatcher(vec![]);
        let err = d.on_idle(Duration::from_secs(1)).call_limit(0).each(|_| {}).unwrap_err();
        assert!(matches!(err, WinEventError::Registration(_)));
        assert!(d.idle_watches().is_empty());
    }
}
