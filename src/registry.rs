//! Event range registry.
//!
//! Maps event codes to the interests whose ranges contain them. Writers build a
//! new immutable index and swap it in; readers grab the current index under a
//! short read lock and search it without holding the lock, so a lookup never
//! sees a half-registered interest.

use parking_lot::RwLock;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::debug_if_enabled;
use crate::error::{Result, WinEventError};
use crate::events::{EventCode, EventData, EventRange};
use crate::filters::PredicateNode;

/// Порядковый номер регистрации; определяет порядок вызова обработчиков
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterestId(pub u64);

impl fmt::Display for InterestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Сигнал обработчика диспетчеру
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Signal {
    #[default]
    Continue,
    /// Остановить весь цикл после завершения текущего события
    Stop,
}

/// Пользовательский обработчик события
pub type Callback = Arc<dyn Fn(&EventData) -> anyhow::Result<Signal> + Send + Sync>;

pub type RangeList = SmallVec<[EventRange; 2]>;

/// Подписка до регистрации: диапазоны, фильтр и обработчик
#[derive(Clone)]
pub struct NewInterest {
    pub label: String,
    pub ranges: RangeList,
    pub predicate: Option<PredicateNode>,
    pub callback: Callback,
}

impl NewInterest {
    pub fn new<F>(ranges: impl IntoIterator<Item = EventRange>, callback: F) -> Self
    where
        F: Fn(&EventData) -> anyhow::Result<Signal> + Send + Sync + 'static,
    {
        Self {
            label: String::from("callback"),
            ranges: ranges.into_iter().collect(),
            predicate: None,
            callback: Arc::new(callback),
        }
    }

    pub fn with_predicate(mut self, predicate: PredicateNode) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Зарегистрированная подписка; неизменяема и принадлежит реестру
pub struct Interest {
    id: InterestId,
    label: String,
    ranges: RangeList,
    predicate: Option<PredicateNode>,
    callback: Callback,
}

impl Interest {
    pub fn id(&self) -> InterestId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn ranges(&self) -> &[EventRange] {
        &self.ranges
    }

    pub fn predicate(&self) -> Option<&PredicateNode> {
        self.predicate.as_ref()
    }

    /// Отсутствующий предикат пропускает всё
    pub fn matches(&self, data: &EventData) -> bool {
        self.predicate.as_ref().map_or(true, |p| p.evaluate(data))
    }

    pub fn invoke(&self, data: &EventData) -> anyhow::Result<Signal> {
        (self.callback)(data)
    }
}

impl fmt::Debug for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interest")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("ranges", &self.ranges)
            .field("predicate", &self.predicate)
            .finish()
    }
}

/// Неизменяемый индекс: кусочно-постоянная функция "код -> подписки".
///
/// `starts[i]` открывает отрезок `[starts[i], starts[i + 1])`, которому
/// соответствует `segments[i]` (id по возрастанию, без повторов).
#[derive(Default)]
struct Index {
    interests: BTreeMap<InterestId, Arc<Interest>>,
    starts: Vec<u64>,
    segments: Vec<Vec<InterestId>>,
}

impl Index {
    fn build(interests: BTreeMap<InterestId, Arc<Interest>>) -> Self {
        let mut starts: Vec<u64> = interests
            .values()
            .flat_map(|i| i.ranges.iter())
            .flat_map(|r| [u64::from(r.low().value()), u64::from(r.high().value()) + 1])
            .collect();
        starts.sort_unstable();
        starts.dedup();

        let mut segments = vec![Vec::new(); starts.len()];
        // Идём по id по возрастанию, поэтому каждый отрезок сразу упорядочен
        for interest in interests.values() {
            for range in &interest.ranges {
                let from = starts.partition_point(|&s| s < u64::from(range.low().value()));
                let to = starts.partition_point(|&s| s <= u64::from(range.high().value()));
                for segment in &mut segments[from..to] {
                    if segment.last() != Some(&interest.id) {
                        segment.push(interest.id);
                    }
                }
            }
        }

        Self {
            interests,
            starts,
            segments,
        }
    }

    fn lookup(&self, code: EventCode) -> Vec<Arc<Interest>> {
        let code = u64::from(code.value());
        let after = self.starts.partition_point(|&s| s <= code);
        if after == 0 {
            return Vec::new();
        }

        self.segments[after - 1]
            .iter()
            .filter_map(|id| self.interests.get(id).cloned())
            .collect()
    }
}

/// Реестр подписок по диапазонам кодов событий
pub struct EventRegistry {
    index: RwLock<Arc<Index>>,
    // Сериализует писателей, чтобы две регистрации не потеряли друг друга
    write_lock: parking_lot::Mutex<()>,
    next_id: AtomicU64,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self {
            index: RwLock::new(Arc::new(Index::default())),
            write_lock: parking_lot::Mutex::new(()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Зарегистрировать подписку. Подписка без диапазонов отвергается.
    pub fn register(&self, new: NewInterest) -> Result<InterestId> {
        if new.ranges.is_empty() {
            return WinEventError::registration(format!(
                "подписка '{}' не содержит ни одного диапазона событий",
                new.label
            ));
        }

        if let Some(range) = new.ranges.iter().find(|r| r.low() > r.high()) {
            return WinEventError::registration(format!(
                "подписка '{}': перевёрнутый диапазон {}..{}",
                new.label,
                range.low(),
                range.high()
            ));
        }

        let _writer = self.write_lock.lock();
        let id = self.allocate_id();
        let interest = Arc::new(Interest {
            id,
            label: new.label,
            ranges: new.ranges,
            predicate: new.predicate,
            callback: new.callback,
        });

        debug_if_enabled!(
            "Регистрация подписки #{} '{}' на {:?}",
            id,
            interest.label,
            interest.ranges
        );

        let mut interests = self.snapshot().interests.clone();
        interests.insert(id, interest);
        *self.index.write() = Arc::new(Index::build(interests));

        Ok(id)
    }

    /// Следующий номер регистрации; общий для подписок на события и на простой
    pub(crate) fn allocate_id(&self) -> InterestId {
        InterestId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Удалить подписку; повторный вызов ничего не делает и возвращает `false`
    pub fn unregister(&self, id: InterestId) -> bool {
        let _writer = self.write_lock.lock();
        let current = self.snapshot();
        if !current.interests.contains_key(&id) {
            return false;
        }

        let mut interests = current.interests.clone();
        interests.remove(&id);
        *self.index.write() = Arc::new(Index::build(interests));

        debug_if_enabled!("Подписка #{} удалена", id);
        true
    }

    /// Подписки, чьи диапазоны содержат код, в порядке регистрации
    pub fn lookup(&self, code: EventCode) -> Vec<Arc<Interest>> {
        self.snapshot().lookup(code)
    }

    pub fn get(&self, id: InterestId) -> Option<Arc<Interest>> {
        self.snapshot().interests.get(&id).cloned()
    }

    pub fn contains(&self, id: InterestId) -> bool {
        self.snapshot().interests.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.snapshot().interests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Удалить все подписки
    pub fn clear(&self) {
        let _writer = self.write_lock.lock();
        *self.index.write() = Arc::new(Index::default());
    }

    fn snapshot(&self) -> Arc<Index> {
        Arc::clone(&self.index.read())
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(low: u32, high: u32) -> EventRange {
        EventRange::new(EventCode(low), EventCode(high)).unwrap()
    }

    fn interest(ranges: Vec<EventRange>) -> NewInterest {
        NewInterest::new(ranges, |_| Ok(Signal::Continue))
    }

    fn ids(found: &[Arc<Interest>]) -> Vec<InterestId> {
        found.iter().map(|i| i.id()).collect()
    }

    #[test]
    fn test_empty_ranges_rejected() {
        let registry = EventRegistry::new();
        let err = registry.register(interest(vec![])).unwrap_err();
        assert!(matches!(err, WinEventError::Registration(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_boundaries() {
        let registry = EventRegistry::new();
        let id = registry.register(interest(vec![range(10, 20)])).unwrap();

        assert_eq!(ids(&registry.lookup(EventCode(10))), vec![id]);
        assert_eq!(ids(&registry.lookup(EventCode(20))), vec![id]);
        assert!(registry.lookup(EventCode(9)).is_empty());
        assert!(registry.lookup(EventCode(21)).is_empty());
    }

    #[test]
    fn test_disjoint_ranges_match_exactly_one() {
        let registry = EventRegistry::new();
        let a = registry.register(interest(vec![range(1, 5)])).unwrap();
        let b = registry.register(interest(vec![range(6, 6)])).unwrap();
        let c = registry.register(interest(vec![range(100, 200)])).unwrap();

        for code in 0..300 {
            let found = ids(&registry.lookup(EventCode(code)));
            let expected = match code {
                1..=5 => vec![a],
                6 => vec![b],
                100..=200 => vec![c],
                _ => vec![],
            };
            assert_eq!(found, expected, "code {}", code);
        }
    }

    #[test]
    fn test_overlapping_ranges_in_registration_order() {
        let registry = EventRegistry::new();
        let a = registry.register(interest(vec![range(10, 30)])).unwrap();
        let b = registry.register(interest(vec![range(20, 40)])).unwrap();

        assert_eq!(ids(&registry.lookup(EventCode(25))), vec![a, b]);
        assert_eq!(ids(&registry.lookup(EventCode(15))), vec![a]);
        assert_eq!(ids(&registry.lookup(EventCode(35))), vec![b]);
        // Повторный поиск даёт тот же порядок
        assert_eq!(ids(&registry.lookup(EventCode(25))), vec![a, b]);
    }

    #[test]
    fn test_order_is_registration_order_not_range_order() {
        let registry = EventRegistry::new();
        let wide = registry.register(interest(vec![EventRange::all()])).unwrap();
        let narrow = registry.register(interest(vec![range(5, 5)])).unwrap();
        let wide_again = registry.register(interest(vec![range(1, 1000)])).unwrap();

        assert_eq!(ids(&registry.lookup(EventCode(5))), vec![wide, narrow, wide_again]);
        assert_eq!(ids(&registry.lookup(EventCode::MAX)), vec![wide]);
    }

    #[test]
    fn test_self_overlapping_interest_reported_once() {
        let registry = EventRegistry::new();
        let id = registry.register(interest(vec![range(1, 10), range(5, 15)])).unwrap();
        assert_eq!(ids(&registry.lookup(EventCode(7))), vec![id]);
        assert_eq!(ids(&registry.lookup(EventCode(12))), vec![id]);
    }

    #[test]
    fn test_register_unregister_round_trip() {
        let registry = EventRegistry::new();
        let keep = registry.register(interest(vec![range(10, 20)])).unwrap();
        let sample_codes: Vec<u32> = vec![0, 5, 9, 10, 15, 20, 21, 25, 30, 31, 1000];
        let before: Vec<Vec<InterestId>> = sample_codes.iter().map(|&c| ids(&registry.lookup(EventCode(c)))).collect();

        let temp = registry.register(interest(vec![range(15, 30), range(5, 5)])).unwrap();
        assert!(registry.contains(temp));
        assert!(registry.unregister(temp));
        assert!(!registry.unregister(temp));

        let after: Vec<Vec<InterestId>> = sample_codes.iter().map(|&c| ids(&registry.lookup(EventCode(c)))).collect();
        assert_eq!(before, after);
        assert!(registry.contains(keep));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ids_increase() {
        let registry = EventRegistry::new();
        let a = registry.register(interest(vec![range(1, 1)])).unwrap();
        registry.unregister(a);
        let b = registry.register(interest(vec![range(1, 1)])).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_clear() {
        let registry = EventRegistry::new();
        registry.register(interest(vec![range(1, 1)])).unwrap();
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.lookup(EventCode(1)).is_empty());
    }

    #[test]
    fn test_concurrent_register_and_lookup() {
        let registry = Arc::new(EventRegistry::new());
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        registry
                            .register(interest(vec![range(1, 10), range(100, 200)]))
                            .unwrap();
                    }
                })
            })
            .collect();

        let reader = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for _ in 0..500 {
                    // Подписка видна целиком: либо во всех своих диапазонах, либо нигде
                    let low = ids(&registry.lookup(EventCode(5)));
                    let high = ids(&registry.lookup(EventCode(150)));
                    assert!(low.windows(2).all(|w| w[0] < w[1]));
                    for id in &low {
                        assert!(high.contains(id));
                    }
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(registry.len(), 200);
        assert_eq!(registry.lookup(EventCode(5)).len(), 200);
        assert_eq!(registry.lookup(EventCode(150)).len(), 200);
    }
}
