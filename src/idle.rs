//! Idle watches.
//!
//! An idle watch fires while the user has been inactive for at least its
//! threshold. It is checked on the dispatcher's poll tick, not on window
//! events, and fires at most `call_limit` times per idle period: once the idle
//! time drops below the threshold again, the counter starts over.

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::debug_if_enabled;
use crate::error::{Result, WinEventError};
use crate::events::EventData;
use crate::filters::PredicateNode;
use crate::registry::{Callback, InterestId, Signal};

/// Подписка на простой до регистрации
#[derive(Clone)]
pub struct NewIdleWatch {
    pub label: String,
    pub threshold: Duration,
    pub call_limit: u32,
    pub predicate: Option<PredicateNode>,
    pub callback: Callback,
}

impl NewIdleWatch {
    /// По умолчанию один вызов за период простоя
    pub fn new<F>(threshold: Duration, callback: F) -> Self
    where
        F: Fn(&EventData) -> anyhow::Result<Signal> + Send + Sync + 'static,
    {
        Self {
            label: String::from("idle"),
            threshold,
            call_limit: 1,
            predicate: None,
            callback: Arc::new(callback),
        }
    }

    pub fn with_call_limit(mut self, call_limit: u32) -> Self {
        self.call_limit = call_limit;
        self
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

/// Зарегистрированная подписка на простой
pub struct IdleWatch {
    id: InterestId,
    label: String,
    threshold: Duration,
    call_limit: u32,
    calls: AtomicU32,
    predicate: Option<PredicateNode>,
    callback: Callback,
}

impl IdleWatch {
    pub fn id(&self) -> InterestId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn call_limit(&self) -> u32 {
        self.call_limit
    }

    /// Вызовы в текущем периоде простоя
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Порог достигнут? Ниже порога счётчик вызовов обнуляется.
    pub fn observe(&self, idle: Duration) -> bool {
        if idle < self.threshold {
            self.calls.store(0, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Занять один вызов из лимита; `false`, если лимит периода исчерпан
    pub fn try_claim(&self) -> bool {
        self.calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |calls| {
                (calls < self.call_limit).then_some(calls + 1)
            })
            .is_ok()
    }

    pub fn matches(&self, data: &EventData) -> bool {
        self.predicate.as_ref().map_or(true, |p| p.evaluate(data))
    }

    pub fn invoke(&self, data: &EventData) -> anyhow::Result<Signal> {
        (self.callback)(data)
    }
}

impl fmt::Debug for IdleWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdleWatch")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("threshold", &self.threshold)
            .field("call_limit", &self.call_limit)
            .field("calls", &self.calls())
            .finish()
    }
}

/// Подписки на простой в порядке регистрации; читатели получают снимок
#[derive(Default)]
pub struct IdleWatches {
    watches: RwLock<Arc<Vec<Arc<IdleWatch>>>>,
}

impl IdleWatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Нулевой лимит вызовов отвергается: такая подписка никогда не сработает
    pub fn insert(&self, id: InterestId, new: NewIdleWatch) -> Result<()> {
        if new.call_limit == 0 {
            return WinEventError::registration(format!(
                "подписка на простой '{}': лимит вызовов должен быть больше 0",
                new.label
            ));
        }

        debug_if_enabled!(
            "Регистрация подписки на простой #{} '{}' (порог {:?}, лимит {})",
            id,
            new.label,
            new.threshold,
            new.call_limit
        );

        let watch = Arc::new(IdleWatch {
            id,
            label: new.label,
            threshold: new.threshold,
            call_limit: new.call_limit,
            calls: AtomicU32::new(0),
            predicate: new.predicate,
            callback: new.callback,
        });

        let mut guard = self.watches.write();
        let mut watches = guard.as_ref().clone();
        watches.push(watch);
        *guard = Arc::new(watches);
        Ok(())
    }

    pub fn remove(&self, id: InterestId) -> bool {
        let mut guard = self.watches.write();
        if !guard.iter().any(|w| w.id == id) {
            return false;
        }
        let watches: Vec<_> = guard.iter().filter(|w| w.id != id).cloned().collect();
        *guard = Arc::new(watches);
        true
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<IdleWatch>>> {
        Arc::clone(&self.watches.read())
    }

    pub fn len(&self) -> usize {
        self.watches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
