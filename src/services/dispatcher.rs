use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, sleep_until, Duration, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use super::event_source::EventSource;
use super::window_service::WindowAttributes;
use crate::config::Config;
use crate::debug_if_enabled;
use crate::error::{Result, WinEventError};
use crate::events::{EventCode, EventData, RawEvent};
use crate::filters::FilterFactory;
use crate::idle::{IdleWatches, NewIdleWatch};
use crate::registry::{EventRegistry, InterestId, NewInterest, Signal};
use crate::trace_if_enabled;
use crate::winevent_error;

/// Получатель ошибок пользовательских обработчиков
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: WinEventError);
}

impl<F> ErrorSink for F
where
    F: Fn(WinEventError) + Send + Sync,
{
    fn report(&self, error: WinEventError) {
        self(error)
    }
}

/// Поведение по умолчанию: записать в лог и продолжить
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, error: WinEventError) {
        error!("{}", error);
    }
}

/// Настройки диспетчера
#[derive(Clone)]
pub struct DispatcherOptions {
    pub case_sensitive_titles: bool,
    /// Период опроса времени простоя для подписок на простой
    pub idle_poll_interval: Duration,
    pub error_sink: Arc<dyn ErrorSink>,
}

impl DispatcherOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            case_sensitive_titles: config.dispatch.case_sensitive_titles,
            idle_poll_interval: config.idle_poll_interval(),
            ..Self::default()
        }
    }

    pub fn with_error_sink(mut self, sink: impl ErrorSink + 'static) -> Self {
        self.error_sink = Arc::new(sink);
        self
    }
}

impl Default for DispatcherOptions {
    fn default() -> Self {
        Self {
            case_sensitive_titles: true,
            idle_poll_interval: Duration::from_millis(75),
            error_sink: Arc::new(LogErrorSink),
        }
    }
}

/// Состояние цикла диспетчера
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Running,
    Stopped,
}

/// Причина завершения цикла
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Истекло заданное время работы
    Elapsed,
    /// Внешний вызов `stop()`
    StopRequested,
    /// Обработчик вернул `Signal::Stop`
    Signaled(InterestId),
    /// Источник событий закрыт
    SourceExhausted,
}

/// Итог одного запуска `run`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub reason: StopReason,
    pub events_received: u64,
    pub events_matched: u64,
    pub callbacks_invoked: u64,
    pub callback_failures: u64,
    pub elapsed: Duration,
}

impl RunReport {
    fn new() -> Self {
        Self {
            reason: StopReason::SourceExhausted,
            events_received: 0,
            events_matched: 0,
            callbacks_invoked: 0,
            callback_failures: 0,
            elapsed: Duration::ZERO,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: событий {}, совпало {}, вызовов {}, ошибок {} за {:.2?}",
            self.reason,
            self.events_received,
            self.events_matched,
            self.callbacks_invoked,
            self.callback_failures,
            self.elapsed
        )
    }
}

enum Wake {
    Stop,
    Elapsed,
    IdleTick,
    Event(Option<RawEvent>),
}

/// Диспетчер: превращает поток сырых событий в вызовы отфильтрованных обработчиков.
///
/// События обрабатываются строго по одному; обработчики одного события
/// вызываются в порядке регистрации. Регистрация и `stop()` безопасны из
/// других потоков во время работы цикла.
pub struct Dispatcher {
    registry: EventRegistry,
    idle: IdleWatches,
    windows: Arc<dyn WindowAttributes>,
    source: Mutex<Option<Box<dyn EventSource>>>,
    state: Mutex<DispatcherState>,
    stop_tx: watch::Sender<bool>,
    options: DispatcherOptions,
}

impl Dispatcher {
    pub fn new(
        source: Box<dyn EventSource>,
        windows: Arc<dyn WindowAttributes>,
        options: DispatcherOptions,
    ) -> Self {
        info!(
            "Инициализация Dispatcher (case_sensitive_titles: {})",
            options.case_sensitive_titles
        );

        let (stop_tx, _) = watch::channel(false);
        Self {
            registry: EventRegistry::new(),
            idle: IdleWatches::new(),
            windows,
            source: Mutex::new(Some(source)),
            state: Mutex::new(DispatcherState::Idle),
            stop_tx,
            options,
        }
    }

    /// Зарегистрировать подписку напрямую, минуя построитель
    pub fn register(&self, interest: NewInterest) -> Result<InterestId> {
        self.registry.register(interest)
    }

    /// Зарегистрировать подписку на простой. Номер берётся из общей
    /// последовательности с подписками на события.
    pub fn register_idle(&self, watch: NewIdleWatch) -> Result<InterestId> {
        let id = self.registry.allocate_id();
        self.idle.insert(id, watch)?;
        Ok(id)
    }

    /// Удалить подписку любого вида
    pub fn unregister(&self, id: InterestId) -> bool {
        self.registry.unregister(id) || self.idle.remove(id)
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    pub fn idle_watches(&self) -> &IdleWatches {
        &self.idle
    }

    /// Фильтры по заголовку с настройкой регистра этого диспетчера
    pub fn filters(&self) -> FilterFactory {
        FilterFactory::new(self.options.case_sensitive_titles)
    }

    pub fn state(&self) -> DispatcherState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == DispatcherState::Running
    }

    /// Кооперативная остановка: цикл завершится после текущего события.
    /// Возвращает `false`, если цикл не запущен.
    pub fn stop(&self) -> bool {
        let state = self.state.lock();
        if *state != DispatcherState::Running {
            return false;
        }
        info!("Запрошена остановка Dispatcher");
        self.stop_tx.send_replace(true);
        true
    }

    /// Запустить цикл обработки. Без `duration` работает до `stop()`, сигнала
    /// обработчика или закрытия источника.
    pub async fn run(&self, duration: Option<Duration>) -> Result<RunReport> {
        let mut guard = self.begin_run()?;
        info!("Dispatcher запущен (длительность: {:?}, подписок: {})", duration, self.registry.len());

        let started = Instant::now();
        // Срок за пределами представимого времени равносилен работе без срока
        let deadline = duration.and_then(|d| started.checked_add(d));
        let mut report = RunReport::new();

        let source = guard
            .source
            .as_mut()
            .ok_or_else(|| winevent_error!(internal, "источник событий потерян во время запуска"))?;
        report.reason = self.run_loop(&mut **source, deadline, &mut report).await;
        report.elapsed = started.elapsed();

        guard.final_state = match report.reason {
            StopReason::Elapsed => DispatcherState::Idle,
            _ => DispatcherState::Stopped,
        };

        info!("Dispatcher остановлен: {}", report);
        Ok(report)
    }

    fn begin_run(&self) -> Result<RunGuard<'_>> {
        let mut state = self.state.lock();
        if *state == DispatcherState::Running {
            return Err(winevent_error!(state_conflict, "Dispatcher уже запущен"));
        }

        let source = self
            .source
            .lock()
            .take()
            .ok_or_else(|| winevent_error!(internal, "источник событий недоступен"))?;

        *state = DispatcherState::Running;
        self.stop_tx.send_replace(false);

        Ok(RunGuard {
            dispatcher: self,
            source: Some(source),
            final_state: DispatcherState::Stopped,
        })
    }

    async fn run_loop(
        &self,
        source: &mut dyn EventSource,
        deadline: Option<Instant>,
        report: &mut RunReport,
    ) -> StopReason {
        let mut stop_rx = self.stop_tx.subscribe();
        let mut idle_tick = interval(self.options.idle_poll_interval.max(Duration::from_millis(1)));
        idle_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *stop_rx.borrow_and_update() {
                return StopReason::StopRequested;
            }
            // Источник, который всегда готов, не даёт таймеру сработать в select!
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return StopReason::Elapsed;
            }

            let wake = tokio::select! {
                biased;
                _ = stop_rx.wait_for(|stop| *stop) => Wake::Stop,
                _ = deadline_reached(deadline) => Wake::Elapsed,
                _ = idle_tick.tick() => Wake::IdleTick,
                event = source.next_event() => Wake::Event(event),
            };

            match wake {
                Wake::Stop => return StopReason::StopRequested,
                Wake::Elapsed => return StopReason::Elapsed,
                Wake::IdleTick => {
                    if let Some(id) = self.check_idle(report) {
                        return StopReason::Signaled(id);
                    }
                }
                Wake::Event(None) => {
                    warn!("Источник событий закрыт");
                    return StopReason::SourceExhausted;
                }
                Wake::Event(Some(event)) => {
                    if let Some(id) = self.dispatch(&event, report) {
                        return StopReason::Signaled(id);
                    }
                }
            }
        }
    }

    /// Обработать одно событие. Возвращает id первой подписки, попросившей остановку.
    fn dispatch(&self, event: &RawEvent, report: &mut RunReport) -> Option<InterestId> {
        report.events_received += 1;

        let candidates = self.registry.lookup(event.code);
        if candidates.is_empty() {
            trace_if_enabled!("Нет подписок на {}", event);
            return None;
        }

        let data = EventData::new(event, Arc::clone(&self.windows));
        let mut matched = false;
        let mut stop_by = None;

        for interest in &candidates {
            let (id, label) = (interest.id(), interest.label());
            if !self.evaluate(id, label, &data, report, || interest.matches(&data)) {
                continue;
            }
            matched = true;
            report.callbacks_invoked += 1;

            debug_if_enabled!("Вызов обработчика #{} '{}' для {}", id, label, data);

            if self.invoke(id, label, &data, report, || interest.invoke(&data)) && stop_by.is_none() {
                info!("Обработчик #{} '{}' запросил остановку", id, label);
                stop_by = Some(id);
            }
        }

        if matched {
            report.events_matched += 1;
        }
        stop_by
    }

    /// Тик простоя: вызвать подписки, чей порог достигнут, а лимит вызовов не исчерпан
    fn check_idle(&self, report: &mut RunReport) -> Option<InterestId> {
        let watches = self.idle.snapshot();
        if watches.is_empty() {
            return None;
        }
        let idle = self.windows.idle_time()?;

        let raw = RawEvent::windowless(EventCode::IDLE);
        let data = EventData::new(&raw, Arc::clone(&self.windows)).with_idle_time(idle);
        let mut stop_by = None;

        for watch in watches.iter() {
            let (id, label) = (watch.id(), watch.label());
            if !watch.observe(idle) {
                continue;
            }
            if !self.evaluate(id, label, &data, report, || watch.matches(&data)) {
                continue;
            }
            if !watch.try_claim() {
                continue;
            }
            report.callbacks_invoked += 1;

            debug_if_enabled!(
                "Простой {:?}: вызов #{} '{}' ({}/{})",
                idle,
                id,
                label,
                watch.calls(),
                watch.call_limit()
            );

            if self.invoke(id, label, &data, report, || watch.invoke(&data)) && stop_by.is_none() {
                info!("Обработчик простоя #{} '{}' запросил остановку", id, label);
                stop_by = Some(id);
            }
        }
        stop_by
    }

    /// Предикат подписки; паника в пользовательском предикате считается несовпадением
    fn evaluate<F>(&self, id: InterestId, label: &str, data: &EventData, report: &mut RunReport, test: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        match panic::catch_unwind(AssertUnwindSafe(test)) {
            Ok(result) => result,
            Err(payload) => {
                let message = format!("паника в предикате: {}", panic_message(payload));
                self.report_failure(id, label, data.code(), message, report);
                false
            }
        }
    }

    /// Вызвать обработчик; ошибка и паника уходят в ErrorSink.
    /// `true`, если обработчик попросил остановить цикл.
    fn invoke<F>(&self, id: InterestId, label: &str, data: &EventData, report: &mut RunReport, callback: F) -> bool
    where
        F: FnOnce() -> anyhow::Result<Signal>,
    {
        match panic::catch_unwind(AssertUnwindSafe(callback)) {
            Ok(Ok(Signal::Continue)) => false,
            Ok(Ok(Signal::Stop)) => true,
            Ok(Err(e)) => {
                self.report_failure(id, label, data.code(), format!("{:#}", e), report);
                false
            }
            Err(payload) => {
                self.report_failure(id, label, data.code(), panic_message(payload), report);
                false
            }
        }
    }

    fn report_failure(&self, id: InterestId, label: &str, code: EventCode, message: String, report: &mut RunReport) {
        report.callback_failures += 1;
        self.options.error_sink.report(WinEventError::Callback {
            interest: id,
            code,
            message: format!("'{}': {}", label, message),
        });
    }
}

/// Возвращает источник и выставляет итоговое состояние даже при отмене `run`
struct RunGuard<'a> {
    dispatcher: &'a Dispatcher,
    source: Option<Box<dyn EventSource>>,
    final_state: DispatcherState,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.dispatcher.state.lock();
        if let Some(source) = self.source.take() {
            *self.dispatcher.source.lock() = Some(source);
        }
        *state = self.final_state;
    }
}

async fn deadline_reached(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "паника без сообщения".to_string()
    }
}
