use anyhow::Result;
use clap::Parser;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info, warn};

use winevents::events::{Monitor, MonitorId, Point, Rect, WindowHandle, WindowSnapshot};
use winevents::filters::{
    exclude_system_windows, exclude_titled_events, exclude_window_events, is_maximized,
    require_titled_window, size_less_than, touches_monitor, TextPattern,
};
use winevents::services::{Dispatcher, DispatcherOptions, DryRunEventSource, MemoryWindows};
use winevents::{Config, EventCode, Shortcut, Signal};

#[derive(Parser, Debug)]
#[command(name = "winevents")]
#[command(about = "Подписка на события окон с фильтрацией по атрибутам (dry-run демо)")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "winevents.toml")]
    config: String,

    /// Уровень логирования; по умолчанию берётся из конфигурации
    #[arg(long)]
    log_level: Option<String>,

    /// Длительность работы в секундах; без значения до Ctrl+C
    #[arg(long)]
    duration: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(level) = args.log_level {
        // Явный уровень из командной строки важнее фильтра по модулям
        config.logging.level = level;
        config.logging.filter.clear();
    }
    if args.duration.is_some() {
        config.dispatch.run_duration_secs = args.duration;
    }
    config.validate()?;

    init_tracing(&config)?;

    info!("Запуск winevents v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);
    warn!("Режим сухого запуска - события генерируются синтетически");

    let windows = Arc::new(demo_windows(&config));
    let source = DryRunEventSource::new(windows.handles(), config.dry_run_codes()?, config.dry_run_interval());
    let dispatcher = Arc::new(Dispatcher::new(
        Box::new(source),
        windows.clone(),
        DispatcherOptions::from_config(&config),
    ));

    register_demo_interests(&dispatcher, &config)?;
    info!(
        "Зарегистрировано подписок: {} на события, {} на простой",
        dispatcher.registry().len(),
        dispatcher.idle_watches().len()
    );

    // Эмуляция пользователя: первое окно то разворачивается, то сворачивается обратно,
    // пока пользователь активен; активен он лишь каждый четвёртый такт
    let mover = {
        let windows = windows.clone();
        let period = config.dry_run_interval() * 3;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut idle = Duration::ZERO;
            for step in 0u64.. {
                ticker.tick().await;
                idle = if step % 4 == 0 { Duration::ZERO } else { idle + period };
                windows.set_idle_time(Some(idle));
                if idle > Duration::ZERO {
                    continue;
                }
                windows.update(WindowHandle(1), |w| {
                    w.is_maximized = !w.is_maximized;
                    if w.is_maximized {
                        w.position = Point::new(0, 0);
                        (w.width, w.height) = (1920, 1040);
                    } else {
                        w.position = Point::new(100, 100);
                        (w.width, w.height) = (640, 480);
                    }
                });
            }
        })
    };

    let mut run_handle = {
        let dispatcher = dispatcher.clone();
        let duration = config.run_duration();
        tokio::spawn(async move { dispatcher.run(duration).await })
    };

    info!("Dispatcher запущен");

    let finished = tokio::select! {
        result = &mut run_handle => Some(result),
        signal = signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
            }
            None
        }
    };

    info!("Завершение работы...");
    mover.abort();

    let result = match finished {
        Some(result) => result,
        None => {
            dispatcher.stop();
            let shutdown_timeout = Duration::from_secs(5);
            match tokio::time::timeout(shutdown_timeout, &mut run_handle).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Таймаут при остановке Dispatcher");
                    run_handle.abort();
                    return Ok(());
                }
            }
        }
    };

    match result {
        Ok(Ok(report)) => info!("Итог: {}", report),
        Ok(Err(e)) => error!("Ошибка в Dispatcher: {}", e),
        Err(e) => error!("Задача Dispatcher завершилась аварийно: {}", e),
    }

    info!("winevents завершил работу");
    Ok(())
}

/// Два монитора и по окну на каждый заголовок из конфигурации
fn demo_windows(config: &Config) -> MemoryWindows {
    let windows = MemoryWindows::with_monitors(vec![
        Monitor::new(1, Rect::from_origin_size(Point::new(0, 0), 1920, 1040)),
        Monitor::new(2, Rect::from_origin_size(Point::new(1920, 0), 1280, 984)),
    ]);

    for (i, title) in config.dry_run.titles.iter().enumerate() {
        let n = i as i32;
        let (width, height) = if i % 2 == 0 { (640, 480) } else { (150, 150) };
        windows.insert(
            WindowSnapshot::new(WindowHandle(i as u64 + 1), title.as_str())
                .with_class(if i == 0 { "Notepad" } else { "ApplicationFrameWindow" })
                .with_pid(1000 + i as u32)
                .with_geometry(Point::new(100 + 900 * n, 100 + 40 * n), width, height)
                .active(i == 0),
        );
    }

    windows
}

fn register_demo_interests(dispatcher: &Dispatcher, config: &Config) -> winevents::Result<()> {
    let titles = dispatcher.filters();

    dispatcher
        .on_create()
        .filter(exclude_system_windows())
        .filter(size_less_than(200, 200))
        .label("small-window-created")
        .each(|data| {
            if let Some(window) = data.window() {
                info!("Создано маленькое окно: {}", window);
            }
        })?;

    dispatcher
        .on_foreground()
        .filter(titles.title_wildcard("*Notepad")?)
        .label("notepad-foreground")
        .each(|data| info!("Блокнот на переднем плане: {}", data))?;

    dispatcher
        .on_maximize()
        .filter(is_maximized())
        .filter(touches_monitor(MonitorId(1), true))
        .label("maximized-on-primary")
        .each(|data| info!("Окно развёрнуто на основном мониторе: {}", data))?;

    dispatcher
        .on_existence_change()
        .or_on(Shortcut::LocationChange)
        .filter(require_titled_window())
        .filter(exclude_window_events(config.excluded_event_codes()?))
        .filter(exclude_titled_events(vec![(
            TextPattern::wildcard("Calc*", config.dispatch.case_sensitive_titles)?,
            EventCode::OBJECT_LOCATIONCHANGE,
        )]))
        .label("activity-log")
        .each(|data| info!("Событие: {}", data))?;

    dispatcher
        .on_idle(config.dry_run_interval() * 6)
        .label("away-from-keyboard")
        .each(|data| info!("Пользователь неактивен уже {:?}", data.idle_time().unwrap_or_default()))?;

    // Демо завершается, когда каждое окно было уничтожено хотя бы раз
    let destroyed = AtomicUsize::new(0);
    let limit = config.dry_run.titles.len().max(1);
    dispatcher
        .on_destroy()
        .label("stop-after-destroy")
        .call(move |data| {
            let seen = destroyed.fetch_add(1, Ordering::Relaxed) + 1;
            if seen < limit {
                return Ok(Signal::Continue);
            }
            info!("Уничтожено окон: {} ({}), останавливаем цикл", seen, data.code());
            Ok(Signal::Stop)
        })?;

    Ok(())
}

fn init_tracing(config: &Config) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let directives = if config.logging.filter.is_empty() {
        config.logging.level.clone()
    } else {
        format!("{},{}", config.logging.level, config.logging.filter)
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directives))?;

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format.as_str() {
        "pretty" => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
        _ => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
    }

    Ok(())
}
