use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::events::EventCode;
use crate::listen::Shortcut;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub dispatch: DispatchConfig,
    pub dry_run: DryRunConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Регистр в фильтрах по заголовку окна учитывается
    pub case_sensitive_titles: bool,
    /// Без значения цикл работает до Ctrl+C
    pub run_duration_secs: Option<f64>,
    /// Ёмкость канала между хуком и диспетчером
    pub feed_capacity: usize,
    /// Коды событий, которые демо-подписки игнорируют (`EVENT_OBJECT_SHOW` или `0x8002`)
    pub excluded_events: Vec<String>,
    /// Период опроса времени простоя, мс
    pub idle_poll_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DryRunConfig {
    pub interval_ms: u64,
    /// Заголовки синтетических окон
    pub titles: Vec<String>,
    /// Наборы событий (`create`, `location_change`, ...) для генератора
    pub events: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            filter: "winevents=info".to_string(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            case_sensitive_titles: true,
            run_duration_secs: None,
            feed_capacity: 1024,
            excluded_events: Vec::new(),
            idle_poll_ms: 75,
        }
    }
}

impl Default for DryRunConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            titles: vec![
                "Untitled - Notepad".to_string(),
                "Calculator".to_string(),
                "Default IME".to_string(),
            ],
            events: vec![
                "create".to_string(),
                "foreground".to_string(),
                "location_change".to_string(),
                "destroy".to_string(),
            ],
        }
    }
}

impl Config {
    /// Файл TOML (может отсутствовать) поверх значений по умолчанию,
    /// затем переменные `WINEVENTS_SECTION__KEY`
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("WINEVENTS_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if let Some(secs) = self.dispatch.run_duration_secs {
            if Duration::try_from_secs_f64(secs).is_err() {
                anyhow::bail!(
                    "run_duration_secs должно быть неотрицательным числом в пределах Duration, получено {}",
                    secs
                );
            }
        }

        if self.dispatch.feed_capacity == 0 {
            anyhow::bail!("feed_capacity должно быть больше 0");
        }

        if self.dispatch.idle_poll_ms == 0 {
            anyhow::bail!("dispatch.idle_poll_ms должно быть больше 0");
        }

        self.excluded_event_codes()?;

        if self.dry_run.interval_ms == 0 {
            anyhow::bail!("dry_run.interval_ms должно быть больше 0");
        }

        self.dry_run_ranges()?;

        Ok(())
    }

    /// Значения, не прошедшие `validate()`, трактуются как "без срока"
    pub fn run_duration(&self) -> Option<Duration> {
        self.dispatch
            .run_duration_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch.idle_poll_ms)
    }

    pub fn dry_run_interval(&self) -> Duration {
        Duration::from_millis(self.dry_run.interval_ms)
    }

    /// Коды из `dispatch.excluded_events`
    pub fn excluded_event_codes(&self) -> Result<Vec<EventCode>> {
        self.dispatch
            .excluded_events
            .iter()
            .map(|name| parse_event_code(name))
            .collect()
    }

    /// Нижние границы наборов из `dry_run.events`: по одному коду на набор
    pub fn dry_run_codes(&self) -> Result<Vec<EventCode>> {
        Ok(self.dry_run_ranges()?.into_iter().map(|s| s.range().low()).collect())
    }

    fn dry_run_ranges(&self) -> Result<Vec<Shortcut>> {
        self.dry_run
            .events
            .iter()
            .map(|name| {
                name.parse::<Shortcut>()
                    .with_context(|| format!("Неверный набор событий в dry_run.events: '{}'", name))
            })
            .collect()
    }
}

/// Имя (`EVENT_OBJECT_SHOW`, `object_show`) или число (`0x8002`, `32770`)
fn parse_event_code(raw: &str) -> Result<EventCode> {
    let raw = raw.trim();
    if let Some(code) = EventCode::from_name(raw) {
        return Ok(code);
    }

    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => raw.parse::<u32>(),
    };

    parsed
        .map(EventCode)
        .with_context(|| format!("Неизвестный код события: '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.dispatch.case_sensitive_titles);
        assert_eq!(config.run_duration(), None);
    }

    #[test]
    fn test_load_from_file_merges_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[logging]
level = "debug"

[dispatch]
case_sensitive_titles = false
run_duration_secs = 0.5
excluded_events = ["EVENT_OBJECT_SHOW", "0x8003"]
idle_poll_ms = 200

[dry_run]
interval_ms = 20
events = ["existence_change", "maximize"]
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "compact");
        assert!(!config.dispatch.case_sensitive_titles);
        assert_eq!(config.run_duration(), Some(Duration::from_millis(500)));
        assert_eq!(config.dispatch.feed_capacity, 1024);
        assert_eq!(config.idle_poll_interval(), Duration::from_millis(200));
        assert_eq!(
            config.excluded_event_codes().unwrap(),
            vec![EventCode::OBJECT_SHOW, EventCode::OBJECT_HIDE]
        );
        assert_eq!(
            config.dry_run_codes().unwrap(),
            vec![EventCode::OBJECT_CREATE, EventCode::OBJECT_LOCATIONCHANGE]
        );
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.dry_run.interval_ms, 500);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.format = "json".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dispatch.run_duration_secs = Some(-1.0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dispatch.run_duration_secs = Some(1e30);
        assert!(config.validate().is_err());
        assert_eq!(config.run_duration(), None);

        let mut config = Config::default();
        config.dispatch.run_duration_secs = Some(f64::NAN);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dispatch.idle_poll_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dry_run.interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dispatch.excluded_events = vec!["EVENT_NOT_A_THING".to_string()];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dry_run.events = vec!["resize".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_event_code_forms() {
        assert_eq!(parse_event_code("EVENT_SYSTEM_FOREGROUND").unwrap(), EventCode::SYSTEM_FOREGROUND);
        assert_eq!(parse_event_code("object_create").unwrap(), EventCode::OBJECT_CREATE);
        assert_eq!(parse_event_code("0x800B").unwrap(), EventCode::OBJECT_LOCATIONCHANGE);
        assert_eq!(parse_event_code("3").unwrap(), EventCode::SYSTEM_FOREGROUND);
    }
}
