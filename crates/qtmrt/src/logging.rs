use clap::ValueEnum;

/// Environment variable holding the default log level.
pub const LOG_ENV: &str = "QTM_LOGGING";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> tracing::level_filters::LevelFilter {
        match self {
            LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
            LogLevel::Warn => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }
}

/// Pick the effective level: an explicit `--log-level` wins, then a
/// recognised level name in `QTM_LOGGING`. Unset or unrecognised values
/// fall back to `info`.
pub fn resolve_level(cli: Option<LogLevel>, env: Option<&str>) -> LogLevel {
    cli.or_else(|| env.and_then(|value| LogLevel::from_str(value.trim(), true).ok()))
        .unwrap_or(LogLevel::Info)
}

/// [`resolve_level`] against the process environment.
pub fn effective_level(cli: Option<LogLevel>) -> LogLevel {
    resolve_level(cli, std::env::var(LOG_ENV).ok().as_deref())
}

/// Route library logs to stderr; stdout carries command output only.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn levels_map_to_filters() {
        assert_eq!(LogLevel::Error.as_filter(), LevelFilter::ERROR);
        assert_eq!(LogLevel::Trace.as_filter(), LevelFilter::TRACE);
    }

    #[test]
    fn level_names_parse_case_insensitively() {
        assert!(matches!(
            LogLevel::from_str("DEBUG", true),
            Ok(LogLevel::Debug)
        ));
        assert!(LogLevel::from_str("verbose", true).is_err());
    }

    #[test]
    fn env_level_applies_without_flag() {
        assert!(matches!(
            resolve_level(None, Some("debug")),
            LogLevel::Debug
        ));
        assert!(matches!(resolve_level(None, Some(" Warn ")), LogLevel::Warn));
    }

    #[test]
    fn flag_overrides_env_level() {
        assert!(matches!(
            resolve_level(Some(LogLevel::Error), Some("debug")),
            LogLevel::Error
        ));
    }

    #[test]
    fn unknown_or_missing_env_level_means_info() {
        assert!(matches!(resolve_level(None, Some("1")), LogLevel::Info));
        assert!(matches!(resolve_level(None, Some("")), LogLevel::Info));
        assert!(matches!(resolve_level(None, None), LogLevel::Info));
    }
}
