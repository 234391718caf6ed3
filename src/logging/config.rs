use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Формат вывода логов.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Уровень (`info`) или готовая директива (`scopebus=debug,warn`).
    pub level: String,
    pub format: LogFormat,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub ansi: bool,
}

impl LoggingConfig {
    /// Проверяет, что `level` является известным уровнем или директива с `=`.
    pub fn validate(&self) -> Result<(), String> {
        let level = self.level.trim();
        if level.is_empty() {
            return Err("log level must not be empty".to_string());
        }
        if level.contains('=') || LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            Ok(())
        } else {
            Err(format!("unknown log level: {level}"))
        }
    }

    /// Директива для `EnvFilter`: голый уровень относится к этому крейту,
    /// остальные цели ограничены `warn`.
    pub fn build_filter_directive(&self) -> String {
        let level = self.level.trim();
        if level.contains('=') {
            level.to_string()
        } else {
            format!("warn,scopebus={}", level.to_ascii_lowercase())
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            with_target: true,
            with_thread_ids: false,
            ansi: false,
        }
    }
}
