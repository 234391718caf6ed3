use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    logging::{LogFormat, LoggingConfig},
    registry::RedefinitionPolicy,
};

/// Префикс переменных окружения: `SCOPEBUS_TOPIC_SALT`, `SCOPEBUS_LOG_LEVEL`...
pub const ENV_PREFIX: &str = "SCOPEBUS";

/// Настройки реестра и логирования.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Фиксированная соль тем; без неё соль случайна на каждый реестр.
    #[serde(default)]
    pub topic_salt: Option<u32>,
    /// Поведение при повторном `define`.
    pub redefinition: RedefinitionPolicy,
    /// Уровень или директива фильтра (`info`, `scopebus=debug`).
    pub log_level: String,
    pub log_format: LogFormat,
    #[serde(default)]
    pub log_ansi: bool,
}

impl Settings {
    /// Значения по умолчанию, переопределённые переменными окружения.
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder(None)?.build()?.try_deserialize()
    }

    /// Как [`Settings::load`], но сначала читает файл конфигурации
    /// (toml/json/yaml по расширению). Окружение имеет приоритет над файлом.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::builder(Some(path))?.build()?.try_deserialize()
    }

    fn builder(
        path: Option<&Path>
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let mut builder = Config::builder()
            .set_default("redefinition", "reject")?
            .set_default("log_level", "info")?
            .set_default("log_format", "compact")?
            .set_default("log_ansi", false)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        Ok(builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true)))
    }

    /// Конфигурация логирования из этих настроек.
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            format: self.log_format,
            ansi: self.log_ansi,
            ..LoggingConfig::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            topic_salt: None,
            redefinition: RedefinitionPolicy::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            log_ansi: false,
        }
    }
}
