use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Ошибки реестра модулей и доставки событий.
///
/// Все ошибки возникают синхронно и сразу возвращаются вызывающей стороне.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Пустое имя пространства имён в `define` или `instantiate`.
    #[error("namespace must be specified")]
    NamespaceRequired,

    /// `define` вызван без конструктора.
    #[error("constructor must be defined for namespace '{namespace}'")]
    ConstructorRequired { namespace: String },

    /// `instantiate` для пространства имён без конструктора.
    #[error("the constructor for '{namespace}' has not been defined, use define first")]
    UndefinedConstructor { namespace: String },

    /// `on`/`one` вызван без обработчика.
    #[error("event '{event}' needs a callback")]
    CallbackRequired { event: String },

    /// Повторное определение модуля при политике `Reject`.
    #[error("module '{namespace}' cannot be redefined")]
    ModuleRedefinition { namespace: String },

    /// Обработчик события вернул ошибку.
    ///
    /// Доставка остальным обработчикам того же `trigger` прерывается.
    #[error("handler for topic '{topic}' failed: {source}")]
    Handler {
        topic: String,
        #[source]
        source: anyhow::Error,
    },

    /// Конструктор модуля вернул ошибку; экземпляр уже уничтожен.
    #[error("constructor of module '{namespace}' failed: {source}")]
    ConstructorFailed {
        namespace: String,
        #[source]
        source: anyhow::Error,
    },
}

impl RegistryError {
    pub fn handler(
        topic: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::Handler {
            topic: topic.into(),
            source,
        }
    }
}

impl ErrorExt for RegistryError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NamespaceRequired
            | Self::ConstructorRequired { .. }
            | Self::CallbackRequired { .. } => StatusCode::InvalidArgs,
            Self::UndefinedConstructor { .. } => StatusCode::NotFound,
            Self::ModuleRedefinition { .. } => StatusCode::AlreadyExists,
            Self::Handler { .. } | Self::ConstructorFailed { .. } => StatusCode::HandlerFailed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn client_message(&self) -> String {
        match self {
            // Детали ошибки обработчика остаются в логах
            Self::Handler { topic, .. } => format!("handler for topic '{topic}' failed"),
            Self::ConstructorFailed { namespace, .. } => {
                format!("constructor of module '{namespace}' failed")
            }
            _ => self.to_string(),
        }
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "registry".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        match self {
            Self::ConstructorRequired { namespace }
            | Self::UndefinedConstructor { namespace }
            | Self::ModuleRedefinition { namespace }
            | Self::ConstructorFailed { namespace, .. } => {
                tags.push(("namespace", namespace.clone()));
            }
            Self::CallbackRequired { event } => tags.push(("event", event.clone())),
            Self::Handler { topic, .. } => tags.push(("topic", topic.clone())),
            Self::NamespaceRequired => {}
        }

        tags
    }
}
