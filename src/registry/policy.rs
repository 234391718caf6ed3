use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Что делать, если `define` вызван для уже определённого пространства имён.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedefinitionPolicy {
    /// Ошибка `ModuleRedefinition`, прежний конструктор остаётся.
    #[default]
    Reject,
    /// Новый конструктор заменяет прежний. Уже созданные экземпляры не
    /// затрагиваются.
    Overwrite,
}

impl FromStr for RedefinitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(format!("unknown redefinition policy: {other}")),
        }
    }
}

impl fmt::Display for RedefinitionPolicy {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Reject => f.write_str("reject"),
            Self::Overwrite => f.write_str("overwrite"),
        }
    }
}
