//! Реестр модулей: пространства имён, экземпляры и их события.
//!
//! - `registry`: контекст реестра (конструкторы, экземпляры, индекс имён).
//! - `handle`: дескриптор экземпляра или глобальной области.
//! - `bulk`: групповой дескриптор над всеми экземплярами пространства имён.
//! - `policy`: политика повторного определения модуля.

pub mod bulk;
pub mod handle;
pub mod policy;
#[allow(clippy::module_inception)]
pub mod registry;

use std::sync::Arc;

use serde_json::Value;

pub use bulk::BulkHandle;
pub use handle::{Handle, ALL_EVENTS};
pub use policy::RedefinitionPolicy;
pub use registry::Registry;

/// Обработчик события: получает дескриптор, на котором он подписан, и
/// позиционные аргументы `trigger`.
pub type Listener = Arc<dyn Fn(&Handle, &[Value]) -> anyhow::Result<()> + Send + Sync>;

/// Конструктор модуля: получает только что созданный дескриптор и аргументы
/// `instantiate`.
pub type Constructor = Arc<dyn Fn(&Handle, &[Value]) -> anyhow::Result<()> + Send + Sync>;
