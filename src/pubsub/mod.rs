//! Подсистема Publish–Subscribe.
//!
//! - `codec`: кодирование области видимости и имени события в тему.
//! - `intern` (приватный): пул `Arc<str>` для тем.
//! - `event`: служебный объект события, передаваемый обработчикам шины.
//! - `bus`: синхронная шина событий поверх тем.

pub mod bus;
pub mod codec;
pub mod event;
mod intern;

pub use bus::*;
pub use codec::*;
pub use event::*;
pub use intern::TopicId;
