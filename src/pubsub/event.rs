use super::TopicId;

/// Служебный объект события, который шина передаёт каждому обработчику
/// первым аргументом.
///
/// Дескрипторы отбрасывают его перед вызовом пользовательского обработчика.
#[derive(Debug, Clone)]
pub struct Event {
    pub topic: TopicId,
    /// Номер подписки, которой доставляется событие.
    pub subscriber: u64,
    /// `true`, если подписка одноразовая и уже снята с шины.
    pub once: bool,
}

impl Event {
    pub fn new(
        topic: TopicId,
        subscriber: u64,
        once: bool,
    ) -> Self {
        Self {
            topic,
            subscriber,
            once,
        }
    }
}
